//! Side-effecting helpers: configuration files and solver processes.

pub mod config;
pub mod process;
