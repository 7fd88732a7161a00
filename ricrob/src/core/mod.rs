//! Pure, deterministic logic (no I/O).

pub mod outcome;
pub mod phase;
pub mod sentinel;
pub mod task;
