//! Concurrent solver dispatch for Ricochet Robots puzzles.
//!
//! One solve request ([`core::task::Task`]) is handed to every configured
//! external solver at once; each solver's verdict is streamed back as soon as
//! it is available.
//!
//! - **[`core`]**: Pure, deterministic logic (task arguments, outcome records,
//!   completion-record detection, dispatch phases). No I/O.
//! - **[`io`]**: Side-effecting operations (config files, solver processes).
//!
//! [`dispatcher`] ties the two together: it fans a task out to one process
//! runner per solver and fans the outcomes into one [`dispatcher::OutcomeStream`].

pub mod core;
pub mod dispatcher;
pub mod exit_codes;
pub mod io;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use crate::core::outcome::{Failure, FailureKind, Outcome, SolverId};
pub use crate::core::task::Task;
pub use crate::dispatcher::{Dispatcher, OutcomeStream};
pub use crate::io::config::DispatchConfig;
