//! Stable exit codes for the `ricrob` CLI.

/// At least one solver produced a result.
pub const OK: i32 = 0;
/// Invalid configuration or task, or another error before dispatch.
pub const INVALID: i32 = 1;
/// Every solver failed.
pub const NO_SOLUTION: i32 = 2;
