//! Per-solver outcome records.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::task::Task;

/// Configured solver: its executable path or a name looked up on `PATH`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct SolverId(pub String);

impl SolverId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SolverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Machine-readable failure classification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Executable missing or not runnable.
    Spawn,
    /// Output pipes could not be set up or read.
    Io,
    /// Wait failed or the process exited unsuccessfully.
    Exit,
    /// Clean exit without a completion record.
    ResultNotFound,
    /// Deadline exceeded; the process was killed.
    Timeout,
    /// Dispatch cancelled or consumer gone; the process was killed.
    Cancelled,
    /// The runner itself panicked before reporting.
    Panicked,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
}

impl Failure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

/// What one solver produced for one dispatch.
///
/// `moves` and `error` are mutually exclusive: a success carries no error and
/// a failure carries no moves. Both serialize as `null` when absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outcome {
    pub solver: SolverId,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub task: Arc<Task>,
    pub moves: Option<Vec<Value>>,
    /// The full completion record, when the solver emitted one.
    pub record: Option<Value>,
    pub error: Option<Failure>,
}

impl Outcome {
    pub fn success(
        solver: SolverId,
        task: Arc<Task>,
        started_at: DateTime<Utc>,
        moves: Option<Vec<Value>>,
        record: Option<Value>,
    ) -> Self {
        Self {
            solver,
            started_at,
            finished_at: Utc::now(),
            task,
            moves,
            record,
            error: None,
        }
    }

    pub fn failure(
        solver: SolverId,
        task: Arc<Task>,
        started_at: DateTime<Utc>,
        error: Failure,
    ) -> Self {
        Self {
            solver,
            started_at,
            finished_at: Utc::now(),
            task,
            moves: None,
            record: None,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.error.as_ref().map(|e| e.kind)
    }

    pub fn elapsed(&self) -> chrono::TimeDelta {
        self.finished_at - self.started_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_task;
    use serde_json::json;

    #[test]
    fn failure_serializes_null_moves_and_snake_case_kind() {
        let outcome = Outcome::failure(
            SolverId::new("broken"),
            Arc::new(sample_task()),
            Utc::now(),
            Failure::new(FailureKind::ResultNotFound, "result not found"),
        );
        let value = serde_json::to_value(&outcome).expect("serialize");
        assert_eq!(value["solver"], "broken");
        assert_eq!(value["moves"], Value::Null);
        assert_eq!(value["error"]["kind"], "result_not_found");
        assert_eq!(value["task"]["target"], "yellow-pyramid");
        assert!(value.get("started_at").is_some());
        assert!(value.get("finished_at").is_some());
    }

    #[test]
    fn success_serializes_null_error() {
        let outcome = Outcome::success(
            SolverId::new("fast"),
            Arc::new(sample_task()),
            Utc::now(),
            Some(vec![json!("yellow-up")]),
            None,
        );
        let value = serde_json::to_value(&outcome).expect("serialize");
        assert_eq!(value["error"], Value::Null);
        assert_eq!(value["moves"], json!(["yellow-up"]));
        assert!(outcome.is_success());
        assert!(outcome.elapsed() >= chrono::TimeDelta::zero());
    }
}
