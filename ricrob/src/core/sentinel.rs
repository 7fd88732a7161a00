//! Solver completion protocol.
//!
//! Solvers report through stdout. Two policies decide what counts as a
//! finished solve:
//!
//! - [`CompletionPolicy::Sentinel`]: the solver may print any number of
//!   informational lines, but exactly one of them must be a completion record,
//!   a JSON object with `"msg": "result"` and a `moves` field. Exiting with
//!   status 0 without a record is a `result_not_found` failure. A record with
//!   `"moves": null` is still a record: the solve finished without moves.
//! - [`CompletionPolicy::ExitStatus`]: exit status 0 is success. The moves are
//!   read from the final non-empty stdout line, either a completion record or
//!   a bare JSON array.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Value of the `msg` field that marks a completion record.
pub const RESULT_MSG: &str = "result";

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CompletionPolicy {
    #[default]
    Sentinel,
    ExitStatus,
}

/// A parsed completion record.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRecord {
    /// `None` when the record's `moves` is `null`.
    pub moves: Option<Vec<Value>>,
    pub raw: Value,
}

/// Return the completion record carried by `line`, if any.
pub fn parse_result_record(line: &str) -> Option<ResultRecord> {
    let value: Value = serde_json::from_str(line.trim()).ok()?;
    let obj = value.as_object()?;
    if obj.get("msg")?.as_str()? != RESULT_MSG {
        return None;
    }
    let moves = moves_of(obj.get("moves")?);
    Some(ResultRecord { moves, raw: value })
}

/// An array is the move list, `null` means none, anything else is a single move.
fn moves_of(value: &Value) -> Option<Vec<Value>> {
    match value {
        Value::Array(moves) => Some(moves.clone()),
        Value::Null => None,
        other => Some(vec![other.clone()]),
    }
}

/// Moves from the final stdout line under [`CompletionPolicy::ExitStatus`].
pub fn parse_final_line(line: &str) -> Option<Vec<Value>> {
    if let Some(record) = parse_result_record(line) {
        return record.moves;
    }
    match serde_json::from_str(line.trim()).ok()? {
        Value::Array(moves) => Some(moves),
        Value::Object(obj) => obj.get("moves")?.as_array().cloned(),
        _ => None,
    }
}

/// Incremental stdout scanner for one solver run.
#[derive(Debug, Default)]
pub struct LineScan {
    pub lines: usize,
    pub records_seen: usize,
    pub record: Option<ResultRecord>,
    pub last_line: Option<String>,
}

impl LineScan {
    /// Feed one stdout line (without its terminator).
    pub fn push(&mut self, line: &str) {
        self.lines += 1;
        if let Some(record) = parse_result_record(line) {
            self.records_seen += 1;
            self.record = Some(record);
        }
        if !line.trim().is_empty() {
            self.last_line = Some(line.to_string());
        }
    }
}
