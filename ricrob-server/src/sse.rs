//! `/solve`: solver outcomes as a Server-Sent Events stream.
//!
//! Every outcome is sent as an `outcome` event the moment its solver
//! finishes, or as an `error` event naming the solver if it cannot be encoded.
//! A final `done` event marks the end of the dispatch, after which
//! the response ends. If the client goes away the stream is dropped, which
//! cancels the solvers still running.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{Stream, StreamExt};
use ricrob::{OutcomeStream, SolverId};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::routes::{ApiError, SolveQuery};
use crate::state::AppState;

/// One SSE message before it becomes an axum [`Event`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseMessage {
    pub event: &'static str,
    pub data: String,
}

impl From<SseMessage> for Event {
    fn from(message: SseMessage) -> Self {
        Event::default().event(message.event).data(message.data)
    }
}

#[derive(Serialize)]
struct DonePayload {
    solvers: usize,
    outcomes: usize,
}

#[derive(Serialize)]
struct ErrorPayload<'a> {
    solver: &'a SolverId,
    error: String,
}

/// One event per outcome: the outcome itself, or an `error` event in its place.
fn outcome_message<T: Serialize>(solver: &SolverId, outcome: &T) -> SseMessage {
    match serde_json::to_string(outcome) {
        Ok(json) => SseMessage {
            event: "outcome",
            data: json,
        },
        Err(e) => {
            warn!(solver = %solver, error = %e, "failed to serialize outcome");
            let payload = ErrorPayload {
                solver,
                error: format!("serialize outcome: {e}"),
            };
            SseMessage {
                event: "error",
                data: serde_json::to_string(&payload).unwrap_or_default(),
            }
        }
    }
}

/// GET /solve - start a dispatch and stream its outcomes.
pub async fn solve_handler(
    State(state): State<AppState>,
    query: Result<Query<SolveQuery>, QueryRejection>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let task = query.into_task()?;
    info!(symbol = %task.target, solvers = state.dispatcher.solvers().len(), "solve request");

    let outcomes = state.dispatcher.execute(task);
    let events = outcome_messages(outcomes).map(|message| Ok::<_, Infallible>(message.into()));

    Ok(Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    ))
}

/// Turn a dispatch into SSE messages: one per outcome, then `done`.
pub fn outcome_messages(mut outcomes: OutcomeStream) -> impl Stream<Item = SseMessage> {
    async_stream::stream! {
        let solvers = outcomes.solver_count();
        let mut delivered = 0usize;

        while let Some(outcome) = outcomes.recv().await {
            delivered += 1;
            debug!(solver = %outcome.solver, success = outcome.is_success(), "streaming outcome");
            yield outcome_message(&outcome.solver, &outcome);
        }

        info!(solvers, outcomes = delivered, "dispatch complete");
        let done = DonePayload { solvers, outcomes: delivered };
        if let Ok(json) = serde_json::to_string(&done) {
            yield SseMessage { event: "done", data: json };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use ricrob::{DispatchConfig, Dispatcher};
    use serde_json::Value;

    #[tokio::test]
    async fn bad_query_is_json_bad_request() {
        let state = AppState::new(Dispatcher::new(DispatchConfig::default()));
        let result = solve_handler(State(state), Ok(Query(SolveQuery::default()))).await;
        let Err(err) = result else {
            panic!("expected an error for an empty query");
        };

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let json: Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(json["error"], "missing query parameter tl");
    }

    struct Unencodable;

    impl Serialize for Unencodable {
        fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("moves are not encodable"))
        }
    }

    #[test]
    fn unencodable_outcome_becomes_error_event() {
        let solver = SolverId::new("bfs");
        let message = outcome_message(&solver, &Unencodable);
        assert_eq!(message.event, "error");
        let json: Value = serde_json::from_str(&message.data).expect("json");
        assert_eq!(json["solver"], "bfs");
        assert!(
            json["error"]
                .as_str()
                .is_some_and(|e| e.contains("moves are not encodable"))
        );
    }

    #[tokio::test]
    async fn empty_dispatch_sends_only_done() {
        let dispatcher = Dispatcher::new(DispatchConfig::default());
        let messages: Vec<SseMessage> =
            outcome_messages(dispatcher.execute(ricrob::test_support::sample_task()))
                .collect()
                .await;
        assert_eq!(
            messages,
            vec![SseMessage {
                event: "done",
                data: r#"{"solvers":0,"outcomes":0}"#.to_string(),
            }]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn outcomes_then_done() {
        let fakes = ricrob::test_support::FakeSolvers::new().expect("fakes");
        let ok = fakes.sentinel("ok", 0.0, r#"["b-up"]"#).expect("ok");
        let broken = fakes.failing("broken", 0.3, 1).expect("broken");
        let dispatcher = Dispatcher::new(fakes.config(&[broken, ok]));

        let messages: Vec<SseMessage> =
            outcome_messages(dispatcher.execute(ricrob::test_support::sample_task()))
                .collect()
                .await;

        let events: Vec<&str> = messages.iter().map(|m| m.event).collect();
        assert_eq!(events, vec!["outcome", "outcome", "done"]);

        let first: Value = serde_json::from_str(&messages[0].data).expect("json");
        assert_eq!(first["moves"][0], "b-up");
        assert_eq!(first["error"], Value::Null);
        let second: Value = serde_json::from_str(&messages[1].data).expect("json");
        assert_eq!(second["error"]["kind"], "exit");
        assert_eq!(messages[2].data, r#"{"solvers":2,"outcomes":2}"#);
    }
}
