//! HTTP route handlers and request parsing.

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use ricrob::SolverId;
use ricrob::core::sentinel::CompletionPolicy;
use ricrob::core::task::{Coord, Robots, Task, Tiles};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// Build the API router.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/solvers", get(list_solvers))
}

async fn health() -> &'static str {
    "ok"
}

#[derive(Serialize)]
struct SolversResponse<'a> {
    solvers: &'a [SolverId],
    policy: CompletionPolicy,
    solver_timeout_secs: u64,
}

/// GET /api/solvers - configured solvers and how they are judged.
async fn list_solvers(State(state): State<AppState>) -> Response {
    let cfg = state.dispatcher.config();
    Json(SolversResponse {
        solvers: &cfg.solvers,
        policy: cfg.policy,
        solver_timeout_secs: cfg.solver_timeout_secs,
    })
    .into_response()
}

/// GET /favicon.ico - browsers ask for it; answer without touching the asset dir.
pub async fn favicon() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// JSON error body, `{"error": "..."}`.
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    status: StatusCode,
    error: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(&self)).into_response()
    }
}

/// Query string of `/solve`.
///
/// Robot positions are `x,y`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SolveQuery {
    pub tl: Option<String>,
    pub tr: Option<String>,
    pub bl: Option<String>,
    pub br: Option<String>,
    pub yellow: Option<String>,
    pub red: Option<String>,
    pub green: Option<String>,
    pub blue: Option<String>,
    pub target: Option<String>,
}

impl SolveQuery {
    /// Build and validate the task, naming the first offending parameter.
    pub fn into_task(self) -> Result<Task, ApiError> {
        let task = Task {
            tiles: Tiles {
                top_left: required("tl", self.tl)?,
                top_right: required("tr", self.tr)?,
                bottom_left: required("bl", self.bl)?,
                bottom_right: required("br", self.br)?,
            },
            robots: Robots {
                yellow: coord("yellow", self.yellow)?,
                red: coord("red", self.red)?,
                green: coord("green", self.green)?,
                blue: coord("blue", self.blue)?,
            },
            target: required("target", self.target)?,
        };
        task.validate()
            .map_err(|e| ApiError::bad_request(format!("{e:#}")))?;
        Ok(task)
    }
}

fn required(name: &str, value: Option<String>) -> Result<String, ApiError> {
    value.ok_or_else(|| ApiError::bad_request(format!("missing query parameter {name}")))
}

fn coord(name: &str, value: Option<String>) -> Result<Coord, ApiError> {
    required(name, value)?
        .parse()
        .map_err(|e: anyhow::Error| ApiError::bad_request(format!("parameter {name}: {e:#}")))
}
