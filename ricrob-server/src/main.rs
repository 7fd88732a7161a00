//! Solve server: streams the verdicts of every configured solver to the browser.

mod routes;
mod sse;
mod state;

use std::path::PathBuf;

use anyhow::Context;
use axum::Router;
use axum::routing::get;
use clap::Parser;
use ricrob::Dispatcher;
use ricrob::io::config::resolve_config;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::{info, warn};

use crate::state::AppState;

#[derive(Parser)]
#[command(name = "ricrob-server")]
#[command(about = "Ricochet Robots solve server")]
struct Args {
    /// Host to bind the server to
    #[arg(long, env = "HOST", default_value = "localhost")]
    host: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value = "50000")]
    port: u16,

    /// Comma-separated solver executables (replaces the configured list)
    #[arg(long, env = "SOLVERS")]
    solvers: Option<String>,

    /// TOML configuration file
    #[arg(long, env = "RICROB_CONFIG")]
    config: Option<PathBuf>,

    /// Directory of static UI files
    #[arg(long, default_value = "assets")]
    assets: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ricrob_server=info".parse()?)
                .add_directive("ricrob=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let cfg = resolve_config(args.config.as_deref(), args.solvers.as_deref())
        .context("load configuration")?;
    info!(
        solvers = ?cfg.solvers,
        policy = ?cfg.policy,
        timeout_secs = cfg.solver_timeout_secs,
        "starting ricrob-server"
    );

    let state = AppState::new(Dispatcher::new(cfg));
    let app = build_router(state, &args.assets);

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn build_router(state: AppState, assets: &std::path::Path) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app = Router::new()
        .nest("/api", routes::api_router())
        .route("/solve", get(sse::solve_handler))
        .route("/favicon.ico", get(routes::favicon))
        .layer(cors)
        .with_state(state);

    if assets.exists() {
        info!(assets = %assets.display(), "serving static UI files");
        app = app.fallback_service(ServeDir::new(assets).append_index_html_on_directories(true));
    } else {
        info!(assets = %assets.display(), "asset directory not found, API-only mode");
    }
    app
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutting down...");
}
