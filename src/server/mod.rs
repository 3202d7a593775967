// HTTP front door
//
// Single POST /execute endpoint that takes {"command": ..., "params": ...}
// and returns the dispatcher's envelope verbatim. The dispatcher never
// fails, so every request answers 200 with either a result or an error key.

use anyhow::{Context, Result};
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::commands::Dispatcher;

#[derive(Debug, Deserialize)]
struct ExecuteRequest {
    command: String,
    #[serde(default)]
    params: Value,
}

async fn execute(
    State(dispatcher): State<Arc<Dispatcher>>,
    Json(request): Json<ExecuteRequest>,
) -> Json<Value> {
    Json(dispatcher.dispatch(&request.command, request.params).await)
}

async fn health(State(dispatcher): State<Arc<Dispatcher>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "commands": dispatcher.command_names(),
    }))
}

pub fn create_router(dispatcher: Arc<Dispatcher>) -> Router {
    Router::new()
        .route("/execute", post(execute))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(dispatcher)
}

/// Bind and serve until the process is stopped.
pub async fn serve(dispatcher: Arc<Dispatcher>, bind_address: &str) -> Result<()> {
    let addr: SocketAddr = bind_address
        .parse()
        .with_context(|| format!("Invalid bind address: {bind_address}"))?;

    let app = create_router(dispatcher);

    info!("Listening on {addr}");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app).await.context("Server failed")?;

    Ok(())
}
