//! Common service routes and middleware.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use wonder_stuff_core::KindError;

use crate::logger::{Logger, RequestLogger};
use crate::middleware::{ErrorHandlingLayer, HandlerError, RequestLoggingLayer};
use crate::options::ServerOptions;

/// Liveness check; answers `pong`.
pub const PING_PATH: &str = "/_api/ping";
/// Deployed version, from App Engine's environment.
pub const VERSION_PATH: &str = "/_api/version";
/// App Engine warm-up requests.
pub const WARMUP_PATH: &str = "/_ah/warmup";

/// Work to run when App Engine sends a warm-up request.
#[async_trait]
pub trait WarmUpHandler: Send + Sync + 'static {
    async fn warm_up(&self, logger: &Logger) -> Result<(), KindError>;
}

#[derive(Clone)]
struct HealthState {
    version: String,
    warm_up: Option<Arc<dyn WarmUpHandler>>,
}

/// Wrap `app` with the health routes and the request and error middleware.
///
/// `logger` is the parent of every request-scoped logger.
pub fn make_common_service_app(app: Router, options: &ServerOptions, logger: &Logger) -> Router {
    let state = HealthState {
        version: options.app_engine.version.clone(),
        warm_up: options.warm_up.clone(),
    };

    let health = Router::new()
        .route(PING_PATH, get(ping))
        .route(VERSION_PATH, get(version))
        .route(WARMUP_PATH, get(warm_up))
        .with_state(state);

    health
        .merge(app)
        .layer(
            ErrorHandlingLayer::new(options.mode)
                .with_responder(options.error_responder.clone()),
        )
        .layer(RequestLoggingLayer::new(
            logger.clone(),
            options.request_logging,
        ))
}

async fn ping() -> &'static str {
    "pong\n"
}

async fn version(State(state): State<HealthState>) -> Json<Value> {
    Json(json!({ "version": state.version }))
}

async fn warm_up(
    State(state): State<HealthState>,
    RequestLogger(logger): RequestLogger,
) -> Result<&'static str, HandlerError> {
    if let Some(handler) = &state.warm_up {
        handler.warm_up(&logger).await?;
    }
    Ok("OK\n")
}
