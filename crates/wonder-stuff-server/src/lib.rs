//! HTTP service bootstrap.
//!
//! Starts an axum application behind request logging and error handling,
//! adds the App Engine health routes, and shuts down gracefully by closing
//! every tracked connection.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  RequestLoggingLayer   (per-request logger)  │
//! │  ErrorHandlingLayer    (HandlerError → 500)  │
//! │  /_api/ping  /_api/version  /_ah/warmup      │
//! │  application routes                          │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! # Configuration
//!
//! Loaded from `wonder.toml` with `WONDER_`-prefixed environment overrides.
//!
//! ```toml
//! [server]
//! name = "render"
//! port = 8080
//! keep_alive_timeout_ms = 90000
//!
//! [logging]
//! level = "info"
//! ```

pub mod app;
pub mod config;
pub mod connections;
pub mod kind;
pub mod logger;
pub mod middleware;
pub mod options;
pub mod runtime;
pub mod server;

pub use app::{make_common_service_app, WarmUpHandler};
pub use config::{ConfigError, ServerConfig};
pub use connections::ConnectionTracker;
pub use kind::ServerKinds;
pub use logger::{
    create_logger, extract_error, get_logger, get_root_logger, init_tracing, set_root_logger,
    LogEntry, LogLevel, Logger, RequestLogger,
};
pub use middleware::{ErrorResponder, ErrorResponse, HandlerError};
pub use options::ServerOptions;
pub use runtime::{AppEngineInfo, RuntimeMode};
pub use server::{run_until_interrupt, start_server, ServerHandle, ShutdownOutcome};
