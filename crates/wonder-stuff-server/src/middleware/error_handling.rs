//! Turning handler errors into logged, sanitised responses.
//!
//! Handlers return [`HandlerError`]. Its response carries the error to
//! [`ErrorHandlingLayer`], which logs it with the request logger and
//! renders the final response, optionally through a custom
//! [`ErrorResponder`].

use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::response::IntoResponse;
use http::{HeaderMap, Request, Response, StatusCode};
use serde_json::{Map, Value};
use tower::{Layer, Service};
use wonder_stuff_core::KindError;

use crate::logger::{extract_error, get_root_logger, Logger, RequestLogger};
use crate::runtime::RuntimeMode;

/// Error returned from handlers.
#[derive(Debug)]
pub struct HandlerError(pub KindError);

impl HandlerError {
    #[must_use]
    pub const fn error(&self) -> &KindError {
        &self.0
    }
}

impl From<KindError> for HandlerError {
    fn from(error: KindError) -> Self {
        Self(error)
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for HandlerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

/// Carries a handler error from its response to [`ErrorHandlingLayer`].
#[derive(Clone)]
struct CapturedError(Arc<KindError>);

impl IntoResponse for HandlerError {
    fn into_response(self) -> axum::response::Response {
        let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
        response
            .extensions_mut()
            .insert(CapturedError(Arc::new(self.0)));
        response
    }
}

/// A response produced by an [`ErrorResponder`].
#[derive(Debug, Clone)]
pub struct ErrorResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl ErrorResponse {
    #[must_use]
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> axum::response::Response {
        (self.status, self.headers, self.body).into_response()
    }
}

/// Custom rendering of handler errors.
///
/// If this returns an error or panics, both the original and the
/// responder's failure are logged and the default response is sent.
pub trait ErrorResponder: Send + Sync + 'static {
    fn respond(&self, error: &KindError, logger: &Logger) -> Result<ErrorResponse, KindError>;
}

impl<F> ErrorResponder for F
where
    F: Fn(&KindError, &Logger) -> Result<ErrorResponse, KindError> + Send + Sync + 'static,
{
    fn respond(&self, error: &KindError, logger: &Logger) -> Result<ErrorResponse, KindError> {
        self(error, logger)
    }
}

/// Tower layer that logs and renders [`HandlerError`]s.
#[derive(Clone)]
pub struct ErrorHandlingLayer {
    responder: Option<Arc<dyn ErrorResponder>>,
    mode: RuntimeMode,
}

impl ErrorHandlingLayer {
    #[must_use]
    pub fn new(mode: RuntimeMode) -> Self {
        Self {
            responder: None,
            mode,
        }
    }

    #[must_use]
    pub fn with_responder(mut self, responder: Option<Arc<dyn ErrorResponder>>) -> Self {
        self.responder = responder;
        self
    }
}

impl<S> Layer<S> for ErrorHandlingLayer {
    type Service = ErrorHandlingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ErrorHandlingService {
            inner,
            responder: self.responder.clone(),
            mode: self.mode,
        }
    }
}

/// Service produced by [`ErrorHandlingLayer`].
#[derive(Clone)]
pub struct ErrorHandlingService<S> {
    inner: S,
    responder: Option<Arc<dyn ErrorResponder>>,
    mode: RuntimeMode,
}

impl<S, ReqBody> Service<Request<ReqBody>> for ErrorHandlingService<S>
where
    S: Service<Request<ReqBody>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send,
    ReqBody: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let logger = req
            .extensions()
            .get::<RequestLogger>()
            .map(|RequestLogger(logger)| logger.clone())
            .or_else(get_root_logger);
        let responder = self.responder.clone();
        let mode = self.mode;

        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let mut response = inner.call(req).await?;
            let Some(CapturedError(error)) = response.extensions_mut().remove::<CapturedError>()
            else {
                return Ok(response);
            };

            let logger = logger.unwrap_or_else(|| Logger::new(env!("CARGO_PKG_NAME")));
            logger.log_error("Request failed", &error);
            Ok(render_error(&error, responder.as_deref(), &logger, mode))
        })
    }
}

fn render_error(
    error: &KindError,
    responder: Option<&dyn ErrorResponder>,
    logger: &Logger,
    mode: RuntimeMode,
) -> Response<Body> {
    if let Some(responder) = responder {
        match catch_unwind(AssertUnwindSafe(|| responder.respond(error, logger))) {
            Ok(Ok(custom)) => return custom.into_response(),
            Ok(Err(failure)) => {
                let mut fields = Map::new();
                fields.insert("original".into(), Value::Object(extract_error(error)));
                fields.insert("responder".into(), Value::Object(extract_error(&failure)));
                logger.error("Error responder failed", fields);
            }
            Err(panic) => {
                let mut fields = Map::new();
                fields.insert("original".into(), Value::Object(extract_error(error)));
                fields.insert("responder".into(), Value::String(panic_message(&*panic)));
                logger.error("Error responder panicked", fields);
            }
        }
    }
    default_response(error, mode)
}

/// Details are only shown outside production.
fn default_response(error: &KindError, mode: RuntimeMode) -> Response<Body> {
    let body = match mode {
        RuntimeMode::Production => "Internal Server Error\n".to_owned(),
        RuntimeMode::Development | RuntimeMode::Test => format!("{error}\n"),
    };
    (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_owned())
}
