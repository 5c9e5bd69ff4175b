//! Per-request logger installation and completion logging.

use std::task::{Context, Poll};
use std::time::Instant;

use http::{Request, Response};
use serde_json::{Map, Value};
use tower::{Layer, Service};
use tracing::Instrument;
use uuid::Uuid;

use crate::logger::{LogLevel, Logger, RequestLogger};

/// Header carrying a caller-supplied request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Google Cloud trace header, `TRACE_ID/SPAN_ID;o=OPTIONS`.
pub const TRACE_CONTEXT_HEADER: &str = "x-cloud-trace-context";

/// Tower layer that gives every request a child of `logger` and, when
/// enabled, logs each completed request.
#[derive(Clone)]
pub struct RequestLoggingLayer {
    logger: Logger,
    log_requests: bool,
}

impl RequestLoggingLayer {
    #[must_use]
    pub const fn new(logger: Logger, log_requests: bool) -> Self {
        Self {
            logger,
            log_requests,
        }
    }
}

impl<S> Layer<S> for RequestLoggingLayer {
    type Service = RequestLoggingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestLoggingService {
            inner,
            logger: self.logger.clone(),
            log_requests: self.log_requests,
        }
    }
}

/// Service produced by [`RequestLoggingLayer`].
#[derive(Clone)]
pub struct RequestLoggingService<S> {
    inner: S,
    logger: Logger,
    log_requests: bool,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for RequestLoggingService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    ReqBody: Send + 'static,
    ResBody: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let request_id = header_value(&req, REQUEST_ID_HEADER)
            .map_or_else(|| Uuid::new_v4().to_string(), str::to_owned);
        let trace_id = header_value(&req, TRACE_CONTEXT_HEADER).and_then(trace_id);
        let method = req.method().to_string();
        let path = req.uri().path().to_owned();

        let mut fields = Map::new();
        fields.insert("request_id".into(), Value::String(request_id.clone()));
        if let Some(trace_id) = trace_id {
            fields.insert("trace_id".into(), Value::String(trace_id));
        }
        let logger = self.logger.child(fields);
        req.extensions_mut().insert(RequestLogger(logger.clone()));

        let span = tracing::info_span!(
            "request",
            request_id = %request_id,
            method = %method,
            path = %path,
        );

        // Use the clone that was driven to readiness.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let log_requests = self.log_requests;
        let start = Instant::now();

        Box::pin(
            async move {
                let response = inner.call(req).await?;

                if log_requests {
                    let status = response.status();
                    let level = if status.is_server_error() {
                        LogLevel::Warn
                    } else {
                        LogLevel::Info
                    };
                    let mut fields = Map::new();
                    fields.insert("method".into(), Value::String(method.clone()));
                    fields.insert("path".into(), Value::String(path.clone()));
                    fields.insert("status".into(), Value::from(status.as_u16()));
                    fields.insert(
                        "duration_ms".into(),
                        Value::from(u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)),
                    );
                    logger.log(level, &format!("{method} {path} {}", status.as_u16()), fields);
                }

                Ok(response)
            }
            .instrument(span),
        )
    }
}

fn header_value<'a, B>(req: &'a Request<B>, name: &str) -> Option<&'a str> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

/// The trace id portion of an `x-cloud-trace-context` value.
fn trace_id(header: &str) -> Option<String> {
    header
        .split(['/', ';'])
        .next()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("105445aa7843bc8bf206b120001000/1;o=1", Some("105445aa7843bc8bf206b120001000"))]
    #[case("abc", Some("abc"))]
    #[case("/1;o=1", None)]
    fn parses_trace_id(#[case] header: &str, #[case] expected: Option<&str>) {
        assert_eq!(trace_id(header).as_deref(), expected);
    }
}
