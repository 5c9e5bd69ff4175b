//! Router-level tests for the common routes and middleware.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::routing::get;
use axum::Router;
use http::{Request, StatusCode};
use http_body_util::BodyExt;
use rstest::{fixture, rstest};
use tower::ServiceExt;
use wonder_stuff_core::{ErrorKind, KindError};
use wonder_stuff_server::{
    make_common_service_app, AppEngineInfo, ErrorResponse, HandlerError, Logger, RequestLogger,
    RuntimeMode, ServerOptions, WarmUpHandler,
};

#[fixture]
fn options() -> ServerOptions {
    let mut options = ServerOptions::new("test-service").with_mode(RuntimeMode::Test);
    options.app_engine = AppEngineInfo {
        version: "v123".to_owned(),
        ..AppEngineInfo::default()
    };
    options
}

async fn failing_handler() -> Result<&'static str, HandlerError> {
    Err(KindError::new("database exploded", ErrorKind::INTERNAL).into())
}

async fn logger_name(RequestLogger(logger): RequestLogger) -> String {
    format!("{}:{}", logger.name(), logger.fields().contains_key("request_id"))
}

fn app_routes() -> Router {
    Router::new()
        .route("/fail", get(failing_handler))
        .route("/logger", get(logger_name))
}

async fn get_body(app: Router, uri: &str) -> (StatusCode, String) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

#[rstest]
#[tokio::test]
async fn ping_responds_pong(options: ServerOptions) {
    let app = make_common_service_app(app_routes(), &options, &Logger::new("test"));

    let (status, body) = get_body(app, "/_api/ping").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "pong\n");
}

#[rstest]
#[tokio::test]
async fn version_reports_app_engine_version(options: ServerOptions) {
    let app = make_common_service_app(app_routes(), &options, &Logger::new("test"));

    let (status, body) = get_body(app, "/_api/version").await;

    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json, serde_json::json!({ "version": "v123" }));
}

struct CountingWarmUp(Arc<AtomicUsize>);

#[async_trait]
impl WarmUpHandler for CountingWarmUp {
    async fn warm_up(&self, _logger: &Logger) -> Result<(), KindError> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct FailingWarmUp;

#[async_trait]
impl WarmUpHandler for FailingWarmUp {
    async fn warm_up(&self, _logger: &Logger) -> Result<(), KindError> {
        Err(KindError::new("cache unavailable", ErrorKind::INTERNAL))
    }
}

#[rstest]
#[tokio::test]
async fn warmup_runs_handler_then_ok(options: ServerOptions) {
    let calls = Arc::new(AtomicUsize::new(0));
    let options = options.with_warm_up(CountingWarmUp(Arc::clone(&calls)));
    let app = make_common_service_app(app_routes(), &options, &Logger::new("test"));

    let (status, body) = get_body(app, "/_ah/warmup").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK\n");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[rstest]
#[tokio::test]
async fn warmup_without_handler_is_ok(options: ServerOptions) {
    let app = make_common_service_app(app_routes(), &options, &Logger::new("test"));

    let (status, body) = get_body(app, "/_ah/warmup").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK\n");
}

#[rstest]
#[tokio::test]
async fn failed_warmup_is_an_error_response(options: ServerOptions) {
    let options = options.with_warm_up(FailingWarmUp);
    let app = make_common_service_app(app_routes(), &options, &Logger::new("test"));

    let (status, body) = get_body(app, "/_ah/warmup").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("cache unavailable"));
}

#[rstest]
#[tokio::test]
async fn handlers_get_a_request_scoped_logger(options: ServerOptions) {
    let app = make_common_service_app(app_routes(), &options, &Logger::new("root"));

    let (status, body) = get_body(app, "/logger").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "root:true");
}

#[rstest]
#[case::test(RuntimeMode::Test, true)]
#[case::development(RuntimeMode::Development, true)]
#[case::production(RuntimeMode::Production, false)]
#[tokio::test]
async fn default_error_response_detail_depends_on_mode(
    options: ServerOptions,
    #[case] mode: RuntimeMode,
    #[case] shows_detail: bool,
) {
    let options = options.with_mode(mode);
    let app = make_common_service_app(app_routes(), &options, &Logger::new("test"));

    let (status, body) = get_body(app, "/fail").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body.contains("database exploded"), shows_detail);
}

#[rstest]
#[tokio::test]
async fn custom_responder_renders_errors(options: ServerOptions) {
    let options = options.with_error_responder(
        |error: &KindError, _logger: &Logger| -> Result<ErrorResponse, KindError> {
            Ok(ErrorResponse::new(
                StatusCode::SERVICE_UNAVAILABLE,
                format!("custom: {}", error.kind()),
            ))
        },
    );
    let app = make_common_service_app(app_routes(), &options, &Logger::new("test"));

    let (status, body) = get_body(app, "/fail").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, "custom: Internal");
}

#[rstest]
#[tokio::test]
async fn failing_responder_falls_back_to_default(options: ServerOptions) {
    let options = options.with_error_responder(
        |_: &KindError, _: &Logger| -> Result<ErrorResponse, KindError> {
            Err(KindError::new("responder broke", ErrorKind::INTERNAL))
        },
    );
    let app = make_common_service_app(app_routes(), &options, &Logger::new("test"));

    let (status, body) = get_body(app, "/fail").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("database exploded"));
    assert!(!body.contains("responder broke"));
}

#[rstest]
#[tokio::test]
async fn panicking_responder_falls_back_to_default(options: ServerOptions) {
    let options = options.with_error_responder(
        |_: &KindError, _: &Logger| -> Result<ErrorResponse, KindError> {
            panic!("responder panicked")
        },
    );
    let app = make_common_service_app(app_routes(), &options, &Logger::new("test"));

    let (status, body) = get_body(app, "/fail").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("database exploded"));
}

#[rstest]
#[tokio::test]
async fn unknown_routes_are_untouched(options: ServerOptions) {
    let app = make_common_service_app(app_routes(), &options, &Logger::new("test"));

    let (status, _) = get_body(app, "/missing").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}
