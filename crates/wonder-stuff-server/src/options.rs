//! Start-up options for [`start_server`](crate::start_server).

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::app::WarmUpHandler;
use crate::middleware::ErrorResponder;
use crate::runtime::{AppEngineInfo, RuntimeMode};

/// Header read timeout minus keep-alive timeout. Must stay positive.
pub const HEADERS_TIMEOUT_MARGIN: Duration = Duration::from_secs(5);

/// Default idle keep-alive timeout. Must exceed the load balancer's 60s.
pub const DEFAULT_KEEP_ALIVE_TIMEOUT: Duration = Duration::from_secs(90);

/// How a service is started and what it serves besides its own routes.
#[derive(Clone)]
pub struct ServerOptions {
    /// Service name, used in log messages and for the root logger.
    pub name: String,

    /// Interface to bind.
    pub host: String,

    /// Port to bind. `0` picks a free port.
    pub port: u16,

    /// How long an idle keep-alive connection stays open.
    pub keep_alive_timeout: Duration,

    /// Whether every request is logged on completion.
    pub request_logging: bool,

    /// Runtime mode; production hides error details from responses.
    pub mode: RuntimeMode,

    /// App Engine identity reported by the version route.
    pub app_engine: AppEngineInfo,

    /// Called by the warm-up route. Without one the route just succeeds.
    pub warm_up: Option<Arc<dyn WarmUpHandler>>,

    /// Renders handler errors instead of the default response.
    pub error_responder: Option<Arc<dyn ErrorResponder>>,
}

impl ServerOptions {
    /// Defaults: `0.0.0.0:8080`, 90s keep-alive, request logging on.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: "0.0.0.0".to_owned(),
            port: 8080,
            keep_alive_timeout: DEFAULT_KEEP_ALIVE_TIMEOUT,
            request_logging: true,
            mode: RuntimeMode::default(),
            app_engine: AppEngineInfo::default(),
            warm_up: None,
            error_responder: None,
        }
    }

    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub const fn with_keep_alive_timeout(mut self, timeout: Duration) -> Self {
        self.keep_alive_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_request_logging(mut self, enabled: bool) -> Self {
        self.request_logging = enabled;
        self
    }

    #[must_use]
    pub const fn with_mode(mut self, mode: RuntimeMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_warm_up(mut self, handler: impl WarmUpHandler) -> Self {
        self.warm_up = Some(Arc::new(handler));
        self
    }

    #[must_use]
    pub fn with_error_responder(mut self, responder: impl ErrorResponder) -> Self {
        self.error_responder = Some(Arc::new(responder));
        self
    }

    /// Maximum time to receive a request's headers.
    #[must_use]
    pub fn headers_timeout(&self) -> Duration {
        self.keep_alive_timeout + HEADERS_TIMEOUT_MARGIN
    }

    pub(crate) fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for ServerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerOptions")
            .field("name", &self.name)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("keep_alive_timeout", &self.keep_alive_timeout)
            .field("request_logging", &self.request_logging)
            .field("mode", &self.mode)
            .field("app_engine", &self.app_engine)
            .field("warm_up", &self.warm_up.is_some())
            .field("error_responder", &self.error_responder.is_some())
            .finish()
    }
}
