//! Listener lifecycle: start, serve connections, graceful shutdown.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::ConnectInfo;
use axum::Router;
use http::Request;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper_util::rt::{TokioIo, TokioTimer};
use parking_lot::Mutex;
use serde_json::Map;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tower::ServiceExt;
use wonder_stuff_core::{ErrorKind, KindError};

use crate::app::make_common_service_app;
use crate::connections::{ConnectionGuard, ConnectionTracker};
use crate::fields;
use crate::logger::{root_logger_or_init, Logger};
use crate::options::ServerOptions;

/// Pause after a failed `accept()` before trying again.
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy)]
struct ConnectionTimeouts {
    keep_alive: Duration,
    headers: Duration,
}

/// A running server.
#[derive(Debug)]
pub struct ServerHandle {
    local_addr: SocketAddr,
    stop_accepting: CancellationToken,
    accept_task: JoinHandle<()>,
    connection_tasks: TaskTracker,
    connections: ConnectionTracker,
    logger: Logger,
}

/// Result of [`ServerHandle::shutdown`].
#[derive(Debug)]
pub enum ShutdownOutcome {
    /// Every connection closed and the listener stopped without error.
    Clean { destroyed: usize },
    /// The listener task failed; connections were still closed.
    Failed { destroyed: usize, error: KindError },
}

impl ShutdownOutcome {
    /// Process exit code: 0 when clean, 1 otherwise.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Clean { .. } => 0,
            Self::Failed { .. } => 1,
        }
    }

    /// Number of connections that were open when shutdown began.
    #[must_use]
    pub const fn destroyed(&self) -> usize {
        match self {
            Self::Clean { destroyed } | Self::Failed { destroyed, .. } => *destroyed,
        }
    }
}

/// Bind and start serving `app` with the common routes and middleware.
///
/// Uses the existing root logger, or installs one named after the service.
/// Returns `None` after logging the failure if the listener cannot be
/// bound.
pub async fn start_server(options: ServerOptions, app: Router) -> Option<ServerHandle> {
    let logger = root_logger_or_init(&options.name);
    let address = options.address();

    let listener = match TcpListener::bind(&address).await {
        Ok(listener) => listener,
        Err(e) => {
            logger.error(
                &format!("{} failed to start", options.name),
                fields! { "address" => address, "error" => e.to_string() },
            );
            return None;
        }
    };
    let local_addr = match listener.local_addr() {
        Ok(addr) => addr,
        Err(e) => {
            logger.error(
                &format!("{} failed to start", options.name),
                fields! { "address" => address, "error" => e.to_string() },
            );
            return None;
        }
    };

    let timeouts = ConnectionTimeouts {
        keep_alive: options.keep_alive_timeout,
        headers: options.headers_timeout(),
    };
    logger.info(
        &format!("{} running", options.name),
        fields! {
            "address" => local_addr.to_string(),
            "mode" => options.mode.as_str(),
            "keep_alive_timeout_ms" => millis(timeouts.keep_alive),
            "headers_timeout_ms" => millis(timeouts.headers),
        },
    );

    let app = make_common_service_app(app, &options, &logger);
    let stop_accepting = CancellationToken::new();
    let connection_tasks = TaskTracker::new();
    let connections = ConnectionTracker::new();

    let accept_task = tokio::spawn(accept_loop(
        listener,
        app,
        AcceptContext {
            stop: stop_accepting.clone(),
            tasks: connection_tasks.clone(),
            connections: connections.clone(),
            timeouts,
            logger: logger.clone(),
        },
    ));

    Some(ServerHandle {
        local_addr,
        stop_accepting,
        accept_task,
        connection_tasks,
        connections,
        logger,
    })
}

impl ServerHandle {
    /// The bound address, with the real port when `0` was requested.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Connections currently open.
    #[must_use]
    pub const fn connections(&self) -> &ConnectionTracker {
        &self.connections
    }

    /// Stop accepting, close every open connection, and wait for
    /// connection tasks to finish.
    pub async fn shutdown(self) -> ShutdownOutcome {
        self.logger.info(
            "Gracefully shutting down server",
            fields! { "open_connections" => self.connections.len() },
        );

        self.stop_accepting.cancel();
        let accept_result = self.accept_task.await;

        let destroyed = self.connections.destroy_all();
        self.connection_tasks.close();
        self.connection_tasks.wait().await;

        match accept_result {
            Ok(()) => {
                self.logger
                    .info("Server closed", fields! { "destroyed_connections" => destroyed });
                ShutdownOutcome::Clean { destroyed }
            }
            Err(e) => {
                let error = KindError::builder("Server did not close cleanly", ErrorKind::INTERNAL)
                    .opaque_cause(e)
                    .build();
                self.logger.log_error("Error closing server", &error);
                ShutdownOutcome::Failed { destroyed, error }
            }
        }
    }

    /// Wait for `signal`, then shut down.
    pub async fn shutdown_on<F>(self, signal: F) -> ShutdownOutcome
    where
        F: Future<Output = ()>,
    {
        signal.await;
        self.shutdown().await
    }
}

/// Serve until SIGINT, shut down, and return the process exit code.
pub async fn run_until_interrupt(handle: ServerHandle) -> i32 {
    let logger = handle.logger.clone();
    let mut install_failed = false;
    let outcome = handle
        .shutdown_on(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => logger.info("SIGINT received", Map::new()),
                Err(e) => {
                    install_failed = true;
                    logger.error(
                        "Failed to install SIGINT handler",
                        fields! { "error" => e.to_string() },
                    );
                }
            }
        })
        .await;

    if install_failed {
        1
    } else {
        outcome.exit_code()
    }
}

struct AcceptContext {
    stop: CancellationToken,
    tasks: TaskTracker,
    connections: ConnectionTracker,
    timeouts: ConnectionTimeouts,
    logger: Logger,
}

async fn accept_loop(listener: TcpListener, app: Router, ctx: AcceptContext) {
    loop {
        let (stream, remote) = tokio::select! {
            () = ctx.stop.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    ctx.logger.warn(
                        "Failed to accept connection",
                        fields! { "error" => e.to_string() },
                    );
                    if accept_backoff(&ctx.stop).await {
                        continue;
                    }
                    break;
                }
            },
        };

        let guard = ctx.connections.track(remote);
        ctx.tasks.spawn(serve_connection(
            stream,
            remote,
            app.clone(),
            guard,
            ctx.timeouts,
        ));
    }
}

/// Wait before retrying a failed accept. False if shutdown began meanwhile.
async fn accept_backoff(stop: &CancellationToken) -> bool {
    tokio::select! {
        () = stop.cancelled() => false,
        () = tokio::time::sleep(ACCEPT_RETRY_DELAY) => true,
    }
}

async fn serve_connection(
    stream: TcpStream,
    remote: SocketAddr,
    app: Router,
    guard: ConnectionGuard,
    timeouts: ConnectionTimeouts,
) {
    let activity = Arc::new(Activity::new());

    let service = {
        let activity = Arc::clone(&activity);
        hyper::service::service_fn(move |mut req: Request<Incoming>| {
            req.extensions_mut().insert(ConnectInfo(remote));
            let busy = activity.begin();
            let app = app.clone();
            async move {
                let response = app.oneshot(req).await;
                drop(busy);
                response
            }
        })
    };

    let mut builder = http1::Builder::new();
    builder
        .timer(TokioTimer::new())
        .header_read_timeout(timeouts.headers)
        .keep_alive(true);
    let connection = builder.serve_connection(TokioIo::new(stream), service);
    tokio::pin!(connection);

    let mut closing = false;
    loop {
        let idle_deadline =
            tokio::time::Instant::from_std(activity.idle_deadline(timeouts.keep_alive));
        tokio::select! {
            result = connection.as_mut() => {
                if let Err(e) = result {
                    tracing::debug!(%remote, error = %e, "Connection ended with error");
                }
                break;
            }
            () = guard.destroyed() => break,
            () = tokio::time::sleep_until(idle_deadline), if !closing => {
                if activity.is_idle_for(timeouts.keep_alive) {
                    tracing::debug!(%remote, "Closing idle connection");
                    connection.as_mut().graceful_shutdown();
                    closing = true;
                }
            }
        }
    }
}

/// In-flight request count and last activity time for one connection.
struct Activity {
    in_flight: AtomicUsize,
    last_active: Mutex<Instant>,
}

impl Activity {
    fn new() -> Self {
        Self {
            in_flight: AtomicUsize::new(0),
            last_active: Mutex::new(Instant::now()),
        }
    }

    fn begin(self: &Arc<Self>) -> Busy {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        Busy(Arc::clone(self))
    }

    /// When the connection would next become idle for `timeout`.
    fn idle_deadline(&self, timeout: Duration) -> Instant {
        if self.in_flight.load(Ordering::SeqCst) > 0 {
            Instant::now() + timeout
        } else {
            *self.last_active.lock() + timeout
        }
    }

    fn is_idle_for(&self, timeout: Duration) -> bool {
        self.in_flight.load(Ordering::SeqCst) == 0 && self.last_active.lock().elapsed() >= timeout
    }
}

struct Busy(Arc<Activity>);

impl Drop for Busy {
    fn drop(&mut self) {
        *self.0.last_active.lock() = Instant::now();
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
