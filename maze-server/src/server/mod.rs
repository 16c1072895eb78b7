//! Maze server - WebSocket front door for the maze generator.
//!
//! Architecture:
//! - One `AuditLog` per process, shared by the registry and the dispatcher
//! - Each WebSocket connection gets a session id and a dispatcher session
//! - Generator jobs run as tasks owned by their session
//! - Replies travel only through the requesting session's outbound queue
//!
//! Endpoints:
//! - WS / - Maze protocol (also at /ws)
//! - GET /* - Static visualizer assets, when a static directory is configured

mod connection;
mod registry;

use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
    Router,
};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tower_http::services::ServeDir;

use crate::audit::{AuditLog, EventKind};
use crate::dispatch::Dispatcher;
use crate::process::{GeneratorOptions, JobPool};

pub use registry::SessionRegistry;

/// Default listening port.
pub const DEFAULT_PORT: u16 = 8081;

/// Everything needed to start a server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// How to run the generator.
    pub generator: GeneratorOptions,
    /// Audit log location.
    pub log_file: PathBuf,
    /// Echo audit lines to stdout.
    pub echo_audit: bool,
    /// Server-wide cap on concurrent generator processes.
    pub max_concurrent_jobs: Option<usize>,
    /// In-flight jobs allowed per session.
    pub jobs_per_session: usize,
    /// Directory of static front-end files.
    pub static_dir: Option<PathBuf>,
    /// Send an error document when a job fails.
    pub reply_errors: bool,
}

/// Shared server state.
#[derive(Debug)]
pub struct ServerState {
    audit: Arc<AuditLog>,
    /// Live sessions.
    registry: SessionRegistry,
    /// Message handling and job execution.
    dispatcher: Dispatcher,
    /// Cancelled once the server starts shutting down.
    shutdown: CancellationToken,
    /// Connection tasks, counted from the upgrade request onwards.
    connections: TaskTracker,
}

impl ServerState {
    pub fn new(audit: Arc<AuditLog>, dispatcher: Dispatcher) -> Self {
        Self {
            registry: SessionRegistry::new(Arc::clone(&audit)),
            audit,
            dispatcher,
            shutdown: CancellationToken::new(),
            connections: TaskTracker::new(),
        }
    }
}

// === Server Lifecycle ===

/// Start the server and run until Ctrl-C or SIGTERM.
pub async fn start_server(config: ServerConfig) -> Result<()> {
    let audit = Arc::new(AuditLog::open(&config.log_file, config.echo_audit));

    let pool = JobPool::new(config.max_concurrent_jobs, config.jobs_per_session);
    let dispatcher = Dispatcher::new(Arc::clone(&audit), config.generator.clone(), pool)
        .with_error_replies(config.reply_errors);
    let state = Arc::new(ServerState::new(Arc::clone(&audit), dispatcher));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        generator = %config.generator.program,
        log_file = %audit.path().display(),
        "maze server listening"
    );

    serve(listener, state, config.static_dir, shutdown_signal()).await
}

/// Build the HTTP router.
pub fn router(state: Arc<ServerState>, static_dir: Option<PathBuf>) -> Router {
    let app = Router::new()
        .route("/", get(websocket_handler))
        .route("/ws", get(websocket_handler))
        .with_state(state);

    match static_dir {
        Some(dir) => app.fallback_service(ServeDir::new(dir)),
        None => app,
    }
}

/// Serve on an already-bound listener until `shutdown` resolves.
///
/// Records SERVER_STARTED once listening. On shutdown, stops accepting,
/// lets every open session finish its jobs and disconnect, and only then
/// records SERVER_STOPPED.
pub async fn serve(
    listener: tokio::net::TcpListener,
    state: Arc<ServerState>,
    static_dir: Option<PathBuf>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let addr: SocketAddr = listener.local_addr()?;
    state.audit.record(
        EventKind::ServerStarted,
        format!("WebSocket server initialized on port {}", addr.port()),
    );

    let closing = state.shutdown.clone();
    axum::serve(listener, router(Arc::clone(&state), static_dir))
        .with_graceful_shutdown(async move {
            shutdown.await;
            closing.cancel();
        })
        .await
        .context("Server error")?;

    // Upgraded sockets are no longer tracked by axum; wait for them here.
    state.shutdown.cancel();
    state.connections.close();
    if !state.registry.is_empty() {
        tracing::info!(
            sessions = state.registry.len(),
            "waiting for open sessions to finish"
        );
    }
    state.connections.wait().await;

    state.audit.record(EventKind::ServerStopped, "Server shutdown");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutting down");
}

// === Handlers ===

async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> impl IntoResponse {
    // Held until the connection ends. A failed upgrade drops it unused.
    let tracked = state.connections.token();
    ws.on_upgrade(move |socket| async move {
        connection::handle_connection(socket, state).await;
        drop(tracked);
    })
}
