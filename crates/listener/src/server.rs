//! HTTP surface: router, webhook handler and the serve loop.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::Router;
use thiserror::Error;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};
use welcome::{EventAction, EventDispatcher, EventOutcome, WelcomeEvent};

use crate::payload::{decode_event, HookKind};
use crate::signature::verify_token;

const EVENT_HEADER: &str = "X-Gitee-Event";
const TOKEN_HEADER: &str = "X-Gitee-Token";
const TIMESTAMP_HEADER: &str = "X-Gitee-Timestamp";
const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Receives decoded events. Each delivery runs on its own task.
#[async_trait]
pub trait EventSink: Send + Sync + 'static {
    async fn deliver(&self, event: WelcomeEvent);
}

#[async_trait]
impl EventSink for EventDispatcher {
    async fn deliver(&self, event: WelcomeEvent) {
        match self.handle(&event).await {
            Ok(EventOutcome::Completed { sig }) => {
                info!(repo = %event.repo, item = %event.item, sig = %sig, "welcome completed");
            }
            Ok(EventOutcome::Ignored) => {
                debug!(repo = %event.repo, item = %event.item, "event ignored");
            }
            Err(e) => {
                error!(repo = %event.repo, item = %event.item, error = %e, "welcome failed");
            }
        }
    }
}

/// Shared handler state: where events go and how deliveries are checked.
///
/// Every accepted delivery runs on a task owned by this state's tracker, so
/// [`serve`] can wait for in-flight deliveries before returning.
#[derive(Clone)]
pub struct AppState {
    sink: Arc<dyn EventSink>,
    secret: Arc<str>,
    tasks: TaskTracker,
    drain_timeout: Duration,
}

impl AppState {
    pub fn new(sink: Arc<dyn EventSink>, secret: impl Into<Arc<str>>) -> Self {
        Self {
            sink,
            secret: secret.into(),
            tasks: TaskTracker::new(),
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }

    /// How long [`serve`] waits for in-flight deliveries after shutdown.
    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Number of deliveries still running.
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }
}

/// Failures of the listener itself; delivery failures are only logged.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The listen address could not be bound.
    #[error("cannot bind {address}: {source}")]
    Bind {
        address: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// The accept loop stopped with an I/O error.
    #[error("webhook server failed: {0}")]
    Serve(#[source] std::io::Error),
}

/// The webhook and health routes over `state`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/webhook", post(webhook))
        .route("/health", get(health))
        .with_state(state)
}

/// Binds `address` and runs [`serve_on`].
///
/// # Errors
///
/// Returns [`ListenerError`] if the address cannot be bound or the server
/// stops with an I/O error.
pub async fn serve<F>(address: SocketAddr, state: AppState, shutdown: F) -> Result<(), ListenerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|source| ListenerError::Bind { address, source })?;
    serve_on(listener, state, shutdown).await
}

/// Serves [`router`] on `listener` until `shutdown` resolves, then waits up
/// to the drain timeout for accepted deliveries to finish.
///
/// # Errors
///
/// Returns [`ListenerError::Serve`] if the server stops with an I/O error.
/// In-flight deliveries are still drained in that case.
pub async fn serve_on<F>(
    listener: tokio::net::TcpListener,
    state: AppState,
    shutdown: F,
) -> Result<(), ListenerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(address) = listener.local_addr() {
        info!(%address, "webhook listener started");
    }
    let tasks = state.tasks.clone();
    let drain_timeout = state.drain_timeout;

    let served = axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(ListenerError::Serve);

    drain(&tasks, drain_timeout).await;
    served
}

async fn drain(tasks: &TaskTracker, timeout: Duration) {
    tasks.close();
    if tasks.is_empty() {
        return;
    }
    info!(pending = tasks.len(), "waiting for in-flight deliveries");
    if tokio::time::timeout(timeout, tasks.wait()).await.is_err() {
        warn!(
            pending = tasks.len(),
            timeout_secs = timeout.as_secs_f64(),
            "in-flight deliveries did not finish before the drain timeout"
        );
    }
}

async fn health() -> StatusCode {
    StatusCode::OK
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

async fn webhook(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> StatusCode {
    let token = header(&headers, TOKEN_HEADER).unwrap_or_default();
    if !verify_token(&state.secret, token, header(&headers, TIMESTAMP_HEADER)) {
        warn!("rejected webhook delivery with an invalid token");
        return StatusCode::UNAUTHORIZED;
    }

    let Some(kind) = header(&headers, EVENT_HEADER).and_then(HookKind::from_header) else {
        debug!(event = ?header(&headers, EVENT_HEADER), "unhandled webhook event");
        return StatusCode::OK;
    };

    let event = match decode_event(kind, &body) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, ?kind, "cannot decode webhook payload");
            return StatusCode::BAD_REQUEST;
        }
    };

    if let EventAction::Other(action) = &event.action {
        debug!(repo = %event.repo, item = %event.item, %action, "ignoring non-open action");
        return StatusCode::OK;
    }

    let sink = state.sink.clone();
    state.tasks.spawn(async move { sink.deliver(event).await });
    StatusCode::ACCEPTED
}
