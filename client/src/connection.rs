//! Reconnecting connection manager.
//!
//! One [`ConnectionManager`] is built at application start and handed to every
//! store that needs realtime events. It owns the event registry and a single
//! background task that runs the socket:
//!
//! ```text
//! connect()
//!   └── worker task
//!         ├── Connector::open ──ok──> session loop (frames -> registry, outbound queue -> sink)
//!         │        │                         │
//!         │       err                  lost / closed
//!         │        └──────────┬──────────────┘
//!         │             Lifecycle::Lost
//!         │                   │
//!         │     ReconnectPolicy::next_delay(attempt)
//!         │         Some(d) ─> sleep d, retry      None ─> Failed, task ends
//!         └── shutdown (disconnect) ─> close sink, task ends
//! ```
//!
//! Only one worker runs at a time, so there is never more than one pending
//! retry timer. Outbound frames are best-effort: while the socket is down
//! `emit` returns [`TransportError::NotConnected`] and the frame is dropped.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use shared::types::{ClientConfig, ServerFrame};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::TransportError;
use crate::reconnect::{FixedDelay, ReconnectPolicy};
use crate::registry::{Event, EventKey, EventRegistry, LifecycleEvent, Subscription};
use crate::transport::{ConnectParams, Connector, FrameSink, FrameStream, WsConnector, WsFrame};

/// How long `disconnect` waits for the worker to send its close frame.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// Connection state as observed from outside the worker.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Never connected, or between losing a session and deciding whether to
    /// retry.
    #[default]
    Disconnected,
    /// Attempting to open the socket.
    Connecting,
    /// Open and ready.
    Connected,
    /// Waiting before the next retry.
    Reconnecting {
        /// Retry number about to be made (1-based).
        attempt: u32,
        /// Milliseconds until the retry.
        next_retry_ms: u64,
    },
    /// Retries exhausted. Call `connect()` to start over.
    Failed,
    /// Torn down by `disconnect()`.
    Closed,
}

type OutboundSlot = Arc<Mutex<Option<mpsc::UnboundedSender<String>>>>;

struct RunningTask {
    handle: JoinHandle<()>,
    shutdown: oneshot::Sender<()>,
    /// Set by the worker before it publishes `Failed`; the task may still be
    /// unwinding after that.
    given_up: Arc<AtomicBool>,
}

struct ManagerInner {
    params: Mutex<ConnectParams>,
    connector: Arc<dyn Connector>,
    policy: Arc<dyn ReconnectPolicy>,
    registry: EventRegistry,
    state: Arc<watch::Sender<ConnectionState>>,
    outbound: OutboundSlot,
    task: Mutex<Option<RunningTask>>,
}

impl Drop for ManagerInner {
    fn drop(&mut self) {
        let task = self.task.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(running) = task.take() {
            running.handle.abort();
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Cheaply cloneable handle; all clones drive the same socket.
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<ManagerInner>,
}

impl fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("url", &lock(&self.inner.params).url)
            .field("state", &self.status())
            .field("policy", &self.inner.policy)
            .finish()
    }
}

impl ConnectionManager {
    pub fn new(
        params: ConnectParams,
        connector: Arc<dyn Connector>,
        policy: Arc<dyn ReconnectPolicy>,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            inner: Arc::new(ManagerInner {
                params: Mutex::new(params),
                connector,
                policy,
                registry: EventRegistry::new(),
                state: Arc::new(state),
                outbound: Arc::new(Mutex::new(None)),
                task: Mutex::new(None),
            }),
        }
    }

    /// Production manager: WebSocket transport plus the configured fixed-delay
    /// policy.
    pub fn from_config(config: &ClientConfig, identity: Option<String>) -> Self {
        let params = ConnectParams::new(config.server.websocket_url(), config.identity.role)
            .with_token(config.auth.resolved_token())
            .with_identity(identity.or_else(|| config.identity.user_id.clone()))
            .with_channel_token(config.identity.channel_token.clone());
        Self::new(
            params,
            Arc::new(WsConnector),
            Arc::new(FixedDelay::from(&config.reconnect)),
        )
    }

    pub fn registry(&self) -> &EventRegistry {
        &self.inner.registry
    }

    /// Shorthand for `registry().on(...)`.
    pub fn on<F>(&self, key: EventKey, handler: F) -> Subscription
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.inner.registry.on(key, handler)
    }

    pub fn status(&self) -> ConnectionState {
        self.inner.state.borrow().clone()
    }

    pub fn is_connected(&self) -> bool {
        matches!(*self.inner.state.borrow(), ConnectionState::Connected)
    }

    pub fn watch_status(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    /// Replace the bearer token used by the next connection attempt.
    pub fn set_token(&self, token: Option<String>) {
        lock(&self.inner.params).token = token;
    }

    /// Start the connection task. No-op while a task is already running.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn connect(&self) {
        let mut task = lock(&self.inner.task);
        if let Some(running) = task.as_ref() {
            let done = running.given_up.load(Ordering::SeqCst) || running.handle.is_finished();
            if !done {
                debug!("connect() ignored: connection task already running");
                return;
            }
        }

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let given_up = Arc::new(AtomicBool::new(false));
        let worker = Worker {
            params: lock(&self.inner.params).clone(),
            connector: Arc::clone(&self.inner.connector),
            policy: Arc::clone(&self.inner.policy),
            registry: self.inner.registry.clone(),
            state: Arc::clone(&self.inner.state),
            outbound: Arc::clone(&self.inner.outbound),
            given_up: Arc::clone(&given_up),
        };
        let handle = tokio::spawn(worker.run(shutdown_rx));
        *task = Some(RunningTask {
            handle,
            shutdown: shutdown_tx,
            given_up,
        });
    }

    /// Send an event to the server.
    ///
    /// Best-effort: returns `NotConnected` and drops the frame while the
    /// socket is down. Nothing is queued for later.
    pub fn emit<T: Serialize>(&self, event: &str, payload: &T) -> Result<(), TransportError> {
        if !self.is_connected() {
            debug!("Dropping outbound {} while disconnected", event);
            return Err(TransportError::NotConnected);
        }
        let data = serde_json::to_value(payload)
            .map_err(|e| TransportError::SendFailed(format!("encode {event}: {e}")))?;
        let text = ServerFrame::new(event, data)
            .to_text()
            .map_err(|e| TransportError::SendFailed(format!("encode {event}: {e}")))?;

        let slot = lock(&self.inner.outbound);
        match slot.as_ref() {
            Some(tx) => tx.send(text).map_err(|_| TransportError::NotConnected),
            None => Err(TransportError::NotConnected),
        }
    }

    /// Tear down the connection and cancel any pending retry.
    pub async fn disconnect(&self) {
        let running = lock(&self.inner.task).take();
        if let Some(RunningTask {
            mut handle,
            shutdown,
            ..
        }) = running
        {
            // Err means the worker already exited.
            let _ = shutdown.send(());
            if tokio::time::timeout(SHUTDOWN_GRACE, &mut handle).await.is_err() {
                warn!("Connection task did not stop in time; aborting");
                handle.abort();
            }
        }

        lock(&self.inner.outbound).take();
        let previous = self.inner.state.send_replace(ConnectionState::Closed);
        if previous != ConnectionState::Closed {
            info!("Connection closed");
            self.inner
                .registry
                .dispatch(&Event::Lifecycle(LifecycleEvent::Closed));
        }
    }
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

enum SessionEnd {
    Shutdown,
    Lost(String),
}

struct Worker {
    params: ConnectParams,
    connector: Arc<dyn Connector>,
    policy: Arc<dyn ReconnectPolicy>,
    registry: EventRegistry,
    state: Arc<watch::Sender<ConnectionState>>,
    outbound: OutboundSlot,
    given_up: Arc<AtomicBool>,
}

impl Worker {
    async fn run(self, mut shutdown: oneshot::Receiver<()>) {
        let mut attempt: u32 = 0;

        loop {
            self.state.send_replace(ConnectionState::Connecting);

            let opened = tokio::select! {
                res = self.connector.open(&self.params) => res,
                _ = &mut shutdown => {
                    debug!("Shutdown during connect");
                    return;
                }
            };

            let reason = match opened {
                Ok((sink, stream)) => {
                    info!("Connected to {}", self.params.url);
                    attempt = 0;

                    let (tx, rx) = mpsc::unbounded_channel();
                    *lock(&self.outbound) = Some(tx);
                    self.state.send_replace(ConnectionState::Connected);
                    self.registry
                        .dispatch(&Event::Lifecycle(LifecycleEvent::Established));

                    let end = self.run_session(sink, stream, rx, &mut shutdown).await;
                    lock(&self.outbound).take();
                    match end {
                        SessionEnd::Shutdown => return,
                        SessionEnd::Lost(reason) => reason,
                    }
                }
                Err(e) => e.to_string(),
            };

            warn!("Connection to {} lost: {}", self.params.url, reason);
            self.state.send_replace(ConnectionState::Disconnected);
            self.registry
                .dispatch(&Event::Lifecycle(LifecycleEvent::Lost { reason }));

            let Some(delay) = self.policy.next_delay(attempt) else {
                warn!("Giving up on {} after {} retries", self.params.url, attempt);
                self.registry
                    .dispatch(&Event::Lifecycle(LifecycleEvent::Failed { attempts: attempt }));
                // Anyone who sees Failed must be able to connect() again.
                self.given_up.store(true, Ordering::SeqCst);
                self.state.send_replace(ConnectionState::Failed);
                return;
            };

            attempt += 1;
            self.state.send_replace(ConnectionState::Reconnecting {
                attempt,
                next_retry_ms: u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            });
            info!(
                "Reconnecting to {} in {:.1}s (attempt {})",
                self.params.url,
                delay.as_secs_f32(),
                attempt
            );

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = &mut shutdown => {
                    debug!("Shutdown during reconnect backoff");
                    return;
                }
            }
        }
    }

    /// Pump frames until the socket closes or shutdown is requested.
    async fn run_session(
        &self,
        mut sink: Box<dyn FrameSink>,
        mut stream: Box<dyn FrameStream>,
        mut outbound: mpsc::UnboundedReceiver<String>,
        shutdown: &mut oneshot::Receiver<()>,
    ) -> SessionEnd {
        loop {
            tokio::select! {
                Some(text) = outbound.recv() => {
                    if let Err(e) = sink.send_text(text).await {
                        return SessionEnd::Lost(e.to_string());
                    }
                }

                frame = stream.next_frame() => match frame {
                    Some(Ok(WsFrame::Text(text))) => self.handle_text(&text),
                    Some(Ok(WsFrame::Ping(data))) => {
                        if sink.send_pong(data).await.is_err() {
                            return SessionEnd::Lost("failed to answer ping".into());
                        }
                    }
                    Some(Ok(WsFrame::Pong(_))) => {}
                    Some(Ok(WsFrame::Binary(data))) => {
                        debug!("Ignoring {} byte binary frame", data.len());
                    }
                    Some(Ok(WsFrame::Close { code, reason })) => {
                        return SessionEnd::Lost(format!("closed by server ({code}) {reason}"));
                    }
                    Some(Err(e)) => return SessionEnd::Lost(e.to_string()),
                    None => return SessionEnd::Lost("stream ended".into()),
                },

                _ = &mut *shutdown => {
                    if let Err(e) = sink.close().await {
                        debug!("Close frame not delivered: {}", e);
                    }
                    return SessionEnd::Shutdown;
                }
            }
        }
    }

    fn handle_text(&self, text: &str) {
        match ServerFrame::parse(text) {
            Ok(frame) => {
                debug!("<- {}", frame.event);
                self.registry
                    .dispatch(&Event::server(frame.event, frame.data));
            }
            Err(e) => warn!("Dropping malformed frame ({}): {:.120}", e, text),
        }
    }
}
