//! Test doubles shared by the integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use coconnect::api::Api;
use coconnect::connection::{ConnectionManager, ConnectionState};
use coconnect::error::{ClientError, TransportError};
use coconnect::reconnect::ReconnectPolicy;
use coconnect::registry::{Event, EventKey, LifecycleEvent, LifecycleKind, Subscription};
use coconnect::transport::{ConnectParams, Connector, FramePair, FrameSink, FrameStream, WsFrame};
use serde_json::Value;
use shared::types::Role;
use tokio::sync::{Notify, mpsc};

pub const WAIT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Scripted transport
// ---------------------------------------------------------------------------

/// One scripted `Connector::open` outcome.
pub enum Step {
    Fail,
    /// Successful open; the session lasts until the sender is dropped.
    Open(mpsc::UnboundedReceiver<WsFrame>),
}

impl Step {
    pub fn open() -> (mpsc::UnboundedSender<WsFrame>, Step) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Step::Open(rx))
    }
}

#[derive(Default)]
pub struct FakeConnector {
    steps: Mutex<VecDeque<Step>>,
    opens: AtomicUsize,
    pub sent: Arc<Mutex<Vec<String>>>,
    pub pongs: Arc<Mutex<Vec<Vec<u8>>>>,
    pub closes: Arc<AtomicUsize>,
}

impl FakeConnector {
    pub fn new(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into()),
            ..Self::default()
        })
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn sent_frames(&self) -> Vec<Value> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|t| serde_json::from_str(t).unwrap())
            .collect()
    }
}

struct FakeSink {
    sent: Arc<Mutex<Vec<String>>>,
    pongs: Arc<Mutex<Vec<Vec<u8>>>>,
    closes: Arc<AtomicUsize>,
}

#[async_trait]
impl FrameSink for FakeSink {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.sent.lock().unwrap().push(text);
        Ok(())
    }

    async fn send_pong(&mut self, data: Vec<u8>) -> Result<(), TransportError> {
        self.pongs.lock().unwrap().push(data);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct FakeStream {
    rx: mpsc::UnboundedReceiver<WsFrame>,
}

#[async_trait]
impl FrameStream for FakeStream {
    async fn next_frame(&mut self) -> Option<Result<WsFrame, TransportError>> {
        self.rx.recv().await.map(Ok)
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn open(&self, _params: &ConnectParams) -> Result<FramePair, TransportError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(Step::Open(rx)) => Ok((
                Box::new(FakeSink {
                    sent: Arc::clone(&self.sent),
                    pongs: Arc::clone(&self.pongs),
                    closes: Arc::clone(&self.closes),
                }),
                Box::new(FakeStream { rx }),
            )),
            Some(Step::Fail) | None => Err(TransportError::ConnectionFailed("refused".into())),
        }
    }
}

pub fn manager(connector: Arc<FakeConnector>, policy: impl ReconnectPolicy + 'static) -> ConnectionManager {
    let params = ConnectParams::new("ws://fake.test/socket", Role::Agent);
    ConnectionManager::new(params, connector, Arc::new(policy))
}

/// Manager that is never connected; stores are driven by dispatching events
/// straight into its registry.
pub fn offline_manager() -> ConnectionManager {
    manager(FakeConnector::new(Vec::new()), coconnect::reconnect::NoRetry)
}

pub async fn wait_for_state(conn: &ConnectionManager, pred: impl Fn(&ConnectionState) -> bool) {
    let mut rx = conn.watch_status();
    tokio::time::timeout(WAIT, rx.wait_for(|s| pred(s)))
        .await
        .expect("timed out waiting for connection state")
        .expect("state channel closed");
}

/// Poll `cond` until it holds.
pub async fn eventually(mut cond: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + WAIT;
    while !cond() {
        assert!(tokio::time::Instant::now() < deadline, "condition never became true");
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}

/// Record every lifecycle event in order.
pub fn record_lifecycle(conn: &ConnectionManager) -> (Arc<Mutex<Vec<LifecycleEvent>>>, Vec<Subscription>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let subs = [
        LifecycleKind::Established,
        LifecycleKind::Lost,
        LifecycleKind::Failed,
        LifecycleKind::Closed,
    ]
    .into_iter()
    .map(|kind| {
        let log = Arc::clone(&log);
        conn.on(EventKey::Lifecycle(kind), move |e| {
            if let Event::Lifecycle(l) = e {
                log.lock().unwrap().push(l.clone());
            }
        })
    })
    .collect();
    (log, subs)
}

pub fn dispatch(conn: &ConnectionManager, name: &str, data: Value) -> usize {
    conn.registry().dispatch(&Event::server(name, data))
}

// ---------------------------------------------------------------------------
// In-memory REST
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryApi {
    bodies: Mutex<HashMap<String, Value>>,
    failures: Mutex<HashMap<String, u16>>,
    gate: Option<Arc<Notify>>,
    calls: AtomicUsize,
}

impl MemoryApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every request waits for a `notify_one` on the returned handle.
    pub fn gated() -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        (
            Self {
                gate: Some(Arc::clone(&gate)),
                ..Self::default()
            },
            gate,
        )
    }

    pub fn with(self, path: &str, body: Value) -> Self {
        self.set(path, body);
        self
    }

    pub fn set(&self, path: &str, body: Value) {
        self.bodies.lock().unwrap().insert(path.to_string(), body);
    }

    pub fn fail(&self, path: &str, status: u16) {
        self.failures.lock().unwrap().insert(path.to_string(), status);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Api for MemoryApi {
    async fn get_json(&self, path: &str) -> Result<Value, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if let Some(status) = self.failures.lock().unwrap().get(path).copied() {
            return Err(ClientError::Status { status, body: None });
        }
        Ok(self
            .bodies
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .unwrap_or_else(|| Value::Array(Vec::new())))
    }
}

/// Drive `fut` to completion while `during` runs once it is parked.
pub async fn while_pending<F: Future>(fut: F, during: impl FnOnce()) -> F::Output {
    tokio::pin!(fut);
    tokio::select! {
        biased;
        out = &mut fut => return out,
        _ = tokio::task::yield_now() => {}
    }
    during();
    fut.await
}
