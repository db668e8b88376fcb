//! In-process event registry.
//!
//! Maps an [`EventKey`] to the handlers registered for it. Server frames and
//! locally synthesized connection lifecycle events use separate key variants,
//! so a server event can never shadow a lifecycle event of the same name.
//!
//! Dispatch runs over a snapshot of the handler list: handlers may subscribe
//! or unsubscribe (themselves or others) while being notified. Every handler
//! runs under `catch_unwind`; a panicking handler is logged and the remaining
//! handlers still receive the event.

use std::collections::HashMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde_json::Value;
use tracing::{error, trace};

// ---------------------------------------------------------------------------
// Events and keys
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleKind {
    Established,
    Lost,
    Failed,
    Closed,
}

/// Connection state changes synthesized by the connection manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Socket open (first connect or reconnect).
    Established,
    /// Unexpected closure or failed connect attempt.
    Lost { reason: String },
    /// Retries exhausted; the caller must call `connect()` again.
    Failed { attempts: u32 },
    /// Explicit `disconnect()`.
    Closed,
}

impl LifecycleEvent {
    pub fn kind(&self) -> LifecycleKind {
        match self {
            Self::Established => LifecycleKind::Established,
            Self::Lost { .. } => LifecycleKind::Lost,
            Self::Failed { .. } => LifecycleKind::Failed,
            Self::Closed => LifecycleKind::Closed,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Server { name: String, data: Value },
    Lifecycle(LifecycleEvent),
}

impl Event {
    pub fn server(name: impl Into<String>, data: Value) -> Self {
        Self::Server {
            name: name.into(),
            data,
        }
    }

    pub fn key(&self) -> EventKey {
        match self {
            Self::Server { name, .. } => EventKey::Server(name.clone()),
            Self::Lifecycle(l) => EventKey::Lifecycle(l.kind()),
        }
    }

    /// Name of a server event; `None` for lifecycle events.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Server { name, .. } => Some(name),
            Self::Lifecycle(_) => None,
        }
    }

    /// Payload of a server event; `None` for lifecycle events.
    pub fn data(&self) -> Option<&Value> {
        match self {
            Self::Server { data, .. } => Some(data),
            Self::Lifecycle(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKey {
    /// One named server event, e.g. `channel:created`.
    Server(String),
    /// Every server event, after the named handlers have run.
    AnyServer,
    Lifecycle(LifecycleKind),
}

impl EventKey {
    pub fn server(name: impl Into<String>) -> Self {
        Self::Server(name.into())
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Server(name) => write!(f, "{}", name),
            Self::AnyServer => write!(f, "*"),
            Self::Lifecycle(kind) => write!(f, "lifecycle:{:?}", kind),
        }
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

pub type Handler = Arc<dyn Fn(&Event) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

#[derive(Default)]
struct RegistryInner {
    next_id: AtomicU64,
    handlers: Mutex<HashMap<EventKey, Vec<(HandlerId, Handler)>>>,
}

impl RegistryInner {
    fn table(&self) -> MutexGuard<'_, HashMap<EventKey, Vec<(HandlerId, Handler)>>> {
        // Handlers never run under this lock, so poisoning can only come from
        // a panic inside the registry itself; the table is still consistent.
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn remove(&self, key: &EventKey, id: HandlerId) -> bool {
        let mut table = self.table();
        let Some(list) = table.get_mut(key) else {
            return false;
        };
        let before = list.len();
        list.retain(|(hid, _)| *hid != id);
        let removed = list.len() != before;
        if list.is_empty() {
            table.remove(key);
        }
        removed
    }
}

/// Shared publish/subscribe table. Clones share the same handlers.
#[derive(Clone, Default)]
pub struct EventRegistry {
    inner: Arc<RegistryInner>,
}

impl fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = self.inner.table();
        let counts: HashMap<String, usize> =
            table.iter().map(|(k, v)| (k.to_string(), v.len())).collect();
        f.debug_struct("EventRegistry")
            .field("handlers", &counts)
            .finish()
    }
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `key`. The handler stays registered until the
    /// returned [`Subscription`] is dropped or unsubscribed.
    pub fn on<F>(&self, key: EventKey, handler: F) -> Subscription
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let id = HandlerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner
            .table()
            .entry(key.clone())
            .or_default()
            .push((id, Arc::new(handler)));
        trace!("Registered handler {:?} for {}", id, key);

        Subscription {
            registry: Arc::downgrade(&self.inner),
            key,
            id,
            active: true,
        }
    }

    /// Remove one handler. Returns `false` if it was not registered.
    pub fn off(&self, key: &EventKey, id: HandlerId) -> bool {
        self.inner.remove(key, id)
    }

    /// Deliver `event` to every handler registered for its key, in
    /// registration order, then to `AnyServer` handlers for server events.
    ///
    /// Returns the number of handlers invoked.
    pub fn dispatch(&self, event: &Event) -> usize {
        let key = event.key();
        let snapshot: Vec<(HandlerId, Handler)> = {
            let table = self.inner.table();
            let mut list = table.get(&key).cloned().unwrap_or_default();
            if matches!(event, Event::Server { .. }) {
                if let Some(any) = table.get(&EventKey::AnyServer) {
                    list.extend(any.iter().cloned());
                }
            }
            list
        };

        for (id, handler) in &snapshot {
            let outcome = catch_unwind(AssertUnwindSafe(|| handler(event)));
            if outcome.is_err() {
                error!("Handler {:?} for {} panicked; continuing dispatch", id, key);
            }
        }
        snapshot.len()
    }

    pub fn handler_count(&self, key: &EventKey) -> usize {
        self.inner.table().get(key).map_or(0, Vec::len)
    }

    /// Total handlers across all keys.
    pub fn total_handlers(&self) -> usize {
        self.inner.table().values().map(Vec::len).sum()
    }
}

// ---------------------------------------------------------------------------
// Subscription guard
// ---------------------------------------------------------------------------

/// Keeps a handler registered. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unregisters the handler immediately"]
pub struct Subscription {
    registry: Weak<RegistryInner>,
    key: EventKey,
    id: HandlerId,
    active: bool,
}

impl Subscription {
    pub fn id(&self) -> HandlerId {
        self.id
    }

    pub fn key(&self) -> &EventKey {
        &self.key
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        if let Some(inner) = self.registry.upgrade() {
            inner.remove(&self.key, self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("key", &self.key)
            .field("id", &self.id)
            .field("active", &self.active)
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&'static str) -> Handler) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let log2 = Arc::clone(&log);
        let make = move |tag: &'static str| -> Handler {
            let log = Arc::clone(&log2);
            Arc::new(move |_e: &Event| log.lock().unwrap().push(tag.to_string()))
        };
        (log, make)
    }

    #[test]
    fn handlers_fire_in_registration_order() {
        let reg = EventRegistry::new();
        let (log, make) = recorder();
        let a = make("a");
        let b = make("b");
        let c = make("c");
        let _s1 = reg.on(EventKey::server("x"), move |e| a(e));
        let _s2 = reg.on(EventKey::server("x"), move |e| b(e));
        let _s3 = reg.on(EventKey::server("x"), move |e| c(e));

        assert_eq!(reg.dispatch(&Event::server("x", Value::Null)), 3);
        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn dropping_subscription_unregisters() {
        let reg = EventRegistry::new();
        let sub = reg.on(EventKey::server("x"), |_| {});
        assert_eq!(reg.handler_count(&EventKey::server("x")), 1);
        drop(sub);
        assert_eq!(reg.handler_count(&EventKey::server("x")), 0);
        assert_eq!(reg.dispatch(&Event::server("x", Value::Null)), 0);
    }

    #[test]
    fn off_removes_specific_handler() {
        let reg = EventRegistry::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let keep = reg.on(EventKey::server("x"), move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        let gone = reg.on(EventKey::server("x"), |_| panic!("should be removed"));

        assert!(reg.off(&EventKey::server("x"), gone.id()));
        assert!(!reg.off(&EventKey::server("x"), gone.id()));
        reg.dispatch(&Event::server("x", Value::Null));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        drop(keep);
    }

    #[test]
    fn server_and_lifecycle_namespaces_do_not_collide() {
        let reg = EventRegistry::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let _s = reg.on(EventKey::Lifecycle(LifecycleKind::Established), move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });

        // A server frame named like a lifecycle event must not reach it.
        reg.dispatch(&Event::server("Established", Value::Null));
        reg.dispatch(&Event::server("connect", Value::Null));
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        reg.dispatch(&Event::Lifecycle(LifecycleEvent::Established));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn any_server_sees_every_server_frame_but_not_lifecycle() {
        let reg = EventRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        let _sub = reg.on(EventKey::AnyServer, move |e| {
            if let Event::Server { name, .. } = e {
                s.lock().unwrap().push(name.clone());
            }
        });

        reg.dispatch(&Event::server("a", Value::Null));
        reg.dispatch(&Event::server("b", Value::Null));
        reg.dispatch(&Event::Lifecycle(LifecycleEvent::Closed));
        assert_eq!(*seen.lock().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn panicking_handler_does_not_block_others() {
        let reg = EventRegistry::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let _bad = reg.on(EventKey::server("x"), |_| panic!("boom"));
        let _good = reg.on(EventKey::server("x"), move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });

        reg.dispatch(&Event::server("x", Value::Null));
        reg.dispatch(&Event::server("x", Value::Null));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn handler_can_unsubscribe_itself_during_dispatch() {
        let reg = EventRegistry::new();
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let hits = Arc::new(AtomicUsize::new(0));

        let s = Arc::clone(&slot);
        let h = Arc::clone(&hits);
        let sub = reg.on(EventKey::server("once"), move |_| {
            h.fetch_add(1, Ordering::SeqCst);
            if let Some(me) = s.lock().unwrap().take() {
                me.unsubscribe();
            }
        });
        *slot.lock().unwrap() = Some(sub);

        reg.dispatch(&Event::server("once", Value::Null));
        reg.dispatch(&Event::server("once", Value::Null));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(reg.handler_count(&EventKey::server("once")), 0);
    }

    #[test]
    fn subscription_outliving_registry_is_harmless() {
        let reg = EventRegistry::new();
        let sub = reg.on(EventKey::server("x"), |_| {});
        drop(reg);
        drop(sub);
    }
}
