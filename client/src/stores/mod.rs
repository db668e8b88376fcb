//! Feature-scoped stores fed by REST snapshots and realtime events.
//!
//! Every store follows the same shape:
//!
//! 1. `load()` seeds the collection from one REST endpoint.
//! 2. `attach` subscribes to a fixed set of event names and applies each
//!    payload with an idempotent upsert/remove keyed by entity id.
//! 3. `refetch()` re-enters `Loading` to recover from missed events.
//!
//! A store owns its [`Subscription`]s, so dropping the store unsubscribes
//! every handler. Fetches hold only a weak reference to the collection across
//! the await; results that land after the store is gone are discarded.

mod collection;

pub mod canned_responses;
pub mod channels;
pub mod conversation;
pub mod presence;

pub use self::canned_responses::CannedResponseStore;
pub use self::channels::ChannelStore;
pub use self::collection::{Entity, EntityCollection, Phase};
pub use self::conversation::ConversationStore;
pub use self::presence::PresenceStore;

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::api::{Api, fetch_list};
use crate::connection::ConnectionManager;
use crate::error::ClientError;
use crate::registry::{Event, EventKey, LifecycleKind, Subscription};

type Shared<T> = Arc<Mutex<EntityCollection<T>>>;

fn lock<T>(state: &Mutex<EntityCollection<T>>) -> MutexGuard<'_, EntityCollection<T>> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Decode an event payload, logging and dropping anything malformed.
pub(crate) fn decode_payload<P: DeserializeOwned>(event: &Event) -> Option<P> {
    let Event::Server { name, data } = event else {
        return None;
    };
    match serde_json::from_value(data.clone()) {
        Ok(payload) => Some(payload),
        Err(e) => {
            warn!("Dropping malformed {} payload: {}", name, e);
            None
        }
    }
}

/// Run one fetch against `state`, honouring generations and teardown.
async fn load_into<T>(
    state: Weak<Mutex<EntityCollection<T>>>,
    api: &dyn Api,
    path: &str,
) -> Result<(), ClientError>
where
    T: Entity + DeserializeOwned,
{
    let generation = match state.upgrade() {
        Some(strong) => lock(&strong).begin_fetch(),
        None => return Ok(()),
    };

    let result = fetch_list::<T>(api, path).await;

    let Some(strong) = state.upgrade() else {
        debug!("Store dropped while fetching {}; discarding result", path);
        return Ok(());
    };
    let mut guard = lock(&strong);
    match result {
        Ok(items) => {
            if !guard.finish_fetch(generation, Ok(items)) {
                debug!("Discarding superseded response for {}", path);
            }
            Ok(())
        }
        Err(e) => {
            warn!("Fetching {} failed: {}", path, e);
            guard.finish_fetch(generation, Err(e.to_string()));
            Err(e)
        }
    }
}

/// A collection of `T` kept in sync with one REST endpoint and a set of
/// realtime events.
pub struct Store<T: Entity> {
    state: Shared<T>,
    api: Arc<dyn Api>,
    path: String,
    subscriptions: Vec<Subscription>,
}

impl<T: Entity + fmt::Debug> fmt::Debug for Store<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("path", &self.path)
            .field("state", &*lock(&self.state))
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}

impl<T> Store<T>
where
    T: Entity + DeserializeOwned,
{
    pub fn new(api: Arc<dyn Api>, path: impl Into<String>) -> Self {
        Self::with_collection(api, path, EntityCollection::new())
    }

    pub fn with_collection(
        api: Arc<dyn Api>,
        path: impl Into<String>,
        collection: EntityCollection<T>,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(collection)),
            api,
            path: path.into(),
            subscriptions: Vec::new(),
        }
    }

    /// Subscribe to `event`, decode its payload as `P` and apply it.
    pub fn on_event<P, F>(&mut self, conn: &ConnectionManager, event: &str, apply: F)
    where
        P: DeserializeOwned + 'static,
        F: Fn(&mut EntityCollection<T>, P) + Send + Sync + 'static,
    {
        let state = Arc::downgrade(&self.state);
        let sub = conn.on(EventKey::server(event), move |e| {
            let Some(payload) = decode_payload::<P>(e) else {
                return;
            };
            if let Some(state) = state.upgrade() {
                apply(&mut lock(&state), payload);
            }
        });
        self.subscriptions.push(sub);
    }

    /// Refetch whenever the socket comes back after a drop, to pick up
    /// whatever was missed while disconnected.
    pub fn refetch_on_reconnect(&mut self, conn: &ConnectionManager) {
        let state = Arc::downgrade(&self.state);
        let api = Arc::clone(&self.api);
        let path = self.path.clone();
        let seen_first = AtomicBool::new(conn.is_connected());

        let sub = conn.on(EventKey::Lifecycle(LifecycleKind::Established), move |_| {
            if !seen_first.swap(true, Ordering::SeqCst) {
                return;
            }
            let state = state.clone();
            let api = Arc::clone(&api);
            let path = path.clone();
            tokio::spawn(async move {
                // Failure is already recorded in the phase.
                let _ = load_into(state, api.as_ref(), &path).await;
            });
        });
        self.subscriptions.push(sub);
    }

    /// Seed from REST. On failure the phase becomes `Error` and the error is
    /// returned so the caller can notify the user; items are left unchanged.
    pub async fn load(&self) -> Result<(), ClientError> {
        load_into(Arc::downgrade(&self.state), self.api.as_ref(), &self.path).await
    }

    pub async fn refetch(&self) -> Result<(), ClientError> {
        self.load().await
    }

    pub fn phase(&self) -> Phase {
        lock(&self.state).phase().clone()
    }

    pub fn items(&self) -> Vec<T> {
        lock(&self.state).items().to_vec()
    }

    pub fn get(&self, id: &str) -> Option<T> {
        lock(&self.state).get(id).cloned()
    }

    pub fn len(&self) -> usize {
        lock(&self.state).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.state).is_empty()
    }

    /// Run `f` against the collection under its lock.
    pub fn with<R>(&self, f: impl FnOnce(&EntityCollection<T>) -> R) -> R {
        f(&lock(&self.state))
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }
}
