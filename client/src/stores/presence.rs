use std::sync::Arc;

use shared::types::PresenceStatus;

use super::Store;
use crate::api::Api;
use crate::connection::ConnectionManager;

pub const PRESENCE_PATH: &str = "/presence";

pub const INITIAL_STATUSES: &str = "initialStatuses";
pub const STATUS_UPDATE: &str = "statusUpdate";

/// Online/last-seen status per user id.
pub type PresenceStore = Store<PresenceStatus>;

impl Store<PresenceStatus> {
    pub fn attach(conn: &ConnectionManager, api: Arc<dyn Api>) -> Self {
        let mut store = Self::new(api, PRESENCE_PATH);
        // Pushed on connect; authoritative over any snapshot still loading.
        store.on_event(conn, INITIAL_STATUSES, |c, all: Vec<PresenceStatus>| {
            c.replace_all(all);
        });
        store.on_event(conn, STATUS_UPDATE, |c, status: PresenceStatus| {
            c.upsert(status);
        });
        store
    }

    pub fn is_online(&self, user_id: &str) -> bool {
        self.with(|c| c.get(user_id).is_some_and(|s| s.online))
    }

    pub fn last_seen(&self, user_id: &str) -> Option<i64> {
        self.with(|c| c.get(user_id).and_then(|s| s.last_seen))
    }

    pub fn online_count(&self) -> usize {
        self.with(|c| c.items().iter().filter(|s| s.online).count())
    }
}
