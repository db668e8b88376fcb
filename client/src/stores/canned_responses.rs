use std::sync::Arc;

use shared::types::{CannedResponse, EntityRef};

use super::Store;
use crate::api::Api;
use crate::connection::ConnectionManager;

pub const CANNED_RESPONSES_PATH: &str = "/canned-responses";

pub const CANNED_CREATED: &str = "cannedResponseCreated";
pub const CANNED_UPDATED: &str = "cannedResponseUpdated";
pub const CANNED_DELETED: &str = "cannedResponseDeleted";

pub type CannedResponseStore = Store<CannedResponse>;

impl Store<CannedResponse> {
    pub fn attach(conn: &ConnectionManager, api: Arc<dyn Api>) -> Self {
        let mut store = Self::new(api, CANNED_RESPONSES_PATH);
        store.on_event(conn, CANNED_CREATED, |c, r: CannedResponse| {
            c.insert_if_absent(r);
        });
        store.on_event(conn, CANNED_UPDATED, |c, r: CannedResponse| {
            c.upsert(r);
        });
        store.on_event(conn, CANNED_DELETED, |c, r: EntityRef| {
            c.remove(&r.id);
        });
        store
    }

    /// Responses whose shortcut starts with `prefix` (case-insensitive), for
    /// the composer's `/shortcut` picker. A leading `/` is ignored.
    pub fn find_by_shortcut(&self, prefix: &str) -> Vec<CannedResponse> {
        let needle = prefix.trim_start_matches('/').to_lowercase();
        self.with(|c| {
            c.items()
                .iter()
                .filter(|r| {
                    r.shortcut
                        .trim_start_matches('/')
                        .to_lowercase()
                        .starts_with(&needle)
                })
                .cloned()
                .collect()
        })
    }
}
