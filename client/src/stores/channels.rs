use std::sync::Arc;

use shared::types::{Channel, ChannelType, EntityRef};

use super::Store;
use crate::api::Api;
use crate::connection::ConnectionManager;

pub const CHANNELS_PATH: &str = "/channels";

pub const CHANNEL_CREATED: &str = "channel:created";
pub const CHANNEL_UPDATED: &str = "channel:updated";
pub const CHANNEL_DELETED: &str = "channel:deleted";
pub const CHANNEL_RESTORED: &str = "channel:restored";

/// Inbound channels of the current organization.
pub type ChannelStore = Store<Channel>;

impl Store<Channel> {
    pub fn attach(conn: &ConnectionManager, api: Arc<dyn Api>) -> Self {
        let mut store = Self::new(api, CHANNELS_PATH);
        // At-least-once delivery: a repeated create must not duplicate.
        store.on_event(conn, CHANNEL_CREATED, |c, channel: Channel| {
            c.insert_if_absent(channel);
        });
        store.on_event(conn, CHANNEL_UPDATED, |c, channel: Channel| {
            c.upsert(channel);
        });
        store.on_event(conn, CHANNEL_DELETED, |c, r: EntityRef| {
            c.remove(&r.id);
        });
        store.on_event(conn, CHANNEL_RESTORED, |c, channel: Channel| {
            c.upsert(channel);
        });
        store
    }

    /// Channels a guest widget can be served from.
    pub fn web_channels(&self) -> Vec<Channel> {
        self.with(|c| {
            c.items()
                .iter()
                .filter(|ch| ch.channel_type == ChannelType::Web)
                .cloned()
                .collect()
        })
    }

    pub fn find_by_token(&self, token: &str) -> Option<Channel> {
        self.with(|c| c.items().iter().find(|ch| ch.token == token).cloned())
    }
}
