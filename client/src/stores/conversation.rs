use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use shared::types::{ChatMessage, OutgoingMessage, TypingNotice};

use super::{EntityCollection, Phase, Store, decode_payload};
use crate::api::Api;
use crate::connection::ConnectionManager;
use crate::error::{ClientError, TransportError};
use crate::registry::{EventKey, Subscription};

pub const MESSAGE_NEW: &str = "message:new";
pub const MESSAGE_SEND: &str = "message:send";
pub const TYPING_START: &str = "typing:start";
pub const TYPING_STOP: &str = "typing:stop";

fn by_time(a: &ChatMessage, b: &ChatMessage) -> std::cmp::Ordering {
    a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id))
}

pub fn messages_path(conversation_id: &str) -> String {
    let id: String = form_urlencoded::byte_serialize(conversation_id.as_bytes()).collect();
    format!("/conversations/{}/messages", id)
}

type TypingSet = Arc<Mutex<BTreeSet<String>>>;

/// Messages and typing indicators of one conversation.
///
/// Messages only appear once the server echoes them back on `message:new`;
/// `send_message` does not insert anything locally.
pub struct ConversationStore {
    conversation_id: String,
    user_id: String,
    conn: ConnectionManager,
    messages: Store<ChatMessage>,
    typing: TypingSet,
    subscriptions: Vec<Subscription>,
}

impl fmt::Debug for ConversationStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversationStore")
            .field("conversation_id", &self.conversation_id)
            .field("messages", &self.messages.len())
            .field("typing", &self.typing_users())
            .finish()
    }
}

impl ConversationStore {
    /// `user_id` is the local user; their own typing echoes are ignored.
    pub fn attach(
        conn: &ConnectionManager,
        api: Arc<dyn Api>,
        conversation_id: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        let conversation_id = conversation_id.into();
        let user_id = user_id.into();

        let mut messages = Store::with_collection(
            api,
            messages_path(&conversation_id),
            EntityCollection::new().with_order(by_time),
        );
        let conv = conversation_id.clone();
        messages.on_event(conn, MESSAGE_NEW, move |c, m: ChatMessage| {
            if m.conversation_id == conv {
                c.upsert(m);
            }
        });

        let typing: TypingSet = Arc::new(Mutex::new(BTreeSet::new()));
        let mut subscriptions = Vec::new();

        for (event, active) in [(TYPING_START, true), (TYPING_STOP, false)] {
            let typing = Arc::clone(&typing);
            let conv = conversation_id.clone();
            let me = user_id.clone();
            subscriptions.push(conn.on(EventKey::server(event), move |e| {
                let Some(notice) = decode_payload::<TypingNotice>(e) else {
                    return;
                };
                if notice.conversation_id != conv || notice.user_id == me {
                    return;
                }
                let mut set = typing.lock().unwrap_or_else(PoisonError::into_inner);
                if active {
                    set.insert(notice.user_id);
                } else {
                    set.remove(&notice.user_id);
                }
            }));
        }

        // A delivered message ends its sender's typing indicator.
        {
            let typing = Arc::clone(&typing);
            let conv = conversation_id.clone();
            subscriptions.push(conn.on(EventKey::server(MESSAGE_NEW), move |e| {
                let Some(m) = decode_payload::<ChatMessage>(e) else {
                    return;
                };
                if m.conversation_id != conv {
                    return;
                }
                if let Some(sender) = m.sender_id {
                    typing
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .remove(&sender);
                }
            }));
        }

        Self {
            conversation_id,
            user_id,
            conn: conn.clone(),
            messages,
            typing,
            subscriptions,
        }
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    pub async fn load(&self) -> Result<(), ClientError> {
        self.messages.load().await
    }

    pub async fn refetch(&self) -> Result<(), ClientError> {
        self.messages.refetch().await
    }

    pub fn phase(&self) -> Phase {
        self.messages.phase()
    }

    /// Messages ordered by creation time.
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.messages.items()
    }

    /// Replies to `parent_id`, oldest first.
    pub fn thread(&self, parent_id: &str) -> Vec<ChatMessage> {
        self.messages.with(|c| {
            c.items()
                .iter()
                .filter(|m| m.parent_id.as_deref() == Some(parent_id))
                .cloned()
                .collect()
        })
    }

    pub fn typing_users(&self) -> Vec<String> {
        self.typing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Emit `message:send` with composer HTML. Best-effort: fails with
    /// `NotConnected` while the socket is down.
    pub fn send_message(
        &self,
        html: impl Into<String>,
        parent_id: Option<String>,
    ) -> Result<(), TransportError> {
        let payload = OutgoingMessage {
            conversation_id: self.conversation_id.clone(),
            content: html.into(),
            parent_id,
        };
        self.conn.emit(MESSAGE_SEND, &payload)
    }

    pub fn start_typing(&self) -> Result<(), TransportError> {
        self.conn.emit(TYPING_START, &self.notice())
    }

    pub fn stop_typing(&self) -> Result<(), TransportError> {
        self.conn.emit(TYPING_STOP, &self.notice())
    }

    fn notice(&self) -> TypingNotice {
        TypingNotice {
            conversation_id: self.conversation_id.clone(),
            user_id: self.user_id.clone(),
        }
    }

    pub fn subscription_count(&self) -> usize {
        self.messages.subscription_count() + self.subscriptions.len()
    }
}
