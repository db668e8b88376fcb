//! Realtime client for the CoConnect support-chat backend.
//!
//! * [`connection::ConnectionManager`] owns one reconnecting socket and feeds
//!   every inbound frame into an [`registry::EventRegistry`].
//! * [`stores`] keep channels, canned responses, presence and conversations
//!   in sync from REST snapshots plus realtime events.
//! * [`editor::Editor`] is the message composer; it serializes to the HTML
//!   sent with `message:send`.

pub mod api;
pub mod connection;
pub mod editor;
pub mod error;
pub mod identity;
pub mod logging;
pub mod reconnect;
pub mod registry;
pub mod stores;
pub mod transport;

pub use api::{Api, HttpApi};
pub use connection::{ConnectionManager, ConnectionState};
pub use editor::{Editor, KeyOutcome, KeyPress};
pub use error::{ClientError, TransportError};
pub use identity::IdentityCache;
pub use registry::{Event, EventKey, EventRegistry, LifecycleEvent, LifecycleKind, Subscription};
