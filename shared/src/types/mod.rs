pub mod canned_response;
pub mod channel;
pub mod client_config;
pub mod frame;
pub mod json_error;
pub mod message;
pub mod presence;
pub mod role;

pub use self::canned_response::CannedResponse;
pub use self::channel::{Channel, ChannelSettings, ChannelType};
pub use self::client_config::{ClientConfig, ConfigError};
pub use self::frame::{EntityRef, ServerFrame};
pub use self::json_error::ApiErrorBody;
pub use self::message::{ChatMessage, OutgoingMessage, TypingNotice};
pub use self::presence::PresenceStatus;
pub use self::role::Role;
