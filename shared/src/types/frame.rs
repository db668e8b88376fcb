// Realtime frame envelope - one JSON text frame per event, both directions

use serde::{Deserialize, Serialize};

/// A single event frame on the realtime socket.
///
/// The backend sends `{"event": "channel:created", "data": {...}}`; outbound
/// frames use the same envelope.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServerFrame {
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl ServerFrame {
    pub fn new(event: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    /// Parse a text frame. Frames without an `event` field are rejected.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Payload of the `*:deleted` style events: only the id is guaranteed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    #[serde(alias = "_id")]
    pub id: String,
}
