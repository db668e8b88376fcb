use shared::types::ApiErrorBody;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

/// Errors raised by the realtime socket.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    /// `emit` while the socket is down. The frame was dropped.
    #[error("Not connected")]
    NotConnected,
}

// ---------------------------------------------------------------------------
// Client errors
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum ClientError {
    /// Non-2xx REST response. `body` is the decoded error body when the
    /// server sent one.
    #[error("HTTP {status}: {}", body_message(.body))]
    Status {
        status: u16,
        body: Option<ApiErrorBody>,
    },

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn body_message(body: &Option<ApiErrorBody>) -> &str {
    body.as_ref().map(|b| b.message.as_str()).unwrap_or("no body")
}

/// Phrases the identity layer uses when a token is no longer valid. There is
/// no structured code for this, so matching on text is all we have.
const EXPIRED_MARKERS: &[&str] = &[
    "jwt expired",
    "token expired",
    "expired token",
    "invalid token",
    "login required",
    "session expired",
];

impl ClientError {
    /// Whether this failure means the session is gone and the user has to
    /// sign in again.
    pub fn is_session_expired(&self) -> bool {
        if let Self::Status { status: 401, .. } = self {
            return true;
        }
        let text = self.to_string().to_ascii_lowercase();
        EXPIRED_MARKERS.iter().any(|m| text.contains(m))
    }
}
