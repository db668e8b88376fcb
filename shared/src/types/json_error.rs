use serde::{Deserialize, Serialize};

/// Error body returned by the REST API on non-2xx responses.
///
/// Every field but `message` is optional; the backend is not consistent about
/// including `status` and `code`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(alias = "error")]
    pub message: String,
}

impl ApiErrorBody {
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            status: Some("error".to_string()),
            code: Some(code.to_string()),
            message: message.to_string(),
        }
    }
}
