use serde::{Deserialize, Serialize};

/// A saved reply an agent can insert with `/shortcut`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CannedResponse {
    #[serde(alias = "_id")]
    pub id: String,
    pub shortcut: String,
    /// Stored as HTML, the same form the composer sends.
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}
