use serde::{Deserialize, Serialize};

/// Online flag and last-seen time for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceStatus {
    pub user_id: String,
    #[serde(default)]
    pub online: bool,
    /// Unix timestamp (milliseconds) of the last disconnect.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<i64>,
}
