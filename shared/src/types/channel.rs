use std::fmt;

use serde::{Deserialize, Serialize};

/// Inbound surface type. Unknown tags from newer backends are preserved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ChannelType {
    Web,
    WhatsApp,
    Messenger,
    Instagram,
    Telegram,
    Other(String),
}

impl From<String> for ChannelType {
    fn from(tag: String) -> Self {
        match tag.to_ascii_uppercase().as_str() {
            "WEB" => Self::Web,
            "WHATSAPP" => Self::WhatsApp,
            "MESSENGER" => Self::Messenger,
            "INSTAGRAM" => Self::Instagram,
            "TELEGRAM" => Self::Telegram,
            _ => Self::Other(tag),
        }
    }
}

impl From<ChannelType> for String {
    fn from(kind: ChannelType) -> Self {
        match kind {
            ChannelType::Web => "WEB".to_string(),
            ChannelType::WhatsApp => "WHATSAPP".to_string(),
            ChannelType::Messenger => "MESSENGER".to_string(),
            ChannelType::Instagram => "INSTAGRAM".to_string(),
            ChannelType::Telegram => "TELEGRAM".to_string(),
            ChannelType::Other(tag) => tag,
        }
    }
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from(self.clone()))
    }
}

/// Optional widget theming for web channels
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub greeting: Option<String>,
}

/// A configured customer-facing inbound surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub token: String,
    #[serde(rename = "type")]
    pub channel_type: ChannelType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<ChannelSettings>,
}
