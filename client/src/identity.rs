//! Locally persisted identifiers.
//!
//! Guests have no account, so the socket identifies them by a random id that
//! must survive restarts. Staff sessions likewise keep one id per role. The
//! cache is a convenience: an unreadable file is logged and replaced.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use shared::types::Role;
use shared::types::client_config::IdentityConfig;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::ClientError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    guest_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    channel_token: Option<String>,
    #[serde(default)]
    role_ids: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct IdentityCache {
    path: PathBuf,
    data: CacheFile,
    dirty: bool,
}

impl IdentityCache {
    /// Read the cache at `path`. A missing or corrupt file yields an empty
    /// cache; other I/O errors are returned.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let path = path.as_ref().to_path_buf();
        let data = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(data) => data,
                Err(e) => {
                    warn!("Ignoring corrupt identity cache {}: {}", path.display(), e);
                    CacheFile::default()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No identity cache at {}", path.display());
                CacheFile::default()
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            data,
            dirty: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn guest_id(&self) -> Option<&str> {
        self.data.guest_id.as_deref()
    }

    pub fn guest_id_or_create(&mut self) -> String {
        if let Some(id) = &self.data.guest_id {
            return id.clone();
        }
        let id = Uuid::new_v4().to_string();
        self.data.guest_id = Some(id.clone());
        self.dirty = true;
        id
    }

    pub fn role_id(&self, role: Role) -> Option<&str> {
        self.data.role_ids.get(role.as_str()).map(String::as_str)
    }

    pub fn role_id_or_create(&mut self, role: Role) -> String {
        if let Some(id) = self.data.role_ids.get(role.as_str()) {
            return id.clone();
        }
        let id = Uuid::new_v4().to_string();
        self.data.role_ids.insert(role.as_str().to_string(), id.clone());
        self.dirty = true;
        id
    }

    /// Socket identity for `role`: the guest id for guests, the per-role id
    /// otherwise.
    pub fn identity_for(&mut self, role: Role) -> String {
        match role {
            Role::Guest => self.guest_id_or_create(),
            staff => self.role_id_or_create(staff),
        }
    }

    /// Identity to present on the socket. A configured `user_id` wins; the
    /// cached per-role id is only used when none is set.
    pub fn resolve(&mut self, config: &IdentityConfig) -> String {
        match config.user_id.as_deref().filter(|id| !id.is_empty()) {
            Some(user_id) => user_id.to_string(),
            None => self.identity_for(config.role),
        }
    }

    pub fn channel_token(&self) -> Option<&str> {
        self.data.channel_token.as_deref()
    }

    pub fn set_channel_token(&mut self, token: Option<String>) {
        if self.data.channel_token != token {
            self.data.channel_token = token;
            self.dirty = true;
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Write the cache if anything changed, creating parent directories.
    pub fn save(&mut self) -> Result<(), ClientError> {
        if !self.dirty {
            return Ok(());
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(&self.data)?;
        fs::write(&self.path, contents)?;
        self.dirty = false;
        debug!("Saved identity cache to {}", self.path.display());
        Ok(())
    }
}
