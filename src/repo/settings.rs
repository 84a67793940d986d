use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use super::BlobStore;
use crate::usecase::grouping::{Grouping, SortKey};

pub const SETTINGS_SCHEMA_VERSION: u32 = 1;

/// Which pull requests to fetch, and who is looking at them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "settings_version")]
    pub version: u32,
    #[serde(default)]
    pub organization: String,
    #[serde(default, alias = "users")]
    pub usernames: Vec<String>,
    /// Login of the viewing user, enabling own-review suppression.
    #[serde(default, alias = "currentUser")]
    pub viewer: Option<String>,
}

fn settings_version() -> u32 {
    SETTINGS_SCHEMA_VERSION
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: SETTINGS_SCHEMA_VERSION,
            organization: String::new(),
            usernames: Vec::new(),
            viewer: None,
        }
    }
}

impl Settings {
    pub fn new(organization: impl Into<String>, usernames: Vec<String>) -> Self {
        Self {
            organization: organization.into(),
            usernames,
            ..Self::default()
        }
    }

    pub fn with_viewer(mut self, viewer: impl Into<String>) -> Self {
        self.viewer = Some(viewer.into());
        self
    }

    /// A fetch needs an organization and at least one user.
    pub fn is_complete(&self) -> bool {
        !self.organization.trim().is_empty() && self.usernames.iter().any(|u| !u.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewPreferences {
    pub grouping: Grouping,
    pub sorting: SortKey,
    pub show_unread_only: bool,
    pub show_drafts: bool,
    pub hide_approved: bool,
}

impl Default for ViewPreferences {
    fn default() -> Self {
        Self {
            grouping: Grouping::Repository,
            sorting: SortKey::Updated,
            show_unread_only: true,
            show_drafts: false,
            hide_approved: false,
        }
    }
}

/// Typed JSON blob with a fallback value when it is missing or unreadable.
pub struct JsonBlob<B: BlobStore> {
    blobs: B,
    key: String,
}

impl<B: BlobStore> JsonBlob<B> {
    pub fn new(blobs: B, key: impl Into<String>) -> Self {
        Self {
            blobs,
            key: key.into(),
        }
    }

    pub fn load_or_default<T: DeserializeOwned + Default>(&self) -> T {
        match self.try_load() {
            Ok(Some(value)) => value,
            Ok(None) => T::default(),
            Err(e) => {
                warn!("Failed to load {}, using defaults: {e:#}", self.key);
                T::default()
            }
        }
    }

    pub fn save<T: Serialize>(&self, value: &T) -> bool {
        let result = serde_json::to_string(value)
            .with_context(|| format!("failed to encode {}", self.key))
            .and_then(|raw| self.blobs.put(&self.key, &raw));
        match result {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to persist {}: {e:#}", self.key);
                false
            }
        }
    }

    fn try_load<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        let Some(raw) = self.blobs.get(&self.key)? else {
            return Ok(None);
        };
        let value = serde_json::from_str(&raw).with_context(|| format!("malformed {}", self.key))?;
        Ok(Some(value))
    }
}
