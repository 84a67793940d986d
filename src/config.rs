use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};

use crate::usecase::activity::DEFAULT_OWN_REVIEW_TOLERANCE;

pub const DEFAULT_STORAGE_SCOPE: &str = "github-inbox";

#[derive(Debug, Clone)]
pub struct InboxConfig {
    /// Prefix for every blob key, so several inboxes can share one store.
    pub storage_scope: String,
    /// Window within which the viewer's own review counts as the latest activity.
    pub own_review_tolerance: Duration,
    pub db_path: Option<PathBuf>,
}

impl Default for InboxConfig {
    fn default() -> Self {
        Self {
            storage_scope: DEFAULT_STORAGE_SCOPE.to_string(),
            own_review_tolerance: DEFAULT_OWN_REVIEW_TOLERANCE,
            db_path: None,
        }
    }
}

impl InboxConfig {
    /// Defaults overridden by `PR_INBOX_OWN_REVIEW_TOLERANCE_SECS` and `PR_INBOX_DB_PATH`.
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();
        if let Some(raw) = env_var("PR_INBOX_OWN_REVIEW_TOLERANCE_SECS")? {
            let secs: u64 = raw.parse().with_context(|| {
                format!("PR_INBOX_OWN_REVIEW_TOLERANCE_SECS must be whole seconds, got {raw:?}")
            })?;
            cfg.own_review_tolerance = Duration::from_secs(secs);
        }
        if let Some(path) = env_var("PR_INBOX_DB_PATH")? {
            cfg.db_path = Some(PathBuf::from(path));
        }
        Ok(cfg)
    }

    pub fn read_status_key(&self) -> String {
        format!("{}-read-status", self.storage_scope)
    }

    pub fn settings_key(&self) -> String {
        format!("{}-settings", self.storage_scope)
    }

    pub fn view_key(&self) -> String {
        format!("{}-view", self.storage_scope)
    }

    pub fn resolved_db_path(&self) -> Result<PathBuf> {
        match &self.db_path {
            Some(path) => Ok(path.clone()),
            None => default_db_path(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GithubConfig {
    pub token: String,
    pub api_base: Option<String>,
}

impl GithubConfig {
    /// Reads `GITHUB_TOKEN` (required) and `GITHUB_API_URL` (optional).
    pub fn from_env() -> Result<Self> {
        let token = env_var("GITHUB_TOKEN")?
            .ok_or_else(|| anyhow!("GitHub token is required (env GITHUB_TOKEN)"))?;
        Ok(Self {
            token,
            api_base: env_var("GITHUB_API_URL")?,
        })
    }
}

pub fn default_db_path() -> Result<PathBuf> {
    let base = dirs::data_dir().context("failed to resolve data dir")?;
    Ok(base.join("pr-inbox").join("inbox.sqlite"))
}

fn env_var(name: &str) -> Result<Option<String>> {
    match std::env::var(name) {
        Ok(raw) => {
            let trimmed = raw.trim().to_string();
            if trimmed.is_empty() {
                return Err(anyhow!("env {name} is empty after trimming; please re-export"));
            }
            Ok(Some(trimmed))
        }
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(anyhow!("failed to read env {name}: {e}")),
    }
}
