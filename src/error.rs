use thiserror::Error;

/// Failures the viewer needs to see. Persistence problems are logged instead.
#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("organization and at least one user must be configured before fetching")]
    NotConfigured,
    #[error("failed to fetch pull requests: {0:#}")]
    Source(#[source] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, RefreshError>;
