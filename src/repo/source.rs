use std::future::Future;

use anyhow::Result;

use super::settings::Settings;
use crate::domain::PullRequest;

/// Supplies the full current snapshot of pull requests for the configured users.
///
/// There is no incremental fetch: a call either returns everything or fails.
pub trait PullRequestSource {
    fn fetch(&self, settings: &Settings) -> impl Future<Output = Result<Vec<PullRequest>>> + Send;
}
