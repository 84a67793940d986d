//! Read-state tracking and review aggregation for a pull request inbox.
//!
//! Raw pull requests from a [`repo::source::PullRequestSource`] are reduced to a review
//! verdict, classified as read or unread against locally stored read markers, and then
//! filtered, grouped and sorted for display. [`app::Inbox`] ties these steps together.

pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod repo;
pub mod usecase;

pub use app::{FetchTicket, Inbox, RefreshOutcome};
pub use config::{GithubConfig, InboxConfig};
pub use error::RefreshError;
