pub mod pull_request;
pub mod read_marker;

pub use pull_request::{
    Label, PrState, PullRequest, PullRequestId, RepositoryRef, Review, ReviewState,
    ReviewVerdict, User,
};
pub use read_marker::{MarkerMap, ReadMarker};
