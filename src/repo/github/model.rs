use time::OffsetDateTime;

use crate::domain::{
    Label, PrState, PullRequest, RepositoryRef, Review, ReviewState, ReviewVerdict, User,
};

#[derive(Debug, serde::Serialize)]
pub(super) struct GraphQlPayload<V> {
    pub query: &'static str,
    pub variables: V,
}

#[derive(Debug, serde::Serialize)]
pub(super) struct SearchVars {
    pub page_size: i32,
    pub cursor: Option<String>,
    pub search_query: String,
}

#[derive(Debug, serde::Deserialize)]
pub(super) struct GraphQlResponse<T> {
    pub data: T,
}

#[derive(Debug, serde::Deserialize)]
pub(super) struct SearchData {
    pub search: SearchResult,
}

#[derive(Debug, serde::Deserialize)]
pub(super) struct PageInfo {
    #[serde(rename = "hasNextPage")]
    pub has_next_page: bool,
    #[serde(rename = "endCursor")]
    pub end_cursor: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
pub(super) struct SearchResult {
    #[serde(rename = "pageInfo")]
    pub page_info: PageInfo,
    pub nodes: Option<Vec<SearchNode>>,
}

#[derive(Debug, serde::Deserialize)]
pub(super) struct Actor {
    login: String,
    #[serde(rename = "avatarUrl", default)]
    avatar_url: String,
    #[serde(default)]
    url: String,
    #[serde(rename = "databaseId")]
    database_id: Option<u64>,
}

#[derive(Debug, serde::Deserialize)]
pub(super) struct Repository {
    #[serde(rename = "databaseId")]
    database_id: Option<u64>,
    name: String,
    #[serde(rename = "nameWithOwner")]
    name_with_owner: String,
    url: String,
    description: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct LabelNode {
    name: String,
    color: String,
}

#[derive(Debug, serde::Deserialize)]
struct Labels {
    nodes: Option<Vec<LabelNode>>,
}

#[derive(Debug, serde::Deserialize)]
struct TotalCount {
    #[serde(rename = "totalCount")]
    total_count: u64,
}

#[derive(Debug, serde::Deserialize)]
struct ReviewNode {
    #[serde(rename = "databaseId")]
    database_id: Option<u64>,
    author: Option<Actor>,
    state: String,
    #[serde(rename = "submittedAt", default, with = "time::serde::rfc3339::option")]
    submitted_at: Option<OffsetDateTime>,
    #[serde(default)]
    url: String,
}

#[derive(Debug, serde::Deserialize)]
struct Reviews {
    nodes: Option<Vec<ReviewNode>>,
}

/// One search hit. Non-pull-request hits only carry `__typename`.
#[derive(Debug, serde::Deserialize)]
pub(super) struct SearchNode {
    #[serde(rename = "__typename")]
    typename: Option<String>,
    #[serde(rename = "databaseId")]
    database_id: Option<u64>,
    number: Option<u64>,
    title: Option<String>,
    url: Option<String>,
    state: Option<String>,
    #[serde(rename = "isDraft")]
    is_draft: Option<bool>,
    #[serde(rename = "createdAt", default, with = "time::serde::rfc3339::option")]
    created_at: Option<OffsetDateTime>,
    #[serde(rename = "updatedAt", default, with = "time::serde::rfc3339::option")]
    updated_at: Option<OffsetDateTime>,
    #[serde(rename = "closedAt", default, with = "time::serde::rfc3339::option")]
    closed_at: Option<OffsetDateTime>,
    #[serde(rename = "mergedAt", default, with = "time::serde::rfc3339::option")]
    merged_at: Option<OffsetDateTime>,
    author: Option<Actor>,
    repository: Option<Repository>,
    labels: Option<Labels>,
    comments: Option<TotalCount>,
    reviews: Option<Reviews>,
}

impl Actor {
    fn into_user(self) -> User {
        User {
            login: self.login,
            id: self.database_id,
            avatar_url: self.avatar_url,
            html_url: self.url,
        }
    }
}

fn ghost() -> User {
    User {
        login: "ghost".to_string(),
        id: None,
        avatar_url: String::new(),
        html_url: "https://github.com/ghost".to_string(),
    }
}

impl ReviewNode {
    fn into_review(self) -> Option<Review> {
        let state = match self.state.parse::<ReviewState>() {
            Ok(state) => state,
            Err(e) => {
                tracing::debug!("Ignoring review: {e}");
                return None;
            }
        };
        Some(Review {
            id: self.database_id?,
            user: self.author.map(Actor::into_user).unwrap_or_else(ghost),
            state,
            submitted_at: self.submitted_at,
            html_url: self.url,
        })
    }
}

impl SearchNode {
    pub(super) fn into_pull_request(self) -> Option<PullRequest> {
        if self.typename.as_deref()? != "PullRequest" {
            return None;
        }
        let repository = self.repository?;
        let state = match self.state.as_deref() {
            Some("OPEN") => PrState::Open,
            _ => PrState::Closed,
        };
        let labels = self
            .labels
            .and_then(|l| l.nodes)
            .unwrap_or_default()
            .into_iter()
            .map(|l| Label {
                name: l.name,
                color: l.color,
            })
            .collect();
        let reviews = self
            .reviews
            .and_then(|r| r.nodes)
            .unwrap_or_default()
            .into_iter()
            .filter_map(ReviewNode::into_review)
            .collect();

        Some(PullRequest {
            id: self.database_id?,
            number: self.number?,
            title: self.title?,
            html_url: self.url?,
            state,
            draft: self.is_draft.unwrap_or(false),
            created_at: self.created_at?,
            updated_at: self.updated_at?,
            closed_at: self.closed_at,
            merged_at: self.merged_at,
            user: self.author.map(Actor::into_user).unwrap_or_else(ghost),
            repository: RepositoryRef {
                id: repository.database_id?,
                name: repository.name,
                full_name: repository.name_with_owner,
                html_url: repository.url,
                description: repository.description,
            },
            labels,
            comments_count: self.comments.map(|c| c.total_count).unwrap_or(0),
            reviews,
            has_new_activity: false,
            last_read_at: None,
            review_status: ReviewVerdict::None,
            reviewers: Default::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"{
      "data": {
        "search": {
          "pageInfo": { "hasNextPage": false, "endCursor": null },
          "nodes": [
            {
              "__typename": "PullRequest",
              "databaseId": 1001,
              "number": 7,
              "title": "Add widget",
              "url": "https://github.com/acme/widgets/pull/7",
              "state": "OPEN",
              "isDraft": true,
              "createdAt": "2024-05-01T10:00:00Z",
              "updatedAt": "2024-05-01T12:00:00Z",
              "closedAt": null,
              "mergedAt": null,
              "author": { "login": "alice", "avatarUrl": "https://a/alice", "url": "https://github.com/alice", "databaseId": 5 },
              "repository": { "databaseId": 77, "name": "widgets", "nameWithOwner": "acme/widgets", "url": "https://github.com/acme/widgets", "description": null },
              "labels": { "nodes": [ { "name": "bug", "color": "d73a4a" } ] },
              "comments": { "totalCount": 3 },
              "reviews": { "nodes": [
                { "databaseId": 1, "author": { "login": "bob" }, "state": "APPROVED", "submittedAt": "2024-05-01T11:00:00Z", "url": "" },
                { "databaseId": 2, "author": { "login": "carol" }, "state": "PENDING", "submittedAt": null },
                { "databaseId": 3, "author": null, "state": "SOMETHING_NEW", "submittedAt": null }
              ] }
            },
            { "__typename": "Issue" }
          ]
        }
      }
    }"#;

    #[test]
    fn decodes_a_search_page() {
        let resp: GraphQlResponse<SearchData> = serde_json::from_str(PAGE).unwrap();
        assert!(!resp.data.search.page_info.has_next_page);
        let prs: Vec<PullRequest> = resp
            .data
            .search
            .nodes
            .unwrap()
            .into_iter()
            .filter_map(SearchNode::into_pull_request)
            .collect();

        assert_eq!(prs.len(), 1);
        let pr = &prs[0];
        assert_eq!(pr.id, 1001);
        assert!(pr.draft);
        assert_eq!(pr.state, PrState::Open);
        assert_eq!(pr.repository.full_name, "acme/widgets");
        assert_eq!(pr.user.id, Some(5));
        assert_eq!(pr.comments_count, 3);
        assert_eq!(pr.labels[0].name, "bug");
        assert_eq!(pr.reviews.len(), 2);
        assert_eq!(pr.reviews[1].submitted_at, None);
        assert_eq!(pr.short_ref(), "acme/widgets#7");
    }
}
