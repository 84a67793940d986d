mod model;

use std::collections::HashSet;

use anyhow::{Result, anyhow};
use model::{GraphQlPayload, GraphQlResponse, SearchData, SearchNode, SearchVars};
use octocrab::Octocrab;
use tracing::{debug, info};

use super::settings::Settings;
use super::source::PullRequestSource;
use crate::config::GithubConfig;
use crate::domain::PullRequest;

const PAGE_SIZE: i32 = 50;

const AUTHORED_PR_QUERY: &str = r#"
query ($page_size: Int!, $cursor: String, $search_query: String!) {
  search(query: $search_query, type: ISSUE, first: $page_size, after: $cursor) {
    pageInfo {
      hasNextPage
      endCursor
    }
    nodes {
      __typename
      ... on PullRequest {
        databaseId
        number
        title
        url
        state
        isDraft
        createdAt
        updatedAt
        closedAt
        mergedAt
        author {
          login
          avatarUrl
          url
          ... on User {
            databaseId
          }
        }
        repository {
          databaseId
          name
          nameWithOwner
          url
          description
        }
        labels(first: 20) {
          nodes {
            name
            color
          }
        }
        comments {
          totalCount
        }
        reviews(last: 100) {
          nodes {
            databaseId
            author {
              login
              avatarUrl
              url
              ... on User {
                databaseId
              }
            }
            state
            submittedAt
            url
          }
        }
      }
    }
  }
}
"#;

pub fn search_query(organization: &str, user: &str) -> String {
    format!("org:{organization} author:{user} is:pr is:open")
}

/// Fetches open pull requests authored by each configured user in one organization.
pub struct GithubSource {
    octo: Octocrab,
}

impl GithubSource {
    pub fn new(octo: Octocrab) -> Self {
        Self { octo }
    }

    pub fn connect(cfg: &GithubConfig) -> Result<Self> {
        let mut builder = Octocrab::builder().personal_token(cfg.token.clone());
        if let Some(api) = cfg.api_base.clone() {
            builder = builder
                .base_uri(api)
                .map_err(|e| anyhow!("invalid GITHUB_API_URL: {e}"))?;
        }
        let octo = builder
            .build()
            .map_err(|e| anyhow!("failed to init GitHub client: {e}"))?;
        Ok(Self::new(octo))
    }

    async fn fetch_for_user(&self, organization: &str, user: &str) -> Result<Vec<PullRequest>> {
        let search_query = search_query(organization, user);
        let mut out = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let payload = GraphQlPayload {
                query: AUTHORED_PR_QUERY,
                variables: SearchVars {
                    page_size: PAGE_SIZE,
                    cursor: cursor.clone(),
                    search_query: search_query.clone(),
                },
            };
            let resp: GraphQlResponse<SearchData> = self
                .octo
                .graphql(&payload)
                .await
                .map_err(|e| anyhow!("GitHub GraphQL search for {user} failed: {e:?}"))?;

            if let Some(nodes) = resp.data.search.nodes {
                out.extend(nodes.into_iter().filter_map(SearchNode::into_pull_request));
            }
            let pi = resp.data.search.page_info;
            if !pi.has_next_page {
                break;
            }
            cursor = pi.end_cursor;
            if cursor.is_none() {
                break;
            }
        }
        debug!("Fetched {} pull requests authored by {}", out.len(), user);
        Ok(out)
    }
}

impl PullRequestSource for GithubSource {
    async fn fetch(&self, settings: &Settings) -> Result<Vec<PullRequest>> {
        let mut seen = HashSet::new();
        let mut all = Vec::new();
        for user in settings.usernames.iter().map(|u| u.trim()).filter(|u| !u.is_empty()) {
            let prs = self.fetch_for_user(&settings.organization, user).await?;
            all.extend(prs.into_iter().filter(|pr| seen.insert(pr.id)));
        }
        info!(
            "Fetched {} pull requests from {} for {} users",
            all.len(),
            settings.organization,
            settings.usernames.len()
        );
        Ok(all)
    }
}

/// Synchronous facade that owns its own Tokio runtime.
pub fn fetch_blocking(cfg: &GithubConfig, settings: &Settings) -> Result<Vec<PullRequest>> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| anyhow!("failed to build tokio runtime: {e}"))?;

    rt.block_on(async move {
        let source = GithubSource::connect(cfg)?;
        source.fetch(settings).await
    })
}
