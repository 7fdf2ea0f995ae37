//! GitHub organisation listing
//!
//! Lists every repository of an organisation through the REST API,
//! following `Link: <...>; rel="next"` pagination.

use std::future::Future;
use std::time::Duration;

use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION, LINK, USER_AGENT};
use serde::Deserialize;

use crate::config::{defaults, urls};
use crate::error::SourceError;

/// A repository as reported by the hosting service
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteRepository {
    /// Repository name, used as the unit name
    pub name: String,
    /// URL to clone from
    pub clone_url: String,
    /// Archived repositories are never cloned
    #[serde(default)]
    pub archived: bool,
}

/// Something that can enumerate the repositories to clone
pub trait RepositorySource {
    /// Every repository, archived ones included
    fn list_repositories(
        &self,
    ) -> impl Future<Output = Result<Vec<RemoteRepository>, SourceError>> + Send;
}

/// Repositories of one GitHub organisation
#[derive(Debug, Clone)]
pub struct GitHubOrg {
    client: reqwest::Client,
    api_url: String,
    org: String,
    token: Option<String>,
}

impl GitHubOrg {
    /// List `org` on public GitHub
    pub fn new(org: impl Into<String>) -> Self {
        Self::with_api_url(urls::GITHUB_API, org)
    }

    /// List `org` through a custom API endpoint
    pub fn with_api_url(api_url: impl Into<String>, org: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(60))
                .connect_timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            org: org.into(),
            token: None,
        }
    }

    /// Authenticate requests with a token
    #[must_use]
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    /// Organisation name
    pub fn org(&self) -> &str {
        &self.org
    }

    fn first_page_url(&self) -> String {
        format!(
            "{}/orgs/{}/repos?per_page={}&page=1",
            self.api_url,
            self.org,
            defaults::REPOS_PER_PAGE
        )
    }

    async fn fetch_page(
        &self,
        url: &str,
    ) -> Result<(Vec<RemoteRepository>, Option<String>), SourceError> {
        let list_failed = |e: reqwest::Error| SourceError::ListFailed {
            org: self.org.clone(),
            error: e.to_string(),
        };

        let mut request = self
            .client
            .get(url)
            .header(USER_AGENT, concat!("debforge/", env!("CARGO_PKG_VERSION")))
            .header(ACCEPT, "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        let response = request.send().await.map_err(list_failed)?;
        if !response.status().is_success() {
            return Err(SourceError::HttpStatus {
                org: self.org.clone(),
                status: response.status().as_u16(),
            });
        }

        let next = next_page(response.headers());
        let repos = response
            .json::<Vec<RemoteRepository>>()
            .await
            .map_err(list_failed)?;
        Ok((repos, next))
    }
}

impl RepositorySource for GitHubOrg {
    async fn list_repositories(&self) -> Result<Vec<RemoteRepository>, SourceError> {
        let mut repos = Vec::new();
        let mut url = Some(self.first_page_url());

        while let Some(current) = url {
            tracing::debug!("GET {current}");
            let (page, next) = self.fetch_page(&current).await?;
            repos.extend(page);
            url = next;
        }

        tracing::debug!("{} lists {} repositories", self.org, repos.len());
        Ok(repos)
    }
}

/// Target of the `rel="next"` entry of a `Link` header
fn next_page(headers: &HeaderMap) -> Option<String> {
    let link = headers.get(LINK)?.to_str().ok()?;
    link.split(',').find_map(|entry| {
        let (target, params) = entry.split_once(';')?;
        let is_next = params
            .split(';')
            .any(|p| p.trim().trim_start_matches("rel=").trim_matches('"') == "next");
        is_next.then(|| {
            target
                .trim()
                .trim_start_matches('<')
                .trim_end_matches('>')
                .to_string()
        })
    })
}
