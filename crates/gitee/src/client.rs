//! [`GiteeClient`]: the Gitee v5 REST implementation of the platform ports.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};
use welcome::ports::{CodeRepository, IssueTracker, PullRequestManager};
use welcome::{
    BranchRef, ChangedFile, Collaborator, FileRef, ItemRef, LabelName, Login, PullNumber,
    RepoLabel, RepoRef, TrackerError, TrackerErrorKind, TreeEntry,
};

use crate::models::{
    AssigneesRequest, CollaboratorItem, CommentRequest, ContentResponse, CreateLabelRequest,
    LabelItem, PullFileItem, TreeResponse,
};

pub const DEFAULT_API_BASE: &str = "https://gitee.com/api/v5";
const COLLABORATORS_PER_PAGE: usize = 100;
const MAX_COLLABORATOR_PAGES: usize = 50;

/// Connection settings for [`GiteeClient`].
#[derive(Debug, Clone)]
pub struct GiteeConfig {
    /// API root, e.g. `https://gitee.com/api/v5`.
    pub api_base: String,
    /// Personal access token sent as the `access_token` query parameter.
    pub token: String,
    /// Deadline applied to every request.
    pub timeout: Duration,
}

/// Errors constructing a [`GiteeClient`].
#[derive(Debug, Error)]
pub enum GiteeError {
    #[error("invalid api base url '{url}': {message}")]
    InvalidBaseUrl { url: String, message: String },

    #[error("cannot build http client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Gitee v5 REST client implementing every platform port.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct GiteeClient {
    http: reqwest::Client,
    base: Url,
    token: String,
}

impl GiteeClient {
    /// Creates a client.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is not an absolute http(s) URL or the
    /// HTTP client cannot be created.
    pub fn new(config: &GiteeConfig) -> Result<Self, GiteeError> {
        let base = Url::parse(&config.api_base).map_err(|e| GiteeError::InvalidBaseUrl {
            url: config.api_base.clone(),
            message: e.to_string(),
        })?;
        if base.cannot_be_a_base() {
            return Err(GiteeError::InvalidBaseUrl {
                url: config.api_base.clone(),
                message: "not a base url".into(),
            });
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("sig-welcome/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base,
            token: config.token.clone(),
        })
    }

    /// `{base}/repos/{org}/{repo}/{tail...}` with every segment escaped.
    fn repo_url<'a>(
        &self,
        repo: &RepoRef,
        tail: impl IntoIterator<Item = &'a str>,
    ) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["repos", repo.org(), repo.repo()])
                .extend(tail);
        }
        url
    }

    async fn send(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<Response, TrackerError> {
        let response = request
            .query(&[("access_token", self.token.as_str())])
            .send()
            .await
            .map_err(|e| transport_error(operation, &e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(status_error(operation, status, &body))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        url: Url,
        query: &[(&str, String)],
    ) -> Result<T, TrackerError> {
        debug!(operation, url = %url, "gitee request");
        let response = self.send(operation, self.http.get(url).query(query)).await?;
        response
            .json()
            .await
            .map_err(|e| TrackerError::new(operation, TrackerErrorKind::Decode, e.to_string()))
    }

    async fn post_json<B: Serialize + ?Sized>(
        &self,
        operation: &'static str,
        url: Url,
        body: &B,
    ) -> Result<(), TrackerError> {
        debug!(operation, url = %url, "gitee request");
        self.send(operation, self.http.post(url).json(body)).await?;
        Ok(())
    }
}

fn item_segments(item: &ItemRef) -> [String; 2] {
    match item {
        ItemRef::Issue(n) => ["issues".to_string(), n.to_string()],
        ItemRef::PullRequest(n) => ["pulls".to_string(), n.to_string()],
    }
}

fn transport_error(operation: &'static str, e: &reqwest::Error) -> TrackerError {
    let kind = if e.is_decode() {
        TrackerErrorKind::Decode
    } else {
        TrackerErrorKind::Transport
    };
    TrackerError::new(operation, kind, e.to_string())
}

fn status_error(operation: &'static str, status: StatusCode, body: &str) -> TrackerError {
    let kind = match status {
        StatusCode::NOT_FOUND => TrackerErrorKind::NotFound,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => TrackerErrorKind::Unauthorized,
        other => TrackerErrorKind::Status(other.as_u16()),
    };
    TrackerError::new(operation, kind, body.to_string())
}

fn decode_content(operation: &'static str, response: ContentResponse) -> Result<Vec<u8>, TrackerError> {
    match response.encoding.as_deref() {
        None | Some("base64") => {
            let compact: String = response.content.split_whitespace().collect();
            base64::engine::general_purpose::STANDARD
                .decode(compact)
                .map_err(|e| TrackerError::new(operation, TrackerErrorKind::Decode, e.to_string()))
        }
        Some(other) => Err(TrackerError::new(
            operation,
            TrackerErrorKind::Decode,
            format!("unsupported content encoding '{other}'"),
        )),
    }
}

#[async_trait]
impl CodeRepository for GiteeClient {
    async fn fetch_file_content(&self, file: &FileRef) -> Result<Vec<u8>, TrackerError> {
        const OP: &str = "fetch_file_content";
        let url = self.repo_url(
            &file.branch.repo,
            std::iter::once("contents").chain(file.path.split('/').filter(|s| !s.is_empty())),
        );
        let response: ContentResponse = self
            .get_json(OP, url, &[("ref", file.branch.branch.to_string())])
            .await?;
        decode_content(OP, response)
    }

    async fn fetch_directory_tree(
        &self,
        branch: &BranchRef,
        recursive: bool,
    ) -> Result<Vec<TreeEntry>, TrackerError> {
        const OP: &str = "fetch_directory_tree";
        let url = self.repo_url(&branch.repo, ["git", "trees", branch.branch.as_str()]);
        let query = [("recursive", if recursive { "1" } else { "0" }.to_string())];
        let response: TreeResponse = self.get_json(OP, url, &query).await?;
        if response.truncated {
            warn!(tree = %branch, entries = response.tree.len(), "gitee truncated the tree listing");
            return Err(TrackerError::new(
                OP,
                TrackerErrorKind::Decode,
                format!("tree listing of {branch} was truncated after {} entries", response.tree.len()),
            ));
        }
        Ok(response
            .tree
            .into_iter()
            .filter_map(|item| item.into_entry())
            .collect())
    }

    async fn list_collaborators(&self, repo: &RepoRef) -> Result<Vec<Collaborator>, TrackerError> {
        const OP: &str = "list_collaborators";
        let mut all = Vec::new();
        for page in 1..=MAX_COLLABORATOR_PAGES {
            let url = self.repo_url(repo, ["collaborators"]);
            let query = [
                ("page", page.to_string()),
                ("per_page", COLLABORATORS_PER_PAGE.to_string()),
            ];
            let batch: Vec<CollaboratorItem> = self.get_json(OP, url, &query).await?;
            let done = batch.len() < COLLABORATORS_PER_PAGE;
            all.extend(batch.into_iter().map(Collaborator::from));
            if done {
                break;
            }
        }
        Ok(all)
    }
}

#[async_trait]
impl IssueTracker for GiteeClient {
    async fn list_repo_labels(&self, repo: &RepoRef) -> Result<Vec<RepoLabel>, TrackerError> {
        let url = self.repo_url(repo, ["labels"]);
        let labels: Vec<LabelItem> = self.get_json("list_repo_labels", url, &[]).await?;
        Ok(labels.into_iter().map(RepoLabel::from).collect())
    }

    async fn create_repo_label(
        &self,
        repo: &RepoRef,
        name: &LabelName,
        color: &str,
    ) -> Result<(), TrackerError> {
        let url = self.repo_url(repo, ["labels"]);
        let body = CreateLabelRequest {
            name: name.as_str(),
            color,
        };
        self.post_json("create_repo_label", url, &body).await
    }

    async fn apply_label(
        &self,
        repo: &RepoRef,
        item: &ItemRef,
        name: &LabelName,
    ) -> Result<(), TrackerError> {
        let [kind, number] = item_segments(item);
        let url = self.repo_url(repo, [kind.as_str(), number.as_str(), "labels"]);
        self.post_json("apply_label", url, &[name.as_str()]).await
    }

    async fn post_comment(
        &self,
        repo: &RepoRef,
        item: &ItemRef,
        text: &str,
    ) -> Result<(), TrackerError> {
        let [kind, number] = item_segments(item);
        let url = self.repo_url(repo, [kind.as_str(), number.as_str(), "comments"]);
        self.post_json("post_comment", url, &CommentRequest { body: text })
            .await
    }
}

#[async_trait]
impl PullRequestManager for GiteeClient {
    async fn assign_reviewers(
        &self,
        repo: &RepoRef,
        number: PullNumber,
        logins: &[Login],
    ) -> Result<(), TrackerError> {
        let number = number.to_string();
        let url = self.repo_url(repo, ["pulls", number.as_str(), "assignees"]);
        let body = AssigneesRequest {
            assignees: logins
                .iter()
                .map(Login::as_str)
                .collect::<Vec<_>>()
                .join(","),
        };
        self.post_json("assign_reviewers", url, &body).await
    }

    async fn fetch_changed_files(
        &self,
        repo: &RepoRef,
        number: PullNumber,
    ) -> Result<Vec<ChangedFile>, TrackerError> {
        let number = number.to_string();
        let url = self.repo_url(repo, ["pulls", number.as_str(), "files"]);
        let files: Vec<PullFileItem> = self.get_json("fetch_changed_files", url, &[]).await?;
        Ok(files.into_iter().map(ChangedFile::from).collect())
    }
}
