//! [`PullHistoryDirectory`]: newcomer lookup against a pull-request history index.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use tracing::debug;
use welcome::ports::NewcomerDirectory;
use welcome::{Login, TrackerError, TrackerErrorKind};

use crate::client::GiteeError;

const OP: &str = "is_newcomer";

#[derive(Debug, Deserialize)]
struct PullHistoryResponse {
    #[serde(default)]
    total: u64,
}

/// Treats an author with no recorded pull requests as a newcomer.
///
/// Queries `GET {endpoint}/pulls?author=<login>` and reads `{"total": n}`.
#[derive(Debug, Clone)]
pub struct PullHistoryDirectory {
    http: reqwest::Client,
    pulls_url: Url,
}

impl PullHistoryDirectory {
    /// # Errors
    ///
    /// Returns an error if `endpoint` is not an absolute URL or the HTTP
    /// client cannot be built.
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, GiteeError> {
        let invalid = |message: String| GiteeError::InvalidBaseUrl {
            url: endpoint.to_string(),
            message,
        };
        let mut pulls_url = Url::parse(endpoint).map_err(|e| invalid(e.to_string()))?;
        pulls_url
            .path_segments_mut()
            .map_err(|()| invalid("not a base url".into()))?
            .pop_if_empty()
            .push("pulls");

        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, pulls_url })
    }
}

#[async_trait]
impl NewcomerDirectory for PullHistoryDirectory {
    async fn is_newcomer(&self, author: &Login) -> Result<bool, TrackerError> {
        debug!(author = %author, "looking up pull request history");
        let response = self
            .http
            .get(self.pulls_url.clone())
            .query(&[("author", author.as_str())])
            .send()
            .await
            .map_err(|e| TrackerError::new(OP, TrackerErrorKind::Transport, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TrackerError::new(
                OP,
                TrackerErrorKind::Status(status.as_u16()),
                body,
            ));
        }

        let history: PullHistoryResponse = response
            .json()
            .await
            .map_err(|e| TrackerError::new(OP, TrackerErrorKind::Decode, e.to_string()))?;
        Ok(history.total == 0)
    }
}
