//! Decoding of Gitee issue and merge request hooks.

use serde::Deserialize;
use thiserror::Error;
use welcome::{
    EventAction, IssueNumber, ItemRef, Login, PullNumber, RepoRef, WelcomeEvent,
};

/// Hook kinds the bot reacts to, keyed by the `X-Gitee-Event` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    Issue,
    MergeRequest,
}

impl HookKind {
    /// `None` for every other event (notes, pushes, tag pushes, ...).
    pub fn from_header(value: &str) -> Option<Self> {
        match value {
            "Issue Hook" => Some(Self::Issue),
            "Merge Request Hook" => Some(Self::MergeRequest),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("malformed payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("payload field '{field}' is missing or blank")]
    MissingField { field: &'static str },
}

#[derive(Debug, Deserialize)]
struct HookUser {
    #[serde(default)]
    login: String,
}

#[derive(Debug, Deserialize)]
struct HookRepository {
    #[serde(default)]
    namespace: Option<String>,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    full_name: Option<String>,
}

impl HookRepository {
    fn to_ref(&self) -> Result<RepoRef, PayloadError> {
        let from_parts = match (&self.namespace, &self.path) {
            (Some(org), Some(repo)) => RepoRef::new(org.as_str(), repo.as_str()),
            _ => None,
        };
        from_parts
            .or_else(|| self.full_name.as_deref().and_then(RepoRef::parse))
            .ok_or(PayloadError::MissingField {
                field: "repository",
            })
    }
}

#[derive(Debug, Deserialize)]
struct IssueBody {
    number: String,
    user: HookUser,
}

#[derive(Debug, Deserialize)]
struct PullBody {
    number: u64,
    user: HookUser,
}

#[derive(Debug, Deserialize)]
struct IssueHook {
    #[serde(default)]
    action: String,
    issue: IssueBody,
    repository: HookRepository,
}

#[derive(Debug, Deserialize)]
struct MergeRequestHook {
    #[serde(default)]
    action: String,
    pull_request: PullBody,
    repository: HookRepository,
}

fn login(user: HookUser) -> Result<Login, PayloadError> {
    Login::new(user.login).ok_or(PayloadError::MissingField { field: "user.login" })
}

/// Decodes a hook body of the given kind.
///
/// # Errors
///
/// Returns [`PayloadError`] if the body is not valid JSON for `kind` or a
/// required identifier is blank.
pub fn decode_event(kind: HookKind, body: &[u8]) -> Result<WelcomeEvent, PayloadError> {
    match kind {
        HookKind::Issue => {
            let hook: IssueHook = serde_json::from_slice(body)?;
            let number = IssueNumber::new(hook.issue.number)
                .ok_or(PayloadError::MissingField { field: "issue.number" })?;
            Ok(WelcomeEvent {
                repo: hook.repository.to_ref()?,
                item: ItemRef::Issue(number),
                author: login(hook.issue.user)?,
                action: EventAction::from_raw(&hook.action),
            })
        }
        HookKind::MergeRequest => {
            let hook: MergeRequestHook = serde_json::from_slice(body)?;
            Ok(WelcomeEvent {
                repo: hook.repository.to_ref()?,
                item: ItemRef::PullRequest(PullNumber::new(hook.pull_request.number)),
                author: login(hook.pull_request.user)?,
                action: EventAction::from_raw(&hook.action),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_issue_hook() {
        let body = json!({
            "hook_name": "issue_hooks",
            "action": "open",
            "issue": {"number": "I4ABCD", "user": {"login": "newbie"}},
            "repository": {"namespace": "openeuler", "path": "kernel", "full_name": "openeuler/kernel"}
        });
        let event = decode_event(HookKind::Issue, body.to_string().as_bytes()).unwrap();
        assert_eq!(event.repo.full_name(), "openeuler/kernel");
        assert_eq!(event.item, ItemRef::Issue(IssueNumber::new("I4ABCD").unwrap()));
        assert_eq!(event.author.as_str(), "newbie");
        assert_eq!(event.action, EventAction::Opened);
    }

    #[test]
    fn test_merge_request_hook_falls_back_to_full_name() {
        let body = json!({
            "action": "update",
            "pull_request": {"number": 42, "user": {"login": "dev"}},
            "repository": {"full_name": "src-openeuler/gcc"}
        });
        let event = decode_event(HookKind::MergeRequest, body.to_string().as_bytes()).unwrap();
        assert_eq!(event.repo.org(), "src-openeuler");
        assert_eq!(event.item.pull_number(), Some(PullNumber::new(42)));
        assert_eq!(event.action, EventAction::Other("update".into()));
    }

    #[test]
    fn test_blank_author_rejected() {
        let body = json!({
            "action": "open",
            "issue": {"number": "I1", "user": {"login": " "}},
            "repository": {"full_name": "openeuler/kernel"}
        });
        let err = decode_event(HookKind::Issue, body.to_string().as_bytes()).unwrap_err();
        assert!(matches!(err, PayloadError::MissingField { field: "user.login" }));
    }

    #[test]
    fn test_malformed_json() {
        let err = decode_event(HookKind::MergeRequest, b"{not json").unwrap_err();
        assert!(matches!(err, PayloadError::Json(_)));
    }

    #[test]
    fn test_header_mapping() {
        assert_eq!(HookKind::from_header("Issue Hook"), Some(HookKind::Issue));
        assert_eq!(HookKind::from_header("Merge Request Hook"), Some(HookKind::MergeRequest));
        assert_eq!(HookKind::from_header("Note Hook"), None);
    }
}
