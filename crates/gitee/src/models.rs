//! Wire shapes of the Gitee v5 REST API, limited to the fields the bot reads.

use serde::{Deserialize, Serialize};
use welcome::{ChangedFile, Collaborator, Permissions, RepoLabel, TreeEntry, TreeEntryKind};

#[derive(Debug, Deserialize)]
pub(crate) struct ContentResponse {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub encoding: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TreeResponse {
    #[serde(default)]
    pub tree: Vec<TreeItem>,
    #[serde(default)]
    pub truncated: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TreeItem {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl TreeItem {
    /// `None` for entry kinds the domain does not model.
    pub fn into_entry(self) -> Option<TreeEntry> {
        let kind = match self.kind.as_str() {
            "blob" => TreeEntryKind::Blob,
            "tree" => TreeEntryKind::Tree,
            "commit" => TreeEntryKind::Commit,
            _ => return None,
        };
        Some(TreeEntry {
            path: self.path,
            kind,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CollaboratorItem {
    pub login: String,
    #[serde(default)]
    pub permissions: Option<PermissionsItem>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PermissionsItem {
    #[serde(default)]
    pub admin: bool,
    #[serde(default)]
    pub push: bool,
    #[serde(default)]
    pub pull: bool,
}

impl From<CollaboratorItem> for Collaborator {
    fn from(item: CollaboratorItem) -> Self {
        Self {
            login: item.login,
            permissions: item.permissions.map(|p| Permissions {
                admin: p.admin,
                push: p.push,
                pull: p.pull,
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct LabelItem {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

impl From<LabelItem> for RepoLabel {
    fn from(item: LabelItem) -> Self {
        Self {
            name: item.name,
            color: item.color.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct PullFileItem {
    pub filename: String,
}

impl From<PullFileItem> for ChangedFile {
    fn from(item: PullFileItem) -> Self {
        Self {
            filename: item.filename,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateLabelRequest<'a> {
    pub name: &'a str,
    pub color: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct CommentRequest<'a> {
    pub body: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct AssigneesRequest {
    /// Comma-separated logins.
    pub assignees: String,
}
