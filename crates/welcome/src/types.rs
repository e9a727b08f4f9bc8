//! Shared value types for the welcome domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! structured values returned by the platform ports or produced by the
//! resolvers.

use serde::{Deserialize, Serialize};

use crate::{ItemRef, Login, RepoRef};

// ---------------------------------------------------------------------------
// Inbound events
// ---------------------------------------------------------------------------

/// Action carried by an issue or pull request event.
///
/// Only [`EventAction::Opened`] is ever processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    Opened,
    /// Any other action (`"update"`, `"close"`, `"merge"`, ...), kept verbatim
    /// for logging.
    Other(String),
}

impl EventAction {
    /// Maps a raw webhook action string. Both `"open"` (Gitee) and
    /// `"opened"` are accepted as [`EventAction::Opened`].
    pub fn from_raw(action: &str) -> Self {
        match action {
            "open" | "opened" => Self::Opened,
            other => Self::Other(other.to_string()),
        }
    }
}

/// An issue or pull request event delivered by the webhook transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WelcomeEvent {
    pub repo: RepoRef,
    pub item: ItemRef,
    pub author: Login,
    pub action: EventAction,
}

impl WelcomeEvent {
    /// Builds an `opened` event.
    pub fn opened(repo: RepoRef, item: ItemRef, author: Login) -> Self {
        Self {
            repo,
            item,
            author,
            action: EventAction::Opened,
        }
    }
}

// ---------------------------------------------------------------------------
// Port results
// ---------------------------------------------------------------------------

/// Permission flags of a repository collaborator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    #[serde(default)]
    pub admin: bool,
    #[serde(default)]
    pub push: bool,
    #[serde(default)]
    pub pull: bool,
}

/// A repository collaborator as returned by `list_collaborators`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collaborator {
    pub login: String,
    /// `None` when the platform omitted the permission block.
    pub permissions: Option<Permissions>,
}

impl Collaborator {
    /// `true` for collaborators holding administrative or push permission.
    pub fn can_maintain(&self) -> bool {
        self.permissions.is_some_and(|p| p.admin || p.push)
    }
}

/// Kind of an entry in a directory-tree listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeEntryKind {
    Blob,
    Tree,
    Commit,
}

/// One entry of a recursive directory-tree listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    /// Path relative to the repository root, `/`-separated.
    pub path: String,
    pub kind: TreeEntryKind,
}

impl TreeEntry {
    pub fn blob(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: TreeEntryKind::Blob,
        }
    }

    /// Final path segment.
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// A file touched by a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedFile {
    pub filename: String,
}

/// A label defined on a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoLabel {
    pub name: String,
    #[serde(default)]
    pub color: String,
}

// ---------------------------------------------------------------------------
// Resolution results
// ---------------------------------------------------------------------------

/// Role a login plays for a SIG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Maintainer,
    Committer,
}

/// Deduplicated login list for one [`Role`], in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginSet(Vec<Login>);

impl LoginSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `login` unless already present. Returns `true` if inserted.
    pub fn insert(&mut self, login: Login) -> bool {
        if self.0.contains(&login) {
            false
        } else {
            self.0.push(login);
            true
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Login> {
        self.0.iter()
    }

    pub fn contains(&self, login: &str) -> bool {
        self.0.iter().any(|l| l.as_str() == login)
    }

    pub fn into_vec(self) -> Vec<Login> {
        self.0
    }
}

impl FromIterator<Login> for LoginSet {
    fn from_iter<I: IntoIterator<Item = Login>>(iter: I) -> Self {
        let mut set = Self::new();
        for login in iter {
            set.insert(login);
        }
        set
    }
}

/// The people to mention in a welcome comment.
///
/// `committers` may be empty; that is never a failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contacts {
    pub maintainers: LoginSet,
    pub committers: LoginSet,
}

impl Contacts {
    /// Contacts with maintainers only.
    pub fn maintainers_only(maintainers: LoginSet) -> Self {
        Self {
            maintainers,
            committers: LoginSet::new(),
        }
    }

    /// Returns the login set for `role`.
    pub fn by_role(&self, role: Role) -> &LoginSet {
        match role {
            Role::Maintainer => &self.maintainers,
            Role::Committer => &self.committers,
        }
    }
}
