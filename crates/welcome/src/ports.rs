//! Port traits: everything the domain needs from the hosting platform.
//!
//! Infrastructure crates implement these; the domain never sees HTTP,
//! pagination, authentication, or transport encodings. Every call is treated
//! as blocking with an externally imposed deadline and is attempted once.

use async_trait::async_trait;

use crate::{
    BranchRef, ChangedFile, Collaborator, FileRef, ItemRef, LabelName, Login, PullNumber,
    RepoLabel, RepoRef, TrackerError, TreeEntry,
};

/// Read access to repository content and membership.
#[async_trait]
pub trait CodeRepository: Send + Sync {
    /// Returns the raw bytes of `file`, already decoded from any transport
    /// encoding.
    async fn fetch_file_content(&self, file: &FileRef) -> Result<Vec<u8>, TrackerError>;

    /// Lists the file tree of `branch`.
    ///
    /// A listing the platform cut short is an error, never a partial `Ok`.
    async fn fetch_directory_tree(
        &self,
        branch: &BranchRef,
        recursive: bool,
    ) -> Result<Vec<TreeEntry>, TrackerError>;

    /// Lists every collaborator of `repo` (all pages).
    async fn list_collaborators(&self, repo: &RepoRef) -> Result<Vec<Collaborator>, TrackerError>;
}

/// Labels and comments on issues and pull requests.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    async fn list_repo_labels(&self, repo: &RepoRef) -> Result<Vec<RepoLabel>, TrackerError>;

    /// Creates a repository label. An empty `color` leaves the colour to the
    /// platform default.
    async fn create_repo_label(
        &self,
        repo: &RepoRef,
        name: &LabelName,
        color: &str,
    ) -> Result<(), TrackerError>;

    async fn apply_label(
        &self,
        repo: &RepoRef,
        item: &ItemRef,
        name: &LabelName,
    ) -> Result<(), TrackerError>;

    async fn post_comment(
        &self,
        repo: &RepoRef,
        item: &ItemRef,
        text: &str,
    ) -> Result<(), TrackerError>;
}

/// Pull-request specific operations.
#[async_trait]
pub trait PullRequestManager: Send + Sync {
    async fn assign_reviewers(
        &self,
        repo: &RepoRef,
        number: PullNumber,
        logins: &[Login],
    ) -> Result<(), TrackerError>;

    async fn fetch_changed_files(
        &self,
        repo: &RepoRef,
        number: PullNumber,
    ) -> Result<Vec<ChangedFile>, TrackerError>;
}

/// The full platform surface used by the dispatcher.
pub trait CodeHost: CodeRepository + IssueTracker + PullRequestManager {}

impl<T> CodeHost for T where T: CodeRepository + IssueTracker + PullRequestManager {}

/// Answers whether an author is new to the community.
///
/// Used only by the optional newcomer step; independent of SIG resolution.
#[async_trait]
pub trait NewcomerDirectory: Send + Sync {
    async fn is_newcomer(&self, author: &Login) -> Result<bool, TrackerError>;
}
