//! In-memory platform double for unit tests.
//!
//! [`FakeHost`] implements every port, serves canned data, records each call,
//! and can be told to fail a named operation with HTTP 500.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::ports::{CodeRepository, IssueTracker, NewcomerDirectory, PullRequestManager};
use crate::{
    BranchRef, ChangedFile, Collaborator, FileRef, ItemRef, LabelName, Login, Permissions,
    PullNumber, RepoLabel, RepoRef, TrackerError, TrackerErrorKind, TreeEntry,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub operation: &'static str,
    pub detail: String,
}

#[derive(Default)]
pub struct FakeHost {
    files: HashMap<FileRef, Vec<u8>>,
    trees: HashMap<BranchRef, Vec<TreeEntry>>,
    collaborators: HashMap<RepoRef, Vec<Collaborator>>,
    labels: HashMap<RepoRef, Vec<RepoLabel>>,
    changed_files: HashMap<(RepoRef, PullNumber), Vec<ChangedFile>>,
    newcomers: HashSet<String>,
    failing: HashSet<&'static str>,
    calls: Mutex<Vec<Call>>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, file: FileRef, content: &str) -> Self {
        self.files.insert(file, content.as_bytes().to_vec());
        self
    }

    pub fn with_tree(mut self, branch: BranchRef, entries: Vec<TreeEntry>) -> Self {
        self.trees.insert(branch, entries);
        self
    }

    /// Registers collaborators as `(login, admin, push)` triples.
    pub fn with_collaborators(mut self, repo: RepoRef, members: &[(&str, bool, bool)]) -> Self {
        let list = members
            .iter()
            .map(|(login, admin, push)| Collaborator {
                login: (*login).to_string(),
                permissions: Some(Permissions {
                    admin: *admin,
                    push: *push,
                    pull: true,
                }),
            })
            .collect();
        self.collaborators.insert(repo, list);
        self
    }

    pub fn with_labels(mut self, repo: RepoRef, names: &[&str]) -> Self {
        let list = names
            .iter()
            .map(|n| RepoLabel {
                name: (*n).to_string(),
                color: String::new(),
            })
            .collect();
        self.labels.insert(repo, list);
        self
    }

    pub fn with_changed_files(mut self, repo: RepoRef, number: PullNumber, names: &[&str]) -> Self {
        let list = names
            .iter()
            .map(|n| ChangedFile {
                filename: (*n).to_string(),
            })
            .collect();
        self.changed_files.insert((repo, number), list);
        self
    }

    pub fn with_newcomer(mut self, login: &str) -> Self {
        self.newcomers.insert(login.to_string());
        self
    }

    /// Every call to `operation` fails with HTTP 500.
    pub fn failing(mut self, operation: &'static str) -> Self {
        self.failing.insert(operation);
        self
    }

    /// Number of recorded calls to `operation`.
    pub fn calls(&self, operation: &str) -> usize {
        self.recorded().iter().filter(|c| c.operation == operation).count()
    }

    /// Details of every recorded call to `operation`, in order.
    pub fn details(&self, operation: &str) -> Vec<String> {
        self.recorded()
            .into_iter()
            .filter(|c| c.operation == operation)
            .map(|c| c.detail)
            .collect()
    }

    fn recorded(&self) -> Vec<Call> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn record(&self, operation: &'static str, detail: String) -> Result<(), TrackerError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(Call { operation, detail });
        }
        if self.failing.contains(operation) {
            Err(TrackerError::new(
                operation,
                TrackerErrorKind::Status(500),
                "injected failure",
            ))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CodeRepository for FakeHost {
    async fn fetch_file_content(&self, file: &FileRef) -> Result<Vec<u8>, TrackerError> {
        self.record("fetch_file_content", file.to_string())?;
        self.files.get(file).cloned().ok_or_else(|| {
            TrackerError::new("fetch_file_content", TrackerErrorKind::NotFound, file.to_string())
        })
    }

    async fn fetch_directory_tree(
        &self,
        branch: &BranchRef,
        _recursive: bool,
    ) -> Result<Vec<TreeEntry>, TrackerError> {
        self.record("fetch_directory_tree", branch.to_string())?;
        self.trees.get(branch).cloned().ok_or_else(|| {
            TrackerError::new("fetch_directory_tree", TrackerErrorKind::NotFound, branch.to_string())
        })
    }

    async fn list_collaborators(&self, repo: &RepoRef) -> Result<Vec<Collaborator>, TrackerError> {
        self.record("list_collaborators", repo.to_string())?;
        Ok(self.collaborators.get(repo).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl IssueTracker for FakeHost {
    async fn list_repo_labels(&self, repo: &RepoRef) -> Result<Vec<RepoLabel>, TrackerError> {
        self.record("list_repo_labels", repo.to_string())?;
        Ok(self.labels.get(repo).cloned().unwrap_or_default())
    }

    async fn create_repo_label(
        &self,
        _repo: &RepoRef,
        name: &LabelName,
        color: &str,
    ) -> Result<(), TrackerError> {
        self.record("create_repo_label", format!("{name}|{color}"))
    }

    async fn apply_label(
        &self,
        _repo: &RepoRef,
        item: &ItemRef,
        name: &LabelName,
    ) -> Result<(), TrackerError> {
        self.record("apply_label", format!("{item}|{name}"))
    }

    async fn post_comment(
        &self,
        _repo: &RepoRef,
        item: &ItemRef,
        text: &str,
    ) -> Result<(), TrackerError> {
        self.record("post_comment", format!("{item}|{text}"))
    }
}

#[async_trait]
impl PullRequestManager for FakeHost {
    async fn assign_reviewers(
        &self,
        _repo: &RepoRef,
        number: PullNumber,
        logins: &[Login],
    ) -> Result<(), TrackerError> {
        let names: Vec<&str> = logins.iter().map(Login::as_str).collect();
        self.record("assign_reviewers", format!("{number}|{}", names.join(",")))
    }

    async fn fetch_changed_files(
        &self,
        repo: &RepoRef,
        number: PullNumber,
    ) -> Result<Vec<ChangedFile>, TrackerError> {
        self.record("fetch_changed_files", format!("{repo}#{number}"))?;
        Ok(self
            .changed_files
            .get(&(repo.clone(), number))
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl NewcomerDirectory for FakeHost {
    async fn is_newcomer(&self, author: &Login) -> Result<bool, TrackerError> {
        self.record("is_newcomer", author.to_string())?;
        Ok(self.newcomers.contains(author.as_str()))
    }
}
