//! `sig/<name>` label derivation and idempotent create-then-apply.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::ports::IssueTracker;
use crate::{ItemRef, LabelName, RepoRef, SigName, TrackerError};

pub const SIG_LABEL_PREFIX: &str = "sig/";

/// Default cap on label length, in characters.
pub const DEFAULT_LABEL_MAX_LEN: usize = 20;

/// Derives the label for `sig`, truncated to at most `max_len` characters.
///
/// Pure and deterministic. Two SIG names sharing a truncated prefix map to
/// the same label.
pub fn sig_label(sig: &SigName, max_len: usize) -> LabelName {
    let full = format!("{SIG_LABEL_PREFIX}{sig}");
    let keep = max_len.max(SIG_LABEL_PREFIX.len() + 1);
    let name = match full.char_indices().nth(keep) {
        Some((cut, _)) => full[..cut].to_string(),
        None => full,
    };
    LabelName::from_non_blank(name)
}

/// Idempotent create-then-apply of repository labels.
pub struct LabelManager {
    tracker: Arc<dyn IssueTracker>,
}

impl LabelManager {
    pub fn new(tracker: Arc<dyn IssueTracker>) -> Self {
        Self { tracker }
    }

    /// Creates `label` on `repo` unless it already exists.
    ///
    /// # Errors
    ///
    /// When listing or creating labels fails.
    pub async fn ensure_exists(&self, repo: &RepoRef, label: &LabelName) -> Result<(), TrackerError> {
        let existing = self.tracker.list_repo_labels(repo).await?;
        if existing.iter().any(|l| l.name == label.as_str()) {
            debug!(repo = %repo, label = %label, "label already exists");
            return Ok(());
        }
        self.tracker.create_repo_label(repo, label, "").await
    }

    /// Ensures `label` exists, then applies it to `item`.
    ///
    /// A failure to list or create the label is logged and does not prevent
    /// the apply attempt. Only the apply outcome is returned.
    pub async fn ensure_and_apply(
        &self,
        repo: &RepoRef,
        item: &ItemRef,
        label: &LabelName,
    ) -> Result<(), TrackerError> {
        if let Err(e) = self.ensure_exists(repo, label).await {
            warn!(repo = %repo, label = %label, error = %e, "cannot create repository label");
        }
        self.tracker.apply_label(repo, item, label).await
    }
}
