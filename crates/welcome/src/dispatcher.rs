//! Per-event orchestration.
//!
//! Each event ends in exactly one of three states:
//!
//! | State | Returned as |
//! |-------|-------------|
//! | ignored (any action other than "opened") | `Ok(EventOutcome::Ignored)` |
//! | completed | `Ok(EventOutcome::Completed)` |
//! | completed with errors | `Err(WelcomeError::SideEffects(..))` |
//!
//! Resolution failures (`NoConfig`, `SigNotFound`, `Tracker`, `Format`) are
//! returned before any side effect is attempted. Once resolution succeeds the
//! comment and the label are both always attempted and their failures are
//! aggregated.

use std::sync::Arc;

use tracing::{debug, info, info_span, warn, Instrument};

use crate::composer::{compose_welcome, WelcomeContext};
use crate::config::{RepoSettings, SettingsTable};
use crate::labels::{sig_label, LabelManager};
use crate::maintainers::MaintainerResolver;
use crate::ports::{CodeHost, IssueTracker, NewcomerDirectory, PullRequestManager};
use crate::resolver::{RepoToSigResolver, TreeCache};
use crate::{
    Contacts, EventAction, Login, PullNumber, SideEffect, SideEffectErrors, SigName, WelcomeError,
    WelcomeEvent,
};

/// Terminal state of a successfully handled event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// The event was not an "opened" action; nothing was done.
    Ignored,
    /// The welcome comment was posted and the SIG label applied.
    Completed { sig: SigName },
}

/// Runs the welcome flow for one event at a time; shareable across tasks.
///
/// The SIG resolver and the maintainer resolver read one [`TreeCache`], so
/// the community repository is listed once and reused by both.
pub struct EventDispatcher {
    settings: SettingsTable,
    sigs: RepoToSigResolver,
    maintainers: MaintainerResolver,
    labels: LabelManager,
    tracker: Arc<dyn IssueTracker>,
    pulls: Arc<dyn PullRequestManager>,
    newcomers: Option<Arc<dyn NewcomerDirectory>>,
}

impl EventDispatcher {
    pub fn new<H>(host: Arc<H>, settings: SettingsTable) -> Self
    where
        H: CodeHost + 'static,
    {
        let trees = Arc::new(TreeCache::new());
        Self {
            settings,
            sigs: RepoToSigResolver::with_cache(host.clone(), Arc::clone(&trees)),
            maintainers: MaintainerResolver::with_tree_cache(host.clone(), trees),
            labels: LabelManager::new(host.clone()),
            tracker: host.clone(),
            pulls: host,
            newcomers: None,
        }
    }

    /// Enables the newcomer step for entries that configure a newcomer label.
    pub fn with_newcomer_directory(mut self, directory: Arc<dyn NewcomerDirectory>) -> Self {
        self.newcomers = Some(directory);
        self
    }

    /// The validated per-repository settings.
    pub fn settings(&self) -> &SettingsTable {
        &self.settings
    }

    /// The SIG resolver, exposing the shared tree cache for invalidation.
    pub fn sig_resolver(&self) -> &RepoToSigResolver {
        &self.sigs
    }

    /// Handles one issue or pull request event.
    ///
    /// # Errors
    ///
    /// See the module documentation.
    pub async fn handle(&self, event: &WelcomeEvent) -> Result<EventOutcome, WelcomeError> {
        if let EventAction::Other(action) = &event.action {
            debug!(repo = %event.repo, item = %event.item, action = %action, "ignoring event");
            return Ok(EventOutcome::Ignored);
        }

        let span = info_span!(
            "welcome",
            org = event.repo.org(),
            repo = event.repo.repo(),
            item = %event.item,
            author = %event.author,
        );
        self.process(event).instrument(span).await
    }

    async fn process(&self, event: &WelcomeEvent) -> Result<EventOutcome, WelcomeError> {
        let repo = &event.repo;
        let settings = self
            .settings
            .for_repo(repo)
            .ok_or_else(|| WelcomeError::NoConfig { repo: repo.clone() })?;

        let sig = self
            .sigs
            .resolve(repo, &settings.sig_source)
            .await?
            .ok_or_else(|| WelcomeError::SigNotFound { repo: repo.clone() })?;

        let pull = event.item.pull_number();
        let contacts = self
            .maintainers
            .resolve(repo, &sig, pull, &settings.maintainers)
            .await?;

        if let Some(number) = pull.filter(|_| settings.need_assign) {
            self.assign(event, number, &contacts).await;
        }

        let comment = compose_welcome(&WelcomeContext {
            author: &event.author,
            sig: &sig,
            contacts: &contacts,
            community_name: &settings.community_name,
            command_link: &settings.command_link,
            sig_link_base: &settings.sig_link_base,
        });

        let mut errors = SideEffectErrors::new();
        self.label_newcomer(event, settings, &mut errors).await;

        errors.record(
            SideEffect::PostComment,
            self.tracker.post_comment(repo, &event.item, &comment).await,
        );

        let label = sig_label(&sig, settings.label_max_len);
        let applied = self.labels.ensure_and_apply(repo, &event.item, &label).await;
        errors.record(SideEffect::ApplyLabel(label), applied);

        if errors.is_empty() {
            info!(sig = %sig, maintainers = contacts.maintainers.len(), "welcomed author");
        } else {
            warn!(sig = %sig, errors = %errors, "welcome completed with errors");
        }
        errors.into_result()?;
        Ok(EventOutcome::Completed { sig })
    }

    async fn assign(&self, event: &WelcomeEvent, number: PullNumber, contacts: &Contacts) {
        let logins: Vec<Login> = contacts.maintainers.iter().cloned().collect();
        if logins.is_empty() {
            return;
        }
        if let Err(e) = self.pulls.assign_reviewers(&event.repo, number, &logins).await {
            warn!(error = %e, "cannot assign maintainers to pull request");
        }
    }

    /// Runs only for pull requests whose entry configures a newcomer label.
    /// A failed lookup is logged and skipped; a failed apply is aggregated.
    async fn label_newcomer(
        &self,
        event: &WelcomeEvent,
        settings: &RepoSettings,
        errors: &mut SideEffectErrors,
    ) {
        let (Some(directory), Some(label), Some(_)) = (
            &self.newcomers,
            &settings.newcomer_label,
            event.item.pull_number(),
        ) else {
            return;
        };

        match directory.is_newcomer(&event.author).await {
            Ok(true) => {
                let outcome = self.tracker.apply_label(&event.repo, &event.item, label).await;
                errors.record(SideEffect::ApplyLabel(label.clone()), outcome);
            }
            Ok(false) => debug!("author is not a newcomer"),
            Err(e) => warn!(error = %e, "newcomer lookup failed"),
        }
    }
}
