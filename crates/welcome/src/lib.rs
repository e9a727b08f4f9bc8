//! Core domain of the SIG welcome bot.
//!
//! On a newly opened issue or pull request the bot resolves which Special
//! Interest Group (SIG) owns the repository, finds that SIG's maintainers and
//! committers, posts a welcome comment mentioning them, and tags the item
//! with a `sig/<name>` label, creating the label first if needed.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! Platform access goes through the traits in [`ports`]; infrastructure
//! crates implement them.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`SigName`, `Login`, `RepoRef`, ...) |
//! | [`types`] | Events, port results, resolved contacts |
//! | [`errors`] | Error taxonomy and side-effect aggregation |
//! | [`ports`] | Outbound platform traits |
//! | [`sig_directory`] | Manifest, text and tree parsing into SIG records |
//! | [`resolver`] | Repository → SIG resolution and the shared community tree cache |
//! | [`maintainers`] | Prioritised maintainer/committer lookup |
//! | [`composer`] | Welcome comment rendering |
//! | [`labels`] | Label derivation and idempotent create-then-apply |
//! | [`config`] | Per-repository settings and scope precedence |
//! | [`dispatcher`] | Per-event orchestration |

pub mod composer;
pub mod config;
pub mod dispatcher;
pub mod errors;
pub mod identifiers;
pub mod labels;
pub mod maintainers;
pub mod ports;
pub mod resolver;
pub mod sig_directory;
pub mod types;

#[cfg(test)]
mod testing;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use config::{RepoConfig, RepoSettings, SettingsTable};
pub use dispatcher::{EventDispatcher, EventOutcome};
pub use errors::{
    ConfigError, FormatError, SideEffect, SideEffectErrors, TrackerError, TrackerErrorKind,
    WelcomeError,
};
pub use identifiers::{
    BranchName, BranchRef, FileRef, IssueNumber, ItemRef, LabelName, Login, PullNumber, RepoRef,
    SigName,
};
pub use types::{
    ChangedFile, Collaborator, Contacts, EventAction, LoginSet, Permissions, RepoLabel, Role,
    TreeEntry, TreeEntryKind, WelcomeEvent,
};
