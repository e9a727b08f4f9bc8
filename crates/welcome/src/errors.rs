//! Error types for the welcome domain.
//!
//! Three classes of outcome exist for one event:
//!
//! - **Unresolved** is not an error. SIG and maintainer lookups that find
//!   nothing return an empty value (`None`, empty [`crate::LoginSet`]).
//! - **Resolution failures** ([`TrackerError`], [`FormatError`]) abort the
//!   event before any side effect is attempted.
//! - **Side-effect failures** are collected into [`SideEffectErrors`] so that
//!   every remaining side effect still runs.

use thiserror::Error;

use crate::{LabelName, RepoRef};

// ---------------------------------------------------------------------------
// Port errors
// ---------------------------------------------------------------------------

/// Broad classification of a failed platform call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerErrorKind {
    /// The requested resource does not exist (HTTP 404).
    NotFound,
    /// Credentials were missing or rejected (HTTP 401 / 403).
    Unauthorized,
    /// Any other non-success HTTP status.
    Status(u16),
    /// The request never produced a response (connect, timeout, TLS).
    Transport,
    /// A response arrived but its body could not be decoded.
    Decode,
}

impl std::fmt::Display for TrackerErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "not found"),
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::Status(code) => write!(f, "status {code}"),
            Self::Transport => write!(f, "transport failure"),
            Self::Decode => write!(f, "undecodable response"),
        }
    }
}

/// Failure of one outbound platform operation.
///
/// Returned by every method of the port traits in [`crate::ports`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{operation} failed ({kind}): {message}")]
pub struct TrackerError {
    /// Name of the port operation, e.g. `"list_collaborators"`.
    pub operation: &'static str,
    pub kind: TrackerErrorKind,
    pub message: String,
}

impl TrackerError {
    pub fn new(operation: &'static str, kind: TrackerErrorKind, message: impl Into<String>) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Document errors
// ---------------------------------------------------------------------------

/// A community document (SIG manifest, sig-info, routing file) could not be
/// decoded or failed validation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FormatError {
    /// The document is not valid YAML/UTF-8 or does not have the expected shape.
    #[error("cannot decode {document}: {message}")]
    Decode {
        document: &'static str,
        message: String,
    },

    /// A SIG entry has an empty or missing name.
    #[error("sig entry {index} has no name")]
    MissingSigName { index: usize },

    /// Two SIG entries share one name.
    #[error("sig name '{name}' is declared more than once")]
    DuplicateSigName { name: String },
}

// ---------------------------------------------------------------------------
// Side-effect aggregation
// ---------------------------------------------------------------------------

/// A side effect attempted after resolution succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SideEffect {
    ApplyLabel(LabelName),
    PostComment,
}

impl std::fmt::Display for SideEffect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ApplyLabel(label) => write!(f, "apply label '{label}'"),
            Self::PostComment => write!(f, "post comment"),
        }
    }
}

/// All side-effect failures of one event, in the order they were attempted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SideEffectErrors {
    failures: Vec<(SideEffect, TrackerError)>,
}

impl SideEffectErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the outcome of one side effect; `Ok` outcomes are dropped.
    pub fn record(&mut self, effect: SideEffect, outcome: Result<(), TrackerError>) {
        if let Err(e) = outcome {
            self.failures.push((effect, e));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failures(&self) -> &[(SideEffect, TrackerError)] {
        &self.failures
    }

    /// `Ok(())` when nothing failed, otherwise the aggregate as an error.
    pub fn into_result(self) -> Result<(), WelcomeError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(WelcomeError::SideEffects(self))
        }
    }
}

impl std::fmt::Display for SideEffectErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, (effect, err)) in self.failures.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{effect}: {err}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Per-event errors
// ---------------------------------------------------------------------------

/// Errors returned by [`crate::EventDispatcher::handle`].
#[derive(Debug, Error)]
pub enum WelcomeError {
    /// A platform call needed for resolution failed.
    #[error(transparent)]
    Tracker(#[from] TrackerError),

    /// A community document needed for resolution was malformed.
    #[error(transparent)]
    Format(#[from] FormatError),

    /// No SIG owns the repository. Fatal for the event.
    #[error("cannot resolve the sig of repository {repo}")]
    SigNotFound { repo: RepoRef },

    /// No configuration entry covers the repository.
    #[error("no configuration for repository {repo}")]
    NoConfig { repo: RepoRef },

    /// One or more side effects failed after resolution succeeded.
    #[error("{0}")]
    SideEffects(SideEffectErrors),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Configuration is invalid. Produced at load time; the bot never starts
/// with an invalid configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required text field is blank.
    #[error("entry {index}: {field} must not be empty")]
    EmptyField { index: usize, field: &'static str },

    /// `sig_file_path` is not `org/repo/branch:path`.
    #[error("entry {index}: invalid sig_file_path '{value}', expected org/repo/branch:path")]
    InvalidSigFilePath { index: usize, value: String },

    /// A `repos` or `excluded_repos` pattern is neither `org` nor `org/repo`.
    #[error("entry {index}: invalid repository pattern '{value}'")]
    InvalidRepoPattern { index: usize, value: String },

    /// `label_max_len` cannot fit the prefix and one character.
    #[error("entry {index}: label_max_len must leave room for the 'sig/' prefix, got {value}")]
    LabelTooShort { index: usize, value: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_effect_errors_join_every_failure() {
        let mut errs = SideEffectErrors::new();
        errs.record(SideEffect::PostComment, Ok(()));
        assert!(errs.is_empty());

        errs.record(
            SideEffect::PostComment,
            Err(TrackerError::new("post_comment", TrackerErrorKind::Status(500), "boom")),
        );
        errs.record(
            SideEffect::ApplyLabel(LabelName::new("sig/x").unwrap()),
            Err(TrackerError::new("apply_label", TrackerErrorKind::NotFound, "gone")),
        );

        let text = errs.to_string();
        assert!(text.contains("post comment: post_comment failed (status 500): boom"));
        assert!(text.contains("apply label 'sig/x'"));
        assert!(matches!(errs.into_result(), Err(WelcomeError::SideEffects(e)) if e.failures().len() == 2));
    }
}
