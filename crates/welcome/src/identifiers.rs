//! Newtype domain identifiers.
//!
//! Every domain concept that has an identity is represented as a distinct newtype
//! wrapping a primitive. This prevents accidentally interchanging, for example,
//! a [`SigName`] with a [`Login`] even though both are strings under the hood.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty
            /// or only whitespace.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.trim().is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Macro for u64-wrapped newtypes (platform-assigned integers).
// Generates: struct (Copy), new(), as_u64(), Display.
// ---------------------------------------------------------------------------
macro_rules! u64_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(u64);

        impl $name {
            /// Creates a new identifier from a raw integer.
            pub fn new(value: u64) -> Self {
                Self(value)
            }

            /// Returns the underlying integer value.
            pub fn as_u64(self) -> u64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Identifiers: platform-integer-backed
// ---------------------------------------------------------------------------

u64_id! {
    /// Identifies a pull request within its repository.
    PullNumber
}

// ---------------------------------------------------------------------------
// Identifiers: string-backed
// ---------------------------------------------------------------------------

string_id! {
    /// Name of a Special Interest Group as declared in the community manifest.
    ///
    /// Unique within one SIG directory.
    SigName
}

string_id! {
    /// A platform account name (the part after `@` in a mention).
    Login
}

string_id! {
    /// A Git branch name (e.g. `"master"`).
    BranchName
}

string_id! {
    /// Identifies an issue within its repository.
    ///
    /// Gitee issue numbers are alphanumeric (e.g. `"I4ABCD"`), so this is
    /// string-backed unlike [`PullNumber`].
    IssueNumber
}

string_id! {
    /// Name of a repository label (e.g. `"sig/kernel"`).
    LabelName
}

impl LabelName {
    /// Wraps a name the caller has already built from a non-blank prefix.
    pub(crate) fn from_non_blank(value: String) -> Self {
        debug_assert!(!value.trim().is_empty());
        Self(value)
    }
}

// ---------------------------------------------------------------------------
// Repository coordinates
// ---------------------------------------------------------------------------

/// A repository in `"org/repo"` form.
///
/// Both halves are non-empty and contain no `/`. Matching is always by exact
/// equality of both halves, never by suffix.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RepoRef {
    org: String,
    repo: String,
}

impl RepoRef {
    /// Creates a repository reference, returning `None` if either half is
    /// empty or contains a `/`.
    pub fn new(org: impl Into<String>, repo: impl Into<String>) -> Option<Self> {
        let org = org.into();
        let repo = repo.into();
        let valid = |s: &str| !s.trim().is_empty() && !s.contains('/');
        if valid(&org) && valid(&repo) {
            Some(Self { org, repo })
        } else {
            None
        }
    }

    /// Parses `"org/repo"`. Surrounding whitespace is ignored.
    pub fn parse(full_name: &str) -> Option<Self> {
        let (org, repo) = full_name.trim().split_once('/')?;
        Self::new(org, repo)
    }

    pub fn org(&self) -> &str {
        &self.org
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }

    /// Returns `"org/repo"`.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.org, self.repo)
    }
}

impl std::fmt::Display for RepoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.org, self.repo)
    }
}

/// A branch of a repository; the key of the SIG index cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BranchRef {
    pub repo: RepoRef,
    pub branch: BranchName,
}

impl std::fmt::Display for BranchRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.repo, self.branch)
    }
}

/// A file at a given branch of a repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileRef {
    pub branch: BranchRef,
    /// Path relative to the repository root.
    pub path: String,
}

impl std::fmt::Display for FileRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.branch, self.path)
    }
}

/// The issue or pull request an event refers to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemRef {
    Issue(IssueNumber),
    PullRequest(PullNumber),
}

impl ItemRef {
    /// Returns the pull request number when this is a pull request.
    pub fn pull_number(&self) -> Option<PullNumber> {
        match self {
            Self::PullRequest(n) => Some(*n),
            Self::Issue(_) => None,
        }
    }
}

impl std::fmt::Display for ItemRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Issue(n) => write!(f, "issue {n}"),
            Self::PullRequest(n) => write!(f, "pr #{n}"),
        }
    }
}
