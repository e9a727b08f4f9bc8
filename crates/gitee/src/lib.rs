//! Gitee infrastructure adapter.
//!
//! Implements the platform ports defined in the [`welcome`] crate
//! (`CodeRepository`, `IssueTracker`, `PullRequestManager`,
//! `NewcomerDirectory`) over HTTP with `reqwest`.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** This crate must not contain domain rules.
//! Gitee API details (token query parameter, pagination, base64 file content,
//! status-code mapping) are handled here; the [`welcome`] crate never sees them.

mod client;
mod models;
mod newcomer;

pub use client::{GiteeClient, GiteeConfig, GiteeError, DEFAULT_API_BASE};
pub use newcomer::PullHistoryDirectory;
