//! Per-repository bot configuration.
//!
//! [`RepoConfig`] is the serialised form, one entry per scope. Entries are
//! validated once into a [`SettingsTable`]; lookups then pick the entry with
//! the most specific match:
//!
//! 1. an entry listing the exact `org/repo`;
//! 2. an entry listing only the `org`.
//!
//! A repository named in an entry's `excluded_repos` never matches that entry.
//! Among equally specific entries the first declared wins.

use serde::{Deserialize, Serialize};

use crate::labels::DEFAULT_LABEL_MAX_LEN;
use crate::maintainers::{ContactRouting, MaintainerSettings};
use crate::resolver::{SigSource, SigStrategy};
use crate::{BranchName, BranchRef, ConfigError, FileRef, LabelName, RepoRef};

pub const DEFAULT_SIG_LINK_BASE: &str = "https://gitee.com/openeuler/community/tree/master/sig";

/// Coordinates of the community metadata repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunityRepo {
    pub org: String,
    pub repo: String,
    pub branch: String,
}

impl Default for CommunityRepo {
    fn default() -> Self {
        Self {
            org: "openeuler".into(),
            repo: "community".into(),
            branch: "master".into(),
        }
    }
}

fn default_sig_link_base() -> String {
    DEFAULT_SIG_LINK_BASE.to_string()
}

fn default_label_max_len() -> usize {
    DEFAULT_LABEL_MAX_LEN
}

/// One configuration entry as written in the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoConfig {
    /// Scope: `"org"` or `"org/repo"` patterns.
    pub repos: Vec<String>,

    #[serde(default)]
    pub excluded_repos: Vec<String>,

    /// Community display name used in the welcome text.
    pub community_name: String,

    /// Link to the bot command help page.
    pub command_link: String,

    /// SIG manifest location as `org/repo/branch:path`. Required by the
    /// `manifest` and `text_scan` strategies.
    #[serde(default)]
    pub sig_file_path: Option<String>,

    #[serde(default)]
    pub sig_source: SigStrategy,

    #[serde(default)]
    pub community_repo: CommunityRepo,

    #[serde(default = "default_sig_link_base")]
    pub sig_link_base: String,

    #[serde(default = "default_label_max_len")]
    pub label_max_len: usize,

    /// Assign opened pull requests to the resolved maintainers.
    #[serde(default)]
    pub need_assign: bool,

    /// Enables path-routed contacts (simplified-contact-mode).
    #[serde(default)]
    pub contact_routing: Option<ContactRouting>,

    /// Label applied to pull requests of first-time authors. Unset disables
    /// the newcomer step.
    #[serde(default)]
    pub newcomer_label: Option<String>,
}

// ---------------------------------------------------------------------------
// Validated settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum ScopeEntry {
    Org(String),
    Repo(RepoRef),
}

impl ScopeEntry {
    fn parse(pattern: &str) -> Option<Self> {
        let pattern = pattern.trim();
        if pattern.contains('/') {
            RepoRef::parse(pattern).map(Self::Repo)
        } else if pattern.is_empty() {
            None
        } else {
            Some(Self::Org(pattern.to_string()))
        }
    }
}

/// How specifically an entry matched a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum MatchRank {
    Org,
    Repo,
}

/// A validated configuration entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSettings {
    scope: Vec<ScopeEntry>,
    excluded: Vec<RepoRef>,
    pub community_name: String,
    pub command_link: String,
    pub sig_link_base: String,
    pub sig_source: SigSource,
    pub maintainers: MaintainerSettings,
    pub label_max_len: usize,
    pub need_assign: bool,
    pub newcomer_label: Option<LabelName>,
}

impl RepoSettings {
    /// Validates entry number `index`.
    pub fn from_config(index: usize, cfg: &RepoConfig) -> Result<Self, ConfigError> {
        let non_empty = |value: &str, field: &'static str| {
            if value.trim().is_empty() {
                Err(ConfigError::EmptyField { index, field })
            } else {
                Ok(())
            }
        };
        non_empty(&cfg.community_name, "community_name")?;
        non_empty(&cfg.command_link, "command_link")?;

        if cfg.repos.is_empty() {
            return Err(ConfigError::EmptyField {
                index,
                field: "repos",
            });
        }
        let scope = cfg
            .repos
            .iter()
            .map(|p| {
                ScopeEntry::parse(p).ok_or_else(|| ConfigError::InvalidRepoPattern {
                    index,
                    value: p.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let excluded = cfg
            .excluded_repos
            .iter()
            .map(|p| {
                RepoRef::parse(p).ok_or_else(|| ConfigError::InvalidRepoPattern {
                    index,
                    value: p.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let community = BranchRef {
            repo: RepoRef::new(cfg.community_repo.org.as_str(), cfg.community_repo.repo.as_str())
                .ok_or(ConfigError::EmptyField {
                    index,
                    field: "community_repo",
                })?,
            branch: BranchName::new(cfg.community_repo.branch.as_str()).ok_or(
                ConfigError::EmptyField {
                    index,
                    field: "community_repo.branch",
                },
            )?,
        };

        let sig_source = match cfg.sig_source {
            SigStrategy::TreeScan => SigSource::TreeScan(community.clone()),
            strategy => {
                let raw = cfg.sig_file_path.as_deref().unwrap_or_default();
                non_empty(raw, "sig_file_path")?;
                let file = parse_sig_file_path(raw).ok_or_else(|| {
                    ConfigError::InvalidSigFilePath {
                        index,
                        value: raw.to_string(),
                    }
                })?;
                if strategy == SigStrategy::TextScan {
                    SigSource::TextScan(file)
                } else {
                    SigSource::Manifest(file)
                }
            }
        };

        if let Some(routing) = &cfg.contact_routing {
            non_empty(&routing.file_path, "contact_routing.file_path")?;
            non_empty(&routing.branch, "contact_routing.branch")?;
        }

        if cfg.label_max_len <= crate::labels::SIG_LABEL_PREFIX.len() {
            return Err(ConfigError::LabelTooShort {
                index,
                value: cfg.label_max_len,
            });
        }

        let newcomer_label = match &cfg.newcomer_label {
            Some(raw) => Some(LabelName::new(raw.as_str()).ok_or(ConfigError::EmptyField {
                index,
                field: "newcomer_label",
            })?),
            None => None,
        };

        Ok(Self {
            scope,
            excluded,
            community_name: cfg.community_name.clone(),
            command_link: cfg.command_link.clone(),
            sig_link_base: cfg.sig_link_base.clone(),
            sig_source,
            maintainers: MaintainerSettings {
                contact_routing: cfg.contact_routing.clone(),
                community,
            },
            label_max_len: cfg.label_max_len,
            need_assign: cfg.need_assign,
            newcomer_label,
        })
    }

    fn rank(&self, repo: &RepoRef) -> Option<MatchRank> {
        if self.excluded.contains(repo) {
            return None;
        }
        self.scope
            .iter()
            .filter_map(|entry| match entry {
                ScopeEntry::Repo(r) if r == repo => Some(MatchRank::Repo),
                ScopeEntry::Org(org) if org == repo.org() => Some(MatchRank::Org),
                _ => None,
            })
            .max()
    }
}

/// Parses `org/repo/branch:path`.
pub fn parse_sig_file_path(raw: &str) -> Option<FileRef> {
    let (location, path) = raw.trim().split_once(':')?;
    let parts: Vec<&str> = location.split('/').collect();
    let [org, repo, branch] = parts.as_slice() else {
        return None;
    };
    if path.trim().is_empty() {
        return None;
    }
    Some(FileRef {
        branch: BranchRef {
            repo: RepoRef::new(*org, *repo)?,
            branch: BranchName::new(*branch)?,
        },
        path: path.trim().to_string(),
    })
}

/// All validated entries, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsTable {
    entries: Vec<RepoSettings>,
}

impl SettingsTable {
    /// Validates every entry.
    ///
    /// # Errors
    ///
    /// The first [`ConfigError`] found, tagged with the entry index.
    pub fn from_configs(configs: &[RepoConfig]) -> Result<Self, ConfigError> {
        let entries = configs
            .iter()
            .enumerate()
            .map(|(i, c)| RepoSettings::from_config(i, c))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { entries })
    }

    /// The most specific entry covering `repo`.
    pub fn for_repo(&self, repo: &RepoRef) -> Option<&RepoSettings> {
        let mut best: Option<(MatchRank, &RepoSettings)> = None;
        for entry in &self.entries {
            if let Some(rank) = entry.rank(repo) {
                if best.map_or(true, |(r, _)| rank > r) {
                    best = Some((rank, entry));
                }
            }
        }
        best.map(|(_, entry)| entry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
