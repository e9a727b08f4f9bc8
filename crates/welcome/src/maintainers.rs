//! Maintainer and committer lookup for a SIG.
//!
//! Sources are tried in priority order and a lower source is consulted only
//! when every higher one produced nothing:
//!
//! 1. path-routed contacts (pull requests only, when a routing document is
//!    configured): owners of the paths the pull request touches;
//! 2. repository collaborators holding admin or push permission;
//! 3. if the community repository carries an `OWNERS` file, step 2 stands;
//! 4. otherwise the SIG's `sig-info.yaml` maintainers and committers replace
//!    the step 2 result.
//!
//! Only a failure of step 2 fails the lookup. Failures in steps 1, 3 and 4 are
//! logged and fall through.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::ports::CodeHost;
use crate::resolver::TreeCache;
use crate::sig_directory::CommunityTree;
use crate::{
    BranchName, BranchRef, ChangedFile, Contacts, FileRef, FormatError, Login, LoginSet,
    PullNumber, RepoRef, SigName, TrackerError, TreeEntry, WelcomeError,
};

const OWNERS_FILE: &str = "OWNERS";
const SIG_INFO_FILE: &str = "sig-info.yaml";

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct RawMember {
    #[serde(default)]
    gitee_id: Option<String>,
}

fn collect_logins<'a>(members: impl IntoIterator<Item = &'a RawMember>) -> LoginSet {
    members
        .into_iter()
        .filter_map(|m| m.gitee_id.as_deref())
        .filter_map(|id| Login::new(id.trim()))
        .collect()
}

#[derive(Debug, Default, Deserialize)]
struct RawRoutingDocument {
    #[serde(default)]
    relations: Vec<RawRelation>,
}

#[derive(Debug, Default, Deserialize)]
struct RawRelation {
    #[serde(default)]
    path: Vec<String>,
    #[serde(default)]
    owner: Vec<RawMember>,
}

/// Owners of every changed file whose name contains `pattern`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathOwnershipRule {
    pub pattern: String,
    pub owners: LoginSet,
}

/// Decodes a routing document into one rule per declared path pattern.
/// Blank patterns are dropped.
pub fn parse_routing_document(raw: &[u8]) -> Result<Vec<PathOwnershipRule>, FormatError> {
    let doc: RawRoutingDocument = serde_yaml::from_slice(raw).map_err(|e| FormatError::Decode {
        document: "contact routing document",
        message: e.to_string(),
    })?;

    let mut rules = Vec::new();
    for relation in &doc.relations {
        let owners = collect_logins(&relation.owner);
        for pattern in relation.path.iter().filter(|p| !p.trim().is_empty()) {
            rules.push(PathOwnershipRule {
                pattern: pattern.clone(),
                owners: owners.clone(),
            });
        }
    }
    Ok(rules)
}

/// Union of the owners of every rule matched by any changed file.
pub fn route_contacts(rules: &[PathOwnershipRule], changed: &[ChangedFile]) -> LoginSet {
    let mut owners = LoginSet::new();
    for file in changed {
        for rule in rules.iter().filter(|r| file.filename.contains(&r.pattern)) {
            for login in rule.owners.iter() {
                owners.insert(login.clone());
            }
        }
    }
    owners
}

#[derive(Debug, Default, Deserialize)]
struct RawSigInfo {
    #[serde(default)]
    maintainers: Vec<RawMember>,
    #[serde(default)]
    committers: Vec<RawMember>,
    #[serde(default)]
    repositories: Vec<RawSigRepository>,
}

#[derive(Debug, Default, Deserialize)]
struct RawSigRepository {
    #[serde(default)]
    committers: Vec<RawMember>,
}

/// Decodes a `sig-info.yaml` document into its maintainer and committer sets.
///
/// Committers are gathered from the top level and from every repository
/// block.
pub fn parse_sig_info(raw: &[u8]) -> Result<Contacts, FormatError> {
    let info: RawSigInfo = serde_yaml::from_slice(raw).map_err(|e| FormatError::Decode {
        document: "sig-info",
        message: e.to_string(),
    })?;

    let maintainers = collect_logins(&info.maintainers);
    let committers = collect_logins(
        info.committers
            .iter()
            .chain(info.repositories.iter().flat_map(|r| r.committers.iter())),
    );
    Ok(Contacts {
        maintainers,
        committers,
    })
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Location of the path-routing document inside the event repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRouting {
    /// Repository-relative path of the routing document.
    pub file_path: String,
    /// Branch the document is read from.
    pub branch: String,
}

/// Per-repository inputs of [`MaintainerResolver::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaintainerSettings {
    /// Enables step 1 when set.
    pub contact_routing: Option<ContactRouting>,
    /// The community metadata repository holding `OWNERS` / `sig-info.yaml`.
    pub community: BranchRef,
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Finds who to mention for a SIG, following the source order in the module
/// documentation.
pub struct MaintainerResolver {
    host: Arc<dyn CodeHost>,
    trees: Arc<TreeCache>,
}

impl MaintainerResolver {
    /// A resolver with a private community tree cache.
    pub fn new(host: Arc<dyn CodeHost>) -> Self {
        Self::with_tree_cache(host, Arc::new(TreeCache::new()))
    }

    /// A resolver reading community listings from `trees`, typically the cache
    /// shared with [`crate::resolver::RepoToSigResolver`].
    pub fn with_tree_cache(host: Arc<dyn CodeHost>, trees: Arc<TreeCache>) -> Self {
        Self { host, trees }
    }

    /// Resolves the contacts for `sig` as seen from `repo`.
    ///
    /// `pull` is the pull request number for pull request events.
    ///
    /// # Errors
    ///
    /// Only when listing the collaborators of `repo` fails and path routing
    /// did not already produce contacts.
    pub async fn resolve(
        &self,
        repo: &RepoRef,
        sig: &SigName,
        pull: Option<PullNumber>,
        settings: &MaintainerSettings,
    ) -> Result<Contacts, TrackerError> {
        if let (Some(routing), Some(number)) = (&settings.contact_routing, pull) {
            match self.routed_contacts(repo, number, routing).await {
                Ok(owners) if !owners.is_empty() => {
                    debug!(repo = %repo, count = owners.len(), "using path-routed contacts");
                    return Ok(Contacts::maintainers_only(owners));
                }
                Ok(_) => debug!(repo = %repo, "no routed contact matched the changed files"),
                Err(e) => warn!(repo = %repo, error = %e, "path-routed contact lookup failed"),
            }
        }

        let collaborators: LoginSet = self
            .host
            .list_collaborators(repo)
            .await?
            .into_iter()
            .filter(|c| c.can_maintain())
            .filter_map(|c| Login::new(c.login))
            .collect();

        match self.community_contacts(sig, &settings.community).await {
            Ok(Some(contacts)) => Ok(contacts),
            Ok(None) => Ok(Contacts::maintainers_only(collaborators)),
            Err(e) => {
                warn!(sig = %sig, error = %e, "community contact lookup failed, using collaborators");
                Ok(Contacts::maintainers_only(collaborators))
            }
        }
    }

    async fn routed_contacts(
        &self,
        repo: &RepoRef,
        number: PullNumber,
        routing: &ContactRouting,
    ) -> Result<LoginSet, WelcomeError> {
        let changed = self.host.fetch_changed_files(repo, number).await?;
        let file = FileRef {
            branch: BranchRef {
                repo: repo.clone(),
                branch: BranchName::new(routing.branch.as_str()).ok_or_else(|| {
                    FormatError::Decode {
                        document: "contact routing document",
                        message: "empty branch".into(),
                    }
                })?,
            },
            path: routing.file_path.clone(),
        };
        let raw = self.host.fetch_file_content(&file).await?;
        let rules = parse_routing_document(&raw)?;
        Ok(route_contacts(&rules, &changed))
    }

    /// `Ok(None)` means the collaborator result stands.
    ///
    /// Reads the cached community listing. When the cached listing has no
    /// `sig-info.yaml` for `sig` it is re-listed once, so a SIG added after the
    /// snapshot was taken is still found.
    async fn community_contacts(
        &self,
        sig: &SigName,
        community: &BranchRef,
    ) -> Result<Option<Contacts>, WelcomeError> {
        let (mut tree, mut fresh) = match self.trees.get(community) {
            Some(snapshot) => (snapshot, false),
            None => (self.trees.refresh(self.host.as_ref(), community).await?, true),
        };

        let entry = loop {
            if has_owners_file(&tree) {
                debug!(community = %community, "community carries OWNERS, keeping collaborators");
                return Ok(None);
            }
            if let Some(entry) = find_sig_info(tree.entries(), sig) {
                break entry.clone();
            }
            if fresh {
                debug!(sig = %sig, "no sig-info document for sig");
                return Ok(None);
            }
            debug!(sig = %sig, community = %community, "cached listing has no sig-info, refreshing");
            tree = self.trees.refresh(self.host.as_ref(), community).await?;
            fresh = true;
        };

        let file = FileRef {
            branch: community.clone(),
            path: entry.path.clone(),
        };
        let contacts = parse_sig_info(&self.host.fetch_file_content(&file).await?)?;
        if contacts.maintainers.is_empty() {
            debug!(sig = %sig, path = %entry.path, "sig-info lists no maintainers");
            return Ok(None);
        }
        Ok(Some(contacts))
    }
}

fn has_owners_file(tree: &CommunityTree) -> bool {
    tree.entries().iter().any(|e| e.file_name() == OWNERS_FILE)
}

/// Prefers a `sig-info.yaml` whose parent directory is exactly the SIG name,
/// then any whose path contains it.
fn find_sig_info<'a>(tree: &'a [TreeEntry], sig: &SigName) -> Option<&'a TreeEntry> {
    let candidates = || tree.iter().filter(|e| e.file_name() == SIG_INFO_FILE);
    candidates()
        .find(|e| e.path.split('/').rev().nth(1) == Some(sig.as_str()))
        .or_else(|| candidates().find(|e| e.path.contains(sig.as_str())))
}
