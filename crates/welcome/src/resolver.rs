//! Repository → SIG resolution.
//!
//! Exactly one [`SigSource`] is active per configuration entry. The manifest
//! strategy is the system of record; the text and tree strategies exist for
//! deployments whose community data is not a clean manifest.
//!
//! `Ok(None)` means "no SIG owns this repository". Any `Err` is a fetch or
//! decode failure and must not be read as "not found".

use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::ports::CodeRepository;
use crate::sig_directory::{extract_sig_by_text, CommunityTree, SigDirectory};
use crate::{BranchRef, FileRef, FormatError, RepoRef, SigName, TrackerError, WelcomeError};

/// Strategy tag as written in configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SigStrategy {
    /// Decode the manifest and test exact membership.
    #[default]
    Manifest,
    /// Treat the manifest as text and cut the name out around the repo path.
    TextScan,
    /// Infer ownership from the community repository tree.
    TreeScan,
}

/// Where and how to look up the SIG of a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SigSource {
    /// The `sigs.yaml` manifest at this location.
    Manifest(FileRef),
    /// The same manifest, scanned as text.
    TextScan(FileRef),
    /// The community repository branch whose tree encodes ownership.
    TreeScan(BranchRef),
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

/// Community tree snapshots keyed by the scanned branch.
///
/// Each entry is an immutable [`CommunityTree`] behind an `Arc`. Readers clone
/// the `Arc` and never hold a lock while using it; a refresh builds a whole new
/// snapshot and swaps it in with a single insert. Concurrent refreshes of the
/// same key are allowed and the last one to finish wins.
///
/// One cache is shared by SIG resolution and maintainer lookup so a branch is
/// listed once, not once per consumer per event.
#[derive(Debug, Default)]
pub struct TreeCache {
    snapshots: DashMap<BranchRef, Arc<CommunityTree>>,
}

impl TreeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current snapshot for `key`, if any.
    pub fn get(&self, key: &BranchRef) -> Option<Arc<CommunityTree>> {
        self.snapshots.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// Replaces the snapshot for `key` and returns it.
    pub fn store(&self, key: BranchRef, tree: CommunityTree) -> Arc<CommunityTree> {
        let snapshot = Arc::new(tree);
        self.snapshots.insert(key, Arc::clone(&snapshot));
        snapshot
    }

    /// Lists `branch` recursively and replaces its snapshot.
    pub async fn refresh<R>(
        &self,
        repository: &R,
        branch: &BranchRef,
    ) -> Result<Arc<CommunityTree>, TrackerError>
    where
        R: CodeRepository + ?Sized,
    {
        let listing = repository.fetch_directory_tree(branch, true).await?;
        let tree = CommunityTree::new(listing);
        debug!(
            tree = %branch,
            entries = tree.entries().len(),
            repos = tree.index().len(),
            "rebuilt community tree snapshot"
        );
        Ok(self.store(branch.clone(), tree))
    }

    /// The cached snapshot, or a fresh listing when there is none.
    pub async fn get_or_refresh<R>(
        &self,
        repository: &R,
        branch: &BranchRef,
    ) -> Result<Arc<CommunityTree>, TrackerError>
    where
        R: CodeRepository + ?Sized,
    {
        match self.get(branch) {
            Some(snapshot) => Ok(snapshot),
            None => self.refresh(repository, branch).await,
        }
    }

    /// Drops the snapshot for `key`. Returns `true` if one existed.
    pub fn invalidate(&self, key: &BranchRef) -> bool {
        self.snapshots.remove(key).is_some()
    }

    pub fn clear(&self) {
        self.snapshots.clear();
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Resolves `org/repo` to the name of its owning SIG.
pub struct RepoToSigResolver {
    repository: Arc<dyn CodeRepository>,
    cache: Arc<TreeCache>,
}

impl RepoToSigResolver {
    /// A resolver with a private tree cache.
    pub fn new(repository: Arc<dyn CodeRepository>) -> Self {
        Self::with_cache(repository, Arc::new(TreeCache::new()))
    }

    /// A resolver reading and filling `cache`.
    pub fn with_cache(repository: Arc<dyn CodeRepository>, cache: Arc<TreeCache>) -> Self {
        Self { repository, cache }
    }

    /// The tree cache used by the tree-scan strategy.
    pub fn cache(&self) -> &TreeCache {
        &self.cache
    }

    /// Resolves the SIG of `repo` using `source`.
    ///
    /// # Errors
    ///
    /// [`WelcomeError::Tracker`] when a fetch fails, [`WelcomeError::Format`]
    /// when the fetched document cannot be decoded.
    pub async fn resolve(
        &self,
        repo: &RepoRef,
        source: &SigSource,
    ) -> Result<Option<SigName>, WelcomeError> {
        let sig = match source {
            SigSource::Manifest(file) => self.resolve_from_manifest(repo, file).await?,
            SigSource::TextScan(file) => self.resolve_from_text(repo, file).await?,
            SigSource::TreeScan(branch) => self.resolve_from_tree(repo, branch).await?,
        };

        match &sig {
            Some(name) => debug!(repo = %repo, sig = %name, "resolved sig"),
            None => info!(repo = %repo, "no sig owns repository"),
        }
        Ok(sig)
    }

    async fn resolve_from_manifest(
        &self,
        repo: &RepoRef,
        file: &FileRef,
    ) -> Result<Option<SigName>, WelcomeError> {
        let raw = self.repository.fetch_file_content(file).await?;
        let directory = SigDirectory::parse_manifest(&raw)?;
        Ok(directory.sig_of(repo).cloned())
    }

    async fn resolve_from_text(
        &self,
        repo: &RepoRef,
        file: &FileRef,
    ) -> Result<Option<SigName>, WelcomeError> {
        let raw = self.repository.fetch_file_content(file).await?;
        let text = String::from_utf8(raw).map_err(|e| FormatError::Decode {
            document: "sig manifest",
            message: e.to_string(),
        })?;
        Ok(extract_sig_by_text(&text, repo))
    }

    /// A cached miss triggers exactly one refresh before giving up; a cold
    /// cache is filled once and never retried.
    async fn resolve_from_tree(
        &self,
        repo: &RepoRef,
        branch: &BranchRef,
    ) -> Result<Option<SigName>, WelcomeError> {
        if let Some(snapshot) = self.cache.get(branch) {
            if let Some(sig) = snapshot.sig_of(repo) {
                return Ok(Some(sig.clone()));
            }
            debug!(repo = %repo, tree = %branch, "cached index has no entry, refreshing");
        }

        let snapshot = self.refresh(branch).await?;
        Ok(snapshot.sig_of(repo).cloned())
    }

    /// Re-scans `branch` and replaces its cached snapshot.
    pub async fn refresh(&self, branch: &BranchRef) -> Result<Arc<CommunityTree>, TrackerError> {
        self.cache.refresh(self.repository.as_ref(), branch).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeHost;
    use crate::{BranchName, TrackerErrorKind, TreeEntry};

    const MANIFEST: &str = "sigs:\n  - name: kernel-sig\n    repositories:\n      - openeuler/kernel\n";

    fn repo(s: &str) -> RepoRef {
        RepoRef::parse(s).unwrap()
    }

    fn manifest_file() -> FileRef {
        FileRef {
            branch: community_branch(),
            path: "sig/sigs.yaml".into(),
        }
    }

    fn community_branch() -> BranchRef {
        BranchRef {
            repo: repo("openeuler/community"),
            branch: BranchName::new("master").unwrap(),
        }
    }

    #[tokio::test]
    async fn test_manifest_resolution() {
        let host = Arc::new(FakeHost::new().with_file(manifest_file(), MANIFEST));
        let resolver = RepoToSigResolver::new(host.clone());
        let source = SigSource::Manifest(manifest_file());

        let sig = resolver.resolve(&repo("openeuler/kernel"), &source).await.unwrap();
        assert_eq!(sig.unwrap().as_str(), "kernel-sig");

        let none = resolver.resolve(&repo("openeuler/absent"), &source).await.unwrap();
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn test_manifest_fetch_error_is_not_unresolved() {
        let host = Arc::new(FakeHost::new().failing("fetch_file_content"));
        let resolver = RepoToSigResolver::new(host);
        let err = resolver
            .resolve(&repo("openeuler/kernel"), &SigSource::Manifest(manifest_file()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WelcomeError::Tracker(TrackerError { kind: TrackerErrorKind::Status(500), .. })
        ));
    }

    #[tokio::test]
    async fn test_text_scan_resolution() {
        let host = Arc::new(FakeHost::new().with_file(manifest_file(), MANIFEST));
        let resolver = RepoToSigResolver::new(host);
        let sig = resolver
            .resolve(&repo("openeuler/kernel"), &SigSource::TextScan(manifest_file()))
            .await
            .unwrap();
        assert_eq!(sig.unwrap().as_str(), "kernel-sig");
    }

    #[tokio::test]
    async fn test_tree_cache_refreshes_once_on_miss() {
        let host = Arc::new(FakeHost::new().with_tree(
            community_branch(),
            vec![
                TreeEntry::blob("sig/A/openeuler/a/repo-a.yaml"),
                TreeEntry::blob("sig/B/openeuler/b/repo-b.yaml"),
            ],
        ));
        let resolver = RepoToSigResolver::new(host.clone());
        let source = SigSource::TreeScan(community_branch());

        let a = resolver.resolve(&repo("openeuler/repo-a"), &source).await.unwrap();
        assert_eq!(a.unwrap().as_str(), "A");
        assert_eq!(host.calls("fetch_directory_tree"), 1);
        assert_eq!(resolver.cache().len(), 1);

        let b = resolver.resolve(&repo("openeuler/repo-b"), &source).await.unwrap();
        assert_eq!(b.unwrap().as_str(), "B");
        assert_eq!(host.calls("fetch_directory_tree"), 1);

        let missing = resolver.resolve(&repo("openeuler/repo-c"), &source).await.unwrap();
        assert!(missing.is_none());
        assert_eq!(host.calls("fetch_directory_tree"), 2);
    }

    fn two_sig_tree() -> Vec<TreeEntry> {
        vec![
            TreeEntry::blob("sig/A/openeuler/a/repo-a.yaml"),
            TreeEntry::blob("sig/B/openeuler/b/repo-b.yaml"),
        ]
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_lookups_read_one_snapshot() {
        let host = Arc::new(FakeHost::new().with_tree(community_branch(), two_sig_tree()));
        let resolver = Arc::new(RepoToSigResolver::new(host.clone()));
        let source = SigSource::TreeScan(community_branch());
        resolver.resolve(&repo("openeuler/repo-a"), &source).await.unwrap();

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let resolver = Arc::clone(&resolver);
                let source = source.clone();
                let name = if i % 2 == 0 { "openeuler/repo-a" } else { "openeuler/repo-b" };
                tokio::spawn(async move { resolver.resolve(&repo(name), &source).await })
            })
            .collect();

        for (i, task) in tasks.into_iter().enumerate() {
            let sig = task.await.unwrap().unwrap().unwrap();
            assert_eq!(sig.as_str(), if i % 2 == 0 { "A" } else { "B" });
        }
        assert_eq!(host.calls("fetch_directory_tree"), 1);
        assert_eq!(resolver.cache().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_cold_lookups_converge() {
        let host = Arc::new(FakeHost::new().with_tree(community_branch(), two_sig_tree()));
        let resolver = Arc::new(RepoToSigResolver::new(host.clone()));
        let source = SigSource::TreeScan(community_branch());

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let resolver = Arc::clone(&resolver);
                let source = source.clone();
                tokio::spawn(async move { resolver.resolve(&repo("openeuler/repo-b"), &source).await })
            })
            .collect();

        for task in tasks {
            let sig = task.await.unwrap().unwrap().unwrap();
            assert_eq!(sig.as_str(), "B");
        }
        // Racing cold refreshes may each list the tree, but never more than
        // once per lookup, and they leave a single snapshot behind.
        let listings = host.calls("fetch_directory_tree");
        assert!((1..=8).contains(&listings), "listed {listings} times");
        assert_eq!(resolver.cache().len(), 1);
        let snapshot = resolver.cache().get(&community_branch()).unwrap();
        assert_eq!(snapshot.index().len(), 2);
    }

    #[tokio::test]
    async fn test_shared_cache_is_visible_to_other_holders() {
        let host = Arc::new(FakeHost::new().with_tree(community_branch(), two_sig_tree()));
        let cache = Arc::new(TreeCache::new());
        let resolver = RepoToSigResolver::with_cache(host.clone(), Arc::clone(&cache));

        resolver
            .resolve(&repo("openeuler/repo-a"), &SigSource::TreeScan(community_branch()))
            .await
            .unwrap();

        let snapshot = cache.get_or_refresh(host.as_ref(), &community_branch()).await.unwrap();
        assert_eq!(snapshot.entries().len(), 2);
        assert_eq!(host.calls("fetch_directory_tree"), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_rescan() {
        let host = Arc::new(FakeHost::new().with_tree(
            community_branch(),
            vec![TreeEntry::blob("sig/A/openeuler/a/repo-a.yaml")],
        ));
        let resolver = RepoToSigResolver::new(host.clone());
        let source = SigSource::TreeScan(community_branch());

        resolver.resolve(&repo("openeuler/repo-a"), &source).await.unwrap();
        assert!(resolver.cache().invalidate(&community_branch()));
        assert!(resolver.cache().is_empty());

        resolver.resolve(&repo("openeuler/repo-a"), &source).await.unwrap();
        assert_eq!(host.calls("fetch_directory_tree"), 2);
    }
}
