//! Parsing of the community SIG directory into structured records.
//!
//! Three source shapes are understood:
//!
//! - the structured manifest (`sigs.yaml`): a list of SIGs with their owned
//!   repositories, parsed by [`SigDirectory::parse_manifest`];
//! - the same manifest treated as plain text, for sources that are not clean
//!   YAML, via [`extract_sig_by_text`];
//! - a recursive tree listing of the community repository, where ownership is
//!   encoded in the path convention `sig/<sig>/<org>/<shard>/<repo>.yaml`,
//!   via [`RepoSigIndex::from_tree`].

use std::collections::{HashMap, HashSet};

use serde::Deserialize;
use tracing::debug;

use crate::{FormatError, RepoRef, SigName, TreeEntry, TreeEntryKind};

const NAME_MARKER: &str = "name:";
const REPOSITORIES_MARKER: &str = "repositories:";

/// Number of `/`-separated segments in a tree-scan ownership path.
const TREE_PATH_SEGMENTS: usize = 5;
const TREE_ROOT: &str = "sig";
const TREE_SUFFIX: &str = ".yaml";

// ---------------------------------------------------------------------------
// Structured manifest
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawManifest {
    #[serde(default)]
    sigs: Vec<RawSig>,
}

#[derive(Debug, Deserialize)]
struct RawSig {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    repositories: Vec<String>,
}

/// One Special Interest Group and the repositories it owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sig {
    pub name: SigName,
    /// Full repository paths (`"org/repo"`) in manifest order.
    pub repositories: Vec<String>,
}

impl Sig {
    /// `true` if `repo` appears verbatim (as `"org/repo"`) in the repository list.
    pub fn owns(&self, repo: &RepoRef) -> bool {
        let full = repo.full_name();
        self.repositories.iter().any(|r| r.trim() == full)
    }
}

/// The validated contents of a SIG manifest.
///
/// SIG names are non-empty and unique.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SigDirectory {
    sigs: Vec<Sig>,
}

impl SigDirectory {
    /// Decodes and validates a manifest document.
    ///
    /// # Errors
    ///
    /// [`FormatError::Decode`] if the bytes are not a YAML manifest,
    /// [`FormatError::MissingSigName`] if any entry lacks a name,
    /// [`FormatError::DuplicateSigName`] if two entries share one.
    pub fn parse_manifest(raw: &[u8]) -> Result<Self, FormatError> {
        let manifest: RawManifest =
            serde_yaml::from_slice(raw).map_err(|e| FormatError::Decode {
                document: "sig manifest",
                message: e.to_string(),
            })?;

        let mut seen = HashSet::new();
        let mut sigs = Vec::with_capacity(manifest.sigs.len());
        for (index, raw_sig) in manifest.sigs.into_iter().enumerate() {
            let name = raw_sig
                .name
                .and_then(SigName::new)
                .ok_or(FormatError::MissingSigName { index })?;
            if !seen.insert(name.clone()) {
                return Err(FormatError::DuplicateSigName {
                    name: name.to_string(),
                });
            }
            sigs.push(Sig {
                name,
                repositories: raw_sig.repositories,
            });
        }

        Ok(Self { sigs })
    }

    pub fn sigs(&self) -> &[Sig] {
        &self.sigs
    }

    /// Returns the first SIG, in manifest order, that owns `repo`.
    pub fn sig_of(&self, repo: &RepoRef) -> Option<&SigName> {
        self.sigs.iter().find(|s| s.owns(repo)).map(|s| &s.name)
    }
}

// ---------------------------------------------------------------------------
// Textual extraction
// ---------------------------------------------------------------------------

/// Extracts the SIG owning `repo` from a manifest treated as plain text.
///
/// Finds the first whole-token occurrence of `"org/repo"`, takes the
/// rightmost `name:` marker before it, and returns the trimmed text between
/// that marker and the next `repositories:` marker. Returns `None` when any
/// of the three cannot be found or the extracted name is blank.
pub fn extract_sig_by_text(raw: &str, repo: &RepoRef) -> Option<SigName> {
    let target = repo.full_name();
    let at = find_token(raw, &target)?;

    let name_start = raw[..at].rfind(NAME_MARKER)? + NAME_MARKER.len();
    let tail = &raw[name_start..];
    let name_end = tail.find(REPOSITORIES_MARKER)?;

    let name = tail[..name_end].trim().trim_matches(|c| c == '"' || c == '\'');
    SigName::new(name.trim())
}

/// Byte offset of the first occurrence of `needle` that is not part of a
/// longer repository path.
fn find_token(haystack: &str, needle: &str) -> Option<usize> {
    let is_path_char = |c: char| c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | '/');
    haystack.match_indices(needle).map(|(i, _)| i).find(|&i| {
        let before = haystack[..i].chars().next_back();
        let after = haystack[i + needle.len()..].chars().next();
        !before.is_some_and(is_path_char) && !after.is_some_and(is_path_char)
    })
}

// ---------------------------------------------------------------------------
// Tree-scan index
// ---------------------------------------------------------------------------

/// Flat `org/repo → SIG` map built from a community tree listing.
///
/// A repository maps to at most one SIG; when the tree lists a repository
/// under several SIGs the first entry wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoSigIndex {
    entries: HashMap<RepoRef, SigName>,
}

impl RepoSigIndex {
    /// Builds the index from blob entries shaped
    /// `sig/<sig>/<org>/<shard>/<repo>.yaml`. Everything else is ignored.
    pub fn from_tree(tree: &[TreeEntry]) -> Self {
        let mut entries = HashMap::new();
        for entry in tree.iter().filter(|e| e.kind == TreeEntryKind::Blob) {
            let Some((repo, sig)) = parse_tree_path(&entry.path) else {
                continue;
            };
            if let Some(existing) = entries.get(&repo) {
                debug!(repo = %repo, kept = %existing, ignored = %sig, "repository listed under two sigs");
                continue;
            }
            entries.insert(repo, sig);
        }
        Self { entries }
    }

    pub fn sig_of(&self, repo: &RepoRef) -> Option<&SigName> {
        self.entries.get(repo)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One recursive listing of the community repository together with the
/// [`RepoSigIndex`] derived from it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommunityTree {
    entries: Vec<TreeEntry>,
    index: RepoSigIndex,
}

impl CommunityTree {
    pub fn new(entries: Vec<TreeEntry>) -> Self {
        let index = RepoSigIndex::from_tree(&entries);
        Self { entries, index }
    }

    /// The raw listing, in platform order.
    pub fn entries(&self) -> &[TreeEntry] {
        &self.entries
    }

    pub fn index(&self) -> &RepoSigIndex {
        &self.index
    }

    pub fn sig_of(&self, repo: &RepoRef) -> Option<&SigName> {
        self.index.sig_of(repo)
    }
}

fn parse_tree_path(path: &str) -> Option<(RepoRef, SigName)> {
    let segments: Vec<&str> = path.split('/').collect();
    if segments.len() != TREE_PATH_SEGMENTS || segments[0] != TREE_ROOT {
        return None;
    }
    let repo_name = segments[4].strip_suffix(TREE_SUFFIX)?;
    let repo = RepoRef::new(segments[2], repo_name)?;
    let sig = SigName::new(segments[1])?;
    Some((repo, sig))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"
sigs:
  - name: Kernel
    repositories:
      - openeuler/kernel
      - src-openeuler/kernel
  - name: Networking
    repositories:
      - openeuler/net-tools
  - name: Empty
"#;

    fn repo(s: &str) -> RepoRef {
        RepoRef::parse(s).unwrap()
    }

    #[test]
    fn test_parse_manifest_and_lookup() {
        let dir = SigDirectory::parse_manifest(MANIFEST.as_bytes()).unwrap();
        assert_eq!(dir.sigs().len(), 3);
        assert_eq!(dir.sig_of(&repo("openeuler/kernel")).unwrap().as_str(), "Kernel");
        assert_eq!(dir.sig_of(&repo("openeuler/net-tools")).unwrap().as_str(), "Networking");
        assert!(dir.sigs()[2].repositories.is_empty());
    }

    #[test]
    fn test_absent_repo_is_unresolved() {
        let dir = SigDirectory::parse_manifest(MANIFEST.as_bytes()).unwrap();
        assert!(dir.sig_of(&repo("openeuler/unknown")).is_none());
    }

    #[test]
    fn test_lookup_is_exact_not_suffix() {
        let dir = SigDirectory::parse_manifest(MANIFEST.as_bytes()).unwrap();
        // "src-openeuler/kernel" ends with "/kernel" but belongs to another org.
        assert!(dir.sig_of(&repo("other-org/kernel")).is_none());
        assert!(dir.sig_of(&repo("openeuler/tools")).is_none());
    }

    #[test]
    fn test_missing_name_is_format_error() {
        let raw = "sigs:\n  - repositories: [openeuler/a]\n";
        assert_eq!(
            SigDirectory::parse_manifest(raw.as_bytes()),
            Err(FormatError::MissingSigName { index: 0 })
        );
        let blank = "sigs:\n  - name: \"\"\n";
        assert!(matches!(
            SigDirectory::parse_manifest(blank.as_bytes()),
            Err(FormatError::MissingSigName { index: 0 })
        ));
    }

    #[test]
    fn test_duplicate_name_is_format_error() {
        let raw = "sigs:\n  - name: A\n  - name: A\n";
        assert!(matches!(
            SigDirectory::parse_manifest(raw.as_bytes()),
            Err(FormatError::DuplicateSigName { name }) if name == "A"
        ));
    }

    #[test]
    fn test_undecodable_manifest_is_format_error() {
        let raw = "sigs: [unclosed";
        assert!(matches!(
            SigDirectory::parse_manifest(raw.as_bytes()),
            Err(FormatError::Decode { .. })
        ));
    }

    #[test]
    fn test_extract_sig_by_text() {
        assert_eq!(
            extract_sig_by_text(MANIFEST, &repo("openeuler/net-tools")).unwrap().as_str(),
            "Networking"
        );
        assert_eq!(
            extract_sig_by_text(MANIFEST, &repo("src-openeuler/kernel")).unwrap().as_str(),
            "Kernel"
        );
        assert!(extract_sig_by_text(MANIFEST, &repo("openeuler/missing")).is_none());
    }

    #[test]
    fn test_extract_sig_by_text_skips_longer_paths() {
        let raw = "- name: Long\n  repositories:\n  - openeuler/kernel-tools\n\
                   - name: Short\n  repositories:\n  - openeuler/kernel\n";
        assert_eq!(
            extract_sig_by_text(raw, &repo("openeuler/kernel")).unwrap().as_str(),
            "Short"
        );
    }

    #[test]
    fn test_index_from_tree_uses_path_convention() {
        let tree = vec![
            TreeEntry::blob("sig/Kernel/src-openeuler/k/kernel.yaml"),
            TreeEntry::blob("sig/Networking/openeuler/n/net-tools.yaml"),
            TreeEntry::blob("sig/Kernel/sig-info.yaml"),
            TreeEntry::blob("sig/Kernel/src-openeuler/k/README.md"),
            TreeEntry::blob("docs/a/b/c/d.yaml"),
            TreeEntry {
                path: "sig/Dir/openeuler/d/dir.yaml".into(),
                kind: TreeEntryKind::Tree,
            },
        ];
        let index = RepoSigIndex::from_tree(&tree);
        assert_eq!(index.len(), 2);
        assert_eq!(
            index.sig_of(&repo("src-openeuler/kernel")).unwrap().as_str(),
            "Kernel"
        );
        assert_eq!(
            index.sig_of(&repo("openeuler/net-tools")).unwrap().as_str(),
            "Networking"
        );
        assert!(index.sig_of(&repo("openeuler/dir")).is_none());
    }
}
