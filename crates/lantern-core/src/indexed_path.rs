//! One configured scan root and its snapshot.
//!
//! An [`IndexedPath`] owns a root directory, its filter policy, and the
//! current snapshot of matched entries. A scan is a bounded breadth-first
//! traversal from the root; on completion the new entry list atomically
//! replaces the previous snapshot, so readers never observe a
//! partially-built list.
//!
//! The scan also reports every directory it actually descended into. When
//! filesystem watching is enabled for the root, that set becomes the new
//! watch set, replacing the previous one wholesale (stale watches from
//! pruned or removed directories are dropped).

use crate::filter::{
    Candidate, FilterPolicy, Verdict, DEFAULT_MAX_DEPTH, DEFAULT_MIME_FILTERS,
    DEFAULT_NAME_FILTERS, DEFAULT_SCAN_INTERVAL_SECS,
};
use crate::types::{classify_mime, Entry, EntryKind};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Per-root configuration knobs, in their serializable form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    /// Exclusion globs matched against base names
    pub name_filters: Vec<String>,

    /// Inclusion patterns matched against mime classifications
    pub mime_filters: Vec<String>,

    /// Include hidden entries
    pub index_hidden: bool,

    /// Descend into symlinked directories
    pub follow_symlinks: bool,

    /// Maximum traversal depth (0 = root only)
    pub max_depth: u32,

    /// Periodic rescan interval in seconds (0 disables the timer)
    pub scan_interval_secs: u64,

    /// Rescan on filesystem change notifications
    pub watch_filesystem: bool,
}

impl Default for PathSettings {
    fn default() -> Self {
        PathSettings {
            name_filters: DEFAULT_NAME_FILTERS.iter().map(|s| s.to_string()).collect(),
            mime_filters: DEFAULT_MIME_FILTERS.iter().map(|s| s.to_string()).collect(),
            index_hidden: false,
            follow_symlinks: false,
            max_depth: DEFAULT_MAX_DEPTH,
            scan_interval_secs: DEFAULT_SCAN_INTERVAL_SECS,
            watch_filesystem: false,
        }
    }
}

impl PathSettings {
    /// Build the filter policy described by these settings.
    pub fn policy(&self) -> crate::error::Result<FilterPolicy> {
        FilterPolicy::new(
            self.name_filters.clone(),
            self.mime_filters.clone(),
            self.index_hidden,
            self.follow_symlinks,
            self.max_depth,
        )
    }
}

/// The persisted form of an indexed path, keyed by root path in the cache
/// document. Entries are not persisted; they are rebuilt by the first
/// scan after a restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathRecord {
    /// Per-root settings
    pub settings: PathSettings,

    /// When the root was last scanned, if ever
    pub last_scan: Option<DateTime<Utc>>,
}

impl PathRecord {
    /// Record with default settings and no scan history.
    pub fn with_defaults() -> Self {
        PathRecord {
            settings: PathSettings::default(),
            last_scan: None,
        }
    }
}

/// Result of one scan of a root.
#[derive(Debug)]
pub struct ScanOutcome {
    /// Number of entries in the new snapshot
    pub entries: usize,

    /// Every directory the traversal descended into (including the root,
    /// when readable); becomes the new watch set
    pub watched_dirs: Vec<PathBuf>,
}

/// One configured root, its policy, and its current entry snapshot.
///
/// The snapshot is single-writer (the scan that produced it) and
/// multi-reader; the only synchronization is the atomic `Arc` swap on
/// completion.
pub struct IndexedPath {
    root: PathBuf,
    root_key: String,
    settings: RwLock<PathSettings>,
    policy: RwLock<FilterPolicy>,
    snapshot: RwLock<Arc<Vec<Entry>>>,
    last_scan: RwLock<Option<DateTime<Utc>>>,
    scanning: AtomicBool,
}

impl IndexedPath {
    /// Create an indexed path with the given settings.
    ///
    /// The root is canonicalized when possible so duplicate detection sees
    /// through symlinks and relative paths; an unavailable root keeps its
    /// configured spelling and simply yields empty scans until it appears.
    pub fn new(root: impl Into<PathBuf>, settings: PathSettings) -> crate::error::Result<Self> {
        let root = root.into();
        let root = fs::canonicalize(&root).unwrap_or(root);
        let root_key = root.to_string_lossy().to_string();
        let policy = settings.policy()?;

        Ok(IndexedPath {
            root,
            root_key,
            settings: RwLock::new(settings),
            policy: RwLock::new(policy),
            snapshot: RwLock::new(Arc::new(Vec::new())),
            last_scan: RwLock::new(None),
            scanning: AtomicBool::new(false),
        })
    }

    /// Reconstruct an indexed path from a persisted record.
    pub fn from_record(root: impl Into<PathBuf>, record: PathRecord) -> crate::error::Result<Self> {
        let path = IndexedPath::new(root, record.settings)?;
        *path.last_scan.write() = record.last_scan;
        Ok(path)
    }

    /// The canonical root path as a string (identity within an index).
    pub fn root_key(&self) -> &str {
        &self.root_key
    }

    /// The root path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Current settings (cloned).
    pub fn settings(&self) -> PathSettings {
        self.settings.read().clone()
    }

    /// Replace the settings, recompiling the filter policy.
    ///
    /// The current snapshot is left in place; callers trigger a rescan to
    /// apply the new policy.
    pub fn set_settings(&self, settings: PathSettings) -> crate::error::Result<()> {
        let policy = settings.policy()?;
        *self.policy.write() = policy;
        *self.settings.write() = settings;
        Ok(())
    }

    /// The current entry snapshot.
    pub fn entries(&self) -> Arc<Vec<Entry>> {
        self.snapshot.read().clone()
    }

    /// When the root was last scanned, if ever.
    pub fn last_scan(&self) -> Option<DateTime<Utc>> {
        *self.last_scan.read()
    }

    /// Whether a scan is currently running on this root.
    pub fn is_scanning(&self) -> bool {
        self.scanning.load(Ordering::Acquire)
    }

    /// The persisted form of this path's configuration.
    pub fn to_record(&self) -> PathRecord {
        PathRecord {
            settings: self.settings(),
            last_scan: self.last_scan(),
        }
    }

    /// Scan the root and atomically publish the new snapshot.
    ///
    /// An unreadable root yields an empty snapshot and a warning; the
    /// error is not propagated so sibling roots are unaffected. Unreadable
    /// subdirectories yield nothing for their subtree and traversal
    /// continues elsewhere.
    pub fn scan(&self) -> ScanOutcome {
        self.scanning.store(true, Ordering::Release);
        debug!(root = %self.root_key, "Scanning root");

        let policy = self.policy.read().clone();
        let mut entries = Vec::new();
        let mut watched = Vec::new();

        match fs::metadata(&self.root) {
            Ok(meta) if meta.is_dir() => {
                // The root itself is an entry at depth 0
                if let Some(entry) = self.root_entry(&policy) {
                    entries.push(entry);
                }
                self.walk(&policy, &mut entries, &mut watched);
            }
            Ok(_) => {
                warn!(root = %self.root_key, "Root is not a directory, yielding no entries");
            }
            Err(e) => {
                warn!(root = %self.root_key, error = %e, "Root unreadable, yielding no entries");
            }
        }

        // Deterministic snapshot order regardless of read_dir order
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        watched.sort();

        let count = entries.len();
        *self.snapshot.write() = Arc::new(entries);
        *self.last_scan.write() = Some(Utc::now());
        self.scanning.store(false, Ordering::Release);

        info!(root = %self.root_key, entries = count, "Scan complete");

        ScanOutcome {
            entries: count,
            watched_dirs: watched,
        }
    }

    fn root_entry(&self, policy: &FilterPolicy) -> Option<Entry> {
        let name = self
            .root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.root_key.clone());
        let parent = self
            .root
            .parent()
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_default();

        let candidate = Candidate {
            name: &name,
            kind: EntryKind::Dir,
            hidden: name.starts_with('.'),
            symlink: false,
            depth: 0,
            mime: classify_mime(&name, EntryKind::Dir),
        };

        if policy.evaluate(&candidate) == Verdict::Include {
            Some(Entry::new(self.root_key.clone(), name, parent, EntryKind::Dir))
        } else {
            None
        }
    }

    fn walk(&self, policy: &FilterPolicy, entries: &mut Vec<Entry>, watched: &mut Vec<PathBuf>) {
        let mut queue: VecDeque<(PathBuf, u32)> = VecDeque::new();
        queue.push_back((self.root.clone(), 0));

        while let Some((dir, depth)) = queue.pop_front() {
            let reader = match fs::read_dir(&dir) {
                Ok(reader) => reader,
                Err(e) => {
                    debug!(dir = %dir.display(), error = %e, "Skipping unreadable directory");
                    continue;
                }
            };
            watched.push(dir.clone());

            for dir_entry in reader.flatten() {
                let name = dir_entry.file_name().to_string_lossy().to_string();
                let path = dir_entry.path();

                let file_type = match dir_entry.file_type() {
                    Ok(ft) => ft,
                    Err(e) => {
                        debug!(path = %path.display(), error = %e, "Skipping unreadable entry");
                        continue;
                    }
                };

                let symlink = file_type.is_symlink();
                // For symlinks, classify by the target so symlinked
                // directories can still be listed and (optionally) walked
                let kind = if file_type.is_dir() {
                    EntryKind::Dir
                } else if file_type.is_file() {
                    EntryKind::File
                } else if symlink {
                    match fs::metadata(&path) {
                        Ok(target) if target.is_dir() => EntryKind::Dir,
                        Ok(target) if target.is_file() => EntryKind::File,
                        _ => EntryKind::Other,
                    }
                } else {
                    EntryKind::Other
                };

                let child_depth = depth + 1;
                let mime = classify_mime(&name, kind);
                let candidate = Candidate {
                    name: &name,
                    kind,
                    hidden: name.starts_with('.'),
                    symlink,
                    depth: child_depth,
                    mime,
                };

                if policy.evaluate(&candidate) == Verdict::Include {
                    entries.push(
                        Entry::new(
                            path.to_string_lossy().to_string(),
                            name.clone(),
                            dir.to_string_lossy().to_string(),
                            kind,
                        )
                        .with_symlink(symlink),
                    );
                }

                if policy.should_descend(&candidate) {
                    queue.push_back((path, child_depth));
                }
            }
        }
    }
}

impl std::fmt::Debug for IndexedPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexedPath")
            .field("root", &self.root_key)
            .field("entries", &self.snapshot.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    /// Settings that admit everything down to the given depth.
    fn permissive(max_depth: u32) -> PathSettings {
        PathSettings {
            name_filters: vec![],
            mime_filters: vec!["inode/directory".to_string(), "*".to_string()],
            index_hidden: false,
            follow_symlinks: false,
            max_depth,
            scan_interval_secs: 0,
            watch_filesystem: false,
        }
    }

    fn make_tree(temp: &TempDir) {
        let root = temp.path();
        fs::create_dir(root.join("docs")).unwrap();
        fs::create_dir(root.join("docs/deep")).unwrap();
        fs::create_dir(root.join(".hidden")).unwrap();
        File::create(root.join("report.pdf")).unwrap();
        File::create(root.join("notes.txt")).unwrap();
        File::create(root.join(".DS_Store")).unwrap();
        File::create(root.join("docs/manual.pdf")).unwrap();
        File::create(root.join("docs/deep/buried.pdf")).unwrap();
    }

    fn paths_of(indexed: &IndexedPath) -> Vec<String> {
        indexed.entries().iter().map(|e| e.path.clone()).collect()
    }

    #[test]
    fn test_scan_with_default_filters() {
        let temp = TempDir::new().unwrap();
        make_tree(&temp);

        let indexed = IndexedPath::new(temp.path(), PathSettings::default()).unwrap();
        indexed.scan();

        let names: Vec<String> = indexed.entries().iter().map(|e| e.name.clone()).collect();
        // Directories and application/* files match the defaults
        assert!(names.contains(&"docs".to_string()));
        assert!(names.contains(&"report.pdf".to_string()));
        assert!(names.contains(&"manual.pdf".to_string()));
        // text/plain does not match, .DS_Store is name-filtered,
        // hidden dirs are pruned
        assert!(!names.contains(&"notes.txt".to_string()));
        assert!(!names.contains(&".DS_Store".to_string()));
        assert!(!names.contains(&".hidden".to_string()));
    }

    #[test]
    fn test_scan_idempotent() {
        let temp = TempDir::new().unwrap();
        make_tree(&temp);

        let indexed = IndexedPath::new(temp.path(), permissive(10)).unwrap();
        indexed.scan();
        let first = paths_of(&indexed);
        indexed.scan();
        let second = paths_of(&indexed);

        assert_eq!(first, second);
        assert!(!first.is_empty());
    }

    #[test]
    fn test_max_depth_zero_lists_root_only() {
        let temp = TempDir::new().unwrap();
        make_tree(&temp);

        let indexed = IndexedPath::new(temp.path(), permissive(0)).unwrap();
        indexed.scan();

        let entries = indexed.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, indexed.root_key());
    }

    #[test]
    fn test_max_depth_bounds_traversal() {
        let temp = TempDir::new().unwrap();
        make_tree(&temp);

        let indexed = IndexedPath::new(temp.path(), permissive(1)).unwrap();
        indexed.scan();

        let names: Vec<String> = indexed.entries().iter().map(|e| e.name.clone()).collect();
        assert!(names.contains(&"docs".to_string()));
        // Depth 2 and below are pruned
        assert!(!names.contains(&"manual.pdf".to_string()));
        assert!(!names.contains(&"buried.pdf".to_string()));
    }

    #[test]
    fn test_unreadable_root_yields_empty() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("does-not-exist");

        let indexed = IndexedPath::new(&missing, permissive(10)).unwrap();
        let outcome = indexed.scan();

        assert_eq!(outcome.entries, 0);
        assert!(indexed.entries().is_empty());
        assert!(outcome.watched_dirs.is_empty());
        // The scan still completes and stamps a scan time
        assert!(indexed.last_scan().is_some());
    }

    #[test]
    fn test_watched_dirs_cover_descended_tree() {
        let temp = TempDir::new().unwrap();
        make_tree(&temp);

        let indexed = IndexedPath::new(temp.path(), permissive(10)).unwrap();
        let outcome = indexed.scan();

        let root = indexed.root().to_path_buf();
        assert!(outcome.watched_dirs.contains(&root));
        assert!(outcome.watched_dirs.contains(&root.join("docs")));
        assert!(outcome.watched_dirs.contains(&root.join("docs/deep")));
        // Pruned hidden directories are not watched
        assert!(!outcome.watched_dirs.contains(&root.join(".hidden")));
    }

    #[test]
    fn test_index_hidden_includes_dotfiles() {
        let temp = TempDir::new().unwrap();
        make_tree(&temp);

        let mut settings = permissive(10);
        settings.index_hidden = true;
        let indexed = IndexedPath::new(temp.path(), settings).unwrap();
        indexed.scan();

        let names: Vec<String> = indexed.entries().iter().map(|e| e.name.clone()).collect();
        assert!(names.contains(&".hidden".to_string()));
        assert!(names.contains(&".DS_Store".to_string()));
    }

    #[test]
    fn test_record_round_trip() {
        let settings = PathSettings {
            max_depth: 3,
            scan_interval_secs: 30,
            ..PathSettings::default()
        };
        let record = PathRecord {
            settings,
            last_scan: None,
        };

        let json = serde_json::to_string(&record).unwrap();
        let back: PathRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
        assert_eq!(back.settings.max_depth, 3);
        assert_eq!(back.settings.scan_interval_secs, 30);
    }

    #[test]
    fn test_set_settings_recompiles_policy() {
        let temp = TempDir::new().unwrap();
        make_tree(&temp);

        let indexed = IndexedPath::new(temp.path(), PathSettings::default()).unwrap();
        indexed.scan();
        let before: Vec<String> = indexed.entries().iter().map(|e| e.name.clone()).collect();
        assert!(!before.contains(&"notes.txt".to_string()));

        let mut settings = indexed.settings();
        settings.mime_filters.push("text/*".to_string());
        indexed.set_settings(settings).unwrap();
        indexed.scan();

        let after: Vec<String> = indexed.entries().iter().map(|e| e.name.clone()).collect();
        assert!(after.contains(&"notes.txt".to_string()));
    }
}
