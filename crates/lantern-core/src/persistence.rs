//! Persistence of the indexed-path configuration across restarts.
//!
//! One JSON document, `file_index.json`, lives in the host's per-plugin
//! cache directory. It holds every root's configuration keyed by its
//! absolute path, the ordered root list, and the bookmark source setup.
//! Entry snapshots are *not* persisted; they are rebuilt by the first
//! scan after startup — the cache only spares the metadata cost of
//! reconstructing each root's settings.
//!
//! Writes are atomic (write to a temp file, then rename), so a crash
//! mid-save leaves the previous cache intact. A missing or corrupted
//! cache degrades to defaults and is never fatal.

use crate::error::{LanternError, Result};
use crate::indexed_path::PathRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Name of the cache file inside the cache directory.
pub const CACHE_FILE_NAME: &str = "file_index.json";

/// The on-disk cache document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheDocument {
    /// Ordered list of configured root paths
    pub roots: Vec<String>,

    /// Per-root configuration, keyed by absolute root path
    pub paths: BTreeMap<String, PathRecord>,

    /// Ordered list of bookmark source file paths
    pub bookmark_files: Vec<String>,

    /// Whether bookmarks are additionally indexed under their hostname
    pub index_hostname: bool,
}

impl CacheDocument {
    /// Look up the cached record for a root path.
    pub fn record_for(&self, root: &str) -> Option<&PathRecord> {
        self.paths.get(root)
    }
}

/// Reads and writes the cache document in a given cache directory.
pub struct CacheStore {
    cache_dir: PathBuf,
}

impl CacheStore {
    /// Create a store over the host's cache directory.
    pub fn new(cache_dir: impl AsRef<Path>) -> Self {
        CacheStore {
            cache_dir: cache_dir.as_ref().to_path_buf(),
        }
    }

    /// Path of the cache file.
    pub fn cache_path(&self) -> PathBuf {
        self.cache_dir.join(CACHE_FILE_NAME)
    }

    fn temp_path(&self) -> PathBuf {
        self.cache_dir.join(format!("{}.tmp", CACHE_FILE_NAME))
    }

    /// Whether a cache file exists.
    pub fn exists(&self) -> bool {
        self.cache_path().exists()
    }

    /// Load the cache document.
    pub fn load(&self) -> Result<CacheDocument> {
        let path = self.cache_path();
        if !path.exists() {
            return Err(LanternError::CacheNotFound { path });
        }

        let contents = fs::read_to_string(&path)?;
        let document: CacheDocument =
            serde_json::from_str(&contents).map_err(|e| LanternError::CacheCorrupted {
                reason: e.to_string(),
            })?;

        info!(
            path = %path.display(),
            roots = document.roots.len(),
            "Cache loaded"
        );
        Ok(document)
    }

    /// Load the cache document, falling back to defaults on any failure.
    ///
    /// Cache loss only costs a full rescan; it is logged, never fatal.
    pub fn load_or_default(&self) -> CacheDocument {
        match self.load() {
            Ok(document) => document,
            Err(e) => {
                if matches!(e, LanternError::CacheNotFound { .. }) {
                    debug!(error = %e, "No cache file, starting fresh");
                } else {
                    warn!(error = %e, "Failed to load cache, starting fresh");
                }
                CacheDocument::default()
            }
        }
    }

    /// Save the cache document atomically (write-then-rename).
    pub fn save(&self, document: &CacheDocument) -> Result<()> {
        fs::create_dir_all(&self.cache_dir)?;

        let contents = serde_json::to_string(document)?;
        let temp_path = self.temp_path();
        fs::write(&temp_path, contents)?;
        fs::rename(&temp_path, self.cache_path())?;

        debug!(
            path = %self.cache_path().display(),
            roots = document.roots.len(),
            "Cache saved"
        );
        Ok(())
    }

    /// Delete the cache file if present.
    pub fn clear(&self) -> Result<()> {
        let path = self.cache_path();
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexed_path::PathSettings;
    use tempfile::TempDir;

    fn sample_document() -> CacheDocument {
        let settings = PathSettings {
            max_depth: 3,
            scan_interval_secs: 30,
            ..PathSettings::default()
        };
        let mut paths = BTreeMap::new();
        paths.insert(
            "/home/user/docs".to_string(),
            PathRecord {
                settings,
                last_scan: None,
            },
        );
        CacheDocument {
            roots: vec!["/home/user/docs".to_string()],
            paths,
            bookmark_files: vec!["/home/user/.config/chromium/Default/Bookmarks".to_string()],
            index_hostname: true,
        }
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::new(temp.path());

        let document = sample_document();
        store.save(&document).unwrap();
        assert!(store.exists());

        let loaded = store.load().unwrap();
        assert_eq!(loaded, document);

        let record = loaded.record_for("/home/user/docs").unwrap();
        assert_eq!(record.settings.max_depth, 3);
        assert_eq!(record.settings.scan_interval_secs, 30);
    }

    #[test]
    fn test_load_missing_cache() {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::new(temp.path());

        assert!(matches!(
            store.load(),
            Err(LanternError::CacheNotFound { .. })
        ));
        // The fallback is a default document, not an error
        assert_eq!(store.load_or_default(), CacheDocument::default());
    }

    #[test]
    fn test_corrupted_cache_degrades_to_default() {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::new(temp.path());

        fs::write(store.cache_path(), b"not json {{{").unwrap();

        assert!(matches!(
            store.load(),
            Err(LanternError::CacheCorrupted { .. })
        ));
        assert_eq!(store.load_or_default(), CacheDocument::default());
    }

    #[test]
    fn test_save_creates_cache_dir() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("deeper/cache");
        let store = CacheStore::new(&nested);

        store.save(&sample_document()).unwrap();
        assert!(store.exists());
    }

    #[test]
    fn test_clear() {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::new(temp.path());

        store.save(&sample_document()).unwrap();
        assert!(store.exists());
        store.clear().unwrap();
        assert!(!store.exists());
        // Clearing an absent cache is fine
        store.clear().unwrap();
    }

    #[test]
    fn test_no_temp_file_left_behind() {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::new(temp.path());

        store.save(&sample_document()).unwrap();
        assert!(!store.temp_path().exists());
    }
}
