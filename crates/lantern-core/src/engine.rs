//! Engine wiring and snapshot publishing.
//!
//! The [`Engine`] assembles the filesystem index, the bookmarks indexer,
//! and the persistence codec from an explicit [`EngineConfig`] — there is
//! no global state. It publishes the flat `(item, key)` list the host
//! search index consumes and forwards settled-batch notifications so the
//! host republishes exactly once per batch.
//!
//! Startup order matters: the cache document is loaded before the first
//! scan so each root's configuration is reconstructed cheaply; entries
//! themselves are always rebuilt by the first update. On shutdown the
//! live configuration is serialized back to the cache file and to the
//! host settings store; a failed cache write costs a rescan at next
//! startup, nothing more.

use crate::bookmarks::{discover_sources, BookmarkEvent, BookmarksIndexer};
use crate::config::RootConfig;
use crate::error::{LanternError, Result};
use crate::fs_index::{FsIndex, IndexEvent};
use crate::indexed_path::{IndexedPath, PathRecord, PathSettings};
use crate::persistence::{CacheDocument, CacheStore};
use crate::settings::{scoped_key, SettingsStore};
use crate::types::{Action, ActionKind, IndexItem, SearchItem};
use crate::watch::WatchSource;
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{info, warn};

// Settings store keys (host key-value store)
const KEY_PATHS: &str = "paths";
const KEY_NAME_FILTERS: &str = "nameFilters";
const KEY_MIME_FILTERS: &str = "mimeFilters";
const KEY_INDEX_HIDDEN: &str = "indexHidden";
const KEY_FOLLOW_SYMLINKS: &str = "followSymlinks";
const KEY_FS_WATCHES: &str = "useFileSystemWatches";
const KEY_MAX_DEPTH: &str = "maxDepth";
const KEY_SCAN_INTERVAL: &str = "scanInterval";
const KEY_BOOKMARK_PATHS: &str = "bookmarksPaths";
const KEY_INDEX_HOSTNAME: &str = "indexHostname";

/// Everything the engine needs at construction time.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// The host's per-plugin cache directory
    pub cache_dir: PathBuf,

    /// Scan roots with their per-root settings
    pub roots: Vec<RootConfig>,

    /// Bookmark source files (empty = auto-discover)
    pub bookmark_files: Vec<PathBuf>,

    /// Index bookmarks under their hostname as well as their title
    pub index_hostname: bool,
}

impl EngineConfig {
    /// Build an engine config from the TOML configuration.
    pub fn from_config(config: &crate::config::Config) -> Result<Self> {
        Ok(EngineConfig {
            cache_dir: config.cache_dir()?,
            roots: config.roots.clone(),
            bookmark_files: config.bookmarks.files.clone(),
            index_hostname: config.bookmarks.index_hostname,
        })
    }
}

/// Aggregate notification forwarded to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    /// A file-index scan batch settled
    IndexUpdated,
    /// A bookmarks reparse was adopted
    BookmarksUpdated,
}

/// The built-in item that lets the user trigger a rescan from the
/// launcher itself.
struct UpdateTrigger;

impl SearchItem for UpdateTrigger {
    fn id(&self) -> String {
        "scan_files".to_string()
    }

    fn text(&self) -> String {
        "Update index".to_string()
    }

    fn subtext(&self) -> String {
        "Update the file index".to_string()
    }

    fn icon_hints(&self) -> Vec<String> {
        vec![":app_icon".to_string()]
    }

    fn actions(&self) -> Vec<Action> {
        vec![Action::new("scan_files", "Index", ActionKind::TriggerUpdate)]
    }
}

/// The assembled indexing engine.
pub struct Engine {
    fs_index: FsIndex,
    bookmarks: Arc<BookmarksIndexer>,
    cache: CacheStore,
    event_rx: Receiver<EngineEvent>,
    forwarders: Mutex<Vec<JoinHandle<()>>>,
    stopped: Arc<AtomicBool>,
}

impl Engine {
    /// Assemble the engine and kick off the first scan and parse.
    ///
    /// `file_watch` serves the indexed roots, `bookmark_watch` the
    /// bookmark source files; pass `NullWatchSource`s to run without
    /// filesystem notifications.
    pub fn new(
        config: EngineConfig,
        file_watch: Arc<dyn WatchSource>,
        bookmark_watch: Arc<dyn WatchSource>,
    ) -> Result<Self> {
        let cache = CacheStore::new(&config.cache_dir);
        let document = cache.load_or_default();

        let fs_index = FsIndex::new(file_watch);
        for root in &config.roots {
            // The cache is keyed by canonical root path
            let key = std::fs::canonicalize(&root.path)
                .unwrap_or_else(|_| root.path.clone())
                .to_string_lossy()
                .to_string();
            // Configured settings win; the cache contributes scan history
            let record = PathRecord {
                settings: root.settings.clone(),
                last_scan: document.record_for(&key).and_then(|r| r.last_scan),
            };
            let indexed = Arc::new(IndexedPath::from_record(&root.path, record)?);
            if let Err(e) = fs_index.add_indexed(indexed) {
                warn!(root = %key, error = %e, "Skipping duplicate root");
            }
        }

        let bookmark_files = if config.bookmark_files.is_empty() {
            discover_sources()
        } else {
            config.bookmark_files.clone()
        };
        let bookmarks =
            BookmarksIndexer::new(bookmark_files, config.index_hostname, bookmark_watch);

        let (event_tx, event_rx) = unbounded();
        let stopped = Arc::new(AtomicBool::new(false));
        let forwarders = vec![
            forward_index_events(fs_index.events(), event_tx.clone(), stopped.clone()),
            forward_bookmark_events(bookmarks.events(), event_tx, stopped.clone()),
        ];

        info!(
            roots = fs_index.len(),
            bookmark_sources = bookmarks.paths().len(),
            "Engine assembled"
        );

        let engine = Engine {
            fs_index,
            bookmarks,
            cache,
            event_rx,
            forwarders: Mutex::new(forwarders),
            stopped,
        };

        engine.fs_index.update();
        engine.bookmarks.run();
        Ok(engine)
    }

    /// The filesystem index.
    pub fn fs_index(&self) -> &FsIndex {
        &self.fs_index
    }

    /// The bookmarks indexer.
    pub fn bookmarks(&self) -> &Arc<BookmarksIndexer> {
        &self.bookmarks
    }

    /// Receiver of aggregate update notifications.
    pub fn events(&self) -> Receiver<EngineEvent> {
        self.event_rx.clone()
    }

    /// Number of indexed file entries across all roots.
    pub fn entry_count(&self) -> usize {
        self.fs_index
            .index_paths()
            .iter()
            .map(|p| p.entries().len())
            .sum()
    }

    /// Publish the flat `(item, key)` list for the host search index.
    ///
    /// File entries appear under their base name, bookmarks under their
    /// title (and hostname when enabled), plus the built-in update
    /// trigger item.
    pub fn index_items(&self) -> Vec<IndexItem> {
        let mut items = Vec::new();

        for entry in self.fs_index.entries() {
            let key = entry.name.clone();
            items.push(IndexItem::new(Arc::new(entry), key));
        }

        items.extend(self.bookmarks.index_items());

        let trigger: Arc<dyn SearchItem> = Arc::new(UpdateTrigger);
        let key = trigger.text();
        items.push(IndexItem::new(trigger, key));

        items
    }

    /// Trigger a rescan of all roots.
    pub fn update_index(&self) {
        self.fs_index.update();
    }

    /// Trigger a bookmarks reparse.
    pub fn update_bookmarks(&self) {
        self.bookmarks.run();
    }

    // --- configuration surface (backing for the host's settings panel) ---

    /// Add a root and rescan it.
    ///
    /// Unlike startup (where a configured root may be temporarily
    /// absent and just yields empty scans), a root added through the
    /// configuration surface must be an existing directory. Fails on
    /// duplicates; the existing mapping is unchanged in that case.
    pub fn add_root(&self, path: impl Into<PathBuf>, settings: PathSettings) -> Result<()> {
        let path = path.into();
        match std::fs::metadata(&path) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(LanternError::root_unavailable(
                    path.to_string_lossy(),
                    "not a directory",
                ))
            }
            Err(e) => {
                return Err(LanternError::root_unavailable(
                    path.to_string_lossy(),
                    e.to_string(),
                ))
            }
        }
        let added = self.fs_index.add_path(path, settings)?;
        self.persist_cache();
        self.fs_index.update_root(added.root_key());
        Ok(())
    }

    /// Remove a root. Returns false if it was not present.
    pub fn remove_root(&self, root: &str) -> bool {
        let removed = self.fs_index.remove_path(root);
        if removed {
            self.persist_cache();
        }
        removed
    }

    /// Replace one root's settings and rescan it.
    pub fn set_root_settings(&self, root: &str, settings: PathSettings) -> Result<()> {
        if let Some(path) = self.fs_index.get(root) {
            path.set_settings(settings)?;
            self.persist_cache();
            self.fs_index.update_root(root);
        }
        Ok(())
    }

    /// Replace the bookmark source files and reparse.
    pub fn set_bookmark_paths(&self, paths: Vec<PathBuf>) {
        self.bookmarks.set_paths(paths);
        self.persist_cache();
    }

    /// Toggle hostname indexing for bookmarks.
    pub fn set_index_hostname(&self, enabled: bool) {
        self.bookmarks.set_index_hostname(enabled);
        self.persist_cache();
    }

    // --- persistence ---

    /// The cache document describing the current live configuration.
    pub fn cache_document(&self) -> CacheDocument {
        let mut roots = Vec::new();
        let mut paths = BTreeMap::new();
        for indexed in self.fs_index.index_paths() {
            roots.push(indexed.root_key().to_string());
            paths.insert(indexed.root_key().to_string(), indexed.to_record());
        }
        CacheDocument {
            roots,
            paths,
            bookmark_files: self
                .bookmarks
                .paths()
                .iter()
                .map(|p| p.to_string_lossy().to_string())
                .collect(),
            index_hostname: self.bookmarks.index_hostname(),
        }
    }

    /// Write the cache document; failure is logged, never fatal.
    fn persist_cache(&self) {
        if let Err(e) = self.cache.save(&self.cache_document()) {
            warn!(error = %e, "Failed to write index cache");
        }
    }

    /// Serialize the live configuration into the host settings store.
    pub fn persist_settings(&self, store: &mut dyn SettingsStore) {
        let mut paths = Vec::new();
        for indexed in self.fs_index.index_paths() {
            let root = indexed.root_key().to_string();
            let settings = indexed.settings();
            store.set(
                &scoped_key(&root, KEY_NAME_FILTERS),
                crate::settings::SettingsValue::StringList(settings.name_filters),
            );
            store.set(
                &scoped_key(&root, KEY_MIME_FILTERS),
                crate::settings::SettingsValue::StringList(settings.mime_filters),
            );
            store.set(
                &scoped_key(&root, KEY_INDEX_HIDDEN),
                crate::settings::SettingsValue::Bool(settings.index_hidden),
            );
            store.set(
                &scoped_key(&root, KEY_FOLLOW_SYMLINKS),
                crate::settings::SettingsValue::Bool(settings.follow_symlinks),
            );
            store.set(
                &scoped_key(&root, KEY_FS_WATCHES),
                crate::settings::SettingsValue::Bool(settings.watch_filesystem),
            );
            store.set(
                &scoped_key(&root, KEY_MAX_DEPTH),
                crate::settings::SettingsValue::Int(settings.max_depth as i64),
            );
            store.set(
                &scoped_key(&root, KEY_SCAN_INTERVAL),
                crate::settings::SettingsValue::Int(settings.scan_interval_secs as i64),
            );
            paths.push(root);
        }
        store.set(
            KEY_PATHS,
            crate::settings::SettingsValue::StringList(paths),
        );
        store.set(
            KEY_BOOKMARK_PATHS,
            crate::settings::SettingsValue::StringList(
                self.bookmarks
                    .paths()
                    .iter()
                    .map(|p| p.to_string_lossy().to_string())
                    .collect(),
            ),
        );
        store.set(
            KEY_INDEX_HOSTNAME,
            crate::settings::SettingsValue::Bool(self.bookmarks.index_hostname()),
        );
    }

    /// Persist and stop all workers.
    pub fn shutdown(&self) {
        self.persist_cache();
        self.stopped.store(true, Ordering::Release);
        self.bookmarks.shutdown();
        self.fs_index.shutdown();
        let forwarders: Vec<JoinHandle<()>> = self.forwarders.lock().drain(..).collect();
        for handle in forwarders {
            if handle.join().is_err() {
                warn!("Event forwarder panicked");
            }
        }
    }
}

/// Reconstruct an [`EngineConfig`] from the host settings store,
/// mirroring what [`Engine::persist_settings`] wrote.
pub fn config_from_settings(store: &dyn SettingsStore, cache_dir: PathBuf) -> EngineConfig {
    let mut roots = Vec::new();
    for root in store.get_string_list(KEY_PATHS).unwrap_or_default() {
        let defaults = PathSettings::default();
        let settings = PathSettings {
            name_filters: store
                .get_string_list(&scoped_key(&root, KEY_NAME_FILTERS))
                .unwrap_or(defaults.name_filters),
            mime_filters: store
                .get_string_list(&scoped_key(&root, KEY_MIME_FILTERS))
                .unwrap_or(defaults.mime_filters),
            index_hidden: store
                .get_bool(&scoped_key(&root, KEY_INDEX_HIDDEN))
                .unwrap_or(defaults.index_hidden),
            follow_symlinks: store
                .get_bool(&scoped_key(&root, KEY_FOLLOW_SYMLINKS))
                .unwrap_or(defaults.follow_symlinks),
            max_depth: store
                .get_i64(&scoped_key(&root, KEY_MAX_DEPTH))
                .map(|v| v.max(0) as u32)
                .unwrap_or(defaults.max_depth),
            scan_interval_secs: store
                .get_i64(&scoped_key(&root, KEY_SCAN_INTERVAL))
                .map(|v| v.max(0) as u64)
                .unwrap_or(defaults.scan_interval_secs),
            watch_filesystem: store
                .get_bool(&scoped_key(&root, KEY_FS_WATCHES))
                .unwrap_or(defaults.watch_filesystem),
        };
        roots.push(RootConfig {
            path: PathBuf::from(&root),
            settings,
        });
    }

    EngineConfig {
        cache_dir,
        roots,
        bookmark_files: store
            .get_string_list(KEY_BOOKMARK_PATHS)
            .unwrap_or_default()
            .into_iter()
            .map(PathBuf::from)
            .collect(),
        index_hostname: store.get_bool(KEY_INDEX_HOSTNAME).unwrap_or(false),
    }
}

fn forward_index_events(
    rx: Receiver<IndexEvent>,
    tx: Sender<EngineEvent>,
    stopped: Arc<AtomicBool>,
) -> JoinHandle<()> {
    std::thread::spawn(move || loop {
        if stopped.load(Ordering::Acquire) {
            break;
        }
        match rx.recv_timeout(Duration::from_millis(500)) {
            Ok(IndexEvent::Updated) => {
                let _ = tx.send(EngineEvent::IndexUpdated);
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
        }
    })
}

fn forward_bookmark_events(
    rx: Receiver<BookmarkEvent>,
    tx: Sender<EngineEvent>,
    stopped: Arc<AtomicBool>,
) -> JoinHandle<()> {
    std::thread::spawn(move || loop {
        if stopped.load(Ordering::Acquire) {
            break;
        }
        match rx.recv_timeout(Duration::from_millis(500)) {
            Ok(BookmarkEvent::Updated) => {
                let _ = tx.send(EngineEvent::BookmarksUpdated);
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
        }
    })
}
