//! Browser bookmarks indexing.
//!
//! Chromium-family browsers keep bookmarks in a JSON document whose
//! top-level `roots` object holds recursive folder/url nodes. This module
//! flattens that tree into a list of [`BookmarkItem`]s:
//!
//! - a node with `"type": "folder"` is recursed into via its `children`
//! - a node with `"type": "url"` yields one item from `guid`/`name`/`url`
//! - any other or missing `type` is skipped
//!
//! Parsing runs on a background worker and is abortable between files
//! (coarse-grained; a file is never left half-adopted because results are
//! only published as a whole on completion). A re-trigger while a run is
//! in flight starts a superseding run; only the newest generation's
//! result is adopted, never a partial merge.
//!
//! Browsers replace the bookmarks file by rename, so the watch set is
//! re-registered after every change notification before the reparse.

use crate::types::{BookmarkItem, IndexItem, SearchItem};
use crate::watch::WatchSource;
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Watch owner key used for bookmark source files.
const WATCH_OWNER: &str = "bookmarks";

/// Browser profile directory names probed during auto-discovery.
const APP_DIRS: &[&str] = &[
    "BraveSoftware",
    "Google/Chrome",
    "brave-browser",
    "chromium",
    "google-chrome",
    "vivaldi",
];

/// Bound on the recursive probe below each profile directory.
const DISCOVERY_MAX_DEPTH: u32 = 6;

/// Notification emitted when a reparse has been adopted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookmarkEvent {
    /// The bookmark list was replaced with a fresh parse
    Updated,
}

/// Flatten one bookmarks node into the accumulator.
fn collect_bookmarks(node: &serde_json::Value, out: &mut Vec<BookmarkItem>) {
    let Some(kind) = node.get("type").and_then(|t| t.as_str()) else {
        return;
    };

    match kind {
        "folder" => {
            if let Some(children) = node.get("children").and_then(|c| c.as_array()) {
                for child in children {
                    collect_bookmarks(child, out);
                }
            }
        }
        "url" => {
            let field = |key: &str| {
                node.get(key)
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string()
            };
            out.push(BookmarkItem::new(field("guid"), field("name"), field("url")));
        }
        _ => {}
    }
}

/// Parse a set of bookmarks files into a flat item list.
///
/// The abort flag is checked once before each file: an abort observed
/// before the first file returns an empty list; an abort observed between
/// files returns the files parsed so far. Unreadable or unparseable files
/// are logged and skipped without aborting the run.
pub fn parse_bookmark_files(paths: &[PathBuf], abort: &AtomicBool) -> Vec<BookmarkItem> {
    parse_files_until(paths, || abort.load(Ordering::Acquire))
}

/// Parse files in order, consulting `aborted` once before each file.
fn parse_files_until(paths: &[PathBuf], mut aborted: impl FnMut() -> bool) -> Vec<BookmarkItem> {
    let mut items = Vec::new();

    for path in paths {
        if aborted() {
            debug!("Bookmark parse aborted");
            return items;
        }
        parse_bookmark_file(path, &mut items);
    }

    items
}

/// Parse one bookmarks file into the accumulator.
fn parse_bookmark_file(path: &Path, items: &mut Vec<BookmarkItem>) {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Could not open bookmarks file");
            return;
        }
    };

    let document: serde_json::Value = match serde_json::from_str(&contents) {
        Ok(value) => value,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Could not parse bookmarks file");
            return;
        }
    };

    if let Some(roots) = document.get("roots").and_then(|r| r.as_object()) {
        for root in roots.values() {
            if root.is_object() {
                collect_bookmarks(root, items);
            }
        }
    }
}

/// Probe standard per-user locations for Chromium-family bookmarks files.
///
/// Searches the user data and config directories for the known profile
/// directory names, recursively collecting files literally named
/// `Bookmarks`.
pub fn discover_sources() -> Vec<PathBuf> {
    let mut found = Vec::new();

    let Some(base) = directories::BaseDirs::new() else {
        return found;
    };

    for location in [base.data_dir(), base.config_dir()] {
        for app_dir in APP_DIRS {
            let candidate = location.join(app_dir);
            if candidate.is_dir() {
                find_bookmarks_files(&candidate, 0, &mut found);
            }
        }
    }

    found.sort();
    found.dedup();
    info!(sources = found.len(), "Bookmark source auto-discovery complete");
    found
}

fn find_bookmarks_files(dir: &Path, depth: u32, out: &mut Vec<PathBuf>) {
    if depth > DISCOVERY_MAX_DEPTH {
        return;
    }
    let Ok(reader) = fs::read_dir(dir) else {
        return;
    };
    for entry in reader.flatten() {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            find_bookmarks_files(&path, depth + 1, out);
        } else if file_type.is_file() && entry.file_name() == "Bookmarks" {
            out.push(path);
        }
    }
}

/// Background bookmarks indexer with an atomically swapped item snapshot.
///
/// Use through an `Arc`; the worker and the watch-router threads hold
/// clones of it.
pub struct BookmarksIndexer {
    paths: RwLock<Vec<PathBuf>>,
    index_hostname: AtomicBool,
    items: RwLock<Arc<Vec<BookmarkItem>>>,
    abort: Arc<AtomicBool>,
    generation: AtomicU64,
    watch: Arc<dyn WatchSource>,
    event_tx: Sender<BookmarkEvent>,
    event_rx: Receiver<BookmarkEvent>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    stopped: AtomicBool,
}

impl BookmarksIndexer {
    /// Create an indexer over the given source files.
    ///
    /// The paths are sorted for a stable identity and registered with the
    /// watch source; call [`run`](Self::run) to produce the first snapshot.
    pub fn new(mut paths: Vec<PathBuf>, index_hostname: bool, watch: Arc<dyn WatchSource>) -> Arc<Self> {
        paths.sort();
        let (event_tx, event_rx) = unbounded();
        watch.replace(WATCH_OWNER, &paths);

        let indexer = Arc::new(BookmarksIndexer {
            paths: RwLock::new(paths),
            index_hostname: AtomicBool::new(index_hostname),
            items: RwLock::new(Arc::new(Vec::new())),
            abort: Arc::new(AtomicBool::new(false)),
            generation: AtomicU64::new(0),
            watch,
            event_tx,
            event_rx,
            workers: Mutex::new(Vec::new()),
            stopped: AtomicBool::new(false),
        });

        indexer.spawn_watch_router();
        indexer
    }

    /// The configured source file paths.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.paths.read().clone()
    }

    /// Replace the source file paths, re-register watches, and reparse.
    pub fn set_paths(self: &Arc<Self>, mut paths: Vec<PathBuf>) {
        paths.sort();
        self.watch.replace(WATCH_OWNER, &paths);
        *self.paths.write() = paths;
        self.run();
    }

    /// Whether bookmarks are additionally indexed under their hostname.
    pub fn index_hostname(&self) -> bool {
        self.index_hostname.load(Ordering::Acquire)
    }

    /// Toggle hostname indexing. Takes effect on the next
    /// [`index_items`](Self::index_items) call; no reparse is needed since
    /// the underlying items are unchanged.
    pub fn set_index_hostname(&self, enabled: bool) {
        self.index_hostname.store(enabled, Ordering::Release);
    }

    /// The current bookmark snapshot.
    pub fn items(&self) -> Arc<Vec<BookmarkItem>> {
        self.items.read().clone()
    }

    /// Number of indexed bookmarks.
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    /// True if no bookmarks are indexed.
    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    /// Receiver of adopted-reparse notifications.
    pub fn events(&self) -> Receiver<BookmarkEvent> {
        self.event_rx.clone()
    }

    /// Start a background parse run.
    ///
    /// If a run is already in flight this one supersedes it: both
    /// complete, but only the newest generation's result is adopted.
    pub fn run(self: &Arc<Self>) {
        let my_generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let indexer = self.clone();

        let handle = std::thread::spawn(move || {
            let paths = indexer.paths();
            let result = parse_bookmark_files(&paths, &indexer.abort);

            if indexer.abort.load(Ordering::Acquire) {
                return;
            }

            if indexer.adopt(my_generation, result) {
                let _ = indexer.event_tx.send(BookmarkEvent::Updated);
            } else {
                debug!(generation = my_generation, "Discarding superseded bookmark parse");
            }
        });

        self.push_worker(handle);
    }

    /// Adopt a parse result if `my_generation` is still the newest run.
    ///
    /// The generation re-check and the swap happen under the snapshot
    /// write lock, so a superseded run that passed an earlier check can
    /// never overwrite a newer run's result.
    fn adopt(&self, my_generation: u64, result: Vec<BookmarkItem>) -> bool {
        let mut items = self.items.write();
        if self.generation.load(Ordering::Acquire) != my_generation {
            return false;
        }
        info!(bookmarks = result.len(), "Bookmarks indexed");
        *items = Arc::new(result);
        true
    }

    /// Track a worker handle, reaping handles whose threads have already
    /// finished so a long-lived indexer does not accumulate them.
    fn push_worker(&self, handle: JoinHandle<()>) {
        let mut workers = self.workers.lock();
        workers.retain(|h| !h.is_finished());
        workers.push(handle);
    }

    /// Publish `(item, key)` pairs for the host search index.
    ///
    /// Every bookmark appears under its title; with hostname indexing
    /// enabled it additionally appears under the hostname of its URL
    /// (same item, two entries).
    pub fn index_items(&self) -> Vec<IndexItem> {
        let items = self.items();
        let index_hostname = self.index_hostname();
        let mut out = Vec::with_capacity(items.len());

        for bookmark in items.iter() {
            let shared: Arc<dyn SearchItem> = Arc::new(bookmark.clone());
            out.push(IndexItem::new(shared.clone(), bookmark.name.clone()));
            if index_hostname {
                if let Some(host) = url::Url::parse(&bookmark.url)
                    .ok()
                    .and_then(|u| u.host_str().map(|h| h.to_string()))
                {
                    out.push(IndexItem::new(shared, host));
                }
            }
        }

        out
    }

    /// Signal abort and wait for all workers to finish.
    pub fn shutdown(&self) {
        self.stopped.store(true, Ordering::Release);
        self.abort.store(true, Ordering::Release);
        let workers: Vec<JoinHandle<()>> = self.workers.lock().drain(..).collect();
        for handle in workers {
            if handle.join().is_err() {
                warn!("Bookmark worker panicked");
            }
        }
    }

    /// Route change notifications for source files into reparse runs.
    fn spawn_watch_router(self: &Arc<Self>) {
        let indexer = self.clone();
        let events = self.watch.events();

        let handle = std::thread::spawn(move || loop {
            if indexer.stopped.load(Ordering::Acquire) {
                break;
            }
            match events.recv_timeout(Duration::from_millis(500)) {
                Ok(event) if event.owner == WATCH_OWNER => {
                    debug!(path = %event.path.display(), "Bookmarks file changed");
                    // Chromium replaces the file (inode change); re-register
                    // before reparsing so the new file is watched
                    let paths = indexer.paths();
                    indexer.watch.replace(WATCH_OWNER, &paths);
                    indexer.run();
                }
                Ok(_) => {}
                Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
                Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
            }
        });

        self.push_worker(handle);
    }
}

impl std::fmt::Debug for BookmarksIndexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookmarksIndexer")
            .field("sources", &self.paths.read().len())
            .field("bookmarks", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watch::NullWatchSource;
    use std::io::Write;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"{
        "roots": {
            "bookmark_bar": {
                "type": "folder",
                "children": [
                    {"type": "url", "guid": "g1", "name": "Example", "url": "http://example.com"}
                ]
            }
        }
    }"#;

    fn write_file(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_parse_single_bookmark() {
        let temp = TempDir::new().unwrap();
        let path = write_file(&temp, "Bookmarks", SAMPLE);

        let abort = AtomicBool::new(false);
        let items = parse_bookmark_files(&[path], &abort);

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].guid, "g1");
        assert_eq!(items[0].name, "Example");
        assert_eq!(items[0].url, "http://example.com");
    }

    #[test]
    fn test_parse_nested_folders_and_unknown_types() {
        let temp = TempDir::new().unwrap();
        let doc = r#"{
            "roots": {
                "bookmark_bar": {
                    "type": "folder",
                    "children": [
                        {"type": "folder", "children": [
                            {"type": "url", "guid": "g1", "name": "A", "url": "http://a.test"},
                            {"type": "separator"},
                            {"name": "no type, skipped"}
                        ]},
                        {"type": "url", "guid": "g2", "name": "B", "url": "http://b.test"}
                    ]
                },
                "other": {
                    "type": "folder",
                    "children": [
                        {"type": "url", "guid": "g3", "name": "C", "url": "http://c.test"}
                    ]
                }
            }
        }"#;
        let path = write_file(&temp, "Bookmarks", doc);

        let abort = AtomicBool::new(false);
        let items = parse_bookmark_files(&[path], &abort);

        let guids: Vec<&str> = items.iter().map(|i| i.guid.as_str()).collect();
        assert_eq!(guids, vec!["g1", "g2", "g3"]);
    }

    #[test]
    fn test_unreadable_file_skipped() {
        let temp = TempDir::new().unwrap();
        let good = write_file(&temp, "Bookmarks", SAMPLE);
        let missing = temp.path().join("missing");
        let garbage = write_file(&temp, "Garbage", "not json at all");

        let abort = AtomicBool::new(false);
        let items = parse_bookmark_files(&[missing, garbage, good], &abort);

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].guid, "g1");
    }

    #[test]
    fn test_abort_before_parse_yields_empty() {
        let temp = TempDir::new().unwrap();
        let paths: Vec<PathBuf> = (0..3)
            .map(|i| write_file(&temp, &format!("Bookmarks{}", i), SAMPLE))
            .collect();

        let abort = AtomicBool::new(true);
        let items = parse_bookmark_files(&paths, &abort);
        assert!(items.is_empty());
    }

    #[test]
    fn test_abort_between_files_keeps_parsed_prefix() {
        let temp = TempDir::new().unwrap();
        let second_doc = SAMPLE.replace("g1", "g2");
        let first = write_file(&temp, "First", SAMPLE);
        let second = write_file(&temp, "Second", &second_doc);

        // Abort observed before the second file: only the first file's
        // bookmarks are returned
        let mut checks = 0;
        let items = parse_files_until(&[first, second], || {
            checks += 1;
            checks > 1
        });

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].guid, "g1");
    }

    #[test]
    fn test_run_adopts_snapshot_and_notifies() {
        let temp = TempDir::new().unwrap();
        let path = write_file(&temp, "Bookmarks", SAMPLE);

        let indexer = BookmarksIndexer::new(vec![path], false, Arc::new(NullWatchSource::new()));
        let events = indexer.events();
        indexer.run();

        events
            .recv_timeout(Duration::from_secs(5))
            .expect("expected a bookmarks update");
        assert_eq!(indexer.len(), 1);
        assert_eq!(indexer.items()[0].guid, "g1");

        indexer.shutdown();
    }

    #[test]
    fn test_index_hostname_doubles_keys() {
        let temp = TempDir::new().unwrap();
        let path = write_file(&temp, "Bookmarks", SAMPLE);

        let indexer = BookmarksIndexer::new(vec![path], true, Arc::new(NullWatchSource::new()));
        let events = indexer.events();
        indexer.run();
        events.recv_timeout(Duration::from_secs(5)).unwrap();

        let items = indexer.index_items();
        let keys: Vec<&str> = items.iter().map(|i| i.key.as_str()).collect();
        assert_eq!(keys, vec!["Example", "example.com"]);
        // Same underlying item under both keys
        assert_eq!(items[0].item.id(), items[1].item.id());

        indexer.set_index_hostname(false);
        let items = indexer.index_items();
        let keys: Vec<&str> = items.iter().map(|i| i.key.as_str()).collect();
        assert_eq!(keys, vec!["Example"]);

        indexer.shutdown();
    }

    #[test]
    fn test_superseded_generation_not_adopted() {
        let temp = TempDir::new().unwrap();
        let path = write_file(&temp, "Bookmarks", SAMPLE);

        let indexer = BookmarksIndexer::new(vec![path], false, Arc::new(NullWatchSource::new()));
        let events = indexer.events();
        indexer.run();
        events.recv_timeout(Duration::from_secs(5)).unwrap();
        let current = indexer.items();
        assert_eq!(current.len(), 1);

        // A run that was superseded before publishing must not replace
        // the newer snapshot
        let newest = indexer.generation.load(Ordering::Acquire);
        assert!(!indexer.adopt(newest - 1, Vec::new()));
        assert_eq!(indexer.items(), current);

        // The newest generation still publishes
        assert!(indexer.adopt(newest, Vec::new()));
        assert!(indexer.items().is_empty());

        indexer.shutdown();
    }

    #[test]
    fn test_finished_workers_reaped() {
        let temp = TempDir::new().unwrap();
        let path = write_file(&temp, "Bookmarks", SAMPLE);

        let indexer = BookmarksIndexer::new(vec![path], false, Arc::new(NullWatchSource::new()));
        let events = indexer.events();

        for _ in 0..5 {
            indexer.run();
            events.recv_timeout(Duration::from_secs(5)).unwrap();
        }

        // Let the last worker return after sending its event, then
        // trigger one more run so the reap happens
        std::thread::sleep(Duration::from_millis(200));
        indexer.run();
        events.recv_timeout(Duration::from_secs(5)).unwrap();

        // Watch router + at most the two most recent workers remain
        assert!(indexer.workers.lock().len() <= 3);

        indexer.shutdown();
    }

    #[test]
    fn test_set_paths_reregisters_watches() {
        let temp = TempDir::new().unwrap();
        let a = write_file(&temp, "A", SAMPLE);
        let b = write_file(&temp, "B", SAMPLE);

        let source = Arc::new(NullWatchSource::new());
        let indexer = BookmarksIndexer::new(vec![a.clone()], false, source.clone());
        assert_eq!(source.registered(WATCH_OWNER), vec![a.clone()]);

        indexer.set_paths(vec![b.clone(), a.clone()]);
        // Sorted, wholesale replacement
        assert_eq!(source.registered(WATCH_OWNER), vec![a, b]);

        indexer.shutdown();
    }

    #[test]
    fn test_change_notification_triggers_reparse() {
        let temp = TempDir::new().unwrap();
        let path = write_file(&temp, "Bookmarks", SAMPLE);

        let source = Arc::new(NullWatchSource::new());
        let indexer = BookmarksIndexer::new(vec![path.clone()], false, source.clone());
        let events = indexer.events();
        indexer.run();
        events.recv_timeout(Duration::from_secs(5)).unwrap();

        // Replace the file contents, then signal a change
        let updated = SAMPLE.replace("Example", "Changed");
        fs::write(&path, updated).unwrap();
        source
            .sender()
            .send(crate::watch::WatchEvent {
                owner: WATCH_OWNER.to_string(),
                path: path.clone(),
            })
            .unwrap();

        events
            .recv_timeout(Duration::from_secs(5))
            .expect("expected a reparse after the change notification");
        assert_eq!(indexer.items()[0].name, "Changed");

        indexer.shutdown();
    }
}
