//! Aggregation and scan coordination across indexed roots.
//!
//! The [`FsIndex`] owns the set of [`IndexedPath`]s (keyed by canonical
//! root, duplicates rejected) and a coordinator thread that serializes
//! scan batches. A batch fans out across the due roots with Rayon and
//! emits exactly one [`IndexEvent::Updated`] after *all* scans in the
//! batch have completed, never mid-batch. The host therefore republishes
//! its catalog once per settled batch instead of once per root.
//!
//! ## Trigger sources
//!
//! - explicit [`update`](FsIndex::update) / [`update_root`](FsIndex::update_root) calls
//! - the per-root rescan interval, checked on a coarse tick
//! - filesystem change notifications for roots with watching enabled
//!
//! ## Coalescing
//!
//! Triggers arriving while a batch is in flight queue on the command
//! channel and are drained into a single follow-up batch once the current
//! one settles: at most one pending extra run, and the same root is never
//! scanned twice concurrently (only the coordinator scans).

use crate::error::{LanternError, Result};
use crate::indexed_path::{IndexedPath, PathSettings};
use crate::types::Entry;
use crate::watch::WatchSource;
use chrono::Utc;
use crossbeam_channel::{select, unbounded, Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Coarse scheduling tick for the per-root rescan intervals.
const TICK: Duration = Duration::from_millis(500);

/// Window during which a burst of triggers is folded into one batch.
const SETTLE: Duration = Duration::from_millis(50);

/// Notification emitted by the index coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexEvent {
    /// A scan batch has fully settled; snapshots are fresh
    Updated,
}

enum Command {
    UpdateAll,
    UpdateRoot(String),
    Shutdown,
}

struct Inner {
    paths: RwLock<BTreeMap<String, Arc<IndexedPath>>>,
    watch: Arc<dyn WatchSource>,
}

impl Inner {
    /// Roots whose rescan interval has elapsed since their last scan.
    ///
    /// Roots that have never been scanned are not picked up here; the
    /// first scan always comes from an explicit update.
    fn due_by_interval(&self) -> Vec<String> {
        let now = Utc::now();
        self.paths
            .read()
            .values()
            .filter(|p| {
                let settings = p.settings();
                if settings.scan_interval_secs == 0 {
                    return false;
                }
                match p.last_scan() {
                    Some(last) => {
                        let elapsed = (now - last).num_seconds();
                        elapsed >= 0 && elapsed as u64 >= settings.scan_interval_secs
                    }
                    None => false,
                }
            })
            .map(|p| p.root_key().to_string())
            .collect()
    }

    /// Scan every root in `due` and rebuild its watch set.
    fn run_batch(&self, due: &BTreeSet<String>) -> usize {
        let targets: Vec<Arc<IndexedPath>> = {
            let paths = self.paths.read();
            due.iter().filter_map(|key| paths.get(key).cloned()).collect()
        };

        if targets.is_empty() {
            return 0;
        }

        debug!(roots = targets.len(), "Running scan batch");

        targets.par_iter().for_each(|path| {
            let outcome = path.scan();
            if path.settings().watch_filesystem {
                self.watch.replace(path.root_key(), &outcome.watched_dirs);
            } else {
                self.watch.replace(path.root_key(), &[]);
            }
        });

        targets.len()
    }
}

/// The filesystem index: unique roots, background scans, one settled
/// notification per batch.
pub struct FsIndex {
    inner: Arc<Inner>,
    cmd_tx: Sender<Command>,
    event_rx: Receiver<IndexEvent>,
    coordinator: Mutex<Option<JoinHandle<()>>>,
}

impl FsIndex {
    /// Create an index coordinating scans through the given watch source.
    pub fn new(watch: Arc<dyn WatchSource>) -> Self {
        let (cmd_tx, cmd_rx) = unbounded();
        let (event_tx, event_rx) = unbounded();
        let watch_rx = watch.events();

        let inner = Arc::new(Inner {
            paths: RwLock::new(BTreeMap::new()),
            watch,
        });

        let coordinator_inner = inner.clone();
        let handle =
            std::thread::spawn(move || coordinator_loop(coordinator_inner, cmd_rx, watch_rx, event_tx));

        FsIndex {
            inner,
            cmd_tx,
            event_rx,
            coordinator: Mutex::new(Some(handle)),
        }
    }

    /// Add a root with the given settings.
    ///
    /// Returns [`LanternError::DuplicateRoot`] if the canonical root is
    /// already indexed; the mapping is unchanged in that case.
    pub fn add_path(
        &self,
        root: impl Into<PathBuf>,
        settings: PathSettings,
    ) -> Result<Arc<IndexedPath>> {
        self.add_indexed(Arc::new(IndexedPath::new(root, settings)?))
    }

    /// Add an already-constructed indexed path (e.g., restored from the
    /// persistence codec).
    pub fn add_indexed(&self, path: Arc<IndexedPath>) -> Result<Arc<IndexedPath>> {
        let mut paths = self.inner.paths.write();
        let key = path.root_key().to_string();
        if paths.contains_key(&key) {
            return Err(LanternError::DuplicateRoot { root: key });
        }
        info!(root = %key, "Root added to index");
        paths.insert(key, path.clone());
        Ok(path)
    }

    /// Remove a root and discard its snapshot and watches.
    ///
    /// Returns false if the root was not present.
    pub fn remove_path(&self, root: &str) -> bool {
        let removed = self.inner.paths.write().remove(root).is_some();
        if removed {
            self.inner.watch.replace(root, &[]);
            info!(root = %root, "Root removed from index");
        }
        removed
    }

    /// Look up one indexed path by its root key.
    pub fn get(&self, root: &str) -> Option<Arc<IndexedPath>> {
        self.inner.paths.read().get(root).cloned()
    }

    /// The current mapping, ordered by root key.
    pub fn index_paths(&self) -> Vec<Arc<IndexedPath>> {
        self.inner.paths.read().values().cloned().collect()
    }

    /// Number of indexed roots.
    pub fn len(&self) -> usize {
        self.inner.paths.read().len()
    }

    /// True if no roots are configured.
    pub fn is_empty(&self) -> bool {
        self.inner.paths.read().is_empty()
    }

    /// Flattened view of every root's current snapshot.
    pub fn entries(&self) -> Vec<Entry> {
        let paths = self.index_paths();
        let mut all = Vec::new();
        for path in paths {
            all.extend(path.entries().iter().cloned());
        }
        all
    }

    /// Request a rescan of all roots.
    pub fn update(&self) {
        let _ = self.cmd_tx.send(Command::UpdateAll);
    }

    /// Request a rescan of one root.
    pub fn update_root(&self, root: &str) {
        let _ = self.cmd_tx.send(Command::UpdateRoot(root.to_string()));
    }

    /// Receiver of settled-batch notifications.
    pub fn events(&self) -> Receiver<IndexEvent> {
        self.event_rx.clone()
    }

    /// Stop the coordinator and wait for it to finish.
    pub fn shutdown(&self) {
        let _ = self.cmd_tx.send(Command::Shutdown);
        if let Some(handle) = self.coordinator.lock().take() {
            if handle.join().is_err() {
                warn!("Index coordinator thread panicked");
            }
        }
    }
}

impl Drop for FsIndex {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for FsIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsIndex")
            .field("roots", &self.len())
            .finish()
    }
}

fn coordinator_loop(
    inner: Arc<Inner>,
    cmd_rx: Receiver<Command>,
    watch_rx: Receiver<crate::watch::WatchEvent>,
    event_tx: Sender<IndexEvent>,
) {
    loop {
        let mut due: BTreeSet<String> = BTreeSet::new();
        let mut shutdown = false;

        // Wait for a trigger or the scheduling tick
        select! {
            recv(cmd_rx) -> msg => match msg {
                Ok(Command::UpdateAll) => {
                    due.extend(inner.paths.read().keys().cloned());
                }
                Ok(Command::UpdateRoot(root)) => {
                    due.insert(root);
                }
                Ok(Command::Shutdown) | Err(_) => shutdown = true,
            },
            recv(watch_rx) -> msg => {
                if let Ok(event) = msg {
                    debug!(root = %event.owner, path = %event.path.display(), "Change notification");
                    due.insert(event.owner);
                }
            },
            default(TICK) => {
                due.extend(inner.due_by_interval());
            }
        }

        // Fold any burst of triggers into this batch
        if !shutdown {
            let deadline = Instant::now() + SETTLE;
            loop {
                let now = Instant::now();
                if now >= deadline {
                    break;
                }
                select! {
                    recv(cmd_rx) -> msg => match msg {
                        Ok(Command::UpdateAll) => {
                            due.extend(inner.paths.read().keys().cloned());
                        }
                        Ok(Command::UpdateRoot(root)) => {
                            due.insert(root);
                        }
                        Ok(Command::Shutdown) | Err(_) => {
                            shutdown = true;
                            break;
                        }
                    },
                    recv(watch_rx) -> msg => {
                        if let Ok(event) = msg {
                            due.insert(event.owner);
                        }
                    },
                    default(deadline - now) => break,
                }
            }
        }

        if !due.is_empty() {
            let scanned = inner.run_batch(&due);
            if scanned > 0 {
                // One notification per settled batch
                let _ = event_tx.send(IndexEvent::Updated);
            }
        }

        if shutdown {
            debug!("Index coordinator stopping");
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watch::{NullWatchSource, WatchEvent};
    use std::fs::File;
    use tempfile::TempDir;

    fn test_settings() -> PathSettings {
        PathSettings {
            name_filters: vec![],
            mime_filters: vec!["inode/directory".to_string(), "*".to_string()],
            scan_interval_secs: 0,
            ..PathSettings::default()
        }
    }

    fn wait_updated(rx: &Receiver<IndexEvent>) {
        rx.recv_timeout(Duration::from_secs(5))
            .expect("expected an Updated event");
    }

    #[test]
    fn test_duplicate_root_rejected() {
        let temp = TempDir::new().unwrap();
        let index = FsIndex::new(Arc::new(NullWatchSource::new()));

        index.add_path(temp.path(), test_settings()).unwrap();
        let result = index.add_path(temp.path(), test_settings());

        assert!(matches!(result, Err(LanternError::DuplicateRoot { .. })));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_update_fires_one_event_per_batch() {
        let roots: Vec<TempDir> = (0..3).map(|_| TempDir::new().unwrap()).collect();
        for (i, root) in roots.iter().enumerate() {
            File::create(root.path().join(format!("file{}.pdf", i))).unwrap();
        }

        let index = FsIndex::new(Arc::new(NullWatchSource::new()));
        for root in &roots {
            index.add_path(root.path(), test_settings()).unwrap();
        }

        let events = index.events();
        index.update();
        wait_updated(&events);

        // All three roots were scanned in the one batch
        for path in index.index_paths() {
            assert!(path.last_scan().is_some());
            assert!(!path.entries().is_empty());
        }

        // No further events without further triggers
        std::thread::sleep(Duration::from_millis(300));
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_overlapping_updates_coalesce() {
        let temp = TempDir::new().unwrap();
        File::create(temp.path().join("a.pdf")).unwrap();

        let index = FsIndex::new(Arc::new(NullWatchSource::new()));
        index.add_path(temp.path(), test_settings()).unwrap();

        let events = index.events();
        for _ in 0..5 {
            index.update();
        }

        wait_updated(&events);
        // The burst folds into at most one follow-up batch
        std::thread::sleep(Duration::from_millis(500));
        let mut extra = 0;
        while events.try_recv().is_ok() {
            extra += 1;
        }
        assert!(extra <= 1, "expected at most one follow-up batch, got {}", extra);
    }

    #[test]
    fn test_watch_event_triggers_rescan() {
        let temp = TempDir::new().unwrap();
        File::create(temp.path().join("first.pdf")).unwrap();

        let source = Arc::new(NullWatchSource::new());
        let sender = source.sender();
        let index = FsIndex::new(source.clone());

        let mut settings = test_settings();
        settings.watch_filesystem = true;
        let path = index.add_path(temp.path(), settings).unwrap();
        let key = path.root_key().to_string();

        let events = index.events();
        index.update();
        wait_updated(&events);
        assert!(!source.registered(&key).is_empty());

        // A change notification for the root coalesces into one rescan
        File::create(temp.path().join("second.pdf")).unwrap();
        sender
            .send(WatchEvent {
                owner: key.clone(),
                path: temp.path().join("second.pdf"),
            })
            .unwrap();

        wait_updated(&events);
        let names: Vec<String> = path.entries().iter().map(|e| e.name.clone()).collect();
        assert!(names.contains(&"second.pdf".to_string()));
    }

    #[test]
    fn test_remove_path_clears_watches() {
        let temp = TempDir::new().unwrap();
        let source = Arc::new(NullWatchSource::new());
        let index = FsIndex::new(source.clone());

        let mut settings = test_settings();
        settings.watch_filesystem = true;
        let path = index.add_path(temp.path(), settings).unwrap();
        let key = path.root_key().to_string();

        let events = index.events();
        index.update();
        wait_updated(&events);
        assert!(!source.registered(&key).is_empty());

        assert!(index.remove_path(&key));
        assert!(source.registered(&key).is_empty());
        assert!(index.is_empty());
        // Removing again is a no-op
        assert!(!index.remove_path(&key));
    }

    #[test]
    fn test_interval_schedules_rescan() {
        let temp = TempDir::new().unwrap();
        File::create(temp.path().join("first.pdf")).unwrap();

        let index = FsIndex::new(Arc::new(NullWatchSource::new()));
        let mut settings = test_settings();
        settings.scan_interval_secs = 1;
        let path = index.add_path(temp.path(), settings).unwrap();

        let events = index.events();
        index.update();
        wait_updated(&events);

        File::create(temp.path().join("later.pdf")).unwrap();

        // The 1s interval picks the root up on a subsequent tick
        events
            .recv_timeout(Duration::from_secs(5))
            .expect("expected an interval-driven rescan");
        let names: Vec<String> = path.entries().iter().map(|e| e.name.clone()).collect();
        assert!(names.contains(&"later.pdf".to_string()));
    }

    #[test]
    fn test_entries_flattens_all_roots() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        File::create(a.path().join("a.pdf")).unwrap();
        File::create(b.path().join("b.pdf")).unwrap();

        let index = FsIndex::new(Arc::new(NullWatchSource::new()));
        index.add_path(a.path(), test_settings()).unwrap();
        index.add_path(b.path(), test_settings()).unwrap();

        let events = index.events();
        index.update();
        wait_updated(&events);

        let names: Vec<String> = index.entries().iter().map(|e| e.name.clone()).collect();
        assert!(names.contains(&"a.pdf".to_string()));
        assert!(names.contains(&"b.pdf".to_string()));
    }
}
