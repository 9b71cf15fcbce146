//! Filesystem change notification source.
//!
//! The engine registers a *set* of paths per owner (an indexed root, or
//! the bookmarks indexer) and replaces that set wholesale after every
//! scan. The remove-all/re-add strategy is deliberate: browsers and many
//! editors replace files by atomic rename, which silently detaches a
//! watch on the old inode. Re-registering after each scan keeps the watch
//! set honest; in-flight events for now-stale paths are simply resolved
//! by the next rescan.
//!
//! Watch registration failures are logged and never fatal; a root that
//! cannot be watched just falls back to its periodic rescan interval.

use crate::error::{LanternError, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// One delivered change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    /// The owner key the changed path was registered under
    pub owner: String,

    /// The path the underlying notifier reported
    pub path: PathBuf,
}

/// A source of filesystem change notifications.
///
/// Implementations deliver [`WatchEvent`]s on the channel returned by
/// [`events`](WatchSource::events). The registered set for an owner is
/// replaced wholesale by [`replace`](WatchSource::replace); passing an
/// empty slice clears it.
pub trait WatchSource: Send + Sync {
    /// Replace the watch set registered under `owner`.
    fn replace(&self, owner: &str, paths: &[PathBuf]);

    /// A receiver of change events from this source.
    fn events(&self) -> Receiver<WatchEvent>;
}

/// State shared between the watcher and the notify callback.
struct WatchState {
    /// owner -> registered paths
    owners: HashMap<String, HashSet<PathBuf>>,
}

impl WatchState {
    /// Resolve which owner a reported path belongs to: an exact match
    /// first, then the containing directory.
    fn owner_of(&self, path: &Path) -> Option<String> {
        for (owner, paths) in &self.owners {
            if paths.contains(path) {
                return Some(owner.clone());
            }
        }
        let parent = path.parent()?;
        for (owner, paths) in &self.owners {
            if paths.contains(parent) {
                return Some(owner.clone());
            }
        }
        None
    }

    /// Paths registered by any owner (for reference-counted unwatching).
    fn is_registered(&self, path: &Path) -> bool {
        self.owners.values().any(|set| set.contains(path))
    }
}

/// [`WatchSource`] implementation over `notify`'s recommended watcher.
///
/// Watches are non-recursive and per-directory (or per-file for bookmark
/// sources); the scan decides which directories are interesting, the
/// watcher only mirrors that decision.
pub struct NotifyWatcher {
    watcher: Mutex<RecommendedWatcher>,
    state: Arc<Mutex<WatchState>>,
    events: Receiver<WatchEvent>,
}

impl NotifyWatcher {
    /// Create a watcher delivering events on an internal channel.
    pub fn new() -> Result<Self> {
        let (tx, rx): (Sender<WatchEvent>, Receiver<WatchEvent>) = unbounded();
        let state = Arc::new(Mutex::new(WatchState {
            owners: HashMap::new(),
        }));

        let callback_state = state.clone();
        let watcher = notify::recommended_watcher(
            move |event_result: notify::Result<notify::Event>| match event_result {
                Ok(event) => {
                    let state = callback_state.lock();
                    for path in event.paths {
                        if let Some(owner) = state.owner_of(&path) {
                            // Receiver dropped means shutdown; nothing to do
                            let _ = tx.send(WatchEvent { owner, path });
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Filesystem watcher error");
                }
            },
        )
        .map_err(|e| LanternError::watch(e.to_string()))?;

        Ok(NotifyWatcher {
            watcher: Mutex::new(watcher),
            state,
            events: rx,
        })
    }
}

impl WatchSource for NotifyWatcher {
    fn replace(&self, owner: &str, paths: &[PathBuf]) {
        let new_set: HashSet<PathBuf> = paths.iter().cloned().collect();
        let mut watcher = self.watcher.lock();
        let mut state = self.state.lock();

        let old_set = state.owners.remove(owner).unwrap_or_default();

        // Unwatch paths this owner dropped, unless another owner still
        // holds them
        for stale in old_set.difference(&new_set) {
            if !state.is_registered(stale) {
                if let Err(e) = watcher.unwatch(stale) {
                    debug!(path = %stale.display(), error = %e, "Unwatch failed (path likely gone)");
                }
            }
        }

        // Watch newly added paths
        for added in new_set.difference(&old_set) {
            if !state.is_registered(added) {
                if let Err(e) = watcher.watch(added, RecursiveMode::NonRecursive) {
                    warn!(path = %added.display(), error = %e, "Watch registration failed");
                }
            }
        }

        debug!(owner = %owner, paths = new_set.len(), "Watch set replaced");
        if !new_set.is_empty() {
            state.owners.insert(owner.to_string(), new_set);
        }
    }

    fn events(&self) -> Receiver<WatchEvent> {
        self.events.clone()
    }
}

/// A no-op watch source for tests and watch-disabled setups.
///
/// Registration is tracked but never hits the filesystem; tests can
/// inject events through [`sender`](NullWatchSource::sender).
pub struct NullWatchSource {
    registered: Mutex<HashMap<String, Vec<PathBuf>>>,
    tx: Sender<WatchEvent>,
    rx: Receiver<WatchEvent>,
}

impl Default for NullWatchSource {
    fn default() -> Self {
        Self::new()
    }
}

impl NullWatchSource {
    /// Create an inert watch source.
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        NullWatchSource {
            registered: Mutex::new(HashMap::new()),
            tx,
            rx,
        }
    }

    /// The sender side of the event channel (for injecting events).
    pub fn sender(&self) -> Sender<WatchEvent> {
        self.tx.clone()
    }

    /// The paths currently registered under an owner.
    pub fn registered(&self, owner: &str) -> Vec<PathBuf> {
        self.registered
            .lock()
            .get(owner)
            .cloned()
            .unwrap_or_default()
    }
}

impl WatchSource for NullWatchSource {
    fn replace(&self, owner: &str, paths: &[PathBuf]) {
        let mut registered = self.registered.lock();
        if paths.is_empty() {
            registered.remove(owner);
        } else {
            registered.insert(owner.to_string(), paths.to_vec());
        }
    }

    fn events(&self) -> Receiver<WatchEvent> {
        self.rx.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_source_tracks_registration() {
        let source = NullWatchSource::new();
        source.replace("root-a", &[PathBuf::from("/a"), PathBuf::from("/a/b")]);
        assert_eq!(source.registered("root-a").len(), 2);

        // Wholesale replacement drops stale paths
        source.replace("root-a", &[PathBuf::from("/a")]);
        assert_eq!(source.registered("root-a"), vec![PathBuf::from("/a")]);

        source.replace("root-a", &[]);
        assert!(source.registered("root-a").is_empty());
    }

    #[test]
    fn test_null_source_event_injection() {
        let source = NullWatchSource::new();
        let rx = source.events();
        source
            .sender()
            .send(WatchEvent {
                owner: "root-a".to_string(),
                path: PathBuf::from("/a/file"),
            })
            .unwrap();
        let event = rx.try_recv().unwrap();
        assert_eq!(event.owner, "root-a");
    }

    #[test]
    fn test_owner_resolution() {
        let state = WatchState {
            owners: HashMap::from([(
                "root-a".to_string(),
                HashSet::from([PathBuf::from("/a")]),
            )]),
        };
        // Exact match
        assert_eq!(state.owner_of(Path::new("/a")), Some("root-a".to_string()));
        // Containing directory
        assert_eq!(
            state.owner_of(Path::new("/a/new-file")),
            Some("root-a".to_string())
        );
        // Unrelated path
        assert_eq!(state.owner_of(Path::new("/b/file")), None);
    }
}
