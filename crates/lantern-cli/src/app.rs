//! Application state management.

use lantern_core::{
    Config, Engine, EngineConfig, EngineEvent, NotifyWatcher, NullWatchSource, WatchSource,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// Shared application state.
pub struct App {
    /// Configuration
    pub config: Config,

    /// The assembled indexing engine
    pub engine: Engine,
}

impl App {
    /// Create a new application instance.
    ///
    /// With `watch` enabled the engine gets live filesystem watchers;
    /// otherwise inert sources are wired in and scans only run on
    /// demand or by interval.
    pub fn new(config: Config, watch: bool) -> anyhow::Result<Self> {
        let engine_config = EngineConfig::from_config(&config)?;

        let (file_watch, bookmark_watch): (Arc<dyn WatchSource>, Arc<dyn WatchSource>) = if watch {
            (
                Arc::new(NotifyWatcher::new()?),
                Arc::new(NotifyWatcher::new()?),
            )
        } else {
            (
                Arc::new(NullWatchSource::new()),
                Arc::new(NullWatchSource::new()),
            )
        };

        let engine = Engine::new(engine_config, file_watch, bookmark_watch)?;

        info!(
            roots = engine.fs_index().len(),
            watching = watch,
            "Application initialized"
        );

        Ok(App { config, engine })
    }

    /// Block until the first scan batch and bookmark parse have settled.
    pub fn wait_for_initial_index(&self, timeout: Duration) -> anyhow::Result<()> {
        let events = self.engine.events();
        let deadline = Instant::now() + timeout;

        let mut index_done = self.engine.fs_index().is_empty();
        let mut bookmarks_done = self.engine.bookmarks().paths().is_empty();

        while !(index_done && bookmarks_done) {
            let now = Instant::now();
            if now >= deadline {
                anyhow::bail!("timed out waiting for the initial index");
            }
            match events.recv_timeout(deadline - now) {
                Ok(EngineEvent::IndexUpdated) => index_done = true,
                Ok(EngineEvent::BookmarksUpdated) => bookmarks_done = true,
                Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                    anyhow::bail!("timed out waiting for the initial index")
                }
                Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
            }
        }

        Ok(())
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.engine.shutdown();
    }
}
