//! Watch command - keep scanning and follow filesystem changes.

use crate::app::App;
use lantern_core::{Config, EngineEvent};
use tracing::info;

/// Run the watch command.
pub fn run(config: Config) -> anyhow::Result<()> {
    if config.roots.is_empty() && config.bookmarks.files.is_empty() {
        eprintln!("No roots configured. Add [[roots]] entries to the config file.");
        return Ok(());
    }

    let app = App::new(config, true)?;

    println!("Watching for changes...");
    println!("Press Ctrl+C to stop.");
    println!();

    let events = app.engine.events();

    // Each settled batch or adopted reparse reprints the catalog size,
    // standing in for a host republishing its search index
    loop {
        match events.recv() {
            Ok(EngineEvent::IndexUpdated) => {
                info!(entries = app.engine.entry_count(), "Index updated");
                println!("Index updated: {} entries", app.engine.entry_count());
            }
            Ok(EngineEvent::BookmarksUpdated) => {
                info!(bookmarks = app.engine.bookmarks().len(), "Bookmarks updated");
                println!("Bookmarks updated: {} items", app.engine.bookmarks().len());
            }
            Err(_) => break,
        }
    }

    println!("Monitoring stopped.");
    Ok(())
}
