//! Bookmarks command - parse or discover browser bookmarks.

use lantern_core::bookmarks::{discover_sources, parse_bookmark_files};
use lantern_core::Config;
use std::sync::atomic::AtomicBool;

/// Run the bookmarks command.
pub fn run(config: Config, discover_only: bool) -> anyhow::Result<()> {
    let sources = if config.bookmarks.files.is_empty() {
        discover_sources()
    } else {
        config.bookmarks.files.clone()
    };

    if discover_only {
        if sources.is_empty() {
            println!("No bookmark sources found.");
        } else {
            for source in &sources {
                println!("{}", source.display());
            }
        }
        return Ok(());
    }

    if sources.is_empty() {
        println!("No bookmark sources found. Nothing to parse.");
        return Ok(());
    }

    let abort = AtomicBool::new(false);
    let items = parse_bookmark_files(&sources, &abort);

    for item in &items {
        println!("{}\t{}", item.name, item.url);
    }
    println!();
    println!("{} bookmarks from {} source(s).", items.len(), sources.len());

    Ok(())
}
