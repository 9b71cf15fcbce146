//! Status command - show configured roots and index statistics.

use lantern_core::{CacheStore, Config};

/// Run the status command.
///
/// Reads the configuration and the cache document only; no scan is
/// started.
pub fn run(config: Config) -> anyhow::Result<()> {
    let cache = CacheStore::new(config.cache_dir()?);
    let document = cache.load_or_default();

    println!("Lantern Index Status");
    println!("====================");
    println!();

    if config.roots.is_empty() {
        println!("No roots configured. Add [[roots]] entries to the config file.");
    } else {
        println!("Configured roots:");
        for root in &config.roots {
            println!(
                "  {} (max depth {}, every {}s{})",
                root.path.display(),
                root.settings.max_depth,
                root.settings.scan_interval_secs,
                if root.settings.watch_filesystem {
                    ", watched"
                } else {
                    ""
                }
            );
        }
    }

    println!();
    if document.roots.is_empty() {
        println!("No cached index. Run 'lantern index' to build one.");
    } else {
        println!("Cached roots:");
        for root in &document.roots {
            let last_scan = document
                .record_for(root)
                .and_then(|r| r.last_scan)
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "never".to_string());
            println!("  {} (last scan: {})", root, last_scan);
        }
    }

    println!();
    if document.bookmark_files.is_empty() {
        println!("Bookmark sources: auto-discovered");
    } else {
        println!("Bookmark sources:");
        for file in &document.bookmark_files {
            println!("  {}", file);
        }
    }
    println!(
        "Hostname indexing: {}",
        if document.index_hostname { "on" } else { "off" }
    );

    println!();
    println!("Cache file: {}", cache.cache_path().display());

    Ok(())
}
