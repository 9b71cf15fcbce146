//! Index command - scan the configured roots and print the catalog.

use crate::app::App;
use crate::OutputFormat;
use lantern_core::{Config, PathSettings, RootConfig};
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Run the index command.
pub fn run(config: Config, extra_roots: Vec<PathBuf>, output: OutputFormat) -> anyhow::Result<()> {
    let mut config = config;
    for root in extra_roots {
        config.roots.push(RootConfig {
            path: root,
            settings: PathSettings::default(),
        });
    }

    if config.roots.is_empty() && config.bookmarks.files.is_empty() {
        eprintln!("No roots configured. Add [[roots]] entries to the config file");
        eprintln!("or pass --root <PATH>.");
    }

    let start = Instant::now();
    let app = App::new(config, false)?;
    app.wait_for_initial_index(Duration::from_secs(600))?;
    let elapsed = start.elapsed();

    let items = app.engine.index_items();

    match output {
        OutputFormat::Text => {
            for item in &items {
                println!("{}\t{}", item.key, item.item.subtext());
            }
            println!();
            println!("Indexing complete!");
            println!("  Entries:   {}", app.engine.entry_count());
            println!("  Bookmarks: {}", app.engine.bookmarks().len());
            println!("  Items:     {}", items.len());
            println!("  Time:      {:.2}s", elapsed.as_secs_f64());
        }
        OutputFormat::Json => {
            let serialized: Vec<serde_json::Value> = items
                .iter()
                .map(|item| {
                    serde_json::json!({
                        "key": item.key,
                        "id": item.item.id(),
                        "text": item.item.text(),
                        "subtext": item.item.subtext(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&serialized)?);
        }
    }

    Ok(())
}
