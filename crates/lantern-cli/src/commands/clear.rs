//! Clear command - delete the cached index configuration.

use lantern_core::{CacheStore, Config};
use std::io::{self, Write};

/// Run the clear command.
pub fn run(config: Config, skip_confirm: bool) -> anyhow::Result<()> {
    let cache = CacheStore::new(config.cache_dir()?);

    if !cache.exists() {
        println!("No cache found. Nothing to clear.");
        return Ok(());
    }

    if !skip_confirm {
        print!("This will delete the cached index configuration. Are you sure? [y/N] ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Cancelled.");
            return Ok(());
        }
    }

    cache.clear()?;
    println!("Cache cleared.");

    Ok(())
}
