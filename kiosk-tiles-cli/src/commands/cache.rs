//! Cache management CLI commands.

use console::style;
use kiosk_tiles::app::TileCacheApp;
use kiosk_tiles::cache::CacheStats;

use super::common::format_size;
use crate::error::CliError;

/// Show storage statistics, optionally walking the filesystem tree.
pub async fn stats(app: &TileCacheApp, scan: bool) -> Result<(), CliError> {
    let stats = if scan {
        app.scan_stats().await?
    } else {
        app.stats().await?
    };

    print_stats(&stats);
    Ok(())
}

fn print_stats(stats: &CacheStats) {
    println!("Tile cache: {}", stats.storage);
    match stats.tile_count {
        Some(count) => println!("  Tiles: {}", count),
        None => println!("  Tiles: not tracked by this backend (use --scan)"),
    }
    if let Some(bytes) = stats.size_bytes {
        println!("  Size:  {}", format_size(bytes));
    }
}

/// Remove every cached tile.
pub async fn clear(app: &TileCacheApp) -> Result<(), CliError> {
    println!("Clearing tile cache ({})", app.storage_kind());
    app.clear_all().await?;
    println!("{}", style("Tile cache cleared").green());
    Ok(())
}
