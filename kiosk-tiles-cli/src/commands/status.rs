//! Status command - storage statistics and per-region completion.

use console::style;
use kiosk_tiles::app::{CacheReport, TileCacheApp};

use super::common::format_size;
use crate::error::CliError;

/// Run the status command.
pub async fn run(app: &TileCacheApp, json: bool) -> Result<(), CliError> {
    let report = app.report().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &CacheReport) {
    println!("{}", style("Storage").bold().underlined());
    println!("  Backend: {}", report.storage.storage);
    match report.storage.tile_count {
        Some(count) => println!("  Tiles:   {}", count),
        None => println!("  Tiles:   {} (run `stats --scan`)", style("unknown").dim()),
    }
    if let Some(bytes) = report.storage.size_bytes {
        println!("  Size:    {}", format_size(bytes));
    }
    println!();

    println!("{}", style("Regions").bold().underlined());
    for entry in &report.regions {
        let estimate = &entry.estimate;
        let marker = if estimate.is_complete {
            style("✓").green()
        } else {
            style("✗").yellow()
        };
        println!(
            "  {} {:<8} {:>5.1}%  ({} tiles, {} sampled)",
            marker,
            entry.region.name(),
            estimate.percent_cached,
            estimate.total_tiles,
            estimate.sample_size
        );
    }
}
