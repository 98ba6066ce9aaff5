//! Download command - bulk-fetch a canonical region with a progress bar.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use kiosk_tiles::app::{DownloadHandle, TileCacheApp};
use kiosk_tiles::orchestrator::{DownloadEvent, DownloadStats, RegionKind};

use crate::error::CliError;

const BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}";

/// Run the download command.
///
/// Without `force` the region is skipped when it already looks complete.
pub async fn run(app: &TileCacheApp, region: RegionKind, force: bool) -> Result<(), CliError> {
    let handle = if force {
        Some(app.start_download(region)?)
    } else {
        app.ensure_region(region).await?
    };

    let Some(handle) = handle else {
        let estimate = app.completion(region).await?;
        println!(
            "{} region is already cached ({:.1}% of sampled tiles). Use --force to re-check every tile.",
            style(region).cyan(),
            estimate.percent_cached
        );
        return Ok(());
    };

    println!(
        "Downloading {} region: {} tiles",
        style(region).cyan(),
        handle.total()
    );

    let stats = follow(handle).await?;
    print_summary(&stats);
    Ok(())
}

/// Drive a progress bar from the job's event stream until it ends.
async fn follow(mut handle: DownloadHandle) -> Result<DownloadStats, CliError> {
    let pb = ProgressBar::new(handle.total() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );

    while let Some(event) = handle.next_event().await {
        match event {
            DownloadEvent::Progress {
                completed, counts, ..
            } => {
                pb.set_position(completed as u64);
                pb.set_message(format!(
                    "{} cached, {} new, {} failed",
                    counts.cached, counts.downloaded, counts.failed
                ));
            }
            DownloadEvent::Completed(_) => pb.finish_and_clear(),
        }
    }

    Ok(handle.wait().await?)
}

fn print_summary(stats: &DownloadStats) {
    let status = if stats.is_complete() {
        style("complete").green().bold()
    } else {
        style("incomplete").yellow().bold()
    };

    println!();
    println!("Region {}: {}", stats.region, status);
    println!("  Total:      {}", stats.total);
    println!("  Cached:     {}", stats.cached());
    println!("  Downloaded: {}", stats.downloaded());
    println!("  Failed:     {}", stats.failed());
    println!("  Elapsed:    {:.1}s", stats.elapsed.as_secs_f64());

    if stats.failed() > 0 {
        println!();
        println!(
            "{} Failed tiles are retried on the next download.",
            style("Note:").yellow()
        );
    }
}
