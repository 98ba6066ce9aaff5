//! Kiosk Tiles CLI - Command-line interface
//!
//! Front end for the offline tile cache: bulk downloads with progress,
//! status and statistics, clearing, and single-tile resolution.

mod commands;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use kiosk_tiles::app::TileCacheApp;
use kiosk_tiles::coord::TileIndex;
use kiosk_tiles::logging::{default_log_dir, default_log_file, init_logging};
use kiosk_tiles::orchestrator::RegionKind;
use tracing::info;

use commands::common::{build_config, BackendArg};
use error::CliError;

#[derive(Parser)]
#[command(name = "kiosk-tiles")]
#[command(version, about = "Offline map-tile cache for kiosk map views", long_about = None)]
struct Cli {
    /// Storage backend
    #[arg(long, value_enum, default_value = "fs", global = true)]
    backend: BackendArg,

    /// Cache directory (defaults to the platform data directory)
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download a canonical region (primary, metro or global)
    Download {
        region: RegionKind,

        /// Start even if the region already looks complete
        #[arg(long)]
        force: bool,
    },

    /// Show storage statistics and per-region completion
    Status {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show storage statistics
    Stats {
        /// Walk the tile tree to count files (filesystem backend)
        #[arg(long)]
        scan: bool,
    },

    /// Remove every cached tile
    Clear,

    /// Resolve a single tile through memory, storage and network
    Fetch {
        z: u8,
        x: u32,
        y: u32,

        /// Write the tile image to this file
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        e.exit();
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let log_dir = cli
        .cache_dir
        .as_ref()
        .map(|dir| dir.join("logs"))
        .unwrap_or_else(default_log_dir);
    let config = build_config(cli.backend, cli.cache_dir);
    let _logging =
        init_logging(&log_dir, default_log_file()).map_err(|e| CliError::LoggingInit(e.to_string()))?;

    info!(version = env!("CARGO_PKG_VERSION"), "kiosk-tiles starting");

    let app = TileCacheApp::start(config).await.map_err(CliError::Startup)?;

    let result = match cli.command {
        Commands::Download { region, force } => commands::download::run(&app, region, force).await,
        Commands::Status { json } => commands::status::run(&app, json).await,
        Commands::Stats { scan } => commands::cache::stats(&app, scan).await,
        Commands::Clear => commands::cache::clear(&app).await,
        Commands::Fetch { z, x, y, output } => {
            commands::fetch::run(&app, TileIndex::new(z, x, y), output.as_deref()).await
        }
    };

    app.shutdown().await;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_download_with_global_flags() {
        let cli = Cli::try_parse_from([
            "kiosk-tiles",
            "download",
            "metro",
            "--backend",
            "kv",
            "--cache-dir",
            "/srv/kiosk",
        ])
        .unwrap();

        assert_eq!(cli.backend, BackendArg::Kv);
        assert_eq!(cli.cache_dir, Some(PathBuf::from("/srv/kiosk")));
        assert!(matches!(
            cli.command,
            Commands::Download {
                region: RegionKind::Metro,
                force: false
            }
        ));
    }

    #[test]
    fn test_parse_rejects_unknown_region() {
        assert!(Cli::try_parse_from(["kiosk-tiles", "download", "moon"]).is_err());
    }

    #[test]
    fn test_parse_fetch() {
        let cli = Cli::try_parse_from(["kiosk-tiles", "fetch", "12", "1050", "1522"]).unwrap();
        assert_eq!(cli.backend, BackendArg::Fs);
        assert!(matches!(
            cli.command,
            Commands::Fetch {
                z: 12,
                x: 1050,
                y: 1522,
                output: None
            }
        ));
    }
}
