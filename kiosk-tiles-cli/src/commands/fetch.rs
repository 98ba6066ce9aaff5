//! Fetch command - resolve one tile the way the map view would.

use std::fs;
use std::path::Path;

use kiosk_tiles::app::TileCacheApp;
use kiosk_tiles::coord::{tile_to_lat_lon, TileIndex};

use crate::error::CliError;

/// Resolve `tile` and optionally write its bytes to `output`.
pub async fn run(app: &TileCacheApp, tile: TileIndex, output: Option<&Path>) -> Result<(), CliError> {
    let (lat, lon) = tile_to_lat_lon(&tile);
    println!("Tile {} (northwest corner {:.5}, {:.5})", tile, lat, lon);

    let resolved = app.resolve_tile(tile).await?;
    println!(
        "  Source: {:?}, {} bytes",
        resolved.origin,
        resolved.blob.len()
    );

    if let Some(path) = output {
        write_output(path, &resolved.blob)?;
        println!("  Saved to {}", path.display());
    }
    Ok(())
}

fn write_output(path: &Path, data: &[u8]) -> Result<(), CliError> {
    fs::write(path, data).map_err(|error| CliError::FileWrite {
        path: path.display().to_string(),
        error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_output() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tile.png");

        write_output(&path, b"png").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"png");
    }

    #[test]
    fn test_write_output_reports_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("tile.png");

        let err = write_output(&path, b"png").unwrap_err();

        assert!(err.to_string().contains("tile.png"));
    }
}
