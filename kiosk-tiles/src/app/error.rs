//! Application error types.

use std::fmt;

use crate::cache::StoreError;
use crate::coord::CoordError;
use crate::provider::FetchError;

/// Errors that can occur during application lifecycle.
#[derive(Debug)]
pub enum AppError {
    /// Storage backend failed to open or a store-wide operation failed.
    Storage(StoreError),

    /// Network client or URL template could not be set up.
    Network(FetchError),

    /// A region could not be expanded into tiles.
    Region(CoordError),

    /// A background download task panicked or was cancelled.
    Task(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Storage(e) => write!(f, "Storage error: {}", e),
            AppError::Network(e) => write!(f, "Network setup failed: {}", e),
            AppError::Region(e) => write!(f, "Invalid region: {}", e),
            AppError::Task(msg) => write!(f, "Download task failed: {}", msg),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Storage(e) => Some(e),
            AppError::Network(e) => Some(e),
            AppError::Region(e) => Some(e),
            AppError::Task(_) => None,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::Storage(e)
    }
}

impl From<FetchError> for AppError {
    fn from(e: FetchError) -> Self {
        AppError::Network(e)
    }
}

impl From<CoordError> for AppError {
    fn from(e: CoordError) -> Self {
        AppError::Region(e)
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(e: tokio::task::JoinError) -> Self {
        AppError::Task(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_app_error_display() {
        let err = AppError::Region(CoordError::NoZoomLevels);
        assert_eq!(err.to_string(), "Invalid region: Region has no zoom levels");
    }

    #[test]
    fn test_app_error_source() {
        let err: AppError = FetchError::Client("tls".into()).into();
        assert!(err.source().is_some());
        assert!(AppError::Task("panic".into()).source().is_none());
    }
}
