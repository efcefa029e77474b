//! Statistics error types
//!
//! Missing statistics are never errors (they surface as `None` and the
//! cost engine assumes the worst case). Errors here are only about
//! loading or saving snapshot files.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for statistics operations
pub type StatsResult<T> = Result<T, StatsError>;

/// Snapshot load/store failures
#[derive(Debug, Error)]
pub enum StatsError {
    /// Snapshot file could not be read or written
    #[error("stats io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Structured snapshot was not valid JSON
    #[error("malformed stats snapshot at {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Tab-separated catalog dump did not carry the expected columns
    #[error("unrecognized catalog dump format at {path}: {reason}")]
    BadCatalogDump { path: PathBuf, reason: String },
}

impl StatsError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        StatsError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn malformed(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        StatsError::Malformed {
            path: path.into(),
            source,
        }
    }

    pub fn bad_catalog_dump(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        StatsError::BadCatalogDump {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
