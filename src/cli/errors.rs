//! CLI-specific error types

use std::path::PathBuf;

use thiserror::Error;

use crate::diff::DiffError;
use crate::stats::StatsError;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("cannot open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Stats(#[from] StatsError),

    #[error(transparent)]
    Diff(#[from] DiffError),

    /// The check found findings attributable to the diff; carried as an
    /// error so the process exits nonzero for CI
    #[error("{count} potential problem(s) found")]
    ProblemsFound { count: usize },
}

impl CliError {
    pub fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        CliError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
