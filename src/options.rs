//! Analysis configuration
//!
//! A small JSON file, all fields optional. Missing file or missing
//! fields fall back to defaults so the analyzer runs unconfigured.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("cannot read options file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed options file {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Runtime knobs for the analyzer
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Options {
    /// Query origins to skip: `"path"` or `"path#method"` entries
    /// matched against backtrace lines
    #[serde(default)]
    pub ignore: Vec<String>,

    /// External normalizer command line (e.g. `pt-fingerprint`)
    #[serde(default)]
    pub fingerprinter: Option<String>,

    /// Statistics snapshot to load
    #[serde(default)]
    pub stats_path: Option<PathBuf>,

    /// Log recoverable per-query failures, not just batch failures
    #[serde(default)]
    pub verbose: bool,
}

impl Options {
    pub fn load(path: &Path) -> Result<Options, OptionsError> {
        let text = fs::read_to_string(path).map_err(|source| OptionsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| OptionsError::Malformed {
            path: path.to_path_buf(),
            source,
        })
    }

    /// True when any backtrace line matches an ignore entry. An entry
    /// is a path, optionally followed by `#method`; both parts match
    /// by containment.
    pub fn ignored(&self, backtrace: &[String]) -> bool {
        self.ignore.iter().any(|entry| {
            let (path, method) = match entry.split_once('#') {
                Some((p, m)) => (p, Some(m)),
                None => (entry.as_str(), None),
            };
            backtrace.iter().any(|line| {
                line.contains(path) && method.map_or(true, |m| line.contains(m))
            })
        })
    }
}
