//! Query normalization and dedup
//!
//! Fingerprinting shells out to an external normalizer (pt-fingerprint
//! or compatible): one long-lived subprocess, one line of SQL in, one
//! normalized line out. The subprocess and the dedup cache live behind
//! a single mutex; one in-flight query at a time is the protocol, the
//! tool has no request framing.
//!
//! A normalizer that hangs or dies is a soft failure. The read side
//! runs on its own thread feeding a channel, so a stuck read costs a
//! bounded timeout, not a hung analyzer.

use std::collections::HashSet;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use thiserror::Error;

use crate::observability::Logger;

const READ_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum FingerprintError {
    #[error("cannot start fingerprinter `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("fingerprinter `{command}` has no stdio pipes")]
    NoPipes { command: String },
}

#[derive(Debug)]
struct Normalizer {
    child: Child,
    stdin: ChildStdin,
    rx: Receiver<String>,
}

#[derive(Debug)]
struct Inner {
    normalizer: Option<Normalizer>,
    seen: HashSet<String>,
}

/// Owns the normalizer subprocess and the seen-fingerprint cache
#[derive(Debug)]
pub struct Fingerprinter {
    inner: Mutex<Inner>,
}

impl Fingerprinter {
    /// Spawn the normalizer. `command` is a whitespace-split command
    /// line, e.g. `"pt-fingerprint"`.
    pub fn spawn(command: &str) -> Result<Fingerprinter, FingerprintError> {
        let mut parts = command.split_whitespace();
        let program = parts.next().ok_or_else(|| FingerprintError::Spawn {
            command: command.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command"),
        })?;

        let mut child = Command::new(program)
            .args(parts)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| FingerprintError::Spawn {
                command: command.to_string(),
                source,
            })?;

        let (stdin, stdout) = match (child.stdin.take(), child.stdout.take()) {
            (Some(i), Some(o)) => (i, o),
            _ => {
                let _ = child.kill();
                return Err(FingerprintError::NoPipes {
                    command: command.to_string(),
                });
            }
        };

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let reader = BufReader::new(stdout);
            for line in reader.lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });

        Ok(Fingerprinter {
            inner: Mutex::new(Inner {
                normalizer: Some(Normalizer { child, stdin, rx }),
                seen: HashSet::new(),
            }),
        })
    }

    /// A fingerprinter with no subprocess: every query fingerprints to
    /// None and dedup falls back to raw SQL
    pub fn disabled() -> Fingerprinter {
        Fingerprinter {
            inner: Mutex::new(Inner {
                normalizer: None,
                seen: HashSet::new(),
            }),
        }
    }

    /// Normalized form of one statement, or None on any failure
    pub fn fingerprint(&self, sql: &str) -> Option<String> {
        let mut inner = self.lock();
        let normalizer = inner.normalizer.as_mut()?;

        // the protocol is line-oriented; embedded newlines would be
        // read as separate queries
        let flat = sql.replace(['\n', '\r'], " ");
        if let Err(e) = writeln!(normalizer.stdin, "{}", flat) {
            Logger::warn("fingerprint_write_failed", &[("error", &e.to_string())]);
            return None;
        }
        if let Err(e) = normalizer.stdin.flush() {
            Logger::warn("fingerprint_write_failed", &[("error", &e.to_string())]);
            return None;
        }

        match normalizer.rx.recv_timeout(READ_TIMEOUT) {
            Ok(line) => Some(line.trim().to_string()),
            Err(_) => {
                Logger::warn("fingerprint_timeout", &[("sql", sql)]);
                None
            }
        }
    }

    /// Insert-and-test: true when this key was already recorded
    pub fn seen_before(&self, key: &str) -> bool {
        !self.lock().seen.insert(key.to_string())
    }

    pub fn clear_seen(&self) {
        self.lock().seen.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // a panic mid-call leaves no partial state worth rejecting
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for Fingerprinter {
    fn drop(&mut self) {
        let inner = match self.inner.get_mut() {
            Ok(inner) => inner,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(normalizer) = inner.normalizer.as_mut() {
            let _ = normalizer.child.kill();
            let _ = normalizer.child.wait();
        }
    }
}
