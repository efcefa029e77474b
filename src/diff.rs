//! Unified-diff mapping for review comments
//!
//! Consumes `git diff --unified=0` output. Two line shapes matter: the
//! destination file header (`+++ b/<path>`) and the hunk header
//! (`@@ -a,b +c,d @@`). Deletions never introduce a slow query, so only
//! inserted line ranges are tracked.
//!
//! `find_position` speaks GitHub's review-comment arithmetic: a
//! position is the number of lines down from the file's first hunk
//! header, counting hunk headers and insertions but not deletions.

use std::io::BufRead;
use std::ops::RangeInclusive;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiffError {
    #[error("cannot read diff: {0}")]
    Io(#[from] std::io::Error),

    #[error("expected a hunk header after the header for {path}, got '{line}'")]
    MissingHunkHeader { path: String, line: String },
}

/// Outcome of a position lookup; a miss is an answer, not an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Position {
    /// Lines down from the file's first hunk header
    Found(usize),
    FileNotFound,
    LineNotFound,
}

fn file_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\+\+\+ b/(.*)$").unwrap())
}

fn hunk_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^@@ -\d+(?:,\d+)? \+(\d+)(?:,(\d+))? @@").unwrap())
}

// `@@ -177,0 +178,5 @@` spans destination lines 178 through 183;
// a missing count is a zero-length tail on the start line
fn destination_range(line: &str) -> Option<RangeInclusive<u64>> {
    let captures = hunk_re().captures(line)?;
    let start: u64 = captures.get(1)?.as_str().parse().ok()?;
    let count: u64 = captures
        .get(2)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0);
    Some(start..=start + count)
}

/// Maps analyzer findings onto diff coordinates
pub struct DiffMapper {
    lines: Vec<String>,
}

impl DiffMapper {
    pub fn new(input: impl BufRead) -> Result<DiffMapper, DiffError> {
        let lines = input.lines().collect::<Result<Vec<_>, _>>()?;
        Ok(DiffMapper { lines })
    }

    /// Every inserted destination line range, in diff order
    pub fn updated_lines(&self) -> Vec<(String, RangeInclusive<u64>)> {
        let mut path: Option<&str> = None;
        let mut found = Vec::new();
        for line in &self.lines {
            if let Some(captures) = file_re().captures(line) {
                path = captures.get(1).map(|m| m.as_str());
                continue;
            }
            if let (Some(path), Some(range)) = (path, destination_range(line)) {
                found.push((path.to_string(), range));
            }
        }
        found
    }

    /// GitHub review position of `line_number` in the destination
    /// version of `path`
    pub fn find_position(&self, path: &str, line_number: u64) -> Result<Position, DiffError> {
        let header = format!("+++ b/{}", path);
        let Some(start) = self.lines.iter().position(|l| *l == header) else {
            return Ok(Position::FileNotFound);
        };

        let rest = &self.lines[start + 1..];
        match rest.first() {
            Some(line) if hunk_re().is_match(line) => {}
            other => {
                return Err(DiffError::MissingHunkHeader {
                    path: path.to_string(),
                    line: other.cloned().unwrap_or_default(),
                })
            }
        }

        for (offset, line) in rest.iter().enumerate() {
            let pos = offset + 1;
            if file_re().is_match(line) {
                return Ok(Position::LineNotFound);
            }
            let Some(range) = destination_range(line) else {
                continue;
            };
            if !range.contains(&line_number) {
                continue;
            }
            let nth = (line_number - range.start()) as usize;
            if let Some(idx) = Self::hunk_offset(&rest[pos..], nth) {
                return Ok(Position::Found(pos + idx));
            }
            return Ok(Position::LineNotFound);
        }
        Ok(Position::LineNotFound)
    }

    // index (0-based, relative to the line after the hunk header) of
    // the nth line that survives into the destination file
    fn hunk_offset(hunk: &[String], nth: usize) -> Option<usize> {
        hunk.iter()
            .enumerate()
            .filter(|(_, line)| !line.starts_with('-'))
            .map(|(idx, _)| idx)
            .nth(nth)
    }
}
