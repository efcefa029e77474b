//! One captured SQL statement
//!
//! Queries arrive as raw log lines, optionally carrying a trailing
//! `/*sqlguard[...]*/` marker comment with the JSON-encoded application
//! backtrace of the call site. Everything here is light pattern
//! extraction; real plan analysis happens against the database's own
//! planner.

use std::cell::OnceCell;
use std::sync::OnceLock;

use regex::Regex;

use crate::fingerprint::Fingerprinter;

const MARKER: &str = "/*sqlguard";

fn limit_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\blimit\s+(\d+)").unwrap())
}

fn aggregate_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)select\s+(min|max|avg|count|sum|group_concat)\(").unwrap())
}

fn from_table_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?i)\bfrom\s+[`"]?([a-zA-Z0-9_]+)[`"]?"#).unwrap())
}

/// A single statement with its capture metadata
#[derive(Debug)]
pub struct Query {
    sql: String,
    backtrace: Vec<String>,
    index: usize,
    fingerprint: OnceCell<Option<String>>,
}

impl Query {
    /// Split the marker comment off the raw line. `index` is the
    /// statement's position in the capture, assigned by the caller.
    pub fn new(raw: &str, index: usize) -> Self {
        let (sql, backtrace) = match raw.find(MARKER) {
            Some(at) => {
                let trailer = raw[at + MARKER.len()..].trim_end();
                let trailer = trailer.strip_suffix("*/").unwrap_or(trailer);
                let backtrace = serde_json::from_str(trailer).unwrap_or_default();
                (raw[..at].trim_end().to_string(), backtrace)
            }
            None => (raw.trim_end().to_string(), Vec::new()),
        };
        Query {
            sql,
            backtrace,
            index,
            fingerprint: OnceCell::new(),
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Application frames from the marker comment, innermost first
    pub fn backtrace(&self) -> &[String] {
        &self.backtrace
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Normalized form from the external fingerprinter, computed once.
    /// None when the fingerprinter could not answer.
    pub fn fingerprint(&self, fingerprinter: &Fingerprinter) -> Option<&str> {
        self.fingerprint
            .get_or_init(|| fingerprinter.fingerprint(&self.sql))
            .as_deref()
    }

    /// Stable display key: md5 of the fingerprint, falling back to md5
    /// of the raw SQL when no fingerprint is available
    pub fn md5(&self, fingerprinter: &Fingerprinter) -> String {
        let subject = self.fingerprint(fingerprinter).unwrap_or(&self.sql);
        format!("{:x}", md5::compute(subject))
    }

    /// LIMIT value, when the statement carries one
    pub fn limit(&self) -> Option<u64> {
        limit_re()
            .captures(&self.sql)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }

    /// True for a bare aggregate select list (returns one row)
    pub fn aggregate(&self) -> bool {
        aggregate_re().is_match(&self.sql)
    }

    /// First table named in the FROM clause
    pub fn from_table(&self) -> Option<&str> {
        from_table_re()
            .captures(&self.sql)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_trailer_is_split_off() {
        let q = Query::new(
            "select * from users /*sqlguard[\"app/models/user.rb:10\",\"app/x.rb:2\"]*/",
            0,
        );
        assert_eq!(q.sql(), "select * from users");
        assert_eq!(
            q.backtrace(),
            &["app/models/user.rb:10".to_string(), "app/x.rb:2".to_string()]
        );
    }

    #[test]
    fn test_no_marker_means_empty_backtrace() {
        let q = Query::new("select 1", 3);
        assert_eq!(q.sql(), "select 1");
        assert!(q.backtrace().is_empty());
        assert_eq!(q.index(), 3);
    }

    #[test]
    fn test_garbage_marker_payload_is_tolerated() {
        let q = Query::new("select 1 /*sqlguard{oops*/", 0);
        assert!(q.backtrace().is_empty());
    }

    #[test]
    fn test_limit_extraction() {
        assert_eq!(Query::new("select * from t limit 10", 0).limit(), Some(10));
        assert_eq!(Query::new("select * from t LIMIT 3 offset 2", 0).limit(), Some(3));
        assert_eq!(Query::new("select * from t", 0).limit(), None);
    }

    #[test]
    fn test_aggregate_detection() {
        assert!(Query::new("select count(*) from t", 0).aggregate());
        assert!(Query::new("SELECT MAX(id) from t", 0).aggregate());
        assert!(!Query::new("select counter from t", 0).aggregate());
    }

    #[test]
    fn test_from_table() {
        assert_eq!(Query::new("select * from `users` where id=1", 0).from_table(), Some("users"));
        assert_eq!(Query::new("select * from posts p", 0).from_table(), Some("posts"));
        assert_eq!(Query::new("select 1", 0).from_table(), None);
    }
}
