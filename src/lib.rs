//! sqlguard - static cost analysis for captured SQL query traffic
//!
//! Queries are read from a log stream, deduplicated by structural
//! fingerprint, explained against the database's planner, scored by a
//! rule pipeline, and correlated with a code change via a unified diff.

pub mod analyzer;
pub mod cli;
pub mod connection;
pub mod diff;
pub mod explain;
pub mod fingerprint;
pub mod observability;
pub mod options;
pub mod parsers;
pub mod query;
pub mod review;
pub mod stats;
