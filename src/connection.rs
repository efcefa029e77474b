//! Dialect capability interface
//!
//! The engine never opens a database connection itself; callers hand it
//! something that can run EXPLAIN and read catalog statistics. The
//! dialect is decided once when the connection is built and carried as
//! a value from then on.

use thiserror::Error;

/// Result type for connection operations
pub type ConnectionResult<T> = Result<T, ConnectionError>;

/// Which planner dialect a connection speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// `EXPLAIN FORMAT=JSON` plus `SHOW WARNINGS` for the rewritten SQL
    Mysql,
    /// `EXPLAIN (FORMAT JSON)`
    Postgres,
}

impl Dialect {
    /// True for the MySQL dialect
    pub fn is_mysql(&self) -> bool {
        matches!(self, Dialect::Mysql)
    }
}

/// One EXPLAIN round trip
#[derive(Debug, Clone)]
pub struct RawExplain {
    /// The dialect-specific plan tree
    pub plan: serde_json::Value,
    /// MySQL only: the normalized statement from `SHOW WARNINGS`,
    /// carrying the fully-qualified select list
    pub normalized_sql: Option<String>,
}

/// One row of index statistics from the engine's catalog
/// (MySQL `information_schema.statistics`, or the Postgres
/// `pg_class`/`pg_index`/`pg_stats` join)
#[derive(Debug, Clone)]
pub struct IndexColumnRecord {
    pub table_name: String,
    pub index_name: String,
    pub column_name: String,
    pub cardinality: u64,
    pub unique: bool,
}

/// Number of indexes defined on one table
#[derive(Debug, Clone)]
pub struct TableIndexCount {
    pub table_name: String,
    pub index_count: u64,
}

/// Driver-level failure, reported as free text by the server
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ConnectionError {
    /// The server's error text
    pub message: String,
}

impl ConnectionError {
    /// Wrap a driver error message
    pub fn new(message: impl Into<String>) -> Self {
        ConnectionError {
            message: message.into(),
        }
    }

    /// True when a forced key was refused because MySQL will not honor
    /// it ("Key ... doesn't exist in table ..."). MySQL can list
    /// possible keys it refuses to apply; this is not fatal.
    pub fn is_missing_key(&self) -> bool {
        self.message.contains("doesn't exist in table")
            || (self.message.starts_with("Key") && self.message.contains("doesn't exist"))
    }
}

/// A connection able to run EXPLAIN and read schema statistics
pub trait Explainer {
    /// The planner dialect this connection speaks
    fn dialect(&self) -> Dialect;

    /// Run EXPLAIN for one statement
    fn explain(&mut self, sql: &str) -> ConnectionResult<RawExplain>;

    /// All index columns with cardinality, one record per key part
    fn fetch_indexes(&mut self) -> ConnectionResult<Vec<IndexColumnRecord>>;

    /// Index counts per table, ascending, for table-size guessing
    fn count_indexes_by_table(&mut self) -> ConnectionResult<Vec<TableIndexCount>>;
}
