//! Observability for sqlguard
//!
//! Structured JSON logging only. Analysis records go to the report
//! stream; diagnostics never mix with them.

mod logger;

pub use logger::{Logger, Severity};
