//! Small hand-rolled scanners for planner-emitted strings
//!
//! Two grammars share one character scanner:
//! - Postgres `Index Cond` / `Hash Cond` expressions, parsed into the set
//!   of columns they reference (grouped by table for join conditions)
//! - MySQL `SHOW WARNINGS` normalized SQL, parsed into the selected
//!   `table`.`column` projections

mod errors;
mod mysql_fields;
mod postgres_conditions;
mod scanner;

pub use errors::{ParseError, ParseResult};
pub use mysql_fields::MysqlSelectFields;
pub use postgres_conditions::PostgresConditions;
pub use scanner::StatScanner;
