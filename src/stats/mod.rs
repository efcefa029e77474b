//! Index and table statistics
//!
//! The selectivity model behind cost estimation: per-table row counts
//! and per-index-column cardinality, built from a live catalog query,
//! a serialized snapshot, or synthesized by the fuzzer when the
//! database is too empty to say anything useful.

mod errors;
mod fuzzer;
mod model;
mod snapshot;

pub use errors::{StatsError, StatsResult};
pub use fuzzer::Fuzzer;
pub use model::{Column, Index, IndexStats, Table, TableStats};
pub use snapshot::Snapshot;
