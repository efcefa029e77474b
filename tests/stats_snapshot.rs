//! Statistics model and snapshot tests
//!
//! 1. JSON snapshot save/load round trip
//! 2. TSV catalog-dump conversion, including the CLI command
//! 3. Fuzzer synthesis from a live-ish schema

use std::io::Write;

use sqlguard::cli;
use sqlguard::connection::{
    ConnectionResult, Dialect, Explainer, IndexColumnRecord, RawExplain, TableIndexCount,
};
use sqlguard::stats::{Fuzzer, IndexStats, Snapshot};

// =============================================================================
// JSON SNAPSHOT
// =============================================================================

fn sample_stats() -> IndexStats {
    let mut s = IndexStats::new();
    s.set_table_count("users", 100_000);
    s.add_index_column("users", "PRIMARY", "id", Some(100_000), true);
    s.add_index_column("users", "idx_org", "organization_id", Some(500), false);
    s.set_column_size("users", "id", 8);
    s.set_column_size("users", "email", 40);
    s.set_table_count("empty_table", 0);
    s.resolve();
    s
}

/// Saving and reloading preserves counts, key estimates and widths.
#[test]
fn test_json_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stats.json");

    let original = sample_stats();
    Snapshot::save_json(&original, &path).unwrap();
    let loaded = Snapshot::load_json(&path).unwrap();

    assert_eq!(loaded.table_count("users"), Some(100_000));
    assert_eq!(loaded.table_count("empty_table"), Some(0));
    assert_eq!(
        loaded.estimate_key("users", "idx_org", &["organization_id".to_string()]),
        original.estimate_key("users", "idx_org", &["organization_id".to_string()])
    );
    assert_eq!(loaded.column_size("users", "email"), Some(40));
    assert_eq!(loaded.row_size("users"), Some(48));
}

/// A missing snapshot is an error naming the path.
#[test]
fn test_missing_snapshot_errors_with_path() {
    let err = Snapshot::load_json(std::path::Path::new("/nonexistent/stats.json")).unwrap_err();
    assert!(err.to_string().contains("/nonexistent/stats.json"));
}

/// Malformed JSON is a typed parse failure, not a panic.
#[test]
fn test_malformed_snapshot_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ not json").unwrap();
    assert!(Snapshot::load_json(&path).is_err());
}

// =============================================================================
// TSV CONVERSION
// =============================================================================

const TSV: &str = "\
table_name\tindex_name\tcolumn_name\tcardinality\tnon_unique
users\tPRIMARY\tid\t50000\t0
users\tidx_org\torganization_id\t250\t1
posts\tPRIMARY\tid\t9000\t0
";

/// The raw `mysql --batch` dump loads into the same model shape.
#[test]
fn test_tsv_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dump.tsv");
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(TSV.as_bytes()).unwrap();

    let stats = Snapshot::load_tsv(&path).unwrap();
    // no explicit row count: unique key cardinality stands in
    assert_eq!(stats.table_count("users"), Some(50_000));
    assert_eq!(stats.table_count("posts"), Some(9_000));
    // 50k rows over 250 organizations
    assert_eq!(
        stats.estimate_key("users", "idx_org", &["organization_id".to_string()]),
        Some(200)
    );
}

/// `convert-stats` writes a JSON snapshot that loads back identically.
#[test]
fn test_convert_stats_command() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("dump.tsv");
    let output = dir.path().join("stats.json");
    std::fs::write(&input, TSV).unwrap();

    cli::convert_stats(&input, &output).unwrap();

    let loaded = Snapshot::load_json(&output).unwrap();
    assert_eq!(loaded.table_count("users"), Some(50_000));
    assert_eq!(
        loaded.estimate_key("users", "PRIMARY", &["id".to_string()]),
        Some(1)
    );
}

// =============================================================================
// FUZZER
// =============================================================================

/// Reports a schema of three tables where `busy` carries far more
/// indexes than the rest.
struct SchemaOnlyExplainer;

impl Explainer for SchemaOnlyExplainer {
    fn dialect(&self) -> Dialect {
        Dialect::Mysql
    }

    fn explain(&mut self, _sql: &str) -> ConnectionResult<RawExplain> {
        unreachable!("the fuzzer never explains")
    }

    fn fetch_indexes(&mut self) -> ConnectionResult<Vec<IndexColumnRecord>> {
        let rec = |table: &str, index: &str, column: &str, unique: bool| IndexColumnRecord {
            table_name: table.to_string(),
            index_name: index.to_string(),
            column_name: column.to_string(),
            cardinality: 0,
            unique,
        };
        Ok(vec![
            rec("quiet", "PRIMARY", "id", true),
            rec("modest", "PRIMARY", "id", true),
            rec("modest", "idx_a", "a", false),
            rec("busy", "PRIMARY", "id", true),
            rec("busy", "idx_a", "a", false),
            rec("busy", "idx_b", "b", false),
            rec("busy", "idx_c", "c", false),
        ])
    }

    fn count_indexes_by_table(&mut self) -> ConnectionResult<Vec<TableIndexCount>> {
        // ascending, as the catalog query orders it
        let count = |table: &str, n: u64| TableIndexCount {
            table_name: table.to_string(),
            index_count: n,
        };
        Ok(vec![count("quiet", 1), count("modest", 2), count("busy", 4)])
    }
}

/// Index-heavy tables are guessed big, the rest small; every guess is
/// marked low-confidence by the stats layering.
#[test]
fn test_fuzzer_sizes_tables_by_index_count() {
    let mut conn = SchemaOnlyExplainer;
    let fuzzed = Fuzzer::fuzz(&mut conn).unwrap();

    assert_eq!(fuzzed.table_count("busy"), Some(5_000));
    assert_eq!(fuzzed.table_count("quiet"), Some(100));
    assert_eq!(fuzzed.table_count("modest"), Some(100));

    // unique keys pretend perfect selectivity, others a token fan-out
    assert_eq!(
        fuzzed.estimate_key("busy", "PRIMARY", &["id".to_string()]),
        Some(1)
    );
    assert_eq!(
        fuzzed.estimate_key("busy", "idx_a", &["a".to_string()]),
        Some(2)
    );
}
