//! Fingerprinter subprocess tests
//!
//! Uses `cat` as the external normalizer: it speaks the same
//! line-in/line-out protocol as pt-fingerprint and is always
//! installed. Timeout and crash behavior gets exercised with
//! deliberately unhelpful commands.

use sqlguard::fingerprint::Fingerprinter;
use sqlguard::query::Query;

/// One subprocess serves many queries in order.
#[test]
fn test_sequential_queries_through_one_process() {
    let fp = Fingerprinter::spawn("cat").unwrap();
    for i in 0..20 {
        let sql = format!("select * from users where id = {}", i);
        assert_eq!(fp.fingerprint(&sql).as_deref(), Some(sql.as_str()));
    }
}

/// The dedup cache answers insert-and-test under the same lock as the
/// subprocess.
#[test]
fn test_dedup_cache() {
    let fp = Fingerprinter::spawn("cat").unwrap();
    let print = fp.fingerprint("select * from users").unwrap();
    assert!(!fp.seen_before(&print));
    assert!(fp.seen_before(&print));
}

/// A normalizer that never answers costs a bounded timeout, then the
/// query proceeds unfingerprinted.
#[test]
fn test_silent_normalizer_times_out_softly() {
    // reads stdin forever, writes nothing
    let fp = Fingerprinter::spawn("sleep 30").unwrap();
    assert_eq!(fp.fingerprint("select 1"), None);
}

/// Query's fingerprint is computed once and cached.
#[test]
fn test_query_fingerprint_is_cached() {
    let fp = Fingerprinter::spawn("cat").unwrap();
    let query = Query::new("select  *  from users", 0);
    let first = query.fingerprint(&fp).map(str::to_string);
    // a second call does not take another subprocess round trip; with
    // `cat` that is observable as no pending output line
    let second = query.fingerprint(&fp).map(str::to_string);
    assert_eq!(first, second);
    assert_eq!(first.as_deref(), Some("select  *  from users"));
}

/// md5 falls back to hashing the raw SQL when fingerprinting fails.
#[test]
fn test_md5_fallback_without_fingerprint() {
    let fp = Fingerprinter::disabled();
    let query = Query::new("select * from users", 0);
    let digest = query.md5(&fp);
    assert_eq!(digest.len(), 32);
    assert_eq!(digest, format!("{:x}", md5::compute("select * from users")));
}

/// Shared across threads: the mutex serializes subprocess access.
#[test]
fn test_concurrent_fingerprinting() {
    let fp = std::sync::Arc::new(Fingerprinter::spawn("cat").unwrap());
    let handles: Vec<_> = (0..4)
        .map(|t| {
            let fp = fp.clone();
            std::thread::spawn(move || {
                for i in 0..10 {
                    let sql = format!("select {} from t{}", i, t);
                    assert_eq!(fp.fingerprint(&sql).as_deref(), Some(sql.as_str()));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
}
