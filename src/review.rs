//! Correlates analyzer findings with a code diff
//!
//! A finding matters for review only when its query originates from a
//! line the diff inserted. Matching is by backtrace: a frame that
//! starts with a changed path and whose line number falls inside an
//! inserted range pins the finding to `path:line`.

use std::sync::OnceLock;

use regex::Regex;

use crate::analyzer::QueryReport;
use crate::diff::DiffMapper;
use crate::explain::Severity;

// "app/models/user.rb:32:in `lookup`"
fn line_number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r":(\d+):").unwrap())
}

/// A finding attributed to an inserted line
#[derive(Debug, Clone)]
pub struct Problem {
    /// `path:line` of the inserted line that runs the query
    pub location: String,
    pub report: QueryReport,
}

/// Filters reports down to the ones this diff is responsible for
pub struct ExplainDiff<'a> {
    reports: &'a [QueryReport],
    diff: &'a DiffMapper,
}

impl<'a> ExplainDiff<'a> {
    pub fn new(reports: &'a [QueryReport], diff: &'a DiffMapper) -> Self {
        ExplainDiff { reports, diff }
    }

    /// Reports above `none` severity whose origin is an inserted line
    pub fn problems(&self) -> Vec<Problem> {
        let updated = self.diff.updated_lines();
        self.reports
            .iter()
            .filter(|r| r.severity != Severity::None)
            .filter_map(|report| {
                let location = Self::diff_line_from_backtrace(&report.backtrace, &updated)?;
                Some(Problem {
                    location,
                    report: report.clone(),
                })
            })
            .collect()
    }

    fn diff_line_from_backtrace(
        backtrace: &[String],
        updated: &[(String, std::ops::RangeInclusive<u64>)],
    ) -> Option<String> {
        for frame in backtrace {
            for (path, lines) in updated {
                if !frame.starts_with(path.as_str()) {
                    continue;
                }
                let Some(line) = line_number_re()
                    .captures(frame)
                    .and_then(|c| c.get(1))
                    .and_then(|m| m.as_str().parse::<u64>().ok())
                else {
                    continue;
                };
                if lines.contains(&line) {
                    return Some(format!("{}:{}", path, line));
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Cursor;

    fn report(severity: Severity, backtrace: &[&str]) -> QueryReport {
        QueryReport {
            sql: "select * from users".to_string(),
            table: Some("users".to_string()),
            md5: "d41d8cd98f00b204e9800998ecf8427e".to_string(),
            messages: Vec::new(),
            cost: 2.0,
            severity,
            backtrace: backtrace.iter().map(|s| s.to_string()).collect(),
            raw_explain: json!(null),
        }
    }

    fn diff() -> DiffMapper {
        let text = "\
+++ b/app/models/user.rb
@@ -9,0 +10,2 @@
+  def self.slow
+    where(deleted: false).to_a
";
        DiffMapper::new(Cursor::new(text)).unwrap()
    }

    #[test]
    fn test_finding_on_inserted_line_is_a_problem() {
        let reports = [report(Severity::High, &["app/models/user.rb:11:in `slow`"])];
        let diff = diff();
        let problems = ExplainDiff::new(&reports, &diff).problems();
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].location, "app/models/user.rb:11");
    }

    #[test]
    fn test_untouched_line_is_not_a_problem() {
        let reports = [report(Severity::High, &["app/models/user.rb:99:in `other`"])];
        let diff = diff();
        assert!(ExplainDiff::new(&reports, &diff).problems().is_empty());
    }

    #[test]
    fn test_cheap_queries_are_not_problems() {
        let reports = [report(Severity::None, &["app/models/user.rb:11:in `slow`"])];
        let diff = diff();
        assert!(ExplainDiff::new(&reports, &diff).problems().is_empty());
    }

    #[test]
    fn test_later_frame_can_still_match() {
        let reports = [report(
            Severity::Medium,
            &["lib/elsewhere.rb:5:in `call`", "app/models/user.rb:10:in `slow`"],
        )];
        let diff = diff();
        let problems = ExplainDiff::new(&reports, &diff).problems();
        assert_eq!(problems[0].location, "app/models/user.rb:10");
    }
}
