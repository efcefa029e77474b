//! Scored result of one explain
//!
//! `cost` only ever grows as checks run; a terminal check clamps it and
//! stops the pipeline. `messages` is the append-only audit trail
//! explaining how the number came to be.

use serde::{Deserialize, Serialize};

/// Coarse cost band derived from the numeric score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    None,
    Low,
    Medium,
    High,
}

impl Severity {
    /// Map a cost score to its band
    pub fn from_cost(cost: f64) -> Self {
        if cost <= 0.01 {
            Severity::None
        } else if cost <= 0.10 {
            Severity::Low
        } else if cost <= 1.0 {
            Severity::Medium
        } else {
            Severity::High
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::None => "none",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

/// One tagged entry in the audit trail
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// What happened (`access_type_tablescan`, `limited_scan`, ...)
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows_read: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub index_used: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_rows: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_bytes: Option<u64>,
    /// Free text for planner short-circuits and diagnostics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Message {
    /// A bare tagged message
    pub fn tagged(tag: impl Into<String>) -> Self {
        Message {
            tag: tag.into(),
            ..Message::default()
        }
    }
}

/// Accumulated outcome of the check pipeline
#[derive(Debug, Clone, Default, Serialize)]
pub struct CostResult {
    /// Unitless relative score, monotonically increasing
    pub cost: f64,
    /// Running estimate of rows surviving to the next join stage
    pub result_size: u64,
    /// Ordered audit trail
    pub messages: Vec<Message>,
}

impl CostResult {
    /// Severity band for the final cost
    pub fn severity(&self) -> Severity {
        Severity::from_cost(self.cost)
    }

    /// True when any message carries the given tag
    pub fn has_tag(&self, tag: &str) -> bool {
        self.messages.iter().any(|m| m.tag == tag)
    }
}
