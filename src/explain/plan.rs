//! Dialect-neutral plan representation
//!
//! A normalized plan is an ordered sequence of per-base-table access
//! nodes, root-to-leaf execution order. Sorts, aggregates and
//! uniqueness wrappers contribute no node of their own; they may tag
//! the node they wrap (an ORDER BY satisfied by walking an index in key
//! order arrives as `index_walk`). Planner short-circuits ("Impossible
//! WHERE", "No tables used") arrive as a single message-only node.

use serde::Serialize;

/// Access type for a full table scan
pub const ACCESS_ALL: &str = "ALL";
/// Access type for an indexed lookup
pub const ACCESS_REF: &str = "ref";
/// Access type for a full index scan (every index entry is read)
pub const ACCESS_INDEX: &str = "index";
/// Access type for bitmap-OR'd index branches
pub const ACCESS_INTERSECT: &str = "intersect";

/// One base-table access step
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct PlanNode {
    /// Base table accessed; None for message-only nodes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    /// Planner access type (`ALL`, `ref`, `index`, `const`, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_type: Option<String>,
    /// Chosen key, when one was chosen
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Prefix of the chosen key actually used, in key order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub used_key_parts: Vec<String>,
    /// Planner's per-scan row estimate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows_examined_per_scan: Option<u64>,
    /// Planner's post-filter survival percentage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filtered: Option<f64>,
    /// Keys the planner considered but did not choose
    #[serde(skip_serializing_if = "Option::is_none")]
    pub possible_keys: Option<Vec<String>>,
    /// Covering-index access; no row fetch needed
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub using_index: bool,
    /// Outer-table columns a join condition reads; present marks this
    /// as a joined (not leading) table
    #[serde(skip_serializing_if = "Option::is_none")]
    pub join_ref: Option<Vec<String>>,
    /// ORDER BY satisfied by walking the index in key order
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub index_walk: bool,
    /// Planner free text for message-only nodes
    #[serde(rename = "Extra", skip_serializing_if = "Option::is_none")]
    pub extra: Option<String>,
}

impl PlanNode {
    /// A terminal node carrying only the planner's message
    pub fn message(text: impl Into<String>) -> Self {
        PlanNode {
            extra: Some(text.into()),
            ..PlanNode::default()
        }
    }

    /// True for derived/materialized subquery tables (`<derived2>`)
    pub fn is_derived(&self) -> bool {
        self.table
            .as_deref()
            .map(|t| t.starts_with("<derived"))
            .unwrap_or(false)
    }
}
