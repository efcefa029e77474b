//! Postgres plan normalizer
//!
//! Produces the same node shape as the MySQL walk from
//! `EXPLAIN (FORMAT JSON)` output. Wrapping nodes (sorts, aggregates,
//! joins, bitmap heads) recurse with an explicit ancestor context
//! passed down by value; only scans emit nodes. A node type the model
//! does not cover is an error carrying the offending payload: that one
//! query fails, the batch continues.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::parsers::PostgresConditions;

use super::errors::{ExplainError, ExplainResult};
use super::plan::{PlanNode, ACCESS_ALL, ACCESS_INTERSECT, ACCESS_REF};

// ancestor context, passed by value down the recursion
#[derive(Debug, Clone, Default)]
struct Context {
    // Bitmap Heap Scan names the relation; its index children don't
    current_table: Option<String>,
    // BitmapOr children are intersect branches, not plain refs
    access_type: Option<&'static str>,
    // join condition columns from an enclosing Hash/Merge Join
    join_cond: Option<BTreeMap<String, Vec<String>>>,
}

/// Normalizer for `EXPLAIN (FORMAT JSON)` output
pub struct PostgresExplain;

impl PostgresExplain {
    /// Flatten a plan tree into ordered per-table access nodes
    pub fn transform(json: &Value) -> ExplainResult<Vec<PlanNode>> {
        let plan = json
            .as_array()
            .and_then(|a| a.first())
            .and_then(|v| v.get("Plan"))
            .ok_or_else(|| {
                ExplainError::MalformedPlan("expected [{\"Plan\": ...}]".to_string())
            })?;

        let mut nodes = Vec::new();
        Self::transform_node(plan, &mut nodes, Context::default())?;
        Ok(nodes)
    }

    fn transform_node(
        node: &Value,
        nodes: &mut Vec<PlanNode>,
        ctx: Context,
    ) -> ExplainResult<()> {
        let node_type = node
            .get("Node Type")
            .and_then(Value::as_str)
            .ok_or_else(|| ExplainError::unknown_node(node))?;

        match node_type {
            "Limit" | "LockRows" | "Aggregate" | "GroupAggregate" | "Unique" | "Sort"
            | "Incremental Sort" | "Hash" | "Nested Loop" | "Materialize" | "Gather"
            | "Gather Merge" | "Append" | "Result" | "Subquery Scan" | "CTE Scan"
            | "BitmapAnd" => {
                Self::recurse_plans(node, nodes, ctx)
            }

            "Hash Join" | "Merge Join" => {
                let cond_key = if node_type == "Hash Join" {
                    "Hash Cond"
                } else {
                    "Merge Cond"
                };
                let join_cond = node
                    .get(cond_key)
                    .and_then(Value::as_str)
                    .and_then(|c| PostgresConditions::parse(c).ok())
                    .map(|c| c.join_fields());
                Self::recurse_plans(node, nodes, Context { join_cond, ..ctx })
            }

            "Bitmap Heap Scan" => {
                let current_table = node
                    .get("Relation Name")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                Self::recurse_plans(node, nodes, Context { current_table, ..ctx })
            }

            "BitmapOr" => Self::recurse_plans(
                node,
                nodes,
                Context {
                    access_type: Some(ACCESS_INTERSECT),
                    ..ctx
                },
            ),

            "Seq Scan" => {
                nodes.push(PlanNode {
                    table: node
                        .get("Relation Name")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    access_type: Some(ACCESS_ALL.to_string()),
                    ..PlanNode::default()
                });
                Ok(())
            }

            "Index Scan" | "Bitmap Index Scan" | "Index Only Scan" => {
                nodes.push(Self::index_scan_node(node, node_type, &ctx));
                Ok(())
            }

            _ => Err(ExplainError::unknown_node(node)),
        }
    }

    fn index_scan_node(node: &Value, node_type: &str, ctx: &Context) -> PlanNode {
        let table = node
            .get("Relation Name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| ctx.current_table.clone());

        // an unparseable condition means no selectivity info, not a
        // failed query
        let conds = node
            .get("Index Cond")
            .and_then(Value::as_str)
            .and_then(|c| PostgresConditions::parse(c).ok());

        let mut used_key_parts = Vec::new();
        let mut join_ref: Vec<String> = Vec::new();
        if let Some(conds) = &conds {
            used_key_parts = conds.fields();
            for (cond_table, cols) in conds.join_fields() {
                if Some(&cond_table) == table.as_ref() {
                    used_key_parts.extend(cols);
                } else {
                    join_ref.extend(cols.iter().map(|c| format!("{}.{}", cond_table, c)));
                }
            }
        }
        if join_ref.is_empty() {
            if let Some(join_cond) = &ctx.join_cond {
                for (cond_table, cols) in join_cond {
                    if Some(cond_table) != table.as_ref() {
                        join_ref.extend(cols.iter().map(|c| format!("{}.{}", cond_table, c)));
                    }
                }
            }
        }

        PlanNode {
            table,
            access_type: Some(ctx.access_type.unwrap_or(ACCESS_REF).to_string()),
            key: node
                .get("Index Name")
                .and_then(Value::as_str)
                .map(str::to_string),
            used_key_parts,
            using_index: node_type == "Index Only Scan",
            join_ref: if join_ref.is_empty() {
                None
            } else {
                Some(join_ref)
            },
            ..PlanNode::default()
        }
    }

    fn recurse_plans(node: &Value, nodes: &mut Vec<PlanNode>, ctx: Context) -> ExplainResult<()> {
        if let Some(children) = node.get("Plans").and_then(Value::as_array) {
            for child in children {
                Self::transform_node(child, nodes, ctx.clone())?;
            }
        }
        Ok(())
    }
}
