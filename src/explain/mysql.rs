//! MySQL plan normalizer
//!
//! Walks the JSON tree under `query_block` and flattens it into the
//! dialect-neutral node list. The node-type rules fall through by
//! priority; join order in `nested_loop` is execution order, which is
//! also cost-accumulation order.

use serde_json::Value;

use super::plan::PlanNode;

// ancestor context passed by value down the recursion
#[derive(Debug, Clone, Copy, Default)]
struct Context {
    index_walk: bool,
}

/// Normalizer for `EXPLAIN FORMAT=JSON` output
pub struct MysqlExplain;

impl MysqlExplain {
    /// Flatten a plan tree into ordered per-table access nodes
    pub fn transform(plan: &Value) -> Vec<PlanNode> {
        let root = plan.get("query_block").unwrap_or(plan);
        let mut nodes = Vec::new();
        Self::transform_json(root, &mut nodes, Context::default());
        nodes
    }

    fn transform_json(json: &Value, nodes: &mut Vec<PlanNode>, ctx: Context) {
        if let Some(ordering) = json.get("ordering_operation") {
            // no filesort means the plan walks an index in key order
            let index_walk = ordering.get("using_filesort") == Some(&Value::Bool(false));
            Self::transform_json(ordering, nodes, Context { index_walk });
        } else if let Some(child) = json.get("duplicates_removal") {
            Self::transform_json(child, nodes, ctx);
        } else if let Some(child) = json.get("grouping_operation") {
            Self::transform_json(child, nodes, ctx);
        } else if let Some(children) = json.get("nested_loop").and_then(Value::as_array) {
            for child in children {
                Self::transform_json(child, nodes, ctx);
            }
        } else if let Some(table) = json.get("table") {
            nodes.push(Self::transform_table(table, ctx));
        } else {
            // "No tables used", "Impossible WHERE" and friends
            let message = json
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default();
            nodes.push(PlanNode::message(message));
        }
    }

    fn transform_table(table: &Value, ctx: Context) -> PlanNode {
        let str_field = |key: &str| table.get(key).and_then(Value::as_str).map(str::to_string);
        let str_list = |key: &str| -> Option<Vec<String>> {
            table.get(key).and_then(Value::as_array).map(|a| {
                a.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
        };

        let key = str_field("key");
        let mut node = PlanNode {
            table: str_field("table_name"),
            access_type: str_field("access_type"),
            key: key.clone(),
            used_key_parts: str_list("used_key_parts").unwrap_or_default(),
            rows_examined_per_scan: table.get("rows_examined_per_scan").and_then(Value::as_u64),
            filtered: parse_filtered(table.get("filtered")),
            using_index: table.get("using_index") == Some(&Value::Bool(true)),
            index_walk: ctx.index_walk,
            ..PlanNode::default()
        };

        // only a joined table refs a non-constant outer column
        if let Some(refs) = str_list("ref") {
            if refs.iter().any(|r| r != "const") {
                node.join_ref = Some(refs);
            }
        }

        // unchosen alternatives only; the chosen key is not a road not taken
        if let Some(possible) = str_list("possible_keys") {
            let chosen: Vec<String> = key.into_iter().collect();
            if possible != chosen {
                node.possible_keys = Some(possible);
            }
        }

        node
    }
}

// "filtered" arrives as a string in 5.7 and a number in 8.0
fn parse_filtered(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::String(s) => s.parse().ok(),
        v => v.as_f64(),
    }
}
