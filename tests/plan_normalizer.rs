//! Plan normalizer integration tests
//!
//! Full EXPLAIN payloads as the servers actually emit them, checked
//! against the flattened node list:
//! 1. MySQL 5.7/8.0 `FORMAT=JSON` trees
//! 2. Postgres `FORMAT JSON` trees
//! 3. Error paths for unknown node types

use serde_json::json;

use sqlguard::explain::plan::{ACCESS_ALL, ACCESS_REF};
use sqlguard::explain::{ExplainError, MysqlExplain, PostgresExplain};

// =============================================================================
// MYSQL
// =============================================================================

/// A three-table join under an ordering operation, as MySQL 8.0 emits
/// it for an ORDER BY resolved by filesort.
#[test]
fn test_mysql_join_under_ordering_operation() {
    let plan = json!({
        "query_block": {
            "select_id": 1,
            "cost_info": { "query_cost": "7.72" },
            "ordering_operation": {
                "using_filesort": true,
                "nested_loop": [
                    {
                        "table": {
                            "table_name": "organizations",
                            "access_type": "ALL",
                            "rows_examined_per_scan": 12,
                            "filtered": "100.00"
                        }
                    },
                    {
                        "table": {
                            "table_name": "users",
                            "access_type": "ref",
                            "possible_keys": ["index_users_on_organization_id"],
                            "key": "index_users_on_organization_id",
                            "used_key_parts": ["organization_id"],
                            "ref": ["app.organizations.id"],
                            "rows_examined_per_scan": 25,
                            "filtered": "100.00"
                        }
                    }
                ]
            }
        }
    });

    let nodes = MysqlExplain::transform(&plan);
    assert_eq!(nodes.len(), 2);

    assert_eq!(nodes[0].table.as_deref(), Some("organizations"));
    assert_eq!(nodes[0].access_type.as_deref(), Some(ACCESS_ALL));
    assert!(!nodes[0].index_walk);

    assert_eq!(nodes[1].table.as_deref(), Some("users"));
    assert_eq!(nodes[1].key.as_deref(), Some("index_users_on_organization_id"));
    assert_eq!(nodes[1].used_key_parts, vec!["organization_id"]);
    assert_eq!(
        nodes[1].join_ref,
        Some(vec!["app.organizations.id".to_string()])
    );
    // the chosen key is not an alternative
    assert!(nodes[1].possible_keys.is_none());
}

/// ORDER BY satisfied by walking the index tags the wrapped node.
#[test]
fn test_mysql_order_by_index_walk() {
    let plan = json!({
        "query_block": {
            "ordering_operation": {
                "using_filesort": false,
                "table": {
                    "table_name": "issues",
                    "access_type": "index",
                    "key": "PRIMARY",
                    "used_key_parts": ["id"]
                }
            }
        }
    });

    let nodes = MysqlExplain::transform(&plan);
    assert!(nodes[0].index_walk);
    assert_eq!(nodes[0].access_type.as_deref(), Some("index"));
}

/// Short-circuited queries carry only the planner message.
#[test]
fn test_mysql_message_only_plan() {
    let plan = json!({
        "query_block": {
            "select_id": 1,
            "message": "Impossible WHERE noticed after reading const tables"
        }
    });

    let nodes = MysqlExplain::transform(&plan);
    assert_eq!(nodes.len(), 1);
    assert!(nodes[0].table.is_none());
    assert_eq!(
        nodes[0].extra.as_deref(),
        Some("Impossible WHERE noticed after reading const tables")
    );
}

/// Unchosen alternatives survive; a `const` ref is not a join.
#[test]
fn test_mysql_possible_keys_and_const_ref() {
    let plan = json!({
        "query_block": {
            "table": {
                "table_name": "users",
                "access_type": "const",
                "possible_keys": ["PRIMARY", "index_users_on_email"],
                "key": "PRIMARY",
                "used_key_parts": ["id"],
                "ref": ["const"]
            }
        }
    });

    let nodes = MysqlExplain::transform(&plan);
    assert!(nodes[0].join_ref.is_none());
    assert_eq!(
        nodes[0].possible_keys,
        Some(vec![
            "PRIMARY".to_string(),
            "index_users_on_email".to_string()
        ])
    );
}

// =============================================================================
// POSTGRES
// =============================================================================

/// A hash join over a sequential scan and an index probe.
#[test]
fn test_postgres_hash_join() {
    let plan = json!([{
        "Plan": {
            "Node Type": "Hash Join",
            "Join Type": "Inner",
            "Hash Cond": "(comments.user_id = users.id)",
            "Plans": [
                {
                    "Node Type": "Seq Scan",
                    "Relation Name": "comments",
                    "Parent Relationship": "Outer"
                },
                {
                    "Node Type": "Hash",
                    "Parent Relationship": "Inner",
                    "Plans": [{
                        "Node Type": "Index Scan",
                        "Relation Name": "users",
                        "Index Name": "users_pkey",
                        "Index Cond": "(id = comments.user_id)"
                    }]
                }
            ]
        }
    }]);

    let nodes = PostgresExplain::transform(&plan).unwrap();
    assert_eq!(nodes.len(), 2);
    assert_eq!(nodes[0].table.as_deref(), Some("comments"));
    assert_eq!(nodes[0].access_type.as_deref(), Some(ACCESS_ALL));
    assert_eq!(nodes[1].table.as_deref(), Some("users"));
    assert_eq!(nodes[1].access_type.as_deref(), Some(ACCESS_REF));
    assert_eq!(
        nodes[1].join_ref,
        Some(vec!["comments.user_id".to_string()])
    );
}

/// A bitmap heap scan over OR'd index branches: the heap node names the
/// table, the index children become intersect nodes.
#[test]
fn test_postgres_bitmap_or_branches() {
    let plan = json!([{
        "Plan": {
            "Node Type": "Limit",
            "Plans": [{
                "Node Type": "Bitmap Heap Scan",
                "Relation Name": "issues",
                "Recheck Cond": "((assignee_id = 1) OR (author_id = 1))",
                "Plans": [{
                    "Node Type": "BitmapOr",
                    "Plans": [
                        {
                            "Node Type": "Bitmap Index Scan",
                            "Index Name": "index_issues_on_assignee_id",
                            "Index Cond": "(assignee_id = 1)"
                        },
                        {
                            "Node Type": "Bitmap Index Scan",
                            "Index Name": "index_issues_on_author_id",
                            "Index Cond": "(author_id = 1)"
                        }
                    ]
                }]
            }]
        }
    }]);

    let nodes = PostgresExplain::transform(&plan).unwrap();
    assert_eq!(nodes.len(), 2);
    for node in &nodes {
        assert_eq!(node.table.as_deref(), Some("issues"));
        assert_eq!(node.access_type.as_deref(), Some("intersect"));
    }
    assert_eq!(nodes[0].used_key_parts, vec!["assignee_id"]);
    assert_eq!(nodes[1].used_key_parts, vec!["author_id"]);
}

/// Typed casts and multi-term conditions feed the used key parts.
#[test]
fn test_postgres_typed_index_condition() {
    let plan = json!([{
        "Plan": {
            "Node Type": "Index Only Scan",
            "Relation Name": "tags",
            "Index Name": "index_tags_on_name",
            "Index Cond": "((name)::text = 'urgent'::text)"
        }
    }]);

    let nodes = PostgresExplain::transform(&plan).unwrap();
    assert!(nodes[0].using_index);
    assert_eq!(nodes[0].used_key_parts, vec!["name"]);
}

/// A node type outside the model is a typed error, not a panic and not
/// a silent skip.
#[test]
fn test_postgres_unknown_node_type_errors() {
    let plan = json!([{
        "Plan": {
            "Node Type": "Foreign Scan",
            "Relation Name": "remote_users"
        }
    }]);

    let err = PostgresExplain::transform(&plan).unwrap_err();
    assert!(matches!(err, ExplainError::UnknownNode { .. }));
}

/// A payload without the `[{"Plan": ...}]` shell is malformed.
#[test]
fn test_postgres_malformed_payload() {
    let err = PostgresExplain::transform(&json!({"Plan": {}})).unwrap_err();
    assert!(matches!(err, ExplainError::MalformedPlan(_)));
}
