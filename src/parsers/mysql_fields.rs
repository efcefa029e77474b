//! MySQL select-field extractor
//!
//! After `EXPLAIN FORMAT=JSON`, `SHOW WARNINGS` carries the rewritten
//! statement with every projection fully qualified:
//!
//! ```text
//! /* select#1 */ select `blog`.`posts`.`title` AS `title` from `blog`.`posts`
//! ```
//!
//! This extracts the `table -> [columns]` projections so the return-size
//! cost term can price the columns actually selected instead of assuming
//! `SELECT *`. Function calls, collation wraps and literals are skipped;
//! one level of FROM-clause table aliasing is resolved. Malformed input
//! yields an empty map, never an error, so one odd rewrite cannot fail
//! the whole analysis.

use std::collections::BTreeMap;

use super::scanner::StatScanner;

/// Field map from MySQL's normalized SQL
pub struct MysqlSelectFields;

impl MysqlSelectFields {
    /// Extract the selected columns, grouped by table
    pub fn parse_fields(sql: &str) -> BTreeMap<String, Vec<String>> {
        let mut sc = StatScanner::new(sql);
        let mut tables: BTreeMap<String, Vec<String>> = BTreeMap::new();

        // leading /* select#N */ comment
        if sc.scan_str("/*") {
            loop {
                if sc.scan_str("*/") {
                    break;
                }
                if sc.getch().is_none() {
                    return BTreeMap::new();
                }
            }
        }
        sc.skip_whitespace();
        if !sc.scan_str_nocase("select") {
            return BTreeMap::new();
        }
        sc.skip_whitespace();

        loop {
            if sc.scan_str_nocase(" from") {
                break;
            }
            if sc.eos() {
                return BTreeMap::new();
            }

            sc.scan_str_nocase("distinct ");

            match sc.peek() {
                Some('`') => {
                    if !parse_projection(&mut sc, &mut tables) {
                        return BTreeMap::new();
                    }
                }
                Some('(') => {
                    if !parse_collation_wrap(&mut sc, &mut tables) {
                        return BTreeMap::new();
                    }
                }
                Some(c) if c.is_ascii_digit() => {
                    sc.scan_while(|c| c.is_ascii_digit());
                    if !scan_alias(&mut sc) {
                        return BTreeMap::new();
                    }
                }
                Some('\'') => {
                    sc.quoted_double_escape('\'');
                    if !scan_alias(&mut sc) {
                        return BTreeMap::new();
                    }
                }
                _ => {
                    if sc.scan_str("NULL") {
                        if !scan_alias(&mut sc) {
                            return BTreeMap::new();
                        }
                    } else if !parse_function(&mut sc) {
                        return BTreeMap::new();
                    }
                }
            }

            sc.scan_str(",");
        }

        resolve_table_alias(&mut sc, &mut tables);
        tables
    }
}

// `db`.`table`.`col` AS `alias` or `table`.`col` AS `alias`
fn parse_projection(sc: &mut StatScanner, tables: &mut BTreeMap<String, Vec<String>>) -> bool {
    let first = sc.quoted_double_escape('`');
    if !sc.scan_str(".") || sc.peek() != Some('`') {
        return false;
    }
    let second = sc.quoted_double_escape('`');

    let (table, column) = if sc.scan_str(".") {
        if sc.peek() != Some('`') {
            return false;
        }
        (second, sc.quoted_double_escape('`'))
    } else {
        (first, second)
    };

    if !scan_alias(sc) {
        return false;
    }

    tables.entry(table).or_default().push(column);
    true
}

// (`tbl`.`name` collate utf8_tolower_ci) AS `alias`
fn parse_collation_wrap(sc: &mut StatScanner, tables: &mut BTreeMap<String, Vec<String>>) -> bool {
    sc.getch();
    if sc.peek() != Some('`') {
        return false;
    }
    let table = sc.quoted_double_escape('`');
    if !sc.scan_str(".") || sc.peek() != Some('`') {
        return false;
    }
    let column = sc.quoted_double_escape('`');
    if !sc.scan_str_nocase(" collate ") {
        return false;
    }
    sc.scan_while(|c| c.is_alphanumeric() || c == '_');
    if !sc.scan_str(")") || !scan_alias(sc) {
        return false;
    }

    tables.entry(table).or_default().push(column);
    true
}

// name(...) AS `alias`; the projection is an expression, not a column
fn parse_function(sc: &mut StatScanner) -> bool {
    if sc.scan_while(|c| c.is_alphanumeric() || c == '_').is_none() {
        return false;
    }
    if !sc.skip_balanced_parens() {
        return false;
    }
    scan_alias(sc)
}

fn scan_alias(sc: &mut StatScanner) -> bool {
    if !sc.scan_str_nocase(" AS ") || sc.peek() != Some('`') {
        return false;
    }
    sc.quoted_double_escape('`');
    true
}

// from `db`.`table` `alias` -- fold the alias back onto the table
fn resolve_table_alias(sc: &mut StatScanner, tables: &mut BTreeMap<String, Vec<String>>) {
    if !sc.scan_str(" ") || sc.peek() != Some('`') {
        return;
    }
    sc.quoted_double_escape('`');
    if !sc.scan_str(".") || sc.peek() != Some('`') {
        return;
    }
    let table = sc.quoted_double_escape('`');
    if !sc.scan_str(" ") || sc.peek() != Some('`') {
        return;
    }
    let alias = sc.quoted_double_escape('`');

    if let Some(cols) = tables.remove(&alias) {
        tables.insert(table, cols);
    }
}
