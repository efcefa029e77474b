//! Postgres index-condition parser
//!
//! Parses the condition strings the Postgres planner emits, e.g.
//!
//! ```text
//! (rgt > 7)
//! ((type)::text = 'TimeEntryActivity'::text)
//! (((type)::text = ANY ('{Group,GroupAnonymous}'::text[])) AND ((type)::text = 'Group'::text))
//! ((posts.user_id = users.id))
//! ```
//!
//! and returns the columns referenced, in source order, deduplicated.
//! Column references qualified with a table name (join conditions) are
//! grouped under that table. A function call on the left-hand side
//! contributes no column. An unrecognized token sequence is a
//! `ParseError`; the caller falls back to a conservative estimate.

use std::collections::BTreeMap;

use super::errors::{ParseError, ParseResult};
use super::scanner::StatScanner;

/// Parsed column references from one planner condition string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostgresConditions {
    // insertion-ordered (table, columns) groups; None = unqualified
    groups: Vec<(Option<String>, Vec<String>)>,
}

impl PostgresConditions {
    /// Parse a condition string
    pub fn parse(input: &str) -> ParseResult<Self> {
        let mut parser = Parser {
            sc: StatScanner::new(input),
            input,
            groups: Vec::new(),
        };
        parser.parse()?;
        Ok(PostgresConditions {
            groups: parser.groups,
        })
    }

    /// Columns referenced without a table qualifier, in source order
    pub fn fields(&self) -> Vec<String> {
        self.groups
            .iter()
            .find(|(table, _)| table.is_none())
            .map(|(_, cols)| cols.clone())
            .unwrap_or_default()
    }

    /// Columns grouped by table qualifier, for join conditions
    pub fn join_fields(&self) -> BTreeMap<String, Vec<String>> {
        self.groups
            .iter()
            .filter_map(|(table, cols)| table.clone().map(|t| (t, cols.clone())))
            .collect()
    }
}

struct Parser<'a> {
    sc: StatScanner<'a>,
    input: &'a str,
    groups: Vec<(Option<String>, Vec<String>)>,
}

impl<'a> Parser<'a> {
    fn parse(&mut self) -> ParseResult<()> {
        if self.input.trim().is_empty() {
            return Ok(());
        }

        self.sc.scan_str("(");
        if self.sc.peek() == Some('(') && !self.typed_column_ahead() {
            // (a AND b AND ...): one parenthesized term per condition
            while self.sc.peek() == Some('(') {
                self.sc.getch();
                self.extract_field()?;
                self.scan_and_separator();
            }
        } else {
            self.extract_field()?;
        }
        Ok(())
    }

    // true when the cursor sits on a typed column like `(type)::text`
    fn typed_column_ahead(&self) -> bool {
        let rest = self.sc.rest();
        let Some(stripped) = rest.strip_prefix('(') else {
            return false;
        };
        let word_len = stripped
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_')
            .map(char::len_utf8)
            .sum::<usize>();
        word_len > 0 && stripped[word_len..].starts_with(")::")
    }

    fn scan_and_separator(&mut self) {
        let save = self.sc.pos();
        if self.sc.skip_whitespace() && self.sc.scan_str("AND") && self.sc.skip_whitespace() {
            return;
        }
        // not a separator; rewind
        self.sc = reposition(self.input, save);
    }

    // one `lhs op rhs)` term, cursor past the opening paren
    fn extract_field(&mut self) -> ParseResult<()> {
        self.parse_field();
        self.scan_operator();
        self.parse_value();

        if !self.sc.scan_str(")") {
            return Err(ParseError::bad_parse(self.sc.pos(), self.input));
        }
        Ok(())
    }

    // whitespace-delimited operator token; no-op when absent
    fn scan_operator(&mut self) {
        let save = self.sc.pos();
        if self.sc.skip_whitespace()
            && self.sc.scan_while(|c| !c.is_whitespace()).is_some()
            && self.sc.skip_whitespace()
        {
            return;
        }
        self.sc = reposition(self.input, save);
    }

    fn parse_field(&mut self) {
        let first = self.parse_ident();
        if self.sc.scan_str(".") {
            let second = self.parse_ident();
            if let (Some(table), Some(field)) = (first, second) {
                self.add_field(Some(table), field);
            }
        } else if let Some(field) = first {
            self.add_field(None, field);
        }
    }

    fn parse_ident(&mut self) -> Option<String> {
        match self.sc.peek()? {
            '(' => {
                // typed column like (name)::text
                self.sc.getch();
                let ident = self.sc.scan_until(')')?;
                self.scan_type_cast();
                Some(ident.to_string())
            }
            '"' => Some(self.parse_string('"')),
            _ => {
                let ident = self
                    .sc
                    .scan_while(|c| !matches!(c, ' ' | '.' | ')' | '[' | '('));
                if self.sc.peek() == Some('(') {
                    // function call on the LHS; skip it, no usable column
                    self.sc.skip_balanced_parens();
                    self.scan_type_cast();
                    return None;
                }
                if self.sc.peek() == Some('[') {
                    // array subscript, field[1]
                    self.sc.scan_until(']');
                }
                ident.map(str::to_string)
            }
        }
    }

    // optional ::type or ::type[] suffix
    fn scan_type_cast(&mut self) {
        if self.sc.scan_str("::") {
            self.sc
                .scan_while(|c| c.is_alphanumeric() || c == '_' || c == '"');
            self.sc.scan_str("[]");
        }
    }

    fn parse_string(&mut self, quote: char) -> String {
        let v = self.sc.quoted_double_escape(quote);
        self.scan_type_cast();
        v
    }

    fn parse_value(&mut self) {
        match self.sc.peek() {
            Some('\'') => {
                self.parse_string('\'');
            }
            Some('"') => self.parse_field(),
            Some(c) if c.is_ascii_digit() => {
                self.sc.scan_while(|c| c.is_ascii_digit());
                if self.sc.scan_str(".") {
                    self.sc.scan_while(|c| c.is_ascii_digit());
                }
            }
            _ => {
                if self.sc.scan_str("ANY (") {
                    self.parse_value();
                    self.sc.scan_str(")");
                } else {
                    self.parse_field();
                }
            }
        }
    }

    fn add_field(&mut self, table: Option<String>, field: String) {
        if let Some((_, cols)) = self.groups.iter_mut().find(|(t, _)| *t == table) {
            if !cols.contains(&field) {
                cols.push(field);
            }
        } else {
            self.groups.push((table, vec![field]));
        }
    }
}

// rebuild a scanner at an absolute byte offset
fn reposition(input: &str, pos: usize) -> StatScanner<'_> {
    let mut sc = StatScanner::new(input);
    while sc.pos() < pos {
        if sc.getch().is_none() {
            break;
        }
    }
    sc
}
