//! Character scanner shared by the condition parsers
//!
//! A cursor over a string with the handful of primitives the two
//! grammars need: literal tags, predicate runs, and quoted strings with
//! doubled-quote escaping. No regex in the scan loop.

/// A forward-only cursor over a string slice
#[derive(Debug)]
pub struct StatScanner<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> StatScanner<'a> {
    /// Create a scanner positioned at the start of `input`
    pub fn new(input: &'a str) -> Self {
        StatScanner { input, pos: 0 }
    }

    /// Current byte offset into the input
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// The unconsumed remainder of the input
    pub fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    /// True when the entire input has been consumed
    pub fn eos(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// Next character without consuming it
    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Consume and return the next character
    pub fn getch(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    /// Consume `tag` if the input continues with it
    pub fn scan_str(&mut self, tag: &str) -> bool {
        if self.rest().starts_with(tag) {
            self.pos += tag.len();
            true
        } else {
            false
        }
    }

    /// Consume `tag` if the input continues with it, ignoring ASCII case
    pub fn scan_str_nocase(&mut self, tag: &str) -> bool {
        let rest = self.rest();
        match rest.get(..tag.len()) {
            Some(head) if head.eq_ignore_ascii_case(tag) => {
                self.pos += tag.len();
                true
            }
            _ => false,
        }
    }

    /// Consume the longest non-empty run of characters matching `pred`
    pub fn scan_while<F>(&mut self, pred: F) -> Option<&'a str>
    where
        F: Fn(char) -> bool,
    {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            self.pos += c.len_utf8();
        }
        if self.pos > start {
            Some(&self.input[start..self.pos])
        } else {
            None
        }
    }

    /// Consume a run of whitespace; true when any was consumed
    pub fn skip_whitespace(&mut self) -> bool {
        self.scan_while(|c| c.is_whitespace()).is_some()
    }

    /// Consume everything up to and including the next `stop` character.
    /// Returns the text before `stop`, or None when `stop` never appears
    /// (the scanner does not move in that case).
    pub fn scan_until(&mut self, stop: char) -> Option<&'a str> {
        let rest = self.rest();
        let idx = rest.find(stop)?;
        let matched = &rest[..idx];
        self.pos += idx + stop.len_utf8();
        Some(matched)
    }

    /// Consume a quoted token whose opening `quote` is at the cursor.
    ///
    /// A doubled quote inside the token is an escape and is kept as-is;
    /// the closing quote is consumed. When the input ends before a
    /// closing quote, everything read so far is returned.
    pub fn quoted_double_escape(&mut self, quote: char) -> String {
        self.getch();

        let mut out = String::new();
        while let Some(ch) = self.getch() {
            if ch == quote {
                if self.peek() == Some(quote) {
                    out.push(ch);
                    if let Some(next) = self.getch() {
                        out.push(next);
                    }
                } else {
                    return out;
                }
            } else {
                out.push(ch);
            }
        }
        out
    }

    /// Consume a balanced parenthesized group whose opening `(` is at
    /// the cursor. Nested groups are tracked; true when the group
    /// closed before end of input.
    pub fn skip_balanced_parens(&mut self) -> bool {
        if self.peek() != Some('(') {
            return false;
        }
        self.getch();
        let mut depth = 1;
        while let Some(c) = self.getch() {
            match c {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return true;
                    }
                }
                _ => {}
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_str_advances_only_on_match() {
        let mut sc = StatScanner::new("SELECT 1");
        assert!(!sc.scan_str("select"));
        assert_eq!(sc.pos(), 0);
        assert!(sc.scan_str_nocase("select"));
        assert_eq!(sc.rest(), " 1");
    }

    #[test]
    fn test_quoted_double_escape() {
        let mut sc = StatScanner::new("'Time '' Entry'::text");
        assert_eq!(sc.quoted_double_escape('\''), "Time '' Entry");
        assert_eq!(sc.rest(), "::text");
    }

    #[test]
    fn test_quoted_backtick() {
        let mut sc = StatScanner::new("`odd `` name` rest");
        assert_eq!(sc.quoted_double_escape('`'), "odd `` name");
        assert_eq!(sc.rest(), " rest");
    }

    #[test]
    fn test_skip_balanced_parens() {
        let mut sc = StatScanner::new("((name)::text) = 1");
        assert!(sc.skip_balanced_parens());
        assert_eq!(sc.rest(), " = 1");
    }

    #[test]
    fn test_scan_while() {
        let mut sc = StatScanner::new("rgt > 7");
        assert_eq!(sc.scan_while(|c| c.is_alphanumeric()), Some("rgt"));
        assert_eq!(sc.scan_while(|c| c.is_alphanumeric()), None);
    }
}
