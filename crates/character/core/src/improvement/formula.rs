//! String-to-integer evaluation for authored bonus magnitudes.
//!
//! Bonus magnitudes in content are either integer literals, a
//! `FixedValues(...)` rating table, or small arithmetic formulas over the
//! `Rating` token and attribute abbreviations. Evaluation is total: any
//! malformed input yields 0, because the resolver consumes these values and
//! must never fail.

use tracing::debug;

use crate::character::{AttributeKind, Character};

use super::engine::ImprovementEngine;

impl ImprovementEngine {
    /// Evaluates an authored magnitude string against an owner and rating.
    pub fn value_to_int(&mut self, owner: &Character, value: &str, rating: i32) -> i32 {
        let mut text = value.trim().to_string();
        if text.is_empty() {
            return 0;
        }

        if let Some(rest) = text.strip_prefix("FixedValues(") {
            let list = rest.strip_suffix(')').unwrap_or(rest);
            let entries: Vec<&str> = list.split(',').map(str::trim).collect();
            // rating-th entry, 1-based, clamped to the table's bounds.
            let index = (rating.min(entries.len() as i32) - 1).max(0) as usize;
            text = entries.get(index).copied().unwrap_or("0").to_string();
        }

        let has_attribute = AttributeKind::ALL
            .iter()
            .any(|kind| text.contains(kind.abbrev()));
        if text.contains("Rating") || has_attribute {
            let mut substituted = text.replace("Rating", &rating.to_string());
            for kind in AttributeKind::ALL {
                if substituted.contains(kind.abbrev()) {
                    let total = self.attribute_total(owner, kind).to_string();
                    substituted = substituted.replace(kind.abbrev(), &total);
                }
            }
            // Fractions round down; a formula that fails to parse is worth 0.
            return match evaluate_expression(&substituted) {
                Some(result) => result.floor() as i32,
                None => {
                    debug!(
                        target: "character_core::improvement",
                        formula = %value,
                        "formula did not evaluate, treating as 0"
                    );
                    0
                }
            };
        }

        text.parse::<i32>().unwrap_or(0)
    }
}

/// Evaluates `+ - * /` with parentheses and unary minus over f64.
fn evaluate_expression(input: &str) -> Option<f64> {
    let mut parser = Parser {
        bytes: input.as_bytes(),
        pos: 0,
    };
    let value = parser.expression()?;
    parser.skip_whitespace();
    if parser.pos == parser.bytes.len() {
        Some(value)
    } else {
        None
    }
}

struct Parser<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl Parser<'_> {
    fn skip_whitespace(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> Option<u8> {
        self.skip_whitespace();
        self.bytes.get(self.pos).copied()
    }

    fn expression(&mut self) -> Option<f64> {
        let mut value = self.term()?;
        while let Some(op) = self.peek() {
            match op {
                b'+' => {
                    self.pos += 1;
                    value += self.term()?;
                }
                b'-' => {
                    self.pos += 1;
                    value -= self.term()?;
                }
                _ => break,
            }
        }
        Some(value)
    }

    fn term(&mut self) -> Option<f64> {
        let mut value = self.factor()?;
        while let Some(op) = self.peek() {
            match op {
                b'*' => {
                    self.pos += 1;
                    value *= self.factor()?;
                }
                b'/' => {
                    self.pos += 1;
                    let divisor = self.factor()?;
                    if divisor == 0.0 {
                        return None;
                    }
                    value /= divisor;
                }
                _ => break,
            }
        }
        Some(value)
    }

    fn factor(&mut self) -> Option<f64> {
        match self.peek()? {
            b'(' => {
                self.pos += 1;
                let value = self.expression()?;
                if self.peek()? != b')' {
                    return None;
                }
                self.pos += 1;
                Some(value)
            }
            b'-' => {
                self.pos += 1;
                Some(-self.factor()?)
            }
            _ => self.number(),
        }
    }

    fn number(&mut self) -> Option<f64> {
        self.skip_whitespace();
        let start = self.pos;
        while self.pos < self.bytes.len()
            && (self.bytes[self.pos].is_ascii_digit() || self.bytes[self.pos] == b'.')
        {
            self.pos += 1;
        }
        if start == self.pos {
            return None;
        }
        std::str::from_utf8(&self.bytes[start..self.pos])
            .ok()?
            .parse()
            .ok()
    }
}
