//! Parse staging: the untyped tokens collected for one record body.
//!
//! The body front end does not know the record's schema. It stages runs of
//! numbers and strings in source order, and the repack pass later matches
//! them against the template's fields.

use std::fmt;

/// Source position of a token (1-based line and column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    #[inline]
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Payload of a staged token.
#[derive(Debug, Clone, PartialEq)]
pub enum StagedValue {
    /// A run of integer literals.
    Ints(Vec<i64>),
    /// A run of real literals.
    Doubles(Vec<f64>),
    /// A single string literal.
    Str(String),
}

/// A staged token with the position of its first literal.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedToken {
    pub value: StagedValue,
    pub position: Position,
}

impl StagedToken {
    /// Number of primitive elements this token supplies.
    pub fn len(&self) -> usize {
        match &self.value {
            StagedValue::Ints(v) => v.len(),
            StagedValue::Doubles(v) => v.len(),
            StagedValue::Str(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Category name used in diagnostics.
    pub fn category(&self) -> &'static str {
        match &self.value {
            StagedValue::Ints(_) => "integer",
            StagedValue::Doubles(_) => "real",
            StagedValue::Str(_) => "string",
        }
    }
}

/// Ordered list of staged tokens for one record body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseStaging {
    tokens: Vec<StagedToken>,
}

impl ParseStaging {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a run of integers. Empty runs are ignored.
    pub fn add_ints(&mut self, values: Vec<i64>, position: Position) {
        if !values.is_empty() {
            self.tokens.push(StagedToken {
                value: StagedValue::Ints(values),
                position,
            });
        }
    }

    /// Stage a run of reals. Empty runs are ignored.
    pub fn add_doubles(&mut self, values: Vec<f64>, position: Position) {
        if !values.is_empty() {
            self.tokens.push(StagedToken {
                value: StagedValue::Doubles(values),
                position,
            });
        }
    }

    /// Stage a string.
    pub fn add_string(&mut self, value: String, position: Position) {
        self.tokens.push(StagedToken {
            value: StagedValue::Str(value),
            position,
        });
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&StagedToken> {
        self.tokens.get(index)
    }

    /// Number of staged tokens (runs count once).
    #[inline]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Total number of primitive elements across all tokens.
    pub fn element_count(&self) -> usize {
        self.tokens.iter().map(StagedToken::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StagedToken> {
        self.tokens.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staging_counts() {
        let mut staging = ParseStaging::new();
        staging.add_ints(vec![3], Position::new(1, 1));
        staging.add_doubles(vec![1.0, 2.0, 3.0], Position::new(2, 1));
        staging.add_string("tex.png".into(), Position::new(3, 1));
        staging.add_ints(Vec::new(), Position::new(4, 1));

        assert_eq!(staging.len(), 3);
        assert_eq!(staging.element_count(), 5);
        assert_eq!(staging.get(1).unwrap().category(), "real");
        assert_eq!(staging.get(2).unwrap().position, Position::new(3, 1));
    }
}
