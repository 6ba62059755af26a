//! Abstract syntax of tabular query expressions.
//!
//! Every node maps to a read-only operation over the catalog; there is no way to
//! express assignment, calls to arbitrary functions or attribute access outside
//! the listed methods.

use super::Value;
use crate::types::CatalogField;
use regex::Regex;

/// A complete expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// `data` followed by a chain of steps and an optional terminal operation.
    Chain(Chain),
    /// `len(<query>)`.
    Len(Box<Query>),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Chain {
    pub steps: Vec<Step>,
    pub terminal: Option<Terminal>,
}

/// A step that narrows the current selection.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Keep rows matching the predicate.
    Filter(Predicate),
    /// Keep the listed columns as a frame (`data[['A', 'B']]`).
    Columns(Vec<CatalogField>),
    /// Keep a single column as a series (`data['A']`).
    Series(CatalogField),
    /// Keep the first `n` rows.
    Head(usize),
    /// Keep the last `n` rows.
    Tail(usize),
    /// Select one row by position; negative positions count from the end.
    Row(i64),
}

/// An operation that turns the selection into a final value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminal {
    /// `.shape[axis]`.
    Shape(usize),
    Count,
    Unique,
    NUnique,
    ToList,
    Aggregate(Aggregate),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Min,
    Max,
    Sum,
}

impl Aggregate {
    pub fn name(self) -> &'static str {
        match self {
            Aggregate::Min => "min",
            Aggregate::Max => "max",
            Aggregate::Sum => "sum",
        }
    }
}

/// A boolean row filter.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Compare {
        field: CatalogField,
        op: CmpOp,
        value: Value,
    },
    Contains {
        field: CatalogField,
        matcher: TextMatcher,
    },
    StartsWith {
        field: CatalogField,
        prefix: String,
    },
    IsIn {
        field: CatalogField,
        values: Vec<Value>,
    },
    Not(Box<Predicate>),
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
}

/// Comparison operators allowed in filter predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "==" => Some(CmpOp::Eq),
            "!=" => Some(CmpOp::Ne),
            "<" => Some(CmpOp::Lt),
            "<=" => Some(CmpOp::Le),
            ">" => Some(CmpOp::Gt),
            ">=" => Some(CmpOp::Ge),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        }
    }
}

/// How `.str.contains` matches cell text.
#[derive(Debug, Clone)]
pub enum TextMatcher {
    /// `regex=False`: a plain substring search.
    Literal { needle: String, case_sensitive: bool },
    /// The default: a regular expression searched anywhere in the cell.
    Pattern { regex: Regex, case_sensitive: bool },
}

impl TextMatcher {
    pub fn is_match(&self, text: &str) -> bool {
        match self {
            TextMatcher::Literal {
                needle,
                case_sensitive: true,
            } => text.contains(needle.as_str()),
            TextMatcher::Literal { needle, .. } => {
                text.to_lowercase().contains(&needle.to_lowercase())
            }
            TextMatcher::Pattern { regex, .. } => regex.is_match(text),
        }
    }
}

// Compiled patterns compare by their source and flags.
impl PartialEq for TextMatcher {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                TextMatcher::Literal {
                    needle: a,
                    case_sensitive: ca,
                },
                TextMatcher::Literal {
                    needle: b,
                    case_sensitive: cb,
                },
            ) => a == b && ca == cb,
            (
                TextMatcher::Pattern {
                    regex: a,
                    case_sensitive: ca,
                },
                TextMatcher::Pattern {
                    regex: b,
                    case_sensitive: cb,
                },
            ) => a.as_str() == b.as_str() && ca == cb,
            _ => false,
        }
    }
}
