//! # Query Results and the Tabular Expression Language
//!
//! This module holds the result types shared by every query backend and the
//! allow-listed DataFrame-style expression language used by the tabular backend.
//! Expressions are parsed by a pest grammar into an AST and evaluated by a dedicated
//! interpreter; nothing is ever handed to a general-purpose evaluator.

pub mod ast;
pub mod interpreter;
pub mod parser;

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// The query language a backend understands and the grounding prompt advertises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryDialect {
    /// DataFrame-style expressions over a frame named `data`.
    Tabular,
    /// Read-only SQL over the mirrored `catalog` table.
    Sql,
}

impl QueryDialect {
    pub fn language(self) -> &'static str {
        match self {
            QueryDialect::Tabular => "DataFrame expression",
            QueryDialect::Sql => "SQL",
        }
    }
}

/// A single cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Real(f) => Some(*f),
            _ => None,
        }
    }

    /// Orders two values of compatible types. Numbers compare with numbers and
    /// text with text; any other pairing has no order.
    pub fn partial_cmp_value(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => None,
            },
        }
    }

    /// Equality with numeric widening, so `73181510 == 73181510.0` holds.
    pub fn loosely_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Text(a), Value::Text(b)) => a == b,
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NoneType",
            Value::Integer(_) => "int",
            Value::Real(_) => "float",
            Value::Text(_) => "str",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("None"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Real(r) => write!(f, "{r}"),
            Value::Text(s) => f.write_str(s),
        }
    }
}

/// A small result table with named columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.rows.is_empty() {
            return f.write_str(NO_MATCHES);
        }

        let rendered: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| row.iter().map(ToString::to_string).collect())
            .collect();

        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.chars().count()).collect();
        for row in &rendered {
            for (i, cell) in row.iter().enumerate() {
                if let Some(w) = widths.get_mut(i) {
                    *w = (*w).max(cell.chars().count());
                }
            }
        }

        let format_line = |cells: &[String]| -> String {
            cells
                .iter()
                .zip(widths.iter())
                .map(|(cell, width)| format!("{cell:<width$}"))
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        };

        let mut lines = Vec::with_capacity(rendered.len() + 1);
        lines.push(format_line(&self.columns));
        for row in &rendered {
            lines.push(format_line(row));
        }
        f.write_str(&lines.join("\n"))
    }
}

const NO_MATCHES: &str = "No matching records found.";

/// The successful result of executing a query expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum QueryOutcome {
    Scalar(Value),
    List(Vec<Value>),
    Table(Table),
}

impl fmt::Display for QueryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryOutcome::Scalar(value) => write!(f, "{value}"),
            QueryOutcome::List(values) if values.is_empty() => f.write_str(NO_MATCHES),
            QueryOutcome::List(values) => {
                let items: Vec<String> = values.iter().map(ToString::to_string).collect();
                f.write_str(&items.join(", "))
            }
            QueryOutcome::Table(table) => write!(f, "{table}"),
        }
    }
}
