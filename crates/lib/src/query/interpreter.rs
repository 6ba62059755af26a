//! Evaluates parsed tabular expressions against a catalog snapshot.

use super::{
    ast::{Aggregate, Chain, CmpOp, Predicate, Query, Step, Terminal},
    QueryOutcome, Table, Value,
};
use crate::{
    errors::QueryError,
    types::{Catalog, CatalogField, CatalogRow},
};
use std::cmp::Ordering;

/// Evaluates `query` over `catalog`.
pub fn evaluate(query: &Query, catalog: &Catalog) -> Result<QueryOutcome, QueryError> {
    match query {
        Query::Chain(chain) => evaluate_chain(chain, catalog),
        Query::Len(inner) => match evaluate(inner, catalog)? {
            QueryOutcome::Table(table) => Ok(scalar_count(table.rows.len())),
            QueryOutcome::List(values) => Ok(scalar_count(values.len())),
            QueryOutcome::Scalar(value) => Err(QueryError::Type(format!(
                "object of type '{}' has no len()",
                value.type_name()
            ))),
        },
    }
}

/// The intermediate selection a chain of steps narrows down.
struct Selection<'a> {
    rows: Vec<&'a CatalogRow>,
    columns: Vec<CatalogField>,
    /// A single column was picked, as with `data['Material']`.
    series: bool,
    /// A single row was picked, as with `data.iloc[0]`.
    single_row: bool,
}

impl<'a> Selection<'a> {
    fn kind(&self) -> &'static str {
        match (self.series, self.single_row) {
            (true, true) => "scalar",
            (true, false) | (false, true) => "Series",
            (false, false) => "DataFrame",
        }
    }

    fn apply(&mut self, step: &Step) -> Result<(), QueryError> {
        if self.series && self.single_row {
            return Err(QueryError::Type(
                "a single value cannot be indexed further".to_string(),
            ));
        }

        match step {
            Step::Filter(predicate) => {
                if self.single_row {
                    return Err(QueryError::Type(
                        "a single row cannot be filtered".to_string(),
                    ));
                }
                check_predicate(predicate)?;
                self.rows.retain(|row| matches(predicate, row));
            }
            Step::Columns(fields) => {
                if self.series {
                    return Err(QueryError::Type(
                        "a single column has no sub-columns".to_string(),
                    ));
                }
                self.require_columns(fields)?;
                self.columns = fields.clone();
            }
            Step::Series(field) => {
                if self.series {
                    return Err(QueryError::Type(format!(
                        "a single column has no column '{}'",
                        field.display_name()
                    )));
                }
                self.require_columns(std::slice::from_ref(field))?;
                self.columns = vec![*field];
                self.series = true;
            }
            Step::Head(n) => {
                self.require_multiple_rows("head")?;
                self.rows.truncate(*n);
            }
            Step::Tail(n) => {
                self.require_multiple_rows("tail")?;
                let skip = self.rows.len().saturating_sub(*n);
                self.rows.drain(..skip);
            }
            Step::Row(position) => {
                self.require_multiple_rows("iloc")?;
                let len = self.rows.len() as i64;
                let index = if *position < 0 {
                    len + position
                } else {
                    *position
                };
                if index < 0 || index >= len {
                    return Err(QueryError::Execution(
                        "single positional indexer is out-of-bounds".to_string(),
                    ));
                }
                self.rows = vec![self.rows[index as usize]];
                self.single_row = true;
            }
        }
        Ok(())
    }

    fn require_columns(&self, fields: &[CatalogField]) -> Result<(), QueryError> {
        match fields.iter().find(|f| !self.columns.contains(f)) {
            Some(missing) => Err(QueryError::UnknownField(
                missing.display_name().to_string(),
            )),
            None => Ok(()),
        }
    }

    fn require_multiple_rows(&self, operation: &str) -> Result<(), QueryError> {
        if self.single_row {
            Err(QueryError::Type(format!(
                "{operation} is not supported on a single row"
            )))
        } else {
            Ok(())
        }
    }

    /// Values of the selected series, in row order.
    fn series_values(&self) -> Vec<Value> {
        let field = self.columns[0];
        self.rows.iter().map(|row| field.value_of(row)).collect()
    }

    fn into_table(self) -> Table {
        let columns = self
            .columns
            .iter()
            .map(|f| f.display_name().to_string())
            .collect();
        let rows = self
            .rows
            .iter()
            .map(|row| self.columns.iter().map(|f| f.value_of(row)).collect())
            .collect();
        Table::new(columns, rows)
    }
}

fn evaluate_chain(chain: &Chain, catalog: &Catalog) -> Result<QueryOutcome, QueryError> {
    let mut selection = Selection {
        rows: catalog.rows().iter().collect(),
        columns: CatalogField::ALL.to_vec(),
        series: false,
        single_row: false,
    };

    for step in &chain.steps {
        selection.apply(step)?;
    }

    match chain.terminal {
        None => Ok(finish(selection)),
        Some(terminal) => apply_terminal(terminal, selection),
    }
}

fn finish(selection: Selection<'_>) -> QueryOutcome {
    if selection.series && selection.single_row {
        let field = selection.columns[0];
        return QueryOutcome::Scalar(field.value_of(selection.rows[0]));
    }
    QueryOutcome::Table(selection.into_table())
}

fn apply_terminal(terminal: Terminal, selection: Selection<'_>) -> Result<QueryOutcome, QueryError> {
    let kind = selection.kind();
    if kind == "scalar" {
        return Err(QueryError::Type(format!(
            "a single value does not support {}",
            terminal_name(terminal)
        )));
    }

    match terminal {
        Terminal::Shape(axis) => {
            let dims = if selection.single_row {
                vec![selection.columns.len()]
            } else if selection.series {
                vec![selection.rows.len()]
            } else {
                vec![selection.rows.len(), selection.columns.len()]
            };
            dims.get(axis).map(|n| scalar_count(*n)).ok_or_else(|| {
                QueryError::Execution(format!("tuple index {axis} out of range"))
            })
        }
        Terminal::Count => {
            if selection.single_row {
                return Ok(scalar_count(selection.columns.len()));
            }
            if selection.series {
                let non_null = selection
                    .series_values()
                    .iter()
                    .filter(|v| !v.is_null())
                    .count();
                return Ok(scalar_count(non_null));
            }
            let rows = selection
                .columns
                .iter()
                .map(|field| {
                    let non_null = selection
                        .rows
                        .iter()
                        .filter(|row| !field.value_of(row).is_null())
                        .count();
                    vec![
                        Value::Text(field.display_name().to_string()),
                        Value::Integer(non_null as i64),
                    ]
                })
                .collect();
            Ok(QueryOutcome::Table(Table::new(
                vec!["Column".to_string(), "Count".to_string()],
                rows,
            )))
        }
        Terminal::Unique => {
            require_series(&selection, terminal)?;
            Ok(QueryOutcome::List(distinct(selection.series_values())))
        }
        Terminal::NUnique => {
            if selection.series {
                return Ok(scalar_count(distinct(selection.series_values()).len()));
            }
            if selection.single_row {
                return Err(unsupported(kind, terminal));
            }
            let rows = selection
                .columns
                .iter()
                .map(|field| {
                    let values = selection.rows.iter().map(|row| field.value_of(row)).collect();
                    vec![
                        Value::Text(field.display_name().to_string()),
                        Value::Integer(distinct(values).len() as i64),
                    ]
                })
                .collect();
            Ok(QueryOutcome::Table(Table::new(
                vec!["Column".to_string(), "Unique Values".to_string()],
                rows,
            )))
        }
        Terminal::ToList => {
            if selection.single_row {
                let row = selection.rows[0];
                return Ok(QueryOutcome::List(
                    selection.columns.iter().map(|f| f.value_of(row)).collect(),
                ));
            }
            require_series(&selection, terminal)?;
            Ok(QueryOutcome::List(selection.series_values()))
        }
        Terminal::Aggregate(aggregate) => {
            require_series(&selection, terminal)?;
            aggregate_series(aggregate, selection.columns[0], selection.series_values())
        }
    }
}

fn require_series(selection: &Selection<'_>, terminal: Terminal) -> Result<(), QueryError> {
    if selection.series && !selection.single_row {
        Ok(())
    } else {
        Err(unsupported(selection.kind(), terminal))
    }
}

fn unsupported(kind: &str, terminal: Terminal) -> QueryError {
    QueryError::Type(format!(
        "'{kind}' object has no attribute '{}'",
        terminal_name(terminal)
    ))
}

fn terminal_name(terminal: Terminal) -> &'static str {
    match terminal {
        Terminal::Shape(_) => "shape",
        Terminal::Count => "count",
        Terminal::Unique => "unique",
        Terminal::NUnique => "nunique",
        Terminal::ToList => "tolist",
        Terminal::Aggregate(aggregate) => aggregate.name(),
    }
}

fn aggregate_series(
    aggregate: Aggregate,
    field: CatalogField,
    values: Vec<Value>,
) -> Result<QueryOutcome, QueryError> {
    let present: Vec<Value> = values.into_iter().filter(|v| !v.is_null()).collect();
    match aggregate {
        Aggregate::Sum => {
            if !field.is_numeric() {
                return Err(QueryError::Type(format!(
                    "sum is only supported on numeric columns, not '{}'",
                    field.display_name()
                )));
            }
            let total = present
                .iter()
                .map(|v| match v {
                    Value::Integer(i) => *i,
                    _ => 0,
                })
                .fold(0i64, i64::saturating_add);
            Ok(QueryOutcome::Scalar(Value::Integer(total)))
        }
        Aggregate::Min | Aggregate::Max => {
            let wanted = if aggregate == Aggregate::Min {
                Ordering::Less
            } else {
                Ordering::Greater
            };
            let best = present.into_iter().reduce(|best, candidate| {
                if candidate.partial_cmp_value(&best) == Some(wanted) {
                    candidate
                } else {
                    best
                }
            });
            Ok(QueryOutcome::Scalar(best.unwrap_or(Value::Null)))
        }
    }
}

fn distinct(values: Vec<Value>) -> Vec<Value> {
    let mut unique: Vec<Value> = Vec::with_capacity(values.len());
    for value in values {
        if !unique.iter().any(|seen| seen.loosely_equals(&value)) {
            unique.push(value);
        }
    }
    unique
}

fn scalar_count(n: usize) -> QueryOutcome {
    QueryOutcome::Scalar(Value::Integer(n as i64))
}

/// Rejects predicates whose operand types can never work, before any row is read,
/// so the same expression fails the same way on an empty catalog.
fn check_predicate(predicate: &Predicate) -> Result<(), QueryError> {
    match predicate {
        Predicate::Compare { field, op, value } => {
            if matches!(op, CmpOp::Eq | CmpOp::Ne) || value.is_null() {
                return Ok(());
            }
            let numeric_literal = matches!(value, Value::Integer(_) | Value::Real(_));
            if field.is_numeric() != numeric_literal {
                let column_type = if field.is_numeric() { "int" } else { "str" };
                return Err(QueryError::Type(format!(
                    "'{}' not supported between instances of '{column_type}' and '{}'",
                    op.symbol(),
                    value.type_name()
                )));
            }
            Ok(())
        }
        Predicate::Contains { field, .. } | Predicate::StartsWith { field, .. } => {
            if field.is_numeric() {
                Err(QueryError::Type(format!(
                    "Can only use .str accessor with string values, not '{}'",
                    field.display_name()
                )))
            } else {
                Ok(())
            }
        }
        Predicate::IsIn { .. } => Ok(()),
        Predicate::Not(inner) => check_predicate(inner),
        Predicate::And(left, right) | Predicate::Or(left, right) => {
            check_predicate(left)?;
            check_predicate(right)
        }
    }
}

fn matches(predicate: &Predicate, row: &CatalogRow) -> bool {
    match predicate {
        Predicate::Compare { field, op, value } => {
            let cell = field.value_of(row);
            match op {
                CmpOp::Eq => cell.loosely_equals(value),
                CmpOp::Ne => !cell.loosely_equals(value),
                _ => match cell.partial_cmp_value(value) {
                    Some(ordering) => match op {
                        CmpOp::Lt => ordering == Ordering::Less,
                        CmpOp::Le => ordering != Ordering::Greater,
                        CmpOp::Gt => ordering == Ordering::Greater,
                        CmpOp::Ge => ordering != Ordering::Less,
                        CmpOp::Eq | CmpOp::Ne => false,
                    },
                    None => false,
                },
            }
        }
        Predicate::Contains { field, matcher } => match field.value_of(row) {
            Value::Text(text) => matcher.is_match(&text),
            _ => false,
        },
        Predicate::StartsWith { field, prefix } => match field.value_of(row) {
            Value::Text(text) => text.starts_with(prefix.as_str()),
            _ => false,
        },
        Predicate::IsIn { field, values } => {
            let cell = field.value_of(row);
            values.iter().any(|v| cell.loosely_equals(v))
        }
        Predicate::Not(inner) => !matches(inner, row),
        Predicate::And(left, right) => matches(left, row) && matches(right, row),
        Predicate::Or(left, right) => matches(left, row) || matches(right, row),
    }
}
