//! Builds the query AST from the pest grammar in `query.pest`.
//!
//! The grammar decides what shapes are accepted; this module resolves column
//! names, checks method names and arguments, and turns every failure into a
//! typed `QueryError`.

use super::{
    ast::{Aggregate, Chain, CmpOp, Predicate, Query, Step, Terminal, TextMatcher},
    Value,
};
use crate::{errors::QueryError, types::CatalogField};
use pest::{error::InputLocation, iterators::Pair, Parser};
use regex::RegexBuilder;
use std::num::NonZeroUsize;

#[derive(pest_derive::Parser)]
#[grammar = "query/query.pest"]
pub struct QueryParser;

/// Longest expression accepted, in bytes.
pub const MAX_EXPRESSION_LEN: usize = 4096;

/// Deepest bracket or negation nesting accepted.
pub const MAX_NESTING: usize = 64;

const PEST_CALL_LIMIT: usize = 200_000;
const REGEX_SIZE_LIMIT: usize = 1 << 20;
const DEFAULT_HEAD_ROWS: usize = 5;

/// Parses an expression into its AST.
pub fn parse(input: &str) -> Result<Query, QueryError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(QueryError::Syntax("empty expression".to_string()));
    }
    if input.len() > MAX_EXPRESSION_LEN {
        return Err(QueryError::Syntax(format!(
            "expression is too long ({} bytes, limit {MAX_EXPRESSION_LEN})",
            input.len()
        )));
    }
    check_nesting(input)?;

    pest::set_call_limit(NonZeroUsize::new(PEST_CALL_LIMIT));
    let mut pairs = QueryParser::parse(Rule::query, input).map_err(syntax_error)?;
    let root = pairs
        .next()
        .and_then(|query| query.into_inner().next())
        .ok_or_else(|| QueryError::Syntax("empty expression".to_string()))?;
    build_query(root)
}

/// Rejects inputs whose nesting would make parsing or evaluation recurse too deep.
/// Quoted text is skipped.
fn check_nesting(input: &str) -> Result<(), QueryError> {
    let mut depth = 0usize;
    let mut negations = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for c in input.chars() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            '~' => negations += 1,
            _ => {}
        }
        if depth > MAX_NESTING || negations > MAX_NESTING {
            return Err(QueryError::Syntax("expression nested too deeply".to_string()));
        }
    }
    Ok(())
}

fn syntax_error(error: pest::error::Error<Rule>) -> QueryError {
    let position = match error.location {
        InputLocation::Pos(pos) => pos,
        InputLocation::Span((start, _)) => start,
    };
    QueryError::Syntax(format!("{} at position {position}", error.variant.message()))
}

fn malformed(rule: Rule) -> QueryError {
    QueryError::Syntax(format!("malformed {rule:?}"))
}

fn first_inner(pair: Pair<'_, Rule>) -> Result<Pair<'_, Rule>, QueryError> {
    let rule = pair.as_rule();
    pair.into_inner().next().ok_or_else(|| malformed(rule))
}

fn build_query(pair: Pair<'_, Rule>) -> Result<Query, QueryError> {
    match pair.as_rule() {
        Rule::len_call => Ok(Query::Len(Box::new(build_query(first_inner(pair)?)?))),
        Rule::chain => Ok(Query::Chain(build_chain(pair)?)),
        other => Err(malformed(other)),
    }
}

fn build_chain(pair: Pair<'_, Rule>) -> Result<Chain, QueryError> {
    let mut chain = Chain::default();

    for member in pair.into_inner() {
        if member.as_rule() == Rule::frame {
            continue;
        }
        if chain.terminal.is_some() {
            return Err(QueryError::Syntax(format!(
                "unexpected '{}' after a final operation",
                member.as_str()
            )));
        }
        match member.as_rule() {
            Rule::subscript => chain.steps.push(build_subscript(first_inner(member)?)?),
            Rule::loc => build_loc(member, &mut chain.steps)?,
            Rule::iloc => chain.steps.push(Step::Row(build_integer(first_inner(member)?)?)),
            Rule::shape => {
                let axis = build_integer(first_inner(member)?)?;
                if !(0..=1).contains(&axis) {
                    return Err(QueryError::Execution(format!(
                        "tuple index {axis} out of range"
                    )));
                }
                chain.terminal = Some(Terminal::Shape(axis as usize));
            }
            Rule::method_call => build_method(member, &mut chain)?,
            Rule::attribute => {
                let name = first_inner(member)?.as_str();
                let field = CatalogField::from_display_name(name).ok_or_else(|| {
                    QueryError::Syntax(format!("unsupported attribute or method '{name}'"))
                })?;
                chain.steps.push(Step::Series(field));
            }
            other => return Err(malformed(other)),
        }
    }

    Ok(chain)
}

fn build_subscript(inner: Pair<'_, Rule>) -> Result<Step, QueryError> {
    match inner.as_rule() {
        Rule::column_list => Ok(Step::Columns(build_column_list(inner)?)),
        Rule::string => Ok(Step::Series(resolve_field(&build_string(inner)?)?)),
        Rule::predicate => Ok(Step::Filter(build_predicate(inner)?)),
        other => Err(malformed(other)),
    }
}

fn build_column_list(pair: Pair<'_, Rule>) -> Result<Vec<CatalogField>, QueryError> {
    pair.into_inner()
        .map(|name| resolve_field(&build_string(name)?))
        .collect()
}

fn build_loc(pair: Pair<'_, Rule>, steps: &mut Vec<Step>) -> Result<(), QueryError> {
    let mut inner = pair.into_inner();
    let predicate = inner.next().ok_or_else(|| malformed(Rule::loc))?;
    steps.push(Step::Filter(build_predicate(predicate)?));
    if let Some(columns) = inner.next() {
        steps.push(build_subscript(columns)?);
    }
    Ok(())
}

fn build_method(pair: Pair<'_, Rule>, chain: &mut Chain) -> Result<(), QueryError> {
    let mut inner = pair.into_inner();
    let name = inner
        .next()
        .ok_or_else(|| malformed(Rule::method_call))?
        .as_str();
    let argument = inner.next().map(build_integer).transpose()?;

    match name {
        "head" | "tail" => {
            let rows = match argument {
                None => DEFAULT_HEAD_ROWS,
                Some(n) => usize::try_from(n).map_err(|_| {
                    QueryError::Execution(format!("{name}() needs a non-negative row count"))
                })?,
            };
            chain.steps.push(if name == "head" {
                Step::Head(rows)
            } else {
                Step::Tail(rows)
            });
        }
        "count" | "unique" | "nunique" | "tolist" | "to_list" | "min" | "max" | "sum" => {
            if argument.is_some() {
                return Err(QueryError::Syntax(format!("{name}() takes no arguments")));
            }
            chain.terminal = Some(match name {
                "count" => Terminal::Count,
                "unique" => Terminal::Unique,
                "nunique" => Terminal::NUnique,
                "min" => Terminal::Aggregate(Aggregate::Min),
                "max" => Terminal::Aggregate(Aggregate::Max),
                "sum" => Terminal::Aggregate(Aggregate::Sum),
                _ => Terminal::ToList,
            });
        }
        other => {
            return Err(QueryError::Syntax(format!(
                "unsupported attribute or method '{other}'"
            )))
        }
    }
    Ok(())
}

// --- Predicates ---

fn build_predicate(pair: Pair<'_, Rule>) -> Result<Predicate, QueryError> {
    match pair.as_rule() {
        Rule::predicate => fold(pair, Predicate::Or),
        Rule::conjunction => fold(pair, Predicate::And),
        Rule::negation => Ok(Predicate::Not(Box::new(build_predicate(first_inner(pair)?)?))),
        Rule::group => build_predicate(first_inner(pair)?),
        Rule::comparison => build_comparison(pair),
        other => Err(malformed(other)),
    }
}

/// Combines the operands of `a | b | c` (or `&`) left to right.
fn fold(
    pair: Pair<'_, Rule>,
    combine: fn(Box<Predicate>, Box<Predicate>) -> Predicate,
) -> Result<Predicate, QueryError> {
    let rule = pair.as_rule();
    let mut operands = pair.into_inner();
    let first = operands.next().ok_or_else(|| malformed(rule))?;
    let mut combined = build_predicate(first)?;
    for operand in operands {
        combined = combine(Box::new(combined), Box::new(build_predicate(operand)?));
    }
    Ok(combined)
}

fn build_comparison(pair: Pair<'_, Rule>) -> Result<Predicate, QueryError> {
    let mut inner = pair.into_inner();
    let field = build_column_ref(inner.next().ok_or_else(|| malformed(Rule::comparison))?)?;
    let test = inner.next().ok_or_else(|| malformed(Rule::comparison))?;

    match test.as_rule() {
        Rule::compare => {
            let mut parts = test.into_inner();
            let op = parts
                .next()
                .and_then(|op| CmpOp::from_symbol(op.as_str()))
                .ok_or_else(|| malformed(Rule::compare))?;
            let value = build_literal(parts.next().ok_or_else(|| malformed(Rule::compare))?)?;
            Ok(Predicate::Compare { field, op, value })
        }
        Rule::str_method => build_str_method(field, test),
        Rule::isin => Ok(Predicate::IsIn {
            field,
            values: test.into_inner().map(build_literal).collect::<Result<_, _>>()?,
        }),
        other => Err(malformed(other)),
    }
}

fn build_column_ref(pair: Pair<'_, Rule>) -> Result<CatalogField, QueryError> {
    let name = pair
        .into_inner()
        .find(|p| p.as_rule() != Rule::frame)
        .ok_or_else(|| malformed(Rule::column_ref))?;
    match name.as_rule() {
        Rule::string => resolve_field(&build_string(name)?),
        _ => resolve_field(name.as_str()),
    }
}

fn build_str_method(field: CatalogField, pair: Pair<'_, Rule>) -> Result<Predicate, QueryError> {
    let mut inner = pair.into_inner();
    let method = inner
        .next()
        .ok_or_else(|| malformed(Rule::str_method))?
        .as_str()
        .to_string();
    let pattern = build_string(inner.next().ok_or_else(|| malformed(Rule::str_method))?)?;

    let mut case_sensitive = true;
    let mut regex = true;
    for kwarg in inner {
        let mut parts = kwarg.into_inner();
        let key = parts.next().ok_or_else(|| malformed(Rule::kwarg))?.as_str();
        let flag = parts.next().ok_or_else(|| malformed(Rule::kwarg))?.as_str() == "True";
        match (method.as_str(), key) {
            ("contains", "case") => case_sensitive = flag,
            ("contains", "regex") => regex = flag,
            (_, "na") => {}
            (method, other) => {
                return Err(QueryError::Syntax(format!(
                    "unsupported keyword argument '{other}' for {method}()"
                )))
            }
        }
    }

    match method.as_str() {
        "contains" => {
            let matcher = if regex {
                let compiled = RegexBuilder::new(&pattern)
                    .case_insensitive(!case_sensitive)
                    .size_limit(REGEX_SIZE_LIMIT)
                    .build()
                    .map_err(|e| {
                        QueryError::Syntax(format!("invalid pattern '{pattern}': {e}"))
                    })?;
                TextMatcher::Pattern {
                    regex: compiled,
                    case_sensitive,
                }
            } else {
                TextMatcher::Literal {
                    needle: pattern,
                    case_sensitive,
                }
            };
            Ok(Predicate::Contains { field, matcher })
        }
        "startswith" => Ok(Predicate::StartsWith {
            field,
            prefix: pattern,
        }),
        other => Err(QueryError::Syntax(format!(
            "unsupported string method '{other}'"
        ))),
    }
}

// --- Terminals ---

fn build_literal(pair: Pair<'_, Rule>) -> Result<Value, QueryError> {
    let inner = first_inner(pair)?;
    match inner.as_rule() {
        Rule::string => Ok(Value::Text(build_string(inner)?)),
        Rule::none => Ok(Value::Null),
        Rule::number => {
            let text = inner.as_str();
            match text.parse::<i64>() {
                Ok(n) => Ok(Value::Integer(n)),
                Err(_) => text
                    .parse::<f64>()
                    .map(Value::Real)
                    .map_err(|_| QueryError::Syntax(format!("invalid number '{text}'"))),
            }
        }
        other => Err(malformed(other)),
    }
}

fn build_integer(pair: Pair<'_, Rule>) -> Result<i64, QueryError> {
    let text = pair.as_str();
    text.parse()
        .map_err(|_| QueryError::Syntax(format!("invalid integer '{text}'")))
}

fn build_string(pair: Pair<'_, Rule>) -> Result<String, QueryError> {
    Ok(unescape(first_inner(pair)?.as_str()))
}

fn unescape(raw: &str) -> String {
    let mut text = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            text.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => text.push('\n'),
            Some('t') => text.push('\t'),
            Some(other) => text.push(other),
            None => text.push('\\'),
        }
    }
    text
}

fn resolve_field(name: &str) -> Result<CatalogField, QueryError> {
    CatalogField::from_display_name(name).ok_or_else(|| QueryError::UnknownField(name.to_string()))
}
