use super::expr::{ArithOp, CompareOp, Expr, Operand, TemporalOp, Value};
use super::functions::FunctionRegistry;
use super::types::Instant;
use crate::errors::{Result, SearchError};
use crate::item::parse_instant;
use crate::table::{ItemTable, Record};
use regex::{Regex, RegexBuilder};
use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Ensures every property the expression reads is a column of the table.
///
/// # Errors
/// Returns `SearchError::AttributeResolution` for the first unknown property when `strict`.
pub fn check_attributes(expr: &Expr, table: &ItemTable, strict: bool) -> Result<()> {
    for name in expr.properties() {
        if table.has_column(name) {
            continue;
        }
        if strict {
            return Err(SearchError::AttributeResolution(format!(
                "{name} is not an attribute of the item table"
            )));
        }
        log::debug!("filter property {name} is not a column; evaluating as null");
    }
    Ok(())
}

/// Evaluates parsed expressions against records.
pub struct Evaluator<'a> {
    functions: &'a FunctionRegistry,
    patterns: RefCell<HashMap<(String, bool), Regex>>,
}

fn resolve(record: &Record, name: &str) -> Value {
    match name {
        "id" => Value::String(record.id.clone()),
        "collection" => record.collection.clone().map_or(Value::Null, Value::String),
        "geometry" => record.geometry.clone().map_or(Value::Null, Value::Geometry),
        "datetime" => Value::Timestamp(record.datetime),
        _ => record.properties.get(name).map_or(Value::Null, Value::from_json),
    }
}

fn as_instant(v: &Value) -> Option<Instant> {
    match v {
        Value::Timestamp(t) => Some(*t),
        Value::String(s) => parse_instant(s),
        _ => None,
    }
}

/// Ordering between two values; `None` when either is null or they are not comparable.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.partial_cmp(y),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Timestamp(_), Value::String(_)) | (Value::String(_), Value::Timestamp(_)) => {
            Some(as_instant(a)?.cmp(&as_instant(b)?))
        }
        (Value::Timestamp(x), Value::Timestamp(y)) => Some(x.cmp(y)),
        (Value::Geometry(x), Value::Geometry(y)) => (x == y).then_some(Ordering::Equal),
        _ => None,
    }
}

fn like_regex(pattern: &str) -> String {
    let mut out = String::from("(?s)^");
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '%' => out.push_str(".*"),
            '_' => out.push('.'),
            '\\' => {
                if let Some(next) = chars.next() {
                    out.push_str(&regex::escape(&next.to_string()));
                }
            }
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out.push('$');
    out
}

type Span = (Option<Instant>, Option<Instant>);

fn as_span(v: &Value) -> Result<Option<Span>> {
    Ok(match v {
        Value::Null => None,
        Value::Interval(s, e) => Some((*s, *e)),
        other => {
            let t = as_instant(other).ok_or_else(|| {
                SearchError::Evaluation(format!(
                    "temporal predicate expects a timestamp or interval, got {}",
                    other.type_name()
                ))
            })?;
            Some((Some(t), Some(t)))
        }
    })
}

fn spans_intersect(a: Span, b: Span) -> bool {
    let starts_before_end = |s: Option<Instant>, e: Option<Instant>| match (s, e) {
        (Some(s), Some(e)) => s <= e,
        _ => true,
    };
    starts_before_end(a.0, b.1) && starts_before_end(b.0, a.1)
}

impl<'a> Evaluator<'a> {
    #[must_use]
    pub fn new(functions: &'a FunctionRegistry) -> Self {
        Self { functions, patterns: RefCell::new(HashMap::new()) }
    }

    /// # Errors
    /// Returns `SearchError::Evaluation` for type errors, `SearchError::UnknownFunction` for
    /// unregistered functions.
    pub fn matches(&self, expr: &Expr, record: &Record) -> Result<bool> {
        match expr {
            Expr::Bool(b) => Ok(*b),
            Expr::And(xs) => {
                for x in xs {
                    if !self.matches(x, record)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Expr::Or(xs) => {
                for x in xs {
                    if self.matches(x, record)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Expr::Not(x) => Ok(!self.matches(x, record)?),
            Expr::Compare { op, lhs, rhs } => {
                let ord = compare_values(&self.operand(lhs, record)?, &self.operand(rhs, record)?);
                Ok(ord.is_some_and(|o| match op {
                    CompareOp::Eq => o == Ordering::Equal,
                    CompareOp::Ne => o != Ordering::Equal,
                    CompareOp::Lt => o == Ordering::Less,
                    CompareOp::Le => o != Ordering::Greater,
                    CompareOp::Gt => o == Ordering::Greater,
                    CompareOp::Ge => o != Ordering::Less,
                }))
            }
            Expr::Like { lhs, pattern, negated, case_insensitive } => {
                let (Value::String(s), Value::String(p)) =
                    (self.operand(lhs, record)?, self.operand(pattern, record)?)
                else {
                    return Ok(false);
                };
                Ok(self.like(&s, &p, *case_insensitive)? != *negated)
            }
            Expr::In { lhs, list, negated } => {
                let v = self.operand(lhs, record)?;
                if v == Value::Null {
                    return Ok(false);
                }
                let mut found = false;
                for item in list {
                    let candidate = self.operand(item, record)?;
                    let hit = match &candidate {
                        Value::List(values) => values
                            .iter()
                            .any(|c| compare_values(&v, c) == Some(Ordering::Equal)),
                        c => compare_values(&v, c) == Some(Ordering::Equal),
                    };
                    if hit {
                        found = true;
                        break;
                    }
                }
                Ok(found != *negated)
            }
            Expr::Between { lhs, low, high, negated } => {
                let v = self.operand(lhs, record)?;
                let lo = compare_values(&v, &self.operand(low, record)?);
                let hi = compare_values(&v, &self.operand(high, record)?);
                match (lo, hi) {
                    (Some(lo), Some(hi)) => {
                        Ok((lo != Ordering::Less && hi != Ordering::Greater) != *negated)
                    }
                    _ => Ok(false),
                }
            }
            Expr::IsNull { operand, negated } => {
                Ok((self.operand(operand, record)? == Value::Null) != *negated)
            }
            Expr::Spatial { op, lhs, rhs } => {
                match (self.operand(lhs, record)?, self.operand(rhs, record)?) {
                    (Value::Geometry(a), Value::Geometry(b)) => Ok(op.holds(&a, &b)),
                    (Value::Null, _) | (_, Value::Null) => Ok(false),
                    (a, b) => Err(SearchError::Evaluation(format!(
                        "spatial predicate expects geometries, got {} and {}",
                        a.type_name(),
                        b.type_name()
                    ))),
                }
            }
            Expr::Temporal { op, lhs, rhs } => {
                let (Some(a), Some(b)) =
                    (as_span(&self.operand(lhs, record)?)?, as_span(&self.operand(rhs, record)?)?)
                else {
                    return Ok(false);
                };
                Ok(match op {
                    TemporalOp::Before => matches!((a.1, b.0), (Some(ae), Some(bs)) if ae < bs),
                    TemporalOp::After => matches!((a.0, b.1), (Some(as_), Some(be)) if as_ > be),
                    TemporalOp::Equals => a == b,
                    TemporalOp::Intersects => spans_intersect(a, b),
                    TemporalOp::Disjoint => !spans_intersect(a, b),
                })
            }
            Expr::Predicate(operand) => match self.operand(operand, record)? {
                Value::Bool(b) => Ok(b),
                Value::Null => Ok(false),
                other => Err(SearchError::Evaluation(format!(
                    "expected a boolean condition, got {}",
                    other.type_name()
                ))),
            },
        }
    }

    fn like(&self, s: &str, pattern: &str, case_insensitive: bool) -> Result<bool> {
        let key = (pattern.to_string(), case_insensitive);
        if let Some(re) = self.patterns.borrow().get(&key) {
            return Ok(re.is_match(s));
        }
        let re = RegexBuilder::new(&like_regex(pattern))
            .case_insensitive(case_insensitive)
            .build()
            .map_err(|e| SearchError::Evaluation(format!("invalid LIKE pattern {pattern:?}: {e}")))?;
        let hit = re.is_match(s);
        self.patterns.borrow_mut().insert(key, re);
        Ok(hit)
    }

    fn operand(&self, op: &Operand, record: &Record) -> Result<Value> {
        match op {
            Operand::Property(name) => Ok(resolve(record, name)),
            Operand::Literal(v) => Ok(v.clone()),
            Operand::Function { name, args } => {
                let values =
                    args.iter().map(|a| self.operand(a, record)).collect::<Result<Vec<_>>>()?;
                if name.eq_ignore_ascii_case("casei") {
                    return match values.as_slice() {
                        [Value::String(s)] => Ok(Value::String(s.to_lowercase())),
                        [Value::Null] => Ok(Value::Null),
                        _ => Err(SearchError::Evaluation("casei expects one string".to_string())),
                    };
                }
                self.functions.call(name, &values)
            }
            Operand::Arithmetic { op, lhs, rhs } => {
                match (self.operand(lhs, record)?, self.operand(rhs, record)?) {
                    (Value::Number(a), Value::Number(b)) => Ok(Value::Number(match op {
                        ArithOp::Add => a + b,
                        ArithOp::Sub => a - b,
                        ArithOp::Mul => a * b,
                        ArithOp::Div => a / b,
                    })),
                    (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
                    (a, b) => Err(SearchError::Evaluation(format!(
                        "arithmetic on {} and {}",
                        a.type_name(),
                        b.type_name()
                    ))),
                }
            }
            Operand::Negate(inner) => match self.operand(inner, record)? {
                Value::Number(n) => Ok(Value::Number(-n)),
                Value::Null => Ok(Value::Null),
                other => Err(SearchError::Evaluation(format!("cannot negate {}", other.type_name()))),
            },
        }
    }
}
