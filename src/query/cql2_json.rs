//! Parser for the JSON CQL2 encoding (`{"op": ..., "args": [...]}` trees).

use super::datetime::{Granularity, Period};
use super::expr::{ArithOp, CompareOp, Expr, Operand, TemporalOp, Value};
use super::types::CQL2_JSON;
use crate::errors::{Result, SearchError};
use crate::geometry::{self, SpatialRelation};
use serde_json::{Map, Value as Json};

fn parse_err(message: impl Into<String>) -> SearchError {
    SearchError::FilterParse { lang: CQL2_JSON.to_string(), message: message.into() }
}

fn op_and_args(obj: &Map<String, Json>) -> Option<(&str, &[Json])> {
    let op = obj.get("op")?.as_str()?;
    let args = obj.get("args").and_then(Json::as_array).map_or(&[][..], Vec::as_slice);
    Some((op, args))
}

fn arity<'a>(op: &str, args: &'a [Json], n: usize) -> Result<&'a [Json]> {
    if args.len() == n {
        Ok(args)
    } else {
        Err(parse_err(format!("{op} expects {n} arguments, got {}", args.len())))
    }
}

/// Parses a boolean expression node.
///
/// # Errors
/// Returns `SearchError::FilterParse` for unrecognized nodes and `SearchError::Geometry` for
/// malformed geometry literals.
pub fn parse(value: &Json) -> Result<Expr> {
    let obj = match value {
        Json::Bool(b) => return Ok(Expr::Bool(*b)),
        Json::Object(obj) => obj,
        other => return Err(parse_err(format!("expected an expression object, found {other}"))),
    };
    let Some((op, args)) = op_and_args(obj) else {
        return Ok(Expr::Predicate(operand(value)?));
    };
    let lower = op.to_ascii_lowercase();
    if let Some(cmp) = CompareOp::from_symbol(&lower) {
        let a = arity(op, args, 2)?;
        return Ok(Expr::Compare { op: cmp, lhs: operand(&a[0])?, rhs: operand(&a[1])? });
    }
    if let Some(rel) = SpatialRelation::from_name(&lower) {
        let a = arity(op, args, 2)?;
        return Ok(Expr::Spatial { op: rel, lhs: operand(&a[0])?, rhs: operand(&a[1])? });
    }
    if let Some(t) = TemporalOp::from_name(&lower) {
        let a = arity(op, args, 2)?;
        return Ok(Expr::Temporal { op: t, lhs: operand(&a[0])?, rhs: operand(&a[1])? });
    }
    Ok(match lower.as_str() {
        "and" | "or" => {
            if args.is_empty() {
                return Err(parse_err(format!("{op} requires at least one argument")));
            }
            let parts = args.iter().map(parse).collect::<Result<Vec<_>>>()?;
            if lower == "and" { Expr::And(parts) } else { Expr::Or(parts) }
        }
        "not" => Expr::Not(Box::new(parse(&arity(op, args, 1)?[0])?)),
        "like" | "ilike" => {
            let a = arity(op, args, 2)?;
            Expr::Like {
                lhs: operand(&a[0])?,
                pattern: operand(&a[1])?,
                negated: false,
                case_insensitive: lower == "ilike",
            }
        }
        "in" => {
            let a = arity(op, args, 2)?;
            let list = a[1]
                .as_array()
                .ok_or_else(|| parse_err("in expects an array as its second argument"))?
                .iter()
                .map(operand)
                .collect::<Result<Vec<_>>>()?;
            Expr::In { lhs: operand(&a[0])?, list, negated: false }
        }
        "between" => {
            let (lhs, low, high) = match args {
                [lhs, Json::Array(range)] if range.len() == 2 => (lhs, &range[0], &range[1]),
                [lhs, low, high] => (lhs, low, high),
                _ => return Err(parse_err("between expects a value and two bounds")),
            };
            Expr::Between { lhs: operand(lhs)?, low: operand(low)?, high: operand(high)?, negated: false }
        }
        "isnull" => Expr::IsNull { operand: operand(&arity(op, args, 1)?[0])?, negated: false },
        _ => Expr::Predicate(operand(value)?),
    })
}

fn timestamp(text: &Json, date: bool) -> Result<Value> {
    let s = text.as_str().ok_or_else(|| parse_err("temporal literal must be a string"))?;
    let p = Period::parse(s).map_err(|e| parse_err(e.to_string()))?;
    if date && p.granularity() != Granularity::Day {
        return Err(parse_err(format!("date literal must be YYYY-MM-DD: {s}")));
    }
    Ok(Value::Timestamp(p.start()))
}

fn interval_bound(v: &Json, is_end: bool) -> Result<Option<chrono::DateTime<chrono::Utc>>> {
    let s = match v {
        Json::String(s) => s.as_str(),
        Json::Object(o) => o
            .get("timestamp")
            .or_else(|| o.get("date"))
            .and_then(Json::as_str)
            .ok_or_else(|| parse_err("interval bound must be a string, timestamp or date"))?,
        _ => return Err(parse_err("interval bound must be a string, timestamp or date")),
    };
    if s.is_empty() || s == ".." {
        return Ok(None);
    }
    let p = Period::parse(s).map_err(|e| parse_err(e.to_string()))?;
    Ok(Some(if is_end { p.end() } else { p.start() }))
}

/// Parses a value node: property reference, literal, geometry, or function/arithmetic call.
fn operand(value: &Json) -> Result<Operand> {
    let obj = match value {
        Json::Null => return Ok(Operand::Literal(Value::Null)),
        Json::Bool(b) => return Ok(Operand::Literal(Value::Bool(*b))),
        Json::Number(n) => {
            let n = n.as_f64().ok_or_else(|| parse_err(format!("number out of range: {n}")))?;
            return Ok(Operand::Literal(Value::Number(n)));
        }
        Json::String(s) => return Ok(Operand::Literal(Value::String(s.clone()))),
        Json::Array(items) => {
            let list = items
                .iter()
                .map(|i| match operand(i)? {
                    Operand::Literal(v) => Ok(v),
                    _ => Err(parse_err("array literals may only contain literal values")),
                })
                .collect::<Result<Vec<_>>>()?;
            return Ok(Operand::Literal(Value::List(list)));
        }
        Json::Object(obj) => obj,
    };
    if let Some(p) = obj.get("property") {
        let name = p.as_str().ok_or_else(|| parse_err("property name must be a string"))?;
        return Ok(Operand::Property(name.to_string()));
    }
    if let Some(t) = obj.get("timestamp") {
        return Ok(Operand::Literal(timestamp(t, false)?));
    }
    if let Some(d) = obj.get("date") {
        return Ok(Operand::Literal(timestamp(d, true)?));
    }
    if let Some(i) = obj.get("interval") {
        let bounds = i
            .as_array()
            .filter(|b| b.len() == 2)
            .ok_or_else(|| parse_err("interval must be a two-element array"))?;
        return Ok(Operand::Literal(Value::Interval(
            interval_bound(&bounds[0], false)?,
            interval_bound(&bounds[1], true)?,
        )));
    }
    if let Some(b) = obj.get("bbox") {
        let coords = b
            .as_array()
            .ok_or_else(|| parse_err("bbox must be an array"))?
            .iter()
            .map(|c| c.as_f64().ok_or_else(|| parse_err("bbox members must be numbers")))
            .collect::<Result<Vec<_>>>()?;
        return Ok(Operand::Literal(Value::Geometry(geometry::bbox_geometry(&coords)?)));
    }
    if geometry::is_geojson_geometry(obj) {
        return Ok(Operand::Literal(Value::Geometry(geometry::from_geojson(value)?)));
    }
    if let Some((op, args)) = op_and_args(obj) {
        let arith = match op {
            "+" => Some(ArithOp::Add),
            "-" => Some(ArithOp::Sub),
            "*" => Some(ArithOp::Mul),
            "/" => Some(ArithOp::Div),
            _ => None,
        };
        if let Some(arith) = arith {
            let a = arity(op, args, 2)?;
            return Ok(Operand::Arithmetic {
                op: arith,
                lhs: Box::new(operand(&a[0])?),
                rhs: Box::new(operand(&a[1])?),
            });
        }
        let args = args.iter().map(operand).collect::<Result<Vec<_>>>()?;
        return Ok(Operand::Function { name: op.to_string(), args });
    }
    Err(parse_err(format!("unrecognized value node: {value}")))
}
