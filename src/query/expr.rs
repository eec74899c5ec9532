//! Parsed filter expressions shared by both expression languages.

use crate::geometry::SpatialRelation;
use chrono::{DateTime, Utc};
use geo_types::Geometry;
use std::collections::BTreeSet;

/// A runtime value produced while evaluating an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Timestamp(DateTime<Utc>),
    /// Closed interval; `None` on either side is unbounded.
    Interval(Option<DateTime<Utc>>, Option<DateTime<Utc>>),
    Geometry(Geometry<f64>),
    List(Vec<Value>),
}

impl Value {
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Timestamp(_) => "timestamp",
            Self::Interval(..) => "interval",
            Self::Geometry(_) => "geometry",
            Self::List(_) => "list",
        }
    }

    /// Converts a JSON attribute value; objects are not comparable and become null.
    #[must_use]
    pub fn from_json(v: &serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null | serde_json::Value::Object(_) => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::Number(n) => n.as_f64().map_or(Self::Null, Self::Number),
            serde_json::Value::String(s) => Self::String(s.clone()),
            serde_json::Value::Array(a) => Self::List(a.iter().map(Self::from_json).collect()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    #[must_use]
    pub fn from_symbol(s: &str) -> Option<Self> {
        Some(match s {
            "=" => Self::Eq,
            "<>" | "!=" => Self::Ne,
            "<" => Self::Lt,
            "<=" => Self::Le,
            ">" => Self::Gt,
            ">=" => Self::Ge,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalOp {
    Before,
    After,
    Equals,
    Intersects,
    Disjoint,
}

impl TemporalOp {
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name.to_ascii_lowercase().as_str() {
            "t_before" => Self::Before,
            "t_after" => Self::After,
            "t_equals" => Self::Equals,
            "t_intersects" => Self::Intersects,
            "t_disjoint" => Self::Disjoint,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Property(String),
    Literal(Value),
    Function { name: String, args: Vec<Operand> },
    Arithmetic { op: ArithOp, lhs: Box<Operand>, rhs: Box<Operand> },
    Negate(Box<Operand>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Bool(bool),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
    Compare { op: CompareOp, lhs: Operand, rhs: Operand },
    Like { lhs: Operand, pattern: Operand, negated: bool, case_insensitive: bool },
    In { lhs: Operand, list: Vec<Operand>, negated: bool },
    Between { lhs: Operand, low: Operand, high: Operand, negated: bool },
    IsNull { operand: Operand, negated: bool },
    Spatial { op: SpatialRelation, lhs: Operand, rhs: Operand },
    Temporal { op: TemporalOp, lhs: Operand, rhs: Operand },
    /// A boolean-valued property or function used directly as a condition.
    Predicate(Operand),
}

impl Operand {
    fn collect_properties<'a>(&'a self, out: &mut BTreeSet<&'a str>) {
        match self {
            Self::Property(p) => {
                out.insert(p.as_str());
            }
            Self::Literal(_) => {}
            Self::Function { args, .. } => args.iter().for_each(|a| a.collect_properties(out)),
            Self::Arithmetic { lhs, rhs, .. } => {
                lhs.collect_properties(out);
                rhs.collect_properties(out);
            }
            Self::Negate(inner) => inner.collect_properties(out),
        }
    }
}

impl Expr {
    /// Names of every property the expression reads.
    #[must_use]
    pub fn properties(&self) -> BTreeSet<&str> {
        let mut out = BTreeSet::new();
        self.collect_properties(&mut out);
        out
    }

    fn collect_properties<'a>(&'a self, out: &mut BTreeSet<&'a str>) {
        match self {
            Self::Bool(_) => {}
            Self::And(xs) | Self::Or(xs) => xs.iter().for_each(|x| x.collect_properties(out)),
            Self::Not(x) => x.collect_properties(out),
            Self::Compare { lhs, rhs, .. }
            | Self::Spatial { lhs, rhs, .. }
            | Self::Temporal { lhs, rhs, .. }
            | Self::Like { lhs, pattern: rhs, .. } => {
                lhs.collect_properties(out);
                rhs.collect_properties(out);
            }
            Self::In { lhs, list, .. } => {
                lhs.collect_properties(out);
                list.iter().for_each(|x| x.collect_properties(out));
            }
            Self::Between { lhs, low, high, .. } => {
                lhs.collect_properties(out);
                low.collect_properties(out);
                high.collect_properties(out);
            }
            Self::IsNull { operand, .. } | Self::Predicate(operand) => {
                operand.collect_properties(out);
            }
        }
    }
}
