//! Recursive-descent parser for the textual CQL2 encoding, over tokens from [`super::cql2_lex`].

use super::cql2_lex::{Tok, Token, tokenize};
use super::datetime::{Granularity, Period};
use super::expr::{ArithOp, CompareOp, Expr, Operand, TemporalOp, Value};
use super::types::CQL2_TEXT;
use crate::errors::{Result, SearchError};
use crate::geometry::{self, SpatialRelation};

const WKT_KEYWORDS: [&str; 7] = [
    "POINT",
    "LINESTRING",
    "POLYGON",
    "MULTIPOINT",
    "MULTILINESTRING",
    "MULTIPOLYGON",
    "GEOMETRYCOLLECTION",
];

/// Keywords that continue a condition after its left operand.
const CONTINUATIONS: [&str; 6] = ["LIKE", "ILIKE", "IN", "BETWEEN", "IS", "NOT"];

fn parse_err(message: impl Into<String>) -> SearchError {
    SearchError::FilterParse { lang: CQL2_TEXT.to_string(), message: message.into() }
}

/// Deepest nesting a filter may use.
const MAX_DEPTH: usize = 64;

struct Parser<'a> {
    src: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    /// Runs `f` one nesting level deeper, failing once `MAX_DEPTH` is reached.
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth >= MAX_DEPTH {
            return Err(parse_err("expression nested too deeply"));
        }
        self.depth += 1;
        let out = f(self);
        self.depth -= 1;
        out
    }

    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos).map(|t| &t.tok)
    }

    fn peek_at(&self, offset: usize) -> Option<&Tok> {
        self.tokens.get(self.pos + offset).map(|t| &t.tok)
    }

    fn is_kw(tok: Option<&Tok>, kw: &str) -> bool {
        matches!(tok, Some(Tok::Ident(s)) if s.eq_ignore_ascii_case(kw))
    }

    fn peek_kw(&self, kw: &str) -> bool {
        Self::is_kw(self.peek(), kw)
    }

    fn peek_sym(&self, sym: &str) -> bool {
        matches!(self.peek(), Some(Tok::Sym(s)) if *s == sym)
    }

    fn eat_kw(&mut self, kw: &str) -> bool {
        let hit = self.peek_kw(kw);
        if hit {
            self.pos += 1;
        }
        hit
    }

    fn eat_sym(&mut self, sym: &str) -> bool {
        let hit = self.peek_sym(sym);
        if hit {
            self.pos += 1;
        }
        hit
    }

    fn expect_sym(&mut self, sym: &str) -> Result<()> {
        if self.eat_sym(sym) {
            Ok(())
        } else {
            Err(parse_err(format!("expected {sym:?}, found {}", self.describe())))
        }
    }

    fn expect_kw(&mut self, kw: &str) -> Result<()> {
        if self.eat_kw(kw) {
            Ok(())
        } else {
            Err(parse_err(format!("expected {kw}, found {}", self.describe())))
        }
    }

    fn describe(&self) -> String {
        match self.peek() {
            None => "end of input".to_string(),
            Some(Tok::Ident(s) | Tok::Quoted(s)) => format!("{s:?}"),
            Some(Tok::Str(s)) => format!("'{s}'"),
            Some(Tok::Num(n)) => n.to_string(),
            Some(Tok::Sym(s)) => format!("{s:?}"),
        }
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut terms = vec![self.parse_and()?];
        while self.eat_kw("OR") {
            terms.push(self.parse_and()?);
        }
        Ok(if terms.len() == 1 { terms.remove(0) } else { Expr::Or(terms) })
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut terms = vec![self.parse_not()?];
        while self.eat_kw("AND") {
            terms.push(self.parse_not()?);
        }
        Ok(if terms.len() == 1 { terms.remove(0) } else { Expr::And(terms) })
    }

    fn parse_not(&mut self) -> Result<Expr> {
        if self.eat_kw("NOT") {
            return Ok(Expr::Not(Box::new(self.nested(Self::parse_not)?)));
        }
        self.parse_condition()
    }

    fn continues_operand(&self) -> bool {
        match self.peek() {
            Some(Tok::Sym(s)) => *s != ")" && *s != ",",
            tok => CONTINUATIONS.iter().any(|kw| Self::is_kw(tok, kw)),
        }
    }

    fn parse_condition(&mut self) -> Result<Expr> {
        if self.peek_sym("(") {
            let saved = self.pos;
            self.pos += 1;
            if let Ok(inner) = self.nested(Self::parse_or) {
                if self.eat_sym(")") && !self.continues_operand() {
                    return Ok(inner);
                }
            }
            self.pos = saved;
        }

        if let (Some(Tok::Ident(name)), Some(Tok::Sym("("))) = (self.peek(), self.peek_at(1)) {
            let name = name.clone();
            if let Some(op) = SpatialRelation::from_name(&name) {
                let (lhs, rhs) = self.parse_binary_call()?;
                return Ok(Expr::Spatial { op, lhs, rhs });
            }
            if let Some(op) = TemporalOp::from_name(&name) {
                let (lhs, rhs) = self.parse_binary_call()?;
                return Ok(Expr::Temporal { op, lhs, rhs });
            }
        }

        let lhs = self.parse_operand()?;
        let negated = self.peek_kw("NOT")
            && ["LIKE", "ILIKE", "IN", "BETWEEN"].iter().any(|kw| Self::is_kw(self.peek_at(1), kw));
        if negated {
            self.pos += 1;
        }

        if let Some(Tok::Sym(s)) = self.peek() {
            if let Some(op) = CompareOp::from_symbol(s) {
                self.pos += 1;
                let rhs = self.parse_operand()?;
                return Ok(Expr::Compare { op, lhs, rhs });
            }
        }
        if self.peek_kw("LIKE") || self.peek_kw("ILIKE") {
            let case_insensitive = self.peek_kw("ILIKE");
            self.pos += 1;
            let pattern = self.parse_operand()?;
            return Ok(Expr::Like { lhs, pattern, negated, case_insensitive });
        }
        if self.eat_kw("IN") {
            self.expect_sym("(")?;
            let mut list = vec![self.parse_operand()?];
            while self.eat_sym(",") {
                list.push(self.parse_operand()?);
            }
            self.expect_sym(")")?;
            return Ok(Expr::In { lhs, list, negated });
        }
        if self.eat_kw("BETWEEN") {
            let low = self.parse_operand()?;
            self.expect_kw("AND")?;
            let high = self.parse_operand()?;
            return Ok(Expr::Between { lhs, low, high, negated });
        }
        if self.eat_kw("IS") {
            let negated = self.eat_kw("NOT");
            self.expect_kw("NULL")?;
            return Ok(Expr::IsNull { operand: lhs, negated });
        }
        Ok(match lhs {
            Operand::Literal(Value::Bool(b)) => Expr::Bool(b),
            other => Expr::Predicate(other),
        })
    }

    fn parse_binary_call(&mut self) -> Result<(Operand, Operand)> {
        let name = self.describe();
        self.pos += 1;
        self.expect_sym("(")?;
        let lhs = self.parse_operand()?;
        self.expect_sym(",")?;
        let rhs = self.parse_operand()?;
        self.expect_sym(")")
            .map_err(|_| parse_err(format!("{name} takes exactly two arguments")))?;
        Ok((lhs, rhs))
    }

    fn parse_operand(&mut self) -> Result<Operand> {
        let mut lhs = self.parse_term()?;
        loop {
            let op = if self.eat_sym("+") {
                ArithOp::Add
            } else if self.eat_sym("-") {
                ArithOp::Sub
            } else {
                return Ok(lhs);
            };
            let rhs = self.parse_term()?;
            lhs = Operand::Arithmetic { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
    }

    fn parse_term(&mut self) -> Result<Operand> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = if self.eat_sym("*") {
                ArithOp::Mul
            } else if self.eat_sym("/") {
                ArithOp::Div
            } else {
                return Ok(lhs);
            };
            let rhs = self.parse_unary()?;
            lhs = Operand::Arithmetic { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
    }

    fn parse_unary(&mut self) -> Result<Operand> {
        if self.eat_sym("-") {
            return Ok(match self.nested(Self::parse_unary)? {
                Operand::Literal(Value::Number(n)) => Operand::Literal(Value::Number(-n)),
                other => Operand::Negate(Box::new(other)),
            });
        }
        if self.eat_sym("+") {
            return self.nested(Self::parse_unary);
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Operand> {
        let Some(tok) = self.peek().cloned() else {
            return Err(parse_err("unexpected end of input"));
        };
        match tok {
            Tok::Num(n) => {
                self.pos += 1;
                Ok(Operand::Literal(Value::Number(n)))
            }
            Tok::Str(s) => {
                self.pos += 1;
                Ok(Operand::Literal(Value::String(s)))
            }
            Tok::Quoted(s) => {
                self.pos += 1;
                Ok(Operand::Property(s))
            }
            Tok::Sym("(") => {
                self.pos += 1;
                let inner = self.nested(Self::parse_operand)?;
                self.expect_sym(")")?;
                Ok(inner)
            }
            Tok::Sym(s) => Err(parse_err(format!("unexpected {s:?}"))),
            Tok::Ident(name) => self.parse_identifier(&name),
        }
    }

    fn parse_identifier(&mut self, name: &str) -> Result<Operand> {
        let upper = name.to_ascii_uppercase();
        let called = matches!(self.peek_at(1), Some(Tok::Sym("(")));
        match upper.as_str() {
            "TRUE" | "FALSE" => {
                self.pos += 1;
                return Ok(Operand::Literal(Value::Bool(upper == "TRUE")));
            }
            "NULL" => {
                self.pos += 1;
                return Ok(Operand::Literal(Value::Null));
            }
            "TIMESTAMP" | "DATE" if called => {
                self.pos += 2;
                let text = self.expect_string()?;
                self.expect_sym(")")?;
                let period = Period::parse(&text).map_err(|e| parse_err(e.to_string()))?;
                if upper == "DATE" && period.granularity() != Granularity::Day {
                    return Err(parse_err(format!("DATE literal must be YYYY-MM-DD: {text}")));
                }
                return Ok(Operand::Literal(Value::Timestamp(period.start())));
            }
            "INTERVAL" if called => {
                self.pos += 2;
                let start = self.expect_string()?;
                self.expect_sym(",")?;
                let end = self.expect_string()?;
                self.expect_sym(")")?;
                return Ok(Operand::Literal(interval(&start, &end)?));
            }
            "BBOX" if called => {
                self.pos += 2;
                let mut coords = vec![self.expect_number()?];
                while self.eat_sym(",") {
                    coords.push(self.expect_number()?);
                }
                self.expect_sym(")")?;
                return Ok(Operand::Literal(Value::Geometry(geometry::bbox_geometry(&coords)?)));
            }
            _ => {}
        }
        if WKT_KEYWORDS.contains(&upper.as_str()) {
            return self.parse_wkt();
        }
        self.pos += 1;
        if !called {
            return Ok(Operand::Property(name.to_string()));
        }
        self.pos += 1;
        let args = self.nested(|p| {
            let mut args = Vec::new();
            if !p.eat_sym(")") {
                args.push(p.parse_operand()?);
                while p.eat_sym(",") {
                    args.push(p.parse_operand()?);
                }
                p.expect_sym(")")?;
            }
            Ok(args)
        })?;
        Ok(Operand::Function { name: name.to_string(), args })
    }

    fn expect_string(&mut self) -> Result<String> {
        match self.peek().cloned() {
            Some(Tok::Str(s)) => {
                self.pos += 1;
                Ok(s)
            }
            _ => Err(parse_err(format!("expected a string literal, found {}", self.describe()))),
        }
    }

    fn expect_number(&mut self) -> Result<f64> {
        let sign = if self.eat_sym("-") { -1.0 } else { 1.0 };
        match self.peek() {
            Some(Tok::Num(n)) => {
                let n = *n;
                self.pos += 1;
                Ok(sign * n)
            }
            _ => Err(parse_err(format!("expected a number, found {}", self.describe()))),
        }
    }

    /// Captures the raw text of a WKT literal up to its balancing parenthesis.
    fn parse_wkt(&mut self) -> Result<Operand> {
        let start = self.tokens[self.pos].start;
        self.pos += 1;
        if ["Z", "M", "ZM"].iter().any(|d| self.peek_kw(d)) {
            self.pos += 1;
        }
        let end = if self.peek_kw("EMPTY") {
            self.pos += 1;
            self.tokens[self.pos - 1].end
        } else {
            self.expect_sym("(")?;
            let mut depth = 1usize;
            while depth > 0 {
                let Some(t) = self.tokens.get(self.pos) else {
                    return Err(parse_err("unbalanced parentheses in geometry literal"));
                };
                match t.tok {
                    Tok::Sym("(") => depth += 1,
                    Tok::Sym(")") => depth -= 1,
                    _ => {}
                }
                self.pos += 1;
            }
            self.tokens[self.pos - 1].end
        };
        let geom = geometry::parse_wkt(&self.src[start..end])?;
        Ok(Operand::Literal(Value::Geometry(geom)))
    }
}

fn interval(start: &str, end: &str) -> Result<Value> {
    let bound = |s: &str, is_end: bool| -> Result<_> {
        if s.is_empty() || s == ".." {
            return Ok(None);
        }
        let p = Period::parse(s).map_err(|e| parse_err(e.to_string()))?;
        Ok(Some(if is_end { p.end() } else { p.start() }))
    };
    Ok(Value::Interval(bound(start, false)?, bound(end, true)?))
}

/// Parses a `cql2-text` expression.
///
/// # Errors
/// Returns `SearchError::FilterParse` for syntax errors and `SearchError::Geometry` for
/// malformed geometry literals.
pub fn parse(text: &str) -> Result<Expr> {
    let tokens = tokenize(text)?;
    if tokens.is_empty() {
        return Err(parse_err("empty expression"));
    }
    let mut p = Parser { src: text, tokens, pos: 0, depth: 0 };
    let expr = p.parse_or()?;
    if p.pos < p.tokens.len() {
        return Err(parse_err(format!("unexpected trailing input: {}", p.describe())));
    }
    Ok(expr)
}
