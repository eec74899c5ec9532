//! CQL2 text lexer built on winnow.
//!
//! Produces [`Token`] values carrying byte spans into the source, so the parser can hand the raw
//! text of a WKT literal to the geometry reader. Stops at the first lexical error.

use winnow::ascii::{digit0, digit1};
use winnow::combinator::{alt, opt};
use winnow::stream::Location;
use winnow::token::{any, one_of, take_till, take_while};
use winnow::{LocatingSlice, ModalResult, Parser};

use super::types::CQL2_TEXT;
use crate::errors::{Result, SearchError};

/// Input type for the lexer - tracks position for spans.
type Input<'a> = LocatingSlice<&'a str>;

#[derive(Debug, Clone, PartialEq)]
pub(super) enum Tok {
    /// Bare word: property, keyword or function name.
    Ident(String),
    /// Double-quoted property name.
    Quoted(String),
    /// Single-quoted character literal.
    Str(String),
    Num(f64),
    Sym(&'static str),
}

#[derive(Debug, Clone)]
pub(super) struct Token {
    pub tok: Tok,
    pub start: usize,
    pub end: usize,
}

/// Tokenize a CQL2 text expression.
pub(super) fn tokenize(src: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut input = LocatingSlice::new(src);

    loop {
        skip_ws(&mut input);
        if input.is_empty() {
            break;
        }
        let start = input.current_token_start();
        match next_token(&mut input) {
            Ok(tok) => {
                let end = input.current_token_start();
                tokens.push(Token { tok, start, end });
            }
            Err(_) => return Err(lex_error(src, start)),
        }
    }

    Ok(tokens)
}

fn lex_error(src: &str, position: usize) -> SearchError {
    let bad = src.get(position..).and_then(|s| s.chars().next()).unwrap_or('?');
    let message = if bad == '\'' || bad == '"' {
        format!("unterminated literal starting at {position}")
    } else {
        format!("unexpected character {bad:?} at {position}")
    };
    SearchError::FilterParse { lang: CQL2_TEXT.to_string(), message }
}

fn skip_ws(input: &mut Input<'_>) {
    let _: ModalResult<&str> = take_while(0.., |c: char| c.is_ascii_whitespace()).parse_next(input);
}

fn next_token(input: &mut Input<'_>) -> ModalResult<Tok> {
    alt((
        // Quoted text
        character_literal,
        quoted_identifier,
        number,
        identifier,
        // Two-char comparisons before their one-char prefixes
        comparison,
        punctuation,
    ))
    .parse_next(input)
}

/// `'...'` with `''` standing for one quote.
fn character_literal(input: &mut Input<'_>) -> ModalResult<Tok> {
    quoted_text(input, '\'').map(Tok::Str)
}

/// `"..."` with `""` standing for one quote.
fn quoted_identifier(input: &mut Input<'_>) -> ModalResult<Tok> {
    quoted_text(input, '"').map(Tok::Quoted)
}

fn quoted_text(input: &mut Input<'_>, quote: char) -> ModalResult<String> {
    one_of(quote).parse_next(input)?;
    let mut result = String::new();
    loop {
        let chunk: &str = take_till(0.., |c: char| c == quote).parse_next(input)?;
        result.push_str(chunk);
        one_of(quote).parse_next(input)?;
        if opt(one_of(quote)).parse_next(input)?.is_some() {
            result.push(quote);
        } else {
            break;
        }
    }
    Ok(result)
}

/// Unsigned decimal with optional exponent. A leading sign is a separate token.
fn number(input: &mut Input<'_>) -> ModalResult<Tok> {
    (
        alt(((digit1, opt(('.', digit0))).void(), ('.', digit1).void())),
        opt((one_of(['e', 'E']), opt(one_of(['+', '-'])), digit1)),
    )
        .take()
        .try_map(|s: &str| s.parse::<f64>())
        .map(Tok::Num)
        .parse_next(input)
}

/// Bare words may carry `:` and `.`, as in `eo:cloud_cover` or `view.sun_elevation`.
fn identifier(input: &mut Input<'_>) -> ModalResult<Tok> {
    (
        one_of(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(0.., |c: char| c.is_ascii_alphanumeric() || matches!(c, '_' | ':' | '.')),
    )
        .take()
        .map(|s: &str| Tok::Ident(s.to_string()))
        .parse_next(input)
}

fn comparison(input: &mut Input<'_>) -> ModalResult<Tok> {
    alt((
        "<=".value(Tok::Sym("<=")),
        ">=".value(Tok::Sym(">=")),
        "<>".value(Tok::Sym("<>")),
        "!=".value(Tok::Sym("!=")),
    ))
    .parse_next(input)
}

fn punctuation(input: &mut Input<'_>) -> ModalResult<Tok> {
    any.verify_map(|c| match c {
        '=' => Some(Tok::Sym("=")),
        '<' => Some(Tok::Sym("<")),
        '>' => Some(Tok::Sym(">")),
        '+' => Some(Tok::Sym("+")),
        '-' => Some(Tok::Sym("-")),
        '*' => Some(Tok::Sym("*")),
        '/' => Some(Tok::Sym("/")),
        '(' => Some(Tok::Sym("(")),
        ')' => Some(Tok::Sym(")")),
        ',' => Some(Tok::Sym(",")),
        _ => None,
    })
    .parse_next(input)
}
