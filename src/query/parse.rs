use super::expr::Expr;
use super::types::{CQL2_JSON, CQL2_TEXT, FilterLike};
use super::{cql2_json, cql2_text};
use crate::errors::{Result, SearchError};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::LazyLock;

pub type ParseFn = fn(&FilterLike) -> Result<Expr>;

fn parse_text(filter: &FilterLike) -> Result<Expr> {
    match filter {
        FilterLike::Text(s) | FilterLike::Json(Value::String(s)) => cql2_text::parse(s),
        FilterLike::Json(other) => Err(SearchError::FilterParse {
            lang: CQL2_TEXT.to_string(),
            message: format!("expected expression text, found JSON {other}"),
        }),
    }
}

fn parse_json(filter: &FilterLike) -> Result<Expr> {
    match filter {
        FilterLike::Text(s) | FilterLike::Json(Value::String(s)) => {
            let value: Value = serde_json::from_str(s).map_err(|e| SearchError::FilterParse {
                lang: CQL2_JSON.to_string(),
                message: format!("filter text is not JSON: {e}"),
            })?;
            cql2_json::parse(&value)
        }
        FilterLike::Json(v) => cql2_json::parse(v),
    }
}

static PARSERS: LazyLock<HashMap<&'static str, ParseFn>> = LazyLock::new(|| {
    let mut m: HashMap<&'static str, ParseFn> = HashMap::new();
    m.insert(CQL2_TEXT, parse_text);
    m.insert(CQL2_JSON, parse_json);
    m
});

/// Looks up the parser registered for an exact language tag.
#[must_use]
pub fn parser_for(lang: &str) -> Option<ParseFn> {
    PARSERS.get(lang).copied()
}

#[must_use]
pub fn supported_languages() -> Vec<&'static str> {
    let mut langs: Vec<_> = PARSERS.keys().copied().collect();
    langs.sort_unstable();
    langs
}

/// Parses a filter in the given language.
///
/// # Errors
/// Returns `SearchError::UnsupportedFilterLanguage` when the language is absent or unknown,
/// otherwise whatever the language's parser reports.
pub fn parse_filter(filter: &FilterLike, lang: Option<&str>) -> Result<Expr> {
    let lang = lang.ok_or_else(|| {
        SearchError::UnsupportedFilterLanguage("no filter language given or inferable".to_string())
    })?;
    let parser = parser_for(lang).ok_or_else(|| {
        SearchError::UnsupportedFilterLanguage(format!(
            "{lang} (supported: {})",
            supported_languages().join(", ")
        ))
    })?;
    parser(filter)
}
