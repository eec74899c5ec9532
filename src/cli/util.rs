use super::runner::OutputMode;
use crate::query::{FilterLike, SearchParams};

pub fn parse_format_input(s: Option<&str>) -> Option<String> {
    s.map(str::to_lowercase)
}

pub fn parse_output_mode(s: Option<&str>) -> OutputMode {
    match parse_format_input(s).as_deref() {
        Some("json" | "ndjson" | "jsonl") => OutputMode::Json,
        Some("plain") => OutputMode::Plain,
        _ => OutputMode::Human,
    }
}

/// Builds search parameters from command-line text; a JSON-looking filter is passed as JSON.
pub fn search_params(
    ids: Option<String>,
    collections: Option<String>,
    bbox: Option<String>,
    intersects: Option<String>,
    datetime: Option<String>,
    filter: Option<String>,
    filter_lang: Option<String>,
) -> SearchParams {
    let mut p = SearchParams::new();
    p.ids = ids.map(Into::into);
    p.collections = collections.map(Into::into);
    p.bbox = bbox.map(Into::into);
    p.intersects = intersects.map(Into::into);
    p.datetime = datetime.map(Into::into);
    p.filter = filter.map(|f| {
        if f.trim_start().starts_with('{') {
            serde_json::from_str(&f).map_or(FilterLike::Text(f), FilterLike::Json)
        } else {
            FilterLike::Text(f)
        }
    });
    p.filter_lang = filter_lang;
    p
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn output_mode_parsing() {
        assert_eq!(parse_output_mode(Some("JSON")), OutputMode::Json);
        assert_eq!(parse_output_mode(Some("jsonl")), OutputMode::Json);
        assert_eq!(parse_output_mode(Some("plain")), OutputMode::Plain);
        assert_eq!(parse_output_mode(None), OutputMode::Human);
    }

    #[test]
    fn json_filters_detected() {
        let p = search_params(None, None, None, None, None, Some(r#"{"op":"=","args":[1,1]}"#.into()), None);
        assert_eq!(p.filter, Some(FilterLike::Json(json!({"op": "=", "args": [1, 1]}))));
        let p = search_params(None, None, None, None, None, Some("id = 'a'".into()), None);
        assert_eq!(p.filter, Some(FilterLike::Text("id = 'a'".into())));
    }
}
