// Telemetry is a submodule of query
pub mod telemetry;

// Submodules for separation of concerns
pub mod cql2_json;
mod cql2_lex;
pub mod cql2_text;
mod cursor;
pub mod datetime;
mod eval;
mod exec;
pub mod expr;
mod functions;
mod params;
mod parse;
mod search;
mod types;

// Public API re-exports
pub use cursor::ItemCursor;
pub use eval::{Evaluator, check_attributes, compare_values};
pub use exec::execute;
pub use functions::{ExtensionFn, FunctionRegistry};
pub use params::{
    normalize_bbox, normalize_collections, normalize_datetime, normalize_filter_lang,
    normalize_ids, normalize_intersects,
};
pub use parse::{ParseFn, parse_filter, parser_for, supported_languages};
pub use search::ItemSearch;
pub use types::{
    BBoxLike, CQL2_JSON, CQL2_TEXT, DatetimeComponent, DatetimeLike, DatetimeRange, FilterLike,
    Instant, IntersectsLike, ListLike, Parameters, SearchParams,
};
