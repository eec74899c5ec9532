pub mod catalog;
pub mod cli;
pub mod config;
pub mod errors;
pub mod geometry;
pub mod item;
pub mod query;
pub mod table;
pub mod utils;

pub use catalog::{Catalog, CatalogSource, ItemCollection, Materialize};
pub use config::SearchConfig;
pub use errors::{Result, SearchError};
pub use item::Item;
pub use query::{ItemSearch, SearchParams};
pub use table::{ItemTable, Record};

/// Builds a deferred item search over `source`.
///
/// Parameters are normalized immediately; the catalog is evaluated on first access to the
/// results.
///
/// # Errors
/// Returns `SearchError::Parameter` for malformed parameters or a materialization error.
pub fn search(source: impl Into<CatalogSource>, params: &SearchParams) -> Result<ItemSearch> {
    ItemSearch::new(source, params)
}

/// Initializes logging from the `STAC_STATIC_LOG_*` environment variables.
///
/// # Errors
/// Returns an error if the logger cannot be installed.
pub fn init() -> std::result::Result<(), Box<dyn std::error::Error>> {
    utils::logger::configure_from_env()?;
    Ok(())
}
