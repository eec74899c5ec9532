//! The deferred query object.
//!
//! Parameters are normalized when an `ItemSearch` is built; the catalog is only scanned on
//! first demand, and the outcome (match set or error) is kept for the life of the object.

use super::cursor::ItemCursor;
use super::exec;
use super::functions::FunctionRegistry;
use super::types::{Parameters, SearchParams};
use crate::catalog::{CatalogSource, ItemCollection};
use crate::config::SearchConfig;
use crate::errors::Result;
use crate::table::ItemTable;
use once_cell::sync::OnceCell;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

pub struct ItemSearch {
    table: Arc<ItemTable>,
    parameters: Parameters,
    functions: FunctionRegistry,
    config: SearchConfig,
    result: OnceCell<Result<Arc<ItemTable>>>,
    evaluations: AtomicUsize,
}

impl ItemSearch {
    /// Normalizes `params` and materializes `source` with the default configuration.
    ///
    /// # Errors
    /// Returns `SearchError::Parameter` for malformed parameters (checked before the source is
    /// materialized) or a materialization error.
    pub fn new(source: impl Into<CatalogSource>, params: &SearchParams) -> Result<Self> {
        Self::with_config(source, params, SearchConfig::default())
    }

    /// # Errors
    /// See [`ItemSearch::new`].
    pub fn with_config(
        source: impl Into<CatalogSource>,
        params: &SearchParams,
        config: SearchConfig,
    ) -> Result<Self> {
        let parameters = Parameters::from_params(params)?;
        let table = source.into().into_table()?;
        log::debug!("search over {} records with {:?}", table.len(), parameters.to_map());
        Ok(Self {
            table,
            parameters,
            functions: FunctionRegistry::default(),
            config,
            result: OnceCell::new(),
            evaluations: AtomicUsize::new(0),
        })
    }

    /// Replaces the extension functions available to the filter.
    #[must_use]
    pub fn with_functions(mut self, functions: FunctionRegistry) -> Self {
        self.functions = functions;
        self.result = OnceCell::new();
        self
    }

    #[must_use]
    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    #[must_use]
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// The full table the search runs against.
    #[must_use]
    pub fn source(&self) -> &Arc<ItemTable> {
        &self.table
    }

    /// How many times the evaluator has run; never more than one.
    #[must_use]
    pub fn evaluations(&self) -> usize {
        self.evaluations.load(Ordering::SeqCst)
    }

    fn evaluate(&self) -> Result<Arc<ItemTable>> {
        self.result
            .get_or_init(|| {
                self.evaluations.fetch_add(1, Ordering::SeqCst);
                exec::execute(&self.table, &self.parameters, &self.functions, &self.config)
                    .map(Arc::new)
            })
            .clone()
    }

    /// # Errors
    /// Returns the (cached) evaluation error.
    pub fn matched(&self) -> Result<usize> {
        Ok(self.evaluate()?.len())
    }

    /// The match set as a table.
    ///
    /// # Errors
    /// Returns the (cached) evaluation error.
    pub fn as_collection(&self) -> Result<Arc<ItemTable>> {
        self.evaluate()
    }

    /// # Errors
    /// Returns the (cached) evaluation error.
    pub fn as_table(&self) -> Result<Arc<ItemTable>> {
        self.evaluate()
    }

    /// A fresh cursor over the cached match set.
    ///
    /// # Errors
    /// Returns the (cached) evaluation error.
    pub fn items(&self) -> Result<ItemCursor> {
        Ok(ItemCursor::new(self.evaluate()?))
    }

    /// # Errors
    /// Returns the (cached) evaluation error.
    pub fn items_as_mappings(&self) -> Result<impl Iterator<Item = serde_json::Value> + use<>> {
        Ok(self.items()?.map(|item| item.to_value()))
    }

    /// # Errors
    /// Returns the (cached) evaluation error.
    pub fn item_collection(&self) -> Result<ItemCollection> {
        Ok(ItemCollection::new(self.items()?.to_vec()))
    }
}

impl std::fmt::Debug for ItemSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemSearch")
            .field("records", &self.table.len())
            .field("parameters", &self.parameters)
            .field("evaluated", &self.result.get().is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SearchError;
    use crate::item::Item;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn items() -> Vec<Item> {
        let dt = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let pt = json!({"type": "Point", "coordinates": [0.0, 0.0]});
        vec![
            Item::new("a", pt.clone(), dt).with_collection("c1"),
            Item::new("b", pt, dt).with_collection("c2"),
        ]
    }

    #[test]
    fn evaluates_once() {
        let s = ItemSearch::new(items(), &SearchParams::new().collections("c1")).unwrap();
        assert_eq!(s.evaluations(), 0);
        assert_eq!(s.matched().unwrap(), 1);
        assert_eq!(s.items().unwrap().count(), 1);
        assert_eq!(s.items().unwrap().count(), 1);
        assert_eq!(s.as_collection().unwrap().len(), 1);
        assert_eq!(s.evaluations(), 1);
    }

    #[test]
    fn errors_are_cached() {
        let s = ItemSearch::new(items(), &SearchParams::new().filter("nope = 1")).unwrap();
        let first = s.matched().unwrap_err();
        assert!(matches!(first, SearchError::AttributeResolution(_)));
        assert_eq!(s.items().unwrap_err(), first);
        assert_eq!(s.evaluations(), 1);
    }

    #[test]
    fn parameters_checked_before_materializing() {
        let dup = vec![items()[0].clone(), items()[0].clone()];
        let err = ItemSearch::new(dup, &SearchParams::new().datetime("1/2/3")).unwrap_err();
        assert!(matches!(err, SearchError::Parameter(_)));
    }

    #[test]
    fn lenient_attributes() {
        let cfg = SearchConfig { strict_attributes: false, ..SearchConfig::default() };
        let s = ItemSearch::with_config(items(), &SearchParams::new().filter("nope = 1"), cfg).unwrap();
        assert_eq!(s.matched().unwrap(), 0);
    }

    #[test]
    fn custom_functions() {
        let reg = FunctionRegistry::default().with("is_a", |args| match args {
            [crate::query::expr::Value::String(s)] => Ok(crate::query::expr::Value::Bool(s == "a")),
            _ => Ok(crate::query::expr::Value::Bool(false)),
        });
        let s = ItemSearch::new(items(), &SearchParams::new().filter("IS_A(id)"))
            .unwrap()
            .with_functions(reg);
        assert_eq!(s.matched().unwrap(), 1);
    }

    #[test]
    fn search_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ItemSearch>();
    }
}
