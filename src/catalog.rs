//! Catalog trees and their materialization into an `ItemTable`.

use crate::errors::{Result, SearchError};
use crate::item::Item;
use crate::table::ItemTable;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogKind {
    Catalog,
    Collection,
}

/// An in-memory catalog or collection with nested children and direct items.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    pub id: String,
    pub kind: CatalogKind,
    pub description: Option<String>,
    pub children: Vec<Catalog>,
    pub items: Vec<Item>,
}

impl Catalog {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: CatalogKind::Catalog,
            description: None,
            children: Vec::new(),
            items: Vec::new(),
        }
    }

    pub fn collection(id: impl Into<String>) -> Self {
        Self { kind: CatalogKind::Collection, ..Self::new(id) }
    }

    #[must_use]
    pub fn with_child(mut self, child: Catalog) -> Self {
        self.children.push(child);
        self
    }

    /// Adds an item; items added to a collection without a collection tag receive its id.
    #[must_use]
    pub fn with_item(mut self, mut item: Item) -> Self {
        if self.kind == CatalogKind::Collection && item.collection.is_none() {
            item.collection = Some(self.id.clone());
        }
        self.items.push(item);
        self
    }

    /// Every item in the tree: own items first, then each child's in link order.
    #[must_use]
    pub fn all_items(&self) -> Vec<Item> {
        let mut out = Vec::new();
        self.collect_items(&mut out);
        out
    }

    fn collect_items(&self, out: &mut Vec<Item>) {
        out.extend(self.items.iter().cloned());
        for child in &self.children {
            child.collect_items(out);
        }
    }

    /// Reads a catalog or collection JSON file and follows its `child` and `item` links.
    ///
    /// # Errors
    /// Returns `SearchError::Io`/`Json` for unreadable files and `SearchError::Catalog` for
    /// documents that are not catalogs, remote links, items that fail to parse, or a `child`
    /// link that leads back to one of its own ancestors.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::read_tree(path.as_ref(), &mut HashSet::new())
    }

    /// `ancestors` holds the canonical paths of the catalogs above `path`.
    fn read_tree(path: &Path, ancestors: &mut HashSet<PathBuf>) -> Result<Self> {
        log::debug!("reading catalog {}", path.display());
        let canonical = std::fs::canonicalize(path)
            .map_err(|e| SearchError::Io(format!("{}: {e}", path.display())))?;
        if !ancestors.insert(canonical.clone()) {
            return Err(SearchError::Catalog(format!("child link cycle at {}", path.display())));
        }
        let catalog = Self::read_document(path, ancestors);
        ancestors.remove(&canonical);
        catalog
    }

    fn read_document(path: &Path, ancestors: &mut HashSet<PathBuf>) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| SearchError::Io(format!("{}: {e}", path.display())))?;
        let doc: Value = serde_json::from_str(&text)?;
        let kind = match doc.get("type").and_then(Value::as_str) {
            Some("Catalog") => CatalogKind::Catalog,
            Some("Collection") => CatalogKind::Collection,
            other => {
                return Err(SearchError::Catalog(format!(
                    "{} is not a catalog or collection (type {other:?})",
                    path.display()
                )));
            }
        };
        let id = doc
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| SearchError::Catalog(format!("{} has no id", path.display())))?;
        let mut catalog = Self {
            kind,
            description: doc.get("description").and_then(Value::as_str).map(str::to_string),
            ..Self::new(id)
        };

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let links = doc.get("links").and_then(Value::as_array).map_or(&[][..], Vec::as_slice);
        for link in links {
            let rel = link.get("rel").and_then(Value::as_str).unwrap_or_default();
            if rel != "child" && rel != "item" {
                continue;
            }
            let href = link
                .get("href")
                .and_then(Value::as_str)
                .ok_or_else(|| SearchError::Catalog(format!("{rel} link without href in {id}")))?;
            let target = resolve_href(base, href)?;
            if rel == "child" {
                catalog = catalog.with_child(Self::read_tree(&target, ancestors)?);
            } else {
                let item_text = std::fs::read_to_string(&target)
                    .map_err(|e| SearchError::Io(format!("{}: {e}", target.display())))?;
                let item = Item::from_json_str(&item_text).map_err(|e| {
                    SearchError::Catalog(format!("invalid item {}: {e}", target.display()))
                })?;
                catalog = catalog.with_item(item);
            }
        }
        Ok(catalog)
    }
}

fn resolve_href(base: &Path, href: &str) -> Result<PathBuf> {
    if href.starts_with("http://") || href.starts_with("https://") {
        return Err(SearchError::Catalog(format!("remote links are not followed: {href}")));
    }
    let href = href.strip_prefix("file://").unwrap_or(href);
    let p = Path::new(href);
    Ok(if p.is_absolute() { p.to_path_buf() } else { base.join(p) })
}

fn feature_collection() -> String {
    "FeatureCollection".to_string()
}

/// A GeoJSON FeatureCollection of items.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ItemCollection {
    #[serde(rename = "type", default = "feature_collection")]
    pub kind: String,
    #[serde(default)]
    pub features: Vec<Item>,
}

impl ItemCollection {
    pub fn new(features: Vec<Item>) -> Self {
        Self { kind: feature_collection(), features }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// # Errors
    /// Returns `SearchError::Json` if the text is not a FeatureCollection of items.
    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl From<Vec<Item>> for ItemCollection {
    fn from(features: Vec<Item>) -> Self {
        Self::new(features)
    }
}

/// Conversion of catalog-shaped input into a record table.
pub trait Materialize {
    /// # Errors
    /// Fails when an item cannot be represented as a record.
    fn materialize(self) -> Result<ItemTable>;
}

impl Materialize for ItemTable {
    fn materialize(self) -> Result<ItemTable> {
        Ok(self)
    }
}

impl Materialize for Catalog {
    fn materialize(self) -> Result<ItemTable> {
        ItemTable::from_items(self.all_items())
    }
}

impl Materialize for ItemCollection {
    fn materialize(self) -> Result<ItemTable> {
        ItemTable::from_items(self.features)
    }
}

impl Materialize for Vec<Item> {
    fn materialize(self) -> Result<ItemTable> {
        ItemTable::from_items(self)
    }
}

/// The accepted search inputs, resolved to a shared table exactly once.
#[derive(Debug, Clone)]
pub enum CatalogSource {
    Table(Arc<ItemTable>),
    Catalog(Catalog),
    Items(ItemCollection),
}

impl CatalogSource {
    /// # Errors
    /// Propagates materialization failures.
    pub fn into_table(self) -> Result<Arc<ItemTable>> {
        match self {
            Self::Table(t) => Ok(t),
            Self::Catalog(c) => c.materialize().map(Arc::new),
            Self::Items(i) => i.materialize().map(Arc::new),
        }
    }
}

impl From<ItemTable> for CatalogSource {
    fn from(t: ItemTable) -> Self {
        Self::Table(Arc::new(t))
    }
}

impl From<Arc<ItemTable>> for CatalogSource {
    fn from(t: Arc<ItemTable>) -> Self {
        Self::Table(t)
    }
}

impl From<Catalog> for CatalogSource {
    fn from(c: Catalog) -> Self {
        Self::Catalog(c)
    }
}

impl From<ItemCollection> for CatalogSource {
    fn from(i: ItemCollection) -> Self {
        Self::Items(i)
    }
}

impl From<Vec<Item>> for CatalogSource {
    fn from(items: Vec<Item>) -> Self {
        Self::Items(ItemCollection::new(items))
    }
}
