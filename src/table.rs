//! Tabular representation of a catalog: one `Record` per item plus the table's column set.

use crate::errors::{Result, SearchError};
use crate::geometry;
use crate::item::Item;
use chrono::{DateTime, Utc};
use geo_types::Geometry;
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashSet};

/// Columns every table has regardless of item properties.
pub const CORE_COLUMNS: [&str; 4] = ["id", "collection", "geometry", "datetime"];

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: String,
    pub collection: Option<String>,
    /// `None` for items with a null geometry; those never match spatial filters.
    pub geometry: Option<Geometry<f64>>,
    pub datetime: DateTime<Utc>,
    pub properties: Map<String, Value>,
    stac_version: String,
    stac_extensions: Vec<String>,
    bbox: Option<Vec<f64>>,
    links: Vec<Value>,
    assets: Map<String, Value>,
}

impl Record {
    /// # Errors
    /// Returns `SearchError::Catalog` for an invalid timestamp or a malformed geometry.
    pub fn from_item(item: Item) -> Result<Self> {
        let datetime = item.datetime()?;
        let geometry = match &item.geometry {
            Value::Null => None,
            g => Some(geometry::from_geojson(g).map_err(|e| {
                SearchError::Catalog(format!("item {} has an invalid geometry: {e}", item.id))
            })?),
        };
        Ok(Self {
            id: item.id,
            collection: item.collection,
            geometry,
            datetime,
            properties: item.properties,
            stac_version: item.stac_version,
            stac_extensions: item.stac_extensions,
            bbox: item.bbox,
            links: item.links,
            assets: item.assets,
        })
    }

    /// Reconstructs the catalog item this record was built from.
    #[must_use]
    pub fn to_item(&self) -> Item {
        let geometry_value = self.geometry.as_ref().map_or(Value::Null, geometry::to_geojson);
        let bbox = self.bbox.clone().or_else(|| self.geometry.as_ref().and_then(geometry::bounds));
        Item {
            kind: "Feature".to_string(),
            stac_version: self.stac_version.clone(),
            stac_extensions: self.stac_extensions.clone(),
            id: self.id.clone(),
            geometry: geometry_value,
            bbox,
            properties: self.properties.clone(),
            links: self.links.clone(),
            assets: self.assets.clone(),
            collection: self.collection.clone(),
        }
    }
}

/// An ordered, immutable table of records with unique identifiers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemTable {
    records: Vec<Record>,
    columns: BTreeSet<String>,
}

impl ItemTable {
    /// # Errors
    /// Returns `SearchError::Catalog` when two records share an identifier.
    pub fn new(records: Vec<Record>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(records.len());
        for r in &records {
            if !seen.insert(r.id.as_str()) {
                return Err(SearchError::Catalog(format!("duplicate item id: {}", r.id)));
            }
        }
        let mut columns: BTreeSet<String> = CORE_COLUMNS.iter().map(|c| (*c).to_string()).collect();
        for r in &records {
            columns.extend(r.properties.keys().cloned());
        }
        Ok(Self { records, columns })
    }

    /// # Errors
    /// Fails if any item cannot be converted or identifiers repeat.
    pub fn from_items(items: impl IntoIterator<Item = Item>) -> Result<Self> {
        let records = items.into_iter().map(Record::from_item).collect::<Result<Vec<_>>>()?;
        Self::new(records)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Record> {
        self.records.iter().find(|r| r.id == id)
    }

    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains(name)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }

    /// A new table holding the given rows in order. The column set is kept, as a subset of a
    /// frame keeps its columns even when no remaining row has a value in them.
    #[must_use]
    pub fn select(&self, rows: &[usize]) -> Self {
        Self {
            records: rows.iter().filter_map(|&i| self.records.get(i).cloned()).collect(),
            columns: self.columns.clone(),
        }
    }

    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.id.as_str()).collect()
    }

    /// Distinct collection tags in first-seen order.
    #[must_use]
    pub fn collections(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.records
            .iter()
            .filter_map(|r| r.collection.as_deref())
            .filter(|c| seen.insert(*c))
            .collect()
    }

    #[must_use]
    pub fn to_items(&self) -> Vec<Item> {
        self.records.iter().map(Record::to_item).collect()
    }
}

impl<'a> IntoIterator for &'a ItemTable {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;
    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
