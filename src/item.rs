use crate::errors::{Result, SearchError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const STAC_VERSION: &str = "1.0.0";

fn feature_type() -> String {
    "Feature".to_string()
}

fn default_stac_version() -> String {
    STAC_VERSION.to_string()
}

/// A single catalog item (a GeoJSON Feature with STAC fields).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Item {
    #[serde(rename = "type", default = "feature_type")]
    pub kind: String,
    #[serde(default = "default_stac_version")]
    pub stac_version: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stac_extensions: Vec<String>,
    pub id: String,
    pub geometry: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<Vec<f64>>,
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(default)]
    pub links: Vec<Value>,
    #[serde(default)]
    pub assets: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
}

impl Item {
    pub fn new(id: impl Into<String>, geometry: Value, datetime: DateTime<Utc>) -> Self {
        let mut properties = Map::new();
        properties.insert("datetime".to_string(), Value::String(format_instant(&datetime)));
        Self {
            kind: feature_type(),
            stac_version: default_stac_version(),
            stac_extensions: Vec::new(),
            id: id.into(),
            geometry,
            bbox: None,
            properties,
            links: Vec::new(),
            assets: Map::new(),
            collection: None,
        }
    }

    #[must_use]
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// # Errors
    /// Returns `SearchError::Json` if the text is not an item.
    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// The representative timestamp: `datetime`, or `start_datetime` when `datetime` is null.
    ///
    /// # Errors
    /// Returns `SearchError::Catalog` when neither is a valid RFC 3339 timestamp.
    pub fn datetime(&self) -> Result<DateTime<Utc>> {
        let raw = match self.properties.get("datetime") {
            Some(Value::String(s)) => s.as_str(),
            _ => self
                .properties
                .get("start_datetime")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    SearchError::Catalog(format!("item {} has no datetime or start_datetime", self.id))
                })?,
        };
        parse_instant(raw).ok_or_else(|| {
            SearchError::Catalog(format!("item {} has an invalid datetime: {raw}", self.id))
        })
    }

    /// Renders the item as a plain key/value mapping.
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[must_use]
pub fn parse_instant(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s).ok().map(|d| d.with_timezone(&Utc))
}

#[must_use]
pub fn format_instant(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn point() -> Value {
        json!({"type": "Point", "coordinates": [0.0, 0.0]})
    }

    #[test]
    fn datetime_round_trips_through_properties() {
        let dt = Utc.with_ymd_and_hms(2020, 5, 1, 12, 0, 0).unwrap();
        let item = Item::new("a", point(), dt);
        assert_eq!(item.properties["datetime"], json!("2020-05-01T12:00:00Z"));
        assert_eq!(item.datetime().unwrap(), dt);
    }

    #[test]
    fn null_datetime_falls_back_to_start() {
        let item = Item::from_json_str(
            r#"{"id":"r","geometry":null,"properties":{"datetime":null,
                "start_datetime":"2021-01-01T00:00:00Z","end_datetime":"2021-02-01T00:00:00Z"}}"#,
        )
        .unwrap();
        assert_eq!(item.datetime().unwrap(), Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(item.kind, "Feature");
    }

    #[test]
    fn missing_datetime_is_catalog_error() {
        let item = Item::from_json_str(r#"{"id":"x","geometry":null,"properties":{}}"#).unwrap();
        assert!(matches!(item.datetime(), Err(SearchError::Catalog(_))));
    }

    #[test]
    fn to_value_skips_absent_collection() {
        let dt = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let v = Item::new("a", point(), dt).to_value();
        assert!(v.get("collection").is_none());
        assert_eq!(v["type"], "Feature");
        let v = Item::new("a", point(), dt).with_collection("c").to_value();
        assert_eq!(v["collection"], "c");
    }
}
