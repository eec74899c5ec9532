use crate::geometry::GeoInterface;
use chrono::{DateTime, NaiveDateTime, Utc};
use geo_types::Geometry;
use serde_json::{Map, Value};
use std::fmt;

pub type Instant = DateTime<Utc>;

/// Canonical datetime range; `None` on either side means unbounded.
pub type DatetimeRange = (Option<Instant>, Option<Instant>);

pub const CQL2_TEXT: &str = "cql2-text";
pub const CQL2_JSON: &str = "cql2-json";

/// Comma-separated text or an explicit sequence of strings.
#[derive(Debug, Clone, PartialEq)]
pub enum ListLike {
    Text(String),
    Values(Vec<String>),
}

impl From<&str> for ListLike {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for ListLike {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Vec<String>> for ListLike {
    fn from(v: Vec<String>) -> Self {
        Self::Values(v)
    }
}

impl From<Vec<&str>> for ListLike {
    fn from(v: Vec<&str>) -> Self {
        Self::Values(v.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for ListLike {
    fn from(v: [&str; N]) -> Self {
        Self::Values(v.iter().map(|s| (*s).to_string()).collect())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BBoxLike {
    Text(String),
    Numbers(Vec<f64>),
    /// A JSON array whose members are numbers or numeric strings.
    Json(Value),
}

impl From<&str> for BBoxLike {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for BBoxLike {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Vec<f64>> for BBoxLike {
    fn from(v: Vec<f64>) -> Self {
        Self::Numbers(v)
    }
}

impl<const N: usize> From<[f64; N]> for BBoxLike {
    fn from(v: [f64; N]) -> Self {
        Self::Numbers(v.to_vec())
    }
}

impl From<Value> for BBoxLike {
    fn from(v: Value) -> Self {
        Self::Json(v)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum IntersectsLike {
    Json(Value),
    Text(String),
    Geometry(Geometry<f64>),
}

impl IntersectsLike {
    /// Captures the GeoJSON mapping of any geometry-like object.
    pub fn from_geo_interface(g: &dyn GeoInterface) -> Self {
        Self::Json(g.geo_interface())
    }
}

impl From<Value> for IntersectsLike {
    fn from(v: Value) -> Self {
        Self::Json(v)
    }
}

impl From<Map<String, Value>> for IntersectsLike {
    fn from(m: Map<String, Value>) -> Self {
        Self::Json(Value::Object(m))
    }
}

impl From<&str> for IntersectsLike {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for IntersectsLike {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Geometry<f64>> for IntersectsLike {
    fn from(g: Geometry<f64>) -> Self {
        Self::Geometry(g)
    }
}

impl From<geo_types::Polygon<f64>> for IntersectsLike {
    fn from(p: geo_types::Polygon<f64>) -> Self {
        Self::Geometry(Geometry::Polygon(p))
    }
}

impl From<geo_types::Point<f64>> for IntersectsLike {
    fn from(p: geo_types::Point<f64>) -> Self {
        Self::Geometry(Geometry::Point(p))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DatetimeComponent {
    Text(String),
    Instant(Instant),
}

impl From<&str> for DatetimeComponent {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for DatetimeComponent {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Instant> for DatetimeComponent {
    fn from(d: Instant) -> Self {
        Self::Instant(d)
    }
}

impl From<NaiveDateTime> for DatetimeComponent {
    fn from(d: NaiveDateTime) -> Self {
        Self::Instant(d.and_utc())
    }
}

impl fmt::Display for DatetimeComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Instant(d) => f.write_str(&crate::item::format_instant(d)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DatetimeLike {
    Text(String),
    Instant(Instant),
    /// Explicit components; `None` entries are ignored.
    Components(Vec<Option<DatetimeComponent>>),
}

impl From<&str> for DatetimeLike {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for DatetimeLike {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Instant> for DatetimeLike {
    fn from(d: Instant) -> Self {
        Self::Instant(d)
    }
}

impl From<DateTime<chrono::FixedOffset>> for DatetimeComponent {
    fn from(d: DateTime<chrono::FixedOffset>) -> Self {
        Self::Instant(d.with_timezone(&Utc))
    }
}

impl From<DateTime<chrono::FixedOffset>> for DatetimeLike {
    fn from(d: DateTime<chrono::FixedOffset>) -> Self {
        Self::Instant(d.with_timezone(&Utc))
    }
}

impl From<NaiveDateTime> for DatetimeLike {
    fn from(d: NaiveDateTime) -> Self {
        Self::Instant(d.and_utc())
    }
}

impl From<Vec<Option<DatetimeComponent>>> for DatetimeLike {
    fn from(v: Vec<Option<DatetimeComponent>>) -> Self {
        Self::Components(v)
    }
}

impl From<Vec<DatetimeComponent>> for DatetimeLike {
    fn from(v: Vec<DatetimeComponent>) -> Self {
        Self::Components(v.into_iter().map(Some).collect())
    }
}

impl From<(Option<Instant>, Option<Instant>)> for DatetimeLike {
    fn from((a, b): (Option<Instant>, Option<Instant>)) -> Self {
        Self::Components(vec![
            Some(a.map_or_else(|| DatetimeComponent::Text("..".into()), DatetimeComponent::Instant)),
            Some(b.map_or_else(|| DatetimeComponent::Text("..".into()), DatetimeComponent::Instant)),
        ])
    }
}

impl fmt::Display for DatetimeLike {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Instant(d) => f.write_str(&crate::item::format_instant(d)),
            Self::Components(parts) => {
                let rendered: Vec<String> = parts
                    .iter()
                    .map(|p| p.as_ref().map_or_else(|| "None".to_string(), ToString::to_string))
                    .collect();
                write!(f, "[{}]", rendered.join(", "))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterLike {
    Text(String),
    Json(Value),
}

impl From<&str> for FilterLike {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FilterLike {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Value> for FilterLike {
    fn from(v: Value) -> Self {
        Self::Json(v)
    }
}

impl FilterLike {
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Text(s) => Value::String(s.clone()),
            Self::Json(v) => v.clone(),
        }
    }
}

/// Raw, user-facing search parameters. All are optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchParams {
    pub ids: Option<ListLike>,
    pub collections: Option<ListLike>,
    pub bbox: Option<BBoxLike>,
    pub intersects: Option<IntersectsLike>,
    pub datetime: Option<DatetimeLike>,
    pub filter: Option<FilterLike>,
    pub filter_lang: Option<String>,
}

impl SearchParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn ids(mut self, v: impl Into<ListLike>) -> Self {
        self.ids = Some(v.into());
        self
    }

    #[must_use]
    pub fn collections(mut self, v: impl Into<ListLike>) -> Self {
        self.collections = Some(v.into());
        self
    }

    #[must_use]
    pub fn bbox(mut self, v: impl Into<BBoxLike>) -> Self {
        self.bbox = Some(v.into());
        self
    }

    #[must_use]
    pub fn intersects(mut self, v: impl Into<IntersectsLike>) -> Self {
        self.intersects = Some(v.into());
        self
    }

    #[must_use]
    pub fn datetime(mut self, v: impl Into<DatetimeLike>) -> Self {
        self.datetime = Some(v.into());
        self
    }

    #[must_use]
    pub fn filter(mut self, v: impl Into<FilterLike>) -> Self {
        self.filter = Some(v.into());
        self
    }

    #[must_use]
    pub fn filter_lang(mut self, v: impl Into<String>) -> Self {
        self.filter_lang = Some(v.into());
        self
    }
}

/// Canonical, immutable query parameters produced by normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameters {
    pub ids: Option<Vec<String>>,
    pub collections: Option<Vec<String>>,
    pub bbox: Option<Vec<f64>>,
    pub intersects: Option<Value>,
    pub datetime: Option<DatetimeRange>,
    pub filter: Option<FilterLike>,
    pub filter_lang: Option<String>,
}

impl Parameters {
    /// The canonical map keyed like the STAC API item search, present keys only.
    #[must_use]
    pub fn to_map(&self) -> Map<String, Value> {
        let strings = |v: &[String]| Value::Array(v.iter().cloned().map(Value::String).collect());
        let mut m = Map::new();
        if let Some(ids) = &self.ids {
            m.insert("ids".into(), strings(ids));
        }
        if let Some(c) = &self.collections {
            m.insert("collections".into(), strings(c));
        }
        if let Some(b) = &self.bbox {
            m.insert("bbox".into(), Value::Array(b.iter().copied().map(Value::from).collect()));
        }
        if let Some(g) = &self.intersects {
            m.insert("intersects".into(), g.clone());
        }
        if let Some((start, end)) = &self.datetime {
            let side = |d: &Option<Instant>| {
                d.as_ref().map_or(Value::Null, |d| Value::String(crate::item::format_instant(d)))
            };
            m.insert("datetime".into(), Value::Array(vec![side(start), side(end)]));
        }
        if let Some(f) = &self.filter {
            m.insert("filter".into(), f.to_value());
        }
        if let Some(l) = &self.filter_lang {
            m.insert("filter-lang".into(), Value::String(l.clone()));
        }
        m
    }
}
