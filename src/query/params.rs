//! Normalization of raw search parameters into their canonical form.
//!
//! Everything here is pure and runs eagerly at query construction; malformed input is
//! rejected before any catalog data is touched.

use super::datetime::Period;
use super::types::{
    BBoxLike, CQL2_JSON, CQL2_TEXT, DatetimeComponent, DatetimeLike, DatetimeRange, FilterLike,
    IntersectsLike, ListLike, Parameters, SearchParams,
};
use crate::errors::{Result, SearchError};
use crate::geometry;
use serde_json::Value;

const INTERSECTS_TYPES: &str =
    "intersects must be of type None, str, dict, or an object that implements __geo_interface__";

fn listlike(value: Option<&ListLike>) -> Option<Vec<String>> {
    match value? {
        ListLike::Text(s) => Some(s.split(',').map(str::to_string).collect()),
        ListLike::Values(v) => Some(v.clone()),
    }
}

#[must_use]
pub fn normalize_ids(value: Option<&ListLike>) -> Option<Vec<String>> {
    listlike(value)
}

#[must_use]
pub fn normalize_collections(value: Option<&ListLike>) -> Option<Vec<String>> {
    listlike(value)
}

fn parse_number(s: &str) -> Result<f64> {
    s.trim()
        .parse::<f64>()
        .map_err(|_| SearchError::Parameter(format!("bbox component is not a number: {s:?}")))
}

/// # Errors
/// Returns `SearchError::Parameter` when a component is not numeric.
pub fn normalize_bbox(value: Option<&BBoxLike>) -> Result<Option<Vec<f64>>> {
    let Some(value) = value else { return Ok(None) };
    let bbox = match value {
        BBoxLike::Text(s) => s.split(',').map(parse_number).collect::<Result<Vec<_>>>()?,
        BBoxLike::Numbers(v) => v.clone(),
        BBoxLike::Json(Value::Array(members)) => members
            .iter()
            .map(|m| match m {
                Value::Number(n) => n.as_f64().ok_or_else(|| {
                    SearchError::Parameter(format!("bbox component out of range: {n}"))
                }),
                Value::String(s) => parse_number(s),
                other => {
                    Err(SearchError::Parameter(format!("bbox component is not a number: {other}")))
                }
            })
            .collect::<Result<Vec<_>>>()?,
        BBoxLike::Json(other) => {
            return Err(SearchError::Parameter(format!("bbox must be a sequence of numbers: {other}")));
        }
    };
    Ok(Some(bbox))
}

/// # Errors
/// Returns `SearchError::Parameter` for text that is not a JSON object or a non-object value.
pub fn normalize_intersects(value: Option<&IntersectsLike>) -> Result<Option<Value>> {
    let Some(value) = value else { return Ok(None) };
    match value {
        IntersectsLike::Json(v @ Value::Object(_)) => Ok(Some(v.clone())),
        IntersectsLike::Text(s) => match serde_json::from_str::<Value>(s) {
            Ok(v @ Value::Object(_)) => Ok(Some(v)),
            Ok(_) => Err(SearchError::Parameter(format!("{INTERSECTS_TYPES} (text is not an object)"))),
            Err(e) => Err(SearchError::Parameter(format!("intersects text is not valid JSON: {e}"))),
        },
        IntersectsLike::Geometry(g) => Ok(Some(geometry::to_geojson(g))),
        IntersectsLike::Json(_) => Err(SearchError::Parameter(INTERSECTS_TYPES.to_string())),
    }
}

fn is_open(component: &DatetimeComponent) -> bool {
    matches!(component, DatetimeComponent::Text(s) if s.is_empty() || s == "..")
}

fn period(component: &DatetimeComponent) -> Result<Period> {
    match component {
        DatetimeComponent::Text(s) => Period::parse(s),
        DatetimeComponent::Instant(i) => Ok(Period::from_instant(*i)),
    }
}

/// Resolves a datetime parameter to a `(start, end)` range.
///
/// # Errors
/// Returns `SearchError::Parameter` for more than two components or an unparseable one.
pub fn normalize_datetime(value: Option<&DatetimeLike>) -> Result<Option<DatetimeRange>> {
    let Some(value) = value else { return Ok(None) };
    let components: Vec<DatetimeComponent> = match value {
        DatetimeLike::Text(s) => s.split('/').map(DatetimeComponent::from).collect(),
        DatetimeLike::Instant(i) => vec![DatetimeComponent::Instant(*i)],
        DatetimeLike::Components(parts) => parts.iter().flatten().cloned().collect(),
    };
    match components.as_slice() {
        [] => Ok(None),
        [single] => {
            if is_open(single) {
                return Ok(Some((None, None)));
            }
            let p = period(single)?;
            Ok(Some((Some(p.start()), Some(p.end()))))
        }
        [left, right] => {
            let start = if is_open(left) { None } else { Some(period(left)?.start()) };
            let end = if is_open(right) { None } else { Some(period(right)?.end()) };
            Ok(Some((start, end)))
        }
        many => Err(SearchError::Parameter(format!(
            "too many datetime components (max=2, actual={}): {value}",
            many.len()
        ))),
    }
}

/// Infers the filter language when none was given.
#[must_use]
pub fn normalize_filter_lang(filter: Option<&FilterLike>, lang: Option<&str>) -> Option<String> {
    let filter = filter?;
    if let Some(lang) = lang {
        return Some(lang.to_string());
    }
    match filter {
        FilterLike::Text(_) | FilterLike::Json(Value::String(_)) => Some(CQL2_TEXT.to_string()),
        FilterLike::Json(Value::Object(_)) => Some(CQL2_JSON.to_string()),
        FilterLike::Json(_) => None,
    }
}

impl Parameters {
    /// Normalizes every raw parameter.
    ///
    /// # Errors
    /// Returns the first `SearchError::Parameter` encountered.
    pub fn from_params(params: &SearchParams) -> Result<Self> {
        let filter = params.filter.clone();
        let filter_lang = normalize_filter_lang(filter.as_ref(), params.filter_lang.as_deref());
        Ok(Self {
            ids: normalize_ids(params.ids.as_ref()),
            collections: normalize_collections(params.collections.as_ref()),
            bbox: normalize_bbox(params.bbox.as_ref())?,
            intersects: normalize_intersects(params.intersects.as_ref())?,
            datetime: normalize_datetime(params.datetime.as_ref())?,
            filter,
            filter_lang,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn listlike_splits_without_trimming() {
        assert_eq!(normalize_ids(Some(&"a, b".into())), Some(vec!["a".into(), " b".into()]));
        assert_eq!(normalize_ids(Some(&"".into())), Some(vec![String::new()]));
        assert_eq!(
            normalize_collections(Some(&vec!["x", "x"].into())),
            Some(vec!["x".into(), "x".into()])
        );
        assert_eq!(normalize_ids(None), None);
    }

    #[test]
    fn bbox_forms() {
        assert_eq!(normalize_bbox(Some(&"1, 2,3,4".into())).unwrap(), Some(vec![1.0, 2.0, 3.0, 4.0]));
        assert_eq!(
            normalize_bbox(Some(&json!([1, "2", 3.5]).into())).unwrap(),
            Some(vec![1.0, 2.0, 3.5])
        );
        assert!(matches!(normalize_bbox(Some(&"1,a".into())), Err(SearchError::Parameter(_))));
        assert!(matches!(normalize_bbox(Some(&json!([true]).into())), Err(SearchError::Parameter(_))));
    }

    #[test]
    fn intersects_forms() {
        let poly = json!({"type": "Point", "coordinates": [1.0, 2.0]});
        assert_eq!(normalize_intersects(Some(&poly.clone().into())).unwrap(), Some(poly.clone()));
        assert_eq!(normalize_intersects(Some(&poly.to_string().into())).unwrap(), Some(poly.clone()));
        let g: IntersectsLike = geo_types::Point::new(1.0, 2.0).into();
        assert_eq!(normalize_intersects(Some(&g)).unwrap(), Some(poly));
        let err = normalize_intersects(Some(&json!(42).into())).unwrap_err();
        assert!(err.to_string().contains("__geo_interface__"));
    }

    #[test]
    fn datetime_components_filter_none() {
        let v: DatetimeLike =
            vec![None, Some(DatetimeComponent::from("2020")), None].into();
        let (s, e) = normalize_datetime(Some(&v)).unwrap().unwrap();
        assert!(s.is_some() && e.is_some());
        let empty: DatetimeLike = vec![None::<DatetimeComponent>].into();
        assert_eq!(normalize_datetime(Some(&empty)).unwrap(), None);
    }

    #[test]
    fn datetime_too_many_components() {
        let err = normalize_datetime(Some(&"2020/2021/2022".into())).unwrap_err();
        assert_eq!(
            err,
            SearchError::Parameter(
                "too many datetime components (max=2, actual=3): 2020/2021/2022".into()
            )
        );
    }

    #[test]
    fn empty_sides_are_open() {
        let (s, e) = normalize_datetime(Some(&"/2020".into())).unwrap().unwrap();
        assert!(s.is_none());
        assert!(e.is_some());
        assert_eq!(normalize_datetime(Some(&"../..".into())).unwrap(), Some((None, None)));
    }

    #[test]
    fn filter_lang_inference() {
        assert_eq!(normalize_filter_lang(None, Some("cql2-json")), None);
        assert_eq!(normalize_filter_lang(Some(&"a = 1".into()), None).as_deref(), Some(CQL2_TEXT));
        assert_eq!(
            normalize_filter_lang(Some(&json!({"op": "=", "args": []}).into()), None).as_deref(),
            Some(CQL2_JSON)
        );
        assert_eq!(normalize_filter_lang(Some(&json!("a = 1").into()), None).as_deref(), Some(CQL2_TEXT));
        assert_eq!(normalize_filter_lang(Some(&json!(5).into()), None), None);
        assert_eq!(
            normalize_filter_lang(Some(&"x".into()), Some("custom")).as_deref(),
            Some("custom")
        );
    }
}
