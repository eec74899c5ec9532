//! Geometry conversion and spatial predicates.
//!
//! Item and parameter geometries arrive as GeoJSON-like `serde_json::Value`s and are
//! converted to `geo_types::Geometry<f64>` once; predicates run through the `geo` crate.
//! Coordinates are treated as planar in whatever reference system the catalog uses.
//! No reprojection happens here; callers must supply parameters in the catalog's CRS.

use crate::errors::{Result, SearchError};
use geo::{BoundingRect, Intersects, Relate};
use geo_types::{
    Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon,
    Point, Polygon, Rect,
};
use serde_json::{Map, Value, json};

/// Anything that can describe itself as a GeoJSON geometry mapping.
pub trait GeoInterface {
    fn geo_interface(&self) -> Value;
}

impl<G> GeoInterface for G
where
    G: Clone + Into<Geometry<f64>>,
{
    fn geo_interface(&self) -> Value {
        to_geojson(&self.clone().into())
    }
}

fn geom_err(msg: impl Into<String>) -> SearchError {
    SearchError::Geometry(msg.into())
}

/// Converts a GeoJSON geometry (or Feature wrapping one) into a geometry.
///
/// # Errors
/// Returns `SearchError::Geometry` for unknown types or malformed coordinates.
pub fn from_geojson(value: &Value) -> Result<Geometry<f64>> {
    let obj = value.as_object().ok_or_else(|| geom_err("geometry must be a JSON object"))?;
    let kind = obj
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| geom_err("geometry is missing a string \"type\""))?;
    match kind {
        "Feature" => {
            let inner = obj.get("geometry").ok_or_else(|| geom_err("feature has no geometry"))?;
            from_geojson(inner)
        }
        "GeometryCollection" => {
            let members = obj
                .get("geometries")
                .and_then(Value::as_array)
                .ok_or_else(|| geom_err("GeometryCollection requires a \"geometries\" array"))?;
            let geoms = members.iter().map(from_geojson).collect::<Result<Vec<_>>>()?;
            Ok(Geometry::GeometryCollection(GeometryCollection::from(geoms)))
        }
        _ => {
            let coords = obj
                .get("coordinates")
                .ok_or_else(|| geom_err(format!("{kind} requires \"coordinates\"")))?;
            match kind {
                "Point" => Ok(Geometry::Point(Point::from(coord(coords)?))),
                "MultiPoint" => Ok(Geometry::MultiPoint(MultiPoint::new(
                    array(coords, kind)?.iter().map(|c| coord(c).map(Point::from)).collect::<Result<_>>()?,
                ))),
                "LineString" => Ok(Geometry::LineString(line_string(coords)?)),
                "MultiLineString" => Ok(Geometry::MultiLineString(MultiLineString::new(
                    array(coords, kind)?.iter().map(line_string).collect::<Result<_>>()?,
                ))),
                "Polygon" => Ok(Geometry::Polygon(polygon(coords)?)),
                "MultiPolygon" => Ok(Geometry::MultiPolygon(MultiPolygon::new(
                    array(coords, kind)?.iter().map(polygon).collect::<Result<_>>()?,
                ))),
                other => Err(geom_err(format!("unsupported geometry type: {other}"))),
            }
        }
    }
}

fn array<'a>(v: &'a Value, what: &str) -> Result<&'a Vec<Value>> {
    v.as_array().ok_or_else(|| geom_err(format!("{what} coordinates must be an array")))
}

fn coord(v: &Value) -> Result<Coord<f64>> {
    let pos = array(v, "position")?;
    // z (and any further ordinates) are ignored
    match (pos.first().and_then(Value::as_f64), pos.get(1).and_then(Value::as_f64)) {
        (Some(x), Some(y)) => Ok(Coord { x, y }),
        _ => Err(geom_err(format!("invalid position: {v}"))),
    }
}

fn line_string(v: &Value) -> Result<LineString<f64>> {
    Ok(LineString::new(array(v, "LineString")?.iter().map(coord).collect::<Result<_>>()?))
}

fn polygon(v: &Value) -> Result<Polygon<f64>> {
    let mut rings = array(v, "Polygon")?.iter().map(line_string);
    let exterior = rings.next().ok_or_else(|| geom_err("Polygon requires an exterior ring"))??;
    let interiors = rings.collect::<Result<Vec<_>>>()?;
    Ok(Polygon::new(exterior, interiors))
}

fn position(c: Coord<f64>) -> Value {
    json!([c.x, c.y])
}

fn ring(ls: &LineString<f64>) -> Value {
    Value::Array(ls.coords().map(|c| position(*c)).collect())
}

fn polygon_rings(p: &Polygon<f64>) -> Value {
    let mut rings = vec![ring(p.exterior())];
    rings.extend(p.interiors().iter().map(ring));
    Value::Array(rings)
}

/// Renders a geometry as a GeoJSON mapping.
#[must_use]
pub fn to_geojson(geometry: &Geometry<f64>) -> Value {
    match geometry {
        Geometry::Point(p) => json!({"type": "Point", "coordinates": position(p.0)}),
        Geometry::Line(l) => {
            json!({"type": "LineString", "coordinates": [position(l.start), position(l.end)]})
        }
        Geometry::LineString(ls) => json!({"type": "LineString", "coordinates": ring(ls)}),
        Geometry::Polygon(p) => json!({"type": "Polygon", "coordinates": polygon_rings(p)}),
        Geometry::MultiPoint(mp) => json!({
            "type": "MultiPoint",
            "coordinates": mp.iter().map(|p| position(p.0)).collect::<Vec<_>>(),
        }),
        Geometry::MultiLineString(mls) => json!({
            "type": "MultiLineString",
            "coordinates": mls.iter().map(ring).collect::<Vec<_>>(),
        }),
        Geometry::MultiPolygon(mp) => json!({
            "type": "MultiPolygon",
            "coordinates": mp.iter().map(polygon_rings).collect::<Vec<_>>(),
        }),
        Geometry::GeometryCollection(gc) => json!({
            "type": "GeometryCollection",
            "geometries": gc.iter().map(to_geojson).collect::<Vec<_>>(),
        }),
        Geometry::Rect(r) => to_geojson(&Geometry::Polygon(r.to_polygon())),
        Geometry::Triangle(t) => to_geojson(&Geometry::Polygon(t.to_polygon())),
    }
}

/// Builds the search rectangle for a 4- or 6-component bbox; z is ignored.
///
/// # Errors
/// Returns `SearchError::Geometry` for any other component count.
pub fn bbox_geometry(bbox: &[f64]) -> Result<Geometry<f64>> {
    let (min_x, min_y, max_x, max_y) = match *bbox {
        [min_x, min_y, max_x, max_y] => (min_x, min_y, max_x, max_y),
        [min_x, min_y, _, max_x, max_y, _] => (min_x, min_y, max_x, max_y),
        _ => {
            return Err(geom_err(format!(
                "bbox must have 4 or 6 components, got {}",
                bbox.len()
            )));
        }
    };
    Ok(Geometry::Rect(Rect::new(Coord { x: min_x, y: min_y }, Coord { x: max_x, y: max_y })))
}

/// Bounding box `[min_x, min_y, max_x, max_y]` of a geometry, if it has one.
#[must_use]
pub fn bounds(geometry: &Geometry<f64>) -> Option<Vec<f64>> {
    geometry.bounding_rect().map(|r| vec![r.min().x, r.min().y, r.max().x, r.max().y])
}

/// Parses a WKT geometry literal.
///
/// # Errors
/// Returns `SearchError::Geometry` when the text is not valid WKT.
pub fn parse_wkt(text: &str) -> Result<Geometry<f64>> {
    use wkt::TryFromWkt;
    Geometry::<f64>::try_from_wkt_str(text).map_err(|e| geom_err(format!("WKT parse error: {e:?}")))
}

#[must_use]
pub fn intersects(a: &Geometry<f64>, b: &Geometry<f64>) -> bool {
    a.intersects(b)
}

/// Named spatial relation between two geometries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpatialRelation {
    Intersects,
    Disjoint,
    Contains,
    Within,
    Touches,
    Crosses,
    Overlaps,
    Equals,
}

impl SpatialRelation {
    /// Looks up a relation by its CQL2 name (`s_intersects`, ...), case-insensitively.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name.to_ascii_lowercase().as_str() {
            "s_intersects" => Self::Intersects,
            "s_disjoint" => Self::Disjoint,
            "s_contains" => Self::Contains,
            "s_within" => Self::Within,
            "s_touches" => Self::Touches,
            "s_crosses" => Self::Crosses,
            "s_overlaps" => Self::Overlaps,
            "s_equals" => Self::Equals,
            _ => return None,
        })
    }

    #[must_use]
    pub fn holds(self, a: &Geometry<f64>, b: &Geometry<f64>) -> bool {
        let m = || a.relate(b);
        match self {
            Self::Intersects => a.intersects(b),
            Self::Disjoint => !a.intersects(b),
            Self::Contains => m().is_contains(),
            Self::Within => m().is_within(),
            Self::Touches => m().is_touches(),
            Self::Crosses => m().is_crosses(),
            Self::Overlaps => m().is_overlaps(),
            Self::Equals => m().is_equal_topo(),
        }
    }
}

#[must_use]
pub fn is_geojson_geometry(obj: &Map<String, Value>) -> bool {
    matches!(
        obj.get("type").and_then(Value::as_str),
        Some(
            "Point"
                | "MultiPoint"
                | "LineString"
                | "MultiLineString"
                | "Polygon"
                | "MultiPolygon"
                | "GeometryCollection"
        )
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> Value {
        json!({
            "type": "Polygon",
            "coordinates": [[[x0, y0], [x1, y0], [x1, y1], [x0, y1], [x0, y0]]]
        })
    }

    #[test]
    fn polygon_from_geojson() {
        let g = from_geojson(&square(0.0, 0.0, 1.0, 1.0)).unwrap();
        assert!(matches!(g, Geometry::Polygon(_)));
        assert_eq!(bounds(&g).unwrap(), vec![0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn feature_unwraps_geometry() {
        let f = json!({"type": "Feature", "geometry": {"type": "Point", "coordinates": [1.0, 2.0, 3.0]}});
        let g = from_geojson(&f).unwrap();
        assert_eq!(g, Geometry::Point(Point::new(1.0, 2.0)));
    }

    #[test]
    fn unknown_type_is_geometry_error() {
        let err = from_geojson(&json!({"type": "Circle", "coordinates": [0, 0]})).unwrap_err();
        assert!(matches!(err, SearchError::Geometry(_)));
    }

    #[test]
    fn bad_position_is_geometry_error() {
        let err = from_geojson(&json!({"type": "Point", "coordinates": ["a", 1]})).unwrap_err();
        assert!(matches!(err, SearchError::Geometry(_)));
    }

    #[test]
    fn geojson_survives_conversion() {
        let v = square(-3.04, 3.97, -2.0, 5.0);
        let g = from_geojson(&v).unwrap();
        assert_eq!(to_geojson(&g), v);
    }

    #[test]
    fn bbox_accepts_4_and_6_components() {
        let p = Geometry::Point(Point::new(0.5, 0.5));
        let b4 = bbox_geometry(&[0.0, 0.0, 1.0, 1.0]).unwrap();
        let b6 = bbox_geometry(&[0.0, 0.0, -10.0, 1.0, 1.0, 10.0]).unwrap();
        assert!(intersects(&p, &b4));
        assert!(intersects(&p, &b6));
        assert!(bbox_geometry(&[0.0, 0.0, 1.0]).is_err());
    }

    #[test]
    fn relations() {
        let big = from_geojson(&square(0.0, 0.0, 10.0, 10.0)).unwrap();
        let small = from_geojson(&square(1.0, 1.0, 2.0, 2.0)).unwrap();
        let far = from_geojson(&square(20.0, 20.0, 21.0, 21.0)).unwrap();
        assert!(SpatialRelation::Contains.holds(&big, &small));
        assert!(SpatialRelation::Within.holds(&small, &big));
        assert!(SpatialRelation::Disjoint.holds(&big, &far));
        assert!(!SpatialRelation::Intersects.holds(&big, &far));
        assert_eq!(SpatialRelation::from_name("S_INTERSECTS"), Some(SpatialRelation::Intersects));
    }

    #[test]
    fn wkt_literal() {
        let g = parse_wkt("POLYGON((0 0, 1 0, 1 1, 0 1, 0 0))").unwrap();
        assert!(matches!(g, Geometry::Polygon(_)));
        assert!(parse_wkt("POLYGON((0 0, 1 0").is_err());
    }

    #[test]
    fn geo_interface_for_geo_types() {
        let p = Point::new(1.0, 2.0);
        assert_eq!(p.geo_interface(), json!({"type": "Point", "coordinates": [1.0, 2.0]}));
    }
}
