//! Polygon geometry codec: delimited-text rings, GeoJSON, and tagged WKT.
//!
//! The same polygon is written three different ways depending on the target
//! document:
//!
//! ```text
//! text:    ((lon lat, lon lat, ...))
//! JSON:    {"type": "Polygon", "coordinates": [[[lon, lat], ...]], "bbox": [...]}
//! XML:     POLYGON ((lon lat, ...))
//! ```
//!
//! Coordinates are rendered with `f64`'s natural `Display` form — the
//! shortest string that round-trips — so input precision survives every
//! conversion untouched.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A `[longitude, latitude]` pair.
pub type Coordinate = [f64; 2];

/// An ordered sequence of coordinates bounding an area. Closed when the
/// first and last coordinate are equal.
pub type Ring = Vec<Coordinate>;

/// The only geometry type this codec carries.
pub const POLYGON_TYPE: &str = "Polygon";

/// GeoJSON Polygon (RFC 7946 §3.1.6).
///
/// Ring 0 is the outer ring; any further rings are holes. `bbox` is
/// attached on JSON export only and is always recomputed from ring 0 —
/// a caller-supplied value is never trusted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    /// Always [`POLYGON_TYPE`]; kept as data so foreign documents carrying
    /// other geometry types are detectable rather than misparsed.
    #[serde(rename = "type")]
    pub kind: String,
    /// One or more linear rings.
    pub coordinates: Vec<Ring>,
    /// `[min_lon, min_lat, max_lon, max_lat]`, present on JSON export.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<[f64; 4]>,
}

/// Errors produced by the geometry codec.
#[derive(Debug, Error)]
pub enum GeometryError {
    /// The geometry text could not be parsed at all (lexical failure).
    #[error("malformed geometry: {0}")]
    Malformed(String),

    /// The polygon parsed but violates the structural rules required for
    /// OGC-compliant emission (empty coordinates, ring under 4 points).
    #[error("invalid geometry: {0}")]
    Invalid(String),
}

/// Parse the delimited-text ring syntax `((lon lat, lon lat, ...))`.
///
/// Input already expressed as a GeoJSON object (starts with `{`) is parsed
/// as such, provided `type` is `"Polygon"` and `coordinates` is non-empty.
/// Every ring is closed on the way in: an unclosed ring gains a copy of its
/// first coordinate, never a rejection.
///
/// # Errors
///
/// Returns [`GeometryError::Malformed`] on non-numeric coordinate tokens,
/// an empty coordinate list, or a GeoJSON object of the wrong shape.
pub fn parse_delimited_ring(text: &str) -> Result<Polygon, GeometryError> {
    let text = text.trim();
    if text.starts_with('{') {
        return parse_inline_geojson(text);
    }

    let inner = text.strip_prefix("((").unwrap_or(text);
    let inner = inner.strip_suffix("))").unwrap_or(inner).trim();
    if inner.is_empty() {
        return Err(GeometryError::Malformed(
            "empty polygon coordinates".into(),
        ));
    }

    let mut ring = Ring::new();
    for pair in inner.split(',') {
        let pair = pair.trim();
        let mut nums = pair.split_whitespace();
        let (Some(lon), Some(lat)) = (nums.next(), nums.next()) else {
            return Err(GeometryError::Malformed(format!(
                "invalid coordinate pair: {pair}"
            )));
        };
        let lon: f64 = lon
            .parse()
            .map_err(|_| GeometryError::Malformed(format!("invalid coordinate pair: {pair}")))?;
        let lat: f64 = lat
            .parse()
            .map_err(|_| GeometryError::Malformed(format!("invalid coordinate pair: {pair}")))?;
        ring.push([lon, lat]);
    }

    let mut polygon = Polygon {
        kind: POLYGON_TYPE.into(),
        coordinates: vec![ring],
        bbox: None,
    };
    close_rings(&mut polygon);
    Ok(polygon)
}

fn parse_inline_geojson(text: &str) -> Result<Polygon, GeometryError> {
    let mut polygon: Polygon = serde_json::from_str(text)
        .map_err(|e| GeometryError::Malformed(format!("invalid GeoJSON polygon: {e}")))?;
    if polygon.kind != POLYGON_TYPE || polygon.coordinates.is_empty() {
        return Err(GeometryError::Malformed(
            "invalid GeoJSON polygon format".into(),
        ));
    }
    close_rings(&mut polygon);
    Ok(polygon)
}

/// Close every ring that does not already end where it starts.
fn close_rings(polygon: &mut Polygon) {
    for ring in &mut polygon.coordinates {
        if !ring.is_empty() && ring.first() != ring.last() {
            let first = ring[0];
            ring.push(first);
        }
    }
}

/// Format ring 0 as the delimited-text syntax `((lon lat, ...))`.
///
/// Holes are dropped in this direction — the text format carries a single
/// ring. Returns an empty string when the polygon cannot be rendered
/// (wrong type tag, no rings, empty ring); optional geometry degrades
/// silently rather than failing the surrounding record.
pub fn to_delimited_ring(polygon: &Polygon) -> String {
    match format_ring(polygon) {
        Some(coords) => format!("(({coords}))"),
        None => String::new(),
    }
}

/// Format ring 0 as the tagged WKT-like syntax `POLYGON ((lon lat, ...))`
/// used inside XML `<poligono>` elements. Same degradation rules as
/// [`to_delimited_ring`].
pub fn to_tagged_wkt(polygon: &Polygon) -> String {
    match format_ring(polygon) {
        Some(coords) => format!("POLYGON (({coords}))"),
        None => String::new(),
    }
}

fn format_ring(polygon: &Polygon) -> Option<String> {
    if polygon.kind != POLYGON_TYPE {
        return None;
    }
    let ring = polygon.coordinates.first()?;
    if ring.is_empty() {
        return None;
    }
    let coords: Vec<String> = ring
        .iter()
        .map(|[lon, lat]| format!("{lon} {lat}"))
        .collect();
    Some(coords.join(", "))
}

/// Validate and enhance a polygon for OGC-compliant JSON emission.
///
/// Rings are closed if open, and the bounding box is recomputed from ring 0.
///
/// # Errors
///
/// Returns [`GeometryError::Invalid`] when `coordinates` is empty or any
/// ring has fewer than 4 points. Unlike the emission formatters above this
/// is fatal: a polygon well-formed enough to reach JSON emission must be
/// OGC-valid.
pub fn to_geojson(polygon: Polygon) -> Result<Polygon, GeometryError> {
    if polygon.kind != POLYGON_TYPE {
        return Err(GeometryError::Invalid(format!(
            "expected type \"Polygon\", got \"{}\"",
            polygon.kind
        )));
    }
    if polygon.coordinates.is_empty() {
        return Err(GeometryError::Invalid(
            "polygon must have at least one linear ring".into(),
        ));
    }

    let mut rings = Vec::with_capacity(polygon.coordinates.len());
    for (index, mut ring) in polygon.coordinates.into_iter().enumerate() {
        if ring.len() < 4 {
            return Err(GeometryError::Invalid(format!(
                "linear ring {index} must have at least 4 coordinate pairs"
            )));
        }
        if ring.first() != ring.last() {
            let first = ring[0];
            ring.push(first);
        }
        rings.push(ring);
    }

    let bbox = bounding_box(&rings[0]);
    Ok(Polygon {
        kind: POLYGON_TYPE.into(),
        coordinates: rings,
        bbox: Some(bbox),
    })
}

/// Bounding box `[min_lon, min_lat, max_lon, max_lat]` over a single ring.
fn bounding_box(ring: &Ring) -> [f64; 4] {
    let mut bbox = [
        f64::INFINITY,
        f64::INFINITY,
        f64::NEG_INFINITY,
        f64::NEG_INFINITY,
    ];
    for [lon, lat] in ring {
        bbox[0] = bbox[0].min(*lon);
        bbox[1] = bbox[1].min(*lat);
        bbox[2] = bbox[2].max(*lon);
        bbox[3] = bbox[3].max(*lat);
    }
    bbox
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(closed: bool) -> Ring {
        let mut ring = vec![[0.0, 0.0], [2.0, 0.0], [2.0, 2.0], [0.0, 2.0]];
        if closed {
            ring.push([0.0, 0.0]);
        }
        ring
    }

    #[test]
    fn parses_basic_ring() {
        let p = parse_delimited_ring("((0 0, 1 0, 1 1, 0 0))").unwrap();
        assert_eq!(p.kind, "Polygon");
        assert_eq!(p.coordinates.len(), 1);
        assert_eq!(p.coordinates[0].len(), 4);
    }

    #[test]
    fn unclosed_ring_is_closed_on_parse() {
        let p = parse_delimited_ring("((0 0, 1 0, 1 1))").unwrap();
        let ring = &p.coordinates[0];
        assert_eq!(ring.len(), 4);
        assert_eq!(ring.first(), ring.last());
    }

    #[test]
    fn preserves_high_precision_coordinates() {
        let text = "((-90.7695083618164 17.817752838134766, -90.743 17.82, -90.75 17.81, -90.7695083618164 17.817752838134766))";
        let p = parse_delimited_ring(text).unwrap();
        assert_eq!(p.coordinates[0][0], [-90.7695083618164, 17.817752838134766]);
        assert_eq!(to_delimited_ring(&p), text);
    }

    #[test]
    fn rejects_non_numeric_tokens() {
        let err = parse_delimited_ring("((0 0, abc def, 1 1))").unwrap_err();
        assert!(matches!(err, GeometryError::Malformed(_)));
        assert!(err.to_string().contains("abc def"));
    }

    #[test]
    fn rejects_lone_number() {
        assert!(parse_delimited_ring("((0 0, 5, 1 1))").is_err());
    }

    #[test]
    fn rejects_empty_coordinates() {
        assert!(parse_delimited_ring("(())").is_err());
    }

    #[test]
    fn parses_inline_geojson() {
        let p = parse_delimited_ring(
            r#"{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,0]]]}"#,
        )
        .unwrap();
        assert_eq!(p.coordinates[0].len(), 4);
    }

    #[test]
    fn inline_geojson_closes_open_rings() {
        let p = parse_delimited_ring(
            r#"{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1]]]}"#,
        )
        .unwrap();
        assert_eq!(p.coordinates[0].len(), 4);
        assert_eq!(p.coordinates[0].first(), p.coordinates[0].last());
    }

    #[test]
    fn inline_geojson_rejects_wrong_type() {
        assert!(parse_delimited_ring(r#"{"type":"Point","coordinates":[[[0,0]]]}"#).is_err());
    }

    #[test]
    fn inline_geojson_rejects_empty_coordinates() {
        assert!(parse_delimited_ring(r#"{"type":"Polygon","coordinates":[]}"#).is_err());
    }

    #[test]
    fn tagged_wkt_form() {
        let p = parse_delimited_ring("((0 0, 1 0, 1 1, 0 0))").unwrap();
        assert_eq!(to_tagged_wkt(&p), "POLYGON ((0 0, 1 0, 1 1, 0 0))");
    }

    #[test]
    fn formatters_degrade_to_empty_string() {
        let no_rings = Polygon {
            kind: POLYGON_TYPE.into(),
            coordinates: vec![],
            bbox: None,
        };
        assert_eq!(to_delimited_ring(&no_rings), "");

        let empty_ring = Polygon {
            kind: POLYGON_TYPE.into(),
            coordinates: vec![vec![]],
            bbox: None,
        };
        assert_eq!(to_tagged_wkt(&empty_ring), "");

        let wrong_kind = Polygon {
            kind: "Point".into(),
            coordinates: vec![square(true)],
            bbox: None,
        };
        assert_eq!(to_delimited_ring(&wrong_kind), "");
    }

    #[test]
    fn to_geojson_computes_bbox() {
        let p = Polygon {
            kind: POLYGON_TYPE.into(),
            coordinates: vec![square(true)],
            bbox: None,
        };
        let enhanced = to_geojson(p).unwrap();
        assert_eq!(enhanced.bbox, Some([0.0, 0.0, 2.0, 2.0]));
    }

    #[test]
    fn to_geojson_ignores_supplied_bbox() {
        let p = Polygon {
            kind: POLYGON_TYPE.into(),
            coordinates: vec![square(true)],
            bbox: Some([9.0, 9.0, 9.0, 9.0]),
        };
        let enhanced = to_geojson(p).unwrap();
        assert_eq!(enhanced.bbox, Some([0.0, 0.0, 2.0, 2.0]));
    }

    #[test]
    fn to_geojson_closes_open_ring() {
        let p = Polygon {
            kind: POLYGON_TYPE.into(),
            coordinates: vec![square(false)],
            bbox: None,
        };
        let enhanced = to_geojson(p).unwrap();
        assert_eq!(enhanced.coordinates[0].len(), 5);
        assert_eq!(
            enhanced.coordinates[0].first(),
            enhanced.coordinates[0].last()
        );
    }

    #[test]
    fn to_geojson_rejects_short_ring() {
        let p = Polygon {
            kind: POLYGON_TYPE.into(),
            coordinates: vec![vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]]],
            bbox: None,
        };
        assert!(matches!(to_geojson(p), Err(GeometryError::Invalid(_))));
    }

    #[test]
    fn to_geojson_rejects_empty_coordinates() {
        let p = Polygon {
            kind: POLYGON_TYPE.into(),
            coordinates: vec![],
            bbox: None,
        };
        assert!(matches!(to_geojson(p), Err(GeometryError::Invalid(_))));
    }

    #[test]
    fn bbox_serialises_only_when_present() {
        let p = parse_delimited_ring("((0 0, 1 0, 1 1, 0 0))").unwrap();
        let json = serde_json::to_string(&p).unwrap();
        assert!(!json.contains("bbox"));

        let enhanced = to_geojson(p).unwrap();
        let json = serde_json::to_string(&enhanced).unwrap();
        assert!(json.contains("\"bbox\":[0.0,0.0,1.0,1.0]") || json.contains("\"bbox\":[0,0,1,1]"));
    }
}
