//! GeoJSON FeatureCollection reader.
//!
//! Only the collection envelope is validated strictly (`type` tag and a
//! `features` list). Everything inside a feature is read permissively:
//! unreadable geometry becomes `None` and unreadable coordinates become NaN,
//! so one bad feature never rejects the rest of the payload.

use std::sync::Arc;

use foundation::{LayerKind, Position, Ring};
use serde_json::Value;
use tracing::debug;

use crate::feature::{Feature, FeatureCollection, Geometry};

#[derive(Debug, thiserror::Error)]
pub enum GeoJsonError {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("expected GeoJSON FeatureCollection, found type {found:?}")]
    NotAFeatureCollection { found: Option<String> },
    #[error("FeatureCollection `features` must be a list")]
    FeaturesNotAList,
    #[error("invalid feature at index {index}: {reason}")]
    InvalidFeature { index: usize, reason: String },
}

impl FeatureCollection {
    pub fn from_geojson_str(payload: &str, kind: LayerKind) -> Result<Self, GeoJsonError> {
        let value: Value = serde_json::from_str(payload)?;
        Self::from_geojson_value(&value, kind)
    }

    pub fn from_geojson_slice(payload: &[u8], kind: LayerKind) -> Result<Self, GeoJsonError> {
        let value: Value = serde_json::from_slice(payload)?;
        Self::from_geojson_value(&value, kind)
    }

    pub fn from_geojson_value(value: &Value, kind: LayerKind) -> Result<Self, GeoJsonError> {
        let ty = value.get("type").and_then(Value::as_str);
        if ty != Some("FeatureCollection") {
            return Err(GeoJsonError::NotAFeatureCollection {
                found: ty.map(str::to_string),
            });
        }

        let features_val = value
            .get("features")
            .and_then(Value::as_array)
            .ok_or(GeoJsonError::FeaturesNotAList)?;

        let mut features = Vec::with_capacity(features_val.len());
        for (index, feat_val) in features_val.iter().enumerate() {
            let feat_obj = feat_val
                .as_object()
                .ok_or_else(|| GeoJsonError::InvalidFeature {
                    index,
                    reason: "feature must be an object".to_string(),
                })?;

            let id = match feat_obj.get("id") {
                Some(Value::String(s)) => Some(s.clone()),
                Some(Value::Number(n)) => Some(n.to_string()),
                _ => None,
            };

            let properties = feat_obj
                .get("properties")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();

            let geometry = feat_obj.get("geometry").and_then(|g| {
                let parsed = parse_geometry(g);
                if parsed.is_none() && !g.is_null() {
                    debug!(index, "feature geometry is not a readable polygon");
                }
                parsed
            });

            features.push(Feature {
                id,
                properties: Arc::new(properties),
                geometry,
            });
        }

        Ok(Self { kind, features })
    }
}

fn parse_geometry(value: &Value) -> Option<Geometry> {
    let coords = value.get("coordinates")?.as_array()?;
    match value.get("type")?.as_str()? {
        "Polygon" => Some(Geometry::Polygon(parse_rings(coords))),
        "MultiPolygon" => Some(Geometry::MultiPolygon(
            coords
                .iter()
                .map(|poly| poly.as_array().map(|r| parse_rings(r)).unwrap_or_default())
                .collect(),
        )),
        _ => None,
    }
}

fn parse_rings(rings: &[Value]) -> Vec<Ring> {
    rings
        .iter()
        .map(|ring| {
            ring.as_array()
                .map(|pts| pts.iter().map(parse_position).collect())
                .unwrap_or_default()
        })
        .collect()
}

fn parse_position(value: &Value) -> Position {
    let Some(arr) = value.as_array() else {
        return Position::new(f64::NAN, f64::NAN);
    };
    let component = |i: usize| arr.get(i).and_then(Value::as_f64).unwrap_or(f64::NAN);
    Position {
        lon: component(0),
        lat: component(1),
        elevation: arr.get(2).and_then(Value::as_f64),
    }
}

#[cfg(test)]
mod tests {
    use super::GeoJsonError;
    use crate::feature::{FeatureCollection, Geometry};
    use foundation::LayerKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn reads_polygons_and_multipolygons() {
        let payload = r#"{
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "id": 7, "properties": { "priority": 3 },
                  "geometry": { "type": "Polygon",
                    "coordinates": [[[0,0],[1,0],[1,1],[0,0]]] } },
                { "type": "Feature", "properties": null,
                  "geometry": { "type": "MultiPolygon",
                    "coordinates": [[[[0,0],[1,0],[1,1],[0,0]]], [[[5,5],[6,5,12.5],[6,6],[5,5]]]] } }
            ]
        }"#;
        let fc = FeatureCollection::from_geojson_str(payload, LayerKind::Network).unwrap();
        assert_eq!(fc.kind, LayerKind::Network);
        assert_eq!(fc.len(), 2);
        assert_eq!(fc.features[0].id.as_deref(), Some("7"));
        assert_eq!(fc.features[0].properties.get("priority"), Some(&serde_json::json!(3)));
        assert!(fc.features[1].properties.is_empty());

        let Some(Geometry::MultiPolygon(polys)) = &fc.features[1].geometry else {
            panic!("expected multipolygon");
        };
        assert_eq!(polys.len(), 2);
        assert_eq!(polys[1][0][1].elevation, Some(12.5));
    }

    #[test]
    fn rejects_wrong_envelope() {
        let err = FeatureCollection::from_geojson_str(
            r#"{"type":"Feature","features":[]}"#,
            LayerKind::Corridor,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            GeoJsonError::NotAFeatureCollection { found: Some(ref t) } if t == "Feature"
        ));

        let err = FeatureCollection::from_geojson_str(
            r#"{"type":"FeatureCollection","features":{}}"#,
            LayerKind::Corridor,
        )
        .unwrap_err();
        assert!(matches!(err, GeoJsonError::FeaturesNotAList));

        let err = FeatureCollection::from_geojson_str("not json", LayerKind::Corridor).unwrap_err();
        assert!(matches!(err, GeoJsonError::Json(_)));
    }

    #[test]
    fn non_object_feature_is_invalid() {
        let err = FeatureCollection::from_geojson_str(
            r#"{"type":"FeatureCollection","features":[1]}"#,
            LayerKind::Footprint,
        )
        .unwrap_err();
        assert!(matches!(err, GeoJsonError::InvalidFeature { index: 0, .. }));
    }

    #[test]
    fn unreadable_geometry_keeps_feature_position() {
        let payload = r#"{
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "properties": {}, "geometry": null },
                { "type": "Feature", "properties": {}, "geometry": { "type": "Point", "coordinates": [1, 2] } },
                { "type": "Feature", "properties": {} },
                { "type": "Feature", "properties": {},
                  "geometry": { "type": "Polygon", "coordinates": [[["a", 1], null, [2, 2], [3, 3]]] } }
            ]
        }"#;
        let fc = FeatureCollection::from_geojson_str(payload, LayerKind::Corridor).unwrap();
        assert_eq!(fc.len(), 4);
        assert!(fc.features[0].geometry.is_none());
        assert!(fc.features[1].geometry.is_none());
        assert!(fc.features[2].geometry.is_none());

        let Some(Geometry::Polygon(rings)) = &fc.features[3].geometry else {
            panic!("expected polygon");
        };
        assert!(rings[0][0].lon.is_nan());
        assert!(rings[0][1].lat.is_nan());
        assert!(rings[0][2].is_finite());
    }
}
