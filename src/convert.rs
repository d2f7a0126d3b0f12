//! Layer conversion from a remote feature set into an in-memory output layer.

use crate::error::{BackupError, Result};
use crate::esri::{DATE_FIELD_TYPE, FeatureSet, classify_geometry_type, convert_geometry};
use crate::schema::{FieldKind, OutputSchema, PropertySpec};
use chrono::{DateTime, SecondsFormat};
use geo_types::Geometry;
use rusqlite::types::Value;

/// One output record; `properties` follows the schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertedFeature {
    pub geometry: Option<Geometry<f64>>,
    pub properties: Vec<(String, Value)>,
}

impl ConvertedFeature {
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Property values alone, in schema order.
    pub fn values(&self) -> impl Iterator<Item = Value> + '_ {
        self.properties.iter().map(|(_, value)| value.clone())
    }
}

/// A fully converted layer, ready to be written.
#[derive(Debug, Clone)]
pub struct ConvertedLayer {
    pub schema: OutputSchema,
    pub srs_id: i32,
    /// WKT supplied by the service, used when the SRS id is not built in.
    pub srs_wkt: Option<String>,
    pub features: Vec<ConvertedFeature>,
}

/// Derive the output schema of `set` and convert every feature into it.
pub fn convert_feature_set(layer_name: &str, set: &FeatureSet) -> Result<ConvertedLayer> {
    let geometry_type =
        set.geometry_type
            .as_deref()
            .ok_or_else(|| BackupError::MissingGeometryType {
                layer_name: layer_name.to_string(),
            })?;
    let spatial_reference = set.spatial_reference.as_ref();
    let srs_id = spatial_reference
        .and_then(|sr| sr.epsg())
        .ok_or_else(|| BackupError::MissingSpatialReference {
            layer_name: layer_name.to_string(),
        })?;

    let kind = classify_geometry_type(geometry_type);
    let schema = OutputSchema::from_fields(kind, &set.fields);

    let mut features = Vec::with_capacity(set.features.len());
    for (idx, feature) in set.features.iter().enumerate() {
        let geometry = feature
            .geometry
            .as_ref()
            .map(|g| convert_geometry(g, kind, idx))
            .transpose()?;

        let properties = schema
            .properties
            .iter()
            .map(|spec| {
                let raw = feature.attributes.get(&spec.name).ok_or_else(|| {
                    BackupError::MissingAttribute {
                        feature: idx,
                        field: spec.name.clone(),
                    }
                })?;
                Ok((spec.name.clone(), property_value(spec, raw)))
            })
            .collect::<Result<Vec<_>>>()?;

        features.push(ConvertedFeature {
            geometry,
            properties,
        });
    }

    Ok(ConvertedLayer {
        schema,
        srs_id,
        srs_wkt: spatial_reference.and_then(|sr| sr.wkt.clone()),
        features,
    })
}

/// Convert one attribute value for a layer property.
pub fn property_value(spec: &PropertySpec, raw: &serde_json::Value) -> Value {
    if spec.remote_type == DATE_FIELD_TYPE {
        return date_value(raw);
    }
    match spec.kind {
        FieldKind::Integer => match raw {
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Value::Integer)
                .or_else(|| n.as_f64().map(Value::Real))
                .unwrap_or(Value::Null),
            other => json_value(other),
        },
        FieldKind::Float => match raw {
            serde_json::Value::Number(n) => n.as_f64().map_or(Value::Null, Value::Real),
            other => json_value(other),
        },
        FieldKind::Text | FieldKind::Other(_) => text_value(raw),
    }
}

/// Convert one attribute value for a plain table column, keeping its JSON type.
pub fn json_value(raw: &serde_json::Value) -> Value {
    match raw {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Integer(i64::from(*b)),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => n.as_f64().map_or(Value::Null, Value::Real),
        },
        serde_json::Value::String(s) => Value::Text(s.clone()),
        other => Value::Text(other.to_string()),
    }
}

fn text_value(raw: &serde_json::Value) -> Value {
    match raw {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::String(s) => Value::Text(s.clone()),
        other => Value::Text(other.to_string()),
    }
}

/// Epoch milliseconds as RFC 3339 UTC text.
pub fn date_value(raw: &serde_json::Value) -> Value {
    match raw.as_i64().and_then(DateTime::from_timestamp_millis) {
        Some(ts) => Value::Text(ts.to_rfc3339_opts(SecondsFormat::Millis, true)),
        None => text_value(raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::esri::FeatureSet;
    use crate::schema::GeometryKind;
    use geo_types::{MultiPolygon, Point};

    fn parse(body: &str) -> FeatureSet {
        serde_json::from_str(body).expect("valid feature set json")
    }

    #[test]
    fn two_polygons_with_two_rings_each() -> Result<()> {
        let set = parse(
            r#"{
                "geometryType": "esriGeometryPolygon",
                "spatialReference": {"wkid": 102100, "latestWkid": 3857},
                "fields": [{"name": "NAME", "type": "esriFieldTypeString"}],
                "features": [
                    {"attributes": {"NAME": "a"}, "geometry": {"rings": [
                        [[0,0],[4,0],[4,4],[0,0]], [[1,1],[1,2],[2,2],[1,1]]
                    ]}},
                    {"attributes": {"NAME": "b"}, "geometry": {"rings": [
                        [[10,10],[14,10],[14,14],[10,10]], [[20,20],[21,20],[21,21],[20,20]]
                    ]}}
                ]
            }"#,
        );
        let layer = convert_feature_set("parks", &set)?;

        assert_eq!(layer.srs_id, 3857);
        assert_eq!(layer.schema.geometry, GeometryKind::MultiPolygon);
        assert_eq!(layer.features.len(), 2);
        for feature in &layer.features {
            let Some(Geometry::MultiPolygon(MultiPolygon(polygons))) = &feature.geometry else {
                panic!("expected a multipolygon: {:?}", feature.geometry);
            };
            assert_eq!(polygons.len(), 2);
        }
        Ok(())
    }

    #[test]
    fn omits_object_id_and_keeps_field_order() -> Result<()> {
        let set = parse(
            r#"{
                "geometryType": "esriGeometryPoint",
                "spatialReference": {"wkid": 4326},
                "fields": [
                    {"name": "OBJECTID", "type": "esriFieldTypeOID"},
                    {"name": "ZETA", "type": "esriFieldTypeString"},
                    {"name": "ALPHA", "type": "esriFieldTypeString"}
                ],
                "features": [{"attributes": {"OBJECTID": 9, "ZETA": "z", "ALPHA": null},
                              "geometry": {"x": 1.5, "y": 2.5}}]
            }"#,
        );
        let layer = convert_feature_set("access_points", &set)?;

        let names: Vec<&str> = layer
            .schema
            .properties
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, vec!["ZETA", "ALPHA"]);
        let feature = &layer.features[0];
        assert_eq!(
            feature.properties,
            vec![
                ("ZETA".to_string(), Value::Text("z".to_string())),
                ("ALPHA".to_string(), Value::Null),
            ]
        );
        assert_eq!(feature.property("OBJECTID"), None);
        assert_eq!(feature.geometry, Some(Geometry::Point(Point::new(1.5, 2.5))));
        Ok(())
    }

    #[test]
    fn null_geometry_is_kept() -> Result<()> {
        let set = parse(
            r#"{
                "geometryType": "esriGeometryPolyline",
                "spatialReference": {"wkid": 4326},
                "fields": [],
                "features": [{"attributes": {}, "geometry": null}, {"attributes": {}}]
            }"#,
        );
        let layer = convert_feature_set("trails", &set)?;
        assert!(layer.features.iter().all(|f| f.geometry.is_none()));
        Ok(())
    }

    #[test]
    fn missing_attribute_fails() {
        let set = parse(
            r#"{
                "geometryType": "esriGeometryPoint",
                "spatialReference": {"wkid": 4326},
                "fields": [{"name": "NAME", "type": "esriFieldTypeString"}],
                "features": [{"attributes": {"NAME": "a"}, "geometry": {"x": 0, "y": 0}},
                             {"attributes": {"RENAMED": "b"}, "geometry": {"x": 0, "y": 0}}]
            }"#,
        );
        let err = convert_feature_set("points", &set).expect_err("renamed field");
        assert!(matches!(
            err,
            BackupError::MissingAttribute { feature: 1, ref field } if field == "NAME"
        ));
    }

    #[test]
    fn requires_geometry_type_and_spatial_reference() {
        let set = parse(r#"{"spatialReference": {"wkid": 4326}}"#);
        assert!(matches!(
            convert_feature_set("a", &set),
            Err(BackupError::MissingGeometryType { .. })
        ));
        let set = parse(r#"{"geometryType": "esriGeometryPoint", "spatialReference": {}}"#);
        assert!(matches!(
            convert_feature_set("a", &set),
            Err(BackupError::MissingSpatialReference { .. })
        ));
    }

    #[test]
    fn converts_values_by_kind() {
        let spec = |kind, remote_type: &str| PropertySpec {
            name: "v".to_string(),
            kind,
            remote_type: remote_type.to_string(),
        };
        let date = spec(FieldKind::Text, DATE_FIELD_TYPE);
        assert_eq!(
            property_value(&date, &serde_json::json!(1_700_000_000_000_i64)),
            Value::Text("2023-11-14T22:13:20.000Z".to_string())
        );
        assert_eq!(property_value(&date, &serde_json::Value::Null), Value::Null);

        let int = spec(FieldKind::Integer, "esriFieldTypeInteger");
        assert_eq!(property_value(&int, &serde_json::json!(42)), Value::Integer(42));

        let float = spec(FieldKind::Float, "esriFieldTypeDouble");
        assert_eq!(property_value(&float, &serde_json::json!(3)), Value::Real(3.0));

        let other = spec(
            FieldKind::Other("esriFieldTypeXML".to_string()),
            "esriFieldTypeXML",
        );
        assert_eq!(
            property_value(&other, &serde_json::json!(12)),
            Value::Text("12".to_string())
        );
    }
}
