//! Serde model of the feature service `query` response (`f=json`).

use serde::Deserialize;
use serde_json::{Map, Value};

/// One page (or the concatenation of all pages) of a layer or table query.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureSet {
    #[serde(default)]
    pub geometry_type: Option<String>,
    #[serde(default)]
    pub spatial_reference: Option<SpatialReference>,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default)]
    pub features: Vec<Feature>,
    #[serde(default)]
    pub exceeded_transfer_limit: bool,
}

impl FeatureSet {
    /// Append the features of a following page.
    pub fn extend_page(&mut self, page: FeatureSet) {
        if self.fields.is_empty() {
            self.fields = page.fields;
        }
        if self.geometry_type.is_none() {
            self.geometry_type = page.geometry_type;
        }
        if self.spatial_reference.is_none() {
            self.spatial_reference = page.spatial_reference;
        }
        self.features.extend(page.features);
        self.exceeded_transfer_limit = page.exceeded_transfer_limit;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpatialReference {
    #[serde(default)]
    pub wkid: Option<i32>,
    #[serde(default)]
    pub latest_wkid: Option<i32>,
    #[serde(default)]
    pub wkt: Option<String>,
}

impl SpatialReference {
    /// `latestWkid` when present, `wkid` otherwise.
    pub fn epsg(&self) -> Option<i32> {
        self.latest_wkid.or(self.wkid)
    }
}

/// Remote field descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub alias: Option<String>,
}

impl Field {
    pub fn new(name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
            alias: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub geometry: Option<EsriGeometry>,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

/// A coordinate tuple; Z and M may follow X and Y and may be `null`.
pub type Position = Vec<Option<f64>>;

/// Every payload shape the geometry JSON can carry.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EsriGeometry {
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
    #[serde(default)]
    pub points: Option<Vec<Position>>,
    #[serde(default)]
    pub paths: Option<Vec<Vec<Position>>>,
    #[serde(default)]
    pub rings: Option<Vec<Vec<Position>>>,
    #[serde(default)]
    pub xmin: Option<f64>,
    #[serde(default)]
    pub ymin: Option<f64>,
    #[serde(default)]
    pub xmax: Option<f64>,
    #[serde(default)]
    pub ymax: Option<f64>,
}

/// The parts of a layer's or table's `f=json` description used for querying.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerInfo {
    #[serde(default)]
    pub object_id_field: Option<String>,
}

/// Full row set of a standalone table.
#[derive(Debug, Clone, Default)]
pub struct TableRows {
    pub fields: Vec<Field>,
    pub rows: Vec<Map<String, Value>>,
}

impl From<FeatureSet> for TableRows {
    fn from(set: FeatureSet) -> Self {
        Self {
            fields: set.fields,
            rows: set.features.into_iter().map(|f| f.attributes).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_polygon_query_response() -> serde_json::Result<()> {
        let body = r#"{
            "objectIdFieldName": "OBJECTID",
            "geometryType": "esriGeometryPolygon",
            "spatialReference": {"wkid": 102100, "latestWkid": 3857},
            "fields": [
                {"name": "OBJECTID", "type": "esriFieldTypeOID", "alias": "OBJECTID"},
                {"name": "PARK_NAME", "type": "esriFieldTypeString"}
            ],
            "features": [{
                "attributes": {"OBJECTID": 1, "PARK_NAME": "Umstead"},
                "geometry": {"rings": [[[0, 0], [1, 0], [1, 1], [0, 0]]]}
            }],
            "exceededTransferLimit": true
        }"#;
        let set: FeatureSet = serde_json::from_str(body)?;

        assert_eq!(set.geometry_type.as_deref(), Some("esriGeometryPolygon"));
        assert_eq!(set.spatial_reference.as_ref().and_then(|s| s.epsg()), Some(3857));
        assert_eq!(set.fields[1], Field::new("PARK_NAME", "esriFieldTypeString"));
        assert!(set.exceeded_transfer_limit);
        let rings = set.features[0]
            .geometry
            .as_ref()
            .and_then(|g| g.rings.as_ref())
            .map(Vec::len);
        assert_eq!(rings, Some(1));
        Ok(())
    }

    #[test]
    fn parses_null_geometry_and_zm_positions() -> serde_json::Result<()> {
        let body = r#"{
            "features": [
                {"attributes": {"A": 1}, "geometry": null},
                {"attributes": {"A": 2}, "geometry": {"paths": [[[1, 2, 3, null]]]}}
            ]
        }"#;
        let set: FeatureSet = serde_json::from_str(body)?;
        assert!(set.features[0].geometry.is_none());
        let paths = set.features[1]
            .geometry
            .as_ref()
            .and_then(|g| g.paths.clone())
            .unwrap_or_default();
        assert_eq!(paths, vec![vec![vec![Some(1.0), Some(2.0), Some(3.0), None]]]);
        Ok(())
    }

    #[test]
    fn layer_info_names_object_id_field() -> serde_json::Result<()> {
        let info: LayerInfo = serde_json::from_str(
            r#"{"id": 0, "name": "Trails", "type": "Feature Layer", "objectIdField": "FID",
                "maxRecordCount": 2000, "fields": []}"#,
        )?;
        assert_eq!(info.object_id_field.as_deref(), Some("FID"));

        let info: LayerInfo = serde_json::from_str(r#"{"id": 1, "type": "Table"}"#)?;
        assert!(info.object_id_field.is_none());
        Ok(())
    }

    #[test]
    fn spatial_reference_falls_back_to_wkid() {
        let sr = SpatialReference {
            wkid: Some(2264),
            ..Default::default()
        };
        assert_eq!(sr.epsg(), Some(2264));
    }

    #[test]
    fn extend_page_keeps_first_page_metadata() {
        let mut first = FeatureSet {
            geometry_type: Some("esriGeometryPoint".to_string()),
            fields: vec![Field::new("A", "esriFieldTypeInteger")],
            features: vec![Feature::default()],
            exceeded_transfer_limit: true,
            ..Default::default()
        };
        first.extend_page(FeatureSet {
            features: vec![Feature::default(), Feature::default()],
            ..Default::default()
        });
        assert_eq!(first.features.len(), 3);
        assert_eq!(first.fields.len(), 1);
        assert!(!first.exceeded_transfer_limit);
    }
}
