//! Output schema of one backed-up layer.

use crate::esri::{Field, classify_field_type};
use crate::types::{ColumnSpec, ColumnType};
use wkb::reader::GeometryType;

/// Generic property type a remote field is stored as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    Float,
    /// A remote type tag with no generic counterpart, kept verbatim.
    Other(String),
}

impl FieldKind {
    pub fn column_type(&self) -> ColumnType {
        match self {
            Self::Text | Self::Other(_) => ColumnType::Varchar,
            Self::Integer => ColumnType::Integer,
            Self::Float => ColumnType::Double,
        }
    }
}

/// Geometry kind of an output layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryKind {
    Point,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
    GeometryCollection,
}

impl GeometryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Point => "Point",
            Self::MultiPoint => "MultiPoint",
            Self::MultiLineString => "MultiLineString",
            Self::MultiPolygon => "MultiPolygon",
            Self::GeometryCollection => "GeometryCollection",
        }
    }

    pub fn wkb_type(self) -> GeometryType {
        match self {
            Self::Point => GeometryType::Point,
            Self::MultiPoint => GeometryType::MultiPoint,
            Self::MultiLineString => GeometryType::MultiLineString,
            Self::MultiPolygon => GeometryType::MultiPolygon,
            Self::GeometryCollection => GeometryType::GeometryCollection,
        }
    }
}

/// One output property: its name, generic kind and the remote type tag it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertySpec {
    pub name: String,
    pub kind: FieldKind,
    pub remote_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSchema {
    pub geometry: GeometryKind,
    pub properties: Vec<PropertySpec>,
}

impl OutputSchema {
    /// Keep every field that does not classify to "omit", in remote order.
    pub fn from_fields(geometry: GeometryKind, fields: &[Field]) -> Self {
        let properties = fields
            .iter()
            .filter_map(|field| {
                classify_field_type(&field.field_type).map(|kind| PropertySpec {
                    name: field.name.clone(),
                    kind,
                    remote_type: field.field_type.clone(),
                })
            })
            .collect();
        Self {
            geometry,
            properties,
        }
    }

    pub fn column_specs(&self) -> Vec<ColumnSpec> {
        self.properties
            .iter()
            .map(|p| ColumnSpec::new(p.name.clone(), p.kind.column_type()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_object_id_and_keeps_order() {
        let fields = vec![
            Field::new("OBJECTID", "esriFieldTypeOID"),
            Field::new("TRAIL_NAME", "esriFieldTypeString"),
            Field::new("SURFACE", "esriFieldTypeString"),
        ];
        let schema = OutputSchema::from_fields(GeometryKind::MultiLineString, &fields);

        let names: Vec<&str> = schema.properties.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["TRAIL_NAME", "SURFACE"]);
        assert!(schema.properties.iter().all(|p| p.kind == FieldKind::Text));
    }

    #[test]
    fn column_specs_follow_kinds() {
        let fields = vec![
            Field::new("GlobalID", "esriFieldTypeGlobalID"),
            Field::new("ACRES", "esriFieldTypeDouble"),
            Field::new("TIER", "esriFieldTypeSmallInteger"),
            Field::new("OPENED", "esriFieldTypeDate"),
            Field::new("PHOTO", "esriFieldTypeBlob"),
        ];
        let schema = OutputSchema::from_fields(GeometryKind::MultiPolygon, &fields);
        assert_eq!(
            schema.column_specs(),
            vec![
                ColumnSpec::new("ACRES", ColumnType::Double),
                ColumnSpec::new("TIER", ColumnType::Integer),
                ColumnSpec::new("OPENED", ColumnType::Varchar),
                ColumnSpec::new("PHOTO", ColumnType::Varchar),
            ]
        );
        assert_eq!(
            schema.properties[3].kind,
            FieldKind::Other("esriFieldTypeBlob".to_string())
        );
    }
}
