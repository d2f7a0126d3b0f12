//! Lookup tables from remote type tags to output types.

use crate::schema::{FieldKind, GeometryKind};
use crate::types::ColumnType;

/// Generic kind for each known field tag; `None` means the field is not kept.
const FIELD_TYPES: &[(&str, Option<Generic>)] = &[
    ("esriFieldTypeOID", None),
    ("esriFieldTypeGUID", None),
    ("esriFieldTypeGlobalID", None),
    ("esriFieldTypeString", Some(Generic::Text)),
    ("esriFieldTypeDate", Some(Generic::Text)),
    ("esriFieldTypeSmallInteger", Some(Generic::Integer)),
    ("esriFieldTypeInteger", Some(Generic::Integer)),
    ("esriFieldTypeSingle", Some(Generic::Float)),
    ("esriFieldTypeDouble", Some(Generic::Float)),
];

const GEOMETRY_TYPES: &[(&str, GeometryKind)] = &[
    ("esriGeometryPoint", GeometryKind::Point),
    ("esriGeometryMultipoint", GeometryKind::MultiPoint),
    ("esriGeometryPolyline", GeometryKind::MultiLineString),
    ("esriGeometryPolygon", GeometryKind::MultiPolygon),
];

pub const DATE_FIELD_TYPE: &str = "esriFieldTypeDate";

#[derive(Clone, Copy)]
enum Generic {
    Text,
    Integer,
    Float,
}

/// Classify a remote field type tag.
///
/// Identifier tags yield `None`; tags missing from the table are passed
/// through as [`FieldKind::Other`].
pub fn classify_field_type(tag: &str) -> Option<FieldKind> {
    match FIELD_TYPES.iter().find(|(known, _)| *known == tag) {
        Some((_, generic)) => generic.map(|g| match g {
            Generic::Text => FieldKind::Text,
            Generic::Integer => FieldKind::Integer,
            Generic::Float => FieldKind::Float,
        }),
        None => Some(FieldKind::Other(tag.to_string())),
    }
}

/// Classify a remote geometry type tag; unknown tags become a geometry collection.
pub fn classify_geometry_type(tag: &str) -> GeometryKind {
    GEOMETRY_TYPES
        .iter()
        .find(|(known, _)| *known == tag)
        .map_or(GeometryKind::GeometryCollection, |(_, kind)| *kind)
}

/// Column type of a field in a plain table, where no field is dropped.
pub fn table_column_type(tag: &str) -> ColumnType {
    match tag {
        "esriFieldTypeOID" | "esriFieldTypeSmallInteger" | "esriFieldTypeInteger"
        | "esriFieldTypeBigInteger" => ColumnType::Integer,
        "esriFieldTypeSingle" | "esriFieldTypeDouble" => ColumnType::Double,
        DATE_FIELD_TYPE => ColumnType::DateTime,
        _ => ColumnType::Varchar,
    }
}
