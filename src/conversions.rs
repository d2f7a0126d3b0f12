//! String forms of geometry and column types as stored in GeoPackage metadata.

use crate::error::BackupError;
use crate::types::ColumnType;
use wkb::reader::{Dimension, GeometryType};

// cf. https://www.geopackage.org/spec140/index.html#geometry_types
const GEOMETRY_TYPE_NAMES: &[(&str, GeometryType)] = &[
    ("POINT", GeometryType::Point),
    ("LINESTRING", GeometryType::LineString),
    ("POLYGON", GeometryType::Polygon),
    ("MULTIPOINT", GeometryType::MultiPoint),
    ("MULTILINESTRING", GeometryType::MultiLineString),
    ("MULTIPOLYGON", GeometryType::MultiPolygon),
    ("GEOMETRYCOLLECTION", GeometryType::GeometryCollection),
];

#[inline]
pub(crate) fn geometry_type_to_str(geometry_type: GeometryType) -> Result<&'static str, BackupError> {
    GEOMETRY_TYPE_NAMES
        .iter()
        .find(|(_, ty)| *ty == geometry_type)
        .map(|(name, _)| *name)
        .ok_or_else(|| BackupError::UnsupportedGeometryType(format!("{geometry_type:?}")))
}

#[inline]
pub(crate) fn geometry_type_from_str(geometry_type_str: &str) -> Result<GeometryType, BackupError> {
    // GEOMETRY is the abstract root type; treat it as a collection.
    if geometry_type_str.eq_ignore_ascii_case("GEOMETRY") {
        return Ok(GeometryType::GeometryCollection);
    }
    GEOMETRY_TYPE_NAMES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(geometry_type_str))
        .map(|(_, ty)| *ty)
        .ok_or_else(|| BackupError::UnsupportedGeometryType(geometry_type_str.to_string()))
}

#[inline]
pub(crate) fn dimension_to_zm(dimension: Dimension) -> (i8, i8) {
    match dimension {
        Dimension::Xy => (0, 0),
        Dimension::Xyz => (1, 0),
        Dimension::Xym => (0, 1),
        Dimension::Xyzm => (1, 1),
    }
}

#[inline]
pub(crate) fn dimension_from_zm(z: i8, m: i8) -> Result<Dimension, BackupError> {
    match (z, m) {
        (0, 0) => Ok(Dimension::Xy),
        (1, 0) => Ok(Dimension::Xyz),
        (0, 1) => Ok(Dimension::Xym),
        (1, 1) => Ok(Dimension::Xyzm),
        // 2 means "optional" in gpkg_geometry_columns; we never write it.
        _ => Err(BackupError::InvalidDimension { z, m }),
    }
}

#[inline]
pub(crate) fn column_type_to_str(column_type: ColumnType) -> &'static str {
    match column_type {
        ColumnType::Integer => "INTEGER",
        ColumnType::Double => "DOUBLE",
        ColumnType::Varchar => "TEXT",
        ColumnType::Boolean => "BOOLEAN",
        ColumnType::DateTime => "DATETIME",
        ColumnType::Blob => "BLOB",
    }
}

#[inline]
pub(crate) fn column_type_from_str(column_type_str: &str) -> Option<ColumnType> {
    // cf. https://www.geopackage.org/spec140/index.html#_sqlite_container
    let upper = column_type_str.to_ascii_uppercase();
    // TEXT(n) and BLOB(n) carry a maximum length.
    let base = upper.split('(').next().unwrap_or_default().trim();
    match base {
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "INTEGER" => Some(ColumnType::Integer),
        "DOUBLE" | "FLOAT" | "REAL" => Some(ColumnType::Double),
        "TEXT" => Some(ColumnType::Varchar),
        "BOOLEAN" => Some(ColumnType::Boolean),
        "DATE" | "DATETIME" | "TIMESTAMP" => Some(ColumnType::DateTime),
        "BLOB" => Some(ColumnType::Blob),
        _ => None,
    }
}
