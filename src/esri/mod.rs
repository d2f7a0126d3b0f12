//! JSON model of feature service responses and the lookups over its type tags.

mod classify;
mod geometry;
mod model;

pub use classify::{
    DATE_FIELD_TYPE, classify_field_type, classify_geometry_type, table_column_type,
};
pub use geometry::convert_geometry;
pub use model::{EsriGeometry, Feature, FeatureSet, Field, LayerInfo, Position, SpatialReference, TableRows};
