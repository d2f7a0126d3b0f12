//! GeoPackage container surface backed by rusqlite.
//!
//! Feature layers go through [`Gpkg`] and [`GpkgLayer`]; plain attribute
//! tables are written with [`write_plain_table`] on a raw connection.

mod feature;
mod gpkg;
mod layer;
mod table;

pub use feature::GpkgFeature;
pub use gpkg::Gpkg;
pub use layer::GpkgLayer;
pub use table::{INDEX_COLUMN, write_plain_table};

pub(crate) use gpkg::unique_column_name;
pub(crate) use feature::{geometry_to_gpkg_blob, gpkg_geometry_to_wkb};
