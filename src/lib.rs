//! Back up ArcGIS Online feature layers and tables into one GeoPackage file.
//!
//! ## Overview
//!
//! - `PortalClient` signs in once and fetches item metadata and query results.
//! - `partition_items` splits the configured items into layers and tables.
//! - `convert_feature_set` derives an `OutputSchema` and converts each remote
//!   feature into a `ConvertedFeature`.
//! - `write_layer` writes a converted layer through `Gpkg`; `write_table`
//!   writes a table's rows on a plain SQLite connection.
//! - `run_backup` runs the whole sequence: classify all, write all layers,
//!   then write all tables.
//!
//! The GeoPackage side follows GeoPackage 1.4: every layer gets an RTree
//! spatial index maintained by triggers, which need the `ST_*` functions
//! installed by [`register_spatial_functions`]. `Gpkg` registers them on open.
//!
//! ## Short usage
//!
//! ```no_run
//! use agol_gpkg::{Config, ITEMS, PortalClient, run_backup};
//!
//! let config = Config::from_env()?;
//! let client = PortalClient::sign_in(&config.portal)?;
//! let path = config.output_path(chrono::Local::now().naive_local());
//! let report = run_backup(&client, ITEMS, &path)?;
//! println!("{} layers, {} tables", report.layers.len(), report.tables.len());
//! # Ok::<(), agol_gpkg::BackupError>(())
//! ```
//!
//! ## Reading a backup
//!
//! ```no_run
//! use agol_gpkg::Gpkg;
//!
//! let gpkg = Gpkg::open_read_only("parks_20240309_142705.gpkg")?;
//! for layer_name in gpkg.list_layers()? {
//!     let layer = gpkg.open_layer(&layer_name)?;
//!     for feature in layer.features()? {
//!         let _geom = feature.geometry()?;
//!         let _name = feature.property("NAME");
//!     }
//! }
//! for table in gpkg.list_tables()? {
//!     println!("{table}: {} rows", gpkg.count_rows(&table)?);
//! }
//! # Ok::<(), agol_gpkg::BackupError>(())
//! ```
mod backup;
mod config;
mod conversions;
mod convert;
mod error;
pub mod esri;
mod gpkg;
mod items;
mod ogc_sql;
pub mod portal;
mod schema;
mod sql_functions;
mod types;

pub use backup::{
    BackupPlan, BackupReport, GEOMETRY_COLUMN, PlannedItem, partition_items, run_backup,
    write_layer, write_table,
};
pub use config::{Config, PortalConfig};
pub use convert::{ConvertedFeature, ConvertedLayer, convert_feature_set};
pub use error::{BackupError, Result};
pub use gpkg::{Gpkg, GpkgFeature, GpkgLayer, INDEX_COLUMN, write_plain_table};
pub use items::{ITEMS, SourceItem};
pub use portal::{ContentSource, ItemKind, PortalClient, PortalItem, classify_item};
pub use schema::{FieldKind, GeometryKind, OutputSchema, PropertySpec};
pub use sql_functions::register_spatial_functions;
pub use types::{ColumnSpec, ColumnType};

// Re-export types used in public fields to keep the public API stable.
pub use wkb::reader::{Dimension, GeometryType};
