use thiserror::Error;

/// Crate error type for backup runs.
#[derive(Debug, Error)]
pub enum BackupError {
    /// Wraps errors returned by `rusqlite`.
    #[error(transparent)]
    Sql(#[from] rusqlite::Error),
    /// Wraps errors returned by the `wkb` crate.
    #[error(transparent)]
    Wkb(#[from] wkb::error::WkbError),
    /// Wraps transport and status errors returned by `reqwest`.
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    /// A response body could not be decoded.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// The portal answered with an error envelope.
    #[error("remote error {code}: {message}")]
    Remote { code: i64, message: String },
    /// Sign-in was rejected or returned no token.
    #[error("authentication failed: {0}")]
    Authentication(String),
    /// A required setting is missing or invalid.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// An item has no service URL to query.
    #[error("item {item_id} has no service url")]
    MissingServiceUrl { item_id: String },
    /// A feature has no attribute for a schema property.
    #[error("feature {feature} has no attribute '{field}'")]
    MissingAttribute { feature: usize, field: String },
    /// A feature geometry lacks the payload required by the layer geometry kind.
    #[error("feature {feature} has a malformed {kind} geometry: {reason}")]
    MalformedGeometry {
        feature: usize,
        kind: &'static str,
        reason: &'static str,
    },
    /// A layer query did not report a geometry type.
    #[error("layer '{layer_name}' does not report a geometry type")]
    MissingGeometryType { layer_name: String },
    /// A layer query did not report a usable spatial reference.
    #[error("layer '{layer_name}' does not report a spatial reference")]
    MissingSpatialReference { layer_name: String },
    /// A geometry type in metadata could not be mapped to a supported WKB geometry type.
    #[error("unsupported geometry type: {0}")]
    UnsupportedGeometryType(String),
    /// Invalid or mixed `z` / `m` dimension flags in GeoPackage metadata.
    #[error("invalid or mixed geometry dimension (z={z}, m={m})")]
    InvalidDimension { z: i8, m: i8 },
    /// Invalid GeoPackage geometry flags byte.
    #[error("invalid gpkg geometry flags: {0:#04x}")]
    InvalidGpkgGeometryFlags(u8),
    /// GeoPackage geometry blob is too short for the header or its envelope.
    #[error("invalid gpkg geometry length: got {len} bytes, required {required}")]
    InvalidGpkgGeometryLength { len: usize, required: usize },
    /// The GeoPackage file is expected to exist but does not.
    #[error("GeoPackage file does not exist: {}", .0.display())]
    FileNotFound(std::path::PathBuf),
    /// The GeoPackage file is expected to be new but already exists.
    #[error("GeoPackage file already exists: {}", .0.display())]
    FileAlreadyExists(std::path::PathBuf),
    /// A write was attempted on a read-only connection.
    #[error("operation not allowed on read-only connection")]
    ReadOnly,
    /// A layer with the same name already exists.
    #[error("layer already exists: {layer_name}")]
    LayerAlreadyExists { layer_name: String },
    /// A layer with the same name does not exist.
    #[error("no such layer: {layer_name}")]
    MissingLayer { layer_name: String },
    /// A plain table with the same name already exists.
    #[error("table already exists: {table_name}")]
    TableAlreadyExists { table_name: String },
    /// Referenced `srs_id` does not exist in `gpkg_spatial_ref_sys`.
    #[error("srs_id {srs_id} not found in gpkg_spatial_ref_sys")]
    MissingSpatialRefSysId { srs_id: i32 },
    /// Layer schema has no primary key column.
    #[error("no primary key column found for layer: {layer_name}")]
    MissingPrimaryKeyColumn { layer_name: String },
    /// A column type declared in SQLite metadata is not supported by this crate.
    #[error("unsupported column type for column '{column}': {declared_type}")]
    UnsupportedColumnType {
        column: String,
        declared_type: String,
    },
}

pub type Result<T> = std::result::Result<T, BackupError>;
