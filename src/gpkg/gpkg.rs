use crate::conversions::{
    column_type_from_str, column_type_to_str, dimension_from_zm, dimension_to_zm,
    geometry_type_from_str, geometry_type_to_str,
};
use crate::error::{BackupError, Result};
use crate::ogc_sql::{
    SQL_DELETE_LAYER_META, SQL_INSERT_GPKG_CONTENTS, SQL_INSERT_GPKG_GEOMETRY_COLUMNS,
    SQL_INSERT_SRS, SQL_LAYER_EXISTS, SQL_LIST_LAYERS, SQL_LIST_PLAIN_TABLES,
    SQL_SELECT_GEOMETRY_COLUMN_META, SQL_SRS_EXISTS, execute_rtree_sqls, gpkg_rtree_drop_sql,
    initialize_gpkg, sql_count_rows, sql_create_table, sql_drop_table, sql_table_columns,
    well_known_srs,
};
use crate::sql_functions::register_spatial_functions;
use crate::types::ColumnSpec;
use rusqlite::OpenFlags;
use std::path::Path;
use tracing::{debug, warn};

use super::layer::GpkgLayer;

/// GeoPackage connection wrapper for writing and reading back layers.
#[derive(Debug)]
pub struct Gpkg {
    conn: rusqlite::Connection,
    read_only: bool,
}

impl Gpkg {
    /// Open a GeoPackage in read-only mode.
    pub fn open_read_only<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = rusqlite::Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        register_spatial_functions(&conn)?;
        Ok(Self {
            conn,
            read_only: true,
        })
    }

    /// Open an existing GeoPackage in read-write mode.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(BackupError::FileNotFound(path.to_path_buf()));
        }

        let conn = rusqlite::Connection::open(path)?;
        register_spatial_functions(&conn)?;
        Ok(Self {
            conn,
            read_only: false,
        })
    }

    /// Create a new GeoPackage file.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            return Err(BackupError::FileAlreadyExists(path.to_path_buf()));
        }

        let conn = rusqlite::Connection::open(path)?;
        initialize_gpkg(&conn)?;
        register_spatial_functions(&conn)?;
        Ok(Self {
            conn,
            read_only: false,
        })
    }

    /// Open the file if it exists, otherwise create and initialize it.
    pub fn open_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::open(path)
        } else {
            debug!(path = %path.display(), "creating GeoPackage");
            Self::new(path)
        }
    }

    /// Create a new GeoPackage in memory
    pub fn new_in_memory() -> Result<Self> {
        let conn = rusqlite::Connection::open_in_memory()?;
        initialize_gpkg(&conn)?;
        register_spatial_functions(&conn)?;
        Ok(Self {
            conn,
            read_only: false,
        })
    }

    /// Register a spatial reference system in `gpkg_spatial_ref_sys`.
    ///
    /// No validation of the WKT or authority fields is performed.
    pub fn register_srs(
        &self,
        srs_name: &str,
        srs_id: i32,
        organization: &str,
        organization_coordsys_id: i32,
        definition: &str,
        description: &str,
    ) -> Result<()> {
        if self.read_only {
            return Err(BackupError::ReadOnly);
        }

        self.conn.execute(
            SQL_INSERT_SRS,
            rusqlite::params![
                srs_name,
                srs_id,
                organization,
                organization_coordsys_id,
                definition,
                description
            ],
        )?;
        Ok(())
    }

    pub fn has_srs(&self, srs_id: i32) -> Result<bool> {
        let exists: bool = self
            .conn
            .query_row(SQL_SRS_EXISTS, [srs_id], |row| row.get(0))?;
        Ok(exists)
    }

    /// Make sure a spatial reference id is present in `gpkg_spatial_ref_sys`.
    ///
    /// Uses the bundled WKT for well-known codes, then the WKT supplied by the
    /// caller, and finally registers an `undefined` definition that still
    /// carries the code. Ids outside the EPSG range are registered under the
    /// `ESRI` authority.
    pub fn ensure_srs(&self, srs_id: i32, remote_wkt: Option<&str>) -> Result<()> {
        if self.has_srs(srs_id)? {
            return Ok(());
        }

        let organization = srs_organization(srs_id);
        let name = format!("{organization}:{srs_id}");
        let (srs_name, definition) = match (well_known_srs(srs_id), remote_wkt) {
            (Some((srs_name, wkt)), _) => (srs_name, wkt),
            (None, Some(wkt)) => (name.as_str(), wkt),
            (None, None) => {
                warn!(srs_id, "no WKT definition available, registering as undefined");
                (name.as_str(), "undefined")
            }
        };
        self.register_srs(srs_name, srs_id, organization, srs_id, definition, &name)
    }

    /// List the names of the feature layers.
    pub fn list_layers(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(SQL_LIST_LAYERS)?;
        let layers = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(layers)
    }

    /// List plain tables that are neither layers nor GeoPackage metadata.
    pub fn list_tables(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(SQL_LIST_PLAIN_TABLES)?;
        let tables = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(tables)
    }

    /// Number of rows in any table of the container.
    pub fn count_rows(&self, table_name: &str) -> Result<i64> {
        let count = self
            .conn
            .query_row(&sql_count_rows(table_name), [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn has_layer(&self, layer_name: &str) -> Result<bool> {
        let exists: bool = self
            .conn
            .query_row(SQL_LAYER_EXISTS, [layer_name], |row| row.get(0))?;
        Ok(exists)
    }

    /// Load a layer definition and metadata by name.
    pub fn open_layer<'a>(&'a self, layer_name: &str) -> Result<GpkgLayer<'a>> {
        if !self.has_layer(layer_name)? {
            return Err(BackupError::MissingLayer {
                layer_name: layer_name.to_string(),
            });
        }

        let (geometry_column, geometry_type, geometry_dimension, srs_id) =
            self.get_geometry_column_and_srs_id(layer_name)?;
        let (primary_key_column, property_columns) =
            self.get_column_specs(layer_name, &geometry_column)?;

        Ok(GpkgLayer::new(
            self,
            layer_name,
            geometry_column,
            primary_key_column,
            geometry_type,
            geometry_dimension,
            srs_id,
            property_columns,
        ))
    }

    /// Create a new, empty feature layer with an RTree spatial index.
    pub fn create_layer<'a>(
        &'a self,
        layer_name: &str,
        geometry_column: &str,
        geometry_type: wkb::reader::GeometryType,
        geometry_dimension: wkb::reader::Dimension,
        srs_id: i32,
        property_columns: &[ColumnSpec],
    ) -> Result<GpkgLayer<'a>> {
        if self.read_only {
            return Err(BackupError::ReadOnly);
        }
        if self.has_layer(layer_name)? {
            return Err(BackupError::LayerAlreadyExists {
                layer_name: layer_name.to_string(),
            });
        }
        if !self.has_srs(srs_id)? {
            return Err(BackupError::MissingSpatialRefSysId { srs_id });
        }

        let geometry_type_name = geometry_type_to_str(geometry_type)?;
        let (z, m) = dimension_to_zm(geometry_dimension);

        let primary_key_column = unique_column_name(
            PRIMARY_KEY_COLUMN,
            std::iter::once(geometry_column).chain(property_columns.iter().map(|c| c.name.as_str())),
        );
        if primary_key_column != PRIMARY_KEY_COLUMN {
            debug!(layer_name, primary_key_column = %primary_key_column, "primary key renamed to avoid a property");
        }

        let mut column_defs = Vec::with_capacity(property_columns.len() + 2);
        column_defs.push(format!(
            r#""{primary_key_column}" INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL"#
        ));
        column_defs.push(format!(r#""{geometry_column}" {geometry_type_name}"#));
        for spec in property_columns {
            let col_type = column_type_to_str(spec.column_type);
            column_defs.push(format!(r#""{}" {col_type}"#, spec.name));
        }

        self.conn
            .execute_batch(&sql_create_table(layer_name, &column_defs.join(", ")))?;
        self.conn.execute(
            SQL_INSERT_GPKG_CONTENTS,
            rusqlite::params![layer_name, layer_name, srs_id],
        )?;
        self.conn.execute(
            SQL_INSERT_GPKG_GEOMETRY_COLUMNS,
            rusqlite::params![
                layer_name,
                geometry_column,
                geometry_type_name,
                srs_id,
                z,
                m
            ],
        )?;
        execute_rtree_sqls(&self.conn, layer_name, geometry_column, &primary_key_column)?;

        Ok(GpkgLayer::new(
            self,
            layer_name,
            geometry_column.to_string(),
            primary_key_column,
            geometry_type,
            geometry_dimension,
            srs_id,
            property_columns.to_vec(),
        ))
    }

    /// Delete a layer together with its index and metadata rows.
    pub fn delete_layer(&self, layer_name: &str) -> Result<()> {
        if self.read_only {
            return Err(BackupError::ReadOnly);
        }

        let (geometry_column, _, _, _) = self.get_geometry_column_and_srs_id(layer_name)?;

        self.conn
            .execute_batch(&gpkg_rtree_drop_sql(layer_name, &geometry_column))?;
        self.conn.execute_batch(&sql_drop_table(layer_name))?;
        for statement in SQL_DELETE_LAYER_META
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            self.conn.execute(statement, [layer_name])?;
        }
        Ok(())
    }

    /// Start a transaction on the underlying connection.
    pub fn transaction(&self) -> Result<rusqlite::Transaction<'_>> {
        Ok(self.conn.unchecked_transaction()?)
    }

    pub(crate) fn connection(&self) -> &rusqlite::Connection {
        &self.conn
    }

    pub(crate) fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Resolve the primary key and the typed property columns of a layer.
    fn get_column_specs(
        &self,
        layer_name: &str,
        geometry_column: &str,
    ) -> Result<(String, Vec<ColumnSpec>)> {
        let mut stmt = self.conn.prepare(&sql_table_columns(layer_name))?;
        let columns = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i32>(2)? != 0,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut primary_key = None;
        let mut property_columns = Vec::new();
        for (name, declared_type, is_primary_key) in columns {
            if is_primary_key {
                primary_key = Some(name);
                continue;
            }
            if name == geometry_column {
                continue;
            }
            let column_type = column_type_from_str(&declared_type).ok_or_else(|| {
                BackupError::UnsupportedColumnType {
                    column: name.clone(),
                    declared_type: declared_type.clone(),
                }
            })?;
            property_columns.push(ColumnSpec { name, column_type });
        }

        let primary_key = primary_key.ok_or_else(|| BackupError::MissingPrimaryKeyColumn {
            layer_name: layer_name.to_string(),
        })?;
        Ok((primary_key, property_columns))
    }

    /// Resolve the geometry column metadata and SRS information for a layer.
    fn get_geometry_column_and_srs_id(
        &self,
        layer_name: &str,
    ) -> Result<(
        String,
        wkb::reader::GeometryType,
        wkb::reader::Dimension,
        i32,
    )> {
        let (geometry_column, geometry_type_str, z, m, srs_id) = self.conn.query_row(
            SQL_SELECT_GEOMETRY_COLUMN_META,
            [layer_name],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i8>(2)?,
                    row.get::<_, i8>(3)?,
                    row.get::<_, i32>(4)?,
                ))
            },
        )?;

        let geometry_type = geometry_type_from_str(&geometry_type_str)?;
        let geometry_dimension = dimension_from_zm(z, m)?;

        Ok((geometry_column, geometry_type, geometry_dimension, srs_id))
    }
}

/// Preferred name of a layer's integer primary key.
const PRIMARY_KEY_COLUMN: &str = "fid";

/// `base`, or `base_1`, `base_2`, ... when SQLite would see a clash with one
/// of the `taken` names. Column names compare case-insensitively.
pub(crate) fn unique_column_name<'a, I>(base: &str, taken: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let taken: Vec<String> = taken.into_iter().map(str::to_ascii_lowercase).collect();
    let is_free = |name: &str| !taken.contains(&name.to_ascii_lowercase());
    if is_free(base) {
        return base.to_string();
    }
    (1..)
        .map(|n| format!("{base}_{n}"))
        .find(|name| is_free(name))
        .unwrap_or_else(|| base.to_string())
}

fn srs_organization(srs_id: i32) -> &'static str {
    if (1..=32767).contains(&srs_id) {
        "EPSG"
    } else {
        "ESRI"
    }
}
