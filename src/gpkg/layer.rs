use crate::error::{BackupError, Result};
use crate::ogc_sql::{sql_count_rows, sql_insert_row, sql_select_features, sql_update_extent};
use crate::types::ColumnSpec;
use geo_traits::GeometryTrait;
use rusqlite::params_from_iter;
use rusqlite::types::{Type, Value};
use std::collections::HashMap;
use std::sync::Arc;

use super::{Gpkg, GpkgFeature, geometry_to_gpkg_blob};

// When issuing the SELECT query, always place these columns first so that
// we don't need to find the positions every time.
const GEOMETRY_INDEX: usize = 0;
const PRIMARY_INDEX: usize = 1;

/// A feature layer with geometry metadata and property columns.
#[derive(Debug)]
pub struct GpkgLayer<'a> {
    pub(super) conn: &'a Gpkg,
    pub layer_name: String,
    pub geometry_column: String,
    pub primary_key_column: String,
    pub geometry_type: wkb::reader::GeometryType,
    pub geometry_dimension: wkb::reader::Dimension,
    pub srs_id: i32,
    pub property_columns: Vec<ColumnSpec>,
    pub(super) property_index_by_name: Arc<HashMap<String, usize>>,
    pub(super) insert_sql: String,
}

impl<'a> GpkgLayer<'a> {
    pub(super) fn new(
        conn: &'a Gpkg,
        layer_name: &str,
        geometry_column: String,
        primary_key_column: String,
        geometry_type: wkb::reader::GeometryType,
        geometry_dimension: wkb::reader::Dimension,
        srs_id: i32,
        property_columns: Vec<ColumnSpec>,
    ) -> Self {
        let property_index_by_name = property_columns
            .iter()
            .enumerate()
            .map(|(idx, column)| (column.name.clone(), idx))
            .collect();
        let insert_sql = sql_insert_row(
            layer_name,
            std::iter::once(geometry_column.as_str())
                .chain(property_columns.iter().map(|spec| spec.name.as_str())),
        );

        Self {
            conn,
            layer_name: layer_name.to_string(),
            geometry_column,
            primary_key_column,
            geometry_type,
            geometry_dimension,
            srs_id,
            property_columns,
            property_index_by_name: Arc::new(property_index_by_name),
            insert_sql,
        }
    }

    /// Read every feature of the layer in primary key order.
    pub fn features(&self) -> Result<Vec<GpkgFeature>> {
        let sql = sql_select_features(
            &self.layer_name,
            &self.geometry_column,
            &self.primary_key_column,
            self.property_columns.iter().map(|spec| spec.name.as_str()),
        );
        let mut stmt = self.conn.connection().prepare(&sql)?;
        let features = stmt
            .query_map([], |row| {
                let geometry = match row.get_ref(GEOMETRY_INDEX)? {
                    rusqlite::types::ValueRef::Blob(bytes) => Some(bytes.to_vec()),
                    rusqlite::types::ValueRef::Null => None,
                    other => {
                        return Err(rusqlite::Error::InvalidColumnType(
                            GEOMETRY_INDEX,
                            self.geometry_column.clone(),
                            other.data_type(),
                        ));
                    }
                };
                let id: Option<i64> = row.get(PRIMARY_INDEX)?;
                let id = id.ok_or_else(|| {
                    rusqlite::Error::InvalidColumnType(
                        PRIMARY_INDEX,
                        self.primary_key_column.clone(),
                        Type::Null,
                    )
                })?;
                let properties = (0..self.property_columns.len())
                    .map(|idx| row.get::<_, Value>(idx + 2))
                    .collect::<rusqlite::Result<Vec<Value>>>()?;

                Ok(GpkgFeature {
                    id,
                    geometry,
                    properties,
                    property_index_by_name: Arc::clone(&self.property_index_by_name),
                })
            })?
            .collect::<std::result::Result<Vec<GpkgFeature>, _>>()?;

        Ok(features)
    }

    /// Number of rows in the layer.
    pub fn count(&self) -> Result<i64> {
        let count =
            self.conn
                .connection()
                .query_row(&sql_count_rows(&self.layer_name), [], |row| row.get(0))?;
        Ok(count)
    }

    /// Insert a feature with an optional geometry and property values in column order.
    ///
    /// Example:
    /// ```no_run
    /// use geo_types::Point;
    /// use agol_gpkg::Gpkg;
    /// use rusqlite::types::Value;
    ///
    /// let gpkg = Gpkg::open("data/example.gpkg")?;
    /// let layer = gpkg.open_layer("points")?;
    /// layer.insert(Some(&Point::new(1.0, 2.0)), [Value::from("alpha".to_string())])?;
    /// # Ok::<(), agol_gpkg::BackupError>(())
    /// ```
    pub fn insert<G, P>(&self, geometry: Option<&G>, properties: P) -> Result<()>
    where
        G: GeometryTrait<T = f64>,
        P: IntoIterator<Item = Value>,
    {
        if self.conn.is_read_only() {
            return Err(BackupError::ReadOnly);
        }

        let geom = match geometry {
            Some(geometry) => Value::Blob(geometry_to_gpkg_blob(geometry, self.srs_id)?),
            None => Value::Null,
        };
        let params = std::iter::once(geom).chain(properties);

        let mut stmt = self.conn.connection().prepare_cached(&self.insert_sql)?;
        stmt.execute(params_from_iter(params))?;
        Ok(())
    }

    /// Recompute the layer bounds stored in `gpkg_contents`.
    pub fn refresh_extent(&self) -> Result<()> {
        if self.conn.is_read_only() {
            return Err(BackupError::ReadOnly);
        }
        self.conn.connection().execute(
            &sql_update_extent(&self.layer_name, &self.geometry_column),
            [&self.layer_name],
        )?;
        Ok(())
    }
}
