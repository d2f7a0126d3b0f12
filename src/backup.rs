//! One backup run: classify every item, write the layers, then the tables.

use crate::convert::{ConvertedLayer, convert_feature_set, date_value, json_value};
use crate::error::Result;
use crate::esri::{DATE_FIELD_TYPE, TableRows, table_column_type};
use crate::gpkg::{Gpkg, unique_column_name, write_plain_table};
use crate::items::SourceItem;
use crate::portal::{ContentSource, ItemKind, PortalItem, classify_item};
use crate::types::ColumnSpec;
use rusqlite::types::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Preferred name of the geometry column of every written layer; a property
/// of the same name pushes it to `geom_1`, `geom_2`, ...
pub const GEOMETRY_COLUMN: &str = "geom";

/// A configured item paired with its fetched metadata.
#[derive(Debug, Clone)]
pub struct PlannedItem<'a> {
    pub source: &'a SourceItem,
    pub item: PortalItem,
}

/// Items partitioned before anything is written, each list in configuration order.
#[derive(Debug, Clone, Default)]
pub struct BackupPlan<'a> {
    pub layers: Vec<PlannedItem<'a>>,
    pub tables: Vec<PlannedItem<'a>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupReport {
    pub path: PathBuf,
    /// Written layers with their feature counts.
    pub layers: Vec<(String, usize)>,
    /// Written tables with their row counts.
    pub tables: Vec<(String, usize)>,
}

/// Fetch the metadata of every item once and split layers from tables.
pub fn partition_items<'a, S>(source: &S, items: &'a [SourceItem]) -> Result<BackupPlan<'a>>
where
    S: ContentSource + ?Sized,
{
    let mut plan = BackupPlan::default();
    for source_item in items {
        info!("Processing {}...", source_item.name);
        let item = source.item(source_item.item_id)?;
        let planned = PlannedItem {
            source: source_item,
            item,
        };
        match classify_item(&planned.item) {
            ItemKind::Table => {
                info!(
                    "{} is a table. It will be processed after layers.",
                    source_item.name
                );
                plan.tables.push(planned);
            }
            ItemKind::Layer => plan.layers.push(planned),
        }
    }
    Ok(plan)
}

/// Write `layer` as feature layer `name`, replacing a layer of the same name.
///
/// Returns the number of features written.
pub fn write_layer(path: &Path, name: &str, layer: &ConvertedLayer) -> Result<usize> {
    info!("Writing layer {} to {}", name, path.display());

    let gpkg = Gpkg::open_or_create(path)?;
    gpkg.ensure_srs(layer.srs_id, layer.srs_wkt.as_deref())?;

    let columns = layer.schema.column_specs();
    let geometry_column =
        unique_column_name(GEOMETRY_COLUMN, columns.iter().map(|c| c.name.as_str()));

    let tx = gpkg.transaction()?;
    if gpkg.has_layer(name)? {
        debug!(layer = name, "replacing existing layer");
        gpkg.delete_layer(name)?;
    }
    let output = gpkg.create_layer(
        name,
        &geometry_column,
        layer.schema.geometry.wkb_type(),
        wkb::reader::Dimension::Xy,
        layer.srs_id,
        &columns,
    )?;
    for feature in &layer.features {
        output.insert(feature.geometry.as_ref(), feature.values())?;
    }
    output.refresh_extent()?;
    tx.commit()?;

    info!("Writing layer {} to {} complete!", name, path.display());
    Ok(layer.features.len())
}

/// Write every row of `rows` as plain table `name` in the container at `path`.
///
/// Returns the number of rows written.
pub fn write_table(path: &Path, name: &str, rows: &TableRows) -> Result<usize> {
    info!("Writing table {} to {}", name, path.display());

    let columns: Vec<ColumnSpec> = rows
        .fields
        .iter()
        .map(|field| ColumnSpec::new(field.name.clone(), table_column_type(&field.field_type)))
        .collect();
    let values = rows.rows.iter().map(|row| {
        rows.fields
            .iter()
            .map(|field| match row.get(&field.name) {
                None => Value::Null,
                Some(raw) if field.field_type == DATE_FIELD_TYPE => date_value(raw),
                Some(raw) => json_value(raw),
            })
            .collect::<Vec<_>>()
    });

    let conn = rusqlite::Connection::open(path)?;
    let written = write_plain_table(&conn, name, &columns, values)?;
    conn.close().map_err(|(_, e)| e)?;

    info!("Writing table {} to {} complete!", name, path.display());
    Ok(written)
}

/// Back up `items` from `source` into the container at `path`.
///
/// Any failure aborts the run; layers written before it stay in the file.
pub fn run_backup<S>(source: &S, items: &[SourceItem], path: &Path) -> Result<BackupReport>
where
    S: ContentSource + ?Sized,
{
    let plan = partition_items(source, items)?;
    let mut report = BackupReport {
        path: path.to_path_buf(),
        layers: Vec::with_capacity(plan.layers.len()),
        tables: Vec::with_capacity(plan.tables.len()),
    };

    for planned in &plan.layers {
        let set = source.query_features(&planned.item, planned.source.layer)?;
        let converted = convert_feature_set(planned.source.name, &set)?;
        let count = write_layer(path, planned.source.name, &converted)?;
        report.layers.push((planned.source.name.to_string(), count));
    }

    info!("Processing {} table(s)...", plan.tables.len());
    for planned in &plan.tables {
        info!("Processing {}", planned.source.name);
        let rows = source.query_rows(&planned.item, planned.source.layer)?;
        let count = write_table(path, planned.source.name, &rows)?;
        report.tables.push((planned.source.name.to_string(), count));
    }

    Ok(report)
}
