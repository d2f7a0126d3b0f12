// cf. https://www.geopackage.org/spec140/index.html#table_definition_sql

// "GPKG" in ASCII, and GeoPackage 1.4.0.
const SQL_GPKG_PRAGMAS: &str = "
PRAGMA application_id = 1196444487;
PRAGMA user_version = 10400;
";

// gpkg_spatial_ref_sys: the SRS catalog referenced by gpkg_contents and
// gpkg_geometry_columns.
const SQL_GPKG_SPATIAL_REF_SYS: &str = "
CREATE TABLE gpkg_spatial_ref_sys (
  srs_name TEXT NOT NULL,
  srs_id INTEGER PRIMARY KEY,
  organization TEXT NOT NULL,
  organization_coordsys_id INTEGER NOT NULL,
  definition  TEXT NOT NULL,
  description TEXT
);
";

// gpkg_contents: one row per feature layer of the backup.
const SQL_GPKG_CONTENTS: &str = "
CREATE TABLE gpkg_contents (
  table_name TEXT NOT NULL PRIMARY KEY,
  data_type TEXT NOT NULL,
  identifier TEXT UNIQUE,
  description TEXT DEFAULT '',
  last_change DATETIME NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
  min_x DOUBLE,
  min_y DOUBLE,
  max_x DOUBLE,
  max_y DOUBLE,
  srs_id INTEGER,
  CONSTRAINT fk_gc_r_srs_id FOREIGN KEY (srs_id) REFERENCES gpkg_spatial_ref_sys(srs_id)
);
";

// gpkg_geometry_columns: geometry column, type and dimension of each layer.
const SQL_GPKG_GEOMETRY_COLUMNS: &str = "
CREATE TABLE gpkg_geometry_columns (
  table_name TEXT NOT NULL,
  column_name TEXT NOT NULL,
  geometry_type_name TEXT NOT NULL,
  srs_id INTEGER NOT NULL,
  z TINYINT NOT NULL,
  m TINYINT NOT NULL,
  CONSTRAINT pk_geom_cols PRIMARY KEY (table_name, column_name),
  CONSTRAINT uk_gc_table_name UNIQUE (table_name),
  CONSTRAINT fk_gc_tn FOREIGN KEY (table_name) REFERENCES gpkg_contents(table_name),
  CONSTRAINT fk_gc_srs FOREIGN KEY (srs_id) REFERENCES gpkg_spatial_ref_sys (srs_id)
);
";

// gpkg_extensions: every layer registers its RTree index here.
const SQL_GPKG_EXTENSIONS: &str = "
CREATE TABLE gpkg_extensions (
  table_name TEXT,
  column_name TEXT,
  extension_name TEXT NOT NULL,
  definition TEXT NOT NULL,
  scope TEXT NOT NULL,
  CONSTRAINT ge_tce UNIQUE (table_name, column_name, extension_name)
);
";

pub(crate) const SQL_LIST_LAYERS: &str =
    "SELECT table_name FROM gpkg_contents WHERE data_type = 'features' ORDER BY table_name";

pub(crate) const SQL_LAYER_EXISTS: &str =
    "SELECT EXISTS(SELECT 1 FROM gpkg_contents WHERE table_name = ?1)";

pub(crate) const SQL_TABLE_EXISTS: &str =
    "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)";

pub(crate) const SQL_LIST_PLAIN_TABLES: &str = "
SELECT name FROM sqlite_master
WHERE type = 'table'
  AND name NOT LIKE 'gpkg_%'
  AND name NOT LIKE 'rtree_%'
  AND name NOT LIKE 'sqlite_%'
  AND name NOT IN (SELECT table_name FROM gpkg_contents)
ORDER BY name
";

pub(crate) const SQL_SRS_EXISTS: &str =
    "SELECT EXISTS(SELECT 1 FROM gpkg_spatial_ref_sys WHERE srs_id = ?1)";

pub(crate) const SQL_INSERT_SRS: &str = "
INSERT INTO gpkg_spatial_ref_sys
  (srs_name, srs_id, organization, organization_coordsys_id, definition, description)
VALUES
  (?1, ?2, ?3, ?4, ?5, ?6)
";

pub(crate) const SQL_INSERT_GPKG_CONTENTS: &str = "
INSERT INTO gpkg_contents
  (table_name, data_type, identifier, description, srs_id)
VALUES
  (?1, 'features', ?2, '', ?3)
";

pub(crate) const SQL_INSERT_GPKG_GEOMETRY_COLUMNS: &str = "
INSERT INTO gpkg_geometry_columns
  (table_name, column_name, geometry_type_name, srs_id, z, m)
VALUES
  (?1, ?2, ?3, ?4, ?5, ?6)
";

pub(crate) const SQL_INSERT_RTREE_EXTENSION: &str = "
INSERT INTO gpkg_extensions
  (table_name, column_name, extension_name, definition, scope)
VALUES
  (?1, ?2, 'gpkg_rtree_index', 'http://www.geopackage.org/spec120/#extension_rtree', 'write-only')
";

pub(crate) const SQL_SELECT_GEOMETRY_COLUMN_META: &str = "
SELECT column_name, geometry_type_name, z, m, srs_id
FROM gpkg_geometry_columns
WHERE table_name = ?1
";

pub(crate) const SQL_DELETE_LAYER_META: &str = "
DELETE FROM gpkg_extensions WHERE table_name = ?1;
DELETE FROM gpkg_geometry_columns WHERE table_name = ?1;
DELETE FROM gpkg_contents WHERE table_name = ?1;
";

pub(crate) fn sql_create_table(table_name: &str, column_defs: &str) -> String {
    format!(r#"CREATE TABLE "{table_name}" ({column_defs})"#)
}

pub(crate) fn sql_drop_table(table_name: &str) -> String {
    format!(r#"DROP TABLE IF EXISTS "{table_name}""#)
}

pub(crate) fn sql_table_columns(table_name: &str) -> String {
    format!("SELECT name, type, pk FROM pragma_table_info('{table_name}')")
}

pub(crate) fn sql_count_rows(table_name: &str) -> String {
    format!(r#"SELECT COUNT(*) FROM "{table_name}""#)
}

pub(crate) fn sql_select_features<'a, I>(
    layer_name: &str,
    geometry_column: &str,
    primary_key_column: &str,
    other_columns: I,
) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut columns = vec![
        format!(r#""{geometry_column}""#),
        format!(r#""{primary_key_column}""#),
    ];
    columns.extend(other_columns.into_iter().map(|name| format!(r#""{name}""#)));

    format!(
        r#"SELECT {} FROM "{layer_name}" ORDER BY "{primary_key_column}""#,
        columns.join(", ")
    )
}

/// `INSERT` with numbered placeholders for each quoted column.
pub(crate) fn sql_insert_row<'a, I>(table_name: &str, columns: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let quoted: Vec<String> = columns
        .into_iter()
        .map(|name| format!(r#""{name}""#))
        .collect();
    let placeholders = (1..=quoted.len())
        .map(|i| format!("?{i}"))
        .collect::<Vec<String>>()
        .join(",");

    format!(
        r#"INSERT INTO "{table_name}" ({}) VALUES ({placeholders})"#,
        quoted.join(",")
    )
}

pub(crate) fn sql_update_extent(layer_name: &str, geometry_column: &str) -> String {
    format!(
        r#"UPDATE gpkg_contents SET
  min_x = (SELECT MIN(ST_MinX("{c}")) FROM "{t}"),
  min_y = (SELECT MIN(ST_MinY("{c}")) FROM "{t}"),
  max_x = (SELECT MAX(ST_MaxX("{c}")) FROM "{t}"),
  max_y = (SELECT MAX(ST_MaxY("{c}")) FROM "{t}"),
  last_change = strftime('%Y-%m-%dT%H:%M:%fZ','now')
WHERE table_name = ?1"#,
        t = layer_name,
        c = geometry_column,
    )
}

pub(crate) fn initialize_gpkg(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SQL_GPKG_PRAGMAS)?;
    conn.execute_batch(SQL_GPKG_SPATIAL_REF_SYS)?;
    register_default_srs_ids(conn)?;
    conn.execute_batch(SQL_GPKG_CONTENTS)?;
    conn.execute_batch(SQL_GPKG_GEOMETRY_COLUMNS)?;
    conn.execute_batch(SQL_GPKG_EXTENSIONS)?;
    Ok(())
}

pub(crate) const EPSG4326_WKT: &str = r#"GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563,AUTHORITY["EPSG","7030"]],AUTHORITY["EPSG","6326"]],PRIMEM["Greenwich",0,AUTHORITY["EPSG","8901"]],UNIT["degree",0.0174532925199433,AUTHORITY["EPSG","9122"]],AXIS["Latitude",NORTH],AXIS["Longitude",EAST],AUTHORITY["EPSG","4326"]]"#;

pub(crate) const EPSG3857_WKT: &str = r#"PROJCS["WGS 84 / Pseudo-Mercator",GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563,AUTHORITY["EPSG","7030"]],AUTHORITY["EPSG","6326"]],PRIMEM["Greenwich",0,AUTHORITY["EPSG","8901"]],UNIT["degree",0.0174532925199433,AUTHORITY["EPSG","9122"]],AUTHORITY["EPSG","4326"]],PROJECTION["Mercator_1SP"],PARAMETER["central_meridian",0],PARAMETER["scale_factor",1],PARAMETER["false_easting",0],PARAMETER["false_northing",0],UNIT["metre",1,AUTHORITY["EPSG","9001"]],AXIS["Easting",EAST],AXIS["Northing",NORTH],EXTENSION["PROJ4","+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +nadgrids=@null +wktext +no_defs"],AUTHORITY["EPSG","3857"]]"#;

/// Name and WKT for the codes we can register without a remote definition.
pub(crate) fn well_known_srs(code: i32) -> Option<(&'static str, &'static str)> {
    match code {
        4326 => Some(("WGS 84", EPSG4326_WKT)),
        3857 => Some(("WGS 84 / Pseudo-Mercator", EPSG3857_WKT)),
        _ => None,
    }
}

// The three rows every GeoPackage must carry.
fn register_default_srs_ids(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    conn.execute(
        SQL_INSERT_SRS,
        rusqlite::params!["WGS 84", 4326, "EPSG", 4326, EPSG4326_WKT, "WGS 84"],
    )?;
    conn.execute(
        SQL_INSERT_SRS,
        rusqlite::params![
            "Undefined Cartesian SRS",
            -1,
            "NONE",
            -1,
            "undefined",
            "undefined Cartesian coordinate reference system"
        ],
    )?;
    conn.execute(
        SQL_INSERT_SRS,
        rusqlite::params![
            "Undefined geographic SRS",
            0,
            "NONE",
            0,
            "undefined",
            "undefined geographic coordinate reference system"
        ],
    )?;
    Ok(())
}

// cf. https://www.geopackage.org/spec140/index.html#extension_rtree
fn rtree_name(table: &str, geom_column: &str) -> String {
    format!("rtree_{table}_{geom_column}")
}

pub(crate) fn gpkg_rtree_drop_sql(table: &str, geom_column: &str) -> String {
    format!(r#"DROP TABLE IF EXISTS "{}";"#, rtree_name(table, geom_column))
}

fn gpkg_rtree_create_sql(table: &str, geom_column: &str) -> String {
    format!(
        r#"CREATE VIRTUAL TABLE "{}" USING rtree(id, minx, maxx, miny, maxy);"#,
        rtree_name(table, geom_column)
    )
}

fn gpkg_rtree_triggers_sql(table: &str, geom_column: &str, id_column: &str) -> String {
    format!(
        r#"CREATE TRIGGER "{r}_insert" AFTER INSERT ON "{t}"
  WHEN (NEW."{c}" NOT NULL AND NOT ST_IsEmpty(NEW."{c}"))
BEGIN
  INSERT OR REPLACE INTO "{r}" VALUES (
    NEW."{i}",
    ST_MinX(NEW."{c}"), ST_MaxX(NEW."{c}"),
    ST_MinY(NEW."{c}"), ST_MaxY(NEW."{c}")
  );
END;

CREATE TRIGGER "{r}_update6" AFTER UPDATE OF "{c}" ON "{t}"
  WHEN OLD."{i}" = NEW."{i}" AND
       (NEW."{c}" NOTNULL AND NOT ST_IsEmpty(NEW."{c}"))
BEGIN
  INSERT OR REPLACE INTO "{r}" VALUES (
    NEW."{i}",
    ST_MinX(NEW."{c}"), ST_MaxX(NEW."{c}"),
    ST_MinY(NEW."{c}"), ST_MaxY(NEW."{c}")
  );
END;

CREATE TRIGGER "{r}_update2" AFTER UPDATE OF "{c}" ON "{t}"
  WHEN OLD."{i}" = NEW."{i}" AND
       (NEW."{c}" ISNULL OR ST_IsEmpty(NEW."{c}"))
BEGIN
  DELETE FROM "{r}" WHERE id = OLD."{i}";
END;

CREATE TRIGGER "{r}_delete" AFTER DELETE ON "{t}"
  WHEN OLD."{c}" NOT NULL
BEGIN
  DELETE FROM "{r}" WHERE id = OLD."{i}";
END;"#,
        r = rtree_name(table, geom_column),
        t = table,
        c = geom_column,
        i = id_column
    )
}

/// Create the RTree index and its triggers for a freshly created, empty layer.
pub(crate) fn execute_rtree_sqls(
    conn: &rusqlite::Connection,
    table: &str,
    geom_column: &str,
    id_column: &str,
) -> rusqlite::Result<()> {
    conn.execute_batch(&gpkg_rtree_create_sql(table, geom_column))?;
    conn.execute_batch(&gpkg_rtree_triggers_sql(table, geom_column, id_column))?;
    conn.execute(SQL_INSERT_RTREE_EXTENSION, rusqlite::params![table, geom_column])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_row_numbers_placeholders() {
        let sql = sql_insert_row("parks", ["geom", "name", "acres"]);
        assert_eq!(
            sql,
            r#"INSERT INTO "parks" ("geom","name","acres") VALUES (?1,?2,?3)"#
        );
    }

    #[test]
    fn select_features_puts_geometry_and_key_first() {
        let sql = sql_select_features("parks", "geom", "fid", ["name"]);
        assert_eq!(
            sql,
            r#"SELECT "geom", "fid", "name" FROM "parks" ORDER BY "fid""#
        );
    }

    #[test]
    fn initialize_sets_application_id() -> rusqlite::Result<()> {
        let conn = rusqlite::Connection::open_in_memory()?;
        initialize_gpkg(&conn)?;
        let application_id: i64 =
            conn.query_row("PRAGMA application_id", [], |row| row.get(0))?;
        let user_version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        assert_eq!(application_id, 0x4750_4B47);
        assert_eq!(user_version, 10400);

        let srs_count: i64 =
            conn.query_row("SELECT COUNT(*) FROM gpkg_spatial_ref_sys", [], |row| {
                row.get(0)
            })?;
        assert_eq!(srs_count, 3);
        Ok(())
    }
}
