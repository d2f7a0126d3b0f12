//! Plain relational tables written next to the feature layers.
//!
//! These tables are not registered in `gpkg_contents`; GeoPackage readers
//! see them only as ordinary SQLite tables.

use crate::conversions::column_type_to_str;
use crate::error::{BackupError, Result};
use crate::gpkg::unique_column_name;
use crate::ogc_sql::{SQL_TABLE_EXISTS, sql_create_table, sql_insert_row};
use crate::types::ColumnSpec;
use rusqlite::types::Value;
use rusqlite::{Connection, params_from_iter};

/// Name of the leading row-number column of every plain table.
pub const INDEX_COLUMN: &str = "index";

/// Create `table_name` and insert every row inside one transaction.
///
/// Each row holds one value per column in `columns`; a leading `index`
/// column numbering the rows from zero is added in front, named `index_1`
/// (and so on) when a column already uses the name. Fails with
/// [`BackupError::TableAlreadyExists`] if any table of that name exists.
pub fn write_plain_table<I>(
    conn: &Connection,
    table_name: &str,
    columns: &[ColumnSpec],
    rows: I,
) -> Result<usize>
where
    I: IntoIterator<Item = Vec<Value>>,
{
    let exists: bool = conn.query_row(SQL_TABLE_EXISTS, [table_name], |row| row.get(0))?;
    if exists {
        return Err(BackupError::TableAlreadyExists {
            table_name: table_name.to_string(),
        });
    }

    let index_column =
        unique_column_name(INDEX_COLUMN, columns.iter().map(|spec| spec.name.as_str()));

    let mut column_defs = Vec::with_capacity(columns.len() + 1);
    column_defs.push(format!(r#""{index_column}" INTEGER"#));
    column_defs.extend(
        columns
            .iter()
            .map(|spec| format!(r#""{}" {}"#, spec.name, column_type_to_str(spec.column_type))),
    );

    let insert_sql = sql_insert_row(
        table_name,
        std::iter::once(index_column.as_str()).chain(columns.iter().map(|spec| spec.name.as_str())),
    );

    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(&sql_create_table(table_name, &column_defs.join(", ")))?;
    tx.execute_batch(&format!(
        r#"CREATE INDEX "ix_{table_name}_{index_column}" ON "{table_name}" ("{index_column}")"#
    ))?;

    let mut written = 0;
    {
        let mut stmt = tx.prepare(&insert_sql)?;
        for (idx, row) in rows.into_iter().enumerate() {
            let index = Value::Integer(i64::try_from(idx).unwrap_or(i64::MAX));
            stmt.execute(params_from_iter(std::iter::once(index).chain(row)))?;
            written += 1;
        }
    }
    tx.commit()?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::write_plain_table;
    use crate::error::BackupError;
    use crate::types::{ColumnSpec, ColumnType};
    use rusqlite::Connection;
    use rusqlite::types::Value;

    fn inspections() -> Vec<ColumnSpec> {
        vec![
            ColumnSpec::new("OBJECTID", ColumnType::Integer),
            ColumnSpec::new("inspector", ColumnType::Varchar),
        ]
    }

    #[test]
    fn writes_rows_with_leading_index() -> crate::Result<()> {
        let conn = Connection::open_in_memory()?;
        let rows = vec![
            vec![Value::Integer(10), Value::Text("ana".to_string())],
            vec![Value::Integer(11), Value::Null],
        ];
        let written = write_plain_table(&conn, "inspections", &inspections(), rows)?;
        assert_eq!(written, 2);

        let mut stmt = conn.prepare(
            r#"SELECT "index", "OBJECTID", "inspector" FROM "inspections" ORDER BY "index""#,
        )?;
        let got = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        assert_eq!(
            got,
            vec![(0, 10, Some("ana".to_string())), (1, 11, None)]
        );
        Ok(())
    }

    #[test]
    fn field_named_index_keeps_its_values() -> crate::Result<()> {
        let conn = Connection::open_in_memory()?;
        let columns = vec![ColumnSpec::new("Index", ColumnType::Integer)];
        write_plain_table(&conn, "counts", &columns, vec![vec![Value::Integer(42)]])?;

        let (row_number, index): (i64, i64) = conn.query_row(
            r#"SELECT "index_1", "Index" FROM "counts""#,
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        assert_eq!((row_number, index), (0, 42));
        Ok(())
    }

    #[test]
    fn fails_when_table_exists() -> crate::Result<()> {
        let conn = Connection::open_in_memory()?;
        write_plain_table(&conn, "inspections", &inspections(), Vec::new())?;
        let err = write_plain_table(&conn, "inspections", &inspections(), Vec::new())
            .expect_err("second write should fail");
        assert!(matches!(
            err,
            BackupError::TableAlreadyExists { ref table_name } if table_name == "inspections"
        ));
        Ok(())
    }

    #[test]
    fn failed_row_rolls_back_table() -> crate::Result<()> {
        let conn = Connection::open_in_memory()?;
        // Second row is one value short.
        let rows = vec![
            vec![Value::Integer(1), Value::Text("a".to_string())],
            vec![Value::Integer(2)],
        ];
        assert!(write_plain_table(&conn, "inspections", &inspections(), rows).is_err());

        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE name = 'inspections')",
            [],
            |row| row.get(0),
        )?;
        assert!(!exists);
        Ok(())
    }
}
