/// SQLite column affinity used for layer and table columns.
///
/// Backups never write `Boolean` or `Blob`; they describe columns of
/// GeoPackages written by other tools when such files are opened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnType {
    Boolean,
    Varchar,
    Double,
    Integer,
    DateTime,
    Blob,
}

/// Name and type of one non-geometry column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub column_type: ColumnType,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}
