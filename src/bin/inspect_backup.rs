use agol_gpkg::Gpkg;
use rusqlite::types::Value;
use wkt::to_wkt::write_geometry;

fn main() {
    if let Err(err) = run() {
        eprintln!("inspect_backup failed: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .ok_or("Usage: inspect_backup <path-to-gpkg>")?;
    let gpkg = Gpkg::open_read_only(path)?;

    for layer_name in gpkg.list_layers()? {
        let layer = gpkg.open_layer(&layer_name)?;
        println!(
            "layer: {layer_name} ({:?}, srs_id={})",
            layer.geometry_type, layer.srs_id
        );

        for feature in layer.features()? {
            let mut values = Vec::with_capacity(layer.property_columns.len() + 1);
            let wkt = match feature.geometry()? {
                Some(wkb) => {
                    let mut wkt = String::new();
                    write_geometry(&mut wkt, &wkb)?;
                    wkt
                }
                None => "NULL".to_string(),
            };
            values.push(format!("{}={wkt}", layer.geometry_column));

            for column in &layer.property_columns {
                let value = feature.property(&column.name).unwrap_or(&Value::Null);
                values.push(format!("{}={}", column.name, format_value(value)));
            }

            println!("  fid {}: {}", feature.id(), values.join(", "));
        }
    }

    for table in gpkg.list_tables()? {
        println!("table: {table} ({} rows)", gpkg.count_rows(&table)?);
    }

    Ok(())
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Integer(value) => value.to_string(),
        Value::Real(value) => value.to_string(),
        Value::Text(value) => value.clone(),
        Value::Blob(value) => format!("{value:?}"),
    }
}
