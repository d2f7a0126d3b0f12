//! `ST_*` scalar functions needed by the RTree triggers and extent queries.

use crate::error::Result;
use crate::gpkg::gpkg_geometry_to_wkb;
use geo_traits::{
    CoordTrait, GeometryCollectionTrait, GeometryTrait, GeometryType, LineStringTrait, LineTrait,
    MultiLineStringTrait, MultiPointTrait, MultiPolygonTrait, PointTrait, PolygonTrait, RectTrait,
    TriangleTrait,
};
use rusqlite::functions::{Context, FunctionFlags};
use rusqlite::types::{Type, ValueRef};
use rusqlite::{Connection, Error};
use wkb::reader::Wkb;

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Bounds {
    pub(crate) minx: f64,
    pub(crate) maxx: f64,
    pub(crate) miny: f64,
    pub(crate) maxy: f64,
}

impl Bounds {
    fn point(x: f64, y: f64) -> Self {
        Self {
            minx: x,
            maxx: x,
            miny: y,
            maxy: y,
        }
    }

    fn union(self, other: Self) -> Self {
        Self {
            minx: self.minx.min(other.minx),
            maxx: self.maxx.max(other.maxx),
            miny: self.miny.min(other.miny),
            maxy: self.maxy.max(other.maxy),
        }
    }
}

#[derive(Default)]
struct BoundsBuilder(Option<Bounds>);

impl BoundsBuilder {
    fn add_bounds(&mut self, other: Option<Bounds>) {
        self.0 = match (self.0, other) {
            (Some(a), Some(b)) => Some(a.union(b)),
            (a, b) => a.or(b),
        };
    }

    fn add_coord<C: CoordTrait<T = f64>>(&mut self, coord: &C) {
        let (x, y) = coord.x_y();
        self.add_bounds(Some(Bounds::point(x, y)));
    }

    fn add_point<P: PointTrait<T = f64>>(&mut self, point: &P) {
        if let Some(coord) = point.coord() {
            self.add_coord(&coord);
        }
    }

    fn add_line_string<L: LineStringTrait<T = f64>>(&mut self, line: &L) {
        for coord in line.coords() {
            self.add_coord(&coord);
        }
    }

    fn add_polygon<P: PolygonTrait<T = f64>>(&mut self, polygon: &P) {
        if let Some(ring) = polygon.exterior() {
            self.add_line_string(&ring);
        }
        for ring in polygon.interiors() {
            self.add_line_string(&ring);
        }
    }
}

/// Register all spatial SQL helper functions in the provided connection.
///
/// Example:
/// ```no_run
/// use rusqlite::Connection;
/// use agol_gpkg::register_spatial_functions;
///
/// let conn = Connection::open_in_memory()?;
/// register_spatial_functions(&conn)?;
/// # Ok::<(), agol_gpkg::BackupError>(())
/// ```
pub fn register_spatial_functions(conn: &Connection) -> Result<()> {
    register_bounds_component(conn, "ST_MinX", |b| b.minx)?;
    register_bounds_component(conn, "ST_MinY", |b| b.miny)?;
    register_bounds_component(conn, "ST_MaxX", |b| b.maxx)?;
    register_bounds_component(conn, "ST_MaxY", |b| b.maxy)?;
    conn.create_scalar_function(
        "ST_IsEmpty",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            Ok(wkb_from_ctx(ctx)?.map(|wkb| i64::from(bounds_from_geometry(&wkb).is_none())))
        },
    )?;
    Ok(())
}

fn register_bounds_component<F>(conn: &Connection, name: &str, f: F) -> Result<()>
where
    F: Fn(Bounds) -> f64 + Copy + Send + Sync + 'static,
{
    conn.create_scalar_function(
        name,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        move |ctx| Ok(wkb_from_ctx(ctx)?.and_then(|wkb| bounds_from_geometry(&wkb).map(f))),
    )?;
    Ok(())
}

fn wkb_from_ctx<'a>(ctx: &'a Context<'a>) -> std::result::Result<Option<Wkb<'a>>, Error> {
    match ctx.get_raw(0) {
        ValueRef::Null => Ok(None),
        ValueRef::Blob(blob) => gpkg_geometry_to_wkb(blob)
            .map(Some)
            .map_err(|err| Error::UserFunctionError(Box::new(err))),
        _ => Err(Error::InvalidFunctionParameterType(0, Type::Blob)),
    }
}

/// XY bounds of a geometry, or `None` when it has no coordinates.
pub(crate) fn bounds_from_geometry<G: GeometryTrait<T = f64>>(geom: &G) -> Option<Bounds> {
    let mut builder = BoundsBuilder::default();
    match geom.as_type() {
        GeometryType::Point(point) => builder.add_point(point),
        GeometryType::LineString(line) => builder.add_line_string(line),
        GeometryType::Polygon(polygon) => builder.add_polygon(polygon),
        GeometryType::MultiPoint(multi) => {
            for point in multi.points() {
                builder.add_point(&point);
            }
        }
        GeometryType::MultiLineString(multi) => {
            for line in multi.line_strings() {
                builder.add_line_string(&line);
            }
        }
        GeometryType::MultiPolygon(multi) => {
            for polygon in multi.polygons() {
                builder.add_polygon(&polygon);
            }
        }
        GeometryType::GeometryCollection(collection) => {
            for child in collection.geometries() {
                builder.add_bounds(bounds_from_geometry(&child));
            }
        }
        GeometryType::Rect(rect) => {
            builder.add_coord(&rect.min());
            builder.add_coord(&rect.max());
        }
        GeometryType::Triangle(triangle) => {
            builder.add_coord(&triangle.first());
            builder.add_coord(&triangle.second());
            builder.add_coord(&triangle.third());
        }
        GeometryType::Line(line) => {
            builder.add_coord(&line.start());
            builder.add_coord(&line.end());
        }
    }
    builder.0
}

#[cfg(test)]
mod tests {
    use super::register_spatial_functions;
    use crate::gpkg::geometry_to_gpkg_blob;
    use geo_types::{Geometry, GeometryCollection, LineString, MultiPolygon, Point, Polygon};
    use rusqlite::{Connection, params};

    fn select_bounds(conn: &Connection, blob: &[u8]) -> rusqlite::Result<(f64, f64, f64, f64)> {
        conn.query_row(
            "SELECT ST_MinX(?1), ST_MaxX(?1), ST_MinY(?1), ST_MaxY(?1)",
            params![blob],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )
    }

    #[test]
    fn st_bounds_for_point() -> crate::Result<()> {
        let conn = Connection::open_in_memory()?;
        register_spatial_functions(&conn)?;

        let blob = geometry_to_gpkg_blob(&Point::new(1.5, -2.0), 4326)?;
        assert_eq!(select_bounds(&conn, &blob)?, (1.5, 1.5, -2.0, -2.0));

        let empty: i64 =
            conn.query_row("SELECT ST_IsEmpty(?1)", params![blob], |row| row.get(0))?;
        assert_eq!(empty, 0);
        Ok(())
    }

    #[test]
    fn st_is_empty_for_empty_linestring() -> crate::Result<()> {
        let conn = Connection::open_in_memory()?;
        register_spatial_functions(&conn)?;

        let line: LineString<f64> = LineString::new(Vec::new());
        let blob = geometry_to_gpkg_blob(&line, 4326)?;

        let (minx, empty): (Option<f64>, i64) =
            conn.query_row("SELECT ST_MinX(?1), ST_IsEmpty(?1)", params![blob], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })?;

        assert!(minx.is_none());
        assert_eq!(empty, 1);
        Ok(())
    }

    #[test]
    fn st_bounds_for_multipolygon_of_rings() -> crate::Result<()> {
        let conn = Connection::open_in_memory()?;
        register_spatial_functions(&conn)?;

        let a = Polygon::new(
            LineString::from(vec![(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 0.0)]),
            vec![],
        );
        let b = Polygon::new(
            LineString::from(vec![(-5.0, 1.0), (-4.0, 1.0), (-4.0, 7.0), (-5.0, 1.0)]),
            vec![],
        );
        let blob = geometry_to_gpkg_blob(&MultiPolygon::new(vec![a, b]), 4326)?;
        assert_eq!(select_bounds(&conn, &blob)?, (-5.0, 2.0, 0.0, 7.0));
        Ok(())
    }

    #[test]
    fn st_bounds_for_geometry_collection() -> crate::Result<()> {
        let conn = Connection::open_in_memory()?;
        register_spatial_functions(&conn)?;

        let point = Geometry::Point(Point::new(5.0, -1.0));
        let line = Geometry::LineString(LineString::from(vec![(-2.0, 2.0), (1.0, 3.0)]));
        let collection = GeometryCollection::from(vec![point, line]);
        let blob = geometry_to_gpkg_blob(&collection, 4326)?;
        assert_eq!(select_bounds(&conn, &blob)?, (-2.0, 5.0, -1.0, 3.0));
        Ok(())
    }

    #[test]
    fn st_functions_pass_null_through() -> crate::Result<()> {
        let conn = Connection::open_in_memory()?;
        register_spatial_functions(&conn)?;

        let (minx, empty): (Option<f64>, Option<i64>) =
            conn.query_row("SELECT ST_MinX(NULL), ST_IsEmpty(NULL)", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })?;
        assert!(minx.is_none());
        assert!(empty.is_none());
        Ok(())
    }
}
