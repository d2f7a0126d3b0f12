//! Conversion of geometry JSON into `geo_types` geometries.
//!
//! Z and M values are dropped. Rings are not assembled into polygons with
//! holes: every ring becomes the exterior of its own polygon.

use super::model::{EsriGeometry, Position};
use crate::error::{BackupError, Result};
use crate::schema::GeometryKind;
use geo_types::{
    Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon,
    Point, Polygon, Rect,
};

/// Build the geometry of feature number `feature` for a layer of kind `kind`.
pub fn convert_geometry(
    geometry: &EsriGeometry,
    kind: GeometryKind,
    feature: usize,
) -> Result<Geometry<f64>> {
    let malformed = |reason| BackupError::MalformedGeometry {
        feature,
        kind: kind.as_str(),
        reason,
    };

    match kind {
        GeometryKind::Point => point(geometry)
            .map(Geometry::Point)
            .ok_or_else(|| malformed("missing x/y")),
        GeometryKind::MultiPoint => {
            let points = geometry
                .points
                .as_deref()
                .ok_or_else(|| malformed("missing points"))?;
            multi_point(points)
                .map(Geometry::MultiPoint)
                .ok_or_else(|| malformed("point with fewer than two ordinates"))
        }
        GeometryKind::MultiLineString => {
            let paths = geometry
                .paths
                .as_deref()
                .ok_or_else(|| malformed("missing paths"))?;
            multi_line_string(paths)
                .map(Geometry::MultiLineString)
                .ok_or_else(|| malformed("vertex with fewer than two ordinates"))
        }
        GeometryKind::MultiPolygon => {
            let rings = geometry
                .rings
                .as_deref()
                .ok_or_else(|| malformed("missing rings"))?;
            multi_polygon(rings)
                .map(Geometry::MultiPolygon)
                .ok_or_else(|| malformed("vertex with fewer than two ordinates"))
        }
        GeometryKind::GeometryCollection => collection(geometry)
            .map(Geometry::GeometryCollection)
            .ok_or_else(|| malformed("vertex with fewer than two ordinates")),
    }
}

fn coord(position: &[Option<f64>]) -> Option<Coord<f64>> {
    match position {
        [Some(x), Some(y), ..] => Some(Coord { x: *x, y: *y }),
        _ => None,
    }
}

fn line_string(positions: &[Position]) -> Option<LineString<f64>> {
    positions
        .iter()
        .map(|p| coord(p))
        .collect::<Option<Vec<_>>>()
        .map(LineString::new)
}

fn point(geometry: &EsriGeometry) -> Option<Point<f64>> {
    Some(Point::new(geometry.x?, geometry.y?))
}

fn multi_point(points: &[Position]) -> Option<MultiPoint<f64>> {
    points
        .iter()
        .map(|p| coord(p).map(Point::from))
        .collect::<Option<Vec<_>>>()
        .map(MultiPoint::new)
}

fn multi_line_string(paths: &[Vec<Position>]) -> Option<MultiLineString<f64>> {
    paths
        .iter()
        .map(|path| line_string(path))
        .collect::<Option<Vec<_>>>()
        .map(MultiLineString::new)
}

fn multi_polygon(rings: &[Vec<Position>]) -> Option<MultiPolygon<f64>> {
    rings
        .iter()
        .map(|ring| line_string(ring).map(|exterior| Polygon::new(exterior, vec![])))
        .collect::<Option<Vec<_>>>()
        .map(MultiPolygon::new)
}

fn envelope(geometry: &EsriGeometry) -> Option<Polygon<f64>> {
    let min = Coord {
        x: geometry.xmin?,
        y: geometry.ymin?,
    };
    let max = Coord {
        x: geometry.xmax?,
        y: geometry.ymax?,
    };
    Some(Rect::new(min, max).to_polygon())
}

/// Gather every payload part present; `None` only when a present part is invalid.
fn collection(geometry: &EsriGeometry) -> Option<GeometryCollection<f64>> {
    let mut parts = Vec::new();
    if let Some(point) = point(geometry) {
        parts.push(Geometry::Point(point));
    }
    if let Some(points) = &geometry.points {
        parts.push(Geometry::MultiPoint(multi_point(points)?));
    }
    if let Some(paths) = &geometry.paths {
        parts.push(Geometry::MultiLineString(multi_line_string(paths)?));
    }
    if let Some(rings) = &geometry.rings {
        parts.push(Geometry::MultiPolygon(multi_polygon(rings)?));
    }
    if let Some(envelope) = envelope(geometry) {
        parts.push(Geometry::Polygon(envelope));
    }
    Some(GeometryCollection::new_from(parts))
}
