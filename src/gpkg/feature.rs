use crate::error::{BackupError, Result};
use crate::sql_functions::bounds_from_geometry;
use geo_traits::GeometryTrait;
use rusqlite::types::Value;
use std::collections::HashMap;
use std::sync::Arc;
use wkb::reader::Wkb;

/// A feature read back from a layer: primary key, geometry blob and owned properties.
#[derive(Debug, Clone)]
pub struct GpkgFeature {
    pub(super) id: i64,
    pub(super) geometry: Option<Vec<u8>>,
    pub(super) properties: Vec<Value>,
    pub(super) property_index_by_name: Arc<HashMap<String, usize>>,
}

impl GpkgFeature {
    /// Return the primary key value.
    pub fn id(&self) -> i64 {
        self.id
    }

    /// Decode the geometry column into WKB. `None` for a NULL geometry.
    pub fn geometry(&self) -> Result<Option<Wkb<'_>>> {
        self.geometry
            .as_deref()
            .map(gpkg_geometry_to_wkb)
            .transpose()
    }

    /// Look up a property by column name.
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.property_index_by_name
            .get(name)
            .and_then(|idx| self.properties.get(*idx))
    }

    /// All properties in column order.
    pub fn properties(&self) -> &[Value] {
        &self.properties
    }
}

// cf. https://www.geopackage.org/spec140/index.html#gpb_format
const HEADER_LEN: usize = 8;
const FLAG_LITTLE_ENDIAN: u8 = 0b0000_0001;
const FLAG_ENVELOPE_XY: u8 = 0b0000_0010;
const FLAG_EMPTY: u8 = 0b0001_0000;

/// Strip GeoPackage header and envelope bytes to access raw WKB.
pub(crate) fn gpkg_geometry_to_wkb(b: &[u8]) -> Result<Wkb<'_>> {
    if b.len() < HEADER_LEN {
        return Err(BackupError::InvalidGpkgGeometryLength {
            len: b.len(),
            required: HEADER_LEN,
        });
    }
    let flags = b[3];
    let envelope_size: usize = match (flags & 0b0000_1110) >> 1 {
        0 => 0,  // no envelope
        1 => 32, // [minx, maxx, miny, maxy]
        2 => 48, // [minx, maxx, miny, maxy, minz, maxz]
        3 => 48, // [minx, maxx, miny, maxy, minm, maxm]
        4 => 64, // [minx, maxx, miny, maxy, minz, maxz, minm, maxm]
        _ => return Err(BackupError::InvalidGpkgGeometryFlags(flags)),
    };
    let offset = HEADER_LEN + envelope_size;
    let payload = b
        .get(offset..)
        .ok_or(BackupError::InvalidGpkgGeometryLength {
            len: b.len(),
            required: offset,
        })?;

    Ok(Wkb::try_new(payload)?)
}

/// Encode a geometry as a GeoPackage binary blob.
///
/// Points carry no envelope, other non-empty geometries carry an XY envelope,
/// and geometries without coordinates are flagged empty.
pub(crate) fn geometry_to_gpkg_blob<G>(geometry: &G, srs_id: i32) -> Result<Vec<u8>>
where
    G: GeometryTrait<T = f64>,
{
    let mut wkb = Vec::new();
    wkb::writer::write_geometry(&mut wkb, geometry, &Default::default())?;

    let is_point = matches!(geometry.as_type(), geo_traits::GeometryType::Point(_));
    let bounds = bounds_from_geometry(geometry);

    let mut flags = FLAG_LITTLE_ENDIAN;
    let mut envelope = Vec::new();
    match bounds {
        None => flags |= FLAG_EMPTY,
        Some(_) if is_point => {}
        Some(bounds) => {
            flags |= FLAG_ENVELOPE_XY;
            for v in [bounds.minx, bounds.maxx, bounds.miny, bounds.maxy] {
                envelope.extend_from_slice(&v.to_le_bytes());
            }
        }
    }

    let mut blob = Vec::with_capacity(HEADER_LEN + envelope.len() + wkb.len());
    blob.extend_from_slice(&[0x47, 0x50, 0x00, flags]); // "GP", version 1
    blob.extend_from_slice(&srs_id.to_le_bytes());
    blob.extend_from_slice(&envelope);
    blob.extend_from_slice(&wkb);
    Ok(blob)
}

#[cfg(test)]
mod tests {
    use super::{gpkg_geometry_to_wkb, geometry_to_gpkg_blob};
    use crate::Result;
    use crate::error::BackupError;
    use geo_types::{LineString, MultiLineString, Point};

    fn wkb_of<G: geo_traits::GeometryTrait<T = f64>>(geometry: &G) -> Result<Vec<u8>> {
        let mut wkb = Vec::new();
        wkb::writer::write_geometry(&mut wkb, geometry, &Default::default())?;
        Ok(wkb)
    }

    #[test]
    fn point_blob_has_no_envelope() -> Result<()> {
        let point = Point::new(3.0, -1.0);
        let blob = geometry_to_gpkg_blob(&point, 4326)?;

        assert_eq!(&blob[..4], &[0x47, 0x50, 0x00, 0x01]);
        assert_eq!(&blob[4..8], &4326_i32.to_le_bytes());
        assert_eq!(gpkg_geometry_to_wkb(&blob)?.buf(), wkb_of(&point)?.as_slice());
        Ok(())
    }

    #[test]
    fn line_blob_carries_xy_envelope() -> Result<()> {
        let lines = MultiLineString::new(vec![
            LineString::from(vec![(0.0, 0.0), (4.0, 1.0)]),
            LineString::from(vec![(-2.0, 3.0), (1.0, 5.0)]),
        ]);
        let blob = geometry_to_gpkg_blob(&lines, 3857)?;

        assert_eq!(blob[3], 0x03);
        let envelope: Vec<f64> = blob[8..40]
            .chunks_exact(8)
            .map(|c| f64::from_le_bytes(c.try_into().expect("8 bytes")))
            .collect();
        assert_eq!(envelope, vec![-2.0, 4.0, 0.0, 5.0]);
        assert_eq!(gpkg_geometry_to_wkb(&blob)?.buf(), wkb_of(&lines)?.as_slice());
        Ok(())
    }

    #[test]
    fn empty_geometry_sets_empty_flag() -> Result<()> {
        let empty: MultiLineString<f64> = MultiLineString::new(vec![]);
        let blob = geometry_to_gpkg_blob(&empty, 4326)?;
        assert_eq!(blob[3] & 0b0001_0000, 0b0001_0000);
        Ok(())
    }

    #[test]
    fn rejects_invalid_flags() {
        let mut blob = vec![0x47, 0x50, 0x00, 0x0A, 0, 0, 0, 0];
        blob.extend_from_slice(&[0; 16]);
        assert!(matches!(
            gpkg_geometry_to_wkb(&blob),
            Err(BackupError::InvalidGpkgGeometryFlags(0x0A))
        ));
    }

    #[test]
    fn rejects_truncated_envelope() {
        let blob = vec![0x47, 0x50, 0x00, 0x03, 0, 0, 0, 0, 1, 2, 3];
        assert!(matches!(
            gpkg_geometry_to_wkb(&blob),
            Err(BackupError::InvalidGpkgGeometryLength { required: 40, .. })
        ));
    }
}
