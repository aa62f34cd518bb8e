//! Reference-frame translation.
//!
//! Every dataset of a run shares one optional [`ReferencePoint`], resolved
//! once from the first profile. This stage turns raw input coordinates
//! (planar kilometers, or geographic longitude/latitude plus a UTM zone)
//! into working planar coordinates in meters, relative to that point.
//! Raw coordinate arrays are never written; the translated series land in
//! each dataset's `east`/`north` working fields.

use log::debug;

use crate::io::projection::UtmProjection;
use crate::types::{
    CoordinateFrame, Fault, GpsNetwork, InsarTrack, LinearFeature, PointSeries, Polyline,
    ReferencePoint, SeismicCatalog, SwathResult, TopographyGrid,
};

const KM_TO_M: f64 = 1.0e3;

/// Translates dataset coordinates into reference-relative working meters.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceFrame {
    reference: Option<ReferencePoint>,
}

impl ReferenceFrame {
    pub fn new(reference: Option<ReferencePoint>) -> Self {
        Self { reference }
    }

    pub fn reference(&self) -> Option<ReferencePoint> {
        self.reference
    }

    /// Translate one point given in its declared frame to working meters.
    pub fn localize_point(
        &self,
        frame: CoordinateFrame,
        x: f64,
        y: f64,
    ) -> SwathResult<(f64, f64)> {
        match frame {
            CoordinateFrame::Planar => {
                let (rx, ry) = self.reference.map_or((0.0, 0.0), |r| (r.lon, r.lat));
                Ok(((x - rx) * KM_TO_M, (y - ry) * KM_TO_M))
            }
            CoordinateFrame::Geographic { epsg } => {
                let utm = UtmProjection::from_epsg(epsg)?;
                let (rx, ry) = match self.reference {
                    Some(r) => utm.forward(r.lon, r.lat),
                    None => (0.0, 0.0),
                };
                let (e, n) = utm.forward(x, y);
                Ok((e - rx, n - ry))
            }
        }
    }

    /// Translate coordinate arrays given in their declared frame to
    /// working meters.
    pub fn localize(
        &self,
        frame: CoordinateFrame,
        x: &PointSeries,
        y: &PointSeries,
    ) -> SwathResult<(PointSeries, PointSeries)> {
        match frame {
            CoordinateFrame::Planar => {
                let (rx, ry) = self.reference.map_or((0.0, 0.0), |r| (r.lon, r.lat));
                Ok((x.mapv(|v| (v - rx) * KM_TO_M), y.mapv(|v| (v - ry) * KM_TO_M)))
            }
            CoordinateFrame::Geographic { epsg } => {
                let utm = UtmProjection::from_epsg(epsg)?;
                let (rx, ry) = match self.reference {
                    Some(r) => utm.forward(r.lon, r.lat),
                    None => (0.0, 0.0),
                };
                let mut east = PointSeries::zeros(x.len());
                let mut north = PointSeries::zeros(y.len());
                for (i, (&lon, &lat)) in x.iter().zip(y.iter()).enumerate() {
                    let (e, n) = utm.forward(lon, lat);
                    east[i] = e - rx;
                    north[i] = n - ry;
                }
                Ok((east, north))
            }
        }
    }

    /// Populate a track's working coordinates. On error the track is left
    /// untouched.
    pub fn localize_insar(&self, track: &mut InsarTrack) -> SwathResult<()> {
        let (east, north) = self.localize(track.frame, &track.x, &track.y)?;
        debug!("Translated track {} ({} points)", track.label, east.len());
        track.east = Some(east);
        track.north = Some(north);
        Ok(())
    }

    pub fn localize_gps(&self, network: &mut GpsNetwork) -> SwathResult<()> {
        let (east, north) = self.localize(network.frame, &network.x, &network.y)?;
        debug!(
            "Translated network {} ({} stations)",
            network.label,
            east.len()
        );
        network.east = Some(east);
        network.north = Some(north);
        Ok(())
    }

    pub fn localize_topography(&self, grid: &mut TopographyGrid) -> SwathResult<()> {
        let (east, north) = self.localize(grid.frame, &grid.x, &grid.y)?;
        debug!("Translated topography {} ({} points)", grid.label, east.len());
        grid.east = Some(east);
        grid.north = Some(north);
        Ok(())
    }

    pub fn localize_seismicity(&self, catalog: &mut SeismicCatalog) -> SwathResult<()> {
        let (east, north) = self.localize(catalog.frame, &catalog.x, &catalog.y)?;
        debug!(
            "Translated catalog {} ({} hypocenters)",
            catalog.label,
            east.len()
        );
        catalog.east = Some(east);
        catalog.north = Some(north);
        Ok(())
    }

    /// Translate every segment of a line feature. All segments are
    /// converted before any working state is written.
    pub fn localize_feature(&self, feature: &mut LinearFeature) -> SwathResult<()> {
        let mut working = Vec::with_capacity(feature.segments.len());
        for seg in &feature.segments {
            let (x, y) = self.localize(feature.frame, &seg.x, &seg.y)?;
            working.push(Polyline { x, y });
        }
        debug!(
            "Translated feature {} ({} segments)",
            feature.label,
            working.len()
        );
        feature.working = Some(working);
        Ok(())
    }

    pub fn localize_fault(&self, fault: &mut Fault) -> SwathResult<()> {
        let (east, north) = self.localize_point(fault.frame, fault.x, fault.y)?;
        fault.east = Some(east);
        fault.north = Some(north);
        Ok(())
    }
}
