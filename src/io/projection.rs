//! WGS84 geographic to UTM forward projection.
//!
//! Stand-in for an external projection service: datasets reference a UTM
//! zone only by its EPSG code (32601-32660 north, 32701-32760 south) and
//! the transverse-Mercator series below converts longitude/latitude into
//! easting/northing in meters.

use crate::types::{SwathError, SwathResult};

// WGS84 ellipsoid
const SEMI_MAJOR: f64 = 6_378_137.0;
const FLATTENING: f64 = 1.0 / 298.257_223_563;
const SCALE_FACTOR: f64 = 0.9996;
const FALSE_EASTING: f64 = 500_000.0;
const FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// A validated UTM zone, ready to project points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UtmProjection {
    epsg: u32,
    zone: u32,
    south: bool,
}

impl UtmProjection {
    /// Validate an EPSG code and build the projection for its zone.
    pub fn from_epsg(epsg: u32) -> SwathResult<Self> {
        let (zone, south) = match epsg {
            32601..=32660 => (epsg - 32600, false),
            32701..=32760 => (epsg - 32700, true),
            _ => {
                return Err(SwathError::Projection(format!(
                    "EPSG:{} is not a WGS84 UTM code",
                    epsg
                )))
            }
        };
        Ok(Self { epsg, zone, south })
    }

    pub fn epsg(&self) -> u32 {
        self.epsg
    }

    /// Central meridian of the zone, in degrees.
    pub fn central_meridian(&self) -> f64 {
        (self.zone as f64 - 1.0) * 6.0 - 180.0 + 3.0
    }

    /// Forward projection of one point to (easting, northing) in meters.
    pub fn forward(&self, lon: f64, lat: f64) -> (f64, f64) {
        let e2 = FLATTENING * (2.0 - FLATTENING);
        let ep2 = e2 / (1.0 - e2);

        let phi = lat.to_radians();
        let dlam = (lon - self.central_meridian()).to_radians();

        let sin_phi = phi.sin();
        let cos_phi = phi.cos();
        let tan_phi = phi.tan();

        let n = SEMI_MAJOR / (1.0 - e2 * sin_phi * sin_phi).sqrt();
        let t = tan_phi * tan_phi;
        let c = ep2 * cos_phi * cos_phi;
        let a = cos_phi * dlam;

        // meridian arc from the equator
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        let m = SEMI_MAJOR
            * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * phi
                - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * phi).sin()
                + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * phi).sin()
                - (35.0 * e6 / 3072.0) * (6.0 * phi).sin());

        let easting = FALSE_EASTING
            + SCALE_FACTOR
                * n
                * (a + (1.0 - t + c) * a.powi(3) / 6.0
                    + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * a.powi(5) / 120.0);

        let mut northing = SCALE_FACTOR
            * (m + n
                * tan_phi
                * (a * a / 2.0
                    + (5.0 - t + 9.0 * c + 4.0 * c * c) * a.powi(4) / 24.0
                    + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * a.powi(6) / 720.0));
        if self.south {
            northing += FALSE_NORTHING_SOUTH;
        }

        (easting, northing)
    }
}

/// One-shot projection of a single point through a validated EPSG code.
pub fn project(lon: f64, lat: f64, epsg: u32) -> SwathResult<(f64, f64)> {
    Ok(UtmProjection::from_epsg(epsg)?.forward(lon, lat))
}
