//! Swath-profile geometry.
//!
//! A [`Profile`] declares a rectangular swath by center, length, width and
//! strike angle. The derived [`ProfileFrame`] carries the profile-local
//! orthonormal basis and projects working coordinates into (par, perp)
//! pairs: `perp` is the distance along the profile's long axis (normal to
//! strike, the binning axis) and `par` the distance across the swath
//! (along strike, the width-constrained axis).

use ndarray::Axis;
use serde::{Deserialize, Serialize};

use crate::core::ramp::RampConfig;
use crate::core::reference::ReferenceFrame;
use crate::types::{
    CoordinateFrame, PointSeries, ReferencePoint, SwathError, SwathResult,
};

const KM_TO_M: f64 = 1.0e3;

/// Where a profile center is anchored
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ProfileCenter {
    /// Planar map coordinates in kilometers
    Planar { x: f64, y: f64 },
    /// Geographic longitude/latitude, projected through the given UTM zone
    Geographic { lon: f64, lat: f64, epsg: u32 },
}

impl ProfileCenter {
    pub fn frame(&self) -> CoordinateFrame {
        match *self {
            ProfileCenter::Planar { .. } => CoordinateFrame::Planar,
            ProfileCenter::Geographic { epsg, .. } => CoordinateFrame::Geographic { epsg },
        }
    }

    pub fn coords(&self) -> (f64, f64) {
        match *self {
            ProfileCenter::Planar { x, y } => (x, y),
            ProfileCenter::Geographic { lon, lat, .. } => (lon, lat),
        }
    }
}

/// One swath profile. Lengths are stored in meters; constructors take
/// kilometers, matching the input convention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub center: ProfileCenter,
    /// Swath length along the binning axis, meters
    pub length: f64,
    /// Swath width across the binning axis, meters
    pub width: f64,
    /// Strike in degrees, normalized so positive inputs map to strike-180
    pub strike: f64,
    /// Bin width in meters; None derives it from point density
    pub bin_width: Option<f64>,
    /// Ramp estimation for this profile's tracks
    pub flatten: Option<RampConfig>,
    /// Reference point; only the first profile's is honored per run
    pub reference: Option<ReferencePoint>,
}

impl Profile {
    pub fn new(
        name: impl Into<String>,
        center: ProfileCenter,
        length_km: f64,
        width_km: f64,
        strike_deg: f64,
    ) -> SwathResult<Self> {
        let name = name.into();
        if !(length_km.is_finite() && length_km > 0.0) {
            return Err(SwathError::Configuration(format!(
                "profile {}: length must be positive, got {}",
                name, length_km
            )));
        }
        if !(width_km.is_finite() && width_km > 0.0) {
            return Err(SwathError::Configuration(format!(
                "profile {}: width must be positive, got {}",
                name, width_km
            )));
        }
        if !strike_deg.is_finite() {
            return Err(SwathError::Configuration(format!(
                "profile {}: strike must be finite",
                name
            )));
        }
        let strike = if strike_deg > 0.0 {
            strike_deg - 180.0
        } else {
            strike_deg
        };
        Ok(Self {
            name,
            center,
            length: length_km * KM_TO_M,
            width: width_km * KM_TO_M,
            strike,
            bin_width: None,
            flatten: None,
            reference: None,
        })
    }

    /// Fix the bin width (kilometers) instead of deriving it from density.
    pub fn with_bin_width(mut self, bin_width_km: f64) -> SwathResult<Self> {
        if !(bin_width_km.is_finite() && bin_width_km > 0.0) {
            return Err(SwathError::Configuration(format!(
                "profile {}: bin width must be positive, got {}",
                self.name, bin_width_km
            )));
        }
        self.bin_width = Some(bin_width_km * KM_TO_M);
        Ok(self)
    }

    pub fn with_flatten(mut self, config: RampConfig) -> Self {
        self.flatten = Some(config);
        self
    }

    pub fn with_reference(mut self, reference: ReferencePoint) -> Self {
        self.reference = Some(reference);
        self
    }
}

/// Profile-local coordinates of a point set
#[derive(Debug, Clone)]
pub struct LocalCoords {
    /// Along-strike (cross-swath) coordinate, meters
    pub par: PointSeries,
    /// Strike-normal (binning) coordinate, meters
    pub perp: PointSeries,
}

impl LocalCoords {
    pub fn len(&self) -> usize {
        self.perp.len()
    }

    pub fn is_empty(&self) -> bool {
        self.perp.is_empty()
    }

    /// Coordinate pairs at the given indices, in index order.
    pub fn select(&self, indices: &[usize]) -> LocalCoords {
        LocalCoords {
            par: self.par.select(Axis(0), indices),
            perp: self.perp.select(Axis(0), indices),
        }
    }
}

/// The resolved working-frame geometry of one profile.
#[derive(Debug, Clone)]
pub struct ProfileFrame {
    /// Center in working meters
    pub x0: f64,
    pub y0: f64,
    /// Along-strike unit vector
    pub s: [f64; 2],
    /// Strike-normal unit vector
    pub n: [f64; 2],
    pub half_length: f64,
    pub half_width: f64,
}

impl ProfileFrame {
    /// Resolve the profile center to working meters and derive the basis.
    pub fn build(profile: &Profile, reference: &ReferenceFrame) -> SwathResult<Self> {
        let (cx, cy) = profile.center.coords();
        let (x0, y0) = reference.localize_point(profile.center.frame(), cx, cy)?;
        let theta = profile.strike.to_radians();
        Ok(Self {
            x0,
            y0,
            s: [theta.sin(), theta.cos()],
            n: [theta.cos(), -theta.sin()],
            half_length: profile.length / 2.0,
            half_width: profile.width / 2.0,
        })
    }

    /// Project working coordinates into the profile-local frame.
    /// Pure and reproducible bit-for-bit.
    pub fn project(&self, east: &PointSeries, north: &PointSeries) -> LocalCoords {
        let dx = east.mapv(|v| v - self.x0);
        let dy = north.mapv(|v| v - self.y0);
        LocalCoords {
            par: &dx * self.s[0] + &dy * self.s[1],
            perp: &dx * self.n[0] + &dy * self.n[1],
        }
    }

    /// Project a single working point, returning (par, perp).
    pub fn project_point(&self, east: f64, north: f64) -> (f64, f64) {
        let dx = east - self.x0;
        let dy = north - self.y0;
        (
            dx * self.s[0] + dy * self.s[1],
            dx * self.n[0] + dy * self.n[1],
        )
    }

    /// Indices of points inside the swath box. Bounds are inclusive and
    /// an empty selection is valid. The returned index set must be used
    /// to filter every aligned array of the dataset.
    pub fn select_in_swath(&self, coords: &LocalCoords) -> Vec<usize> {
        coords
            .par
            .iter()
            .zip(coords.perp.iter())
            .enumerate()
            .filter(|(_, (&par, &perp))| {
                par >= -self.half_width
                    && par <= self.half_width
                    && perp >= -self.half_length
                    && perp <= self.half_length
            })
            .map(|(i, _)| i)
            .collect()
    }

    /// Perpendicular-axis offset of a working point, used to mark fault
    /// traces on the distance axis.
    pub fn fault_offset(&self, east: f64, north: f64) -> f64 {
        self.project_point(east, north).1
    }

    /// Map-view outline of the swath: the closed rectangle followed by
    /// the two endpoints of the profile's long axis.
    pub fn outline(&self) -> (PointSeries, PointSeries) {
        let (hw, hl) = (self.half_width, self.half_length);
        let corner = |sw: f64, nl: f64| {
            (
                self.x0 + sw * hw * self.s[0] + nl * hl * self.n[0],
                self.y0 + sw * hw * self.s[1] + nl * hl * self.n[1],
            )
        };
        let pts = [
            corner(-1.0, -1.0),
            corner(1.0, -1.0),
            corner(1.0, 1.0),
            corner(-1.0, 1.0),
            corner(-1.0, -1.0),
            corner(0.0, -1.0),
            corner(0.0, 1.0),
        ];
        (
            pts.iter().map(|p| p.0).collect(),
            pts.iter().map(|p| p.1).collect(),
        )
    }
}
