use ndarray::{s, Array1};
use serde::{Deserialize, Serialize};

/// One-dimensional series of coordinates or measurement values
pub type PointSeries = Array1<f64>;

/// Coordinate frame of a dataset's raw input coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoordinateFrame {
    /// Planar map coordinates in kilometers
    Planar,
    /// Geographic longitude/latitude (WGS84), projected to the given UTM EPSG code
    Geographic { epsg: u32 },
}

/// Reference point shared by every dataset of a run.
///
/// Interpreted in each dataset's declared frame: (longitude, latitude) on the
/// geographic path, kilometer offsets on the planar path. Resolved once from
/// the first profile and passed by value into every translation call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferencePoint {
    pub lon: f64,
    pub lat: f64,
}

/// Load-time options for an InSAR track
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsarOptions {
    pub scale: f64,              // multiplicative value scale
    pub constant: f64,           // additive offset, applied after scaling
    pub samp: usize,             // keep every samp-th point
    pub clip_percentile: f64,    // symmetric outlier clip within bins
    pub incidence_to_mean: bool, // project LOS velocities to the mean incidence angle
}

impl Default for InsarOptions {
    fn default() -> Self {
        Self {
            scale: 1.0,
            constant: 0.0,
            samp: 1,
            clip_percentile: 95.0,
            incidence_to_mean: false,
        }
    }
}

/// One InSAR line-of-sight velocity track.
///
/// `x`/`y` hold the raw input coordinates in the declared frame and are never
/// written after construction; `east`/`north` are the working coordinates in
/// meters, populated by the reference-frame translation.
#[derive(Debug, Clone)]
pub struct InsarTrack {
    pub label: String,
    pub frame: CoordinateFrame,
    pub x: PointSeries,
    pub y: PointSeries,
    /// Working LOS velocity series (scaled, offset, incidence-normalized)
    pub ulos: PointSeries,
    /// LOS series as scaled, before incidence normalization
    pub ulos_raw: PointSeries,
    /// Per-point incidence angles in degrees
    pub incidence: Option<PointSeries>,
    pub clip_percentile: f64,
    pub east: Option<PointSeries>,
    pub north: Option<PointSeries>,
}

impl InsarTrack {
    /// Build a track with default options.
    pub fn new(
        label: impl Into<String>,
        frame: CoordinateFrame,
        x: PointSeries,
        y: PointSeries,
        ulos: PointSeries,
    ) -> SwathResult<Self> {
        Self::with_options(label, frame, x, y, ulos, None, InsarOptions::default())
    }

    /// Build a track, applying decimation, scaling and incidence
    /// normalization once, in that order.
    pub fn with_options(
        label: impl Into<String>,
        frame: CoordinateFrame,
        x: PointSeries,
        y: PointSeries,
        ulos: PointSeries,
        incidence: Option<PointSeries>,
        options: InsarOptions,
    ) -> SwathResult<Self> {
        let label = label.into();
        check_aligned(x.len(), y.len(), &label, "y")?;
        check_aligned(x.len(), ulos.len(), &label, "ulos")?;
        if let Some(ref inc) = incidence {
            check_aligned(x.len(), inc.len(), &label, "incidence")?;
        }
        if options.samp == 0 {
            return Err(SwathError::Configuration(format!(
                "track {}: samp must be at least 1",
                label
            )));
        }
        if options.incidence_to_mean && incidence.is_none() {
            return Err(SwathError::Configuration(format!(
                "track {}: incidence normalization requires incidence angles",
                label
            )));
        }

        let step = options.samp as isize;
        let x = x.slice(s![..;step]).to_owned();
        let y = y.slice(s![..;step]).to_owned();
        let ulos = ulos.slice(s![..;step]).to_owned();
        let incidence = incidence.map(|inc| inc.slice(s![..;step]).to_owned());

        let ulos_raw = ulos.mapv(|v| v * options.scale + options.constant);
        let ulos = match (&incidence, options.incidence_to_mean) {
            (Some(inc), true) => {
                let mean_inc = inc.mean().unwrap_or(f64::NAN);
                let sin_mean = mean_inc.to_radians().sin();
                &ulos_raw * &inc.mapv(|t| sin_mean / t.to_radians().sin())
            }
            _ => ulos_raw.clone(),
        };

        Ok(Self {
            label,
            frame,
            x,
            y,
            ulos,
            ulos_raw,
            incidence,
            clip_percentile: options.clip_percentile,
            east: None,
            north: None,
        })
    }

    pub fn len(&self) -> usize {
        self.ulos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ulos.is_empty()
    }
}

/// Load-time options for a GPS network
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpsOptions {
    pub scale: f64,
    /// Mean LOS unit vector (east, north, up) to project velocities into
    pub los_projection: Option<[f64; 3]>,
}

impl Default for GpsOptions {
    fn default() -> Self {
        Self {
            scale: 1.0,
            los_projection: None,
        }
    }
}

/// Vertical component of a three-component network
#[derive(Debug, Clone)]
pub struct UpComponent {
    pub velocity: PointSeries,
    pub sigma: PointSeries,
}

/// A GPS velocity network with two or three components per station.
#[derive(Debug, Clone)]
pub struct GpsNetwork {
    pub label: String,
    pub frame: CoordinateFrame,
    pub names: Vec<String>,
    pub x: PointSeries,
    pub y: PointSeries,
    pub ve: PointSeries,
    pub vn: PointSeries,
    pub sigma_ve: PointSeries,
    pub sigma_vn: PointSeries,
    pub up: Option<UpComponent>,
    /// Velocities projected into the mean LOS direction
    pub ulos: Option<PointSeries>,
    pub sigma_los: Option<PointSeries>,
    pub east: Option<PointSeries>,
    pub north: Option<PointSeries>,
}

impl GpsNetwork {
    /// East/north network (two components per station).
    pub fn two_component(
        label: impl Into<String>,
        frame: CoordinateFrame,
        names: Vec<String>,
        x: PointSeries,
        y: PointSeries,
        ve: PointSeries,
        vn: PointSeries,
        sigma_ve: PointSeries,
        sigma_vn: PointSeries,
    ) -> SwathResult<Self> {
        let label = label.into();
        let n = x.len();
        check_aligned(n, y.len(), &label, "y")?;
        check_aligned(n, names.len(), &label, "names")?;
        check_aligned(n, ve.len(), &label, "ve")?;
        check_aligned(n, vn.len(), &label, "vn")?;
        check_aligned(n, sigma_ve.len(), &label, "sigma_ve")?;
        check_aligned(n, sigma_vn.len(), &label, "sigma_vn")?;
        Ok(Self {
            label,
            frame,
            names,
            x,
            y,
            ve,
            vn,
            sigma_ve,
            sigma_vn,
            up: None,
            ulos: None,
            sigma_los: None,
            east: None,
            north: None,
        })
    }

    /// East/north/up network (three components per station).
    pub fn three_component(
        label: impl Into<String>,
        frame: CoordinateFrame,
        names: Vec<String>,
        x: PointSeries,
        y: PointSeries,
        ve: PointSeries,
        vn: PointSeries,
        vu: PointSeries,
        sigma_ve: PointSeries,
        sigma_vn: PointSeries,
        sigma_vu: PointSeries,
    ) -> SwathResult<Self> {
        let mut network =
            Self::two_component(label, frame, names, x, y, ve, vn, sigma_ve, sigma_vn)?;
        check_aligned(network.x.len(), vu.len(), &network.label, "vu")?;
        check_aligned(network.x.len(), sigma_vu.len(), &network.label, "sigma_vu")?;
        network.up = Some(UpComponent {
            velocity: vu,
            sigma: sigma_vu,
        });
        Ok(network)
    }

    /// Apply load-time options: value scaling and the optional LOS projection.
    pub fn with_options(mut self, options: GpsOptions) -> SwathResult<Self> {
        if options.scale != 1.0 {
            let k = options.scale;
            self.ve.mapv_inplace(|v| v * k);
            self.vn.mapv_inplace(|v| v * k);
            self.sigma_ve.mapv_inplace(|v| v * k);
            self.sigma_vn.mapv_inplace(|v| v * k);
            if let Some(up) = self.up.as_mut() {
                up.velocity.mapv_inplace(|v| v * k);
                up.sigma.mapv_inplace(|v| v * k);
            }
        }
        if let Some(p) = options.los_projection {
            let up = self.up.as_ref().ok_or_else(|| {
                SwathError::Configuration(format!(
                    "network {}: LOS projection requires a three-component network",
                    self.label
                ))
            })?;
            self.ulos = Some(&self.ve * p[0] + &self.vn * p[1] + &up.velocity * p[2]);
            self.sigma_los =
                Some(&self.sigma_ve * p[0] + &self.sigma_vn * p[1] + &up.sigma * p[2]);
        }
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

/// A topographic point cloud or unrolled grid.
#[derive(Debug, Clone)]
pub struct TopographyGrid {
    pub label: String,
    pub frame: CoordinateFrame,
    pub x: PointSeries,
    pub y: PointSeries,
    pub z: PointSeries,
    pub east: Option<PointSeries>,
    pub north: Option<PointSeries>,
}

impl TopographyGrid {
    pub fn new(
        label: impl Into<String>,
        frame: CoordinateFrame,
        x: PointSeries,
        y: PointSeries,
        z: PointSeries,
    ) -> SwathResult<Self> {
        let label = label.into();
        check_aligned(x.len(), y.len(), &label, "y")?;
        check_aligned(x.len(), z.len(), &label, "z")?;
        Ok(Self {
            label,
            frame,
            x,
            y,
            z,
            east: None,
            north: None,
        })
    }

    /// Scale elevations once at construction time.
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.z.mapv_inplace(|v| v * scale);
        self
    }
}

/// A catalog of seismic hypocenters.
///
/// Depths are stored in meters; catalogs delivered in kilometers (mean
/// absolute depth below 100) are converted at construction.
#[derive(Debug, Clone)]
pub struct SeismicCatalog {
    pub label: String,
    pub frame: CoordinateFrame,
    pub x: PointSeries,
    pub y: PointSeries,
    pub depth: PointSeries,
    pub magnitude: PointSeries,
    pub east: Option<PointSeries>,
    pub north: Option<PointSeries>,
}

impl SeismicCatalog {
    pub fn new(
        label: impl Into<String>,
        frame: CoordinateFrame,
        x: PointSeries,
        y: PointSeries,
        depth: PointSeries,
        magnitude: PointSeries,
    ) -> SwathResult<Self> {
        let label = label.into();
        check_aligned(x.len(), y.len(), &label, "y")?;
        check_aligned(x.len(), depth.len(), &label, "depth")?;
        check_aligned(x.len(), magnitude.len(), &label, "magnitude")?;

        let mut sum = 0.0;
        let mut count = 0usize;
        for &d in depth.iter() {
            if !d.is_nan() {
                sum += d.abs();
                count += 1;
            }
        }
        let depth = if count > 0 && sum / (count as f64) < 100.0 {
            depth.mapv(|d| d * 1000.0)
        } else {
            depth
        };

        Ok(Self {
            label,
            frame,
            x,
            y,
            depth,
            magnitude,
            east: None,
            north: None,
        })
    }
}

/// One polyline segment of a vector line feature
#[derive(Debug, Clone)]
pub struct Polyline {
    pub x: PointSeries,
    pub y: PointSeries,
}

/// A vector line feature (fault traces, political boundaries) made of
/// polyline segments. Map-view context only, never binned.
#[derive(Debug, Clone)]
pub struct LinearFeature {
    pub label: String,
    pub frame: CoordinateFrame,
    pub segments: Vec<Polyline>,
    /// Reference-translated segments in working meters
    pub working: Option<Vec<Polyline>>,
}

impl LinearFeature {
    pub fn new(
        label: impl Into<String>,
        frame: CoordinateFrame,
        segments: Vec<Polyline>,
    ) -> SwathResult<Self> {
        let label = label.into();
        for (i, seg) in segments.iter().enumerate() {
            if seg.x.len() != seg.y.len() {
                return Err(SwathError::Shape(format!(
                    "{}: segment {} has {} x values but {} y values",
                    label,
                    i,
                    seg.x.len(),
                    seg.y.len()
                )));
            }
        }
        Ok(Self {
            label,
            frame,
            segments,
            working: None,
        })
    }
}

/// A named fault surface trace, reported per profile as a
/// perpendicular-axis offset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fault {
    pub name: String,
    pub frame: CoordinateFrame,
    pub x: f64,
    pub y: f64,
    /// Strike in degrees, normalized like a profile strike
    pub strike: Option<f64>,
    pub east: Option<f64>,
    pub north: Option<f64>,
}

impl Fault {
    pub fn new(
        name: impl Into<String>,
        frame: CoordinateFrame,
        x: f64,
        y: f64,
        strike: Option<f64>,
    ) -> Self {
        Self {
            name: name.into(),
            frame,
            x,
            y,
            strike: strike.map(|s| if s > 0.0 { s - 180.0 } else { s }),
            east: None,
            north: None,
        }
    }
}

fn check_aligned(expect: usize, got: usize, label: &str, what: &str) -> SwathResult<()> {
    if expect != got {
        return Err(SwathError::Shape(format!(
            "{}: {} has length {}, expected {}",
            label, what, got, expect
        )));
    }
    Ok(())
}

/// Error types for swath-profile processing
#[derive(Debug, thiserror::Error)]
pub enum SwathError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Projection error: {0}")]
    Projection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Degenerate fit: {0}")]
    FitDegeneracy(String),

    #[error("Shape mismatch: {0}")]
    Shape(String),
}

/// Result type for swath-profile operations
pub type SwathResult<T> = Result<T, SwathError>;
