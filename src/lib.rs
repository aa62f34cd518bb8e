//! GeoSwath: A Modular Geodetic Swath-Profile Engine
//!
//! This library projects heterogeneous geodetic datasets (InSAR velocity
//! tracks, GPS networks, topography, seismicity) into fault-perpendicular
//! swath profiles, aggregates them into robust distance bins, removes
//! long-wavelength ramps and cross-validates InSAR against GPS.

pub mod types;
pub mod io;
pub mod core;

// Re-export main types and functions for easier access
pub use types::{
    CoordinateFrame, Fault, GpsNetwork, GpsOptions, InsarOptions, InsarTrack, LinearFeature,
    PointSeries, ReferencePoint, SeismicCatalog, SwathError, SwathResult, TopographyGrid,
};

pub use self::core::{
    BinnedSeries, Binner, CrossMatcher, Profile, ProfileCenter, ProfileFrame, ProfilePipeline,
    RampConfig, RampDegree, RampEstimator, RampSupport, ReferenceFrame, SwathInputs, SwathReport,
};
