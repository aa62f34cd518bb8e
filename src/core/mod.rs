//! Core swath-profile processing modules

pub mod binning;
pub mod crossmatch;
pub mod pipeline;
pub mod profile;
pub mod ramp;
pub mod reference;
pub mod stats;

// Re-export main types
pub use binning::{BinConfig, BinDetail, BinnedSeries, Binner};
pub use crossmatch::{AgreementStats, CrossMatchParams, CrossMatcher, StationMatch};
pub use pipeline::{
    CrossMatchResult, FaultOffset, FlattenOutcome, GpsSwath, ProfilePipeline, ProfileResult,
    SeismicSwath, SwathInputs, SwathReport, TopoSwath, TrackSwath,
};
pub use profile::{LocalCoords, Profile, ProfileCenter, ProfileFrame};
pub use ramp::{OverlapResiduals, Ramp, RampConfig, RampDegree, RampEstimator, RampSupport};
pub use reference::ReferenceFrame;
