//! Projection and result output

pub mod export;
pub mod projection;

// Re-export main types
pub use export::{write_binned_profile, write_flattened_track};
pub use projection::{project, UtmProjection};
