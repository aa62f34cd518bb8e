//! Plain-text result writers.
//!
//! Binned profiles are written as whitespace-separated columns behind a
//! header comment; corrected track maps as bare x/y/value rows. Both
//! use fixed six-decimal formatting so runs diff cleanly.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use log::debug;

use crate::core::binning::BinnedSeries;
use crate::types::{PointSeries, SwathError, SwathResult};

/// Write a binned profile as `distance mean std` rows.
pub fn write_binned_profile(path: impl AsRef<Path>, series: &BinnedSeries) -> SwathResult<()> {
    let path = path.as_ref();
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "# distance mean std")?;
    for i in 0..series.len() {
        writeln!(
            out,
            "{:.6} {:.6} {:.6}",
            series.distance[i], series.mean[i], series.std[i]
        )?;
    }
    out.flush()?;
    debug!("Wrote {} bins to {}", series.len(), path.display());
    Ok(())
}

/// Write a corrected track map as `x y value` rows. The coordinates are
/// the track's raw input coordinates, aligned with the full value series.
pub fn write_flattened_track(
    path: impl AsRef<Path>,
    x: &PointSeries,
    y: &PointSeries,
    values: &PointSeries,
) -> SwathResult<()> {
    if x.len() != values.len() || y.len() != values.len() {
        return Err(SwathError::Shape(format!(
            "track export: {} x and {} y coordinates for {} values",
            x.len(),
            y.len(),
            values.len()
        )));
    }
    let path = path.as_ref();
    let mut out = BufWriter::new(File::create(path)?);
    for i in 0..values.len() {
        writeln!(out, "{:.6} {:.6} {:.6}", x[i], y[i], values[i])?;
    }
    out.flush()?;
    debug!("Wrote {} points to {}", values.len(), path.display());
    Ok(())
}
