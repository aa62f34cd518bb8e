//! Robust distance binning along a profile.
//!
//! Points are partitioned into uniform half-open bins over the swath
//! length, NaN values are dropped, sparsely occupied bins are skipped and
//! the surviving members are percentile-clipped before the bin's center
//! (median) and dispersion (standard deviation) are computed. The output
//! series is sparse over populated bins only.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::core::profile::LocalCoords;
use crate::core::stats::{nan_median, nan_percentile, nan_std};
use crate::types::{PointSeries, SwathError, SwathResult};

/// Binning policy for one series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinConfig {
    /// Extra edge coverage on each side of the swath, meters
    pub margin: f64,
    /// Bins need strictly more than this many clean points to be emitted
    pub min_count: usize,
    /// Symmetric percentile clip (keep [100-p, p]); None disables clipping
    pub clip_percentile: Option<f64>,
}

impl Default for BinConfig {
    fn default() -> Self {
        Self {
            margin: 1.0,          // catches points sitting exactly on the swath ends
            min_count: 10,
            clip_percentile: Some(95.0),
        }
    }
}

impl BinConfig {
    /// Elevation policy: every occupied bin is emitted, unclipped.
    pub fn topographic() -> Self {
        Self {
            margin: 0.0,
            min_count: 0,
            clip_percentile: None,
        }
    }

    /// Bin step for `count` in-swath points over a profile of `length`
    /// meters: the explicit width when configured, otherwise one bin per
    /// 100-point group. Recomputed per dataset per profile.
    pub fn resolve_width(explicit: Option<f64>, length: f64, count: usize) -> f64 {
        match explicit {
            Some(w) => w,
            None => length / (count as f64 / 100.0),
        }
    }
}

/// Clipped members of all emitted bins, concatenated in bin order
#[derive(Debug, Clone, Default)]
pub struct BinDetail {
    pub par: PointSeries,
    pub perp: PointSeries,
    pub values: PointSeries,
}

/// Sparse robust aggregation of one series along the profile axis.
#[derive(Debug, Clone, Default)]
pub struct BinnedSeries {
    /// Bin-center distances along the profile, meters
    pub distance: PointSeries,
    /// Robust bin centers (median of the clipped members)
    pub mean: PointSeries,
    /// Bin dispersions (standard deviation of the clipped members)
    pub std: PointSeries,
    /// Per-point detail of the clipped members
    pub detail: BinDetail,
}

impl BinnedSeries {
    pub fn len(&self) -> usize {
        self.distance.len()
    }

    pub fn is_empty(&self) -> bool {
        self.distance.is_empty()
    }
}

/// Partitions profile-local points into robust distance bins.
#[derive(Debug, Clone)]
pub struct Binner {
    config: BinConfig,
}

impl Binner {
    pub fn new(config: BinConfig) -> Self {
        Self { config }
    }

    /// Measurement-series policy (occupancy floor and percentile clip).
    pub fn standard() -> Self {
        Self::new(BinConfig::default())
    }

    /// Elevation-series policy.
    pub fn topographic() -> Self {
        Self::new(BinConfig::topographic())
    }

    pub fn config(&self) -> &BinConfig {
        &self.config
    }

    /// Uniform bin edges covering [-length/2 - margin, length/2 + margin].
    fn edges(&self, length: f64, step: f64) -> Vec<f64> {
        let start = -length / 2.0 - self.config.margin;
        let stop = length / 2.0 + self.config.margin;
        let mut edges = Vec::new();
        let mut k = 0usize;
        loop {
            let e = start + k as f64 * step;
            edges.push(e);
            if e >= stop {
                break;
            }
            k += 1;
        }
        edges
    }

    /// Aggregate `values` over uniform bins of `step` meters spanning a
    /// profile of `length` meters. The input arrays are index-aligned
    /// in-swath points; an empty input yields an empty series.
    pub fn bin(
        &self,
        length: f64,
        step: f64,
        coords: &LocalCoords,
        values: &PointSeries,
    ) -> SwathResult<BinnedSeries> {
        if coords.perp.len() != values.len() || coords.par.len() != values.len() {
            return Err(SwathError::Shape(format!(
                "binner: {} coordinates for {} values",
                coords.perp.len(),
                values.len()
            )));
        }
        if !(step.is_finite() && step > 0.0) {
            debug!("Bin step {} is not a positive width, no bins emitted", step);
            return Ok(BinnedSeries::default());
        }

        let edges = self.edges(length, step);
        let nbins = edges.len().saturating_sub(1);
        let mut members: Vec<Vec<usize>> = vec![Vec::new(); nbins];
        for (i, &perp) in coords.perp.iter().enumerate() {
            let idx = edges.partition_point(|&e| e <= perp);
            if idx >= 1 && idx <= nbins {
                members[idx - 1].push(i);
            }
        }

        let mut distance = Vec::new();
        let mut mean = Vec::new();
        let mut std = Vec::new();
        let mut detail_par = Vec::new();
        let mut detail_perp = Vec::new();
        let mut detail_values = Vec::new();

        for (j, bin_members) in members.iter().enumerate() {
            if bin_members.is_empty() {
                continue;
            }
            let clean: Vec<usize> = bin_members
                .iter()
                .copied()
                .filter(|&i| !values[i].is_nan())
                .collect();
            if clean.len() <= self.config.min_count {
                debug!(
                    "{} clean points within the bin at {:.1} m, skipped",
                    clean.len(),
                    edges[j] + (edges[j + 1] - edges[j]) / 2.0
                );
                continue;
            }

            let bin_values = PointSeries::from_iter(clean.iter().map(|&i| values[i]));
            let kept: Vec<usize> = match self.config.clip_percentile {
                Some(p) => {
                    let lo = nan_percentile(&bin_values, 100.0 - p);
                    let hi = nan_percentile(&bin_values, p);
                    clean
                        .iter()
                        .copied()
                        .filter(|&i| values[i] >= lo && values[i] <= hi)
                        .collect()
                }
                None => clean,
            };

            let kept_values = PointSeries::from_iter(kept.iter().map(|&i| values[i]));
            distance.push(edges[j] + (edges[j + 1] - edges[j]) / 2.0);
            mean.push(nan_median(&kept_values));
            std.push(nan_std(&kept_values));
            detail_par.extend(kept.iter().map(|&i| coords.par[i]));
            detail_perp.extend(kept.iter().map(|&i| coords.perp[i]));
            detail_values.extend(kept_values.iter().copied());
        }

        Ok(BinnedSeries {
            distance: PointSeries::from(distance),
            mean: PointSeries::from(mean),
            std: PointSeries::from(std),
            detail: BinDetail {
                par: PointSeries::from(detail_par),
                perp: PointSeries::from(detail_perp),
                values: PointSeries::from(detail_values),
            },
        })
    }
}
