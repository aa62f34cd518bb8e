//! GPS to InSAR cross-matching.
//!
//! For each station of a profile's GPS swath, a square window in
//! profile-local coordinates grows around the station until the median
//! of the in-window comparison values is defined, up to a maximum
//! half-size. Every station yields one paired (reference, comparison)
//! tuple; stations without a match carry a NaN comparison value and are
//! dropped from the agreement statistics.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::core::profile::LocalCoords;
use crate::core::stats::{nan_mean, nan_median, nan_std, pearson};
use crate::types::{PointSeries, SwathError, SwathResult};

/// Window growth policy, in working meters
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CrossMatchParams {
    /// Half-size of the first window
    pub initial_half_size: f64,
    /// Half-size increment between attempts
    pub growth_step: f64,
    /// Largest half-size tried
    pub max_half_size: f64,
}

impl Default for CrossMatchParams {
    fn default() -> Self {
        Self {
            initial_half_size: 2000.0,
            growth_step: 2000.0,
            max_half_size: 5000.0,
        }
    }
}

/// One station's comparison against the matched subset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationMatch {
    pub station: String,
    /// Station value, e.g. the GPS velocity projected into the LOS
    pub reference: f64,
    pub reference_sigma: f64,
    /// Median of the comparison values in the matched window; NaN when
    /// no window produced a defined median
    pub comparison: f64,
    /// Dispersion of the matched subset
    pub comparison_sigma: f64,
}

impl StationMatch {
    pub fn is_matched(&self) -> bool {
        !self.comparison.is_nan()
    }
}

/// Point-wise agreement over the matched pairs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgreementStats {
    /// Stations with a defined comparison value
    pub pairs: usize,
    /// Mean of (comparison - reference)
    pub mean_difference: f64,
    /// Standard deviation of (comparison - reference)
    pub std_difference: f64,
    /// Pearson correlation between the two sides
    pub correlation: f64,
}

impl AgreementStats {
    /// Reduce matches to agreement statistics. Unmatched stations are
    /// dropped first.
    pub fn from_matches(matches: &[StationMatch]) -> Self {
        let matched: Vec<&StationMatch> = matches.iter().filter(|m| m.is_matched()).collect();
        let reference = PointSeries::from_iter(matched.iter().map(|m| m.reference));
        let comparison = PointSeries::from_iter(matched.iter().map(|m| m.comparison));
        let difference = &comparison - &reference;
        Self {
            pairs: matched.len(),
            mean_difference: nan_mean(&difference),
            std_difference: nan_std(&difference),
            correlation: pearson(&reference, &comparison),
        }
    }
}

/// Matches reference stations against the comparison points around them.
#[derive(Debug, Clone)]
pub struct CrossMatcher {
    params: CrossMatchParams,
}

impl CrossMatcher {
    /// Matcher with the standard window sequence (2000, 4000, 5000 m).
    pub fn new() -> Self {
        Self {
            params: CrossMatchParams::default(),
        }
    }

    pub fn with_params(params: CrossMatchParams) -> SwathResult<Self> {
        if !(params.initial_half_size > 0.0 && params.growth_step > 0.0) {
            return Err(SwathError::Configuration(format!(
                "window half-size {} and growth step {} must be positive",
                params.initial_half_size, params.growth_step
            )));
        }
        if params.max_half_size < params.initial_half_size {
            return Err(SwathError::Configuration(format!(
                "maximum window half-size {} is smaller than the initial {}",
                params.max_half_size, params.initial_half_size
            )));
        }
        Ok(Self { params })
    }

    pub fn params(&self) -> &CrossMatchParams {
        &self.params
    }

    /// Median and dispersion of the comparison values around one station.
    /// The window grows until the median is defined or the maximum
    /// half-size has been tried; both are NaN when nothing matched.
    pub fn match_point(
        &self,
        par: f64,
        perp: f64,
        comparison: &LocalCoords,
        values: &PointSeries,
    ) -> (f64, f64) {
        let mut half = self.params.initial_half_size.min(self.params.max_half_size);
        loop {
            let mut subset = Vec::new();
            for ((&p, &q), &v) in comparison
                .par
                .iter()
                .zip(comparison.perp.iter())
                .zip(values.iter())
            {
                if (p - par).abs() <= half && (q - perp).abs() <= half {
                    subset.push(v);
                }
            }
            let subset = PointSeries::from(subset);
            let median = nan_median(&subset);
            if !median.is_nan() || half >= self.params.max_half_size {
                return (median, nan_std(&subset));
            }
            half = (half + self.params.growth_step).min(self.params.max_half_size);
        }
    }

    /// Match every station of a network swath against one comparison
    /// point set. All station arrays are index-aligned; the comparison
    /// coordinates and values are aligned with each other.
    pub fn match_network(
        &self,
        names: &[String],
        stations: &LocalCoords,
        reference: &PointSeries,
        reference_sigma: &PointSeries,
        comparison: &LocalCoords,
        values: &PointSeries,
    ) -> SwathResult<Vec<StationMatch>> {
        let n = names.len();
        if stations.perp.len() != n || reference.len() != n || reference_sigma.len() != n {
            return Err(SwathError::Shape(format!(
                "crossmatch: {} stations with {} coordinates and {} values",
                n,
                stations.perp.len(),
                reference.len()
            )));
        }
        if comparison.perp.len() != values.len() {
            return Err(SwathError::Shape(format!(
                "crossmatch: {} comparison coordinates for {} values",
                comparison.perp.len(),
                values.len()
            )));
        }

        let mut matches = Vec::with_capacity(n);
        for i in 0..n {
            let (median, sigma) =
                self.match_point(stations.par[i], stations.perp[i], comparison, values);
            if median.is_nan() {
                debug!(
                    "Station {}: no comparison points within {:.0} m",
                    names[i], self.params.max_half_size
                );
            }
            matches.push(StationMatch {
                station: names[i].clone(),
                reference: reference[i],
                reference_sigma: reference_sigma[i],
                comparison: median,
                comparison_sigma: sigma,
            });
        }
        Ok(matches)
    }
}

impl Default for CrossMatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn coords(par: Vec<f64>, perp: Vec<f64>) -> LocalCoords {
        LocalCoords {
            par: PointSeries::from(par),
            perp: PointSeries::from(perp),
        }
    }

    #[test]
    fn test_single_point_in_first_window() {
        let matcher = CrossMatcher::new();
        let comparison = coords(vec![500.0], vec![-1500.0]);
        let values = array![7.5];
        let (median, sigma) = matcher.match_point(0.0, 0.0, &comparison, &values);
        assert_relative_eq!(median, 7.5);
        assert_relative_eq!(sigma, 0.0);
    }

    #[test]
    fn test_no_points_within_maximum_window() {
        let matcher = CrossMatcher::new();
        let comparison = coords(vec![5001.0], vec![0.0]);
        let values = array![7.5];
        let (median, sigma) = matcher.match_point(0.0, 0.0, &comparison, &values);
        assert!(median.is_nan());
        assert!(sigma.is_nan());
    }

    #[test]
    fn test_window_grows_until_match() {
        // nothing within 2000, one point at Chebyshev distance 3000
        let matcher = CrossMatcher::new();
        let comparison = coords(vec![0.0], vec![3000.0]);
        let values = array![-2.0];
        let (median, _) = matcher.match_point(0.0, 0.0, &comparison, &values);
        assert_relative_eq!(median, -2.0);
    }

    #[test]
    fn test_final_window_is_capped() {
        let matcher = CrossMatcher::new();
        // reachable only by the capped 5000 window, not by 2000 or 4000
        let comparison = coords(vec![4500.0], vec![0.0]);
        let values = array![3.25];
        let (median, _) = matcher.match_point(0.0, 0.0, &comparison, &values);
        assert_relative_eq!(median, 3.25);
    }

    #[test]
    fn test_window_bounds_inclusive() {
        let matcher = CrossMatcher::new();
        let comparison = coords(vec![2000.0], vec![-2000.0]);
        let values = array![1.0];
        let (median, _) = matcher.match_point(0.0, 0.0, &comparison, &values);
        assert_relative_eq!(median, 1.0);
    }

    #[test]
    fn test_nan_values_do_not_stop_growth() {
        // the near window holds only NaN, the far window a real value
        let matcher = CrossMatcher::new();
        let comparison = coords(vec![0.0, 0.0], vec![1000.0, 3500.0]);
        let values = array![f64::NAN, 4.0];
        let (median, sigma) = matcher.match_point(0.0, 0.0, &comparison, &values);
        assert_relative_eq!(median, 4.0);
        assert_relative_eq!(sigma, 0.0);
    }

    #[test]
    fn test_median_and_dispersion_of_subset() {
        let matcher = CrossMatcher::new();
        let comparison = coords(vec![0.0, 100.0, -100.0], vec![0.0, 500.0, -500.0]);
        let values = array![1.0, 2.0, 6.0];
        let (median, sigma) = matcher.match_point(0.0, 0.0, &comparison, &values);
        assert_relative_eq!(median, 2.0);
        assert_relative_eq!(sigma, 14.0_f64.sqrt() / 3.0_f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_match_network_alignment_checked() {
        let matcher = CrossMatcher::new();
        let stations = coords(vec![0.0], vec![0.0]);
        let result = matcher.match_network(
            &["AAAA".into(), "BBBB".into()],
            &stations,
            &array![1.0, 2.0],
            &array![0.1, 0.1],
            &coords(vec![0.0], vec![0.0]),
            &array![1.0],
        );
        assert!(matches!(result, Err(SwathError::Shape(_))));
    }

    #[test]
    fn test_agreement_drops_unmatched_stations() {
        let matches = vec![
            StationMatch {
                station: "AAAA".into(),
                reference: 1.0,
                reference_sigma: 0.1,
                comparison: 1.5,
                comparison_sigma: 0.2,
            },
            StationMatch {
                station: "BBBB".into(),
                reference: 2.0,
                reference_sigma: 0.1,
                comparison: f64::NAN,
                comparison_sigma: f64::NAN,
            },
            StationMatch {
                station: "CCCC".into(),
                reference: 3.0,
                reference_sigma: 0.1,
                comparison: 3.5,
                comparison_sigma: 0.2,
            },
        ];
        let stats = AgreementStats::from_matches(&matches);
        assert_eq!(stats.pairs, 2);
        assert_relative_eq!(stats.mean_difference, 0.5);
        assert_relative_eq!(stats.std_difference, 0.0);
        assert_relative_eq!(stats.correlation, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_agreement_empty_when_nothing_matched() {
        let matches = vec![StationMatch {
            station: "AAAA".into(),
            reference: 1.0,
            reference_sigma: 0.1,
            comparison: f64::NAN,
            comparison_sigma: f64::NAN,
        }];
        let stats = AgreementStats::from_matches(&matches);
        assert_eq!(stats.pairs, 0);
        assert!(stats.mean_difference.is_nan());
        assert!(stats.correlation.is_nan());
    }

    #[test]
    fn test_params_validated() {
        let bad = CrossMatcher::with_params(CrossMatchParams {
            initial_half_size: 0.0,
            ..Default::default()
        });
        assert!(matches!(bad, Err(SwathError::Configuration(_))));
        let bad = CrossMatcher::with_params(CrossMatchParams {
            max_half_size: 1000.0,
            ..Default::default()
        });
        assert!(matches!(bad, Err(SwathError::Configuration(_))));
    }
}
