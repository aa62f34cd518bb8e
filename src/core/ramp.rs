//! Polynomial ramp estimation and removal.
//!
//! A ramp is a degree 1-3 polynomial in the along-profile distance,
//! attributed to unmodeled noise (single track) or to the relative bias
//! between two overlapping tracks (dual track). The fit minimizes the
//! variance-weighted residual sum of squares: an unweighted normal-
//! equations solve seeds a conjugate-gradient refinement of the weighted
//! objective, so a solution is reached even when the closed-form solve is
//! rank deficient. The fitted polynomial is ADDED to every representation
//! of the corrected dataset, each evaluated at its own distance axis.

use log::{info, warn};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::binning::BinnedSeries;
use crate::core::stats::{nan_mean, nan_percentile, nan_std};
use crate::types::{PointSeries, SwathError};

const MAX_REFINE_ITERATIONS: usize = 2000;

/// Polynomial degree of a ramp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RampDegree {
    Linear,
    Quadratic,
    Cubic,
}

impl RampDegree {
    /// Number of design-matrix columns (polynomial order plus constant).
    pub fn terms(self) -> usize {
        match self {
            RampDegree::Linear => 2,
            RampDegree::Quadratic => 3,
            RampDegree::Cubic => 4,
        }
    }
}

/// Support restriction for single-track fitting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RampSupport {
    /// Fit over the whole profile
    Full,
    /// Fit over positive along-axis distances only
    Positive,
    /// Fit over negative along-axis distances only
    Negative,
}

/// Ramp estimation settings carried by a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RampConfig {
    pub degree: RampDegree,
    pub support: RampSupport,
}

impl Default for RampConfig {
    fn default() -> Self {
        Self {
            degree: RampDegree::Linear,
            support: RampSupport::Full,
        }
    }
}

/// A fitted polynomial ramp. Coefficients are stored highest power
/// first, constant last.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ramp {
    pub degree: RampDegree,
    pub coeffs: Vec<f64>,
}

impl Ramp {
    /// The all-zero ramp of a degree; applying it is a no-op.
    pub fn zero(degree: RampDegree) -> Self {
        Self {
            degree,
            coeffs: vec![0.0; degree.terms()],
        }
    }

    /// Evaluate the polynomial at one distance.
    pub fn evaluate(&self, distance: f64) -> f64 {
        self.coeffs.iter().fold(0.0, |acc, &c| acc * distance + c)
    }

    /// Evaluate the polynomial over a distance series.
    pub fn evaluate_series(&self, distance: &PointSeries) -> PointSeries {
        distance.mapv(|d| self.evaluate(d))
    }

    /// Add the ramp, evaluated at `axis`, onto `values` in place. The two
    /// arrays are one representation of a dataset and its own distance
    /// axis.
    pub fn apply(&self, axis: &PointSeries, values: &mut PointSeries) {
        for (v, &d) in values.iter_mut().zip(axis.iter()) {
            *v += self.evaluate(d);
        }
    }
}

impl fmt::Display for Ramp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let order = self.coeffs.len();
        for (j, c) in self.coeffs.iter().enumerate() {
            if j > 0 {
                write!(f, " + ")?;
            }
            match order - 1 - j {
                0 => write!(f, "{:.6e}", c)?,
                1 => write!(f, "{:.6e} d", c)?,
                p => write!(f, "{:.6e} d^{}", c, p)?,
            }
        }
        Ok(())
    }
}

/// Residual distribution of a dual-track overlap after correction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlapResiduals {
    /// Number of matched overlap bins that entered the fit
    pub count: usize,
    pub mean: f64,
    /// [2nd, 98th] percentile bracket
    pub hdi: (f64, f64),
    pub std: f64,
}

/// Variance-weighted polynomial trend estimator.
#[derive(Debug, Clone)]
pub struct RampEstimator {
    config: RampConfig,
}

impl RampEstimator {
    pub fn new(config: RampConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RampConfig {
        &self.config
    }

    /// Fit a ramp to one track's binned series over the configured
    /// support restriction.
    pub fn fit_single(&self, series: &BinnedSeries) -> Ramp {
        let keep: Vec<usize> = (0..series.len())
            .filter(|&i| match self.config.support {
                RampSupport::Full => true,
                RampSupport::Positive => series.distance[i] > 0.0,
                RampSupport::Negative => series.distance[i] < 0.0,
            })
            .collect();
        let d = series.distance.select(ndarray::Axis(0), &keep);
        let target = series.mean.select(ndarray::Axis(0), &keep);
        let sigma = series.std.select(ndarray::Axis(0), &keep);
        let ramp = self.fit(&d, &target, &sigma);
        info!("Estimated ramp: {}", ramp);
        ramp
    }

    /// Fit a ramp to the difference of two tracks over their overlapping
    /// bins and report the post-correction residual distribution. The
    /// caller corrects the SECOND track. Bins match on exact equality of
    /// bin-center distances, so both tracks must share one bin width.
    pub fn fit_dual(
        &self,
        first: &BinnedSeries,
        second: &BinnedSeries,
    ) -> (Ramp, OverlapResiduals) {
        let mut pairs: Vec<(usize, usize)> = Vec::new();
        for (i, &d1) in first.distance.iter().enumerate() {
            if let Some(j) = second.distance.iter().position(|&d2| d2 == d1) {
                pairs.push((i, j));
            }
        }

        let d = PointSeries::from_iter(pairs.iter().map(|&(i, _)| first.distance[i]));
        let target =
            PointSeries::from_iter(pairs.iter().map(|&(i, j)| first.mean[i] - second.mean[j]));
        let sigma = PointSeries::from_iter(
            pairs
                .iter()
                .map(|&(i, j)| (first.std[i].powi(2) + second.std[j].powi(2)).sqrt()),
        );

        if pairs.is_empty() {
            warn!("No overlapping bins between the two tracks, ramp left at zero");
        }
        let ramp = self.fit(&d, &target, &sigma);
        info!("Estimated ramp: {}", ramp);

        // residuals of the overlap after the second track is corrected
        let residuals = &target - &ramp.evaluate_series(&d);
        let stats = OverlapResiduals {
            count: residuals.iter().filter(|v| !v.is_nan()).count(),
            mean: nan_mean(&residuals),
            hdi: (
                nan_percentile(&residuals, 2.0),
                nan_percentile(&residuals, 98.0),
            ),
            std: nan_std(&residuals),
        };
        info!(
            "Overlap difference: mean {:.3}, 95% HDI {:.3} - {:.3}, std {:.3}",
            stats.mean, stats.hdi.0, stats.hdi.1, stats.std
        );
        (ramp, stats)
    }

    /// Weighted least-squares polynomial fit.
    fn fit(&self, d: &PointSeries, target: &PointSeries, sigma: &PointSeries) -> Ramp {
        let terms = self.config.degree.terms();

        // drop NaN targets before building the system
        let keep: Vec<usize> = (0..target.len())
            .filter(|&i| !target[i].is_nan())
            .collect();
        let n = keep.len();
        if n == 0 {
            return Ramp::zero(self.config.degree);
        }

        // unit weight where a bin dispersion is zero or undefined
        let weights: Vec<f64> = keep
            .iter()
            .map(|&i| {
                let s = sigma[i];
                if s.is_finite() && s > 0.0 {
                    s
                } else {
                    1.0
                }
            })
            .collect();

        let mut g = DMatrix::zeros(n, terms);
        for (row, &i) in keep.iter().enumerate() {
            for j in 0..terms {
                g[(row, j)] = d[i].powi((terms - 1 - j) as i32);
            }
        }
        let y = DVector::from_iterator(n, keep.iter().map(|&i| target[i]));

        // max-abs column normalization keeps the cubic meter-scale design
        // solvable; coefficients are unscaled after the solve
        let mut col_scale = vec![1.0; terms];
        for j in 0..terms {
            let m = g.column(j).amax();
            if m > 0.0 {
                col_scale[j] = m;
                for i in 0..n {
                    g[(i, j)] /= m;
                }
            }
        }

        // a rank-deficient design is recovered, never surfaced
        let x0 = match Self::normal_solve(&g, &y) {
            Some(x0) => x0,
            None => {
                let e = SwathError::FitDegeneracy(
                    "initial least-squares solve is singular".to_string(),
                );
                warn!("{}, starting from zero coefficients", e);
                DVector::zeros(terms)
            }
        };

        // whiten rows by the per-bin dispersion, then refine
        let mut a = g;
        let mut b = y;
        for (row, &w) in weights.iter().enumerate() {
            for j in 0..terms {
                a[(row, j)] /= w;
            }
            b[row] /= w;
        }
        let x = Self::conjugate_gradient(&a, &b, x0);

        let coeffs = (0..terms).map(|j| x[j] / col_scale[j]).collect();
        Ramp {
            degree: self.config.degree,
            coeffs,
        }
    }

    /// Ordinary least squares through the normal equations, Cholesky
    /// first, LU as fallback.
    fn normal_solve(g: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
        let ata = g.transpose() * g;
        let atb = g.transpose() * y;
        match ata.clone().cholesky() {
            Some(chol) => Some(chol.solve(&atb)),
            None => ata.lu().solve(&atb),
        }
    }

    /// Conjugate-gradient iteration on the whitened system, with the
    /// analytic gradient A'(Ax - b). Converges to a weighted least-
    /// squares minimizer even for rank-deficient designs.
    fn conjugate_gradient(a: &DMatrix<f64>, b: &DVector<f64>, x0: DVector<f64>) -> DVector<f64> {
        let mut x = x0;
        let mut r = b - a * &x;
        let mut s = a.transpose() * &r;
        let mut p = s.clone();
        let mut gamma = s.norm_squared();
        let tolerance = 1e-28 * gamma.max(1.0);

        for _ in 0..MAX_REFINE_ITERATIONS {
            if gamma <= tolerance {
                break;
            }
            let q = a * &p;
            let qq = q.norm_squared();
            if qq == 0.0 {
                break;
            }
            let alpha = gamma / qq;
            x += alpha * &p;
            r -= alpha * &q;
            s = a.transpose() * &r;
            let gamma_next = s.norm_squared();
            p = &s + (gamma_next / gamma) * p;
            gamma = gamma_next;
        }
        x
    }
}
