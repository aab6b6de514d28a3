// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Ordinary least squares.

use chrono::Duration;
use serde::Serialize;

/// Straight-line fit `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    /// Coefficient of determination (0 to 1). 0 for a constant series.
    pub r_squared: f64,
    /// Number of points fitted.
    pub n: usize,
}

impl LinearFit {
    /// Rescale an index-based slope (per sample) to a rate per `unit`,
    /// given the sampling interval. `None` for a non-positive interval.
    pub fn slope_per(&self, sample_interval: Duration, unit: Duration) -> Option<f64> {
        let dt = seconds(sample_interval);
        (dt > 0.0).then(|| self.slope * seconds(unit) / dt)
    }

    /// Fitted value at `x`.
    pub fn at(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Fit `values` against their index `0..n-1`. `None` when `n < 2`.
pub fn fit_index(values: &[f64]) -> Option<LinearFit> {
    let xs: Vec<f64> = (0..values.len()).map(|i| i as f64).collect();
    fit(&xs, values)
}

/// Fit `ys` against `xs`. `None` when fewer than two points are given or
/// all `xs` coincide.
pub fn fit(xs: &[f64], ys: &[f64]) -> Option<LinearFit> {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return None;
    }
    let (xs, ys) = (&xs[..n], &ys[..n]);

    let nf = n as f64;
    let mean_x = xs.iter().sum::<f64>() / nf;
    let mean_y = ys.iter().sum::<f64>() / nf;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        sxy += dx * (y - mean_y);
        sxx += dx * dx;
    }
    if sxx <= f64::EPSILON {
        return None;
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;

    let mut ss_res = 0.0;
    let mut ss_tot = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        ss_res += (y - (slope * x + intercept)).powi(2);
        ss_tot += (y - mean_y).powi(2);
    }
    let r_squared = if ss_tot > 1e-12 {
        1.0 - ss_res / ss_tot
    } else {
        0.0
    };

    Some(LinearFit {
        slope,
        intercept,
        r_squared,
        n,
    })
}

pub(crate) fn seconds(d: Duration) -> f64 {
    d.num_milliseconds() as f64 / 1000.0
}

pub(crate) fn hours(d: Duration) -> f64 {
    seconds(d) / 3600.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_fit_exact_line() {
        let fit = fit_index(&[1.0, 2.0, 3.0, 4.0, 5.0]).expect("fit");
        assert!((fit.slope - 1.0).abs() < 1e-12);
        assert!((fit.intercept - 1.0).abs() < 1e-12);
        assert!((fit.r_squared - 1.0).abs() < 1e-12);
        assert_eq!(fit.n, 5);
    }

    #[test]
    fn test_fit_needs_two_points() {
        assert!(fit_index(&[]).is_none());
        assert!(fit_index(&[3.0]).is_none());
        assert!(fit(&[1.0, 1.0], &[2.0, 3.0]).is_none());
    }

    #[test]
    fn test_constant_series() {
        let fit = fit_index(&[2.0, 2.0, 2.0]).expect("fit");
        assert_eq!(fit.slope, 0.0);
        assert_eq!(fit.intercept, 2.0);
        assert_eq!(fit.r_squared, 0.0);
    }

    #[test]
    fn test_slope_per_hour() {
        let fit = fit_index(&[0.0, 0.5, 1.0]).expect("fit");
        let per_hour = fit
            .slope_per(Duration::minutes(1), Duration::hours(1))
            .expect("rate");
        assert!((per_hour - 30.0).abs() < 1e-9);
        assert!(fit.slope_per(Duration::zero(), Duration::hours(1)).is_none());
    }

    #[test]
    fn test_noisy_fit_r_squared_below_one() {
        let fit = fit(&[0.0, 1.0, 2.0, 3.0], &[0.0, 1.2, 1.8, 3.1]).expect("fit");
        assert!(fit.slope > 0.9 && fit.slope < 1.1);
        assert!(fit.r_squared > 0.9 && fit.r_squared < 1.0);
    }
}
