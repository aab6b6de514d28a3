// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! PSA swing (pressure cycle length) estimate.
//!
//! Pressure-swing adsorption beds produce a regular saw-tooth on the
//! pressure tag. The cycle length in samples is the mean spacing of
//! consecutive local maxima, ignoring gaps longer than a plausible period
//! (shutdowns, logging outages).

use crate::error::AnalyticsError;
use crate::peaks::find_peaks;
use crate::regression::seconds;
use crate::source::require_tag;
use serde::{Deserialize, Serialize};
use tagstore::{query, Dataset, TimeWindow};
use tracing::{debug, warn};

const METRIC: &str = "psa_swing";

/// Swing estimate configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwingConfig {
    /// Minimum separation of maxima, in samples.
    pub min_peak_distance: usize,
    /// Longest spacing (seconds) accepted as one cycle.
    pub max_plausible_period_secs: f64,
    pub window: TimeWindow,
}

impl Default for SwingConfig {
    fn default() -> Self {
        Self {
            min_peak_distance: 2,
            max_plausible_period_secs: 600.0,
            window: TimeWindow::all(),
        }
    }
}

impl SwingConfig {
    pub fn max_plausible_period_secs(mut self, secs: f64) -> Self {
        self.max_plausible_period_secs = secs;
        self
    }

    pub fn window(mut self, window: TimeWindow) -> Self {
        self.window = window;
        self
    }
}

/// Estimated cycle length.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SwingEstimate {
    /// Mean accepted spacing, rounded to whole samples.
    pub cycle_length: usize,
    pub mean_spacing: f64,
    pub peaks: usize,
    pub accepted: usize,
    pub rejected: usize,
}

/// Estimate the cycle length of `pressure_tag` in samples.
pub fn psa_swing_estimate(
    dataset: &Dataset,
    pressure_tag: &str,
    config: &SwingConfig,
) -> Result<SwingEstimate, AnalyticsError> {
    require_tag(dataset, pressure_tag)?;

    let points = query::windowed(dataset, pressure_tag, &config.window);
    let dt = query::sample_interval(&points)
        .map(seconds)
        .ok_or_else(|| {
            AnalyticsError::insufficient(METRIC, format!("{} sample(s)", points.len()))
                .in_window(&config.window)
        })?;

    let values: Vec<f64> = points.iter().map(|p| p.value).collect();
    let peaks = find_peaks(&values, config.min_peak_distance);

    let mut accepted = Vec::new();
    let mut rejected = 0;
    for pair in peaks.windows(2) {
        let spacing = pair[1] - pair[0];
        if spacing as f64 * dt > config.max_plausible_period_secs {
            warn!(
                tag = pressure_tag,
                at = %points[pair[0]].timestamp,
                spacing,
                "rejecting implausible swing spacing"
            );
            rejected += 1;
        } else {
            accepted.push(spacing);
        }
    }

    if accepted.is_empty() {
        return Err(AnalyticsError::insufficient(
            METRIC,
            format!(
                "{} maxima found in {pressure_tag:?}, no plausible spacing",
                peaks.len()
            ),
        )
        .in_window(&config.window));
    }

    let mean_spacing = accepted.iter().sum::<usize>() as f64 / accepted.len() as f64;
    debug!(tag = pressure_tag, mean_spacing, peaks = peaks.len(), "swing estimate");

    Ok(SwingEstimate {
        cycle_length: mean_spacing.round() as usize,
        mean_spacing,
        peaks: peaks.len(),
        accepted: accepted.len(),
        rejected,
    })
}
