// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Leak-rate estimate from off-state pressure behaviour.
//!
//! While the process is off nothing is consumed, so the pressure trend in a
//! storage vessel reflects leakage alone. For every contiguous off-state run
//! the pressure series is searched for peaks and valleys at least
//! `ceil(gating_multiplier × cycle_length_hint)` samples apart; each
//! valley→next-peak region (or peak→next-valley, see [`LeakRegion`]) gets a
//! straight-line fit against elapsed hours.
//!
//! Mass balance: a pressure slope `dp/dt` in a vessel of volume `V` is a
//! free-gas flow of `dp/dt[bar/h] × V / p_atm`. Leakage is reported as a
//! positive loss, so a falling pressure yields a positive rate and a rising
//! one a negative rate.

use crate::error::AnalyticsError;
use crate::peaks::{find_peaks, find_valleys};
use crate::regression::{self, hours};
use crate::source::require_tag;
use crate::units::PressureUnit;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tagstore::{query, Dataset, Point, TimeWindow};
use tracing::debug;

const METRIC: &str = "leak_rate";

fn default_gating_multiplier() -> f64 {
    10.0
}

/// Which extremum pair bounds a fitted region.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeakRegion {
    /// From each valley to the following peak.
    #[default]
    ValleyToPeak,
    /// From each peak to the following valley.
    PeakToValley,
}

/// Leak estimate configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeakConfig {
    /// Tag carrying the process state.
    pub state_tag: String,
    /// State value meaning "off" (no consumption).
    pub off_state_value: f64,
    /// Storage pressure tag.
    pub pressure_tag: String,
    /// Storage vessel volume; the rate comes out in this unit per hour.
    pub storage_volume: f64,
    #[serde(default)]
    pub pressure_unit: PressureUnit,
    /// Peak separation in multiples of the swing cycle length.
    #[serde(default = "default_gating_multiplier")]
    pub gating_multiplier: f64,
    #[serde(default)]
    pub region: LeakRegion,
    #[serde(default)]
    pub window: TimeWindow,
}

impl LeakConfig {
    pub fn new(
        state_tag: impl Into<String>,
        off_state_value: f64,
        pressure_tag: impl Into<String>,
        storage_volume: f64,
    ) -> Self {
        Self {
            state_tag: state_tag.into(),
            off_state_value,
            pressure_tag: pressure_tag.into(),
            storage_volume,
            pressure_unit: PressureUnit::default(),
            gating_multiplier: default_gating_multiplier(),
            region: LeakRegion::default(),
            window: TimeWindow::all(),
        }
    }

    pub fn pressure_unit(mut self, unit: PressureUnit) -> Self {
        self.pressure_unit = unit;
        self
    }

    pub fn gating_multiplier(mut self, k: f64) -> Self {
        self.gating_multiplier = k;
        self
    }

    pub fn region(mut self, region: LeakRegion) -> Self {
        self.region = region;
        self
    }

    pub fn window(mut self, window: TimeWindow) -> Self {
        self.window = window;
        self
    }

    /// Minimum extremum separation for a given cycle length.
    pub fn separation(&self, cycle_length_hint: usize) -> usize {
        let sep = (self.gating_multiplier * cycle_length_hint as f64).ceil();
        if sep.is_finite() && sep >= 1.0 {
            sep as usize
        } else {
            1
        }
    }
}

/// Leak rate within one off-state run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentLeak {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// Mean of the fitted regions, volume per hour.
    pub rate_per_hour: f64,
    pub fits: usize,
}

/// Leak estimate over all off-state runs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeakEstimate {
    /// Mean of the per-segment rates, volume per hour.
    pub rate_per_hour: f64,
    pub separation: usize,
    pub segments: Vec<SegmentLeak>,
}

/// Estimate the leak rate. `cycle_length_hint` is the swing cycle length in
/// samples, normally from [`crate::swing::psa_swing_estimate`].
pub fn leak_rate_estimate(
    dataset: &Dataset,
    config: &LeakConfig,
    cycle_length_hint: usize,
) -> Result<LeakEstimate, AnalyticsError> {
    require_tag(dataset, &config.pressure_tag)?;
    require_tag(dataset, &config.state_tag)?;

    if cycle_length_hint == 0 {
        return Err(AnalyticsError::insufficient(
            METRIC,
            "cycle length hint is zero",
        ));
    }
    let separation = config.separation(cycle_length_hint);

    let state = query::windowed(dataset, &config.state_tag, &config.window);
    let pressure = query::windowed(dataset, &config.pressure_tag, &config.window);
    let to_volume = config.pressure_unit.to_bar() * config.storage_volume
        / crate::units::ATMOSPHERE_BAR;

    let mut segments = Vec::new();
    for (start, end) in off_segments(&state, config.off_state_value) {
        let first = pressure.partition_point(|p| p.timestamp < start);
        let last = pressure.partition_point(|p| p.timestamp <= end);
        let run = &pressure[first..last];

        let rates: Vec<f64> = fit_regions(run, separation, config.region)
            .into_iter()
            .map(|slope| -slope * to_volume)
            .collect();
        if rates.is_empty() {
            debug!(%start, %end, samples = run.len(), "off segment has no fittable region");
            continue;
        }

        segments.push(SegmentLeak {
            start,
            end,
            rate_per_hour: mean(&rates),
            fits: rates.len(),
        });
    }

    if segments.is_empty() {
        return Err(AnalyticsError::insufficient(
            METRIC,
            format!(
                "no off-state segment of {:?} has a fittable region at separation {separation}",
                config.pressure_tag
            ),
        )
        .in_window(&config.window));
    }

    let rates: Vec<f64> = segments.iter().map(|s| s.rate_per_hour).collect();
    Ok(LeakEstimate {
        rate_per_hour: mean(&rates),
        separation,
        segments,
    })
}

/// Contiguous runs where the state equals `off_value`, as inclusive
/// timestamp bounds.
pub fn off_segments(state: &[Point], off_value: f64) -> Vec<(NaiveDateTime, NaiveDateTime)> {
    let mut segments = Vec::new();
    let mut current: Option<(NaiveDateTime, NaiveDateTime)> = None;

    for point in state {
        if point.value == off_value {
            current = Some(match current {
                Some((start, _)) => (start, point.timestamp),
                None => (point.timestamp, point.timestamp),
            });
        } else if let Some(segment) = current.take() {
            segments.push(segment);
        }
    }
    segments.extend(current);
    segments
}

/// Pressure slopes (per hour, tag units) of every bounded region in `run`.
fn fit_regions(run: &[Point], separation: usize, region: LeakRegion) -> Vec<f64> {
    let values: Vec<f64> = run.iter().map(|p| p.value).collect();
    let peaks = find_peaks(&values, separation);
    let valleys = find_valleys(&values, separation);

    let (starts, ends) = match region {
        LeakRegion::ValleyToPeak => (&valleys, &peaks),
        LeakRegion::PeakToValley => (&peaks, &valleys),
    };

    starts
        .iter()
        .filter_map(|&from| {
            let to = *ends.iter().find(|&&e| e > from)?;
            let origin = run[from].timestamp;
            let xs: Vec<f64> = run[from..=to]
                .iter()
                .map(|p| hours(p.timestamp - origin))
                .collect();
            regression::fit(&xs, &values[from..=to]).map(|fit| fit.slope)
        })
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}
