// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Duty-cycle counting for bounded oscillating tags (tank level, ...).
//!
//! Values are quantised to `resolution` steps. The midline is the quantised
//! `(max + min) / 2`, and a crossing is counted for every transition *into*
//! the midline step from a different step. A flat run on the midline
//! therefore counts once.

use crate::error::AnalyticsError;
use crate::source::require_tag;
use serde::{Deserialize, Serialize};
use tagstore::{query, Dataset, TimeWindow};

const METRIC: &str = "duty_cycle";

/// Duty-cycle configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DutyCycleConfig {
    /// Sampling resolution of the tag (quantisation step). Non-positive
    /// values disable quantisation.
    pub resolution: f64,
    pub window: TimeWindow,
}

impl Default for DutyCycleConfig {
    fn default() -> Self {
        Self {
            resolution: 0.1,
            window: TimeWindow::all(),
        }
    }
}

impl DutyCycleConfig {
    pub fn resolution(mut self, resolution: f64) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn window(mut self, window: TimeWindow) -> Self {
        self.window = window;
        self
    }
}

/// Midline crossings of one tag.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DutyCycle {
    pub crossings: usize,
    pub mid: f64,
    pub samples: usize,
}

impl DutyCycle {
    /// Complete on/off cycles (two crossings each).
    pub fn full_cycles(&self) -> usize {
        self.crossings / 2
    }
}

/// Quantiser: values map to integer steps so equality is exact.
#[derive(Debug, Clone, Copy)]
struct Steps(f64);

impl Steps {
    fn of(&self, value: f64) -> f64 {
        if self.0 > 0.0 {
            (value / self.0).round()
        } else {
            value
        }
    }

    fn value(&self, step: f64) -> f64 {
        if self.0 > 0.0 {
            step * self.0
        } else {
            step
        }
    }
}

/// Count midline crossings of `tag`.
pub fn duty_cycle_count(
    dataset: &Dataset,
    tag: &str,
    config: &DutyCycleConfig,
) -> Result<DutyCycle, AnalyticsError> {
    require_tag(dataset, tag)?;

    let values: Vec<f64> = query::windowed(dataset, tag, &config.window)
        .into_iter()
        .map(|p| p.value)
        .collect();
    if values.len() < 2 {
        return Err(AnalyticsError::insufficient(
            METRIC,
            format!("{} sample(s) of {tag:?}, need at least 2", values.len()),
        )
        .in_window(&config.window));
    }

    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);

    let steps = Steps(config.resolution);
    let mid_step = steps.of((max + min) / 2.0);
    let quantised: Vec<f64> = values.iter().map(|&v| steps.of(v)).collect();

    let crossings = quantised
        .windows(2)
        .filter(|w| w[1] == mid_step && w[0] != w[1])
        .count();

    Ok(DutyCycle {
        crossings,
        mid: steps.value(mid_step),
        samples: values.len(),
    })
}
