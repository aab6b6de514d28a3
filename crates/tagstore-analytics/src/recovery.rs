// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Recovery-rate estimate by mass balance over a window.
//!
//! ```text
//! inflow = Σ flow_i × dt            (flow integrated over its time basis)
//! leak   = leak_rate × on_hours
//! stored = (p_end − p_start)[bar] × V / p_atm
//! net    = inflow − leak − stored
//! rate   = net / elapsed_hours
//! ```
//!
//! `elapsed_hours` is the span of the pressure samples inside the window.

use crate::error::AnalyticsError;
use crate::regression::{hours, seconds};
use crate::runtime::run_time_of;
use crate::source::{require_tag, SourceSpec};
use crate::units::{FlowBasis, PressureUnit};
use serde::{Deserialize, Serialize};
use tagstore::{query, Dataset, TimeWindow};
use tracing::debug;

const METRIC: &str = "recovery_rate";

/// Recovery estimate configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryConfig {
    /// Flow meter tag, or several meters summed.
    pub flow: SourceSpec,
    #[serde(default)]
    pub flow_basis: FlowBasis,
    pub pressure_tag: String,
    pub state_tag: String,
    pub on_state_value: f64,
    pub storage_volume: f64,
    #[serde(default)]
    pub pressure_unit: PressureUnit,
    #[serde(default)]
    pub window: TimeWindow,
}

impl RecoveryConfig {
    pub fn new(
        flow: impl Into<SourceSpec>,
        pressure_tag: impl Into<String>,
        state_tag: impl Into<String>,
        on_state_value: f64,
        storage_volume: f64,
    ) -> Self {
        Self {
            flow: flow.into(),
            flow_basis: FlowBasis::default(),
            pressure_tag: pressure_tag.into(),
            state_tag: state_tag.into(),
            on_state_value,
            storage_volume,
            pressure_unit: PressureUnit::default(),
            window: TimeWindow::all(),
        }
    }

    pub fn flow_basis(mut self, basis: FlowBasis) -> Self {
        self.flow_basis = basis;
        self
    }

    pub fn pressure_unit(mut self, unit: PressureUnit) -> Self {
        self.pressure_unit = unit;
        self
    }

    pub fn window(mut self, window: TimeWindow) -> Self {
        self.window = window;
        self
    }
}

/// Mass-balance terms, all in free-gas volume.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RecoveryEstimate {
    pub inflow: f64,
    pub leak: f64,
    pub stored: f64,
    pub net: f64,
    pub elapsed_hours: f64,
    /// `net / elapsed_hours`.
    pub rate_per_hour: f64,
}

/// Estimate the recovery rate. `leak_rate` is volume per hour, normally
/// from [`crate::leak::leak_rate_estimate`].
pub fn recovery_rate_estimate(
    dataset: &Dataset,
    config: &RecoveryConfig,
    leak_rate: f64,
) -> Result<RecoveryEstimate, AnalyticsError> {
    require_tag(dataset, &config.pressure_tag)?;
    require_tag(dataset, &config.state_tag)?;
    let flow = config.flow.resolve(dataset, &config.window)?;

    let pressure = query::windowed(dataset, &config.pressure_tag, &config.window);
    let (first, last) = match (pressure.first(), pressure.last()) {
        (Some(first), Some(last)) if last.timestamp > first.timestamp => (first, last),
        _ => {
            return Err(AnalyticsError::insufficient(
                METRIC,
                format!(
                    "{} sample(s) of {:?} span zero hours",
                    pressure.len(),
                    config.pressure_tag
                ),
            )
            .in_window(&config.window))
        }
    };
    let elapsed_hours = hours(last.timestamp - first.timestamp);

    let inflow = match query::sample_interval(&flow) {
        Some(dt) => {
            let per_sample = seconds(dt) / config.flow_basis.seconds();
            flow.iter().map(|p| p.value).sum::<f64>() * per_sample
        }
        None => {
            return Err(AnalyticsError::insufficient(
                METRIC,
                format!("{} flow sample(s), need two to derive the interval", flow.len()),
            )
            .in_window(&config.window))
        }
    };

    let state = query::windowed(dataset, &config.state_tag, &config.window);
    let on_hours = run_time_of(&state, config.on_state_value)
        .map_err(|e| e.in_window(&config.window))?
        .on_hours();
    let leak = leak_rate * on_hours;

    let stored = config
        .pressure_unit
        .free_gas_volume(last.value - first.value, config.storage_volume);
    let net = inflow - leak - stored;
    let rate_per_hour = net / elapsed_hours;

    if !rate_per_hour.is_finite() {
        return Err(AnalyticsError::insufficient(
            METRIC,
            "mass balance is not finite",
        )
        .in_window(&config.window));
    }

    debug!(inflow, leak, stored, elapsed_hours, "recovery balance");
    Ok(RecoveryEstimate {
        inflow,
        leak,
        stored,
        net,
        elapsed_hours,
        rate_per_hour,
    })
}
