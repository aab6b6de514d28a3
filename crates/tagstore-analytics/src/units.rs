// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Unit conversions for the mass-balance metrics.
//!
//! Pressure differences are converted to free-gas volume at atmospheric
//! pressure: `V_free = Δp[bar] × V_storage / p_atm[bar]`.

use serde::{Deserialize, Serialize};

/// Standard atmosphere in bar.
pub const ATMOSPHERE_BAR: f64 = 1.01325;

/// Unit of a pressure tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PressureUnit {
    #[default]
    Bar,
    Mbar,
    Kpa,
    Psi,
}

impl PressureUnit {
    /// Multiplier converting this unit to bar.
    pub fn to_bar(self) -> f64 {
        match self {
            PressureUnit::Bar => 1.0,
            PressureUnit::Mbar => 1e-3,
            PressureUnit::Kpa => 1e-2,
            PressureUnit::Psi => 0.068_947_572_9,
        }
    }

    /// Free-gas volume represented by a pressure change of `delta` (in this
    /// unit) in a vessel of `storage_volume`.
    pub fn free_gas_volume(self, delta: f64, storage_volume: f64) -> f64 {
        delta * self.to_bar() * storage_volume / ATMOSPHERE_BAR
    }
}

/// Time basis of a flow tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowBasis {
    PerSecond,
    PerMinute,
    #[default]
    PerHour,
}

impl FlowBasis {
    /// Length of the basis period in seconds.
    pub fn seconds(self) -> f64 {
        match self {
            FlowBasis::PerSecond => 1.0,
            FlowBasis::PerMinute => 60.0,
            FlowBasis::PerHour => 3600.0,
        }
    }
}
