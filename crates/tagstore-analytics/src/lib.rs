// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Tagstore Analytics
//!
//! Process-health metrics computed from a [`tagstore::Dataset`]. Every
//! function is pure over an immutable dataset; nothing here touches disk.
//!
//! # Metrics
//!
//! - **Trendline** -- OLS slope/intercept of one tag over a window
//! - **Duty cycle** -- midline crossings of a bounded oscillating tag
//! - **Run time** -- fraction of time a state tag sits at its "on" value
//! - **PSA swing** -- pressure cycle length in samples
//! - **Leak rate** -- off-state pressure decay, as free-gas volume per hour
//! - **Recovery rate** -- inflow minus leak minus stored volume, per hour
//!
//! Leak depends on swing through an explicit `cycle_length_hint`, recovery
//! on leak through an explicit `leak_rate`.
//!
//! # Example
//!
//! ```ignore
//! use tagstore_analytics::{leak_rate_estimate, psa_swing_estimate, LeakConfig, SwingConfig};
//!
//! let swing = psa_swing_estimate(&dataset, "PT270_Value", &SwingConfig::default())?;
//! let config = LeakConfig::new("Compressor_State", 0.0, "PT270_Value", 2.0);
//! let leak = leak_rate_estimate(&dataset, &config, swing.cycle_length)?;
//! println!("leak {:.3} m³/h", leak.rate_per_hour);
//! ```

pub mod duty;
pub mod error;
pub mod leak;
pub mod metric;
pub mod peaks;
pub mod recovery;
pub mod regression;
pub mod runtime;
pub mod source;
pub mod swing;
pub mod trend;
pub mod units;

pub use duty::{duty_cycle_count, DutyCycle, DutyCycleConfig};
pub use error::AnalyticsError;
pub use leak::{leak_rate_estimate, LeakConfig, LeakEstimate, LeakRegion, SegmentLeak};
pub use metric::{evaluate, evaluate_all, DerivedMetric, MetricRequest};
pub use peaks::{find_peaks, find_valleys, local_maxima};
pub use recovery::{recovery_rate_estimate, RecoveryConfig, RecoveryEstimate};
pub use regression::LinearFit;
pub use runtime::{run_time_fraction, RunTime};
pub use source::SourceSpec;
pub use swing::{psa_swing_estimate, SwingConfig, SwingEstimate};
pub use trend::{trendline, trendline_in, Trendline};
pub use units::{FlowBasis, PressureUnit, ATMOSPHERE_BAR};
