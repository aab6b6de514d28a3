// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Metric plans: serialisable requests evaluated against one dataset.
//!
//! A plan is a JSON list of requests tagged by `"metric"`:
//!
//! ```json
//! [
//!   { "metric": "trend", "tag": "PT270_Value" },
//!   { "metric": "run_time", "state_tag": "Compressor_State", "on_value": 1 },
//!   { "metric": "leak",
//!     "config": { "state_tag": "Compressor_State", "off_state_value": 0,
//!                 "pressure_tag": "PT270_Value", "storage_volume": 2.0 } }
//! ]
//! ```
//!
//! Requests are independent; [`evaluate_all`] runs them on the rayon pool
//! and returns one result per request, in request order.

use crate::duty::{duty_cycle_count, DutyCycle, DutyCycleConfig};
use crate::error::AnalyticsError;
use crate::leak::{leak_rate_estimate, LeakConfig, LeakEstimate};
use crate::recovery::{recovery_rate_estimate, RecoveryConfig, RecoveryEstimate};
use crate::runtime::{run_time_fraction, RunTime};
use crate::swing::{psa_swing_estimate, SwingConfig, SwingEstimate};
use crate::trend::{trendline_in, Trendline};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tagstore::{Dataset, TimeWindow};
use tracing::{debug, info};

/// One metric to compute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "metric", rename_all = "snake_case")]
pub enum MetricRequest {
    Trend {
        tag: String,
        #[serde(default)]
        window: TimeWindow,
    },
    DutyCycle {
        tag: String,
        #[serde(default)]
        config: DutyCycleConfig,
    },
    RunTime {
        state_tag: String,
        on_value: f64,
        #[serde(default)]
        window: TimeWindow,
    },
    Swing {
        pressure_tag: String,
        #[serde(default)]
        config: SwingConfig,
    },
    /// Without a `cycle_length_hint` the swing estimate over the same
    /// pressure tag supplies it.
    Leak {
        config: LeakConfig,
        #[serde(default)]
        cycle_length_hint: Option<usize>,
        #[serde(default)]
        swing: SwingConfig,
    },
    Recovery {
        config: RecoveryConfig,
        leak_rate: f64,
    },
}

impl MetricRequest {
    pub fn name(&self) -> &'static str {
        match self {
            MetricRequest::Trend { .. } => "trend",
            MetricRequest::DutyCycle { .. } => "duty_cycle",
            MetricRequest::RunTime { .. } => "run_time",
            MetricRequest::Swing { .. } => "swing",
            MetricRequest::Leak { .. } => "leak",
            MetricRequest::Recovery { .. } => "recovery",
        }
    }
}

/// A computed metric. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "metric", rename_all = "snake_case")]
pub enum DerivedMetric {
    Trend(Trendline),
    DutyCycle(DutyCycle),
    RunTime(RunTime),
    Swing(SwingEstimate),
    Leak(LeakEstimate),
    Recovery(RecoveryEstimate),
}

/// Evaluate one request.
pub fn evaluate(dataset: &Dataset, request: &MetricRequest) -> Result<DerivedMetric, AnalyticsError> {
    debug!(project = dataset.project(), metric = request.name(), "evaluating");
    match request {
        MetricRequest::Trend { tag, window } => trendline_in(dataset, tag, window).map(DerivedMetric::Trend),
        MetricRequest::DutyCycle { tag, config } => {
            duty_cycle_count(dataset, tag, config).map(DerivedMetric::DutyCycle)
        }
        MetricRequest::RunTime {
            state_tag,
            on_value,
            window,
        } => run_time_fraction(dataset, state_tag, *on_value, window).map(DerivedMetric::RunTime),
        MetricRequest::Swing {
            pressure_tag,
            config,
        } => psa_swing_estimate(dataset, pressure_tag, config).map(DerivedMetric::Swing),
        MetricRequest::Leak {
            config,
            cycle_length_hint,
            swing,
        } => {
            let hint = match cycle_length_hint {
                Some(hint) => *hint,
                None => psa_swing_estimate(dataset, &config.pressure_tag, swing)?.cycle_length,
            };
            leak_rate_estimate(dataset, config, hint).map(DerivedMetric::Leak)
        }
        MetricRequest::Recovery { config, leak_rate } => {
            recovery_rate_estimate(dataset, config, *leak_rate).map(DerivedMetric::Recovery)
        }
    }
}

/// Evaluate every request in parallel. A failing request does not affect
/// the others.
pub fn evaluate_all(
    dataset: &Dataset,
    requests: &[MetricRequest],
) -> Vec<Result<DerivedMetric, AnalyticsError>> {
    let results: Vec<_> = requests
        .par_iter()
        .map(|request| evaluate(dataset, request))
        .collect();

    let failed = results.iter().filter(|r| r.is_err()).count();
    info!(
        project = dataset.project(),
        requests = requests.len(),
        failed,
        "metric plan evaluated"
    );
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, NaiveDateTime};
    use tagstore::Sample;

    fn at(minute: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .expect("valid time")
            + Duration::minutes(minute)
    }

    #[test]
    fn test_plan_from_json() {
        let plan: Vec<MetricRequest> = serde_json::from_str(
            r#"[
                {"metric":"trend","tag":"PT01"},
                {"metric":"duty_cycle","tag":"LT01","config":{"resolution":0.5}},
                {"metric":"run_time","state_tag":"State","on_value":1},
                {"metric":"recovery","leak_rate":1.5,"config":{
                    "flow":["FT01","FT02"],"pressure_tag":"PT01","state_tag":"State",
                    "on_state_value":1,"storage_volume":2.0}}
            ]"#,
        )
        .expect("plan");

        assert_eq!(plan.len(), 4);
        assert_eq!(
            plan[0],
            MetricRequest::Trend {
                tag: "PT01".into(),
                window: TimeWindow::all()
            }
        );
        assert!(matches!(&plan[1], MetricRequest::DutyCycle { config, .. } if config.resolution == 0.5));
        assert_eq!(plan[3].name(), "recovery");
    }

    #[test]
    fn test_one_failure_does_not_poison_the_plan() {
        let samples: Vec<_> = (0..5)
            .map(|i| Sample::new("PT01", at(i), (i + 1) as f64))
            .collect();
        let dataset = Dataset::from_samples(1, "P001", &samples);
        let plan = vec![
            MetricRequest::Trend {
                tag: "PT01".into(),
                window: TimeWindow::all(),
            },
            MetricRequest::Trend {
                tag: "PT99".into(),
                window: TimeWindow::all(),
            },
        ];

        let results = evaluate_all(&dataset, &plan);
        assert_eq!(results.len(), 2);
        assert!(matches!(&results[0], Ok(DerivedMetric::Trend(t)) if (t.slope() - 1.0).abs() < 1e-12));
        assert_eq!(results[1], Err(AnalyticsError::missing_tag("PT99")));
    }

    #[test]
    fn test_derived_metric_is_tagged() {
        let samples: Vec<_> = (0..10)
            .map(|i| Sample::new("State", at(i), if i < 3 { 1.0 } else { 0.0 }))
            .collect();
        let dataset = Dataset::from_samples(1, "P001", &samples);
        let request = MetricRequest::RunTime {
            state_tag: "State".into(),
            on_value: 1.0,
            window: TimeWindow::all(),
        };
        let json = serde_json::to_value(evaluate(&dataset, &request).expect("run time")).expect("json");
        assert_eq!(json["metric"], "run_time");
        assert_eq!(json["fraction"], 0.3);
    }
}
