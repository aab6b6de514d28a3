// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com
//
// Metrics over imported datasets: raw export -> store -> analytics, and
// metric plans chaining swing -> leak -> recovery.

#![allow(clippy::float_cmp)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use tagstore::{Dataset, ImportSettings, Sample, SeriesStore, StoreConfig, TimeWindow};
use tagstore_analytics::{
    evaluate, evaluate_all, leak_rate_estimate, psa_swing_estimate, run_time_fraction, trendline,
    AnalyticsError, DerivedMetric, LeakConfig, MetricRequest, RecoveryConfig, SwingConfig,
};

fn at(minute: i64) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .expect("valid time")
        + Duration::minutes(minute)
}

fn wincc_export() -> String {
    let mut raw = String::from("VarName;TimeString;VarValue;Validity;Time_ms\n");
    for (i, value) in ["1", "2", "3", "4", "5"].iter().enumerate() {
        raw.push_str(&format!(
            "PT270_Value;01.01.2024 00:0{i}:00;{value},0;1;0\n"
        ));
    }
    for (i, state) in [0, 1, 1, 0, 0, 0, 1, 0, 0, 0].iter().enumerate() {
        raw.push_str(&format!(
            "Compressor_State;01.01.2024 00:0{i}:00;{state};1;0\n"
        ));
    }
    raw
}

fn imported() -> Dataset {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut store =
        SeriesStore::open_dir(StoreConfig::builder().root(dir.path()).build()).expect("store");
    store
        .import(607, &wincc_export(), &ImportSettings::default())
        .expect("import");
    store.load(607).expect("reload")
}

/// Ten-second samples: one on-state minute of saw-tooth swing, then forty
/// off-state minutes of slow triangular pressure drift.
fn plant() -> Dataset {
    let base = at(0);
    let mut samples = Vec::new();
    let mut p = 8.0;
    for i in 0..=300i64 {
        let ts = base + Duration::seconds(i * 10);
        if i < 60 {
            samples.push(Sample::new("State", ts, 1.0));
            samples.push(Sample::new("PT01", ts, 5.0 + (i % 6) as f64 * 0.5));
        } else {
            let j = i - 60;
            samples.push(Sample::new("State", ts, 0.0));
            samples.push(Sample::new("PT01", ts, p));
            p += if (j / 60) % 2 == 0 { -0.01 } else { 0.02 };
        }
        samples.push(Sample::new("FT01", ts, 30.0));
    }
    Dataset::from_samples(2, "P002", &samples)
}

#[test]
fn trendline_over_imported_ramp() {
    let dataset = imported();
    let trend = trendline(&dataset, "PT270_Value", at(0), at(4)).expect("trend");
    assert!((trend.slope() - 1.0).abs() < 1e-12);
    assert!((trend.intercept() - 1.0).abs() < 1e-12);
}

#[test]
fn run_time_over_imported_states() {
    let dataset = imported();
    let run = run_time_fraction(&dataset, "Compressor_State", 1.0, &TimeWindow::all())
        .expect("run time");
    assert_eq!(run.on, Duration::minutes(3));
    assert_eq!(run.total, Duration::minutes(10));
}

#[test]
fn leak_without_pressure_tag_names_it() {
    let dataset = imported();
    let config = LeakConfig::new("Compressor_State", 0.0, "PT999_Value", 2.0);

    assert_eq!(
        leak_rate_estimate(&dataset, &config, 4),
        Err(AnalyticsError::missing_tag("PT999_Value"))
    );

    let request = MetricRequest::Leak {
        config,
        cycle_length_hint: None,
        swing: SwingConfig::default(),
    };
    assert_eq!(
        evaluate(&dataset, &request),
        Err(AnalyticsError::missing_tag("PT999_Value"))
    );
}

#[test]
fn leak_request_derives_hint_from_swing() {
    let dataset = plant();
    let swing = psa_swing_estimate(&dataset, "PT01", &SwingConfig::default()).expect("swing");
    let config = LeakConfig::new("State", 0.0, "PT01", 2.0);
    let direct = leak_rate_estimate(&dataset, &config, swing.cycle_length).expect("leak");

    let request = MetricRequest::Leak {
        config,
        cycle_length_hint: None,
        swing: SwingConfig::default(),
    };
    match evaluate(&dataset, &request) {
        Ok(DerivedMetric::Leak(leak)) => assert_eq!(leak, direct),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn plan_chains_leak_into_recovery() {
    let dataset = plant();
    let leak_config = LeakConfig::new("State", 0.0, "PT01", 2.0);
    let leak = leak_rate_estimate(&dataset, &leak_config, 6).expect("leak");

    let plan = vec![
        MetricRequest::Swing {
            pressure_tag: "PT01".into(),
            config: SwingConfig::default(),
        },
        MetricRequest::Recovery {
            config: RecoveryConfig::new("FT01", "PT01", "State", 1.0, 2.0),
            leak_rate: leak.rate_per_hour,
        },
        MetricRequest::Trend {
            tag: "LT01".into(),
            window: TimeWindow::all(),
        },
    ];
    let results = evaluate_all(&dataset, &plan);

    assert!(matches!(results[0], Ok(DerivedMetric::Swing(_))));
    match &results[1] {
        Ok(DerivedMetric::Recovery(rec)) => {
            // 60 on-state samples of ten seconds.
            let on_hours = 600.0 / 3600.0;
            assert!((rec.leak - leak.rate_per_hour * on_hours).abs() < 1e-9);
            assert!((rec.elapsed_hours - 3000.0 / 3600.0).abs() < 1e-12);
            assert!(rec.rate_per_hour.is_finite());
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(results[2], Err(AnalyticsError::missing_tag("LT01")));
}

#[test]
fn plan_results_serialize_as_json() {
    let dataset = imported();
    let plan: Vec<MetricRequest> = serde_json::from_str(
        r#"[{"metric":"trend","tag":"PT270_Value"},
            {"metric":"duty_cycle","tag":"PT270_Value","config":{"resolution":1.0}}]"#,
    )
    .expect("plan");

    let results = evaluate_all(&dataset, &plan);
    let trend = serde_json::to_value(results[0].as_ref().expect("trend")).expect("json");
    assert_eq!(trend["metric"], "trend");
    assert_eq!(trend["n"], 5);

    let duty = serde_json::to_value(results[1].as_ref().expect("duty")).expect("json");
    assert_eq!(duty["mid"], 3.0);
    assert_eq!(duty["crossings"], 1);
}
