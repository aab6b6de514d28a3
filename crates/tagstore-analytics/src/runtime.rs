// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Run-time fraction of a state tag.
//!
//! Assumes uniform sampling: `dt` is taken from the first two samples and
//! every sample contributes one `dt`.

use crate::error::AnalyticsError;
use crate::regression::hours;
use crate::source::require_tag;
use chrono::Duration;
use serde::Serialize;
use tagstore::{query, Dataset, Point, TimeWindow};

const METRIC: &str = "run_time";

/// On-time versus total time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunTime {
    pub on: Duration,
    pub total: Duration,
    pub sample_interval: Duration,
}

impl RunTime {
    /// `on / total` in `0..=1`.
    pub fn fraction(&self) -> f64 {
        let total = self.total.num_milliseconds();
        if total == 0 {
            0.0
        } else {
            self.on.num_milliseconds() as f64 / total as f64
        }
    }

    pub fn on_hours(&self) -> f64 {
        hours(self.on)
    }

    pub fn total_hours(&self) -> f64 {
        hours(self.total)
    }
}

impl Serialize for RunTime {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("RunTime", 4)?;
        s.serialize_field("on_hours", &self.on_hours())?;
        s.serialize_field("total_hours", &self.total_hours())?;
        s.serialize_field("fraction", &self.fraction())?;
        s.serialize_field("sample_interval_secs", &self.sample_interval.num_seconds())?;
        s.end()
    }
}

/// Time `state_tag` spent at `on_value` within `window`.
pub fn run_time_fraction(
    dataset: &Dataset,
    state_tag: &str,
    on_value: f64,
    window: &TimeWindow,
) -> Result<RunTime, AnalyticsError> {
    require_tag(dataset, state_tag)?;
    let points = query::windowed(dataset, state_tag, window);
    run_time_of(&points, on_value).map_err(|e| e.in_window(window))
}

pub(crate) fn run_time_of(points: &[Point], on_value: f64) -> Result<RunTime, AnalyticsError> {
    let dt = query::sample_interval(points).ok_or_else(|| {
        AnalyticsError::insufficient(
            METRIC,
            format!("{} sample(s), need two to derive the interval", points.len()),
        )
    })?;

    let on_count = points.iter().filter(|p| p.value == on_value).count();
    Ok(RunTime {
        on: scaled(dt, on_count)?,
        total: scaled(dt, points.len())?,
        sample_interval: dt,
    })
}

fn scaled(dt: Duration, count: usize) -> Result<Duration, AnalyticsError> {
    i32::try_from(count)
        .ok()
        .and_then(|n| dt.checked_mul(n))
        .ok_or_else(|| {
            AnalyticsError::insufficient(
                METRIC,
                format!("{count} samples of {dt} exceed the representable duration"),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use tagstore::Sample;

    fn at(minute: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .expect("valid time")
            + Duration::minutes(minute)
    }

    #[test]
    fn test_three_of_ten_on() {
        let states = [0.0, 1.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0];
        let samples: Vec<_> = states
            .iter()
            .enumerate()
            .map(|(i, &v)| Sample::new("Compressor_State", at(i as i64), v))
            .collect();
        let dataset = Dataset::from_samples(1, "P001", &samples);

        let run = run_time_fraction(&dataset, "Compressor_State", 1.0, &TimeWindow::all())
            .expect("run time");
        assert_eq!(run.on, Duration::minutes(3));
        assert_eq!(run.total, Duration::minutes(10));
        assert!((run.fraction() - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_needs_two_samples() {
        let dataset = Dataset::from_samples(1, "P001", &[Sample::new("S", at(0), 1.0)]);
        assert!(matches!(
            run_time_fraction(&dataset, "S", 1.0, &TimeWindow::all()),
            Err(AnalyticsError::InsufficientData { metric: "run_time", .. })
        ));
    }

    #[test]
    fn test_unrepresentable_total_is_an_error() {
        let mut points = vec![
            Point::new(NaiveDateTime::MIN, 1.0),
            Point::new(NaiveDateTime::MAX, 0.0),
        ];
        points.extend((0..1000).map(|i| Point::new(at(i), 0.0)));

        assert!(matches!(
            run_time_of(&points, 1.0),
            Err(AnalyticsError::InsufficientData { metric: "run_time", .. })
        ));
    }

    #[test]
    fn test_serialized_in_hours() {
        let run = RunTime {
            on: Duration::minutes(30),
            total: Duration::hours(2),
            sample_interval: Duration::minutes(1),
        };
        let json = serde_json::to_value(run).expect("json");
        assert_eq!(json["on_hours"], 0.5);
        assert_eq!(json["fraction"], 0.25);
    }
}
