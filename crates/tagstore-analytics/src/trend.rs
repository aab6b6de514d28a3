// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Trendline over a time window.
//!
//! The fit is against the sample index `0..n-1`, not elapsed time, so the
//! slope is "per sample". Use [`Trendline::slope_per_hour`] (or
//! [`LinearFit::slope_per`]) when a physical rate is wanted.

use crate::error::AnalyticsError;
use crate::regression::{self, LinearFit};
use crate::source::require_tag;
use chrono::{Duration, NaiveDateTime};
use serde::Serialize;
use tagstore::{query, Dataset, TimeWindow};

const METRIC: &str = "trendline";

/// Fitted trend of one tag.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Trendline {
    #[serde(flatten)]
    pub fit: LinearFit,
    pub window: TimeWindow,
    /// Interval between the first two samples in the window.
    #[serde(skip)]
    pub sample_interval: Duration,
}

impl Trendline {
    pub fn slope(&self) -> f64 {
        self.fit.slope
    }

    pub fn intercept(&self) -> f64 {
        self.fit.intercept
    }

    /// Slope rescaled by the window's sampling interval.
    pub fn slope_per_hour(&self) -> Option<f64> {
        self.fit.slope_per(self.sample_interval, Duration::hours(1))
    }
}

/// Fit `tag` over `start..=end`.
pub fn trendline(
    dataset: &Dataset,
    tag: &str,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Result<Trendline, AnalyticsError> {
    trendline_in(dataset, tag, &TimeWindow::new(start, end))
}

/// Fit `tag` over `window` (open bounds allowed).
pub fn trendline_in(
    dataset: &Dataset,
    tag: &str,
    window: &TimeWindow,
) -> Result<Trendline, AnalyticsError> {
    require_tag(dataset, tag)?;

    let points = query::windowed(dataset, tag, window);
    let values: Vec<f64> = points.iter().map(|p| p.value).collect();

    let fit = regression::fit_index(&values).ok_or_else(|| {
        AnalyticsError::insufficient(
            METRIC,
            format!("{} sample(s) of {tag:?}, need at least 2", values.len()),
        )
        .in_window(window)
    })?;
    let sample_interval = query::sample_interval(&points).unwrap_or_else(Duration::zero);

    Ok(Trendline {
        fit,
        window: *window,
        sample_interval,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tagstore::Sample;

    fn at(minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_opt(0, minute, 0))
            .expect("valid time")
    }

    fn ramp() -> Dataset {
        let samples: Vec<_> = (0..5)
            .map(|i| Sample::new("PT270_Value", at(i), f64::from(i + 1)))
            .chain(std::iter::once(Sample::new("PT270_Value", at(30), 100.0)))
            .collect();
        Dataset::from_samples(607, "P607", &samples)
    }

    #[test]
    fn test_unit_ramp() {
        let trend = trendline(&ramp(), "PT270_Value", at(0), at(4)).expect("trend");
        assert!((trend.slope() - 1.0).abs() < 1e-12);
        assert!((trend.intercept() - 1.0).abs() < 1e-12);
        assert_eq!(trend.fit.n, 5);
        assert_eq!(trend.slope_per_hour().map(f64::round), Some(60.0));
    }

    #[test]
    fn test_missing_tag() {
        assert_eq!(
            trendline(&ramp(), "TT100", at(0), at(4)),
            Err(AnalyticsError::missing_tag("TT100"))
        );
    }

    #[test]
    fn test_single_sample_window() {
        let err = trendline(&ramp(), "PT270_Value", at(2), at(2)).unwrap_err();
        assert!(matches!(
            err,
            AnalyticsError::InsufficientData {
                metric: "trendline",
                window: Some(_),
                ..
            }
        ));
    }

    #[test]
    fn test_open_window_uses_all_samples() {
        let trend = trendline_in(&ramp(), "PT270_Value", &TimeWindow::all()).expect("trend");
        assert_eq!(trend.fit.n, 6);
    }
}
