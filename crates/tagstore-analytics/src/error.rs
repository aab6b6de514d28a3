// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Analytics errors.

use tagstore::TimeWindow;
use thiserror::Error;

/// Why a metric could not be computed.
///
/// Metrics never return NaN or infinite values; undefined results surface
/// as [`AnalyticsError::InsufficientData`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalyticsError {
    #[error("tag {tag:?} is not present in the dataset")]
    MissingTag { tag: String },

    #[error("insufficient data for {metric}: {reason}{}", describe_window(.window))]
    InsufficientData {
        metric: &'static str,
        reason: String,
        window: Option<TimeWindow>,
    },
}

impl AnalyticsError {
    pub fn missing_tag(tag: impl Into<String>) -> Self {
        AnalyticsError::MissingTag { tag: tag.into() }
    }

    pub fn insufficient(metric: &'static str, reason: impl Into<String>) -> Self {
        AnalyticsError::InsufficientData {
            metric,
            reason: reason.into(),
            window: None,
        }
    }

    /// Attach the evaluated window, if it was bounded.
    pub fn in_window(self, window: &TimeWindow) -> Self {
        match self {
            AnalyticsError::InsufficientData { metric, reason, .. } if window.is_bounded() => {
                AnalyticsError::InsufficientData {
                    metric,
                    reason,
                    window: Some(*window),
                }
            }
            other => other,
        }
    }
}

fn describe_window(window: &Option<TimeWindow>) -> String {
    match window {
        Some(w) => format!(" in window {w}"),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_messages_carry_context() {
        let err = AnalyticsError::missing_tag("PT270_Value");
        assert_eq!(
            err.to_string(),
            "tag \"PT270_Value\" is not present in the dataset"
        );

        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .expect("valid time");
        let err = AnalyticsError::insufficient("trendline", "1 sample")
            .in_window(&TimeWindow::new(start, start));
        assert!(err.to_string().contains("in window [2024-01-01 00:00:00"));

        let err = AnalyticsError::insufficient("trendline", "1 sample").in_window(&TimeWindow::all());
        assert_eq!(err.to_string(), "insufficient data for trendline: 1 sample");
    }
}
