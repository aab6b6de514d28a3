// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Read-only, time-ordered views over a [`Dataset`].

use crate::dataset::Dataset;
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One `(timestamp, value)` point of a tag series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub timestamp: NaiveDateTime,
    pub value: f64,
}

impl Point {
    pub fn new(timestamp: NaiveDateTime, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Inclusive time window. Either bound may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

impl TimeWindow {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    /// Unbounded window.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn contains(&self, ts: NaiveDateTime) -> bool {
        self.start.map_or(true, |s| ts >= s) && self.end.map_or(true, |e| ts <= e)
    }

    pub fn is_bounded(&self) -> bool {
        self.start.is_some() || self.end.is_some()
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bound = |b: Option<NaiveDateTime>| b.map_or_else(|| "..".to_string(), |t| t.to_string());
        write!(f, "[{}, {}]", bound(self.start), bound(self.end))
    }
}

/// All points of `tag`, ascending in time. Unknown tag yields an empty view.
pub fn series_for(dataset: &Dataset, tag: &str) -> Vec<Point> {
    dataset
        .samples()
        .iter()
        .filter(|s| s.tag == tag)
        .map(|s| Point::new(s.timestamp, s.value))
        .collect()
}

/// Distinct tags of the dataset.
pub fn tags(dataset: &Dataset) -> BTreeSet<String> {
    dataset.tags()
}

/// Points of `tag` with `start <= timestamp <= end`.
pub fn window(
    dataset: &Dataset,
    tag: &str,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Vec<Point> {
    if start > end {
        return Vec::new();
    }
    windowed(dataset, tag, &TimeWindow::new(start, end))
}

/// Points of `tag` inside `window`.
pub fn windowed(dataset: &Dataset, tag: &str, window: &TimeWindow) -> Vec<Point> {
    let samples = dataset.samples();
    // Samples are sorted, so the window start can be found by bisection.
    let first = match window.start {
        Some(start) => samples.partition_point(|s| s.timestamp < start),
        None => 0,
    };

    samples[first..]
        .iter()
        .take_while(|s| window.end.map_or(true, |e| s.timestamp <= e))
        .filter(|s| s.tag == tag)
        .map(|s| Point::new(s.timestamp, s.value))
        .collect()
}

/// Sum of several tags at timestamps where *all* of them have a sample.
///
/// Equality join only: timestamps missing from any tag are excluded, never
/// interpolated. An empty tag list yields an empty view.
pub fn join_sum<S: AsRef<str>>(dataset: &Dataset, tags: &[S]) -> Vec<Point> {
    if tags.is_empty() {
        return Vec::new();
    }

    let mut sums: BTreeMap<NaiveDateTime, (f64, usize)> = BTreeMap::new();
    for (i, tag) in tags.iter().enumerate() {
        for point in series_for(dataset, tag.as_ref()) {
            if i == 0 {
                sums.insert(point.timestamp, (point.value, 1));
            } else if let Some(entry) = sums.get_mut(&point.timestamp) {
                if entry.1 == i {
                    entry.0 += point.value;
                    entry.1 += 1;
                }
            }
        }
    }

    sums.into_iter()
        .filter(|(_, (_, seen))| *seen == tags.len())
        .map(|(ts, (sum, _))| Point::new(ts, sum))
        .collect()
}

/// Sampling interval from the first two points.
pub fn sample_interval(points: &[Point]) -> Option<Duration> {
    match points {
        [first, second, ..] => Some(second.timestamp - first.timestamp),
        _ => None,
    }
}
