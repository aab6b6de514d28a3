// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Canonical tag sample.

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};

const NANOS_PER_SEC: i64 = 1_000_000_000;

/// One observation of a tag.
///
/// Timestamps are naive (plant-local wall clock, as exported by the PLC).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Tag (measurement channel) name.
    pub tag: String,

    /// Observation instant.
    pub timestamp: NaiveDateTime,

    /// Observed value.
    pub value: f64,
}

impl Sample {
    pub fn new(tag: impl Into<String>, timestamp: NaiveDateTime, value: f64) -> Self {
        Self {
            tag: tag.into(),
            timestamp,
            value,
        }
    }

    /// Identity used for deduplication.
    pub fn key(&self) -> (&str, NaiveDateTime) {
        (self.tag.as_str(), self.timestamp)
    }
}

/// Nanoseconds since the Unix epoch, or `None` outside the i64 range
/// (roughly years 1677..2262).
pub fn to_epoch_nanos(ts: NaiveDateTime) -> Option<i64> {
    ts.and_utc().timestamp_nanos_opt()
}

/// Inverse of [`to_epoch_nanos`].
pub fn from_epoch_nanos(nanos: i64) -> Option<NaiveDateTime> {
    let secs = nanos.div_euclid(NANOS_PER_SEC);
    let sub = nanos.rem_euclid(NANOS_PER_SEC) as u32;
    DateTime::from_timestamp(secs, sub).map(|dt| dt.naive_utc())
}
