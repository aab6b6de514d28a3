// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Normalised CSV export.
//!
//! Writes `tag,timestamp,value` rows with `.` as decimal separator and
//! ISO-8601 timestamps, readable by spreadsheet tools regardless of locale.

use crate::dataset::Dataset;
use crate::query::Point;
use chrono::NaiveDateTime;
use std::io::{self, Write};

pub const HEADER: &str = "tag,timestamp,value";

const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Write every sample of `dataset`.
pub fn write_dataset<W: Write>(w: &mut W, dataset: &Dataset) -> io::Result<()> {
    writeln!(w, "{HEADER}")?;
    for sample in dataset.samples() {
        write_row(w, &sample.tag, sample.timestamp, sample.value)?;
    }
    w.flush()
}

/// Write the series of one tag.
pub fn write_series<W: Write>(w: &mut W, tag: &str, points: &[Point]) -> io::Result<()> {
    writeln!(w, "{HEADER}")?;
    for point in points {
        write_row(w, tag, point.timestamp, point.value)?;
    }
    w.flush()
}

fn write_row<W: Write>(w: &mut W, tag: &str, ts: NaiveDateTime, value: f64) -> io::Result<()> {
    writeln!(w, "{},{},{}", quote(tag), ts.format(TIME_FORMAT), value)
}

fn quote(field: &str) -> std::borrow::Cow<'_, str> {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\"")).into()
    } else {
        field.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::series_for;
    use crate::sample::Sample;
    use chrono::NaiveDate;

    fn at(second: u32, milli: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2022, 7, 25)
            .and_then(|d| d.and_hms_milli_opt(8, 55, second, milli))
            .expect("valid time")
    }

    #[test]
    fn test_write_dataset() {
        let dataset = Dataset::from_samples(
            1,
            "P001",
            &[
                Sample::new("PT270_Value", at(32, 0), 4.71),
                Sample::new("Flow, total", at(33, 500), 12.0),
            ],
        );

        let mut out = Vec::new();
        write_dataset(&mut out, &dataset).expect("write");
        let text = String::from_utf8(out).expect("utf8");

        assert_eq!(
            text,
            "tag,timestamp,value\n\
             PT270_Value,2022-07-25T08:55:32,4.71\n\
             \"Flow, total\",2022-07-25T08:55:33.500,12\n"
        );
    }

    #[test]
    fn test_write_series() {
        let dataset = Dataset::from_samples(1, "P001", &[Sample::new("T1", at(0, 0), -1.5)]);
        let mut out = Vec::new();
        write_series(&mut out, "T1", &series_for(&dataset, "T1")).expect("write");

        let text = String::from_utf8(out).expect("utf8");
        assert_eq!(text.lines().nth(1), Some("T1,2022-07-25T08:55:00,-1.5"));
    }
}
