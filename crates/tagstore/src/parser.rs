// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Delimited-text parser.
//!
//! Converts a raw log export into canonical [`Sample`]s. The first non-blank
//! line is the header; columns are located by name so extra columns
//! (`Validity`, `Time_ms`, ...) are ignored.
//!
//! Rows with an unparseable timestamp or a non-finite value are dropped and
//! counted in the [`ParseReport`]. An input where *nothing* survives is a
//! [`ParseError::Format`], never an empty success.

use crate::config::ImportSettings;
use crate::error::ParseError;
use crate::sample::Sample;
use chrono::{NaiveDate, NaiveDateTime};
use tracing::debug;

/// Row accounting for one parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseReport {
    /// Data rows seen (header and blank lines excluded).
    pub rows: usize,
    /// Rows turned into samples.
    pub accepted: usize,
    /// Rows dropped because the time cell did not match the format.
    pub dropped_time: usize,
    /// Rows dropped because the value cell was not a finite number.
    pub dropped_value: usize,
    /// Rows with too few fields or an empty tag.
    pub dropped_malformed: usize,
}

impl ParseReport {
    pub fn dropped(&self) -> usize {
        self.dropped_time + self.dropped_value + self.dropped_malformed
    }
}

struct Columns {
    tag: usize,
    time: usize,
    value: usize,
}

impl Columns {
    fn locate(header: &[&str], settings: &ImportSettings) -> Result<Self, ParseError> {
        let find = |name: &str| {
            header.iter().position(|h| *h == name).ok_or_else(|| {
                ParseError::format(format!("header has no column named {name:?}"))
            })
        };

        Ok(Self {
            tag: find(&settings.tag_column)?,
            time: find(&settings.time_column)?,
            value: find(&settings.value_column)?,
        })
    }

    fn width(&self) -> usize {
        self.tag.max(self.time).max(self.value) + 1
    }
}

/// Parse raw delimited text into samples (unsorted, input order).
pub fn parse(raw: &str, settings: &ImportSettings) -> Result<Vec<Sample>, ParseError> {
    parse_with_report(raw, settings).map(|(samples, _)| samples)
}

/// Parse raw delimited text, also returning row accounting.
pub fn parse_with_report(
    raw: &str,
    settings: &ImportSettings,
) -> Result<(Vec<Sample>, ParseReport), ParseError> {
    // WinCC writes UTF-8 exports with a byte order mark.
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    let mut lines = raw
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty());

    let (_, header_line) = lines.next().ok_or(ParseError::EmptyInput)?;
    let header = split_fields(header_line, settings.delimiter);
    let columns = Columns::locate(&header, settings)?;
    let width = columns.width();

    let mut report = ParseReport::default();
    let mut samples = Vec::new();

    for (line_no, line) in lines {
        report.rows += 1;
        let fields = split_fields(line, settings.delimiter);

        if fields.len() < width || fields[columns.tag].is_empty() {
            debug!(line = line_no + 1, "dropping malformed row");
            report.dropped_malformed += 1;
            continue;
        }

        let time_cell = fields[columns.time];
        let Some(timestamp) = parse_timestamp(time_cell, &settings.date_time_format) else {
            debug!(line = line_no + 1, cell = time_cell, "dropping row with bad timestamp");
            report.dropped_time += 1;
            continue;
        };

        let value_cell = fields[columns.value];
        let Some(value) = parse_number(value_cell, settings.decimal) else {
            debug!(line = line_no + 1, cell = value_cell, "dropping row with bad value");
            report.dropped_value += 1;
            continue;
        };

        samples.push(Sample::new(fields[columns.tag], timestamp, value));
        report.accepted += 1;
    }

    if report.rows == 0 {
        return Err(ParseError::EmptyInput);
    }

    if report.dropped_time == report.rows {
        return Err(ParseError::format(format!(
            "no value in column {:?} matches time format {:?}",
            settings.time_column, settings.date_time_format
        )));
    }

    if samples.is_empty() {
        return Err(ParseError::format(format!(
            "no row has a numeric value in column {:?} (decimal separator {:?})",
            settings.value_column, settings.decimal
        )));
    }

    debug!(
        rows = report.rows,
        accepted = report.accepted,
        dropped = report.dropped(),
        "parsed input"
    );

    Ok((samples, report))
}

/// Split a line on `delimiter`, trimming whitespace and one pair of
/// surrounding double quotes from each field.
fn split_fields(line: &str, delimiter: char) -> Vec<&str> {
    line.split(delimiter).map(unquote).collect()
}

fn unquote(field: &str) -> &str {
    let field = field.trim();
    field
        .strip_prefix('"')
        .and_then(|f| f.strip_suffix('"'))
        .unwrap_or(field)
}

/// Parse a timestamp; date-only formats resolve to midnight.
pub fn parse_timestamp(cell: &str, format: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(cell, format)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(cell, format)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Parse a finite number using `decimal` as the decimal separator.
pub fn parse_number(cell: &str, decimal: char) -> Option<f64> {
    let value = if decimal == '.' {
        cell.parse::<f64>().ok()?
    } else {
        cell.replace(decimal, ".").parse::<f64>().ok()?
    };
    value.is_finite().then_some(value)
}
