// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Register map for live acquisition.
//!
//! A polling client reads a block of holding registers starting at 0; entry
//! `i` of the map names register `i` and the scaling applied to its raw
//! value. The resulting samples are indistinguishable from parsed file data.

use crate::error::ParseError;
use crate::sample::Sample;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Tag name and scaling for one holding register.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterTag {
    pub tag: String,
    #[serde(default = "unit_scaling")]
    pub scaling: f64,
}

fn unit_scaling() -> f64 {
    1.0
}

/// Ordered register → tag mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegisterMap {
    entries: Vec<RegisterTag>,
}

impl RegisterMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the tag for the next register.
    pub fn with_tag(mut self, tag: impl Into<String>, scaling: f64) -> Self {
        self.entries.push(RegisterTag {
            tag: tag.into(),
            scaling,
        });
        self
    }

    pub fn entries(&self) -> &[RegisterTag] {
        &self.entries
    }

    /// Number of registers to poll.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Convert one register read into samples stamped `timestamp`.
    ///
    /// Extra registers beyond the map are ignored.
    pub fn to_samples(
        &self,
        timestamp: NaiveDateTime,
        registers: &[u16],
    ) -> Result<Vec<Sample>, ParseError> {
        if registers.len() < self.entries.len() {
            return Err(ParseError::format(format!(
                "register map has {} entries but only {} registers were read",
                self.entries.len(),
                registers.len()
            )));
        }

        Ok(self
            .entries
            .iter()
            .zip(registers)
            .map(|(entry, &raw)| {
                Sample::new(entry.tag.clone(), timestamp, f64::from(raw) * entry.scaling)
            })
            .collect())
    }
}
