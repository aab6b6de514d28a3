// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Metric input channels: one tag, or several tags summed at matching
//! timestamps.

use crate::error::AnalyticsError;
use serde::{Deserialize, Serialize};
use tagstore::{query, Dataset, Point, TimeWindow};

/// Where a metric reads its values from.
///
/// In JSON a bare string is a single tag and a list is a summed source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceSpec {
    Single(String),
    Summed(Vec<String>),
}

impl SourceSpec {
    pub fn tags(&self) -> Vec<&str> {
        match self {
            SourceSpec::Single(tag) => vec![tag.as_str()],
            SourceSpec::Summed(tags) => tags.iter().map(String::as_str).collect(),
        }
    }

    /// Resolve to a time-ordered series inside `window`.
    ///
    /// Every referenced tag must exist. Summed sources keep only timestamps
    /// present in all tags.
    pub fn resolve(
        &self,
        dataset: &Dataset,
        window: &TimeWindow,
    ) -> Result<Vec<Point>, AnalyticsError> {
        let tags = self.tags();
        if tags.is_empty() {
            return Err(AnalyticsError::insufficient(
                "source",
                "summed source lists no tags",
            ));
        }
        let known = dataset.tags();
        if let Some(missing) = tags.iter().find(|t| !known.contains(**t)) {
            return Err(AnalyticsError::missing_tag(*missing));
        }

        Ok(match self {
            SourceSpec::Single(tag) => query::windowed(dataset, tag, window),
            SourceSpec::Summed(tags) => query::join_sum(dataset, tags.as_slice())
                .into_iter()
                .filter(|p| window.contains(p.timestamp))
                .collect(),
        })
    }
}

impl From<&str> for SourceSpec {
    fn from(tag: &str) -> Self {
        SourceSpec::Single(tag.to_string())
    }
}

/// Fail with `MissingTag` unless `tag` occurs in `dataset`.
pub(crate) fn require_tag(dataset: &Dataset, tag: &str) -> Result<(), AnalyticsError> {
    if dataset.samples().iter().any(|s| s.tag == tag) {
        Ok(())
    } else {
        Err(AnalyticsError::missing_tag(tag))
    }
}
