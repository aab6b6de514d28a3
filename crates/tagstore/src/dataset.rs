// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-project dataset and the deduplicating merge.

use crate::sample::Sample;
use chrono::NaiveDateTime;
use std::collections::{BTreeSet, HashMap, HashSet};

/// All samples recorded for one project.
///
/// Samples are unique on `(tag, timestamp)` and sorted by timestamp. The
/// only way to add samples is [`Dataset::merged`] (or `SeriesStore::merge`,
/// which also persists the result).
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    project: u32,
    name: String,
    samples: Vec<Sample>,
}

impl Dataset {
    /// An empty dataset bound to `name`.
    pub fn empty(project: u32, name: impl Into<String>) -> Self {
        Self {
            project,
            name: name.into(),
            samples: Vec::new(),
        }
    }

    /// Build a dataset from arbitrary samples, applying the merge rules
    /// (later duplicates win, stable timestamp order).
    pub fn from_samples(project: u32, name: impl Into<String>, samples: &[Sample]) -> Self {
        Self::empty(project, name).merged(samples)
    }

    /// Wrap samples that are already unique and sorted.
    pub(crate) fn from_sorted(project: u32, name: String, samples: Vec<Sample>) -> Self {
        Self {
            project,
            name,
            samples,
        }
    }

    pub fn project(&self) -> u32 {
        self.project
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Distinct tag names, sorted.
    pub fn tags(&self) -> BTreeSet<String> {
        self.samples.iter().map(|s| s.tag.clone()).collect()
    }

    /// Timestamp range covered, if any.
    pub fn time_range(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let first = self.samples.first()?;
        let last = self.samples.last()?;
        Some((first.timestamp, last.timestamp))
    }

    /// Same project and name with different samples.
    pub(crate) fn with_samples(&self, samples: Vec<Sample>) -> Self {
        Self {
            project: self.project,
            name: self.name.clone(),
            samples,
        }
    }

    /// Merge `new_samples` into a copy of this dataset.
    ///
    /// On a `(tag, timestamp)` collision the new sample replaces the stored
    /// one; among `new_samples` the later occurrence wins. The result is
    /// stably sorted by timestamp, with equal timestamps ordered by
    /// `new_samples` first and then the previously stored samples.
    pub fn merged(&self, new_samples: &[Sample]) -> Self {
        self.with_samples(merge_samples(&self.samples, new_samples))
    }
}

/// Deduplicating merge of two sample slices. See [`Dataset::merged`].
pub fn merge_samples(existing: &[Sample], new_samples: &[Sample]) -> Vec<Sample> {
    let mut last_occurrence: HashMap<(&str, NaiveDateTime), usize> =
        HashMap::with_capacity(new_samples.len());
    for (i, sample) in new_samples.iter().enumerate() {
        last_occurrence.insert(sample.key(), i);
    }

    let mut merged = Vec::with_capacity(existing.len() + last_occurrence.len());
    merged.extend(
        new_samples
            .iter()
            .enumerate()
            .filter(|(i, s)| last_occurrence.get(&s.key()) == Some(i))
            .map(|(_, s)| s.clone()),
    );

    let replaced: HashSet<(&str, NaiveDateTime)> = last_occurrence.keys().copied().collect();
    merged.extend(
        existing
            .iter()
            .filter(|s| !replaced.contains(&s.key()))
            .cloned(),
    );

    // Vec::sort_by_key is stable: ties keep new-then-existing order.
    merged.sort_by_key(|s| s.timestamp);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_opt(0, minute, 0))
            .expect("valid time")
    }

    fn values(dataset: &Dataset) -> Vec<(&str, NaiveDateTime, f64)> {
        dataset
            .samples()
            .iter()
            .map(|s| (s.tag.as_str(), s.timestamp, s.value))
            .collect()
    }

    #[test]
    fn test_new_sample_wins_on_collision() {
        let stored = Dataset::from_samples(
            1,
            "P001",
            &[Sample::new("T1", at(0), 1.0), Sample::new("T1", at(1), 2.0)],
        );
        let merged = stored.merged(&[Sample::new("T1", at(0), 9.0)]);

        assert_eq!(values(&merged), vec![("T1", at(0), 9.0), ("T1", at(1), 2.0)]);
    }

    #[test]
    fn test_later_duplicate_within_batch_wins() {
        let merged = Dataset::empty(1, "P001").merged(&[
            Sample::new("T1", at(0), 1.0),
            Sample::new("T1", at(0), 5.0),
        ]);
        assert_eq!(values(&merged), vec![("T1", at(0), 5.0)]);
    }

    #[test]
    fn test_merge_sorts_out_of_order_input() {
        let merged = Dataset::empty(1, "P001").merged(&[
            Sample::new("T1", at(3), 3.0),
            Sample::new("T2", at(1), 1.0),
            Sample::new("T1", at(2), 2.0),
        ]);

        let times: Vec<_> = merged.samples().iter().map(|s| s.timestamp).collect();
        assert_eq!(times, vec![at(1), at(2), at(3)]);
    }

    #[test]
    fn test_equal_timestamps_order_new_before_existing() {
        let stored = Dataset::from_samples(1, "P001", &[Sample::new("A", at(0), 1.0)]);
        let merged = stored.merged(&[Sample::new("B", at(0), 2.0), Sample::new("C", at(0), 3.0)]);

        let tags: Vec<_> = merged.samples().iter().map(|s| s.tag.as_str()).collect();
        assert_eq!(tags, vec!["B", "C", "A"]);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let stored = Dataset::from_samples(
            1,
            "P001",
            &[Sample::new("T1", at(0), 1.0), Sample::new("T2", at(0), 4.0)],
        );
        let batch = [
            Sample::new("T2", at(0), 8.0),
            Sample::new("T1", at(5), 2.0),
            Sample::new("T3", at(0), 3.0),
        ];

        let once = stored.merged(&batch);
        let twice = once.merged(&batch);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_merge_with_nothing_is_identity() {
        let stored = Dataset::from_samples(1, "P001", &[Sample::new("T1", at(0), 1.0)]);
        assert_eq!(stored.merged(&[]), stored);
    }

    #[test]
    fn test_tags_and_time_range() {
        let dataset = Dataset::from_samples(
            1,
            "P001",
            &[Sample::new("B", at(4), 1.0), Sample::new("A", at(2), 1.0)],
        );
        assert_eq!(
            dataset.tags().into_iter().collect::<Vec<_>>(),
            vec!["A".to_string(), "B".to_string()]
        );
        assert_eq!(dataset.time_range(), Some((at(2), at(4))));
        assert_eq!(Dataset::empty(1, "P001").time_range(), None);
    }
}
