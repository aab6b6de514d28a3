// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Local extrema with a minimum-separation filter.
//!
//! A peak is a sample strictly greater than its left neighbour and strictly
//! greater than the first differing sample to its right; flat tops report
//! their (lower) midpoint. Endpoints are never peaks.
//!
//! The separation filter visits peaks from highest to lowest and suppresses
//! every lower peak closer than `distance` samples. Equal heights are
//! visited right to left, so the rightmost of two equal peaks survives.

/// Indices of local maxima, ascending.
pub fn local_maxima(values: &[f64]) -> Vec<usize> {
    let n = values.len();
    let mut peaks = Vec::new();
    if n < 3 {
        return peaks;
    }

    let last = n - 1;
    let mut i = 1;
    while i < last {
        if values[i - 1] < values[i] {
            let mut ahead = i + 1;
            while ahead < last && values[ahead] == values[i] {
                ahead += 1;
            }
            if values[ahead] < values[i] {
                peaks.push((i + ahead - 1) / 2);
                i = ahead;
            }
        }
        i += 1;
    }
    peaks
}

/// Local maxima at least `distance` samples apart, ascending.
pub fn find_peaks(values: &[f64], distance: usize) -> Vec<usize> {
    let peaks = local_maxima(values);
    if distance <= 1 || peaks.len() < 2 {
        return peaks;
    }

    let mut keep = vec![true; peaks.len()];
    let mut by_height: Vec<usize> = (0..peaks.len()).collect();
    by_height.sort_by(|&a, &b| values[peaks[a]].total_cmp(&values[peaks[b]]));

    for &j in by_height.iter().rev() {
        if !keep[j] {
            continue;
        }
        for k in (0..j).rev() {
            if peaks[j] - peaks[k] >= distance {
                break;
            }
            keep[k] = false;
        }
        for k in j + 1..peaks.len() {
            if peaks[k] - peaks[j] >= distance {
                break;
            }
            keep[k] = false;
        }
    }

    peaks
        .into_iter()
        .zip(keep)
        .filter_map(|(p, k)| k.then_some(p))
        .collect()
}

/// Local minima at least `distance` samples apart, ascending.
pub fn find_valleys(values: &[f64], distance: usize) -> Vec<usize> {
    let negated: Vec<f64> = values.iter().map(|v| -v).collect();
    find_peaks(&negated, distance)
}
