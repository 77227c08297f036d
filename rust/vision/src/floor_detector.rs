// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Floor detection from vertical point density
//!
//! Floor slabs show up as dense horizontal layers of returns. The detector
//! builds a histogram of point heights, smooths it with a Gaussian kernel
//! and keeps well separated local maxima as storey elevations.

use scanplan_core::PointCloud;

use crate::config::FloorDetectionConfig;
use crate::floor_labels::floor_label;
use crate::types::DetectedFloor;

/// Upper bound on histogram bins (50 km of height at 5 cm bins)
pub const MAX_HISTOGRAM_BINS: usize = 1_000_000;

/// Detect floors with the default parameters.
///
/// Returns floors sorted by ascending elevation; an empty list means nothing
/// was detected (for example a cloud less than 0.5 m tall).
pub fn detect_floors(cloud: &PointCloud) -> Vec<DetectedFloor> {
    detect_floors_with_config(cloud, &FloorDetectionConfig::default())
}

pub fn detect_floors_with_config(
    cloud: &PointCloud,
    config: &FloorDetectionConfig,
) -> Vec<DetectedFloor> {
    if cloud.is_empty() {
        return Vec::new();
    }

    let min_z = cloud.bounds.min[2] as f64;
    let z_range = cloud.bounds.max[2] as f64 - min_z;
    if !(z_range >= config.min_z_range) {
        tracing::debug!(z_range, "Cloud too flat for floor detection");
        return Vec::new();
    }

    let bins = z_range / config.bin_size;
    if !(bins < MAX_HISTOGRAM_BINS as f64) {
        tracing::warn!(z_range, bins, "Height range too large for floor histogram");
        return Vec::new();
    }

    let histogram = height_histogram(cloud, min_z, z_range, config.bin_size);
    let smoothed = gaussian_smooth(&histogram, config.smoothing_sigma_bins);
    let global_max = smoothed.iter().cloned().fold(0.0, f64::max);
    if global_max <= 0.0 {
        return Vec::new();
    }

    let bin_elevation = |i: usize| min_z + (i as f64 + 0.5) * config.bin_size;

    let candidates = find_peaks(&smoothed, config.min_peak_fraction * global_max);
    let mut kept = select_separated_peaks(
        candidates
            .into_iter()
            .map(|i| (bin_elevation(i), smoothed[i]))
            .collect(),
        config.min_floor_separation,
    );
    kept.sort_by(|a, b| a.0.total_cmp(&b.0));

    tracing::debug!(
        bins = histogram.len(),
        floors = kept.len(),
        "Floor histogram analysed"
    );

    let total = kept.len();
    kept.into_iter()
        .enumerate()
        .map(|(i, (z, strength))| DetectedFloor {
            label: floor_label(i, total),
            z_height_m: z,
            z_range_min: z - config.count_half_band,
            z_range_max: z + config.count_half_band,
            point_count: count_in_band(cloud, z, config.count_half_band),
            confidence: (100.0 * strength / global_max).min(100.0).round() as u8,
            sort_order: i as u32,
        })
        .collect()
}

/// Point counts per fixed-height bin from `min_z` upwards
fn height_histogram(cloud: &PointCloud, min_z: f64, z_range: f64, bin_size: f64) -> Vec<f64> {
    let bins = (z_range / bin_size).floor() as usize + 1;
    let mut histogram = vec![0.0; bins];
    for p in cloud.points() {
        let idx = ((p[2] as f64 - min_z) / bin_size).floor().max(0.0) as usize;
        histogram[idx.min(bins - 1)] += 1.0;
    }
    histogram
}

/// Discrete convolution with a normalized Gaussian (radius 3 sigma).
///
/// Samples outside the histogram count as zero.
pub fn gaussian_smooth(values: &[f64], sigma: f64) -> Vec<f64> {
    let radius = (3.0 * sigma).ceil() as isize;
    let kernel: Vec<f64> = (-radius..=radius)
        .map(|k| (-((k * k) as f64) / (2.0 * sigma * sigma)).exp())
        .collect();
    let norm: f64 = kernel.iter().sum();

    let n = values.len() as isize;
    (0..n)
        .map(|i| {
            kernel
                .iter()
                .zip(-radius..=radius)
                .filter_map(|(w, k)| {
                    let j = i + k;
                    (0..n).contains(&j).then(|| w * values[j as usize])
                })
                .sum::<f64>()
                / norm
        })
        .collect()
}

/// Indices of local maxima strictly above `threshold`.
///
/// A bin is a maximum when it is not lower than either existing neighbour,
/// so the first and last bins compare against one side only.
pub fn find_peaks(values: &[f64], threshold: f64) -> Vec<usize> {
    (0..values.len())
        .filter(|&i| {
            let v = values[i];
            v > threshold
                && (i == 0 || v >= values[i - 1])
                && (i + 1 == values.len() || v >= values[i + 1])
        })
        .collect()
}

/// Greedy non-maximum suppression on `(elevation, strength)` pairs.
///
/// Strongest peaks win; a weaker peak closer than `min_separation` to any
/// kept one is dropped.
fn select_separated_peaks(mut peaks: Vec<(f64, f64)>, min_separation: f64) -> Vec<(f64, f64)> {
    peaks.sort_by(|a, b| b.1.total_cmp(&a.1));
    let mut kept: Vec<(f64, f64)> = Vec::new();
    for (z, strength) in peaks {
        if kept.iter().all(|(k, _)| (z - k).abs() >= min_separation) {
            kept.push((z, strength));
        }
    }
    kept
}

fn count_in_band(cloud: &PointCloud, z: f64, half_band: f64) -> usize {
    cloud
        .points()
        .filter(|p| (p[2] as f64 - z).abs() <= half_band)
        .count()
}
