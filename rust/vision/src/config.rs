// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Detection parameters
//!
//! Defaults are the tuned values used in production; overriding them is
//! meant for experimentation and tests.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejected configuration values
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be positive, got {value}")]
    NotPositive { field: &'static str, value: f64 },

    #[error("{field} must be within [{min}, {max}], got {value}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}

/// Configuration for the vertical histogram floor detector
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FloorDetectionConfig {
    /// Histogram bin height in metres
    pub bin_size: f64,
    /// Gaussian sigma in bins (kernel radius is 3 sigma)
    pub smoothing_sigma_bins: f64,
    /// Minimum peak height as a fraction of the strongest smoothed bin
    pub min_peak_fraction: f64,
    /// Minimum floor-to-floor distance in metres
    pub min_floor_separation: f64,
    /// Half height of the band used for exact point counts
    pub count_half_band: f64,
    /// Vertical extent below which no floor is reported
    pub min_z_range: f64,
}

impl Default for FloorDetectionConfig {
    fn default() -> Self {
        Self {
            bin_size: 0.05,
            smoothing_sigma_bins: 3.0,
            min_peak_fraction: 0.02,
            min_floor_separation: 2.0,
            count_half_band: 0.2,
            min_z_range: 0.5,
        }
    }
}

impl FloorDetectionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("bin_size", self.bin_size)?;
        positive("smoothing_sigma_bins", self.smoothing_sigma_bins)?;
        positive("count_half_band", self.count_half_band)?;
        if !(0.0..=1.0).contains(&self.min_peak_fraction) {
            return Err(ConfigError::OutOfRange {
                field: "min_peak_fraction",
                value: self.min_peak_fraction,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(())
    }
}

/// Configuration for RANSAC wall extraction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WallDetectionConfig {
    /// Sampling height above the floor slab in metres
    pub slice_height: f64,
    /// Minimum points in the slice (and inliers per wall)
    pub min_points: usize,
    /// Maximum number of extraction rounds
    pub max_walls: usize,
    /// RANSAC iterations per round
    pub iterations: usize,
    /// Orthogonal inlier distance in metres
    pub inlier_threshold: f64,
    /// Shorter segments are discarded (metres)
    pub min_wall_length: f64,
    /// Angle tolerance for merging and snapping (degrees)
    pub angle_tolerance_deg: f64,
    /// Maximum endpoint gap for merging collinear segments (metres)
    pub merge_gap: f64,
    /// Thickness written to every wall
    pub wall_thickness_mm: f64,
    /// Confidence = inliers / slice points * this factor, capped at 100
    pub confidence_scale: f64,
    /// Fixed seed for reproducible extraction; entropy-seeded when `None`
    pub seed: Option<u64>,
}

impl Default for WallDetectionConfig {
    fn default() -> Self {
        Self {
            slice_height: 1.2,
            min_points: 50,
            max_walls: 20,
            iterations: 200,
            inlier_threshold: 0.05,
            min_wall_length: 0.5,
            angle_tolerance_deg: 5.0,
            merge_gap: 0.3,
            wall_thickness_mm: 100.0,
            confidence_scale: 500.0,
            seed: None,
        }
    }
}

impl WallDetectionConfig {
    /// Builder-style setter for the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("inlier_threshold", self.inlier_threshold)?;
        positive("wall_thickness_mm", self.wall_thickness_mm)?;
        if !(0.0..90.0).contains(&self.angle_tolerance_deg) {
            return Err(ConfigError::OutOfRange {
                field: "angle_tolerance_deg",
                value: self.angle_tolerance_deg,
                min: 0.0,
                max: 90.0,
            });
        }
        Ok(())
    }
}
