// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory point cloud and axis-aligned bounds
//!
//! Positions and colours are stored as flat `f32` buffers (x, y, z, x, y, z, ...)
//! so they can be handed to a renderer or the wire codec without conversion.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in f32 scan coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Bounds {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl Bounds {
    /// Bounds that contain nothing; the first `expand` snaps to the point.
    pub fn empty() -> Self {
        Self {
            min: [f32::MAX; 3],
            max: [f32::MIN; 3],
        }
    }

    /// Expand bounds to include a point
    #[inline]
    pub fn expand(&mut self, x: f32, y: f32, z: f32) {
        self.min[0] = self.min[0].min(x);
        self.min[1] = self.min[1].min(y);
        self.min[2] = self.min[2].min(z);
        self.max[0] = self.max[0].max(x);
        self.max[1] = self.max[1].max(y);
        self.max[2] = self.max[2].max(z);
    }

    /// Compute bounds of a flat xyz buffer in a single pass.
    ///
    /// An empty buffer yields all-zero bounds.
    pub fn from_positions(positions: &[f32]) -> Self {
        if positions.len() < 3 {
            return Self {
                min: [0.0; 3],
                max: [0.0; 3],
            };
        }
        let mut bounds = Self::empty();
        for p in positions.chunks_exact(3) {
            bounds.expand(p[0], p[1], p[2]);
        }
        bounds
    }

    #[inline]
    pub fn extent(&self) -> [f64; 3] {
        [
            self.max[0] as f64 - self.min[0] as f64,
            self.max[1] as f64 - self.min[1] as f64,
            self.max[2] as f64 - self.min[2] as f64,
        ]
    }

    #[inline]
    pub fn volume(&self) -> f64 {
        let [dx, dy, dz] = self.extent();
        dx * dy * dz
    }
}

/// Decoded scan: positions, optional per-point colour and bounds.
///
/// Produced once by ingestion and treated as read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PointCloud {
    /// Flat xyz positions, `count * 3` values
    pub positions: Vec<f32>,
    /// Flat rgb colours normalized to 0..1, same length as `positions`
    pub colors: Option<Vec<f32>>,
    pub count: usize,
    pub bounds: Bounds,
}

impl PointCloud {
    /// Build a cloud from flat buffers, computing count and bounds.
    ///
    /// Colours with a length different from `positions` are dropped.
    pub fn new(positions: Vec<f32>, colors: Option<Vec<f32>>) -> Self {
        let count = positions.len() / 3;
        let bounds = Bounds::from_positions(&positions);
        let colors = colors.filter(|c| c.len() == positions.len());
        Self {
            positions,
            colors,
            count,
            bounds,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    pub fn has_colors(&self) -> bool {
        self.colors.is_some()
    }

    /// Position of point `i`
    #[inline]
    pub fn point(&self, i: usize) -> [f32; 3] {
        let o = i * 3;
        [self.positions[o], self.positions[o + 1], self.positions[o + 2]]
    }

    /// Iterate over points as `[x, y, z]`
    pub fn points(&self) -> impl Iterator<Item = [f32; 3]> + '_ {
        self.positions.chunks_exact(3).map(|p| [p[0], p[1], p[2]])
    }

    /// Check the buffer-length invariants.
    pub fn is_consistent(&self) -> bool {
        self.positions.len() == self.count * 3
            && self
                .colors
                .as_ref()
                .map_or(true, |c| c.len() == self.positions.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_single_pass() {
        let positions = vec![1.0, -2.0, 0.5, -3.0, 4.0, 2.0, 0.0, 0.0, -1.0];
        let bounds = Bounds::from_positions(&positions);
        assert_eq!(bounds.min, [-3.0, -2.0, -1.0]);
        assert_eq!(bounds.max, [1.0, 4.0, 2.0]);
        assert!((bounds.volume() - 4.0 * 6.0 * 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_new_drops_mismatched_colors() {
        let cloud = PointCloud::new(vec![0.0; 6], Some(vec![0.5; 3]));
        assert_eq!(cloud.count, 2);
        assert!(cloud.colors.is_none());
        assert!(cloud.is_consistent());
    }

    #[test]
    fn test_empty_cloud_bounds() {
        let cloud = PointCloud::new(Vec::new(), None);
        assert!(cloud.is_empty());
        assert_eq!(cloud.bounds.min, [0.0; 3]);
    }
}
