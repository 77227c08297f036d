// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Voxel-grid decimation
//!
//! Buckets points into a uniform grid sized so that roughly `target` cells
//! span the bounding box, then emits the mean of each occupied cell.

use rustc_hash::FxHashMap;

use crate::cloud::{Bounds, PointCloud};

/// Default point budget for interactive viewing
pub const DEFAULT_DECIMATION_TARGET: usize = 2_000_000;

/// Extents below this are treated as degenerate (flat) axes
const DEGENERATE_EXTENT: f64 = 1e-9;
/// Growth factor applied when a pass still exceeds the budget
const EDGE_GROWTH: f64 = 1.25;
const MAX_PASSES: usize = 64;

/// Running sums for one occupied voxel
#[derive(Debug, Clone, Copy, Default)]
struct VoxelAccumulator {
    position: [f64; 3],
    color: [f64; 3],
    count: u32,
}

/// Downsample `cloud` to at most `target` points.
///
/// A cloud already within budget is returned unchanged.
pub fn decimate(cloud: &PointCloud, target: usize) -> PointCloud {
    if cloud.count <= target {
        return cloud.clone();
    }
    // A zero budget still yields one point per non-empty cloud
    let target = target.max(1);

    let mut edge = initial_edge(&cloud.bounds, target);
    let mut result = voxel_pass(cloud, edge);
    let mut passes = 1;
    while result.count > target && passes < MAX_PASSES {
        edge *= EDGE_GROWTH;
        result = voxel_pass(cloud, edge);
        passes += 1;
    }
    result
}

/// Edge length giving about `target` cells over the non-degenerate axes.
///
/// For a full 3D box this is `cbrt(volume / target)`. A flat cloud uses the
/// area of its two spanning axes and a line uses its length, so no division
/// by a zero volume happens. A single-point extent returns 1.0, which puts
/// every point into one cell.
fn initial_edge(bounds: &Bounds, target: usize) -> f64 {
    let spans: Vec<f64> = bounds
        .extent()
        .into_iter()
        .filter(|e| *e > DEGENERATE_EXTENT)
        .collect();
    if spans.is_empty() {
        return 1.0;
    }
    let measure: f64 = spans.iter().product();
    (measure / target as f64).powf(1.0 / spans.len() as f64)
}

fn voxel_pass(cloud: &PointCloud, edge: f64) -> PointCloud {
    let min = [
        cloud.bounds.min[0] as f64,
        cloud.bounds.min[1] as f64,
        cloud.bounds.min[2] as f64,
    ];
    let extent = cloud.bounds.extent();
    let cells = |axis: usize| (extent[axis] / edge).floor() as u64 + 1;
    let n = [cells(0), cells(1), cells(2)];
    let (nx, ny) = (n[0], n[1]);

    let mut index: FxHashMap<u64, usize> = FxHashMap::default();
    let mut voxels: Vec<VoxelAccumulator> = Vec::new();
    let colors = cloud.colors.as_deref();

    for (i, p) in cloud.positions.chunks_exact(3).enumerate() {
        // Clamped so a boundary point never spills into the next row
        let cell = |axis: usize| {
            (((p[axis] as f64 - min[axis]) / edge).floor().max(0.0) as u64).min(n[axis] - 1)
        };
        let key = cell(0) + cell(1) * nx + cell(2) * nx * ny;

        let slot = *index.entry(key).or_insert_with(|| {
            voxels.push(VoxelAccumulator::default());
            voxels.len() - 1
        });
        let voxel = &mut voxels[slot];
        for axis in 0..3 {
            voxel.position[axis] += p[axis] as f64;
        }
        if let Some(colors) = colors {
            for axis in 0..3 {
                voxel.color[axis] += colors[i * 3 + axis] as f64;
            }
        }
        voxel.count += 1;
    }

    let mut positions = Vec::with_capacity(voxels.len() * 3);
    let mut out_colors = colors.map(|_| Vec::with_capacity(voxels.len() * 3));
    for voxel in &voxels {
        let n = voxel.count as f64;
        positions.extend(voxel.position.iter().map(|s| (s / n) as f32));
        if let Some(out) = out_colors.as_mut() {
            out.extend(voxel.color.iter().map(|s| (s / n) as f32));
        }
    }

    // Bounds are recomputed: extreme points may have been averaged away
    PointCloud::new(positions, out_colors)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_cloud(n: usize, with_colors: bool) -> PointCloud {
        let mut positions = Vec::new();
        let mut colors = Vec::new();
        for i in 0..n {
            for j in 0..n {
                for k in 0..n {
                    positions.extend([i as f32 * 0.1, j as f32 * 0.1, k as f32 * 0.1]);
                    colors.extend([i as f32 / n as f32, 0.5, 1.0]);
                }
            }
        }
        PointCloud::new(positions, with_colors.then_some(colors))
    }

    #[test]
    fn test_under_budget_is_identity() {
        let cloud = grid_cloud(5, true);
        let out = decimate(&cloud, 125);
        assert_eq!(out, cloud);
    }

    #[test]
    fn test_respects_budget() {
        let cloud = grid_cloud(20, true);
        for target in [1, 7, 100, 1000, 7999] {
            let out = decimate(&cloud, target);
            assert!(out.count >= 1);
            assert!(out.count <= target, "{} > {}", out.count, target);
            assert!(out.is_consistent());
            let colors = out.colors.as_ref().unwrap();
            assert!(colors.iter().all(|c| (0.0..=1.0).contains(c)));
        }
    }

    #[test]
    fn test_output_bounds_recomputed() {
        let cloud = grid_cloud(10, false);
        let out = decimate(&cloud, 8);
        assert_eq!(out.bounds, Bounds::from_positions(&out.positions));
        for axis in 0..3 {
            assert!(out.bounds.min[axis] >= cloud.bounds.min[axis]);
            assert!(out.bounds.max[axis] <= cloud.bounds.max[axis]);
        }
    }

    #[test]
    fn test_flat_cloud_does_not_divide_by_zero() {
        let mut positions = Vec::new();
        for i in 0..100 {
            for j in 0..100 {
                positions.extend([i as f32 * 0.01, j as f32 * 0.01, 2.5]);
            }
        }
        let cloud = PointCloud::new(positions, None);
        let out = decimate(&cloud, 500);
        assert!(out.count >= 1 && out.count <= 500);
        assert!(out.positions.iter().all(|v| v.is_finite()));
        assert_eq!(out.bounds.min[2], 2.5);
    }

    #[test]
    fn test_identical_points_collapse() {
        let cloud = PointCloud::new([1.0f32, 2.0, 3.0].repeat(50), None);
        let out = decimate(&cloud, 10);
        assert_eq!(out.count, 1);
        assert_eq!(out.positions, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_voxel_mean() {
        // Two tight clusters far apart collapse to their centroids
        let positions = vec![
            0.0, 0.0, 0.0, 0.02, 0.0, 0.0, 0.0, 0.02, 0.0, //
            10.0, 10.0, 10.0, 10.0, 9.98, 10.0, 9.98, 10.0, 10.0,
        ];
        let cloud = PointCloud::new(positions, None);
        let out = decimate(&cloud, 2);
        assert_eq!(out.count, 2);
        approx::assert_relative_eq!(out.positions[0], 0.02 / 3.0, epsilon = 1e-6);
        approx::assert_relative_eq!(out.positions[3], 10.0 - 0.02 / 3.0, epsilon = 1e-5);
    }

    #[test]
    fn test_boundary_point_keeps_its_own_cell() {
        let cloud = PointCloud::new(vec![1.0131, 0.0, 0.0, -0.000_247_4, 0.152, 0.0], None);
        let exact = 1.0131f32 as f64 - (-0.000_247_4f32) as f64;

        let out = voxel_pass(&cloud, exact / 10.0);

        assert_eq!(out.count, 2);
        assert_eq!(out.positions, cloud.positions);
    }
}
