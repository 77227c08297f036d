// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wall detection pipeline for one floor
//!
//! Walls are found in a thin horizontal slice taken at a typical wall
//! height above the floor slab, away from floor and ceiling clutter.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use scanplan_core::PointCloud;

use crate::config::WallDetectionConfig;
use crate::line_ops::{merge_collinear_segments, project_extent, snap_to_dominant};
use crate::ransac::fit_line;
use crate::types::{DetectedWall, Point2D, WallSegment};

/// Default slab thickness used when none is supplied
pub const DEFAULT_FLOOR_THICKNESS: f64 = 0.4;

/// Detect walls on the floor at `floor_z` with an entropy-seeded RNG.
///
/// Returns an empty list when the slice holds fewer than 50 points.
pub fn detect_walls(cloud: &PointCloud, floor_z: f64, floor_thickness: f64) -> Vec<DetectedWall> {
    detect_walls_with_config(
        cloud,
        floor_z,
        floor_thickness,
        &WallDetectionConfig::default(),
    )
}

/// Detect walls, seeding the RNG from `config.seed` when set.
pub fn detect_walls_with_config(
    cloud: &PointCloud,
    floor_z: f64,
    floor_thickness: f64,
    config: &WallDetectionConfig,
) -> Vec<DetectedWall> {
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    detect_walls_with_rng(cloud, floor_z, floor_thickness, config, &mut rng)
}

/// Main wall detection pipeline with an explicit random source.
pub fn detect_walls_with_rng<R: Rng + ?Sized>(
    cloud: &PointCloud,
    floor_z: f64,
    floor_thickness: f64,
    config: &WallDetectionConfig,
    rng: &mut R,
) -> Vec<DetectedWall> {
    // Step 1: Horizontal slice at wall height
    let slice = extract_slice(cloud, floor_z + config.slice_height, floor_thickness / 2.0);
    if slice.len() < config.min_points {
        tracing::debug!(
            slice_points = slice.len(),
            floor_z,
            "Too few points in wall slice"
        );
        return Vec::new();
    }

    // Step 2-3: Sequential RANSAC extraction
    let segments = extract_segments(&slice, config, rng);

    // Step 4: Merge collinear pieces
    let angle_tolerance = config.angle_tolerance_deg.to_radians();
    let mut merged = merge_collinear_segments(segments, angle_tolerance, config.merge_gap);

    // Step 5: Snap to the dominant orientation
    snap_to_dominant(&mut merged, angle_tolerance);

    tracing::debug!(
        slice_points = slice.len(),
        walls = merged.len(),
        floor_z,
        "Wall detection complete"
    );

    // Step 6: Report in metres / millimetres
    merged
        .iter()
        .map(|seg| to_detected_wall(seg, slice.len(), config))
        .collect()
}

/// Plan positions of points with `|z - center_z| <= half_height`
fn extract_slice(cloud: &PointCloud, center_z: f64, half_height: f64) -> Vec<Point2D> {
    cloud
        .points()
        .filter(|p| (p[2] as f64 - center_z).abs() <= half_height)
        .map(|p| Point2D::new(p[0] as f64, p[1] as f64))
        .collect()
}

/// Repeatedly fit the best line and remove its inliers
fn extract_segments<R: Rng + ?Sized>(
    slice: &[Point2D],
    config: &WallDetectionConfig,
    rng: &mut R,
) -> Vec<WallSegment> {
    let mut remaining: Vec<Point2D> = slice.to_vec();
    let mut segments = Vec::new();

    for round in 0..config.max_walls {
        if remaining.len() < config.min_points.max(2) {
            break;
        }
        let Some(fit) = fit_line(&remaining, config.iterations, config.inlier_threshold, rng)
        else {
            break;
        };
        if fit.inliers.len() < config.min_points {
            break;
        }

        let mut is_inlier = vec![false; remaining.len()];
        for &i in &fit.inliers {
            is_inlier[i] = true;
        }
        let inlier_points: Vec<Point2D> = fit.inliers.iter().map(|&i| remaining[i]).collect();
        let mut flags = is_inlier.into_iter();
        remaining.retain(|_| !flags.next().unwrap_or(false));

        let Some((start, end)) = project_extent(&inlier_points, &fit.anchor, &fit.direction)
        else {
            continue;
        };
        let segment = WallSegment {
            start,
            end,
            points: inlier_points,
        };
        if segment.length() < config.min_wall_length {
            tracing::trace!(round, length = segment.length(), "Discarding short segment");
            continue;
        }
        segments.push(segment);
    }

    segments
}

#[inline]
fn round_mm(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

fn to_detected_wall(seg: &WallSegment, slice_points: usize, config: &WallDetectionConfig) -> DetectedWall {
    let ratio = seg.inlier_count() as f64 / slice_points.max(1) as f64;
    DetectedWall {
        start_x: round_mm(seg.start.x),
        start_y: round_mm(seg.start.y),
        end_x: round_mm(seg.end.x),
        end_y: round_mm(seg.end.y),
        thickness_mm: config.wall_thickness_mm,
        length_mm: (seg.length() * 1000.0).round(),
        confidence: (config.confidence_scale * ratio).round().min(100.0) as u8,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line_ops::undirected_angle_diff;

    /// Points along the outline of a `w` x `h` rectangle at wall height
    fn rectangle_room(w: f64, h: f64, floor_z: f64, per_metre: f64, seed: u64) -> PointCloud {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut positions = Vec::new();
        let corners = [(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)];
        for k in 0..4 {
            let (x1, y1) = corners[k];
            let (x2, y2) = corners[(k + 1) % 4];
            let len = (x2 - x1).hypot(y2 - y1);
            let (nx, ny) = (-(y2 - y1) / len, (x2 - x1) / len);
            let n = (len * per_metre) as usize;
            for _ in 0..n {
                let t: f64 = rng.gen_range(0.0..1.0);
                let off: f64 = rng.gen_range(-0.02..0.02);
                positions.extend([
                    (x1 + t * (x2 - x1) + off * nx) as f32,
                    (y1 + t * (y2 - y1) + off * ny) as f32,
                    (floor_z + 1.2 + rng.gen_range(-0.15..0.15)) as f32,
                ]);
            }
        }
        // Floor slab below the slice
        for _ in 0..2000 {
            positions.extend([
                rng.gen_range(0.0..w) as f32,
                rng.gen_range(0.0..h) as f32,
                (floor_z + rng.gen_range(-0.01..0.01)) as f32,
            ]);
        }
        // Sparse clutter inside the slice
        for _ in 0..60 {
            positions.extend([
                rng.gen_range(0.5..w - 0.5) as f32,
                rng.gen_range(0.5..h - 0.5) as f32,
                (floor_z + 1.2) as f32,
            ]);
        }
        PointCloud::new(positions, None)
    }

    #[test]
    fn test_rectangle_room() {
        let cloud = rectangle_room(8.0, 5.0, 0.0, 60.0, 11);
        let config = WallDetectionConfig::default().with_seed(5);

        let walls = detect_walls_with_config(&cloud, 0.0, DEFAULT_FLOOR_THICKNESS, &config);

        assert_eq!(walls.len(), 4, "{:#?}", walls);
        let mut lengths: Vec<f64> = walls.iter().map(|w| w.length_mm / 1000.0).collect();
        lengths.sort_by(|a, b| a.total_cmp(b));
        for (got, want) in lengths.iter().zip([5.0, 5.0, 8.0, 8.0]) {
            assert!((got - want).abs() / want < 0.05, "{} vs {}", got, want);
        }

        let angle = |w: &DetectedWall| (w.end_y - w.start_y).atan2(w.end_x - w.start_x);
        let one_degree = 1.0_f64.to_radians();
        for a in &walls {
            for b in &walls {
                let diff = undirected_angle_diff(angle(a), angle(b));
                assert!(
                    diff < one_degree || (diff - std::f64::consts::FRAC_PI_2).abs() < one_degree,
                    "unexpected relative angle {}",
                    diff.to_degrees()
                );
            }
            assert_eq!(a.thickness_mm, 100.0);
            assert!((a.length_mm - a.length() * 1000.0).abs() < 2.0);
            assert!(a.confidence > 0 && a.confidence <= 100);
        }
    }

    #[test]
    fn test_same_seed_same_walls() {
        let cloud = rectangle_room(6.0, 4.0, 3.0, 40.0, 2);
        let config = WallDetectionConfig::default().with_seed(99);
        let a = detect_walls_with_config(&cloud, 3.0, DEFAULT_FLOOR_THICKNESS, &config);
        let b = detect_walls_with_config(&cloud, 3.0, DEFAULT_FLOOR_THICKNESS, &config);
        assert_eq!(a, b);
        assert!(!a.is_empty());
    }

    #[test]
    fn test_sparse_slice_yields_nothing() {
        let positions: Vec<f32> = (0..49)
            .flat_map(|i| [i as f32 * 0.1, 0.0, 1.2])
            .collect();
        let cloud = PointCloud::new(positions, None);
        assert!(detect_walls(&cloud, 0.0, DEFAULT_FLOOR_THICKNESS).is_empty());
    }

    #[test]
    fn test_wrong_floor_has_no_slice() {
        let cloud = rectangle_room(6.0, 4.0, 0.0, 40.0, 3);
        assert!(detect_walls(&cloud, 10.0, DEFAULT_FLOOR_THICKNESS).is_empty());
    }

    #[test]
    fn test_confidence_is_density_score() {
        let seg = WallSegment {
            start: Point2D::new(0.0, 0.0),
            end: Point2D::new(1.23456, 0.0),
            points: vec![Point2D::new(0.0, 0.0); 30],
        };
        let wall = to_detected_wall(&seg, 300, &WallDetectionConfig::default());
        assert_eq!(wall.confidence, 50);
        assert_eq!(wall.end_x, 1.235);
        assert_eq!(wall.length_mm, 1235.0);

        let dense = to_detected_wall(&seg, 60, &WallDetectionConfig::default());
        assert_eq!(dense.confidence, 100);
    }
}
