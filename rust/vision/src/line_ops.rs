// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Segment post-processing: projection, collinear merging and angle snapping

use nalgebra::Vector2;
use std::f64::consts::PI;

use crate::types::{Point2D, WallSegment};

/// Difference between two undirected line angles, in [0, PI/2]
pub fn undirected_angle_diff(a: f64, b: f64) -> f64 {
    let diff = (a - b).rem_euclid(PI);
    diff.min(PI - diff)
}

/// Signed rotation in (-PI/2, PI/2] taking undirected angle `from` onto `to`
pub fn signed_undirected_delta(from: f64, to: f64) -> f64 {
    let mut delta = (to - from).rem_euclid(PI);
    if delta > PI / 2.0 {
        delta -= PI;
    }
    delta
}

/// Segment spanned by `points` projected onto the line through `anchor`
/// with unit direction `dir`. Returns `None` for an empty point set.
pub fn project_extent(
    points: &[Point2D],
    anchor: &Point2D,
    dir: &Vector2<f64>,
) -> Option<(Point2D, Point2D)> {
    let mut min_t = f64::INFINITY;
    let mut max_t = f64::NEG_INFINITY;
    for p in points {
        let t = (p.x - anchor.x) * dir.x + (p.y - anchor.y) * dir.y;
        min_t = min_t.min(t);
        max_t = max_t.max(t);
    }
    if min_t > max_t {
        return None;
    }
    Some((anchor.offset(dir, min_t), anchor.offset(dir, max_t)))
}

/// Smallest distance between any endpoint of `a` and any endpoint of `b`
pub fn min_endpoint_gap(a: &WallSegment, b: &WallSegment) -> f64 {
    [
        a.start.distance_to(&b.start),
        a.start.distance_to(&b.end),
        a.end.distance_to(&b.start),
        a.end.distance_to(&b.end),
    ]
    .into_iter()
    .fold(f64::INFINITY, f64::min)
}

/// Check if two segments are nearly parallel and touch end to end
fn are_mergeable(a: &WallSegment, b: &WallSegment, angle_tolerance: f64, max_gap: f64) -> bool {
    undirected_angle_diff(a.angle(), b.angle()) <= angle_tolerance
        && min_endpoint_gap(a, b) <= max_gap
}

/// Merge `b` into `a`: the union of their points is re-projected onto `a`'s
/// line and the endpoints recomputed.
fn merge_pair(a: &WallSegment, b: &WallSegment) -> WallSegment {
    let mut points = Vec::with_capacity(a.points.len() + b.points.len());
    points.extend_from_slice(&a.points);
    points.extend_from_slice(&b.points);

    let dir = a.direction();
    // Fall back to the endpoints when the segments carry no points
    let extent = project_extent(&points, &a.start, &dir).or_else(|| {
        project_extent(&[a.start, a.end, b.start, b.end], &a.start, &dir)
    });
    let (start, end) = extent.unwrap_or((a.start, a.end));

    WallSegment { start, end, points }
}

/// Merge collinear, touching segments until no pair qualifies.
///
/// `angle_tolerance` is in radians.
pub fn merge_collinear_segments(
    segments: Vec<WallSegment>,
    angle_tolerance: f64,
    max_gap: f64,
) -> Vec<WallSegment> {
    let mut merged = segments;
    loop {
        let mut changed = false;
        let mut i = 0;
        while i < merged.len() {
            let mut j = i + 1;
            while j < merged.len() {
                if are_mergeable(&merged[i], &merged[j], angle_tolerance, max_gap) {
                    let other = merged.remove(j);
                    merged[i] = merge_pair(&merged[i], &other);
                    changed = true;
                } else {
                    j += 1;
                }
            }
            i += 1;
        }
        if !changed {
            return merged;
        }
    }
}

/// Rotate segments within `angle_tolerance` of the dominant orientation
/// (first segment's angle) or its perpendicular onto exactly that angle.
///
/// Rotation is about the midpoint and keeps the length.
pub fn snap_to_dominant(segments: &mut [WallSegment], angle_tolerance: f64) {
    let Some(dominant) = segments.first().map(|s| s.angle()) else {
        return;
    };
    let targets = [dominant, dominant + PI / 2.0, dominant - PI / 2.0, dominant + PI];

    for seg in segments.iter_mut() {
        let angle = seg.angle();
        let best = targets
            .iter()
            .map(|&t| signed_undirected_delta(angle, t))
            .min_by(|a, b| a.abs().total_cmp(&b.abs()));
        let Some(delta) = best else { continue };
        if delta.abs() > angle_tolerance || delta == 0.0 {
            continue;
        }

        let mid = seg.midpoint();
        let half = seg.length() / 2.0;
        let rotated = angle + delta;
        let dir = Vector2::new(rotated.cos(), rotated.sin());
        seg.start = mid.offset(&dir, -half);
        seg.end = mid.offset(&dir, half);
    }
}
