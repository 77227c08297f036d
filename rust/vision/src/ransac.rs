// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! RANSAC line fitting on 2D points
//!
//! The random source is a parameter so callers can seed it and reproduce
//! an extraction exactly.

use nalgebra::Vector2;
use rand::Rng;

use crate::types::Point2D;

/// Best line found by [`fit_line`]
#[derive(Debug, Clone)]
pub struct LineFit {
    /// A point on the line (the first sample)
    pub anchor: Point2D,
    /// Unit direction
    pub direction: Vector2<f64>,
    /// Indices of the inlier points in the input slice
    pub inliers: Vec<usize>,
}

/// Orthogonal distance test for the line through `anchor` with unit normal
/// `normal`
#[inline]
fn within(p: &Point2D, anchor: &Point2D, normal: &Vector2<f64>, threshold: f64) -> bool {
    ((p.x - anchor.x) * normal.x + (p.y - anchor.y) * normal.y).abs() <= threshold
}

/// Fit the line with the largest inlier support.
///
/// Each of the `iterations` draws two distinct points, forms the line
/// through them and counts the points within `threshold` of it. Returns
/// `None` when fewer than two points are given or every draw was degenerate.
pub fn fit_line<R: Rng + ?Sized>(
    points: &[Point2D],
    iterations: usize,
    threshold: f64,
    rng: &mut R,
) -> Option<LineFit> {
    let n = points.len();
    if n < 2 {
        return None;
    }

    let mut best: Option<(usize, Point2D, Vector2<f64>)> = None;

    for _ in 0..iterations {
        let i = rng.gen_range(0..n);
        let mut j = rng.gen_range(0..n - 1);
        if j >= i {
            j += 1;
        }

        let p1 = points[i].to_nalgebra();
        let p2 = points[j].to_nalgebra();
        let d = p2 - p1;
        let len = d.norm();
        if len < 1e-9 {
            continue;
        }
        let direction = d / len;
        let normal = Vector2::new(-direction.y, direction.x);

        let count = points
            .iter()
            .filter(|p| within(p, &points[i], &normal, threshold))
            .count();

        if best.as_ref().map_or(true, |(c, _, _)| count > *c) {
            best = Some((count, points[i], direction));
        }
    }

    let (_, anchor, direction) = best?;
    let normal = Vector2::new(-direction.y, direction.x);
    let inliers = points
        .iter()
        .enumerate()
        .filter(|(_, p)| within(p, &anchor, &normal, threshold))
        .map(|(i, _)| i)
        .collect();

    Some(LineFit {
        anchor,
        direction,
        inliers,
    })
}
