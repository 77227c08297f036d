// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Core types for floor and wall recognition

use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

/// A 2D point in plan coordinates (metres)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn to_nalgebra(&self) -> Point2<f64> {
        Point2::new(self.x, self.y)
    }

    pub fn distance_to(&self, other: &Point2D) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Point reached by moving `t` along `dir` from `self`
    pub fn offset(&self, dir: &Vector2<f64>, t: f64) -> Point2D {
        Point2D::new(self.x + dir.x * t, self.y + dir.y * t)
    }
}

/// A storey elevation found in the vertical point density
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectedFloor {
    /// Display label (e.g., "Ground Floor", "Basement 1")
    pub label: String,
    /// Slab elevation in metres
    pub z_height_m: f64,
    pub z_range_min: f64,
    pub z_range_max: f64,
    /// Exact number of points inside the slab band
    pub point_count: usize,
    /// Peak strength relative to the strongest peak (0 - 100)
    pub confidence: u8,
    /// Position in the ascending elevation order
    pub sort_order: u32,
}

/// A straight wall segment on one floor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectedWall {
    pub start_x: f64,
    pub start_y: f64,
    pub end_x: f64,
    pub end_y: f64,
    /// Assumed, not measured
    pub thickness_mm: f64,
    pub length_mm: f64,
    /// Inlier density score (0 - 100)
    pub confidence: u8,
}

impl DetectedWall {
    pub fn start(&self) -> Point2D {
        Point2D::new(self.start_x, self.start_y)
    }

    pub fn end(&self) -> Point2D {
        Point2D::new(self.end_x, self.end_y)
    }

    /// Length in metres computed from the endpoints
    pub fn length(&self) -> f64 {
        self.start().distance_to(&self.end())
    }
}

/// Fitted line segment together with the slice points supporting it
#[derive(Debug, Clone)]
pub struct WallSegment {
    pub start: Point2D,
    pub end: Point2D,
    /// Supporting slice points
    pub points: Vec<Point2D>,
}

impl WallSegment {
    pub fn length(&self) -> f64 {
        self.start.distance_to(&self.end)
    }

    /// Direction angle in radians, in (-PI, PI]
    pub fn angle(&self) -> f64 {
        (self.end.y - self.start.y).atan2(self.end.x - self.start.x)
    }

    pub fn midpoint(&self) -> Point2D {
        Point2D::new(
            (self.start.x + self.end.x) / 2.0,
            (self.start.y + self.end.y) / 2.0,
        )
    }

    /// Unit direction from start to end; +x for a zero-length segment
    pub fn direction(&self) -> Vector2<f64> {
        let d = Vector2::new(self.end.x - self.start.x, self.end.y - self.start.y);
        let len = d.norm();
        if len < 1e-12 {
            Vector2::x()
        } else {
            d / len
        }
    }

    pub fn inlier_count(&self) -> usize {
        self.points.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_geometry() {
        let seg = WallSegment {
            start: Point2D::new(0.0, 0.0),
            end: Point2D::new(0.0, 4.0),
            points: Vec::new(),
        };
        assert!((seg.length() - 4.0).abs() < 1e-12);
        assert!((seg.angle() - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
        assert_eq!(seg.midpoint(), Point2D::new(0.0, 2.0));
        assert!((seg.direction() - Vector2::y()).norm() < 1e-12);
    }

    #[test]
    fn test_wall_serializes_with_field_names() {
        let wall = DetectedWall {
            start_x: 0.0,
            start_y: 0.0,
            end_x: 3.0,
            end_y: 4.0,
            thickness_mm: 100.0,
            length_mm: 5000.0,
            confidence: 80,
        };
        let json = serde_json::to_value(&wall).unwrap();
        assert_eq!(json["length_mm"], 5000.0);
        assert!((wall.length() - 5.0).abs() < 1e-12);
    }
}
