// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Floor and wall recognition from point clouds
//!
//! This crate turns a point cloud into a 2D floor plan:
//! 1. Detecting floor elevations from the vertical point density
//! 2. Detecting straight walls in a horizontal slice above each floor (RANSAC)
//! 3. Laying the walls out on a paper sheet at a fixed drawing scale
//!
//! # Usage
//!
//! ```rust,ignore
//! use scanplan_vision::{calculate_layout, detect_floors, detect_walls, ExportOptions};
//!
//! let floors = detect_floors(&cloud);
//! let walls = detect_walls(&cloud, floors[0].z_height_m, DEFAULT_FLOOR_THICKNESS);
//! let layout = calculate_layout(&walls, &ExportOptions::new("A3", "1:100"));
//! ```

pub mod config;
pub mod floor_detector;
pub mod floor_labels;
pub mod line_ops;
pub mod plan_layout;
pub mod ransac;
pub mod types;
pub mod wall_detector;

// Re-export commonly used types and functions
pub use config::{ConfigError, FloorDetectionConfig, WallDetectionConfig};
pub use floor_detector::{detect_floors, detect_floors_with_config};
pub use floor_labels::{floor_label, label_floors};
pub use plan_layout::{
    calculate_layout, parse_scale, DimensionLine, ExportOptions, PaperSize, PlanLayout, PlanWall,
};
pub use types::{DetectedFloor, DetectedWall, Point2D, WallSegment};
pub use wall_detector::{
    detect_walls, detect_walls_with_config, detect_walls_with_rng, DEFAULT_FLOOR_THICKNESS,
};
