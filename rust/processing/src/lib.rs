// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scan-to-plan pipeline
//!
//! Chains the core and vision crates in the order the detectors require:
//!
//! 1. [`analyze_scan`]: ingest, then decimate and detect floors in parallel
//! 2. [`detect_floor_walls`]: walls on one chosen floor
//! 3. [`plan_layout`]: paper-space drawing for the exporter
//!
//! Every step is a pure function of its inputs. Cancellation is the host's
//! concern: run the call on a worker and drop the result.

pub mod error;

use std::time::Instant;

use serde::{Deserialize, Serialize};

use scanplan_core::{decimate, PointCloud, DEFAULT_DECIMATION_TARGET};
use scanplan_vision::{
    calculate_layout, detect_floors_with_config, detect_walls_with_config, ConfigError,
    DetectedFloor, DetectedWall, ExportOptions, FloorDetectionConfig, PlanLayout,
    WallDetectionConfig, DEFAULT_FLOOR_THICKNESS,
};

pub use error::{PipelineError, Result};

/// Tunables for a full pipeline run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Point budget of the display cloud
    pub decimation_target: usize,
    pub floors: FloorDetectionConfig,
    pub walls: WallDetectionConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            decimation_target: DEFAULT_DECIMATION_TARGET,
            floors: FloorDetectionConfig::default(),
            walls: WallDetectionConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load a (possibly partial) JSON configuration; missing fields keep
    /// their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: PipelineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.decimation_target == 0 {
            return Err(ConfigError::NotPositive {
                field: "decimation_target",
                value: 0.0,
            });
        }
        self.floors.validate()?;
        self.walls.validate()
    }
}

/// Result of the first pipeline stage
#[derive(Debug, Clone)]
pub struct ScanAnalysis {
    /// Full-resolution cloud, used for wall detection
    pub cloud: PointCloud,
    /// Decimated cloud for display
    pub display: PointCloud,
    /// Detected floors, ascending by elevation
    pub floors: Vec<DetectedFloor>,
}

impl ScanAnalysis {
    /// Display cloud in the HFPC wire format
    pub fn display_bytes(&self) -> Vec<u8> {
        scanplan_core::serialize(&self.display)
    }
}

/// Ingest a scan, then decimate it and detect floors concurrently.
pub fn analyze_scan(bytes: &[u8], config: &PipelineConfig) -> Result<ScanAnalysis> {
    config.validate()?;

    let start = Instant::now();
    let cloud = scanplan_core::parse(bytes)?;
    let parse_time = start.elapsed();

    // Both only read the cloud
    let (display, floors) = rayon::join(
        || decimate(&cloud, config.decimation_target),
        || detect_floors_with_config(&cloud, &config.floors),
    );

    let display_count = display.count;
    tracing::info!(
        points = cloud.count,
        display_points = display_count,
        colors = cloud.has_colors(),
        floors = floors.len(),
        parse_time_ms = parse_time.as_millis(),
        total_time_ms = start.elapsed().as_millis(),
        "Scan analysed"
    );

    Ok(ScanAnalysis {
        cloud,
        display,
        floors,
    })
}

/// Detect walls on `floor`, which should come from `analysis.floors`.
pub fn detect_floor_walls(
    analysis: &ScanAnalysis,
    floor: &DetectedFloor,
    config: &PipelineConfig,
) -> Vec<DetectedWall> {
    let start = Instant::now();
    let walls = detect_walls_with_config(
        &analysis.cloud,
        floor.z_height_m,
        DEFAULT_FLOOR_THICKNESS,
        &config.walls,
    );
    tracing::info!(
        floor = %floor.label,
        z = floor.z_height_m,
        walls = walls.len(),
        time_ms = start.elapsed().as_millis(),
        "Walls detected"
    );
    walls
}

/// Lay the walls of one floor out on paper.
pub fn plan_layout(walls: &[DetectedWall], options: &ExportOptions) -> PlanLayout {
    let layout = calculate_layout(walls, options);
    tracing::debug!(
        paper_width = layout.paper_width,
        paper_height = layout.paper_height,
        scale = layout.scale,
        dimensions = layout.dimensions.len(),
        "Plan layout computed"
    );
    layout
}
