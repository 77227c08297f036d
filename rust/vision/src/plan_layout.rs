// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Paper-space layout for plan export
//!
//! Converts wall geometry in metres into a centred, scaled drawing in
//! millimetres. The result is format-agnostic: a PDF or DXF writer only has
//! to draw the segments and dimension lines it contains.
//!
//! Paper space is y-up with the origin at the bottom-left corner of the
//! sheet. A 15 mm margin runs around the sheet and the top 40 mm of the
//! remaining area is reserved for the title block.

use serde::{Deserialize, Serialize};

use crate::types::DetectedWall;

pub const MARGIN_MM: f64 = 15.0;
pub const TITLE_BLOCK_MM: f64 = 40.0;
/// Distance between a wall and its dimension line
pub const DIMENSION_OFFSET_MM: f64 = 8.0;
pub const DEFAULT_SCALE: u32 = 100;
/// Walls shorter than this on paper get no dimension line
const MIN_DIMENSIONED_MM: f64 = 1.0;

/// ISO sheet sizes supported by the exporters
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum PaperSize {
    A1,
    #[default]
    A3,
    A4,
}

impl PaperSize {
    /// Landscape sheet size in millimetres (width, height)
    pub fn dimensions_mm(self) -> (f64, f64) {
        match self {
            PaperSize::A1 => (841.0, 594.0),
            PaperSize::A3 => (420.0, 297.0),
            PaperSize::A4 => (297.0, 210.0),
        }
    }

    /// Case-insensitive lookup; unknown names fall back to A3.
    pub fn parse_or_default(name: &str) -> Self {
        match name.trim().to_ascii_uppercase().as_str() {
            "A1" => PaperSize::A1,
            "A3" => PaperSize::A3,
            "A4" => PaperSize::A4,
            _ => PaperSize::default(),
        }
    }
}

/// Parse a `"1:N"` scale string, returning N or the default of 100.
pub fn parse_scale(scale: &str) -> u32 {
    scale
        .split_once(':')
        .filter(|(one, _)| one.trim() == "1")
        .and_then(|(_, n)| n.trim().parse::<u32>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_SCALE)
}

/// Export request as received from the caller.
///
/// Only `paper_size` and `scale` affect geometry; the remaining fields are
/// passed through to the drawing exporter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ExportOptions {
    pub paper_size: String,
    pub scale: String,
    pub plan_reference: Option<String>,
    pub project_name: Option<String>,
    pub floor_label: Option<String>,
}

impl ExportOptions {
    pub fn new(paper_size: impl Into<String>, scale: impl Into<String>) -> Self {
        Self {
            paper_size: paper_size.into(),
            scale: scale.into(),
            ..Default::default()
        }
    }
}

/// Wall segment in paper space
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlanWall {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    /// Real-world length, unscaled
    pub length_mm: f64,
}

/// Dimension annotation parallel to a wall
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DimensionLine {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub label: String,
}

/// Scaled drawing ready for an exporter
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlanLayout {
    pub paper_width: f64,
    pub paper_height: f64,
    /// Scale denominator N of 1:N
    pub scale: u32,
    /// Paper position of the wall bounding box minimum corner
    pub offset_x: f64,
    pub offset_y: f64,
    pub walls: Vec<PlanWall>,
    pub dimensions: Vec<DimensionLine>,
}

/// Drawable region inside margins and below the title block
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawableArea {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl DrawableArea {
    pub fn for_paper(paper_width: f64, paper_height: f64) -> Self {
        Self {
            x: MARGIN_MM,
            y: MARGIN_MM,
            width: paper_width - 2.0 * MARGIN_MM,
            height: paper_height - 2.0 * MARGIN_MM - TITLE_BLOCK_MM,
        }
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Compute the paper layout for `walls`. Never fails.
pub fn calculate_layout(walls: &[DetectedWall], options: &ExportOptions) -> PlanLayout {
    let (paper_width, paper_height) = PaperSize::parse_or_default(&options.paper_size).dimensions_mm();
    let scale = parse_scale(&options.scale);
    let area = DrawableArea::for_paper(paper_width, paper_height);

    let Some((min_x, min_y, max_x, max_y)) = wall_bounds(walls) else {
        let (cx, cy) = area.center();
        return PlanLayout {
            paper_width,
            paper_height,
            scale,
            offset_x: cx,
            offset_y: cy,
            walls: Vec::new(),
            dimensions: Vec::new(),
        };
    };

    // Metres to paper millimetres at 1:N
    let mm_per_m = 1000.0 / scale as f64;
    let extent_w = (max_x - min_x) * mm_per_m;
    let extent_h = (max_y - min_y) * mm_per_m;
    let offset_x = area.x + (area.width - extent_w) / 2.0;
    let offset_y = area.y + (area.height - extent_h) / 2.0;

    let to_paper = |x: f64, y: f64| {
        (
            offset_x + (x - min_x) * mm_per_m,
            offset_y + (y - min_y) * mm_per_m,
        )
    };

    let plan_walls: Vec<PlanWall> = walls
        .iter()
        .map(|w| {
            let (x1, y1) = to_paper(w.start_x, w.start_y);
            let (x2, y2) = to_paper(w.end_x, w.end_y);
            PlanWall {
                x1,
                y1,
                x2,
                y2,
                length_mm: w.length_mm,
            }
        })
        .collect();

    let dimensions = plan_walls.iter().filter_map(dimension_for).collect();

    PlanLayout {
        paper_width,
        paper_height,
        scale,
        offset_x,
        offset_y,
        walls: plan_walls,
        dimensions,
    }
}

/// Bounding box of all wall endpoints in metres
fn wall_bounds(walls: &[DetectedWall]) -> Option<(f64, f64, f64, f64)> {
    walls.iter().fold(None, |acc, w| {
        let (mut min_x, mut min_y, mut max_x, mut max_y) =
            acc.unwrap_or((f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY));
        for (x, y) in [(w.start_x, w.start_y), (w.end_x, w.end_y)] {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        Some((min_x, min_y, max_x, max_y))
    })
}

/// Dimension line offset along the left-hand normal of the wall direction
fn dimension_for(wall: &PlanWall) -> Option<DimensionLine> {
    let dx = wall.x2 - wall.x1;
    let dy = wall.y2 - wall.y1;
    let len = dx.hypot(dy);
    if len < MIN_DIMENSIONED_MM {
        return None;
    }
    let nx = -dy / len * DIMENSION_OFFSET_MM;
    let ny = dx / len * DIMENSION_OFFSET_MM;
    Some(DimensionLine {
        x1: wall.x1 + nx,
        y1: wall.y1 + ny,
        x2: wall.x2 + nx,
        y2: wall.y2 + ny,
        label: format!("{}", wall.length_mm.round() as i64),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn wall(x1: f64, y1: f64, x2: f64, y2: f64) -> DetectedWall {
        DetectedWall {
            start_x: x1,
            start_y: y1,
            end_x: x2,
            end_y: y2,
            thickness_mm: 100.0,
            length_mm: ((x2 - x1).hypot(y2 - y1) * 1000.0).round(),
            confidence: 90,
        }
    }

    #[test]
    fn test_empty_walls_with_bogus_scale() {
        let layout = calculate_layout(&[], &ExportOptions::new("A3", "bogus"));
        assert_eq!(layout.paper_width, 420.0);
        assert_eq!(layout.paper_height, 297.0);
        assert_eq!(layout.scale, 100);
        assert!(layout.walls.is_empty());
        assert!(layout.dimensions.is_empty());
    }

    #[test]
    fn test_paper_and_scale_parsing() {
        assert_eq!(PaperSize::parse_or_default("a1"), PaperSize::A1);
        assert_eq!(PaperSize::parse_or_default("Letter"), PaperSize::A3);
        assert_eq!(parse_scale("1:50"), 50);
        assert_eq!(parse_scale(" 1 : 200 "), 200);
        assert_eq!(parse_scale("2:50"), 100);
        assert_eq!(parse_scale("1:0"), 100);
        assert_eq!(parse_scale(""), 100);
    }

    #[test]
    fn test_single_wall_is_centred() {
        // A diagonal wall spans its own bounding box
        let walls = [wall(2.0, 3.0, 14.0, 9.0)];
        let layout = calculate_layout(&walls, &ExportOptions::new("A3", "1:100"));

        let w = &layout.walls[0];
        let (cx, cy) = ((w.x1 + w.x2) / 2.0, (w.y1 + w.y2) / 2.0);
        let (ax, ay) = DrawableArea::for_paper(420.0, 297.0).center();
        assert!((cx - ax).abs() < 1.0 && (cy - ay).abs() < 1.0);
        assert_relative_eq!(ax, 210.0);
        assert_relative_eq!(ay, 128.5);

        // 12 m at 1:100 is 120 mm on paper
        assert_relative_eq!(w.x2 - w.x1, 120.0, epsilon = 1e-9);
        assert_eq!(w.length_mm, walls[0].length_mm);
    }

    #[test]
    fn test_dimension_offset_left_of_direction() {
        let walls = [wall(0.0, 0.0, 5.0, 0.0), wall(0.0, 0.0, 0.0, 0.00005)];
        let layout = calculate_layout(&walls, &ExportOptions::new("A4", "1:50"));

        // The near-zero wall is not dimensioned
        assert_eq!(layout.dimensions.len(), 1);
        let dim = &layout.dimensions[0];
        let w = &layout.walls[0];
        assert_relative_eq!(dim.y1 - w.y1, DIMENSION_OFFSET_MM, epsilon = 1e-9);
        assert_relative_eq!(dim.x1, w.x1, epsilon = 1e-9);
        assert_eq!(dim.label, "5000");
    }

    #[test]
    fn test_layout_serializes_camel_case() {
        let layout = calculate_layout(&[wall(0.0, 0.0, 1.0, 0.0)], &ExportOptions::new("A1", "1:20"));
        let json = serde_json::to_value(&layout).unwrap();
        assert_eq!(json["paperWidth"], 841.0);
        assert_eq!(json["scale"], 20);
        assert!(json["walls"][0]["lengthMm"].is_number());
    }
}
