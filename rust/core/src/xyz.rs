// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ASCII XYZ / PTS decoder
//!
//! One point per line, fields separated by whitespace or commas:
//!
//! - `x y z`
//! - `x y z r g b`
//! - `x y z intensity r g b` (PTS)
//!
//! Lines with fewer than three numeric fields (PTS count header, comments)
//! are skipped.

use crate::cloud::PointCloud;
use crate::error::{Error, Result};

#[inline]
fn is_separator(b: u8) -> bool {
    b == b' ' || b == b'\t' || b == b','
}

fn parse_field(field: &[u8]) -> Option<f64> {
    lexical_core::parse::<f64>(field).ok()
}

/// Decode an ASCII point list.
pub fn parse_xyz(bytes: &[u8]) -> Result<PointCloud> {
    let mut positions = Vec::new();
    let mut colors = Vec::new();
    let mut all_coloured = true;
    let mut fields: smallvec::SmallVec<[f64; 8]> = smallvec::SmallVec::new();

    for (line_no, raw) in bytes.split(|&b| b == b'\n').enumerate() {
        let line = raw.strip_suffix(b"\r").unwrap_or(raw);
        if line.starts_with(b"#") || line.starts_with(b"//") {
            continue;
        }

        fields.clear();
        let mut numeric = true;
        for token in line.split(|&b| is_separator(b)).filter(|t| !t.is_empty()) {
            match parse_field(token) {
                Some(v) => fields.push(v),
                None => {
                    numeric = false;
                    break;
                }
            }
        }
        if !numeric || fields.len() < 3 {
            if !numeric && !positions.is_empty() {
                return Err(Error::invalid(format!(
                    "line {}: non-numeric field in point record",
                    line_no + 1
                )));
            }
            continue;
        }

        if fields[..3].iter().any(|v| !v.is_finite()) {
            return Err(Error::invalid(format!(
                "line {}: non-finite coordinate",
                line_no + 1
            )));
        }
        positions.extend(fields[..3].iter().map(|&v| v as f32));

        let rgb = match fields.len() {
            6 => Some(&fields[3..6]),
            7 => Some(&fields[4..7]),
            _ => None,
        };
        match rgb {
            Some(rgb) if all_coloured => {
                let scale = if rgb.iter().any(|&c| c > 1.0) { 255.0 } else { 1.0 };
                colors.extend(rgb.iter().map(|&c| (c / scale).clamp(0.0, 1.0) as f32));
            }
            _ => all_coloured = false,
        }
    }

    if positions.is_empty() {
        return Err(Error::MissingPositions(
            "no line with three numeric coordinates".into(),
        ));
    }

    let colors = all_coloured.then_some(colors);
    Ok(PointCloud::new(positions, colors))
}
