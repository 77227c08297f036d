// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HFPC binary wire format for decimated clouds
//!
//! Layout (all little-endian):
//!
//! | bytes | content |
//! |---|---|
//! | 4 | ASCII `HFPC` |
//! | 4 | `u32` point count |
//! | 1 | `u8` has-colour flag (0/1) |
//! | 24 | 6 x `f32` bounds: min.x, min.y, min.z, max.x, max.y, max.z |
//! | 12 * count | `f32` positions |
//! | 12 * count | `f32` colours, only when the flag is 1 |

use crate::cloud::{Bounds, PointCloud};
use crate::error::WireError;

pub const MAGIC: &[u8; 4] = b"HFPC";
/// Magic + count + flag + bounds
pub const HEADER_LEN: usize = 4 + 4 + 1 + 24;

/// Encode a cloud. Float bit patterns are written untouched.
pub fn serialize(cloud: &PointCloud) -> Vec<u8> {
    let colour_len = cloud.colors.as_ref().map_or(0, |c| c.len());
    let mut out = Vec::with_capacity(HEADER_LEN + (cloud.positions.len() + colour_len) * 4);

    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&(cloud.count as u32).to_le_bytes());
    out.push(u8::from(cloud.colors.is_some()));
    for v in cloud.bounds.min.iter().chain(cloud.bounds.max.iter()) {
        out.extend_from_slice(&v.to_le_bytes());
    }
    for v in &cloud.positions {
        out.extend_from_slice(&v.to_le_bytes());
    }
    if let Some(colors) = &cloud.colors {
        for v in colors {
            out.extend_from_slice(&v.to_le_bytes());
        }
    }
    out
}

/// Decode an HFPC buffer.
///
/// Bounds are taken from the header, not recomputed, so a round trip is
/// bit-exact.
pub fn deserialize(bytes: &[u8]) -> Result<PointCloud, WireError> {
    if bytes.len() < 4 || &bytes[..4] != MAGIC {
        return Err(WireError::BadMagic);
    }
    if bytes.len() < HEADER_LEN {
        return Err(WireError::Truncated {
            expected: HEADER_LEN,
            actual: bytes.len(),
        });
    }

    let count = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
    let has_colors = match bytes[8] {
        0 => false,
        1 => true,
        other => return Err(WireError::InvalidColourFlag(other)),
    };

    let mut header_floats = [0f32; 6];
    read_f32s(&bytes[9..HEADER_LEN], &mut header_floats);
    let bounds = Bounds {
        min: [header_floats[0], header_floats[1], header_floats[2]],
        max: [header_floats[3], header_floats[4], header_floats[5]],
    };

    let block = count * 3 * 4;
    let expected = HEADER_LEN + block * if has_colors { 2 } else { 1 };
    if bytes.len() < expected {
        return Err(WireError::Truncated {
            expected,
            actual: bytes.len(),
        });
    }
    if bytes.len() > expected {
        return Err(WireError::TrailingBytes(bytes.len() - expected));
    }

    let mut positions = vec![0f32; count * 3];
    read_f32s(&bytes[HEADER_LEN..HEADER_LEN + block], &mut positions);

    let colors = if has_colors {
        let mut colors = vec![0f32; count * 3];
        read_f32s(&bytes[HEADER_LEN + block..expected], &mut colors);
        Some(colors)
    } else {
        None
    };

    Ok(PointCloud {
        positions,
        colors,
        count,
        bounds,
    })
}

#[inline]
fn read_f32s(bytes: &[u8], out: &mut [f32]) {
    for (dst, chunk) in out.iter_mut().zip(bytes.chunks_exact(4)) {
        *dst = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
}
