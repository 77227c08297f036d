// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scan ingestion entry point
//!
//! Sniffs the buffer and dispatches to the matching decoder.

use crate::cloud::PointCloud;
use crate::error::{Error, Result};
use crate::{ply, wire, xyz};

/// Recognized scan encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanFormat {
    /// HFPC decimated wire format
    Hfpc,
    Ply,
    /// ASCII XYZ / PTS point list
    AsciiXyz,
}

/// Guess the encoding from the leading bytes.
pub fn detect_format(bytes: &[u8]) -> ScanFormat {
    if bytes.starts_with(wire::MAGIC) {
        ScanFormat::Hfpc
    } else if ply::is_ply(bytes) {
        ScanFormat::Ply
    } else {
        ScanFormat::AsciiXyz
    }
}

/// Decode a scan buffer into a point cloud.
///
/// Fails when no position attribute can be recovered from the buffer.
pub fn parse(bytes: &[u8]) -> Result<PointCloud> {
    match detect_format(bytes) {
        ScanFormat::Hfpc => {
            let cloud = wire::deserialize(bytes)?;
            if cloud.is_empty() {
                return Err(Error::MissingPositions("HFPC buffer holds no points".into()));
            }
            Ok(cloud)
        }
        ScanFormat::Ply => ply::parse_ply(bytes),
        ScanFormat::AsciiXyz => xyz::parse_xyz(bytes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch() {
        assert_eq!(detect_format(b"HFPC\0\0\0\0"), ScanFormat::Hfpc);
        assert_eq!(detect_format(b"ply\nformat ascii 1.0\n"), ScanFormat::Ply);
        assert_eq!(detect_format(b"1 2 3\n"), ScanFormat::AsciiXyz);
    }

    #[test]
    fn test_reingest_decimated_cloud() {
        let cloud = PointCloud::new(vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0], None);
        let parsed = parse(&wire::serialize(&cloud)).unwrap();
        assert_eq!(parsed, cloud);
    }

    #[test]
    fn test_binary_garbage_fails() {
        let garbage: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
        assert!(matches!(parse(&garbage), Err(Error::MissingPositions(_))));
    }

    #[test]
    fn test_empty_hfpc_has_no_positions() {
        let empty = wire::serialize(&PointCloud::new(Vec::new(), None));
        assert!(wire::deserialize(&empty).is_ok());
        assert!(matches!(parse(&empty), Err(Error::MissingPositions(_))));
    }
}
