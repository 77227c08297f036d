// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for point cloud ingestion.

use thiserror::Error;

/// Result type for ingestion operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while decoding a scan buffer.
///
/// All of these are terminal for the call: a corrupt or unsupported buffer
/// is not retried.
#[derive(Error, Debug)]
pub enum Error {
    #[error("No position attribute could be decoded: {0}")]
    MissingPositions(String),

    #[error("Invalid PLY header at line {line}: {message}")]
    Header { line: usize, message: String },

    #[error("Unexpected end of data while reading {0}")]
    Truncated(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Wire format error: {0}")]
    Wire(#[from] WireError),
}

impl Error {
    pub fn header(line: usize, message: impl Into<String>) -> Self {
        Error::Header {
            line,
            message: message.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Error::InvalidValue(message.into())
    }
}

/// Errors raised by the HFPC wire decoder.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error("bad magic, expected \"HFPC\"")]
    BadMagic,

    #[error("buffer truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("invalid colour flag {0}")]
    InvalidColourFlag(u8),

    #[error("{0} trailing bytes after payload")]
    TrailingBytes(usize),
}
