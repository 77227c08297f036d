// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # ScanPlan Core
//!
//! Point cloud ingestion and decimation for the scan-to-plan pipeline.
//!
//! ## Overview
//!
//! - **Ingestion**: PLY (ASCII and binary, built with [nom](https://docs.rs/nom)),
//!   ASCII XYZ/PTS point lists and re-ingestion of HFPC buffers
//! - **Decimation**: voxel-grid downsampling to a point budget
//! - **Wire format**: the compact `HFPC` binary layout used to ship decimated
//!   clouds to a viewer
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use scanplan_core::{parse, decimate, serialize, DEFAULT_DECIMATION_TARGET};
//!
//! let cloud = parse(&std::fs::read("scan.ply")?)?;
//! let display = decimate(&cloud, DEFAULT_DECIMATION_TARGET);
//! let bytes = serialize(&display);
//! ```
//!
//! Every operation is synchronous and never mutates its input, so one cloud
//! can be shared between threads.
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization support for [`PointCloud`] and [`Bounds`]

pub mod cloud;
pub mod decimate;
pub mod error;
pub mod ingest;
pub mod ply;
pub mod wire;
pub mod xyz;

pub use cloud::{Bounds, PointCloud};
pub use decimate::{decimate, DEFAULT_DECIMATION_TARGET};
pub use error::{Error, Result, WireError};
pub use ingest::{detect_format, parse, ScanFormat};
pub use wire::{deserialize, serialize};
