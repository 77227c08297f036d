// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pipeline error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Scan ingestion failed: {0}")]
    Ingest(#[from] scanplan_core::Error),

    #[error("Invalid configuration: {0}")]
    Config(#[from] scanplan_vision::ConfigError),

    #[error("Malformed configuration JSON: {0}")]
    Json(#[from] serde_json::Error),
}
