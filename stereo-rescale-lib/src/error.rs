// SPDX-License-Identifier: MPL-2.0

//! Errors shared by all the stages of the rescaling pipeline.

use thiserror::Error;

/// Result type of every fallible operation in this crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Invalid scale, block size, baseline, threshold or degenerate camera.
    #[error("Invalid configuration: {0}")]
    Configuration(String),
    #[error("Invalid image dimensions: {width}x{height}")]
    Dimension { width: u32, height: u32 },
    /// Sizes are given as (width, height).
    #[error("Dimension mismatch: expected {expected:?} but got {found:?}")]
    DimensionMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },
    #[error("Error parsing calibration: {0}")]
    Parse(String),
}
