// SPDX-License-Identifier: MPL-2.0

//! # Stereo rescale
//!
//! Keep the calibration of a stereo camera consistent with the
//! resolution its images are processed at, and reconstruct metric
//! 3D points from disparity maps computed at that resolution.

// #![warn(missing_docs)]

pub mod calibration;
pub mod camera;
pub mod depth;
pub mod downscale;
pub mod error;
pub mod interop;
pub mod quantize;

pub use error::{Error, Result};
