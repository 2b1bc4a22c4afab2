// SPDX-License-Identifier: MPL-2.0

//! Pinhole camera intrinsics and stereo rig.
//!
//! Rescaling an image by `(scale_x, scale_y)` rescales the focal length and
//! principal point along each axis independently.
//! The baseline of a rig is a physical length and is never rescaled.

use crate::error::{Error, Result};
use crate::quantize::ScaleFactors;
use nalgebra::{Matrix3, Point2, Point3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Tolerance on the terms of an intrinsic matrix that must be zero (or one).
const MATRIX_TERM_EPSILON: f64 = 1e-9;

/// Pinhole camera intrinsics, in pixels, with zero skew.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CameraIntrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

impl CameraIntrinsics {
    /// Build intrinsics, rejecting a degenerate camera.
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64) -> Result<Self> {
        let intrinsics = Self { fx, fy, cx, cy };
        intrinsics.validate()?;
        Ok(intrinsics)
    }

    /// Check that focal lengths are finite and strictly positive
    /// and that the principal point is finite.
    pub fn validate(&self) -> Result<()> {
        if !(self.fx.is_finite() && self.fx > 0.0) {
            return Err(Error::Configuration(format!(
                "focal length fx must be positive, got {}",
                self.fx
            )));
        }
        if !(self.fy.is_finite() && self.fy > 0.0) {
            return Err(Error::Configuration(format!(
                "focal length fy must be positive, got {}",
                self.fy
            )));
        }
        if !(self.cx.is_finite() && self.cy.is_finite()) {
            return Err(Error::Configuration(format!(
                "principal point must be finite, got ({}, {})",
                self.cx, self.cy
            )));
        }
        Ok(())
    }

    /// Extract intrinsics from a `[[fx,0,cx],[0,fy,cy],[0,0,1]]` matrix.
    pub fn from_matrix(k: &Matrix3<f64>) -> Result<Self> {
        let zeros = [(0, 1), (1, 0), (2, 0), (2, 1)];
        for &(row, col) in zeros.iter() {
            if k[(row, col)].abs() > MATRIX_TERM_EPSILON {
                return Err(Error::Parse(format!(
                    "expected a zero at ({}, {}) of the intrinsic matrix, got {}",
                    row,
                    col,
                    k[(row, col)]
                )));
            }
        }
        if (k[(2, 2)] - 1.0).abs() > MATRIX_TERM_EPSILON {
            return Err(Error::Parse(format!(
                "expected a one at (2, 2) of the intrinsic matrix, got {}",
                k[(2, 2)]
            )));
        }
        Self::new(k[(0, 0)], k[(1, 1)], k[(0, 2)], k[(1, 2)])
    }

    /// The 3x3 intrinsic matrix K.
    pub fn matrix(&self) -> Matrix3<f64> {
        Matrix3::new(
            self.fx, 0.0, self.cx, //
            0.0, self.fy, self.cy, //
            0.0, 0.0, 1.0,
        )
    }

    /// Intrinsics matching the image resized by `factors`.
    pub fn rescaled(&self, factors: ScaleFactors) -> Result<Self> {
        rescale(self, factors)
    }

    /// Back project a pixel to the 3D point at the given depth.
    pub fn back_project(&self, pixel: Point2<f64>, depth: f64) -> Point3<f64> {
        Point3::new(
            (pixel.x - self.cx) * depth / self.fx,
            (pixel.y - self.cy) * depth / self.fy,
            depth,
        )
    }
}

/// Rescale intrinsics by per-axis factors.
///
/// `fx` and `cx` follow `scale_x`, `fy` and `cy` follow `scale_y`.
/// Applying the inverse factors afterwards gives back the original intrinsics.
pub fn rescale(original: &CameraIntrinsics, factors: ScaleFactors) -> Result<CameraIntrinsics> {
    factors.validate()?;
    let rescaled = CameraIntrinsics {
        fx: original.fx * factors.scale_x,
        fy: original.fy * factors.scale_y,
        cx: original.cx * factors.scale_x,
        cy: original.cy * factors.scale_y,
    };
    rescaled.validate()?;
    log::debug!("Rescaled intrinsics {:?} -> {:?}", original, rescaled);
    Ok(rescaled)
}

/// Calibrated stereo pair: left camera intrinsics and the distance between cameras.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StereoRig {
    pub intrinsics: CameraIntrinsics,
    /// Expressed in the unit of the reconstructed points.
    pub baseline: f64,
}

impl StereoRig {
    pub fn new(intrinsics: CameraIntrinsics, baseline: f64) -> Result<Self> {
        intrinsics.validate()?;
        validate_baseline(baseline)?;
        Ok(Self {
            intrinsics,
            baseline,
        })
    }

    /// Same rig observed through images resized by `factors`.
    /// The baseline is copied as is.
    pub fn rescaled(&self, factors: ScaleFactors) -> Result<Self> {
        Ok(Self {
            intrinsics: rescale(&self.intrinsics, factors)?,
            baseline: self.baseline,
        })
    }
}

pub(crate) fn validate_baseline(baseline: f64) -> Result<()> {
    if baseline.is_finite() && baseline > 0.0 {
        Ok(())
    } else {
        Err(Error::Configuration(format!(
            "baseline must be positive, got {}",
            baseline
        )))
    }
}
