// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Downscaling of a calibrated stereo pair.
//!
//! Chains the size quantization with the intrinsics rescale,
//! and resizes the images to the quantized size.

use crate::calibration::Calibration;
use crate::depth;
use crate::error::{Error, Result};
use crate::interop::image_size;
use crate::quantize::{quantize_with, ImageSize, Rounding, ScaleFactors};
use image::imageops::FilterType;
use image::DynamicImage;
use nalgebra::{DMatrix, Point3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration (parameters) of the downscaling and reconstruction.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Config {
    /// Requested scale, the actual one depends on the block size.
    pub scale: f64,
    /// Image dimensions must be multiples of this.
    pub block_size: u32,
    /// Disparities at or below this are ignored in reconstruction.
    pub min_disparity: f64,
    pub rounding: Rounding,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scale: 0.5,
            block_size: 224,
            min_disparity: 0.0,
            rounding: Rounding::default(),
        }
    }
}

/// Everything needed to bring a stereo pair to the processing resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plan {
    pub original: ImageSize,
    pub target: ImageSize,
    /// Actual scales from `original` to `target`.
    pub factors: ScaleFactors,
    /// Calibration of the images at the `target` size.
    pub calibration: Calibration,
}

/// Compute the target size and the matching calibration.
pub fn plan(config: &Config, original: ImageSize, calibration: &Calibration) -> Result<Plan> {
    let (target, factors) =
        quantize_with(original, config.scale, config.block_size, config.rounding)?;
    let calibration = calibration.rescaled(factors)?;
    log::info!(
        "Target size {}x{} (actual scales: w={:.6}, h={:.6})",
        target.width,
        target.height,
        factors.scale_x,
        factors.scale_y
    );
    Ok(Plan {
        original,
        target,
        factors,
        calibration,
    })
}

impl Plan {
    /// Reconstruct the points of a disparity map computed at the target size.
    pub fn reconstruct(
        &self,
        config: &Config,
        disparities: &DMatrix<f32>,
    ) -> Result<Vec<Point3<f64>>> {
        let rig = self.calibration.rig()?;
        depth::reconstruct_rig(disparities, &rig, self.target, config.min_disparity)
    }
}

/// Resize both images of a stereo pair to `target`.
/// Both images must have the same size.
pub fn resize_pair(
    left: &DynamicImage,
    right: &DynamicImage,
    target: ImageSize,
) -> Result<(DynamicImage, DynamicImage)> {
    let left_size = image_size(left);
    let right_size = image_size(right);
    if left_size != right_size {
        return Err(Error::DimensionMismatch {
            expected: (left_size.width as usize, left_size.height as usize),
            found: (right_size.width as usize, right_size.height as usize),
        });
    }
    // Triangle is a bilinear filter, close to pixel area averaging when shrinking.
    let resize =
        |img: &DynamicImage| img.resize_exact(target.width, target.height, FilterType::Triangle);
    Ok((resize(left), resize(right)))
}
