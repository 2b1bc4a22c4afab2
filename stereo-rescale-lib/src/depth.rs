// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Metric 3D reconstruction from a disparity map.
//!
//! The intrinsics must be the ones of the image grid the disparities
//! were computed on, meaning the rescaled intrinsics when images were resized.
//! The baseline stays the physical one whatever the resolution.
//!
//! Pixels without a usable disparity (occlusions, low texture)
//! are simply skipped, they are not errors.

use crate::camera::{validate_baseline, CameraIntrinsics, StereoRig};
use crate::error::{Error, Result};
use crate::quantize::ImageSize;
use nalgebra::{DMatrix, Point2, Point3};
use rayon::prelude::*;

/// Depth along the optical axis of a point seen with disparity `d`.
pub fn depth_from_disparity(fx: f64, baseline: f64, disparity: f64) -> f64 {
    fx * baseline / disparity
}

/// Reconstruct one 3D point per valid disparity, in raster order
/// (rows top to bottom, then columns left to right).
///
/// A disparity is valid when it is finite and strictly above `min_disparity`.
/// Pixels whose depth overflows to infinity are skipped as well.
/// Rows are processed in parallel and concatenated back in order,
/// so the output does not depend on scheduling.
pub fn reconstruct(
    disparities: &DMatrix<f32>,
    intrinsics: &CameraIntrinsics,
    baseline: f64,
    min_disparity: f64,
) -> Result<Vec<Point3<f64>>> {
    validate(intrinsics, baseline, min_disparity)?;
    let (nrows, ncols) = disparities.shape();

    let rows: Vec<Vec<Point3<f64>>> = (0..nrows)
        .into_par_iter()
        .map(|v| {
            (0..ncols)
                .filter_map(|u| {
                    let d = disparities[(v, u)];
                    let z = pixel_depth(d, intrinsics.fx, baseline, min_disparity)?;
                    Some(intrinsics.back_project(Point2::new(u as f64, v as f64), z))
                })
                .collect()
        })
        .collect();
    let points: Vec<_> = rows.into_iter().flatten().collect();

    log::debug!(
        "Reconstructed {} points out of {} pixels",
        points.len(),
        nrows * ncols
    );
    Ok(points)
}

/// Same as [`reconstruct`] but first checks that the disparity map
/// has the size of the images the rig intrinsics correspond to.
pub fn reconstruct_rig(
    disparities: &DMatrix<f32>,
    rig: &StereoRig,
    expected: ImageSize,
    min_disparity: f64,
) -> Result<Vec<Point3<f64>>> {
    check_grid_size(disparities, expected)?;
    reconstruct(disparities, &rig.intrinsics, rig.baseline, min_disparity)
}

/// Depth of every pixel, NaN where the disparity is not valid.
pub fn depth_map(
    disparities: &DMatrix<f32>,
    intrinsics: &CameraIntrinsics,
    baseline: f64,
    min_disparity: f64,
) -> Result<DMatrix<f64>> {
    validate(intrinsics, baseline, min_disparity)?;
    let (nrows, ncols) = disparities.shape();
    Ok(DMatrix::from_fn(nrows, ncols, |v, u| {
        pixel_depth(disparities[(v, u)], intrinsics.fx, baseline, min_disparity)
            .unwrap_or(f64::NAN)
    }))
}

/// Fail with a dimension mismatch if the grid is not `expected` sized.
pub fn check_grid_size(disparities: &DMatrix<f32>, expected: ImageSize) -> Result<()> {
    let (nrows, ncols) = disparities.shape();
    if (nrows, ncols) == expected.shape() {
        Ok(())
    } else {
        Err(Error::DimensionMismatch {
            expected: (expected.width as usize, expected.height as usize),
            found: (ncols, nrows),
        })
    }
}

fn validate(intrinsics: &CameraIntrinsics, baseline: f64, min_disparity: f64) -> Result<()> {
    validate_baseline(baseline)?;
    intrinsics.validate()?;
    // Keeps every accepted disparity strictly positive.
    if min_disparity.is_nan() || min_disparity < 0.0 {
        return Err(Error::Configuration(format!(
            "minimum disparity must be non-negative, got {}",
            min_disparity
        )));
    }
    Ok(())
}

/// Depth of a pixel, if its disparity is valid and the depth finite.
fn pixel_depth(disparity: f32, fx: f64, baseline: f64, min_disparity: f64) -> Option<f64> {
    let d = disparity as f64;
    if !(d.is_finite() && d > min_disparity) {
        return None;
    }
    Some(depth_from_disparity(fx, baseline, d)).filter(|z| z.is_finite())
}
