// SPDX-License-Identifier: MPL-2.0

//! Interoperability conversions between the image and matrix types.
//!
//! Matrices are indexed (row, column), that is (v, u) in pixel coordinates,
//! with as many rows as the image height.

use crate::error::{Error, Result};
use crate::quantize::ImageSize;
use image::{GenericImageView, ImageBuffer, Luma, Primitive};
use nalgebra::{DMatrix, Scalar};

/// Size of any image.
pub fn image_size<I: GenericImageView>(img: &I) -> ImageSize {
    let (width, height) = img.dimensions();
    ImageSize { width, height }
}

/// Gray image with one pixel per matrix entry, row `v` becoming image line `v`.
/// Inverse operation of `matrix_from_image`.
#[allow(clippy::cast_possible_truncation)]
pub fn image_from_matrix<T: Scalar + Primitive>(mat: &DMatrix<T>) -> ImageBuffer<Luma<T>, Vec<T>> {
    let (nrows, ncols) = mat.shape();
    ImageBuffer::from_fn(ncols as u32, nrows as u32, |u, v| {
        Luma([mat[(v as usize, u as usize)]])
    })
}

/// Convert a gray image into a matrix.
/// Inverse operation of `image_from_matrix`.
pub fn matrix_from_image<T: Scalar + Primitive>(img: ImageBuffer<Luma<T>, Vec<T>>) -> DMatrix<T> {
    let (width, height) = img.dimensions();
    DMatrix::from_row_slice(height as usize, width as usize, &img.into_raw())
}

/// Decode a 16 bits disparity image where each value is the disparity
/// multiplied by `scale` (256 in the KITTI convention), 0 meaning no disparity.
pub fn disparity_from_image(img: ImageBuffer<Luma<u16>, Vec<u16>>, scale: f32) -> Result<DMatrix<f32>> {
    if !(scale.is_finite() && scale > 0.0) {
        return Err(Error::Configuration(format!(
            "disparity scale must be positive, got {}",
            scale
        )));
    }
    Ok(matrix_from_image(img).map(|v| v as f32 / scale))
}

/// Encode a depth map into a 16 bits image storing `depth * scale`
/// (1000 for millimeters), the inverse convention of `disparity_from_image`.
/// Undefined depths become 0 and depths too far for 16 bits saturate.
pub fn depth_to_image(
    depths: &DMatrix<f64>,
    scale: f64,
) -> Result<ImageBuffer<Luma<u16>, Vec<u16>>> {
    if !(scale.is_finite() && scale > 0.0) {
        return Err(Error::Configuration(format!(
            "depth scale must be positive, got {}",
            scale
        )));
    }
    let encoded = depths.map(|z| {
        if z.is_finite() && z > 0.0 {
            (z * scale).round().min(u16::MAX as f64) as u16
        } else {
            0
        }
    });
    Ok(image_from_matrix(&encoded))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_has_image_height_rows() {
        let img = ImageBuffer::from_fn(3, 2, |x, y| Luma([(10 * y + x) as f32]));
        let mat = matrix_from_image(img.clone());
        assert_eq!(mat.shape(), (2, 3));
        assert_eq!(mat[(1, 2)], 12.0);
        assert_eq!(image_from_matrix(&mat), img);
        assert_eq!(image_size(&img), ImageSize::new(3, 2));
    }

    #[test]
    fn disparity_image_is_rescaled() {
        let img = ImageBuffer::from_raw(2, 1, vec![0u16, 5120]).unwrap();
        let disparities = disparity_from_image(img, 256.0).unwrap();
        assert_eq!(disparities[(0, 0)], 0.0);
        assert_eq!(disparities[(0, 1)], 20.0);
    }

    #[test]
    fn depth_image_in_millimeters() {
        let depths = DMatrix::from_row_slice(2, 2, &[1.6018, f64::NAN, 0.0, 1e6]);
        let img = depth_to_image(&depths, 1000.0).unwrap();
        assert_eq!(image_size(&img), ImageSize::new(2, 2));
        assert_eq!(img.into_raw(), vec![1602, 0, 0, u16::MAX]);
        assert!(depth_to_image(&depths, -1.0).is_err());
    }

    #[test]
    fn disparity_scale_must_be_positive() {
        let img = ImageBuffer::from_raw(1, 1, vec![7u16]).unwrap();
        assert!(disparity_from_image(img, 0.0).is_err());
    }
}
