// SPDX-License-Identifier: MPL-2.0

//! Target image size constrained to a multiple of a block size.

use crate::error::{Error, Result};
use std::convert::TryFrom;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Dimensions of an image, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Shape of the matrix holding an image of this size: (rows, columns).
    pub fn shape(&self) -> (usize, usize) {
        (self.height as usize, self.width as usize)
    }

    fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            Err(Error::Dimension {
                width: self.width,
                height: self.height,
            })
        } else {
            Ok(())
        }
    }
}

/// Per-axis scale factors between two image sizes.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ScaleFactors {
    pub scale_x: f64,
    pub scale_y: f64,
}

impl ScaleFactors {
    pub fn uniform(scale: f64) -> Self {
        Self {
            scale_x: scale,
            scale_y: scale,
        }
    }

    /// Factors mapping `original` onto `target`.
    pub fn between(original: ImageSize, target: ImageSize) -> Self {
        Self {
            scale_x: target.width as f64 / original.width as f64,
            scale_y: target.height as f64 / original.height as f64,
        }
    }

    /// Reciprocal factors, undoing a rescale.
    pub fn inverse(&self) -> Self {
        Self {
            scale_x: 1.0 / self.scale_x,
            scale_y: 1.0 / self.scale_y,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let valid = |s: f64| s.is_finite() && s > 0.0;
        if valid(self.scale_x) && valid(self.scale_y) {
            Ok(())
        } else {
            Err(Error::Configuration(format!(
                "scale factors must be positive, got ({}, {})",
                self.scale_x, self.scale_y
            )))
        }
    }
}

/// How a scaled dimension snaps onto the block grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Rounding {
    /// Smallest multiple of the block size not below the scaled dimension.
    Up,
    /// Truncate the scaled dimension, then snap it to the closest
    /// multiple of the block size, ties to an even number of blocks.
    Nearest,
}

impl Default for Rounding {
    fn default() -> Self {
        Rounding::Up
    }
}

impl std::fmt::Display for Rounding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rounding::Up => write!(f, "up"),
            Rounding::Nearest => write!(f, "nearest"),
        }
    }
}

impl std::str::FromStr for Rounding {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "up" => Ok(Rounding::Up),
            "nearest" => Ok(Rounding::Nearest),
            _ => Err(Error::Configuration(format!(
                "unknown rounding \"{}\", expected \"up\" or \"nearest\"",
                s
            ))),
        }
    }
}

/// Compute the target size of an image resized by `requested_scale`,
/// with each dimension rounded up to a multiple of `block_size`.
///
/// Returns the target size and the scale factors it actually implies,
/// which are the ones to use downstream instead of `requested_scale`.
pub fn quantize(
    original: ImageSize,
    requested_scale: f64,
    block_size: u32,
) -> Result<(ImageSize, ScaleFactors)> {
    quantize_with(original, requested_scale, block_size, Rounding::Up)
}

/// Same as [`quantize`] with an explicit rounding policy.
pub fn quantize_with(
    original: ImageSize,
    requested_scale: f64,
    block_size: u32,
    rounding: Rounding,
) -> Result<(ImageSize, ScaleFactors)> {
    if !(requested_scale.is_finite() && requested_scale > 0.0) {
        return Err(Error::Configuration(format!(
            "scale must be positive, got {}",
            requested_scale
        )));
    }
    if block_size == 0 {
        return Err(Error::Configuration(
            "block size must be positive, got 0".to_string(),
        ));
    }
    original.validate()?;

    let target = ImageSize {
        width: quantize_dimension(original.width, requested_scale, block_size, rounding)?,
        height: quantize_dimension(original.height, requested_scale, block_size, rounding)?,
    };
    let factors = ScaleFactors::between(original, target);
    log::debug!(
        "Quantized {}x{} at scale {} (block {}) to {}x{}, actual scales ({:.6}, {:.6})",
        original.width,
        original.height,
        requested_scale,
        block_size,
        target.width,
        target.height,
        factors.scale_x,
        factors.scale_y
    );
    Ok((target, factors))
}

fn quantize_dimension(
    dimension: u32,
    scale: f64,
    block_size: u32,
    rounding: Rounding,
) -> Result<u32> {
    let scaled = dimension as f64 * scale;
    let tentative = match rounding {
        Rounding::Up => scaled.round(),
        Rounding::Nearest => scaled.trunc(),
    };
    if tentative > u32::MAX as f64 {
        return Err(Error::Configuration(format!(
            "scaled dimension {} does not fit in an image size",
            tentative
        )));
    }
    let tentative = tentative as u64;
    let block = block_size as u64;
    let nb_blocks = match rounding {
        Rounding::Up => (tentative + block - 1) / block,
        Rounding::Nearest => nearest_blocks(tentative, block),
    };
    let target = nb_blocks.max(1) * block;
    u32::try_from(target).map_err(|_| {
        Error::Configuration(format!(
            "quantized dimension {} does not fit in an image size",
            target
        ))
    })
}

/// Closest integer to `length / block`, ties to even.
fn nearest_blocks(length: u64, block: u64) -> u64 {
    let (quotient, remainder) = (length / block, length % block);
    match (2 * remainder).cmp(&block) {
        std::cmp::Ordering::Less => quotient,
        std::cmp::Ordering::Greater => quotient + 1,
        std::cmp::Ordering::Equal => quotient + quotient % 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn scenario_1440x1080() {
        let (target, factors) = quantize(ImageSize::new(1440, 1080), 0.6, 224).unwrap();
        assert_eq!(target, ImageSize::new(896, 672));
        assert_relative_eq!(factors.scale_x, 0.622222, epsilon = 1e-6);
        assert_relative_eq!(factors.scale_y, 0.622222, epsilon = 1e-6);
    }

    #[test]
    fn exact_multiple_is_kept() {
        let (target, factors) = quantize(ImageSize::new(896, 448), 1.0, 224).unwrap();
        assert_eq!(target, ImageSize::new(896, 448));
        assert_eq!(factors, ScaleFactors::uniform(1.0));
    }

    #[test]
    fn one_pixel_over_a_multiple_rounds_up() {
        let (target, _) = quantize(ImageSize::new(449, 447), 1.0, 224).unwrap();
        assert_eq!(target, ImageSize::new(672, 448));
    }

    #[test]
    fn tiny_scale_gives_one_block() {
        let (target, factors) = quantize(ImageSize::new(100, 50), 0.001, 224).unwrap();
        assert_eq!(target, ImageSize::new(224, 224));
        assert_relative_eq!(factors.scale_x, 2.24);
        assert_relative_eq!(factors.scale_y, 4.48);
    }

    #[test]
    fn axes_are_quantized_independently() {
        let (target, factors) = quantize(ImageSize::new(1920, 1080), 0.5, 224).unwrap();
        assert_eq!(target, ImageSize::new(1120, 672));
        assert!(factors.scale_x != factors.scale_y);
    }

    #[test]
    fn nearest_rounding_snaps_to_closest_block() {
        let original = ImageSize::new(1920, 1080);
        let (target, _) = quantize_with(original, 0.5, 224, Rounding::Nearest).unwrap();
        // 960 -> 4.29 blocks, 540 -> 2.41 blocks
        assert_eq!(target, ImageSize::new(896, 448));
        let (target, _) = quantize_with(original, 0.01, 224, Rounding::Nearest).unwrap();
        assert_eq!(target, ImageSize::new(224, 224));
    }

    #[test]
    fn nearest_rounding_ties_to_even() {
        // 560 is exactly 2.5 blocks: ties go to 2 blocks, not 3.
        let (target, _) =
            quantize_with(ImageSize::new(1120, 1080), 0.5, 224, Rounding::Nearest).unwrap();
        assert_eq!(target, ImageSize::new(448, 448));
        // 3.5 blocks go up to 4.
        let (target, _) =
            quantize_with(ImageSize::new(1568, 1080), 0.5, 224, Rounding::Nearest).unwrap();
        assert_eq!(target.width, 896);
    }

    #[test]
    fn nearest_rounding_truncates_scaled_size() {
        // 1119 * 0.5 = 559.5 truncates to 559, just below 2.5 blocks.
        let (target, _) =
            quantize_with(ImageSize::new(1119, 1080), 0.5, 224, Rounding::Nearest).unwrap();
        assert_eq!(target.width, 448);
        // 1440 * 0.6 = 864 -> 3.86 blocks.
        let (target, _) =
            quantize_with(ImageSize::new(1440, 1080), 0.6, 224, Rounding::Nearest).unwrap();
        assert_eq!(target, ImageSize::new(896, 672));
    }

    #[test]
    fn blocks_rounded_half_to_even() {
        assert_eq!(nearest_blocks(111, 224), 0);
        assert_eq!(nearest_blocks(112, 224), 0);
        assert_eq!(nearest_blocks(113, 224), 1);
        assert_eq!(nearest_blocks(336, 224), 2);
        assert_eq!(nearest_blocks(784, 224), 4);
        assert_eq!(nearest_blocks(7, 3), 2);
    }

    #[test]
    fn invalid_configuration() {
        let size = ImageSize::new(1440, 1080);
        assert!(matches!(
            quantize(size, -0.5, 224),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(quantize(size, 0.0, 224), Err(Error::Configuration(_))));
        assert!(matches!(
            quantize(size, f64::NAN, 224),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(quantize(size, 0.5, 0), Err(Error::Configuration(_))));
    }

    #[test]
    fn invalid_dimensions() {
        assert_eq!(
            quantize(ImageSize::new(0, 1080), 0.5, 224),
            Err(Error::Dimension {
                width: 0,
                height: 1080
            })
        );
    }

    #[test]
    fn overflowing_target_is_rejected() {
        let size = ImageSize::new(u32::MAX, 10);
        assert!(matches!(quantize(size, 2.0, 224), Err(Error::Configuration(_))));
    }

    #[test]
    fn rounding_from_str() {
        assert_eq!("up".parse::<Rounding>().unwrap(), Rounding::Up);
        assert_eq!("nearest".parse::<Rounding>().unwrap(), Rounding::Nearest);
        assert!("down".parse::<Rounding>().is_err());
        for &rounding in [Rounding::Up, Rounding::Nearest].iter() {
            assert_eq!(rounding.to_string().parse::<Rounding>().unwrap(), rounding);
        }
    }
}
