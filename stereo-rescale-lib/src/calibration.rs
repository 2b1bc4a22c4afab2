// SPDX-License-Identifier: MPL-2.0

//! Text format of the calibration files.
//!
//! Lines with several numbers hold the row-major coefficients of the
//! intrinsic matrix, either on one line or spread on three lines.
//! A line with a single number is the baseline. For example:
//!
//! ```text
//! 858.06269646 0 720 0 858.06263208 540 0 0 1
//! 0.06
//! ```

use crate::camera::{CameraIntrinsics, StereoRig};
use crate::error::{Error, Result};
use crate::quantize::ScaleFactors;
use nalgebra::Matrix3;
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Content of a calibration file.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Calibration {
    pub intrinsics: CameraIntrinsics,
    pub baseline: Option<f64>,
}

impl Calibration {
    /// Stereo rig described by this calibration. Requires a baseline.
    pub fn rig(&self) -> Result<StereoRig> {
        match self.baseline {
            Some(baseline) => StereoRig::new(self.intrinsics, baseline),
            None => Err(Error::Configuration(
                "the calibration has no baseline".to_string(),
            )),
        }
    }

    /// Calibration of images resized by `factors`, baseline left as is.
    pub fn rescaled(&self, factors: ScaleFactors) -> Result<Self> {
        Ok(Self {
            intrinsics: self.intrinsics.rescaled(factors)?,
            baseline: self.baseline,
        })
    }
}

impl FromStr for Calibration {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        let mut coefficients: Vec<f64> = Vec::with_capacity(9);
        let mut baseline = None;
        for line in s.lines() {
            let values: Vec<&str> = line.split_whitespace().collect();
            match values.as_slice() {
                [] => {}
                [single] => {
                    if baseline.is_some() {
                        return Err(Error::Parse(
                            "more than one baseline line".to_string(),
                        ));
                    }
                    baseline = Some(parse_number(single)?);
                }
                _ => {
                    for v in values.iter() {
                        coefficients.push(parse_number(v)?);
                    }
                }
            }
        }
        if coefficients.len() != 9 {
            return Err(Error::Parse(format!(
                "expected 9 intrinsic matrix coefficients but got {}",
                coefficients.len()
            )));
        }
        let k = Matrix3::from_row_slice(&coefficients);
        Ok(Calibration {
            intrinsics: CameraIntrinsics::from_matrix(&k)?,
            baseline,
        })
    }
}

fn parse_number(s: &str) -> Result<f64> {
    s.parse()
        .map_err(|_| Error::Parse(format!("not a number: \"{}\"", s)))
}

impl fmt::Display for Calibration {
    /// Matrix on one line with 10 decimals, then the baseline if any.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let k = self.intrinsics.matrix();
        let mut coefficients = Vec::with_capacity(9);
        for row in k.row_iter() {
            for v in row.iter() {
                coefficients.push(format!("{:.10}", v));
            }
        }
        writeln!(f, "{}", coefficients.join(" "))?;
        if let Some(baseline) = self.baseline {
            writeln!(f, "{}", baseline)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const ONE_LINE: &str = "858.06269646 0 720 0 858.06263208 540 0 0 1\n0.06\n";

    #[test]
    fn parse_one_line() {
        let calib: Calibration = ONE_LINE.parse().unwrap();
        assert_eq!(calib.intrinsics.fx, 858.06269646);
        assert_eq!(calib.intrinsics.fy, 858.06263208);
        assert_eq!(calib.intrinsics.cx, 720.0);
        assert_eq!(calib.intrinsics.cy, 540.0);
        assert_eq!(calib.baseline, Some(0.06));
    }

    #[test]
    fn parse_three_lines_without_baseline() {
        let text = "500 0 320\n0 510 240\n\n0 0 1\n";
        let calib: Calibration = text.parse().unwrap();
        assert_eq!(calib.intrinsics.fy, 510.0);
        assert_eq!(calib.baseline, None);
        assert!(matches!(calib.rig(), Err(Error::Configuration(_))));
    }

    #[test]
    fn parse_errors() {
        let wrong_count = "500 0 320 0 510 240 0 0\n";
        assert!(matches!(wrong_count.parse::<Calibration>(), Err(Error::Parse(_))));
        let not_a_number = "500 0 320 0 abc 240 0 0 1\n";
        assert!(matches!(not_a_number.parse::<Calibration>(), Err(Error::Parse(_))));
        let skew = "500 2 320 0 510 240 0 0 1\n";
        assert!(matches!(skew.parse::<Calibration>(), Err(Error::Parse(_))));
        let two_baselines = "500 0 320 0 510 240 0 0 1\n0.1\n0.2\n";
        assert!(matches!(two_baselines.parse::<Calibration>(), Err(Error::Parse(_))));
    }

    #[test]
    fn display_then_parse() {
        let calib: Calibration = ONE_LINE.parse().unwrap();
        let rescaled = calib.rescaled(ScaleFactors::uniform(896.0 / 1440.0)).unwrap();
        let text = rescaled.to_string();
        let first_line = text.lines().next().unwrap();
        assert_eq!(first_line.split(' ').count(), 9);
        assert!(text.ends_with("\n0.06\n"));
        let parsed: Calibration = text.parse().unwrap();
        assert_relative_eq!(parsed.intrinsics.fx, rescaled.intrinsics.fx, max_relative = 1e-10);
        assert_relative_eq!(parsed.intrinsics.cy, rescaled.intrinsics.cy, max_relative = 1e-10);
        assert_eq!(parsed.baseline, calib.baseline);
    }
}
