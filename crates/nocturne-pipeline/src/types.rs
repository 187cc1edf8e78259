//! Shared types for the nocturne pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One 24-bit RGB pixel. No alpha, no palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgb {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Rgb {
    /// Pure black.
    pub const BLACK: Self = Self::new(0, 0, 0);

    /// Pure white.
    pub const WHITE: Self = Self::new(255, 255, 255);

    /// Create a pixel from its three channels.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// A gray pixel with all three channels set to `value`.
    #[must_use]
    pub const fn gray(value: u8) -> Self {
        Self::new(value, value, value)
    }

    /// Returns `true` if all three channels are equal.
    #[must_use]
    pub const fn is_gray(self) -> bool {
        self.r == self.g && self.g == self.b
    }

    /// The channels as an `[r, g, b]` array, in wire order.
    #[must_use]
    pub const fn to_bytes(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Create a new dimensions value.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Total pixel count, or `None` if it does not fit in `usize`.
    #[must_use]
    pub fn pixel_count(self) -> Option<usize> {
        (self.width as usize).checked_mul(self.height as usize)
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Scalar parameters for the filter chain, sent once to every worker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterParams {
    /// Multiplier applied to every channel by the saturate stage.
    ///
    /// Must be finite and greater than zero.
    pub saturation_factor: f32,

    /// Fraction of full intensity above which a greyscale pixel turns
    /// white in the binarize stage.
    ///
    /// Must be within `0.0..=1.0`.
    pub binarize_threshold: f32,
}

impl FilterParams {
    /// Default saturation factor.
    pub const DEFAULT_SATURATION_FACTOR: f32 = 1.3;

    /// Default binarize threshold.
    pub const DEFAULT_BINARIZE_THRESHOLD: f32 = 0.5;

    /// Check the ranges the caller-facing configuration promises.
    ///
    /// The filter stages themselves accept any value; range checks
    /// happen once here, before any work is distributed.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if the saturation factor
    /// is not a positive finite number or the threshold is outside
    /// `0.0..=1.0`.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !self.saturation_factor.is_finite() || self.saturation_factor <= 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "saturation factor must be greater than 0, got {}",
                self.saturation_factor
            )));
        }
        if !(0.0..=1.0).contains(&self.binarize_threshold) {
            return Err(PipelineError::InvalidConfig(format!(
                "binarize threshold must be within 0..=1, got {}",
                self.binarize_threshold
            )));
        }
        Ok(())
    }
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            saturation_factor: Self::DEFAULT_SATURATION_FACTOR,
            binarize_threshold: Self::DEFAULT_BINARIZE_THRESHOLD,
        }
    }
}

/// Errors from raster construction, partitioning and configuration.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Width or height was zero.
    #[error("raster dimensions must be positive, got {0}")]
    InvalidDimensions(Dimensions),

    /// The pixel buffer does not hold `width * height` pixels.
    #[error("a {dimensions} raster needs {expected} pixels, got {actual}")]
    PixelCountMismatch {
        /// Declared raster size.
        dimensions: Dimensions,
        /// `width * height`.
        expected: usize,
        /// Length of the supplied buffer.
        actual: usize,
    },

    /// A column range does not lie within the raster.
    #[error("columns {start}..{end} are outside a raster {width} pixels wide")]
    ColumnRange {
        /// First column (inclusive).
        start: u32,
        /// Last column (exclusive).
        end: u32,
        /// Raster width.
        width: u32,
    },

    /// Configuration is invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Errors from stitching fragments back together.
///
/// Any of these means the fragments no longer line up with the
/// partitions they were cut from, so callers treat them as fatal.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AssemblyError {
    /// The number of fragments differs from the number of partitions.
    #[error("expected {expected} fragments, got {actual}")]
    FragmentCount {
        /// Number of partitions.
        expected: usize,
        /// Number of fragments supplied.
        actual: usize,
    },

    /// A fragment's size differs from its partition's size.
    #[error("fragment {index} is {actual}, its partition needs {expected}")]
    FragmentShape {
        /// Partition index.
        index: usize,
        /// Size the partition requires.
        expected: Dimensions,
        /// Size of the supplied fragment.
        actual: Dimensions,
    },

    /// The partitions do not tile `[0, width)` in order.
    #[error("partitions do not tile a {0} raster")]
    Coverage(Dimensions),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn rgb_gray_detection() {
        assert!(Rgb::gray(17).is_gray());
        assert!(Rgb::BLACK.is_gray());
        assert!(!Rgb::new(1, 1, 2).is_gray());
    }

    #[test]
    fn dimensions_display() {
        assert_eq!(Dimensions::new(4, 2).to_string(), "4x2");
    }

    #[test]
    fn default_params_are_valid() {
        assert!(FilterParams::default().validate().is_ok());
    }

    #[test]
    fn zero_saturation_is_rejected() {
        let params = FilterParams {
            saturation_factor: 0.0,
            ..FilterParams::default()
        };
        assert!(matches!(
            params.validate(),
            Err(PipelineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn nan_saturation_is_rejected() {
        let params = FilterParams {
            saturation_factor: f32::NAN,
            ..FilterParams::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn threshold_bounds_are_inclusive() {
        for threshold in [0.0, 1.0] {
            let params = FilterParams {
                binarize_threshold: threshold,
                ..FilterParams::default()
            };
            assert!(params.validate().is_ok(), "threshold {threshold}");
        }
        for threshold in [-0.01, 1.01, f32::NAN] {
            let params = FilterParams {
                binarize_threshold: threshold,
                ..FilterParams::default()
            };
            assert!(params.validate().is_err(), "threshold {threshold}");
        }
    }

    #[test]
    fn params_deserialize_with_defaults() {
        let params: FilterParams =
            serde_json::from_str(r#"{"saturation_factor": 2.0}"#).unwrap();
        assert!((params.saturation_factor - 2.0).abs() < f32::EPSILON);
        assert!(
            (params.binarize_threshold - FilterParams::DEFAULT_BINARIZE_THRESHOLD).abs()
                < f32::EPSILON
        );
    }
}
