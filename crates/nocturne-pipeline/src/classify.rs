//! "Mostly black" classification.
//!
//! A pixel is near-black when every channel is at most
//! [`NEAR_BLACK_MAX`]. An image is nearly black when the fraction of
//! near-black pixels meets or exceeds the caller's threshold.

use crate::raster::Raster;
use crate::types::Rgb;

/// Highest channel value still counted as near-black.
pub const NEAR_BLACK_MAX: u8 = 10;

/// Returns `true` if every channel of `pixel` is at most [`NEAR_BLACK_MAX`].
#[must_use]
pub const fn is_near_black(pixel: Rgb) -> bool {
    pixel.r <= NEAR_BLACK_MAX && pixel.g <= NEAR_BLACK_MAX && pixel.b <= NEAR_BLACK_MAX
}

/// Number of near-black pixels in `raster`.
#[must_use]
pub fn count_near_black(raster: &Raster) -> usize {
    raster
        .pixels()
        .iter()
        .filter(|&&p| is_near_black(p))
        .count()
}

/// Fraction of pixels in `raster` that are near-black, in `0.0..=1.0`.
///
/// Computed in `f32`, the precision thresholds are given in, so a
/// fraction that equals the threshold's decimal value compares equal.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn near_black_fraction(raster: &Raster) -> f32 {
    count_near_black(raster) as f32 / raster.pixels().len() as f32
}

/// Returns `true` if at least `threshold` of the pixels are near-black.
#[must_use]
pub fn is_nearly_black(raster: &Raster, threshold: f32) -> bool {
    near_black_fraction(raster) >= threshold
}
