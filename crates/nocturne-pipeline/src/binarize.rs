//! Threshold binarization, the last stage of the filter chain.

use crate::raster::Raster;
use crate::types::Rgb;

/// Turn a greyscale raster into pure black and white.
///
/// Each pixel's red channel (equal to its gray value after
/// [`greyscale`](crate::grayscale::greyscale)) is compared against
/// `threshold * 255`: strictly greater becomes white, anything else black.
#[must_use = "returns the binarized raster"]
pub fn binarize(greyscale: &Raster, threshold: f32) -> Raster {
    let cutoff = threshold * 255.0;
    greyscale.map(|p| {
        if f32::from(p.r) > cutoff {
            Rgb::WHITE
        } else {
            Rgb::BLACK
        }
    })
}
