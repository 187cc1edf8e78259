//! Weighted luma conversion, the second stage of the filter chain.

use crate::raster::Raster;
use crate::types::Rgb;

/// Red weight of the luma formula, in hundredths.
pub const RED_WEIGHT: u32 = 30;
/// Green weight of the luma formula, in hundredths.
pub const GREEN_WEIGHT: u32 = 59;
/// Blue weight of the luma formula, in hundredths.
pub const BLUE_WEIGHT: u32 = 11;

const WEIGHT_SCALE: u32 = RED_WEIGHT + GREEN_WEIGHT + BLUE_WEIGHT;

/// Convert every pixel to gray.
///
/// `gray = clamp(round(0.3*r + 0.59*g + 0.11*b), 0, 255)`, written to
/// all three channels. These weights differ slightly from the
/// `0.299/0.587/0.114` used by the `image` crate and are fixed.
#[must_use = "returns the greyscale raster"]
pub fn greyscale(fragment: &Raster) -> Raster {
    fragment.map(|p| Rgb::gray(luma(p)))
}

/// Weighted luma of a single pixel.
///
/// Evaluated exactly in integers, so a sum landing on `.5` always rounds
/// up.
#[must_use]
pub fn luma(pixel: Rgb) -> u8 {
    let weighted = RED_WEIGHT * u32::from(pixel.r)
        + GREEN_WEIGHT * u32::from(pixel.g)
        + BLUE_WEIGHT * u32::from(pixel.b);
    // The weights sum to the scale, so the quotient is at most 255.
    u8::try_from((weighted + WEIGHT_SCALE / 2) / WEIGHT_SCALE).unwrap_or(u8::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn known_luma_values() {
        assert_eq!(luma(Rgb::gray(100)), 100);
        assert_eq!(luma(Rgb::new(10, 20, 30)), 18);
        assert_eq!(luma(Rgb::new(0, 100, 0)), 59);
        assert_eq!(luma(Rgb::new(50, 0, 200)), 37);
        assert_eq!(luma(Rgb::WHITE), 255);
        assert_eq!(luma(Rgb::BLACK), 0);
    }

    #[test]
    fn green_weighs_most() {
        let r = luma(Rgb::new(255, 0, 0));
        let g = luma(Rgb::new(0, 255, 0));
        let b = luma(Rgb::new(0, 0, 255));
        assert!(g > r && r > b, "expected G > R > B, got R={r} G={g} B={b}");
    }

    #[test]
    fn half_way_rounds_up() {
        // 76.5 + 118 + 11
        assert_eq!(luma(Rgb::new(255, 200, 100)), 206);
        // 2.95 + 0.55
        assert_eq!(luma(Rgb::new(0, 5, 5)), 4);
        // 1.5
        assert_eq!(luma(Rgb::new(5, 0, 0)), 2);
    }

    /// The formula on exact hundredths, rounded half up.
    fn reference_luma(r: u8, g: u8, b: u8) -> u8 {
        let hundredths = 30 * i64::from(r) + 59 * i64::from(g) + 11 * i64::from(b);
        let whole = hundredths / 100;
        let rounded = if hundredths % 100 >= 50 { whole + 1 } else { whole };
        u8::try_from(rounded).unwrap()
    }

    #[test]
    fn matches_exact_formula_on_every_gray_and_primary_ramp() {
        for v in 0..=255u8 {
            for (r, g, b) in [(v, 0, 0), (0, v, 0), (0, 0, v), (v, v, v), (0, v, v), (v, v, 0)] {
                assert_eq!(luma(Rgb::new(r, g, b)), reference_luma(r, g, b), "({r}, {g}, {b})");
            }
        }
    }

    #[test]
    fn preserves_dimensions() {
        let raster = Raster::filled(7, 3, Rgb::new(1, 2, 3)).unwrap();
        assert_eq!(greyscale(&raster).dimensions(), raster.dimensions());
    }

    proptest! {
        #[test]
        fn output_is_pure_gray(r in any::<u8>(), g in any::<u8>(), b in any::<u8>()) {
            let raster = Raster::filled(1, 1, Rgb::new(r, g, b)).unwrap();
            let out = greyscale(&raster).pixels()[0];
            prop_assert!(out.is_gray());
        }

        #[test]
        fn matches_exact_formula(r in any::<u8>(), g in any::<u8>(), b in any::<u8>()) {
            prop_assert_eq!(luma(Rgb::new(r, g, b)), reference_luma(r, g, b));
        }
    }
}
