//! Intensity scaling, the first stage of the filter chain.
//!
//! Every channel is multiplied by the saturation factor, rounded to the
//! nearest integer and clamped into `0..=255`.

use crate::raster::Raster;
use crate::types::Rgb;

/// Scale every channel of every pixel by `factor`.
///
/// `out = clamp(round(in * factor), 0, 255)`. The factor is not
/// range-checked here; see [`FilterParams::validate`](crate::FilterParams::validate).
#[must_use = "returns the saturated raster"]
pub fn saturate(fragment: &Raster, factor: f32) -> Raster {
    fragment.map(|p| {
        Rgb::new(
            round_to_channel(f32::from(p.r) * factor),
            round_to_channel(f32::from(p.g) * factor),
            round_to_channel(f32::from(p.b) * factor),
        )
    })
}

/// Round to the nearest integer and clamp into a channel value.
///
/// NaN maps to 0.
#[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn round_to_channel(value: f32) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn single(pixel: Rgb) -> Raster {
        Raster::filled(1, 1, pixel).unwrap()
    }

    #[test]
    fn doubling_clamps_bright_channels() {
        let out = saturate(&single(Rgb::new(200, 100, 50)), 2.0);
        assert_eq!(out.pixels()[0], Rgb::new(255, 200, 100));
    }

    #[test]
    fn factor_one_is_identity() {
        let raster = Raster::from_fn(5, 3, |x, y| {
            Rgb::new(u8::try_from(x * 40).unwrap(), u8::try_from(y * 90).unwrap(), 7)
        })
        .unwrap();
        assert_eq!(saturate(&raster, 1.0), raster);
    }

    #[test]
    fn rounds_to_nearest() {
        // 3 * 1.5 = 4.5 rounds away from zero; 3 * 1.4 = 4.2 rounds down.
        assert_eq!(saturate(&single(Rgb::gray(3)), 1.5).pixels()[0], Rgb::gray(5));
        assert_eq!(saturate(&single(Rgb::gray(3)), 1.4).pixels()[0], Rgb::gray(4));
    }

    #[test]
    fn dimming_factor() {
        let out = saturate(&single(Rgb::new(100, 10, 0)), 0.5);
        assert_eq!(out.pixels()[0], Rgb::new(50, 5, 0));
    }

    #[test]
    fn input_is_not_mutated() {
        let raster = single(Rgb::new(10, 20, 30));
        let _ = saturate(&raster, 3.0);
        assert_eq!(raster.pixels()[0], Rgb::new(10, 20, 30));
    }

    #[test]
    fn round_to_channel_edges() {
        assert_eq!(round_to_channel(-4.0), 0);
        assert_eq!(round_to_channel(255.4), 255);
        assert_eq!(round_to_channel(1e9), 255);
        assert_eq!(round_to_channel(f32::NAN), 0);
        assert_eq!(round_to_channel(f32::INFINITY), 255);
    }

    proptest! {
        #[test]
        fn output_never_leaves_channel_range(
            r in any::<u8>(), g in any::<u8>(), b in any::<u8>(),
            factor in -10.0f32..10.0,
        ) {
            let out = saturate(&single(Rgb::new(r, g, b)), factor).pixels()[0];
            let expected = |c: u8| (f32::from(c) * factor).round().clamp(0.0, 255.0);
            prop_assert!((f32::from(out.r) - expected(r)).abs() < f32::EPSILON);
            prop_assert!((f32::from(out.g) - expected(g)).abs() < f32::EPSILON);
            prop_assert!((f32::from(out.b) - expected(b)).abs() < f32::EPSILON);
        }
    }
}
