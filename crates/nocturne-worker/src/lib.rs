//! Worker side of the nocturne pool.
//!
//! A worker handles exactly one request: it reads a fragment and the
//! filter parameters from its input, runs the chain, and writes the three
//! stage outputs back. The `nocturne-worker` binary wires [`serve`] to
//! stdin and stdout; the function itself takes any reader and writer so
//! it can be exercised in-process.

use std::io::{Read, Write};

use nocturne_pipeline::{Dimensions, PipelineError, apply_chain};
use nocturne_protocol::{ProtocolError, read_request, write_reply};

/// Why a worker gave up on its request.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    /// The request could not be read or the reply could not be written.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The request carried parameters outside their valid range.
    #[error("rejected filter parameters: {0}")]
    Params(#[from] PipelineError),
}

/// Serve a single request from `input`, writing the reply to `output`.
///
/// Returns the size of the fragment that was processed.
///
/// # Errors
///
/// Returns [`WorkerError::Protocol`] if the request is malformed or the
/// channel fails, and [`WorkerError::Params`] if the parameters do not
/// validate. Nothing is written to `output` in either of the first two
/// cases.
pub fn serve<R: Read, W: Write>(input: &mut R, output: &mut W) -> Result<Dimensions, WorkerError> {
    let request = read_request(input)?;
    request.params.validate()?;

    let dimensions = request.fragment.dimensions();
    log::debug!("processing {dimensions} fragment");
    let stages = apply_chain(&request.fragment, request.params);

    write_reply(output, &stages)?;
    Ok(dimensions)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use nocturne_pipeline::{FilterParams, Raster, Rgb};
    use nocturne_protocol::{read_reply, write_request};
    use proptest::prelude::*;

    use super::*;

    fn checker(width: u32, height: u32) -> Raster {
        Raster::from_fn(width, height, |x, y| {
            if (x + y) % 2 == 0 {
                Rgb::new(200, 150, 30)
            } else {
                Rgb::new(20, 40, 60)
            }
        })
        .unwrap()
    }

    #[test]
    fn reply_matches_in_process_chain() {
        let raster = checker(5, 4);
        let params = FilterParams::default();
        let mut request = Vec::new();
        write_request(&mut request, &raster, params).unwrap();

        let mut reply = Vec::new();
        let dims = serve(&mut request.as_slice(), &mut reply).unwrap();
        assert_eq!(dims, raster.dimensions());
        assert_eq!(
            read_reply(&mut reply.as_slice()).unwrap(),
            apply_chain(&raster, params)
        );
    }

    #[test]
    fn empty_input_is_truncated() {
        let mut reply = Vec::new();
        let err = serve(&mut [].as_slice(), &mut reply).unwrap_err();
        assert!(matches!(
            err,
            WorkerError::Protocol(ProtocolError::Truncated { .. })
        ));
        assert!(reply.is_empty());
    }

    #[test]
    fn out_of_range_params_are_rejected() {
        let params = FilterParams {
            saturation_factor: 1.0,
            binarize_threshold: 2.0,
        };
        let mut request = Vec::new();
        write_request(&mut request, &checker(2, 2), params).unwrap();

        let mut reply = Vec::new();
        assert!(matches!(
            serve(&mut request.as_slice(), &mut reply),
            Err(WorkerError::Params(_))
        ));
        assert!(reply.is_empty());
    }

    fn fragment() -> impl Strategy<Value = Raster> {
        (1u32..=6, 1u32..=6).prop_flat_map(|(width, height)| {
            prop::collection::vec(any::<[u8; 3]>(), (width * height) as usize).prop_map(
                move |pixels| {
                    let pixels = pixels.into_iter().map(|[r, g, b]| Rgb::new(r, g, b)).collect();
                    Raster::new(width, height, pixels).unwrap()
                },
            )
        })
    }

    proptest! {
        #[test]
        fn serve_agrees_with_apply_chain(
            raster in fragment(),
            saturation_factor in 0.01f32..4.0,
            binarize_threshold in 0.0f32..=1.0,
        ) {
            let params = FilterParams { saturation_factor, binarize_threshold };
            let mut request = Vec::new();
            write_request(&mut request, &raster, params).unwrap();

            let mut reply = Vec::new();
            prop_assert_eq!(serve(&mut request.as_slice(), &mut reply).unwrap(), raster.dimensions());
            prop_assert_eq!(read_reply(&mut reply.as_slice()).unwrap(), apply_chain(&raster, params));
        }
    }
}
