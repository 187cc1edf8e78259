//! nocturne-pipeline: Pure raster processing for nocturne (sans-IO).
//!
//! Everything a worker pool needs that does not touch a process or a
//! file descriptor:
//!
//! - [`Raster`]: the row-major RGB pixel buffer
//! - [`partition()`]: split a width into per-worker column ranges
//! - [`apply_chain`]: saturate -> greyscale -> binarize
//! - [`assemble()`]: stitch processed fragments back together
//! - [`classify`]: the "mostly black" decision
//!
//! Moving fragments between processes lives in `nocturne-protocol`;
//! spawning and driving workers lives in `nocturne-broker`.

pub mod assemble;
pub mod binarize;
pub mod chain;
pub mod classify;
pub mod grayscale;
pub mod partition;
pub mod raster;
pub mod saturate;
pub mod types;

pub use assemble::{assemble, assemble_available};
pub use chain::{ChainOutput, Stage, apply_chain};
pub use classify::is_nearly_black;
pub use partition::{Partition, partition};
pub use raster::Raster;
pub use types::{AssemblyError, Dimensions, FilterParams, PipelineError, Rgb};

/// Run the whole chain in-process over `raster`, split into `workers`
/// column fragments exactly as a worker pool would split it.
///
/// This is the single-process reference the worker pool must reproduce;
/// tests compare pool output against it.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] if `workers` is zero or wider
/// than the raster, or if `params` is out of range.
pub fn process_local(
    raster: &Raster,
    params: FilterParams,
    workers: usize,
) -> Result<ChainOutput, PipelineError> {
    params.validate()?;
    let partitions = partition(raster.width(), workers)?;

    let mut stages: [Vec<Raster>; 3] = Default::default();
    for p in &partitions {
        let fragment = raster.crop_columns(p.columns())?;
        for (slot, out) in stages.iter_mut().zip(apply_chain(&fragment, params).into_stages()) {
            slot.push(out);
        }
    }

    let [saturated, greyscale, binarized] = stages;
    let stitch = |fragments: Vec<Raster>| {
        assemble(raster.dimensions(), &partitions, &fragments)
            .map_err(|e| PipelineError::InvalidConfig(format!("reassembly failed: {e}")))
    };
    Ok(ChainOutput {
        saturated: stitch(saturated)?,
        greyscale: stitch(greyscale)?,
        binarized: stitch(binarized)?,
    })
}
