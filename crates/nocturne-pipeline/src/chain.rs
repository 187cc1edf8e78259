//! The fixed filter chain run by every worker.
//!
//! ```text
//! fragment -> saturate -> greyscale -> binarize
//! ```
//!
//! Each stage borrows the previous stage's raster and allocates a new
//! one, so every intermediate stays independently owned. The order is
//! fixed and no stage can be skipped.

use serde::{Deserialize, Serialize};

use crate::raster::Raster;
use crate::types::FilterParams;

/// One stage of the filter chain, in chain order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Intensity scaling.
    Saturate,
    /// Weighted luma conversion.
    Greyscale,
    /// Threshold binarization.
    Binarize,
}

impl Stage {
    /// Every stage, in the order the chain applies them.
    pub const ALL: [Self; 3] = [Self::Saturate, Self::Greyscale, Self::Binarize];

    /// Short name used for output file prefixes and logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Saturate => "saturated",
            Self::Greyscale => "greyscale",
            Self::Binarize => "binarized",
        }
    }

    /// Zero-based position in the chain.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Saturate => 0,
            Self::Greyscale => 1,
            Self::Binarize => 2,
        }
    }
}

/// The output of every stage of one chain run.
///
/// `binarized` is the chain's final result; the intermediates are kept
/// so callers can inspect or save each step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainOutput {
    /// After [`saturate`](crate::saturate::saturate).
    pub saturated: Raster,
    /// After [`greyscale`](crate::grayscale::greyscale).
    pub greyscale: Raster,
    /// After [`binarize`](crate::binarize::binarize).
    pub binarized: Raster,
}

impl ChainOutput {
    /// The raster produced by `stage`.
    #[must_use]
    pub const fn stage(&self, stage: Stage) -> &Raster {
        match stage {
            Stage::Saturate => &self.saturated,
            Stage::Greyscale => &self.greyscale,
            Stage::Binarize => &self.binarized,
        }
    }

    /// Iterate over `(stage, raster)` pairs in chain order.
    pub fn iter(&self) -> impl Iterator<Item = (Stage, &Raster)> {
        Stage::ALL.into_iter().map(|stage| (stage, self.stage(stage)))
    }

    /// Consume the output, returning the rasters in chain order.
    #[must_use]
    pub fn into_stages(self) -> [Raster; 3] {
        [self.saturated, self.greyscale, self.binarized]
    }

    /// Rebuild from rasters in chain order.
    #[must_use]
    pub fn from_stages([saturated, greyscale, binarized]: [Raster; 3]) -> Self {
        Self {
            saturated,
            greyscale,
            binarized,
        }
    }
}

/// Run saturate, greyscale and binarize over `fragment`.
#[must_use = "returns the output of every stage"]
pub fn apply_chain(fragment: &Raster, params: FilterParams) -> ChainOutput {
    let saturated = crate::saturate::saturate(fragment, params.saturation_factor);
    let greyscale = crate::grayscale::greyscale(&saturated);
    let binarized = crate::binarize::binarize(&greyscale, params.binarize_threshold);
    log::trace!(
        "filter chain over {} fragment (factor {}, threshold {})",
        fragment.dimensions(),
        params.saturation_factor,
        params.binarize_threshold,
    );
    ChainOutput {
        saturated,
        greyscale,
        binarized,
    }
}
