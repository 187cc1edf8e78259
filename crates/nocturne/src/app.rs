//! One launcher invocation, from input BMP to report.

use std::fs;
use std::path::Path;

use nocturne_broker::{Broker, BrokerOutput, WorkerLauncher};
use nocturne_pipeline::{Stage, is_nearly_black};

use crate::bmp;
use crate::error::AppError;
use crate::report::{self, ReportRow};
use crate::settings::Settings;

/// Prefix on output images assembled with some partitions missing.
pub const PARTIAL_PREFIX: &str = "partial_";

/// How a run that produced output ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Every partition contributed.
    Complete,
    /// Some partitions failed and their columns are black.
    Partial,
}

/// Read the image, run the worker pool, write the stage images and the
/// report.
///
/// # Errors
///
/// Returns an [`AppError`] if the input cannot be read, the pool fails
/// outright, or an output cannot be written. A tolerated partial run is
/// not an error; it returns [`Completion::Partial`].
pub fn run<L>(settings: &Settings, launcher: &L) -> Result<Completion, AppError>
where
    L: WorkerLauncher + ?Sized,
{
    let raster = bmp::read(&settings.image)?;
    log::info!(
        "read {} ({})",
        settings.image.display(),
        raster.dimensions()
    );

    let output = Broker::run(&raster, settings.run.clone(), launcher)?;
    let rows = write_outputs(settings, &output)?;
    report::write(&settings.report, &rows)?;
    log::info!(
        "wrote {} images and {}",
        rows.len(),
        settings.report.display()
    );

    if output.is_complete() {
        Ok(Completion::Complete)
    } else {
        for (index, failure) in &output.failures {
            log::error!("partition {index} failed: {failure}");
        }
        log::error!(
            "{} of {} partitions failed; images were written with the {PARTIAL_PREFIX} prefix",
            output.failures.len(),
            output.partitions.len()
        );
        Ok(Completion::Partial)
    }
}

/// Write the selected stage images into the output directory and
/// classify each one.
///
/// # Errors
///
/// Returns [`AppError::Io`] if the output directory cannot be created and
/// [`AppError::WriteImage`] if an image cannot be written.
pub fn write_outputs(settings: &Settings, output: &BrokerOutput) -> Result<Vec<ReportRow>, AppError> {
    fs::create_dir_all(&settings.output_dir).map_err(|source| AppError::Io {
        path: settings.output_dir.clone(),
        source,
    })?;

    let stem = image_stem(&settings.image);
    settings
        .stages()
        .map(|stage| {
            let name = output_name(stage, &stem, output.is_complete());
            let raster = output.stages.stage(stage);
            bmp::write(&settings.output_dir.join(&name), raster)?;
            let nearly_black = is_nearly_black(raster, settings.classify_threshold);
            log::debug!("{name}: nearly black = {nearly_black}");
            Ok(ReportRow::new(name, nearly_black))
        })
        .collect()
}

/// File name for `stage`'s image, e.g. `greyscale_cat.bmp`.
#[must_use]
pub fn output_name(stage: Stage, stem: &str, complete: bool) -> String {
    let prefix = if complete { "" } else { PARTIAL_PREFIX };
    format!("{prefix}{}_{stem}.bmp", stage.name())
}

fn image_stem(path: &Path) -> String {
    path.file_stem()
        .map_or_else(|| "image".to_owned(), |s| s.to_string_lossy().into_owned())
}
