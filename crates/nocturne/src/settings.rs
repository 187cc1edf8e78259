//! Validated launcher settings.

use std::path::{Path, PathBuf};

use nocturne_broker::RunConfig;
use nocturne_pipeline::Stage;

use crate::error::AppError;

/// Everything one launcher invocation needs.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Input BMP.
    pub image: PathBuf,
    /// Directory the stage images are written into. Created if missing.
    pub output_dir: PathBuf,
    /// Path of the CSV report.
    pub report: PathBuf,
    /// Worker pool configuration.
    pub run: RunConfig,
    /// How many stage images to write and classify, in chain order.
    pub filter_count: usize,
    /// Fraction of near-black pixels at which an image counts as mostly
    /// black.
    pub classify_threshold: f32,
}

impl Settings {
    /// Default number of stage images written.
    pub const DEFAULT_FILTER_COUNT: usize = Stage::ALL.len();

    /// Default classification threshold.
    pub const DEFAULT_CLASSIFY_THRESHOLD: f32 = 0.5;

    /// Reject anything that would fail later, before a worker is spawned.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Config`] describing the first invalid value.
    pub fn validate(&self) -> Result<(), AppError> {
        for (flag, path) in [
            ("--image", &self.image),
            ("--output-dir", &self.output_dir),
            ("--report", &self.report),
        ] {
            require_path(flag, path)?;
        }
        if !(1..=Stage::ALL.len()).contains(&self.filter_count) {
            return Err(AppError::Config(format!(
                "--filters must be 1, 2 or 3, got {}",
                self.filter_count
            )));
        }
        if !(0.0..=1.0).contains(&self.classify_threshold) {
            return Err(AppError::Config(format!(
                "--classify-threshold must be within 0..=1, got {}",
                self.classify_threshold
            )));
        }
        self.run
            .validate()
            .map_err(|e| AppError::Config(e.to_string()))
    }

    /// The stages whose images are written, in chain order.
    pub fn stages(&self) -> impl Iterator<Item = Stage> {
        Stage::ALL.into_iter().take(self.filter_count)
    }
}

fn require_path(flag: &str, path: &Path) -> Result<(), AppError> {
    if path.as_os_str().is_empty() {
        Err(AppError::Config(format!("{flag} must not be empty")))
    } else {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn settings() -> Settings {
        Settings {
            image: PathBuf::from("in.bmp"),
            output_dir: PathBuf::from("out"),
            report: PathBuf::from("report.csv"),
            run: RunConfig::default(),
            filter_count: Settings::DEFAULT_FILTER_COUNT,
            classify_threshold: Settings::DEFAULT_CLASSIFY_THRESHOLD,
        }
    }

    #[test]
    fn defaults_are_valid() {
        settings().validate().unwrap();
    }

    #[test]
    fn filter_count_range() {
        for bad in [0, 4] {
            let s = Settings {
                filter_count: bad,
                ..settings()
            };
            assert!(s.validate().is_err(), "filter_count {bad}");
        }
    }

    #[test]
    fn classify_threshold_range() {
        for bad in [-0.1, 1.1, f32::NAN] {
            let s = Settings {
                classify_threshold: bad,
                ..settings()
            };
            assert!(s.validate().is_err(), "threshold {bad}");
        }
    }

    #[test]
    fn empty_path_rejected() {
        let s = Settings {
            report: PathBuf::new(),
            ..settings()
        };
        assert!(matches!(s.validate(), Err(AppError::Config(m)) if m.contains("--report")));
    }

    #[test]
    fn stages_follow_filter_count() {
        let s = Settings {
            filter_count: 2,
            ..settings()
        };
        assert_eq!(
            s.stages().collect::<Vec<_>>(),
            [Stage::Saturate, Stage::Greyscale]
        );
    }
}
