//! Quality gate: sharpness, then noise, then exposure.

use std::path::Path;

use tracing::debug;

use crate::checks::{ExposureCheck, NoiseCheck, QualityCheck, SharpnessCheck};
use crate::domain::{ImageInfo, QualityFailure, QualitySettings, QualityVerdict};

/// Runs the quality checks in order and stops at the first failure.
pub struct QualityGate {
    checks: Vec<Box<dyn QualityCheck>>,
}

impl QualityGate {
    /// Builds the gate from validated thresholds.
    #[must_use]
    pub fn new(settings: &QualitySettings) -> Self {
        Self {
            checks: vec![
                Box::new(SharpnessCheck::new(settings.sharpness_threshold)),
                Box::new(NoiseCheck::new(settings.noise_threshold)),
                Box::new(ExposureCheck::new(
                    settings.min_mean_intensity,
                    settings.max_mean_intensity,
                )),
            ],
        }
    }

    /// Names of the checks in evaluation order.
    pub fn check_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.checks.iter().map(|c| c.name())
    }

    /// Evaluates a decoded image.
    #[must_use]
    pub fn evaluate(&self, image: &ImageInfo) -> QualityVerdict {
        let luma = image.to_luma8();
        for check in &self.checks {
            if let Some(failure) = check.check(&luma) {
                debug!(path = %image.path, check = check.name(), %failure, "quality check failed");
                return QualityVerdict::Fail(failure);
            }
        }
        QualityVerdict::Pass
    }

    /// Decodes and evaluates a file. A file that cannot be decoded fails.
    #[must_use]
    pub fn evaluate_path(&self, path: &Path) -> QualityVerdict {
        match ImageInfo::open(path) {
            Ok(image) => self.evaluate(&image),
            Err(e) => QualityVerdict::Fail(QualityFailure::Unreadable {
                reason: e.to_string(),
            }),
        }
    }
}

impl Default for QualityGate {
    fn default() -> Self {
        Self::new(&QualitySettings::default())
    }
}
