//! Gate verdicts and detector outputs.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Outcome of the quality gate for one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "verdict", content = "failure", rename_all = "snake_case")]
pub enum QualityVerdict {
    /// All checks passed; the image stays in the Selected pool.
    Pass,
    /// A check failed; the image moves to NeedsEdit.
    Fail(QualityFailure),
}

impl QualityVerdict {
    /// Returns true for [`QualityVerdict::Pass`].
    #[must_use]
    pub const fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }
}

/// The first quality check an image failed.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum QualityFailure {
    /// The file could not be opened or decoded.
    Unreadable {
        /// Decoder message.
        reason: String,
    },
    /// Laplacian variance under the sharpness threshold.
    TooBlurry {
        /// Measured Laplacian variance.
        variance: f64,
        /// Threshold in force.
        threshold: f64,
    },
    /// Intensity standard deviation under the noise threshold.
    TooFlat {
        /// Measured standard deviation.
        std_dev: f64,
        /// Threshold in force.
        threshold: f64,
    },
    /// Mean intensity under the exposure window.
    Underexposed {
        /// Measured mean intensity.
        mean: f64,
        /// Lower bound in force.
        min: f64,
    },
    /// Mean intensity over the exposure window.
    Overexposed {
        /// Measured mean intensity.
        mean: f64,
        /// Upper bound in force.
        max: f64,
    },
}

impl fmt::Display for QualityFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreadable { reason } => write!(f, "unreadable: {reason}"),
            Self::TooBlurry {
                variance,
                threshold,
            } => write!(
                f,
                "too blurry (laplacian variance {variance:.1} < {threshold})"
            ),
            Self::TooFlat { std_dev, threshold } => write!(
                f,
                "too clean/flat (intensity std dev {std_dev:.1} < {threshold})"
            ),
            Self::Underexposed { mean, min } => {
                write!(f, "underexposed (mean intensity {mean:.1} < {min})")
            }
            Self::Overexposed { mean, max } => {
                write!(f, "overexposed (mean intensity {mean:.1} > {max})")
            }
        }
    }
}

/// One detection returned by an object detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Class label.
    pub label: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
}

impl Detection {
    /// Creates a detection.
    #[must_use]
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

/// A face region found by a face detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceRegion {
    /// Box `[x_min, y_min, x_max, y_max]` in normalized `[0, 1]` coordinates.
    pub bbox: [f32; 4],
    /// Detector score.
    pub confidence: f32,
}

/// Why the content gate flagged an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentHit {
    /// One or more faces.
    Face {
        /// Number of face regions.
        count: usize,
    },
    /// A recognizable object or logo.
    Object {
        /// Detected label.
        label: String,
        /// Detection confidence.
        confidence: f32,
    },
    /// A landmark-like object.
    Landmark {
        /// Detected label.
        label: String,
        /// Detection confidence.
        confidence: f32,
    },
}

impl fmt::Display for ContentHit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Face { count } => write!(f, "{count} face(s)"),
            Self::Object { label, confidence } => {
                write!(f, "object '{label}' ({confidence:.2})")
            }
            Self::Landmark { label, confidence } => {
                write!(f, "landmark '{label}' ({confidence:.2})")
            }
        }
    }
}

/// Outcome of the content gate for one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum ContentVerdict {
    /// No face, object or landmark; the image stays.
    Clear,
    /// At least one hit; the image is removed.
    Flagged {
        /// Every hit found.
        hits: Vec<ContentHit>,
    },
    /// No hit, but at least one check could not run.
    Unverified {
        /// What prevented verification.
        reason: String,
    },
}

impl ContentVerdict {
    /// Returns true for [`ContentVerdict::Flagged`].
    #[must_use]
    pub const fn is_flagged(&self) -> bool {
        matches!(self, Self::Flagged { .. })
    }
}
