//! Content gate: faces, objects / logos and landmark-like objects.
//!
//! Object and landmark checks read the same detection list, so the object
//! model runs once per image.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::domain::{ContentHit, ContentSettings, ContentVerdict, Detection, ImageInfo};
use crate::ports::{FaceDetector, ObjectDetector};

/// Decides whether a selected image shows identifying content.
pub struct ContentGate {
    faces: Box<dyn FaceDetector>,
    objects: Box<dyn ObjectDetector>,
    settings: ContentSettings,
}

impl ContentGate {
    /// Creates a gate over the given detectors.
    #[must_use]
    pub fn new(
        faces: Box<dyn FaceDetector>,
        objects: Box<dyn ObjectDetector>,
        settings: ContentSettings,
    ) -> Self {
        Self {
            faces,
            objects,
            settings,
        }
    }

    /// Evaluates a decoded image.
    ///
    /// A hit from any check that ran flags the image. Without a hit, a check
    /// that errored makes the verdict [`ContentVerdict::Unverified`].
    #[must_use]
    pub fn evaluate(&self, image: &ImageInfo) -> ContentVerdict {
        let mut hits = Vec::new();
        let mut errors = Vec::new();

        match self.faces.detect_faces(&image.to_luma8()) {
            Ok(regions) if !regions.is_empty() => {
                debug!(path = %image.path, count = regions.len(), "faces detected");
                hits.push(ContentHit::Face {
                    count: regions.len(),
                });
            }
            Ok(_) => {}
            Err(e) => {
                warn!(path = %image.path, detector = self.faces.name(), error = %e, "face check failed");
                errors.push(e.to_string());
            }
        }

        match self.objects.detect(&image.image) {
            Ok(detections) => self.collect_detection_hits(&image.path, &detections, &mut hits),
            Err(e) => {
                warn!(path = %image.path, detector = self.objects.name(), error = %e, "object check failed");
                errors.push(e.to_string());
            }
        }

        if !hits.is_empty() {
            ContentVerdict::Flagged { hits }
        } else if !errors.is_empty() {
            ContentVerdict::Unverified {
                reason: errors.join("; "),
            }
        } else {
            ContentVerdict::Clear
        }
    }

    /// Decodes and evaluates a file. A decode failure is unverified.
    #[must_use]
    pub fn evaluate_path(&self, path: &Path) -> ContentVerdict {
        match ImageInfo::open(path) {
            Ok(image) => self.evaluate(&image),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot decode image");
                ContentVerdict::Unverified {
                    reason: format!("decode failed: {e}"),
                }
            }
        }
    }

    fn collect_detection_hits(&self, path: &str, detections: &[Detection], hits: &mut Vec<ContentHit>) {
        let confident = detections
            .iter()
            .filter(|d| d.confidence > self.settings.confidence_threshold);

        let mut landmarks = Vec::new();
        for detection in confident {
            info!(path, label = %detection.label, confidence = detection.confidence, "object detected");
            hits.push(ContentHit::Object {
                label: detection.label.clone(),
                confidence: detection.confidence,
            });
            if self.is_landmark(&detection.label) {
                landmarks.push(ContentHit::Landmark {
                    label: detection.label.clone(),
                    confidence: detection.confidence,
                });
            }
        }
        hits.extend(landmarks);
    }

    fn is_landmark(&self, label: &str) -> bool {
        let labels = &self.settings.landmark_labels;
        labels.is_empty() || labels.contains(&label.to_lowercase())
    }
}
