//! Stub detectors and recording implementations of core port traits.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use image::{DynamicImage, GrayImage};
use photo_cull_core::domain::{Detection, FaceRegion, Pool, PoolEvent};
use photo_cull_core::ports::{FaceDetector, ObjectDetector, PoolJournal, ProgressEvent, ProgressSink};
use photo_cull_core::InferenceError;

type FaceRule = dyn Fn(&GrayImage) -> usize + Send + Sync;
type ObjectRule = dyn Fn(&DynamicImage) -> Vec<Detection> + Send + Sync;

/// Face detector returning a scripted number of faces.
///
/// Counts calls so tests can assert how often the model would have run.
pub struct StubFaceDetector {
    rule: Box<FaceRule>,
    calls: Arc<AtomicUsize>,
}

impl StubFaceDetector {
    /// Always reports `faces` faces.
    #[must_use]
    pub fn new(faces: usize) -> Self {
        Self::from_fn(move |_| faces)
    }

    /// Decides the face count per image.
    #[must_use]
    pub fn from_fn(rule: impl Fn(&GrayImage) -> usize + Send + Sync + 'static) -> Self {
        Self {
            rule: Box::new(rule),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared call counter; stays readable after the detector is boxed.
    #[must_use]
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl FaceDetector for StubFaceDetector {
    fn name(&self) -> &'static str {
        "stub-faces"
    }

    fn detect_faces(&self, image: &GrayImage) -> Result<Vec<FaceRegion>, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let region = FaceRegion {
            bbox: [0.25, 0.25, 0.75, 0.75],
            confidence: 0.9,
        };
        Ok(vec![region; (self.rule)(image)])
    }
}

/// Object detector returning scripted detections.
pub struct StubObjectDetector {
    rule: Box<ObjectRule>,
    calls: Arc<AtomicUsize>,
}

impl StubObjectDetector {
    /// Decides the detections per image.
    #[must_use]
    pub fn from_fn(rule: impl Fn(&DynamicImage) -> Vec<Detection> + Send + Sync + 'static) -> Self {
        Self {
            rule: Box::new(rule),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared call counter.
    #[must_use]
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl ObjectDetector for StubObjectDetector {
    fn name(&self) -> &'static str {
        "stub-objects"
    }

    fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok((self.rule)(image))
    }
}

/// Detector whose every call fails, as if the model were unusable.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingDetector;

impl FailingDetector {
    fn error() -> InferenceError {
        InferenceError::Inference {
            model: "failing",
            message: "simulated failure".to_string(),
        }
    }
}

impl FaceDetector for FailingDetector {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn detect_faces(&self, _image: &GrayImage) -> Result<Vec<FaceRegion>, InferenceError> {
        Err(Self::error())
    }
}

impl ObjectDetector for FailingDetector {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn detect(&self, _image: &DynamicImage) -> Result<Vec<Detection>, InferenceError> {
        Err(Self::error())
    }
}

/// Mock implementation of `PoolJournal` for testing.
///
/// Captures events for later assertions.
#[derive(Default)]
pub struct MockJournal {
    events: Mutex<Vec<PoolEvent>>,
    flush_count: AtomicUsize,
}

impl MockJournal {
    /// Creates an empty journal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<PoolEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the recorded events that ended in `pool`.
    #[must_use]
    pub fn events_for(&self, pool: Pool) -> Vec<PoolEvent> {
        self.events().into_iter().filter(|e| e.pool == pool).collect()
    }

    /// Returns the number of times `flush()` was called.
    #[must_use]
    pub fn flush_count(&self) -> usize {
        self.flush_count.load(Ordering::SeqCst)
    }
}

impl PoolJournal for MockJournal {
    fn record(&self, event: &PoolEvent) -> anyhow::Result<()> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
        Ok(())
    }

    fn flush(&self) -> anyhow::Result<()> {
        self.flush_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Mock implementation of `ProgressSink` for testing.
///
/// Captures events for later assertions.
#[derive(Default)]
pub struct MockProgressSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl MockProgressSink {
    /// Creates a new mock progress sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all captured events.
    #[must_use]
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the number of `Decided` events.
    #[must_use]
    pub fn decided_count(&self) -> usize {
        self.count(|e| matches!(e, ProgressEvent::Decided { .. }))
    }

    /// Names of folders reported as already processed.
    #[must_use]
    pub fn skipped_folders(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ProgressEvent::FolderSkipped { folder } => Some(folder),
                _ => None,
            })
            .collect()
    }

    /// Returns the final counts from the `Finished` event, if any.
    #[must_use]
    pub fn finished_counts(&self) -> Option<(usize, usize)> {
        self.events().iter().find_map(|e| match e {
            ProgressEvent::Finished { processed, skipped } => Some((*processed, *skipped)),
            _ => None,
        })
    }

    fn count(&self, pred: impl Fn(&ProgressEvent) -> bool) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| pred(e))
            .count()
    }
}

impl ProgressSink for MockProgressSink {
    fn on_event(&self, event: ProgressEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use photo_cull_core::domain::Stage;

    #[test]
    fn test_stub_face_detector_counts_calls() {
        let detector = StubFaceDetector::new(2);
        let calls = detector.calls();

        let faces = detector.detect_faces(&GrayImage::new(4, 4)).unwrap();

        assert_eq!(faces.len(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stub_object_rule() {
        let detector = StubObjectDetector::from_fn(|img| {
            if img.width() > 10 {
                vec![Detection::new("car", 0.9)]
            } else {
                vec![]
            }
        });
        assert!(detector
            .detect(&DynamicImage::new_rgb8(4, 4))
            .unwrap()
            .is_empty());
        assert_eq!(detector.detect(&DynamicImage::new_rgb8(20, 4)).unwrap().len(), 1);
    }

    #[test]
    fn test_failing_detector() {
        assert!(FailingDetector.detect_faces(&GrayImage::new(1, 1)).is_err());
        assert!(FailingDetector.detect(&DynamicImage::new_rgb8(1, 1)).is_err());
    }

    #[test]
    fn test_mock_journal() {
        let journal = MockJournal::new();
        journal
            .record(&PoolEvent {
                timestamp: "2024-01-01T00:00:00Z".into(),
                stage: Stage::Scan,
                source: "a.jpg".into(),
                destination: Some("Selected/a.jpg".into()),
                pool: Pool::Selected,
                reason: None,
            })
            .unwrap();
        journal.flush().unwrap();

        assert_eq!(journal.events_for(Pool::Selected).len(), 1);
        assert!(journal.events_for(Pool::Removed).is_empty());
        assert_eq!(journal.flush_count(), 1);
    }

    #[test]
    fn test_mock_progress_sink() {
        let sink = MockProgressSink::new();
        sink.on_event(ProgressEvent::FolderSkipped {
            folder: "Rome".into(),
        });
        sink.on_event(ProgressEvent::Finished {
            processed: 1,
            skipped: 0,
        });

        assert_eq!(sink.skipped_folders(), ["Rome"]);
        assert_eq!(sink.finished_counts(), Some((1, 0)));
        assert_eq!(sink.decided_count(), 0);
    }
}
