//! `YOLOv8` object detector on ONNX Runtime.
//!
//! Expects the standard Ultralytics export: a `(1, 3, 640, 640)` RGB input
//! scaled to `[0, 1]` and a `(1, 4 + classes, anchors)` output holding
//! `cx, cy, w, h` followed by per-class scores for every anchor. Images are
//! letterboxed onto the input: aspect ratio kept, borders filled with grey.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use image::imageops::FilterType;
use image::{DynamicImage, Rgb, RgbImage};
use ndarray::Array4;
use once_cell::sync::OnceCell;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use tracing::{debug, trace};

use super::{nms, COCO_LABELS};
use crate::domain::Detection;
use crate::error::InferenceError;
use crate::ports::ObjectDetector;

/// Model file name inside the models directory.
pub const YOLO_FILE: &str = "yolov8s.onnx";

const MODEL: &str = "yolov8s";
const INPUT_SIZE: u32 = 640;
/// Candidates under this score are dropped before suppression.
const MIN_SCORE: f32 = 0.25;
const IOU_THRESHOLD: f32 = 0.45;
/// Border colour used by the Ultralytics letterbox.
const PAD_VALUE: u8 = 114;

#[derive(Debug, Clone, Copy)]
struct Candidate {
    class: usize,
    score: f32,
    bbox: [f32; 4],
}

/// [`ObjectDetector`] backed by a `YOLOv8` ONNX export; the session is created
/// on first use.
pub struct YoloDetector {
    path: PathBuf,
    session: OnceCell<Mutex<Session>>,
}

impl YoloDetector {
    /// Creates a detector reading the model from `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            session: OnceCell::new(),
        }
    }

    /// Path of the model file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true once the session has been created.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.session.get().is_some()
    }

    fn session(&self) -> Result<&Mutex<Session>, InferenceError> {
        self.session
            .get_or_try_init(|| load_session(&self.path).map(Mutex::new))
    }
}

fn load_session(path: &Path) -> Result<Session, InferenceError> {
    if !path.is_file() {
        return Err(InferenceError::ModelNotFound(path.to_path_buf()));
    }
    debug!(path = %path.display(), "creating onnx session");

    let bytes = std::fs::read(path).map_err(|e| InferenceError::load(MODEL, e))?;
    Session::builder()
        .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
        .and_then(|b| b.with_intra_threads(4))
        .and_then(|b| b.commit_from_memory(&bytes))
        .map_err(|e| InferenceError::load(MODEL, e))
}

/// Placement of the scaled image inside the square network input.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Letterbox {
    scale: f32,
    pad_x: u32,
    pad_y: u32,
}

impl Letterbox {
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::cast_sign_loss
    )]
    fn fit(width: u32, height: u32) -> (Self, u32, u32) {
        let side = INPUT_SIZE as f32;
        let scale = (side / width.max(1) as f32).min(side / height.max(1) as f32);
        let scaled_w = ((width as f32 * scale).round() as u32).clamp(1, INPUT_SIZE);
        let scaled_h = ((height as f32 * scale).round() as u32).clamp(1, INPUT_SIZE);
        let letterbox = Self {
            scale,
            pad_x: (INPUT_SIZE - scaled_w) / 2,
            pad_y: (INPUT_SIZE - scaled_h) / 2,
        };
        (letterbox, scaled_w, scaled_h)
    }

    /// Maps a box from input coordinates back to source-image pixels.
    #[allow(clippy::cast_precision_loss)]
    fn unmap(&self, [x1, y1, x2, y2]: [f32; 4]) -> [f32; 4] {
        let (px, py) = (self.pad_x as f32, self.pad_y as f32);
        [
            (x1 - px) / self.scale,
            (y1 - py) / self.scale,
            (x2 - px) / self.scale,
            (y2 - py) / self.scale,
        ]
    }
}

/// Letterboxes the image onto the network input and lays it out as NCHW.
#[allow(clippy::cast_possible_truncation)]
fn preprocess(image: &DynamicImage) -> (Array4<f32>, Letterbox) {
    let (letterbox, width, height) = Letterbox::fit(image.width(), image.height());
    let resized = image.resize_exact(width, height, FilterType::Triangle).to_rgb8();
    let mut canvas = RgbImage::from_pixel(INPUT_SIZE, INPUT_SIZE, Rgb([PAD_VALUE; 3]));
    image::imageops::replace(
        &mut canvas,
        &resized,
        i64::from(letterbox.pad_x),
        i64::from(letterbox.pad_y),
    );

    let side = INPUT_SIZE as usize;
    let input = Array4::from_shape_fn((1, 3, side, side), |(_, c, y, x)| {
        f32::from(canvas.get_pixel(x as u32, y as u32).0[c]) / 255.0
    });
    (input, letterbox)
}

/// Reads candidates out of a `(1, 4 + classes, anchors)` output, with boxes
/// in source-image pixels.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn decode(
    shape: &[i64],
    data: &[f32],
    letterbox: &Letterbox,
) -> Result<Vec<Candidate>, InferenceError> {
    let &[1, rows, anchors] = shape else {
        return Err(InferenceError::inference(
            MODEL,
            format!("unexpected output shape {shape:?}"),
        ));
    };
    if rows <= 4 || anchors <= 0 {
        return Err(InferenceError::inference(
            MODEL,
            format!("unexpected output shape {shape:?}"),
        ));
    }
    let (rows, anchors) = (rows as usize, anchors as usize);
    if data.len() != rows * anchors {
        return Err(InferenceError::inference(
            MODEL,
            format!("output holds {} values, shape {shape:?}", data.len()),
        ));
    }

    let at = |row: usize, anchor: usize| data[row * anchors + anchor];
    let candidates = (0..anchors)
        .filter_map(|a| {
            let (class, score) = (4..rows)
                .map(|row| (row - 4, at(row, a)))
                .max_by(|x, y| x.1.total_cmp(&y.1))?;
            if score < MIN_SCORE {
                return None;
            }
            let (cx, cy, w, h) = (at(0, a), at(1, a), at(2, a), at(3, a));
            let bbox = [cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0];
            Some(Candidate {
                class,
                score,
                bbox: letterbox.unmap(bbox),
            })
        })
        .collect();
    Ok(candidates)
}

/// Suppression within each class; boxes of different classes never suppress
/// each other.
fn suppress(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut by_class: BTreeMap<usize, Vec<Candidate>> = BTreeMap::new();
    for candidate in candidates {
        by_class.entry(candidate.class).or_default().push(candidate);
    }
    by_class
        .into_values()
        .flat_map(|group| nms(group, IOU_THRESHOLD, |c| c.bbox, |c| c.score))
        .collect()
}

fn label(class: usize) -> String {
    COCO_LABELS
        .get(class)
        .map_or_else(|| format!("class_{class}"), |l| (*l).to_string())
}

impl ObjectDetector for YoloDetector {
    fn name(&self) -> &'static str {
        MODEL
    }

    fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>, InferenceError> {
        let session = self.session()?;
        let (input, letterbox) = preprocess(image);
        let input = Tensor::from_array(input)
            .map_err(|e| InferenceError::inference(MODEL, e))?;

        let mut session = session.lock().unwrap_or_else(PoisonError::into_inner);
        let input_name = session
            .inputs
            .first()
            .map_or_else(|| "images".to_string(), |i| i.name.clone());
        let outputs = session
            .run(ort::inputs![input_name => input])
            .map_err(|e| InferenceError::inference(MODEL, e))?;
        let output = outputs
            .values()
            .next()
            .ok_or_else(|| InferenceError::inference(MODEL, "model produced no output"))?;
        let (shape, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| InferenceError::inference(MODEL, e))?;
        let shape: Vec<i64> = shape.iter().copied().collect();
        trace!(?shape, "yolo output");

        let candidates = decode(&shape, data, &letterbox)?;
        let kept = suppress(candidates);
        debug!(count = kept.len(), "objects after suppression");

        let mut detections: Vec<Detection> = kept
            .into_iter()
            .map(|c| Detection::new(label(c.class), c.score))
            .collect();
        detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        Ok(detections)
    }
}
