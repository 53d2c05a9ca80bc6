//! `BlazeFace` front-camera face detector.
//!
//! Candle port of the short-range `BlazeFace` network ("`BlazeFace`:
//! Sub-millisecond Neural Face Detection on Mobile GPUs") using the
//! hollance/BlazeFace-PyTorch weights with BatchNorm folded into the
//! convolution biases.

#![allow(clippy::cast_precision_loss)]

use std::path::{Path, PathBuf};

use candle_core::{DType, Device, Module, Tensor};
use candle_nn::{conv2d, Conv2d, Conv2dConfig, VarBuilder};
use image::imageops::FilterType;
use image::GrayImage;
use once_cell::sync::OnceCell;
use tracing::{debug, trace};

use super::{iou, load_safetensors, select_device, sigmoid};
use crate::domain::FaceRegion;
use crate::error::InferenceError;
use crate::ports::FaceDetector;

/// Weights file name inside the models directory.
pub const BLAZEFACE_FILE: &str = "blazeface.safetensors";

const MODEL: &str = "blazeface";
const INPUT_SIZE: u32 = 128;
const NUM_ANCHORS: usize = 896;
const NMS_THRESHOLD: f32 = 0.3;
const SCORE_CLIP: f32 = 100.0;
/// Values per anchor from the regressor: box (4) plus six keypoints (12).
const REGRESSOR_WIDTH: usize = 16;

/// `(in_channels, out_channels, stride)` per block; kernels are 3x3.
const BACKBONE1: [(usize, usize, usize); 11] = [
    (24, 24, 1),
    (24, 28, 1),
    (28, 32, 2),
    (32, 36, 1),
    (36, 42, 1),
    (42, 48, 2),
    (48, 56, 1),
    (56, 64, 1),
    (64, 72, 1),
    (72, 80, 1),
    (80, 88, 1),
];
const BACKBONE2: [(usize, usize, usize); 5] = [
    (88, 96, 2),
    (96, 96, 1),
    (96, 96, 1),
    (96, 96, 1),
    (96, 96, 1),
];

/// `(grid size, anchors per cell)` for the 16x16 and 8x8 feature maps.
const ANCHOR_GRIDS: [(usize, usize); 2] = [(16, 2), (8, 6)];

/// Depthwise-separable residual block.
struct BlazeBlock {
    depthwise: Conv2d,
    pointwise: Conv2d,
    channel_pad: usize,
    stride: usize,
}

impl BlazeBlock {
    fn new(
        (in_channels, out_channels, stride): (usize, usize, usize),
        vb: &VarBuilder,
    ) -> candle_core::Result<Self> {
        let depthwise = conv2d(
            in_channels,
            in_channels,
            3,
            Conv2dConfig {
                stride,
                padding: usize::from(stride == 1),
                groups: in_channels,
                ..Conv2dConfig::default()
            },
            vb.pp("depthwise"),
        )?;
        let pointwise = conv2d(
            in_channels,
            out_channels,
            1,
            Conv2dConfig::default(),
            vb.pp("pointwise"),
        )?;

        Ok(Self {
            depthwise,
            pointwise,
            channel_pad: out_channels.saturating_sub(in_channels),
            stride,
        })
    }
}

impl Module for BlazeBlock {
    fn forward(&self, x: &Tensor) -> candle_core::Result<Tensor> {
        // Strided blocks pad right/bottom only and max-pool the shortcut.
        let (input, shortcut) = if self.stride == 2 {
            (
                x.pad_with_zeros(2, 0, 2)?.pad_with_zeros(3, 0, 2)?,
                x.max_pool2d(2)?,
            )
        } else {
            (x.clone(), x.clone())
        };

        let h = self.depthwise.forward(&input)?.relu()?;
        let h = self.pointwise.forward(&h)?;

        let shortcut = if self.channel_pad > 0 {
            shortcut.pad_with_zeros(1, 0, self.channel_pad)?
        } else {
            shortcut
        };
        (h + shortcut)?.relu()
    }
}

/// Classifier and regressor pair over one feature map.
struct Head {
    classifier: Conv2d,
    regressor: Conv2d,
}

impl Head {
    fn new(
        channels: usize,
        per_cell: usize,
        classifier: &str,
        regressor: &str,
        vb: &VarBuilder,
    ) -> candle_core::Result<Self> {
        Ok(Self {
            classifier: conv2d(channels, per_cell, 1, Conv2dConfig::default(), vb.pp(classifier))?,
            regressor: conv2d(
                channels,
                per_cell * REGRESSOR_WIDTH,
                1,
                Conv2dConfig::default(),
                vb.pp(regressor),
            )?,
        })
    }

    /// Returns raw logits and regressor rows in anchor order.
    fn forward(&self, features: &Tensor) -> candle_core::Result<(Vec<f32>, Vec<f32>)> {
        let logits = self
            .classifier
            .forward(features)?
            .permute((0, 2, 3, 1))?
            .flatten_all()?
            .to_vec1::<f32>()?;
        let boxes = self
            .regressor
            .forward(features)?
            .permute((0, 2, 3, 1))?
            .flatten_all()?
            .to_vec1::<f32>()?;
        Ok((logits, boxes))
    }
}

struct BlazeFaceNet {
    stem: Conv2d,
    backbone1: Vec<BlazeBlock>,
    backbone2: Vec<BlazeBlock>,
    head16: Head,
    head8: Head,
    anchors: Vec<[f32; 2]>,
    device: Device,
}

impl BlazeFaceNet {
    fn load(vb: &VarBuilder) -> candle_core::Result<Self> {
        let stem = conv2d(
            3,
            24,
            5,
            Conv2dConfig {
                stride: 2,
                ..Conv2dConfig::default()
            },
            vb.pp("conv0"),
        )?;

        let backbone1 = BACKBONE1
            .iter()
            .enumerate()
            .map(|(i, &layer)| BlazeBlock::new(layer, &vb.pp(format!("backbone1.{i}"))))
            .collect::<candle_core::Result<Vec<_>>>()?;
        let backbone2 = BACKBONE2
            .iter()
            .enumerate()
            .map(|(i, &layer)| BlazeBlock::new(layer, &vb.pp(format!("backbone2.{i}"))))
            .collect::<candle_core::Result<Vec<_>>>()?;

        Ok(Self {
            stem,
            backbone1,
            backbone2,
            head16: Head::new(88, 2, "classifier_16", "regressor_16", vb)?,
            head8: Head::new(96, 6, "classifier_8", "regressor_8", vb)?,
            anchors: anchor_centers(),
            device: vb.device().clone(),
        })
    }

    /// Greyscale to `(1, 3, 128, 128)` in `[-1, 1]`, channel replicated.
    fn preprocess(&self, image: &GrayImage) -> candle_core::Result<Tensor> {
        let resized = image::imageops::resize(image, INPUT_SIZE, INPUT_SIZE, FilterType::Triangle);
        let plane: Vec<f32> = resized
            .pixels()
            .map(|p| f32::from(p.0[0]) / 127.5 - 1.0)
            .collect();
        let side = INPUT_SIZE as usize;
        Tensor::from_vec(plane, (1, 1, side, side), &self.device)?
            .repeat((1, 3, 1, 1))?
            .to_dtype(DType::F32)
    }

    fn forward(&self, input: &Tensor) -> candle_core::Result<(Vec<f32>, Vec<f32>)> {
        let x = input.pad_with_zeros(2, 1, 2)?.pad_with_zeros(3, 1, 2)?;
        let mut h = self.stem.forward(&x)?.relu()?;
        for block in &self.backbone1 {
            h = block.forward(&h)?;
        }
        let (mut logits, mut boxes) = self.head16.forward(&h)?;

        for block in &self.backbone2 {
            h = block.forward(&h)?;
        }
        let (logits8, boxes8) = self.head8.forward(&h)?;

        logits.extend(logits8);
        boxes.extend(boxes8);
        Ok((logits, boxes))
    }
}

/// Anchor centres in normalized coordinates; anchor width and height are 1.
fn anchor_centers() -> Vec<[f32; 2]> {
    let mut anchors = Vec::with_capacity(NUM_ANCHORS);
    for (grid, per_cell) in ANCHOR_GRIDS {
        let size = grid as f32;
        for y in 0..grid {
            for x in 0..grid {
                let centre = [(x as f32 + 0.5) / size, (y as f32 + 0.5) / size];
                anchors.extend(std::iter::repeat(centre).take(per_cell));
            }
        }
    }
    anchors
}

/// Turns raw network output into face regions above `min_confidence`.
fn decode(
    logits: &[f32],
    boxes: &[f32],
    anchors: &[[f32; 2]],
    min_confidence: f32,
) -> Vec<FaceRegion> {
    let scale = INPUT_SIZE as f32;
    let candidates = logits
        .iter()
        .zip(boxes.chunks_exact(REGRESSOR_WIDTH))
        .zip(anchors)
        .filter_map(|((&logit, raw), anchor)| {
            let confidence = sigmoid(logit.clamp(-SCORE_CLIP, SCORE_CLIP));
            if confidence < min_confidence {
                return None;
            }
            let cx = anchor[0] + raw[0] / scale;
            let cy = anchor[1] + raw[1] / scale;
            let half_w = raw[2] / scale / 2.0;
            let half_h = raw[3] / scale / 2.0;
            Some(FaceRegion {
                bbox: [
                    (cx - half_w).clamp(0.0, 1.0),
                    (cy - half_h).clamp(0.0, 1.0),
                    (cx + half_w).clamp(0.0, 1.0),
                    (cy + half_h).clamp(0.0, 1.0),
                ],
                confidence,
            })
        })
        .collect();

    weighted_nms(candidates)
}

/// Blending suppression: each cluster of overlapping regions collapses into
/// one score-weighted box carrying the cluster's mean score.
fn weighted_nms(mut regions: Vec<FaceRegion>) -> Vec<FaceRegion> {
    regions.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut merged = Vec::new();
    while let Some(best) = regions.first().copied() {
        let (cluster, rest): (Vec<_>, Vec<_>) = regions
            .into_iter()
            .partition(|r| iou(&best.bbox, &r.bbox) > NMS_THRESHOLD || r.bbox == best.bbox);
        regions = rest;

        let total: f32 = cluster.iter().map(|r| r.confidence).sum();
        if total <= 0.0 {
            merged.push(best);
            continue;
        }
        let mut bbox = [0.0f32; 4];
        for region in &cluster {
            for (acc, v) in bbox.iter_mut().zip(region.bbox) {
                *acc += v * region.confidence / total;
            }
        }
        merged.push(FaceRegion {
            bbox,
            confidence: total / cluster.len() as f32,
        });
    }
    merged
}

/// [`FaceDetector`] backed by `BlazeFace`; weights load on first use.
pub struct BlazeFaceDetector {
    path: PathBuf,
    device: Device,
    min_confidence: f32,
    net: OnceCell<BlazeFaceNet>,
}

impl BlazeFaceDetector {
    /// Creates a detector reading weights from `path` on the best device.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, min_confidence: f32) -> Self {
        Self::with_device(path, min_confidence, select_device())
    }

    /// Creates a detector on an explicit device.
    #[must_use]
    pub fn with_device(path: impl Into<PathBuf>, min_confidence: f32, device: Device) -> Self {
        Self {
            path: path.into(),
            device,
            min_confidence,
            net: OnceCell::new(),
        }
    }

    /// Path of the weights file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true once the weights have been loaded.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.net.get().is_some()
    }

    fn net(&self) -> Result<&BlazeFaceNet, InferenceError> {
        self.net.get_or_try_init(|| {
            let vb = load_safetensors(MODEL, &self.path, &self.device)?;
            BlazeFaceNet::load(&vb).map_err(|e| InferenceError::load(MODEL, e))
        })
    }
}

impl FaceDetector for BlazeFaceDetector {
    fn name(&self) -> &'static str {
        MODEL
    }

    fn detect_faces(&self, image: &GrayImage) -> Result<Vec<FaceRegion>, InferenceError> {
        let net = self.net()?;
        let input = net
            .preprocess(image)
            .map_err(|e| InferenceError::inference(MODEL, e))?;
        let (logits, boxes) = net
            .forward(&input)
            .map_err(|e| InferenceError::inference(MODEL, e))?;
        trace!(anchors = logits.len(), "blazeface forward done");

        let faces = decode(&logits, &boxes, &net.anchors, self.min_confidence);
        debug!(count = faces.len(), "faces after suppression");
        Ok(faces)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_anchor_layout() {
        let anchors = anchor_centers();
        assert_eq!(anchors.len(), NUM_ANCHORS);
        assert_eq!(anchors[0], [0.5 / 16.0, 0.5 / 16.0]);
        assert_eq!(anchors[1], anchors[0]);
        assert_eq!(anchors[512], [0.5 / 8.0, 0.5 / 8.0]);
        assert_eq!(anchors[NUM_ANCHORS - 1], [7.5 / 8.0, 7.5 / 8.0]);
    }

    #[test]
    fn test_decode_filters_by_confidence() {
        let anchors = anchor_centers();
        let mut logits = vec![-10.0f32; NUM_ANCHORS];
        let mut boxes = vec![0.0f32; NUM_ANCHORS * REGRESSOR_WIDTH];
        // One confident face centred on anchor 0, 32px wide.
        logits[0] = 5.0;
        boxes[2] = 32.0;
        boxes[3] = 32.0;

        let faces = decode(&logits, &boxes, &anchors, 0.75);
        assert_eq!(faces.len(), 1);
        assert!(faces[0].confidence > 0.99);
        let width = faces[0].bbox[2] - faces[0].bbox[0];
        assert!(width > 0.0 && width <= 0.25);

        assert!(decode(&logits, &boxes, &anchors, 0.999).is_empty());
    }

    #[test]
    fn test_score_is_clipped() {
        let anchors = anchor_centers();
        let mut logits = vec![f32::NEG_INFINITY; NUM_ANCHORS];
        logits[3] = f32::INFINITY;
        let boxes = vec![1.0f32; NUM_ANCHORS * REGRESSOR_WIDTH];

        let faces = decode(&logits, &boxes, &anchors, 0.5);
        assert_eq!(faces.len(), 1);
        assert!(faces[0].confidence.is_finite());
    }

    #[test]
    fn test_weighted_nms_blends_cluster() {
        let regions = vec![
            FaceRegion {
                bbox: [0.0, 0.0, 0.4, 0.4],
                confidence: 0.9,
            },
            FaceRegion {
                bbox: [0.02, 0.02, 0.42, 0.42],
                confidence: 0.8,
            },
            FaceRegion {
                bbox: [0.6, 0.6, 0.9, 0.9],
                confidence: 0.85,
            },
        ];
        let merged = weighted_nms(regions);
        assert_eq!(merged.len(), 2);
        assert!((merged[0].confidence - 0.85).abs() < 1e-6);
        assert!(merged[0].bbox[0] > 0.0 && merged[0].bbox[0] < 0.02);
        for (got, want) in merged[1].bbox.iter().zip([0.6, 0.6, 0.9, 0.9]) {
            assert!((got - want).abs() < 1e-6);
        }
    }

    #[test]
    fn test_missing_weights_reported_lazily() {
        let detector = BlazeFaceDetector::with_device(
            "/nonexistent/blazeface.safetensors",
            0.75,
            Device::Cpu,
        );
        assert!(!detector.is_loaded());

        let err = detector.detect_faces(&GrayImage::new(16, 16)).err().unwrap();
        assert!(matches!(err, InferenceError::ModelNotFound(_)));
        assert!(!detector.is_loaded());
    }

    #[test]
    fn test_preprocess_shape_and_range() {
        let net = BlazeFaceNet::load(&VarBuilder::zeros(DType::F32, &Device::Cpu)).unwrap();

        let img = GrayImage::from_pixel(300, 200, image::Luma([255u8]));
        let tensor = net.preprocess(&img).unwrap();
        assert_eq!(tensor.dims(), [1, 3, 128, 128]);
        let max = tensor
            .max_keepdim(3)
            .unwrap()
            .flatten_all()
            .unwrap()
            .to_vec1::<f32>()
            .unwrap();
        assert!(max.iter().all(|v| (v - 1.0).abs() < 1e-5));
    }

    #[test]
    fn test_zero_weights_forward_shapes() {
        let net = BlazeFaceNet::load(&VarBuilder::zeros(DType::F32, &Device::Cpu)).unwrap();
        let input = net.preprocess(&GrayImage::new(128, 128)).unwrap();
        let (logits, boxes) = net.forward(&input).unwrap();
        assert_eq!(logits.len(), NUM_ANCHORS);
        assert_eq!(boxes.len(), NUM_ANCHORS * REGRESSOR_WIDTH);
        // Zero weights give logit 0, i.e. score 0.5, below the face threshold.
        assert!(decode(&logits, &boxes, &net.anchors, 0.75).is_empty());
    }
}
