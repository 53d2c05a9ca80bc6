//! Detection backends behind the content gate ports.
//!
//! - `BlazeFace` (face detection) on Candle, weights in safetensors
//! - `YOLOv8` (object detection) on ONNX Runtime

mod blazeface;
mod device;
mod labels;
mod loader;
mod utils;
mod yolo;

pub use blazeface::{BlazeFaceDetector, BLAZEFACE_FILE};
pub use device::{describe_device, select_device};
pub use labels::COCO_LABELS;
pub use loader::load_safetensors;
pub use utils::{iou, nms, sigmoid};
pub use yolo::{YoloDetector, YOLO_FILE};
