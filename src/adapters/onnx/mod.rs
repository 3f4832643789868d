//! Person detection with an ONNX YOLO model.

mod yolo;

pub use yolo::YoloDetector;
