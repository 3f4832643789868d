use crate::domain::detection::{non_max_suppression, BBox, Detection};
use crate::error::DetectionError;
use crate::ports::detector::Detector;
use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::{Array4, ArrayView3, Axis};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

const INPUT_SIZE: u32 = 640;
const CXYWH_OFFSET: usize = 4;
const IOU_THRESHOLD: f32 = 0.45;
/// Value of the padding left around the resized frame.
const PAD_VALUE: f32 = 144.0 / 255.0;

/// YOLOv8/YOLO11 detector over an ONNX export.
///
/// The session is shared by all jobs; calls are serialized by the mutex.
pub struct YoloDetector {
    session: Mutex<Session>,
    input_name: String,
    confidence: f32,
}

impl YoloDetector {
    pub fn load(model_path: &Path, confidence: f32) -> Result<Self, DetectionError> {
        let load_err = |e: ort::Error| DetectionError::Load {
            path: model_path.to_path_buf(),
            reason: e.to_string(),
        };

        let session = Session::builder()
            .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|b| b.commit_from_file(model_path))
            .map_err(load_err)?;
        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .ok_or_else(|| DetectionError::Load {
                path: model_path.to_path_buf(),
                reason: "model has no inputs".to_string(),
            })?;

        info!(model = %model_path.display(), confidence, "detection model loaded");
        Ok(Self {
            session: Mutex::new(session),
            input_name,
            confidence,
        })
    }
}

impl Detector for YoloDetector {
    fn detect(&self, frame: &RgbImage) -> Result<Vec<Detection>, DetectionError> {
        let (input, ratio) = preprocess(frame);
        let inference_err = |e: ort::Error| DetectionError::Inference(e.to_string());

        let session = self
            .session
            .lock()
            .map_err(|_| DetectionError::Inference("detector session poisoned".to_string()))?;
        let inputs = ort::inputs![self.input_name.as_str() => input.view()].map_err(inference_err)?;
        let outputs = session.run(inputs).map_err(inference_err)?;
        let output = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(inference_err)?;
        let output = output
            .into_dimensionality::<ndarray::Ix3>()
            .map_err(|e| DetectionError::Inference(e.to_string()))?;

        Ok(decode(
            output,
            ratio,
            frame.width() as f32,
            frame.height() as f32,
            self.confidence,
        ))
    }
}

/// Resizes keeping the aspect ratio into the top-left of the model input,
/// as a normalized CHW batch of one. Returns the batch and the scale applied.
fn preprocess(frame: &RgbImage) -> (Array4<f32>, f32) {
    let (w0, h0) = frame.dimensions();
    let ratio = (INPUT_SIZE as f32 / w0 as f32).min(INPUT_SIZE as f32 / h0 as f32);
    let w_new = ((w0 as f32 * ratio).round() as u32).clamp(1, INPUT_SIZE);
    let h_new = ((h0 as f32 * ratio).round() as u32).clamp(1, INPUT_SIZE);
    let resized = imageops::resize(frame, w_new, h_new, FilterType::Triangle);

    let mut input = Array4::from_elem(
        (1, 3, INPUT_SIZE as usize, INPUT_SIZE as usize),
        PAD_VALUE,
    );
    for (x, y, pixel) in resized.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        let [r, g, b] = pixel.0;
        input[[0, 0, y, x]] = f32::from(r) / 255.0;
        input[[0, 1, y, x]] = f32::from(g) / 255.0;
        input[[0, 2, y, x]] = f32::from(b) / 255.0;
    }
    (input, ratio)
}

/// Decodes a `[1, 4 + classes, anchors]` prediction into frame-space detections.
fn decode(
    output: ArrayView3<f32>,
    ratio: f32,
    width: f32,
    height: f32,
    confidence: f32,
) -> Vec<Detection> {
    let mut detections = Vec::new();
    let Some(batch) = output.axis_iter(Axis(0)).next() else {
        return detections;
    };

    for pred in batch.axis_iter(Axis(1)) {
        if pred.len() <= CXYWH_OFFSET {
            continue;
        }
        let best = pred
            .iter()
            .skip(CXYWH_OFFSET)
            .enumerate()
            .fold(None, |best: Option<(usize, f32)>, (id, &score)| match best {
                Some((_, top)) if top >= score => best,
                _ => Some((id, score)),
            });
        let Some((class_id, score)) = best else {
            continue;
        };
        if score < confidence {
            continue;
        }

        let cx = pred[0] / ratio;
        let cy = pred[1] / ratio;
        let w = pred[2] / ratio;
        let h = pred[3] / ratio;
        detections.push(Detection {
            class_id: class_id as u32,
            confidence: score,
            bbox: BBox {
                x1: (cx - w / 2.0).clamp(0.0, width),
                y1: (cy - h / 2.0).clamp(0.0, height),
                x2: (cx + w / 2.0).clamp(0.0, width),
                y2: (cy + h / 2.0).clamp(0.0, height),
            },
        });
    }

    non_max_suppression(&mut detections, IOU_THRESHOLD);
    detections
}
