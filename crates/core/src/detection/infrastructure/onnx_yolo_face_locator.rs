//! Face locator backed by a YOLO face model running in ONNX Runtime.
//!
//! Only the box head of the model is used; keypoints are ignored and no
//! state survives between frames.
use std::path::Path;

use crate::detection::domain::face_locator::{DetectionError, FaceLocator};
use crate::shared::frame::Frame;
use crate::shared::geometry::NormalizedBox;

/// Used when the model's input shape is dynamic.
const DEFAULT_INPUT_SIZE: u32 = 640;

pub const DEFAULT_CONFIDENCE: f64 = 0.25;

const NMS_IOU_THRESH: f64 = 0.45;

/// Letterbox gray, YOLO convention.
const PAD_VALUE: f32 = 114.0 / 255.0;

pub struct OnnxYoloFaceLocator {
    session: ort::session::Session,
    confidence: f64,
    input_size: u32,
}

impl OnnxYoloFaceLocator {
    /// Loads the model; the square input size is read from its NCHW shape.
    pub fn new(model_path: &Path, confidence: f64) -> Result<Self, DetectionError> {
        let session = load_session(model_path)
            .map_err(|e| DetectionError::Model(format!("{}: {e}", model_path.display())))?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| match input.dtype() {
                ort::value::ValueType::Tensor { shape, .. } if shape.len() >= 4 && shape[2] > 0 => {
                    Some(shape[2] as u32)
                }
                _ => None,
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);
        log::info!("Face model loaded ({input_size}x{input_size} input)");

        Ok(Self {
            session,
            confidence,
            input_size,
        })
    }
}

impl FaceLocator for OnnxYoloFaceLocator {
    fn locate(&mut self, frame: &Frame) -> Result<Vec<NormalizedBox>, DetectionError> {
        let (input, lb) = letterbox(frame, self.input_size);

        let input_value = ort::value::Tensor::from_array(input).map_err(inference_error)?;
        let outputs = self
            .session
            .run(ort::inputs![input_value])
            .map_err(inference_error)?;
        if outputs.len() == 0 {
            return Err(DetectionError::Inference("model produced no outputs".into()));
        }
        let tensor = outputs[0]
            .try_extract_array::<f32>()
            .map_err(inference_error)?;
        let data = tensor
            .as_slice()
            .ok_or_else(|| DetectionError::Inference("output tensor is not contiguous".into()))?;

        let mut candidates = decode(data, tensor.shape(), self.confidence, &lb)?;
        let kept = suppress(&mut candidates, NMS_IOU_THRESH);

        Ok(kept
            .iter()
            .map(|c| {
                let [x1, y1, x2, y2] = c.corners;
                NormalizedBox::from_pixel_corners(x1, y1, x2, y2, frame.width(), frame.height())
            })
            .collect())
    }
}

fn load_session(model_path: &Path) -> Result<ort::session::Session, Box<dyn std::error::Error>> {
    Ok(ort::session::Session::builder()?
        .with_execution_providers(platform_execution_providers())?
        .commit_from_file(model_path)?)
}

/// CoreML on macOS, DirectML on Windows; ort falls back to CPU when the
/// provider cannot be registered.
fn platform_execution_providers() -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        vec![]
    }
}

fn inference_error(e: impl std::fmt::Display) -> DetectionError {
    DetectionError::Inference(e.to_string())
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Maps model-space coordinates back onto the source frame.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Letterbox {
    scale: f64,
    pad_x: u32,
    pad_y: u32,
}

impl Letterbox {
    fn unmap(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.pad_x as f64) / self.scale,
            (y - self.pad_y as f64) / self.scale,
        )
    }
}

/// Nearest-neighbour resize into a padded `size × size` NCHW tensor in [0,1].
fn letterbox(frame: &Frame, size: u32) -> (ndarray::Array4<f32>, Letterbox) {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let scale = (size as f64 / fw).min(size as f64 / fh);
    let new_w = ((fw * scale).round() as u32).min(size);
    let new_h = ((fh * scale).round() as u32).min(size);
    let pad_x = (size - new_w) / 2;
    let pad_y = (size - new_h) / 2;

    let s = size as usize;
    let mut tensor = ndarray::Array4::<f32>::from_elem((1, 3, s, s), PAD_VALUE);
    let src = frame.as_ndarray();
    let src_w = frame.width() as usize;
    let src_h = frame.height() as usize;

    for y in 0..new_h as usize {
        let sy = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let sx = ((x as f64 / scale) as usize).min(src_w - 1);
            for c in 0..3 {
                tensor[[0, c, pad_y as usize + y, pad_x as usize + x]] =
                    src[[sy, sx, c]] as f32 / 255.0;
            }
        }
    }

    (
        tensor,
        Letterbox {
            scale,
            pad_x,
            pad_y,
        },
    )
}

// ---------------------------------------------------------------------------
// Postprocessing
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
struct Candidate {
    /// `[x1, y1, x2, y2]` in source-frame pixels, top-left origin.
    corners: [f64; 4],
    confidence: f64,
}

/// Reads `[cx, cy, w, h, conf, ...]` rows from a `[1, F, N]` or `[1, N, F]`
/// output and keeps those at or above `confidence`.
fn decode(
    data: &[f32],
    shape: &[usize],
    confidence: f64,
    lb: &Letterbox,
) -> Result<Vec<Candidate>, DetectionError> {
    if shape.len() != 3 {
        return Err(DetectionError::Inference(format!(
            "unexpected output shape {shape:?}"
        )));
    }
    // Features are always the short axis.
    let transposed = shape[1] < shape[2];
    let (num_dets, num_feats) = if transposed {
        (shape[2], shape[1])
    } else {
        (shape[1], shape[2])
    };
    if num_feats < 5 || data.len() < num_dets * num_feats {
        return Err(DetectionError::Inference(format!(
            "output shape {shape:?} does not hold box rows"
        )));
    }

    let at = |det: usize, feat: usize| -> f64 {
        let idx = if transposed {
            feat * num_dets + det
        } else {
            det * num_feats + feat
        };
        data[idx] as f64
    };

    let mut candidates = Vec::new();
    for i in 0..num_dets {
        let conf = at(i, 4);
        if conf < confidence {
            continue;
        }
        let (cx, cy, w, h) = (at(i, 0), at(i, 1), at(i, 2), at(i, 3));
        let (x1, y1) = lb.unmap(cx - w / 2.0, cy - h / 2.0);
        let (x2, y2) = lb.unmap(cx + w / 2.0, cy + h / 2.0);
        candidates.push(Candidate {
            corners: [x1, y1, x2, y2],
            confidence: conf,
        });
    }
    Ok(candidates)
}

/// Greedy NMS, highest confidence first.
fn suppress(candidates: &mut [Candidate], iou_thresh: f64) -> Vec<Candidate> {
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut kept: Vec<Candidate> = Vec::new();
    for c in candidates.iter() {
        if kept.iter().all(|k| iou(&k.corners, &c.corners) <= iou_thresh) {
            kept.push(c.clone());
        }
    }
    kept
}

fn iou(a: &[f64; 4], b: &[f64; 4]) -> f64 {
    let w = (a[2].min(b[2]) - a[0].max(b[0])).max(0.0);
    let h = (a[3].min(b[3]) - a[1].max(b[1])).max(0.0);
    let inter = w * h;
    if inter == 0.0 {
        return 0.0;
    }
    let area_a = (a[2] - a[0]) * (a[3] - a[1]);
    let area_b = (b[2] - b[0]) * (b[3] - b[1]);
    inter / (area_a + area_b - inter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn identity() -> Letterbox {
        Letterbox {
            scale: 1.0,
            pad_x: 0,
            pad_y: 0,
        }
    }

    fn candidate(corners: [f64; 4], confidence: f64) -> Candidate {
        Candidate {
            corners,
            confidence,
        }
    }

    #[test]
    fn test_letterbox_wide_frame_pads_vertically() {
        // 200x100 → 640: scale 3.2, content 640x320, 160 rows of padding
        let frame = Frame::new(vec![128u8; 200 * 100 * 3], 200, 100, 0);
        let (tensor, lb) = letterbox(&frame, 640);
        assert_eq!(tensor.shape(), &[1, 3, 640, 640]);
        assert_relative_eq!(lb.scale, 3.2);
        assert_eq!((lb.pad_x, lb.pad_y), (0, 160));
        assert_relative_eq!(tensor[[0, 0, 0, 0]], PAD_VALUE);
        assert_relative_eq!(tensor[[0, 0, 200, 10]], 128.0 / 255.0);
    }

    #[test]
    fn test_letterbox_unmap_inverts_mapping() {
        let lb = Letterbox {
            scale: 2.0,
            pad_x: 0,
            pad_y: 40,
        };
        let (x, y) = lb.unmap(100.0, 140.0);
        assert_relative_eq!(x, 50.0);
        assert_relative_eq!(y, 50.0);
    }

    /// Six detections: the first is a confident 20x40 face at (50, 50),
    /// the second a confident 4x4 face at (10, 10), the rest background.
    fn rows() -> Vec<[f32; 5]> {
        let mut rows = vec![[50.0, 50.0, 20.0, 40.0, 0.9], [10.0, 10.0, 4.0, 4.0, 0.8]];
        rows.extend(std::iter::repeat([0.0, 0.0, 1.0, 1.0, 0.1]).take(4));
        rows
    }

    #[test]
    fn test_decode_detection_major_layout() {
        let data: Vec<f32> = rows().concat();
        let dets = decode(&data, &[1, 6, 5], 0.25, &identity()).unwrap();
        assert_eq!(dets.len(), 2);
        assert_eq!(dets[0].corners, [40.0, 30.0, 60.0, 70.0]);
        assert_eq!(dets[1].corners, [8.0, 8.0, 12.0, 12.0]);
    }

    #[test]
    fn test_decode_feature_major_layout() {
        let rows = rows();
        let data: Vec<f32> = (0..5).flat_map(|f| rows.iter().map(move |r| r[f])).collect();
        let dets = decode(&data, &[1, 5, 6], 0.25, &identity()).unwrap();
        assert_eq!(dets.len(), 2);
        assert_eq!(dets[0].corners, [40.0, 30.0, 60.0, 70.0]);
        assert_eq!(dets[1].corners, [8.0, 8.0, 12.0, 12.0]);
    }

    #[test]
    fn test_decode_applies_letterbox() {
        let data: Vec<f32> = rows().concat();
        let lb = Letterbox {
            scale: 2.0,
            pad_x: 10,
            pad_y: 0,
        };
        let dets = decode(&data, &[1, 6, 5], 0.85, &lb).unwrap();
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].corners, [15.0, 15.0, 25.0, 35.0]);
    }

    #[test]
    fn test_decode_rejects_bad_shape() {
        let err = decode(&[0.0; 4], &[1, 4], 0.25, &identity()).unwrap_err();
        assert!(matches!(err, DetectionError::Inference(_)));
    }

    #[test]
    fn test_suppress_keeps_highest_confidence() {
        let mut dets = vec![
            candidate([0.0, 0.0, 100.0, 100.0], 0.5),
            candidate([2.0, 2.0, 102.0, 102.0], 0.9),
        ];
        let kept = suppress(&mut dets, NMS_IOU_THRESH);
        assert_eq!(kept.len(), 1);
        assert_relative_eq!(kept[0].confidence, 0.9);
    }

    #[test]
    fn test_suppress_keeps_separate_faces() {
        let mut dets = vec![
            candidate([0.0, 0.0, 50.0, 50.0], 0.9),
            candidate([200.0, 200.0, 250.0, 250.0], 0.8),
        ];
        assert_eq!(suppress(&mut dets, NMS_IOU_THRESH).len(), 2);
    }

    #[test]
    fn test_suppress_empty() {
        assert!(suppress(&mut [], NMS_IOU_THRESH).is_empty());
    }

    #[test]
    fn test_iou() {
        let a = [0.0, 0.0, 100.0, 100.0];
        let b = [50.0, 0.0, 150.0, 100.0];
        assert_relative_eq!(iou(&a, &a), 1.0);
        assert_relative_eq!(iou(&a, &b), 5000.0 / 15000.0);
        assert_relative_eq!(iou(&a, &[200.0, 200.0, 210.0, 210.0]), 0.0);
    }

    #[test]
    fn test_missing_model_is_model_error() {
        let result = OnnxYoloFaceLocator::new(Path::new("/nonexistent/face.onnx"), 0.5);
        assert!(matches!(result, Err(DetectionError::Model(_))));
    }
}
