use thiserror::Error;

use crate::shared::frame::Frame;
use crate::shared::geometry::NormalizedBox;

#[derive(Error, Debug)]
pub enum DetectionError {
    #[error("face model could not be loaded: {0}")]
    Model(String),
    #[error("face detection failed: {0}")]
    Inference(String),
}

/// Finds faces in a single frame.
///
/// Boxes are normalized with a bottom-left origin. Implementations keep no
/// memory of earlier frames; `&mut self` only allows reusing buffers and
/// sessions.
pub trait FaceLocator: Send {
    fn locate(&mut self, frame: &Frame) -> Result<Vec<NormalizedBox>, DetectionError>;
}
