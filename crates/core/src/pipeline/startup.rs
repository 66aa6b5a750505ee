use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::capture::domain::capture_config::CaptureConfig;
use crate::capture::domain::capture_error::CaptureError;
use crate::capture::domain::frame_source::FrameSource;
use crate::capture::infrastructure::ffmpeg_camera_source::FfmpegCameraSource;
use crate::capture::infrastructure::ffmpeg_file_source::FfmpegFileSource;
use crate::detection::domain::face_locator::{DetectionError, FaceLocator};
use crate::detection::infrastructure::model_resolver::{self, ModelResolveError, ProgressFn};
use crate::detection::infrastructure::onnx_yolo_face_locator::OnnxYoloFaceLocator;
use crate::overlay::domain::decorative_image::DecorativeImage;
use crate::overlay::infrastructure::image_asset_loader::{AssetError, ImageAssetLoader};
use crate::shared::constants::{YOLO_MODEL_NAME, YOLO_MODEL_URL};

/// Anything that keeps the overlay from starting.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Detection(#[from] DetectionError),
    #[error(transparent)]
    Asset(#[from] AssetError),
    #[error(transparent)]
    Model(#[from] ModelResolveError),
}

/// Where frames come from.
#[derive(Debug, Clone)]
pub enum SourceSelection {
    Camera(CaptureConfig),
    /// A video file replayed as a camera.
    File { path: PathBuf, realtime: bool },
}

impl SourceSelection {
    /// Nothing is opened until the pipeline starts.
    pub fn into_source(self) -> Box<dyn FrameSource> {
        match self {
            SourceSelection::Camera(config) => Box::new(FfmpegCameraSource::new(config)),
            SourceSelection::File { path, realtime } => {
                Box::new(FfmpegFileSource::new(path).with_realtime(realtime))
            }
        }
    }
}

/// Loads the decoration, searching `extra_dir` before the default asset
/// directories.
pub fn load_decoration(name: &str, extra_dir: Option<&Path>) -> Result<DecorativeImage, StartupError> {
    let mut loader = ImageAssetLoader::with_default_dirs();
    if let Some(dir) = extra_dir {
        loader = loader.prepend_dir(dir);
    }
    let image = loader.load(name)?;
    let (w, h) = image.dimensions();
    log::info!("Loaded decoration {name} ({w}x{h})");
    Ok(image)
}

/// Resolves the face model (downloading it on first run) and opens an
/// inference session.
pub fn build_locator(
    confidence: f64,
    progress: Option<ProgressFn>,
) -> Result<Box<dyn FaceLocator>, StartupError> {
    log::info!("Resolving model: {YOLO_MODEL_NAME}");
    let bundled = bundled_models_dir();
    let model_path =
        model_resolver::resolve(YOLO_MODEL_NAME, YOLO_MODEL_URL, bundled.as_deref(), progress)?;
    Ok(Box::new(OnnxYoloFaceLocator::new(&model_path, confidence)?))
}

/// `models/` next to the executable, for packaged builds.
fn bundled_models_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("models")))
}
