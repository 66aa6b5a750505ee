pub const YOLO_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const YOLO_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

/// Bitmap drawn over every detected face.
pub const DECORATION_ASSET_NAME: &str = "Gaha_Face.png";

/// Face boxes are grown by this factor before drawing.
pub const FACE_SCALE: f64 = 1.2;

/// The decoration starts this far above the face frame...
pub const DECORATION_TOP_OFFSET: f64 = 30.0;
/// ...and is this much taller than it.
pub const DECORATION_EXTRA_HEIGHT: f64 = 40.0;

pub const BORDER_WIDTH: f64 = 2.0;

/// Default view size in points (portrait phone screen).
pub const DEFAULT_VIEW_WIDTH: f64 = 390.0;
pub const DEFAULT_VIEW_HEIGHT: f64 = 844.0;

pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "mkv", "avi", "webm"];
