use std::path::Path;

use crate::capture::domain::capture_config::CaptureConfig;
use crate::capture::domain::capture_error::CaptureError;
use crate::capture::domain::frame_source::{FrameHandler, FrameSource};

use super::ffmpeg_capture_worker::{CaptureWorker, InputOpener};

/// Live camera capture through libavdevice.
///
/// The backend is picked per platform: `avfoundation` on macOS, `v4l2` on
/// Linux and `dshow` on Windows.
pub struct FfmpegCameraSource {
    config: CaptureConfig,
    worker: Option<CaptureWorker>,
}

impl FfmpegCameraSource {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            worker: None,
        }
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }
}

impl FrameSource for FfmpegCameraSource {
    fn on_frame(&mut self, handler: FrameHandler) -> Result<(), CaptureError> {
        if self.is_running() {
            return Err(CaptureError::AlreadyRunning);
        }
        let device = resolve_device(backend_name(), self.config.device.as_deref())?;
        let options = capture_options(&self.config);
        log::info!(
            "Opening camera {device} via {} (preset {})",
            backend_name(),
            self.config.preset
        );

        let opener: InputOpener = Box::new(move || open_device(&device, options));
        self.worker = Some(CaptureWorker::spawn(opener, false, handler)?);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(mut worker) = self.worker.take() {
            worker.stop();
            log::info!("Camera capture stopped");
        }
    }

    fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| w.is_running())
    }
}

impl Drop for FfmpegCameraSource {
    fn drop(&mut self) {
        self.stop();
    }
}

fn backend_name() -> &'static str {
    if cfg!(target_os = "macos") {
        "avfoundation"
    } else if cfg!(target_os = "windows") {
        "dshow"
    } else {
        "v4l2"
    }
}

/// Chooses the device string for `backend`, failing when no camera can
/// exist under it.
fn resolve_device(backend: &str, configured: Option<&str>) -> Result<String, CaptureError> {
    match (backend, configured) {
        ("v4l2", device) => {
            let device = device.unwrap_or("/dev/video0");
            if Path::new(device).exists() {
                Ok(device.to_string())
            } else {
                Err(CaptureError::DeviceUnavailable(format!(
                    "{device} does not exist"
                )))
            }
        }
        ("avfoundation", device) => Ok(device.unwrap_or("0").to_string()),
        ("dshow", Some(device)) if !device.starts_with("video=") => Ok(format!("video={device}")),
        (_, Some(device)) => Ok(device.to_string()),
        (backend, None) => Err(CaptureError::DeviceUnavailable(format!(
            "{backend} has no default camera; pass a device name"
        ))),
    }
}

fn capture_options(config: &CaptureConfig) -> Vec<(String, String)> {
    let mut options = Vec::new();
    if let Some((w, h)) = config.preset.video_size() {
        options.push(("video_size".to_string(), format!("{w}x{h}")));
    }
    if let Some(fps) = config.framerate {
        options.push(("framerate".to_string(), fps.to_string()));
    }
    options
}

fn open_device(
    device: &str,
    options: Vec<(String, String)>,
) -> Result<ffmpeg_next::format::context::Input, CaptureError> {
    ffmpeg_next::init().map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?;

    let backend = backend_name();
    let format = find_backend(backend).ok_or_else(|| {
        CaptureError::DeviceUnavailable(format!("capture backend {backend} is not available"))
    })?;

    let mut dict = ffmpeg_next::Dictionary::new();
    for (key, value) in &options {
        dict.set(key, value);
    }

    let path = device.to_string();
    let context = ffmpeg_next::format::open_with(&path, &format, dict)
        .map_err(|e| open_error(device, e))?;

    match context {
        ffmpeg_next::format::context::Context::Input(input) => Ok(input),
        ffmpeg_next::format::context::Context::Output(_) => Err(CaptureError::DeviceOpenFailure {
            device: device.to_string(),
            source: "backend returned an output context".into(),
        }),
    }
}

/// Registered libavdevice video input named `backend`.
///
/// With no video devices compiled in, the iterator yields a null format
/// (forever), so iteration stops at the first null entry.
fn find_backend(backend: &str) -> Option<ffmpeg_next::Format> {
    ffmpeg_next::device::input::video()
        .take_while(|f| match f {
            // SAFETY: only the pointer value is inspected, never dereferenced.
            ffmpeg_next::Format::Input(input) => unsafe { !input.as_ptr().is_null() },
            ffmpeg_next::Format::Output(_) => false,
        })
        .find(|f| f.name() == backend)
}

/// "No such device" failures mean there is no camera to open; anything else
/// is a device that exists but refused to open.
fn open_error(device: &str, e: ffmpeg_next::Error) -> CaptureError {
    use ffmpeg_next::error::{EIO, ENODEV, ENOENT};
    match e {
        ffmpeg_next::Error::Other { errno } if [ENOENT, ENODEV, EIO].contains(&errno) => {
            CaptureError::DeviceUnavailable(format!("{device}: {e}"))
        }
        _ => CaptureError::DeviceOpenFailure {
            device: device.to_string(),
            source: Box::new(e),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::domain::capture_config::CapturePreset;
    use rstest::rstest;

    #[test]
    fn test_missing_v4l2_device_is_unavailable() {
        let err = resolve_device("v4l2", Some("/dev/video-does-not-exist")).unwrap_err();
        assert!(matches!(err, CaptureError::DeviceUnavailable(_)));
    }

    #[test]
    fn test_dshow_without_device_is_unavailable() {
        let err = resolve_device("dshow", None).unwrap_err();
        assert!(matches!(err, CaptureError::DeviceUnavailable(_)));
    }

    #[test]
    fn test_avfoundation_defaults_to_first_camera() {
        assert_eq!(resolve_device("avfoundation", None).unwrap(), "0");
    }

    #[test]
    fn test_configured_device_is_passed_through() {
        assert_eq!(
            resolve_device("dshow", Some("video=Integrated Camera")).unwrap(),
            "video=Integrated Camera"
        );
        assert_eq!(
            resolve_device("dshow", Some("Integrated Camera")).unwrap(),
            "video=Integrated Camera"
        );
    }

    #[rstest]
    #[case(ffmpeg_next::error::ENOENT)]
    #[case(ffmpeg_next::error::ENODEV)]
    #[case(ffmpeg_next::error::EIO)]
    fn test_no_such_device_opens_as_unavailable(#[case] errno: i32) {
        let err = open_error("0", ffmpeg_next::Error::Other { errno });
        assert!(matches!(err, CaptureError::DeviceUnavailable(_)));
    }

    #[rstest]
    #[case(ffmpeg_next::Error::Other { errno: ffmpeg_next::error::EACCES })]
    #[case(ffmpeg_next::Error::InvalidData)]
    fn test_other_open_errors_are_open_failures(#[case] error: ffmpeg_next::Error) {
        let err = open_error("video=Integrated Camera", error);
        match err {
            CaptureError::DeviceOpenFailure { device, .. } => {
                assert_eq!(device, "video=Integrated Camera");
            }
            other => panic!("expected open failure, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_backend_is_not_found() {
        ffmpeg_next::init().unwrap();
        assert!(find_backend("no-such-backend").is_none());
    }

    #[test]
    fn test_high_preset_sets_no_video_size() {
        let options = capture_options(&CaptureConfig::default());
        assert!(options.is_empty());
    }

    #[test]
    fn test_low_preset_and_framerate_options() {
        let config = CaptureConfig {
            preset: CapturePreset::Low,
            device: None,
            framerate: Some(15),
        };
        let options = capture_options(&config);
        assert_eq!(
            options,
            vec![
                ("video_size".to_string(), "352x288".to_string()),
                ("framerate".to_string(), "15".to_string()),
            ]
        );
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_on_frame_without_camera_reports_unavailable() {
        let config = CaptureConfig::default().with_device("/dev/video-does-not-exist");
        let mut source = FfmpegCameraSource::new(config);
        let err = source.on_frame(Box::new(|_| {})).unwrap_err();
        assert!(matches!(err, CaptureError::DeviceUnavailable(_)));
        assert!(!source.is_running());
    }
}
