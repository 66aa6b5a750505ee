use std::path::{Path, PathBuf};

use crate::capture::domain::capture_error::CaptureError;
use crate::capture::domain::frame_source::{FrameHandler, FrameSource};

use super::ffmpeg_capture_worker::{CaptureWorker, InputOpener};

/// Replays a video file as if it were a live camera.
///
/// With `realtime` on, frames are delivered at the file's own pace;
/// otherwise as fast as they decode.
pub struct FfmpegFileSource {
    path: PathBuf,
    realtime: bool,
    worker: Option<CaptureWorker>,
}

impl FfmpegFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            realtime: true,
            worker: None,
        }
    }

    pub fn with_realtime(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FrameSource for FfmpegFileSource {
    fn on_frame(&mut self, handler: FrameHandler) -> Result<(), CaptureError> {
        if self.is_running() {
            return Err(CaptureError::AlreadyRunning);
        }
        if !self.path.exists() {
            return Err(CaptureError::DeviceUnavailable(format!(
                "video file not found: {}",
                self.path.display()
            )));
        }

        let path = self.path.clone();
        log::info!("Replaying {} as a live source", path.display());
        let opener: InputOpener = Box::new(move || {
            ffmpeg_next::init().map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?;
            ffmpeg_next::format::input(&path).map_err(|e| CaptureError::DeviceOpenFailure {
                device: path.display().to_string(),
                source: Box::new(e),
            })
        });
        self.worker = Some(CaptureWorker::spawn(opener, self.realtime, handler)?);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(mut worker) = self.worker.take() {
            worker.stop();
        }
    }

    fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| w.is_running())
    }
}

impl Drop for FfmpegFileSource {
    fn drop(&mut self) {
        self.stop();
    }
}
