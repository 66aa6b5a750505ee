use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use crossbeam_channel::Sender;

use crate::capture::domain::capture_error::CaptureError;
use crate::capture::domain::frame_source::{FrameHandler, FrameSource};
use crate::detection::domain::face_locator::FaceLocator;
use crate::shared::frame::Frame;
use crate::shared::geometry::NormalizedBox;

use super::pipeline_logger::{NullPipelineLogger, PipelineLogger};

/// What the capture worker hands to the UI thread for one frame.
#[derive(Debug, Clone)]
pub struct OverlayUpdate {
    pub frame_index: usize,
    pub detections: Vec<NormalizedBox>,
    /// The captured frame, when the UI asked for previews.
    pub preview: Option<Frame>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineConfig {
    /// Attach each frame to its update so the UI can draw the camera image.
    pub forward_frames: bool,
    /// Stop sending after this many frames.
    pub max_frames: Option<usize>,
}

type SharedLogger = Arc<Mutex<Box<dyn PipelineLogger>>>;

/// Wires a frame source to a face locator and ships the results to the UI.
///
/// Detection runs on the source's worker thread, one frame at a time.
/// Rendering is left to whoever owns the receiving end of the channel.
pub struct LiveOverlayUseCase {
    source: Box<dyn FrameSource>,
    locator: Box<dyn FaceLocator>,
    config: PipelineConfig,
    logger: Box<dyn PipelineLogger>,
}

impl LiveOverlayUseCase {
    pub fn new(
        source: Box<dyn FrameSource>,
        locator: Box<dyn FaceLocator>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            source,
            locator,
            config,
            logger: Box::new(NullPipelineLogger),
        }
    }

    pub fn with_logger(mut self, logger: Box<dyn PipelineLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Starts capture. Device errors are returned here, before any frame
    /// is delivered.
    pub fn start(self, ui_tx: Sender<OverlayUpdate>) -> Result<RunningOverlay, CaptureError> {
        let Self {
            mut source,
            locator,
            config,
            logger,
        } = self;
        let logger: SharedLogger = Arc::new(Mutex::new(logger));
        let handler = frame_handler(locator, config, ui_tx, logger.clone());
        source.on_frame(handler)?;
        Ok(RunningOverlay {
            source,
            logger,
            stopped: false,
        })
    }
}

fn frame_handler(
    mut locator: Box<dyn FaceLocator>,
    config: PipelineConfig,
    ui_tx: Sender<OverlayUpdate>,
    logger: SharedLogger,
) -> FrameHandler {
    let mut ui_tx = Some(ui_tx);
    let mut frames_seen = 0usize;

    Box::new(move |frame: Frame| {
        let Some(tx) = ui_tx.as_ref() else {
            return;
        };
        frames_seen += 1;

        let started = Instant::now();
        let located = locator.locate(&frame);
        let locate_ms = started.elapsed().as_secs_f64() * 1000.0;

        let mut logger = lock(&logger);
        logger.timing("locate", locate_ms);
        match located {
            Ok(detections) => {
                logger.metric("faces", detections.len() as f64);
                let update = OverlayUpdate {
                    frame_index: frame.index(),
                    detections,
                    preview: config.forward_frames.then_some(frame),
                };
                if tx.send(update).is_err() {
                    logger.info("Overlay receiver closed, no longer sending");
                    ui_tx = None;
                    return;
                }
            }
            Err(e) => log::warn!("Skipping frame {}: {e}", frame.index()),
        }
        logger.frame(frames_seen);

        if config.max_frames.is_some_and(|max| frames_seen >= max) {
            logger.info(&format!("Reached {frames_seen} frames, no longer sending"));
            ui_tx = None;
        }
    })
}

fn lock(logger: &SharedLogger) -> MutexGuard<'_, Box<dyn PipelineLogger>> {
    logger.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Handle to a started overlay pipeline. Dropping it stops capture.
pub struct RunningOverlay {
    source: Box<dyn FrameSource>,
    logger: SharedLogger,
    stopped: bool,
}

impl RunningOverlay {
    pub fn is_running(&self) -> bool {
        self.source.is_running()
    }

    /// Stops the source and reports the run summary once.
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        self.source.stop();
        lock(&self.logger).summary();
    }
}

impl Drop for RunningOverlay {
    fn drop(&mut self) {
        self.stop();
    }
}
