use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Receiver, Sender};

use purikura_core::capture::domain::capture_config::CaptureConfig;
use purikura_core::overlay::domain::overlay_renderer::OverlayRenderer;
use purikura_core::pipeline::live_overlay_use_case::{
    LiveOverlayUseCase, OverlayUpdate, PipelineConfig, RunningOverlay,
};
use purikura_core::pipeline::overlay_presenter::OverlayPresenter;
use purikura_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use purikura_core::pipeline::startup::{build_locator, load_decoration, SourceSelection};
use purikura_core::shared::geometry::Size;

pub enum StartupMessage {
    DownloadProgress(u64, u64),
    Started(LiveSession),
    Error(String),
    Cancelled,
}

/// Everything the UI thread needs once capture is up.
pub struct LiveSession {
    pub running: RunningOverlay,
    pub presenter: OverlayPresenter,
    pub updates: Receiver<OverlayUpdate>,
}

pub struct StartupParams {
    pub capture: CaptureConfig,
    pub asset: String,
    pub assets_dir: Option<PathBuf>,
    pub confidence: f64,
    pub view: Size,
}

/// Loads the decoration and the model, then opens the camera, all off the
/// UI thread.
pub fn spawn(params: StartupParams) -> (Receiver<StartupMessage>, Arc<AtomicBool>) {
    let (tx, rx) = crossbeam_channel::unbounded::<StartupMessage>();
    let cancelled = Arc::new(AtomicBool::new(false));
    let cancelled_clone = cancelled.clone();

    thread::spawn(move || match run_startup(&tx, &cancelled_clone, params) {
        Ok(Some(session)) => {
            let _ = tx.send(StartupMessage::Started(session));
        }
        Ok(None) => {
            let _ = tx.send(StartupMessage::Cancelled);
        }
        Err(e) => {
            let _ = tx.send(StartupMessage::Error(e.to_string()));
        }
    });

    (rx, cancelled)
}

fn run_startup(
    tx: &Sender<StartupMessage>,
    cancelled: &AtomicBool,
    params: StartupParams,
) -> Result<Option<LiveSession>, Box<dyn std::error::Error>> {
    let decoration = load_decoration(&params.asset, params.assets_dir.as_deref())?;

    let tx_dl = tx.clone();
    let locator = build_locator(
        params.confidence,
        Some(Box::new(move |dl, total| {
            let _ = tx_dl.send(StartupMessage::DownloadProgress(dl, total));
        })),
    )?;

    if cancelled.load(Ordering::Relaxed) {
        return Ok(None);
    }

    let (updates_tx, updates) = crossbeam_channel::unbounded();
    let running = LiveOverlayUseCase::new(
        SourceSelection::Camera(params.capture).into_source(),
        locator,
        PipelineConfig {
            forward_frames: true,
            max_frames: None,
        },
    )
    .with_logger(Box::new(StdoutPipelineLogger::default()))
    .start(updates_tx)?;

    Ok(Some(LiveSession {
        running,
        presenter: OverlayPresenter::new(OverlayRenderer::new(decoration), params.view),
        updates,
    }))
}
