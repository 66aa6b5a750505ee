use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use crossbeam_channel::unbounded;

use purikura_core::capture::domain::capture_config::{CaptureConfig, CapturePreset};
use purikura_core::detection::infrastructure::onnx_yolo_face_locator::DEFAULT_CONFIDENCE;
use purikura_core::overlay::domain::overlay_renderer::OverlayRenderer;
use purikura_core::overlay::infrastructure::cpu_compositor::CpuCompositor;
use purikura_core::pipeline::live_overlay_use_case::{LiveOverlayUseCase, PipelineConfig};
use purikura_core::pipeline::overlay_presenter::OverlayPresenter;
use purikura_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use purikura_core::pipeline::startup::{build_locator, load_decoration, SourceSelection};
use purikura_core::shared::constants::{
    DECORATION_ASSET_NAME, DEFAULT_VIEW_HEIGHT, DEFAULT_VIEW_WIDTH, VIDEO_EXTENSIONS,
};
use purikura_core::shared::geometry::Size;

/// Live face overlay: draws a decoration over every face the camera sees.
#[derive(Parser)]
#[command(name = "purikura")]
struct Cli {
    /// Camera device (backend-specific; defaults to the system camera).
    #[arg(long, conflicts_with = "input")]
    device: Option<String>,

    /// Replay a video file instead of opening a camera.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Capture preset: high, medium or low.
    #[arg(long, default_value = "high")]
    preset: CapturePreset,

    /// Decoration image, by name or path.
    #[arg(long, default_value = DECORATION_ASSET_NAME)]
    asset: String,

    /// Extra directory searched first for the decoration.
    #[arg(long)]
    assets_dir: Option<PathBuf>,

    /// View width in points.
    #[arg(long, default_value_t = DEFAULT_VIEW_WIDTH)]
    view_width: f64,

    /// View height in points.
    #[arg(long, default_value_t = DEFAULT_VIEW_HEIGHT)]
    view_height: f64,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long, default_value_t = DEFAULT_CONFIDENCE)]
    confidence: f64,

    /// Stop after this many frames.
    #[arg(long)]
    max_frames: Option<usize>,

    /// Write composited PNG snapshots into this directory.
    #[arg(long)]
    snapshot_dir: Option<PathBuf>,

    /// Snapshot every Nth frame.
    #[arg(long, default_value = "30")]
    snapshot_every: usize,

    /// Decode --input as fast as possible instead of at its own frame rate.
    #[arg(long)]
    no_realtime: bool,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let decoration = load_decoration(&cli.asset, cli.assets_dir.as_deref())?;
    let locator = build_locator(cli.confidence, Some(Box::new(download_progress)))?;
    eprintln!();

    let view = Size::new(cli.view_width, cli.view_height);
    let config = PipelineConfig {
        forward_frames: cli.snapshot_dir.is_some(),
        max_frames: cli.max_frames,
    };
    let (tx, rx) = unbounded();
    let mut running = LiveOverlayUseCase::new(source_selection(&cli).into_source(), locator, config)
        .with_logger(Box::new(StdoutPipelineLogger::default()))
        .start(tx)?;

    let mut presenter = OverlayPresenter::new(OverlayRenderer::new(decoration), view);
    let snapshots = cli
        .snapshot_dir
        .as_deref()
        .map(|dir| (dir, CpuCompositor::new(view)));

    // Blocks until the worker drops its sender: end of file, --max-frames,
    // or the device going away.
    for update in rx.iter() {
        presenter.apply(&update);
        log::debug!(
            "Frame {}: {} faces, {} regions",
            update.frame_index,
            update.detections.len(),
            presenter.surface().len()
        );

        if let Some((dir, compositor)) = &snapshots {
            if update.frame_index % cli.snapshot_every == 0 {
                let path = snapshot_path(dir, update.frame_index);
                compositor
                    .compose(update.preview.as_ref(), presenter.surface())
                    .save(&path)?;
                log::info!("Snapshot: {}", path.display());
            }
        }
    }
    running.stop();

    log::info!(
        "Rendered {} frames, {} regions on screen",
        presenter.updates_applied(),
        presenter.surface().len()
    );
    Ok(())
}

fn source_selection(cli: &Cli) -> SourceSelection {
    match &cli.input {
        Some(path) => SourceSelection::File {
            path: path.clone(),
            realtime: !cli.no_realtime,
        },
        None => {
            let mut config = CaptureConfig::default().with_preset(cli.preset);
            if let Some(device) = &cli.device {
                config = config.with_device(device.clone());
            }
            SourceSelection::Camera(config)
        }
    }
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(input) = &cli.input {
        if !input.exists() {
            return Err(format!("Input file not found: {}", input.display()).into());
        }
        if !is_video(input) {
            return Err(format!(
                "Input must be a video file ({}), got {}",
                VIDEO_EXTENSIONS.join(", "),
                input.display()
            )
            .into());
        }
    }
    if !(0.0..=1.0).contains(&cli.confidence) {
        return Err(format!(
            "Confidence must be between 0.0 and 1.0, got {}",
            cli.confidence
        )
        .into());
    }
    if !(cli.view_width > 0.0 && cli.view_height > 0.0) {
        return Err(format!(
            "View size must be positive, got {}x{}",
            cli.view_width, cli.view_height
        )
        .into());
    }
    if cli.snapshot_every == 0 {
        return Err("Snapshot interval must be at least 1".into());
    }
    if cli.max_frames == Some(0) {
        return Err("Max frames must be at least 1".into());
    }
    if let Some(dir) = &cli.snapshot_dir {
        if !dir.is_dir() {
            return Err(format!("Snapshot directory not found: {}", dir.display()).into());
        }
    }
    Ok(())
}

fn is_video(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn snapshot_path(dir: &Path, frame_index: usize) -> PathBuf {
    dir.join(format!("frame_{frame_index:06}.png"))
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading face detection model... {pct}%");
    } else {
        eprint!("\rDownloading face detection model... {downloaded} bytes");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["purikura"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&[]);
        assert_eq!(cli.preset, CapturePreset::High);
        assert_eq!(cli.asset, DECORATION_ASSET_NAME);
        assert_eq!(cli.view_width, DEFAULT_VIEW_WIDTH);
        assert_eq!(cli.view_height, DEFAULT_VIEW_HEIGHT);
        assert_eq!(cli.snapshot_every, 30);
        assert!(!cli.no_realtime);
        assert!(validate(&cli).is_ok());
    }

    #[test]
    fn test_preset_is_parsed() {
        assert_eq!(parse(&["--preset", "low"]).preset, CapturePreset::Low);
        assert!(Cli::try_parse_from(["purikura", "--preset", "ultra"]).is_err());
    }

    #[test]
    fn test_device_and_input_conflict() {
        assert!(Cli::try_parse_from(["purikura", "--device", "0", "--input", "a.mp4"]).is_err());
    }

    #[rstest]
    #[case(&["--confidence", "1.5"])]
    #[case(&["--view-width", "0"])]
    #[case(&["--snapshot-every", "0"])]
    #[case(&["--max-frames", "0"])]
    #[case(&["--input", "/nonexistent/clip.mp4"])]
    #[case(&["--snapshot-dir", "/nonexistent/snapshots"])]
    fn test_invalid_arguments_are_rejected(#[case] args: &[&str]) {
        assert!(validate(&parse(args)).is_err());
    }

    #[test]
    fn test_camera_selection_carries_device_and_preset() {
        let cli = parse(&["--device", "/dev/video2", "--preset", "medium"]);
        match source_selection(&cli) {
            SourceSelection::Camera(config) => {
                assert_eq!(config.device.as_deref(), Some("/dev/video2"));
                assert_eq!(config.preset, CapturePreset::Medium);
            }
            other => panic!("expected camera, got {other:?}"),
        }
    }

    #[test]
    fn test_file_selection_honors_no_realtime() {
        let cli = parse(&["--input", "clip.mp4", "--no-realtime"]);
        match source_selection(&cli) {
            SourceSelection::File { path, realtime } => {
                assert_eq!(path, PathBuf::from("clip.mp4"));
                assert!(!realtime);
            }
            other => panic!("expected file, got {other:?}"),
        }
    }

    #[rstest]
    #[case("clip.mp4", true)]
    #[case("clip.MOV", true)]
    #[case("photo.png", false)]
    #[case("noext", false)]
    fn test_is_video(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(is_video(Path::new(name)), expected);
    }

    #[test]
    fn test_snapshot_names_are_zero_padded() {
        assert_eq!(
            snapshot_path(Path::new("out"), 42),
            PathBuf::from("out/frame_000042.png")
        );
    }
}
