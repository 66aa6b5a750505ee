use std::collections::BTreeMap;
use std::time::Instant;

/// Observer for per-frame pipeline events.
///
/// Lives on the capture worker, so implementations only need `Send`.
pub trait PipelineLogger: Send {
    /// Called once per delivered frame, after detection.
    fn frame(&mut self, frames_seen: usize);

    /// Duration of a named stage for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Point-in-time value, e.g. faces per frame.
    fn metric(&mut self, name: &str, value: f64);

    fn info(&mut self, message: &str);

    /// End-of-run report. Default: no-op.
    fn summary(&self) {}
}

/// Discards everything. The default until a logger is set with
/// `LiveOverlayUseCase::with_logger`.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn frame(&mut self, _frames_seen: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Aggregates stage timings and metrics and reports through `log`.
///
/// A throughput line is logged every `every_frames` frames; `summary`
/// prints per-stage averages.
pub struct StdoutPipelineLogger {
    every_frames: usize,
    timings: BTreeMap<String, Stat>,
    metrics: BTreeMap<String, Stat>,
    started: Instant,
    frames: usize,
}

#[derive(Default, Clone, Copy, Debug)]
struct Stat {
    count: usize,
    total: f64,
}

impl Stat {
    fn push(&mut self, value: f64) {
        self.count += 1;
        self.total += value;
    }

    fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total / self.count as f64
        }
    }
}

impl StdoutPipelineLogger {
    pub fn new(every_frames: usize) -> Self {
        Self {
            every_frames: every_frames.max(1),
            timings: BTreeMap::new(),
            metrics: BTreeMap::new(),
            started: Instant::now(),
            frames: 0,
        }
    }

    /// Formatted report, or `None` before any frame was seen.
    pub fn summary_string(&self) -> Option<String> {
        if self.frames == 0 {
            return None;
        }
        let elapsed_s = self.started.elapsed().as_secs_f64();
        let mut lines = vec![format!(
            "Overlay summary ({} frames, {elapsed_s:.1}s):",
            self.frames
        )];
        for (stage, stat) in &self.timings {
            lines.push(format!(
                "  {stage:10}: avg {:6.1}ms over {} frames",
                stat.mean(),
                stat.count
            ));
        }
        for (name, stat) in &self.metrics {
            lines.push(format!("  {name}: avg {:.1}", stat.mean()));
        }
        if elapsed_s > 0.0 {
            lines.push(format!(
                "  Throughput: {:.1} fps",
                self.frames as f64 / elapsed_s
            ));
        }
        Some(lines.join("\n"))
    }

    pub fn mean_timing(&self, stage: &str) -> Option<f64> {
        self.timings.get(stage).map(Stat::mean)
    }

    pub fn mean_metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).map(Stat::mean)
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new(30)
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn frame(&mut self, frames_seen: usize) {
        self.frames = frames_seen;
        if frames_seen % self.every_frames == 0 {
            let elapsed = self.started.elapsed().as_secs_f64();
            let fps = if elapsed > 0.0 {
                frames_seen as f64 / elapsed
            } else {
                0.0
            };
            log::info!("Frames: {frames_seen} ({fps:.1} fps)");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics.entry(name.to_string()).or_default().push(value);
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
