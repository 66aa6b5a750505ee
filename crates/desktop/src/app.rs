use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Receiver;
use iced::widget::image::Handle;
use iced::widget::{button, column, container, pick_list, row, slider, text};
use iced::{ContentFit, Element, Length, Subscription, Task, Theme};

use purikura_core::overlay::infrastructure::cpu_compositor::CpuCompositor;
use purikura_core::shared::frame::Frame;
use purikura_core::shared::geometry::Size;

use crate::settings::{Preset, Settings};
use crate::workers::startup_worker::{self, LiveSession, StartupMessage, StartupParams};

/// Roughly one UI frame at 60 Hz.
const TICK: Duration = Duration::from_millis(16);

#[derive(Debug, Clone)]
pub enum Message {
    Tick,
    Start,
    Stop,
    SelectAsset,
    AssetSelected(Option<PathBuf>),
    PresetChanged(Preset),
    ConfidenceChanged(u32),
    ConfidenceReleased,
    DarkModeToggled,
}

enum Status {
    Idle,
    Starting {
        rx: Receiver<StartupMessage>,
        cancelled: Arc<AtomicBool>,
        progress: Option<(u64, u64)>,
    },
    Live(LiveSession),
    Failed(String),
}

pub struct App {
    settings: Settings,
    status: Status,
    compositor: CpuCompositor,
    /// Most recent camera frame, kept so overlays redraw on top of it.
    last_frame: Option<Frame>,
    preview: Option<Handle>,
}

impl App {
    pub fn new() -> (Self, Task<Message>) {
        let settings = Settings::load();
        let compositor = CpuCompositor::new(view_size(&settings));
        (
            Self {
                settings,
                status: Status::Idle,
                compositor,
                last_frame: None,
                preview: None,
            },
            Task::done(Message::Start),
        )
    }

    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Tick => self.poll(),
            Message::Start => self.start(),
            Message::Stop => {
                self.stop();
                self.status = Status::Idle;
            }
            Message::SelectAsset => {
                return Task::perform(
                    async {
                        rfd::AsyncFileDialog::new()
                            .set_title("Select decoration image")
                            .add_filter("Images", &["png", "jpg", "jpeg", "webp"])
                            .pick_file()
                            .await
                            .map(|h| h.path().to_path_buf())
                    },
                    Message::AssetSelected,
                );
            }
            Message::AssetSelected(Some(path)) => {
                self.settings.asset = path.to_string_lossy().to_string();
                self.settings.save();
                self.restart();
            }
            Message::AssetSelected(None) => {}
            Message::PresetChanged(preset) => {
                self.settings.preset = preset;
                self.settings.save();
                self.restart();
            }
            Message::ConfidenceChanged(val) => {
                self.settings.confidence = val;
                self.settings.save();
            }
            // The locator's threshold is fixed once built.
            Message::ConfidenceReleased => self.restart(),
            Message::DarkModeToggled => {
                self.settings.dark_mode = !self.settings.dark_mode;
                self.settings.save();
            }
        }
        Task::none()
    }

    fn start(&mut self) {
        self.stop();
        let (rx, cancelled) = startup_worker::spawn(StartupParams {
            capture: self.settings.capture_config(),
            asset: self.settings.asset.clone(),
            assets_dir: None,
            confidence: self.settings.confidence_threshold(),
            view: view_size(&self.settings),
        });
        self.status = Status::Starting {
            rx,
            cancelled,
            progress: None,
        };
    }

    fn restart(&mut self) {
        if !matches!(self.status, Status::Idle) {
            self.start();
        }
    }

    fn stop(&mut self) {
        match std::mem::replace(&mut self.status, Status::Idle) {
            Status::Starting { cancelled, .. } => cancelled.store(true, Ordering::Relaxed),
            Status::Live(mut session) => session.running.stop(),
            Status::Idle | Status::Failed(_) => {}
        }
        self.last_frame = None;
        self.preview = None;
    }

    fn poll(&mut self) {
        let mut next = None;
        match &mut self.status {
            Status::Starting { rx, progress, .. } => {
                for msg in rx.try_iter() {
                    match msg {
                        StartupMessage::DownloadProgress(dl, total) => {
                            *progress = Some((dl, total))
                        }
                        StartupMessage::Started(session) => next = Some(Status::Live(session)),
                        StartupMessage::Error(e) => {
                            log::error!("Startup failed: {e}");
                            next = Some(Status::Failed(e));
                        }
                        StartupMessage::Cancelled => next = Some(Status::Idle),
                    }
                }
            }
            Status::Live(session) => {
                let applied_before = session.presenter.updates_applied();
                if let Some(frame) = session.presenter.drain(&session.updates) {
                    self.last_frame = Some(frame);
                }
                if session.presenter.updates_applied() != applied_before {
                    let canvas = self
                        .compositor
                        .compose(self.last_frame.as_ref(), session.presenter.surface());
                    let (w, h) = canvas.dimensions();
                    self.preview = Some(Handle::from_rgba(w, h, canvas.into_raw()));
                }
                if !session.running.is_running() && session.updates.is_empty() {
                    next = Some(Status::Failed("Camera stopped delivering frames".into()));
                }
            }
            Status::Idle | Status::Failed(_) => {}
        }
        if let Some(status) = next {
            self.status = status;
        }
    }

    pub fn view(&self) -> Element<'_, Message> {
        let preview: Element<'_, Message> = match &self.preview {
            Some(handle) => iced::widget::image(handle.clone())
                .content_fit(ContentFit::Contain)
                .width(Length::Fill)
                .height(Length::Fill)
                .into(),
            None => container(text(self.placeholder()).size(14))
                .center(Length::Fill)
                .into(),
        };

        let toggle = match self.status {
            Status::Idle | Status::Failed(_) => button(text("Start")).on_press(Message::Start),
            Status::Starting { .. } | Status::Live(_) => {
                button(text("Stop")).on_press(Message::Stop)
            }
        };

        let controls = row![
            toggle,
            pick_list(Preset::ALL, Some(self.settings.preset), Message::PresetChanged),
            button(text("Decoration...")).on_press(Message::SelectAsset),
            button(text(if self.settings.dark_mode { "Light" } else { "Dark" }))
                .on_press(Message::DarkModeToggled)
                .style(button::text),
        ]
        .spacing(8);

        let confidence = row![
            text(format!("Confidence {}%", self.settings.confidence)).size(12),
            slider(5..=95, self.settings.confidence, Message::ConfidenceChanged)
                .on_release(Message::ConfidenceReleased),
        ]
        .spacing(8);

        column![
            container(preview).height(Length::Fill),
            controls,
            confidence,
            text(self.status_line()).size(12),
        ]
        .spacing(8)
        .padding(8)
        .into()
    }

    fn placeholder(&self) -> String {
        match &self.status {
            Status::Failed(e) => e.clone(),
            Status::Starting { .. } => "Opening camera...".into(),
            _ => "Camera is off".into(),
        }
    }

    fn status_line(&self) -> String {
        match &self.status {
            Status::Idle => "Idle".into(),
            Status::Starting {
                progress: Some((dl, total)),
                ..
            } if *total > 0 => format!(
                "Downloading face detection model... {}%",
                dl * 100 / total
            ),
            Status::Starting { .. } => "Starting...".into(),
            Status::Live(session) => format!(
                "Live: {} frames, {} regions",
                session.presenter.updates_applied(),
                session.presenter.surface().len()
            ),
            Status::Failed(e) => format!("Error: {e}"),
        }
    }

    pub fn theme(&self) -> Theme {
        if self.settings.dark_mode {
            Theme::Dark
        } else {
            Theme::Light
        }
    }

    pub fn subscription(&self) -> Subscription<Message> {
        match self.status {
            Status::Starting { .. } | Status::Live(_) => {
                iced::time::every(TICK).map(|_| Message::Tick)
            }
            Status::Idle | Status::Failed(_) => Subscription::none(),
        }
    }
}

/// Window size in logical pixels for the configured view.
pub fn view_size(settings: &Settings) -> Size {
    Size::new(settings.view_width as f64, settings.view_height as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app(status: Status) -> App {
        let settings = Settings {
            asset: "no-such-decoration.png".into(),
            ..Settings::default()
        };
        App {
            compositor: CpuCompositor::new(view_size(&settings)),
            settings,
            status,
            last_frame: None,
            preview: None,
        }
    }

    #[test]
    fn test_confidence_release_restarts_active_session() {
        let mut app = app(Status::Failed("camera lost".into()));
        let _ = app.update(Message::ConfidenceReleased);
        assert!(matches!(app.status, Status::Starting { .. }));
        app.stop();
    }

    #[test]
    fn test_confidence_release_leaves_idle_app_alone() {
        let mut app = app(Status::Idle);
        let _ = app.update(Message::ConfidenceReleased);
        assert!(matches!(app.status, Status::Idle));
    }
}
