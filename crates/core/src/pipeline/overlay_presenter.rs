use crossbeam_channel::Receiver;

use crate::overlay::domain::overlay_renderer::OverlayRenderer;
use crate::overlay::domain::render_surface::RenderSurface;
use crate::shared::frame::Frame;
use crate::shared::geometry::Size;

use super::live_overlay_use_case::OverlayUpdate;

/// UI-thread end of the overlay pipeline.
///
/// Owns the surface the UI draws from. Every received update is rendered,
/// in the order it arrived.
pub struct OverlayPresenter {
    renderer: OverlayRenderer,
    surface: RenderSurface,
    view: Size,
    updates_applied: usize,
}

impl OverlayPresenter {
    pub fn new(renderer: OverlayRenderer, view: Size) -> Self {
        Self {
            renderer,
            surface: RenderSurface::new(),
            view,
            updates_applied: 0,
        }
    }

    pub fn apply(&mut self, update: &OverlayUpdate) {
        self.renderer
            .render(&mut self.surface, &update.detections, self.view);
        self.updates_applied += 1;
    }

    /// Applies everything queued on `rx` without blocking and returns the
    /// newest preview frame among them, if any carried one.
    pub fn drain(&mut self, rx: &Receiver<OverlayUpdate>) -> Option<Frame> {
        let mut latest_preview = None;
        for update in rx.try_iter() {
            self.apply(&update);
            if update.preview.is_some() {
                latest_preview = update.preview;
            }
        }
        latest_preview
    }

    pub fn surface(&self) -> &RenderSurface {
        &self.surface
    }

    pub fn view(&self) -> Size {
        self.view
    }

    /// Takes effect from the next update on.
    pub fn set_view(&mut self, view: Size) {
        self.view = view;
    }

    pub fn updates_applied(&self) -> usize {
        self.updates_applied
    }
}
