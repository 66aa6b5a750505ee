use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

use crate::overlay::domain::render_surface::{Color, DrawRegion, RegionStyle, RenderSurface};
use crate::shared::frame::Frame;
use crate::shared::geometry::{Rect, Size};

/// Decorations larger than this (per side, in pixels) are skipped rather
/// than resampled; they would be far outside any sane view.
const MAX_REGION_SIDE: f64 = 8192.0;

/// Flattens a preview frame and a [`RenderSurface`] into one RGBA image.
///
/// The frame fills the view the way an aspect-fill preview does (scaled to
/// cover, center-cropped), then regions are painted in order and clipped to
/// the canvas.
pub struct CpuCompositor {
    width: u32,
    height: u32,
}

impl CpuCompositor {
    pub fn new(view: Size) -> Self {
        Self {
            width: view.width.round().max(1.0) as u32,
            height: view.height.round().max(1.0) as u32,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn compose(&self, frame: Option<&Frame>, surface: &RenderSurface) -> RgbaImage {
        let mut canvas = match frame.and_then(|f| self.aspect_fill(f)) {
            Some(background) => background,
            None => RgbaImage::from_pixel(self.width, self.height, Rgba([0, 0, 0, 255])),
        };
        for region in surface.regions() {
            paint(&mut canvas, region);
        }
        canvas
    }

    fn aspect_fill(&self, frame: &Frame) -> Option<RgbaImage> {
        let rgb = frame.to_rgb_image()?;
        let (fw, fh) = rgb.dimensions();
        if fw == 0 || fh == 0 {
            return None;
        }
        let scale = (self.width as f64 / fw as f64).max(self.height as f64 / fh as f64);
        let scaled_w = ((fw as f64 * scale).round() as u32).max(self.width);
        let scaled_h = ((fh as f64 * scale).round() as u32).max(self.height);

        let rgba = image::DynamicImage::ImageRgb8(rgb).into_rgba8();
        let scaled = imageops::resize(&rgba, scaled_w, scaled_h, FilterType::Triangle);
        let x = (scaled_w - self.width) / 2;
        let y = (scaled_h - self.height) / 2;
        Some(imageops::crop_imm(&scaled, x, y, self.width, self.height).to_image())
    }
}

fn paint(canvas: &mut RgbaImage, region: &DrawRegion) {
    match &region.style {
        RegionStyle::Border { width, color } => stroke(canvas, &region.rect, *width, *color),
        RegionStyle::Image(img) => {
            let rect = &region.rect;
            let w = rect.width.round();
            let h = rect.height.round();
            if w < 1.0 || h < 1.0 || w > MAX_REGION_SIDE || h > MAX_REGION_SIDE {
                return;
            }
            let stamp = imageops::resize(img.pixels(), w as u32, h as u32, FilterType::Triangle);
            imageops::overlay(
                canvas,
                &stamp,
                rect.min_x().round() as i64,
                rect.min_y().round() as i64,
            );
        }
    }
}

/// Draws the outline inside `rect`, `width` pixels thick.
fn stroke(canvas: &mut RgbaImage, rect: &Rect, width: f64, color: Color) {
    let (cw, ch) = canvas.dimensions();
    let Some((x0, y0, x1, y1)) = rect.clip_to(cw, ch) else {
        return;
    };
    let inner = Rect::new(
        rect.x + width,
        rect.y + width,
        rect.width - 2.0 * width,
        rect.height - 2.0 * width,
    );
    let hole = if inner.width > 0.0 && inner.height > 0.0 {
        inner.clip_to(cw, ch)
    } else {
        None
    };

    for y in y0..y1 {
        for x in x0..x1 {
            let in_hole =
                hole.is_some_and(|(hx0, hy0, hx1, hy1)| x >= hx0 && x < hx1 && y >= hy0 && y < hy1);
            if !in_hole {
                blend(canvas.get_pixel_mut(x, y), color);
            }
        }
    }
}

fn blend(dst: &mut Rgba<u8>, color: Color) {
    let [r, g, b, a] = color.0;
    let alpha = a as u32;
    let inv = 255 - alpha;
    for (c, src) in dst.0.iter_mut().take(3).zip([r, g, b]) {
        *c = ((src as u32 * alpha + *c as u32 * inv) / 255) as u8;
    }
    dst.0[3] = 255;
}
