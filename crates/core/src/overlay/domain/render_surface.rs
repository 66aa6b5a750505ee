use crate::shared::geometry::Rect;

use super::decorative_image::DecorativeImage;

/// 8-bit RGBA color.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Color(pub [u8; 4]);

impl Color {
    pub const RED: Color = Color([255, 0, 0, 255]);
}

/// How a region is drawn.
#[derive(Clone, Debug, PartialEq)]
pub enum RegionStyle {
    /// Unfilled outline of the given stroke width.
    Border { width: f64, color: Color },
    /// Bitmap stretched to fill the region.
    Image(DecorativeImage),
}

#[derive(Clone, Debug, PartialEq)]
pub struct DrawRegion {
    pub rect: Rect,
    pub style: RegionStyle,
}

/// Ordered list of regions drawn over the camera preview.
///
/// Later regions paint over earlier ones. Only the UI thread touches it.
#[derive(Clone, Debug, Default)]
pub struct RenderSurface {
    regions: Vec<DrawRegion>,
}

impl RenderSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.regions.clear();
    }

    pub fn add_region(&mut self, rect: Rect, style: RegionStyle) {
        self.regions.push(DrawRegion { rect, style });
    }

    pub fn regions(&self) -> &[DrawRegion] {
        &self.regions
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn border() -> RegionStyle {
        RegionStyle::Border {
            width: 2.0,
            color: Color::RED,
        }
    }

    #[test]
    fn test_new_surface_is_empty() {
        let surface = RenderSurface::new();
        assert!(surface.is_empty());
        assert_eq!(surface.len(), 0);
    }

    #[test]
    fn test_regions_keep_insertion_order() {
        let mut surface = RenderSurface::new();
        surface.add_region(Rect::new(0.0, 0.0, 1.0, 1.0), border());
        surface.add_region(Rect::new(5.0, 5.0, 1.0, 1.0), border());
        let xs: Vec<f64> = surface.regions().iter().map(|r| r.rect.x).collect();
        assert_eq!(xs, vec![0.0, 5.0]);
    }

    #[test]
    fn test_clear_removes_everything() {
        let mut surface = RenderSurface::new();
        surface.add_region(Rect::new(0.0, 0.0, 1.0, 1.0), border());
        surface.clear();
        assert!(surface.is_empty());
    }
}
