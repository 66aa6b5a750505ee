use crate::shared::constants::BORDER_WIDTH;
use crate::shared::geometry::{NormalizedBox, Size};

use super::decorative_image::DecorativeImage;
use super::face_frame::{decoration_frame, face_frame};
use super::render_surface::{Color, RegionStyle, RenderSurface};

/// Turns one frame's detections into drawable regions.
///
/// Every call redraws from scratch: the surface is cleared, then each face
/// gets a red debug border followed by the decoration.
pub struct OverlayRenderer {
    decoration: DecorativeImage,
    border_color: Color,
}

impl OverlayRenderer {
    pub fn new(decoration: DecorativeImage) -> Self {
        Self {
            decoration,
            border_color: Color::RED,
        }
    }

    pub fn decoration(&self) -> &DecorativeImage {
        &self.decoration
    }

    pub fn render(&self, surface: &mut RenderSurface, detections: &[NormalizedBox], view: Size) {
        surface.clear();
        for b in detections {
            let face = face_frame(b, view);
            surface.add_region(
                face,
                RegionStyle::Border {
                    width: BORDER_WIDTH,
                    color: self.border_color,
                },
            );
            surface.add_region(
                decoration_frame(&face),
                RegionStyle::Image(self.decoration.clone()),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::geometry::Rect;
    use approx::assert_relative_eq;

    fn renderer() -> OverlayRenderer {
        OverlayRenderer::new(DecorativeImage::new("test", image::RgbaImage::new(4, 4)))
    }

    fn view() -> Size {
        Size::new(400.0, 800.0)
    }

    #[test]
    fn test_one_face_draws_border_then_image() {
        let r = renderer();
        let mut surface = RenderSurface::new();
        r.render(&mut surface, &[NormalizedBox::new(0.1, 0.2, 0.3, 0.4)], view());

        let regions = surface.regions();
        assert_eq!(regions.len(), 2);
        match &regions[0].style {
            RegionStyle::Border { width, color } => {
                assert_relative_eq!(*width, 2.0);
                assert_eq!(*color, Color::RED);
            }
            other => panic!("expected border, got {other:?}"),
        }
        assert!(matches!(&regions[1].style, RegionStyle::Image(img) if img == r.decoration()));

        let face = regions[0].rect;
        assert_relative_eq!(face.x, 48.0, epsilon = 1e-9);
        assert_relative_eq!(face.y, 80.0, epsilon = 1e-9);
        let deco: Rect = regions[1].rect;
        assert_relative_eq!(deco.y, face.y - 30.0, epsilon = 1e-9);
        assert_relative_eq!(deco.height, face.height + 40.0, epsilon = 1e-9);
    }

    #[test]
    fn test_regions_are_replaced_not_accumulated() {
        let r = renderer();
        let mut surface = RenderSurface::new();
        for i in 0..10 {
            let b = NormalizedBox::new(0.05 * i as f64, 0.2, 0.3, 0.3);
            r.render(&mut surface, &[b], view());
            assert_eq!(surface.len(), 2);
        }
    }

    #[test]
    fn test_no_detections_clears_surface() {
        let r = renderer();
        let mut surface = RenderSurface::new();
        r.render(&mut surface, &[NormalizedBox::new(0.1, 0.1, 0.2, 0.2)], view());
        r.render(&mut surface, &[], view());
        assert!(surface.is_empty());
    }

    #[test]
    fn test_multiple_faces_keep_detection_order() {
        let r = renderer();
        let mut surface = RenderSurface::new();
        let faces = [
            NormalizedBox::new(0.1, 0.1, 0.1, 0.1),
            NormalizedBox::new(0.6, 0.1, 0.1, 0.1),
            NormalizedBox::new(0.3, 0.5, 0.1, 0.1),
        ];
        r.render(&mut surface, &faces, view());
        assert_eq!(surface.len(), 6);
        let border_ys: Vec<f64> = surface
            .regions()
            .iter()
            .step_by(2)
            .map(|region| region.rect.y)
            .collect();
        assert_eq!(border_ys, vec![0.1 * 800.0, 0.6 * 800.0, 0.3 * 800.0]);
    }
}
