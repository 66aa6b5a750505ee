use std::sync::Arc;

use image::RgbaImage;

/// The bitmap stamped over each face. Cheap to clone.
#[derive(Clone, Debug)]
pub struct DecorativeImage {
    name: String,
    pixels: Arc<RgbaImage>,
}

impl DecorativeImage {
    pub fn new(name: impl Into<String>, pixels: RgbaImage) -> Self {
        Self {
            name: name.into(),
            pixels: Arc::new(pixels),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }
}

impl PartialEq for DecorativeImage {
    /// Two handles are equal when they share the same bitmap.
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.pixels, &other.pixels)
    }
}
