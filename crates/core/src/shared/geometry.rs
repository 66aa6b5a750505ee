/// A detection in normalized image coordinates.
///
/// All components lie in `[0, 1]` and the origin is the bottom-left corner
/// of the image, matching what face locators report.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NormalizedBox {
    pub min_x: f64,
    pub min_y: f64,
    pub width: f64,
    pub height: f64,
}

impl NormalizedBox {
    pub fn new(min_x: f64, min_y: f64, width: f64, height: f64) -> Self {
        Self {
            min_x,
            min_y,
            width,
            height,
        }
    }

    /// Builds a box from top-left-origin pixel corners, flipping the y axis
    /// and clamping everything into the unit square.
    pub fn from_pixel_corners(
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        frame_width: u32,
        frame_height: u32,
    ) -> Self {
        let fw = frame_width.max(1) as f64;
        let fh = frame_height.max(1) as f64;
        let left = (x1 / fw).clamp(0.0, 1.0);
        let right = (x2 / fw).clamp(0.0, 1.0);
        let top = (y1 / fh).clamp(0.0, 1.0);
        let bottom = (y2 / fh).clamp(0.0, 1.0);
        Self {
            min_x: left,
            min_y: 1.0 - bottom,
            width: (right - left).max(0.0),
            height: (bottom - top).max(0.0),
        }
    }

    pub fn max_x(&self) -> f64 {
        self.min_x + self.width
    }

    pub fn max_y(&self) -> f64 {
        self.min_y + self.height
    }
}

/// Width and height of the view overlays are drawn into, in points.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Screen-space rectangle, origin top-left of the view.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn min_x(&self) -> f64 {
        self.x
    }

    pub fn min_y(&self) -> f64 {
        self.y
    }

    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    /// Integer pixel bounds `(x0, y0, x1, y1)` clipped to a canvas.
    ///
    /// Returns `None` when nothing of the rectangle is visible.
    pub fn clip_to(&self, canvas_width: u32, canvas_height: u32) -> Option<(u32, u32, u32, u32)> {
        let x0 = self.min_x().round().max(0.0);
        let y0 = self.min_y().round().max(0.0);
        let x1 = self.max_x().round().min(canvas_width as f64);
        let y1 = self.max_y().round().min(canvas_height as f64);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some((x0 as u32, y0 as u32, x1 as u32, y1 as u32))
    }
}
