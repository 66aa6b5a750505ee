use crate::shared::constants::{DECORATION_EXTRA_HEIGHT, DECORATION_TOP_OFFSET, FACE_SCALE};
use crate::shared::geometry::{NormalizedBox, Rect, Size};

/// Maps a normalized detection onto the view.
///
/// The box's x/y axes are crossed with the view's: `max_y` drives the
/// horizontal origin and `min_x` the vertical one. This looks like a
/// swapped-axis bug; it is kept as is and the tests pin the placement.
pub fn face_frame(b: &NormalizedBox, view: Size) -> Rect {
    let width = b.width * view.height * FACE_SCALE;
    let height = b.height * view.width * FACE_SCALE;
    let x = b.max_y() * view.width - height;
    let y = b.min_x * view.height;
    Rect::new(x, y, width, height)
}

/// Where the decoration goes: same left edge and width as the face frame,
/// raised and stretched to cover the top of the head.
pub fn decoration_frame(face: &Rect) -> Rect {
    Rect::new(
        face.min_x(),
        face.min_y() - DECORATION_TOP_OFFSET,
        face.width,
        face.height + DECORATION_EXTRA_HEIGHT,
    )
}
