//! Keeping rectangles inside the image.

use crate::geometry::{CropRect, ImageSize};

/// Shrink `rect` from whichever edges overflow `[0,W]x[0,H]`.
///
/// Used while drawing and resizing, where the size is allowed to change.
/// An edge that stays inside is never moved.
pub fn clamp_resize(rect: CropRect, bounds: ImageSize) -> CropRect {
    let CropRect {
        mut x,
        mut y,
        mut width,
        mut height,
    } = rect;

    if x < 0.0 {
        width += x;
        x = 0.0;
    }
    if y < 0.0 {
        height += y;
        y = 0.0;
    }
    if x + width > bounds.width {
        width = bounds.width - x;
    }
    if y + height > bounds.height {
        height = bounds.height - y;
    }

    CropRect {
        x,
        y,
        width: width.max(0.0),
        height: height.max(0.0),
    }
}

/// Slide `rect` back inside the image without touching its size.
pub fn clamp_move(rect: CropRect, bounds: ImageSize) -> CropRect {
    let max_x = (bounds.width - rect.width).max(0.0);
    let max_y = (bounds.height - rect.height).max(0.0);
    CropRect {
        x: rect.x.clamp(0.0, max_x),
        y: rect.y.clamp(0.0, max_y),
        ..rect
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDS: ImageSize = ImageSize {
        width: 800.0,
        height: 600.0,
    };

    #[test]
    fn resize_clamp_shrinks_negative_origin() {
        let r = clamp_resize(CropRect::new(-20.0, -10.0, 100.0, 50.0), BOUNDS);
        assert_eq!(r, CropRect::new(0.0, 0.0, 80.0, 40.0));
    }

    #[test]
    fn resize_clamp_trims_far_edges() {
        let r = clamp_resize(CropRect::new(700.0, 550.0, 200.0, 200.0), BOUNDS);
        assert_eq!(r, CropRect::new(700.0, 550.0, 100.0, 50.0));
    }

    #[test]
    fn resize_clamp_leaves_inside_rect_alone() {
        let inside = CropRect::new(10.0, 20.0, 30.0, 40.0);
        assert_eq!(clamp_resize(inside, BOUNDS), inside);
    }

    #[test]
    fn resize_clamp_never_goes_negative() {
        let r = clamp_resize(CropRect::new(-50.0, 0.0, 20.0, 10.0), BOUNDS);
        assert_eq!(r.width, 0.0);
        assert_eq!(r.x, 0.0);
    }

    #[test]
    fn move_clamp_keeps_size() {
        let r = clamp_move(CropRect::new(750.0, -30.0, 100.0, 100.0), BOUNDS);
        assert_eq!(r, CropRect::new(700.0, 0.0, 100.0, 100.0));
    }

    #[test]
    fn move_clamp_oversized_pins_to_origin() {
        let r = clamp_move(CropRect::new(40.0, 40.0, 900.0, 700.0), BOUNDS);
        assert_eq!(r, CropRect::new(0.0, 0.0, 900.0, 700.0));
    }
}
