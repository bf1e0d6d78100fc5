//! Rectangles and sizes in source-image pixels.

use eframe::egui;

/// Natural pixel size of the displayed image.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ImageSize {
    pub width: f32,
    pub height: f32,
}

impl ImageSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// True before an image has been loaded (or for a degenerate one).
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// A crop rectangle in image pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CropRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl CropRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn size(&self) -> egui::Vec2 {
        egui::vec2(self.width, self.height)
    }

}

#[cfg(test)]
impl CropRect {
    /// Whether the rectangle lies inside `[0,W]x[0,H]` with non-negative size.
    ///
    /// Clamping sets `width = W - x`, and `x + (W - x)` can land an ulp past
    /// `W` in f32, so the far edges get a small tolerance.
    pub(crate) fn fits_within(&self, size: ImageSize) -> bool {
        const EPS: f32 = 1e-3;
        self.width >= 0.0
            && self.height >= 0.0
            && self.x >= 0.0
            && self.y >= 0.0
            && self.right() <= size.width + EPS
            && self.bottom() <= size.height + EPS
    }
}

/// Overlay label for a rectangle: rounded size and ratio, e.g. `512 × 512 (1.00)`.
pub fn describe_rect(rect: &CropRect) -> Option<String> {
    if rect.width == 0.0 || rect.height == 0.0 {
        return None;
    }
    let w = rect.width.round();
    let h = rect.height.round();
    let ratio = if h != 0.0 {
        format!("{:.2}", w / h)
    } else {
        "—".to_string()
    };
    Some(format!("{} × {} ({})", w as i64, h as i64, ratio))
}
