//! Conversion between screen coordinates and image pixels.

use eframe::egui;

use crate::geometry::{CropRect, ImageSize};

/// Maps between the on-screen image box and the image's natural pixel grid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoordinateMapper {
    /// Where the image is drawn, in screen points.
    image_rect: egui::Rect,
    natural: ImageSize,
}

impl Default for CoordinateMapper {
    fn default() -> Self {
        Self {
            image_rect: egui::Rect::NOTHING,
            natural: ImageSize::default(),
        }
    }
}

impl CoordinateMapper {
    pub fn new(image_rect: egui::Rect, natural: ImageSize) -> Self {
        Self {
            image_rect,
            natural,
        }
    }

    pub fn natural_size(&self) -> ImageSize {
        self.natural
    }

    pub fn set_image_rect(&mut self, image_rect: egui::Rect) {
        self.image_rect = image_rect;
    }

    pub fn set_natural_size(&mut self, natural: ImageSize) {
        self.natural = natural;
    }

    /// Image pixels per screen point. Falls back to 1 until layout is known.
    pub fn scale(&self) -> egui::Vec2 {
        let w = self.image_rect.width();
        let h = self.image_rect.height();
        let sx = if w > 0.0 { self.natural.width / w } else { 1.0 };
        let sy = if h > 0.0 { self.natural.height / h } else { 1.0 };
        egui::vec2(
            if sx.is_finite() { sx } else { 1.0 },
            if sy.is_finite() { sy } else { 1.0 },
        )
    }

    /// Whether a screen point lies over the displayed image.
    pub fn contains(&self, point: egui::Pos2) -> bool {
        let r = self.image_rect;
        point.x >= r.min.x && point.x <= r.max.x && point.y >= r.min.y && point.y <= r.max.y
    }

    /// Screen point to image pixels. The point is clamped into the image box
    /// first, so the result always lies in `[0,W]x[0,H]`.
    pub fn to_image_space(&self, point: egui::Pos2) -> egui::Pos2 {
        let r = self.image_rect;
        let scale = self.scale();
        let x = (point.x - r.min.x).clamp(0.0, r.width().max(0.0));
        let y = (point.y - r.min.y).clamp(0.0, r.height().max(0.0));
        egui::pos2(
            (x * scale.x).min(self.natural.width.max(0.0)),
            (y * scale.y).min(self.natural.height.max(0.0)),
        )
    }

    /// Image rectangle to display coordinates relative to `overlay_origin`.
    /// Only used for rendering.
    pub fn to_view_space(&self, rect: &CropRect, overlay_origin: egui::Pos2) -> egui::Rect {
        let scale = self.scale();
        let offset = self.image_rect.min - overlay_origin;
        egui::Rect::from_min_size(
            egui::pos2(offset.x + rect.x / scale.x, offset.y + rect.y / scale.y),
            egui::vec2(rect.width / scale.x, rect.height / scale.y),
        )
    }

    /// Image rectangle in absolute screen coordinates.
    pub fn to_screen(&self, rect: &CropRect) -> egui::Rect {
        self.to_view_space(rect, egui::Pos2::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn mapper() -> CoordinateMapper {
        // 2000x1000 image shown at 400x200, offset by (100, 50)
        CoordinateMapper::new(
            egui::Rect::from_min_size(egui::pos2(100.0, 50.0), egui::vec2(400.0, 200.0)),
            ImageSize::new(2000.0, 1000.0),
        )
    }

    #[test]
    fn scale_is_natural_over_display() {
        assert_eq!(mapper().scale(), egui::vec2(5.0, 5.0));
    }

    #[test]
    fn scale_falls_back_before_layout() {
        let m = CoordinateMapper::new(egui::Rect::NOTHING, ImageSize::new(640.0, 480.0));
        assert_eq!(m.scale(), egui::vec2(1.0, 1.0));
    }

    #[test]
    fn maps_inside_point() {
        let p = mapper().to_image_space(egui::pos2(200.0, 100.0));
        assert_eq!(p, egui::pos2(500.0, 250.0));
    }

    #[test]
    fn clamps_outside_point_before_scaling() {
        let m = mapper();
        assert_eq!(m.to_image_space(egui::pos2(0.0, 0.0)), egui::pos2(0.0, 0.0));
        assert_eq!(
            m.to_image_space(egui::pos2(900.0, 900.0)),
            egui::pos2(2000.0, 1000.0)
        );
    }

    #[test]
    fn view_space_is_relative_to_overlay() {
        let m = mapper();
        let rect = CropRect::new(500.0, 250.0, 1000.0, 500.0);
        let view = m.to_view_space(&rect, egui::pos2(80.0, 30.0));
        assert_eq!(view.min, egui::pos2(120.0, 70.0));
        assert_eq!(view.size(), egui::vec2(200.0, 100.0));
        assert_eq!(m.to_screen(&rect).min, egui::pos2(200.0, 100.0));
    }

    proptest! {
        #[test]
        fn prop_image_space_within_bounds(
            x in -5000.0f32..5000.0,
            y in -5000.0f32..5000.0,
            box_w in 0.0f32..3000.0,
            box_h in 0.0f32..3000.0,
            nat_w in 1.0f32..8000.0,
            nat_h in 1.0f32..8000.0,
        ) {
            let m = CoordinateMapper::new(
                egui::Rect::from_min_size(egui::pos2(37.0, 12.0), egui::vec2(box_w, box_h)),
                ImageSize::new(nat_w, nat_h),
            );
            let p = m.to_image_space(egui::pos2(x, y));
            prop_assert!(p.x >= 0.0 && p.x <= nat_w);
            prop_assert!(p.y >= 0.0 && p.y <= nat_h);
        }
    }
}
