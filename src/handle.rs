//! Resize handles: the four corners and four edge midpoints of a rectangle.

use eframe::egui;

use crate::geometry::CropRect;

/// Screen-space distance within which a handle is grabbed.
pub const HANDLE_TOLERANCE: f32 = 10.0;

/// Smallest width/height a handle drag can produce, in image pixels.
pub const MIN_RESIZE_SIZE: f32 = 2.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Handle {
    TopLeft,
    Top,
    TopRight,
    Left,
    Right,
    BottomLeft,
    Bottom,
    BottomRight,
}

impl Handle {
    /// Corners before edges, so a corner wins where tolerances overlap.
    pub const ALL: [Handle; 8] = [
        Handle::TopLeft,
        Handle::TopRight,
        Handle::BottomLeft,
        Handle::BottomRight,
        Handle::Top,
        Handle::Left,
        Handle::Right,
        Handle::Bottom,
    ];

    pub fn moves_left(self) -> bool {
        matches!(self, Handle::TopLeft | Handle::Left | Handle::BottomLeft)
    }

    pub fn moves_right(self) -> bool {
        matches!(self, Handle::TopRight | Handle::Right | Handle::BottomRight)
    }

    pub fn moves_top(self) -> bool {
        matches!(self, Handle::TopLeft | Handle::Top | Handle::TopRight)
    }

    pub fn moves_bottom(self) -> bool {
        matches!(self, Handle::BottomLeft | Handle::Bottom | Handle::BottomRight)
    }

    pub fn is_horizontal(self) -> bool {
        self.moves_left() || self.moves_right()
    }

    pub fn is_vertical(self) -> bool {
        self.moves_top() || self.moves_bottom()
    }

    pub fn is_corner(self) -> bool {
        self.is_horizontal() && self.is_vertical()
    }

    /// The point held fixed while this handle is dragged: the opposite
    /// corner for corners, the opposite edge for edges.
    pub fn anchor(self, rect: &CropRect) -> egui::Pos2 {
        egui::pos2(
            if self.moves_left() { rect.right() } else { rect.x },
            if self.moves_top() { rect.bottom() } else { rect.y },
        )
    }

    /// Apply a raw pointer delta (image pixels) to the edges this handle
    /// owns, then enforce the minimum size.
    pub fn apply_delta(self, start: &CropRect, delta: egui::Vec2) -> CropRect {
        let mut rect = *start;
        if self.moves_left() {
            rect.x += delta.x;
            rect.width -= delta.x;
        }
        if self.moves_right() {
            rect.width += delta.x;
        }
        if self.moves_top() {
            rect.y += delta.y;
            rect.height -= delta.y;
        }
        if self.moves_bottom() {
            rect.height += delta.y;
        }
        rect.width = rect.width.max(MIN_RESIZE_SIZE);
        rect.height = rect.height.max(MIN_RESIZE_SIZE);
        rect
    }

    /// Where this handle is drawn on a screen rectangle.
    pub fn position(self, rect: egui::Rect) -> egui::Pos2 {
        match self {
            Handle::TopLeft => rect.left_top(),
            Handle::Top => rect.center_top(),
            Handle::TopRight => rect.right_top(),
            Handle::Left => rect.left_center(),
            Handle::Right => rect.right_center(),
            Handle::BottomLeft => rect.left_bottom(),
            Handle::Bottom => rect.center_bottom(),
            Handle::BottomRight => rect.right_bottom(),
        }
    }

    pub fn hit_test(pos: egui::Pos2, rect: egui::Rect) -> Option<Handle> {
        Self::ALL
            .into_iter()
            .find(|handle| pos.distance(handle.position(rect)) < HANDLE_TOLERANCE)
    }
}
