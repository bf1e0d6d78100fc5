//! Turns pointer and key events into crop rectangles. Only one
//! [`Interaction`] runs at a time.

use eframe::egui;

use crate::clamp::{clamp_move, clamp_resize};
use crate::geometry::{CropRect, ImageSize};
use crate::handle::Handle;
use crate::mapper::CoordinateMapper;
use crate::settings::SnapSettings;
use crate::snap::{apply_snap, snap_with_anchor};

/// A drawn rectangle must exceed this many pixels on both axes to be kept.
pub const COMMIT_THRESHOLD: f32 = 4.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Interaction {
    Idle,
    Drawing {
        start: egui::Pos2,
    },
    Moving {
        index: usize,
        start_point: egui::Pos2,
        origin: CropRect,
    },
    Resizing {
        index: usize,
        handle: Handle,
        start_point: egui::Pos2,
        start_rect: CropRect,
        anchor: egui::Pos2,
    },
}

/// Modifier state sampled with a pointer-down.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    /// The move modifier (Ctrl) is held.
    pub move_held: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditorKey {
    /// The resize modifier (Alt); handles are live while it is down.
    ResizeModifier,
    Accept,
    Clear,
}

/// Something the editor can't do itself and hands back to the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditorRequest {
    Accept,
}

#[derive(Debug)]
pub struct RectangleEditor {
    mapper: CoordinateMapper,
    selections: Vec<CropRect>,
    live: Option<CropRect>,
    interaction: Interaction,
    resize_mode: bool,
}

impl Default for RectangleEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl RectangleEditor {
    pub fn new() -> Self {
        Self {
            mapper: CoordinateMapper::default(),
            selections: Vec::new(),
            live: None,
            interaction: Interaction::Idle,
            resize_mode: false,
        }
    }

    pub fn mapper(&self) -> &CoordinateMapper {
        &self.mapper
    }

    pub fn image_size(&self) -> ImageSize {
        self.mapper.natural_size()
    }

    /// Committed rectangles in insertion (and z-) order.
    pub fn selections(&self) -> &[CropRect] {
        &self.selections
    }

    /// The uncommitted rectangle of an in-progress draw.
    pub fn live_rect(&self) -> Option<&CropRect> {
        self.live.as_ref()
    }

    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    pub fn resize_mode(&self) -> bool {
        self.resize_mode
    }

    /// Update where the image is drawn. Keeps the selections.
    pub fn set_image_rect(&mut self, image_rect: egui::Rect) {
        self.mapper.set_image_rect(image_rect);
    }

    /// Switch to a new image (or none). Clears all selections.
    pub fn load_image(&mut self, natural: ImageSize) {
        self.mapper.set_natural_size(natural);
        self.reset_selections();
    }

    /// Drop every rectangle and any running interaction.
    pub fn reset_selections(&mut self) {
        self.selections.clear();
        self.live = None;
        self.interaction = Interaction::Idle;
    }

    /// Remove one committed rectangle; the others keep their order.
    pub fn delete(&mut self, index: usize) -> Option<CropRect> {
        if index >= self.selections.len() {
            return None;
        }
        // an interaction holding an index would now point at the wrong entry
        if !matches!(self.interaction, Interaction::Drawing { .. }) {
            self.interaction = Interaction::Idle;
        }
        Some(self.selections.remove(index))
    }

    pub fn on_pointer_down(&mut self, pos: egui::Pos2, modifiers: Modifiers) {
        if self.image_size().is_empty() || self.interaction != Interaction::Idle {
            return;
        }

        if self.resize_mode {
            if let Some((index, handle)) = self.handle_at(pos) {
                let start_rect = self.selections[index];
                self.interaction = Interaction::Resizing {
                    index,
                    handle,
                    start_point: self.mapper.to_image_space(pos),
                    start_rect,
                    anchor: handle.anchor(&start_rect),
                };
            }
            return;
        }

        if modifiers.move_held {
            if let Some(index) = self.rect_at(pos) {
                self.interaction = Interaction::Moving {
                    index,
                    start_point: self.mapper.to_image_space(pos),
                    origin: self.selections[index],
                };
            }
            return;
        }

        if !self.mapper.contains(pos) {
            return;
        }
        self.interaction = Interaction::Drawing {
            start: self.mapper.to_image_space(pos),
        };
        self.live = None;
    }

    pub fn on_pointer_move(&mut self, pos: egui::Pos2, settings: &SnapSettings) {
        let bounds = self.image_size();
        if bounds.is_empty() {
            return;
        }
        let current = self.mapper.to_image_space(pos);
        match self.interaction {
            Interaction::Idle => {}
            Interaction::Drawing { start } => {
                self.live = Some(build_drag_rect(start, current, settings, bounds));
            }
            Interaction::Moving {
                index,
                start_point,
                origin,
            } => {
                let delta = current - start_point;
                let moved = CropRect {
                    x: origin.x + delta.x,
                    y: origin.y + delta.y,
                    ..origin
                };
                if let Some(slot) = self.selections.get_mut(index) {
                    *slot = clamp_move(moved, bounds);
                }
            }
            Interaction::Resizing {
                index,
                handle,
                start_point,
                start_rect,
                anchor,
            } => {
                let resized = handle.apply_delta(&start_rect, current - start_point);
                if let Some(slot) = self.selections.get_mut(index) {
                    *slot = snap_with_anchor(resized, handle, anchor, settings, bounds);
                }
            }
        }
    }

    pub fn on_pointer_up(&mut self, pos: egui::Pos2, settings: &SnapSettings) {
        match self.interaction {
            Interaction::Idle => return,
            Interaction::Moving { .. } | Interaction::Resizing { .. } => {}
            Interaction::Drawing { start } => {
                let bounds = self.image_size();
                let end = self.mapper.to_image_space(pos);
                let rect = build_drag_rect(start, end, settings, bounds);
                if rect.width > COMMIT_THRESHOLD && rect.height > COMMIT_THRESHOLD {
                    log::debug!("committed crop {rect:?}");
                    self.selections.push(rect);
                }
                self.live = None;
            }
        }
        self.interaction = Interaction::Idle;
    }

    /// Double-click deletes the topmost rectangle under the pointer.
    pub fn on_double_click(&mut self, pos: egui::Pos2) -> bool {
        self.delete_at(pos)
    }

    /// Context (secondary) click deletes the topmost rectangle under the pointer.
    pub fn on_context_delete(&mut self, pos: egui::Pos2) -> bool {
        self.delete_at(pos)
    }

    fn delete_at(&mut self, pos: egui::Pos2) -> bool {
        if let Some(live) = self.live {
            if self.mapper.to_screen(&live).contains(pos) {
                self.live = None;
                self.interaction = Interaction::Idle;
                return true;
            }
        }
        match self.rect_at(pos) {
            Some(index) => self.delete(index).is_some(),
            None => false,
        }
    }

    pub fn on_key_down(&mut self, key: EditorKey) -> Option<EditorRequest> {
        match key {
            EditorKey::ResizeModifier => {
                self.resize_mode = true;
                None
            }
            EditorKey::Accept => Some(EditorRequest::Accept),
            EditorKey::Clear => {
                self.reset_selections();
                None
            }
        }
    }

    /// Releasing the resize modifier ends a resize where it stands; the
    /// rectangle keeps its last computed size.
    pub fn on_key_up(&mut self, key: EditorKey) {
        if key == EditorKey::ResizeModifier {
            self.resize_mode = false;
            if matches!(self.interaction, Interaction::Resizing { .. }) {
                self.interaction = Interaction::Idle;
            }
        }
    }

    /// Losing focus cancels the running interaction. A draw preview is
    /// discarded; move/resize changes already applied stay.
    pub fn on_focus_lost(&mut self) {
        if self.interaction != Interaction::Idle {
            log::debug!("focus lost, cancelling {:?}", self.interaction);
        }
        self.interaction = Interaction::Idle;
        self.live = None;
    }

    /// Topmost committed rectangle containing a screen point.
    fn rect_at(&self, pos: egui::Pos2) -> Option<usize> {
        self.selections
            .iter()
            .rposition(|rect| self.mapper.to_screen(rect).contains(pos))
    }

    /// Topmost committed rectangle with a handle under a screen point.
    fn handle_at(&self, pos: egui::Pos2) -> Option<(usize, Handle)> {
        self.selections
            .iter()
            .enumerate()
            .rev()
            .find_map(|(index, rect)| {
                Handle::hit_test(pos, self.mapper.to_screen(rect)).map(|handle| (index, handle))
            })
    }
}

/// Rectangle spanned by a drag from `start` to `current`, in any direction.
///
/// The size is snapped and clamped first, then placed so that `start` stays
/// the fixed corner.
pub fn build_drag_rect(
    start: egui::Pos2,
    current: egui::Pos2,
    settings: &SnapSettings,
    bounds: ImageSize,
) -> CropRect {
    let delta = current - start;
    let snapped = apply_snap(egui::vec2(delta.x.abs(), delta.y.abs()), settings);
    let rect = CropRect {
        x: if delta.x >= 0.0 { start.x } else { start.x - snapped.x },
        y: if delta.y >= 0.0 { start.y } else { start.y - snapped.y },
        width: snapped.x,
        height: snapped.y,
    };
    clamp_resize(rect, bounds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::expand_ratios;
    use proptest::prelude::*;

    const NO_MODS: Modifiers = Modifiers { move_held: false };
    const MOVE: Modifiers = Modifiers { move_held: true };

    fn no_snap() -> SnapSettings {
        SnapSettings {
            strength: 0.0,
            ..SnapSettings::default()
        }
    }

    /// Editor over a 1000x800 image drawn at half size, offset by (10, 20).
    fn editor() -> RectangleEditor {
        let mut editor = RectangleEditor::new();
        editor.load_image(ImageSize::new(1000.0, 800.0));
        editor.set_image_rect(egui::Rect::from_min_size(
            egui::pos2(10.0, 20.0),
            egui::vec2(500.0, 400.0),
        ));
        editor
    }

    /// Screen position of an image-space point.
    fn screen(x: f32, y: f32) -> egui::Pos2 {
        egui::pos2(10.0 + x / 2.0, 20.0 + y / 2.0)
    }

    fn draw(editor: &mut RectangleEditor, from: (f32, f32), to: (f32, f32), s: &SnapSettings) {
        editor.on_pointer_down(screen(from.0, from.1), NO_MODS);
        editor.on_pointer_move(screen(to.0, to.1), s);
        editor.on_pointer_up(screen(to.0, to.1), s);
    }

    #[test]
    fn draw_commits_above_threshold() {
        let mut e = editor();
        draw(&mut e, (100.0, 100.0), (110.0, 110.0), &no_snap());
        assert_eq!(e.selections(), &[CropRect::new(100.0, 100.0, 10.0, 10.0)]);
        assert_eq!(e.interaction(), &Interaction::Idle);
        assert!(e.live_rect().is_none());
    }

    #[test]
    fn draw_below_threshold_is_discarded() {
        let mut e = editor();
        draw(&mut e, (100.0, 100.0), (103.0, 110.0), &no_snap());
        assert!(e.selections().is_empty());
    }

    #[test]
    fn draw_shows_live_preview_until_release() {
        let mut e = editor();
        e.on_pointer_down(screen(100.0, 100.0), NO_MODS);
        e.on_pointer_move(screen(200.0, 160.0), &no_snap());
        assert_eq!(
            e.live_rect(),
            Some(&CropRect::new(100.0, 100.0, 100.0, 60.0))
        );
        assert!(e.selections().is_empty());
    }

    #[test]
    fn draw_toward_top_left_keeps_start_as_corner() {
        let mut e = editor();
        draw(&mut e, (300.0, 300.0), (200.0, 240.0), &no_snap());
        assert_eq!(e.selections(), &[CropRect::new(200.0, 240.0, 100.0, 60.0)]);
    }

    #[test]
    fn draw_snaps_then_anchors_at_start() {
        let s = SnapSettings {
            snap_aspect: true,
            buckets: vec![512],
            aspect_ratios: expand_ratios(&[1.0]),
            strength: 1.0,
            ..SnapSettings::default()
        };
        let mut e = editor();
        draw(&mut e, (800.0, 700.0), (300.0, 180.0), &s);
        assert_eq!(e.selections(), &[CropRect::new(288.0, 188.0, 512.0, 512.0)]);
    }

    #[test]
    fn draw_outside_image_does_not_start() {
        let mut e = editor();
        e.on_pointer_down(egui::pos2(2.0, 2.0), NO_MODS);
        assert_eq!(e.interaction(), &Interaction::Idle);
    }

    #[test]
    fn no_interaction_without_image() {
        let mut e = RectangleEditor::new();
        e.set_image_rect(egui::Rect::from_min_size(egui::Pos2::ZERO, egui::vec2(100.0, 100.0)));
        e.on_pointer_down(egui::pos2(50.0, 50.0), NO_MODS);
        assert_eq!(e.interaction(), &Interaction::Idle);
    }

    #[test]
    fn second_pointer_down_is_ignored_while_busy() {
        let mut e = editor();
        e.on_pointer_down(screen(100.0, 100.0), NO_MODS);
        e.on_pointer_down(screen(500.0, 500.0), NO_MODS);
        assert_eq!(
            e.interaction(),
            &Interaction::Drawing {
                start: egui::pos2(100.0, 100.0)
            }
        );
    }

    #[test]
    fn move_updates_in_place_and_clamps() {
        let mut e = editor();
        draw(&mut e, (100.0, 100.0), (300.0, 200.0), &no_snap());
        e.on_pointer_down(screen(150.0, 150.0), MOVE);
        e.on_pointer_move(screen(250.0, 170.0), &no_snap());
        assert_eq!(e.selections()[0], CropRect::new(200.0, 120.0, 200.0, 100.0));
        e.on_pointer_move(screen(1000.0, 800.0), &no_snap());
        assert_eq!(e.selections()[0], CropRect::new(800.0, 700.0, 200.0, 100.0));
        e.on_pointer_up(screen(1000.0, 800.0), &no_snap());
        assert_eq!(e.interaction(), &Interaction::Idle);
        assert_eq!(e.selections()[0].x, 800.0);
    }

    #[test]
    fn move_modifier_off_rect_does_nothing() {
        let mut e = editor();
        draw(&mut e, (100.0, 100.0), (300.0, 200.0), &no_snap());
        e.on_pointer_down(screen(600.0, 600.0), MOVE);
        assert_eq!(e.interaction(), &Interaction::Idle);
    }

    #[test]
    fn move_picks_topmost_overlap() {
        let mut e = editor();
        draw(&mut e, (100.0, 100.0), (300.0, 300.0), &no_snap());
        draw(&mut e, (200.0, 200.0), (400.0, 400.0), &no_snap());
        e.on_pointer_down(screen(250.0, 250.0), MOVE);
        assert!(matches!(e.interaction(), Interaction::Moving { index: 1, .. }));
    }

    #[test]
    fn resize_requires_modifier_and_handle() {
        let mut e = editor();
        draw(&mut e, (100.0, 100.0), (300.0, 200.0), &no_snap());
        e.on_pointer_down(screen(300.0, 200.0), NO_MODS);
        assert!(matches!(e.interaction(), Interaction::Drawing { .. }));
        e.on_focus_lost();

        e.on_key_down(EditorKey::ResizeModifier);
        e.on_pointer_down(screen(200.0, 150.0), NO_MODS);
        assert_eq!(e.interaction(), &Interaction::Idle);
        e.on_pointer_down(screen(300.0, 200.0), NO_MODS);
        assert!(matches!(
            e.interaction(),
            Interaction::Resizing {
                index: 0,
                handle: Handle::BottomRight,
                ..
            }
        ));
    }

    #[test]
    fn resize_corner_keeps_anchor() {
        let mut e = editor();
        draw(&mut e, (100.0, 100.0), (300.0, 200.0), &no_snap());
        e.on_key_down(EditorKey::ResizeModifier);
        e.on_pointer_down(screen(100.0, 100.0), NO_MODS);
        e.on_pointer_move(screen(40.0, 160.0), &no_snap());
        assert_eq!(e.selections()[0], CropRect::new(40.0, 160.0, 260.0, 40.0));
    }

    #[test]
    fn releasing_resize_modifier_keeps_last_size() {
        let mut e = editor();
        draw(&mut e, (100.0, 100.0), (300.0, 200.0), &no_snap());
        e.on_key_down(EditorKey::ResizeModifier);
        e.on_pointer_down(screen(300.0, 150.0), NO_MODS);
        e.on_pointer_move(screen(400.0, 150.0), &no_snap());
        e.on_key_up(EditorKey::ResizeModifier);
        assert_eq!(e.interaction(), &Interaction::Idle);
        assert!(!e.resize_mode());
        assert_eq!(e.selections()[0], CropRect::new(100.0, 100.0, 300.0, 100.0));
        // further motion no longer resizes
        e.on_pointer_move(screen(600.0, 150.0), &no_snap());
        assert_eq!(e.selections()[0].width, 300.0);
    }

    #[test]
    fn focus_loss_drops_preview_but_keeps_moves() {
        let mut e = editor();
        draw(&mut e, (100.0, 100.0), (300.0, 200.0), &no_snap());
        e.on_pointer_down(screen(150.0, 150.0), MOVE);
        e.on_pointer_move(screen(170.0, 150.0), &no_snap());
        e.on_focus_lost();
        assert_eq!(e.selections()[0].x, 120.0);

        e.on_pointer_down(screen(500.0, 500.0), NO_MODS);
        e.on_pointer_move(screen(600.0, 600.0), &no_snap());
        e.on_focus_lost();
        assert!(e.live_rect().is_none());
        assert_eq!(e.selections().len(), 1);
    }

    #[test]
    fn delete_by_index_preserves_order() {
        let mut e = editor();
        for i in 0..4 {
            let o = i as f32 * 100.0;
            draw(&mut e, (o, o), (o + 50.0, o + 50.0), &no_snap());
        }
        let before = e.selections().to_vec();
        assert_eq!(e.delete(1), Some(before[1]));
        assert_eq!(e.selections(), &[before[0], before[2], before[3]]);
        assert_eq!(e.delete(9), None);
    }

    #[test]
    fn double_click_deletes_topmost_under_pointer() {
        let mut e = editor();
        draw(&mut e, (100.0, 100.0), (300.0, 300.0), &no_snap());
        draw(&mut e, (200.0, 200.0), (400.0, 400.0), &no_snap());
        assert!(e.on_double_click(screen(250.0, 250.0)));
        assert_eq!(e.selections(), &[CropRect::new(100.0, 100.0, 200.0, 200.0)]);
        assert!(!e.on_context_delete(screen(900.0, 50.0)));
        assert!(e.on_context_delete(screen(150.0, 150.0)));
        assert!(e.selections().is_empty());
    }

    #[test]
    fn keys_clear_and_request_accept() {
        let mut e = editor();
        draw(&mut e, (100.0, 100.0), (300.0, 300.0), &no_snap());
        assert_eq!(e.on_key_down(EditorKey::Accept), Some(EditorRequest::Accept));
        assert_eq!(e.selections().len(), 1);
        assert_eq!(e.on_key_down(EditorKey::Clear), None);
        assert!(e.selections().is_empty());
    }

    #[test]
    fn loading_new_image_resets_selection() {
        let mut e = editor();
        draw(&mut e, (100.0, 100.0), (300.0, 300.0), &no_snap());
        e.load_image(ImageSize::new(640.0, 480.0));
        assert!(e.selections().is_empty());
        assert_eq!(e.image_size(), ImageSize::new(640.0, 480.0));
    }

    #[derive(Clone, Debug)]
    enum Op {
        Move(f32, f32),
        Resize(usize, f32, f32),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (-1500.0f32..1500.0, -1500.0f32..1500.0).prop_map(|(dx, dy)| Op::Move(dx, dy)),
            (0usize..8, -1500.0f32..1500.0, -1500.0f32..1500.0)
                .prop_map(|(h, dx, dy)| Op::Resize(h, dx, dy)),
        ]
    }

    fn snap_strategy() -> impl Strategy<Value = SnapSettings> {
        (0.0f32..=1.0, any::<bool>(), any::<bool>()).prop_map(|(strength, aspect, resolution)| {
            SnapSettings {
                snap_aspect: aspect,
                snap_resolution: resolution,
                strength,
                ..SnapSettings::default()
            }
        })
    }

    proptest! {
        #[test]
        fn prop_move_and_resize_stay_inside(
            ops in prop::collection::vec(op_strategy(), 1..12),
            settings in snap_strategy(),
        ) {
            let bounds = ImageSize::new(1000.0, 800.0);
            let mut rect = CropRect::new(300.0, 200.0, 200.0, 150.0);
            for op in ops {
                rect = match op {
                    Op::Move(dx, dy) => clamp_move(
                        CropRect { x: rect.x + dx, y: rect.y + dy, ..rect },
                        bounds,
                    ),
                    Op::Resize(h, dx, dy) => {
                        let handle = Handle::ALL[h];
                        let anchor = handle.anchor(&rect);
                        let raw = handle.apply_delta(&rect, egui::vec2(dx, dy));
                        snap_with_anchor(raw, handle, anchor, &settings, bounds)
                    }
                };
                prop_assert!(rect.fits_within(bounds), "{rect:?}");
            }
        }

        #[test]
        fn prop_corner_resize_preserves_anchor(
            deltas in prop::collection::vec((-1500.0f32..1500.0, -1500.0f32..1500.0), 1..10),
            corner in 0usize..4,
            settings in snap_strategy(),
        ) {
            let bounds = ImageSize::new(1000.0, 800.0);
            let handle = Handle::ALL[corner];
            let start = CropRect::new(300.0, 200.0, 200.0, 150.0);
            let anchor = handle.anchor(&start);
            for (dx, dy) in deltas {
                let raw = handle.apply_delta(&start, egui::vec2(dx, dy));
                let out = snap_with_anchor(raw, handle, anchor, &settings, bounds);
                let fixed = egui::pos2(
                    if handle.moves_left() { out.right() } else { out.x },
                    if handle.moves_top() { out.bottom() } else { out.y },
                );
                prop_assert!((fixed.x - anchor.x).abs() < 1e-3, "{out:?} vs {anchor:?}");
                prop_assert!((fixed.y - anchor.y).abs() < 1e-3, "{out:?} vs {anchor:?}");
            }
        }

        #[test]
        fn prop_edge_resize_keeps_cross_axis_without_snap(
            edge in 4usize..8,
            dx in -1500.0f32..1500.0,
            dy in -1500.0f32..1500.0,
        ) {
            let bounds = ImageSize::new(1000.0, 800.0);
            let handle = Handle::ALL[edge];
            let start = CropRect::new(300.0, 200.0, 200.0, 150.0);
            let anchor = handle.anchor(&start);
            let raw = handle.apply_delta(&start, egui::vec2(dx, dy));
            let out = snap_with_anchor(raw, handle, anchor, &no_snap(), bounds);
            if handle.is_horizontal() {
                prop_assert_eq!(out.height, start.height);
                prop_assert_eq!(out.y, start.y);
            } else {
                prop_assert_eq!(out.width, start.width);
                prop_assert_eq!(out.x, start.x);
            }
        }
    }
}
