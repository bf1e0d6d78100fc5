use eframe::egui;

use crate::clamp::clamp_resize;
use crate::geometry::{CropRect, ImageSize};
use crate::handle::Handle;
use crate::settings::SnapSettings;

/// Minimum aspect-snap threshold in pixels (before strength).
const ASPECT_BASE_THRESHOLD: f32 = 8.0;
/// Aspect threshold grows with the short side at this rate.
const ASPECT_THRESHOLD_FACTOR: f32 = 0.25;
/// Minimum bucket-snap distance in pixels (before strength).
const BUCKET_BASE_THRESHOLD: f32 = 120.0;
const BUCKET_THRESHOLD_FACTOR: f32 = 0.35;

/// The configured ratio nearest `target` by plain difference. Ties keep the
/// earlier entry.
pub fn closest_aspect(target: f32, ratios: &[f32]) -> Option<f32> {
    let mut best: Option<(f32, f32)> = None;
    for &ratio in ratios {
        let diff = (target - ratio).abs();
        match best {
            Some((_, best_diff)) if diff >= best_diff => {}
            _ => best = Some((ratio, diff)),
        }
    }
    best.map(|(ratio, _)| ratio)
}

/// Adjust one dimension so the size matches the nearest configured ratio,
/// if the change is within threshold.
pub fn snap_aspect(size: egui::Vec2, settings: &SnapSettings) -> egui::Vec2 {
    let (width, height) = (size.x, size.y);
    let aspect = if width != 0.0 && height != 0.0 {
        width / height
    } else {
        1.0
    };
    let Some(target) = closest_aspect(aspect, &settings.aspect_ratios) else {
        return size;
    };

    let keep_width = egui::vec2(width, width / target);
    let keep_height = egui::vec2(height * target, height);
    let diff_height = (keep_width.y - height).abs();
    let diff_width = (keep_height.x - width).abs();
    let (chosen, delta) = if diff_height <= diff_width {
        (keep_width, diff_height)
    } else {
        (keep_height, diff_width)
    };

    let threshold =
        ASPECT_BASE_THRESHOLD.max(width.min(height) * ASPECT_THRESHOLD_FACTOR) * settings.strength;
    if delta <= threshold { chosen } else { size }
}

/// The bucket/ratio target nearest `size`, if it is within threshold.
///
/// Each bucket is a geometric-mean scale: with ratio `r` it targets
/// `round(b*sqrt(r)) x round(b/sqrt(r))`.
pub fn find_bucket_target(size: egui::Vec2, settings: &SnapSettings) -> Option<egui::Vec2> {
    if settings.strength <= 0.0 {
        return None;
    }
    let (width, height) = (size.x, size.y);
    let own_ratio = if width > 0.0 && height > 0.0 {
        width / height
    } else {
        1.0
    };
    let fallback = [own_ratio];
    let ratios: &[f32] = if settings.aspect_ratios.is_empty() {
        &fallback
    } else {
        &settings.aspect_ratios
    };

    let mut best: Option<(egui::Vec2, f32)> = None;
    for &bucket in &settings.buckets {
        for &ratio in ratios {
            let root = ratio.sqrt();
            let candidate = egui::vec2(
                (bucket as f32 * root).round(),
                (bucket as f32 / root).round(),
            );
            let score = (width - candidate.x).hypot(height - candidate.y);
            match best {
                Some((_, best_score)) if score >= best_score => {}
                _ => best = Some((candidate, score)),
            }
        }
    }

    let threshold = BUCKET_BASE_THRESHOLD.max(width.min(height) * BUCKET_THRESHOLD_FACTOR)
        * settings.strength;
    best.filter(|(_, score)| *score <= threshold)
        .map(|(target, _)| target)
}

/// Full snap of a free-standing size: aspect first, then resolution bucket.
pub fn apply_snap(size: egui::Vec2, settings: &SnapSettings) -> egui::Vec2 {
    if settings.strength <= 0.0 {
        return size;
    }
    let mut size = size;
    if settings.snap_aspect && !settings.aspect_ratios.is_empty() {
        size = snap_aspect(size, settings);
    }
    if settings.snap_resolution && !settings.buckets.is_empty() {
        if let Some(target) = find_bucket_target(size, settings) {
            size = target;
        }
    }
    size
}

/// Snap a handle-resized rectangle without moving its anchor.
///
/// Edge handles only take the snapped size on the dragged axis; corner
/// handles take both. The position is then re-derived from `anchor` and the
/// result clamped to the image, which trims only the dragged side.
pub fn snap_with_anchor(
    rect: CropRect,
    handle: Handle,
    anchor: egui::Pos2,
    settings: &SnapSettings,
    bounds: ImageSize,
) -> CropRect {
    let snapped = apply_snap(rect.size(), settings);
    let mut result = rect;
    if handle.is_corner() {
        result.width = snapped.x;
        result.height = snapped.y;
    } else if handle.is_horizontal() {
        result.width = snapped.x;
    } else {
        result.height = snapped.y;
    }

    if handle.moves_left() {
        result.x = anchor.x - result.width;
    } else if handle.moves_right() {
        result.x = anchor.x;
    }
    if handle.moves_top() {
        result.y = anchor.y - result.height;
    } else if handle.moves_bottom() {
        result.y = anchor.y;
    }

    clamp_resize(result, bounds)
}
