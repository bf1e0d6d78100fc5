//! Snap configuration and its persisted text form.

use serde::{Deserialize, Serialize};

pub const SETTINGS_KEY: &str = "crop-gui-settings";

pub const DEFAULT_BUCKET_TEXT: &str = "512, 768, 1024";
pub const DEFAULT_ASPECT_TEXT: &str =
    "1:1, 4:3, 3:2, 16:9, 9:16, 1:2, 2:1, 1:3, 3:1, 2:3, 3:2, 1:4, 4:1, 9:21, 21:9, 9:32, 32:9";
pub const DEFAULT_SNAP_STRENGTH: f32 = 1.0;

/// Relative tolerance under which two ratios count as the same entry.
const RATIO_EPSILON: f32 = 1e-6;

/// Durable string store the settings blob lives in.
pub trait SettingsStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String);
}

impl<T: eframe::Storage + ?Sized> SettingsStore for T {
    fn get(&self, key: &str) -> Option<String> {
        self.get_string(key)
    }

    fn set(&mut self, key: &str, value: String) {
        self.set_string(key, value);
    }
}

/// The blob written under [`SETTINGS_KEY`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistedSettings {
    pub snap_resolution: bool,
    pub snap_aspect: bool,
    pub bucket_text: String,
    pub aspect_text: String,
    pub snap_strength: f32,
}

impl Default for PersistedSettings {
    fn default() -> Self {
        Self {
            snap_resolution: true,
            snap_aspect: false,
            bucket_text: DEFAULT_BUCKET_TEXT.to_string(),
            aspect_text: DEFAULT_ASPECT_TEXT.to_string(),
            snap_strength: DEFAULT_SNAP_STRENGTH,
        }
    }
}

/// Parsed snap configuration consumed by the snap engine.
#[derive(Clone, Debug, PartialEq)]
pub struct SnapSettings {
    pub snap_resolution: bool,
    pub snap_aspect: bool,
    /// Positive, de-duplicated, in the order given.
    pub buckets: Vec<u32>,
    /// Positive, closed under reciprocal.
    pub aspect_ratios: Vec<f32>,
    /// In `[0, 1]`; 0 disables snapping.
    pub strength: f32,
}

impl Default for SnapSettings {
    fn default() -> Self {
        Self::from_persisted(&PersistedSettings::default())
    }
}

impl SnapSettings {
    /// Build the parsed form, substituting defaults for empty parses.
    pub fn from_persisted(persisted: &PersistedSettings) -> Self {
        let mut buckets = parse_buckets(&persisted.bucket_text);
        if buckets.is_empty() {
            buckets = parse_buckets(DEFAULT_BUCKET_TEXT);
        }
        let mut aspect_ratios = expand_ratios(&parse_aspect_ratios(&persisted.aspect_text));
        if aspect_ratios.is_empty() {
            aspect_ratios = expand_ratios(&parse_aspect_ratios(DEFAULT_ASPECT_TEXT));
        }
        Self {
            snap_resolution: persisted.snap_resolution,
            snap_aspect: persisted.snap_aspect,
            buckets,
            aspect_ratios,
            strength: sanitize_strength(persisted.snap_strength),
        }
    }

    /// Text form of the parsed lists. Re-parsing it yields equivalent settings.
    pub fn to_persisted(&self) -> PersistedSettings {
        PersistedSettings {
            snap_resolution: self.snap_resolution,
            snap_aspect: self.snap_aspect,
            bucket_text: format_buckets(&self.buckets),
            aspect_text: format_ratios(&self.aspect_ratios),
            snap_strength: self.strength,
        }
    }
}

fn sanitize_strength(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        DEFAULT_SNAP_STRENGTH
    }
}

/// Comma-separated positive integers; anything else is dropped.
pub fn parse_buckets(text: &str) -> Vec<u32> {
    let mut out = Vec::new();
    for token in text.split(',') {
        if let Ok(n) = token.trim().parse::<u32>() {
            if n > 0 && !out.contains(&n) {
                out.push(n);
            }
        }
    }
    out
}

/// Comma-separated `W:H` tokens or bare decimals. Invalid tokens are dropped.
pub fn parse_aspect_ratios(text: &str) -> Vec<f32> {
    text.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .filter_map(parse_ratio_token)
        .collect()
}

fn parse_ratio_token(token: &str) -> Option<f32> {
    if let Some((w, h)) = token.split_once(':') {
        if let (Ok(w), Ok(h)) = (w.trim().parse::<f32>(), h.trim().parse::<f32>()) {
            if w.is_finite() && h.is_finite() && h != 0.0 {
                return Some(w / h);
            }
        }
    }
    token
        .parse::<f32>()
        .ok()
        .filter(|n| n.is_finite() && *n > 0.0)
}

/// Add every ratio's reciprocal, dropping non-positive values and duplicates.
pub fn expand_ratios(ratios: &[f32]) -> Vec<f32> {
    let mut out: Vec<f32> = Vec::new();
    for &r in ratios {
        if !r.is_finite() || r <= 0.0 {
            continue;
        }
        for candidate in [r, 1.0 / r] {
            if !out.iter().any(|&seen| same_ratio(seen, candidate)) {
                out.push(candidate);
            }
        }
    }
    out
}

fn same_ratio(a: f32, b: f32) -> bool {
    (a - b).abs() <= RATIO_EPSILON * a.abs().max(b.abs())
}

pub fn format_buckets(buckets: &[u32]) -> String {
    buckets
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn format_ratios(ratios: &[f32]) -> String {
    ratios
        .iter()
        .map(f32::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Read settings from the store. Missing or corrupt blobs give defaults and
/// unusable fields are repaired; callers write the result back with
/// [`save_settings`].
pub fn read_settings<S: SettingsStore + ?Sized>(store: &S) -> PersistedSettings {
    store
        .get(SETTINGS_KEY)
        .and_then(|raw| match serde_json::from_str(&raw) {
            Ok(settings) => Some(settings),
            Err(err) => {
                log::warn!("Unable to load settings, using defaults: {err}");
                None
            }
        })
        .map(repair)
        .unwrap_or_default()
}

fn repair(mut settings: PersistedSettings) -> PersistedSettings {
    if parse_buckets(&settings.bucket_text).is_empty() {
        settings.bucket_text = DEFAULT_BUCKET_TEXT.to_string();
    }
    if expand_ratios(&parse_aspect_ratios(&settings.aspect_text)).is_empty() {
        settings.aspect_text = DEFAULT_ASPECT_TEXT.to_string();
    }
    settings.snap_strength = sanitize_strength(settings.snap_strength);
    settings
}

pub fn save_settings<S: SettingsStore + ?Sized>(store: &mut S, settings: &PersistedSettings) {
    match serde_json::to_string(settings) {
        Ok(json) => store.set(SETTINGS_KEY, json),
        Err(err) => log::warn!("Unable to save settings: {err}"),
    }
}
