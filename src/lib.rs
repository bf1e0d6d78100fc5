//! Step through a folder of images and cut rectangular crops out of each one,
//! with freehand rectangles nudged toward configured resolutions and aspect
//! ratios.

pub mod clamp;
pub mod editor;
pub mod error;
pub mod geometry;
pub mod handle;
pub mod library;
pub mod mapper;
pub mod session;
pub mod settings;
pub mod snap;

pub use editor::{EditorKey, EditorRequest, Interaction, Modifiers, RectangleEditor};
pub use error::CropError;
pub use geometry::{CropRect, ImageSize};
pub use library::{CropLibrary, FileEntry, FsLibrary};
pub use settings::{PersistedSettings, SettingsStore, SnapSettings};
