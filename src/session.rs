//! The image queue and status line behind the desktop host.

use std::path::Path;

use crate::library::FileEntry;

/// Images still waiting to be cropped, and which one is on screen.
#[derive(Debug, Default)]
pub struct ImageQueue {
    images: Vec<FileEntry>,
    current: Option<usize>,
}

impl ImageQueue {
    /// Start over with a freshly listed folder; the first image becomes current.
    pub fn replace(&mut self, images: Vec<FileEntry>) {
        self.current = if images.is_empty() { None } else { Some(0) };
        self.images = images;
    }

    pub fn images(&self) -> &[FileEntry] {
        &self.images
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current(&self) -> Option<&FileEntry> {
        self.current.and_then(|index| self.images.get(index))
    }

    pub fn select(&mut self, index: usize) -> bool {
        if index < self.images.len() {
            self.current = Some(index);
            true
        } else {
            false
        }
    }

    /// Take a finished image out of the queue.
    ///
    /// When it was the current one, the image now at the same position (or
    /// the last one) becomes current and `true` is returned. An image that
    /// is no longer queued, e.g. after another folder was loaded, leaves the
    /// queue untouched.
    pub fn finish(&mut self, path: &Path) -> bool {
        let Some(index) = self.images.iter().position(|entry| entry.path == path) else {
            return false;
        };
        self.images.remove(index);
        match self.current {
            Some(current) if current == index => {
                self.current = if index < self.images.len() {
                    Some(index)
                } else {
                    self.images.len().checked_sub(1)
                };
                true
            }
            Some(current) if current > index => {
                self.current = Some(current - 1);
                false
            }
            _ => false,
        }
    }
}

/// What the bottom bar shows: the image on screen and the last outcome.
///
/// Showing a new image does not clear the outcome, so a failed save stays
/// visible after the queue moves on.
#[derive(Debug, Default)]
pub struct StatusLine {
    image: Option<String>,
    outcome: Option<String>,
}

impl StatusLine {
    pub fn set_image(&mut self, name: Option<String>) {
        self.image = name;
    }

    pub fn set_outcome(&mut self, message: impl Into<String>) {
        self.outcome = Some(message.into());
    }

    pub fn text(&self) -> String {
        match (&self.image, &self.outcome) {
            (Some(image), Some(outcome)) => format!("{image} · {outcome}"),
            (Some(image), None) => image.clone(),
            (None, Some(outcome)) => outcome.clone(),
            (None, None) => String::new(),
        }
    }
}
