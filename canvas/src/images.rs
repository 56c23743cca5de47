//! Decoded-image cache for image elements.
//!
//! The cache is generic over the host's image handle so the engine can be
//! exercised natively; in the browser the handle is an `HtmlImageElement`.
//! A path missing from the cache is absent; requesting it moves it to
//! `Loading` exactly once, and the host later resolves or fails it.

#[cfg(test)]
#[path = "images_test.rs"]
mod images_test;

use std::collections::HashMap;

/// Load state of one image path.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageState<H> {
    Loading,
    Ready(H),
    Failed,
}

#[derive(Debug, Clone)]
pub struct ImageCache<H> {
    entries: HashMap<String, ImageState<H>>,
}

impl<H> Default for ImageCache<H> {
    fn default() -> Self {
        Self { entries: HashMap::new() }
    }
}

impl<H> ImageCache<H> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state of `path`; `None` means absent.
    #[must_use]
    pub fn state(&self, path: &str) -> Option<&ImageState<H>> {
        self.entries.get(path)
    }

    /// Loaded handle for `path`, if ready.
    #[must_use]
    pub fn ready(&self, path: &str) -> Option<&H> {
        match self.entries.get(path) {
            Some(ImageState::Ready(handle)) => Some(handle),
            _ => None,
        }
    }

    /// Mark `path` as loading. Returns true only if the host should start a
    /// load, i.e. the path was absent.
    pub fn request(&mut self, path: &str) -> bool {
        if path.is_empty() || self.entries.contains_key(path) {
            return false;
        }
        self.entries.insert(path.to_owned(), ImageState::Loading);
        true
    }

    /// Store a decoded image for `path`.
    pub fn resolve(&mut self, path: &str, handle: H) {
        self.entries.insert(path.to_owned(), ImageState::Ready(handle));
    }

    /// Record a failed load. The path stays failed until [`ImageCache::forget`].
    pub fn fail(&mut self, path: &str) {
        log::warn!("image load failed: {path}");
        self.entries.insert(path.to_owned(), ImageState::Failed);
    }

    /// Drop `path` so the next request loads it again.
    pub fn forget(&mut self, path: &str) {
        self.entries.remove(path);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
