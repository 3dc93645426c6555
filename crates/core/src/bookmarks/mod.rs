use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{PlayerCoreError, Result};

/// A saved position with an optional note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub position_ms: u64,
    #[serde(default)]
    pub note: Option<String>,
}

impl Bookmark {
    pub fn new(position_ms: u64, note: Option<String>) -> Self {
        Self { position_ms, note }
    }
}

/// Bookmarks keyed by exact position. One bookmark per position; adding at
/// an occupied position replaces its note.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookmarkStore {
    entries: BTreeMap<u64, Option<String>>,
}

impl BookmarkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bookmarks<I>(bookmarks: I) -> Self
    where
        I: IntoIterator<Item = Bookmark>,
    {
        Self {
            entries: bookmarks
                .into_iter()
                .map(|bookmark| (bookmark.position_ms, bookmark.note))
                .collect(),
        }
    }

    /// Inserts a bookmark, returning `true` when one already existed there.
    pub fn add(&mut self, position_ms: u64, note: Option<String>) -> bool {
        self.entries.insert(position_ms, note).is_some()
    }

    pub fn remove(&mut self, position_ms: u64) -> Result<Bookmark> {
        self.entries
            .remove(&position_ms)
            .map(|note| Bookmark::new(position_ms, note))
            .ok_or(PlayerCoreError::BookmarkNotFound { position_ms })
    }

    pub fn update_note(&mut self, position_ms: u64, note: Option<String>) -> Result<()> {
        let slot = self
            .entries
            .get_mut(&position_ms)
            .ok_or(PlayerCoreError::BookmarkNotFound { position_ms })?;
        *slot = note;
        Ok(())
    }

    pub fn get(&self, position_ms: u64) -> Option<Bookmark> {
        self.entries
            .get(&position_ms)
            .map(|note| Bookmark::new(position_ms, note.clone()))
    }

    /// Bookmarks in ascending position order. The iterator is lazy; call
    /// again to start over.
    pub fn list(&self) -> impl Iterator<Item = Bookmark> + '_ {
        self.entries
            .iter()
            .map(|(position_ms, note)| Bookmark::new(*position_ms, note.clone()))
    }

    /// Closest bookmark at a *different* position within `window_ms` of
    /// `position_ms`.
    pub fn nearest_within(&self, position_ms: u64, window_ms: u64) -> Option<u64> {
        let low = position_ms.saturating_sub(window_ms);
        let high = position_ms.saturating_add(window_ms);
        self.entries
            .range(low..=high)
            .map(|(existing, _)| *existing)
            .filter(|existing| *existing != position_ms)
            .min_by_key(|existing| existing.abs_diff(position_ms))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
