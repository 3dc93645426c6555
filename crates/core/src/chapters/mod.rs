use serde::{Deserialize, Serialize};

use crate::{PlayerCoreError, Result};

/// A single chapter boundary pair, in milliseconds from the start of the book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub title: String,
    pub start_ms: u64,
    pub end_ms: u64,
}

impl Chapter {
    pub fn new(title: impl Into<String>, start_ms: u64, end_ms: u64) -> Self {
        Self {
            title: title.into(),
            start_ms,
            end_ms,
        }
    }

    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }
}

/// Plain description of a book as handed over by the library layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookDescriptor {
    #[serde(default)]
    pub title: String,
    pub duration_ms: u64,
    #[serde(default)]
    pub chapters: Vec<Chapter>,
}

/// Validated, immutable chapter table for one book.
///
/// Chapters are sorted, non-overlapping and fit inside the book. Gaps between
/// chapters are allowed. An empty table is valid; positions are then mapped
/// onto fixed-length synthesized chapters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChapterTable {
    chapters: Vec<Chapter>,
}

impl ChapterTable {
    /// Validates `chapters` against the book duration.
    pub fn new(chapters: Vec<Chapter>, book_duration_ms: u64) -> Result<Self> {
        let mut previous_end = 0;
        for (index, chapter) in chapters.iter().enumerate() {
            if chapter.start_ms >= chapter.end_ms {
                return Err(PlayerCoreError::invalid_table(
                    index,
                    format!(
                        "start {} ms is not before end {} ms",
                        chapter.start_ms, chapter.end_ms
                    ),
                ));
            }
            if chapter.start_ms < previous_end {
                return Err(PlayerCoreError::invalid_table(
                    index,
                    format!(
                        "start {} ms overlaps previous chapter ending at {} ms",
                        chapter.start_ms, previous_end
                    ),
                ));
            }
            if chapter.end_ms > book_duration_ms {
                return Err(PlayerCoreError::invalid_table(
                    index,
                    format!(
                        "end {} ms exceeds book duration {} ms",
                        chapter.end_ms, book_duration_ms
                    ),
                ));
            }
            previous_end = chapter.end_ms;
        }

        Ok(Self { chapters })
    }

    /// A table with no chapters; positions fall back to synthesized chapters.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.chapters.len()
    }

    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    /// Returns the chapter with the given 1-based index.
    pub fn get(&self, index: usize) -> Option<&Chapter> {
        index.checked_sub(1).and_then(|i| self.chapters.get(i))
    }

    /// Number of chapters whose start lies at or before `position_ms`.
    pub(crate) fn count_started_by(&self, position_ms: u64) -> usize {
        self.chapters
            .partition_point(|chapter| chapter.start_ms <= position_ms)
    }
}
