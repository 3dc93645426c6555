use serde::{Deserialize, Serialize};

use crate::ChapterTable;

/// Largest `f32` strictly below 1.0. Progress only reaches 1.0 exactly at a
/// chapter's end, even where `f32` rounding would otherwise round up.
const BELOW_ONE: f32 = 1.0 - f32::EPSILON / 2.0;

/// Where the playhead sits relative to its chapter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChapterPosition {
    /// 1-based chapter index.
    pub index: usize,
    pub start_ms: u64,
    pub end_ms: u64,
    pub chapter_position_ms: u64,
    /// Fraction of the chapter played, in `[0, 1]`.
    pub progress: f32,
}

impl ChapterPosition {
    pub fn length_ms(&self) -> u64 {
        self.end_ms - self.start_ms
    }
}

/// Maps an absolute book position onto the chapter table.
///
/// The mapper only stores the clamped position. Everything else is derived on
/// demand, so it never pushes events; callers diff [`ChapterPosition::index`]
/// between updates to notice a boundary crossing.
#[derive(Debug, Clone)]
pub struct PositionMapper {
    table: ChapterTable,
    duration_ms: u64,
    position_ms: u64,
    synthesized_chapter_ms: u64,
}

impl PositionMapper {
    pub fn new(table: ChapterTable, duration_ms: u64, synthesized_chapter_ms: u64) -> Self {
        Self {
            table,
            duration_ms,
            position_ms: 0,
            synthesized_chapter_ms: synthesized_chapter_ms.max(1),
        }
    }

    pub fn table(&self) -> &ChapterTable {
        &self.table
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub fn position_ms(&self) -> u64 {
        self.position_ms
    }

    /// Stores `position_ms` clamped to the book and returns the stored value.
    pub fn set_position(&mut self, position_ms: u64) -> u64 {
        self.position_ms = position_ms.min(self.duration_ms);
        self.position_ms
    }

    pub fn on_playhead_advance(&mut self, delta_ms: u64) -> u64 {
        self.set_position(self.position_ms.saturating_add(delta_ms))
    }

    pub fn is_synthesized(&self) -> bool {
        self.table.is_empty()
    }

    pub fn chapter_count(&self) -> usize {
        if self.is_synthesized() {
            self.synthesized_count()
        } else {
            self.table.len()
        }
    }

    /// Boundaries of the chapter with the given 1-based index.
    pub fn chapter_bounds(&self, index: usize) -> Option<(u64, u64)> {
        if self.is_synthesized() {
            if index == 0 || index > self.synthesized_count() {
                return None;
            }
            let start = (index as u64 - 1) * self.synthesized_chapter_ms;
            let end = (index as u64)
                .saturating_mul(self.synthesized_chapter_ms)
                .min(self.duration_ms);
            Some((start, end))
        } else {
            self.table
                .get(index)
                .map(|chapter| (chapter.start_ms, chapter.end_ms))
        }
    }

    pub fn chapter_title(&self, index: usize) -> Option<String> {
        if self.is_synthesized() {
            (index >= 1 && index <= self.synthesized_count()).then(|| format!("Chapter {index}"))
        } else {
            self.table.get(index).map(|chapter| chapter.title.clone())
        }
    }

    /// Resolves the current chapter. O(log n) over the table, O(1) when
    /// chapters are synthesized.
    pub fn current_chapter(&self) -> ChapterPosition {
        let index = if self.is_synthesized() {
            let count = self.synthesized_count();
            ((self.position_ms / self.synthesized_chapter_ms) as usize + 1).min(count)
        } else {
            // Positions before the first chapter still report chapter 1.
            self.table.count_started_by(self.position_ms).max(1)
        };

        let (start_ms, end_ms) = self.chapter_bounds(index).unwrap_or((0, self.duration_ms));
        let length = end_ms - start_ms;
        // Gaps after a chapter's end count as the end of that chapter.
        let chapter_position_ms = self.position_ms.saturating_sub(start_ms).min(length);

        ChapterPosition {
            index,
            start_ms,
            end_ms,
            chapter_position_ms,
            progress: progress_ratio(chapter_position_ms, length),
        }
    }

    /// Fraction of the whole book played.
    pub fn book_progress(&self) -> f32 {
        progress_ratio(self.position_ms, self.duration_ms)
    }

    fn synthesized_count(&self) -> usize {
        (self.duration_ms.div_ceil(self.synthesized_chapter_ms) as usize).max(1)
    }
}

fn progress_ratio(position: u64, length: u64) -> f32 {
    if length == 0 {
        return 0.0;
    }
    if position >= length {
        return 1.0;
    }
    ((position as f64 / length as f64) as f32).clamp(0.0, BELOW_ONE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Chapter, DEFAULT_SYNTHESIZED_CHAPTER_MS};

    fn two_chapter_mapper() -> PositionMapper {
        let table = ChapterTable::new(
            vec![
                Chapter::new("Ch1", 0, 1_800_000),
                Chapter::new("Ch2", 1_800_000, 7_200_000),
            ],
            7_200_000,
        )
        .unwrap();
        PositionMapper::new(table, 7_200_000, DEFAULT_SYNTHESIZED_CHAPTER_MS)
    }

    fn synthesized(duration_ms: u64) -> PositionMapper {
        PositionMapper::new(ChapterTable::empty(), duration_ms, DEFAULT_SYNTHESIZED_CHAPTER_MS)
    }

    #[test]
    fn reports_chapter_just_before_boundary() {
        let mut mapper = two_chapter_mapper();
        mapper.set_position(1_799_999);

        let chapter = mapper.current_chapter();
        assert_eq!(chapter.index, 1);
        assert!((chapter.progress - 0.999_999_4).abs() < 1e-6);
        assert!(chapter.progress < 1.0);
    }

    #[test]
    fn boundary_belongs_to_next_chapter() {
        let mut mapper = two_chapter_mapper();
        mapper.set_position(1_800_000);

        let chapter = mapper.current_chapter();
        assert_eq!(chapter.index, 2);
        assert_eq!(chapter.chapter_position_ms, 0);
        assert_eq!(chapter.progress, 0.0);
    }

    #[test]
    fn clamps_positions_past_the_end() {
        let mut mapper = two_chapter_mapper();
        assert_eq!(mapper.set_position(u64::MAX), 7_200_000);
        assert_eq!(mapper.on_playhead_advance(u64::MAX), 7_200_000);

        let chapter = mapper.current_chapter();
        assert_eq!(chapter.index, 2);
        assert_eq!(chapter.progress, 1.0);
        assert_eq!(mapper.book_progress(), 1.0);
    }

    #[test]
    fn advances_playhead_by_delta() {
        let mut mapper = two_chapter_mapper();
        mapper.set_position(1_000);
        assert_eq!(mapper.on_playhead_advance(500), 1_500);
    }

    #[test]
    fn synthesizes_half_hour_chapters() {
        let mut mapper = synthesized(4_000_000);
        assert_eq!(mapper.chapter_count(), 3);

        mapper.set_position(3_700_000);
        let chapter = mapper.current_chapter();
        assert_eq!(chapter.index, 3);
        assert_eq!(chapter.start_ms, 3_600_000);
        assert_eq!(chapter.end_ms, 4_000_000);
        assert_eq!(chapter.chapter_position_ms, 100_000);
        assert_eq!(mapper.chapter_title(3).as_deref(), Some("Chapter 3"));
    }

    #[test]
    fn synthesized_end_of_exact_multiple_stays_in_last_chapter() {
        let mut mapper = synthesized(3_600_000);
        mapper.set_position(3_600_000);

        let chapter = mapper.current_chapter();
        assert_eq!(chapter.index, 2);
        assert_eq!(chapter.progress, 1.0);
    }

    #[test]
    fn zero_length_book_has_single_empty_chapter() {
        let mut mapper = synthesized(0);
        mapper.set_position(10_000);

        let chapter = mapper.current_chapter();
        assert_eq!(mapper.chapter_count(), 1);
        assert_eq!(chapter.index, 1);
        assert_eq!(chapter.length_ms(), 0);
        assert_eq!(chapter.progress, 0.0);
        assert_eq!(mapper.book_progress(), 0.0);
    }

    #[test]
    fn handles_gaps_and_leading_silence() {
        let table = ChapterTable::new(
            vec![Chapter::new("A", 1_000, 2_000), Chapter::new("B", 5_000, 9_000)],
            10_000,
        )
        .unwrap();
        let mut mapper = PositionMapper::new(table, 10_000, DEFAULT_SYNTHESIZED_CHAPTER_MS);

        mapper.set_position(500);
        let leading = mapper.current_chapter();
        assert_eq!(leading.index, 1);
        assert_eq!(leading.chapter_position_ms, 0);

        mapper.set_position(3_000);
        let gap = mapper.current_chapter();
        assert_eq!(gap.index, 1);
        assert_eq!(gap.progress, 1.0);

        mapper.set_position(9_500);
        assert_eq!(mapper.current_chapter().index, 2);
    }
}
