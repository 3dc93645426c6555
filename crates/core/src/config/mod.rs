use serde::{Deserialize, Serialize};

/// Length of a synthesized chapter when a book ships without a chapter table.
pub const DEFAULT_SYNTHESIZED_CHAPTER_MS: u64 = 30 * 60 * 1000;
/// Countdown remaining below which the sleep timer counts as "warning".
pub const DEFAULT_WARNING_THRESHOLD_MS: u64 = 120_000;

/// Top-level configuration for a playback session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub synthesized_chapter_ms: u64,
    pub warning_threshold_ms: u64,
    /// Minimum distance between two bookmarks at different positions.
    /// Zero disables the check.
    pub bookmark_min_spacing_ms: u64,
    /// When set, sleep timer ticks are ignored while playback is paused.
    pub tick_only_while_playing: bool,
    pub transition: TransitionConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            synthesized_chapter_ms: DEFAULT_SYNTHESIZED_CHAPTER_MS,
            warning_threshold_ms: DEFAULT_WARNING_THRESHOLD_MS,
            bookmark_min_spacing_ms: 0,
            tick_only_while_playing: true,
            transition: TransitionConfig::default(),
        }
    }
}

/// Timing of the chapter-change "fill then snap" effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionConfig {
    /// Fill duration for a full 0.0 -> 1.0 distance, before clamping.
    pub ms_per_unit: u64,
    pub min_fill_ms: u64,
    pub max_fill_ms: u64,
    /// How long the snapped 0.0 value is held before live tracking resumes.
    pub settle_ms: u64,
    /// Upper clamp applied to the starting progress so the fill is always visible.
    pub max_start_progress: f32,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            ms_per_unit: 200,
            min_fill_ms: 80,
            max_fill_ms: 200,
            settle_ms: 60,
            max_start_progress: 0.99,
        }
    }
}
