//! Core engine behind the audiobook player screen.
//!
//! The crate turns a raw elapsed-time value and a book's chapter table into
//! "which chapter, how far in", drives the chapter-change progress effect and
//! runs the sleep timer. Everything is synchronous state driven by the host:
//! no audio decoding, file access or rendering happens here. Each module owns
//! one component and [`PlaybackSession`] ties them together for a single open
//! book.

pub mod bookmarks;
pub mod chapters;
pub mod config;
pub mod error;
pub mod position;
pub mod session;
pub mod sleep_timer;
pub mod transition;

pub use bookmarks::{Bookmark, BookmarkStore};
pub use chapters::{BookDescriptor, Chapter, ChapterTable};
pub use config::{
    SessionConfig, TransitionConfig, DEFAULT_SYNTHESIZED_CHAPTER_MS, DEFAULT_WARNING_THRESHOLD_MS,
};
pub use error::{PlayerCoreError, Result};
pub use position::{ChapterPosition, PositionMapper};
pub use session::{
    PlaybackSession, PlayerViewModel, SessionEvent, SessionSnapshot, SleepTimerDisplay,
};
pub use sleep_timer::{SleepTimer, SleepTimerEngine, TimerSignal};
pub use transition::{
    AnimationHandle, ChapterTransitionAnimator, TransitionSample, TransitionSamples,
};
