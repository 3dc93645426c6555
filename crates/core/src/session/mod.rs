use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    BookDescriptor, Bookmark, BookmarkStore, ChapterPosition, ChapterTable,
    ChapterTransitionAnimator, PlayerCoreError, PositionMapper, Result, SessionConfig,
    SleepTimer, SleepTimerEngine, TimerSignal,
};

const MS_PER_MINUTE: u64 = 60_000;

/// Notifications produced by session updates, in the order they happened.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    ChapterChanged { from: usize, to: usize },
    TransitionStarted { from_progress: f32 },
    SleepTimerExpired,
    /// The host must pause the audio engine.
    PauseRequested,
    WarningEntered,
    WarningExited,
}

/// Sleep timer as shown on the player screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SleepTimerDisplay {
    Off,
    /// Whole minutes left, rounded up.
    Remaining { minutes: u64 },
    UntilChapterEnd,
}

impl fmt::Display for SleepTimerDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Off => f.write_str("Off"),
            Self::Remaining { minutes } => write!(f, "{minutes}m remaining"),
            Self::UntilChapterEnd => f.write_str("until chapter end"),
        }
    }
}

/// Everything the player screen renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerViewModel {
    pub title: String,
    pub chapter_index: usize,
    pub chapter_count: usize,
    pub chapter_title: String,
    /// Progress to draw: the transition value while one is running, the live
    /// chapter progress otherwise.
    pub chapter_progress: f32,
    pub live_chapter_progress: f32,
    pub transition_active: bool,
    pub book_progress: f32,
    pub position_ms: u64,
    pub duration_ms: u64,
    pub is_playing: bool,
    pub sleep_timer: SleepTimerDisplay,
    pub sleep_timer_remaining_ms: Option<u64>,
    pub sleep_timer_warning: bool,
    pub bookmarks: Vec<Bookmark>,
}

/// State a host persists to reopen a book where the listener left off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub position_ms: u64,
    #[serde(default)]
    pub is_playing: bool,
    #[serde(default)]
    pub sleep_timer: SleepTimer,
    #[serde(default)]
    pub bookmarks: Vec<Bookmark>,
}

/// Orchestrates one open book.
///
/// The session is the only writer of its components. Transport updates,
/// gestures and clock ticks all funnel through `&mut self`, so none of the
/// components carry their own locking.
#[derive(Debug, Clone)]
pub struct PlaybackSession {
    config: SessionConfig,
    title: String,
    mapper: PositionMapper,
    animator: ChapterTransitionAnimator,
    timer: SleepTimerEngine,
    bookmarks: BookmarkStore,
    is_playing: bool,
    last_chapter: usize,
    displayed_progress: f32,
    warning_active: bool,
}

impl PlaybackSession {
    /// Opens a book. Fails when its chapter table is malformed.
    pub fn open(book: &BookDescriptor, config: SessionConfig) -> Result<Self> {
        let table = ChapterTable::new(book.chapters.clone(), book.duration_ms)?;
        Ok(Self::with_table(book, table, config))
    }

    /// Opens a book, falling back to synthesized chapters when its chapter
    /// table is malformed.
    pub fn open_or_fallback(book: &BookDescriptor, config: SessionConfig) -> Self {
        match ChapterTable::new(book.chapters.clone(), book.duration_ms) {
            Ok(table) => Self::with_table(book, table, config),
            Err(err) => {
                warn!(
                    title = %book.title,
                    error = %err,
                    "chapter table rejected, using synthesized chapters"
                );
                Self::with_table(book, ChapterTable::empty(), config)
            }
        }
    }

    /// Reopens a book from a snapshot. No chapter change or transition is
    /// reported for the restored position.
    pub fn restore(
        book: &BookDescriptor,
        snapshot: &SessionSnapshot,
        config: SessionConfig,
    ) -> Result<Self> {
        Ok(Self::open(book, config)?.with_snapshot(snapshot))
    }

    /// Like [`restore`], but reopens a book with a malformed chapter table on
    /// synthesized chapters, the same way [`open_or_fallback`] does.
    ///
    /// [`restore`]: PlaybackSession::restore
    /// [`open_or_fallback`]: PlaybackSession::open_or_fallback
    pub fn restore_or_fallback(
        book: &BookDescriptor,
        snapshot: &SessionSnapshot,
        config: SessionConfig,
    ) -> Self {
        Self::open_or_fallback(book, config).with_snapshot(snapshot)
    }

    fn with_snapshot(mut self, snapshot: &SessionSnapshot) -> Self {
        self.mapper.set_position(snapshot.position_ms);
        let chapter = self.mapper.current_chapter();
        self.last_chapter = chapter.index;
        self.displayed_progress = chapter.progress;
        self.is_playing = snapshot.is_playing;
        self.timer = SleepTimerEngine::from_state(snapshot.sleep_timer);
        self.warning_active = self
            .timer
            .is_warning_active(self.config.warning_threshold_ms);
        self.bookmarks = BookmarkStore::from_bookmarks(snapshot.bookmarks.iter().cloned());
        self
    }

    fn with_table(book: &BookDescriptor, table: ChapterTable, config: SessionConfig) -> Self {
        let mapper = PositionMapper::new(table, book.duration_ms, config.synthesized_chapter_ms);
        let chapter = mapper.current_chapter();
        info!(
            title = %book.title,
            duration_ms = book.duration_ms,
            chapters = mapper.chapter_count(),
            synthesized = mapper.is_synthesized(),
            "book opened"
        );

        Self {
            animator: ChapterTransitionAnimator::new(config.transition.clone()),
            config,
            title: book.title.clone(),
            mapper,
            timer: SleepTimerEngine::new(),
            bookmarks: BookmarkStore::new(),
            is_playing: false,
            last_chapter: chapter.index,
            displayed_progress: chapter.progress,
            warning_active: false,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn position_ms(&self) -> u64 {
        self.mapper.position_ms()
    }

    pub fn mapper(&self) -> &PositionMapper {
        &self.mapper
    }

    pub fn animator(&self) -> &ChapterTransitionAnimator {
        &self.animator
    }

    pub fn sleep_timer(&self) -> SleepTimer {
        self.timer.state()
    }

    pub fn bookmarks(&self) -> &BookmarkStore {
        &self.bookmarks
    }

    pub fn current_chapter(&self) -> ChapterPosition {
        self.mapper.current_chapter()
    }

    /// Progress value the screen should draw right now.
    pub fn displayed_progress(&self) -> f32 {
        self.animator
            .displayed()
            .unwrap_or(self.displayed_progress)
    }

    /// Position and play state reported by the audio engine.
    pub fn update_transport(&mut self, position_ms: u64, is_playing: bool) -> Vec<SessionEvent> {
        self.is_playing = is_playing;
        self.apply_position(position_ms)
    }

    pub fn set_playing(&mut self, is_playing: bool) {
        self.is_playing = is_playing;
    }

    pub fn advance_playhead(&mut self, delta_ms: u64) -> Vec<SessionEvent> {
        let target = self.mapper.position_ms().saturating_add(delta_ms);
        self.apply_position(target)
    }

    /// Seeks anywhere in the book. Out-of-range targets are clamped.
    pub fn seek_to(&mut self, position_ms: u64) -> Vec<SessionEvent> {
        debug!(position_ms, "seek requested");
        self.apply_position(position_ms)
    }

    /// Jumps to the start of the next chapter. Does nothing on the last one.
    pub fn next_chapter(&mut self) -> Vec<SessionEvent> {
        let index = self.mapper.current_chapter().index;
        match self.mapper.chapter_bounds(index + 1) {
            Some((start_ms, _)) => self.apply_position(start_ms),
            None => Vec::new(),
        }
    }

    /// Jumps to the start of the previous chapter, or to the start of the
    /// first chapter when already there. Never moves the playhead forward, so
    /// leading silence before the first chapter stays put.
    pub fn previous_chapter(&mut self) -> Vec<SessionEvent> {
        let index = self.mapper.current_chapter().index;
        match self.mapper.chapter_bounds(index.saturating_sub(1).max(1)) {
            Some((start_ms, _)) if start_ms <= self.mapper.position_ms() => {
                self.apply_position(start_ms)
            }
            _ => Vec::new(),
        }
    }

    /// Periodic wall-clock tick from the host, normally once per second.
    pub fn tick(&mut self, elapsed_ms: u64) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        if self.is_playing || !self.config.tick_only_while_playing {
            if let Some(TimerSignal::Expired) = self.timer.tick(elapsed_ms) {
                self.expire(&mut events);
            }
        }
        self.refresh_warning(&mut events);
        events
    }

    /// Advances the chapter transition by one host frame and returns the
    /// progress to draw.
    pub fn advance_animation(&mut self, delta_ms: u64) -> f32 {
        if self.animator.is_active() && self.animator.advance(delta_ms).is_none() {
            // Live tracking resumes once the effect has settled.
            self.displayed_progress = self.mapper.current_chapter().progress;
        }
        self.displayed_progress()
    }

    pub fn set_sleep_timer(&mut self, minutes: u32) {
        self.timer.set_countdown(minutes);
    }

    pub fn set_sleep_timer_end_of_chapter(&mut self) {
        self.timer.set_end_of_chapter();
    }

    pub fn cancel_sleep_timer(&mut self) {
        self.timer.cancel();
    }

    /// Extends a countdown that is inside the warning window. Returns whether
    /// the extension was applied.
    pub fn extend_sleep_timer(&mut self, minutes: u32) -> bool {
        let is_warning_active = self
            .timer
            .is_warning_active(self.config.warning_threshold_ms);
        self.timer.extend(minutes, is_warning_active)
    }

    /// Bookmarks the current position and returns it.
    pub fn add_bookmark(&mut self, note: Option<String>) -> Result<u64> {
        let position_ms = self.mapper.position_ms();
        let spacing = self.config.bookmark_min_spacing_ms;
        if spacing > 0 {
            if let Some(existing_ms) = self.bookmarks.nearest_within(position_ms, spacing) {
                return Err(PlayerCoreError::BookmarkTooClose {
                    position_ms,
                    existing_ms,
                });
            }
        }

        self.bookmarks.add(position_ms, note);
        Ok(position_ms)
    }

    pub fn remove_bookmark(&mut self, position_ms: u64) -> Result<Bookmark> {
        self.bookmarks.remove(position_ms)
    }

    pub fn update_bookmark_note(&mut self, position_ms: u64, note: Option<String>) -> Result<()> {
        self.bookmarks.update_note(position_ms, note)
    }

    pub fn view(&self) -> PlayerViewModel {
        let chapter = self.mapper.current_chapter();
        let remaining = self.timer.remaining_ms(&chapter);
        let sleep_timer = match (self.timer.state(), remaining) {
            (SleepTimer::Countdown { .. }, Some(remaining_ms)) => SleepTimerDisplay::Remaining {
                minutes: remaining_ms.div_ceil(MS_PER_MINUTE),
            },
            (SleepTimer::EndOfChapter, _) => SleepTimerDisplay::UntilChapterEnd,
            _ => SleepTimerDisplay::Off,
        };

        PlayerViewModel {
            title: self.title.clone(),
            chapter_index: chapter.index,
            chapter_count: self.mapper.chapter_count(),
            chapter_title: self.mapper.chapter_title(chapter.index).unwrap_or_default(),
            chapter_progress: self.displayed_progress(),
            live_chapter_progress: chapter.progress,
            transition_active: self.animator.is_active(),
            book_progress: self.mapper.book_progress(),
            position_ms: self.mapper.position_ms(),
            duration_ms: self.mapper.duration_ms(),
            is_playing: self.is_playing,
            sleep_timer,
            sleep_timer_remaining_ms: remaining,
            sleep_timer_warning: self
                .timer
                .is_warning_active(self.config.warning_threshold_ms),
            bookmarks: self.bookmarks.list().collect(),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            position_ms: self.mapper.position_ms(),
            is_playing: self.is_playing,
            sleep_timer: self.timer.state(),
            bookmarks: self.bookmarks.list().collect(),
        }
    }

    fn apply_position(&mut self, position_ms: u64) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        let previous = self.last_chapter;
        self.mapper.set_position(position_ms);
        let chapter = self.mapper.current_chapter();

        if chapter.index == previous {
            if !self.animator.is_active() {
                self.displayed_progress = chapter.progress;
            }
            return events;
        }

        debug!(
            from = previous,
            to = chapter.index,
            position_ms = self.mapper.position_ms(),
            "chapter boundary crossed"
        );
        self.last_chapter = chapter.index;
        events.push(SessionEvent::ChapterChanged {
            from: previous,
            to: chapter.index,
        });

        let from_progress = self.animator.restart(self.displayed_progress);
        events.push(SessionEvent::TransitionStarted { from_progress });

        if let Some(TimerSignal::Expired) = self.timer.on_chapter_boundary() {
            self.expire(&mut events);
        }
        events
    }

    fn expire(&mut self, events: &mut Vec<SessionEvent>) {
        info!(
            position_ms = self.mapper.position_ms(),
            "sleep timer expired, pausing playback"
        );
        self.is_playing = false;
        events.push(SessionEvent::SleepTimerExpired);
        events.push(SessionEvent::PauseRequested);
    }

    fn refresh_warning(&mut self, events: &mut Vec<SessionEvent>) {
        let active = self
            .timer
            .is_warning_active(self.config.warning_threshold_ms);
        if active != self.warning_active {
            self.warning_active = active;
            events.push(if active {
                SessionEvent::WarningEntered
            } else {
                SessionEvent::WarningExited
            });
        }
    }
}
