use serde::{Deserialize, Serialize};
use tracing::info;

use crate::ChapterPosition;

const MS_PER_MINUTE: i64 = 60_000;

/// Sleep timer mode.
///
/// `remaining_ms` may dip below zero between a tick and its expiry handling;
/// readers go through [`SleepTimerEngine::remaining_ms`], which clamps at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SleepTimer {
    #[default]
    Off,
    Countdown { remaining_ms: i64 },
    /// Stops at the next chapter boundary. Remaining time is read from the
    /// current chapter on every query, so playback speed changes need no
    /// bookkeeping here.
    EndOfChapter,
}

/// Signals the host has to act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerSignal {
    /// The timer ran out and playback must be paused. The engine itself is
    /// already back to [`SleepTimer::Off`].
    Expired,
}

/// State machine behind the sleep timer.
#[derive(Debug, Clone, Default)]
pub struct SleepTimerEngine {
    state: SleepTimer,
}

impl SleepTimerEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds an engine from a snapshotted state. A countdown that had
    /// already run out comes back as `Off`.
    pub fn from_state(state: SleepTimer) -> Self {
        let state = match state {
            SleepTimer::Countdown { remaining_ms } if remaining_ms <= 0 => SleepTimer::Off,
            other => other,
        };
        Self { state }
    }

    pub fn state(&self) -> SleepTimer {
        self.state
    }

    pub fn is_off(&self) -> bool {
        self.state == SleepTimer::Off
    }

    pub fn set_countdown(&mut self, minutes: u32) {
        let remaining_ms = i64::from(minutes) * MS_PER_MINUTE;
        info!(minutes, "sleep timer set to countdown");
        self.state = SleepTimer::Countdown { remaining_ms };
    }

    pub fn set_end_of_chapter(&mut self) {
        info!("sleep timer set to end of chapter");
        self.state = SleepTimer::EndOfChapter;
    }

    pub fn cancel(&mut self) {
        if !self.is_off() {
            info!("sleep timer cancelled");
        }
        self.state = SleepTimer::Off;
    }

    /// Wall-clock tick from the host. Only a countdown consumes time.
    pub fn tick(&mut self, elapsed_ms: u64) -> Option<TimerSignal> {
        let SleepTimer::Countdown { remaining_ms } = self.state else {
            return None;
        };

        let elapsed = i64::try_from(elapsed_ms).unwrap_or(i64::MAX);
        let remaining_ms = remaining_ms.saturating_sub(elapsed);
        self.state = SleepTimer::Countdown { remaining_ms };

        if remaining_ms <= 0 {
            Some(self.expire())
        } else {
            None
        }
    }

    /// Called by the session whenever the current chapter index changes.
    pub fn on_chapter_boundary(&mut self) -> Option<TimerSignal> {
        (self.state == SleepTimer::EndOfChapter).then(|| self.expire())
    }

    /// Adds `minutes` to a running countdown.
    ///
    /// Only honoured while counting down and while the caller reports the
    /// warning window as active. Returns whether the timer was extended.
    pub fn extend(&mut self, minutes: u32, is_warning_active: bool) -> bool {
        match self.state {
            SleepTimer::Countdown { remaining_ms } if is_warning_active => {
                let remaining_ms =
                    remaining_ms.saturating_add(i64::from(minutes) * MS_PER_MINUTE);
                info!(minutes, remaining_ms, "sleep timer extended");
                self.state = SleepTimer::Countdown { remaining_ms };
                true
            }
            _ => false,
        }
    }

    /// Time left before the timer fires, clamped at zero. `None` when off.
    pub fn remaining_ms(&self, chapter: &ChapterPosition) -> Option<u64> {
        match self.state {
            SleepTimer::Off => None,
            SleepTimer::Countdown { remaining_ms } => Some(remaining_ms.max(0) as u64),
            SleepTimer::EndOfChapter => Some(
                chapter
                    .end_ms
                    .saturating_sub(chapter.start_ms + chapter.chapter_position_ms),
            ),
        }
    }

    /// Whether a countdown has dropped below `threshold_ms`.
    pub fn is_warning_active(&self, threshold_ms: u64) -> bool {
        match self.state {
            SleepTimer::Countdown { remaining_ms } => {
                remaining_ms < i64::try_from(threshold_ms).unwrap_or(i64::MAX)
            }
            _ => false,
        }
    }

    fn expire(&mut self) -> TimerSignal {
        info!("sleep timer expired");
        self.state = SleepTimer::Off;
        TimerSignal::Expired
    }
}
