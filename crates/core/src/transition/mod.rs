use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::TransitionConfig;

/// One point of the chapter-change progress curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransitionSample {
    pub elapsed_ms: u64,
    pub progress: f32,
}

impl TransitionSample {
    fn new(elapsed_ms: u64, progress: f32) -> Self {
        Self {
            elapsed_ms,
            progress,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Filling,
    Holding,
    Settled,
    Finished,
}

/// What a single frame produced. `peak` is set on the frame that completes the
/// fill; the snap to 0.0 then follows at the same timestamp.
#[derive(Debug, Clone, Copy)]
struct Frame {
    peak: Option<TransitionSample>,
    sample: Option<TransitionSample>,
}

/// Cursor over a single "fill to 100%, snap to 0%, settle" effect.
///
/// The host pulls samples at its own frame rate with [`advance`]. Dropping the
/// handle cancels the effect; nothing keeps running in the background.
///
/// [`advance`]: AnimationHandle::advance
#[derive(Debug, Clone)]
pub struct AnimationHandle {
    from: f32,
    fill_ms: u64,
    settle_ms: u64,
    elapsed_ms: u64,
    phase: Phase,
    last: TransitionSample,
}

impl AnimationHandle {
    fn new(from: f32, config: &TransitionConfig) -> Self {
        let upper = config.max_start_progress.clamp(0.0, 1.0);
        let from = if from.is_nan() { 0.0 } else { from.clamp(0.0, upper) };
        let distance = 1.0 - from;
        let fill_ms = ((distance * config.ms_per_unit as f32).round() as u64)
            .max(config.min_fill_ms)
            .min(config.max_fill_ms);

        Self {
            from,
            fill_ms,
            settle_ms: config.settle_ms,
            elapsed_ms: 0,
            phase: Phase::Filling,
            last: TransitionSample::new(0, from),
        }
    }

    /// Starting progress after clamping.
    pub fn from_progress(&self) -> f32 {
        self.from
    }

    pub fn fill_ms(&self) -> u64 {
        self.fill_ms
    }

    /// Total length of the effect, fill plus settle hold.
    pub fn total_ms(&self) -> u64 {
        self.fill_ms + self.settle_ms
    }

    /// The most recently emitted sample. Right after creation this is the
    /// starting value at `elapsed_ms == 0`.
    pub fn last_sample(&self) -> TransitionSample {
        self.last
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    /// Moves the effect forward by `delta_ms` and returns the sample to
    /// display, or `None` once the effect has terminated.
    ///
    /// The frame that completes the fill returns the snap to 0.0, stamped at
    /// the end of the fill. The 0.0 value is then held until [`total_ms`],
    /// which always gets a final sample of its own.
    ///
    /// [`total_ms`]: AnimationHandle::total_ms
    pub fn advance(&mut self, delta_ms: u64) -> Option<TransitionSample> {
        self.step(delta_ms).sample
    }

    fn step(&mut self, delta_ms: u64) -> Frame {
        let target = self.elapsed_ms.saturating_add(delta_ms);
        let mut peak = None;

        let sample = match self.phase {
            Phase::Filling if target < self.fill_ms => {
                let t = target as f32 / self.fill_ms as f32;
                TransitionSample::new(target, self.from + (1.0 - self.from) * t)
            }
            Phase::Filling => {
                self.phase = Phase::Holding;
                peak = Some(TransitionSample::new(self.fill_ms, 1.0));
                TransitionSample::new(self.fill_ms, 0.0)
            }
            Phase::Holding if target < self.total_ms() => TransitionSample::new(target, 0.0),
            Phase::Holding => {
                self.phase = Phase::Settled;
                TransitionSample::new(self.total_ms(), 0.0)
            }
            Phase::Settled | Phase::Finished => {
                self.phase = Phase::Finished;
                return Frame { peak, sample: None };
            }
        };

        self.elapsed_ms = target;
        self.last = sample;
        Frame {
            peak,
            sample: Some(sample),
        }
    }

    /// Full sample sequence of this effect from the start, stepping
    /// `frame_ms` per sample. Unlike [`advance`], the sequence includes the
    /// 1.0 peak right before the snap. Each call starts over from the beginning.
    ///
    /// [`advance`]: AnimationHandle::advance
    pub fn samples(&self, frame_ms: u64) -> TransitionSamples {
        TransitionSamples {
            cursor: Self {
                elapsed_ms: 0,
                phase: Phase::Filling,
                last: TransitionSample::new(0, self.from),
                ..self.clone()
            },
            frame_ms: frame_ms.max(1),
            started: false,
            queued: None,
        }
    }
}

/// Finite iterator over an effect's samples, see [`AnimationHandle::samples`].
#[derive(Debug, Clone)]
pub struct TransitionSamples {
    cursor: AnimationHandle,
    frame_ms: u64,
    started: bool,
    queued: Option<TransitionSample>,
}

impl Iterator for TransitionSamples {
    type Item = TransitionSample;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.started {
            self.started = true;
            return Some(self.cursor.last_sample());
        }
        if let Some(sample) = self.queued.take() {
            return Some(sample);
        }

        let frame = self.cursor.step(self.frame_ms);
        match frame.peak {
            Some(peak) => {
                self.queued = frame.sample;
                Some(peak)
            }
            None => frame.sample,
        }
    }
}

/// Owns the single in-flight chapter transition of a session.
#[derive(Debug, Clone, Default)]
pub struct ChapterTransitionAnimator {
    config: TransitionConfig,
    active: Option<AnimationHandle>,
}

impl ChapterTransitionAnimator {
    pub fn new(config: TransitionConfig) -> Self {
        Self {
            config,
            active: None,
        }
    }

    /// Builds a fresh effect starting at `from_progress` without touching the
    /// in-flight one.
    pub fn begin_transition(&self, from_progress: f32) -> AnimationHandle {
        AnimationHandle::new(from_progress, &self.config)
    }

    /// Starts the effect for a chapter change and returns the starting
    /// progress actually used.
    ///
    /// An in-flight effect is cancelled and the new one picks up from its last
    /// emitted value instead of `displayed_progress`.
    pub fn restart(&mut self, displayed_progress: f32) -> f32 {
        let from = match self.active.take() {
            Some(previous) => {
                let from = previous.last_sample().progress;
                debug!(from, "restarting chapter transition mid-flight");
                from
            }
            None => displayed_progress,
        };

        let handle = self.begin_transition(from);
        let start = handle.from_progress();
        self.active = Some(handle);
        start
    }

    /// Advances the in-flight effect. Returns the value to display, or `None`
    /// when no effect is running (any longer).
    pub fn advance(&mut self, delta_ms: u64) -> Option<f32> {
        let handle = self.active.as_mut()?;
        match handle.advance(delta_ms) {
            Some(sample) => Some(sample.progress),
            None => {
                self.active = None;
                None
            }
        }
    }

    /// Value currently shown by the effect, if one is running.
    pub fn displayed(&self) -> Option<f32> {
        self.active.as_ref().map(|handle| handle.last_sample().progress)
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn active(&self) -> Option<&AnimationHandle> {
        self.active.as_ref()
    }

    /// Drops the in-flight effect, returning its last displayed value.
    pub fn cancel(&mut self) -> Option<f32> {
        self.active
            .take()
            .map(|handle| handle.last_sample().progress)
    }
}
