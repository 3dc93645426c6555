use audiobook_player_core::{
    Chapter, ChapterTable, PositionMapper, SleepTimer, SleepTimerEngine, TimerSignal,
    DEFAULT_SYNTHESIZED_CHAPTER_MS,
};
use proptest::prelude::*;

/// Contiguous chapters from zero that exactly cover the book.
fn arb_contiguous_book() -> impl Strategy<Value = (Vec<Chapter>, u64)> {
    prop::collection::vec(1u64..5_000_000, 1..24).prop_map(|lengths| {
        let mut start = 0;
        let chapters = lengths
            .iter()
            .enumerate()
            .map(|(i, length)| {
                let chapter = Chapter::new(format!("Chapter {}", i + 1), start, start + length);
                start += length;
                chapter
            })
            .collect();
        (chapters, start)
    })
}

/// Chapters with gaps, leading silence and trailing silence.
fn arb_gappy_book() -> impl Strategy<Value = (Vec<Chapter>, u64)> {
    prop::collection::vec((0u64..50_000, 1u64..500_000), 1..16).prop_flat_map(|spans| {
        let mut cursor = 0;
        let chapters: Vec<_> = spans
            .iter()
            .map(|(gap, length)| {
                let start = cursor + gap;
                cursor = start + length;
                Chapter::new("gap", start, cursor)
            })
            .collect();
        (Just(chapters), cursor..cursor + 100_000)
    })
}

fn mapper_for(chapters: Vec<Chapter>, duration_ms: u64) -> PositionMapper {
    let table = ChapterTable::new(chapters, duration_ms).expect("generated table is valid");
    PositionMapper::new(table, duration_ms, DEFAULT_SYNTHESIZED_CHAPTER_MS)
}

proptest! {
    /// The reported chapter always contains the position.
    #[test]
    fn chapter_contains_position(
        (chapters, duration) in arb_contiguous_book(),
        fraction in 0.0f64..=1.0,
    ) {
        let mut mapper = mapper_for(chapters, duration);
        let position = (duration as f64 * fraction) as u64;
        mapper.set_position(position);

        let chapter = mapper.current_chapter();
        prop_assert!(chapter.start_ms <= position);
        prop_assert!(position <= chapter.end_ms);
        prop_assert_eq!(chapter.start_ms + chapter.chapter_position_ms, position);
    }

    /// Chapter index never goes backwards while the playhead moves forward.
    #[test]
    fn chapter_index_is_monotonic((chapters, duration) in arb_gappy_book(), step in 1u64..250_000) {
        let mut mapper = mapper_for(chapters, duration);
        let mut previous = mapper.current_chapter().index;

        while mapper.position_ms() < duration {
            mapper.on_playhead_advance(step);
            let index = mapper.current_chapter().index;
            prop_assert!(index >= previous);
            previous = index;
        }
    }

    /// Progress stays in [0, 1] and is exactly 1.0 only at the chapter's end.
    #[test]
    fn progress_is_bounded((chapters, duration) in arb_gappy_book(), position in 0u64..2_000_000) {
        let mut mapper = mapper_for(chapters, duration);
        mapper.set_position(position);

        let chapter = mapper.current_chapter();
        prop_assert!((0.0..=1.0).contains(&chapter.progress));
        prop_assert_eq!(
            chapter.progress == 1.0,
            chapter.chapter_position_ms == chapter.length_ms() && chapter.length_ms() > 0
        );
    }

    /// Synthesized chapters behave like a regular table.
    #[test]
    fn synthesized_chapters_contain_position(
        duration in 0u64..50_000_000,
        fraction in 0.0f64..=1.0,
    ) {
        let mut mapper =
            PositionMapper::new(ChapterTable::empty(), duration, DEFAULT_SYNTHESIZED_CHAPTER_MS);
        let position = (duration as f64 * fraction) as u64;
        mapper.set_position(position);

        let chapter = mapper.current_chapter();
        prop_assert!(chapter.index >= 1 && chapter.index <= mapper.chapter_count());
        prop_assert!(chapter.start_ms <= position && position <= chapter.end_ms);
        prop_assert_eq!(chapter.start_ms + chapter.chapter_position_ms, position);
    }

    /// A countdown fires exactly once, however the time is sliced.
    #[test]
    fn countdown_fires_once(minutes in 1u32..90, tick in 1u64..120_000) {
        let mut engine = SleepTimerEngine::new();
        engine.set_countdown(minutes);

        let total = u64::from(minutes) * 60_000;
        let ticks = total.div_ceil(tick) + 10;
        let fired = (0..ticks)
            .filter_map(|_| engine.tick(tick))
            .filter(|signal| *signal == TimerSignal::Expired)
            .count();

        prop_assert_eq!(fired, 1);
        prop_assert_eq!(engine.state(), SleepTimer::Off);
    }

    /// Extension outside the warning window never changes the countdown.
    #[test]
    fn extension_is_gated(minutes in 1u32..90, extra in 1u32..60) {
        let mut engine = SleepTimerEngine::new();
        engine.set_countdown(minutes);
        let before = engine.state();

        prop_assert!(!engine.extend(extra, false));
        prop_assert_eq!(engine.state(), before);

        prop_assert!(engine.extend(extra, true));
        let expected = i64::from(minutes) * 60_000 + i64::from(extra) * 60_000;
        prop_assert_eq!(engine.state(), SleepTimer::Countdown { remaining_ms: expected });
    }
}
