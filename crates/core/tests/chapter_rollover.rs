use audiobook_player_core::{
    BookDescriptor, BookmarkStore, Chapter, PlaybackSession, SessionConfig, SessionEvent,
};

fn two_hour_book() -> BookDescriptor {
    BookDescriptor {
        title: "Rollover".to_string(),
        duration_ms: 7_200_000,
        chapters: vec![
            Chapter::new("Ch1", 0, 1_800_000),
            Chapter::new("Ch2", 1_800_000, 7_200_000),
        ],
    }
}

#[test]
fn natural_rollover_fills_then_snaps_within_200ms() {
    let mut session = PlaybackSession::open(&two_hour_book(), SessionConfig::default())
        .expect("book should open");

    session.update_transport(1_799_999, true);
    let before = session.current_chapter();
    assert_eq!(before.index, 1);
    assert!((before.progress - 0.999_999_4).abs() < 1e-6);

    let events = session.update_transport(1_800_000, true);
    assert_eq!(
        events,
        vec![
            SessionEvent::ChapterChanged { from: 1, to: 2 },
            SessionEvent::TransitionStarted {
                from_progress: 0.99
            },
        ]
    );
    let after = session.current_chapter();
    assert_eq!(after.index, 2);
    assert_eq!(after.progress, 0.0);

    let handle = session
        .animator()
        .active()
        .cloned()
        .expect("transition should be running");
    let samples: Vec<_> = handle.samples(1).collect();

    assert_eq!(samples.first().map(|s| s.progress), Some(0.99));
    assert!(samples
        .windows(2)
        .all(|pair| pair[0].elapsed_ms <= pair[1].elapsed_ms));
    assert!(samples
        .iter()
        .take_while(|s| s.progress != 0.0)
        .all(|s| s.progress >= 0.99));

    let snap = samples
        .iter()
        .position(|s| s.progress == 0.0)
        .expect("transition snaps to zero");
    assert_eq!(samples[snap - 1].progress, 1.0);
    assert_eq!(samples[snap - 1].elapsed_ms, samples[snap].elapsed_ms);
    assert_eq!(samples[snap].elapsed_ms, handle.fill_ms());
    assert!(samples[snap].elapsed_ms <= 200);
    assert!(samples[snap..].iter().all(|s| s.progress == 0.0));

    let last = samples.last().map(|s| s.elapsed_ms).unwrap_or_default();
    assert_eq!(last, handle.fill_ms() + 60);
    assert!(last <= 200);
}

#[test]
fn bookmarks_overwrite_by_exact_position() {
    let mut store = BookmarkStore::new();
    store.add(5_000, Some("note A".to_string()));
    store.add(5_000, Some("note B".to_string()));

    let bookmarks: Vec<_> = store.list().collect();
    assert_eq!(bookmarks.len(), 1);
    assert_eq!(bookmarks[0].position_ms, 5_000);
    assert_eq!(bookmarks[0].note.as_deref(), Some("note B"));
}
