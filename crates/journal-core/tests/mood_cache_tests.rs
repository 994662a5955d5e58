//! Mood taxonomy reads through the shared cache under concurrency.

mod common;

use std::sync::{Arc, Barrier};
use std::thread;

use common::TestHarness;
use journal_core::db::mood_repo;
use journal_core::{CacheKey, Mood, MoodCategory, MoodError};

#[test]
fn twelve_moods_read_by_ten_threads() {
    let harness = TestHarness::new();
    let state = harness.open_state(1);
    let service = state.moods().clone();
    let barrier = Arc::new(Barrier::new(10));

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let service = service.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                service.get_all_moods().unwrap()
            })
        })
        .collect();

    let results: Vec<Vec<Mood>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    for moods in &results {
        assert_eq!(moods.len(), 12);
        assert_eq!(moods, &results[0]);
    }
    assert_eq!(state.mood_cache().len(), 1);
    assert_eq!(state.mood_cache().get(CacheKey::All).unwrap(), results[0]);

    state.shutdown();
}

#[test]
fn category_reads_are_cached_independently() {
    let harness = TestHarness::new();
    let state = harness.open_state(1);
    let moods = state.moods();

    let positive = moods.get_moods_by_category("Positive").unwrap();
    let negative = moods.get_moods_by_category("negative").unwrap();
    let neutral = moods.get_moods_by_category(" NEUTRAL ").unwrap();

    assert_eq!(positive.len(), 5);
    assert_eq!(negative.len(), 4);
    assert_eq!(neutral.len(), 3);
    assert!(positive.iter().all(|m| m.category == MoodCategory::Positive));
    assert!(positive.windows(2).all(|w| w[0].name <= w[1].name));
    assert_eq!(state.mood_cache().len(), 3);

    assert!(matches!(
        moods.get_moods_by_category("ecstatic"),
        Err(MoodError::InvalidCategory(_))
    ));
    assert_eq!(state.mood_cache().len(), 3);

    state.shutdown();
}

#[test]
fn stale_snapshot_until_invalidated() {
    let harness = TestHarness::new();
    let state = harness.open_state(1);
    let moods = state.moods();
    assert_eq!(moods.get_all_moods().unwrap().len(), 12);

    let hopeful = Mood::new("hopeful", Some("🌱"), MoodCategory::Positive).unwrap();
    mood_repo::insert(state.database(), &hopeful).unwrap();

    assert_eq!(moods.get_all_moods().unwrap().len(), 12);
    moods.invalidate_cache();
    let refreshed = moods.get_all_moods().unwrap();
    assert_eq!(refreshed.len(), 13);
    assert!(refreshed.iter().any(|m| m.name == "hopeful"));

    state.shutdown();
}

#[test]
fn lookup_by_alias_and_fragment() {
    let harness = TestHarness::new();
    let state = harness.open_state(1);
    let moods = state.moods();

    assert_eq!(moods.find_mood_by_name("  Joy ").unwrap().unwrap().name, "happy");
    assert_eq!(moods.find_mood_by_name("grate").unwrap().unwrap().name, "grateful");
    assert!(moods.find_mood_by_name("zzz").unwrap().is_none());
    assert!(matches!(moods.find_mood_by_name("   "), Err(MoodError::EmptyName)));

    state.shutdown();
}
