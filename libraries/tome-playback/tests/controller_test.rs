//! Integration tests for discrete seeks
//!
//! Drive the controller through a fake engine on a paused clock, so engine
//! latency, confirmation polling and lock timeouts run deterministically.


use std::time::Duration;
use test_helpers::{controller_at, drain_events};
use tome_playback::{AppLifecycleState, Chapter, ForceReleaseReason, SeekDirection, SeekEvent};

// ===== Discrete seeks =====

#[tokio::test(start_paused = true)]
async fn test_absolute_seek_writes_target() {
    let (controller, engine) = controller_at(100.0);

    assert!(controller.seek_absolute(450.0).await);

    assert_eq!(controller.store().position(), 450.0);
    assert!(!controller.store().is_seeking());
    assert!(!controller.is_seeking());
    assert!(!controller.is_locked());
    assert_eq!(engine.seeks(), vec![450.0]);
}

#[tokio::test(start_paused = true)]
async fn test_relative_seek_clamps_to_timeline() {
    let (controller, engine) = controller_at(10.0);

    assert!(controller.seek_relative(-30.0).await);
    assert_eq!(controller.store().position(), 0.0);

    assert!(controller.seek_relative(99_999.0).await);
    assert_eq!(controller.store().position(), 1500.0);

    assert_eq!(engine.seeks(), vec![0.0, 1500.0]);
}

#[tokio::test(start_paused = true)]
async fn test_non_finite_seek_is_ignored() {
    let (controller, engine) = controller_at(100.0);

    assert!(!controller.seek_relative(f64::NAN).await);
    assert!(!controller.seek_absolute(f64::INFINITY).await);
    assert!(engine.seeks().is_empty());
    assert_eq!(controller.store().position(), 100.0);
}

#[tokio::test(start_paused = true)]
async fn test_chapter_crossing_emits_change() {
    let (controller, _engine) = controller_at(100.0);
    let mut events = controller.subscribe_events();

    assert!(controller.seek_absolute(950.0).await);

    let events = drain_events(&mut events);
    assert!(events.contains(&SeekEvent::ChapterChanged {
        from_chapter_index: 0,
        to_chapter_index: 2,
    }));
    assert_eq!(
        events.last(),
        Some(&SeekEvent::SeekCompleted {
            position: 950.0,
            confirmed: true,
        })
    );
    assert!(!controller.is_changing_chapter());
}

#[tokio::test(start_paused = true)]
async fn test_seek_within_chapter_does_not_flag_change() {
    let (controller, _engine) = controller_at(400.0);
    let mut events = controller.subscribe_events();

    assert!(controller.seek_relative(30.0).await);

    let events = drain_events(&mut events);
    assert!(!events
        .iter()
        .any(|event| matches!(event, SeekEvent::ChapterChanged { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_seek_state_published_while_in_flight() {
    let (controller, engine) = controller_at(100.0);
    engine.set_seek_delay(Duration::from_millis(500));

    let seeking = controller.clone();
    let task = tokio::spawn(async move { seeking.seek_relative(-30.0).await });
    tokio::time::sleep(Duration::from_millis(100)).await;

    let state = controller.seek_state();
    assert!(state.is_seeking);
    assert_eq!(state.seek_position, 70.0);
    assert_eq!(state.seek_start_position, 100.0);
    assert_eq!(controller.seek_delta(), -30.0);
    assert_eq!(controller.seek_magnitude(), 30.0);
    assert!(controller.store().is_seeking());

    // Engine ticks during the seek must not clobber the target
    controller.store().report_engine_position(101.0);
    assert_eq!(controller.store().position(), 100.0);

    assert!(task.await.unwrap());
    assert_eq!(controller.store().position(), 70.0);
    assert_eq!(controller.seek_delta(), 0.0);
}

// ===== Lock exclusivity =====

#[tokio::test(start_paused = true)]
async fn test_concurrent_seek_is_rejected() {
    let (controller, engine) = controller_at(100.0);
    engine.set_seek_delay(Duration::from_millis(500));

    let (first, second) = tokio::join!(
        controller.seek_relative(30.0),
        controller.seek_relative(30.0)
    );

    assert!(first);
    assert!(!second);
    assert_eq!(controller.store().position(), 130.0);
    assert_eq!(engine.seeks(), vec![130.0]);
}

#[tokio::test(start_paused = true)]
async fn test_continuous_rejected_while_relative_seek_in_flight() {
    let (controller, engine) = controller_at(100.0);
    engine.set_seek_delay(Duration::from_millis(500));

    let (relative, continuous) = tokio::join!(
        controller.seek_relative(30.0),
        controller.start_continuous_seek(SeekDirection::Forward)
    );

    assert!(relative);
    assert!(!continuous);
    assert!(!controller.is_locked());
    assert_eq!(controller.store().position(), 130.0);
    assert_eq!(engine.seeks(), vec![130.0]);
    assert_eq!(engine.pauses(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_lock_free_again_after_seek() {
    let (controller, _engine) = controller_at(100.0);

    assert!(controller.seek_relative(30.0).await);
    assert!(controller.seek_relative(30.0).await);
    assert_eq!(controller.store().position(), 160.0);
}

// ===== Engine failures =====

#[tokio::test(start_paused = true)]
async fn test_engine_failure_releases_lock() {
    let (controller, engine) = controller_at(100.0);
    engine.set_fail_seeks(true);

    assert!(controller.seek_absolute(450.0).await);
    assert_eq!(controller.store().position(), 100.0);
    assert!(!controller.is_locked());
    assert!(!controller.store().is_seeking());

    engine.set_fail_seeks(false);
    assert!(controller.seek_absolute(450.0).await);
    assert_eq!(controller.store().position(), 450.0);
}

#[tokio::test(start_paused = true)]
async fn test_unconfirmed_seek_still_writes_target() {
    let (controller, engine) = controller_at(100.0);
    engine.set_stuck(true);
    let mut events = controller.subscribe_events();

    let started = tokio::time::Instant::now();
    assert!(controller.seek_absolute(450.0).await);

    assert!(started.elapsed() >= controller.config().confirm_timeout());
    assert_eq!(controller.store().position(), 450.0);
    assert!(drain_events(&mut events).contains(&SeekEvent::SeekCompleted {
        position: 450.0,
        confirmed: false,
    }));
}

// ===== Chapter navigation =====

#[tokio::test(start_paused = true)]
async fn test_out_of_range_chapter_is_ignored() {
    let (controller, engine) = controller_at(100.0);

    assert!(!controller.seek_to_chapter(7).await);
    assert!(engine.seeks().is_empty());
    assert!(!controller.is_locked());
}

#[tokio::test(start_paused = true)]
async fn test_seek_to_chapter_lands_on_start() {
    let (controller, _engine) = controller_at(100.0);

    assert!(controller.seek_to_chapter(2).await);
    assert_eq!(controller.store().position(), 900.0);
}

#[tokio::test(start_paused = true)]
async fn test_smart_previous_restarts_then_goes_back() {
    let (controller, _engine) = controller_at(310.0);

    // 10s into chapter 1: restart it
    assert!(controller.prev_chapter().await);
    assert_eq!(controller.store().position(), 300.0);

    // At its start: previous chapter
    assert!(controller.prev_chapter().await);
    assert_eq!(controller.store().position(), 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_next_chapter_stops_at_last() {
    let (controller, engine) = controller_at(0.0);

    assert!(controller.next_chapter().await);
    assert_eq!(controller.store().position(), 300.0);

    assert!(controller.seek_absolute(950.0).await);
    assert!(!controller.next_chapter().await);
    assert_eq!(controller.store().position(), 950.0);
    assert_eq!(engine.seeks(), vec![300.0, 950.0]);
}

// ===== Force release =====

#[tokio::test(start_paused = true)]
async fn test_cancel_restores_confirmed_position() {
    let (controller, engine) = controller_at(100.0);
    engine.set_seek_delay(Duration::from_secs(5));
    let mut events = controller.subscribe_events();

    let seeking = controller.clone();
    let task = tokio::spawn(async move { seeking.seek_absolute(450.0).await });
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(controller.is_locked());

    assert!(controller.cancel_seek());
    assert!(!controller.is_locked());
    assert!(!controller.is_seeking());
    assert_eq!(controller.store().position(), 100.0);

    // The abandoned seek finishing late must not write its target
    assert!(task.await.unwrap());
    assert_eq!(controller.store().position(), 100.0);

    assert!(drain_events(&mut events).contains(&SeekEvent::LockForceReleased {
        reason: ForceReleaseReason::Cancelled,
        restored_position: 100.0,
    }));
    assert!(!controller.cancel_seek(), "nothing left to cancel");
}

#[tokio::test(start_paused = true)]
async fn test_backgrounding_releases_lock() {
    let (controller, engine) = controller_at(100.0);
    engine.set_seek_delay(Duration::from_secs(5));

    let seeking = controller.clone();
    let task = tokio::spawn(async move { seeking.seek_absolute(450.0).await });
    tokio::time::sleep(Duration::from_millis(100)).await;

    controller.handle_app_state(AppLifecycleState::Active);
    assert!(controller.is_locked(), "foreground changes nothing");

    controller.handle_app_state(AppLifecycleState::Background);
    assert!(!controller.is_locked());
    assert_eq!(controller.store().position(), 100.0);

    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_stuck_lock_expires_after_timeout() {
    let (controller, engine) = controller_at(100.0);
    engine.set_seek_delay(Duration::from_secs(60));
    let mut events = controller.subscribe_events();

    let seeking = controller.clone();
    let _task = tokio::spawn(async move { seeking.seek_absolute(450.0).await });

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(controller.is_locked());
    assert!(!controller.seek_relative(10.0).await, "lock still live");

    tokio::time::sleep(Duration::from_secs(6)).await;
    assert!(!controller.is_locked());
    assert_eq!(controller.store().position(), 100.0);
    assert!(drain_events(&mut events).contains(&SeekEvent::LockForceReleased {
        reason: ForceReleaseReason::Timeout,
        restored_position: 100.0,
    }));

    engine.set_seek_delay(Duration::ZERO);
    assert!(controller.seek_absolute(200.0).await);
    assert_eq!(controller.store().position(), 200.0);
}

// ===== Book loading and resume =====

#[tokio::test(start_paused = true)]
async fn test_load_book_replaces_chapters() {
    let (controller, _engine) = controller_at(100.0);

    controller.load_book(
        vec![
            Chapter::new("Prologue", 0.0, 200.0),
            Chapter::new("Part One", 200.0, 600.0),
        ],
        600.0,
        50.0,
    );

    let record = controller.store().snapshot();
    assert_eq!(record.chapters.len(), 2);
    assert_eq!(record.chapters[1].title, "Part One");
    assert_eq!(record.duration, 600.0);
    assert_eq!(record.position, 50.0);
    assert_eq!(controller.seek_position(), 50.0);

    assert!(controller.next_chapter().await);
    assert_eq!(controller.store().position(), 200.0);
}

#[tokio::test(start_paused = true)]
async fn test_resume_applies_smart_rewind() {
    let (controller, engine) = controller_at(100.0);

    assert!(controller.resume_after_pause(Duration::from_secs(20)).await);
    assert_eq!(controller.store().position(), 92.0);
    assert!(controller.store().is_playing());
    assert_eq!(engine.plays(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_short_pause_resumes_in_place() {
    let (controller, engine) = controller_at(100.0);

    assert!(controller.resume_after_pause(Duration::from_secs(2)).await);
    assert_eq!(controller.store().position(), 100.0);
    assert!(engine.seeks().is_empty());
}
