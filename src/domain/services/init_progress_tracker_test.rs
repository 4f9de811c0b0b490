use super::InitProgressTracker;
use crate::domain::models::InitProgress;
use crate::domain::models::InitState;

fn progress(value: f64, fetched_bytes: u64) -> InitProgress {
    return InitProgress {
        progress: value,
        time_elapsed: 1.0,
        current_chunk: 1,
        total_chunks: 2,
        fetched_bytes,
        total_bytes: 100,
    };
}

#[test]
fn it_starts_zeroed_and_uninitialized() {
    let tracker = InitProgressTracker::default();
    assert_eq!(tracker.progress(), InitProgress::zero());
    assert_eq!(tracker.state(), InitState::Uninitialized);
}

#[test]
fn it_republishes_the_latest_snapshot() {
    let tracker = InitProgressTracker::default();
    assert!(tracker.begin());
    tracker.update(progress(0.2, 20));
    tracker.update(progress(0.7, 70));

    assert_eq!(tracker.progress(), progress(0.7, 70));
    assert_eq!(tracker.state(), InitState::Loading);
}

#[test]
fn it_does_not_restart_while_loading_or_ready() {
    let tracker = InitProgressTracker::default();
    assert!(tracker.begin());
    tracker.update(progress(0.5, 50));
    assert!(!tracker.begin());
    assert_eq!(tracker.progress(), progress(0.5, 50));

    tracker.finish();
    assert!(!tracker.begin());
    assert_eq!(tracker.state(), InitState::Ready);
}

#[test]
fn it_keeps_the_last_snapshot_after_failing() {
    let tracker = InitProgressTracker::default();
    tracker.begin();
    tracker.update(progress(0.4, 40));
    tracker.fail("disk full");

    assert_eq!(tracker.state(), InitState::Failed("disk full".to_string()));
    assert_eq!(tracker.progress(), progress(0.4, 40));
}

#[test]
fn it_resets_progress_when_restarting_after_failure() {
    let tracker = InitProgressTracker::default();
    tracker.begin();
    tracker.update(progress(0.4, 40));
    tracker.fail("disk full");

    assert!(tracker.begin());
    assert_eq!(tracker.state(), InitState::Loading);
    assert_eq!(tracker.progress(), InitProgress::zero());
}

#[tokio::test]
async fn it_notifies_subscribers() {
    let tracker = InitProgressTracker::default();
    let mut rx = tracker.subscribe_progress();
    tracker.update(progress(0.3, 30));

    rx.changed().await.unwrap();
    assert_eq!(*rx.borrow(), progress(0.3, 30));
}
