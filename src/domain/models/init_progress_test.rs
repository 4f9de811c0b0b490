use super::InitProgress;
use super::InitState;

#[test]
fn it_starts_from_a_zeroed_snapshot() {
    let zero = InitProgress {
        progress: 0.0,
        time_elapsed: 0.0,
        current_chunk: 0,
        total_chunks: 0,
        fetched_bytes: 0,
        total_bytes: 0,
    };

    assert_eq!(InitProgress::zero(), zero);
    assert!(!zero.is_complete());
}

#[test]
fn it_describes_progress_without_counters() {
    let progress = InitProgress {
        progress: 0.25,
        time_elapsed: 3.4,
        ..InitProgress::default()
    };

    insta::assert_snapshot!(progress.describe(), @"Loading model: 25%, 3s elapsed");
}

#[test]
fn it_describes_progress_with_chunks_and_bytes() {
    let progress = InitProgress {
        progress: 0.5,
        time_elapsed: 12.0,
        current_chunk: 2,
        total_chunks: 4,
        fetched_bytes: 1_500_000_000,
        total_bytes: 3_000_000_000,
    };

    insta::assert_snapshot!(progress.describe(), @"Loading model: 50%, chunk 2/4, 1.5 GB / 3.0 GB, 12s elapsed");
}

#[test]
fn it_describes_small_byte_counts() {
    let progress = InitProgress {
        progress: 1.0,
        fetched_bytes: 512,
        total_bytes: 512,
        ..InitProgress::default()
    };

    assert!(progress.is_complete());
    insta::assert_snapshot!(progress.describe(), @"Loading model: 100%, 512 B / 512 B, 0s elapsed");
}

#[test]
fn it_only_starts_from_idle_or_failed_states() {
    assert!(InitState::Uninitialized.can_start());
    assert!(InitState::Failed("boom".to_string()).can_start());
    assert!(!InitState::Loading.can_start());
    assert!(!InitState::Ready.can_start());
}
