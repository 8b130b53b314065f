//! Expiration sweep: qualifying passes flip exactly once.

mod common;

use chrono::{Duration, Utc};
use rand::Rng;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use passbatch_core::config::BatchConfig;
use passbatch_core::jobs::expiration::{run_expiration_job, STEP_NAME};
use passbatch_core::models::PassStatus;
use passbatch_core::store::memory::MemoryStore;

#[tokio::test]
async fn elapsed_progressed_passes_are_swept() {
    let now = Utc::now().naive_utc();
    let store = Arc::new(MemoryStore::new());
    let mut rng = rand::thread_rng();
    for i in 0..10 {
        store.add_pass(common::progressed_pass(
            &format!("A100000{i}"),
            rng.gen_range(0..11),
            now - Duration::days(1),
            now,
        ));
    }
    // Still inside its window: untouched by the sweep.
    let open_id = store.add_pass(common::progressed_pass(
        "B1000000",
        5,
        now + Duration::days(1),
        now,
    ));

    let execution = run_expiration_job(Arc::clone(&store) as _, &BatchConfig::default(), None).await;

    assert!(execution.is_completed());
    assert_eq!(execution.step(STEP_NAME).unwrap().write_count, 10);

    for pass in store.passes() {
        if pass.id == open_id {
            assert_eq!(pass.status, PassStatus::Progressed);
            assert_eq!(pass.expired_at, None);
        } else {
            assert_eq!(pass.status, PassStatus::Expired);
            assert!(pass.expired_at.is_some());
        }
    }
}

#[tokio::test]
async fn the_sweep_is_idempotent() {
    let now = Utc::now().naive_utc();
    let store = Arc::new(MemoryStore::new());
    for i in 0..10 {
        store.add_pass(common::progressed_pass(
            &format!("A100000{i}"),
            3,
            now - Duration::days(1),
            now,
        ));
    }

    let config = BatchConfig::default();
    let first = run_expiration_job(Arc::clone(&store) as _, &config, None).await;
    assert!(first.is_completed());
    assert_eq!(first.step(STEP_NAME).unwrap().chunks_committed, 1);

    let expired_at: Vec<_> = store.passes().iter().map(|p| p.expired_at).collect();

    // EXPIRED rows no longer match the predicate: the second run is a no-op.
    let second = run_expiration_job(Arc::clone(&store) as _, &config, None).await;
    assert!(second.is_completed());
    let step = second.step(STEP_NAME).unwrap();
    assert_eq!(step.chunks_committed, 0);
    assert_eq!(step.read_count, 0);

    assert_eq!(
        store.passes().iter().map(|p| p.expired_at).collect::<Vec<_>>(),
        expired_at,
        "second run must not restamp expired_at"
    );
}

#[tokio::test]
async fn one_run_uses_one_boundary_instant_for_all_chunks() {
    let now = Utc::now().naive_utc();
    let store = Arc::new(MemoryStore::new());
    // Three chunks at the default chunk size of 10.
    for i in 0..25 {
        store.add_pass(common::progressed_pass(
            &format!("A10000{i:02}"),
            1,
            now - Duration::days(1),
            now,
        ));
    }

    let execution = run_expiration_job(Arc::clone(&store) as _, &BatchConfig::default(), None).await;

    assert!(execution.is_completed());
    assert_eq!(execution.step(STEP_NAME).unwrap().chunks_committed, 3);

    let stamps: Vec<_> = store
        .passes()
        .iter()
        .map(|p| p.expired_at.expect("swept"))
        .collect();
    assert!(
        stamps.windows(2).all(|w| w[0] == w[1]),
        "all chunks share the instant captured at job start"
    );
}

#[tokio::test]
async fn a_raised_cancellation_flag_stops_the_run_at_the_chunk_boundary() {
    let now = Utc::now().naive_utc();
    let store = Arc::new(MemoryStore::new());
    for i in 0..10 {
        store.add_pass(common::progressed_pass(
            &format!("A100000{i}"),
            1,
            now - Duration::days(1),
            now,
        ));
    }

    let cancellation = Arc::new(AtomicBool::new(true));
    let execution = run_expiration_job(
        Arc::clone(&store) as _,
        &BatchConfig::default(),
        Some(cancellation),
    )
    .await;

    assert!(execution.is_completed());
    assert_eq!(execution.step(STEP_NAME).unwrap().chunks_committed, 0);
    assert!(
        store.passes().iter().all(|p| p.status == PassStatus::Progressed),
        "a cancelled run must not sweep anything"
    );
}
