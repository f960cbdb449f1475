//! Integration test: queue manager driving the local directory store.
//!
//! Submits real files, waits for the queue to drain, and checks stored
//! objects against their checksums.

use std::sync::Arc;
use std::time::Duration;

use tempfile::tempdir;
use upq_core::checksum;
use upq_core::config::QueueConfig;
use upq_core::transfer::LocalDirExecutor;
use upq_core::{EventKind, JobState, Payload, QueueEvent, QueueManager};

#[tokio::test]
async fn files_are_stored_and_checksummed() {
    let src_dir = tempdir().unwrap();
    let dest_dir = tempdir().unwrap();
    let mut payloads = Vec::new();
    for i in 0..5u8 {
        let path = src_dir.path().join(format!("file{i}.bin"));
        let body: Vec<u8> = (0u8..=250).cycle().skip(i as usize).take(200_000).collect();
        std::fs::write(&path, &body).unwrap();
        payloads.push(Payload::from_path(&path).unwrap());
    }

    let exec = LocalDirExecutor::new(dest_dir.path(), 50 * 1024 * 1024);
    let q = QueueManager::new(
        QueueConfig::new(2, 1, Duration::from_millis(10)),
        Arc::new(exec),
    )
    .unwrap();
    let mut events = q.subscribe_channel(&[EventKind::Progress, EventKind::StatusChange]);
    q.submit(payloads.clone());
    q.wait_idle().await;

    let jobs = q.jobs();
    assert_eq!(jobs.len(), 5);
    for (job, payload) in jobs.iter().zip(&payloads) {
        assert_eq!(job.state, JobState::Completed);
        assert_eq!(job.progress, 100);
        let receipt = job.result.as_ref().expect("receipt");
        assert_eq!(receipt.bytes, payload.size);
        let stored = std::path::Path::new(&receipt.location);
        assert!(stored.starts_with(dest_dir.path()));
        assert_eq!(
            checksum::sha256_path(stored).unwrap(),
            receipt.checksum.clone().unwrap()
        );
        assert_eq!(
            checksum::sha256_path(&payload.source).unwrap(),
            receipt.checksum.clone().unwrap()
        );
    }

    let mut saw_progress = false;
    while let Ok(ev) = events.try_recv() {
        if let QueueEvent::Progress(s) = &ev {
            saw_progress = true;
            assert!(s.progress < 100);
            assert_eq!(s.state, JobState::Uploading);
        }
    }
    assert!(saw_progress);
}

#[tokio::test(start_paused = true)]
async fn oversized_file_exhausts_retries_then_can_be_retried() {
    let src_dir = tempdir().unwrap();
    let dest_dir = tempdir().unwrap();
    let big = src_dir.path().join("big.iso");
    std::fs::write(&big, vec![1u8; 4096]).unwrap();
    let small = src_dir.path().join("small.txt");
    std::fs::write(&small, b"ok").unwrap();

    let exec = LocalDirExecutor::new(dest_dir.path(), 1024);
    let q = QueueManager::new(
        QueueConfig::new(1, 2, Duration::from_millis(100)),
        Arc::new(exec),
    )
    .unwrap();
    let ids = q.submit([
        Payload::from_path(&big).unwrap(),
        Payload::from_path(&small).unwrap(),
    ]);
    q.wait_idle().await;

    let big_job = q.job(ids[0]).unwrap();
    assert_eq!(big_job.state, JobState::Failed);
    assert_eq!(big_job.retry_count, 2);
    assert_eq!(
        big_job.error.as_deref(),
        Some("file too large: 4096 bytes exceeds limit of 1024 bytes")
    );
    assert_eq!(q.job(ids[1]).unwrap().state, JobState::Completed);

    assert_eq!(q.clear_completed(), 1);
    std::fs::write(&big, vec![1u8; 512]).unwrap();
    assert_eq!(q.retry_failed(), 1);
    q.wait_idle().await;
    let big_job = q.job(ids[0]).unwrap();
    assert_eq!(big_job.state, JobState::Completed);
    assert_eq!(big_job.retry_count, 0);
    assert_eq!(big_job.result.unwrap().bytes, 512);
}
