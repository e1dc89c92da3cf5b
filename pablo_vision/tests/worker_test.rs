//! Tests for the background perception worker

mod common;

use common::*;
use pablo_vision::{PerceptionSession, PerceptionWorker, ReplayCamera, VisionConfig};
use std::time::Duration;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

fn looping_session() -> PerceptionSession<ReplayCamera> {
    let frame = scene(&[patch((76, 85), (56, 65), YELLOW), patch((10, 14), (10, 14), PINK)]);
    let camera = ReplayCamera::from_frames(vec![frame]).looping(true);
    let mut session = PerceptionSession::new(camera, VisionConfig::default()).unwrap();
    session.initialize().unwrap();
    session
}

#[tokio::test]
async fn test_worker_publishes_frames() {
    let mut worker = PerceptionWorker::spawn(looping_session(), Duration::from_millis(1));
    let reader = worker.reader();

    let first = timeout(WAIT, worker.changed()).await.unwrap().unwrap();
    assert!(first >= 1);
    assert!(reader.frame_number() >= first);
    assert!(reader.is_primary_found());
    assert_eq!(reader.primary_offset(), 0);
    assert_eq!(reader.secondary_count(), 1);

    let second = timeout(WAIT, worker.changed()).await.unwrap().unwrap();
    assert!(second > first);
    assert!(worker.latest_frame() >= second);

    let session = worker.shutdown().await.unwrap();
    assert!(session.frame_number() >= second);
    // The worker releases every frame it snaps.
    assert!(session.raw_frame().is_none());
    assert_eq!(session.camera().outstanding(), None);
}

#[tokio::test]
async fn test_worker_survives_capture_failures() {
    let script = vec![None, None, Some(scene(&[patch((76, 85), (56, 65), YELLOW)]))];
    let mut session = PerceptionSession::new(ScriptedCamera::new(script), VisionConfig::default()).unwrap();
    session.initialize().unwrap();

    let mut worker = PerceptionWorker::spawn(session, Duration::from_millis(1));
    let frame = timeout(WAIT, worker.changed()).await.unwrap().unwrap();
    assert_eq!(frame, 1);
    assert!(worker.reader().is_primary_found());

    let session = worker.shutdown().await.unwrap();
    assert_eq!(session.frame_number(), 1);
    assert_eq!(session.camera().releases, 1);
}

#[tokio::test]
async fn test_shutdown_of_an_idle_worker() {
    let camera = ReplayCamera::from_frames(Vec::new());
    let mut session = PerceptionSession::new(camera, VisionConfig::default()).unwrap();
    session.initialize().unwrap();

    let worker = PerceptionWorker::spawn(session, Duration::from_millis(1));
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!worker.is_finished());
    assert_eq!(worker.latest_frame(), 0);

    let session = timeout(WAIT, worker.shutdown()).await.unwrap().unwrap();
    assert_eq!(session.frame_number(), 0);
}
