//! Whole-frame scenarios: painted RGB565 frames through a live session

mod common;

use common::*;
use pablo_vision::{Frame, PerceptionSession, ReplayCamera, VisionConfig};

fn run(frame: Frame) -> PerceptionSession<ReplayCamera> {
    let mut session =
        PerceptionSession::new(ReplayCamera::from_frames(vec![frame]), VisionConfig::default()).unwrap();
    session.initialize().unwrap();
    assert!(session.snap().unwrap().is_complete());
    session
}

#[test]
fn test_centered_primary_square() {
    let session = run(scene(&[patch((76, 85), (56, 65), YELLOW)]));
    assert!(session.is_primary_found());
    assert_eq!(session.primary_area(), 100);
    assert_eq!(session.primary_offset(), 0);
    assert_eq!(session.secondary_count(), 0);
}

#[test]
fn test_primary_at_the_edges() {
    let left = run(scene(&[patch((0, 1), (50, 51), YELLOW)]));
    assert_eq!(left.primary_offset(), -80);

    let right = run(scene(&[patch((158, 159), (50, 51), YELLOW)]));
    assert_eq!(right.primary_offset(), 78);
}

#[test]
fn test_primary_takes_the_largest() {
    let session = run(scene(&[
        patch((10, 14), (10, 14), YELLOW),
        patch((100, 107), (80, 87), YELLOW),
    ]));
    assert_eq!(session.primary_area(), 64);
    assert_eq!(session.primary_offset(), 103 - 80);
}

#[test]
fn test_two_separated_secondary_markers() {
    let session = run(scene(&[
        patch((38, 43), (50, 54), PINK),
        patch((138, 142), (50, 54), PINK),
    ]));
    assert!(!session.is_primary_found());
    assert_eq!(session.secondary_count(), 2);
    assert_eq!(session.secondary_area(0), 30);
    assert_eq!(session.secondary_offset(0), -40);
    assert_eq!(session.secondary_area(1), 25);
    assert_eq!(session.secondary_offset(1), 60);
}

#[test]
fn test_close_secondary_markers_are_one_detection() {
    // Centroids at x = 59 and x = 67.
    let session = run(scene(&[
        patch((58, 61), (50, 53), PINK),
        patch((66, 68), (50, 52), PINK),
    ]));
    assert_eq!(session.secondary_count(), 1);
    assert_eq!(session.secondary_area(0), 16);
    assert_eq!(session.secondary_offset(1), 0);
    assert_eq!(session.secondary_area(1), 0);
}

#[test]
fn test_stacked_secondary_markers_are_one_detection() {
    // Same bearing, 40 rows apart.
    let session = run(scene(&[
        patch((60, 64), (20, 24), PINK),
        patch((60, 63), (60, 63), PINK),
    ]));
    assert_eq!(session.secondary_count(), 1);
    assert_eq!(session.secondary_area(0), 25);
    assert_eq!(session.secondary_offset(0), -18);
    assert_eq!(session.secondary_area(1), 0);
}

#[test]
fn test_out_of_range_secondary_index_reads_zero() {
    let session = run(scene(&[patch((38, 43), (50, 54), PINK)]));
    assert_eq!(session.secondary_offset(2), 0);
    assert_eq!(session.secondary_area(7), 0);
}

#[test]
fn test_tiny_blobs_are_ignored() {
    // Closing keeps both, but neither reaches the minimum area.
    let session = run(scene(&[
        patch((20, 20), (20, 20), YELLOW),
        patch((60, 60), (60, 62), PINK),
    ]));
    assert!(!session.is_primary_found());
    assert_eq!(session.secondary_count(), 0);
}

#[test]
fn test_closing_joins_a_split_marker() {
    // Two halves one column apart read as a single 9x6 marker.
    let session = run(scene(&[
        patch((70, 73), (40, 45), YELLOW),
        patch((75, 78), (40, 45), YELLOW),
    ]));
    assert!(session.is_primary_found());
    assert_eq!(session.primary_area(), 54);
}

#[test]
fn test_three_secondary_markers_keep_the_two_largest() {
    let session = run(scene(&[
        patch((10, 12), (10, 12), PINK),
        patch((60, 64), (10, 14), PINK),
        patch((120, 123), (10, 13), PINK),
    ]));
    assert_eq!(session.secondary_count(), 2);
    assert_eq!(session.secondary_area(0), 25);
    assert_eq!(session.secondary_area(1), 16);
    let secondary = session.result().secondary;
    assert!(secondary.blobs.iter().flatten().all(|b| !b.truncated));
}

#[test]
fn test_frame_numbers_count_processed_frames() {
    let frame = scene(&[patch((76, 85), (56, 65), YELLOW)]);
    let camera = ReplayCamera::from_frames(vec![frame]).looping(true);
    let mut session = PerceptionSession::new(camera, VisionConfig::default()).unwrap();
    session.initialize().unwrap();
    for expected in 1..=3 {
        session.snap().unwrap();
        session.release();
        assert_eq!(session.frame_number(), expected);
    }
}
