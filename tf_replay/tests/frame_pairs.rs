//! Round-trips a small transform recording through the query path.

use std::path::Path;

use rerun::{TimeCell, Transform3D};
use tempfile::TempDir;
use tf_replay_core::{extract, Recording};

const TIMELINE: &str = "ros2_timestamp";

fn log_transform(
    rec: &rerun::RecordingStream,
    time_ns: i64,
    parent: &str,
    child: &str,
    translation: [f32; 3],
) {
    rec.set_time(TIMELINE, TimeCell::from_timestamp_nanos_since_epoch(time_ns));
    rec.log(
        "tf",
        &Transform3D::from_translation(translation)
            .with_quaternion(rerun::datatypes::Quaternion::IDENTITY)
            .with_parent_frame(parent)
            .with_child_frame(child),
    )
    .expect("failed to log transform");
}

fn write_recording(path: &Path) {
    let rec = rerun::RecordingStreamBuilder::new("tf_replay_test")
        .save(path)
        .expect("failed to create recording");

    log_transform(&rec, 1_000, "map", "/gps", [1.0, 0.0, 0.0]);
    log_transform(&rec, 2_000, "base_link", "os_sensor", [0.0, 0.5, 0.0]);
    // A repeated pair must not show up twice.
    log_transform(&rec, 3_000, "map", "/gps", [2.0, 0.0, 0.0]);

    rec.flush_blocking();
}

#[test]
fn frame_pairs_come_back_sorted_and_unique() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("tiny.rrd");
    write_recording(&path);

    let recording = Recording::open(&path).expect("failed to open recording");

    let pairs: Vec<_> = extract::frame_pairs(&recording, "/tf", TIMELINE, false)
        .expect("query failed")
        .into_iter()
        .collect();
    assert_eq!(
        pairs,
        vec![
            ("base_link".to_owned(), "os_sensor".to_owned()),
            ("map".to_owned(), "/gps".to_owned()),
        ]
    );

    let stripped: Vec<_> = extract::frame_pairs(&recording, "/tf", TIMELINE, true)
        .expect("query failed")
        .into_iter()
        .collect();
    assert_eq!(
        stripped,
        vec![
            ("base_link".to_owned(), "os_sensor".to_owned()),
            ("map".to_owned(), "gps".to_owned()),
        ]
    );
}

#[test]
fn transform_extraction_strips_frames_and_stays_aligned() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("tiny.rrd");
    write_recording(&path);

    let recording = Recording::open(&path).expect("failed to open recording");
    let cols = extract::transforms(&recording, "/tf", TIMELINE).expect("query failed");

    assert_eq!(cols.times.len(), 3);
    assert_eq!(cols.parents.len(), 3);
    assert_eq!(cols.children.len(), 3);
    assert_eq!(cols.translations.len(), 3);
    assert!(cols.children.iter().all(|c| !c.starts_with('/')));
    assert!(cols.children.contains(&"gps".to_owned()));
    assert!(cols.times.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn missing_entity_is_a_hard_error() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("tiny.rrd");
    write_recording(&path);

    let recording = Recording::open(&path).expect("failed to open recording");
    assert!(recording.query("/no_such_entity", TIMELINE).is_err());
}
