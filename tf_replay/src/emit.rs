//! Re-emission of extracted columns into a recording stream.
//!
//! Bulk per-modality data goes out through `send_columns`; the derived rows
//! (debug arrows, the `gps_fix_rot` duplicate, colored point clouds) are
//! logged row by row under an explicit time cursor.

use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use rerun::components::{LatLon, Radius, ViewCoordinates};
use rerun::datatypes::Quaternion;
use rerun::{
    Arrows3D, Color, CoordinateFrame, EncodedImage, GeoPoints, Pinhole, Points3D, RecordingStream,
    TimeCell, TimeColumn, Transform3D, TransformAxes3D,
};
use tf_replay_core::{extract, Recording};
use tracing::info;

/// Entity path of the tf2 transform stream.
pub const TF_ENTITY: &str = "/tf";
/// Entity path of the GPS fix stream.
pub const GPS_ENTITY: &str = "/gps/duro/fix";
/// Entity path of the camera intrinsics stream.
pub const CAMERA_ENTITY: &str = "/zed_node/left/camera_info";
/// Entity path of the compressed camera frame stream.
pub const IMAGE_ENTITY: &str = "/zed_node/left/image_rect_color/compressed";
/// Entity path of the LiDAR point-cloud stream.
pub const POINTS_ENTITY: &str = "/left_os1/os1_cloud_node/points";

/// Timeline the recording is indexed on.
pub const SOURCE_TIMELINE: &str = "ros2_timestamp";
/// Timeline the replay is emitted on.
pub const REPLAY_TIMELINE: &str = "time";

/// Frame the camera is mounted in.
const CAMERA_FRAME: &str = "zed_camera_front";
/// Frame of the camera's image plane, child of the mount frame.
const IMAGE_PLANE_FRAME: &str = "zed_camera_front_image_plane";

fn replay_times(times: &[i64]) -> TimeColumn {
    TimeColumn::new_timestamp_nanos_since_epoch(REPLAY_TIMELINE, times.iter().copied())
}

/// Sends a per-row coordinate frame column for `entity`.
fn send_frame_column(
    rec: &RecordingStream,
    entity: &str,
    times: &[i64],
    frames: Vec<String>,
) -> Result<()> {
    rec.send_columns(
        entity,
        [replay_times(times)],
        CoordinateFrame::update_fields()
            .with_many_frame(frames)
            .columns_of_unit_batches()?,
    )?;
    Ok(())
}

/// One arrow from the parent frame's origin to the child's, expressed in
/// the parent frame.
fn log_frame_arrow(
    rec: &RecordingStream,
    parent: &str,
    child: &str,
    translation: [f32; 3],
) -> Result<()> {
    rec.log(
        format!("tf/{parent}/{child}"),
        &[
            &CoordinateFrame::new(parent) as &dyn rerun::AsComponents,
            &Arrows3D::from_vectors([translation])
                .with_labels([format!("{parent} -> {child}")])
                .with_show_labels(false),
        ],
    )?;
    Ok(())
}

/// Replays the tf2 transform stream.
///
/// The transforms themselves go out as one column send; on top of that,
/// every sample also gets a debug arrow between its frame pair, and
/// map→gps samples get a `gps_fix_rot` duplicate child frame so the
/// top-down view has an axis-corrected frame to follow.
pub fn log_transforms(rec: &RecordingStream, recording: &Recording) -> Result<()> {
    let cols = extract::transforms(recording, TF_ENTITY, SOURCE_TIMELINE)?;
    info!(samples = cols.times.len(), "replaying transforms");

    rec.send_columns(
        "tf",
        [replay_times(&cols.times)],
        Transform3D::update_fields()
            .with_many_translation(cols.translations.iter().copied())
            .with_many_quaternion(cols.quaternions.iter().map(|&q| Quaternion::from_xyzw(q)))
            .with_many_child_frame(cols.children.clone())
            .with_many_parent_frame(cols.parents.clone())
            .columns_of_unit_batches()?,
    )?;

    rec.log_static("tf", &TransformAxes3D::new(0.25).with_show_frame(true))?;

    for (((&time_ns, parent), child), &translation) in cols
        .times
        .iter()
        .zip(&cols.parents)
        .zip(&cols.children)
        .zip(&cols.translations)
    {
        rec.set_time(
            REPLAY_TIMELINE,
            TimeCell::from_timestamp_nanos_since_epoch(time_ns),
        );
        log_frame_arrow(rec, parent, child, translation)?;

        if let Some(fixed) = extract::fix_rot_child(parent, child) {
            // Translation only; the corrected frame deliberately drops the
            // recorded rotation.
            rec.log(
                "tf",
                &Transform3D::from_translation(translation)
                    .with_parent_frame(parent.as_str())
                    .with_child_frame(fixed.as_str()),
            )?;
            log_frame_arrow(rec, parent, &fixed, translation)?;
        }
    }

    // The world root lives in the map frame.
    rec.log_static("/", &CoordinateFrame::new("map"))?;
    Ok(())
}

/// Replays the GPS fixes as geodetic points.
pub fn log_gps(rec: &RecordingStream, recording: &Recording) -> Result<()> {
    let cols = extract::gps(recording, GPS_ENTITY, SOURCE_TIMELINE)?;
    info!(samples = cols.times.len(), "replaying gps fixes");

    send_frame_column(rec, GPS_ENTITY, &cols.times, cols.frames)?;

    let n = cols.positions.len();
    rec.send_columns(
        GPS_ENTITY,
        [replay_times(&cols.times)],
        GeoPoints::update_fields()
            .with_positions(
                cols.positions
                    .iter()
                    .map(|&[lat, lon]| LatLon::new(lat, lon)),
            )
            .with_radii(vec![Radius::new_ui_points(10.0); n])
            .columns_of_unit_batches()?,
    )?;
    Ok(())
}

/// Replays the camera intrinsics as a pinhole camera between two fixed
/// frames, looking along FLU axes.
pub fn log_camera(rec: &RecordingStream, recording: &Recording) -> Result<()> {
    let cols = extract::camera(recording, CAMERA_ENTITY, SOURCE_TIMELINE)?;
    let n = cols.times.len();
    info!(samples = n, "replaying camera intrinsics");

    // Mat3x3 is column-major, same as the recorded flattening.
    let mats = cols.image_from_camera.iter().map(|m| {
        let mut flat = [0.0f32; 9];
        flat.copy_from_slice(m.as_slice());
        flat
    });

    rec.send_columns(
        CAMERA_ENTITY,
        [replay_times(&cols.times)],
        Pinhole::update_fields()
            .with_many_image_from_camera(mats)
            .with_many_resolution(cols.resolutions.iter().map(|&[w, h]| (w, h)))
            .with_many_camera_xyz(vec![ViewCoordinates::FLU; n])
            .with_many_parent_frame(vec![CAMERA_FRAME; n])
            .with_many_child_frame(vec![IMAGE_PLANE_FRAME; n])
            .with_many_image_plane_distance(vec![1.0f32; n])
            .columns_of_unit_batches()?,
    )?;
    Ok(())
}

/// Replays the compressed camera frames onto the image plane.
pub fn log_images(rec: &RecordingStream, recording: &Recording) -> Result<()> {
    let cols = extract::images(recording, IMAGE_ENTITY, SOURCE_TIMELINE)?;
    info!(samples = cols.times.len(), "replaying camera frames");

    send_frame_column(rec, IMAGE_ENTITY, &cols.times, cols.frames)?;

    rec.send_columns(
        IMAGE_ENTITY,
        [replay_times(&cols.times)],
        EncodedImage::update_fields()
            .with_many_blob(cols.blobs)
            .columns_of_unit_batches()?,
    )?;

    rec.log_static(IMAGE_ENTITY, &CoordinateFrame::new(IMAGE_PLANE_FRAME))?;
    Ok(())
}

/// Replays the point clouds, colored by height.
///
/// The rows stream out of extraction in partitioned rayon workers; each
/// worker sets its own time cursor before logging, so no ordering is
/// needed across partitions.
pub fn log_point_clouds(rec: &RecordingStream, recording: &Recording) -> Result<()> {
    let samples = AtomicUsize::new(0);
    extract::for_each_point_cloud_row(
        recording,
        POINTS_ENTITY,
        SOURCE_TIMELINE,
        extract::POINT_CLOUD_PARTITIONS,
        |row| {
            rec.set_time(
                REPLAY_TIMELINE,
                TimeCell::from_timestamp_nanos_since_epoch(row.time_ns),
            );
            rec.log(POINTS_ENTITY, &CoordinateFrame::new(row.frame.as_str()))?;
            rec.log(
                POINTS_ENTITY,
                &Points3D::new(row.positions.iter().copied())
                    .with_colors(row.colors.iter().map(|&[r, g, b]| {
                        Color::from_rgb(
                            (r * 255.0).round() as u8,
                            (g * 255.0).round() as u8,
                            (b * 255.0).round() as u8,
                        )
                    }))
                    .with_radii([Radius::new_ui_points(2.0)]),
            )?;
            samples.fetch_add(1, Ordering::Relaxed);
            Ok::<_, anyhow::Error>(())
        },
    )?;
    info!(
        samples = samples.load(Ordering::Relaxed),
        "replayed point clouds"
    );
    Ok(())
}
