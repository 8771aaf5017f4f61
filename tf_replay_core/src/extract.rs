//! Per-modality column extraction.
//!
//! Each extractor pulls the named columns one sensor modality needs from an
//! opened [`Recording`], aligned on a shared timestamp index, and applies
//! the modality's data-shape conversion: slash-stripped frame names for
//! transforms, column-major matrix unflattening for camera intrinsics, and
//! height-based coloring for point clouds.

use std::collections::BTreeSet;

use nalgebra::Matrix3;
use rayon::prelude::*;
use rerun::external::arrow::array::RecordBatch;
use tracing::debug;

use crate::colormap;
use crate::dataset::{self, Recording};
use crate::error::{Error, Result};

/// Number of partitions the point-cloud extraction fans out into.
///
/// Bounds peak memory per worker; cross-partition ordering does not matter
/// because every row is emitted with its own timestamp.
pub const POINT_CLOUD_PARTITIONS: usize = 10;

fn transform_column(entity: &str, field: &str) -> String {
    format!("{entity}:Transform3D:{field}")
}

fn coordinate_frame_column(entity: &str) -> String {
    format!("{entity}:CoordinateFrame:frame")
}

/// Removes one leading path separator from a frame name, if present.
pub fn strip_leading_slash(frame: &str) -> &str {
    frame.strip_prefix('/').unwrap_or(frame)
}

/// Unflattens a 3×3 matrix stored column-major.
///
/// Recorded projection matrices are flattened column-first: the element
/// order of the source array fills matrix columns before rows. Unflattening
/// row-major instead would silently transpose the projection without any
/// error, so this rule must be preserved exactly.
pub fn unflatten_col_major(flat: &[f32; 9]) -> Matrix3<f32> {
    Matrix3::from_column_slice(flat)
}

/// The hard-coded derived-frame rule: a transform whose parent is literally
/// "map" and whose child is literally "gps" gets an axis-corrected duplicate
/// child frame for the top-down view. Any other frame pair yields nothing.
pub fn fix_rot_child(parent: &str, child: &str) -> Option<String> {
    (parent == "map" && child == "gps").then(|| format!("{child}_fix_rot"))
}

/// Transform samples, aligned column-wise on the shared timestamp index.
pub struct TransformColumns {
    pub times: Vec<i64>,
    pub parents: Vec<String>,
    pub children: Vec<String>,
    pub translations: Vec<[f32; 3]>,
    pub quaternions: Vec<[f32; 4]>,
}

/// Extracts the transform stream. Frame names are slash-stripped.
pub fn transforms(
    recording: &Recording,
    entity: &str,
    timeline: &str,
) -> Result<TransformColumns> {
    let batches = recording.query(entity, timeline)?;

    let times = dataset::timestamp_column(&batches, timeline)?;
    let parents = dataset::utf8_column(&batches, &transform_column(entity, "parent_frame"))?
        .iter()
        .map(|f| strip_leading_slash(f).to_owned())
        .collect::<Vec<_>>();
    let children = dataset::utf8_column(&batches, &transform_column(entity, "child_frame"))?
        .iter()
        .map(|f| strip_leading_slash(f).to_owned())
        .collect::<Vec<_>>();
    let translations =
        dataset::fixed_f32_column::<3>(&batches, &transform_column(entity, "translation"))?;
    let quaternions =
        dataset::fixed_f32_column::<4>(&batches, &transform_column(entity, "quaternion"))?;

    debug!(entity, rows = times.len(), "extracted transforms");
    Ok(TransformColumns {
        times,
        parents,
        children,
        translations,
        quaternions,
    })
}

/// GPS fixes: frame names and geodetic lat/lon positions.
pub struct GeoColumns {
    pub times: Vec<i64>,
    pub frames: Vec<String>,
    pub positions: Vec<[f64; 2]>,
}

pub fn gps(recording: &Recording, entity: &str, timeline: &str) -> Result<GeoColumns> {
    let batches = recording.query(entity, timeline)?;

    let times = dataset::timestamp_column(&batches, timeline)?;
    let frames = dataset::utf8_column(&batches, &coordinate_frame_column(entity))?;
    let positions =
        dataset::fixed_f64_column::<2>(&batches, &format!("{entity}:GeoPoints:positions"))?;

    debug!(entity, rows = times.len(), "extracted gps fixes");
    Ok(GeoColumns {
        times,
        frames,
        positions,
    })
}

/// Camera intrinsics: pixel resolutions and unflattened projection matrices.
pub struct CameraColumns {
    pub times: Vec<i64>,
    pub resolutions: Vec<[f32; 2]>,
    pub image_from_camera: Vec<Matrix3<f32>>,
}

pub fn camera(recording: &Recording, entity: &str, timeline: &str) -> Result<CameraColumns> {
    let batches = recording.query(entity, timeline)?;

    let times = dataset::timestamp_column(&batches, timeline)?;
    let resolutions =
        dataset::fixed_f32_column::<2>(&batches, &format!("{entity}:Pinhole:resolution"))?;
    let image_from_camera =
        dataset::fixed_f32_column::<9>(&batches, &format!("{entity}:Pinhole:image_from_camera"))?
            .iter()
            .map(unflatten_col_major)
            .collect();

    debug!(entity, rows = times.len(), "extracted camera intrinsics");
    Ok(CameraColumns {
        times,
        resolutions,
        image_from_camera,
    })
}

/// Encoded camera frames: frame names and opaque image blobs.
pub struct ImageColumns {
    pub times: Vec<i64>,
    pub frames: Vec<String>,
    pub blobs: Vec<Vec<u8>>,
}

pub fn images(recording: &Recording, entity: &str, timeline: &str) -> Result<ImageColumns> {
    let batches = recording.query(entity, timeline)?;

    let times = dataset::timestamp_column(&batches, timeline)?;
    let frames = dataset::utf8_column(&batches, &coordinate_frame_column(entity))?;
    let blobs = dataset::blob_column(&batches, &format!("{entity}:EncodedImage:blob"))?;

    debug!(entity, rows = times.len(), "extracted encoded images");
    Ok(ImageColumns {
        times,
        frames,
        blobs,
    })
}

/// One point-cloud sample with its derived per-point colors.
pub struct PointCloudRow {
    pub time_ns: i64,
    pub frame: String,
    pub positions: Vec<[f32; 3]>,
    pub colors: Vec<[f32; 3]>,
}

/// Streams the point-cloud rows through `row_fn`, colored by height.
///
/// The query's batches are split into at most `partitions` groups handled
/// independently on the rayon pool. Each worker decodes and colors one
/// batch at a time, so peak memory is bounded by a partition's slice of
/// the stream, not the whole entity. Rows reach `row_fn` in batch order
/// within a partition only; callers that need ordering must carry the
/// row's own timestamp.
pub fn for_each_point_cloud_row<F, E>(
    recording: &Recording,
    entity: &str,
    timeline: &str,
    partitions: usize,
    row_fn: F,
) -> std::result::Result<(), E>
where
    F: Fn(PointCloudRow) -> std::result::Result<(), E> + Send + Sync,
    E: From<Error> + Send,
{
    let batches = recording.query(entity, timeline).map_err(E::from)?;
    let positions_column = format!("{entity}:Points3D:positions");

    let group_len = batches.len().div_ceil(partitions.max(1)).max(1);
    let groups: Vec<Vec<RecordBatch>> = {
        let mut it = batches.into_iter();
        std::iter::from_fn(|| {
            let group: Vec<_> = it.by_ref().take(group_len).collect();
            (!group.is_empty()).then_some(group)
        })
        .collect()
    };

    groups.into_par_iter().try_for_each(|group| {
        let mut rows = 0usize;
        for batch in &group {
            let batch = std::slice::from_ref(batch);
            let times = dataset::timestamp_column(batch, timeline).map_err(E::from)?;
            let frames =
                dataset::utf8_column(batch, &coordinate_frame_column(entity)).map_err(E::from)?;
            let clouds = dataset::points_column(batch, &positions_column).map_err(E::from)?;

            rows += times.len();
            for ((time_ns, frame), positions) in times.into_iter().zip(frames).zip(clouds) {
                let colors = colormap::color_by_height(&positions);
                row_fn(PointCloudRow {
                    time_ns,
                    frame,
                    positions,
                    colors,
                })?;
            }
        }
        debug!(entity, rows, "point-cloud partition done");
        Ok(())
    })
}

/// Extracts the distinct (parent, child) frame pairs of the transform
/// stream, optionally slash-stripped. The set is ordered lexicographically
/// by parent, then child.
pub fn frame_pairs(
    recording: &Recording,
    entity: &str,
    timeline: &str,
    strip: bool,
) -> Result<BTreeSet<(String, String)>> {
    let batches = recording.query(entity, timeline)?;
    let parents = dataset::utf8_column(&batches, &transform_column(entity, "parent_frame"))?;
    let children = dataset::utf8_column(&batches, &transform_column(entity, "child_frame"))?;
    Ok(collect_pairs(parents, children, strip))
}

/// Deduplicates and orders frame pairs; `strip` removes leading slashes.
pub fn collect_pairs(
    parents: Vec<String>,
    children: Vec<String>,
    strip: bool,
) -> BTreeSet<(String, String)> {
    parents
        .into_iter()
        .zip(children)
        .map(|(parent, child)| {
            if strip {
                (
                    strip_leading_slash(&parent).to_owned(),
                    strip_leading_slash(&child).to_owned(),
                )
            } else {
                (parent, child)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn strip_removes_a_single_leading_slash() {
        assert_eq!(strip_leading_slash("/base_link"), "base_link");
        assert_eq!(strip_leading_slash("base_link"), "base_link");
        assert_eq!(strip_leading_slash("//odd"), "/odd");
        assert_eq!(strip_leading_slash("/"), "");
    }

    #[test]
    fn strip_is_idempotent() {
        for frame in ["/map", "map", "/a/b", ""] {
            let once = strip_leading_slash(frame);
            assert_eq!(strip_leading_slash(once), once);
        }
    }

    #[test]
    fn unflatten_inverts_column_major_flattening() {
        let m = Matrix3::new(
            1.0, 2.0, 3.0, //
            4.0, 5.0, 6.0, //
            7.0, 8.0, 9.0,
        );
        // Column-major flattening walks columns first.
        let mut flat = [0.0f32; 9];
        for col in 0..3 {
            for row in 0..3 {
                flat[col * 3 + row] = m[(row, col)];
            }
        }
        let rebuilt = unflatten_col_major(&flat);
        assert_relative_eq!(rebuilt, m);
    }

    #[test]
    fn unflatten_is_not_row_major() {
        // A matrix that is not symmetric distinguishes the two orders.
        let flat = [0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        let m = unflatten_col_major(&flat);
        assert_eq!(m[(1, 0)], 1.0);
        assert_eq!(m[(0, 1)], 0.0);
    }

    #[test]
    fn fix_rot_fires_only_on_map_gps() {
        assert_eq!(fix_rot_child("map", "gps"), Some("gps_fix_rot".to_owned()));
        assert_eq!(fix_rot_child("map", "gps_fix_rot"), None);
        assert_eq!(fix_rot_child("odom", "gps"), None);
        assert_eq!(fix_rot_child("map", "base_link"), None);
        assert_eq!(fix_rot_child("gps", "map"), None);
    }

    #[test]
    fn pairs_are_deduplicated_and_sorted() {
        let parents = vec!["a".to_owned(), "a".to_owned(), "c".to_owned()];
        let children = vec!["b".to_owned(), "b".to_owned(), "a".to_owned()];
        let pairs: Vec<_> = collect_pairs(parents, children, false)
            .into_iter()
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("a".to_owned(), "b".to_owned()),
                ("c".to_owned(), "a".to_owned()),
            ]
        );
    }

    #[test]
    fn pairs_can_be_slash_stripped() {
        let parents = vec!["/map".to_owned(), "map".to_owned()];
        let children = vec!["/gps".to_owned(), "gps".to_owned()];
        let pairs: Vec<_> = collect_pairs(parents, children, true).into_iter().collect();
        // Stripping collapses the two spellings into one pair.
        assert_eq!(pairs, vec![("map".to_owned(), "gps".to_owned())]);
    }

    proptest! {
        #[test]
        fn strip_is_idempotent_on_frame_names(
            slashed in proptest::bool::ANY,
            body in "[a-z_][a-z_/]{0,11}",
        ) {
            let frame = if slashed { format!("/{body}") } else { body.clone() };
            let stripped = strip_leading_slash(&frame);
            prop_assert_eq!(stripped, body.as_str());
            prop_assert_eq!(strip_leading_slash(stripped), stripped);
        }
    }
}
