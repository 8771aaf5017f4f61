//! Replay of a recorded ROS TF dataset into the Rerun viewer.
//!
//! The dataset is a `.rrd` recording of a drive: a tf2 transform tree, GPS
//! fixes, camera intrinsics, compressed camera frames, and LiDAR point
//! clouds. The replay reads each modality back out of the recording with
//! `tf_replay_core` and re-emits it onto a fresh timeline, together with a
//! viewer layout built for inspecting the transform tree.

pub mod emit;
pub mod layout;
