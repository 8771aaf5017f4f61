//! Recording access and per-modality extraction for ROS TF replay.
//!
//! A recorded robotics dataset (`.rrd` file) is a time-indexed columnar
//! store: every sensor modality lives under an entity path and is addressed
//! by named columns such as `/tf:Transform3D:child_frame`. This crate opens
//! such recordings, pulls the columns each modality needs, and applies the
//! small data-shape conversions the replay pipeline depends on:
//!
//! - leading-slash stripping of TF frame names,
//! - column-major unflattening of 3×3 camera matrices,
//! - min-max height normalization + turbo colormap for point clouds.
//!
//! The query engine itself is Rerun's; nothing here mutates a recording.

pub mod colormap;
pub mod dataset;
pub mod error;
pub mod extract;

pub use dataset::Recording;
pub use error::{Error, Result};
