//! Replays a recorded ROS TF dataset into the Rerun viewer.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tf_replay::{emit, layout};
use tf_replay_core::Recording;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Debug, Parser)]
#[command(name = "tf-replay")]
#[command(about = "Replay a recorded ROS TF dataset", long_about = None)]
struct Args {
    #[command(flatten)]
    rerun: rerun::clap::RerunArgs,

    /// Root directory of the dataset
    #[arg(long, default_value = ".")]
    root_dir: PathBuf,

    /// The dataset file to visualize
    #[arg(long, default_value = "leaf-2022-03-18-gyor.rrd")]
    dataset_file: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let (rec, _serve_guard) = args
        .rerun
        .init_with_blueprint("rerun_example_ros_tf", layout::blueprint())?;

    rec.log_static(
        "description",
        &rerun::TextDocument::new(layout::DESCRIPTION).with_media_type(rerun::MediaType::MARKDOWN),
    )?;

    let path = args.root_dir.join(&args.dataset_file);
    info!(path = %path.display(), "loading dataset");
    let recording = Recording::open(&path)?;

    emit::log_transforms(&rec, &recording)?;
    emit::log_gps(&rec, &recording)?;
    emit::log_camera(&rec, &recording)?;
    emit::log_images(&rec, &recording)?;
    emit::log_point_clouds(&rec, &recording)?;

    Ok(())
}
