//! Prints the distinct parent/child frame pairs of a recording's transform
//! stream.

use std::io::{Read as _, Write as _};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tf_replay::emit::{SOURCE_TIMELINE, TF_ENTITY};
use tf_replay_core::{extract, Recording};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Debug, Parser)]
#[command(name = "tf-info")]
#[command(about = "List the transform frame pairs of a recording", long_about = None)]
struct Args {
    /// Paths to read from. Reads from standard input if none are specified
    paths: Vec<PathBuf>,

    /// Remove leading slash from frame names
    #[arg(long)]
    remove_leading_slash: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Piped recordings are spooled to disk; the query engine wants a file.
    let mut stdin_spool = None;
    let paths = if args.paths.is_empty() {
        let mut bytes = Vec::new();
        std::io::stdin()
            .read_to_end(&mut bytes)
            .context("reading recording from standard input")?;
        let mut spool = tempfile::NamedTempFile::new().context("spooling standard input")?;
        spool.write_all(&bytes).context("spooling standard input")?;
        let path = spool.path().to_path_buf();
        stdin_spool = Some(spool);
        vec![path]
    } else {
        args.paths
    };

    let recording = Recording::open_all(&paths)?;
    let pairs = extract::frame_pairs(
        &recording,
        TF_ENTITY,
        SOURCE_TIMELINE,
        args.remove_leading_slash,
    )?;

    println!("Parent Frame → Child Frame:");
    println!("──────────────────────────");
    for (parent, child) in &pairs {
        println!("{parent} → {child}");
    }

    drop(stdin_spool);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_parse_paths_and_flags() {
        let args = Args::parse_from(["tf-info", "a.rrd", "b.rrd", "--remove-leading-slash"]);
        assert_eq!(args.paths.len(), 2);
        assert!(args.remove_leading_slash);
        assert!(!args.verbose);

        let args = Args::parse_from(["tf-info", "--verbose"]);
        assert!(args.paths.is_empty());
        assert!(args.verbose);
    }
}
