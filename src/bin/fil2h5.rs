// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Convert SIGPROC filterbank files to FBH5.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::Parser;
use log::{error, info, LevelFilter};
use sigproc_filterbank::Filterbank;

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// The filterbank files to convert.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Write the FBH5 files here rather than beside their inputs.
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// More logging. Can be given multiple times.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn convert(fil: &Path, output_dir: Option<&Path>) -> Result<PathBuf, anyhow::Error> {
    let fb = Filterbank::open(fil)?;
    let file_name = fil
        .file_name()
        .with_context(|| format!("'{}' isn't a file", fil.display()))?;
    let h5 = match output_dir {
        Some(dir) => dir.join(file_name),
        None => fil.to_path_buf(),
    }
    .with_extension("h5");
    fb.write_fbh5(&h5)?;
    Ok(h5)
}

fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();
    let level = match args.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    // Keep going if one file is bad.
    let mut num_failed = 0;
    for fil in &args.files {
        match convert(fil, args.output_dir.as_deref()) {
            Ok(h5) => info!("'{}' -> '{}'", fil.display(), h5.display()),
            Err(e) => {
                error!("Couldn't convert '{}': {e:#}", fil.display());
                num_failed += 1;
            }
        }
    }

    if num_failed > 0 {
        bail!("{num_failed} of {} files failed to convert", args.files.len());
    }
    Ok(())
}
