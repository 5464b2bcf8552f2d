// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Print the metadata and data of a rawspec filterbank product, optionally
//! comparing its data against another product.
//!
//! Run with something like:
//! `fil-analyse blc34_guppi_57856_70053_DIAG_DR21_0034 other/blc34_guppi_57856_70053_DIAG_DR21_0034`
//!
//! which loads `blc34_guppi_57856_70053_DIAG_DR21_0034.rawspec.0000.fil` and
//! its counterpart in `other/`.

use std::{io::Write, path::PathBuf};

use anyhow::Context;
use clap::Parser;
use log::{debug, LevelFilter};
use sigproc_filterbank::{compare, Filterbank, Selection};

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// The stem of the filterbank file to inspect.
    stem: String,

    /// The stem of a filterbank file to compare against.
    comparison_stem: Option<String>,

    /// Appended to each stem to get a file name.
    #[arg(long, env = "FIL_ANALYSE_SUFFIX", default_value = ".rawspec.0000.fil")]
    suffix: String,

    /// The first integration to load.
    #[arg(long)]
    t_start: Option<usize>,

    /// Load integrations up to, but not including, this one.
    #[arg(long)]
    t_stop: Option<usize>,

    /// One edge of the frequency range to load [MHz].
    #[arg(long, allow_negative_numbers = true)]
    f_start: Option<f64>,

    /// The other edge of the frequency range to load [MHz].
    #[arg(long, allow_negative_numbers = true)]
    f_stop: Option<f64>,

    /// Don't print the data arrays.
    #[arg(long)]
    no_data: bool,

    /// Exit with status 1 if the compared data aren't the same.
    #[arg(long)]
    exit_code: bool,

    /// More logging. Can be given multiple times.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn setup_logging(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    // RUST_LOG wins over -v.
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn load(stem: &str, suffix: &str, selection: &Selection) -> Result<Filterbank, anyhow::Error> {
    let path = PathBuf::from(format!("{stem}{suffix}"));
    Filterbank::open_with(&path, selection)
        .with_context(|| format!("Couldn't load '{}'", path.display()))
}

fn print_data<W: Write>(out: &mut W, fb: &Filterbank, no_data: bool) -> std::io::Result<()> {
    if !no_data {
        writeln!(out, "{}", fb.data)?;
    }
    writeln!(out, "{:?}", fb.data.dim())
}

/// Print everything about the requested files to `out`. Returns whether the
/// compared data are the same (`true` if there is nothing to compare).
fn analyse<W: Write>(args: &Args, out: &mut W) -> Result<bool, anyhow::Error> {
    let selection = Selection {
        t_start: args.t_start,
        t_stop: args.t_stop,
        f_start: args.f_start,
        f_stop: args.f_stop,
    };

    let obs = load(&args.stem, &args.suffix, &selection)?;
    write!(out, "{}", obs.info())?;
    print_data(out, &obs, args.no_data)?;

    let comp_stem = match &args.comparison_stem {
        Some(s) => s,
        None => return Ok(true),
    };
    // Announce the comparison before loading, so a bad file is reported
    // against the right stem.
    writeln!(out, "\n\n Compared to:  {comp_stem} \n\n")?;
    out.flush()?;
    let comp = load(comp_stem, &args.suffix, &selection)?;
    print_data(out, &comp, args.no_data)?;

    let comparison = compare(&obs, &comp)?;
    writeln!(out, "{comparison}")?;
    if comparison.n_differing > 0 {
        writeln!(
            out,
            "Max. absolute difference: {} ({} of {} samples differ)",
            comparison.max_abs_diff, comparison.n_differing, comparison.n_samples
        )?;
    }
    if !comparison.header_differences.is_empty() {
        writeln!(
            out,
            "Header fields that differ: {}",
            comparison.header_differences.join(", ")
        )?;
    }
    Ok(comparison.is_identical())
}

fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();
    setup_logging(args.verbose);
    debug!("{args:?}");

    let identical = analyse(&args, &mut std::io::stdout().lock())?;
    if args.exit_code && !identical {
        std::process::exit(1);
    }
    Ok(())
}
