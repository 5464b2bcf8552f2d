// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A human-readable summary of a [`Filterbank`].

use std::fmt::{Display, Formatter, Result};

use super::Filterbank;
use crate::{angle::Sexagesimal, constants::DIMENSION_LABELS};

/// Metadata about a loaded [`Filterbank`]. Print it to get a report like
///
/// ```text
/// --- File Info ---
/// DIMENSION_LABELS : ['time' 'feed_id' 'frequency']
///         az_start :                          12.3456
///        data_type :                   1 (filterbank)
/// ...
/// ```
pub struct FileInfo<'a> {
    fb: &'a Filterbank,
}

impl<'a> FileInfo<'a> {
    pub(super) fn new(fb: &'a Filterbank) -> Self {
        Self { fb }
    }

    /// The minimum and maximum frequencies of the loaded channels \[MHz\].
    /// `None` if no channels were loaded.
    pub fn freq_range(&self) -> Option<(f64, f64)> {
        let freqs = self.fb.freqs();
        let first = *freqs.first()?;
        let last = *freqs.last()?;
        Some((first.min(last), first.max(last)))
    }
}

fn line<V: Display>(f: &mut Formatter<'_>, key: &str, value: V) -> Result {
    writeln!(f, "{key:>16} : {:>32}", value.to_string())
}

impl Display for FileInfo<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let fb = self.fb;
        let h = &fb.header;

        writeln!(f, "--- File Info ---")?;
        if let Some(path) = fb.path() {
            line(f, "File", path.display())?;
        }
        if let Some(format) = fb.format() {
            line(f, "Format", format)?;
        }
        if let Some(len) = fb.header_len() {
            line(f, "Header size", format!("{len} bytes"))?;
        }
        writeln!(
            f,
            "DIMENSION_LABELS : ['{}']",
            DIMENSION_LABELS.join("' '")
        )?;
        line(f, "az_start", h.az_start)?;
        line(f, "data_type", format!("{} ({})", h.data_type, h.data_type()))?;
        line(f, "fch1", format!("{} MHz", h.fch1))?;
        line(f, "foff", format!("{} MHz", h.foff))?;
        line(f, "ibeam", h.ibeam)?;
        line(f, "machine_id", format!("{} ({})", h.machine_id, h.machine_name()))?;
        line(f, "nbeams", h.nbeams)?;
        line(f, "nbits", h.nbits)?;
        line(f, "nchans", h.nchans)?;
        line(f, "nifs", h.nifs)?;
        line(f, "rawdatafile", &h.rawdatafile)?;
        line(f, "source_name", &h.source_name)?;
        line(f, "src_dej", Sexagesimal::degrees(h.src_dej))?;
        line(f, "src_raj", Sexagesimal::hours(h.src_raj))?;
        line(
            f,
            "telescope_id",
            format!("{} ({})", h.telescope_id, h.telescope_name()),
        )?;
        line(f, "tsamp", h.tsamp)?;
        match h.tstart_utc() {
            Some(utc) => line(f, "tstart (ISOT)", utc.format("%Y-%m-%dT%H:%M:%S%.3f"))?,
            None => line(f, "tstart (ISOT)", "?")?,
        }
        line(f, "tstart (MJD)", h.tstart)?;
        line(f, "za_start", h.za_start)?;
        if h.barycentric != 0 {
            line(f, "barycentric", h.barycentric)?;
        }
        if h.pulsarcentric != 0 {
            line(f, "pulsarcentric", h.pulsarcentric)?;
        }
        for (keyword, value) in &h.extra {
            line(f, keyword, value)?;
        }

        writeln!(f)?;
        line(f, "Num ints in file", fb.n_ints_in_file())?;
        line(f, "File shape", format!("{:?}", fb.file_shape()))?;
        writeln!(f, "--- Selection Info ---")?;
        line(f, "Data selection shape", format!("{:?}", fb.data.dim()))?;
        match self.freq_range() {
            Some((min, max)) => {
                line(f, "Minimum freq (MHz)", min)?;
                line(f, "Maximum freq (MHz)", max)?;
            }
            None => line(f, "Frequency range", "(none)")?,
        }
        Ok(())
    }
}
