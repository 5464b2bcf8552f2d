// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Code to load filterbank data, from either SIGPROC or FBH5 files.

mod error;
mod fbh5;
mod info;
mod sigproc;
#[cfg(test)]
mod tests;

pub use error::FilterbankError;
pub use info::FileInfo;

use std::{
    fs::File,
    io::Read,
    ops::Range,
    path::{Path, PathBuf},
};

use log::info;
use ndarray::prelude::*;

use crate::{
    constants::{HDF5_SIGNATURE, HEADER_START, SECONDS_PER_DAY},
    header::FilterbankHeader,
};

/// The kinds of file that filterbank data can be read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// A SIGPROC filterbank file (usually ".fil").
    Sigproc,
    /// Filterbank data in an HDF5 file (usually ".h5").
    Fbh5,
}

impl FileFormat {
    /// Work out the format of a file, preferably from its first few bytes and
    /// otherwise from its extension.
    pub fn detect<T: AsRef<Path>>(path: T) -> Result<Self, FilterbankError> {
        let path = path.as_ref();
        let mut magic = Vec::with_capacity(HDF5_SIGNATURE.len());
        File::open(path)?
            .take(HDF5_SIGNATURE.len() as u64)
            .read_to_end(&mut magic)?;

        let sigproc_magic = [
            &(HEADER_START.len() as i32).to_le_bytes()[..],
            &HEADER_START.as_bytes()[..4],
        ]
        .concat();
        if magic == HDF5_SIGNATURE {
            return Ok(FileFormat::Fbh5);
        }
        if magic == sigproc_magic {
            return Ok(FileFormat::Sigproc);
        }

        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("fil") => Ok(FileFormat::Sigproc),
            Some("h5" | "hdf5") => Ok(FileFormat::Fbh5),
            _ => Err(FilterbankError::UnknownFormat(path.display().to_string())),
        }
    }
}

impl std::fmt::Display for FileFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                FileFormat::Sigproc => "SIGPROC filterbank",
                FileFormat::Fbh5 => "FBH5",
            }
        )
    }
}

/// Which part of a file to load. By default, everything is loaded.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Selection {
    /// The first integration to load.
    pub t_start: Option<usize>,
    /// Load integrations up to, but not including, this one.
    pub t_stop: Option<usize>,
    /// One edge of the frequency range to load \[MHz\].
    pub f_start: Option<f64>,
    /// The other edge of the frequency range to load \[MHz\].
    pub f_stop: Option<f64>,
}

/// A [`Selection`] turned into index ranges for a particular file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Bounds {
    pub(crate) ints: Range<usize>,
    pub(crate) chans: Range<usize>,
}

impl Selection {
    pub(crate) fn resolve(
        &self,
        header: &FilterbankHeader,
        n_ints: usize,
    ) -> Result<Bounds, FilterbankError> {
        let t_start = self.t_start.unwrap_or(0);
        let t_stop = self.t_stop.unwrap_or(n_ints).min(n_ints);
        let explicit_time = self.t_start.is_some() || self.t_stop.is_some();
        if t_start > t_stop || (explicit_time && t_start == t_stop) {
            return Err(FilterbankError::EmptySelection);
        }

        let nchans = header.nchans.max(0) as usize;
        let chans = if self.f_start.is_none() && self.f_stop.is_none() {
            0..nchans
        } else {
            let a = self.f_start.unwrap_or(f64::NEG_INFINITY);
            let b = self.f_stop.unwrap_or(f64::INFINITY);
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            // Frequencies are monotonic, so the selected channels are
            // contiguous. They're generated lazily; `nchans` comes from the
            // file and can be huge.
            let mut selected = (0..nchans)
                .filter(|&i| {
                    let f = header.fch1 + i as f64 * header.foff;
                    lo <= f && f <= hi
                });
            match selected.next() {
                Some(first) => first..selected.last().unwrap_or(first) + 1,
                None => return Err(FilterbankError::EmptySelection),
            }
        };

        Ok(Bounds {
            ints: t_start..t_stop,
            chans,
        })
    }
}

/// Everything the readers hand back.
pub(crate) struct Loaded {
    pub(crate) header: FilterbankHeader,
    pub(crate) header_len: Option<usize>,
    pub(crate) n_ints_in_file: usize,
    pub(crate) bounds: Bounds,
    pub(crate) data: Array3<f32>,
}

/// Filterbank data and the metadata describing them.
#[derive(Debug, Clone)]
pub struct Filterbank {
    /// Where the data came from. `None` if they were made in memory.
    path: Option<PathBuf>,
    format: Option<FileFormat>,
    /// The header as it appears in the file, i.e. not adjusted for any
    /// selection.
    pub header: FilterbankHeader,
    /// The selected data, with dimensions (time, IF, frequency).
    pub data: Array3<f32>,
    /// The size of a SIGPROC header \[bytes\].
    header_len: Option<usize>,
    n_ints_in_file: usize,
    bounds: Bounds,
}

impl Filterbank {
    /// Load all the data in a filterbank file.
    pub fn open<T: AsRef<Path>>(path: T) -> Result<Self, FilterbankError> {
        Self::open_with(path, &Selection::default())
    }

    /// Load part of a filterbank file.
    pub fn open_with<T: AsRef<Path>>(
        path: T,
        selection: &Selection,
    ) -> Result<Self, FilterbankError> {
        let path = path.as_ref();
        // If the file doesn't exist, the readers will handle it, but the
        // error message from HDF5 is horrendous.
        if !path.exists() {
            return Err(FilterbankError::FileDoesntExist(
                path.display().to_string(),
            ));
        }

        let format = FileFormat::detect(path)?;
        let loaded = match format {
            FileFormat::Sigproc => sigproc::read(path, selection)?,
            FileFormat::Fbh5 => fbh5::read(path, selection)?,
        };
        info!(
            "Loaded {:?} of {} integrations from {format} file '{}'",
            loaded.data.dim(),
            loaded.n_ints_in_file,
            path.display()
        );

        Ok(Self {
            path: Some(path.to_path_buf()),
            format: Some(format),
            header: loaded.header,
            data: loaded.data,
            header_len: loaded.header_len,
            n_ints_in_file: loaded.n_ints_in_file,
            bounds: loaded.bounds,
        })
    }

    /// Wrap data that are already in memory. The data must have the shape
    /// (time, `header.nifs`, `header.nchans`).
    pub fn from_parts(
        header: FilterbankHeader,
        data: Array3<f32>,
    ) -> Result<Self, FilterbankError> {
        header.validate()?;
        let (n_ints, nifs, nchans) = data.dim();
        if nifs != header.nifs as usize || nchans != header.nchans as usize {
            return Err(FilterbankError::ShapeMismatch {
                header_nifs: header.nifs,
                header_nchans: header.nchans,
                nifs,
                nchans,
            });
        }

        Ok(Self {
            path: None,
            format: None,
            header,
            data,
            header_len: None,
            n_ints_in_file: n_ints,
            bounds: Bounds {
                ints: 0..n_ints,
                chans: 0..nchans,
            },
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn format(&self) -> Option<FileFormat> {
        self.format
    }

    /// The size of the SIGPROC header \[bytes\]. `None` for other formats.
    pub fn header_len(&self) -> Option<usize> {
        self.header_len
    }

    /// The number of integrations in the whole file, regardless of the
    /// selection.
    pub fn n_ints_in_file(&self) -> usize {
        self.n_ints_in_file
    }

    /// The shape of all the data in the file.
    pub fn file_shape(&self) -> (usize, usize, usize) {
        (
            self.n_ints_in_file,
            self.header.nifs as usize,
            self.header.nchans as usize,
        )
    }

    /// The indices of the loaded integrations.
    pub fn int_range(&self) -> Range<usize> {
        self.bounds.ints.clone()
    }

    /// The indices of the loaded channels.
    pub fn chan_range(&self) -> Range<usize> {
        self.bounds.chans.clone()
    }

    /// The centre frequency of each loaded channel \[MHz\].
    pub fn freqs(&self) -> Array1<f64> {
        let all = self.header.channel_freqs();
        all.slice(s![self.bounds.chans.clone()]).to_owned()
    }

    /// The header describing only the loaded data, i.e. `fch1`, `nchans` and
    /// `tstart` are adjusted for the selection.
    pub fn selected_header(&self) -> FilterbankHeader {
        let mut header = self.header.clone();
        header.fch1 = self.header.fch1 + self.bounds.chans.start as f64 * self.header.foff;
        header.nchans = self.bounds.chans.len() as i32;
        header.tstart = self.header.tstart
            + self.bounds.ints.start as f64 * self.header.tsamp / SECONDS_PER_DAY;
        header
    }

    /// Get a summary of the metadata. Its [`std::fmt::Display`]
    /// implementation gives a human-readable report.
    pub fn info(&self) -> FileInfo<'_> {
        FileInfo::new(self)
    }

    /// Write the loaded data to a SIGPROC filterbank file. Samples are
    /// encoded according to `header.nbits`.
    pub fn write_fil<T: AsRef<Path>>(&self, path: T) -> Result<(), FilterbankError> {
        sigproc::write(path.as_ref(), &self.selected_header(), self.data.view())
    }

    /// Write the loaded data to an FBH5 file.
    pub fn write_fbh5<T: AsRef<Path>>(&self, path: T) -> Result<(), FilterbankError> {
        fbh5::write(path.as_ref(), &self.selected_header(), self.data.view())
    }
}
