// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with reading and writing filterbank data.

use thiserror::Error;

use crate::header::HeaderError;

#[derive(Error, Debug)]
pub enum FilterbankError {
    #[error("Specified file '{0}' doesn't exist")]
    FileDoesntExist(String),

    #[error("Couldn't work out the format of '{0}'; it is neither a SIGPROC filterbank nor an HDF5 file")]
    UnknownFormat(String),

    #[error("'{path}' is an HDF5 file, but its CLASS is '{class}' rather than 'FILTERBANK'")]
    NotFbh5 { path: String, class: String },

    #[error("HDF5 dataset 'data' in '{path}' has {ndim} dimensions; expected 3 (time, IF, frequency)")]
    Fbh5Rank { path: String, ndim: usize },

    #[error("The header describes {header_nifs} IFs and {header_nchans} channels, but the data have {nifs} IFs and {nchans} channels")]
    ShapeMismatch {
        header_nifs: i32,
        header_nchans: i32,
        nifs: usize,
        nchans: usize,
    },

    #[error("The requested selection doesn't contain any data")]
    EmptySelection,

    #[error("Can't write {0}-bit samples; use 8, 16, 32 or 64")]
    UnsupportedOutputNbits(i32),

    #[error("Couldn't store '{0}' as an HDF5 string")]
    Fbh5String(String),

    #[error(transparent)]
    Header(#[from] HeaderError),

    /// An error associated with the hdf5 crate.
    #[error("HDF5 error: {0}")]
    Hdf5(#[from] hdf5::Error),

    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),
}
