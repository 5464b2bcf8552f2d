// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with SIGPROC headers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HeaderError {
    #[error("Not a SIGPROC filterbank header; expected the first keyword to be 'HEADER_START', but got '{0}'")]
    NotAFilterbank(String),

    #[error("Unknown header keyword '{0}'; can't determine the size of its value")]
    UnknownKeyword(String),

    #[error("Got a header string length of {0}, which isn't valid")]
    BadStringLength(i32),

    #[error("The header is bigger than {0} bytes; is this really a filterbank file?")]
    TooLong(usize),

    #[error("The header ended before 'HEADER_END' was found")]
    Truncated,

    #[error("Header keyword '{keyword}' has an invalid value ({value})")]
    InvalidValue { keyword: &'static str, value: i32 },

    #[error("nbits was {0}, but only 1, 2, 4, 8, 16, 32 and 64 are supported")]
    UnsupportedNbits(i32),

    #[error("A spectrum of {nifs} IFs and {nchans} channels at {nbits} bits is too big to handle")]
    SpectrumTooLarge { nifs: i32, nchans: i32, nbits: i32 },

    #[error("nifs * nchans * nbits ({0}) isn't a whole number of bytes")]
    PartialByteSpectrum(usize),

    #[error("IO error: {0}")]
    IO(std::io::Error),
}

impl From<std::io::Error> for HeaderError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::UnexpectedEof => HeaderError::Truncated,
            _ => HeaderError::IO(e),
        }
    }
}
