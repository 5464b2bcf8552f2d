// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Code to read, inspect and compare radio-telescope filterbank data.

Both SIGPROC filterbank files (`.fil`) and their HDF5 counterparts (FBH5,
`.h5`) are supported. Data are always presented as a 3D array with dimensions
(time, IF, frequency).
 */

pub mod angle;
pub mod compare;
mod constants;
pub mod filterbank;
pub mod header;
pub mod types;

pub use compare::{compare, CompareError, Comparison};
pub use filterbank::{FileFormat, FileInfo, Filterbank, FilterbankError, Selection};
pub use header::{FilterbankHeader, HeaderError};

// Re-exports.
pub use ndarray;
