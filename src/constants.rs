// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Useful constants.
 */

/// The first keyword of every SIGPROC header.
pub(crate) const HEADER_START: &str = "HEADER_START";
/// The last keyword of every SIGPROC header.
pub(crate) const HEADER_END: &str = "HEADER_END";

/// SIGPROC strings (keywords and values) are never longer than this many
/// bytes.
pub(crate) const MAX_STRING_LEN: usize = 80;

/// No sane SIGPROC header is bigger than this [bytes]. Anything bigger is
/// almost certainly not a filterbank file.
pub(crate) const MAX_HEADER_LEN: usize = 65536;

/// The magic bytes at the start of every HDF5 file.
pub(crate) const HDF5_SIGNATURE: &[u8; 8] = b"\x89HDF\r\n\x1a\n";

/// The name of the FBH5 dataset holding the data matrix.
pub(crate) const FBH5_DATASET: &str = "data";
/// File-level FBH5 attribute "CLASS".
pub(crate) const FBH5_CLASS: &str = "FILTERBANK";
/// File-level FBH5 attribute "VERSION".
pub(crate) const FBH5_VERSION: &str = "2.0";
/// The labels of the data matrix dimensions.
pub(crate) const DIMENSION_LABELS: [&str; 3] = ["time", "feed_id", "frequency"];

/// The Modified Julian Date of the Unix epoch (1970-01-01T00:00:00 UTC).
pub(crate) const MJD_UNIX_EPOCH: f64 = 40587.0;
/// The number of seconds in a day.
pub(crate) const SECONDS_PER_DAY: f64 = 86400.0;
