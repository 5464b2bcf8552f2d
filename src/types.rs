// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! SIGPROC identifier tables.

/// SIGPROC telescope IDs and their names.
const TELESCOPES: &[(i32, &str)] = &[
    (0, "Fake"),
    (1, "Arecibo"),
    (2, "Ooty"),
    (3, "Nancay"),
    (4, "Parkes"),
    (5, "Jodrell"),
    (6, "GBT"),
    (7, "GMRT"),
    (8, "Effelsberg"),
    (9, "ATA"),
    (10, "SRT"),
    (11, "LOFAR"),
    (12, "VLA"),
    (20, "CHIME"),
    (21, "FAST"),
    (64, "MeerKAT"),
    (65, "KAT-7"),
];

/// SIGPROC machine (backend) IDs and their names.
const MACHINES: &[(i32, &str)] = &[
    (0, "FAKE"),
    (1, "PSPM"),
    (2, "WAPP"),
    (3, "AOFTM"),
    (4, "BPP"),
    (5, "OOTY"),
    (6, "SCAMP"),
    (7, "GMRTFB"),
    (8, "PULSAR2000"),
];

/// What SIGPROC's `header` program prints for IDs it doesn't know.
pub const UNKNOWN: &str = "?????";

/// Get the name of a telescope from its SIGPROC ID.
pub fn telescope_name(id: i32) -> &'static str {
    TELESCOPES
        .iter()
        .find(|(i, _)| *i == id)
        .map(|(_, name)| *name)
        .unwrap_or(UNKNOWN)
}

/// Get the SIGPROC ID of a telescope from its name. The comparison is case
/// insensitive.
pub fn telescope_id(name: &str) -> Option<i32> {
    TELESCOPES
        .iter()
        .find(|(_, n)| n.eq_ignore_ascii_case(name.trim()))
        .map(|(i, _)| *i)
}

/// Get the name of a datataking machine from its SIGPROC ID.
pub fn machine_name(id: i32) -> &'static str {
    MACHINES
        .iter()
        .find(|(i, _)| *i == id)
        .map(|(_, name)| *name)
        .unwrap_or(UNKNOWN)
}

/// The kind of data described by a SIGPROC header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Filterbank,
    TimeSeries,
    Unknown(i32),
}

impl From<i32> for DataType {
    fn from(i: i32) -> Self {
        match i {
            1 => DataType::Filterbank,
            2 => DataType::TimeSeries,
            i => DataType::Unknown(i),
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataType::Filterbank => write!(f, "filterbank"),
            DataType::TimeSeries => write!(f, "time series"),
            DataType::Unknown(_) => write!(f, "unknown"),
        }
    }
}
