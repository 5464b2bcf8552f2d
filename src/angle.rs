// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Conversions between decimal angles and the packed "DDMMSS.s" form used by
//! SIGPROC.
//!
//! SIGPROC stores right ascension as hhmmss.s and declination as ddmmss.s,
//! each packed into a single double, e.g. 20h39m07.4s is stored as 203907.4.
//! Everything else in this crate works with decimal hours (RA) and decimal
//! degrees (Dec).

/// Convert a decimal angle (hours or degrees) to the packed DDMMSS.s form.
pub fn ddd_to_dms(ddd: f64) -> f64 {
    let sign = if ddd < 0.0 { -1.0 } else { 1.0 };
    let ddd = ddd.abs();
    let mm = 60.0 * (ddd % 1.0);
    let ss = 60.0 * (mm % 1.0);
    sign * (10000.0 * ddd.floor() + 100.0 * mm.floor() + ss)
}

/// Convert a packed DDMMSS.s angle to decimal hours or degrees.
pub fn dms_to_ddd(dms: f64) -> f64 {
    let sign = if dms < 0.0 { -1.0 } else { 1.0 };
    let mut dms = dms.abs();

    let dd = (dms / 10000.0).floor();
    dms -= 10000.0 * dd;
    let mm = (dms / 100.0).floor();
    let ss = dms - 100.0 * mm;
    sign * (dd + mm / 60.0 + ss / 3600.0)
}

/// Formats a decimal angle as `[+-]DD:MM:SS.ssss`.
#[derive(Debug, Clone, Copy)]
pub struct Sexagesimal {
    value: f64,
    /// Print a `+` for non-negative values? Declinations want this, right
    /// ascensions don't.
    explicit_sign: bool,
}

impl Sexagesimal {
    /// A right ascension in decimal hours.
    pub fn hours(value: f64) -> Self {
        Self {
            value,
            explicit_sign: false,
        }
    }

    /// A declination in decimal degrees.
    pub fn degrees(value: f64) -> Self {
        Self {
            value,
            explicit_sign: true,
        }
    }
}

impl std::fmt::Display for Sexagesimal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.value < 0.0 {
            "-"
        } else if self.explicit_sign {
            "+"
        } else {
            ""
        };
        // Work in units of 0.1 ms so that rounding can't produce "60.0000"
        // seconds.
        let total = (self.value.abs() * 3600.0 * 1e4).round() as u64;
        let frac = total % 10_000;
        let secs = total / 10_000;
        write!(
            f,
            "{sign}{:02}:{:02}:{:02}.{:04}",
            secs / 3600,
            (secs / 60) % 60,
            secs % 60,
            frac
        )
    }
}
