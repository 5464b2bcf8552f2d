// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Code to read and write SIGPROC filterbank headers.
//!
//! A filterbank header consists of ASCII keywords, each preceded by a 4-byte
//! integer specifying the keyword length. Each keyword is followed by 0 or
//! more values, but usually just 1, and each keyword has a specific type of
//! value. Integers and doubles are always little endian.
//!
//! ```text
//! IIIIHEADER_START
//! IIIImachine_idIIII
//! IIIItelescope_idIIII
//! IIIIsrc_rajDDDDDDDD
//! ...
//! IIIIsource_nameIIII[C...]
//! IIIIrawdatafileIIII[C...]
//! IIIIHEADER_END
//! ```
//!
//! where IIII is a 4-byte integer, DDDDDDDD is an 8-byte double and [C...] is
//! a variable-length ASCII string (not NUL terminated).

mod error;

pub use error::HeaderError;

use std::io::{Read, Write};

use chrono::{DateTime, Utc};
use log::trace;
use ndarray::Array1;

use crate::{
    angle::{ddd_to_dms, dms_to_ddd},
    constants::*,
    types::{machine_name, telescope_name, DataType},
};

/// A value attached to a header keyword that doesn't have a dedicated field
/// in [`FilterbankHeader`].
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    Int(i32),
    Long(i64),
    Byte(u8),
    Double(f64),
    /// A decimal angle; packed as DDMMSS.s on the wire.
    Angle(f64),
    Str(String),
    /// Keywords like "FREQUENCY_START" have no value.
    Flag,
}

impl std::fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HeaderValue::Int(i) => write!(f, "{i}"),
            HeaderValue::Long(i) => write!(f, "{i}"),
            HeaderValue::Byte(b) => write!(f, "{b}"),
            HeaderValue::Double(d) | HeaderValue::Angle(d) => write!(f, "{d}"),
            HeaderValue::Str(s) => write!(f, "{s}"),
            HeaderValue::Flag => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueKind {
    Int,
    Long,
    Byte,
    Double,
    Angle,
    Str,
    Flag,
}

/// Every keyword we know how to parse. Anything not listed here can't be
/// skipped, because we don't know how big its value is.
fn keyword_kind(keyword: &str) -> Option<ValueKind> {
    let kind = match keyword {
        "machine_id" | "telescope_id" | "data_type" | "barycentric" | "pulsarcentric"
        | "nchans" | "nbeams" | "ibeam" | "nbits" | "nifs" | "nsamples" | "nbins" => {
            ValueKind::Int
        }
        "src_raj" | "src_dej" => ValueKind::Angle,
        "az_start" | "za_start" | "fch1" | "foff" | "tstart" | "tsamp" | "refdm" | "period"
        | "fchannel" => ValueKind::Double,
        "source_name" | "rawdatafile" => ValueKind::Str,
        "signed" => ValueKind::Byte,
        "npuls" => ValueKind::Long,
        "FREQUENCY_START" | "FREQUENCY_END" => ValueKind::Flag,
        _ => return None,
    };
    Some(kind)
}

/// The metadata of a filterbank file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterbankHeader {
    /// 0=fake data; 1=PSPM; 2=WAPP... (see [`crate::types::machine_name`]).
    pub machine_id: i32,
    /// 0=Fake; 1=Arecibo; 2=Ooty... (see [`crate::types::telescope_name`]).
    pub telescope_id: i32,
    /// 1=filterbank; 2=time series...
    pub data_type: i32,
    /// 1 if barycentric or 0 otherwise (only written if non-zero).
    pub barycentric: i32,
    /// 1 if pulsarcentric or 0 otherwise (only written if non-zero).
    pub pulsarcentric: i32,
    /// Right ascension (J2000) of the source \[decimal hours\].
    pub src_raj: f64,
    /// Declination (J2000) of the source \[decimal degrees\].
    pub src_dej: f64,
    /// Telescope azimuth at the start of the scan \[degrees\].
    pub az_start: f64,
    /// Telescope zenith angle at the start of the scan \[degrees\].
    pub za_start: f64,
    /// Centre frequency of the first channel \[MHz\].
    pub fch1: f64,
    /// Channel bandwidth \[MHz\]. Negative when frequencies descend.
    pub foff: f64,
    pub nchans: i32,
    pub nbeams: i32,
    pub ibeam: i32,
    /// Number of bits per sample.
    pub nbits: i32,
    /// Time stamp of the first sample \[MJD\].
    pub tstart: f64,
    /// Time between samples \[seconds\].
    pub tsamp: f64,
    /// Number of separate IF channels.
    pub nifs: i32,
    pub source_name: String,
    /// The name of the file the data were derived from.
    pub rawdatafile: String,
    /// Any other keywords found in the header, in the order they appeared.
    pub extra: Vec<(String, HeaderValue)>,
}

impl FilterbankHeader {
    /// Parse a header from the start of a buffer. Also returns the header
    /// length, i.e. the offset of the first data byte.
    pub fn from_bytes(buf: &[u8]) -> Result<(Self, usize), HeaderError> {
        let mut buf = buf;
        Self::read_from(&mut buf)
    }

    /// Parse a header from a stream. On success, the stream is positioned at
    /// the first data byte, and the header length is returned alongside the
    /// header.
    pub fn read_from<R: Read>(reader: R) -> Result<(Self, usize), HeaderError> {
        let mut r = HeaderReader {
            inner: reader,
            count: 0,
        };

        let first = match r.read_string(MAX_STRING_LEN) {
            Ok(s) => s,
            Err(HeaderError::BadStringLength(len)) => {
                return Err(HeaderError::NotAFilterbank(format!(
                    "<string of length {len}>"
                )))
            }
            Err(e) => return Err(e),
        };
        if first != HEADER_START {
            return Err(HeaderError::NotAFilterbank(first));
        }

        let mut header = Self::default();
        loop {
            let keyword = r.read_string(MAX_STRING_LEN)?;
            if keyword == HEADER_END {
                break;
            }
            let kind = match keyword_kind(&keyword) {
                Some(k) => k,
                None => return Err(HeaderError::UnknownKeyword(keyword)),
            };
            let value = r.read_value(kind)?;
            trace!("Header keyword '{keyword}' = {value:?}");
            header.set(keyword, value);
        }

        Ok((header, r.count))
    }

    fn set(&mut self, keyword: String, value: HeaderValue) {
        use HeaderValue::*;
        match (keyword.as_str(), value) {
            ("machine_id", Int(i)) => self.machine_id = i,
            ("telescope_id", Int(i)) => self.telescope_id = i,
            ("data_type", Int(i)) => self.data_type = i,
            ("barycentric", Int(i)) => self.barycentric = i,
            ("pulsarcentric", Int(i)) => self.pulsarcentric = i,
            ("src_raj", Angle(a)) => self.src_raj = a,
            ("src_dej", Angle(a)) => self.src_dej = a,
            ("az_start", Double(d)) => self.az_start = d,
            ("za_start", Double(d)) => self.za_start = d,
            ("fch1", Double(d)) => self.fch1 = d,
            ("foff", Double(d)) => self.foff = d,
            ("nchans", Int(i)) => self.nchans = i,
            ("nbeams", Int(i)) => self.nbeams = i,
            ("ibeam", Int(i)) => self.ibeam = i,
            ("nbits", Int(i)) => self.nbits = i,
            ("tstart", Double(d)) => self.tstart = d,
            ("tsamp", Double(d)) => self.tsamp = d,
            ("nifs", Int(i)) => self.nifs = i,
            ("source_name", Str(s)) => self.source_name = clean_string(&s),
            ("rawdatafile", Str(s)) => self.rawdatafile = clean_string(&s),
            (_, v) => self.extra.push((keyword.clone(), v)),
        }
    }

    /// Serialise this header.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.encode(0)
    }

    /// Write this header to a stream, returning the number of bytes written.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<usize, HeaderError> {
        let bytes = self.encode(0);
        writer.write_all(&bytes)?;
        Ok(bytes.len())
    }

    /// Write this header to a stream, making sure that it is at least
    /// `min_len` bytes long. Padding is added to the end of the
    /// `rawdatafile` value as spaces, which are removed again when reading.
    pub fn write_padded_to<W: Write>(
        &self,
        mut writer: W,
        min_len: usize,
    ) -> Result<usize, HeaderError> {
        let bytes = self.encode(min_len);
        writer.write_all(&bytes)?;
        Ok(bytes.len())
    }

    fn encode(&self, min_len: usize) -> Vec<u8> {
        let mut w = HeaderWriter(Vec::with_capacity(512));
        w.put_str(HEADER_START);
        w.put_str("machine_id");
        w.put_int(self.machine_id);
        w.put_str("telescope_id");
        w.put_int(self.telescope_id);
        w.put_str("src_raj");
        w.put_angle(self.src_raj);
        w.put_str("src_dej");
        w.put_angle(self.src_dej);
        w.put_str("az_start");
        w.put_double(self.az_start);
        w.put_str("za_start");
        w.put_double(self.za_start);
        w.put_str("data_type");
        w.put_int(self.data_type);
        w.put_str("fch1");
        w.put_double(self.fch1);
        w.put_str("foff");
        w.put_double(self.foff);
        w.put_str("nchans");
        w.put_int(self.nchans);
        w.put_str("nbeams");
        w.put_int(self.nbeams);
        w.put_str("ibeam");
        w.put_int(self.ibeam);
        w.put_str("nbits");
        w.put_int(self.nbits);
        w.put_str("tstart");
        w.put_double(self.tstart);
        w.put_str("tsamp");
        w.put_double(self.tsamp);
        w.put_str("nifs");
        w.put_int(self.nifs);
        if self.barycentric != 0 {
            w.put_str("barycentric");
            w.put_int(self.barycentric);
        }
        if self.pulsarcentric != 0 {
            w.put_str("pulsarcentric");
            w.put_int(self.pulsarcentric);
        }
        for (keyword, value) in &self.extra {
            w.put_str(keyword);
            w.put_value(value);
        }
        w.put_str("source_name");
        w.put_str(&self.source_name);
        w.put_str("rawdatafile");

        let rawdatafile = truncate(&self.rawdatafile);
        // What's left: the rawdatafile value and HEADER_END.
        let unpadded_len = w.0.len() + 4 + rawdatafile.len() + 4 + HEADER_END.len();
        let padding = min_len.saturating_sub(unpadded_len);
        w.put_raw_str(&format!("{rawdatafile}{}", " ".repeat(padding)));
        w.put_str(HEADER_END);
        w.0
    }

    /// Check that the values describing the data layout are usable.
    pub fn validate(&self) -> Result<(), HeaderError> {
        if self.nchans < 1 {
            return Err(HeaderError::InvalidValue {
                keyword: "nchans",
                value: self.nchans,
            });
        }
        if self.nifs < 1 {
            return Err(HeaderError::InvalidValue {
                keyword: "nifs",
                value: self.nifs,
            });
        }
        match self.nbits {
            1 | 2 | 4 | 8 | 16 | 32 | 64 => (),
            n => return Err(HeaderError::UnsupportedNbits(n)),
        }
        let bits = (self.nifs as usize)
            .checked_mul(self.nchans as usize)
            .and_then(|n| n.checked_mul(self.nbits as usize))
            .ok_or(HeaderError::SpectrumTooLarge {
                nifs: self.nifs,
                nchans: self.nchans,
                nbits: self.nbits,
            })?;
        if bits % 8 != 0 {
            return Err(HeaderError::PartialByteSpectrum(bits));
        }
        Ok(())
    }

    /// The number of bytes occupied by a single integration (all IFs, all
    /// channels). Saturates for headers that [`FilterbankHeader::validate`]
    /// would reject.
    pub fn bytes_per_spectrum(&self) -> usize {
        let bits = (self.nifs.max(0) as usize)
            .saturating_mul(self.nchans.max(0) as usize)
            .saturating_mul(self.nbits.max(0) as usize);
        bits / 8
    }

    /// The number of whole integrations contained in `data_bytes` bytes of
    /// data.
    pub fn n_ints(&self, data_bytes: u64) -> u64 {
        match self.bytes_per_spectrum() {
            0 => 0,
            b => data_bytes / b as u64,
        }
    }

    /// The centre frequency of every channel \[MHz\].
    pub fn channel_freqs(&self) -> Array1<f64> {
        Array1::from_shape_fn(self.nchans.max(0) as usize, |i| {
            self.fch1 + i as f64 * self.foff
        })
    }

    pub fn telescope_name(&self) -> &'static str {
        telescope_name(self.telescope_id)
    }

    pub fn machine_name(&self) -> &'static str {
        machine_name(self.machine_id)
    }

    pub fn data_type(&self) -> DataType {
        DataType::from(self.data_type)
    }

    /// The time of the first sample as a UTC date. `None` if `tstart` is
    /// nonsense.
    pub fn tstart_utc(&self) -> Option<DateTime<Utc>> {
        let secs = (self.tstart - MJD_UNIX_EPOCH) * SECONDS_PER_DAY;
        if !secs.is_finite() || secs.abs() > i64::MAX as f64 {
            return None;
        }
        let whole = secs.floor();
        let nanos = (((secs - whole) * 1e9).round() as u32).min(999_999_999);
        DateTime::from_timestamp(whole as i64, nanos)
    }

    /// The names of the fields that differ between two headers.
    pub fn differences(&self, other: &FilterbankHeader) -> Vec<&'static str> {
        let mut diffs = vec![];
        macro_rules! check {
            ($($field:ident),*) => {
                $(
                    if self.$field != other.$field {
                        diffs.push(stringify!($field));
                    }
                )*
            };
        }
        check!(
            machine_id,
            telescope_id,
            data_type,
            barycentric,
            pulsarcentric,
            src_raj,
            src_dej,
            az_start,
            za_start,
            fch1,
            foff,
            nchans,
            nbeams,
            ibeam,
            nbits,
            tstart,
            tsamp,
            nifs,
            source_name,
            rawdatafile,
            extra
        );
        diffs
    }
}

/// Reads header items while keeping track of how many bytes have been
/// consumed.
struct HeaderReader<R> {
    inner: R,
    count: usize,
}

impl<R: Read> HeaderReader<R> {
    fn read_bytes<const N: usize>(&mut self) -> Result<[u8; N], HeaderError> {
        if self.count + N > MAX_HEADER_LEN {
            return Err(HeaderError::TooLong(MAX_HEADER_LEN));
        }
        let mut buf = [0; N];
        self.inner.read_exact(&mut buf)?;
        self.count += N;
        Ok(buf)
    }

    fn read_int(&mut self) -> Result<i32, HeaderError> {
        Ok(i32::from_le_bytes(self.read_bytes()?))
    }

    fn read_double(&mut self) -> Result<f64, HeaderError> {
        Ok(f64::from_le_bytes(self.read_bytes()?))
    }

    fn read_string(&mut self, max_len: usize) -> Result<String, HeaderError> {
        let len = self.read_int()?;
        if len < 0 || len as usize > max_len {
            return Err(HeaderError::BadStringLength(len));
        }
        let len = len as usize;
        if self.count + len > MAX_HEADER_LEN {
            return Err(HeaderError::TooLong(MAX_HEADER_LEN));
        }
        let mut buf = vec![0; len];
        self.inner.read_exact(&mut buf)?;
        self.count += len;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    fn read_value(&mut self, kind: ValueKind) -> Result<HeaderValue, HeaderError> {
        let value = match kind {
            ValueKind::Int => HeaderValue::Int(self.read_int()?),
            ValueKind::Long => HeaderValue::Long(i64::from_le_bytes(self.read_bytes()?)),
            ValueKind::Byte => HeaderValue::Byte(self.read_bytes::<1>()?[0]),
            ValueKind::Double => HeaderValue::Double(self.read_double()?),
            ValueKind::Angle => HeaderValue::Angle(dms_to_ddd(self.read_double()?)),
            // Values may be longer than keywords if they have been padded.
            ValueKind::Str => HeaderValue::Str(self.read_string(MAX_HEADER_LEN)?),
            ValueKind::Flag => HeaderValue::Flag,
        };
        Ok(value)
    }
}

struct HeaderWriter(Vec<u8>);

impl HeaderWriter {
    fn put_int(&mut self, i: i32) {
        self.0.extend_from_slice(&i.to_le_bytes());
    }

    fn put_double(&mut self, d: f64) {
        self.0.extend_from_slice(&d.to_le_bytes());
    }

    fn put_angle(&mut self, d: f64) {
        self.put_double(ddd_to_dms(d));
    }

    /// Only writes at most [`MAX_STRING_LEN`] bytes.
    fn put_str(&mut self, s: &str) {
        self.put_raw_str(truncate(s));
    }

    fn put_raw_str(&mut self, s: &str) {
        self.put_int(s.len() as i32);
        self.0.extend_from_slice(s.as_bytes());
    }

    fn put_value(&mut self, value: &HeaderValue) {
        match value {
            HeaderValue::Int(i) => self.put_int(*i),
            HeaderValue::Long(i) => self.0.extend_from_slice(&i.to_le_bytes()),
            HeaderValue::Byte(b) => self.0.push(*b),
            HeaderValue::Double(d) => self.put_double(*d),
            HeaderValue::Angle(a) => self.put_angle(*a),
            HeaderValue::Str(s) => self.put_str(s),
            HeaderValue::Flag => (),
        }
    }
}

/// Cut a string down to [`MAX_STRING_LEN`] bytes without splitting a
/// character.
fn truncate(s: &str) -> &str {
    if s.len() <= MAX_STRING_LEN {
        return s;
    }
    let mut end = MAX_STRING_LEN;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Strip padding from a string value read out of a header.
fn clean_string(s: &str) -> String {
    truncate(s.trim_end_matches(|c: char| c == '\0' || c.is_whitespace())).to_string()
}
