// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Reading and writing the data section of SIGPROC filterbank files.
//!
//! Samples are ordered by time, then IF, then channel. Sub-byte samples are
//! packed starting with the least significant bits of each byte.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write},
    path::Path,
};

use log::{debug, warn};
use ndarray::prelude::*;

use super::{FilterbankError, Loaded, Selection};
use crate::header::{FilterbankHeader, HeaderValue};

/// How samples are stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum SampleFormat {
    /// 1, 2 or 4 unsigned bits per sample.
    Packed(u8),
    U8,
    I8,
    U16,
    F32,
    F64,
}

impl SampleFormat {
    pub(super) fn new(header: &FilterbankHeader) -> Result<Self, FilterbankError> {
        header.validate()?;
        let signed = header
            .extra
            .iter()
            .any(|(k, v)| k == "signed" && *v == HeaderValue::Byte(1));
        let format = match header.nbits {
            1 | 2 | 4 => SampleFormat::Packed(header.nbits as u8),
            8 if signed => SampleFormat::I8,
            8 => SampleFormat::U8,
            16 => SampleFormat::U16,
            32 => SampleFormat::F32,
            // validate() has already rejected anything else.
            _ => SampleFormat::F64,
        };
        Ok(format)
    }

    /// Unpack the raw bytes of one integration into `out`.
    pub(super) fn decode(self, raw: &[u8], out: &mut [f32]) {
        match self {
            SampleFormat::Packed(nbits) => {
                let per_byte = (8 / nbits) as usize;
                let mask = (1_u16 << nbits) as u8 - 1;
                for (i, o) in out.iter_mut().enumerate() {
                    let shift = (i % per_byte) as u8 * nbits;
                    *o = ((raw[i / per_byte] >> shift) & mask) as f32;
                }
            }
            SampleFormat::U8 => {
                for (o, &b) in out.iter_mut().zip(raw) {
                    *o = b as f32;
                }
            }
            SampleFormat::I8 => {
                for (o, &b) in out.iter_mut().zip(raw) {
                    *o = b as i8 as f32;
                }
            }
            SampleFormat::U16 => {
                for (o, c) in out.iter_mut().zip(raw.chunks_exact(2)) {
                    *o = u16::from_le_bytes([c[0], c[1]]) as f32;
                }
            }
            SampleFormat::F32 => {
                for (o, c) in out.iter_mut().zip(raw.chunks_exact(4)) {
                    *o = f32::from_le_bytes([c[0], c[1], c[2], c[3]]);
                }
            }
            SampleFormat::F64 => {
                for (o, c) in out.iter_mut().zip(raw.chunks_exact(8)) {
                    *o = f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]])
                        as f32;
                }
            }
        }
    }

    /// Append the on-disk representation of `samples` to `out`. Integer
    /// formats round and saturate.
    pub(super) fn encode<I: Iterator<Item = f32>>(
        self,
        samples: I,
        out: &mut Vec<u8>,
    ) -> Result<(), FilterbankError> {
        match self {
            SampleFormat::Packed(nbits) => {
                return Err(FilterbankError::UnsupportedOutputNbits(nbits as i32))
            }
            SampleFormat::U8 => out.extend(samples.map(|s| s.round().clamp(0.0, 255.0) as u8)),
            SampleFormat::I8 => out.extend(
                samples.map(|s| s.round().clamp(i8::MIN as f32, i8::MAX as f32) as i8 as u8),
            ),
            SampleFormat::U16 => {
                for s in samples {
                    let s = s.round().clamp(0.0, u16::MAX as f32) as u16;
                    out.extend_from_slice(&s.to_le_bytes());
                }
            }
            SampleFormat::F32 => {
                for s in samples {
                    out.extend_from_slice(&s.to_le_bytes());
                }
            }
            SampleFormat::F64 => {
                for s in samples {
                    out.extend_from_slice(&(s as f64).to_le_bytes());
                }
            }
        }
        Ok(())
    }
}

pub(super) fn read(path: &Path, selection: &Selection) -> Result<Loaded, FilterbankError> {
    let file = File::open(path)?;
    let file_size = file.metadata()?.len();
    let mut reader = BufReader::new(file);

    let (header, header_len) = FilterbankHeader::read_from(&mut reader)?;
    let format = SampleFormat::new(&header)?;
    debug!(
        "'{}': {header_len} byte header, {format:?} samples",
        path.display()
    );

    let bytes_per_spectrum = header.bytes_per_spectrum();
    let data_bytes = file_size.saturating_sub(header_len as u64);
    let n_ints_in_file = header.n_ints(data_bytes) as usize;
    let leftover = data_bytes % bytes_per_spectrum as u64;
    if leftover != 0 {
        warn!(
            "'{}' has {leftover} trailing bytes that don't make a whole integration; ignoring them",
            path.display()
        );
    }

    let bounds = selection.resolve(&header, n_ints_in_file)?;
    let nifs = header.nifs as usize;
    let nchans = header.nchans as usize;
    let mut data = Array3::zeros((bounds.ints.len(), nifs, bounds.chans.len()));

    // Buffers are only sized from the header once we know that at least one
    // whole integration exists in the file.
    if !bounds.ints.is_empty() {
        let offset = header_len as u64 + bounds.ints.start as u64 * bytes_per_spectrum as u64;
        reader.seek(SeekFrom::Start(offset))?;
        let mut raw = vec![0; bytes_per_spectrum];
        let mut spectrum = vec![0.0; nifs * nchans];
        for mut out in data.outer_iter_mut() {
            reader.read_exact(&mut raw)?;
            format.decode(&raw, &mut spectrum);
            for (i_if, mut row) in out.outer_iter_mut().enumerate() {
                let start = i_if * nchans;
                let selected = &spectrum[start + bounds.chans.start..start + bounds.chans.end];
                for (o, &s) in row.iter_mut().zip(selected) {
                    *o = s;
                }
            }
        }
    }

    Ok(Loaded {
        header,
        header_len: Some(header_len),
        n_ints_in_file,
        bounds,
        data,
    })
}

pub(super) fn write(
    path: &Path,
    header: &FilterbankHeader,
    data: ArrayView3<f32>,
) -> Result<(), FilterbankError> {
    let format = SampleFormat::new(header)?;
    let mut writer = BufWriter::new(File::create(path)?);
    header.write_to(&mut writer)?;

    let mut buf = Vec::with_capacity(header.bytes_per_spectrum());
    for spectrum in data.outer_iter() {
        buf.clear();
        format.encode(spectrum.iter().copied(), &mut buf)?;
        writer.write_all(&buf)?;
    }
    writer.flush()?;
    Ok(())
}
