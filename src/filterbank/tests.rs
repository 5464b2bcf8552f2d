// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Tests for loading and writing filterbank data.

use std::io::Write;

use approx::*;
use ndarray::prelude::*;
use tempfile::TempDir;

use super::*;
use crate::header::{tests::gbt_header, HeaderError, HeaderValue};

/// A small filterbank with distinct values everywhere: 5 integrations, 2 IFs
/// and 16 channels.
fn test_filterbank(nbits: i32) -> Filterbank {
    let mut header = gbt_header();
    header.nifs = 2;
    header.nbits = nbits;
    let data = Array3::from_shape_fn((5, 2, 16), |(t, i, c)| (t * 100 + i * 20 + c) as f32);
    Filterbank::from_parts(header, data).unwrap()
}

/// Write a SIGPROC file from a header and raw data bytes.
fn write_raw_fil(dir: &TempDir, name: &str, header: &FilterbankHeader, data: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    let mut f = File::create(&path).unwrap();
    header.write_to(&mut f).unwrap();
    f.write_all(data).unwrap();
    path
}

/// Write an FBH5 file by hand: the CLASS attribute, the "data" dataset and
/// whichever integer attributes are given.
fn write_bare_fbh5<D: Dimension>(
    dir: &TempDir,
    name: &str,
    data: ArrayView<f32, D>,
    attrs: &[(&str, i32)],
) -> PathBuf {
    let path = dir.path().join(name);
    let h5 = hdf5::File::create(&path).unwrap();
    let class: hdf5::types::VarLenUnicode = "FILTERBANK".parse().unwrap();
    h5.new_attr::<hdf5::types::VarLenUnicode>()
        .shape(())
        .create("CLASS")
        .unwrap()
        .write_scalar(&class)
        .unwrap();
    let ds = h5
        .new_dataset::<f32>()
        .shape(data.shape().to_vec())
        .create("data")
        .unwrap();
    if !data.is_empty() {
        ds.write(data).unwrap();
    }
    for &(attr, value) in attrs {
        ds.new_attr::<i32>()
            .shape(())
            .create(attr)
            .unwrap()
            .write_scalar(&value)
            .unwrap();
    }
    path
}

#[test]
fn test_fil_roundtrip() {
    let dir = TempDir::new().unwrap();
    for nbits in [8, 16, 32, 64] {
        let fb = test_filterbank(nbits);
        let path = dir.path().join(format!("test_{nbits}.fil"));
        fb.write_fil(&path).unwrap();

        let read = Filterbank::open(&path).unwrap();
        assert_eq!(read.format(), Some(FileFormat::Sigproc));
        assert_eq!(read.path(), Some(path.as_path()));
        assert_eq!(read.header.nbits, nbits);
        assert_eq!(read.header.source_name, fb.header.source_name);
        assert_eq!(read.n_ints_in_file(), 5);
        assert_eq!(read.file_shape(), (5, 2, 16));
        assert_eq!(read.header_len(), Some(fb.header.to_bytes().len()));
        assert_abs_diff_eq!(read.data, fb.data);
    }
}

#[test]
fn test_fil_selection() {
    let dir = TempDir::new().unwrap();
    let fb = test_filterbank(32);
    let path = dir.path().join("test.fil");
    fb.write_fil(&path).unwrap();

    let freqs = fb.header.channel_freqs();
    // foff is negative, so give the range "backwards" to check that it
    // doesn't matter.
    let selection = Selection {
        t_start: Some(1),
        t_stop: Some(3),
        f_start: Some(freqs[4]),
        f_stop: Some(freqs[9]),
    };
    let read = Filterbank::open_with(&path, &selection).unwrap();
    assert_eq!(read.data.dim(), (2, 2, 6));
    assert_eq!(read.int_range(), 1..3);
    assert_eq!(read.chan_range(), 4..10);
    assert_eq!(read.file_shape(), (5, 2, 16));
    assert_abs_diff_eq!(read.data, fb.data.slice(s![1..3, .., 4..10]));
    assert_abs_diff_eq!(read.freqs(), freqs.slice(s![4..10]));

    // The selected header describes only what was loaded.
    let header = read.selected_header();
    assert_eq!(header.nchans, 6);
    assert_abs_diff_eq!(header.fch1, freqs[4]);
    assert_abs_diff_eq!(
        header.tstart,
        fb.header.tstart + fb.header.tsamp / 86400.0,
        epsilon = 1e-12
    );
}

#[test]
fn test_empty_selections() {
    let dir = TempDir::new().unwrap();
    let fb = test_filterbank(32);
    let path = dir.path().join("test.fil");
    fb.write_fil(&path).unwrap();

    for selection in [
        Selection {
            t_start: Some(5),
            ..Default::default()
        },
        Selection {
            t_start: Some(3),
            t_stop: Some(2),
            ..Default::default()
        },
        Selection {
            f_start: Some(1.0),
            f_stop: Some(2.0),
            ..Default::default()
        },
    ] {
        let result = Filterbank::open_with(&path, &selection);
        assert!(
            matches!(result, Err(FilterbankError::EmptySelection)),
            "{selection:?}"
        );
    }

    // Asking for more than exists just gives what exists.
    let selection = Selection {
        t_stop: Some(100),
        ..Default::default()
    };
    let read = Filterbank::open_with(&path, &selection).unwrap();
    assert_eq!(read.data.dim(), (5, 2, 16));
}

#[test]
fn test_packed_samples() {
    let dir = TempDir::new().unwrap();
    let mut header = gbt_header();
    header.nchans = 8;
    header.nbits = 2;
    // Two integrations of 8 2-bit samples, least significant bits first.
    let raw = [0b11_10_01_00, 0b00_01_10_11, 0b01_01_01_01, 0b10_10_10_10];
    let path = write_raw_fil(&dir, "2bit.fil", &header, &raw);

    let read = Filterbank::open(&path).unwrap();
    assert_eq!(read.data.dim(), (2, 1, 8));
    assert_abs_diff_eq!(
        read.data,
        array![
            [[0.0, 1.0, 2.0, 3.0, 3.0, 2.0, 1.0, 0.0]],
            [[1.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 2.0]]
        ]
    );

    // We can't write them back out though.
    let out = dir.path().join("2bit_out.fil");
    assert!(matches!(
        read.write_fil(out),
        Err(FilterbankError::UnsupportedOutputNbits(2))
    ));
}

#[test]
fn test_1bit_and_4bit_samples() {
    let dir = TempDir::new().unwrap();
    let mut header = gbt_header();
    header.nchans = 8;
    header.nbits = 1;
    let path = write_raw_fil(&dir, "1bit.fil", &header, &[0b1010_0101, 0b0000_0001]);
    let read = Filterbank::open(&path).unwrap();
    assert_abs_diff_eq!(
        read.data,
        array![
            [[1.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 1.0]],
            [[1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]]
        ]
    );

    header.nchans = 4;
    header.nbits = 4;
    let path = write_raw_fil(&dir, "4bit.fil", &header, &[0x21, 0xf3]);
    let read = Filterbank::open(&path).unwrap();
    assert_abs_diff_eq!(read.data, array![[[1.0, 2.0, 3.0, 15.0]]]);

    // Channel selection works on unpacked samples.
    let freqs = header.channel_freqs();
    let selection = Selection {
        f_start: Some(freqs[1]),
        f_stop: Some(freqs[2]),
        ..Default::default()
    };
    let read = Filterbank::open_with(&path, &selection).unwrap();
    assert_abs_diff_eq!(read.data, array![[[2.0, 3.0]]]);
}

#[test]
fn test_signed_8bit_samples() {
    let dir = TempDir::new().unwrap();
    let mut header = gbt_header();
    header.nchans = 4;
    header.nbits = 8;
    header
        .extra
        .push(("signed".to_string(), HeaderValue::Byte(1)));
    let raw = [0, 1, 0xff, 0x80];
    let path = write_raw_fil(&dir, "signed.fil", &header, &raw);

    let read = Filterbank::open(&path).unwrap();
    assert_abs_diff_eq!(read.data, array![[[0.0, 1.0, -1.0, -128.0]]]);

    // Without the flag, the same bytes are unsigned.
    header.extra.clear();
    let path = write_raw_fil(&dir, "unsigned.fil", &header, &raw);
    let read = Filterbank::open(&path).unwrap();
    assert_abs_diff_eq!(read.data, array![[[0.0, 1.0, 255.0, 128.0]]]);
}

#[test]
fn test_trailing_bytes_are_ignored() {
    let dir = TempDir::new().unwrap();
    let mut header = gbt_header();
    header.nchans = 2;
    let mut raw = vec![];
    for v in [1.0_f32, 2.0, 3.0, 4.0] {
        raw.extend_from_slice(&v.to_le_bytes());
    }
    // Half of an integration.
    raw.extend_from_slice(&5.0_f32.to_le_bytes());
    let path = write_raw_fil(&dir, "trailing.fil", &header, &raw);

    let read = Filterbank::open(&path).unwrap();
    assert_eq!(read.n_ints_in_file(), 2);
    assert_abs_diff_eq!(read.data, array![[[1.0, 2.0]], [[3.0, 4.0]]]);
}

#[test]
fn test_header_only_file() {
    let dir = TempDir::new().unwrap();
    let header = gbt_header();
    let path = write_raw_fil(&dir, "empty.fil", &header, &[]);

    let read = Filterbank::open(&path).unwrap();
    assert_eq!(read.data.dim(), (0, 1, 16));
    assert_eq!(read.n_ints_in_file(), 0);
}

#[test]
fn test_huge_header_without_data() {
    let dir = TempDir::new().unwrap();
    let mut header = gbt_header();
    header.nchans = i32::MAX;
    // Not even one integration's worth of data.
    let path = write_raw_fil(&dir, "huge.fil", &header, &[0; 16]);

    let read = Filterbank::open(&path).unwrap();
    assert_eq!(read.n_ints_in_file(), 0);
    assert_eq!(read.data.dim(), (0, 1, i32::MAX as usize));

    // Asking for an integration that isn't there is an error.
    let selection = Selection {
        t_start: Some(0),
        ..Default::default()
    };
    let result = Filterbank::open_with(&path, &selection);
    assert!(matches!(result, Err(FilterbankError::EmptySelection)));

    // A spectrum too big to even count the bits of.
    header.nifs = i32::MAX;
    header.nbits = 64;
    let path = write_raw_fil(&dir, "huger.fil", &header, &[0; 16]);
    let result = Filterbank::open(&path);
    assert!(matches!(
        result,
        Err(FilterbankError::Header(HeaderError::SpectrumTooLarge { .. }))
    ));
}

#[test]
fn test_bad_files() {
    let dir = TempDir::new().unwrap();

    let result = Filterbank::open(dir.path().join("nothing_here.fil"));
    assert!(matches!(result, Err(FilterbankError::FileDoesntExist(_))));

    // Not a filterbank, and the extension doesn't help.
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "these are not the data you're looking for").unwrap();
    let result = Filterbank::open(&path);
    assert!(matches!(result, Err(FilterbankError::UnknownFormat(_))));

    // Claims to be a filterbank, but isn't.
    let path = dir.path().join("notes.fil");
    std::fs::write(&path, "these are not the data you're looking for").unwrap();
    let result = Filterbank::open(&path);
    assert!(matches!(
        result,
        Err(FilterbankError::Header(HeaderError::NotAFilterbank(_)))
    ));

    // A header with nonsense nbits.
    let mut header = gbt_header();
    header.nbits = 12;
    let path = write_raw_fil(&dir, "12bit.fil", &header, &[0; 24]);
    let result = Filterbank::open(&path);
    assert!(matches!(
        result,
        Err(FilterbankError::Header(HeaderError::UnsupportedNbits(12)))
    ));
}

#[test]
fn test_format_detection() {
    let dir = TempDir::new().unwrap();
    let fb = test_filterbank(32);

    // The contents win over the extension.
    let path = dir.path().join("actually_sigproc.h5");
    fb.write_fil(&path).unwrap();
    assert_eq!(FileFormat::detect(&path).unwrap(), FileFormat::Sigproc);

    let path = dir.path().join("actually_hdf5.fil");
    fb.write_fbh5(&path).unwrap();
    assert_eq!(FileFormat::detect(&path).unwrap(), FileFormat::Fbh5);
}

#[test]
fn test_from_parts_checks_shape() {
    let header = gbt_header();
    let result = Filterbank::from_parts(header, Array3::zeros((3, 1, 15)));
    assert!(matches!(
        result,
        Err(FilterbankError::ShapeMismatch {
            header_nchans: 16,
            nchans: 15,
            ..
        })
    ));
}

#[test]
fn test_fbh5_roundtrip() {
    let dir = TempDir::new().unwrap();
    for nbits in [8, 16, 32] {
        let fb = test_filterbank(nbits);
        let path = dir.path().join(format!("test_{nbits}.h5"));
        fb.write_fbh5(&path).unwrap();

        let read = Filterbank::open(&path).unwrap();
        assert_eq!(read.format(), Some(FileFormat::Fbh5));
        assert_eq!(read.header_len(), None);
        assert_eq!(read.header.nbits, nbits);
        assert_eq!(read.header.source_name, fb.header.source_name);
        assert_eq!(read.header.rawdatafile, fb.header.rawdatafile);
        assert_eq!(read.header.telescope_id, 6);
        // No DDMMSS.s packing in FBH5, so angles are exact.
        assert_eq!(read.header.src_raj, fb.header.src_raj);
        assert_eq!(read.header.src_dej, fb.header.src_dej);
        assert_abs_diff_eq!(read.data, fb.data);
    }
}

#[test]
fn test_fbh5_selection() {
    let dir = TempDir::new().unwrap();
    let fb = test_filterbank(32);
    let path = dir.path().join("test.h5");
    fb.write_fbh5(&path).unwrap();

    let freqs = fb.header.channel_freqs();
    let selection = Selection {
        t_start: Some(2),
        t_stop: None,
        f_start: Some(freqs[15]),
        f_stop: Some(freqs[12]),
    };
    let read = Filterbank::open_with(&path, &selection).unwrap();
    assert_eq!(read.data.dim(), (3, 2, 4));
    assert_abs_diff_eq!(read.data, fb.data.slice(s![2.., .., 12..]));
}

#[test]
fn test_fil_to_fbh5_to_fil() {
    let dir = TempDir::new().unwrap();
    let fb = test_filterbank(32);
    let fil = dir.path().join("a.fil");
    let h5 = dir.path().join("a.h5");
    let fil2 = dir.path().join("b.fil");
    fb.write_fil(&fil).unwrap();
    Filterbank::open(&fil).unwrap().write_fbh5(&h5).unwrap();
    Filterbank::open(&h5).unwrap().write_fil(&fil2).unwrap();

    let a = Filterbank::open(&fil).unwrap();
    let b = Filterbank::open(&fil2).unwrap();
    assert_eq!(a.header_len(), b.header_len());
    // Angles may move by a rounding error when repacked as DDMMSS.s.
    let diffs = a.header.differences(&b.header);
    assert!(
        diffs.iter().all(|&d| d == "src_raj" || d == "src_dej"),
        "{diffs:?}"
    );
    assert_abs_diff_eq!(a.header.src_raj, b.header.src_raj, epsilon = 1e-10);
    assert_abs_diff_eq!(a.header.src_dej, b.header.src_dej, epsilon = 1e-10);
    assert_abs_diff_eq!(a.data, b.data);
}

#[test]
fn test_not_an_fbh5_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("other.h5");
    {
        let h5 = hdf5::File::create(&path).unwrap();
        let class: hdf5::types::VarLenUnicode = "IMAGE".parse().unwrap();
        h5.new_attr::<hdf5::types::VarLenUnicode>()
            .shape(())
            .create("CLASS")
            .unwrap()
            .write_scalar(&class)
            .unwrap();
    }
    let result = Filterbank::open(&path);
    assert!(matches!(
        result,
        Err(FilterbankError::NotFbh5 { class, .. }) if class == "IMAGE"
    ));
}

#[test]
fn test_fbh5_missing_attributes() {
    let dir = TempDir::new().unwrap();
    let data = Array3::from_shape_fn((2, 1, 3), |(t, _, c)| (t * 3 + c) as f32);
    let path = write_bare_fbh5(&dir, "bare.h5", data.view(), &[]);

    // The shape fills in the layout; everything else is zero or empty.
    let read = Filterbank::open(&path).unwrap();
    assert_eq!(read.header.nchans, 3);
    assert_eq!(read.header.nifs, 1);
    assert_eq!(read.header.nbits, 32);
    assert_eq!(read.header.telescope_id, 0);
    assert_eq!(read.header.fch1, 0.0);
    assert_eq!(read.header.tsamp, 0.0);
    assert_eq!(read.header.source_name, "");
    assert_eq!(read.header.rawdatafile, "");
    assert!(read.header.extra.is_empty());
    assert_abs_diff_eq!(read.data, data);
}

#[test]
fn test_fbh5_bad_headers() {
    let dir = TempDir::new().unwrap();
    let data = Array3::<f32>::zeros((3, 1, 4));

    let path = write_bare_fbh5(&dir, "nifs.h5", data.view(), &[("nifs", -1)]);
    let result = Filterbank::open(&path);
    assert!(matches!(
        result,
        Err(FilterbankError::Header(HeaderError::InvalidValue {
            keyword: "nifs",
            value: -1,
        }))
    ));

    let path = write_bare_fbh5(&dir, "nbits.h5", data.view(), &[("nbits", 12)]);
    let result = Filterbank::open(&path);
    assert!(matches!(
        result,
        Err(FilterbankError::Header(HeaderError::UnsupportedNbits(12)))
    ));

    // No channels at all.
    let empty = Array3::<f32>::zeros((3, 1, 0));
    let path = write_bare_fbh5(&dir, "no_chans.h5", empty.view(), &[]);
    let result = Filterbank::open(&path);
    assert!(matches!(
        result,
        Err(FilterbankError::Header(HeaderError::InvalidValue {
            keyword: "nchans",
            value: 0,
        }))
    ));

    // The attributes have to agree with the shape.
    let path = write_bare_fbh5(&dir, "shape.h5", data.view(), &[("nchans", 5)]);
    let result = Filterbank::open(&path);
    assert!(matches!(
        result,
        Err(FilterbankError::ShapeMismatch {
            header_nchans: 5,
            nchans: 4,
            ..
        })
    ));
}

#[test]
fn test_fbh5_wrong_rank() {
    let dir = TempDir::new().unwrap();
    let data = Array2::<f32>::zeros((3, 4));
    let path = write_bare_fbh5(&dir, "2d.h5", data.view(), &[]);
    let result = Filterbank::open(&path);
    assert!(matches!(
        result,
        Err(FilterbankError::Fbh5Rank { ndim: 2, .. })
    ));
}

#[test]
fn test_info_report() {
    let fb = test_filterbank(32);
    let report = fb.info().to_string();
    assert!(report.starts_with("--- File Info ---\n"));
    assert!(report.contains("DIMENSION_LABELS : ['time' 'feed_id' 'frequency']"));
    assert!(report.contains("6 (GBT)"));
    assert!(report.contains("20:39:07.4000"));
    assert!(report.contains("+42:24:24.5000"));
    assert!(report.contains("tstart (ISOT) :"));
    assert!(report.contains("2017-04-13T19:27:"));
    assert!(report.contains("(5, 2, 16)"));
    assert!(report.contains("--- Selection Info ---"));
    // Each keyword line is right-aligned.
    assert!(report.contains(&format!("\n{:>16} : {:>32}\n", "nbits", 32)));

    let (min, max) = fb.info().freq_range().unwrap();
    let freqs = fb.freqs();
    assert_abs_diff_eq!(min, freqs[15]);
    assert_abs_diff_eq!(max, freqs[0]);
}
