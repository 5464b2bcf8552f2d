// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Reading and writing FBH5 files: filterbank data stored in HDF5.
//!
//! The file has the attributes CLASS="FILTERBANK" and VERSION="2.0", and a
//! single 3D dataset "data" with dimensions (time, IF, frequency). Header
//! values are attributes of the dataset; unlike SIGPROC files, `src_raj` and
//! `src_dej` are stored as decimal hours and degrees.

use std::{collections::HashSet, path::Path};

use hdf5::{
    types::{FixedAscii, FixedUnicode, TypeDescriptor, VarLenAscii, VarLenUnicode},
    H5Type, Location,
};
use log::debug;
use ndarray::prelude::*;

use super::{FilterbankError, Loaded, Selection};
use crate::{
    constants::*,
    header::{FilterbankHeader, HeaderValue},
};

/// Read a string attribute, whatever kind of HDF5 string it was stored as.
fn read_str_attr(loc: &Location, name: &str) -> hdf5::Result<String> {
    let attr = loc.attr(name)?;
    let s = match attr.dtype()?.to_descriptor()? {
        TypeDescriptor::VarLenUnicode => attr.read_scalar::<VarLenUnicode>()?.as_str().to_string(),
        TypeDescriptor::VarLenAscii => attr.read_scalar::<VarLenAscii>()?.as_str().to_string(),
        TypeDescriptor::FixedUnicode(_) => {
            attr.read_scalar::<FixedUnicode<256>>()?.as_str().to_string()
        }
        _ => attr.read_scalar::<FixedAscii<256>>()?.as_str().to_string(),
    };
    Ok(s)
}

fn to_h5_str(s: &str) -> Result<VarLenUnicode, FilterbankError> {
    s.parse()
        .map_err(|_| FilterbankError::Fbh5String(s.to_string()))
}

fn write_str_attr(loc: &Location, name: &str, value: &str) -> Result<(), FilterbankError> {
    let value = to_h5_str(value)?;
    loc.new_attr::<VarLenUnicode>()
        .shape(())
        .create(name)?
        .write_scalar(&value)?;
    Ok(())
}

fn write_scalar_attr<T: H5Type>(loc: &Location, name: &str, value: &T) -> hdf5::Result<()> {
    loc.new_attr::<T>().shape(()).create(name)?.write_scalar(value)
}

/// The attributes attached to an HDF5 object, used to fall back on defaults
/// when an attribute is missing.
struct Attributes<'a> {
    loc: &'a Location,
    names: HashSet<String>,
}

impl<'a> Attributes<'a> {
    fn new(loc: &'a Location) -> hdf5::Result<Self> {
        Ok(Self {
            loc,
            names: loc.attr_names()?.into_iter().collect(),
        })
    }

    fn int(&self, name: &str) -> hdf5::Result<i32> {
        if self.names.contains(name) {
            self.loc.attr(name)?.read_scalar()
        } else {
            Ok(0)
        }
    }

    fn double(&self, name: &str) -> hdf5::Result<f64> {
        if self.names.contains(name) {
            self.loc.attr(name)?.read_scalar()
        } else {
            Ok(0.0)
        }
    }

    fn string(&self, name: &str) -> hdf5::Result<String> {
        if self.names.contains(name) {
            read_str_attr(self.loc, name)
        } else {
            Ok(String::new())
        }
    }
}

pub(super) fn read(path: &Path, selection: &Selection) -> Result<Loaded, FilterbankError> {
    // so that libhdf5 doesn't print errors to stdout
    hdf5::silence_errors(true);

    let h5 = hdf5::File::open(path)?;
    let class = Attributes::new(&h5)?.string("CLASS")?;
    if class != FBH5_CLASS {
        return Err(FilterbankError::NotFbh5 {
            path: path.display().to_string(),
            class,
        });
    }

    let ds = h5.dataset(FBH5_DATASET)?;
    let shape = ds.shape();
    let (n_ints_in_file, nifs, nchans) = match shape.as_slice() {
        &[t, i, c] => (t, i, c),
        _ => {
            return Err(FilterbankError::Fbh5Rank {
                path: path.display().to_string(),
                ndim: shape.len(),
            })
        }
    };

    let attrs = Attributes::new(&ds)?;
    let mut header = FilterbankHeader {
        machine_id: attrs.int("machine_id")?,
        telescope_id: attrs.int("telescope_id")?,
        data_type: attrs.int("data_type")?,
        barycentric: attrs.int("barycentric")?,
        pulsarcentric: attrs.int("pulsarcentric")?,
        src_raj: attrs.double("src_raj")?,
        src_dej: attrs.double("src_dej")?,
        az_start: attrs.double("az_start")?,
        za_start: attrs.double("za_start")?,
        fch1: attrs.double("fch1")?,
        foff: attrs.double("foff")?,
        nchans: attrs.int("nchans")?,
        nbeams: attrs.int("nbeams")?,
        ibeam: attrs.int("ibeam")?,
        nbits: attrs.int("nbits")?,
        tstart: attrs.double("tstart")?,
        tsamp: attrs.double("tsamp")?,
        nifs: attrs.int("nifs")?,
        source_name: attrs.string("source_name")?,
        rawdatafile: attrs.string("rawdatafile")?,
        extra: vec![],
    };
    // The dataset shape is the authority; the attributes may be missing.
    if header.nchans == 0 {
        header.nchans = nchans as i32;
    }
    if header.nifs == 0 {
        header.nifs = nifs as i32;
    }
    if header.nbits == 0 {
        header.nbits = 32;
    }
    header.validate()?;
    if header.nchans as usize != nchans || header.nifs as usize != nifs {
        return Err(FilterbankError::ShapeMismatch {
            header_nifs: header.nifs,
            header_nchans: header.nchans,
            nifs,
            nchans,
        });
    }
    debug!(
        "'{}': FBH5 dataset with shape {:?}",
        path.display(),
        (n_ints_in_file, nifs, nchans)
    );

    let bounds = selection.resolve(&header, n_ints_in_file)?;
    let data: Array3<f32> = if bounds.ints.is_empty() {
        Array3::zeros((0, nifs, bounds.chans.len()))
    } else {
        ds.read_slice(s![
            bounds.ints.start..bounds.ints.end,
            ..,
            bounds.chans.start..bounds.chans.end
        ])?
    };

    Ok(Loaded {
        header,
        header_len: None,
        n_ints_in_file,
        bounds,
        data,
    })
}

/// Write an FBH5 file. Unsigned 8- and 16-bit data are stored as unsigned
/// integers; everything else is stored as 32-bit floats. Extra SIGPROC
/// keywords are not carried over.
pub(super) fn write(
    path: &Path,
    header: &FilterbankHeader,
    data: ArrayView3<f32>,
) -> Result<(), FilterbankError> {
    hdf5::silence_errors(true);

    let h5 = hdf5::File::create(path)?;
    write_str_attr(&h5, "CLASS", FBH5_CLASS)?;
    write_str_attr(&h5, "VERSION", FBH5_VERSION)?;

    let mut header = header.clone();
    let signed = header
        .extra
        .iter()
        .any(|(k, v)| k == "signed" && *v == HeaderValue::Byte(1));
    header.extra.clear();
    let ds = match header.nbits {
        8 if !signed => create_dataset(
            &h5,
            data.mapv(|s| s.round().clamp(0.0, 255.0) as u8).view(),
        )?,
        16 => create_dataset(
            &h5,
            data.mapv(|s| s.round().clamp(0.0, u16::MAX as f32) as u16)
                .view(),
        )?,
        _ => {
            header.nbits = 32;
            create_dataset(&h5, data)?
        }
    };

    let labels = DIMENSION_LABELS
        .iter()
        .map(|l| to_h5_str(l))
        .collect::<Result<Vec<_>, _>>()?;
    ds.new_attr::<VarLenUnicode>()
        .shape(labels.len())
        .create("DIMENSION_LABELS")?
        .write_raw(labels.as_slice())?;

    for (name, value) in [
        ("machine_id", header.machine_id),
        ("telescope_id", header.telescope_id),
        ("data_type", header.data_type),
        ("barycentric", header.barycentric),
        ("pulsarcentric", header.pulsarcentric),
        ("nchans", header.nchans),
        ("nbeams", header.nbeams),
        ("ibeam", header.ibeam),
        ("nbits", header.nbits),
        ("nifs", header.nifs),
    ] {
        write_scalar_attr(&ds, name, &value)?;
    }
    for (name, value) in [
        ("src_raj", header.src_raj),
        ("src_dej", header.src_dej),
        ("az_start", header.az_start),
        ("za_start", header.za_start),
        ("fch1", header.fch1),
        ("foff", header.foff),
        ("tstart", header.tstart),
        ("tsamp", header.tsamp),
    ] {
        write_scalar_attr(&ds, name, &value)?;
    }
    write_str_attr(&ds, "source_name", &header.source_name)?;
    write_str_attr(&ds, "rawdatafile", &header.rawdatafile)?;

    debug!("Wrote FBH5 file '{}'", path.display());
    Ok(())
}

/// Create the "data" dataset, extensible in time and chunked by integration.
fn create_dataset<T: H5Type>(
    h5: &hdf5::File,
    data: ArrayView3<T>,
) -> Result<hdf5::Dataset, FilterbankError> {
    let (n_ints, nifs, nchans) = data.dim();
    let ds = h5
        .new_dataset::<T>()
        .chunk((1, nifs, nchans))
        .shape((n_ints.., nifs, nchans))
        .create(FBH5_DATASET)?;
    if n_ints > 0 {
        ds.write(data)?;
    }
    Ok(ds)
}
