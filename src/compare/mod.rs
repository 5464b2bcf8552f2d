// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Code to compare the data of two filterbanks.

mod error;

pub use error::CompareError;

use ndarray::prelude::*;
use rayon::prelude::*;

use crate::filterbank::Filterbank;

/// The result of comparing two filterbanks sample by sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    /// The sum of `comp - obs` over every sample.
    pub delta_sum: f64,
    /// The largest absolute difference between any pair of samples.
    pub max_abs_diff: f64,
    /// The number of samples that aren't equal.
    pub n_differing: usize,
    /// The number of samples compared.
    pub n_samples: usize,
    /// The header fields that differ between the two filterbanks.
    pub header_differences: Vec<&'static str>,
}

impl Comparison {
    /// Differences can cancel each other out; this only checks the sum.
    pub fn is_identical(&self) -> bool {
        self.delta_sum == 0.0
    }
}

impl std::fmt::Display for Comparison {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_identical() {
            write!(f, "Data is the same, delta sum == 0.")
        } else {
            write!(f, "Sum of differences is {}  != 0.", self.delta_sum)
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Partial {
    sum: f64,
    max_abs: f64,
    n_differing: usize,
}

/// Compare the loaded data of two filterbanks. The data must have the same
/// shape.
pub fn compare(obs: &Filterbank, comp: &Filterbank) -> Result<Comparison, CompareError> {
    if obs.data.dim() != comp.data.dim() {
        return Err(CompareError::ShapeMismatch {
            obs: obs.data.dim(),
            comp: comp.data.dim(),
        });
    }

    // Each integration is summed on its own, and the partial sums are
    // combined in order, so the result doesn't depend on the thread count.
    let n_ints = obs.data.len_of(Axis(0));
    let mut partials = vec![Partial::default(); n_ints];
    (0..n_ints)
        .into_par_iter()
        .zip(partials.par_iter_mut())
        .for_each(|(i_int, partial)| {
            let a = obs.data.index_axis(Axis(0), i_int);
            let b = comp.data.index_axis(Axis(0), i_int);
            for (&a, &b) in a.iter().zip(b.iter()) {
                if a != b {
                    let diff = b as f64 - a as f64;
                    partial.sum += diff;
                    partial.max_abs = partial.max_abs.max(diff.abs());
                    partial.n_differing += 1;
                }
            }
        });

    let total = partials
        .into_iter()
        .fold(Partial::default(), |acc, p| Partial {
            sum: acc.sum + p.sum,
            max_abs: acc.max_abs.max(p.max_abs),
            n_differing: acc.n_differing + p.n_differing,
        });

    Ok(Comparison {
        delta_sum: total.sum,
        max_abs_diff: total.max_abs,
        n_differing: total.n_differing,
        n_samples: obs.data.len(),
        header_differences: obs.selected_header().differences(&comp.selected_header()),
    })
}
