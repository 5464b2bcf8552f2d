// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with comparing filterbank data.

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CompareError {
    #[error("Can't compare data with shape {obs:?} against data with shape {comp:?}")]
    ShapeMismatch {
        obs: (usize, usize, usize),
        comp: (usize, usize, usize),
    },
}
