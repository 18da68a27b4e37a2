/*
    Sidereal, a spacecraft mission design toolkit
    Copyright (C) 2023 Sidereal Contributors

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

use crate::linalg::DVector;
use serde_derive::{Deserialize, Serialize};

/// How the embedded error estimate is condensed into the scalar the step
/// controller compares against one.
///
/// Each component error is scaled by `abs_tol + rel_tol * |x|`, taking the
/// larger of the pre- and post-step magnitudes, so a unit value sits exactly
/// on the tolerance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorControl {
    /// Largest scaled component error. The conservative choice.
    ScaledMaximum,
    /// Root-mean-square of the scaled component errors.
    ScaledRss,
}

impl ErrorControl {
    pub fn estimate(
        &self,
        error: &DVector<f64>,
        candidate: &DVector<f64>,
        current: &DVector<f64>,
        abs_tol: f64,
        rel_tol: f64,
    ) -> f64 {
        match self {
            Self::ScaledMaximum => {
                let mut worst: f64 = 0.0;
                for i in 0..error.len() {
                    let scale = abs_tol + rel_tol * candidate[i].abs().max(current[i].abs());
                    worst = worst.max(error[i].abs() / scale);
                }
                worst
            }
            Self::ScaledRss => {
                let mut sum = 0.0;
                for i in 0..error.len() {
                    let scale = abs_tol + rel_tol * candidate[i].abs().max(current[i].abs());
                    let scaled = error[i] / scale;
                    sum += scaled * scaled;
                }
                (sum / error.len() as f64).sqrt()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maximum_dominates_rss() {
        let error = DVector::from_vec(vec![1e-9, 1e-12, 1e-12]);
        let x = DVector::from_vec(vec![1.0, 1.0, 1.0]);
        let max = ErrorControl::ScaledMaximum.estimate(&error, &x, &x, 1e-12, 1e-9);
        let rss = ErrorControl::ScaledRss.estimate(&error, &x, &x, 1e-12, 1e-9);
        assert!(max >= rss);
    }

    #[test]
    fn on_tolerance_error_is_unity() {
        let error = DVector::from_vec(vec![1e-9]);
        let x = DVector::from_vec(vec![0.0]);
        let estimate = ErrorControl::ScaledMaximum.estimate(&error, &x, &x, 1e-9, 0.0);
        assert!((estimate - 1.0).abs() < 1e-12);
    }
}
