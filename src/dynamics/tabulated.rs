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

use super::Dynamics;
use crate::cosmic::{CoordinateSubset, Frame};
use crate::errors::SiderealError;
use crate::linalg::{DMatrix, DVector};
use crate::math::{BarycentricRationalInterpolator, Interpolator};
use crate::time::Epoch;
use std::fmt;

/// A contribution profile sampled at known instants, interpolated per column
/// by a barycentric rational scheme.
///
/// The profile is expressed in the frame it was built with, and no implicit
/// reframing is attempted: calling it under any other integration frame is a
/// `WrongFrame` error.
pub struct Tabulated {
    instants: Vec<Epoch>,
    profile: DMatrix<f64>,
    write_subsets: Vec<CoordinateSubset>,
    frame: Frame,
    interpolators: Vec<BarycentricRationalInterpolator>,
}

impl Tabulated {
    pub fn new(
        instants: Vec<Epoch>,
        profile: DMatrix<f64>,
        write_subsets: Vec<CoordinateSubset>,
        frame: Frame,
    ) -> Result<Self, SiderealError> {
        if instants.len() != profile.nrows() {
            return Err(SiderealError::InvalidConfiguration(format!(
                "{} instants for a profile of {} rows",
                instants.len(),
                profile.nrows()
            )));
        }
        let write_size: usize = write_subsets.iter().map(CoordinateSubset::len).sum();
        if write_size != profile.ncols() {
            return Err(SiderealError::InvalidConfiguration(format!(
                "write subsets span {} coordinates for a profile of {} columns",
                write_size,
                profile.ncols()
            )));
        }

        let timestamps: Vec<f64> = instants
            .iter()
            .map(|instant| (*instant - instants[0]).to_seconds())
            .collect();
        let mut interpolators = Vec::with_capacity(profile.ncols());
        for column in 0..profile.ncols() {
            let values: Vec<f64> = profile.column(column).iter().copied().collect();
            interpolators.push(BarycentricRationalInterpolator::new(
                timestamps.clone(),
                values,
            )?);
        }

        Ok(Self {
            instants,
            profile,
            write_subsets,
            frame,
            interpolators,
        })
    }

    pub fn instants(&self) -> &[Epoch] {
        &self.instants
    }

    pub fn profile(&self) -> &DMatrix<f64> {
        &self.profile
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }
}

impl Dynamics for Tabulated {
    fn name(&self) -> &str {
        "Tabulated"
    }

    fn read_subsets(&self) -> Vec<CoordinateSubset> {
        Vec::new()
    }

    fn write_subsets(&self) -> Vec<CoordinateSubset> {
        self.write_subsets.clone()
    }

    fn compute_contribution(
        &self,
        instant: Epoch,
        _x: &DVector<f64>,
        frame: &Frame,
    ) -> Result<DVector<f64>, SiderealError> {
        if frame != &self.frame {
            return Err(SiderealError::WrongFrame(format!(
                "tabulated profile built in {} evaluated under {frame}",
                self.frame
            )));
        }

        let elapsed = (instant - self.instants[0]).to_seconds();
        let mut contribution = DVector::zeros(self.interpolators.len());
        for (i, interpolator) in self.interpolators.iter().enumerate() {
            contribution[i] = interpolator.evaluate(elapsed)?;
        }
        Ok(contribution)
    }
}

impl fmt::Display for Tabulated {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} ({} samples over {})",
            self.name(),
            self.instants.len(),
            *self.instants.last().unwrap() - self.instants[0]
        )
    }
}
