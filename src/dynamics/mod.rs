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

use crate::cosmic::{CoordinateSubset, Frame};
use crate::errors::SiderealError;
use crate::linalg::DVector;
use crate::time::Epoch;
use std::fmt;

/// The gravity module holds the central-body and third-body contributors.
pub mod gravity;
pub use self::gravity::*;

/// Atmospheric drag.
pub mod drag;
pub use self::drag::*;

/// Time-tagged tabulated contributions.
pub mod tabulated;
pub use self::tabulated::*;

/// The thruster contributor and the propulsion system model.
pub mod thruster;
pub use self::thruster::*;

/// Guidance laws queried by the thruster.
pub mod guidance;

/// A contributor to the time derivative of the state.
///
/// A dynamics declares the coordinate subsets it reads and the subsets it
/// writes rates for; the propagator gathers the reads into a contiguous
/// input, calls `compute_contribution`, and scatter-adds the output onto the
/// global derivative. Implementations are pure: two calls with identical
/// arguments return identical outputs, and any internal state is limited to
/// scalars derived once at construction.
pub trait Dynamics: Send + Sync + fmt::Display {
    fn name(&self) -> &str;

    /// The subsets gathered into `x`, in order.
    fn read_subsets(&self) -> Vec<CoordinateSubset>;

    /// The subsets whose rates this dynamics produces, in order.
    fn write_subsets(&self) -> Vec<CoordinateSubset>;

    /// The rates of the write subsets, stacked in declaration order, given
    /// the read subsets stacked in declaration order. `frame` is the
    /// integration frame the coordinates are expressed in.
    fn compute_contribution(
        &self,
        instant: Epoch,
        x: &DVector<f64>,
        frame: &Frame,
    ) -> Result<DVector<f64>, SiderealError>;
}

/// Writes the position rate from the velocity: the kinematic half of every
/// translational propagation.
#[derive(Clone, Debug, Default)]
pub struct PositionDerivative;

impl PositionDerivative {
    pub fn new() -> Self {
        Self
    }
}

impl Dynamics for PositionDerivative {
    fn name(&self) -> &str {
        "Position Derivative"
    }

    fn read_subsets(&self) -> Vec<CoordinateSubset> {
        vec![CoordinateSubset::CartesianVelocity]
    }

    fn write_subsets(&self) -> Vec<CoordinateSubset> {
        vec![CoordinateSubset::CartesianPosition]
    }

    fn compute_contribution(
        &self,
        _instant: Epoch,
        x: &DVector<f64>,
        _frame: &Frame,
    ) -> Result<DVector<f64>, SiderealError> {
        Ok(x.clone())
    }
}

impl fmt::Display for PositionDerivative {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_derivative_echoes_velocity() {
        let dynamics = PositionDerivative::new();
        let x = DVector::from_vec(vec![1.0, -2.0, 3.0]);
        let contribution = dynamics
            .compute_contribution(
                Epoch::from_gregorian_utc_at_midnight(2023, 1, 1),
                &x,
                &Frame::inertial("GCRF"),
            )
            .unwrap();
        assert_eq!(contribution, x);
        assert_eq!(
            dynamics
                .write_subsets()
                .iter()
                .map(CoordinateSubset::len)
                .sum::<usize>(),
            contribution.len()
        );
    }
}
