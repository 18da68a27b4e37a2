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
use crate::cosmic::{CelestialBody, CoordinateSubset, Frame};
use crate::errors::SiderealError;
use crate::linalg::{DVector, Vector3};
use crate::time::Epoch;
use std::fmt;
use std::sync::Arc;

/// Gravitational acceleration of the central body, evaluated at the vehicle
/// position in the integration frame.
pub struct CentralBodyGravity {
    body: Arc<dyn CelestialBody>,
}

impl CentralBodyGravity {
    pub fn new(body: Arc<dyn CelestialBody>) -> Self {
        Self { body }
    }

    pub fn body(&self) -> &Arc<dyn CelestialBody> {
        &self.body
    }
}

impl Dynamics for CentralBodyGravity {
    fn name(&self) -> &str {
        "Central Body Gravity"
    }

    fn read_subsets(&self) -> Vec<CoordinateSubset> {
        vec![CoordinateSubset::CartesianPosition]
    }

    fn write_subsets(&self) -> Vec<CoordinateSubset> {
        vec![CoordinateSubset::CartesianVelocity]
    }

    fn compute_contribution(
        &self,
        instant: Epoch,
        x: &DVector<f64>,
        _frame: &Frame,
    ) -> Result<DVector<f64>, SiderealError> {
        let position = Vector3::new(x[0], x[1], x[2]);
        let acceleration = self.body.gravitational_field_at(&position, instant);
        Ok(DVector::from_column_slice(acceleration.as_slice()))
    }
}

impl fmt::Display for CentralBodyGravity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.body.name())
    }
}

/// Differential gravitational acceleration of a perturbing body:
/// `g(r_body, r) - g(r_body, 0)`, so the contribution vanishes at the origin
/// of the integration frame instead of blowing up there.
pub struct ThirdBodyGravity {
    body: Arc<dyn CelestialBody>,
}

impl ThirdBodyGravity {
    /// Fails when handed the body at the center of the integration frame:
    /// its direct term is the central-body contribution, and the
    /// differential form is singular there.
    pub fn new(body: Arc<dyn CelestialBody>) -> Result<Self, SiderealError> {
        if body.name() == "Earth" {
            return Err(SiderealError::InvalidConfiguration(
                "the central body cannot be a third-body perturber".to_string(),
            ));
        }
        Ok(Self { body })
    }

    pub fn body(&self) -> &Arc<dyn CelestialBody> {
        &self.body
    }
}

impl Dynamics for ThirdBodyGravity {
    fn name(&self) -> &str {
        "Third Body Gravity"
    }

    fn read_subsets(&self) -> Vec<CoordinateSubset> {
        vec![CoordinateSubset::CartesianPosition]
    }

    fn write_subsets(&self) -> Vec<CoordinateSubset> {
        vec![CoordinateSubset::CartesianVelocity]
    }

    fn compute_contribution(
        &self,
        instant: Epoch,
        x: &DVector<f64>,
        _frame: &Frame,
    ) -> Result<DVector<f64>, SiderealError> {
        let position = Vector3::new(x[0], x[1], x[2]);
        let body_position = self.body.position_at(instant);

        // Vehicle and frame origin as seen from the perturbing body.
        let from_body = position - body_position;
        let acceleration = self.body.gravitational_field_at(&from_body, instant)
            - self.body.gravitational_field_at(&-body_position, instant);
        Ok(DVector::from_column_slice(acceleration.as_slice()))
    }
}

impl fmt::Display for ThirdBodyGravity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.body.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cosmic::{Earth, Moon, Sun};
    use approx::assert_relative_eq;

    fn epoch() -> Epoch {
        Epoch::from_gregorian_utc_at_midnight(2023, 1, 1)
    }

    #[test]
    fn central_body_pulls_inward() {
        let gravity = CentralBodyGravity::new(Arc::new(Earth::new()));
        let x = DVector::from_vec(vec![7.0e6, 0.0, 0.0]);
        let contribution = gravity
            .compute_contribution(epoch(), &x, &Frame::inertial("GCRF"))
            .unwrap();
        assert_relative_eq!(contribution[0], -Earth::GM / 49.0e12, max_relative = 1e-12);
        assert_eq!(contribution[1], 0.0);
    }

    #[test]
    fn third_body_rejects_the_central_body() {
        assert!(ThirdBodyGravity::new(Arc::new(Earth::new())).is_err());
        assert!(ThirdBodyGravity::new(Arc::new(Moon)).is_ok());
    }

    #[test]
    fn third_body_contribution_vanishes_at_the_origin() {
        let gravity = ThirdBodyGravity::new(Arc::new(Sun)).unwrap();
        let at_origin = gravity
            .compute_contribution(epoch(), &DVector::zeros(3), &Frame::inertial("GCRF"))
            .unwrap();
        assert_relative_eq!(at_origin.norm(), 0.0, epsilon = 1e-20);

        // At LEO distances the solar tidal term is of order 1e-7 m/s^2.
        let leo = DVector::from_vec(vec![7.0e6, 0.0, 0.0]);
        let at_leo = gravity
            .compute_contribution(epoch(), &leo, &Frame::inertial("GCRF"))
            .unwrap();
        assert!(at_leo.norm() > 1e-9 && at_leo.norm() < 1e-5);
    }
}
