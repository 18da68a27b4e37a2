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

/// Cannonball atmospheric drag.
///
/// The drag force acts against the velocity relative to the co-rotating
/// atmosphere: the central-body rotation is subtracted from the inertial
/// velocity before the dynamic pressure is formed. Do not use for high
/// fidelity lifetime work; the density model is whatever the body provides.
pub struct AtmosphericDrag {
    body: Arc<dyn CelestialBody>,
}

impl AtmosphericDrag {
    pub fn new(body: Arc<dyn CelestialBody>) -> Self {
        Self { body }
    }

    pub fn body(&self) -> &Arc<dyn CelestialBody> {
        &self.body
    }
}

impl Dynamics for AtmosphericDrag {
    fn name(&self) -> &str {
        "Atmospheric Drag"
    }

    fn read_subsets(&self) -> Vec<CoordinateSubset> {
        vec![
            CoordinateSubset::CartesianPosition,
            CoordinateSubset::CartesianVelocity,
            CoordinateSubset::Mass,
            CoordinateSubset::SurfaceArea,
            CoordinateSubset::DragCoefficient,
        ]
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
        let velocity = Vector3::new(x[3], x[4], x[5]);
        let mass = x[6];
        let surface_area = x[7];
        let drag_coefficient = x[8];

        let density = self.body.atmospheric_density_at(&position, instant)?;
        let relative_velocity = velocity - self.body.angular_velocity().cross(&position);
        let acceleration = -0.5 * density * drag_coefficient * surface_area / mass
            * relative_velocity.norm()
            * relative_velocity;
        Ok(DVector::from_column_slice(acceleration.as_slice()))
    }
}

impl fmt::Display for AtmosphericDrag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.body.name())
    }
}
