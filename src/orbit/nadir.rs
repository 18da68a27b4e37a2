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

use super::Trajectory;
use crate::cosmic::{CelestialBody, State};
use crate::errors::SiderealError;
use crate::time::{Duration, Epoch};
use std::fmt;
use std::sync::Arc;

/// The sub-satellite point: the orbit's position projected onto the body's
/// surface along the radial, on a spherical figure of the body.
///
/// The ground-point velocity comes from a central finite difference of the
/// projected position.
pub struct NadirTrajectory {
    orbit: Arc<dyn Trajectory>,
    body: Arc<dyn CelestialBody>,
}

impl NadirTrajectory {
    /// Half-width of the finite-difference stencil.
    const VELOCITY_STEP: f64 = 0.5;

    pub fn new(orbit: Arc<dyn Trajectory>, body: Arc<dyn CelestialBody>) -> Self {
        Self { orbit, body }
    }

    fn ground_position(
        &self,
        instant: Epoch,
    ) -> Result<crate::linalg::Vector3<f64>, SiderealError> {
        let position = self.orbit.state_at(instant)?.position()?;
        let radius = position.norm();
        if radius == 0.0 {
            return Err(SiderealError::Undefined(
                "orbit position at the body center has no nadir".to_string(),
            ));
        }
        Ok(position * (self.body.equatorial_radius() / radius))
    }
}

impl Trajectory for NadirTrajectory {
    fn state_at(&self, instant: Epoch) -> Result<State, SiderealError> {
        let position = self.ground_position(instant)?;
        let step = Duration::from_seconds(Self::VELOCITY_STEP);
        let before = self.ground_position(instant - step)?;
        let after = self.ground_position(instant + step)?;
        let velocity = (after - before) / (2.0 * Self::VELOCITY_STEP);
        let frame = self.orbit.state_at(instant)?.frame().clone();
        Ok(State::from_position_velocity(
            instant, &position, &velocity, frame,
        ))
    }
}

impl fmt::Display for NadirTrajectory {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "nadir trajectory over {}", self.body.name())
    }
}
