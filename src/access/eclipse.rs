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

use super::TemporalConditionSolver;
use crate::cosmic::CelestialBody;
use crate::errors::SiderealError;
use crate::linalg::Vector3;
use crate::orbit::Trajectory;
use crate::time::{Epoch, Interval};
use std::fmt;
use std::sync::Arc;

/// How deep into shadow an observer sits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EclipsePhase {
    /// The occulted body is fully visible.
    None,
    /// Partially hidden.
    Penumbra,
    /// Fully hidden.
    Umbra,
}

/// Generates the intervals an orbiting observer spends in the shadow an
/// occulting body casts against an occulted one, by the apparent-disk
/// overlap test: the angular radii of both bodies against their angular
/// separation as seen by the observer.
pub struct EclipseGenerator {
    occulting: Arc<dyn CelestialBody>,
    occulted: Arc<dyn CelestialBody>,
    solver: TemporalConditionSolver,
}

impl EclipseGenerator {
    pub fn new(
        occulting: Arc<dyn CelestialBody>,
        occulted: Arc<dyn CelestialBody>,
        solver: TemporalConditionSolver,
    ) -> Result<Self, SiderealError> {
        if occulting.name() == occulted.name() {
            return Err(SiderealError::InvalidConfiguration(format!(
                "{} cannot occult itself",
                occulting.name()
            )));
        }
        Ok(Self {
            occulting,
            occulted,
            solver,
        })
    }

    /// The eclipse phase seen from a position in the inertial root frame.
    pub fn phase_at(&self, position: &Vector3<f64>, instant: Epoch) -> EclipsePhase {
        let to_occulted = self.occulted.position_at(instant) - position;
        let to_occulting = self.occulting.position_at(instant) - position;
        let occulted_distance = to_occulted.norm();
        let occulting_distance = to_occulting.norm();

        if occulting_distance <= self.occulting.equatorial_radius() {
            // Inside the occulting body counts as its deepest shadow.
            return EclipsePhase::Umbra;
        }
        // The shadow falls away from the light: no eclipse on the lit side.
        if occulting_distance >= occulted_distance {
            return EclipsePhase::None;
        }

        let occulted_radius =
            (self.occulted.equatorial_radius() / occulted_distance).clamp(-1.0, 1.0);
        let occulting_radius =
            (self.occulting.equatorial_radius() / occulting_distance).clamp(-1.0, 1.0);
        let alpha_occulted = occulted_radius.asin();
        let alpha_occulting = occulting_radius.asin();
        let separation = (to_occulted.dot(&to_occulting)
            / (occulted_distance * occulting_distance))
            .clamp(-1.0, 1.0)
            .acos();

        if alpha_occulting > alpha_occulted && separation < alpha_occulting - alpha_occulted {
            EclipsePhase::Umbra
        } else if separation < alpha_occulting + alpha_occulted {
            EclipsePhase::Penumbra
        } else {
            EclipsePhase::None
        }
    }

    /// The umbra intervals of `trajectory` over `interval`.
    pub fn umbra_intervals(
        &self,
        trajectory: &dyn Trajectory,
        interval: &Interval,
    ) -> Result<Vec<Interval>, SiderealError> {
        self.intervals_in_phase(trajectory, interval, EclipsePhase::Umbra)
    }

    /// The intervals with any shadowing at all (penumbra or umbra).
    pub fn eclipse_intervals(
        &self,
        trajectory: &dyn Trajectory,
        interval: &Interval,
    ) -> Result<Vec<Interval>, SiderealError> {
        let predicate = |instant: Epoch| -> Result<bool, SiderealError> {
            let position = trajectory.state_at(instant)?.position()?;
            Ok(self.phase_at(&position, instant) != EclipsePhase::None)
        };
        self.solver.solve(predicate, interval)
    }

    fn intervals_in_phase(
        &self,
        trajectory: &dyn Trajectory,
        interval: &Interval,
        phase: EclipsePhase,
    ) -> Result<Vec<Interval>, SiderealError> {
        let predicate = |instant: Epoch| -> Result<bool, SiderealError> {
            let position = trajectory.state_at(instant)?.position()?;
            Ok(self.phase_at(&position, instant) == phase)
        };
        self.solver.solve(predicate, interval)
    }
}

impl fmt::Display for EclipseGenerator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "eclipse of {} by {}",
            self.occulted.name(),
            self.occulting.name()
        )
    }
}
