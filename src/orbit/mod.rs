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

//! Orbit models and trajectories: anything that can produce a state at an
//! instant, plus pass detection over orbital products.

use crate::cosmic::{Frame, State};
use crate::errors::SiderealError;
use crate::linalg::Vector3;
use crate::math::RootSolver;
use crate::time::{Duration, Epoch, Interval};
use std::fmt;
use std::sync::Arc;

/// Classical orbital elements and anomaly conversions.
pub mod elements;
pub use self::elements::*;

/// The Keplerian orbit model with optional J2 secular drift.
pub mod kepler;
pub use self::kepler::*;

/// The sub-satellite point trajectory.
pub mod nadir;
pub use self::nadir::*;

/// Adapter over the `sgp4` crate.
pub mod sgp4;
pub use self::sgp4::*;

/// Interpolated trajectories over tabulated states.
pub mod tabulated;
pub use self::tabulated::*;

/// Anything that can produce a state at an instant.
pub trait Trajectory: Send + Sync {
    fn state_at(&self, instant: Epoch) -> Result<State, SiderealError>;

    fn states_at(&self, instants: &[Epoch]) -> Result<Vec<State>, SiderealError> {
        instants
            .iter()
            .map(|instant| self.state_at(*instant))
            .collect()
    }
}

/// A fixed position: the trajectory of a ground target expressed in a
/// body-fixed frame.
pub struct StaticTrajectory {
    position: Vector3<f64>,
    frame: Frame,
}

impl StaticTrajectory {
    pub fn new(position: Vector3<f64>, frame: Frame) -> Self {
        Self { position, frame }
    }

    pub fn position(&self) -> &Vector3<f64> {
        &self.position
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }
}

impl Trajectory for StaticTrajectory {
    fn state_at(&self, instant: Epoch) -> Result<State, SiderealError> {
        Ok(State::from_position_velocity(
            instant,
            &self.position,
            &Vector3::zeros(),
            self.frame.clone(),
        ))
    }
}

/// One revolution, delimited by successive ascending-node crossings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pass {
    pub revolution_number: usize,
    pub interval: Interval,
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "pass #{} over {}", self.revolution_number, self.interval)
    }
}

/// An orbit: a trajectory around a central body, with pass bookkeeping.
pub struct Orbit {
    model: Arc<dyn Trajectory>,
}

impl Orbit {
    pub fn new(model: Arc<dyn Trajectory>) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &Arc<dyn Trajectory> {
        &self.model
    }

    /// The passes within `interval`, delimited by ascending-node crossings
    /// (the z coordinate crossing zero upward), located by sampling at
    /// `step` and refining each bracket. Revolution numbers count from one
    /// at the interval start.
    pub fn passes_in(
        &self,
        interval: &Interval,
        step: Duration,
    ) -> Result<Vec<Pass>, SiderealError> {
        let grid = interval.grid(step)?;
        let root_solver = RootSolver::new(100, 1e-6)?;

        let z_at = |instant: Epoch| -> Result<f64, SiderealError> {
            Ok(self.model.state_at(instant)?.position()?[2])
        };

        let mut crossings = Vec::new();
        let mut previous = grid[0];
        let mut previous_z = z_at(previous)?;
        for &instant in grid.iter().skip(1) {
            let z = z_at(instant)?;
            if previous_z < 0.0 && z >= 0.0 {
                let span = (instant - previous).to_seconds();
                let solution = root_solver.solve(
                    |tau| z_at(previous + Duration::from_seconds(tau)),
                    0.0,
                    span,
                )?;
                crossings.push(previous + Duration::from_seconds(solution.root));
            }
            previous = instant;
            previous_z = z;
        }

        let mut passes = Vec::new();
        let mut start = interval.start();
        let mut revolution_number = 1;
        for crossing in crossings {
            passes.push(Pass {
                revolution_number,
                interval: Interval::new(start, crossing)?,
            });
            start = crossing;
            revolution_number += 1;
        }
        passes.push(Pass {
            revolution_number,
            interval: Interval::new(start, interval.end())?,
        });
        Ok(passes)
    }

    /// The revolution number at `instant`, counting from one at
    /// `reference`.
    pub fn revolution_number_at(
        &self,
        instant: Epoch,
        reference: Epoch,
        step: Duration,
    ) -> Result<usize, SiderealError> {
        let interval = Interval::new(reference, instant)?;
        Ok(self.passes_in(&interval, step)?.len())
    }
}

impl Trajectory for Orbit {
    fn state_at(&self, instant: Epoch) -> Result<State, SiderealError> {
        self.model.state_at(instant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cosmic::Earth;

    fn epoch() -> Epoch {
        Epoch::from_gregorian_utc_at_midnight(2023, 1, 1)
    }

    #[test]
    fn static_trajectory_is_static() {
        let trajectory = StaticTrajectory::new(
            Vector3::new(Earth::EQUATORIAL_RADIUS, 0.0, 0.0),
            Earth::body_fixed_frame(),
        );
        let a = trajectory.state_at(epoch()).unwrap();
        let b = trajectory
            .state_at(epoch() + Duration::from_seconds(3_600.0))
            .unwrap();
        assert_eq!(a.position().unwrap(), b.position().unwrap());
        assert_eq!(a.velocity().unwrap().norm(), 0.0);
    }

    #[test]
    fn pass_count_over_a_day() {
        // An inclined LEO completes ~14.9 revolutions per day.
        let elements = KeplerianElements::new(7.0e6, 1e-3, 0.9, 0.0, 0.0, 0.0).unwrap();
        let model = KeplerModel::new(
            elements,
            epoch(),
            Earth::GM,
            Frame::inertial("GCRF"),
            KeplerPerturbation::None,
        )
        .unwrap();
        let orbit = Orbit::new(Arc::new(model));
        let interval = Interval::new(epoch(), epoch() + Duration::from_seconds(86_400.0)).unwrap();
        let passes = orbit
            .passes_in(&interval, Duration::from_seconds(120.0))
            .unwrap();
        assert!(
            (14..=16).contains(&passes.len()),
            "got {} passes",
            passes.len()
        );
        // Contiguity: each pass starts where the previous ended.
        for pair in passes.windows(2) {
            assert_eq!(pair[0].interval.end(), pair[1].interval.start());
            assert_eq!(pair[0].revolution_number + 1, pair[1].revolution_number);
        }
        assert_eq!(
            orbit
                .revolution_number_at(interval.end(), interval.start(), Duration::from_seconds(120.0))
                .unwrap(),
            passes.len()
        );
    }
}
