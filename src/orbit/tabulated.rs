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
use crate::cosmic::State;
use crate::errors::SiderealError;
use crate::linalg::DVector;
use crate::math::{
    BarycentricRationalInterpolator, CubicSplineInterpolator, Interpolator, LinearInterpolator,
};
use crate::time::Epoch;
use serde_derive::{Deserialize, Serialize};
use std::fmt;

/// Interpolation scheme of a tabulated trajectory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterpolationKind {
    Linear,
    CubicSpline,
    BarycentricRational,
}

/// A trajectory over time-tagged states, interpolated coordinate by
/// coordinate inside a window around the query instant.
///
/// All states must share one frame and broker and be sorted by instant.
/// Queries outside the tabulated span are `Undefined`.
pub struct TabulatedTrajectory {
    states: Vec<State>,
    interpolation: InterpolationKind,
    timestamps: Vec<f64>,
}

impl TabulatedTrajectory {
    /// Samples on each side of the query instant fed to the interpolator.
    const WINDOW_HALF_WIDTH: usize = 4;

    pub fn new(
        states: Vec<State>,
        interpolation: InterpolationKind,
    ) -> Result<Self, SiderealError> {
        if states.len() < 2 {
            return Err(SiderealError::InvalidConfiguration(
                "a tabulated trajectory needs at least two states".to_string(),
            ));
        }
        if states.windows(2).any(|pair| {
            pair[0].frame() != pair[1].frame()
                || pair[0].broker().as_ref() != pair[1].broker().as_ref()
        }) {
            return Err(SiderealError::InvalidConfiguration(
                "tabulated states must share one frame and coordinate layout".to_string(),
            ));
        }
        if states
            .windows(2)
            .any(|pair| pair[1].instant() <= pair[0].instant())
        {
            return Err(SiderealError::InvalidConfiguration(
                "tabulated states must be strictly increasing in time".to_string(),
            ));
        }
        let reference = states[0].instant();
        let timestamps = states
            .iter()
            .map(|state| (state.instant() - reference).to_seconds())
            .collect();
        Ok(Self {
            states,
            interpolation,
            timestamps,
        })
    }

    pub fn first(&self) -> &State {
        &self.states[0]
    }

    pub fn last(&self) -> &State {
        &self.states[self.states.len() - 1]
    }

    fn window(&self, t: f64) -> (usize, usize) {
        let idx = match self
            .timestamps
            .binary_search_by(|probe| probe.partial_cmp(&t).unwrap())
        {
            Ok(idx) | Err(idx) => idx,
        };
        let first = idx.saturating_sub(Self::WINDOW_HALF_WIDTH);
        let last = (idx + Self::WINDOW_HALF_WIDTH).min(self.states.len());
        (first, last)
    }
}

impl Trajectory for TabulatedTrajectory {
    fn state_at(&self, instant: Epoch) -> Result<State, SiderealError> {
        if instant < self.first().instant() || instant > self.last().instant() {
            return Err(SiderealError::Undefined(format!(
                "instant {instant} outside of the tabulated span [{} .. {}]",
                self.first().instant(),
                self.last().instant()
            )));
        }
        // Exact hits skip interpolation.
        let t = (instant - self.first().instant()).to_seconds();
        if let Ok(idx) = self
            .timestamps
            .binary_search_by(|probe| probe.partial_cmp(&t).unwrap())
        {
            return Ok(self.states[idx].clone());
        }

        let (first, last) = self.window(t);
        let xs: Vec<f64> = self.timestamps[first..last].to_vec();
        let n_coordinates = self.states[0].len();
        let mut coordinates = DVector::zeros(n_coordinates);
        for i in 0..n_coordinates {
            let ys: Vec<f64> = self.states[first..last]
                .iter()
                .map(|state| state.coordinates()[i])
                .collect();
            let value = match self.interpolation {
                InterpolationKind::Linear => {
                    LinearInterpolator::new(xs.clone(), ys)?.evaluate(t)?
                }
                InterpolationKind::CubicSpline => {
                    CubicSplineInterpolator::new(xs.clone(), ys)?.evaluate(t)?
                }
                InterpolationKind::BarycentricRational => {
                    BarycentricRationalInterpolator::new(xs.clone(), ys)?.evaluate(t)?
                }
            };
            coordinates[i] = value;
        }
        State::new(
            instant,
            coordinates,
            self.states[0].frame().clone(),
            self.states[0].broker().clone(),
        )
    }
}

impl fmt::Display for TabulatedTrajectory {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "tabulated trajectory ({} states, {:?} interpolation)",
            self.states.len(),
            self.interpolation
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cosmic::{Earth, Frame};
    use crate::linalg::Vector3;
    use crate::orbit::{KeplerModel, KeplerPerturbation, KeplerianElements};
    use crate::time::Duration;
    use approx::assert_relative_eq;

    fn epoch() -> Epoch {
        Epoch::from_gregorian_utc_at_midnight(2023, 1, 1)
    }

    fn sampled_orbit() -> (KeplerModel, TabulatedTrajectory) {
        let model = KeplerModel::new(
            KeplerianElements::new(7.0e6, 0.001, 0.9, 0.0, 0.0, 0.0).unwrap(),
            epoch(),
            Earth::GM,
            Frame::inertial("GCRF"),
            KeplerPerturbation::None,
        )
        .unwrap();
        let states: Vec<State> = (0..60)
            .map(|i| {
                model
                    .state_at(epoch() + Duration::from_seconds(i as f64 * 30.0))
                    .unwrap()
            })
            .collect();
        let trajectory =
            TabulatedTrajectory::new(states, InterpolationKind::BarycentricRational).unwrap();
        (model, trajectory)
    }

    #[test]
    fn interpolation_tracks_the_source_orbit() {
        let (model, trajectory) = sampled_orbit();
        for offset in [45.0, 312.5, 1_000.1] {
            let instant = epoch() + Duration::from_seconds(offset);
            let interpolated = trajectory.state_at(instant).unwrap();
            let truth = model.state_at(instant).unwrap();
            let gap: Vector3<f64> =
                interpolated.position().unwrap() - truth.position().unwrap();
            assert_relative_eq!(gap.norm() / 7.0e6, 0.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn exact_sample_hits_are_returned_verbatim() {
        let (_, trajectory) = sampled_orbit();
        let instant = epoch() + Duration::from_seconds(300.0);
        let state = trajectory.state_at(instant).unwrap();
        assert_eq!(&state, &trajectory.states[10]);
    }

    #[test]
    fn outside_the_span_is_undefined() {
        let (_, trajectory) = sampled_orbit();
        assert!(matches!(
            trajectory.state_at(epoch() - Duration::from_seconds(1.0)),
            Err(SiderealError::Undefined(_))
        ));
    }
}
