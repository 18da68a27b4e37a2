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
use crate::cosmic::{Frame, State};
use crate::errors::SiderealError;
use crate::linalg::Vector3;
use crate::time::Epoch;
use std::fmt;

/// Adapter over the `sgp4` crate: a TLE-derived orbit model.
///
/// TLE parsing and the SGP4/SDP4 math live in the `sgp4` crate; this model
/// only glues its predictions into states. SGP4 predictions are expressed in
/// the TEME frame; the caller names the frame handle those coordinates are
/// carried under, and any reconciliation to a stricter inertial frame is a
/// frame-provider concern.
pub struct Sgp4Model {
    constants: sgp4::Constants,
    epoch: Epoch,
    frame: Frame,
}

impl Sgp4Model {
    /// Builds the model from parsed elements. The epoch must match the
    /// element set's epoch; it anchors the minutes-since-epoch clock.
    pub fn from_elements(
        elements: &sgp4::Elements,
        epoch: Epoch,
        frame: Frame,
    ) -> Result<Self, SiderealError> {
        let constants = sgp4::Constants::from_elements(elements).map_err(|error| {
            SiderealError::InvalidConfiguration(format!("rejected element set: {error:?}"))
        })?;
        Ok(Self {
            constants,
            epoch,
            frame,
        })
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }
}

impl Trajectory for Sgp4Model {
    fn state_at(&self, instant: Epoch) -> Result<State, SiderealError> {
        let minutes = (instant - self.epoch).to_seconds() / 60.0;
        let prediction = self.constants.propagate(minutes).map_err(|error| {
            SiderealError::Diverged(format!("SGP4 failed {minutes} min from epoch: {error:?}"))
        })?;

        // The sgp4 crate works in kilometers.
        let position = 1.0e3
            * Vector3::new(
                prediction.position[0],
                prediction.position[1],
                prediction.position[2],
            );
        let velocity = 1.0e3
            * Vector3::new(
                prediction.velocity[0],
                prediction.velocity[1],
                prediction.velocity[2],
            );
        Ok(State::from_position_velocity(
            instant,
            &position,
            &velocity,
            self.frame.clone(),
        ))
    }
}

impl fmt::Display for Sgp4Model {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "SGP4 model anchored at {}", self.epoch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::Duration;

    fn iss_model() -> Sgp4Model {
        let elements = sgp4::Elements::from_tle(
            Some("ISS (ZARYA)".to_owned()),
            "1 25544U 98067A   20194.88612269 -.00002218  00000-0 -31515-4 0  9992".as_bytes(),
            "2 25544  51.6461 221.2784 0001413  89.1723 280.4612 15.49507896236008".as_bytes(),
        )
        .unwrap();
        // 2020-07-12, day fraction .88612269.
        let epoch = Epoch::from_gregorian_utc_at_midnight(2020, 7, 12)
            + Duration::from_seconds(0.886_122_69 * 86_400.0);
        Sgp4Model::from_elements(&elements, epoch, Frame::inertial("TEME")).unwrap()
    }

    #[test]
    fn iss_altitude_and_speed_are_leo() {
        let model = iss_model();
        let state = model
            .state_at(model.epoch() + Duration::from_seconds(3_600.0))
            .unwrap();
        let altitude = state.position().unwrap().norm() - 6.378e6;
        assert!(
            (3.0e5..5.0e5).contains(&altitude),
            "ISS altitude {altitude} m"
        );
        let speed = state.velocity().unwrap().norm();
        assert!((7.4e3..7.9e3).contains(&speed), "ISS speed {speed} m/s");
    }

    #[test]
    fn period_matches_the_mean_motion() {
        let model = iss_model();
        // 15.495 revs/day from the TLE.
        let period = 86_400.0 / 15.495_078_96;
        let a = model.state_at(model.epoch()).unwrap();
        let b = model
            .state_at(model.epoch() + Duration::from_seconds(period))
            .unwrap();
        let gap = (a.position().unwrap() - b.position().unwrap()).norm();
        // Within tens of kilometers of closing the revolution.
        assert!(gap < 1.0e5, "gap after one revolution: {gap} m");
    }
}
