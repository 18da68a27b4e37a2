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

use crate::cosmic::{Frame, LocalOrbitalFrame};
use crate::errors::SiderealError;
use crate::linalg::Vector3;
use crate::time::{Epoch, Interval};
use std::fmt;
use std::sync::Arc;

/// Closed-loop Lyapunov guidance toward target orbital elements.
pub mod qlaw;
pub use self::qlaw::QLaw;

/// Maps the instantaneous state to a thrust-acceleration vector.
///
/// The returned vector never exceeds `max_acceleration` in norm; a zero
/// vector coasts. Position, velocity, and the output are all expressed in
/// `frame`.
pub trait GuidanceLaw: Send + Sync {
    fn name(&self) -> &str;

    fn thrust_acceleration(
        &self,
        instant: Epoch,
        position: &Vector3<f64>,
        velocity: &Vector3<f64>,
        max_acceleration: f64,
        frame: &Frame,
    ) -> Result<Vector3<f64>, SiderealError>;
}

/// Full thrust along a fixed direction of a local orbital frame.
///
/// The local frame is rebuilt from the instantaneous position and velocity
/// at every call, so "along track" stays along track as the orbit turns.
#[derive(Clone, Debug)]
pub struct ConstantThrust {
    direction: Vector3<f64>,
    local_frame: LocalOrbitalFrame,
}

impl ConstantThrust {
    pub fn new(
        direction: Vector3<f64>,
        local_frame: LocalOrbitalFrame,
    ) -> Result<Self, SiderealError> {
        let norm = direction.norm();
        if !(norm.is_finite() && norm > 0.0) {
            return Err(SiderealError::InvalidConfiguration(
                "constant-thrust direction must be a non-zero finite vector".to_string(),
            ));
        }
        Ok(Self {
            direction: direction / norm,
            local_frame,
        })
    }

    /// Thrust along the local +X axis: the velocity direction for VNC and
    /// TNW conventions.
    pub fn along_velocity(local_frame: LocalOrbitalFrame) -> Self {
        Self {
            direction: Vector3::x(),
            local_frame,
        }
    }

    pub fn direction(&self) -> &Vector3<f64> {
        &self.direction
    }

    pub fn local_frame(&self) -> LocalOrbitalFrame {
        self.local_frame
    }
}

impl GuidanceLaw for ConstantThrust {
    fn name(&self) -> &str {
        "Constant Thrust"
    }

    fn thrust_acceleration(
        &self,
        _instant: Epoch,
        position: &Vector3<f64>,
        velocity: &Vector3<f64>,
        max_acceleration: f64,
        _frame: &Frame,
    ) -> Result<Vector3<f64>, SiderealError> {
        let rotation = self.local_frame.rotation_from(position, velocity)?;
        Ok(rotation.inverse() * (self.direction * max_acceleration))
    }
}

impl fmt::Display for ConstantThrust {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} along {:?} of {}",
            self.name(),
            self.direction.as_slice(),
            self.local_frame
        )
    }
}

/// A list of `(law, interval)` pairs with disjoint intervals: the active
/// law's output is returned, and the vehicle coasts outside every interval.
pub struct SequentialGuidance {
    laws: Vec<(Arc<dyn GuidanceLaw>, Interval)>,
}

impl SequentialGuidance {
    pub fn new(laws: Vec<(Arc<dyn GuidanceLaw>, Interval)>) -> Result<Self, SiderealError> {
        for (i, (_, a)) in laws.iter().enumerate() {
            for (_, b) in laws.iter().skip(i + 1) {
                if a.start() <= b.end() && b.start() <= a.end() {
                    return Err(SiderealError::InvalidConfiguration(format!(
                        "guidance intervals {a} and {b} overlap"
                    )));
                }
            }
        }
        Ok(Self { laws })
    }

    fn active_law(&self, instant: Epoch) -> Option<&Arc<dyn GuidanceLaw>> {
        self.laws
            .iter()
            .find(|(_, interval)| interval.contains(instant))
            .map(|(law, _)| law)
    }
}

impl GuidanceLaw for SequentialGuidance {
    fn name(&self) -> &str {
        "Sequential Guidance"
    }

    fn thrust_acceleration(
        &self,
        instant: Epoch,
        position: &Vector3<f64>,
        velocity: &Vector3<f64>,
        max_acceleration: f64,
        frame: &Frame,
    ) -> Result<Vector3<f64>, SiderealError> {
        match self.active_law(instant) {
            Some(law) => {
                law.thrust_acceleration(instant, position, velocity, max_acceleration, frame)
            }
            None => Ok(Vector3::zeros()),
        }
    }
}
