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

use super::guidance::GuidanceLaw;
use super::Dynamics;
use crate::cosmic::{CoordinateSubset, Frame};
use crate::errors::SiderealError;
use crate::linalg::{DVector, Vector3};
use crate::time::Epoch;
use crate::utils::STANDARD_GRAVITY;
use serde_derive::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A constant-thrust, constant-Isp propulsion system.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropulsionSystem {
    thrust_n: f64,
    specific_impulse_s: f64,
}

impl PropulsionSystem {
    pub fn new(thrust_n: f64, specific_impulse_s: f64) -> Result<Self, SiderealError> {
        if thrust_n <= 0.0 || specific_impulse_s <= 0.0 {
            return Err(SiderealError::InvalidConfiguration(format!(
                "thrust and specific impulse must be strictly positive, got {thrust_n} N and {specific_impulse_s} s"
            )));
        }
        Ok(Self {
            thrust_n,
            specific_impulse_s,
        })
    }

    pub fn thrust(&self) -> f64 {
        self.thrust_n
    }

    pub fn specific_impulse(&self) -> f64 {
        self.specific_impulse_s
    }

    /// Mass flow at full throttle, kg/s.
    pub fn mass_flow_rate(&self) -> f64 {
        self.thrust_n / (self.specific_impulse_s * STANDARD_GRAVITY)
    }

    /// Maximum thrust acceleration at the given wet mass, m/s^2.
    pub fn max_acceleration(&self, mass_kg: f64) -> f64 {
        self.thrust_n / mass_kg
    }
}

/// A thruster firing along a guidance law.
///
/// Reads position, velocity, and mass; writes the velocity rate and the mass
/// rate. The guidance law is queried with the acceleration ceiling
/// `thrust / mass`; throttling below the ceiling consumes propellant
/// proportionally. The mass coordinate has no upper bound; the only guard is
/// the dry-mass floor.
pub struct Thruster {
    propulsion: PropulsionSystem,
    dry_mass_kg: f64,
    guidance: Arc<dyn GuidanceLaw>,
    /// Full-throttle mass flow, derived once at construction.
    mass_flow_rate: f64,
}

impl Thruster {
    pub fn new(
        propulsion: PropulsionSystem,
        dry_mass_kg: f64,
        guidance: Arc<dyn GuidanceLaw>,
    ) -> Result<Self, SiderealError> {
        if dry_mass_kg <= 0.0 {
            return Err(SiderealError::InvalidConfiguration(format!(
                "dry mass must be strictly positive, got {dry_mass_kg} kg"
            )));
        }
        let mass_flow_rate = propulsion.mass_flow_rate();
        Ok(Self {
            propulsion,
            dry_mass_kg,
            guidance,
            mass_flow_rate,
        })
    }

    pub fn propulsion(&self) -> &PropulsionSystem {
        &self.propulsion
    }

    pub fn dry_mass(&self) -> f64 {
        self.dry_mass_kg
    }

    pub fn guidance(&self) -> &Arc<dyn GuidanceLaw> {
        &self.guidance
    }
}

impl Dynamics for Thruster {
    fn name(&self) -> &str {
        "Thruster"
    }

    fn read_subsets(&self) -> Vec<CoordinateSubset> {
        vec![
            CoordinateSubset::CartesianPosition,
            CoordinateSubset::CartesianVelocity,
            CoordinateSubset::Mass,
        ]
    }

    fn write_subsets(&self) -> Vec<CoordinateSubset> {
        vec![CoordinateSubset::CartesianVelocity, CoordinateSubset::Mass]
    }

    fn compute_contribution(
        &self,
        instant: Epoch,
        x: &DVector<f64>,
        frame: &Frame,
    ) -> Result<DVector<f64>, SiderealError> {
        let position = Vector3::new(x[0], x[1], x[2]);
        let velocity = Vector3::new(x[3], x[4], x[5]);
        let mass = x[6];

        if mass <= self.dry_mass_kg {
            return Err(SiderealError::OutOfPropellant(format!(
                "mass {mass} kg at or below dry mass {} kg at {instant}",
                self.dry_mass_kg
            )));
        }

        let max_acceleration = self.propulsion.max_acceleration(mass);
        let acceleration = self.guidance.thrust_acceleration(
            instant,
            &position,
            &velocity,
            max_acceleration,
            frame,
        )?;

        let throttle = acceleration.norm() / max_acceleration;
        let mut contribution = DVector::zeros(4);
        contribution.rows_mut(0, 3).copy_from(&acceleration);
        contribution[3] = -throttle * self.mass_flow_rate;
        Ok(contribution)
    }
}

impl fmt::Display for Thruster {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} ({:.3} N / {:.0} s, {})",
            self.name(),
            self.propulsion.thrust(),
            self.propulsion.specific_impulse(),
            self.guidance.name()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cosmic::LocalOrbitalFrame;
    use crate::dynamics::guidance::ConstantThrust;
    use approx::assert_relative_eq;

    fn thruster() -> Thruster {
        let propulsion = PropulsionSystem::new(1.0e-3, 1_500.0).unwrap();
        let guidance = Arc::new(ConstantThrust::along_velocity(LocalOrbitalFrame::Vnc));
        Thruster::new(propulsion, 90.0, guidance).unwrap()
    }

    fn state_vector(mass: f64) -> DVector<f64> {
        DVector::from_vec(vec![7.0e6, 0.0, 0.0, 0.0, 7.5e3, 0.0, mass])
    }

    #[test]
    fn full_throttle_mass_flow() {
        let thruster = thruster();
        let contribution = thruster
            .compute_contribution(
                Epoch::from_gregorian_utc_at_midnight(2023, 1, 1),
                &state_vector(100.0),
                &Frame::inertial("GCRF"),
            )
            .unwrap();
        let acceleration = Vector3::new(contribution[0], contribution[1], contribution[2]);
        assert_relative_eq!(acceleration.norm(), 1.0e-3 / 100.0, max_relative = 1e-12);
        assert_relative_eq!(
            contribution[3],
            -1.0e-3 / (1_500.0 * STANDARD_GRAVITY),
            max_relative = 1e-12
        );
    }

    #[test]
    fn dry_tank_stops_the_burn() {
        let thruster = thruster();
        assert!(matches!(
            thruster.compute_contribution(
                Epoch::from_gregorian_utc_at_midnight(2023, 1, 1),
                &state_vector(90.0),
                &Frame::inertial("GCRF"),
            ),
            Err(SiderealError::OutOfPropellant(_))
        ));
    }
}
