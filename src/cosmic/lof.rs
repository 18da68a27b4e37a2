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

use super::frame::RigidTransform;
use crate::errors::SiderealError;
use crate::linalg::{Matrix3, Rotation3, UnitQuaternion, Vector3};
use crate::time::Epoch;
use serde_derive::{Deserialize, Serialize};
use std::fmt;

/// The local orbital frame conventions.
///
/// Each convention builds its axes from the instantaneous position and
/// velocity in the parent frame. The associated angular velocity is
/// `(r × v) / |r|²`, aligned with the orbital momentum axis: exact for
/// two-body motion, an accepted approximation otherwise.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocalOrbitalFrame {
    /// x along velocity, y along orbital momentum.
    Vnc,
    /// x along position, z along orbital momentum.
    Lvlh,
    /// Same triad as LVLH under the radial/along-track/cross-track naming.
    Qsw,
    /// x along velocity, z along orbital momentum.
    Tnw,
    /// North / east / down at the sub-satellite point.
    Ned,
    /// z toward the body, y against the orbital momentum.
    Vvlh,
}

impl LocalOrbitalFrame {
    /// The rotation mapping parent-frame components into this local frame,
    /// built from the position and velocity expressed in the parent frame.
    pub fn rotation_from(
        &self,
        position: &Vector3<f64>,
        velocity: &Vector3<f64>,
    ) -> Result<UnitQuaternion<f64>, SiderealError> {
        let r_mag = position.norm();
        let v_mag = velocity.norm();
        let momentum = position.cross(velocity);
        if r_mag == 0.0 || v_mag == 0.0 || momentum.norm() == 0.0 {
            return Err(SiderealError::InvalidConfiguration(
                "local orbital frame axes are degenerate for colinear or zero position/velocity"
                    .to_string(),
            ));
        }

        let r_hat = position / r_mag;
        let v_hat = velocity / v_mag;
        let h_hat = momentum / momentum.norm();

        let (x, y, z) = match self {
            Self::Vnc => {
                let x = v_hat;
                let y = h_hat;
                (x, y, x.cross(&y))
            }
            Self::Lvlh | Self::Qsw => {
                let x = r_hat;
                let z = h_hat;
                (x, z.cross(&x), z)
            }
            Self::Tnw => {
                let x = v_hat;
                let z = h_hat;
                (x, z.cross(&x), z)
            }
            Self::Ned => {
                // Built at the sub-satellite point; with a spherical body the
                // geodetic and geocentric verticals coincide.
                let down = -r_hat;
                let mut east = Vector3::z_axis().cross(&r_hat);
                if east.norm() < 1e-12 {
                    // Over a pole the east axis is picked from the velocity.
                    east = down.cross(&v_hat);
                }
                let east = east / east.norm();
                let north = east.cross(&down);
                (north, east, down)
            }
            Self::Vvlh => {
                let z = -r_hat;
                let y = -h_hat;
                (y.cross(&z), y, z)
            }
        };

        let dcm = Matrix3::from_rows(&[x.transpose(), y.transpose(), z.transpose()]);
        Ok(UnitQuaternion::from_rotation_matrix(
            &Rotation3::from_matrix_unchecked(dcm),
        ))
    }

    /// The full rigid transform from the parent frame to this local frame,
    /// with the origin at the vehicle.
    pub fn transform_from(
        &self,
        instant: Epoch,
        position: &Vector3<f64>,
        velocity: &Vector3<f64>,
    ) -> Result<RigidTransform, SiderealError> {
        let rotation = self.rotation_from(position, velocity)?;
        let omega_parent = position.cross(velocity) / position.norm_squared();
        Ok(RigidTransform {
            instant,
            translation: -(rotation * position),
            velocity: -(rotation * velocity),
            rotation,
            // Angular velocity of the parent as seen from the local frame.
            angular_velocity: -(rotation * omega_parent),
        })
    }
}

impl fmt::Display for LocalOrbitalFrame {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Self::Vnc => "VNC",
            Self::Lvlh => "LVLH",
            Self::Qsw => "QSW",
            Self::Tnw => "TNW",
            Self::Ned => "NED",
            Self::Vvlh => "VVLH",
        };
        write!(f, "{name}")
    }
}
