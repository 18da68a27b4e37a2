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

use super::broker::CoordinateBroker;
use super::frame::Frame;
use crate::errors::SiderealError;
use crate::linalg::{DVector, UnitQuaternion, Vector3, Vector4};
use crate::time::Epoch;
use nalgebra::Quaternion;
use std::fmt;

/// A named, fixed-size slice of a flat coordinate vector.
///
/// Identity is `(name, size)`. The built-in geometric subsets know how to
/// transform themselves between frames; scalar and custom subsets are
/// invariant under frame changes. The attitude quaternion maps body-axis
/// components into frame-axis components and is stored as `[x, y, z, w]`;
/// the angular velocity is that of the body with respect to the frame,
/// expressed in body axes.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CoordinateSubset {
    CartesianPosition,
    /// Depends on the position for its frame transformation.
    CartesianVelocity,
    /// Depends on the position and velocity for its frame transformation.
    CartesianAcceleration,
    AttitudeQuaternion,
    /// Depends on the attitude for its frame transformation.
    AngularVelocity,
    Mass,
    SurfaceArea,
    DragCoefficient,
    MassFlowRate,
    BallisticCoefficient,
    /// An arbitrary tabulated channel, invariant under frame changes.
    Custom { name: String, size: usize },
}

impl CoordinateSubset {
    /// A custom channel. The name and a non-zero size form its identity.
    pub fn custom(name: &str, size: usize) -> Result<Self, SiderealError> {
        if name.is_empty() || size == 0 {
            return Err(SiderealError::InvalidConfiguration(format!(
                "a custom subset needs a name and a non-zero size, got ({name:?}, {size})"
            )));
        }
        Ok(Self::Custom {
            name: name.to_string(),
            size,
        })
    }

    pub fn name(&self) -> &str {
        match self {
            Self::CartesianPosition => "CARTESIAN_POSITION",
            Self::CartesianVelocity => "CARTESIAN_VELOCITY",
            Self::CartesianAcceleration => "CARTESIAN_ACCELERATION",
            Self::AttitudeQuaternion => "ATTITUDE_QUATERNION",
            Self::AngularVelocity => "ANGULAR_VELOCITY",
            Self::Mass => "MASS",
            Self::SurfaceArea => "SURFACE_AREA",
            Self::DragCoefficient => "DRAG_COEFFICIENT",
            Self::MassFlowRate => "MASS_FLOW_RATE",
            Self::BallisticCoefficient => "BALLISTIC_COEFFICIENT",
            Self::Custom { name, .. } => name,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::CartesianPosition
            | Self::CartesianVelocity
            | Self::CartesianAcceleration
            | Self::AngularVelocity => 3,
            Self::AttitudeQuaternion => 4,
            Self::Mass
            | Self::SurfaceArea
            | Self::DragCoefficient
            | Self::MassFlowRate
            | Self::BallisticCoefficient => 1,
            Self::Custom { size, .. } => *size,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Elementwise sum of this subset extracted from both full vectors.
    pub fn add(
        &self,
        _instant: Epoch,
        coordinates: &DVector<f64>,
        other_coordinates: &DVector<f64>,
        _frame: &Frame,
        broker: &CoordinateBroker,
    ) -> Result<DVector<f64>, SiderealError> {
        Ok(broker.extract(coordinates, self)? + broker.extract(other_coordinates, self)?)
    }

    /// Elementwise difference of this subset extracted from both full
    /// vectors.
    pub fn subtract(
        &self,
        _instant: Epoch,
        coordinates: &DVector<f64>,
        other_coordinates: &DVector<f64>,
        _frame: &Frame,
        broker: &CoordinateBroker,
    ) -> Result<DVector<f64>, SiderealError> {
        Ok(broker.extract(coordinates, self)? - broker.extract(other_coordinates, self)?)
    }

    /// Expresses this subset of the full vector in another frame.
    ///
    /// The full vector and broker are handed over so composite subsets can
    /// locate their dependencies (velocity needs the position, the angular
    /// velocity needs the attitude).
    pub fn in_frame(
        &self,
        instant: Epoch,
        coordinates: &DVector<f64>,
        from: &Frame,
        to: &Frame,
        broker: &CoordinateBroker,
    ) -> Result<DVector<f64>, SiderealError> {
        let own = broker.extract(coordinates, self)?;
        if from == to {
            return Ok(own);
        }
        let transform = from.transform_to(to, instant)?;

        match self {
            Self::CartesianPosition => {
                let r = Vector3::new(own[0], own[1], own[2]);
                Ok(DVector::from_column_slice(
                    transform.apply_to_position(&r).as_slice(),
                ))
            }
            Self::CartesianVelocity => {
                let position =
                    broker.extract(coordinates, &Self::CartesianPosition)?;
                let r = Vector3::new(position[0], position[1], position[2]);
                let v = Vector3::new(own[0], own[1], own[2]);
                Ok(DVector::from_column_slice(
                    transform.apply_to_velocity(&r, &v).as_slice(),
                ))
            }
            Self::CartesianAcceleration => {
                let position =
                    broker.extract(coordinates, &Self::CartesianPosition)?;
                let velocity =
                    broker.extract(coordinates, &Self::CartesianVelocity)?;
                let r = Vector3::new(position[0], position[1], position[2]);
                let v = Vector3::new(velocity[0], velocity[1], velocity[2]);
                let a = Vector3::new(own[0], own[1], own[2]);
                Ok(DVector::from_column_slice(
                    transform.apply_to_acceleration(&r, &v, &a).as_slice(),
                ))
            }
            Self::AttitudeQuaternion => {
                let q = UnitQuaternion::from_quaternion(Quaternion::new(
                    own[3], own[0], own[1], own[2],
                ));
                let rotated = transform.rotation * q;
                // Keep the sign continuous against the incoming sample so
                // downstream interpolation does not see a hemisphere flip.
                let mut out = Vector4::new(
                    rotated.coords[0],
                    rotated.coords[1],
                    rotated.coords[2],
                    rotated.coords[3],
                );
                let incoming = Vector4::new(own[0], own[1], own[2], own[3]);
                if out.dot(&incoming) < 0.0 {
                    out = -out;
                }
                Ok(DVector::from_column_slice(out.as_slice()))
            }
            Self::AngularVelocity => {
                let attitude =
                    broker.extract(coordinates, &Self::AttitudeQuaternion)?;
                let q = UnitQuaternion::from_quaternion(Quaternion::new(
                    attitude[3],
                    attitude[0],
                    attitude[1],
                    attitude[2],
                ));
                let omega = Vector3::new(own[0], own[1], own[2]);
                // The frame angular velocity, brought into body axes through
                // the original frame.
                let frame_rate =
                    q.inverse() * (transform.rotation.inverse() * transform.angular_velocity);
                Ok(DVector::from_column_slice((omega + frame_rate).as_slice()))
            }
            Self::Mass
            | Self::SurfaceArea
            | Self::DragCoefficient
            | Self::MassFlowRate
            | Self::BallisticCoefficient
            | Self::Custom { .. } => Ok(own),
        }
    }
}

impl fmt::Display for CoordinateSubset {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} [{}]", self.name(), self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cosmic::frame::RotatingFrameProvider;
    use approx::assert_abs_diff_eq;
    use std::sync::Arc;

    fn pos_vel_broker() -> CoordinateBroker {
        CoordinateBroker::from_subsets(vec![
            CoordinateSubset::CartesianPosition,
            CoordinateSubset::CartesianVelocity,
            CoordinateSubset::Mass,
        ])
    }

    fn epoch() -> Epoch {
        Epoch::from_gregorian_utc_at_midnight(2023, 1, 1)
    }

    #[test]
    fn add_and_subtract_are_inverses() {
        let broker = pos_vel_broker();
        let frame = Frame::inertial("GCRF");
        let x = DVector::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        let y = DVector::from_vec(vec![0.5, 0.5, 0.5, -1.0, -1.0, -1.0, 1.0]);
        for subset in broker.subsets() {
            let sum = subset.add(epoch(), &x, &y, &frame, &broker).unwrap();
            let diff = subset.subtract(epoch(), &x, &y, &frame, &broker).unwrap();
            let anti = subset.subtract(epoch(), &y, &x, &frame, &broker).unwrap();
            assert_eq!(sum.len(), subset.len());
            assert_abs_diff_eq!((&diff + &anti).norm(), 0.0, epsilon = 1e-15);
        }
    }

    #[test]
    fn scalar_subset_is_frame_invariant() {
        let broker = pos_vel_broker();
        let gcrf = Frame::inertial("GCRF");
        let fixed = Frame::from_provider(
            "ITRF",
            Arc::new(RotatingFrameProvider::new(epoch(), 0.0, 7.29e-5)),
        );
        let x = DVector::from_vec(vec![7.0e6, 0.0, 0.0, 0.0, 7.5e3, 0.0, 450.0]);
        let mass = CoordinateSubset::Mass
            .in_frame(epoch(), &x, &gcrf, &fixed, &broker)
            .unwrap();
        assert_eq!(mass[0], 450.0);
    }

    #[test]
    fn position_velocity_round_trip() {
        let broker = pos_vel_broker();
        let gcrf = Frame::inertial("GCRF");
        let fixed = Frame::from_provider(
            "ITRF",
            Arc::new(RotatingFrameProvider::new(epoch(), 0.4, 7.29e-5)),
        );
        let x = DVector::from_vec(vec![7.0e6, -2.0e5, 1.0e4, 10.0, 7.5e3, -5.0, 450.0]);

        let r_fixed = CoordinateSubset::CartesianPosition
            .in_frame(epoch(), &x, &gcrf, &fixed, &broker)
            .unwrap();
        let v_fixed = CoordinateSubset::CartesianVelocity
            .in_frame(epoch(), &x, &gcrf, &fixed, &broker)
            .unwrap();

        let mut x_fixed = x.clone();
        x_fixed.rows_mut(0, 3).copy_from(&r_fixed);
        x_fixed.rows_mut(3, 3).copy_from(&v_fixed);

        let r_back = CoordinateSubset::CartesianPosition
            .in_frame(epoch(), &x_fixed, &fixed, &gcrf, &broker)
            .unwrap();
        let v_back = CoordinateSubset::CartesianVelocity
            .in_frame(epoch(), &x_fixed, &fixed, &gcrf, &broker)
            .unwrap();
        assert_abs_diff_eq!((&r_back - x.rows(0, 3)).norm(), 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!((&v_back - x.rows(3, 3)).norm(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn quaternion_reframing_preserves_norm() {
        let broker = CoordinateBroker::from_subsets(vec![
            CoordinateSubset::AttitudeQuaternion,
            CoordinateSubset::AngularVelocity,
        ]);
        let gcrf = Frame::inertial("GCRF");
        let fixed = Frame::from_provider(
            "ITRF",
            Arc::new(RotatingFrameProvider::new(epoch(), 1.2, 7.29e-5)),
        );
        let half = 0.5f64.sqrt();
        let x = DVector::from_vec(vec![half, 0.0, 0.0, half, 0.01, -0.02, 0.03]);
        let q = CoordinateSubset::AttitudeQuaternion
            .in_frame(epoch(), &x, &gcrf, &fixed, &broker)
            .unwrap();
        let norm = (q[0] * q[0] + q[1] * q[1] + q[2] * q[2] + q[3] * q[3]).sqrt();
        assert_abs_diff_eq!(norm, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn custom_subset_identity() {
        let channel = CoordinateSubset::custom("BATTERY_CHARGE", 2).unwrap();
        assert_eq!(channel.len(), 2);
        assert_eq!(channel.name(), "BATTERY_CHARGE");
        assert!(CoordinateSubset::custom("", 2).is_err());
        assert!(CoordinateSubset::custom("X", 0).is_err());
    }
}
