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

use crate::errors::SiderealError;
use crate::linalg::{UnitQuaternion, Vector3};
use crate::time::{Duration, Epoch};
use std::fmt;
use std::sync::Arc;

/// A rigid transform mapping coordinates from a frame `A` into a frame `B`.
///
/// Conventions: `rotation` rotates vector components from `A` axes to `B`
/// axes; `translation` is the origin of `A` expressed in `B`; `velocity` is
/// the velocity of that origin in `B`; `angular_velocity` is the angular
/// velocity of `A` with respect to `B`, expressed in `B`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RigidTransform {
    pub instant: Epoch,
    pub translation: Vector3<f64>,
    pub velocity: Vector3<f64>,
    pub rotation: UnitQuaternion<f64>,
    pub angular_velocity: Vector3<f64>,
}

impl RigidTransform {
    pub fn identity(instant: Epoch) -> Self {
        Self {
            instant,
            translation: Vector3::zeros(),
            velocity: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
            angular_velocity: Vector3::zeros(),
        }
    }

    /// A pure rotation with the given frame angular velocity.
    pub fn rotating(
        instant: Epoch,
        rotation: UnitQuaternion<f64>,
        angular_velocity: Vector3<f64>,
    ) -> Self {
        Self {
            instant,
            translation: Vector3::zeros(),
            velocity: Vector3::zeros(),
            rotation,
            angular_velocity,
        }
    }

    /// The transform mapping `B` coordinates back into `A`.
    pub fn inverse(&self) -> Self {
        let q_inv = self.rotation.inverse();
        Self {
            instant: self.instant,
            translation: -(q_inv * self.translation),
            velocity: q_inv * (self.angular_velocity.cross(&self.translation) - self.velocity),
            rotation: q_inv,
            angular_velocity: -(q_inv * self.angular_velocity),
        }
    }

    /// Composition `other ∘ self`: first `self` (A → B), then `other`
    /// (B → C). Both transforms must be taken at the same instant.
    pub fn and_then(&self, other: &RigidTransform) -> Self {
        let rotation = other.rotation * self.rotation;
        Self {
            instant: self.instant,
            translation: other.rotation * self.translation + other.translation,
            velocity: other.rotation * self.velocity
                + other.angular_velocity.cross(&(other.rotation * self.translation))
                + other.velocity,
            rotation,
            angular_velocity: other.rotation * self.angular_velocity + other.angular_velocity,
        }
    }

    /// Maps a position expressed in `A` into `B`.
    pub fn apply_to_position(&self, position: &Vector3<f64>) -> Vector3<f64> {
        self.rotation * position + self.translation
    }

    /// Maps a velocity expressed in `A` into `B`, given the position in `A`.
    pub fn apply_to_velocity(&self, position: &Vector3<f64>, velocity: &Vector3<f64>) -> Vector3<f64> {
        self.rotation * velocity
            + self.angular_velocity.cross(&(self.rotation * position))
            + self.velocity
    }

    /// Maps an acceleration expressed in `A` into `B`, subtracting the
    /// Coriolis and centripetal terms implied by the frame rotation. The
    /// frame angular acceleration is not carried by the transform and is
    /// taken as zero.
    pub fn apply_to_acceleration(
        &self,
        position: &Vector3<f64>,
        velocity: &Vector3<f64>,
        acceleration: &Vector3<f64>,
    ) -> Vector3<f64> {
        let r = self.rotation * position;
        let v = self.rotation * velocity;
        self.rotation * acceleration
            + 2.0 * self.angular_velocity.cross(&v)
            + self
                .angular_velocity
                .cross(&self.angular_velocity.cross(&r))
    }

    /// Rotates a free vector (axes only, no origin terms).
    pub fn rotate(&self, vector: &Vector3<f64>) -> Vector3<f64> {
        self.rotation * vector
    }
}

/// Provides the transform from a frame to the shared inertial root.
pub trait TransformProvider: Send + Sync {
    fn transform_to_root(&self, instant: Epoch) -> RigidTransform;
}

/// A reference frame handle.
///
/// Frames form a star around a single inertial root: a frame either is the
/// root (no provider) or knows its transform to the root at any instant.
/// Handles are cheap to clone and compare by name; building two distinct
/// frames with the same name is a configuration error on the caller's side,
/// mirroring the acyclicity requirement on frame providers.
#[derive(Clone)]
pub struct Frame {
    name: Arc<str>,
    provider: Option<Arc<dyn TransformProvider>>,
}

impl Frame {
    /// The shared inertial root frame with the given name.
    pub fn inertial(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            provider: None,
        }
    }

    /// A frame defined by its transform to the inertial root.
    pub fn from_provider(name: &str, provider: Arc<dyn TransformProvider>) -> Self {
        Self {
            name: Arc::from(name),
            provider: Some(provider),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_inertial_root(&self) -> bool {
        self.provider.is_none()
    }

    /// The rigid transform mapping coordinates in `self` into `target` at
    /// `instant`, composed through the inertial root.
    pub fn transform_to(
        &self,
        target: &Frame,
        instant: Epoch,
    ) -> Result<RigidTransform, SiderealError> {
        if self == target {
            return Ok(RigidTransform::identity(instant));
        }
        let to_root = match &self.provider {
            Some(provider) => provider.transform_to_root(instant),
            None => RigidTransform::identity(instant),
        };
        let target_to_root = match &target.provider {
            Some(provider) => provider.transform_to_root(instant),
            None => return Ok(to_root),
        };
        Ok(to_root.and_then(&target_to_root.inverse()))
    }
}

impl PartialEq for Frame {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Frame({})", self.name)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Uniform rotation about the +Z axis of the root frame, the usual model for
/// a body-fixed frame with a constant spin rate.
pub struct RotatingFrameProvider {
    reference_epoch: Epoch,
    reference_angle_rad: f64,
    rotation_rate_rad_s: f64,
}

impl RotatingFrameProvider {
    pub fn new(reference_epoch: Epoch, reference_angle_rad: f64, rotation_rate_rad_s: f64) -> Self {
        Self {
            reference_epoch,
            reference_angle_rad,
            rotation_rate_rad_s,
        }
    }
}

impl TransformProvider for RotatingFrameProvider {
    fn transform_to_root(&self, instant: Epoch) -> RigidTransform {
        let elapsed: Duration = instant - self.reference_epoch;
        let angle = self.reference_angle_rad + self.rotation_rate_rad_s * elapsed.to_seconds();
        let rotation = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), angle);
        RigidTransform::rotating(
            instant,
            rotation,
            Vector3::new(0.0, 0.0, self.rotation_rate_rad_s),
        )
    }
}
