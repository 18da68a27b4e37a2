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

use super::frame::{Frame, RotatingFrameProvider};
use crate::errors::SiderealError;
use crate::linalg::Vector3;
use crate::time::{Duration, Epoch};
use std::f64::consts::TAU;
use std::fmt;
use std::sync::Arc;

/// The celestial-body collaborator consumed by the dynamics.
///
/// Positions are expressed in the shared inertial root frame. High-fidelity
/// ephemerides and gravity fields plug in behind this trait; the reference
/// bodies below are analytic stand-ins good enough for mission design.
pub trait CelestialBody: Send + Sync {
    fn name(&self) -> &str;

    /// Gravitational parameter, m^3/s^2.
    fn gravitational_parameter(&self) -> f64;

    /// Equatorial radius, m.
    fn equatorial_radius(&self) -> f64;

    fn flattening(&self) -> f64 {
        0.0
    }

    /// Position of the body center in the inertial root frame, m.
    fn position_at(&self, instant: Epoch) -> Vector3<f64>;

    /// Gravitational acceleration at a body-centered position, m/s^2.
    fn gravitational_field_at(&self, position: &Vector3<f64>, _instant: Epoch) -> Vector3<f64> {
        let r = position.norm();
        -self.gravitational_parameter() / (r * r * r) * position
    }

    /// Atmospheric density at a body-centered position, kg/m^3. Bodies
    /// without an atmosphere model report `Undefined`.
    fn atmospheric_density_at(
        &self,
        _position: &Vector3<f64>,
        _instant: Epoch,
    ) -> Result<f64, SiderealError> {
        Err(SiderealError::Undefined(format!(
            "{} has no atmosphere model",
            self.name()
        )))
    }

    /// Rotation rate of the body-fixed frame, rad/s, in the inertial root.
    fn angular_velocity(&self) -> Vector3<f64> {
        Vector3::zeros()
    }
}

impl fmt::Display for dyn CelestialBody {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Single-scale-height exponential atmosphere,
/// `rho(h) = rho_ref * exp(-(h - h_ref) / H)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExponentialAtmosphere {
    pub reference_altitude_m: f64,
    pub reference_density_kg_m3: f64,
    pub scale_height_m: f64,
}

impl ExponentialAtmosphere {
    pub fn density_at_altitude(&self, altitude_m: f64) -> f64 {
        self.reference_density_kg_m3
            * (-(altitude_m - self.reference_altitude_m) / self.scale_height_m).exp()
    }
}

/// The Earth: WGS84 shape, IAU rotation rate, optional exponential
/// atmosphere.
pub struct Earth {
    atmosphere: Option<ExponentialAtmosphere>,
}

impl Earth {
    pub const GM: f64 = 3.986_004_418e14;
    pub const EQUATORIAL_RADIUS: f64 = 6_378_137.0;
    pub const FLATTENING: f64 = 1.0 / 298.257_223_563;
    pub const ROTATION_RATE: f64 = 7.292_115_146_706_4e-5;
    /// J2 zonal harmonic coefficient.
    pub const J2: f64 = 1.082_626_68e-3;

    pub fn new() -> Self {
        Self { atmosphere: None }
    }

    pub fn with_atmosphere(atmosphere: ExponentialAtmosphere) -> Self {
        Self {
            atmosphere: Some(atmosphere),
        }
    }

    /// The Earth-fixed frame, rotating about +Z of the inertial root at the
    /// IAU rate, aligned with the root at the J2000 epoch.
    pub fn body_fixed_frame() -> Frame {
        Frame::from_provider(
            "ITRF",
            Arc::new(RotatingFrameProvider::new(
                Epoch::from_gregorian_utc(2000, 1, 1, 12, 0, 0, 0),
                0.0,
                Self::ROTATION_RATE,
            )),
        )
    }
}

impl Default for Earth {
    fn default() -> Self {
        Self::new()
    }
}

impl CelestialBody for Earth {
    fn name(&self) -> &str {
        "Earth"
    }

    fn gravitational_parameter(&self) -> f64 {
        Self::GM
    }

    fn equatorial_radius(&self) -> f64 {
        Self::EQUATORIAL_RADIUS
    }

    fn flattening(&self) -> f64 {
        Self::FLATTENING
    }

    fn position_at(&self, _instant: Epoch) -> Vector3<f64> {
        // The inertial root is Earth-centered.
        Vector3::zeros()
    }

    fn atmospheric_density_at(
        &self,
        position: &Vector3<f64>,
        _instant: Epoch,
    ) -> Result<f64, SiderealError> {
        let atmosphere = self.atmosphere.as_ref().ok_or_else(|| {
            SiderealError::Undefined("Earth built without an atmosphere model".to_string())
        })?;
        let altitude = position.norm() - Self::EQUATORIAL_RADIUS;
        Ok(atmosphere.density_at_altitude(altitude))
    }

    fn angular_velocity(&self) -> Vector3<f64> {
        Vector3::new(0.0, 0.0, Self::ROTATION_RATE)
    }
}

/// The Sun on a circular ecliptic orbit around the Earth-centered root: an
/// analytic stand-in accurate to the solar-geometry level needed by eclipse
/// and illumination work.
pub struct Sun;

impl Sun {
    pub const GM: f64 = 1.327_124_400_41e20;
    pub const EQUATORIAL_RADIUS: f64 = 6.957e8;
    pub const ASTRONOMICAL_UNIT: f64 = 1.495_978_707e11;
    /// Mean obliquity of the ecliptic at J2000, rad.
    const OBLIQUITY: f64 = 0.409_092_804_2;
    /// Mean ecliptic longitude at the J2000 epoch, rad.
    const LONGITUDE_AT_J2000: f64 = 4.895_063_1;

    fn ecliptic_longitude_at(instant: Epoch) -> f64 {
        let elapsed: Duration = instant - Epoch::from_gregorian_utc(2000, 1, 1, 12, 0, 0, 0);
        Self::LONGITUDE_AT_J2000 + TAU * elapsed.to_seconds() / (365.25 * 86_400.0)
    }
}

impl CelestialBody for Sun {
    fn name(&self) -> &str {
        "Sun"
    }

    fn gravitational_parameter(&self) -> f64 {
        Self::GM
    }

    fn equatorial_radius(&self) -> f64 {
        Self::EQUATORIAL_RADIUS
    }

    fn position_at(&self, instant: Epoch) -> Vector3<f64> {
        let lambda = Self::ecliptic_longitude_at(instant);
        let (sin_l, cos_l) = lambda.sin_cos();
        let (sin_e, cos_e) = Self::OBLIQUITY.sin_cos();
        Self::ASTRONOMICAL_UNIT * Vector3::new(cos_l, sin_l * cos_e, sin_l * sin_e)
    }
}

/// The Moon on a circular inclined orbit: an analytic stand-in for
/// third-body perturbation work.
pub struct Moon;

impl Moon {
    pub const GM: f64 = 4.902_800_066e12;
    pub const EQUATORIAL_RADIUS: f64 = 1.737_4e6;
    pub const SEMI_MAJOR_AXIS: f64 = 3.844e8;
    /// Inclination of the lunar orbit to the equator, rad (mean value).
    const INCLINATION: f64 = 0.402;
    const LONGITUDE_AT_J2000: f64 = 3.84;
    const SIDEREAL_PERIOD_S: f64 = 27.321_661 * 86_400.0;
}

impl CelestialBody for Moon {
    fn name(&self) -> &str {
        "Moon"
    }

    fn gravitational_parameter(&self) -> f64 {
        Self::GM
    }

    fn equatorial_radius(&self) -> f64 {
        Self::EQUATORIAL_RADIUS
    }

    fn position_at(&self, instant: Epoch) -> Vector3<f64> {
        let elapsed: Duration = instant - Epoch::from_gregorian_utc(2000, 1, 1, 12, 0, 0, 0);
        let anomaly =
            Self::LONGITUDE_AT_J2000 + TAU * elapsed.to_seconds() / Self::SIDEREAL_PERIOD_S;
        let (sin_u, cos_u) = anomaly.sin_cos();
        let (sin_i, cos_i) = Self::INCLINATION.sin_cos();
        Self::SEMI_MAJOR_AXIS * Vector3::new(cos_u, sin_u * cos_i, sin_u * sin_i)
    }
}
