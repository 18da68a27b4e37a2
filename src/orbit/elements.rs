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
use crate::linalg::Vector3;
use crate::utils::wrap_to_two_pi;
use serde_derive::{Deserialize, Serialize};
use std::f64::consts::TAU;
use std::fmt;

/// The classical orbital elements addressable by conditions and models.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrbitalElement {
    SemiMajorAxis,
    Eccentricity,
    Inclination,
    Raan,
    Aop,
    TrueAnomaly,
    MeanAnomaly,
    EccentricAnomaly,
}

impl OrbitalElement {
    /// Whether the element is an angle (wrapped arithmetic) rather than a
    /// plain real.
    pub fn is_angular(&self) -> bool {
        !matches!(self, Self::SemiMajorAxis | Self::Eccentricity)
    }
}

impl fmt::Display for OrbitalElement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Self::SemiMajorAxis => "semi-major axis",
            Self::Eccentricity => "eccentricity",
            Self::Inclination => "inclination",
            Self::Raan => "RAAN",
            Self::Aop => "argument of periapsis",
            Self::TrueAnomaly => "true anomaly",
            Self::MeanAnomaly => "mean anomaly",
            Self::EccentricAnomaly => "eccentric anomaly",
        };
        write!(f, "{name}")
    }
}

/// Elliptic classical orbital elements `(a, e, i, Ω, ω, ν)`, angles in
/// radians, lengths in meters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KeplerianElements {
    sma: f64,
    ecc: f64,
    inc: f64,
    raan: f64,
    aop: f64,
    true_anomaly: f64,
}

impl KeplerianElements {
    /// Threshold under which an orbit is treated as circular or equatorial
    /// when converting from Cartesian coordinates.
    const SINGULARITY_TOLERANCE: f64 = 1e-11;

    pub fn new(
        sma: f64,
        ecc: f64,
        inc: f64,
        raan: f64,
        aop: f64,
        true_anomaly: f64,
    ) -> Result<Self, SiderealError> {
        if sma <= 0.0 || !(0.0..1.0).contains(&ecc) {
            return Err(SiderealError::InvalidConfiguration(format!(
                "only elliptic orbits are representable, got a = {sma} m, e = {ecc}"
            )));
        }
        Ok(Self {
            sma,
            ecc,
            inc: wrap_to_two_pi(inc),
            raan: wrap_to_two_pi(raan),
            aop: wrap_to_two_pi(aop),
            true_anomaly: wrap_to_two_pi(true_anomaly),
        })
    }

    pub fn sma(&self) -> f64 {
        self.sma
    }

    pub fn ecc(&self) -> f64 {
        self.ecc
    }

    pub fn inc(&self) -> f64 {
        self.inc
    }

    pub fn raan(&self) -> f64 {
        self.raan
    }

    pub fn aop(&self) -> f64 {
        self.aop
    }

    pub fn true_anomaly(&self) -> f64 {
        self.true_anomaly
    }

    pub fn semi_latus_rectum(&self) -> f64 {
        self.sma * (1.0 - self.ecc * self.ecc)
    }

    pub fn periapsis_radius(&self) -> f64 {
        self.sma * (1.0 - self.ecc)
    }

    pub fn apoapsis_radius(&self) -> f64 {
        self.sma * (1.0 + self.ecc)
    }

    pub fn mean_motion(&self, mu: f64) -> f64 {
        (mu / (self.sma * self.sma * self.sma)).sqrt()
    }

    pub fn period(&self, mu: f64) -> f64 {
        TAU / self.mean_motion(mu)
    }

    pub fn eccentric_anomaly(&self) -> f64 {
        let (sin_nu, cos_nu) = self.true_anomaly.sin_cos();
        let denom = 1.0 + self.ecc * cos_nu;
        wrap_to_two_pi(((1.0 - self.ecc * self.ecc).sqrt() * sin_nu / denom)
            .atan2((self.ecc + cos_nu) / denom))
    }

    pub fn mean_anomaly(&self) -> f64 {
        let ecc_anomaly = self.eccentric_anomaly();
        wrap_to_two_pi(ecc_anomaly - self.ecc * ecc_anomaly.sin())
    }

    /// The value of one element.
    pub fn element(&self, element: OrbitalElement) -> f64 {
        match element {
            OrbitalElement::SemiMajorAxis => self.sma,
            OrbitalElement::Eccentricity => self.ecc,
            OrbitalElement::Inclination => self.inc,
            OrbitalElement::Raan => self.raan,
            OrbitalElement::Aop => self.aop,
            OrbitalElement::TrueAnomaly => self.true_anomaly,
            OrbitalElement::MeanAnomaly => self.mean_anomaly(),
            OrbitalElement::EccentricAnomaly => self.eccentric_anomaly(),
        }
    }

    /// These elements with the true anomaly replaced so that the mean
    /// anomaly equals `mean_anomaly`, by a Newton solve of Kepler's
    /// equation.
    pub fn at_mean_anomaly(&self, mean_anomaly: f64) -> Result<Self, SiderealError> {
        const MAX_ITERATIONS: usize = 50;
        const TOLERANCE: f64 = 1e-13;

        let mean_anomaly = wrap_to_two_pi(mean_anomaly);
        let mut ecc_anomaly = if self.ecc < 0.8 {
            mean_anomaly
        } else {
            std::f64::consts::PI
        };
        let mut converged = false;
        for _ in 0..MAX_ITERATIONS {
            let delta = (ecc_anomaly - self.ecc * ecc_anomaly.sin() - mean_anomaly)
                / (1.0 - self.ecc * ecc_anomaly.cos());
            ecc_anomaly -= delta;
            if delta.abs() < TOLERANCE {
                converged = true;
                break;
            }
        }
        if !converged {
            return Err(SiderealError::NonConvergent(format!(
                "Kepler's equation stalled at M = {mean_anomaly}, e = {}",
                self.ecc
            )));
        }

        let (sin_e, cos_e) = ecc_anomaly.sin_cos();
        let beta = (1.0 - self.ecc * self.ecc).sqrt();
        let true_anomaly = (beta * sin_e).atan2(cos_e - self.ecc);
        Self::new(
            self.sma,
            self.ecc,
            self.inc,
            self.raan,
            self.aop,
            true_anomaly,
        )
    }

    /// Osculating elements from a body-centered inertial position and
    /// velocity.
    pub fn from_cartesian(
        position: &Vector3<f64>,
        velocity: &Vector3<f64>,
        mu: f64,
    ) -> Result<Self, SiderealError> {
        let r_mag = position.norm();
        let v_mag = velocity.norm();
        if r_mag == 0.0 {
            return Err(SiderealError::InvalidConfiguration(
                "cannot derive elements at the frame origin".to_string(),
            ));
        }

        let momentum = position.cross(velocity);
        let node = Vector3::z().cross(&momentum);
        let ecc_vector =
            ((v_mag * v_mag - mu / r_mag) * position - position.dot(velocity) * velocity) / mu;
        let ecc = ecc_vector.norm();

        let energy = v_mag * v_mag / 2.0 - mu / r_mag;
        if energy >= 0.0 {
            return Err(SiderealError::InvalidConfiguration(format!(
                "orbit is not elliptic (specific energy {energy} J/kg)"
            )));
        }
        let sma = -mu / (2.0 * energy);
        let inc = (momentum[2] / momentum.norm()).clamp(-1.0, 1.0).acos();

        let equatorial = node.norm() < Self::SINGULARITY_TOLERANCE;
        let circular = ecc < Self::SINGULARITY_TOLERANCE;

        let raan = if equatorial {
            0.0
        } else {
            let mut raan = (node[0] / node.norm()).clamp(-1.0, 1.0).acos();
            if node[1] < 0.0 {
                raan = TAU - raan;
            }
            raan
        };

        let aop = if circular {
            0.0
        } else if equatorial {
            // True longitude of periapsis carried as the AOP.
            let mut aop = (ecc_vector[0] / ecc).clamp(-1.0, 1.0).acos();
            if ecc_vector[1] < 0.0 {
                aop = TAU - aop;
            }
            aop
        } else {
            let mut aop = (node.dot(&ecc_vector) / (node.norm() * ecc))
                .clamp(-1.0, 1.0)
                .acos();
            if ecc_vector[2] < 0.0 {
                aop = TAU - aop;
            }
            aop
        };

        let true_anomaly = if circular {
            // Argument of latitude (or true longitude when equatorial).
            let reference = if equatorial { Vector3::x() } else { node / node.norm() };
            let mut nu = (reference.dot(position) / r_mag).clamp(-1.0, 1.0).acos();
            // Flip when the position sits behind the reference axis along the
            // direction of motion.
            if position.dot(&momentum.cross(&reference)) < 0.0 {
                nu = TAU - nu;
            }
            nu
        } else {
            let mut nu = (ecc_vector.dot(position) / (ecc * r_mag))
                .clamp(-1.0, 1.0)
                .acos();
            if position.dot(velocity) < 0.0 {
                nu = TAU - nu;
            }
            nu
        };

        Self::new(sma, ecc, inc, raan, aop, true_anomaly)
    }

    /// Body-centered inertial position and velocity for these elements.
    pub fn to_cartesian(&self, mu: f64) -> Result<(Vector3<f64>, Vector3<f64>), SiderealError> {
        let p = self.semi_latus_rectum();
        if p <= 0.0 {
            return Err(SiderealError::InvalidConfiguration(format!(
                "degenerate semi-latus rectum {p} m"
            )));
        }
        let (sin_nu, cos_nu) = self.true_anomaly.sin_cos();
        let r_mag = p / (1.0 + self.ecc * cos_nu);

        let r_perifocal = r_mag * Vector3::new(cos_nu, sin_nu, 0.0);
        let v_perifocal = (mu / p).sqrt() * Vector3::new(-sin_nu, self.ecc + cos_nu, 0.0);

        let (sin_raan, cos_raan) = self.raan.sin_cos();
        let (sin_inc, cos_inc) = self.inc.sin_cos();
        let (sin_aop, cos_aop) = self.aop.sin_cos();

        let rotate = |v: &Vector3<f64>| -> Vector3<f64> {
            let x = (cos_raan * cos_aop - sin_raan * sin_aop * cos_inc) * v[0]
                + (-cos_raan * sin_aop - sin_raan * cos_aop * cos_inc) * v[1];
            let y = (sin_raan * cos_aop + cos_raan * sin_aop * cos_inc) * v[0]
                + (-sin_raan * sin_aop + cos_raan * cos_aop * cos_inc) * v[1];
            let z = sin_aop * sin_inc * v[0] + cos_aop * sin_inc * v[1];
            Vector3::new(x, y, z)
        };

        Ok((rotate(&r_perifocal), rotate(&v_perifocal)))
    }
}

impl fmt::Display for KeplerianElements {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "a = {:.1} m, e = {:.6}, i = {:.4} rad, raan = {:.4} rad, aop = {:.4} rad, nu = {:.4} rad",
            self.sma, self.ecc, self.inc, self.raan, self.aop, self.true_anomaly
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    const MU: f64 = 3.986_004_418e14;

    #[test]
    fn cartesian_round_trip() {
        let elements = KeplerianElements::new(7.2e6, 0.01, 0.9, 1.2, 2.5, 0.7).unwrap();
        let (r, v) = elements.to_cartesian(MU).unwrap();
        let back = KeplerianElements::from_cartesian(&r, &v, MU).unwrap();
        assert_relative_eq!(back.sma(), elements.sma(), max_relative = 1e-10);
        assert_abs_diff_eq!(back.ecc(), elements.ecc(), epsilon = 1e-10);
        assert_abs_diff_eq!(back.inc(), elements.inc(), epsilon = 1e-10);
        assert_abs_diff_eq!(back.raan(), elements.raan(), epsilon = 1e-10);
        assert_abs_diff_eq!(back.aop(), elements.aop(), epsilon = 1e-9);
        assert_abs_diff_eq!(back.true_anomaly(), elements.true_anomaly(), epsilon = 1e-9);
    }

    #[test]
    fn circular_orbit_velocity() {
        let elements = KeplerianElements::new(7.0e6, 0.0, 0.0, 0.0, 0.0, 0.0).unwrap();
        let (r, v) = elements.to_cartesian(MU).unwrap();
        assert_relative_eq!(r.norm(), 7.0e6, max_relative = 1e-12);
        assert_relative_eq!(v.norm(), (MU / 7.0e6).sqrt(), max_relative = 1e-12);
        assert_abs_diff_eq!(r.dot(&v), 0.0, epsilon = 1e-4);
    }

    #[test]
    fn anomaly_conversions_round_trip() {
        let elements = KeplerianElements::new(7.2e6, 0.3, 0.9, 0.0, 0.0, 2.2).unwrap();
        let mean = elements.mean_anomaly();
        let back = elements.at_mean_anomaly(mean).unwrap();
        assert_abs_diff_eq!(back.true_anomaly(), elements.true_anomaly(), epsilon = 1e-10);
    }

    #[test]
    fn kepler_solver_covers_high_eccentricity() {
        let elements = KeplerianElements::new(2.0e7, 0.95, 0.3, 0.0, 0.0, 0.0).unwrap();
        for k in 0..12 {
            let mean = k as f64 * TAU / 12.0;
            let at = elements.at_mean_anomaly(mean).unwrap();
            assert_abs_diff_eq!(at.mean_anomaly(), mean, epsilon = 1e-9);
        }
    }

    #[test]
    fn period_of_a_leo() {
        let elements = KeplerianElements::new(7.0e6, 0.0, 0.0, 0.0, 0.0, 0.0).unwrap();
        assert_relative_eq!(elements.period(MU), 5_828.5, max_relative = 1e-3);
    }

    #[test]
    fn hyperbolic_input_is_rejected() {
        let r = Vector3::new(7.0e6, 0.0, 0.0);
        let v = Vector3::new(0.0, 1.5e4, 0.0); // well above escape velocity
        assert!(KeplerianElements::from_cartesian(&r, &v, MU).is_err());
    }
}
