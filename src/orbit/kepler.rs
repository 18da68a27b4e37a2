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

use super::{KeplerianElements, Trajectory};
use crate::cosmic::{Frame, State};
use crate::errors::SiderealError;
use crate::time::Epoch;
use std::fmt;

/// Secular perturbation carried by the Kepler model.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum KeplerPerturbation {
    /// Pure two-body motion.
    None,
    /// First-order J2 secular drift of RAAN, AOP, and mean anomaly.
    J2 {
        j2: f64,
        equatorial_radius_m: f64,
    },
}

/// Analytic Keplerian orbit model: elements at an epoch, advanced by the
/// mean motion, optionally with J2 secular rates.
pub struct KeplerModel {
    elements: KeplerianElements,
    epoch: Epoch,
    mu: f64,
    frame: Frame,
    perturbation: KeplerPerturbation,
    /// Secular rates (RAAN, AOP, mean anomaly correction), rad/s, cached at
    /// construction.
    secular_rates: (f64, f64, f64),
}

impl KeplerModel {
    pub fn new(
        elements: KeplerianElements,
        epoch: Epoch,
        mu: f64,
        frame: Frame,
        perturbation: KeplerPerturbation,
    ) -> Result<Self, SiderealError> {
        if mu <= 0.0 {
            return Err(SiderealError::InvalidConfiguration(format!(
                "the gravitational parameter must be strictly positive, got {mu}"
            )));
        }
        let secular_rates = match perturbation {
            KeplerPerturbation::None => (0.0, 0.0, 0.0),
            KeplerPerturbation::J2 {
                j2,
                equatorial_radius_m,
            } => {
                let n = elements.mean_motion(mu);
                let p = elements.semi_latus_rectum();
                let factor = 1.5 * j2 * (equatorial_radius_m / p).powi(2) * n;
                let cos_i = elements.inc().cos();
                let sin_i_sq = elements.inc().sin().powi(2);
                let sqrt_one_minus_e_sq = (1.0 - elements.ecc().powi(2)).sqrt();
                (
                    -factor * cos_i,
                    factor * (2.0 - 2.5 * sin_i_sq),
                    factor * sqrt_one_minus_e_sq * (1.0 - 1.5 * sin_i_sq),
                )
            }
        };
        Ok(Self {
            elements,
            epoch,
            mu,
            frame,
            perturbation,
            secular_rates,
        })
    }

    pub fn elements(&self) -> &KeplerianElements {
        &self.elements
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn gravitational_parameter(&self) -> f64 {
        self.mu
    }

    pub fn perturbation(&self) -> KeplerPerturbation {
        self.perturbation
    }

    /// Orbital period under the mean motion, s.
    pub fn period(&self) -> f64 {
        self.elements.period(self.mu)
    }

    /// The osculating elements at `instant`.
    pub fn elements_at(&self, instant: Epoch) -> Result<KeplerianElements, SiderealError> {
        let elapsed = (instant - self.epoch).to_seconds();
        let (raan_rate, aop_rate, mean_correction) = self.secular_rates;
        let mean_anomaly =
            self.elements.mean_anomaly() + (self.elements.mean_motion(self.mu) + mean_correction) * elapsed;

        let drifted = KeplerianElements::new(
            self.elements.sma(),
            self.elements.ecc(),
            self.elements.inc(),
            self.elements.raan() + raan_rate * elapsed,
            self.elements.aop() + aop_rate * elapsed,
            self.elements.true_anomaly(),
        )?;
        drifted.at_mean_anomaly(mean_anomaly)
    }
}

impl Trajectory for KeplerModel {
    fn state_at(&self, instant: Epoch) -> Result<State, SiderealError> {
        let (position, velocity) = self.elements_at(instant)?.to_cartesian(self.mu)?;
        Ok(State::from_position_velocity(
            instant,
            &position,
            &velocity,
            self.frame.clone(),
        ))
    }
}

impl fmt::Display for KeplerModel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Kepler model ({}; {})",
            self.elements,
            match self.perturbation {
                KeplerPerturbation::None => "two-body",
                KeplerPerturbation::J2 { .. } => "J2 secular",
            }
        )
    }
}
