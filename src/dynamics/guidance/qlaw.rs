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

use super::GuidanceLaw;
use crate::cosmic::{Frame, LocalOrbitalFrame};
use crate::errors::SiderealError;
use crate::linalg::Vector3;
use crate::orbit::KeplerianElements;
use crate::time::Epoch;
use crate::utils::wrap_to_pi;
use serde_derive::{Deserialize, Serialize};
use std::fmt;

/// The five slow elements steered by the law, in order: semi-major axis,
/// eccentricity, inclination, RAAN, argument of periapsis.
const N_ELEMENTS: usize = 5;

/// Per-element steering weights for the Q-law.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct QLawWeights {
    pub sma: f64,
    pub ecc: f64,
    pub inc: f64,
    pub raan: f64,
    pub aop: f64,
}

impl QLawWeights {
    fn as_array(&self) -> [f64; N_ELEMENTS] {
        [self.sma, self.ecc, self.inc, self.raan, self.aop]
    }
}

impl Default for QLawWeights {
    fn default() -> Self {
        Self {
            sma: 1.0,
            ecc: 1.0,
            inc: 1.0,
            raan: 0.0,
            aop: 0.0,
        }
    }
}

/// Closed-loop Lyapunov guidance toward target classical orbital elements.
///
/// The candidate function `Q` penalizes the weighted, rate-scaled distance
/// of the osculating elements to their targets; the thrust direction is the
/// steepest-descent direction `-Aᵀ∇Q`, with `A` the Gauss variational
/// equations in the radial/transverse/normal triad and `∇Q` obtained by
/// central finite differences. An optional barrier keeps the periapsis above
/// a floor. Throttle is continuous: the law returns the full ceiling until
/// every weighted element is within its convergence threshold, then coasts.
pub struct QLaw {
    target: KeplerianElements,
    mu: f64,
    weights: [f64; N_ELEMENTS],
    thresholds: [f64; N_ELEMENTS],
    minimum_periapsis: Option<f64>,
    periapsis_weight: f64,
    periapsis_sharpness: f64,
}

impl QLaw {
    /// Convergence defaults: 10 m on the semi-major axis, 1e-4 on the
    /// eccentricity, 1e-5 rad on the angles.
    pub const DEFAULT_THRESHOLDS: [f64; N_ELEMENTS] = [10.0, 1e-4, 1e-5, 1e-5, 1e-5];

    pub fn new(
        target: KeplerianElements,
        mu: f64,
        weights: QLawWeights,
    ) -> Result<Self, SiderealError> {
        let weights = weights.as_array();
        if weights.iter().any(|w| *w < 0.0) || weights.iter().all(|w| *w == 0.0) {
            return Err(SiderealError::InvalidConfiguration(
                "Q-law weights must be non-negative with at least one active element".to_string(),
            ));
        }
        Ok(Self {
            target,
            mu,
            weights,
            thresholds: Self::DEFAULT_THRESHOLDS,
            minimum_periapsis: None,
            periapsis_weight: 0.0,
            periapsis_sharpness: 1.0,
        })
    }

    /// Adds a minimum-periapsis barrier: `P = exp(k (1 - rp/rp_min))`
    /// weighted into `Q` by `weight`.
    pub fn with_minimum_periapsis(
        mut self,
        minimum_periapsis_m: f64,
        weight: f64,
        sharpness: f64,
    ) -> Result<Self, SiderealError> {
        if minimum_periapsis_m <= 0.0 || weight < 0.0 || sharpness <= 0.0 {
            return Err(SiderealError::InvalidConfiguration(
                "periapsis barrier needs a positive floor, weight and sharpness".to_string(),
            ));
        }
        self.minimum_periapsis = Some(minimum_periapsis_m);
        self.periapsis_weight = weight;
        self.periapsis_sharpness = sharpness;
        Ok(self)
    }

    pub fn with_thresholds(mut self, thresholds: [f64; N_ELEMENTS]) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn target(&self) -> &KeplerianElements {
        &self.target
    }

    /// Whether every weighted element is within its convergence threshold.
    pub fn is_converged(&self, elements: &KeplerianElements) -> bool {
        let deltas = self.deltas(&Self::slow_elements(elements));
        (0..N_ELEMENTS)
            .all(|k| self.weights[k] == 0.0 || deltas[k].abs() <= self.thresholds[k])
    }

    fn slow_elements(elements: &KeplerianElements) -> [f64; N_ELEMENTS] {
        [
            elements.sma(),
            elements.ecc(),
            elements.inc(),
            elements.raan(),
            elements.aop(),
        ]
    }

    /// Signed distances to the target, shortest-arc for the angles.
    fn deltas(&self, oe: &[f64; N_ELEMENTS]) -> [f64; N_ELEMENTS] {
        [
            oe[0] - self.target.sma(),
            oe[1] - self.target.ecc(),
            wrap_to_pi(oe[2] - self.target.inc()),
            wrap_to_pi(oe[3] - self.target.raan()),
            wrap_to_pi(oe[4] - self.target.aop()),
        ]
    }

    /// The Lyapunov candidate at the given slow elements, for a unit
    /// acceleration ceiling (the ceiling scales `Q` uniformly and drops out
    /// of the descent direction).
    fn q_value(&self, oe: &[f64; N_ELEMENTS]) -> f64 {
        let a = oe[0];
        let e = oe[1].max(1e-6).min(0.999_999);
        let aop = oe[4];
        let sin_i = oe[2].sin().abs().max(1e-6);

        let p = a * (1.0 - e * e);
        let h = (self.mu * p).sqrt();
        let deltas = self.deltas(oe);

        // Best-case element rates over the orbit, for a unit acceleration.
        let a_rate = 2.0 * (a * a * a * (1.0 + e) / (self.mu * (1.0 - e))).sqrt();
        let e_rate = 2.0 * p / h;
        let i_rate =
            p / (h * ((1.0 - e * e * aop.sin().powi(2)).sqrt() - e * aop.cos().abs()));
        let raan_rate =
            p / (h * sin_i * ((1.0 - e * e * aop.cos().powi(2)).sqrt() - e * aop.sin().abs()));
        let aop_rate = {
            // True anomaly of the best in-plane periapsis change.
            let e_cubed = (1.0 - e * e) / (2.0 * e * e * e);
            let radical = (e_cubed * e_cubed + 1.0 / 27.0).sqrt();
            let cos_nu = (e_cubed + radical).cbrt() - (radical - e_cubed).cbrt() - 1.0 / e;
            let cos_nu = cos_nu.clamp(-1.0, 1.0);
            let sin_nu_sq = 1.0 - cos_nu * cos_nu;
            let r_xx = p / (1.0 + e * cos_nu);
            (p * p * cos_nu * cos_nu + (p + r_xx) * (p + r_xx) * sin_nu_sq).sqrt() / (e * h)
        };
        let rates = [a_rate, e_rate, i_rate, raan_rate, aop_rate];

        // Distance scaling keeps far-away semi-major axes from swamping Q.
        let sma_scaling = (1.0 + (deltas[0] / (3.0 * self.target.sma())).powi(4)).sqrt();
        let scalings = [sma_scaling, 1.0, 1.0, 1.0, 1.0];

        let mut q = 0.0;
        for k in 0..N_ELEMENTS {
            if self.weights[k] == 0.0 {
                continue;
            }
            let scaled = deltas[k] / rates[k];
            q += self.weights[k] * scalings[k] * scaled * scaled;
        }

        if let Some(rp_min) = self.minimum_periapsis {
            let rp = a * (1.0 - e);
            let barrier = (self.periapsis_sharpness * (1.0 - rp / rp_min)).exp();
            q *= 1.0 + self.periapsis_weight * barrier;
        }

        q
    }

    /// Central finite-difference gradient of `Q` over the slow elements.
    fn q_gradient(&self, oe: &[f64; N_ELEMENTS]) -> [f64; N_ELEMENTS] {
        // Step floors keep perturbations meaningful near zero elements.
        const STEP_FLOORS: [f64; N_ELEMENTS] = [1.0, 1e-7, 1e-7, 1e-7, 1e-7];
        const STEP_FRACTION: f64 = 1e-6;

        let mut gradient = [0.0; N_ELEMENTS];
        for k in 0..N_ELEMENTS {
            let step = (STEP_FRACTION * oe[k].abs()).max(STEP_FLOORS[k]);
            let mut forward = *oe;
            let mut backward = *oe;
            forward[k] += step;
            backward[k] -= step;
            gradient[k] = (self.q_value(&forward) - self.q_value(&backward)) / (2.0 * step);
        }
        gradient
    }

    /// The Gauss variational equations at the osculating elements, mapping a
    /// radial/transverse/normal acceleration onto the slow-element rates.
    fn gauss_matrix(&self, elements: &KeplerianElements) -> [[f64; 3]; N_ELEMENTS] {
        let a = elements.sma();
        let e = elements.ecc().max(1e-6);
        let i = elements.inc();
        let aop = elements.aop();
        let nu = elements.true_anomaly();

        let p = a * (1.0 - e * e);
        let h = (self.mu * p).sqrt();
        let r = p / (1.0 + e * nu.cos());
        let u = aop + nu;
        let sin_i = i.sin().abs().max(1e-6);

        [
            [
                2.0 * a * a / h * e * nu.sin(),
                2.0 * a * a / h * p / r,
                0.0,
            ],
            [
                p * nu.sin() / h,
                ((p + r) * nu.cos() + r * e) / h,
                0.0,
            ],
            [0.0, 0.0, r * u.cos() / h],
            [0.0, 0.0, r * u.sin() / (h * sin_i)],
            [
                -p * nu.cos() / (h * e),
                (p + r) * nu.sin() / (h * e),
                -r * u.sin() * i.cos() / (h * sin_i),
            ],
        ]
    }
}

impl GuidanceLaw for QLaw {
    fn name(&self) -> &str {
        "Q-Law"
    }

    fn thrust_acceleration(
        &self,
        _instant: Epoch,
        position: &Vector3<f64>,
        velocity: &Vector3<f64>,
        max_acceleration: f64,
        _frame: &Frame,
    ) -> Result<Vector3<f64>, SiderealError> {
        let elements = KeplerianElements::from_cartesian(position, velocity, self.mu)?;
        if self.is_converged(&elements) {
            return Ok(Vector3::zeros());
        }

        let gradient = self.q_gradient(&Self::slow_elements(&elements));
        let gauss = self.gauss_matrix(&elements);

        // dQ/dt = ∇Q · (A u): descending fastest means u along -Aᵀ∇Q.
        let mut descent: Vector3<f64> = Vector3::zeros();
        for k in 0..N_ELEMENTS {
            if self.weights[k] == 0.0 {
                continue;
            }
            for axis in 0..3 {
                descent[axis] -= gradient[k] * gauss[k][axis];
            }
        }
        let norm = descent.norm();
        if !(norm.is_finite() && norm > 0.0) {
            return Ok(Vector3::zeros());
        }
        let direction_rsw = descent / norm;

        let rotation = LocalOrbitalFrame::Qsw.rotation_from(position, velocity)?;
        Ok(rotation.inverse() * (direction_rsw * max_acceleration))
    }
}

impl fmt::Display for QLaw {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Q-Law toward a = {:.1} m, e = {:.4}, i = {:.4} rad",
            self.target.sma(),
            self.target.ecc(),
            self.target.inc()
        )
    }
}
