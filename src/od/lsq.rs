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
use crate::linalg::{DMatrix, DVector};
use serde_derive::{Deserialize, Serialize};
use std::fmt;

/// Which stopping rule ended the iteration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminationCriterion {
    /// `|Δx| / |x|` fell under the update threshold.
    RelativeUpdate,
    /// The residual RMS stopped improving.
    RmsUpdate,
    /// The iteration budget ran out.
    IterationLimit,
    /// No damping value produced an improvement.
    DampingStalled,
}

/// Outcome of a least-squares solve.
#[derive(Clone, Debug, PartialEq)]
pub struct LeastSquaresAnalysis {
    pub solution: DVector<f64>,
    /// RMS of the weighted residuals at the solution.
    pub rms_error: f64,
    pub iteration_count: usize,
    pub has_converged: bool,
    pub termination: TerminationCriterion,
}

/// Damped Gauss-Newton over a user-supplied observation model.
///
/// Residuals are sigma-weighted, the Jacobian comes from central finite
/// differences with a relative step and an absolute floor, and a Levenberg
/// diagonal keeps ill-conditioned steps tame: the damping shrinks after an
/// accepted step and grows until one is found otherwise.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LeastSquaresSolver {
    maximum_iteration_count: usize,
    relative_update_threshold: f64,
    rms_update_threshold: f64,
    finite_difference_step: f64,
    finite_difference_step_floor: f64,
    initial_damping: f64,
    damping_scale: f64,
}

impl Default for LeastSquaresSolver {
    fn default() -> Self {
        Self {
            maximum_iteration_count: 20,
            relative_update_threshold: 1e-8,
            rms_update_threshold: 1e-9,
            finite_difference_step: 1e-6,
            finite_difference_step_floor: 1e-9,
            initial_damping: 1e-3,
            damping_scale: 10.0,
        }
    }
}

impl LeastSquaresSolver {
    const MAX_DAMPING_GROWTH: f64 = 1e12;
    const MIN_DAMPING: f64 = 1e-12;

    pub fn new(
        maximum_iteration_count: usize,
        relative_update_threshold: f64,
        rms_update_threshold: f64,
    ) -> Result<Self, SiderealError> {
        if maximum_iteration_count == 0 {
            return Err(SiderealError::InvalidConfiguration(
                "the iteration budget cannot be zero".to_string(),
            ));
        }
        if relative_update_threshold <= 0.0 || rms_update_threshold <= 0.0 {
            return Err(SiderealError::InvalidConfiguration(
                "stopping thresholds must be strictly positive".to_string(),
            ));
        }
        Ok(Self {
            maximum_iteration_count,
            relative_update_threshold,
            rms_update_threshold,
            ..Self::default()
        })
    }

    /// Overrides the finite-difference relative step and its floor.
    pub fn with_finite_difference_step(
        mut self,
        step: f64,
        floor: f64,
    ) -> Result<Self, SiderealError> {
        if step <= 0.0 || floor <= 0.0 {
            return Err(SiderealError::InvalidConfiguration(
                "finite-difference steps must be strictly positive".to_string(),
            ));
        }
        self.finite_difference_step = step;
        self.finite_difference_step_floor = floor;
        Ok(self)
    }

    pub fn maximum_iteration_count(&self) -> usize {
        self.maximum_iteration_count
    }

    /// Minimizes the sigma-weighted residual between `observations` and
    /// `generate(x)`, starting from `initial_guess`.
    ///
    /// `observation_sigmas` weighs each observation row; `apriori_sigmas`,
    /// when given, adds `(x0 - x) / sigma` rows tying the solution to the
    /// initial guess.
    pub fn solve<G>(
        &self,
        initial_guess: &DVector<f64>,
        observations: &DVector<f64>,
        observation_sigmas: &DVector<f64>,
        apriori_sigmas: Option<&DVector<f64>>,
        generate: G,
    ) -> Result<LeastSquaresAnalysis, SiderealError>
    where
        G: Fn(&DVector<f64>) -> Result<DVector<f64>, SiderealError>,
    {
        let n = initial_guess.len();
        let m = observations.len();
        if m == 0 || n == 0 {
            return Err(SiderealError::InvalidConfiguration(
                "empty observation set or state".to_string(),
            ));
        }
        if observation_sigmas.len() != m || observation_sigmas.iter().any(|sigma| *sigma <= 0.0) {
            return Err(SiderealError::InvalidConfiguration(format!(
                "need {m} strictly positive observation sigmas"
            )));
        }
        if let Some(sigmas) = apriori_sigmas {
            if sigmas.len() != n || sigmas.iter().any(|sigma| *sigma <= 0.0) {
                return Err(SiderealError::InvalidConfiguration(format!(
                    "need {n} strictly positive a priori sigmas"
                )));
            }
        }

        let mut x = initial_guess.clone();
        let mut residuals =
            self.residuals(&x, initial_guess, observations, observation_sigmas, apriori_sigmas, &generate)?;
        let mut rms = Self::rms(&residuals);
        let mut damping = self.initial_damping;

        for iteration in 1..=self.maximum_iteration_count {
            let jacobian = self.residual_jacobian(
                &x,
                observations,
                observation_sigmas,
                apriori_sigmas,
                &generate,
            )?;
            let normal = jacobian.transpose() * &jacobian;
            let projected = jacobian.transpose() * &residuals;

            // Levenberg loop: grow the damping until a step improves the fit.
            let mut accepted = false;
            while damping < Self::MAX_DAMPING_GROWTH {
                let mut damped = normal.clone();
                for i in 0..n {
                    damped[(i, i)] += damping;
                }
                let update = match damped.lu().solve(&projected) {
                    Some(update) => update,
                    None => {
                        damping *= self.damping_scale;
                        continue;
                    }
                };

                let candidate = &x + &update;
                let candidate_residuals = self.residuals(
                    &candidate,
                    initial_guess,
                    observations,
                    observation_sigmas,
                    apriori_sigmas,
                    &generate,
                )?;
                let candidate_rms = Self::rms(&candidate_residuals);

                if candidate_rms <= rms {
                    let relative_update = update.norm() / x.norm().max(f64::EPSILON);
                    let rms_improvement = rms - candidate_rms;
                    x = candidate;
                    residuals = candidate_residuals;
                    rms = candidate_rms;
                    damping = (damping / self.damping_scale).max(Self::MIN_DAMPING);
                    accepted = true;

                    debug!(
                        "iteration {iteration}: rms {rms:.6e}, |dx|/|x| {relative_update:.3e}, lambda {damping:.1e}"
                    );

                    if relative_update < self.relative_update_threshold {
                        return Ok(LeastSquaresAnalysis {
                            solution: x,
                            rms_error: rms,
                            iteration_count: iteration,
                            has_converged: true,
                            termination: TerminationCriterion::RelativeUpdate,
                        });
                    }
                    if rms_improvement < self.rms_update_threshold {
                        return Ok(LeastSquaresAnalysis {
                            solution: x,
                            rms_error: rms,
                            iteration_count: iteration,
                            has_converged: true,
                            termination: TerminationCriterion::RmsUpdate,
                        });
                    }
                    break;
                }
                damping *= self.damping_scale;
            }

            if !accepted {
                return Ok(LeastSquaresAnalysis {
                    solution: x,
                    rms_error: rms,
                    iteration_count: iteration,
                    has_converged: false,
                    termination: TerminationCriterion::DampingStalled,
                });
            }
        }

        Ok(LeastSquaresAnalysis {
            solution: x,
            rms_error: rms,
            iteration_count: self.maximum_iteration_count,
            has_converged: false,
            termination: TerminationCriterion::IterationLimit,
        })
    }

    /// Stacked weighted residuals: observations first, a priori rows last.
    fn residuals<G>(
        &self,
        x: &DVector<f64>,
        x0: &DVector<f64>,
        observations: &DVector<f64>,
        observation_sigmas: &DVector<f64>,
        apriori_sigmas: Option<&DVector<f64>>,
        generate: &G,
    ) -> Result<DVector<f64>, SiderealError>
    where
        G: Fn(&DVector<f64>) -> Result<DVector<f64>, SiderealError>,
    {
        let predicted = generate(x)?;
        if predicted.len() != observations.len() {
            return Err(SiderealError::InvalidConfiguration(format!(
                "the model produced {} values for {} observations",
                predicted.len(),
                observations.len()
            )));
        }
        let m = observations.len();
        let extra = apriori_sigmas.map_or(0, |sigmas| sigmas.len());
        let mut residuals = DVector::zeros(m + extra);
        for i in 0..m {
            residuals[i] = (observations[i] - predicted[i]) / observation_sigmas[i];
        }
        if let Some(sigmas) = apriori_sigmas {
            for j in 0..sigmas.len() {
                residuals[m + j] = (x0[j] - x[j]) / sigmas[j];
            }
        }
        Ok(residuals)
    }

    /// Central finite-difference Jacobian of the *negated* residuals, i.e.
    /// the matrix `A` with `(AᵀA + λI) Δx = Aᵀ r`. The perturbation per
    /// component is `max(step · |x_j|, floor)`, the floor guarding
    /// components sitting at zero.
    fn residual_jacobian<G>(
        &self,
        x: &DVector<f64>,
        observations: &DVector<f64>,
        observation_sigmas: &DVector<f64>,
        apriori_sigmas: Option<&DVector<f64>>,
        generate: &G,
    ) -> Result<DMatrix<f64>, SiderealError>
    where
        G: Fn(&DVector<f64>) -> Result<DVector<f64>, SiderealError>,
    {
        let n = x.len();
        let m = observations.len();
        let extra = apriori_sigmas.map_or(0, |sigmas| sigmas.len());
        let mut jacobian = DMatrix::zeros(m + extra, n);

        for j in 0..n {
            let step = (self.finite_difference_step * x[j].abs())
                .max(self.finite_difference_step_floor);
            let mut forward = x.clone();
            let mut backward = x.clone();
            forward[j] += step;
            backward[j] -= step;
            let predicted_forward = generate(&forward)?;
            let predicted_backward = generate(&backward)?;
            for i in 0..m {
                jacobian[(i, j)] = (predicted_forward[i] - predicted_backward[i])
                    / (2.0 * step * observation_sigmas[i]);
            }
        }
        if let Some(sigmas) = apriori_sigmas {
            for j in 0..sigmas.len() {
                jacobian[(m + j, j)] = 1.0 / sigmas[j];
            }
        }
        Ok(jacobian)
    }

    fn rms(residuals: &DVector<f64>) -> f64 {
        (residuals.norm_squared() / residuals.len() as f64).sqrt()
    }
}

impl fmt::Display for LeastSquaresSolver {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Gauss-Newton ({} iterations max, Levenberg damping from {:.0e})",
            self.maximum_iteration_count, self.initial_damping
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn linear_model_converges_immediately() {
        // y = 2 x0 - x1 + 3, observed without noise at four abscissae.
        let truth = DVector::from_vec(vec![4.0, -1.5]);
        let design = [(1.0, 0.0), (0.0, 1.0), (1.0, 1.0), (2.0, -1.0)];
        let model = |x: &DVector<f64>| -> Result<DVector<f64>, SiderealError> {
            Ok(DVector::from_iterator(
                design.len(),
                design.iter().map(|(a, b)| a * x[0] + b * x[1] + 3.0),
            ))
        };
        let observations = model(&truth).unwrap();
        let sigmas = DVector::from_element(design.len(), 1.0);

        let solver = LeastSquaresSolver::default();
        let analysis = solver
            .solve(
                &DVector::from_vec(vec![0.0, 0.0]),
                &observations,
                &sigmas,
                None,
                model,
            )
            .unwrap();

        assert!(analysis.has_converged);
        assert!(analysis.iteration_count <= 2);
        assert!(analysis.rms_error < 1e-10);
        assert_abs_diff_eq!(analysis.solution[0], truth[0], epsilon = 1e-8);
        assert_abs_diff_eq!(analysis.solution[1], truth[1], epsilon = 1e-8);
    }

    #[test]
    fn nonlinear_model_converges() {
        // y_i = exp(k t_i) sampled at a few times; estimate k and the scale.
        let ts = [0.0, 0.5, 1.0, 1.5, 2.0];
        let model = |x: &DVector<f64>| -> Result<DVector<f64>, SiderealError> {
            Ok(DVector::from_iterator(
                ts.len(),
                ts.iter().map(|t| x[0] * (x[1] * t).exp()),
            ))
        };
        let truth = DVector::from_vec(vec![2.0, -0.7]);
        let observations = model(&truth).unwrap();
        let sigmas = DVector::from_element(ts.len(), 1e-3);

        let analysis = LeastSquaresSolver::default()
            .solve(
                &DVector::from_vec(vec![1.0, -0.1]),
                &observations,
                &sigmas,
                None,
                model,
            )
            .unwrap();
        assert!(analysis.has_converged);
        assert_abs_diff_eq!(analysis.solution[0], 2.0, epsilon = 1e-6);
        assert_abs_diff_eq!(analysis.solution[1], -0.7, epsilon = 1e-6);
    }

    #[test]
    fn apriori_rows_pin_an_underdetermined_problem() {
        // One observation of x0 + x1: infinitely many solutions without the
        // a priori tie to the initial guess.
        let model = |x: &DVector<f64>| -> Result<DVector<f64>, SiderealError> {
            Ok(DVector::from_vec(vec![x[0] + x[1]]))
        };
        let observations = DVector::from_vec(vec![10.0]);
        let sigmas = DVector::from_vec(vec![1e-6]);
        let apriori = DVector::from_vec(vec![1.0, 1.0]);

        let analysis = LeastSquaresSolver::default()
            .solve(
                &DVector::from_vec(vec![4.0, 4.0]),
                &observations,
                &sigmas,
                Some(&apriori),
                model,
            )
            .unwrap();
        assert!(analysis.has_converged);
        // The symmetric problem splits the correction evenly.
        assert_abs_diff_eq!(analysis.solution[0], 5.0, epsilon = 1e-3);
        assert_abs_diff_eq!(analysis.solution[1], 5.0, epsilon = 1e-3);
    }

    #[test]
    fn sigma_validation() {
        let model = |x: &DVector<f64>| -> Result<DVector<f64>, SiderealError> { Ok(x.clone()) };
        let solver = LeastSquaresSolver::default();
        let result = solver.solve(
            &DVector::from_vec(vec![1.0]),
            &DVector::from_vec(vec![1.0]),
            &DVector::from_vec(vec![-1.0]),
            None,
            model,
        );
        assert!(matches!(result, Err(SiderealError::InvalidConfiguration(_))));
    }
}
