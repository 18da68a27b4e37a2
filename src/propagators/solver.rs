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

use super::dormand::DormandPrince45;
use super::error_ctrl::ErrorControl;
use super::fehlberg::Fehlberg78;
use super::rk::{CashKarp45, RungeKutta4, RK};
use crate::errors::SiderealError;
use crate::linalg::DVector;
use crate::math::{RootSolution, RootSolver};
use serde_derive::{Deserialize, Serialize};
use std::fmt;

/// The stepper families supported by the solver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stepper {
    /// Fixed-step classical RK4.
    RungeKutta4,
    CashKarp45,
    DormandPrince45,
    Fehlberg78,
}

impl Stepper {
    fn order(&self) -> u8 {
        match self {
            Self::RungeKutta4 => RungeKutta4::order(),
            Self::CashKarp45 => CashKarp45::order(),
            Self::DormandPrince45 => DormandPrince45::order(),
            Self::Fehlberg78 => Fehlberg78::order(),
        }
    }

    fn stages(&self) -> usize {
        match self {
            Self::RungeKutta4 => RungeKutta4::stages(),
            Self::CashKarp45 => CashKarp45::stages(),
            Self::DormandPrince45 => DormandPrince45::stages(),
            Self::Fehlberg78 => Fehlberg78::stages(),
        }
    }

    fn a_coeffs(&self) -> &'static [f64] {
        match self {
            Self::RungeKutta4 => RungeKutta4::a_coeffs(),
            Self::CashKarp45 => CashKarp45::a_coeffs(),
            Self::DormandPrince45 => DormandPrince45::a_coeffs(),
            Self::Fehlberg78 => Fehlberg78::a_coeffs(),
        }
    }

    fn b_coeffs(&self) -> &'static [f64] {
        match self {
            Self::RungeKutta4 => RungeKutta4::b_coeffs(),
            Self::CashKarp45 => CashKarp45::b_coeffs(),
            Self::DormandPrince45 => DormandPrince45::b_coeffs(),
            Self::Fehlberg78 => Fehlberg78::b_coeffs(),
        }
    }

    fn is_adaptive(&self) -> bool {
        !matches!(self, Self::RungeKutta4)
    }
}

impl fmt::Display for Stepper {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Self::RungeKutta4 => "RK4",
            Self::CashKarp45 => "Cash-Karp 5(4)",
            Self::DormandPrince45 => "Dormand-Prince 5(4)",
            Self::Fehlberg78 => "Fehlberg 7(8)",
        };
        write!(f, "{name}")
    }
}

/// What the solver reports to an observer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogType {
    /// Endpoints only.
    NoLog,
    /// Samples at multiples of the initial step from the start time.
    Sampled,
    /// Every accepted step boundary.
    Dense,
}

/// Outcome of a conditioned integration.
#[derive(Clone, Debug, PartialEq)]
pub struct ConditionOutcome {
    pub time: f64,
    pub state: DVector<f64>,
    pub condition_is_satisfied: bool,
    pub iteration_count: usize,
    pub root_solver_has_converged: bool,
}

/// Details of the last accepted step, mirrored out for diagnostics.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct IntegrationDetails {
    /// Step size used, s.
    pub step: f64,
    /// Scaled error of the accepted step (unit value = on tolerance).
    pub error: f64,
    /// Attempts needed before the controller accepted the step.
    pub attempts: u8,
}

struct StepOutcome {
    time: f64,
    state: DVector<f64>,
    next_step: f64,
    details: IntegrationDetails,
}

/// An adaptive Runge-Kutta integrator over dynamically sized systems.
///
/// The solver is a value-type configuration: every `integrate*` call is
/// independent, carries no cross-call state, and is deterministic for
/// identical inputs.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NumericalSolver {
    stepper: Stepper,
    initial_step: f64,
    relative_tolerance: f64,
    absolute_tolerance: f64,
    log_type: LogType,
    error_control: ErrorControl,
}

impl Default for NumericalSolver {
    /// Dormand-Prince 5(4), 30 s initial step, 1e-12 tolerances, no log.
    fn default() -> Self {
        Self {
            stepper: Stepper::DormandPrince45,
            initial_step: 30.0,
            relative_tolerance: 1e-12,
            absolute_tolerance: 1e-12,
            log_type: LogType::NoLog,
            error_control: ErrorControl::ScaledRss,
        }
    }
}

impl NumericalSolver {
    /// Growth clamp per accepted step.
    const MAX_STEP_GROWTH: f64 = 5.0;
    /// Shrink clamp per rejection.
    const MIN_STEP_SHRINK: f64 = 0.1;
    /// Safety factor on the controller update.
    const SAFETY: f64 = 0.9;
    /// Successive rejections before the controller is declared stalled.
    const MAX_REJECTIONS: u8 = 20;

    pub fn new(
        stepper: Stepper,
        initial_step: f64,
        relative_tolerance: f64,
        absolute_tolerance: f64,
        log_type: LogType,
    ) -> Result<Self, SiderealError> {
        if initial_step <= 0.0 {
            return Err(SiderealError::InvalidConfiguration(format!(
                "initial step must be strictly positive, got {initial_step} s"
            )));
        }
        if relative_tolerance <= 0.0 || absolute_tolerance <= 0.0 {
            return Err(SiderealError::InvalidConfiguration(format!(
                "tolerances must be strictly positive, got rel {relative_tolerance} / abs {absolute_tolerance}"
            )));
        }
        Ok(Self {
            stepper,
            initial_step,
            relative_tolerance,
            absolute_tolerance,
            log_type,
            error_control: ErrorControl::ScaledRss,
        })
    }

    pub fn with_error_control(mut self, error_control: ErrorControl) -> Self {
        self.error_control = error_control;
        self
    }

    pub fn with_log_type(mut self, log_type: LogType) -> Self {
        self.log_type = log_type;
        self
    }

    pub fn stepper(&self) -> Stepper {
        self.stepper
    }

    pub fn initial_step(&self) -> f64 {
        self.initial_step
    }

    pub fn log_type(&self) -> LogType {
        self.log_type
    }

    /// Advances `x0` from `t0` to `t1` (either direction), returning the
    /// final state vector.
    pub fn integrate<F>(
        &self,
        x0: &DVector<f64>,
        t0: f64,
        t1: f64,
        system: F,
    ) -> Result<DVector<f64>, SiderealError>
    where
        F: Fn(f64, &DVector<f64>) -> Result<DVector<f64>, SiderealError>,
    {
        self.integrate_with_observer(x0, t0, t1, system, |_, _| {})
    }

    /// Advances `x0` from `t0` to `t1`, reporting `(t, x)` samples to the
    /// observer per the configured log type. Samples are emitted in strictly
    /// monotonic time order, starting with the initial state.
    pub fn integrate_with_observer<F, O>(
        &self,
        x0: &DVector<f64>,
        t0: f64,
        t1: f64,
        system: F,
        mut observer: O,
    ) -> Result<DVector<f64>, SiderealError>
    where
        F: Fn(f64, &DVector<f64>) -> Result<DVector<f64>, SiderealError>,
        O: FnMut(f64, &DVector<f64>),
    {
        observer(t0, x0);
        if t0 == t1 {
            return Ok(x0.clone());
        }

        let direction = (t1 - t0).signum();
        let mut t = t0;
        let mut x = x0.clone();
        let mut h = self.initial_step * direction;
        let mut next_sample = t0 + self.initial_step * direction;
        let mut last_logged = t0;

        loop {
            // Land exactly on the end time and, when sampling, on the grid.
            let mut target = t1;
            if self.log_type == LogType::Sampled
                && (next_sample - target) * direction < 0.0
            {
                target = next_sample;
            }
            let attempt = if ((t + h) - target) * direction > 0.0 {
                target - t
            } else {
                h
            };

            let outcome = self.try_step(t, &x, attempt, &system)?;
            t = outcome.time;
            x = outcome.state;
            // A landing step truncated onto the target keeps the
            // controller's step for the next stretch, unless the controller
            // had to reject within it.
            if attempt == h || outcome.details.attempts > 1 {
                h = outcome.next_step;
            }
            if outcome.details.attempts > 1 {
                debug!(
                    "step of {} s accepted after {} attempts",
                    outcome.details.step, outcome.details.attempts
                );
            }

            match self.log_type {
                LogType::Dense => {
                    observer(t, &x);
                    last_logged = t;
                }
                LogType::Sampled => {
                    if (t - next_sample) * direction >= 0.0 {
                        observer(t, &x);
                        last_logged = t;
                        next_sample += self.initial_step * direction;
                    }
                }
                LogType::NoLog => {}
            }

            if (t - t1) * direction >= 0.0 {
                if last_logged != t {
                    observer(t, &x);
                }
                return Ok(x);
            }
        }
    }

    /// Advances step by step toward `t_max`, checking the termination
    /// condition after every accepted step. On a crossing, the bracket is
    /// handed to the root solver and the state at the refined root is
    /// returned with `condition_is_satisfied = true`; reaching `t_max` first
    /// returns the endpoint state with `condition_is_satisfied = false`.
    ///
    /// `evaluate` is the signed distance the root solver drives to zero;
    /// `is_satisfied` applies the criterion to the (current, previous) pair.
    pub fn integrate_until_condition<F, E, S, O>(
        &self,
        x0: &DVector<f64>,
        t0: f64,
        t_max: f64,
        system: F,
        evaluate: E,
        is_satisfied: S,
        root_solver: &RootSolver,
        mut observer: O,
    ) -> Result<ConditionOutcome, SiderealError>
    where
        F: Fn(f64, &DVector<f64>) -> Result<DVector<f64>, SiderealError>,
        E: Fn(f64, &DVector<f64>) -> Result<f64, SiderealError>,
        S: Fn(f64, &DVector<f64>, f64, &DVector<f64>) -> Result<bool, SiderealError>,
        O: FnMut(f64, &DVector<f64>),
    {
        observer(t0, x0);
        if t0 == t_max {
            return Ok(ConditionOutcome {
                time: t0,
                state: x0.clone(),
                condition_is_satisfied: false,
                iteration_count: 0,
                root_solver_has_converged: false,
            });
        }

        let direction = (t_max - t0).signum();
        let mut previous_t = t0;
        let mut previous_x = x0.clone();
        let mut h = self.initial_step * direction;
        let mut next_sample = t0 + self.initial_step * direction;
        let mut last_logged = t0;

        loop {
            let mut target = t_max;
            if self.log_type == LogType::Sampled && (next_sample - target) * direction < 0.0 {
                target = next_sample;
            }
            let attempt = if ((previous_t + h) - target) * direction > 0.0 {
                target - previous_t
            } else {
                h
            };

            let outcome = self.try_step(previous_t, &previous_x, attempt, &system)?;
            let t = outcome.time;
            let x = outcome.state;
            if attempt == h || outcome.details.attempts > 1 {
                h = outcome.next_step;
            }

            if is_satisfied(t, &x, previous_t, &previous_x)? {
                let lower = evaluate(previous_t, &previous_x)?;
                let upper = evaluate(t, &x)?;
                if lower * upper > 0.0 {
                    // Satisfied without a crossing (a strictly-signed
                    // criterion): the step boundary is the stop.
                    if last_logged != t {
                        observer(t, &x);
                    }
                    return Ok(ConditionOutcome {
                        time: t,
                        state: x,
                        condition_is_satisfied: true,
                        iteration_count: 0,
                        root_solver_has_converged: true,
                    });
                }

                let span = t - previous_t;
                let g = |tau: f64| -> Result<f64, SiderealError> {
                    if tau == 0.0 {
                        return Ok(lower);
                    }
                    let xs = self.integrate(&previous_x, previous_t, previous_t + tau, &system)?;
                    evaluate(previous_t + tau, &xs)
                };
                let solution: RootSolution = root_solver.solve(g, 0.0, span)?;
                debug!(
                    "condition crossing refined to {} s in {} iterations",
                    previous_t + solution.root,
                    solution.iteration_count
                );

                let root_t = previous_t + solution.root;
                let root_x = self.integrate(&previous_x, previous_t, root_t, &system)?;
                if last_logged != root_t {
                    observer(root_t, &root_x);
                }
                return Ok(ConditionOutcome {
                    time: root_t,
                    state: root_x,
                    condition_is_satisfied: true,
                    iteration_count: solution.iteration_count,
                    root_solver_has_converged: solution.has_converged,
                });
            }

            match self.log_type {
                LogType::Dense => {
                    observer(t, &x);
                    last_logged = t;
                }
                LogType::Sampled => {
                    if (t - next_sample) * direction >= 0.0 {
                        observer(t, &x);
                        last_logged = t;
                        next_sample += self.initial_step * direction;
                    }
                }
                LogType::NoLog => {}
            }

            if (t - t_max) * direction >= 0.0 {
                if last_logged != t {
                    observer(t, &x);
                }
                return Ok(ConditionOutcome {
                    time: t,
                    state: x,
                    condition_is_satisfied: false,
                    iteration_count: 0,
                    root_solver_has_converged: false,
                });
            }

            previous_t = t;
            previous_x = x;
        }
    }

    /// One step of the underlying Runge-Kutta scheme with the adaptive
    /// controller: rejections shrink the step and retry without advancing
    /// time.
    fn try_step<F>(
        &self,
        t: f64,
        state: &DVector<f64>,
        step: f64,
        system: &F,
    ) -> Result<StepOutcome, SiderealError>
    where
        F: Fn(f64, &DVector<f64>) -> Result<DVector<f64>, SiderealError>,
    {
        let stages = self.stepper.stages();
        let a_coeffs = self.stepper.a_coeffs();
        let b_coeffs = self.stepper.b_coeffs();
        let order = f64::from(self.stepper.order());
        let adaptive = self.stepper.is_adaptive();

        let mut h = step;
        let mut attempts: u8 = 1;

        loop {
            let mut k: Vec<DVector<f64>> = Vec::with_capacity(stages);
            k.push(self.eval(system, t, state)?);
            let mut a_idx = 0;
            for _ in 0..stages - 1 {
                let mut ci = 0.0;
                let mut wi = DVector::<f64>::zeros(state.len());
                for kj in &k {
                    let a_ij = a_coeffs[a_idx];
                    ci += a_ij;
                    wi.axpy(a_ij, kj, 1.0);
                    a_idx += 1;
                }
                let ki = self.eval(system, t + ci * h, &(state + h * &wi))?;
                k.push(ki);
            }

            let mut next_state = state.clone();
            let mut error_est = DVector::<f64>::zeros(state.len());
            for (i, ki) in k.iter().enumerate() {
                let b_i = b_coeffs[i];
                if adaptive {
                    let b_i_star = b_coeffs[i + stages];
                    error_est.axpy(h * (b_i - b_i_star), ki, 1.0);
                }
                next_state.axpy(h * b_i, ki, 1.0);
            }

            if !adaptive {
                return Ok(StepOutcome {
                    time: t + h,
                    state: next_state,
                    next_step: h,
                    details: IntegrationDetails {
                        step: h,
                        error: 0.0,
                        attempts,
                    },
                });
            }

            let error = self.error_control.estimate(
                &error_est,
                &next_state,
                state,
                self.absolute_tolerance,
                self.relative_tolerance,
            );

            if error <= 1.0 {
                // Accepted: grow the next step, clamped.
                let factor = if error == 0.0 {
                    Self::MAX_STEP_GROWTH
                } else {
                    (Self::SAFETY * error.powf(-1.0 / order))
                        .clamp(Self::MIN_STEP_SHRINK, Self::MAX_STEP_GROWTH)
                };
                return Ok(StepOutcome {
                    time: t + h,
                    state: next_state,
                    next_step: h * factor,
                    details: IntegrationDetails {
                        step: h,
                        error,
                        attempts,
                    },
                });
            }

            attempts += 1;
            if attempts > Self::MAX_REJECTIONS {
                return Err(SiderealError::StepSizeUnderflow(format!(
                    "{} rejections at t = {t} s with h = {h} s",
                    Self::MAX_REJECTIONS
                )));
            }
            if attempts == Self::MAX_REJECTIONS {
                warn!("step controller struggling at t = {t} s (h = {h} s, error = {error:.3e})");
            }
            let factor = (Self::SAFETY * error.powf(-1.0 / (order - 1.0)))
                .clamp(Self::MIN_STEP_SHRINK, 1.0);
            h *= factor;
        }
    }

    fn eval<F>(
        &self,
        system: &F,
        t: f64,
        x: &DVector<f64>,
    ) -> Result<DVector<f64>, SiderealError>
    where
        F: Fn(f64, &DVector<f64>) -> Result<DVector<f64>, SiderealError>,
    {
        let dxdt = system(t, x)?;
        if dxdt.iter().any(|value| !value.is_finite()) {
            return Err(SiderealError::Diverged(format!(
                "non-finite derivative at t = {t} s"
            )));
        }
        Ok(dxdt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn exponential_decay(_t: f64, x: &DVector<f64>) -> Result<DVector<f64>, SiderealError> {
        Ok(-x)
    }

    fn harmonic(_t: f64, x: &DVector<f64>) -> Result<DVector<f64>, SiderealError> {
        Ok(DVector::from_vec(vec![x[1], -x[0]]))
    }

    #[test]
    fn integrates_exponential_decay() {
        for stepper in [
            Stepper::RungeKutta4,
            Stepper::CashKarp45,
            Stepper::DormandPrince45,
            Stepper::Fehlberg78,
        ] {
            let solver = NumericalSolver::new(stepper, 0.01, 1e-12, 1e-12, LogType::NoLog).unwrap();
            let x0 = DVector::from_vec(vec![1.0]);
            let xf = solver.integrate(&x0, 0.0, 2.0, exponential_decay).unwrap();
            assert_relative_eq!(xf[0], (-2.0f64).exp(), max_relative = 1e-8);
        }
    }

    #[test]
    fn backward_integration() {
        let solver = NumericalSolver::default();
        let x0 = DVector::from_vec(vec![1.0, 0.0]);
        let xf = solver.integrate(&x0, 0.0, -1.5, harmonic).unwrap();
        assert_relative_eq!(xf[0], 1.5f64.cos(), epsilon = 1e-9);
        assert_relative_eq!(xf[1], 1.5f64.sin(), epsilon = 1e-9);
    }

    #[test]
    fn observer_times_are_strictly_increasing() {
        let solver = NumericalSolver::new(
            Stepper::DormandPrince45,
            0.1,
            1e-10,
            1e-10,
            LogType::Dense,
        )
        .unwrap();
        let x0 = DVector::from_vec(vec![1.0, 0.0]);
        let mut times = Vec::new();
        solver
            .integrate_with_observer(&x0, 0.0, 3.0, harmonic, |t, _| times.push(t))
            .unwrap();
        assert!(times.windows(2).all(|w| w[1] > w[0]));
        assert_eq!(times[0], 0.0);
        assert_abs_diff_eq!(*times.last().unwrap(), 3.0, epsilon = 1e-12);
    }

    #[test]
    fn sampled_log_lands_on_the_grid() {
        let solver =
            NumericalSolver::new(Stepper::DormandPrince45, 0.5, 1e-10, 1e-10, LogType::Sampled)
                .unwrap();
        let x0 = DVector::from_vec(vec![1.0, 0.0]);
        let mut times = Vec::new();
        solver
            .integrate_with_observer(&x0, 0.0, 2.0, harmonic, |t, _| times.push(t))
            .unwrap();
        assert_eq!(times, vec![0.0, 0.5, 1.0, 1.5, 2.0]);
    }

    #[test]
    fn condition_stops_at_the_crossing() {
        let solver = NumericalSolver::default();
        let x0 = DVector::from_vec(vec![1.0, 0.0]);
        // Stop when the first component crosses zero: a quarter period.
        let outcome = solver
            .integrate_until_condition(
                &x0,
                0.0,
                10.0,
                harmonic,
                |_, x| Ok(x[0]),
                |_, x, _, px| Ok(px[0] > 0.0 && x[0] < 0.0),
                &RootSolver::default(),
                |_, _| {},
            )
            .unwrap();
        assert!(outcome.condition_is_satisfied);
        assert!(outcome.root_solver_has_converged);
        assert_abs_diff_eq!(outcome.time, std::f64::consts::FRAC_PI_2, epsilon = 1e-6);
        assert_abs_diff_eq!(outcome.state[0], 0.0, epsilon = 1e-6);
    }

    #[test]
    fn unsatisfied_condition_reaches_the_end() {
        let solver = NumericalSolver::default();
        let x0 = DVector::from_vec(vec![1.0]);
        let outcome = solver
            .integrate_until_condition(
                &x0,
                0.0,
                1.0,
                exponential_decay,
                |_, x| Ok(x[0] + 10.0),
                |_, _, _, _| Ok(false),
                &RootSolver::default(),
                |_, _| {},
            )
            .unwrap();
        assert!(!outcome.condition_is_satisfied);
        assert_abs_diff_eq!(outcome.time, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn divergence_is_reported() {
        let solver = NumericalSolver::default();
        let x0 = DVector::from_vec(vec![1.0]);
        let result = solver.integrate(&x0, 0.0, 1.0, |_, x: &DVector<f64>| {
            Ok(DVector::from_vec(vec![x[0] / 0.0]))
        });
        assert!(matches!(result, Err(SiderealError::Diverged(_))));
    }
}
