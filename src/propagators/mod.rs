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

use crate::cosmic::{CoordinateBroker, Frame, State};
use crate::dynamics::Dynamics;
use crate::errors::SiderealError;
use crate::linalg::DVector;
use crate::math::RootSolver;
use crate::md::events::EventCondition;
use crate::time::{Duration, Epoch};
use std::fmt;
use std::sync::Arc;

/// Provides different methods for controlling the error computation of the
/// integrator.
pub mod error_ctrl;
pub use self::error_ctrl::ErrorControl;

// Re-Export
mod rk;
pub use self::rk::*;
mod dormand;
pub use self::dormand::*;
mod fehlberg;
pub use self::fehlberg::*;
mod solver;
pub use self::solver::*;

/// Gather/scatter plan of one dynamics against the global layout, derived
/// once at propagator construction so the hot loop does no hash lookups.
struct DynamicsContext {
    dynamics: Arc<dyn Dynamics>,
    read_plan: Vec<(usize, usize)>,
    write_plan: Vec<(usize, usize)>,
    read_size: usize,
}

/// Outcome of a conditioned propagation, at the state level.
#[derive(Clone, Debug)]
pub struct ConditionSolution {
    /// The state at the condition root, or at the end time when the
    /// condition never triggered.
    pub state: State,
    /// States observed along the way, per the solver's log type.
    pub observed_states: Vec<State>,
    pub condition_is_satisfied: bool,
    pub iteration_count: usize,
    pub root_solver_has_converged: bool,
}

/// Assembles an array of dynamics into a single right-hand side and drives
/// the numerical solver over it.
///
/// At construction the global coordinate layout is built from the union of
/// all write subsets, in declaration order, and every read subset is
/// resolved against it; integration then only gathers, evaluates, and
/// scatter-adds. The propagator holds no mutable cross-invocation state:
/// one instance can back any number of sequential propagations.
pub struct Propagator {
    solver: NumericalSolver,
    dynamics: Vec<Arc<dyn Dynamics>>,
    broker: Arc<CoordinateBroker>,
    contexts: Vec<DynamicsContext>,
    root_solver: RootSolver,
}

impl Propagator {
    pub fn new(
        solver: NumericalSolver,
        dynamics: Vec<Arc<dyn Dynamics>>,
    ) -> Result<Self, SiderealError> {
        if dynamics.is_empty() {
            return Err(SiderealError::InvalidConfiguration(
                "a propagator needs at least one dynamics".to_string(),
            ));
        }

        let mut broker = CoordinateBroker::new();
        for entry in &dynamics {
            for subset in entry.write_subsets() {
                broker.add_subset(&subset);
            }
        }
        let broker = Arc::new(broker);

        let mut contexts = Vec::with_capacity(dynamics.len());
        for entry in &dynamics {
            let mut read_plan = Vec::new();
            let mut read_size = 0;
            for subset in entry.read_subsets() {
                let offset = broker.subset_offset(&subset).map_err(|_| {
                    SiderealError::BrokerMismatch(format!(
                        "{} reads {subset}, which no dynamics writes",
                        entry.name()
                    ))
                })?;
                read_plan.push((offset, subset.len()));
                read_size += subset.len();
            }
            let mut write_plan = Vec::new();
            for subset in entry.write_subsets() {
                let offset = broker.subset_offset(&subset)?;
                write_plan.push((offset, subset.len()));
            }
            contexts.push(DynamicsContext {
                dynamics: entry.clone(),
                read_plan,
                write_plan,
                read_size,
            });
        }

        Ok(Self {
            solver,
            dynamics,
            broker,
            contexts,
            root_solver: RootSolver::default(),
        })
    }

    pub fn with_root_solver(mut self, root_solver: RootSolver) -> Self {
        self.root_solver = root_solver;
        self
    }

    pub fn solver(&self) -> &NumericalSolver {
        &self.solver
    }

    pub fn broker(&self) -> &Arc<CoordinateBroker> {
        &self.broker
    }

    pub fn dynamics(&self) -> &[Arc<dyn Dynamics>] {
        &self.dynamics
    }

    /// The combined right-hand side: zero the derivative, then gather, call,
    /// and scatter-add each contributor.
    fn system<'a>(
        &'a self,
        reference: Epoch,
        frame: &'a Frame,
    ) -> impl Fn(f64, &DVector<f64>) -> Result<DVector<f64>, SiderealError> + 'a {
        move |t, x| {
            let instant = reference + Duration::from_seconds(t);
            let mut dxdt = DVector::zeros(x.len());
            for context in &self.contexts {
                let mut input = DVector::zeros(context.read_size);
                let mut cursor = 0;
                for (offset, size) in &context.read_plan {
                    input
                        .rows_mut(cursor, *size)
                        .copy_from(&x.rows(*offset, *size));
                    cursor += size;
                }

                let contribution = context.dynamics.compute_contribution(instant, &input, frame)?;
                let write_size: usize = context.write_plan.iter().map(|(_, size)| size).sum();
                if contribution.len() != write_size {
                    return Err(SiderealError::InvalidConfiguration(format!(
                        "{} produced {} rates for a write footprint of {}",
                        context.dynamics.name(),
                        contribution.len(),
                        write_size
                    )));
                }

                let mut cursor = 0;
                for (offset, size) in &context.write_plan {
                    for i in 0..*size {
                        dxdt[offset + i] += contribution[cursor + i];
                    }
                    cursor += size;
                }
            }
            Ok(dxdt)
        }
    }

    /// Stacks the propagated coordinates out of `state`, in this
    /// propagator's layout. The state must carry every subset the dynamics
    /// write.
    fn initial_vector(&self, state: &State) -> Result<DVector<f64>, SiderealError> {
        let mut x0 = DVector::zeros(self.broker.n_coordinates());
        for subset in self.broker.subsets() {
            let values = state.extract(subset).map_err(|_| {
                SiderealError::BrokerMismatch(format!(
                    "initial state does not carry {subset}, which the dynamics propagate"
                ))
            })?;
            let offset = self.broker.subset_offset(subset)?;
            x0.rows_mut(offset, subset.len()).copy_from(&values);
        }
        Ok(x0)
    }

    fn rebuild(&self, reference: Epoch, frame: &Frame, t: f64, x: DVector<f64>) -> State {
        // The broker sized the vector, so construction cannot fail.
        State::new(
            reference + Duration::from_seconds(t),
            x,
            frame.clone(),
            self.broker.clone(),
        )
        .unwrap_or_else(|_| unreachable!("propagated vector matches its own broker"))
    }

    /// The state at `instant`, forward or backward of the initial state.
    pub fn calculate_state_at(
        &self,
        state: &State,
        instant: Epoch,
    ) -> Result<State, SiderealError> {
        let x0 = self.initial_vector(state)?;
        let reference = state.instant();
        let frame = state.frame().clone();
        let span = (instant - reference).to_seconds();
        let xf = self
            .solver
            .integrate(&x0, 0.0, span, self.system(reference, &frame))?;
        Ok(self.rebuild(reference, &frame, span, xf))
    }

    /// The states at each of `instants`, which must be sorted ascending.
    /// The propagation threads through them in one sweep.
    pub fn calculate_states_at(
        &self,
        state: &State,
        instants: &[Epoch],
    ) -> Result<Vec<State>, SiderealError> {
        if instants.is_empty() {
            return Ok(Vec::new());
        }
        if instants.windows(2).any(|pair| pair[1] < pair[0]) {
            return Err(SiderealError::InvalidConfiguration(
                "instants must be sorted in ascending order".to_string(),
            ));
        }

        let reference = state.instant();
        let frame = state.frame().clone();
        let system = self.system(reference, &frame);

        let mut states = Vec::with_capacity(instants.len());
        let mut x = self.initial_vector(state)?;
        let mut t = 0.0;
        for instant in instants {
            let target = (*instant - reference).to_seconds();
            if target != t {
                x = self.solver.integrate(&x, t, target, &system)?;
                t = target;
            }
            states.push(self.rebuild(reference, &frame, t, x.clone()));
        }
        Ok(states)
    }

    /// Propagates until the event condition triggers, or at most for
    /// `maximum_duration`. The condition's target must already be bound
    /// (see [`EventCondition::update_target`]); observed states follow the
    /// solver's log type.
    pub fn calculate_state_to_condition(
        &self,
        state: &State,
        maximum_duration: Duration,
        condition: &dyn EventCondition,
    ) -> Result<ConditionSolution, SiderealError> {
        let x0 = self.initial_vector(state)?;
        let reference = state.instant();
        let frame = state.frame().clone();
        let span = maximum_duration.to_seconds();

        let system = self.system(reference, &frame);
        let as_state =
            |t: f64, x: &DVector<f64>| self.rebuild(reference, &frame, t, x.clone());

        let mut observed_states = Vec::new();
        let outcome = self.solver.integrate_until_condition(
            &x0,
            0.0,
            span,
            &system,
            |t, x| condition.evaluate(&as_state(t, x)),
            |t, x, pt, px| condition.is_satisfied(&as_state(t, x), &as_state(pt, px)),
            &self.root_solver,
            |t, x| observed_states.push(as_state(t, x)),
        )?;

        Ok(ConditionSolution {
            state: self.rebuild(reference, &frame, outcome.time, outcome.state),
            observed_states,
            condition_is_satisfied: outcome.condition_is_satisfied,
            iteration_count: outcome.iteration_count,
            root_solver_has_converged: outcome.root_solver_has_converged,
        })
    }
}

impl fmt::Display for Propagator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Propagator[{}; ", self.solver.stepper())?;
        for (i, dynamics) in self.dynamics.iter().enumerate() {
            if i > 0 {
                write!(f, " + ")?;
            }
            write!(f, "{dynamics}")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cosmic::{CoordinateSubset, Earth};
    use crate::dynamics::{CentralBodyGravity, PositionDerivative};
    use crate::linalg::Vector3;
    use approx::assert_relative_eq;

    fn two_body_propagator() -> Propagator {
        Propagator::new(
            NumericalSolver::default(),
            vec![
                Arc::new(PositionDerivative::new()),
                Arc::new(CentralBodyGravity::new(Arc::new(Earth::new()))),
            ],
        )
        .unwrap()
    }

    fn circular_state() -> State {
        let epoch = Epoch::from_gregorian_utc_at_midnight(2023, 1, 1);
        let r = 7.0e6;
        let v = (Earth::GM / r).sqrt();
        State::from_position_velocity(
            epoch,
            &Vector3::new(r, 0.0, 0.0),
            &Vector3::new(0.0, v, 0.0),
            Frame::inertial("GCRF"),
        )
    }

    #[test]
    fn broker_is_the_union_of_write_subsets() {
        let propagator = two_body_propagator();
        let broker = propagator.broker();
        assert_eq!(broker.n_coordinates(), 6);
        assert!(broker.has_subset(&CoordinateSubset::CartesianPosition));
        assert!(broker.has_subset(&CoordinateSubset::CartesianVelocity));
    }

    #[test]
    fn unread_subset_is_a_broker_mismatch() {
        // Gravity alone reads the position, which nothing writes.
        let result = Propagator::new(
            NumericalSolver::default(),
            vec![Arc::new(CentralBodyGravity::new(Arc::new(Earth::new())))],
        );
        assert!(matches!(result, Err(SiderealError::BrokerMismatch(_))));
    }

    #[test]
    fn circular_orbit_returns_after_one_period() {
        let propagator = two_body_propagator();
        let state = circular_state();
        let period = std::f64::consts::TAU * (7.0e6f64.powi(3) / Earth::GM).sqrt();
        let along = propagator
            .calculate_state_at(&state, state.instant() + Duration::from_seconds(period))
            .unwrap();
        let drift = (along.position().unwrap() - state.position().unwrap()).norm();
        assert!(drift < 1.0e-3, "drift after one period: {drift} m");
    }

    #[test]
    fn states_at_threads_a_single_sweep() {
        let propagator = two_body_propagator();
        let state = circular_state();
        let instants: Vec<Epoch> = (0..5)
            .map(|i| state.instant() + Duration::from_seconds(i as f64 * 60.0))
            .collect();
        let states = propagator.calculate_states_at(&state, &instants).unwrap();
        assert_eq!(states.len(), 5);
        assert_relative_eq!(
            states[0].position().unwrap().norm(),
            7.0e6,
            max_relative = 1e-9
        );
        let mut reversed = instants.clone();
        reversed.reverse();
        assert!(propagator.calculate_states_at(&state, &reversed).is_err());
    }

    #[test]
    fn backward_propagation_undoes_forward() {
        let propagator = two_body_propagator();
        let state = circular_state();
        let later = state.instant() + Duration::from_seconds(1_800.0);
        let forward = propagator.calculate_state_at(&state, later).unwrap();
        let back = propagator
            .calculate_state_at(&forward, state.instant())
            .unwrap();
        let drift = (back.position().unwrap() - state.position().unwrap()).norm();
        assert!(drift < 1e-4, "round trip drift: {drift} m");
    }
}
