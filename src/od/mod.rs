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

//! Orbit determination: the batch least-squares driver wrapping the
//! propagator as an observation model.

use crate::cosmic::{CoordinateSubset, State, StateBuilder};
use crate::errors::SiderealError;
use crate::linalg::DVector;
use crate::propagators::Propagator;
use crate::time::Epoch;
use std::collections::HashMap;
use std::fmt;

/// The generic damped Gauss-Newton solver.
pub mod lsq;
pub use self::lsq::*;

/// Outcome of an orbit-determination solve.
#[derive(Clone, Debug)]
pub struct OdAnalysis {
    /// The full determined state at the initial-guess epoch.
    pub determined_state: State,
    pub solver_analysis: LeastSquaresAnalysis,
}

/// Batch least-squares orbit determination over a propagator.
///
/// The estimated vector is the reduction of the initial state onto the
/// estimation subsets; the observation model propagates the expanded state
/// to the reference instants and reduces each propagated state onto the
/// reference subsets.
pub struct ODLeastSquaresSolver {
    propagator: Propagator,
    solver: LeastSquaresSolver,
}

impl ODLeastSquaresSolver {
    pub fn new(propagator: Propagator, solver: LeastSquaresSolver) -> Self {
        Self { propagator, solver }
    }

    pub fn propagator(&self) -> &Propagator {
        &self.propagator
    }

    pub fn solver(&self) -> &LeastSquaresSolver {
        &self.solver
    }

    /// Estimates the state at `initial_guess.instant()` from time-tagged
    /// reference states.
    ///
    /// `estimation_subsets` selects which part of the state is estimated
    /// (empty: every subset of the guess). Sigmas are per subset:
    /// `reference_sigmas` weighs the observations (missing subsets default
    /// to unit sigma), and a non-empty `initial_guess_sigmas` adds a priori
    /// rows tying the solution to the guess.
    pub fn estimate_state(
        &self,
        initial_guess: &State,
        references: &[State],
        estimation_subsets: &[CoordinateSubset],
        initial_guess_sigmas: &HashMap<CoordinateSubset, f64>,
        reference_sigmas: &HashMap<CoordinateSubset, f64>,
    ) -> Result<OdAnalysis, SiderealError> {
        if references.is_empty() {
            return Err(SiderealError::InvalidConfiguration(
                "no reference states to fit against".to_string(),
            ));
        }
        let observation_subsets: Vec<CoordinateSubset> =
            references[0].broker().subsets().to_vec();
        if references
            .iter()
            .any(|reference| reference.broker().as_ref() != references[0].broker().as_ref())
        {
            return Err(SiderealError::BrokerMismatch(
                "reference states must share a coordinate layout".to_string(),
            ));
        }

        let instants: Vec<Epoch> = references.iter().map(State::instant).collect();
        if instants.windows(2).any(|pair| pair[1] < pair[0]) {
            return Err(SiderealError::InvalidConfiguration(
                "reference states must be sorted by instant".to_string(),
            ));
        }

        // The estimated part of the state, and the full propagated layout.
        let estimation_builder = StateBuilder::new(
            initial_guess.frame().clone(),
            if estimation_subsets.is_empty() {
                initial_guess.broker().subsets().to_vec()
            } else {
                estimation_subsets.to_vec()
            },
        )?;
        for subset in estimation_builder.subsets() {
            if !initial_guess.has_subset(subset) {
                return Err(SiderealError::BrokerMismatch(format!(
                    "the initial guess does not carry the estimated subset {subset}"
                )));
            }
        }
        let propagation_builder = StateBuilder::from_state(initial_guess);
        let epoch = initial_guess.instant();

        // Stack the observations and their sigmas.
        let observation_size: usize =
            observation_subsets.iter().map(CoordinateSubset::len).sum();
        let mut observations = DVector::zeros(observation_size * references.len());
        for (i, reference) in references.iter().enumerate() {
            observations
                .rows_mut(i * observation_size, observation_size)
                .copy_from(&reference.extract_many(&observation_subsets)?);
        }
        let mut observation_sigmas = DVector::from_element(observations.len(), 1.0);
        for (i, _) in references.iter().enumerate() {
            let mut cursor = 0;
            for subset in &observation_subsets {
                if let Some(sigma) = reference_sigmas.get(subset) {
                    for k in 0..subset.len() {
                        observation_sigmas[i * observation_size + cursor + k] = *sigma;
                    }
                }
                cursor += subset.len();
            }
        }

        let apriori_sigmas = if initial_guess_sigmas.is_empty() {
            None
        } else {
            let mut sigmas = DVector::zeros(estimation_builder.broker().n_coordinates());
            let mut cursor = 0;
            for subset in estimation_builder.subsets() {
                let sigma = initial_guess_sigmas.get(subset).ok_or_else(|| {
                    SiderealError::InvalidConfiguration(format!(
                        "no a priori sigma for the estimated subset {subset}"
                    ))
                })?;
                for k in 0..subset.len() {
                    sigmas[cursor + k] = *sigma;
                }
                cursor += subset.len();
            }
            Some(sigmas)
        };

        let generate = |x: &DVector<f64>| -> Result<DVector<f64>, SiderealError> {
            let estimated = estimation_builder.build(epoch, x.clone())?;
            let full = propagation_builder.expand(&estimated, initial_guess)?;
            let propagated = self.propagator.calculate_states_at(&full, &instants)?;
            let mut predicted = DVector::zeros(observation_size * propagated.len());
            for (i, state) in propagated.iter().enumerate() {
                predicted
                    .rows_mut(i * observation_size, observation_size)
                    .copy_from(&state.extract_many(&observation_subsets)?);
            }
            Ok(predicted)
        };

        let x0 = estimation_builder.reduce(initial_guess)?.coordinates().clone();
        let analysis = self.solver.solve(
            &x0,
            &observations,
            &observation_sigmas,
            apriori_sigmas.as_ref(),
            generate,
        )?;

        let determined_state = propagation_builder.expand(
            &estimation_builder.build(epoch, analysis.solution.clone())?,
            initial_guess,
        )?;

        info!(
            "orbit determination {} after {} iterations (rms {:.3e})",
            if analysis.has_converged {
                "converged"
            } else {
                "stopped"
            },
            analysis.iteration_count,
            analysis.rms_error
        );

        Ok(OdAnalysis {
            determined_state,
            solver_analysis: analysis,
        })
    }
}

impl fmt::Display for ODLeastSquaresSolver {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "OD over {} with {}", self.propagator, self.solver)
    }
}
