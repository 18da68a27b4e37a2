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

use super::events::EventCondition;
use crate::cosmic::{State, StateBuilder};
use crate::dynamics::{Dynamics, Thruster};
use crate::errors::SiderealError;
use crate::propagators::{NumericalSolver, Propagator};
use crate::time::Duration;
use crate::utils::STANDARD_GRAVITY;
use std::fmt;
use std::sync::Arc;

/// Whether a segment coasts or burns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SegmentKind {
    Coast,
    Maneuver,
}

/// One event-terminated leg of a sequence: dynamics, a termination
/// condition, and the solver configuration to run them under.
pub struct Segment {
    name: String,
    termination: Box<dyn EventCondition>,
    dynamics: Vec<Arc<dyn Dynamics>>,
    solver: NumericalSolver,
    thruster: Option<Arc<Thruster>>,
}

impl Segment {
    /// A ballistic segment under the given dynamics.
    pub fn coast(
        name: &str,
        termination: Box<dyn EventCondition>,
        dynamics: Vec<Arc<dyn Dynamics>>,
        solver: NumericalSolver,
    ) -> Self {
        Self {
            name: name.to_string(),
            termination,
            dynamics,
            solver,
            thruster: None,
        }
    }

    /// A burn segment: the thruster joins the given dynamics, and the
    /// solution carries the propellant and impulse accounting.
    pub fn maneuver(
        name: &str,
        termination: Box<dyn EventCondition>,
        thruster: Arc<Thruster>,
        dynamics: Vec<Arc<dyn Dynamics>>,
        solver: NumericalSolver,
    ) -> Self {
        let mut all: Vec<Arc<dyn Dynamics>> = dynamics;
        all.push(thruster.clone() as Arc<dyn Dynamics>);
        Self {
            name: name.to_string(),
            termination,
            dynamics: all,
            solver,
            thruster: Some(thruster),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> SegmentKind {
        if self.thruster.is_some() {
            SegmentKind::Maneuver
        } else {
            SegmentKind::Coast
        }
    }

    pub fn dynamics(&self) -> &[Arc<dyn Dynamics>] {
        &self.dynamics
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} segment '{}' until {}",
            match self.kind() {
                SegmentKind::Coast => "coast",
                SegmentKind::Maneuver => "maneuver",
            },
            self.name,
            self.termination.name()
        )
    }
}

/// Why a segment stopped.
#[derive(Clone, Debug, PartialEq)]
pub enum SegmentTermination {
    /// The termination condition triggered.
    Triggered,
    /// The segment ran into its maximum duration first.
    MaxDuration,
    /// A dynamics failed mid-propagation.
    Failed(SiderealError),
}

/// Propellant and impulse accounting of a maneuver segment, derived from the
/// thruster's specific impulse and the observed mass drop.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ManeuverSummary {
    pub mass_consumed_kg: f64,
    pub delta_v_m_s: f64,
    pub impulse_n_s: f64,
}

/// The executed trace of one segment.
#[derive(Clone, Debug)]
pub struct SegmentSolution {
    pub name: String,
    /// Observed states, expanded onto the full sequence layout; the last
    /// entry seeds the next segment.
    pub states: Vec<State>,
    pub termination: SegmentTermination,
    pub elapsed: Duration,
    pub maneuver: Option<ManeuverSummary>,
}

impl SegmentSolution {
    pub fn final_state(&self) -> &State {
        // The trace always carries at least the incoming state.
        &self.states[self.states.len() - 1]
    }
}

/// The executed trace of a sequence.
#[derive(Clone, Debug)]
pub struct SequenceSolution {
    /// Segment solutions in execution order.
    pub segment_solutions: Vec<SegmentSolution>,
    /// False when a segment timed out or failed and the sequence stopped
    /// early.
    pub execution_is_complete: bool,
}

impl SequenceSolution {
    pub fn final_state(&self) -> Option<&State> {
        self.segment_solutions
            .last()
            .map(SegmentSolution::final_state)
    }

    /// Total propellant consumed across maneuver segments.
    pub fn mass_consumed(&self) -> f64 {
        self.segment_solutions
            .iter()
            .filter_map(|solution| solution.maneuver.as_ref())
            .map(|summary| summary.mass_consumed_kg)
            .sum()
    }
}

/// Ordered segments executed back to back, the final state of each seeding
/// the next.
///
/// Before each segment runs, its termination condition's relative targets
/// are rebound against the incoming state. Subsets untouched by a segment's
/// dynamics (the mass during a coast, say) thread through unchanged. A
/// timed-out segment stops the sequence with `MaxDuration`; a failing
/// dynamics stops it with `Failed`.
pub struct Sequence {
    segments: Vec<Segment>,
    common_dynamics: Vec<Arc<dyn Dynamics>>,
    repetition_count: usize,
    segment_maximum_duration: Duration,
}

impl Sequence {
    pub fn new(segments: Vec<Segment>) -> Result<Self, SiderealError> {
        if segments.is_empty() {
            return Err(SiderealError::InvalidConfiguration(
                "a sequence needs at least one segment".to_string(),
            ));
        }
        Ok(Self {
            segments,
            common_dynamics: Vec::new(),
            repetition_count: 1,
            segment_maximum_duration: Duration::from_seconds(30.0 * 86_400.0),
        })
    }

    /// Dynamics appended to every segment (a shared gravity model, say).
    pub fn with_common_dynamics(mut self, dynamics: Vec<Arc<dyn Dynamics>>) -> Self {
        self.common_dynamics = dynamics;
        self
    }

    /// Runs the segment list this many times over.
    pub fn with_repetition_count(mut self, count: usize) -> Result<Self, SiderealError> {
        if count == 0 {
            return Err(SiderealError::InvalidConfiguration(
                "the repetition count cannot be zero".to_string(),
            ));
        }
        self.repetition_count = count;
        Ok(self)
    }

    /// The per-segment timeout.
    pub fn with_segment_maximum_duration(mut self, duration: Duration) -> Result<Self, SiderealError> {
        if duration <= Duration::ZERO {
            return Err(SiderealError::InvalidConfiguration(
                "the segment maximum duration must be strictly positive".to_string(),
            ));
        }
        self.segment_maximum_duration = duration;
        Ok(self)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Executes the sequence from an initial state.
    ///
    /// The initial state must carry every subset any segment propagates;
    /// per-segment failures terminate the sequence and are reported in the
    /// failing segment's solution rather than raised.
    pub fn solve(&self, initial_state: &State) -> Result<SequenceSolution, SiderealError> {
        let template = StateBuilder::from_state(initial_state);
        let mut current = initial_state.clone();
        let mut segment_solutions = Vec::new();

        for repetition in 0..self.repetition_count {
            for segment in &self.segments {
                let mut dynamics = segment.dynamics.clone();
                dynamics.extend(self.common_dynamics.iter().cloned());
                let propagator = Propagator::new(segment.solver, dynamics)?;

                let mut condition = segment.termination.clone();
                condition.update_target(&current)?;

                info!(
                    "running {} (repetition {repetition}) from {}",
                    segment,
                    current.instant()
                );

                let outcome = propagator.calculate_state_to_condition(
                    &current,
                    self.segment_maximum_duration,
                    condition.as_ref(),
                );

                match outcome {
                    Err(error) => {
                        warn!("segment '{}' failed: {error}", segment.name);
                        segment_solutions.push(SegmentSolution {
                            name: segment.name.clone(),
                            states: vec![current.clone()],
                            termination: SegmentTermination::Failed(error),
                            elapsed: Duration::ZERO,
                            maneuver: None,
                        });
                        return Ok(SequenceSolution {
                            segment_solutions,
                            execution_is_complete: false,
                        });
                    }
                    Ok(solution) => {
                        let mut states = Vec::with_capacity(solution.observed_states.len());
                        for observed in &solution.observed_states {
                            states.push(template.expand(observed, &current)?);
                        }
                        let final_state = template.expand(&solution.state, &current)?;
                        if states.last() != Some(&final_state) {
                            states.push(final_state.clone());
                        }

                        let elapsed = final_state.instant() - current.instant();
                        let maneuver = match &segment.thruster {
                            Some(thruster) => Some(Self::maneuver_summary(
                                thruster, &current, &final_state,
                            )?),
                            None => None,
                        };

                        let triggered = solution.condition_is_satisfied;
                        segment_solutions.push(SegmentSolution {
                            name: segment.name.clone(),
                            states,
                            termination: if triggered {
                                SegmentTermination::Triggered
                            } else {
                                SegmentTermination::MaxDuration
                            },
                            elapsed,
                            maneuver,
                        });

                        if !triggered {
                            warn!(
                                "segment '{}' hit its maximum duration of {}",
                                segment.name, self.segment_maximum_duration
                            );
                            return Ok(SequenceSolution {
                                segment_solutions,
                                execution_is_complete: false,
                            });
                        }

                        current = final_state;
                    }
                }
            }
        }

        Ok(SequenceSolution {
            segment_solutions,
            execution_is_complete: true,
        })
    }

    fn maneuver_summary(
        thruster: &Thruster,
        before: &State,
        after: &State,
    ) -> Result<ManeuverSummary, SiderealError> {
        let mass_before = before.mass()?;
        let mass_after = after.mass()?;
        let consumed = mass_before - mass_after;
        let exhaust_velocity = thruster.propulsion().specific_impulse() * STANDARD_GRAVITY;
        Ok(ManeuverSummary {
            mass_consumed_kg: consumed,
            delta_v_m_s: exhaust_velocity * (mass_before / mass_after).ln(),
            impulse_n_s: consumed * exhaust_velocity,
        })
    }
}
