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

use crate::cosmic::State;
use crate::errors::SiderealError;
use crate::time::{Duration, Epoch};
use serde_derive::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Angular conditions over wrapped evaluators.
pub mod angular;
pub use self::angular::*;

/// And/or composition of conditions.
pub mod logical;
pub use self::logical::*;

/// Conditions over classical orbital elements.
pub mod orbital;
pub use self::orbital::*;

/// Whether a target value is meant as-is or relative to a reference state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetKind {
    Absolute,
    /// The offset is rebound from a reference state by `update_target`.
    Relative,
}

/// The value an event condition drives its evaluator toward.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Target {
    pub value: f64,
    pub kind: TargetKind,
    /// Evaluator value at the reference state, for relative targets.
    pub offset: f64,
}

impl Target {
    pub fn absolute(value: f64) -> Self {
        Self {
            value,
            kind: TargetKind::Absolute,
            offset: 0.0,
        }
    }

    pub fn relative(value: f64) -> Self {
        Self {
            value,
            kind: TargetKind::Relative,
            offset: 0.0,
        }
    }
}

/// A scalar condition over states, driving the propagator's conditioned
/// stop.
///
/// `evaluate` is the signed distance from the target that the root solver
/// drives to zero; `is_satisfied` applies the criterion to a
/// (current, previous) pair of states; `update_target` rebinds relative
/// targets from the incoming state before a segment runs. Evaluation is
/// deterministic given the state.
pub trait EventCondition: Send + Sync {
    fn name(&self) -> &str;

    fn evaluate(&self, state: &State) -> Result<f64, SiderealError>;

    fn is_satisfied(&self, current: &State, previous: &State) -> Result<bool, SiderealError>;

    /// Rebinds relative targets against a reference state. Absolute targets
    /// are untouched.
    fn update_target(&mut self, state: &State) -> Result<(), SiderealError>;

    fn clone_box(&self) -> Box<dyn EventCondition>;
}

impl Clone for Box<dyn EventCondition> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

impl fmt::Display for dyn EventCondition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// How a real condition decides satisfaction from the signed evaluations of
/// the previous and current states.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Criterion {
    PositiveCrossing,
    NegativeCrossing,
    AnyCrossing,
    StrictlyPositive,
    StrictlyNegative,
}

impl Criterion {
    fn is_satisfied(&self, current: f64, previous: f64) -> bool {
        match self {
            Self::PositiveCrossing => previous < 0.0 && current > 0.0,
            Self::NegativeCrossing => previous > 0.0 && current < 0.0,
            Self::AnyCrossing => (current > 0.0) == (previous < 0.0),
            Self::StrictlyPositive => current > 0.0,
            Self::StrictlyNegative => current < 0.0,
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Self::PositiveCrossing => "positive crossing",
            Self::NegativeCrossing => "negative crossing",
            Self::AnyCrossing => "any crossing",
            Self::StrictlyPositive => "strictly positive",
            Self::StrictlyNegative => "strictly negative",
        };
        write!(f, "{name}")
    }
}

/// The evaluator signature shared by the scalar conditions.
pub type Evaluator = Arc<dyn Fn(&State) -> Result<f64, SiderealError> + Send + Sync>;

/// A condition over a real-valued evaluator:
/// `evaluate(s) = evaluator(s) - (target.value + target.offset)`.
#[derive(Clone)]
pub struct RealCondition {
    name: String,
    criterion: Criterion,
    evaluator: Evaluator,
    target: Target,
}

impl RealCondition {
    pub fn new(name: &str, criterion: Criterion, evaluator: Evaluator, target: Target) -> Self {
        Self {
            name: name.to_string(),
            criterion,
            evaluator,
            target,
        }
    }

    /// Triggers when the elapsed time since the target was bound reaches
    /// `duration`: the workhorse "+300 s from now" segment terminator.
    pub fn duration(criterion: Criterion, duration: Duration) -> Self {
        let reference = Epoch::from_gregorian_utc(2000, 1, 1, 12, 0, 0, 0);
        Self::new(
            "Duration",
            criterion,
            Arc::new(move |state: &State| Ok((state.instant() - reference).to_seconds())),
            Target::relative(duration.to_seconds()),
        )
    }

    pub fn criterion(&self) -> Criterion {
        self.criterion
    }

    pub fn target(&self) -> &Target {
        &self.target
    }
}

impl EventCondition for RealCondition {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, state: &State) -> Result<f64, SiderealError> {
        Ok((self.evaluator)(state)? - (self.target.value + self.target.offset))
    }

    fn is_satisfied(&self, current: &State, previous: &State) -> Result<bool, SiderealError> {
        Ok(self
            .criterion
            .is_satisfied(self.evaluate(current)?, self.evaluate(previous)?))
    }

    fn update_target(&mut self, state: &State) -> Result<(), SiderealError> {
        if self.target.kind == TargetKind::Relative {
            self.target.offset = (self.evaluator)(state)?;
        }
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn EventCondition> {
        Box::new(self.clone())
    }
}

impl fmt::Display for RealCondition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} ({}, target {} {:+})",
            self.name, self.criterion, self.target.value, self.target.offset
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cosmic::Frame;
    use crate::linalg::Vector3;
    use rstest::rstest;

    fn state_with_x(x: f64) -> State {
        State::from_position_velocity(
            Epoch::from_gregorian_utc_at_midnight(2023, 1, 1),
            &Vector3::new(x, 0.0, 0.0),
            &Vector3::zeros(),
            Frame::inertial("GCRF"),
        )
    }

    fn x_evaluator() -> Evaluator {
        Arc::new(|state: &State| Ok(state.position()?[0]))
    }

    #[rstest]
    #[case(Criterion::PositiveCrossing, -1.0, 1.0, true)]
    #[case(Criterion::PositiveCrossing, 1.0, -1.0, false)]
    #[case(Criterion::NegativeCrossing, 1.0, -1.0, true)]
    #[case(Criterion::NegativeCrossing, -1.0, 1.0, false)]
    #[case(Criterion::AnyCrossing, -1.0, 1.0, true)]
    #[case(Criterion::AnyCrossing, 1.0, -1.0, true)]
    #[case(Criterion::AnyCrossing, 1.0, 2.0, false)]
    #[case(Criterion::StrictlyPositive, 1.0, 1.0, true)]
    #[case(Criterion::StrictlyNegative, 1.0, -1.0, false)]
    fn criteria(
        #[case] criterion: Criterion,
        #[case] previous: f64,
        #[case] current: f64,
        #[case] expected: bool,
    ) {
        let condition = RealCondition::new(
            "X",
            criterion,
            x_evaluator(),
            Target::absolute(0.0),
        );
        assert_eq!(
            condition
                .is_satisfied(&state_with_x(current), &state_with_x(previous))
                .unwrap(),
            expected
        );
    }

    #[test]
    fn evaluate_subtracts_value_and_offset() {
        let mut condition = RealCondition::new(
            "X",
            Criterion::PositiveCrossing,
            x_evaluator(),
            Target::relative(100.0),
        );
        condition.update_target(&state_with_x(7.0)).unwrap();
        // Offset bound to 7: evaluate(x) = x - (100 + 7).
        assert_eq!(condition.evaluate(&state_with_x(107.0)).unwrap(), 0.0);
        assert_eq!(condition.evaluate(&state_with_x(0.0)).unwrap(), -107.0);
    }

    #[test]
    fn duration_condition_counts_from_the_bound_state() {
        let mut condition =
            RealCondition::duration(Criterion::PositiveCrossing, Duration::from_seconds(300.0));
        let t0 = state_with_x(0.0);
        condition.update_target(&t0).unwrap();

        let later = State::from_position_velocity(
            t0.instant() + Duration::from_seconds(300.0),
            &Vector3::zeros(),
            &Vector3::zeros(),
            Frame::inertial("GCRF"),
        );
        assert!(condition.evaluate(&later).unwrap().abs() < 1e-9);
    }
}
