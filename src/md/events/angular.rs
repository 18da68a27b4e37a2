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

use super::{EventCondition, Evaluator, Target, TargetKind};
use crate::cosmic::State;
use crate::errors::SiderealError;
use crate::utils::{shortest_arc, wrap_to_two_pi};
use serde_derive::{Deserialize, Serialize};
use std::fmt;

/// Criterion of an angular condition.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum AngularCriterion {
    PositiveCrossing,
    NegativeCrossing,
    AnyCrossing,
    /// Satisfied while the wrapped angle lies inside an inclusive arc,
    /// running counterclockwise from the first bound to the second.
    WithinRange { start_rad: f64, end_rad: f64 },
}

impl fmt::Display for AngularCriterion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::PositiveCrossing => write!(f, "positive crossing"),
            Self::NegativeCrossing => write!(f, "negative crossing"),
            Self::AnyCrossing => write!(f, "any crossing"),
            Self::WithinRange { start_rad, end_rad } => {
                write!(f, "within [{start_rad}, {end_rad}] rad")
            }
        }
    }
}

/// A condition over an angle-valued evaluator, wrapped to [0, 2π).
///
/// Crossings are detected on the signed shortest arc from the target, so a
/// target near zero triggers cleanly from either side of the wrap.
#[derive(Clone)]
pub struct AngularCondition {
    name: String,
    criterion: AngularCriterion,
    evaluator: Evaluator,
    target: Target,
}

impl AngularCondition {
    pub fn new(
        name: &str,
        criterion: AngularCriterion,
        evaluator: Evaluator,
        target: Target,
    ) -> Self {
        Self {
            name: name.to_string(),
            criterion,
            evaluator,
            target,
        }
    }

    /// A within-range condition; the target value is unused by the
    /// criterion and kept at the arc start for display.
    pub fn within_range(
        name: &str,
        evaluator: Evaluator,
        start_rad: f64,
        end_rad: f64,
    ) -> Self {
        Self::new(
            name,
            AngularCriterion::WithinRange {
                start_rad: wrap_to_two_pi(start_rad),
                end_rad: wrap_to_two_pi(end_rad),
            },
            evaluator,
            Target::absolute(wrap_to_two_pi(start_rad)),
        )
    }

    pub fn criterion(&self) -> AngularCriterion {
        self.criterion
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    fn wrapped(&self, state: &State) -> Result<f64, SiderealError> {
        Ok(wrap_to_two_pi((self.evaluator)(state)?))
    }

    /// Whether the wrapped angle lies on the inclusive counterclockwise arc
    /// from `start` to `end`. Bound hits count as inside.
    fn is_within(angle: f64, start: f64, end: f64) -> bool {
        let span = wrap_to_two_pi(end - start);
        let from_start = wrap_to_two_pi(angle - start);
        if span == 0.0 {
            // A degenerate arc only contains its endpoint.
            return from_start == 0.0;
        }
        from_start <= span
    }
}

impl EventCondition for AngularCondition {
    fn name(&self) -> &str {
        &self.name
    }

    /// Signed shortest arc from the target, in [-π, π); for within-range,
    /// the signed distance to the nearest arc bound, positive inside.
    fn evaluate(&self, state: &State) -> Result<f64, SiderealError> {
        let angle = self.wrapped(state)?;
        match self.criterion {
            AngularCriterion::WithinRange { start_rad, end_rad } => {
                let to_start = shortest_arc(start_rad, angle);
                let to_end = shortest_arc(angle, end_rad);
                if Self::is_within(angle, start_rad, end_rad) {
                    Ok(to_start.abs().min(to_end.abs()))
                } else {
                    Ok(-to_start.abs().min(to_end.abs()))
                }
            }
            _ => Ok(shortest_arc(
                wrap_to_two_pi(self.target.value + self.target.offset),
                angle,
            )),
        }
    }

    fn is_satisfied(&self, current: &State, previous: &State) -> Result<bool, SiderealError> {
        match self.criterion {
            AngularCriterion::WithinRange { start_rad, end_rad } => {
                Ok(Self::is_within(self.wrapped(current)?, start_rad, end_rad))
            }
            AngularCriterion::PositiveCrossing => {
                Ok(self.evaluate(previous)? < 0.0 && self.evaluate(current)? > 0.0)
            }
            AngularCriterion::NegativeCrossing => {
                Ok(self.evaluate(previous)? > 0.0 && self.evaluate(current)? < 0.0)
            }
            AngularCriterion::AnyCrossing => {
                let current = self.evaluate(current)?;
                let previous = self.evaluate(previous)?;
                Ok((current > 0.0) == (previous < 0.0))
            }
        }
    }

    fn update_target(&mut self, state: &State) -> Result<(), SiderealError> {
        if self.target.kind == TargetKind::Relative {
            self.target.offset = self.wrapped(state)?;
        }
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn EventCondition> {
        Box::new(self.clone())
    }
}

impl fmt::Display for AngularCondition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.criterion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cosmic::Frame;
    use crate::linalg::Vector3;
    use crate::time::Epoch;
    use std::f64::consts::{FRAC_PI_2, PI, TAU};
    use std::sync::Arc;

    fn state_with_angle(angle: f64) -> State {
        // The angle rides in the x position coordinate.
        State::from_position_velocity(
            Epoch::from_gregorian_utc_at_midnight(2023, 1, 1),
            &Vector3::new(angle, 0.0, 0.0),
            &Vector3::zeros(),
            Frame::inertial("GCRF"),
        )
    }

    fn angle_evaluator() -> Evaluator {
        Arc::new(|state: &State| Ok(state.position()?[0]))
    }

    #[test]
    fn crossing_across_the_wrap() {
        let condition = AngularCondition::new(
            "wrap",
            AngularCriterion::PositiveCrossing,
            angle_evaluator(),
            Target::absolute(0.0),
        );
        // 2π - 0.1 → 0.1 crosses zero upward through the wrap.
        assert!(condition
            .is_satisfied(&state_with_angle(0.1), &state_with_angle(TAU - 0.1))
            .unwrap());
        // Moving away from the target is not a crossing.
        assert!(!condition
            .is_satisfied(&state_with_angle(TAU - 0.1), &state_with_angle(0.1))
            .unwrap());
    }

    #[test]
    fn within_range_includes_the_bounds() {
        let condition = AngularCondition::within_range(
            "arc",
            angle_evaluator(),
            FRAC_PI_2,
            PI,
        );
        let previous = state_with_angle(0.0);
        for (angle, expected) in [
            (FRAC_PI_2, true),
            (PI, true),
            (2.0, true),
            (0.3, false),
            (PI + 0.3, false),
        ] {
            assert_eq!(
                condition
                    .is_satisfied(&state_with_angle(angle), &previous)
                    .unwrap(),
                expected,
                "angle {angle}"
            );
        }
    }

    #[test]
    fn within_range_evaluation_sign_tracks_membership() {
        let condition = AngularCondition::within_range(
            "arc",
            angle_evaluator(),
            FRAC_PI_2,
            PI,
        );
        assert!(condition.evaluate(&state_with_angle(2.0)).unwrap() > 0.0);
        assert!(condition.evaluate(&state_with_angle(0.3)).unwrap() < 0.0);
    }
}
