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

use super::{
    AngularCondition, AngularCriterion, Criterion, EventCondition, Evaluator, RealCondition,
    Target,
};
use crate::cosmic::State;
use crate::errors::SiderealError;
use crate::orbit::{KeplerianElements, OrbitalElement};
use std::sync::Arc;

/// Conditions over the instantaneous classical orbital elements.
///
/// The element is derived from the state's position and velocity under the
/// given gravitational parameter; states are expected in a body-centered
/// inertial frame. Real-valued elements produce a [`RealCondition`], angular
/// elements an [`AngularCondition`].
pub struct CoeCondition;

impl CoeCondition {
    fn evaluator(element: OrbitalElement, mu: f64) -> Evaluator {
        Arc::new(move |state: &State| {
            let elements =
                KeplerianElements::from_cartesian(&state.position()?, &state.velocity()?, mu)?;
            Ok(elements.element(element))
        })
    }

    /// A condition on the semi-major axis or eccentricity.
    pub fn real(
        element: OrbitalElement,
        criterion: Criterion,
        mu: f64,
        target: Target,
    ) -> Result<RealCondition, SiderealError> {
        if element.is_angular() {
            return Err(SiderealError::InvalidConfiguration(format!(
                "{element} is an angle; use CoeCondition::angular"
            )));
        }
        Ok(RealCondition::new(
            &format!("COE {element}"),
            criterion,
            Self::evaluator(element, mu),
            target,
        ))
    }

    /// A condition on an angular element (inclination, RAAN, AOP, or one of
    /// the anomalies).
    pub fn angular(
        element: OrbitalElement,
        criterion: AngularCriterion,
        mu: f64,
        target: Target,
    ) -> Result<AngularCondition, SiderealError> {
        if !element.is_angular() {
            return Err(SiderealError::InvalidConfiguration(format!(
                "{element} is not an angle; use CoeCondition::real"
            )));
        }
        Ok(AngularCondition::new(
            &format!("COE {element}"),
            criterion,
            Self::evaluator(element, mu),
            target,
        ))
    }

    /// Triggers at apoapsis: true anomaly crossing π.
    pub fn apoapsis(mu: f64) -> Box<dyn EventCondition> {
        Box::new(
            Self::angular(
                OrbitalElement::TrueAnomaly,
                AngularCriterion::AnyCrossing,
                mu,
                Target::absolute(std::f64::consts::PI),
            )
            .unwrap_or_else(|_| unreachable!("the true anomaly is angular")),
        )
    }

    /// Triggers at periapsis: true anomaly crossing zero.
    pub fn periapsis(mu: f64) -> Box<dyn EventCondition> {
        Box::new(
            Self::angular(
                OrbitalElement::TrueAnomaly,
                AngularCriterion::AnyCrossing,
                mu,
                Target::absolute(0.0),
            )
            .unwrap_or_else(|_| unreachable!("the true anomaly is angular")),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cosmic::Frame;
    use crate::time::Epoch;

    const MU: f64 = 3.986_004_418e14;

    fn state_at_true_anomaly(nu: f64) -> State {
        let elements = KeplerianElements::new(7.2e6, 0.05, 0.6, 0.0, 0.0, nu).unwrap();
        let (r, v) = elements.to_cartesian(MU).unwrap();
        State::from_position_velocity(
            Epoch::from_gregorian_utc_at_midnight(2023, 1, 1),
            &r,
            &v,
            Frame::inertial("GCRF"),
        )
    }

    #[test]
    fn sma_condition_evaluates_the_element() {
        let condition = CoeCondition::real(
            OrbitalElement::SemiMajorAxis,
            Criterion::PositiveCrossing,
            MU,
            Target::absolute(7.0e6),
        )
        .unwrap();
        let state = state_at_true_anomaly(0.3);
        // evaluate = a - target = 7.2e6 - 7.0e6.
        assert!((condition.evaluate(&state).unwrap() - 0.2e6).abs() < 1.0);
    }

    #[test]
    fn apoapsis_triggers_across_pi() {
        let condition = CoeCondition::apoapsis(MU);
        let before = state_at_true_anomaly(std::f64::consts::PI - 0.05);
        let after = state_at_true_anomaly(std::f64::consts::PI + 0.05);
        assert!(condition.is_satisfied(&after, &before).unwrap());
        assert!(!condition
            .is_satisfied(&state_at_true_anomaly(0.4), &state_at_true_anomaly(0.3))
            .unwrap());
    }

    #[test]
    fn angular_real_mixups_are_rejected() {
        assert!(CoeCondition::real(
            OrbitalElement::TrueAnomaly,
            Criterion::AnyCrossing,
            MU,
            Target::absolute(0.0)
        )
        .is_err());
        assert!(CoeCondition::angular(
            OrbitalElement::SemiMajorAxis,
            AngularCriterion::AnyCrossing,
            MU,
            Target::absolute(0.0)
        )
        .is_err());
    }
}
