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

use super::broker::CoordinateBroker;
use super::frame::Frame;
use super::subset::CoordinateSubset;
use crate::errors::SiderealError;
use crate::linalg::{DVector, Vector3};
use crate::time::Epoch;
use std::fmt;
use std::sync::Arc;

/// An instant, a flat coordinates vector, the frame those coordinates are
/// expressed in, and the broker that gives the vector its meaning.
///
/// States are value types: once built they never mutate; every operation
/// returns a new state.
#[derive(Clone, Debug)]
pub struct State {
    instant: Epoch,
    coordinates: DVector<f64>,
    frame: Frame,
    broker: Arc<CoordinateBroker>,
}

impl State {
    pub fn new(
        instant: Epoch,
        coordinates: DVector<f64>,
        frame: Frame,
        broker: Arc<CoordinateBroker>,
    ) -> Result<Self, SiderealError> {
        if coordinates.len() != broker.n_coordinates() {
            return Err(SiderealError::InvalidConfiguration(format!(
                "coordinates length {} does not match broker size {}",
                coordinates.len(),
                broker.n_coordinates()
            )));
        }
        Ok(Self {
            instant,
            coordinates,
            frame,
            broker,
        })
    }

    /// Convenience constructor for the common position + velocity state.
    pub fn from_position_velocity(
        instant: Epoch,
        position: &Vector3<f64>,
        velocity: &Vector3<f64>,
        frame: Frame,
    ) -> Self {
        let broker = Arc::new(CoordinateBroker::from_subsets(vec![
            CoordinateSubset::CartesianPosition,
            CoordinateSubset::CartesianVelocity,
        ]));
        let mut coordinates = DVector::zeros(6);
        coordinates.rows_mut(0, 3).copy_from(position);
        coordinates.rows_mut(3, 3).copy_from(velocity);
        Self {
            instant,
            coordinates,
            frame,
            broker,
        }
    }

    pub fn instant(&self) -> Epoch {
        self.instant
    }

    pub fn coordinates(&self) -> &DVector<f64> {
        &self.coordinates
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn broker(&self) -> &Arc<CoordinateBroker> {
        &self.broker
    }

    pub fn len(&self) -> usize {
        self.coordinates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }

    pub fn has_subset(&self, subset: &CoordinateSubset) -> bool {
        self.broker.has_subset(subset)
    }

    /// Extracts the coordinates of one subset.
    pub fn extract(&self, subset: &CoordinateSubset) -> Result<DVector<f64>, SiderealError> {
        self.broker.extract(&self.coordinates, subset)
    }

    /// Extracts several subsets stacked in the order requested.
    pub fn extract_many(
        &self,
        subsets: &[CoordinateSubset],
    ) -> Result<DVector<f64>, SiderealError> {
        self.broker.extract_many(&self.coordinates, subsets)
    }

    pub fn position(&self) -> Result<Vector3<f64>, SiderealError> {
        let r = self.extract(&CoordinateSubset::CartesianPosition)?;
        Ok(Vector3::new(r[0], r[1], r[2]))
    }

    pub fn velocity(&self) -> Result<Vector3<f64>, SiderealError> {
        let v = self.extract(&CoordinateSubset::CartesianVelocity)?;
        Ok(Vector3::new(v[0], v[1], v[2]))
    }

    pub fn mass(&self) -> Result<f64, SiderealError> {
        Ok(self.extract(&CoordinateSubset::Mass)?[0])
    }

    /// This state with every subset expressed in `frame`, subset by subset.
    pub fn in_frame(&self, frame: &Frame) -> Result<State, SiderealError> {
        if &self.frame == frame {
            return Ok(self.clone());
        }
        let mut coordinates = DVector::zeros(self.coordinates.len());
        for subset in self.broker.subsets() {
            let reframed = subset.in_frame(
                self.instant,
                &self.coordinates,
                &self.frame,
                frame,
                &self.broker,
            )?;
            let offset = self.broker.subset_offset(subset)?;
            coordinates
                .rows_mut(offset, subset.len())
                .copy_from(&reframed);
        }
        Ok(State {
            instant: self.instant,
            coordinates,
            frame: frame.clone(),
            broker: self.broker.clone(),
        })
    }

    /// Subset-wise sum with another state sharing this broker and frame.
    pub fn add(&self, other: &State) -> Result<State, SiderealError> {
        let other = self.reconcile(other)?;
        let mut coordinates = DVector::zeros(self.coordinates.len());
        for subset in self.broker.subsets() {
            let summed = subset.add(
                self.instant,
                &self.coordinates,
                &other.coordinates,
                &self.frame,
                &self.broker,
            )?;
            let offset = self.broker.subset_offset(subset)?;
            coordinates.rows_mut(offset, subset.len()).copy_from(&summed);
        }
        Ok(State {
            instant: self.instant,
            coordinates,
            frame: self.frame.clone(),
            broker: self.broker.clone(),
        })
    }

    /// Subset-wise difference with another state sharing this broker.
    pub fn subtract(&self, other: &State) -> Result<State, SiderealError> {
        let other = self.reconcile(other)?;
        let mut coordinates = DVector::zeros(self.coordinates.len());
        for subset in self.broker.subsets() {
            let diff = subset.subtract(
                self.instant,
                &self.coordinates,
                &other.coordinates,
                &self.frame,
                &self.broker,
            )?;
            let offset = self.broker.subset_offset(subset)?;
            coordinates.rows_mut(offset, subset.len()).copy_from(&diff);
        }
        Ok(State {
            instant: self.instant,
            coordinates,
            frame: self.frame.clone(),
            broker: self.broker.clone(),
        })
    }

    /// Brings `other` into this state's frame and checks broker agreement.
    fn reconcile(&self, other: &State) -> Result<State, SiderealError> {
        if self.broker.as_ref() != other.broker.as_ref() {
            return Err(SiderealError::BrokerMismatch(format!(
                "cannot combine states brokered as {} and {}",
                self.broker, other.broker
            )));
        }
        other.in_frame(&self.frame)
    }
}

impl PartialEq for State {
    /// Elementwise equality over shared subsets after frame reconciliation.
    fn eq(&self, other: &Self) -> bool {
        if self.instant != other.instant {
            return false;
        }
        let other = match other.in_frame(&self.frame) {
            Ok(other) => other,
            Err(_) => return false,
        };
        for subset in self.broker.subsets() {
            if !other.broker.has_subset(subset) {
                continue;
            }
            let ours = match self.extract(subset) {
                Ok(x) => x,
                Err(_) => return false,
            };
            let theirs = match other.extract(subset) {
                Ok(x) => x,
                Err(_) => return false,
            };
            if ours != theirs {
                return false;
            }
        }
        true
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "State @ {} in {}: {:?}",
            self.instant,
            self.frame,
            self.coordinates.as_slice()
        )
    }
}

/// Builds states over a fixed frame and subset layout, and reshapes states
/// structurally: `reduce` projects onto this builder's subsets, `expand`
/// injects a reduced state into a larger template.
#[derive(Clone, Debug)]
pub struct StateBuilder {
    frame: Frame,
    broker: Arc<CoordinateBroker>,
}

impl StateBuilder {
    pub fn new(frame: Frame, subsets: Vec<CoordinateSubset>) -> Result<Self, SiderealError> {
        if subsets.is_empty() {
            return Err(SiderealError::InvalidConfiguration(
                "a state builder needs at least one coordinate subset".to_string(),
            ));
        }
        Ok(Self {
            frame,
            broker: Arc::new(CoordinateBroker::from_subsets(subsets)),
        })
    }

    /// A builder replicating the frame and layout of an existing state.
    pub fn from_state(state: &State) -> Self {
        Self {
            frame: state.frame().clone(),
            broker: state.broker().clone(),
        }
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn broker(&self) -> &Arc<CoordinateBroker> {
        &self.broker
    }

    pub fn subsets(&self) -> &[CoordinateSubset] {
        self.broker.subsets()
    }

    /// Builds a state from a flat coordinates vector in this layout.
    pub fn build(&self, instant: Epoch, coordinates: DVector<f64>) -> Result<State, SiderealError> {
        State::new(instant, coordinates, self.frame.clone(), self.broker.clone())
    }

    /// Projects a state onto this builder's subsets, in this builder's
    /// frame. Every subset of this builder must exist in the input.
    pub fn reduce(&self, state: &State) -> Result<State, SiderealError> {
        let state = state.in_frame(&self.frame)?;
        let mut coordinates = DVector::zeros(self.broker.n_coordinates());
        for subset in self.broker.subsets() {
            let extracted = state.extract(subset)?;
            let offset = self.broker.subset_offset(subset)?;
            coordinates
                .rows_mut(offset, subset.len())
                .copy_from(&extracted);
        }
        self.build(state.instant(), coordinates)
    }

    /// Injects `state` into this builder's larger layout, filling the
    /// subsets it does not carry from `defaults`.
    pub fn expand(&self, state: &State, defaults: &State) -> Result<State, SiderealError> {
        let state = state.in_frame(&self.frame)?;
        let defaults = defaults.in_frame(&self.frame)?;
        let mut coordinates = DVector::zeros(self.broker.n_coordinates());
        for subset in self.broker.subsets() {
            let values = if state.has_subset(subset) {
                state.extract(subset)?
            } else {
                defaults.extract(subset)?
            };
            let offset = self.broker.subset_offset(subset)?;
            coordinates.rows_mut(offset, subset.len()).copy_from(&values);
        }
        self.build(state.instant(), coordinates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn gcrf() -> Frame {
        Frame::inertial("GCRF")
    }

    fn epoch() -> Epoch {
        Epoch::from_gregorian_utc_at_midnight(2023, 1, 1)
    }

    fn full_state() -> State {
        let broker = Arc::new(CoordinateBroker::from_subsets(vec![
            CoordinateSubset::CartesianPosition,
            CoordinateSubset::CartesianVelocity,
            CoordinateSubset::Mass,
            CoordinateSubset::DragCoefficient,
        ]));
        State::new(
            epoch(),
            DVector::from_vec(vec![7.0e6, 0.0, 0.0, 0.0, 7.5e3, 0.0, 120.0, 2.2]),
            gcrf(),
            broker,
        )
        .unwrap()
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let broker = Arc::new(CoordinateBroker::from_subsets(vec![
            CoordinateSubset::CartesianPosition,
        ]));
        assert!(State::new(epoch(), DVector::zeros(4), gcrf(), broker).is_err());
    }

    #[test]
    fn reduce_then_expand_round_trips() {
        let full = full_state();
        let reducer =
            StateBuilder::new(gcrf(), vec![CoordinateSubset::CartesianPosition]).unwrap();
        let reduced = reducer.reduce(&full).unwrap();
        assert_eq!(reduced.len(), 3);

        let expander = StateBuilder::from_state(&full);
        let expanded = expander.expand(&reduced, &full).unwrap();
        assert_eq!(expanded, full);
    }

    #[test]
    fn add_zero_and_self_subtraction() {
        let state = full_state();
        let zero = StateBuilder::from_state(&state)
            .build(epoch(), DVector::zeros(state.len()))
            .unwrap();
        assert_eq!(state.add(&zero).unwrap(), state);
        let diff = state.subtract(&state).unwrap();
        assert_abs_diff_eq!(diff.coordinates().norm(), 0.0, epsilon = 1e-15);
    }

    #[test]
    fn accessors() {
        let state = full_state();
        assert_abs_diff_eq!(state.position().unwrap()[0], 7.0e6);
        assert_abs_diff_eq!(state.velocity().unwrap()[1], 7.5e3);
        assert_abs_diff_eq!(state.mass().unwrap(), 120.0);
        assert!(state
            .extract(&CoordinateSubset::AttitudeQuaternion)
            .is_err());
    }
}
