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

use super::subset::CoordinateSubset;
use crate::errors::SiderealError;
use crate::linalg::DVector;
use std::collections::HashMap;
use std::fmt;

/// Maps coordinate subsets to their `(offset, size)` within a flat vector.
///
/// Insertion-ordered: the first subset added sits at offset zero, and once a
/// subset is present its offset never moves. Adding a subset already present
/// is a no-op returning the existing offset.
#[derive(Clone, Debug, Default)]
pub struct CoordinateBroker {
    subsets: Vec<CoordinateSubset>,
    offsets: HashMap<CoordinateSubset, usize>,
    next_offset: usize,
}

impl CoordinateBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_subsets(subsets: Vec<CoordinateSubset>) -> Self {
        let mut broker = Self::new();
        for subset in subsets {
            broker.add_subset(&subset);
        }
        broker
    }

    /// Registers a subset, returning its offset. Idempotent on identity.
    pub fn add_subset(&mut self, subset: &CoordinateSubset) -> usize {
        if let Some(&offset) = self.offsets.get(subset) {
            return offset;
        }
        let offset = self.next_offset;
        self.subsets.push(subset.clone());
        self.offsets.insert(subset.clone(), offset);
        self.next_offset += subset.len();
        offset
    }

    /// Total number of coordinates across all subsets.
    pub fn n_coordinates(&self) -> usize {
        self.next_offset
    }

    pub fn n_subsets(&self) -> usize {
        self.subsets.len()
    }

    pub fn has_subset(&self, subset: &CoordinateSubset) -> bool {
        self.offsets.contains_key(subset)
    }

    /// The subsets in insertion order.
    pub fn subsets(&self) -> &[CoordinateSubset] {
        &self.subsets
    }

    /// The offset of a subset within the flat vector.
    pub fn subset_offset(&self, subset: &CoordinateSubset) -> Result<usize, SiderealError> {
        self.offsets
            .get(subset)
            .copied()
            .ok_or_else(|| SiderealError::SubsetNotRegistered(format!("{subset}")))
    }

    /// Extracts one subset from a full coordinates vector.
    pub fn extract(
        &self,
        coordinates: &DVector<f64>,
        subset: &CoordinateSubset,
    ) -> Result<DVector<f64>, SiderealError> {
        let offset = self.subset_offset(subset)?;
        let size = subset.len();
        if offset + size > coordinates.len() {
            return Err(SiderealError::OutOfRange(format!(
                "subset {subset} spans {}..{} in a vector of length {}",
                offset,
                offset + size,
                coordinates.len()
            )));
        }
        Ok(coordinates.rows(offset, size).into_owned())
    }

    /// Extracts several subsets, stacked in the order requested.
    pub fn extract_many(
        &self,
        coordinates: &DVector<f64>,
        subsets: &[CoordinateSubset],
    ) -> Result<DVector<f64>, SiderealError> {
        let total: usize = subsets.iter().map(CoordinateSubset::len).sum();
        let mut stacked = DVector::zeros(total);
        let mut cursor = 0;
        for subset in subsets {
            let extracted = self.extract(coordinates, subset)?;
            stacked.rows_mut(cursor, subset.len()).copy_from(&extracted);
            cursor += subset.len();
        }
        Ok(stacked)
    }
}

impl PartialEq for CoordinateBroker {
    fn eq(&self, other: &Self) -> bool {
        self.subsets == other.subsets
    }
}

impl fmt::Display for CoordinateBroker {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Broker[")?;
        for (i, subset) in self.subsets.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{subset}")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insertion_order_and_sizes() {
        let mut broker = CoordinateBroker::new();
        assert_eq!(broker.add_subset(&CoordinateSubset::CartesianPosition), 0);
        assert_eq!(broker.add_subset(&CoordinateSubset::CartesianVelocity), 3);
        assert_eq!(broker.add_subset(&CoordinateSubset::Mass), 6);
        assert_eq!(broker.n_coordinates(), 7);
        assert_eq!(broker.n_subsets(), 3);
        let sizes: usize = broker.subsets().iter().map(CoordinateSubset::len).sum();
        assert_eq!(sizes, broker.n_coordinates());
    }

    #[test]
    fn add_subset_is_idempotent() {
        let mut broker = CoordinateBroker::from_subsets(vec![
            CoordinateSubset::CartesianPosition,
            CoordinateSubset::Mass,
        ]);
        let before = (broker.n_coordinates(), broker.n_subsets());
        assert_eq!(broker.add_subset(&CoordinateSubset::CartesianPosition), 0);
        assert_eq!(broker.add_subset(&CoordinateSubset::Mass), 3);
        assert_eq!((broker.n_coordinates(), broker.n_subsets()), before);
    }

    #[test]
    fn extraction_of_every_subset_has_its_size() {
        let broker = CoordinateBroker::from_subsets(vec![
            CoordinateSubset::CartesianPosition,
            CoordinateSubset::CartesianVelocity,
            CoordinateSubset::AttitudeQuaternion,
            CoordinateSubset::Mass,
        ]);
        let v = DVector::from_fn(broker.n_coordinates(), |i, _| i as f64);
        for subset in broker.subsets() {
            assert_eq!(broker.extract(&v, subset).unwrap().len(), subset.len());
        }
    }

    #[test]
    fn extract_many_stacks_in_request_order() {
        let broker = CoordinateBroker::from_subsets(vec![
            CoordinateSubset::CartesianPosition,
            CoordinateSubset::Mass,
        ]);
        let v = DVector::from_vec(vec![1.0, 2.0, 3.0, 9.0]);
        let stacked = broker
            .extract_many(
                &v,
                &[CoordinateSubset::Mass, CoordinateSubset::CartesianPosition],
            )
            .unwrap();
        assert_eq!(stacked.as_slice(), &[9.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn short_vector_is_out_of_range() {
        let broker = CoordinateBroker::from_subsets(vec![
            CoordinateSubset::CartesianPosition,
            CoordinateSubset::Mass,
        ]);
        let short = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        assert!(matches!(
            broker.extract(&short, &CoordinateSubset::Mass),
            Err(SiderealError::OutOfRange(_))
        ));
    }

    #[test]
    fn unknown_subset_is_reported() {
        let broker = CoordinateBroker::from_subsets(vec![CoordinateSubset::CartesianPosition]);
        let v = DVector::zeros(3);
        assert!(matches!(
            broker.extract(&v, &CoordinateSubset::Mass),
            Err(SiderealError::SubsetNotRegistered(_))
        ));
    }
}
