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

//! Time handling is delegated to `hifitime`, which is thoroughly validated.

pub use hifitime::{Duration, Epoch, TimeUnits, Unit};

use crate::errors::SiderealError;
use std::fmt;

/// A closed time interval `[start, end]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Interval {
    start: Epoch,
    end: Epoch,
}

impl Interval {
    /// Builds the closed interval `[start, end]`. Fails if `end < start`.
    pub fn new(start: Epoch, end: Epoch) -> Result<Self, SiderealError> {
        if end < start {
            return Err(SiderealError::InvalidConfiguration(format!(
                "interval end {end} is before start {start}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> Epoch {
        self.start
    }

    pub fn end(&self) -> Epoch {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn contains(&self, epoch: Epoch) -> bool {
        self.start <= epoch && epoch <= self.end
    }

    /// Midpoint of the interval.
    pub fn midpoint(&self) -> Epoch {
        self.start + (self.end - self.start) * 0.5
    }

    /// Generates the uniform grid of step `step` over the interval.
    ///
    /// The end instant is always included, even when the last step is
    /// truncated.
    pub fn grid(&self, step: Duration) -> Result<Vec<Epoch>, SiderealError> {
        if step <= Duration::ZERO {
            return Err(SiderealError::InvalidConfiguration(format!(
                "grid step must be strictly positive, got {step}"
            )));
        }
        let mut instants = Vec::new();
        let mut instant = self.start;
        while instant < self.end {
            instants.push(instant);
            instant = instant + step;
        }
        instants.push(self.end);
        Ok(instants)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{} .. {}]", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_includes_truncated_end() {
        let start = Epoch::from_gregorian_utc_at_midnight(2023, 1, 1);
        let interval = Interval::new(start, start + Duration::from_seconds(10.0)).unwrap();
        let grid = interval.grid(Duration::from_seconds(4.0)).unwrap();
        assert_eq!(grid.len(), 4);
        assert_eq!(grid[0], start);
        assert_eq!(*grid.last().unwrap(), interval.end());
    }

    #[test]
    fn reversed_interval_is_rejected() {
        let start = Epoch::from_gregorian_utc_at_midnight(2023, 1, 1);
        assert!(Interval::new(start, start - Duration::from_seconds(1.0)).is_err());
    }
}
