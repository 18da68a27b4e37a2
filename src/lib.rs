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

//! # sidereal
//!
//! Sidereal is a mission design toolkit built around a composable dynamics
//! engine: heterogeneous coordinate subsets (position, velocity, mass,
//! attitude, arbitrary channels) are brokered into a single state vector,
//! dynamics contributors declare which subsets they read and write, and an
//! adaptive Runge-Kutta solver integrates the assembled system with
//! event-condition root-finding. On top of that engine sit flight sequences
//! (event-terminated coast and maneuver segments), orbit models, access and
//! eclipse generation, and batch least-squares orbit determination.
//!
//! All quantities are SI: meters, seconds, kilograms, radians.

#[macro_use]
extern crate log;

/// Crate-wide error type.
pub mod errors;
pub use errors::SiderealError;

/// Re-exports of the `nalgebra` types used throughout the crate.
pub mod linalg;

/// Re-exports of `hifitime` plus the closed time `Interval`.
pub mod time;

/// Frames, coordinate subsets, the broker, states, and celestial bodies.
pub mod cosmic;

/// The `Dynamics` trait and the built-in contributors.
pub mod dynamics;

/// Interpolators and the bracketing root solver.
pub mod math;

/// Mission design: event conditions and flight sequences.
pub mod md;

/// Batch least-squares estimation and orbit determination.
pub mod od;

/// Orbit models, trajectories, and pass detection.
pub mod orbit;

/// The numerical solver, the steppers, and the propagator.
pub mod propagators;

/// Access, eclipse, and the temporal condition solver.
pub mod access;

/// Small helpers shared across modules.
pub mod utils;

/// A prelude for the common entry points.
pub mod prelude {
    pub use crate::cosmic::{
        CelestialBody, CoordinateBroker, CoordinateSubset, Frame, State, StateBuilder,
    };
    pub use crate::dynamics::Dynamics;
    pub use crate::errors::SiderealError;
    pub use crate::md::events::EventCondition;
    pub use crate::md::sequence::{Segment, Sequence};
    pub use crate::orbit::Trajectory;
    pub use crate::propagators::{NumericalSolver, Propagator, Stepper};
    pub use crate::time::{Duration, Epoch, Interval, Unit};
}
