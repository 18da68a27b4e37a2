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

//! Re-exports the `nalgebra` names used across the crate.
//!
//! The coordinate algebra is dynamically sized because the broker composes
//! state vectors of arbitrary size at runtime; geometric primitives stay
//! statically sized.

pub use nalgebra::{
    DMatrix, DVector, Matrix3, Rotation3, Unit, UnitQuaternion, Vector3, Vector4, Vector6,
};
