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

//! The cosmic module holds everything a state is made of: reference frames
//! and rigid transforms, coordinate subsets and the broker that lays them
//! out, the state itself, local orbital frames, and the celestial-body
//! collaborator trait with its reference implementations.

/// Celestial bodies: the collaborator trait and reference implementations.
pub mod bodies;
pub use self::bodies::*;

/// The coordinate broker.
pub mod broker;
pub use self::broker::*;

/// Reference frames and rigid transforms.
pub mod frame;
pub use self::frame::*;

/// Local orbital frame construction.
pub mod lof;
pub use self::lof::*;

/// States and the state builder.
pub mod state;
pub use self::state::*;

/// Coordinate subsets.
pub mod subset;
pub use self::subset::*;
