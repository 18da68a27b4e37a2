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

use thiserror::Error;

/// The error type for every fallible operation in the crate.
///
/// Errors raised by a dynamics during solver evaluation are propagated to the
/// outer `integrate*` call with the current time attached to the context
/// string. Root refinement does not raise: it reports `has_converged = false`
/// so the caller can inspect the best bracket.
#[derive(Clone, PartialEq, Error, Debug)]
pub enum SiderealError {
    /// A value was accessed before ever being initialized.
    #[error("value undefined: {0}")]
    Undefined(String),
    /// An offset + size pair exceeds the coordinate vector it indexes into.
    #[error("out of range: {0}")]
    OutOfRange(String),
    /// A dynamics reads a subset which the assembled broker does not produce.
    #[error("broker mismatch: {0}")]
    BrokerMismatch(String),
    /// A subset was looked up in a broker which never registered it.
    #[error("coordinate subset not registered: {0}")]
    SubsetNotRegistered(String),
    /// A reframing was requested which the receiver does not support.
    #[error("wrong frame: {0}")]
    WrongFrame(String),
    /// The equations of motion returned a non-finite value.
    #[error("integration diverged: {0}")]
    Diverged(String),
    /// The adaptive step controller stalled.
    #[error("step size underflow: {0}")]
    StepSizeUnderflow(String),
    /// No sign change was found while expanding a root bracket.
    #[error("no bracket: {0}")]
    NoBracket(String),
    /// An iterative solver exhausted its iteration budget.
    #[error("did not converge: {0}")]
    NonConvergent(String),
    /// The propellant mass fell to the dry mass.
    #[error("out of propellant: {0}")]
    OutOfPropellant(String),
    /// Contradictory or empty inputs at construction.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}
