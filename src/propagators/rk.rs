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

/// The `RK` trait describes a Runge-Kutta stepper through its Butcher table.
///
/// `a_coeffs` is the flattened strictly-lower-triangular part of the `A`
/// matrix, row by row, of length `stages * (stages - 1) / 2`; the `c_i`
/// nodes are recovered as row sums, which supposes a consistent table.
/// `b_coeffs` holds the solution weights followed, for embedded pairs, by
/// the comparison weights (`2 * stages` entries; `stages` entries for a
/// fixed-step method).
pub trait RK {
    /// Order used by the adaptive controller to scale the step update.
    fn order() -> u8;

    /// Number of derivative evaluations per step.
    fn stages() -> usize;

    fn a_coeffs() -> &'static [f64];

    fn b_coeffs() -> &'static [f64];
}

/// The classical fixed-step fourth-order method.
pub struct RungeKutta4;

impl RK for RungeKutta4 {
    fn order() -> u8 {
        4
    }

    fn stages() -> usize {
        4
    }

    fn a_coeffs() -> &'static [f64] {
        &[0.5, 0.0, 0.5, 0.0, 0.0, 1.0]
    }

    fn b_coeffs() -> &'static [f64] {
        &[1.0 / 6.0, 1.0 / 3.0, 1.0 / 3.0, 1.0 / 6.0]
    }
}

/// Cash-Karp embedded 5(4) pair.
pub struct CashKarp45;

impl RK for CashKarp45 {
    fn order() -> u8 {
        5
    }

    fn stages() -> usize {
        6
    }

    fn a_coeffs() -> &'static [f64] {
        &[
            1.0 / 5.0,
            3.0 / 40.0,
            9.0 / 40.0,
            3.0 / 10.0,
            -9.0 / 10.0,
            6.0 / 5.0,
            -11.0 / 54.0,
            5.0 / 2.0,
            -70.0 / 27.0,
            35.0 / 27.0,
            1631.0 / 55296.0,
            175.0 / 512.0,
            575.0 / 13824.0,
            44275.0 / 110592.0,
            253.0 / 4096.0,
        ]
    }

    fn b_coeffs() -> &'static [f64] {
        &[
            37.0 / 378.0,
            0.0,
            250.0 / 621.0,
            125.0 / 594.0,
            0.0,
            512.0 / 1771.0,
            2825.0 / 27648.0,
            0.0,
            18575.0 / 48384.0,
            13525.0 / 55296.0,
            277.0 / 14336.0,
            1.0 / 4.0,
        ]
    }
}
