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

use super::rk::RK;

/// Fehlberg embedded 7(8) pair: thirteen stages, the high-accuracy option
/// for long coasts.
pub struct Fehlberg78;

impl RK for Fehlberg78 {
    fn order() -> u8 {
        8
    }

    fn stages() -> usize {
        13
    }

    fn a_coeffs() -> &'static [f64] {
        &[
            2.0 / 27.0,
            //
            1.0 / 36.0,
            1.0 / 12.0,
            //
            1.0 / 24.0,
            0.0,
            1.0 / 8.0,
            //
            5.0 / 12.0,
            0.0,
            -25.0 / 16.0,
            25.0 / 16.0,
            //
            1.0 / 20.0,
            0.0,
            0.0,
            1.0 / 4.0,
            1.0 / 5.0,
            //
            -25.0 / 108.0,
            0.0,
            0.0,
            125.0 / 108.0,
            -65.0 / 27.0,
            125.0 / 54.0,
            //
            31.0 / 300.0,
            0.0,
            0.0,
            0.0,
            61.0 / 225.0,
            -2.0 / 9.0,
            13.0 / 900.0,
            //
            2.0,
            0.0,
            0.0,
            -53.0 / 6.0,
            704.0 / 45.0,
            -107.0 / 9.0,
            67.0 / 90.0,
            3.0,
            //
            -91.0 / 108.0,
            0.0,
            0.0,
            23.0 / 108.0,
            -976.0 / 135.0,
            311.0 / 54.0,
            -19.0 / 60.0,
            17.0 / 6.0,
            -1.0 / 12.0,
            //
            2383.0 / 4100.0,
            0.0,
            0.0,
            -341.0 / 164.0,
            4496.0 / 1025.0,
            -301.0 / 82.0,
            2133.0 / 4100.0,
            45.0 / 82.0,
            45.0 / 164.0,
            18.0 / 41.0,
            //
            3.0 / 205.0,
            0.0,
            0.0,
            0.0,
            0.0,
            -6.0 / 41.0,
            -3.0 / 205.0,
            -3.0 / 41.0,
            3.0 / 41.0,
            6.0 / 41.0,
            0.0,
            //
            -1777.0 / 4100.0,
            0.0,
            0.0,
            -341.0 / 164.0,
            4496.0 / 1025.0,
            -289.0 / 82.0,
            2193.0 / 4100.0,
            51.0 / 82.0,
            33.0 / 164.0,
            12.0 / 41.0,
            0.0,
            1.0,
        ]
    }

    fn b_coeffs() -> &'static [f64] {
        &[
            41.0 / 840.0,
            0.0,
            0.0,
            0.0,
            0.0,
            34.0 / 105.0,
            9.0 / 35.0,
            9.0 / 35.0,
            9.0 / 280.0,
            9.0 / 280.0,
            41.0 / 840.0,
            0.0,
            0.0,
            //
            0.0,
            0.0,
            0.0,
            0.0,
            0.0,
            34.0 / 105.0,
            9.0 / 35.0,
            9.0 / 35.0,
            9.0 / 280.0,
            9.0 / 280.0,
            0.0,
            41.0 / 840.0,
            41.0 / 840.0,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_consistent() {
        assert_eq!(
            Fehlberg78::a_coeffs().len(),
            Fehlberg78::stages() * (Fehlberg78::stages() - 1) / 2
        );
        let b = Fehlberg78::b_coeffs();
        assert_eq!(b.len(), 2 * Fehlberg78::stages());
        let sum: f64 = b.iter().take(13).sum();
        let sum_star: f64 = b.iter().skip(13).sum();
        assert!((sum - 1.0).abs() < 1e-14 && (sum_star - 1.0).abs() < 1e-14);
    }

    #[test]
    fn nodes_match_the_published_tableau() {
        // c_i as row sums of the A matrix.
        let expected = [
            2.0 / 27.0,
            1.0 / 9.0,
            1.0 / 6.0,
            5.0 / 12.0,
            1.0 / 2.0,
            5.0 / 6.0,
            1.0 / 6.0,
            2.0 / 3.0,
            1.0 / 3.0,
            1.0,
            0.0,
            1.0,
        ];
        let a = Fehlberg78::a_coeffs();
        let mut idx = 0;
        for (row, want) in expected.iter().enumerate() {
            let len = row + 1;
            let c: f64 = a[idx..idx + len].iter().sum();
            assert!((c - want).abs() < 1e-12, "row {row}: {c} != {want}");
            idx += len;
        }
    }
}
