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

use crate::errors::SiderealError;
use serde_derive::{Deserialize, Serialize};

/// Outcome of a root search.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RootSolution {
    /// Midpoint of the final bracket.
    pub root: f64,
    /// Number of refinement iterations consumed.
    pub iteration_count: usize,
    /// Whether the bracket shrank below tolerance within the budget.
    pub has_converged: bool,
}

/// Bracketing root finder over scalar functions.
///
/// Refinement never raises on a stalled iteration: the best bracket midpoint
/// is returned with `has_converged = false` so the caller can inspect it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RootSolver {
    maximum_iteration_count: usize,
    tolerance: f64,
}

impl Default for RootSolver {
    fn default() -> Self {
        Self {
            maximum_iteration_count: 100,
            tolerance: 1e-8,
        }
    }
}

impl RootSolver {
    pub fn new(maximum_iteration_count: usize, tolerance: f64) -> Result<Self, SiderealError> {
        if maximum_iteration_count == 0 || tolerance <= 0.0 {
            return Err(SiderealError::InvalidConfiguration(format!(
                "root solver needs a positive budget and tolerance, got {maximum_iteration_count} and {tolerance}"
            )));
        }
        Ok(Self {
            maximum_iteration_count,
            tolerance,
        })
    }

    pub fn maximum_iteration_count(&self) -> usize {
        self.maximum_iteration_count
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Expands an initial guess outward by `factor` until a sign change is
    /// found, then refines. `is_rising` orients the expansion: a rising
    /// function with a positive value moves the bracket down, etc.
    pub fn bracket_and_solve<F>(
        &self,
        function: F,
        initial_guess: f64,
        is_rising: bool,
        factor: f64,
    ) -> Result<RootSolution, SiderealError>
    where
        F: Fn(f64) -> Result<f64, SiderealError>,
    {
        const MAX_EXPANSIONS: usize = 60;

        if factor <= 1.0 {
            return Err(SiderealError::InvalidConfiguration(format!(
                "bracket expansion factor must exceed 1, got {factor}"
            )));
        }

        let mut a = initial_guess;
        let mut fa = function(a)?;
        if fa == 0.0 {
            return Ok(RootSolution {
                root: a,
                iteration_count: 0,
                has_converged: true,
            });
        }

        // Move against the function slope so the root lies between a and b.
        let downhill = (fa > 0.0) == is_rising;
        let mut b = a;
        let mut fb = fa;
        for _ in 0..MAX_EXPANSIONS {
            a = b;
            fa = fb;
            b = if downhill {
                if b == 0.0 {
                    -1.0 / factor
                } else if b > 0.0 {
                    b / factor
                } else {
                    b * factor
                }
            } else if b == 0.0 {
                1.0 / factor
            } else if b > 0.0 {
                b * factor
            } else {
                b / factor
            };
            fb = function(b)?;
            if fa * fb <= 0.0 {
                return self.refine(function, a, fa, b, fb);
            }
        }

        Err(SiderealError::NoBracket(format!(
            "no sign change around {initial_guess} after {MAX_EXPANSIONS} expansions"
        )))
    }

    /// Refines a root on `[lo, hi]`, which must bracket a sign change.
    pub fn solve<F>(&self, function: F, lo: f64, hi: f64) -> Result<RootSolution, SiderealError>
    where
        F: Fn(f64) -> Result<f64, SiderealError>,
    {
        let (lo, hi) = (lo.min(hi), lo.max(hi));
        let flo = function(lo)?;
        let fhi = function(hi)?;
        if flo * fhi > 0.0 {
            return Err(SiderealError::NoBracket(format!(
                "g({lo}) = {flo} and g({hi}) = {fhi} do not bracket a root"
            )));
        }
        self.refine(function, lo, flo, hi, fhi)
    }

    /// Plain bisection on `[lo, hi]`, which must bracket a sign change.
    pub fn bisection<F>(&self, function: F, lo: f64, hi: f64) -> Result<RootSolution, SiderealError>
    where
        F: Fn(f64) -> Result<f64, SiderealError>,
    {
        let (mut lo, mut hi) = (lo.min(hi), lo.max(hi));
        let mut flo = function(lo)?;
        let fhi = function(hi)?;
        if flo * fhi > 0.0 {
            return Err(SiderealError::NoBracket(format!(
                "g({lo}) = {flo} and g({hi}) = {fhi} do not bracket a root"
            )));
        }
        let mut iteration_count = 0;
        while (hi - lo).abs() > self.tolerance && iteration_count < self.maximum_iteration_count {
            let mid = lo + (hi - lo) / 2.0;
            let fmid = function(mid)?;
            iteration_count += 1;
            if flo * fmid <= 0.0 {
                hi = mid;
            } else {
                lo = mid;
                flo = fmid;
            }
        }
        Ok(RootSolution {
            root: lo + (hi - lo) / 2.0,
            iteration_count,
            has_converged: (hi - lo).abs() <= self.tolerance,
        })
    }

    /// Inverse-quadratic / secant refinement with a bisection safeguard, over
    /// a confirmed bracket. Same contract as the bracketed TOMS-748 iterate:
    /// stops on `|hi - lo| <= tolerance` or on the iteration budget.
    fn refine<F>(
        &self,
        function: F,
        mut a: f64,
        mut fa: f64,
        mut b: f64,
        mut fb: f64,
    ) -> Result<RootSolution, SiderealError>
    where
        F: Fn(f64) -> Result<f64, SiderealError>,
    {
        if fa == 0.0 {
            return Ok(RootSolution {
                root: a,
                iteration_count: 0,
                has_converged: true,
            });
        }
        if fb == 0.0 {
            return Ok(RootSolution {
                root: b,
                iteration_count: 0,
                has_converged: true,
            });
        }

        // Keep |f(b)| <= |f(a)|: b is the current best iterate.
        if fa.abs() < fb.abs() {
            std::mem::swap(&mut a, &mut b);
            std::mem::swap(&mut fa, &mut fb);
        }
        let mut c = a;
        let mut fc = fa;
        let mut bisected = true;
        let mut d = 0.0;

        let mut iteration_count = 0;
        while iteration_count < self.maximum_iteration_count {
            if (b - a).abs() <= self.tolerance || fb == 0.0 {
                break;
            }

            let mut s = if fa != fc && fb != fc {
                // Inverse quadratic interpolation.
                a * fb * fc / ((fa - fb) * (fa - fc))
                    + b * fa * fc / ((fb - fa) * (fb - fc))
                    + c * fa * fb / ((fc - fa) * (fc - fb))
            } else {
                // Secant step.
                b - fb * (b - a) / (fb - fa)
            };

            let midpoint = (3.0 * a + b) / 4.0;
            let out_of_bounds = (s - midpoint) * (s - b) > 0.0;
            let step_too_small = if bisected {
                (s - b).abs() >= (b - c).abs() / 2.0 || (b - c).abs() < self.tolerance
            } else {
                (s - b).abs() >= (c - d).abs() / 2.0 || (c - d).abs() < self.tolerance
            };
            if out_of_bounds || step_too_small {
                s = (a + b) / 2.0;
                bisected = true;
            } else {
                bisected = false;
            }

            let fs = function(s)?;
            iteration_count += 1;

            d = c;
            c = b;
            fc = fb;
            if fa * fs < 0.0 {
                b = s;
                fb = fs;
            } else {
                a = s;
                fa = fs;
            }
            if fa.abs() < fb.abs() {
                std::mem::swap(&mut a, &mut b);
                std::mem::swap(&mut fa, &mut fb);
            }
        }

        Ok(RootSolution {
            root: a + (b - a) / 2.0,
            iteration_count,
            has_converged: (b - a).abs() <= self.tolerance || fb == 0.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn solves_cubic_on_bracket() {
        let solver = RootSolver::default();
        let solution = solver
            .solve(|x| Ok((x + 3.0) * (x - 1.0) * (x - 1.0) * (x - 1.0)), -4.0, 0.0)
            .unwrap();
        assert!(solution.has_converged);
        assert_abs_diff_eq!(solution.root, -3.0, epsilon = 1e-7);
    }

    #[test]
    fn bisection_matches_solve() {
        let solver = RootSolver::new(200, 1e-10).unwrap();
        let f = |x: f64| Ok(x.cos() - x);
        let a = solver.solve(f, 0.0, 1.0).unwrap();
        let b = solver.bisection(f, 0.0, 1.0).unwrap();
        assert!(a.has_converged && b.has_converged);
        assert_abs_diff_eq!(a.root, b.root, epsilon = 1e-8);
        assert!(a.iteration_count < b.iteration_count);
    }

    #[test]
    fn bracket_and_solve_expands_to_the_root() {
        let solver = RootSolver::default();
        let solution = solver
            .bracket_and_solve(|x| Ok(x * x - 20.0), 1.0, true, 2.0)
            .unwrap();
        assert!(solution.has_converged);
        assert_abs_diff_eq!(solution.root, 20.0f64.sqrt(), epsilon = 1e-7);
    }

    #[test]
    fn missing_bracket_is_reported() {
        let solver = RootSolver::default();
        assert!(matches!(
            solver.solve(|x| Ok(x * x + 1.0), -1.0, 1.0),
            Err(SiderealError::NoBracket(_))
        ));
    }
}
