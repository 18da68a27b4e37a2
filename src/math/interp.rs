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

/// A one-dimensional interpolator over `(x, y)` samples with strictly
/// increasing abscissae.
pub trait Interpolator: Send + Sync {
    /// Interpolated value at `x`. `x` must lie within the tabulated domain.
    fn evaluate(&self, x: f64) -> Result<f64, SiderealError>;

    /// Interpolated first derivative at `x`.
    fn derivative(&self, x: f64) -> Result<f64, SiderealError>;

    /// The tabulated domain `[first, last]`.
    fn domain(&self) -> (f64, f64);
}

fn validate_samples(xs: &[f64], ys: &[f64]) -> Result<(), SiderealError> {
    if xs.len() != ys.len() {
        return Err(SiderealError::InvalidConfiguration(format!(
            "abscissae ({}) and ordinates ({}) differ in length",
            xs.len(),
            ys.len()
        )));
    }
    if xs.len() < 2 {
        return Err(SiderealError::InvalidConfiguration(
            "at least two samples are required".to_string(),
        ));
    }
    if xs.windows(2).any(|w| w[1] <= w[0]) {
        return Err(SiderealError::InvalidConfiguration(
            "abscissae must be strictly increasing".to_string(),
        ));
    }
    Ok(())
}

fn check_domain(xs: &[f64], x: f64) -> Result<(), SiderealError> {
    let first = xs[0];
    let last = xs[xs.len() - 1];
    if x < first || x > last {
        return Err(SiderealError::Undefined(format!(
            "interpolation abscissa {x} outside of [{first}, {last}]"
        )));
    }
    Ok(())
}

/// Piecewise-linear interpolation.
pub struct LinearInterpolator {
    xs: Vec<f64>,
    ys: Vec<f64>,
}

impl LinearInterpolator {
    pub fn new(xs: Vec<f64>, ys: Vec<f64>) -> Result<Self, SiderealError> {
        validate_samples(&xs, &ys)?;
        Ok(Self { xs, ys })
    }

    fn segment(&self, x: f64) -> usize {
        match self.xs.binary_search_by(|v| v.partial_cmp(&x).unwrap()) {
            Ok(i) => i.min(self.xs.len() - 2),
            Err(i) => i.saturating_sub(1).min(self.xs.len() - 2),
        }
    }
}

impl Interpolator for LinearInterpolator {
    fn evaluate(&self, x: f64) -> Result<f64, SiderealError> {
        check_domain(&self.xs, x)?;
        let i = self.segment(x);
        let t = (x - self.xs[i]) / (self.xs[i + 1] - self.xs[i]);
        Ok(self.ys[i] + t * (self.ys[i + 1] - self.ys[i]))
    }

    fn derivative(&self, x: f64) -> Result<f64, SiderealError> {
        check_domain(&self.xs, x)?;
        let i = self.segment(x);
        Ok((self.ys[i + 1] - self.ys[i]) / (self.xs[i + 1] - self.xs[i]))
    }

    fn domain(&self) -> (f64, f64) {
        (self.xs[0], self.xs[self.xs.len() - 1])
    }
}

/// Natural cubic spline interpolation.
pub struct CubicSplineInterpolator {
    xs: Vec<f64>,
    ys: Vec<f64>,
    /// Second derivatives at the knots, from the tridiagonal solve.
    y2: Vec<f64>,
}

impl CubicSplineInterpolator {
    pub fn new(xs: Vec<f64>, ys: Vec<f64>) -> Result<Self, SiderealError> {
        validate_samples(&xs, &ys)?;
        let n = xs.len();
        let mut y2 = vec![0.0; n];
        let mut u = vec![0.0; n];
        for i in 1..n - 1 {
            let sig = (xs[i] - xs[i - 1]) / (xs[i + 1] - xs[i - 1]);
            let p = sig * y2[i - 1] + 2.0;
            y2[i] = (sig - 1.0) / p;
            let dy = (ys[i + 1] - ys[i]) / (xs[i + 1] - xs[i])
                - (ys[i] - ys[i - 1]) / (xs[i] - xs[i - 1]);
            u[i] = (6.0 * dy / (xs[i + 1] - xs[i - 1]) - sig * u[i - 1]) / p;
        }
        for i in (0..n - 1).rev() {
            y2[i] = y2[i] * y2[i + 1] + u[i];
        }
        Ok(Self { xs, ys, y2 })
    }

    fn segment(&self, x: f64) -> usize {
        match self.xs.binary_search_by(|v| v.partial_cmp(&x).unwrap()) {
            Ok(i) => i.min(self.xs.len() - 2),
            Err(i) => i.saturating_sub(1).min(self.xs.len() - 2),
        }
    }
}

impl Interpolator for CubicSplineInterpolator {
    fn evaluate(&self, x: f64) -> Result<f64, SiderealError> {
        check_domain(&self.xs, x)?;
        let i = self.segment(x);
        let h = self.xs[i + 1] - self.xs[i];
        let a = (self.xs[i + 1] - x) / h;
        let b = (x - self.xs[i]) / h;
        Ok(a * self.ys[i]
            + b * self.ys[i + 1]
            + ((a * a * a - a) * self.y2[i] + (b * b * b - b) * self.y2[i + 1]) * h * h / 6.0)
    }

    fn derivative(&self, x: f64) -> Result<f64, SiderealError> {
        check_domain(&self.xs, x)?;
        let i = self.segment(x);
        let h = self.xs[i + 1] - self.xs[i];
        let a = (self.xs[i + 1] - x) / h;
        let b = (x - self.xs[i]) / h;
        Ok((self.ys[i + 1] - self.ys[i]) / h
            + ((3.0 * b * b - 1.0) * self.y2[i + 1] - (3.0 * a * a - 1.0) * self.y2[i]) * h / 6.0)
    }

    fn domain(&self) -> (f64, f64) {
        (self.xs[0], self.xs[self.xs.len() - 1])
    }
}

/// Barycentric rational interpolation (Floater-Hormann), the scheme used by
/// the tabulated dynamics: no poles on the real line, no oscillation blow-up
/// on uneven grids.
pub struct BarycentricRationalInterpolator {
    xs: Vec<f64>,
    ys: Vec<f64>,
    weights: Vec<f64>,
}

impl BarycentricRationalInterpolator {
    /// Default Floater-Hormann blend order.
    pub const DEFAULT_ORDER: usize = 3;

    pub fn new(xs: Vec<f64>, ys: Vec<f64>) -> Result<Self, SiderealError> {
        Self::with_order(xs, ys, Self::DEFAULT_ORDER)
    }

    pub fn with_order(xs: Vec<f64>, ys: Vec<f64>, order: usize) -> Result<Self, SiderealError> {
        validate_samples(&xs, &ys)?;
        let n = xs.len();
        let d = order.min(n - 1);
        let mut weights = vec![0.0; n];
        for k in 0..n {
            let mut weight = 0.0;
            let i_min = k.saturating_sub(d);
            let i_max = (n - 1 - d).min(k);
            for i in i_min..=i_max {
                let mut product = 1.0;
                for j in i..=i + d {
                    if j != k {
                        product /= (xs[k] - xs[j]).abs();
                    }
                }
                weight += product;
            }
            // Alternating sign, shifted so the pattern starts at i_min parity.
            weights[k] = if k % 2 == 0 { weight } else { -weight };
        }
        Ok(Self { xs, ys, weights })
    }

    fn rational_at(&self, x: f64) -> f64 {
        let mut numerator = 0.0;
        let mut denominator = 0.0;
        for k in 0..self.xs.len() {
            let dx = x - self.xs[k];
            if dx == 0.0 {
                return self.ys[k];
            }
            let term = self.weights[k] / dx;
            numerator += term * self.ys[k];
            denominator += term;
        }
        numerator / denominator
    }
}

impl Interpolator for BarycentricRationalInterpolator {
    fn evaluate(&self, x: f64) -> Result<f64, SiderealError> {
        check_domain(&self.xs, x)?;
        Ok(self.rational_at(x))
    }

    fn derivative(&self, x: f64) -> Result<f64, SiderealError> {
        check_domain(&self.xs, x)?;
        // Central difference with a step tied to the local grid spacing,
        // pulled inward at the domain boundaries.
        let (lo, hi) = self.domain();
        let h = 1e-6 * (hi - lo).max(1.0);
        let a = (x - h).max(lo);
        let b = (x + h).min(hi);
        Ok((self.rational_at(b) - self.rational_at(a)) / (b - a))
    }

    fn domain(&self) -> (f64, f64) {
        (self.xs[0], self.xs[self.xs.len() - 1])
    }
}
