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

//! Access generation: when can an observer see an orbiting object, under a
//! visibility criterion. The workhorse underneath is the temporal condition
//! solver, which turns a boolean predicate of time into maximal intervals.

use crate::cosmic::{CelestialBody, Frame};
use crate::errors::SiderealError;
use crate::linalg::Vector3;
use crate::math::RootSolver;
use crate::orbit::Trajectory;
use crate::time::{Duration, Epoch, Interval};
use crate::utils::wrap_to_two_pi;
use std::f64::consts::FRAC_PI_2;
use std::fmt;
use std::sync::Arc;

/// Eclipse interval generation.
pub mod eclipse;
pub use self::eclipse::*;

/// Finds the maximal sub-intervals of a time interval on which a boolean
/// predicate holds.
///
/// The predicate is sampled on a uniform grid; each switch between grid
/// points is bracketed and refined by the root solver over the ±1 indicator.
/// Produced intervals are closed and include the analysis bounds when the
/// predicate holds there.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TemporalConditionSolver {
    time_step: Duration,
    tolerance: Duration,
    maximum_iteration_count: usize,
}

impl Default for TemporalConditionSolver {
    fn default() -> Self {
        Self {
            time_step: Duration::from_seconds(60.0),
            tolerance: Duration::from_seconds(1e-3),
            maximum_iteration_count: 100,
        }
    }
}

impl TemporalConditionSolver {
    pub fn new(
        time_step: Duration,
        tolerance: Duration,
        maximum_iteration_count: usize,
    ) -> Result<Self, SiderealError> {
        if time_step <= Duration::ZERO || tolerance <= Duration::ZERO {
            return Err(SiderealError::InvalidConfiguration(
                "the time step and tolerance must be strictly positive".to_string(),
            ));
        }
        if maximum_iteration_count == 0 {
            return Err(SiderealError::InvalidConfiguration(
                "the iteration budget cannot be zero".to_string(),
            ));
        }
        Ok(Self {
            time_step,
            tolerance,
            maximum_iteration_count,
        })
    }

    pub fn time_step(&self) -> Duration {
        self.time_step
    }

    pub fn tolerance(&self) -> Duration {
        self.tolerance
    }

    /// The maximal closed sub-intervals of `interval` on which `condition`
    /// holds.
    pub fn solve<F>(
        &self,
        condition: F,
        interval: &Interval,
    ) -> Result<Vec<Interval>, SiderealError>
    where
        F: Fn(Epoch) -> Result<bool, SiderealError>,
    {
        self.solve_conjunction(&[&condition], interval)
    }

    /// Same, over the conjunction of several predicates.
    pub fn solve_conjunction(
        &self,
        conditions: &[&dyn Fn(Epoch) -> Result<bool, SiderealError>],
        interval: &Interval,
    ) -> Result<Vec<Interval>, SiderealError> {
        if conditions.is_empty() {
            return Err(SiderealError::InvalidConfiguration(
                "no conditions to solve".to_string(),
            ));
        }

        let evaluate = |instant: Epoch| -> Result<bool, SiderealError> {
            for condition in conditions {
                if !condition(instant)? {
                    return Ok(false);
                }
            }
            Ok(true)
        };

        let grid = interval.grid(self.time_step)?;
        let mut intervals = Vec::new();

        let mut held = evaluate(grid[0])?;
        let mut start = if held { Some(grid[0]) } else { None };
        let mut previous = grid[0];

        for &instant in grid.iter().skip(1) {
            let holds = evaluate(instant)?;
            if holds != held {
                let switch = self.find_switching_instant(previous, instant, &evaluate)?;
                if holds {
                    start = Some(switch);
                } else {
                    // A start always exists when leaving a held stretch.
                    let begin = start.take().ok_or_else(|| {
                        SiderealError::Undefined("interval switch without a start".to_string())
                    })?;
                    intervals.push(Interval::new(begin, switch)?);
                }
                held = holds;
            }
            previous = instant;
        }

        if held {
            let begin = start.ok_or_else(|| {
                SiderealError::Undefined("held condition without a start".to_string())
            })?;
            intervals.push(Interval::new(begin, interval.end())?);
        }

        Ok(intervals)
    }

    /// Brackets one switching instant between two grid points.
    fn find_switching_instant(
        &self,
        previous: Epoch,
        next: Epoch,
        evaluate: &dyn Fn(Epoch) -> Result<bool, SiderealError>,
    ) -> Result<Epoch, SiderealError> {
        let root_solver =
            RootSolver::new(self.maximum_iteration_count, self.tolerance.to_seconds())?;
        let span = (next - previous).to_seconds();
        let solution = root_solver.solve(
            |tau| {
                Ok(if evaluate(previous + Duration::from_seconds(tau))? {
                    1.0
                } else {
                    -1.0
                })
            },
            0.0,
            span,
        )?;
        if !solution.has_converged {
            return Err(SiderealError::NonConvergent(format!(
                "switching instant between {previous} and {next} exceeded {} iterations",
                self.maximum_iteration_count
            )));
        }
        Ok(previous + Duration::from_seconds(solution.root))
    }
}

/// Azimuth / elevation / range of a target as seen from an observer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aer {
    /// Azimuth from north, eastward, in [0, 2π).
    pub azimuth_rad: f64,
    pub elevation_rad: f64,
    pub range_m: f64,
}

/// A geodetic site on a celestial body, with its topocentric geometry.
pub struct GroundStation {
    latitude_rad: f64,
    longitude_rad: f64,
    altitude_m: f64,
    body: Arc<dyn CelestialBody>,
    body_fixed_frame: Frame,
}

impl GroundStation {
    pub fn new(
        latitude_rad: f64,
        longitude_rad: f64,
        altitude_m: f64,
        body: Arc<dyn CelestialBody>,
        body_fixed_frame: Frame,
    ) -> Result<Self, SiderealError> {
        if !(-FRAC_PI_2..=FRAC_PI_2).contains(&latitude_rad) {
            return Err(SiderealError::InvalidConfiguration(format!(
                "latitude {latitude_rad} rad outside of [-π/2, π/2]"
            )));
        }
        Ok(Self {
            latitude_rad,
            longitude_rad,
            altitude_m,
            body,
            body_fixed_frame,
        })
    }

    pub fn body_fixed_frame(&self) -> &Frame {
        &self.body_fixed_frame
    }

    /// Station position in the body-fixed frame, from the geodetic
    /// coordinates on the reference ellipsoid.
    pub fn position_fixed(&self) -> Vector3<f64> {
        let a = self.body.equatorial_radius();
        let f = self.body.flattening();
        let e_sq = f * (2.0 - f);
        let (sin_lat, cos_lat) = self.latitude_rad.sin_cos();
        let (sin_lon, cos_lon) = self.longitude_rad.sin_cos();
        let n = a / (1.0 - e_sq * sin_lat * sin_lat).sqrt();
        Vector3::new(
            (n + self.altitude_m) * cos_lat * cos_lon,
            (n + self.altitude_m) * cos_lat * sin_lon,
            (n * (1.0 - e_sq) + self.altitude_m) * sin_lat,
        )
    }

    /// AER of a body-fixed target position.
    pub fn aer_to(&self, target_fixed: &Vector3<f64>) -> Aer {
        let delta = target_fixed - self.position_fixed();
        let (sin_lat, cos_lat) = self.latitude_rad.sin_cos();
        let (sin_lon, cos_lon) = self.longitude_rad.sin_cos();
        let east = Vector3::new(-sin_lon, cos_lon, 0.0);
        let north = Vector3::new(-sin_lat * cos_lon, -sin_lat * sin_lon, cos_lat);
        let up = Vector3::new(cos_lat * cos_lon, cos_lat * sin_lon, sin_lat);

        let range = delta.norm();
        Aer {
            azimuth_rad: wrap_to_two_pi(delta.dot(&east).atan2(delta.dot(&north))),
            elevation_rad: (delta.dot(&up) / range).clamp(-1.0, 1.0).asin(),
            range_m: range,
        }
    }

    /// AER of a trajectory at an instant, transforming its state into the
    /// body-fixed frame.
    pub fn aer_to_trajectory_at(
        &self,
        trajectory: &dyn Trajectory,
        instant: Epoch,
    ) -> Result<Aer, SiderealError> {
        Ok(self.aer_to(&self.target_position_fixed(trajectory, instant)?))
    }

    fn target_position_fixed(
        &self,
        trajectory: &dyn Trajectory,
        instant: Epoch,
    ) -> Result<Vector3<f64>, SiderealError> {
        let state = trajectory.state_at(instant)?;
        let transform = state
            .frame()
            .transform_to(&self.body_fixed_frame, instant)?;
        Ok(transform.apply_to_position(&state.position()?))
    }
}

impl fmt::Display for GroundStation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "station at ({:.4} rad, {:.4} rad, {:.0} m) on {}",
            self.latitude_rad,
            self.longitude_rad,
            self.altitude_m,
            self.body.name()
        )
    }
}

/// When an observed object counts as visible.
pub enum VisibilityCriterion {
    /// Elevation within `[minimum, maximum]`.
    ElevationInterval {
        minimum_rad: f64,
        maximum_rad: f64,
    },
    /// Azimuth, elevation, and range each within their interval.
    AerInterval {
        azimuth_rad: (f64, f64),
        elevation_rad: (f64, f64),
        range_m: (f64, f64),
    },
    /// A minimum-elevation mask over azimuth, linearly interpolated between
    /// the mask points (sorted by azimuth, wrapping around), plus a range
    /// interval.
    AerMask {
        mask: Vec<(f64, f64)>,
        range_m: (f64, f64),
    },
    /// A straight line to the target clear of an occulting body.
    LineOfSight { occulting: Arc<dyn CelestialBody> },
}

impl VisibilityCriterion {
    /// The minimum elevation of a mask at the given azimuth.
    fn mask_elevation(mask: &[(f64, f64)], azimuth_rad: f64) -> f64 {
        if mask.len() == 1 {
            return mask[0].1;
        }
        let azimuth = wrap_to_two_pi(azimuth_rad);
        for pair in mask.windows(2) {
            let (az0, el0) = pair[0];
            let (az1, el1) = pair[1];
            if (az0..=az1).contains(&azimuth) {
                let t = (azimuth - az0) / (az1 - az0);
                return el0 + t * (el1 - el0);
            }
        }
        // Wrap-around segment between the last and first points.
        let (az0, el0) = mask[mask.len() - 1];
        let (az1, el1) = mask[0];
        let span = wrap_to_two_pi(az1 - az0);
        let t = if span == 0.0 {
            0.0
        } else {
            wrap_to_two_pi(azimuth - az0) / span
        };
        el0 + t * (el1 - el0)
    }
}

/// Generates the intervals during which a trajectory is visible from a
/// ground station under a criterion.
pub struct AccessGenerator {
    station: GroundStation,
    criterion: VisibilityCriterion,
    solver: TemporalConditionSolver,
}

impl AccessGenerator {
    pub fn new(
        station: GroundStation,
        criterion: VisibilityCriterion,
        solver: TemporalConditionSolver,
    ) -> Result<Self, SiderealError> {
        if let VisibilityCriterion::AerMask { mask, .. } = &criterion {
            if mask.is_empty() {
                return Err(SiderealError::InvalidConfiguration(
                    "an AER mask needs at least one point".to_string(),
                ));
            }
            if mask.windows(2).any(|pair| pair[1].0 <= pair[0].0) {
                return Err(SiderealError::InvalidConfiguration(
                    "AER mask points must be strictly increasing in azimuth".to_string(),
                ));
            }
        }
        Ok(Self {
            station,
            criterion,
            solver,
        })
    }

    pub fn station(&self) -> &GroundStation {
        &self.station
    }

    /// The visibility intervals of `trajectory` over `interval`.
    pub fn generate(
        &self,
        trajectory: &dyn Trajectory,
        interval: &Interval,
    ) -> Result<Vec<Interval>, SiderealError> {
        let predicate = |instant: Epoch| -> Result<bool, SiderealError> {
            self.is_visible_at(trajectory, instant)
        };
        self.solver.solve(predicate, interval)
    }

    /// Whether the criterion holds at one instant.
    pub fn is_visible_at(
        &self,
        trajectory: &dyn Trajectory,
        instant: Epoch,
    ) -> Result<bool, SiderealError> {
        match &self.criterion {
            VisibilityCriterion::ElevationInterval {
                minimum_rad,
                maximum_rad,
            } => {
                let aer = self.station.aer_to_trajectory_at(trajectory, instant)?;
                Ok((*minimum_rad..=*maximum_rad).contains(&aer.elevation_rad))
            }
            VisibilityCriterion::AerInterval {
                azimuth_rad,
                elevation_rad,
                range_m,
            } => {
                let aer = self.station.aer_to_trajectory_at(trajectory, instant)?;
                Ok(
                    (azimuth_rad.0..=azimuth_rad.1).contains(&aer.azimuth_rad)
                        && (elevation_rad.0..=elevation_rad.1).contains(&aer.elevation_rad)
                        && (range_m.0..=range_m.1).contains(&aer.range_m),
                )
            }
            VisibilityCriterion::AerMask { mask, range_m } => {
                let aer = self.station.aer_to_trajectory_at(trajectory, instant)?;
                let floor = VisibilityCriterion::mask_elevation(mask, aer.azimuth_rad);
                Ok(aer.elevation_rad >= floor && (range_m.0..=range_m.1).contains(&aer.range_m))
            }
            VisibilityCriterion::LineOfSight { occulting } => {
                let target = self
                    .station
                    .target_position_fixed(trajectory, instant)?;
                let observer = self.station.position_fixed();
                // The occulting body center in the station's fixed frame:
                // its own center when it is the station body, else its
                // ephemeris position brought over.
                let state = trajectory.state_at(instant)?;
                let transform = state
                    .frame()
                    .transform_to(self.station.body_fixed_frame(), instant)?;
                let center = transform.apply_to_position(&occulting.position_at(instant));
                Ok(!segment_intersects_sphere(
                    &observer,
                    &target,
                    &center,
                    occulting.equatorial_radius(),
                ))
            }
        }
    }
}

/// Whether the open segment between two points passes through a sphere.
fn segment_intersects_sphere(
    from: &Vector3<f64>,
    to: &Vector3<f64>,
    center: &Vector3<f64>,
    radius: f64,
) -> bool {
    let direction = to - from;
    let length_sq = direction.norm_squared();
    if length_sq == 0.0 {
        return (from - center).norm() < radius;
    }
    let t = ((center - from).dot(&direction) / length_sq).clamp(0.0, 1.0);
    let closest = from + t * direction;
    (closest - center).norm() < radius
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cosmic::Earth;
    use approx::assert_abs_diff_eq;

    fn epoch() -> Epoch {
        Epoch::from_gregorian_utc_at_midnight(2023, 1, 1)
    }

    #[test]
    fn temporal_solver_recovers_a_sine_gate() {
        let solver = TemporalConditionSolver::new(
            Duration::from_seconds(10.0),
            Duration::from_seconds(1e-4),
            100,
        )
        .unwrap();
        let t0 = epoch();
        // Predicate true on the positive half of a 100 s sine.
        let condition = |instant: Epoch| -> Result<bool, SiderealError> {
            let t = (instant - t0).to_seconds();
            Ok((t * std::f64::consts::TAU / 100.0).sin() > 0.0)
        };
        let window = Interval::new(t0, t0 + Duration::from_seconds(250.0)).unwrap();
        let intervals = solver.solve(condition, &window).unwrap();

        assert_eq!(intervals.len(), 3);
        // First positive stretch: (0, 50); the solver opens at the first
        // grid point since the predicate is false at exactly t = 0.
        assert_abs_diff_eq!(
            (intervals[0].end() - t0).to_seconds(),
            50.0,
            epsilon = 1e-3
        );
        assert_abs_diff_eq!(
            (intervals[1].start() - t0).to_seconds(),
            100.0,
            epsilon = 1e-3
        );
        // The last stretch is clipped by the window end.
        assert_abs_diff_eq!(
            (intervals[2].end() - t0).to_seconds(),
            250.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn always_true_spans_the_whole_window() {
        let solver = TemporalConditionSolver::default();
        let window = Interval::new(epoch(), epoch() + Duration::from_seconds(3_600.0)).unwrap();
        let intervals = solver.solve(|_| Ok(true), &window).unwrap();
        assert_eq!(intervals.len(), 1);
        assert_eq!(intervals[0], window);
    }

    #[test]
    fn station_zenith_geometry() {
        let station = GroundStation::new(
            0.0,
            0.0,
            0.0,
            Arc::new(Earth::new()),
            Earth::body_fixed_frame(),
        )
        .unwrap();
        // A target straight up over the equatorial station.
        let overhead = Vector3::new(Earth::EQUATORIAL_RADIUS + 500.0e3, 0.0, 0.0);
        let aer = station.aer_to(&overhead);
        assert_abs_diff_eq!(aer.elevation_rad, FRAC_PI_2, epsilon = 1e-9);
        assert_abs_diff_eq!(aer.range_m, 500.0e3, epsilon = 1e-6);

        // A target due north on the horizon.
        let north = Vector3::new(Earth::EQUATORIAL_RADIUS, 0.0, 1_000.0e3);
        let aer = station.aer_to(&north);
        assert_abs_diff_eq!(aer.azimuth_rad, 0.0, epsilon = 1e-9);
        assert!(aer.elevation_rad < 0.1);
    }

    #[test]
    fn mask_interpolates_between_points() {
        let mask = vec![(0.0, 0.1), (std::f64::consts::PI, 0.3)];
        assert_abs_diff_eq!(
            VisibilityCriterion::mask_elevation(&mask, std::f64::consts::FRAC_PI_2),
            0.2,
            epsilon = 1e-12
        );
        // Wrap-around back toward the first point.
        let three_quarters = 1.5 * std::f64::consts::PI;
        assert_abs_diff_eq!(
            VisibilityCriterion::mask_elevation(&mask, three_quarters),
            0.2,
            epsilon = 1e-12
        );
    }

    #[test]
    fn line_of_sight_through_the_earth_is_blocked() {
        assert!(segment_intersects_sphere(
            &Vector3::new(7.0e6, 0.0, 0.0),
            &Vector3::new(-7.0e6, 0.0, 0.0),
            &Vector3::zeros(),
            6.378e6
        ));
        assert!(!segment_intersects_sphere(
            &Vector3::new(7.0e6, 0.0, 0.0),
            &Vector3::new(0.0, 7.0e6, 0.0),
            &Vector3::zeros(),
            6.378e6
        ));
    }
}
