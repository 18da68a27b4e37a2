extern crate pretty_env_logger;
extern crate sidereal;

use sidereal::access::{
    AccessGenerator, EclipseGenerator, GroundStation, TemporalConditionSolver,
    VisibilityCriterion,
};
use sidereal::cosmic::{Earth, Frame, Sun};
use sidereal::orbit::{KeplerModel, KeplerPerturbation, KeplerianElements};
use sidereal::time::{Duration, Epoch, Interval};
use std::sync::Arc;

fn gcrf() -> Frame {
    Frame::inertial("GCRF")
}

/// A 500 km circular orbit at a sun-synchronous-like inclination.
fn leo_orbit(epoch: Epoch, raan: f64) -> KeplerModel {
    let elements = KeplerianElements::new(
        Earth::EQUATORIAL_RADIUS + 500.0e3,
        1.0e-4,
        97.4_f64.to_radians(),
        raan,
        0.0,
        0.0,
    )
    .unwrap();
    KeplerModel::new(elements, epoch, Earth::GM, gcrf(), KeplerPerturbation::None).unwrap()
}

#[test]
fn ground_station_passes_over_a_day() {
    if pretty_env_logger::try_init().is_err() {
        println!("could not init env_logger");
    }

    let epoch = Epoch::from_gregorian_utc_at_midnight(2023, 1, 1);
    let orbit = leo_orbit(epoch, 0.3);

    let station = GroundStation::new(
        60.0_f64.to_radians(),
        8.0_f64.to_radians(),
        150.0,
        Arc::new(Earth::new()),
        Earth::body_fixed_frame(),
    )
    .unwrap();
    let mask_rad = 10.0_f64.to_radians();
    let generator = AccessGenerator::new(
        station,
        VisibilityCriterion::ElevationInterval {
            minimum_rad: mask_rad,
            maximum_rad: std::f64::consts::FRAC_PI_2,
        },
        TemporalConditionSolver::new(
            Duration::from_seconds(30.0),
            Duration::from_seconds(1e-2),
            100,
        )
        .unwrap(),
    )
    .unwrap();

    let day = Interval::new(epoch, epoch + Duration::from_seconds(86_400.0)).unwrap();
    let accesses = generator.generate(&orbit, &day).unwrap();

    assert!(
        (3..=8).contains(&accesses.len()),
        "got {} passes",
        accesses.len()
    );

    // Every reported interval clears the mask at its midpoint.
    for access in &accesses {
        let aer = generator
            .station()
            .aer_to_trajectory_at(&orbit, access.midpoint())
            .unwrap();
        assert!(
            aer.elevation_rad >= mask_rad,
            "midpoint elevation {} rad under the mask",
            aer.elevation_rad
        );
    }

    // Passes at 500 km last minutes, not hours.
    for access in &accesses {
        let duration = access.duration().to_seconds();
        assert!(
            (10.0..900.0).contains(&duration),
            "implausible pass duration {duration} s"
        );
    }
}

#[test]
fn umbra_duration_of_a_noon_midnight_orbit() {
    // Near the equinox the sun sits along +X; a zero-RAAN orbit plane
    // contains it, the noon-midnight geometry with the deepest eclipses.
    let epoch = Epoch::from_gregorian_utc_at_midnight(2023, 3, 21);
    let orbit = leo_orbit(epoch, 0.0);
    let period = KeplerianElements::new(
        Earth::EQUATORIAL_RADIUS + 500.0e3,
        1.0e-4,
        97.4_f64.to_radians(),
        0.0,
        0.0,
        0.0,
    )
    .unwrap()
    .period(Earth::GM);

    let generator = EclipseGenerator::new(
        Arc::new(Earth::new()),
        Arc::new(Sun),
        TemporalConditionSolver::new(
            Duration::from_seconds(30.0),
            Duration::from_seconds(1e-2),
            100,
        )
        .unwrap(),
    )
    .unwrap();

    let window = Interval::new(epoch, epoch + Duration::from_seconds(period)).unwrap();
    let umbras = generator.umbra_intervals(&orbit, &window).unwrap();
    assert!(!umbras.is_empty(), "no umbra found over one revolution");

    let total_minutes: f64 = umbras
        .iter()
        .map(|interval| interval.duration().to_seconds() / 60.0)
        .sum();
    assert!(
        (30.0..40.0).contains(&total_minutes),
        "umbra total {total_minutes} min over one revolution"
    );

    // The umbra must be bracketed by penumbra on at least one side.
    let eclipses = generator.eclipse_intervals(&orbit, &window).unwrap();
    let eclipse_minutes: f64 = eclipses
        .iter()
        .map(|interval| interval.duration().to_seconds() / 60.0)
        .sum();
    assert!(eclipse_minutes > total_minutes);
}
