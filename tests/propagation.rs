extern crate pretty_env_logger;
extern crate sidereal;

use sidereal::cosmic::{
    CoordinateBroker, CoordinateSubset, Earth, ExponentialAtmosphere, Frame, State,
};
use sidereal::dynamics::{
    AtmosphericDrag, CentralBodyGravity, Dynamics, PositionDerivative, Tabulated,
};
use sidereal::linalg::{DMatrix, DVector, Vector3};
use sidereal::md::events::{CoeCondition, Criterion, RealCondition, Target};
use sidereal::orbit::{KeplerModel, KeplerPerturbation, KeplerianElements, Trajectory};
use sidereal::propagators::{LogType, NumericalSolver, Propagator, Stepper};
use sidereal::time::{Duration, Epoch};
use sidereal::utils::rss_errors;
use std::sync::Arc;

fn epoch() -> Epoch {
    Epoch::from_gregorian_utc_at_midnight(2023, 1, 1)
}

fn gcrf() -> Frame {
    Frame::inertial("GCRF")
}

/// The S1 initial state: a circular equatorial orbit at 7000 km radius.
fn circular_state() -> State {
    State::from_position_velocity(
        epoch(),
        &Vector3::new(7_000.0e3, 0.0, 0.0),
        &Vector3::new(0.0, 7_546.053_290, 0.0),
        gcrf(),
    )
}

fn two_body_dynamics() -> Vec<Arc<dyn Dynamics>> {
    vec![
        Arc::new(PositionDerivative::new()) as Arc<dyn Dynamics>,
        Arc::new(CentralBodyGravity::new(Arc::new(Earth::new()))) as Arc<dyn Dynamics>,
    ]
}

#[test]
fn two_body_day_against_the_analytic_solution() {
    if pretty_env_logger::try_init().is_err() {
        println!("could not init env_logger");
    }

    let solver = NumericalSolver::new(
        Stepper::DormandPrince45,
        30.0,
        1e-9,
        1e-9,
        LogType::NoLog,
    )
    .unwrap();
    let propagator = Propagator::new(solver, two_body_dynamics()).unwrap();

    let initial = circular_state();
    let target = epoch() + Duration::from_seconds(86_400.0);
    let propagated = propagator.calculate_state_at(&initial, target).unwrap();

    // The analytic two-body solution through the Kepler model.
    let elements = KeplerianElements::from_cartesian(
        &initial.position().unwrap(),
        &initial.velocity().unwrap(),
        Earth::GM,
    )
    .unwrap();
    let analytic = KeplerModel::new(elements, epoch(), Earth::GM, gcrf(), KeplerPerturbation::None)
        .unwrap()
        .state_at(target)
        .unwrap();

    let position_error = rss_errors(
        &propagated.position().unwrap(),
        &analytic.position().unwrap(),
    );
    assert!(
        position_error < 5.0,
        "position error after one day: {position_error} m"
    );

    // Fourteen full revolutions fit in the day.
    let revolutions = (86_400.0 / elements.period(Earth::GM)).floor() as u32;
    assert_eq!(revolutions, 14);
}

#[test]
fn drag_decays_the_semi_major_axis() {
    let earth = Arc::new(Earth::with_atmosphere(ExponentialAtmosphere {
        reference_altitude_m: 600.0e3,
        reference_density_kg_m3: 1.3e-12,
        scale_height_m: 70.0e3,
    }));

    // Drag reads the mass, area, and drag-coefficient channels; a constant
    // zero-rate profile produces them over the analysis span.
    let span = 86_400.0;
    let parameter_channels = Tabulated::new(
        vec![
            epoch() - Duration::from_seconds(60.0),
            epoch() + Duration::from_seconds(span + 60.0),
        ],
        DMatrix::zeros(2, 3),
        vec![
            CoordinateSubset::Mass,
            CoordinateSubset::SurfaceArea,
            CoordinateSubset::DragCoefficient,
        ],
        gcrf(),
    )
    .unwrap();

    let mut dynamics = two_body_dynamics();
    dynamics.push(Arc::new(parameter_channels) as Arc<dyn Dynamics>);
    dynamics.push(Arc::new(AtmosphericDrag::new(earth)) as Arc<dyn Dynamics>);
    let propagator = Propagator::new(NumericalSolver::default(), dynamics).unwrap();

    // The circular state, extended with the drag parameters.
    let broker = Arc::new(CoordinateBroker::from_subsets(vec![
        CoordinateSubset::CartesianPosition,
        CoordinateSubset::CartesianVelocity,
        CoordinateSubset::Mass,
        CoordinateSubset::SurfaceArea,
        CoordinateSubset::DragCoefficient,
    ]));
    let initial = State::new(
        epoch(),
        DVector::from_vec(vec![
            7_000.0e3,
            0.0,
            0.0,
            0.0,
            7_546.053_290,
            0.0,
            100.0,
            1.0,
            2.2,
        ]),
        gcrf(),
        broker,
    )
    .unwrap();

    let instants: Vec<Epoch> = (0..=24)
        .map(|hour| epoch() + Duration::from_seconds(hour as f64 * 3_600.0))
        .collect();
    let states = propagator.calculate_states_at(&initial, &instants).unwrap();

    let sma_of = |state: &State| -> f64 {
        KeplerianElements::from_cartesian(
            &state.position().unwrap(),
            &state.velocity().unwrap(),
            Earth::GM,
        )
        .unwrap()
        .sma()
    };

    // Monotonic decay, hour over hour (osculating wiggle stays tiny for a
    // near-circular orbit).
    let smas: Vec<f64> = states.iter().map(sma_of).collect();
    for pair in smas.windows(2) {
        assert!(
            pair[1] < pair[0] + 1.0e-3,
            "semi-major axis increased: {} -> {} m",
            pair[0],
            pair[1]
        );
    }

    let decay = smas[0] - smas[smas.len() - 1];
    assert!(
        (60.0..120.0).contains(&decay),
        "semi-major axis decay over one day: {decay} m"
    );
}

#[test]
fn never_satisfied_condition_coasts_to_the_end() {
    let propagator = Propagator::new(NumericalSolver::default(), two_body_dynamics()).unwrap();
    let initial = circular_state();

    // A strictly-positive condition on a quantity pinned negative.
    let condition = RealCondition::new(
        "never",
        Criterion::StrictlyPositive,
        Arc::new(|_: &State| Ok(-1.0)),
        Target::absolute(0.0),
    );

    let solution = propagator
        .calculate_state_to_condition(&initial, Duration::from_seconds(3_600.0), &condition)
        .unwrap();

    assert!(!solution.condition_is_satisfied);
    assert_eq!(
        solution.state.instant(),
        epoch() + Duration::from_seconds(3_600.0)
    );
}

#[test]
fn apoapsis_condition_stops_at_apoapsis() {
    let propagator = Propagator::new(NumericalSolver::default(), two_body_dynamics()).unwrap();

    // An elliptical orbit departing periapsis.
    let elements = KeplerianElements::new(7_500.0e3, 0.05, 0.4, 0.0, 0.0, 0.0).unwrap();
    let (r, v) = elements.to_cartesian(Earth::GM).unwrap();
    let initial = State::from_position_velocity(epoch(), &r, &v, gcrf());

    let condition = CoeCondition::apoapsis(Earth::GM);
    let solution = propagator
        .calculate_state_to_condition(
            &initial,
            Duration::from_seconds(2.0 * elements.period(Earth::GM)),
            condition.as_ref(),
        )
        .unwrap();

    assert!(solution.condition_is_satisfied);
    assert!(solution.root_solver_has_converged);

    // Half a period to apoapsis, apoapsis radius at the stop.
    let elapsed = (solution.state.instant() - epoch()).to_seconds();
    let half_period = elements.period(Earth::GM) / 2.0;
    assert!(
        (elapsed - half_period).abs() < 1.0,
        "elapsed to apoapsis: {elapsed} s vs {half_period} s"
    );
    let radius = solution.state.position().unwrap().norm();
    assert!(
        (radius - elements.apoapsis_radius()).abs() < 10.0,
        "radius at the stop: {radius} m"
    );

    // The refined root sits on the condition within tolerance.
    assert!(condition.evaluate(&solution.state).unwrap().abs() < 1e-6);
}

#[test]
fn steppers_agree_on_a_short_arc() {
    let initial = circular_state();
    let target = epoch() + Duration::from_seconds(1_800.0);

    let mut finals = Vec::new();
    for stepper in [
        Stepper::CashKarp45,
        Stepper::DormandPrince45,
        Stepper::Fehlberg78,
    ] {
        let solver = NumericalSolver::new(stepper, 30.0, 1e-12, 1e-12, LogType::NoLog).unwrap();
        let propagator = Propagator::new(solver, two_body_dynamics()).unwrap();
        let state = propagator.calculate_state_at(&initial, target).unwrap();
        finals.push(state.position().unwrap());
    }
    for pair in finals.windows(2) {
        assert!(
            (pair[0] - pair[1]).norm() < 1e-3,
            "steppers disagree by {} m",
            (pair[0] - pair[1]).norm()
        );
    }
}
