extern crate nalgebra as na;
extern crate pretty_env_logger;
extern crate rand;
extern crate rand_distr;
extern crate rand_pcg;
extern crate sidereal;

use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use rand_pcg::Pcg64Mcg;
use sidereal::cosmic::{CoordinateSubset, Earth, Frame, State, StateBuilder};
use sidereal::dynamics::{CentralBodyGravity, Dynamics, PositionDerivative};
use sidereal::linalg::Vector3;
use sidereal::od::{LeastSquaresSolver, ODLeastSquaresSolver};
use sidereal::propagators::{NumericalSolver, Propagator};
use sidereal::time::{Duration, Epoch};
use std::collections::HashMap;
use std::sync::Arc;

fn epoch() -> Epoch {
    Epoch::from_gregorian_utc_at_midnight(2023, 1, 1)
}

fn gcrf() -> Frame {
    Frame::inertial("GCRF")
}

fn two_body_propagator() -> Propagator {
    Propagator::new(
        NumericalSolver::default(),
        vec![
            Arc::new(PositionDerivative::new()) as Arc<dyn Dynamics>,
            Arc::new(CentralBodyGravity::new(Arc::new(Earth::new()))) as Arc<dyn Dynamics>,
        ],
    )
    .unwrap()
}

fn truth_state() -> State {
    let r = 7_000.0e3;
    let v = (Earth::GM / r).sqrt();
    State::from_position_velocity(
        epoch(),
        &Vector3::new(r, 0.0, 0.0),
        &Vector3::new(0.0, v * 0.6_f64.cos(), v * 0.6_f64.sin()),
        gcrf(),
    )
}

#[test]
fn position_fit_recovers_a_perturbed_guess() {
    if pretty_env_logger::try_init().is_err() {
        println!("could not init env_logger");
    }

    let propagator = two_body_propagator();
    let truth = truth_state();

    // Thirty noisy position fixes at 60 s spacing.
    let sigma_m = 5.0;
    let instants: Vec<Epoch> = (1..=30)
        .map(|i| epoch() + Duration::from_seconds(i as f64 * 60.0))
        .collect();
    let truth_states = propagator.calculate_states_at(&truth, &instants).unwrap();

    let mut rng = Pcg64Mcg::seed_from_u64(0x5eed);
    let noise = Normal::new(0.0, sigma_m).unwrap();
    let observation_builder =
        StateBuilder::new(gcrf(), vec![CoordinateSubset::CartesianPosition]).unwrap();
    let references: Vec<State> = truth_states
        .iter()
        .map(|state| {
            let jitter = Vector3::new(
                noise.sample(&mut rng),
                noise.sample(&mut rng),
                noise.sample(&mut rng),
            );
            let position = state.position().unwrap() + jitter;
            observation_builder
                .build(
                    state.instant(),
                    na::DVector::from_column_slice(position.as_slice()),
                )
                .unwrap()
        })
        .collect();

    // The initial guess sits one kilometer off in position.
    let offset = Vector3::new(1.0e3, 0.0, 0.0);
    let guess = State::from_position_velocity(
        epoch(),
        &(truth.position().unwrap() + offset),
        &truth.velocity().unwrap(),
        gcrf(),
    );

    let od = ODLeastSquaresSolver::new(two_body_propagator(), LeastSquaresSolver::default());
    let analysis = od
        .estimate_state(
            &guess,
            &references,
            &[],
            &HashMap::new(),
            &HashMap::from([(CoordinateSubset::CartesianPosition, sigma_m)]),
        )
        .unwrap();

    assert!(analysis.solver_analysis.has_converged);
    assert!(
        analysis.solver_analysis.iteration_count <= 10,
        "took {} iterations",
        analysis.solver_analysis.iteration_count
    );

    let recovered = analysis.determined_state.position().unwrap();
    let position_error = (recovered - truth.position().unwrap()).norm();
    assert!(
        position_error < 20.0,
        "determined position off by {position_error} m"
    );

    // The weighted residual RMS settles near unity for consistent sigmas.
    assert!(
        analysis.solver_analysis.rms_error < 3.0,
        "rms {} looks inconsistent with the noise level",
        analysis.solver_analysis.rms_error
    );
}

#[test]
fn perfect_observations_reproduce_the_truth() {
    let propagator = two_body_propagator();
    let truth = truth_state();

    let instants: Vec<Epoch> = (1..=10)
        .map(|i| epoch() + Duration::from_seconds(i as f64 * 120.0))
        .collect();
    let references = propagator.calculate_states_at(&truth, &instants).unwrap();

    let guess = State::from_position_velocity(
        epoch(),
        &(truth.position().unwrap() + Vector3::new(200.0, -150.0, 90.0)),
        &(truth.velocity().unwrap() + Vector3::new(0.1, 0.2, -0.1)),
        gcrf(),
    );

    let od = ODLeastSquaresSolver::new(two_body_propagator(), LeastSquaresSolver::default());
    let analysis = od
        .estimate_state(&guess, &references, &[], &HashMap::new(), &HashMap::new())
        .unwrap();

    assert!(analysis.solver_analysis.has_converged);
    let position_error = (analysis.determined_state.position().unwrap()
        - truth.position().unwrap())
    .norm();
    let velocity_error = (analysis.determined_state.velocity().unwrap()
        - truth.velocity().unwrap())
    .norm();
    assert!(position_error < 1.0, "position error {position_error} m");
    assert!(velocity_error < 1e-3, "velocity error {velocity_error} m/s");
}
