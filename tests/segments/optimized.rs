use crate::{trainer, MASS};
use aeromission::numerics::OperatorCache;
use aeromission::packing::Unknown;
use aeromission::prelude::*;
use approx::assert_relative_eq;
use rstest::rstest;
use std::f64::consts::FRAC_PI_2;

fn climb_to(altitude_end: f64, air_speed_end: EndSpeed, control_points: usize) -> Segment {
    trainer(
        Segment::new(
            "optimized",
            SegmentKind::OptimizedClimb {
                air_speed_start: 60.0,
                air_speed_end,
                altitude_start: Some(0.0),
                altitude_end,
                seed_climb_rate: 3.0,
            },
        ),
        1e-5,
    )
    .with_control_points(control_points)
}

fn optimized_climb(air_speed_end: EndSpeed) -> Segment {
    climb_to(300.0, air_speed_end, 10)
}

#[test]
fn fixed_end_speed_is_feasible() {
    let _ = pretty_env_logger::try_init();
    let mut climb = optimized_climb(EndSpeed::Fixed(70.0));
    let report = climb.solve(None, MASS, &mut OperatorCache::new()).unwrap();
    assert!(report.residual_norm < climb.options.tolerance);
    assert_eq!(climb.status(), SegmentStatus::Converged);

    let state = climb.state().unwrap();
    let cond = &state.conditions;
    assert_relative_eq!(cond.freestream.velocity[0], 60.0, max_relative = 1e-12);
    assert_relative_eq!(cond.final_air_speed(), 70.0, max_relative = 1e-12);
    assert_relative_eq!(cond.final_altitude(), 300.0, max_relative = 1e-9);
    assert!(cond.final_time() > 0.0);
    assert!(cond.final_mass() < MASS);

    // The solution honours the bounds of the unknowns
    for throttle in state.unknowns.get(Unknown::Throttle).unwrap().iter() {
        assert!((0.0..=1.0).contains(throttle));
    }
    for gamma in state.unknowns.get(Unknown::FlightPathAngle).unwrap().iter() {
        assert!((0.0..=FRAC_PI_2).contains(gamma));
    }
    assert_eq!(state.unknowns.get(Unknown::Velocity).unwrap().nrows(), 8);
}

#[test]
fn free_end_speed_is_feasible() {
    let mut climb = optimized_climb(EndSpeed::Free);
    climb.solve(None, MASS, &mut OperatorCache::new()).unwrap();

    let state = climb.state().unwrap();
    assert_eq!(state.unknowns.get(Unknown::Velocity).unwrap().nrows(), 9);
    assert_relative_eq!(
        state.conditions.final_altitude(),
        300.0,
        max_relative = 1e-9
    );
    assert!(state.conditions.final_air_speed() > 0.0);
}

#[test]
fn seed_inherits_the_boundary() {
    let mut cache = OperatorCache::new();
    let mut cruise = trainer(
        Segment::new(
            "cruise",
            SegmentKind::Cruise {
                air_speed: 60.0,
                distance: 3000.0,
                altitude: Some(0.0),
            },
        ),
        1e-5,
    );
    cruise.solve(None, MASS, &mut cache).unwrap();
    let last = cruise.state().unwrap().conditions.last_row();

    let mut climb = trainer(
        Segment::new(
            "optimized",
            SegmentKind::OptimizedClimb {
                air_speed_start: 60.0,
                air_speed_end: EndSpeed::Fixed(60.0),
                altitude_start: None,
                altitude_end: 200.0,
                seed_climb_rate: 2.0,
            },
        ),
        1e-5,
    )
    .with_control_points(10);
    climb.solve(Some(&last), MASS, &mut cache).unwrap();

    let cond = &climb.state().unwrap().conditions;
    assert_eq!(cond.frames.inertial.time[0], last.final_time());
    assert_eq!(cond.frames.inertial.position_vector[(0, 0)], last.final_range());
    assert_eq!(cond.weights.total_mass[0], last.final_mass());
    assert_relative_eq!(cond.final_altitude(), 200.0, max_relative = 1e-9);
    // The cruise uses the default control points, the optimized climb and its seed use ten
    assert_eq!(cache.len(), 2);
}

#[rstest]
#[case::least_fuel_fixed_end(300.0, EndSpeed::Fixed(70.0), 4, Objective::minimize(ObjectiveField::FuelBurn))]
#[case::heaviest_fixed_end(300.0, EndSpeed::Fixed(70.0), 4, Objective::maximize(ObjectiveField::FinalMass))]
#[case::fastest_fixed_end(500.0, EndSpeed::Fixed(70.0), 6, Objective::minimize(ObjectiveField::Duration))]
#[case::least_fuel_free_end(300.0, EndSpeed::Free, 6, Objective::minimize(ObjectiveField::FuelBurn))]
#[case::heaviest_free_end(300.0, EndSpeed::Free, 6, Objective::maximize(ObjectiveField::FinalMass))]
fn objective_improves_on_the_seed(
    #[case] altitude_end: f64,
    #[case] air_speed_end: EndSpeed,
    #[case] control_points: usize,
    #[case] objective: Objective,
) {
    let _ = pretty_env_logger::try_init();
    let options = SolverOptions::builder().max_iterations(100).build();
    let mut cache = OperatorCache::new();

    // Without an objective, the solution is the feasible seed
    let mut seeded = climb_to(altitude_end, air_speed_end, control_points).with_options(options);
    seeded.solve(None, MASS, &mut cache).unwrap();
    let seed_value = objective.evaluate(&seeded.state().unwrap().conditions);

    let mut climb = climb_to(altitude_end, air_speed_end, control_points)
        .with_options(options)
        .with_objective(objective);
    let report = climb.solve(None, MASS, &mut cache).unwrap();
    assert_eq!(climb.status(), SegmentStatus::Converged);
    assert!(report.residual_norm < options.tolerance);
    assert!(
        report.objective < seed_value,
        "{objective}: {} is no better than the seed {seed_value}",
        report.objective
    );

    let cond = &climb.state().unwrap().conditions;
    assert_relative_eq!(report.objective, objective.evaluate(cond), max_relative = 1e-12);
    assert_relative_eq!(cond.final_altitude(), altitude_end, max_relative = 1e-9);
    if let EndSpeed::Fixed(speed) = air_speed_end {
        assert_relative_eq!(cond.final_air_speed(), speed, max_relative = 1e-12);
    }
    assert!(cond.final_mass() < MASS);
}
