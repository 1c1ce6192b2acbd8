use crate::{rotorcraft, trainer, trainer_polar, G, MASS};
use aeromission::numerics::OperatorCache;
use aeromission::prelude::*;
use approx::{assert_abs_diff_eq, assert_relative_eq};
use rstest::rstest;

mod optimized;
mod physics;

fn solve(segment: &mut Segment) -> Conditions {
    let _ = pretty_env_logger::try_init();
    let report = segment
        .solve(None, MASS, &mut OperatorCache::new())
        .unwrap();
    assert!(report.residual_norm < segment.options.tolerance);
    assert_eq!(segment.status(), SegmentStatus::Converged);
    segment.state().unwrap().conditions.clone()
}

#[test]
fn constant_rate_climb_closed_form() {
    let (air_speed, climb_rate) = (60.0, 3.0);
    let mut climb = trainer(
        Segment::new(
            "climb",
            SegmentKind::ClimbConstantSpeedConstantRate {
                air_speed,
                climb_rate,
                altitude_start: Some(0.0),
                altitude_end: 300.0,
            },
        ),
        0.0,
    );
    let cond = solve(&mut climb);

    let duration = 300.0 / climb_rate;
    assert_relative_eq!(cond.final_time(), duration, max_relative = 1e-12);
    assert_relative_eq!(cond.final_altitude(), 300.0, max_relative = 1e-10);
    assert_relative_eq!(
        cond.final_range(),
        (air_speed * air_speed - climb_rate * climb_rate).sqrt() * duration,
        max_relative = 1e-10
    );
    assert_relative_eq!(cond.final_air_speed(), air_speed, max_relative = 1e-12);
    // Without fuel burn the problem is the same at every control point
    assert_eq!(cond.final_mass(), MASS);
    let throttle = &cond.propulsion.throttle;
    for i in 1..cond.rows() {
        assert_relative_eq!(throttle[i], throttle[0], max_relative = 1e-6);
    }

    // Force balance along and across the flight path, in wind axes
    let polar = trainer_polar();
    let gamma = (climb_rate / air_speed).asin();
    let weight = MASS * G;
    for i in 0..cond.rows() {
        let alpha = cond.aerodynamics.angle_of_attack[i];
        let thrust = cond.propulsion.thrust[i];
        let qs = cond.freestream.dynamic_pressure[i] * polar.reference_area;
        let (cl, cd) = polar.coefficients(alpha);
        assert_abs_diff_eq!(cond.frames.wind.inertial_rotations[(i, 1)], gamma, epsilon = 1e-12);
        assert_abs_diff_eq!(
            thrust * alpha.cos() - qs * cd - weight * gamma.sin(),
            0.0,
            epsilon = 1e-3
        );
        assert_abs_diff_eq!(
            thrust * alpha.sin() + qs * cl - weight * gamma.cos(),
            0.0,
            epsilon = 1e-3
        );
    }
}

#[rstest]
#[case::hover(SegmentKind::Hover { altitude: Some(0.0), time: 60.0 })]
#[case::hover_climb(SegmentKind::HoverClimb { climb_rate: 2.0, altitude_start: Some(0.0), altitude_end: 50.0 })]
#[case::hover_descent(SegmentKind::HoverDescent { descent_rate: 1.5, altitude_start: Some(50.0), altitude_end: 0.0 })]
fn hover_throttle_balances_weight(#[case] kind: SegmentKind) {
    let max_thrust = 20_000.0;
    let mut hover = rotorcraft(Segment::new("hover", kind), max_thrust, 0.0).with_control_points(8);
    let cond = solve(&mut hover);

    for i in 0..cond.rows() {
        assert_relative_eq!(
            cond.propulsion.throttle[i],
            MASS * G / max_thrust,
            max_relative = 1e-6
        );
        assert_eq!(cond.frames.inertial.position_vector[(i, 0)], 0.0);
    }
}

#[test]
fn hover_climb_duration() {
    let mut hover = rotorcraft(
        Segment::new(
            "up",
            SegmentKind::HoverClimb {
                climb_rate: 2.0,
                altitude_start: Some(10.0),
                altitude_end: 50.0,
            },
        ),
        20_000.0,
        1e-5,
    )
    .with_control_points(8);
    let cond = solve(&mut hover);
    assert_relative_eq!(cond.final_time(), 20.0, max_relative = 1e-12);
    assert_relative_eq!(cond.final_altitude(), 50.0, max_relative = 1e-10);
    // Hovering burns fuel, so the throttle decreases along the segment
    assert!(cond.final_mass() < MASS);
    assert!(cond.propulsion.throttle[cond.rows() - 1] < cond.propulsion.throttle[0]);
}

#[test]
fn linear_speed_climb_accelerates() {
    let mut climb = trainer(
        Segment::new(
            "accelerate",
            SegmentKind::ClimbLinearSpeedConstantRate {
                air_speed_start: 60.0,
                air_speed_end: 70.0,
                climb_rate: 3.0,
                altitude_start: Some(0.0),
                altitude_end: 300.0,
            },
        ),
        1e-5,
    );
    let cond = solve(&mut climb);

    assert_relative_eq!(cond.freestream.velocity[0], 60.0, max_relative = 1e-12);
    assert_relative_eq!(cond.final_air_speed(), 70.0, max_relative = 1e-12);
    assert_relative_eq!(cond.final_altitude(), 300.0, max_relative = 1e-10);
    // dV/dt = 0.1 m/s², the horizontal speed is sqrt(V² - 9)
    for i in [0, cond.rows() / 2, cond.rows() - 1] {
        let v = cond.freestream.velocity[i];
        assert_relative_eq!(
            cond.frames.inertial.acceleration_vector[(i, 0)],
            0.1 * v / (v * v - 9.0).sqrt(),
            max_relative = 1e-6
        );
    }
    assert!(cond.final_mass() < MASS);
}

#[test]
fn cruise_and_descent() {
    let mut cache = OperatorCache::new();
    let mut cruise = trainer(
        Segment::new(
            "cruise",
            SegmentKind::Cruise {
                air_speed: 60.0,
                distance: 5000.0,
                altitude: Some(1000.0),
            },
        ),
        1e-5,
    );
    cruise.solve(None, MASS, &mut cache).unwrap();
    let cond = &cruise.state().unwrap().conditions;
    assert_relative_eq!(cond.final_time(), 5000.0 / 60.0, max_relative = 1e-12);
    assert_relative_eq!(cond.final_range(), 5000.0, max_relative = 1e-10);
    for i in 0..cond.rows() {
        assert_abs_diff_eq!(cond.freestream.altitude[i], 1000.0, epsilon = 1e-9);
    }
    let fuel = MASS - cond.final_mass();
    assert!(fuel > 0.0 && fuel < 1.0, "unexpected fuel burn {fuel}");

    let mut descent = trainer(
        Segment::new(
            "descent",
            SegmentKind::DescentConstantSpeedConstantRate {
                air_speed: 60.0,
                descent_rate: 3.0,
                altitude_start: None,
                altitude_end: 700.0,
            },
        ),
        1e-5,
    );
    let last = cond.last_row();
    descent.solve(Some(&last), MASS, &mut cache).unwrap();
    let cond = &descent.state().unwrap().conditions;
    assert_relative_eq!(cond.final_altitude(), 700.0, max_relative = 1e-10);
    assert_relative_eq!(cond.final_time(), 5000.0 / 60.0 + 100.0, max_relative = 1e-12);
    // Gliding down needs less thrust than cruising
    let cruise_throttle = cruise.state().unwrap().conditions.propulsion.throttle[0];
    assert!(cond.propulsion.throttle[0] < cruise_throttle);
    // Only one operator set for the default control points
    assert_eq!(cache.len(), 1);
}

#[test]
fn solving_again_starts_over() {
    let mut climb = trainer(
        Segment::new(
            "climb",
            SegmentKind::ClimbConstantSpeedConstantRate {
                air_speed: 60.0,
                climb_rate: 3.0,
                altitude_start: Some(0.0),
                altitude_end: 300.0,
            },
        ),
        1e-5,
    );
    let first = solve(&mut climb);
    let iterations = climb.report().unwrap().iterations;
    let second = solve(&mut climb);
    assert_eq!(first, second);
    assert_eq!(climb.report().unwrap().iterations, iterations);

    climb.reset();
    assert_eq!(climb.status(), SegmentStatus::Unsolved);
    assert!(climb.state().is_none());
}
