use crate::{rotorcraft, trainer, MASS};
use aeromission::prelude::*;
use approx::{assert_abs_diff_eq, assert_relative_eq};
use rstest::rstest;

mod failures;

fn climb(name: &str, altitude_start: Option<f64>, altitude_end: f64) -> Segment {
    trainer(
        Segment::new(
            name,
            SegmentKind::ClimbConstantSpeedConstantRate {
                air_speed: 60.0,
                climb_rate: 3.0,
                altitude_start,
                altitude_end,
            },
        ),
        1e-5,
    )
}

fn cruise(name: &str, altitude: Option<f64>) -> Segment {
    trainer(
        Segment::new(
            name,
            SegmentKind::Cruise {
                air_speed: 60.0,
                distance: 3000.0,
                altitude,
            },
        ),
        1e-5,
    )
}

fn descent(name: &str, altitude_start: Option<f64>, altitude_end: f64) -> Segment {
    trainer(
        Segment::new(
            name,
            SegmentKind::DescentConstantSpeedConstantRate {
                air_speed: 60.0,
                descent_rate: 3.0,
                altitude_start,
                altitude_end,
            },
        ),
        1e-5,
    )
}

/// Checks that every segment starts where the previous one ended
fn assert_continuous(results: &MissionResults) {
    let segments: Vec<&SegmentResults> = results.iter().collect();
    for pair in segments.windows(2) {
        let end = pair[0].conditions.last_row();
        let start = pair[1].conditions.first_row();
        assert_eq!(start.final_time(), end.final_time(), "time jumps before `{}`", pair[1].name);
        assert_eq!(start.final_mass(), end.final_mass(), "mass jumps before `{}`", pair[1].name);
        assert_eq!(start.final_range(), end.final_range(), "range jumps before `{}`", pair[1].name);
        assert_abs_diff_eq!(start.final_altitude(), end.final_altitude(), epsilon = 1e-6);
    }
}

#[rstest]
#[case::all_given(Some(0.0), Some(300.0), Some(300.0))]
#[case::all_inherited(Some(0.0), None, None)]
#[case::cruise_given(Some(0.0), Some(300.0), None)]
#[case::descent_given(Some(0.0), None, Some(300.0))]
fn continuity(
    #[case] climb_start: Option<f64>,
    #[case] cruise_altitude: Option<f64>,
    #[case] descent_start: Option<f64>,
) {
    let _ = pretty_env_logger::try_init();
    let mut mission = Mission::builder("continuity", MASS)
        .segment(climb("climb", climb_start, 300.0))
        .segment(cruise("cruise", cruise_altitude))
        .segment(descent("descent", descent_start, 100.0))
        .build()
        .unwrap();
    let results = mission.evaluate().unwrap();

    assert_eq!(results.len(), 3);
    let names: Vec<&str> = results.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["climb", "cruise", "descent"]);
    for segment in results.iter() {
        assert_eq!(segment.status, SegmentStatus::Converged);
        assert!(segment.residual_norm < 1e-8);
        assert!(segment.objective_value.is_none());
    }
    assert_continuous(&results);

    // 100 s of climb, 50 s of cruise, then down 200 m at 3 m/s
    assert_relative_eq!(
        results.total_time(),
        150.0 + 200.0 / 3.0,
        max_relative = 1e-12
    );
    let last = results.final_conditions().unwrap();
    assert_relative_eq!(last.final_altitude(), 100.0, max_relative = 1e-9);
    assert_relative_eq!(results.fuel_burn(), MASS - last.final_mass(), max_relative = 1e-12);
    assert_relative_eq!(results.range(), last.final_range(), max_relative = 1e-12);
    assert!(results.fuel_burn() > 0.0);
}

#[test]
fn explicit_resets() {
    let mut mission = Mission::builder("resets", MASS)
        .segment(climb("climb", Some(0.0), 300.0))
        .segment(
            cruise("cruise", Some(500.0))
                .with_reset(Reset::Altitude)
                .with_reset(Reset::Time(0.0))
                .with_reset(Reset::Mass(900.0)),
        )
        .segment(descent("descent", None, 100.0))
        .build()
        .unwrap();
    let results = mission.evaluate().unwrap();

    let climb = results.get("climb").unwrap();
    let cruise = results.get("cruise").unwrap();
    assert_eq!(cruise.conditions.frames.inertial.time[0], 0.0);
    assert_eq!(cruise.conditions.weights.total_mass[0], 900.0);
    assert_relative_eq!(cruise.conditions.freestream.altitude[0], 500.0);
    // Range is never reset
    assert_eq!(
        cruise.conditions.frames.inertial.position_vector[(0, 0)],
        climb.conditions.final_range()
    );
    assert_continuous(&MissionResults {
        name: "tail".to_string(),
        segments: results
            .segments
            .iter()
            .skip(1)
            .map(|(name, r)| (name.clone(), r.clone()))
            .collect(),
    });

    // The dropped mass is not fuel
    assert!(results.fuel_burn() < 5.0);
    // Total time adds up the segments across the clock reset
    let durations: f64 = results.iter().map(SegmentResults::duration).sum();
    assert_relative_eq!(results.total_time(), durations, max_relative = 1e-12);
    assert_relative_eq!(
        results.total_time(),
        100.0 + 50.0 + 400.0 / 3.0,
        max_relative = 1e-9
    );
}

#[test]
fn clock_reset_between_cruises() {
    let mut mission = Mission::builder("two legs", MASS)
        .segment(cruise("outbound", Some(300.0)))
        .segment(cruise("return", None).with_reset(Reset::Time(0.0)))
        .build()
        .unwrap();
    let results = mission.evaluate().unwrap();

    let second = results.get("return").unwrap();
    assert_eq!(second.conditions.frames.inertial.time[0], 0.0);
    assert_relative_eq!(second.conditions.final_time(), 50.0, max_relative = 1e-9);
    assert_relative_eq!(results.total_time(), 100.0, max_relative = 1e-9);
}

#[test]
fn altitude_mismatch_needs_a_reset() {
    let mut mission = Mission::builder("jump", MASS)
        .segment(climb("climb", Some(0.0), 300.0))
        .segment(cruise("cruise", Some(500.0)))
        .build()
        .unwrap();
    match mission.evaluate() {
        Err(MissionError::InvalidConfiguration { msg }) => assert!(msg.contains("cruise")),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(mission.segments()[0].status(), SegmentStatus::Converged);
    assert_eq!(mission.segments()[1].status(), SegmentStatus::Failed);

    // Small round off is tolerated
    let mut mission = Mission::builder("round off", MASS)
        .segment(climb("climb", Some(0.0), 300.0))
        .segment(cruise("cruise", Some(300.0 + 1e-7)))
        .build()
        .unwrap();
    assert!(mission.evaluate().is_ok());
}

#[test]
fn vertical_mission_with_payload_drop() {
    let segments = [
        Segment::new(
            "lift off",
            SegmentKind::HoverClimb {
                climb_rate: 2.0,
                altitude_start: Some(0.0),
                altitude_end: 50.0,
            },
        ),
        Segment::new(
            "hold",
            SegmentKind::Hover {
                altitude: None,
                time: 120.0,
            },
        ),
        Segment::new(
            "land",
            SegmentKind::HoverDescent {
                descent_rate: 1.5,
                altitude_start: None,
                altitude_end: 0.0,
            },
        )
        .with_reset(Reset::Mass(700.0)),
    ];
    let mut builder = Mission::builder("hop", 800.0);
    for segment in segments {
        builder = builder.segment(rotorcraft(segment, 16_000.0, 2e-5).with_control_points(8));
    }
    let mut mission = builder.build().unwrap();
    let results = mission.evaluate().unwrap();

    let hold = results.get("hold").unwrap();
    let land = results.get("land").unwrap();
    assert_relative_eq!(hold.duration(), 120.0, max_relative = 1e-12);
    assert_relative_eq!(hold.conditions.freestream.altitude[0], 50.0, max_relative = 1e-9);
    assert_eq!(land.conditions.weights.total_mass[0], 700.0);
    assert_relative_eq!(land.duration(), 50.0 / 1.5, max_relative = 1e-9);
    // Lighter after the drop, so the rotors need less throttle
    let hold_throttle = hold.conditions.propulsion.throttle[hold.conditions.rows() - 1];
    assert!(land.conditions.propulsion.throttle[0] < hold_throttle);
}

#[test]
fn evaluating_twice_gives_the_same_results() {
    let mut mission = Mission::builder("twice", MASS)
        .segment(climb("climb", Some(0.0), 300.0))
        .segment(cruise("cruise", None))
        .build()
        .unwrap();
    let first = mission.evaluate().unwrap();
    let second = mission.evaluate().unwrap();
    for (a, b) in first.iter().zip(second.iter()) {
        assert_eq!(a.conditions, b.conditions);
        assert_eq!(a.iterations, b.iterations);
    }
}
