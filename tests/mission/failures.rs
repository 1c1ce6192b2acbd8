use crate::{trainer, MASS};
use aeromission::numerics::OperatorCache;
use aeromission::prelude::*;
use rstest::rstest;

fn cruise() -> Segment {
    trainer(
        Segment::new(
            "cruise",
            SegmentKind::Cruise {
                air_speed: 60.0,
                distance: 3000.0,
                altitude: Some(300.0),
            },
        ),
        1e-5,
    )
}

fn expect_invalid(segment: Segment) -> String {
    let mut mission = Mission::builder("invalid", MASS)
        .segment(segment)
        .build()
        .unwrap();
    match mission.evaluate() {
        Err(MissionError::InvalidConfiguration { msg }) => msg,
        other => panic!("unexpected {other:?}"),
    }
}

#[rstest]
#[case::zero_climb_rate(SegmentKind::ClimbConstantSpeedConstantRate { air_speed: 60.0, climb_rate: 0.0, altitude_start: Some(0.0), altitude_end: 300.0 })]
#[case::zero_descent_rate(SegmentKind::DescentConstantSpeedConstantRate { air_speed: 60.0, descent_rate: 0.0, altitude_start: Some(300.0), altitude_end: 0.0 })]
#[case::zero_hover_climb_rate(SegmentKind::HoverClimb { climb_rate: 0.0, altitude_start: Some(0.0), altitude_end: 50.0 })]
#[case::negative_seed_rate(SegmentKind::OptimizedClimb { air_speed_start: 60.0, air_speed_end: EndSpeed::Free, altitude_start: Some(0.0), altitude_end: 300.0, seed_climb_rate: -1.0 })]
#[case::rate_above_speed(SegmentKind::ClimbConstantSpeedConstantRate { air_speed: 5.0, climb_rate: 6.0, altitude_start: Some(0.0), altitude_end: 300.0 })]
#[case::climbing_down(SegmentKind::ClimbConstantSpeedConstantRate { air_speed: 60.0, climb_rate: 3.0, altitude_start: Some(300.0), altitude_end: 0.0 })]
#[case::zero_distance(SegmentKind::Cruise { air_speed: 60.0, distance: 0.0, altitude: Some(0.0) })]
fn rejected_before_solving(#[case] kind: SegmentKind) {
    let msg = expect_invalid(trainer(Segment::new("bad", kind), 0.0));
    assert!(msg.contains("`bad`"), "{msg}");
}

#[test]
fn objective_only_on_optimized_segments() {
    let msg = expect_invalid(cruise().with_objective(Objective::minimize(ObjectiveField::FuelBurn)));
    assert!(msg.contains("objective"), "{msg}");
}

#[test]
fn too_few_control_points() {
    expect_invalid(cruise().with_control_points(1));
}

#[test]
fn first_segment_needs_an_altitude() {
    let mut mission = Mission::builder("nowhere", MASS)
        .segment(trainer(
            Segment::new(
                "descent",
                SegmentKind::DescentConstantSpeedConstantRate {
                    air_speed: 60.0,
                    descent_rate: 3.0,
                    altitude_start: None,
                    altitude_end: 0.0,
                },
            ),
            1e-5,
        ))
        .build()
        .unwrap();
    match mission.evaluate() {
        Err(MissionError::MissingInitialState { segment, quantity }) => {
            assert_eq!(segment, "descent");
            assert_eq!(quantity, "altitude");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn altitude_reset_needs_an_altitude() {
    let follow = trainer(
        Segment::new(
            "follow",
            SegmentKind::Cruise {
                air_speed: 60.0,
                distance: 1000.0,
                altitude: None,
            },
        ),
        1e-5,
    )
    .with_reset(Reset::Altitude);
    let mut mission = Mission::builder("reset", MASS)
        .segment(cruise())
        .segment(follow)
        .build()
        .unwrap();
    assert!(matches!(
        mission.evaluate(),
        Err(MissionError::InvalidConfiguration { .. })
    ));
}

#[test]
fn empty_initial_conditions() {
    let mut follow = trainer(
        Segment::new(
            "follow",
            SegmentKind::Cruise {
                air_speed: 60.0,
                distance: 1000.0,
                altitude: None,
            },
        ),
        1e-5,
    );
    let empty = Conditions::new(0);
    match follow.solve(Some(&empty), MASS, &mut OperatorCache::new()) {
        Err(MissionError::InvalidConfiguration { msg }) => assert!(msg.contains("`follow`"), "{msg}"),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(follow.status(), SegmentStatus::Failed);
}

#[test]
fn tiny_budget_fails_without_results() {
    let starved = SolverOptions::builder().max_iterations(0).build();
    let mut mission = Mission::builder("starved", MASS)
        .segment(cruise())
        .segment(
            trainer(
                Segment::new(
                    "descent",
                    SegmentKind::DescentConstantSpeedConstantRate {
                        air_speed: 60.0,
                        descent_rate: 3.0,
                        altitude_start: None,
                        altitude_end: 0.0,
                    },
                ),
                1e-5,
            )
            .with_options(starved),
        )
        .build()
        .unwrap();

    match mission.evaluate() {
        Err(MissionError::SolverNonConvergence {
            segment,
            iterations,
            residual_norm,
        }) => {
            assert_eq!(segment, "descent");
            assert_eq!(iterations, 0);
            assert!(residual_norm > 0.0);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(mission.segments()[0].status(), SegmentStatus::Converged);
    assert_eq!(mission.segments()[1].status(), SegmentStatus::Failed);
}

#[test]
fn builder_rejects_duplicates() {
    let result = Mission::builder("twice", MASS)
        .segment(cruise())
        .segment(cruise())
        .build();
    assert!(matches!(
        result,
        Err(MissionError::InvalidConfiguration { .. })
    ));
}
