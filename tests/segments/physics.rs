use crate::{trainer, trainer_polar, MASS, MAX_THRUST};
use aeromission::linalg::DMatrix;
use aeromission::numerics::OperatorCache;
use aeromission::prelude::*;
use approx::assert_relative_eq;
use std::fmt;

fn cruise(altitude: f64) -> Segment {
    Segment::new(
        "cruise",
        SegmentKind::Cruise {
            air_speed: 60.0,
            distance: 2000.0,
            altitude: Some(altitude),
        },
    )
}

fn with_isa(segment: Segment) -> Segment {
    segment
        .with_physics(Arc::new(IsaAtmosphere::default()))
        .with_physics(Arc::new(trainer_polar()))
        .with_physics(Arc::new(ThrottledThrust {
            max_thrust: MAX_THRUST,
            tsfc: 1e-5,
            axis: ThrustAxis::Forward,
        }))
        .with_physics(Arc::new(UniformGravity::default()))
}

#[test]
fn thinner_air_needs_more_lift_coefficient() {
    let mut cache = OperatorCache::new();
    let mut low = with_isa(cruise(0.0));
    let mut high = with_isa(cruise(3000.0));
    low.solve(None, MASS, &mut cache).unwrap();
    high.solve(None, MASS, &mut cache).unwrap();

    let low = &low.state().unwrap().conditions;
    let high = &high.state().unwrap().conditions;
    assert_relative_eq!(low.freestream.density[0], 1.225, max_relative = 1e-3);
    assert!(high.freestream.density[0] < low.freestream.density[0]);
    // Thinner air at the same speed needs more lift coefficient
    assert!(high.aerodynamics.lift_coefficient[0] > low.aerodynamics.lift_coefficient[0]);
}

#[test]
fn isa_out_of_range_is_a_physics_error() {
    let mut too_high = with_isa(cruise(25_000.0));
    match too_high.solve(None, MASS, &mut OperatorCache::new()) {
        Err(MissionError::Physics { segment, source }) => {
            assert_eq!(segment, "cruise");
            assert!(matches!(
                source,
                PhysicsError::OutOfRange {
                    field: "altitude",
                    ..
                }
            ));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(too_high.status(), SegmentStatus::Failed);
}

/// Shrinks an array it does not own
struct Truncating;

impl fmt::Display for Truncating {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "truncating model")
    }
}

impl PhysicsModel for Truncating {
    fn evaluate(&self, _: &SegmentKind, conditions: &mut Conditions) -> Result<(), PhysicsError> {
        conditions.aerodynamics.drag_coefficient = DMatrix::zeros(1, 1);
        Ok(())
    }
}

#[test]
fn resized_conditions_are_rejected() {
    let mut segment = trainer(cruise(0.0), 0.0).with_physics(Arc::new(Truncating));
    match segment.solve(None, MASS, &mut OperatorCache::new()) {
        Err(MissionError::ShapeMismatch {
            field,
            expected,
            found,
        }) => {
            assert_eq!(field, "aerodynamics.drag_coefficient");
            assert_eq!(expected, 16);
            assert_eq!(found, 1);
        }
        other => panic!("unexpected {other:?}"),
    }
}

/// A user supplied model which gives up
struct Broken;

impl fmt::Display for Broken {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "broken model")
    }
}

impl PhysicsModel for Broken {
    fn evaluate(&self, _: &SegmentKind, _: &mut Conditions) -> Result<(), PhysicsError> {
        Err(PhysicsError::ModelFailure {
            model: "broken".to_string(),
            msg: "no data".to_string(),
        })
    }
}

#[test]
fn model_failures_are_not_swallowed() {
    let mut segment = trainer(cruise(0.0), 0.0).with_physics(Arc::new(Broken));
    let err = segment
        .solve(None, MASS, &mut OperatorCache::new())
        .unwrap_err();
    assert!(matches!(
        err,
        MissionError::Physics {
            source: PhysicsError::ModelFailure { .. },
            ..
        }
    ));
    assert!(err.to_string().contains("no data"));
}

#[test]
fn no_gravity_model_means_no_weight() {
    let mut hover = Segment::new(
        "float",
        SegmentKind::Hover {
            altitude: Some(50.0),
            time: 60.0,
        },
    )
    .with_physics(Arc::new(ConstantAtmosphere::sea_level()))
    .with_physics(Arc::new(ThrottledThrust {
        max_thrust: MAX_THRUST,
        tsfc: 1e-5,
        axis: ThrustAxis::Up,
    }));
    hover.solve(None, MASS, &mut OperatorCache::new()).unwrap();

    let conditions = &hover.state().unwrap().conditions;
    for i in 0..conditions.rows() {
        assert_eq!(conditions.freestream.gravity[i], 0.0);
        assert_eq!(conditions.frames.inertial.gravity_force_vector[(i, 2)], 0.0);
        assert!(conditions.propulsion.throttle[i].abs() < 1e-8);
    }
    assert_relative_eq!(conditions.final_mass(), MASS, max_relative = 1e-9);
}
