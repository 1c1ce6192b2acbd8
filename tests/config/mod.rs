use crate::manifest_dir;
use aeromission::io::{ConfigError, ConfigRepr, Configurable, MissionSerde};
use aeromission::prelude::*;
use approx::assert_relative_eq;

fn mission_file(name: &str) -> std::path::PathBuf {
    manifest_dir().join("data").join("missions").join(name)
}

#[test]
fn trainer_mission_from_yaml() {
    let _ = pretty_env_logger::try_init();
    let mut mission = Mission::from_yaml(mission_file("trainer.yaml")).unwrap();
    assert_eq!(mission.name, "trainer");
    assert_eq!(mission.segments().len(), 4);
    assert_eq!(mission.segment("cruise").unwrap().control_points, 12);

    let results = mission.evaluate().unwrap();
    let names: Vec<&str> = results.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["initial climb", "accelerate", "cruise", "descent"]);
    let last = results.final_conditions().unwrap();
    assert_relative_eq!(last.final_altitude(), 300.0, max_relative = 1e-9);
    assert!(results.range() > 20_000.0);
    assert!(results.fuel_burn() > 0.0);

    // Every control point of every segment, plus the header
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trainer.csv");
    results.to_csv(&path).unwrap();
    let mut rdr = csv::Reader::from_path(&path).unwrap();
    let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 16 + 16 + 12 + 16);
    assert_eq!(&rows[0][0], "initial climb");
    assert_eq!(&rows[rows.len() - 1][0], "descent");
}

#[test]
fn vertical_hop_from_yaml() {
    let mut mission = Mission::from_yaml(mission_file("vertical_hop.yaml")).unwrap();
    let results = mission.evaluate().unwrap();
    let land = results.get("drop and land").unwrap();
    assert_eq!(land.conditions.weights.total_mass[0], 700.0);
    assert_relative_eq!(
        results.final_conditions().unwrap().final_altitude(),
        0.0,
        epsilon = 1e-9
    );
}

#[test]
fn optimized_climb_from_yaml() {
    let _ = pretty_env_logger::try_init();
    let yaml = std::fs::read_to_string(mission_file("optimized_climb.yaml")).unwrap();
    let mut mission = Mission::from_yaml_str(&yaml).unwrap();
    {
        let climb = mission.segment("climb").unwrap();
        assert_eq!(
            climb.objective,
            Some(Objective::maximize(ObjectiveField::FinalMass))
        );
        assert_eq!(climb.options.max_iterations, 100);
        assert!(matches!(
            climb.kind,
            SegmentKind::OptimizedClimb {
                air_speed_end: EndSpeed::Free,
                ..
            }
        ));
    }
    let results = mission.evaluate().unwrap();
    let climb = results.get("climb").unwrap();
    assert_eq!(climb.status, SegmentStatus::Converged);
    assert!(climb.residual_norm < 1e-8);
    let final_mass = climb.conditions.final_mass();
    assert_relative_eq!(climb.objective_value.unwrap(), -final_mass, max_relative = 1e-12);
    assert_relative_eq!(climb.conditions.final_altitude(), 500.0, max_relative = 1e-9);

    // The same climb without an objective flies the constant rate seed
    let unset = yaml.replace("    objective: final_mass\n    sense: maximize\n", "");
    let mut seeded = Mission::from_yaml_str(&unset).unwrap();
    assert!(seeded.segment("climb").unwrap().objective.is_none());
    let seed = seeded.evaluate().unwrap();
    assert!(final_mass > seed.final_conditions().unwrap().final_mass());
}

#[test]
fn unknown_objective_is_rejected() {
    let yaml = std::fs::read_to_string(mission_file("optimized_climb.yaml"))
        .unwrap()
        .replace("objective: final_mass", "objective: noise");
    match Mission::from_yaml_str(&yaml) {
        Err(MissionError::InvalidConfiguration { msg }) => {
            assert!(msg.contains("noise"));
            assert!(msg.contains("fuel_burn"));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn round_trip_through_a_file() {
    let repr = MissionSerde::load(mission_file("vertical_hop.yaml")).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("copy.yaml");
    std::fs::write(&path, serde_yaml::to_string(&repr).unwrap()).unwrap();
    assert_eq!(MissionSerde::load(&path).unwrap(), repr);

    assert!(matches!(
        MissionSerde::load(dir.path().join("missing.yaml")),
        Err(ConfigError::ReadError { .. })
    ));
    assert!(matches!(
        Mission::from_yaml_str("name: empty\ntakeoff_mass: 10\nsegments: []"),
        Err(MissionError::InvalidConfiguration { .. })
    ));
}
