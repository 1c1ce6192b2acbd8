/*
    Aeromission, mission performance for aircraft conceptual design
    Copyright (C) 2024 The Aeromission developers

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

use super::{ConfigRepr, Configurable, InvalidConfigSnafu};
use crate::mission::Mission;
use crate::physics::{
    ConstantAtmosphere, DragPolar, IsaAtmosphere, PhysicsModel, ThrottledThrust, UniformGravity,
};
use crate::segments::{Objective, ObjectiveField, Reset, Segment, SegmentKind, Sense};
use crate::solvers::SolverOptions;
use crate::MissionError;
use serde_derive::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AtmosphereSerde {
    Constant(ConstantAtmosphere),
    Isa(IsaAtmosphere),
}

impl Default for AtmosphereSerde {
    fn default() -> Self {
        Self::Isa(IsaAtmosphere::default())
    }
}

/// The physics models of a segment. They are registered in the order atmosphere, aerodynamics,
/// propulsion and gravity, and gravity is standard gravity unless specified.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PhysicsSerde {
    #[serde(default)]
    pub atmosphere: AtmosphereSerde,
    pub aerodynamics: Option<DragPolar>,
    pub propulsion: Option<ThrottledThrust>,
    pub gravity: Option<UniformGravity>,
}

impl PhysicsSerde {
    pub fn models(&self) -> Vec<Arc<dyn PhysicsModel>> {
        let mut models: Vec<Arc<dyn PhysicsModel>> = match self.atmosphere {
            AtmosphereSerde::Constant(atmo) => vec![Arc::new(atmo)],
            AtmosphereSerde::Isa(atmo) => vec![Arc::new(atmo)],
        };
        if let Some(aero) = self.aerodynamics {
            models.push(Arc::new(aero));
        }
        if let Some(prop) = self.propulsion {
            models.push(Arc::new(prop));
        }
        models.push(Arc::new(self.gravity.unwrap_or_default()));
        models
    }
}

/// One entry of the `resets` list of a segment, exactly one field must be set.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResetSerde {
    pub time: Option<f64>,
    pub mass: Option<f64>,
    #[serde(default)]
    pub altitude: bool,
}

impl TryFrom<ResetSerde> for Reset {
    type Error = MissionError;

    fn try_from(repr: ResetSerde) -> Result<Self, Self::Error> {
        match (repr.time, repr.mass, repr.altitude) {
            (Some(time), None, false) => Ok(Reset::Time(time)),
            (None, Some(mass), false) => Ok(Reset::Mass(mass)),
            (None, None, true) => Ok(Reset::Altitude),
            _ => Err(InvalidConfigSnafu {
                msg: format!("a reset must set exactly one of time, mass or altitude, got {repr:?}"),
            }
            .build()
            .into()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SegmentSerde {
    pub name: String,
    pub kind: SegmentKind,
    pub control_points: Option<usize>,
    /// Replaces the physics of the mission for this segment only
    pub physics: Option<PhysicsSerde>,
    pub solver: Option<SolverOptions>,
    #[serde(default)]
    pub resets: Vec<ResetSerde>,
    /// Name of an objective field, e.g. `final_mass`
    pub objective: Option<String>,
    pub sense: Option<Sense>,
}

impl SegmentSerde {
    fn into_segment(self, mission_physics: &PhysicsSerde) -> Result<Segment, MissionError> {
        let physics = self.physics.as_ref().unwrap_or(mission_physics);
        let mut segment = Segment::new(self.name, self.kind);
        for model in physics.models() {
            segment = segment.with_physics(model);
        }
        if let Some(control_points) = self.control_points {
            segment = segment.with_control_points(control_points);
        }
        if let Some(options) = self.solver {
            segment = segment.with_options(options);
        }
        for reset in self.resets {
            segment = segment.with_reset(reset.try_into()?);
        }
        match (self.objective, self.sense) {
            (Some(field), sense) => {
                let objective = Objective {
                    field: ObjectiveField::from_str(&field)?,
                    sense: sense.unwrap_or_default(),
                };
                segment = segment.with_objective(objective);
            }
            (None, Some(_)) => {
                return Err(MissionError::config(format!(
                    "segment `{}` has a sense but no objective",
                    segment.name
                )))
            }
            (None, None) => {}
        }
        Ok(segment)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MissionSerde {
    pub name: String,
    pub takeoff_mass: f64,
    /// Default physics of every segment
    #[serde(default)]
    pub physics: PhysicsSerde,
    pub segments: Vec<SegmentSerde>,
}

impl ConfigRepr for MissionSerde {}

impl Configurable for Mission {
    type IntermediateRepr = MissionSerde;

    fn from_config(cfg: MissionSerde) -> Result<Self, MissionError> {
        let mut builder = Mission::builder(cfg.name, cfg.takeoff_mass);
        for segment in cfg.segments {
            builder = builder.segment(segment.into_segment(&cfg.physics)?);
        }
        builder.build()
    }
}
