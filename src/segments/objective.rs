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

use crate::conditions::Conditions;
use crate::MissionError;
use enum_iterator::{all, Sequence};
use serde_derive::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Scalar quantities an optimized segment may minimize or maximize.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Sequence, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveField {
    /// Time at the end of the segment (s)
    FinalTime,
    /// Time spent in the segment (s)
    Duration,
    /// Mass at the end of the segment (kg)
    FinalMass,
    /// Mass burnt during the segment (kg)
    FuelBurn,
    /// Altitude at the end of the segment (m)
    FinalAltitude,
    /// Distance flown at the end of the segment (m)
    FinalRange,
    /// Air speed at the end of the segment (m/s)
    FinalAirSpeed,
}

impl ObjectiveField {
    /// Reads this quantity from the conditions of a segment.
    pub fn value(&self, conditions: &Conditions) -> f64 {
        match self {
            Self::FinalTime => conditions.final_time(),
            Self::Duration => conditions.final_time() - conditions.frames.inertial.time[0],
            Self::FinalMass => conditions.final_mass(),
            Self::FuelBurn => conditions.weights.total_mass[0] - conditions.final_mass(),
            Self::FinalAltitude => conditions.final_altitude(),
            Self::FinalRange => conditions.final_range(),
            Self::FinalAirSpeed => conditions.final_air_speed(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::FinalTime => "final_time",
            Self::Duration => "duration",
            Self::FinalMass => "final_mass",
            Self::FuelBurn => "fuel_burn",
            Self::FinalAltitude => "final_altitude",
            Self::FinalRange => "final_range",
            Self::FinalAirSpeed => "final_air_speed",
        }
    }
}

impl fmt::Display for ObjectiveField {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ObjectiveField {
    type Err = MissionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let keyword = s.trim().to_lowercase();
        all::<Self>()
            .find(|field| field.name() == keyword)
            .ok_or_else(|| {
                let known: Vec<&str> = all::<Self>().map(|field| field.name()).collect();
                MissionError::config(format!(
                    "unknown objective `{s}`, expected one of {}",
                    known.join(", ")
                ))
            })
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sense {
    #[default]
    Minimize,
    Maximize,
}

/// The scalar an optimized segment minimizes, possibly negated to maximize it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Objective {
    pub field: ObjectiveField,
    pub sense: Sense,
}

impl Objective {
    pub fn minimize(field: ObjectiveField) -> Self {
        Self {
            field,
            sense: Sense::Minimize,
        }
    }

    pub fn maximize(field: ObjectiveField) -> Self {
        Self {
            field,
            sense: Sense::Maximize,
        }
    }

    /// Value handed to the optimizer, which always minimizes.
    pub fn evaluate(&self, conditions: &Conditions) -> f64 {
        let value = self.field.value(conditions);
        match self.sense {
            Sense::Minimize => value,
            Sense::Maximize => -value,
        }
    }
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.sense {
            Sense::Minimize => write!(f, "minimize {}", self.field),
            Sense::Maximize => write!(f, "maximize {}", self.field),
        }
    }
}
