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

use super::{PhysicsError, PhysicsModel};
use crate::conditions::Conditions;
use crate::segments::SegmentKind;
use serde_derive::{Deserialize, Serialize};
use std::fmt;

/// Body axis along which the thrust acts.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThrustAxis {
    /// Along the nose, as for a jet or a tractor propeller
    #[default]
    Forward,
    /// Along the negative body z axis, as for lift rotors
    Up,
}

/// Thrust proportional to the throttle, burning fuel at a constant thrust specific fuel consumption.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThrottledThrust {
    /// Thrust at full throttle (N)
    pub max_thrust: f64,
    /// Thrust specific fuel consumption (kg/s per N)
    #[serde(default)]
    pub tsfc: f64,
    #[serde(default)]
    pub axis: ThrustAxis,
}

impl fmt::Display for ThrottledThrust {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "throttled thrust ({:.1} N max along {:?}, TSFC {:.3e} kg/N/s)",
            self.max_thrust, self.axis, self.tsfc
        )
    }
}

impl PhysicsModel for ThrottledThrust {
    fn evaluate(&self, _: &SegmentKind, conditions: &mut Conditions) -> Result<(), PhysicsError> {
        for i in 0..conditions.rows() {
            let thrust = conditions.propulsion.throttle[i] * self.max_thrust;
            conditions.propulsion.thrust[i] = thrust;

            let body = &mut conditions.frames.body.thrust_force_vector;
            let (x, z) = match self.axis {
                ThrustAxis::Forward => (thrust, 0.0),
                ThrustAxis::Up => (0.0, -thrust),
            };
            body[(i, 0)] = x;
            body[(i, 1)] = 0.0;
            body[(i, 2)] = z;

            conditions.weights.vehicle_mass_rate[i] = self.tsfc * thrust;
        }
        Ok(())
    }
}
