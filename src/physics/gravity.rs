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

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UniformGravity {
    /// m/s^2
    pub acceleration: f64,
}

impl Default for UniformGravity {
    fn default() -> Self {
        Self {
            acceleration: 9.80665,
        }
    }
}

impl fmt::Display for UniformGravity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "uniform gravity ({} m/s^2)", self.acceleration)
    }
}

impl PhysicsModel for UniformGravity {
    fn evaluate(&self, _: &SegmentKind, conditions: &mut Conditions) -> Result<(), PhysicsError> {
        conditions.freestream.gravity.fill(self.acceleration);
        Ok(())
    }
}
