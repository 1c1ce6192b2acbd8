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

/// Linear lift curve with a parabolic drag polar: `CL = CL0 + CLα α` and `CD = CD0 + k CL²`.
///
/// **WARNING:** there is no stall model, the lift keeps growing with the angle of attack.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DragPolar {
    /// Reference (wing) area in m^2
    pub reference_area: f64,
    /// Lift coefficient at zero angle of attack
    pub lift_coefficient_zero: f64,
    /// Lift curve slope, per radian
    pub lift_slope: f64,
    /// Zero lift drag coefficient
    pub drag_coefficient_zero: f64,
    /// Induced drag factor
    pub induced_drag_factor: f64,
}

impl DragPolar {
    /// Returns the lift and drag coefficients at the angle of attack `alpha` (rad)
    pub fn coefficients(&self, alpha: f64) -> (f64, f64) {
        let cl = self.lift_coefficient_zero + self.lift_slope * alpha;
        let cd = self.drag_coefficient_zero + self.induced_drag_factor * cl * cl;
        (cl, cd)
    }
}

impl fmt::Display for DragPolar {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "drag polar (S = {} m^2, CL = {} + {} α, CD = {} + {} CL²)",
            self.reference_area,
            self.lift_coefficient_zero,
            self.lift_slope,
            self.drag_coefficient_zero,
            self.induced_drag_factor
        )
    }
}

impl PhysicsModel for DragPolar {
    fn evaluate(&self, _: &SegmentKind, conditions: &mut Conditions) -> Result<(), PhysicsError> {
        for i in 0..conditions.rows() {
            let alpha = conditions.aerodynamics.angle_of_attack[i];
            let (cl, cd) = self.coefficients(alpha);
            let qs = conditions.freestream.dynamic_pressure[i] * self.reference_area;

            conditions.aerodynamics.lift_coefficient[i] = cl;
            conditions.aerodynamics.drag_coefficient[i] = cd;

            let wind = &mut conditions.frames.wind;
            wind.lift_force_vector[(i, 0)] = 0.0;
            wind.lift_force_vector[(i, 1)] = 0.0;
            wind.lift_force_vector[(i, 2)] = -qs * cl;
            wind.drag_force_vector[(i, 0)] = -qs * cd;
            wind.drag_force_vector[(i, 1)] = 0.0;
            wind.drag_force_vector[(i, 2)] = 0.0;
        }
        Ok(())
    }
}
