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

use crate::linalg::DMatrix;

/// Replacement for angles and speeds which are all exactly zero, keeping the trigonometry and the
/// time rescaling of the segments away from singular points.
pub const DEGENERATE_EPSILON: f64 = 1e-16;

/// Rotates a vector of the (x, z) plane from a frame pitched up by `pitch` into the inertial frame.
///
/// The inertial x axis points forward and z points down, so a positive pitch tilts the rotated
/// x axis upward: `(1, 0)` becomes `(cos θ, -sin θ)`.
pub fn pitch_to_inertial(x: f64, z: f64, pitch: f64) -> (f64, f64) {
    let (s, c) = pitch.sin_cos();
    (c * x + s * z, -s * x + c * z)
}

/// Climb angle of a velocity whose z component points down.
pub fn flight_path_angle(v_x: f64, v_z: f64) -> f64 {
    (-v_z).atan2(v_x)
}

/// Replaces every value of `values` with [`DEGENERATE_EPSILON`] if they are all exactly zero.
///
/// Returns whether the substitution happened. Non finite values are left untouched, so a NaN
/// anywhere disables the substitution.
pub fn substitute_degenerate(values: &mut DMatrix<f64>) -> bool {
    if values.is_empty() || values.iter().any(|v| *v != 0.0) {
        return false;
    }
    values.fill(DEGENERATE_EPSILON);
    true
}
