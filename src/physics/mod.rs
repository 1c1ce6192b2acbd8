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
use crate::segments::SegmentKind;
use snafu::prelude::*;
use std::fmt;

/// Standard and constant atmospheres.
pub mod atmosphere;
pub use self::atmosphere::*;

/// Parabolic drag polar.
pub mod aerodynamics;
pub use self::aerodynamics::*;

/// Throttle driven thrust with a constant specific fuel consumption.
pub mod propulsion;
pub use self::propulsion::*;

/// Uniform gravity field.
pub mod gravity;
pub use self::gravity::*;

#[derive(Clone, PartialEq, Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum PhysicsError {
    #[snafu(display("{model} is only valid for {field} in [{min}, {max}], got {value}"))]
    OutOfRange {
        model: &'static str,
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[snafu(display("{model} failed: {msg}"))]
    ModelFailure { model: String, msg: String },
}

/// A model invoked once per solver iteration, in the order in which it is registered on the
/// segment.
///
/// Before the first model is called, the core has already set the time, position, velocity,
/// acceleration, altitude, air speed, flight path angle, angle of attack, body pitch and throttle.
/// After the last model, the core integrates the mass from `weights.vehicle_mass_rate` and sums
/// the gravity, thrust (body axes), lift and drag (wind axes) into the inertial frame.
///
/// A model may read any field of the conditions and write the fields it is responsible for, but
/// must not change the number of rows of any array.
///
/// `freestream.gravity` starts at zero and only a model such as [`UniformGravity`] sets it. A
/// segment without one flies weightless, which the solver reports with a warning.
pub trait PhysicsModel: Send + Sync + fmt::Display {
    fn evaluate(&self, segment: &SegmentKind, conditions: &mut Conditions)
        -> Result<(), PhysicsError>;
}

/// Computes the dynamic pressure and Mach number from the air speed, density and speed of sound.
pub(crate) fn update_dynamic_pressure(conditions: &mut Conditions) {
    let fs = &mut conditions.freestream;
    for i in 0..fs.velocity.nrows() {
        let v = fs.velocity[i];
        fs.dynamic_pressure[i] = 0.5 * fs.density[i] * v * v;
        fs.mach_number[i] = if fs.speed_of_sound[i] > 0.0 {
            v / fs.speed_of_sound[i]
        } else {
            0.0
        };
    }
}
