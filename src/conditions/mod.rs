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

use crate::errors::ShapeMismatchSnafu;
use crate::linalg::DMatrix;
use crate::MissionError;
use snafu::ensure;

/// Inertial frame: x points forward along the ground track, z points down.
#[derive(Clone, Debug, PartialEq)]
pub struct InertialFrame {
    /// Time (s), n×1
    pub time: DMatrix<f64>,
    /// Position (m), n×3, the z component is the negative altitude
    pub position_vector: DMatrix<f64>,
    /// Velocity (m/s), n×3
    pub velocity_vector: DMatrix<f64>,
    /// Acceleration (m/s^2), n×3
    pub acceleration_vector: DMatrix<f64>,
    /// Weight (N), n×3
    pub gravity_force_vector: DMatrix<f64>,
    /// Sum of all forces (N), n×3
    pub total_force_vector: DMatrix<f64>,
}

/// Body frame of the vehicle.
#[derive(Clone, Debug, PartialEq)]
pub struct BodyFrame {
    /// Roll, pitch and yaw with respect to the inertial frame (rad), n×3
    pub inertial_rotations: DMatrix<f64>,
    /// Thrust in body axes (N), n×3
    pub thrust_force_vector: DMatrix<f64>,
}

/// Wind frame: x along the velocity, z perpendicular and pointing down.
#[derive(Clone, Debug, PartialEq)]
pub struct WindFrame {
    /// Rotations with respect to the inertial frame (rad), n×3, the pitch is the flight path angle
    pub inertial_rotations: DMatrix<f64>,
    /// Lift in wind axes (N), n×3
    pub lift_force_vector: DMatrix<f64>,
    /// Drag in wind axes (N), n×3
    pub drag_force_vector: DMatrix<f64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Frames {
    pub inertial: InertialFrame,
    pub body: BodyFrame,
    pub wind: WindFrame,
}

/// Free stream properties, all n×1.
#[derive(Clone, Debug, PartialEq)]
pub struct Freestream {
    /// Altitude (m)
    pub altitude: DMatrix<f64>,
    /// Air speed (m/s)
    pub velocity: DMatrix<f64>,
    /// Density (kg/m^3)
    pub density: DMatrix<f64>,
    /// Static temperature (K)
    pub temperature: DMatrix<f64>,
    /// Static pressure (Pa)
    pub pressure: DMatrix<f64>,
    /// Speed of sound (m/s)
    pub speed_of_sound: DMatrix<f64>,
    pub mach_number: DMatrix<f64>,
    /// Dynamic pressure (Pa)
    pub dynamic_pressure: DMatrix<f64>,
    /// Gravitational acceleration (m/s^2)
    pub gravity: DMatrix<f64>,
}

/// Aerodynamic state, all n×1.
#[derive(Clone, Debug, PartialEq)]
pub struct Aerodynamics {
    /// Angle of attack (rad)
    pub angle_of_attack: DMatrix<f64>,
    pub lift_coefficient: DMatrix<f64>,
    pub drag_coefficient: DMatrix<f64>,
}

/// Propulsion state, all n×1.
#[derive(Clone, Debug, PartialEq)]
pub struct Propulsion {
    /// Throttle setting, nominally between 0 and 1
    pub throttle: DMatrix<f64>,
    /// Thrust magnitude (N)
    pub thrust: DMatrix<f64>,
}

/// Mass state, all n×1.
#[derive(Clone, Debug, PartialEq)]
pub struct Weights {
    /// Total vehicle mass (kg)
    pub total_mass: DMatrix<f64>,
    /// Rate at which the vehicle loses mass (kg/s), positive when burning fuel
    pub vehicle_mass_rate: DMatrix<f64>,
}

/// The flight conditions of a segment, one row per control point.
///
/// Every array of a given instance has the same number of rows. Physics models read and write
/// these arrays in place, but must never resize them.
#[derive(Clone, Debug, PartialEq)]
pub struct Conditions {
    pub frames: Frames,
    pub freestream: Freestream,
    pub aerodynamics: Aerodynamics,
    pub propulsion: Propulsion,
    pub weights: Weights,
}

macro_rules! conditions_fields {
    ($($name:literal => $($field:ident).+ [$cols:literal]),+ $(,)?) => {
        /// Name and number of columns of every array of the conditions, in export order
        pub const FIELDS: &[(&str, usize)] = &[$(($name, $cols)),+];

        impl Conditions {
            /// All the arrays with their names, in the order of [`FIELDS`]
            pub fn arrays(&self) -> Vec<(&'static str, &DMatrix<f64>)> {
                vec![$(($name, &self.$($field).+)),+]
            }

            /// All the arrays with their names, mutably, in the order of [`FIELDS`]
            pub fn arrays_mut(&mut self) -> Vec<(&'static str, &mut DMatrix<f64>)> {
                vec![$(($name, &mut self.$($field).+)),+]
            }
        }
    };
}

conditions_fields! {
    "frames.inertial.time" => frames.inertial.time [1],
    "frames.inertial.position_vector" => frames.inertial.position_vector [3],
    "frames.inertial.velocity_vector" => frames.inertial.velocity_vector [3],
    "frames.inertial.acceleration_vector" => frames.inertial.acceleration_vector [3],
    "frames.inertial.gravity_force_vector" => frames.inertial.gravity_force_vector [3],
    "frames.inertial.total_force_vector" => frames.inertial.total_force_vector [3],
    "frames.body.inertial_rotations" => frames.body.inertial_rotations [3],
    "frames.body.thrust_force_vector" => frames.body.thrust_force_vector [3],
    "frames.wind.inertial_rotations" => frames.wind.inertial_rotations [3],
    "frames.wind.lift_force_vector" => frames.wind.lift_force_vector [3],
    "frames.wind.drag_force_vector" => frames.wind.drag_force_vector [3],
    "freestream.altitude" => freestream.altitude [1],
    "freestream.velocity" => freestream.velocity [1],
    "freestream.density" => freestream.density [1],
    "freestream.temperature" => freestream.temperature [1],
    "freestream.pressure" => freestream.pressure [1],
    "freestream.speed_of_sound" => freestream.speed_of_sound [1],
    "freestream.mach_number" => freestream.mach_number [1],
    "freestream.dynamic_pressure" => freestream.dynamic_pressure [1],
    "freestream.gravity" => freestream.gravity [1],
    "aerodynamics.angle_of_attack" => aerodynamics.angle_of_attack [1],
    "aerodynamics.lift_coefficient" => aerodynamics.lift_coefficient [1],
    "aerodynamics.drag_coefficient" => aerodynamics.drag_coefficient [1],
    "propulsion.throttle" => propulsion.throttle [1],
    "propulsion.thrust" => propulsion.thrust [1],
    "weights.total_mass" => weights.total_mass [1],
    "weights.vehicle_mass_rate" => weights.vehicle_mass_rate [1],
}

impl Conditions {
    /// Zero-initialized conditions with `rows` control points.
    pub fn new(rows: usize) -> Self {
        let scalar = || DMatrix::zeros(rows, 1);
        let vector = || DMatrix::zeros(rows, 3);
        Self {
            frames: Frames {
                inertial: InertialFrame {
                    time: scalar(),
                    position_vector: vector(),
                    velocity_vector: vector(),
                    acceleration_vector: vector(),
                    gravity_force_vector: vector(),
                    total_force_vector: vector(),
                },
                body: BodyFrame {
                    inertial_rotations: vector(),
                    thrust_force_vector: vector(),
                },
                wind: WindFrame {
                    inertial_rotations: vector(),
                    lift_force_vector: vector(),
                    drag_force_vector: vector(),
                },
            },
            freestream: Freestream {
                altitude: scalar(),
                velocity: scalar(),
                density: scalar(),
                temperature: scalar(),
                pressure: scalar(),
                speed_of_sound: scalar(),
                mach_number: scalar(),
                dynamic_pressure: scalar(),
                gravity: scalar(),
            },
            aerodynamics: Aerodynamics {
                angle_of_attack: scalar(),
                lift_coefficient: scalar(),
                drag_coefficient: scalar(),
            },
            propulsion: Propulsion {
                throttle: scalar(),
                thrust: scalar(),
            },
            weights: Weights {
                total_mass: scalar(),
                vehicle_mass_rate: scalar(),
            },
        }
    }

    /// Number of control points
    pub fn rows(&self) -> usize {
        self.frames.inertial.time.nrows()
    }

    /// Ensures that every array has `rows` rows and its nominal number of columns.
    pub fn check_shape(&self, rows: usize) -> Result<(), MissionError> {
        for ((field, array), (_, cols)) in self.arrays().into_iter().zip(FIELDS) {
            ensure!(
                array.nrows() == rows,
                ShapeMismatchSnafu {
                    field,
                    expected: rows,
                    found: array.nrows()
                }
            );
            ensure!(
                array.ncols() == *cols,
                ShapeMismatchSnafu {
                    field,
                    expected: *cols,
                    found: array.ncols()
                }
            );
        }
        Ok(())
    }

    /// Single-row copy of the conditions at control point `i`.
    pub fn row(&self, i: usize) -> Self {
        let mut out = Self::new(1);
        for ((_, dst), (_, src)) in out.arrays_mut().into_iter().zip(self.arrays()) {
            dst.row_mut(0).copy_from(&src.row(i));
        }
        out
    }

    /// Single-row copy of the final control point, used as the initial state of the next segment.
    pub fn last_row(&self) -> Self {
        self.row(self.rows() - 1)
    }

    /// Single-row copy of the first control point.
    pub fn first_row(&self) -> Self {
        self.row(0)
    }

    pub fn final_time(&self) -> f64 {
        self.frames.inertial.time[self.rows() - 1]
    }

    pub fn final_mass(&self) -> f64 {
        self.weights.total_mass[self.rows() - 1]
    }

    /// Altitude of the last control point, read from the position vector
    pub fn final_altitude(&self) -> f64 {
        -self.frames.inertial.position_vector[(self.rows() - 1, 2)]
    }

    /// Distance flown along x at the last control point
    pub fn final_range(&self) -> f64 {
        self.frames.inertial.position_vector[(self.rows() - 1, 0)]
    }

    /// Air speed magnitude at the last control point
    pub fn final_air_speed(&self) -> f64 {
        self.frames
            .inertial
            .velocity_vector
            .row(self.rows() - 1)
            .norm()
    }

    /// Column headers of a flat export, vector arrays are split into their components.
    pub fn headers() -> Vec<String> {
        let mut headers = Vec::new();
        for (name, cols) in FIELDS {
            if *cols == 1 {
                headers.push((*name).to_string());
            } else {
                for axis in ["x", "y", "z"].iter().take(*cols) {
                    headers.push(format!("{name}.{axis}"));
                }
            }
        }
        headers
    }

    /// Flat values of control point `i`, ordered as [`Conditions::headers`].
    pub fn flat_row(&self, i: usize) -> Vec<f64> {
        let mut values = Vec::new();
        for (_, array) in self.arrays() {
            values.extend(array.row(i).iter().copied());
        }
        values
    }
}
