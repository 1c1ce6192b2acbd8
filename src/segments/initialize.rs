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

use super::{Reset, Segment, SegmentKind};
use crate::conditions::Conditions;
use crate::errors::{InvalidConfigurationSnafu, MissingInitialStateSnafu};
use crate::linalg::DVector;
use crate::packing::{Layout, Unknown};
use crate::state::State;
use crate::MissionError;
use snafu::ensure;

/// Relative tolerance on the match between a given start altitude and the inherited one
const ALTITUDE_TOLERANCE: f64 = 1e-6;

/// Where and when a segment starts.
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) struct Boundary {
    /// s
    pub time: f64,
    /// Distance flown so far (m)
    pub range: f64,
    /// m
    pub altitude: f64,
    /// kg
    pub mass: f64,
}

fn positive(segment: &str, field: &str, value: f64) -> Result<(), MissionError> {
    ensure!(
        value > 0.0 && value.is_finite(),
        InvalidConfigurationSnafu {
            msg: format!("segment `{segment}`: {field} must be positive and finite, got {value}")
        }
    );
    Ok(())
}

fn faster(segment: &str, air_speed: f64, rate: f64) -> Result<(), MissionError> {
    ensure!(
        air_speed > rate,
        InvalidConfigurationSnafu {
            msg: format!(
                "segment `{segment}`: air speed of {air_speed} m/s cannot sustain a vertical speed of {rate} m/s"
            )
        }
    );
    Ok(())
}

fn ascending(segment: &str, start: f64, end: f64, upward: bool) -> Result<(), MissionError> {
    let ok = if upward { end > start } else { end < start };
    ensure!(
        ok,
        InvalidConfigurationSnafu {
            msg: format!(
                "segment `{segment}` cannot go {} from {start} m to {end} m",
                if upward { "up" } else { "down" }
            )
        }
    );
    Ok(())
}

impl Segment {
    /// Resolves the start time, range, altitude and mass from the previous segment and the resets.
    pub(crate) fn boundary(
        &self,
        initials: Option<&Conditions>,
        takeoff_mass: f64,
    ) -> Result<Boundary, MissionError> {
        if let Some(previous) = initials {
            ensure!(
                previous.rows() > 0,
                InvalidConfigurationSnafu {
                    msg: format!(
                        "segment `{}` cannot start from initial conditions without any row",
                        self.name
                    )
                }
            );
        }
        let mut time = initials.map_or(0.0, |c| c.final_time());
        let mut mass = initials.map_or(takeoff_mass, |c| c.final_mass());
        let range = initials.map_or(0.0, |c| c.final_range());
        let inherited = initials.map(|c| c.final_altitude());

        let mut altitude_reset = false;
        for reset in &self.resets {
            match reset {
                Reset::Time(t) => time = *t,
                Reset::Mass(m) => mass = *m,
                Reset::Altitude => altitude_reset = true,
            }
        }

        let altitude = match (self.kind.altitude_start(), inherited) {
            (Some(given), Some(previous)) => {
                ensure!(
                    altitude_reset
                        || (given - previous).abs() <= ALTITUDE_TOLERANCE * given.abs().max(1.0),
                    InvalidConfigurationSnafu {
                        msg: format!(
                            "segment `{}` starts at {given} m but the previous segment ended at {previous} m (add an altitude reset to allow it)",
                            self.name
                        )
                    }
                );
                given
            }
            (Some(given), None) => given,
            (None, Some(previous)) => {
                ensure!(
                    !altitude_reset,
                    InvalidConfigurationSnafu {
                        msg: format!(
                            "segment `{}` resets its altitude without giving one",
                            self.name
                        )
                    }
                );
                previous
            }
            (None, None) => {
                return MissingInitialStateSnafu {
                    segment: self.name.clone(),
                    quantity: "altitude",
                }
                .fail()
            }
        };

        if initials.is_some() {
            debug!(
                "segment `{}` -- starts at t = {time} s, x = {range} m, h = {altitude} m, m = {mass} kg",
                self.name
            );
        }

        Ok(Boundary {
            time,
            range,
            altitude,
            mass,
        })
    }

    /// Checks that the boundary conditions define a solvable problem.
    pub(crate) fn validate(&self, boundary: &Boundary) -> Result<(), MissionError> {
        let name = self.name.as_str();
        ensure!(
            self.control_points >= 2,
            InvalidConfigurationSnafu {
                msg: format!(
                    "segment `{name}` needs at least two control points, got {}",
                    self.control_points
                )
            }
        );
        ensure!(
            self.objective.is_none() || self.kind.is_optimized(),
            InvalidConfigurationSnafu {
                msg: format!(
                    "segment `{name}` is a {} and cannot have an objective",
                    self.kind.family()
                )
            }
        );
        positive(name, "mass", boundary.mass)?;

        let h0 = boundary.altitude;
        match self.kind {
            SegmentKind::ClimbConstantSpeedConstantRate {
                air_speed,
                climb_rate,
                altitude_end,
                ..
            } => {
                positive(name, "climb rate", climb_rate)?;
                faster(name, air_speed, climb_rate)?;
                ascending(name, h0, altitude_end, true)?;
            }
            SegmentKind::ClimbLinearSpeedConstantRate {
                air_speed_start,
                air_speed_end,
                climb_rate,
                altitude_end,
                ..
            } => {
                positive(name, "climb rate", climb_rate)?;
                faster(name, air_speed_start.min(air_speed_end), climb_rate)?;
                ascending(name, h0, altitude_end, true)?;
            }
            SegmentKind::OptimizedClimb {
                air_speed_start,
                air_speed_end,
                altitude_end,
                seed_climb_rate,
                ..
            } => {
                positive(name, "start air speed", air_speed_start)?;
                positive(name, "seed climb rate", seed_climb_rate)?;
                faster(name, air_speed_start, seed_climb_rate)?;
                if let super::EndSpeed::Fixed(end) = air_speed_end {
                    positive(name, "end air speed", end)?;
                    faster(name, end, seed_climb_rate)?;
                }
                ascending(name, h0, altitude_end, true)?;
            }
            SegmentKind::Cruise {
                air_speed,
                distance,
                ..
            } => {
                positive(name, "air speed", air_speed)?;
                positive(name, "distance", distance)?;
            }
            SegmentKind::DescentConstantSpeedConstantRate {
                air_speed,
                descent_rate,
                altitude_end,
                ..
            } => {
                positive(name, "descent rate", descent_rate)?;
                faster(name, air_speed, descent_rate)?;
                ascending(name, h0, altitude_end, false)?;
            }
            SegmentKind::Hover { time, .. } => positive(name, "hover time", time)?,
            SegmentKind::HoverClimb {
                climb_rate,
                altitude_end,
                ..
            } => {
                positive(name, "climb rate", climb_rate)?;
                ascending(name, h0, altitude_end, true)?;
            }
            SegmentKind::HoverDescent {
                descent_rate,
                altitude_end,
                ..
            } => {
                positive(name, "descent rate", descent_rate)?;
                ascending(name, h0, altitude_end, false)?;
            }
        }

        let n = self.control_points;
        let unknowns = self.kind.unknown_layout(n).len();
        let residuals = self.kind.residual_layout(n).len();
        let consistent = if self.kind.is_optimized() {
            unknowns > residuals
        } else {
            unknowns == residuals
        };
        ensure!(
            consistent,
            InvalidConfigurationSnafu {
                msg: format!("segment `{name}` has {unknowns} unknowns for {residuals} residuals")
            }
        );
        Ok(())
    }

    /// Sets the start mass, and for the segments flown at an imposed speed, the duration and the
    /// velocity at every control point.
    pub(crate) fn initialize(&self, state: &mut State, boundary: &Boundary) {
        state.conditions.weights.total_mass.fill(boundary.mass);
        state.conditions.frames.inertial.time.fill(boundary.time);
        state
            .conditions
            .frames
            .inertial
            .position_vector
            .column_mut(0)
            .fill(boundary.range);
        state
            .conditions
            .frames
            .inertial
            .position_vector
            .column_mut(2)
            .fill(-boundary.altitude);
        state.conditions.freestream.altitude.fill(boundary.altitude);

        let x = state.numerics.dimensionless.control_points.clone();
        let h0 = boundary.altitude;
        // Horizontal and vertical (positive down) speeds for a given air speed and climb rate
        let split = |air_speed: f64, up: f64| ((air_speed * air_speed - up * up).sqrt(), -up);

        let (duration, velocities): (f64, Vec<(f64, f64)>) = match self.kind {
            SegmentKind::ClimbConstantSpeedConstantRate {
                air_speed,
                climb_rate,
                altitude_end,
                ..
            } => (
                (altitude_end - h0) / climb_rate,
                x.iter().map(|_| split(air_speed, climb_rate)).collect(),
            ),
            SegmentKind::ClimbLinearSpeedConstantRate {
                air_speed_start,
                air_speed_end,
                climb_rate,
                altitude_end,
                ..
            } => (
                (altitude_end - h0) / climb_rate,
                x.iter()
                    .map(|xi| {
                        let air_speed = air_speed_start + (air_speed_end - air_speed_start) * xi;
                        split(air_speed, climb_rate)
                    })
                    .collect(),
            ),
            SegmentKind::Cruise {
                air_speed,
                distance,
                ..
            } => (distance / air_speed, x.iter().map(|_| (air_speed, 0.0)).collect()),
            SegmentKind::DescentConstantSpeedConstantRate {
                air_speed,
                descent_rate,
                altitude_end,
                ..
            } => (
                (h0 - altitude_end) / descent_rate,
                x.iter().map(|_| split(air_speed, -descent_rate)).collect(),
            ),
            SegmentKind::Hover { time, .. } => (time, x.iter().map(|_| (0.0, 0.0)).collect()),
            SegmentKind::HoverClimb {
                climb_rate,
                altitude_end,
                ..
            } => (
                (altitude_end - h0) / climb_rate,
                x.iter().map(|_| (0.0, -climb_rate)).collect(),
            ),
            SegmentKind::HoverDescent {
                descent_rate,
                altitude_end,
                ..
            } => (
                (h0 - altitude_end) / descent_rate,
                x.iter().map(|_| (0.0, descent_rate)).collect(),
            ),
            // The duration follows from the unknowns at every evaluation
            SegmentKind::OptimizedClimb { .. } => return,
        };

        debug!("segment `{}` -- lasts {duration:.3} s", self.name);
        state.numerics.rescale(duration);
        let velocity = &mut state.conditions.frames.inertial.velocity_vector;
        for (i, (v_x, v_z)) in velocities.into_iter().enumerate() {
            velocity[(i, 0)] = v_x;
            velocity[(i, 2)] = v_z;
        }
    }

    /// Flat initial guess of the unknowns of the segments solved by the root finder.
    pub(crate) fn default_guess(&self, layout: &Layout<Unknown>) -> DVector<f64> {
        let mut guess = layout.filled(0.5);
        if let Some(pitch) = guess.get_mut(Unknown::BodyAngle) {
            pitch.fill(self.kind.default_body_angle());
        }
        guess.pack()
    }
}
