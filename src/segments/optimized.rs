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

use super::{Boundary, EndSpeed, Segment, SegmentKind};
use crate::linalg::{DMatrix, DVector};
use crate::numerics::OperatorCache;
use crate::packing::Unknown;
use crate::state::State;
use crate::utils::{substitute_degenerate, DEGENERATE_EPSILON};
use crate::MissionError;

/// Builds the velocity of an optimized climb from its unknowns and rescales the operators so that
/// the climb ends exactly at the end altitude.
///
/// The first air speed is the start air speed and, when fixed, the last one is the end air
/// speed. The other speeds are unknowns normalized by the start air speed.
pub(super) fn apply_unknowns(name: &str, kind: &SegmentKind, state: &mut State, boundary: &Boundary) {
    let SegmentKind::OptimizedClimb {
        air_speed_start,
        air_speed_end,
        altitude_end,
        ..
    } = *kind
    else {
        return;
    };

    for unknown in [Unknown::FlightPathAngle, Unknown::Velocity] {
        if let Some(values) = state.unknowns.get_mut(unknown) {
            if substitute_degenerate(values) {
                trace!("segment `{name}` -- every {unknown} unknown is zero, using {DEGENERATE_EPSILON:e}");
            }
        }
    }

    let n = state.rows();
    let mut air_speed = DVector::from_element(n, air_speed_start);
    if let Some(normalized) = state.unknowns.get(Unknown::Velocity) {
        for (i, v) in normalized.iter().enumerate() {
            air_speed[i + 1] = v * air_speed_start;
        }
    }
    if let EndSpeed::Fixed(end) = air_speed_end {
        air_speed[n - 1] = end;
    }
    let gamma = match state.unknowns.get(Unknown::FlightPathAngle) {
        Some(gamma) => gamma.column(0).clone_owned(),
        None => DVector::zeros(n),
    };

    let velocity = &mut state.conditions.frames.inertial.velocity_vector;
    let mut up = DVector::zeros(n);
    for i in 0..n {
        let (sin, cos) = gamma[i].sin_cos();
        velocity[(i, 0)] = air_speed[i] * cos;
        velocity[(i, 1)] = 0.0;
        velocity[(i, 2)] = -air_speed[i] * sin;
        up[i] = air_speed[i] * sin;
    }

    // Climb over the dimensionless domain, the duration scales it to the altitude change
    let climb = (&state.numerics.dimensionless.integrate * &up)[n - 1];
    let climb = if climb <= 0.0 {
        trace!("segment `{name}` -- no vertical progress, using {DEGENERATE_EPSILON:e}");
        DEGENERATE_EPSILON
    } else {
        climb
    };
    state
        .numerics
        .rescale((altitude_end - boundary.altitude) / climb);
}

/// Solves the linear speed constant rate climb between the same boundary conditions and returns
/// its solution as the initial guess of the optimized climb.
///
/// The seed climbs at `seed_climb_rate` and accelerates to the end air speed, or keeps the start
/// air speed when the end speed is free.
pub(super) fn seed(
    segment: &Segment,
    boundary: &Boundary,
    state: &State,
    cache: &mut OperatorCache,
) -> Result<DVector<f64>, MissionError> {
    let SegmentKind::OptimizedClimb {
        air_speed_start,
        air_speed_end,
        altitude_end,
        seed_climb_rate,
        ..
    } = segment.kind
    else {
        return Err(MissionError::config(format!(
            "segment `{}` is not an optimized climb",
            segment.name
        )));
    };

    let end = match air_speed_end {
        EndSpeed::Fixed(v) => v,
        EndSpeed::Free => air_speed_start,
    };
    let mut sub = Segment::new(
        format!("{} (seed)", segment.name),
        SegmentKind::ClimbLinearSpeedConstantRate {
            air_speed_start,
            air_speed_end: end,
            climb_rate: seed_climb_rate,
            altitude_start: Some(boundary.altitude),
            altitude_end,
        },
    )
    .with_control_points(segment.control_points)
    .with_options(segment.options)
    .with_root_finder(segment.root_finder.clone());
    sub.physics = segment.physics.clone();

    info!("segment `{}` -- seeding with a {}", segment.name, sub.kind);
    sub.solve_from(*boundary, state.initials.clone(), cache)?;

    let n = segment.control_points;
    let Some(seed) = sub.state() else {
        return Err(MissionError::config(format!(
            "seed of segment `{}` has no solution",
            segment.name
        )));
    };
    let cond = &seed.conditions;
    let mut guess = segment.kind.unknown_layout(n).zeros();
    if let Some(throttle) = seed.unknowns.get(Unknown::Throttle) {
        guess.set(Unknown::Throttle, throttle.clone())?;
    }
    if let Some(body_angle) = seed.unknowns.get(Unknown::BodyAngle) {
        guess.set(Unknown::BodyAngle, body_angle.clone())?;
    }
    let gamma = cond.frames.wind.inertial_rotations.column(1);
    guess.set(
        Unknown::FlightPathAngle,
        DMatrix::from_iterator(n, 1, gamma.iter().copied()),
    )?;

    let velocity_rows = guess
        .layout()
        .shape(Unknown::Velocity)
        .map_or(0, |(rows, _)| rows);
    let normalized = DMatrix::from_fn(velocity_rows, 1, |i, _| {
        cond.frames.inertial.velocity_vector.row(i + 1).norm() / air_speed_start
    });
    guess.set(Unknown::Velocity, normalized)?;

    Ok(guess.pack())
}
