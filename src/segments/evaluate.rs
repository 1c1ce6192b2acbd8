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

use super::{optimized, Boundary, Objective, SegmentKind};
use crate::errors::PhysicsSnafu;
use crate::linalg::{DMatrix, DVector};
use crate::packing::{Residual, Unknown};
use crate::physics::PhysicsModel;
use crate::solvers::Problem;
use crate::state::State;
use crate::utils::{flight_path_angle, pitch_to_inertial};
use crate::MissionError;
use snafu::ResultExt;
use std::sync::Arc;

/// The residual evaluation of one segment, as seen by the solvers.
pub(crate) struct SegmentProblem<'a> {
    pub(super) name: &'a str,
    pub(super) kind: &'a SegmentKind,
    pub(super) physics: &'a [Arc<dyn PhysicsModel>],
    pub(super) objective: Option<Objective>,
    pub(super) boundary: Boundary,
    pub(super) bounds: Option<(DVector<f64>, DVector<f64>)>,
    pub(super) state: &'a mut State,
}

impl SegmentProblem<'_> {
    /// Runs the whole evaluation pipeline for the unknowns `x` and returns the packed residuals.
    pub(crate) fn evaluate(&mut self, x: &DVector<f64>) -> Result<DVector<f64>, MissionError> {
        if let Some(residuals) = self.state.cached(x) {
            return Ok(residuals.clone());
        }

        self.state.unknowns = self.state.unknowns.layout().unpack(x)?;
        self.apply_unknowns();
        self.update_kinematics();

        let rows = self.state.rows();
        for model in self.physics {
            model
                .evaluate(self.kind, &mut self.state.conditions)
                .context(PhysicsSnafu { segment: self.name })?;
            self.state.conditions.check_shape(rows)?;
        }

        self.update_mass();
        self.update_forces();
        let residuals = self.update_residuals()?;

        self.state.objective_value = self
            .objective
            .map_or(0.0, |objective| objective.evaluate(&self.state.conditions));
        self.state.constraint_values = residuals.clone();
        self.state.inputs_last = Some(x.clone());
        Ok(residuals)
    }

    /// Copies the throttle and the body pitch into the conditions, and for optimized segments,
    /// builds the velocity and rescales the operators to the implied duration.
    fn apply_unknowns(&mut self) {
        let state = &mut *self.state;
        if let Some(throttle) = state.unknowns.get(Unknown::Throttle) {
            state.conditions.propulsion.throttle.copy_from(throttle);
        }
        let mut pitch = state.conditions.frames.body.inertial_rotations.column_mut(1);
        match state.unknowns.get(Unknown::BodyAngle) {
            Some(body_angle) => pitch.copy_from(&body_angle.column(0)),
            None => pitch.fill(0.0),
        }

        if self.kind.is_optimized() {
            optimized::apply_unknowns(self.name, self.kind, state, &self.boundary);
        }
    }

    /// Time, position, acceleration, orientation and air speed from the velocity.
    fn update_kinematics(&mut self) {
        let boundary = self.boundary;
        let state = &mut *self.state;
        let ops = &state.numerics.time;
        let cond = &mut state.conditions;
        let inertial = &mut cond.frames.inertial;

        let v_x = inertial.velocity_vector.column(0).clone_owned();
        let v_z = inertial.velocity_vector.column(2).clone_owned();
        let range = &ops.integrate * &v_x;
        let climb = &ops.integrate * -&v_z;
        let a_x = &ops.differentiate * &v_x;
        let a_z = &ops.differentiate * &v_z;

        for i in 0..state.numerics.len() {
            inertial.time[i] = boundary.time + ops.control_points[i];
            let altitude = boundary.altitude + climb[i];
            inertial.position_vector[(i, 0)] = boundary.range + range[i];
            inertial.position_vector[(i, 2)] = -altitude;
            inertial.acceleration_vector[(i, 0)] = a_x[i];
            inertial.acceleration_vector[(i, 2)] = a_z[i];

            cond.freestream.altitude[i] = altitude;
            cond.freestream.velocity[i] = inertial.velocity_vector.row(i).norm();

            let gamma = flight_path_angle(v_x[i], v_z[i]);
            cond.frames.wind.inertial_rotations[(i, 1)] = gamma;
            cond.aerodynamics.angle_of_attack[i] =
                cond.frames.body.inertial_rotations[(i, 1)] - gamma;
        }
    }

    /// Integrates the mass flow from the start mass.
    fn update_mass(&mut self) {
        let state = &mut *self.state;
        let burnt = &state.numerics.time.integrate * &state.conditions.weights.vehicle_mass_rate;
        let mass = &mut state.conditions.weights.total_mass;
        for i in 0..mass.nrows() {
            mass[i] = self.boundary.mass - burnt[i];
        }
    }

    /// Rotates the thrust, lift and drag into the inertial frame and adds the weight.
    fn update_forces(&mut self) {
        let cond = &mut self.state.conditions;
        for i in 0..cond.rows() {
            let pitch = cond.frames.body.inertial_rotations[(i, 1)];
            let gamma = cond.frames.wind.inertial_rotations[(i, 1)];
            let thrust = cond.frames.body.thrust_force_vector.row(i);
            let lift = cond.frames.wind.lift_force_vector.row(i);
            let drag = cond.frames.wind.drag_force_vector.row(i);

            let (thrust_x, thrust_z) = pitch_to_inertial(thrust[0], thrust[2], pitch);
            let (lift_x, lift_z) = pitch_to_inertial(lift[0], lift[2], gamma);
            let (drag_x, drag_z) = pitch_to_inertial(drag[0], drag[2], gamma);
            let weight = cond.weights.total_mass[i] * cond.freestream.gravity[i];
            let side = thrust[1] + lift[1] + drag[1];

            let inertial = &mut cond.frames.inertial;
            inertial.gravity_force_vector[(i, 0)] = 0.0;
            inertial.gravity_force_vector[(i, 1)] = 0.0;
            inertial.gravity_force_vector[(i, 2)] = weight;
            inertial.total_force_vector[(i, 0)] = thrust_x + lift_x + drag_x;
            inertial.total_force_vector[(i, 1)] = side;
            inertial.total_force_vector[(i, 2)] = thrust_z + lift_z + drag_z + weight;
        }
    }

    /// Specific force minus acceleration, packed.
    fn update_residuals(&mut self) -> Result<DVector<f64>, MissionError> {
        let cond = &self.state.conditions;
        let rows = cond.rows();
        let inertial = &cond.frames.inertial;
        let mass = &cond.weights.total_mass;
        let axis = |i: usize, k: usize| {
            inertial.total_force_vector[(i, k)] / mass[i] - inertial.acceleration_vector[(i, k)]
        };

        let forces = if self.kind.is_hover() {
            DMatrix::from_fn(rows, 1, |i, _| axis(i, 2))
        } else {
            DMatrix::from_fn(rows, 2, |i, j| axis(i, 2 * j))
        };
        self.state.residuals.set(Residual::Forces, forces)?;
        Ok(self.state.residuals.pack())
    }
}

impl Problem for SegmentProblem<'_> {
    fn residuals(&mut self, x: &DVector<f64>) -> Result<DVector<f64>, MissionError> {
        self.evaluate(x)
    }

    fn objective(&mut self, x: &DVector<f64>) -> Result<f64, MissionError> {
        self.evaluate(x)?;
        Ok(self.state.objective_value)
    }

    fn bounds(&self) -> Option<(DVector<f64>, DVector<f64>)> {
        self.bounds.clone()
    }

    fn has_objective(&self) -> bool {
        self.objective.is_some()
    }
}
