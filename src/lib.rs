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

/*! # aeromission

Mission performance analysis for aircraft conceptual design.

A mission is an ordered list of flight segments (climb, cruise, descent, hover). Each segment is
discretized on Chebyshev-Gauss-Lobatto control points and its equations of motion are solved by
collocation: the unknown controls (throttle, attitude, and for optimized segments the speed and
flight path) are searched by a root finder, or by a constrained optimizer, until the net force at
every control point matches the acceleration of the trajectory.

Physics models (atmosphere, aerodynamics, propulsion, gravity) plug in through the
[`physics::PhysicsModel`] trait.
*/

/// Differentiation and integration operators on the control points.
pub mod numerics;

/// The flight conditions container shared by the solver and the physics models.
pub mod conditions;

/// Flattening of the named unknown and residual arrays into solver vectors.
pub mod packing;

/// Per-segment working memory of the solver.
pub mod state;

/// Physics models invoked during the residual evaluation, and a few reference implementations.
pub mod physics;

/// Root finders and constrained optimizers.
pub mod solvers;

/// Flight segments: boundary conditions, equations of motion and the solve state machine.
pub mod segments;

/// Sequencing of segments into a mission, and the mission results.
pub mod mission;

/// Loading of mission files.
pub mod io;

/// Small math helpers shared by the segments.
pub mod utils;

mod errors;
/// Functions which may fail return a `MissionError`, aeromission will not panic on bad inputs.
pub use self::errors::MissionError;

#[macro_use]
extern crate log;
extern crate nalgebra as na;

/// Re-export nalgebra
pub mod linalg {
    pub use na::base::*;
}

/// Re-export the types needed to build and evaluate a mission.
pub mod prelude {
    pub use crate::conditions::Conditions;
    pub use crate::mission::{Mission, MissionBuilder, MissionResults, SegmentResults};
    pub use crate::physics::{
        ConstantAtmosphere, DragPolar, IsaAtmosphere, PhysicsError, PhysicsModel, ThrottledThrust,
        ThrustAxis, UniformGravity,
    };
    pub use crate::segments::{
        EndSpeed, Objective, ObjectiveField, Reset, Segment, SegmentKind, SegmentStatus, Sense,
    };
    pub use crate::solvers::SolverOptions;
    pub use crate::MissionError;
    pub use std::sync::Arc;
}
