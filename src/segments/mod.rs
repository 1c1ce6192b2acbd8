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
use crate::linalg::DVector;
use crate::numerics::{Numerics, OperatorCache};
use crate::packing::{Layout, Residual, Unknown};
use crate::physics::PhysicsModel;
use crate::solvers::{
    ConstrainedOptimizer, NewtonRaphson, RootFinder, SolverError, SolverOptions, SolverReport,
    Sqp,
};
use crate::state::State;
use crate::MissionError;
use serde_derive::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;
use std::fmt;
use std::sync::Arc;

mod evaluate;
mod initialize;
mod objective;
mod optimized;

pub use objective::{Objective, ObjectiveField, Sense};

pub(crate) use evaluate::SegmentProblem;
pub(crate) use initialize::Boundary;

/// Number of control points of a segment unless specified otherwise
pub const DEFAULT_CONTROL_POINTS: usize = 16;

/// End speed of an optimized climb.
///
/// In mission files, a number fixes the end speed and a missing value leaves it free.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Option<f64>", into = "Option<f64>")]
pub enum EndSpeed {
    /// The air speed at the end of the segment is imposed (m/s)
    Fixed(f64),
    /// The optimizer chooses the air speed at the end of the segment
    #[default]
    Free,
}

impl From<Option<f64>> for EndSpeed {
    fn from(speed: Option<f64>) -> Self {
        match speed {
            Some(v) => Self::Fixed(v),
            None => Self::Free,
        }
    }
}

impl From<EndSpeed> for Option<f64> {
    fn from(speed: EndSpeed) -> Self {
        match speed {
            EndSpeed::Fixed(v) => Some(v),
            EndSpeed::Free => None,
        }
    }
}

/// Boundary conditions of each segment family.
///
/// Speeds are air speeds in m/s, rates are vertical speeds in m/s (always positive), altitudes
/// are in meters and times in seconds. A start altitude (or altitude) of `None` is inherited from
/// the end of the previous segment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SegmentKind {
    /// Climb at a constant air speed and a constant rate of climb
    ClimbConstantSpeedConstantRate {
        air_speed: f64,
        climb_rate: f64,
        #[serde(default)]
        altitude_start: Option<f64>,
        altitude_end: f64,
    },
    /// Climb at a constant rate while the air speed changes linearly with time
    ClimbLinearSpeedConstantRate {
        air_speed_start: f64,
        air_speed_end: f64,
        climb_rate: f64,
        #[serde(default)]
        altitude_start: Option<f64>,
        altitude_end: f64,
    },
    /// Climb whose speed and flight path are chosen by an optimizer. The climb rate of the
    /// linear speed climb which seeds the optimizer is `seed_climb_rate`.
    OptimizedClimb {
        air_speed_start: f64,
        #[serde(default)]
        air_speed_end: EndSpeed,
        #[serde(default)]
        altitude_start: Option<f64>,
        altitude_end: f64,
        seed_climb_rate: f64,
    },
    /// Level flight at a constant air speed over a given distance (m)
    Cruise {
        air_speed: f64,
        distance: f64,
        #[serde(default)]
        altitude: Option<f64>,
    },
    /// Descent at a constant air speed and a constant rate of descent
    DescentConstantSpeedConstantRate {
        air_speed: f64,
        descent_rate: f64,
        #[serde(default)]
        altitude_start: Option<f64>,
        altitude_end: f64,
    },
    /// Stationary hover for a given time
    Hover {
        #[serde(default)]
        altitude: Option<f64>,
        time: f64,
    },
    /// Vertical climb at a constant rate
    HoverClimb {
        climb_rate: f64,
        #[serde(default)]
        altitude_start: Option<f64>,
        altitude_end: f64,
    },
    /// Vertical descent at a constant rate
    HoverDescent {
        descent_rate: f64,
        #[serde(default)]
        altitude_start: Option<f64>,
        altitude_end: f64,
    },
}

impl SegmentKind {
    pub fn family(&self) -> &'static str {
        match self {
            Self::ClimbConstantSpeedConstantRate { .. } => "constant speed constant rate climb",
            Self::ClimbLinearSpeedConstantRate { .. } => "linear speed constant rate climb",
            Self::OptimizedClimb { .. } => "optimized climb",
            Self::Cruise { .. } => "constant speed constant altitude cruise",
            Self::DescentConstantSpeedConstantRate { .. } => {
                "constant speed constant rate descent"
            }
            Self::Hover { .. } => "hover",
            Self::HoverClimb { .. } => "hover climb",
            Self::HoverDescent { .. } => "hover descent",
        }
    }

    /// Vertical flight segments only balance the forces along z.
    pub fn is_hover(&self) -> bool {
        matches!(
            self,
            Self::Hover { .. } | Self::HoverClimb { .. } | Self::HoverDescent { .. }
        )
    }

    pub fn is_optimized(&self) -> bool {
        matches!(self, Self::OptimizedClimb { .. })
    }

    /// Start altitude, if given
    pub fn altitude_start(&self) -> Option<f64> {
        match self {
            Self::ClimbConstantSpeedConstantRate { altitude_start, .. }
            | Self::ClimbLinearSpeedConstantRate { altitude_start, .. }
            | Self::OptimizedClimb { altitude_start, .. }
            | Self::DescentConstantSpeedConstantRate { altitude_start, .. }
            | Self::HoverClimb { altitude_start, .. }
            | Self::HoverDescent { altitude_start, .. } => *altitude_start,
            Self::Cruise { altitude, .. } | Self::Hover { altitude, .. } => *altitude,
        }
    }

    /// Initial pitch of the body, in radians
    pub(crate) fn default_body_angle(&self) -> f64 {
        match self {
            Self::ClimbConstantSpeedConstantRate { .. }
            | Self::ClimbLinearSpeedConstantRate { .. }
            | Self::OptimizedClimb { .. } => 3.0_f64.to_radians(),
            _ => 1.0_f64.to_radians(),
        }
    }

    /// Unknowns searched by the solver, in packing order.
    pub fn unknown_layout(&self, n: usize) -> Layout<Unknown> {
        match self {
            Self::Hover { .. } | Self::HoverClimb { .. } | Self::HoverDescent { .. } => {
                Layout::new().with(Unknown::Throttle, n, 1)
            }
            Self::OptimizedClimb { air_speed_end, .. } => {
                // The start speed is known, and so is the end speed when fixed
                let velocity_rows = match air_speed_end {
                    EndSpeed::Free => n.saturating_sub(1),
                    EndSpeed::Fixed(_) => n.saturating_sub(2),
                };
                Layout::new()
                    .with(Unknown::Throttle, n, 1)
                    .with(Unknown::BodyAngle, n, 1)
                    .with(Unknown::FlightPathAngle, n, 1)
                    .with(Unknown::Velocity, velocity_rows, 1)
            }
            _ => Layout::new()
                .with(Unknown::Throttle, n, 1)
                .with(Unknown::BodyAngle, n, 1),
        }
    }

    /// Residuals driven to zero, in packing order. The columns are the x and z axes, or z only
    /// for vertical flight.
    pub fn residual_layout(&self, n: usize) -> Layout<Residual> {
        if self.is_hover() {
            Layout::new().with(Residual::Forces, n, 1)
        } else {
            Layout::new().with(Residual::Forces, n, 2)
        }
    }

    /// Lower and upper bounds of the optimized unknowns.
    pub(crate) fn bounds(&self, layout: &Layout<Unknown>) -> Option<(DVector<f64>, DVector<f64>)> {
        if !self.is_optimized() {
            return None;
        }
        let mut lower = layout.zeros();
        let mut upper = layout.zeros();
        for name in layout.names() {
            let (lo, hi) = match name {
                Unknown::Throttle => (0.0, 1.0),
                Unknown::BodyAngle => (-FRAC_PI_2, FRAC_PI_2),
                Unknown::FlightPathAngle => (0.0, FRAC_PI_2),
                Unknown::Velocity => (0.0, f64::INFINITY),
            };
            if let Some(values) = lower.get_mut(name) {
                values.fill(lo);
            }
            if let Some(values) = upper.get_mut(name) {
                values.fill(hi);
            }
        }
        Some((lower.pack(), upper.pack()))
    }
}

impl fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.family())?;
        match self {
            Self::ClimbConstantSpeedConstantRate {
                air_speed,
                climb_rate,
                altitude_end,
                ..
            } => write!(f, " at {air_speed} m/s and {climb_rate} m/s up to {altitude_end} m"),
            Self::ClimbLinearSpeedConstantRate {
                air_speed_start,
                air_speed_end,
                climb_rate,
                altitude_end,
                ..
            } => write!(
                f,
                " from {air_speed_start} to {air_speed_end} m/s at {climb_rate} m/s up to {altitude_end} m"
            ),
            Self::OptimizedClimb {
                air_speed_start,
                air_speed_end,
                altitude_end,
                ..
            } => match air_speed_end {
                EndSpeed::Fixed(v) => {
                    write!(f, " from {air_speed_start} to {v} m/s up to {altitude_end} m")
                }
                EndSpeed::Free => write!(f, " from {air_speed_start} m/s up to {altitude_end} m"),
            },
            Self::Cruise {
                air_speed,
                distance,
                ..
            } => write!(f, " at {air_speed} m/s over {distance} m"),
            Self::DescentConstantSpeedConstantRate {
                air_speed,
                descent_rate,
                altitude_end,
                ..
            } => write!(f, " at {air_speed} m/s and {descent_rate} m/s down to {altitude_end} m"),
            Self::Hover { time, .. } => write!(f, " for {time} s"),
            Self::HoverClimb {
                climb_rate,
                altitude_end,
                ..
            } => write!(f, " at {climb_rate} m/s up to {altitude_end} m"),
            Self::HoverDescent {
                descent_rate,
                altitude_end,
                ..
            } => write!(f, " at {descent_rate} m/s down to {altitude_end} m"),
        }
    }
}

/// An explicit discontinuity at the start of a segment. Without resets, the time, position and
/// mass of a segment start where the previous segment ended.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Reset {
    /// Restart the clock at this time (s)
    Time(f64),
    /// Start with this mass (kg), e.g. after a payload drop
    Mass(f64),
    /// Allow the start altitude of the segment to differ from the end of the previous segment
    Altitude,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentStatus {
    Unsolved,
    Iterating,
    Converged,
    Failed,
}

impl fmt::Display for SegmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Unsolved => write!(f, "unsolved"),
            Self::Iterating => write!(f, "iterating"),
            Self::Converged => write!(f, "converged"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// One phase of the mission, with its boundary conditions, physics models and solver.
///
/// A segment owns its solver state. Solving it again starts from scratch.
#[derive(Clone)]
pub struct Segment {
    pub name: String,
    pub kind: SegmentKind,
    pub control_points: usize,
    /// Physics models, invoked in this order at every evaluation
    pub physics: Vec<Arc<dyn PhysicsModel>>,
    pub options: SolverOptions,
    pub resets: Vec<Reset>,
    /// Only valid on optimized segments
    pub objective: Option<Objective>,
    pub root_finder: Arc<dyn RootFinder>,
    pub optimizer: Arc<dyn ConstrainedOptimizer>,
    status: SegmentStatus,
    state: Option<State>,
    report: Option<SolverReport>,
}

impl Segment {
    pub fn new<S: Into<String>>(name: S, kind: SegmentKind) -> Self {
        Self {
            name: name.into(),
            kind,
            control_points: DEFAULT_CONTROL_POINTS,
            physics: Vec::new(),
            options: SolverOptions::default(),
            resets: Vec::new(),
            objective: None,
            root_finder: Arc::new(NewtonRaphson),
            optimizer: Arc::new(Sqp),
            status: SegmentStatus::Unsolved,
            state: None,
            report: None,
        }
    }

    pub fn with_control_points(mut self, control_points: usize) -> Self {
        self.control_points = control_points;
        self
    }

    /// Registers a physics model after the ones already registered.
    pub fn with_physics(mut self, model: Arc<dyn PhysicsModel>) -> Self {
        self.physics.push(model);
        self
    }

    pub fn with_options(mut self, options: SolverOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_reset(mut self, reset: Reset) -> Self {
        self.resets.push(reset);
        self
    }

    pub fn with_objective(mut self, objective: Objective) -> Self {
        self.objective = Some(objective);
        self
    }

    pub fn with_root_finder(mut self, root_finder: Arc<dyn RootFinder>) -> Self {
        self.root_finder = root_finder;
        self
    }

    pub fn with_optimizer(mut self, optimizer: Arc<dyn ConstrainedOptimizer>) -> Self {
        self.optimizer = optimizer;
        self
    }

    pub fn status(&self) -> SegmentStatus {
        self.status
    }

    /// Solver state of the last solve, kept after a failure for inspection
    pub fn state(&self) -> Option<&State> {
        self.state.as_ref()
    }

    /// Solver report of the last successful solve
    pub fn report(&self) -> Option<&SolverReport> {
        self.report.as_ref()
    }

    /// Forgets the last solve.
    pub fn reset(&mut self) {
        self.status = SegmentStatus::Unsolved;
        self.state = None;
        self.report = None;
    }

    /// Solves this segment, starting from the final row of the previous segment if any.
    ///
    /// The first segment of a mission starts at time zero, at the origin, with the takeoff mass.
    pub fn solve(
        &mut self,
        initials: Option<&Conditions>,
        takeoff_mass: f64,
        cache: &mut OperatorCache,
    ) -> Result<SolverReport, MissionError> {
        self.reset();
        info!("segment `{}` -- solving {}", self.name, self.kind);
        let result = self
            .boundary(initials, takeoff_mass)
            .and_then(|boundary| self.solve_from(boundary, initials.cloned(), cache));
        if let Err(e) = &result {
            self.status = SegmentStatus::Failed;
            error!("segment `{}` -- {e}", self.name);
        }
        result
    }

    /// Solves this segment from resolved boundary conditions.
    pub(crate) fn solve_from(
        &mut self,
        boundary: Boundary,
        initials: Option<Conditions>,
        cache: &mut OperatorCache,
    ) -> Result<SolverReport, MissionError> {
        self.validate(&boundary)?;

        let unknowns = self.kind.unknown_layout(self.control_points);
        let residuals = self.kind.residual_layout(self.control_points);
        let numerics = Numerics::new(cache.get(self.control_points)?);
        let mut state = State::new(numerics, &unknowns, &residuals, initials);
        self.initialize(&mut state, &boundary);
        let guess = if self.kind.is_optimized() {
            optimized::seed(self, &boundary, &state, cache)?
        } else {
            self.default_guess(&unknowns)
        };
        debug!(
            "segment `{}` -- unknowns {unknowns} -- residuals {residuals}",
            self.name
        );

        self.status = SegmentStatus::Iterating;
        let bounds = self.kind.bounds(&unknowns);
        let outcome = {
            let mut problem = SegmentProblem {
                name: &self.name,
                kind: &self.kind,
                physics: &self.physics,
                objective: self.objective,
                boundary,
                bounds,
                state: &mut state,
            };
            let solved = if self.kind.is_optimized() {
                self.optimizer
                    .minimize(&mut problem, guess, &self.options)
            } else {
                self.root_finder.solve(&mut problem, guess, &self.options)
            };
            // Leave the state at the solution rather than at the last finite difference
            solved.and_then(|report| {
                problem
                    .evaluate(&report.solution)
                    .map_err(|source| SolverError::Evaluation {
                        source: Box::new(source),
                    })?;
                Ok(report)
            })
        };
        if outcome.is_ok() && state.conditions.freestream.gravity.iter().all(|g| *g == 0.0) {
            warn!(
                "segment `{}` -- no physics model set the gravity, the vehicle is weightless",
                self.name
            );
        }
        self.state = Some(state);

        match outcome {
            Ok(report) => {
                self.status = SegmentStatus::Converged;
                info!("segment `{}` -- CONVERGED ({report})", self.name);
                self.report = Some(report.clone());
                Ok(report)
            }
            Err(SolverError::NonConvergence {
                iterations,
                residual_norm,
            }) => {
                self.status = SegmentStatus::Failed;
                Err(MissionError::SolverNonConvergence {
                    segment: self.name.clone(),
                    iterations,
                    residual_norm,
                })
            }
            Err(SolverError::Evaluation { source }) => {
                self.status = SegmentStatus::Failed;
                Err(*source)
            }
            Err(source) => {
                self.status = SegmentStatus::Failed;
                Err(MissionError::Solver {
                    segment: self.name.clone(),
                    source,
                })
            }
        }
    }
}

impl fmt::Debug for Segment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let physics: Vec<String> = self.physics.iter().map(|m| m.to_string()).collect();
        f.debug_struct("Segment")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("control_points", &self.control_points)
            .field("physics", &physics)
            .field("options", &self.options)
            .field("resets", &self.resets)
            .field("objective", &self.objective)
            .field("status", &self.status)
            .finish()
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} ({}, {} control points, {})",
            self.name, self.kind, self.control_points, self.status
        )
    }
}
