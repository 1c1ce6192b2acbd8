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

use crate::io::ConfigError;
use crate::physics::PhysicsError;
use crate::solvers::SolverError;
use snafu::prelude::*;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum MissionError {
    /// Raised when the boundary conditions, control points or layouts of a segment do not define a solvable problem
    #[snafu(display("invalid configuration: {msg}"))]
    InvalidConfiguration { msg: String },
    #[snafu(display("segment `{segment}` must inherit its {quantity} but no initial state is available"))]
    MissingInitialState {
        segment: String,
        quantity: &'static str,
    },
    #[snafu(display(
        "segment `{segment}` did not converge after {iterations} iterations (residual norm = {residual_norm:.3e})"
    ))]
    SolverNonConvergence {
        segment: String,
        iterations: usize,
        residual_norm: f64,
    },
    #[snafu(display("segment `{segment}` solver failed: {source}"))]
    Solver {
        segment: String,
        source: SolverError,
    },
    #[snafu(display("segment `{segment}` physics model failed: {source}"))]
    Physics {
        segment: String,
        source: PhysicsError,
    },
    /// A physics model resized a conditions array
    #[snafu(display("conditions field `{field}` has {found} rows but {expected} are expected"))]
    ShapeMismatch {
        field: &'static str,
        expected: usize,
        found: usize,
    },
    #[snafu(display("mission configuration: {source}"))]
    Config { source: ConfigError },
    #[snafu(display("could not export results to {path}: {source}"))]
    Export { path: String, source: csv::Error },
}

impl MissionError {
    pub(crate) fn config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfiguration { msg: msg.into() }
    }
}

impl From<ConfigError> for MissionError {
    fn from(source: ConfigError) -> Self {
        Self::Config { source }
    }
}
