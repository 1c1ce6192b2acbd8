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

use crate::linalg::{DMatrix, DVector};
use crate::MissionError;
use snafu::prelude::*;
use std::fmt;

mod jacobian;
mod options;
pub use options::SolverOptions;

/// Finite difference Newton-Raphson root finder.
pub mod raphson;
pub use raphson::NewtonRaphson;

/// Sequential quadratic programming with box bounds.
pub mod sqp;
pub use sqp::Sqp;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SolverError {
    #[snafu(display(
        "no convergence after {iterations} iterations (residual norm = {residual_norm:.3e})"
    ))]
    NonConvergence {
        iterations: usize,
        residual_norm: f64,
    },
    #[snafu(display("{action} failed on a singular system at iteration {iteration}"))]
    SingularSystem {
        action: &'static str,
        iteration: usize,
    },
    #[snafu(display("{count} unknowns cannot satisfy {constraints} equality constraints"))]
    Overconstrained { count: usize, constraints: usize },
    #[snafu(display("evaluation failed: {source}"))]
    Evaluation {
        #[snafu(source(from(MissionError, Box::new)))]
        source: Box<MissionError>,
    },
}

/// A system of equations the solvers drive to zero, with an optional scalar objective and bounds.
pub trait Problem {
    /// Equality residuals at `x`, zero at a solution.
    fn residuals(&mut self, x: &DVector<f64>) -> Result<DVector<f64>, MissionError>;

    /// Scalar to minimize. Problems without an objective return zero.
    fn objective(&mut self, _x: &DVector<f64>) -> Result<f64, MissionError> {
        Ok(0.0)
    }

    /// Returns the lower and upper bounds of each unknown, if any.
    fn bounds(&self) -> Option<(DVector<f64>, DVector<f64>)> {
        None
    }

    /// Set to true if `objective` is not constant.
    fn has_objective(&self) -> bool {
        false
    }
}

/// Outcome of a successful solve.
#[derive(Clone, Debug, PartialEq)]
pub struct SolverReport {
    pub solution: DVector<f64>,
    pub iterations: usize,
    /// 2-norm of the residuals at the solution
    pub residual_norm: f64,
    /// Objective at the solution, zero for square systems
    pub objective: f64,
}

impl fmt::Display for SolverReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} iterations, residual norm = {:.3e}, objective = {:.6e}",
            self.iterations, self.residual_norm, self.objective
        )
    }
}

/// Solves square systems of equations.
pub trait RootFinder: Send + Sync + fmt::Debug {
    fn solve(
        &self,
        problem: &mut dyn Problem,
        guess: DVector<f64>,
        options: &SolverOptions,
    ) -> Result<SolverReport, SolverError>;
}

/// Minimizes an objective subject to equality constraints and bounds.
pub trait ConstrainedOptimizer: Send + Sync + fmt::Debug {
    fn minimize(
        &self,
        problem: &mut dyn Problem,
        guess: DVector<f64>,
        options: &SolverOptions,
    ) -> Result<SolverReport, SolverError>;
}

/// Solves `a * x = b`, falling back to the least squares (minimum norm) solution when `a` is
/// singular or not square.
pub(crate) fn solve_linear(a: DMatrix<f64>, b: &DVector<f64>) -> Option<DVector<f64>> {
    if a.is_square() {
        if let Some(x) = a.clone().lu().solve(b) {
            if x.iter().all(|v| v.is_finite()) {
                return Some(x);
            }
        }
        warn!("singular {}×{} system, using the pseudo inverse", a.nrows(), a.ncols());
    }
    let eps = 1e-12 * a.amax().max(1.0);
    a.svd(true, true)
        .pseudo_inverse(eps)
        .ok()
        .map(|pinv| pinv * b)
}

/// Clamps `x` into the bounds, if any.
pub(crate) fn project(x: &mut DVector<f64>, bounds: &Option<(DVector<f64>, DVector<f64>)>) {
    if let Some((lower, upper)) = bounds {
        for i in 0..x.len() {
            x[i] = x[i].clamp(lower[i], upper[i]);
        }
    }
}
