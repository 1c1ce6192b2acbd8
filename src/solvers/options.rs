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

use serde_derive::{Deserialize, Serialize};
use std::fmt;
use typed_builder::TypedBuilder;

/// SolverOptions stores the stopping criteria and the step control of the root finders and
/// optimizers.
///
/// All fields have defaults, so `SolverOptions::builder().max_iterations(10).build()` only
/// changes the iteration budget. The same defaults apply to the fields missing from a mission file.
#[derive(Clone, Copy, Debug, PartialEq, TypedBuilder, Serialize, Deserialize)]
#[builder(doc)]
#[serde(default)]
pub struct SolverOptions {
    /// Convergence threshold on the 2-norm of the residuals
    #[builder(default = 1e-8)]
    pub tolerance: f64,
    /// Iteration budget. With zero iterations, the guess is only evaluated.
    #[builder(default = 50)]
    pub max_iterations: usize,
    /// Relative perturbation of the finite difference derivatives
    #[builder(default = 1e-7)]
    pub perturbation: f64,
    /// Halve the steps which do not decrease the residuals (or the objective)
    #[builder(default = true)]
    pub line_search: bool,
    #[builder(default = 12)]
    pub max_halvings: usize,
    /// Steps smaller than this (relative to the unknowns) mean that the solver has stalled
    #[builder(default = 1e-10)]
    pub step_tolerance: f64,
    /// Optimizers stop once the predicted decrease of the objective falls below this, or once an
    /// accepted step changes the objective by less than this times `max(1, |objective|)`
    #[builder(default = 1e-6)]
    pub objective_tolerance: f64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl fmt::Display for SolverOptions {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "tolerance = {:e}, max iterations = {}, perturbation = {:e}, line search = {}",
            self.tolerance, self.max_iterations, self.perturbation, self.line_search
        )
    }
}
