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

use super::{EvaluationSnafu, Problem, SolverError};
use crate::linalg::{DMatrix, DVector};
use snafu::ResultExt;

/// Step used to perturb `x` for forward differences.
fn step(x: f64, perturbation: f64) -> f64 {
    perturbation * x.abs().max(1.0)
}

/// Forward difference Jacobian of the residuals at `x`, where `f0` are the residuals at `x`.
///
/// Each column costs one residual evaluation. The perturbation is relative to the magnitude of
/// each unknown, with an absolute floor for unknowns close to zero.
pub(crate) fn residual_jacobian(
    problem: &mut dyn Problem,
    x: &DVector<f64>,
    f0: &DVector<f64>,
    perturbation: f64,
) -> Result<DMatrix<f64>, SolverError> {
    let mut jac = DMatrix::zeros(f0.len(), x.len());
    let mut x_pert = x.clone();
    for j in 0..x.len() {
        let h = step(x[j], perturbation);
        x_pert[j] = x[j] + h;
        let f = problem.residuals(&x_pert).context(EvaluationSnafu)?;
        jac.set_column(j, &((f - f0) / h));
        x_pert[j] = x[j];
    }
    Ok(jac)
}

/// Forward difference gradient of the objective at `x`, where `obj0` is the objective at `x`.
pub(crate) fn objective_gradient(
    problem: &mut dyn Problem,
    x: &DVector<f64>,
    obj0: f64,
    perturbation: f64,
) -> Result<DVector<f64>, SolverError> {
    let mut grad = DVector::zeros(x.len());
    let mut x_pert = x.clone();
    for j in 0..x.len() {
        let h = step(x[j], perturbation);
        x_pert[j] = x[j] + h;
        grad[j] = (problem.objective(&x_pert).context(EvaluationSnafu)? - obj0) / h;
        x_pert[j] = x[j];
    }
    Ok(grad)
}
