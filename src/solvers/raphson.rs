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

use super::jacobian::residual_jacobian;
use super::{
    solve_linear, EvaluationSnafu, NonConvergenceSnafu, Problem, RootFinder, SingularSystemSnafu,
    SolverError, SolverOptions, SolverReport,
};
use crate::linalg::DVector;
use snafu::prelude::*;

/// Newton-Raphson iterations on a finite difference Jacobian, with a backtracking line search on
/// the residual norm.
#[derive(Copy, Clone, Debug, Default)]
pub struct NewtonRaphson;

impl RootFinder for NewtonRaphson {
    fn solve(
        &self,
        problem: &mut dyn Problem,
        guess: DVector<f64>,
        options: &SolverOptions,
    ) -> Result<SolverReport, SolverError> {
        let mut x = guess;
        let mut f = problem.residuals(&x).context(EvaluationSnafu)?;
        let mut norm = f.norm();

        for it in 0..=options.max_iterations {
            debug!("Newton-Raphson -- iteration #{it} -- residual norm = {norm:.6e}");
            if norm < options.tolerance {
                if it <= 1 {
                    info!("Newton-Raphson -- CONVERGED in {it} iteration");
                } else {
                    info!("Newton-Raphson -- CONVERGED in {it} iterations");
                }
                return Ok(SolverReport {
                    solution: x,
                    iterations: it,
                    residual_norm: norm,
                    objective: 0.0,
                });
            }
            if it == options.max_iterations {
                break;
            }

            let jac = residual_jacobian(problem, &x, &f, options.perturbation)?;
            let step = solve_linear(jac, &(-&f)).context(SingularSystemSnafu {
                action: "Newton-Raphson",
                iteration: it,
            })?;

            // Backtrack until the residuals decrease
            let mut scale = 1.0;
            let mut trial_x = &x + &step;
            let mut trial_f = problem.residuals(&trial_x).context(EvaluationSnafu)?;
            if options.line_search {
                let mut halvings = 0;
                while !(trial_f.norm() < norm) && halvings < options.max_halvings {
                    scale *= 0.5;
                    halvings += 1;
                    trial_x = &x + &step * scale;
                    trial_f = problem.residuals(&trial_x).context(EvaluationSnafu)?;
                }
                if !(trial_f.norm() < norm) {
                    warn!(
                        "Newton-Raphson -- line search stalled after {halvings} halvings (norm {:.3e} -> {:.3e})",
                        norm,
                        trial_f.norm()
                    );
                }
            }

            let step_norm = scale * step.norm();
            x = trial_x;
            f = trial_f;
            norm = f.norm();

            if step_norm < options.step_tolerance * (1.0 + x.norm()) && norm >= options.tolerance
            {
                warn!("Newton-Raphson -- step of {step_norm:.3e} is too small to make progress");
                error!("Newton-Raphson -- stalled at iteration #{it} with residual norm {norm:.3e}");
                return NonConvergenceSnafu {
                    iterations: it + 1,
                    residual_norm: norm,
                }
                .fail();
            }
        }

        error!(
            "Newton-Raphson -- did not converge in {} iterations (residual norm = {norm:.3e})",
            options.max_iterations
        );
        Err(SolverError::NonConvergence {
            iterations: options.max_iterations,
            residual_norm: norm,
        })
    }
}
