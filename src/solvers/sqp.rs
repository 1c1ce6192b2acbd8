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

use super::jacobian::{objective_gradient, residual_jacobian};
use super::{
    project, solve_linear, ConstrainedOptimizer, EvaluationSnafu, NonConvergenceSnafu,
    OverconstrainedSnafu, Problem, SingularSystemSnafu, SolverError, SolverOptions, SolverReport,
};
use crate::linalg::{DMatrix, DVector};
use snafu::prelude::*;

type Bounds = Option<(DVector<f64>, DVector<f64>)>;

/// Largest change of any unknown in the first trial of a line search
const MAX_STEP: f64 = 0.25;
/// Newton iterations allowed to bring a trial point back onto the constraints
const RESTORATION_STEPS: usize = 8;
/// Sufficient decrease factor of the Armijo test
const ARMIJO: f64 = 1e-4;
/// Unknowns closer than this to one of their bounds are considered on it
const ACTIVE: f64 = 1e-6;

/// Sequential quadratic programming for equality constrained problems with box bounds.
///
/// The iterates are kept feasible. An infeasible guess is first driven onto the constraints with
/// minimum norm Newton steps. From there, each iteration solves the KKT system of the local
/// quadratic model, where the Hessian of the Lagrangian is approximated by a damped BFGS update
/// whose first estimate is scaled by `yᵀy / sᵀy`. Unknowns lying on a bound which the step would
/// push outward are pinned. Each trial point is projected on the bounds, restored onto the
/// constraints and only accepted if the objective passes the Armijo test.
///
/// When no trial point is accepted, the Hessian approximation is reset once and the iteration is
/// retried. A second failure is reported as non-convergence.
///
/// The solve has converged once the constraints are met and either the predicted decrease
/// `|gᵀp|` or the decrease of the last accepted step is below `objective_tolerance`. Without an
/// objective, the first feasible point is the solution.
#[derive(Copy, Clone, Debug, Default)]
pub struct Sqp;

impl Sqp {
    /// Solves the KKT system at the feasible point `x`, returns the step and the constraint
    /// multipliers.
    #[allow(clippy::too_many_arguments)]
    fn qp_step(
        hessian: &DMatrix<f64>,
        jac: &DMatrix<f64>,
        grad: &DVector<f64>,
        constraints: &DVector<f64>,
        x: &DVector<f64>,
        bounds: &Bounds,
        iteration: usize,
    ) -> Result<(DVector<f64>, DVector<f64>), SolverError> {
        let n = x.len();
        let m = constraints.len();
        let mut pinned: Vec<(usize, f64)> = Vec::new();

        loop {
            let k = n + m + pinned.len();
            let mut kkt = DMatrix::zeros(k, k);
            kkt.view_mut((0, 0), (n, n)).copy_from(hessian);
            kkt.view_mut((0, n), (n, m)).copy_from(&jac.transpose());
            kkt.view_mut((n, 0), (m, n)).copy_from(jac);

            let mut rhs = DVector::zeros(k);
            rhs.rows_mut(0, n).copy_from(&(-grad));
            rhs.rows_mut(n, m).copy_from(&(-constraints));
            for (row, (i, offset)) in pinned.iter().enumerate() {
                kkt[(n + m + row, *i)] = 1.0;
                kkt[(*i, n + m + row)] = 1.0;
                rhs[n + m + row] = *offset;
            }

            let sol = solve_linear(kkt, &rhs).context(SingularSystemSnafu {
                action: "SQP",
                iteration,
            })?;
            let step = sol.rows(0, n).clone_owned();
            let multipliers = sol.rows(n, m).clone_owned();

            let Some((lower, upper)) = bounds else {
                return Ok((step, multipliers));
            };

            let mut newly_pinned = 0;
            for i in 0..n {
                if pinned.iter().any(|(j, _)| *j == i) {
                    continue;
                }
                if x[i] - lower[i] <= ACTIVE && step[i] < 0.0 {
                    pinned.push((i, lower[i] - x[i]));
                    newly_pinned += 1;
                } else if upper[i] - x[i] <= ACTIVE && step[i] > 0.0 {
                    pinned.push((i, upper[i] - x[i]));
                    newly_pinned += 1;
                }
            }
            if newly_pinned == 0 {
                return Ok((step, multipliers));
            }
            trace!("SQP -- pinned {newly_pinned} unknowns on their bounds");
        }
    }

    /// Minimum norm solution of `jac * d = rhs` which keeps `x + d` within the bounds, by
    /// freezing the unknowns which would leave them.
    fn bounded_newton_step(
        jac: &DMatrix<f64>,
        rhs: &DVector<f64>,
        x: &DVector<f64>,
        bounds: &Bounds,
        iteration: usize,
    ) -> Result<DVector<f64>, SolverError> {
        let mut frozen = vec![false; x.len()];
        loop {
            let mut free_jac = jac.clone();
            for (j, _) in frozen.iter().enumerate().filter(|(_, f)| **f) {
                free_jac.column_mut(j).fill(0.0);
            }
            let step = solve_linear(free_jac, rhs).context(SingularSystemSnafu {
                action: "feasibility step",
                iteration,
            })?;

            let Some((lower, upper)) = bounds else {
                return Ok(step);
            };
            let mut newly_frozen = false;
            for i in 0..x.len() {
                let target = x[i] + step[i];
                if !frozen[i] && !(lower[i] <= target && target <= upper[i]) {
                    frozen[i] = true;
                    newly_frozen = true;
                }
            }
            if !newly_frozen {
                return Ok(step);
            }
        }
    }

    /// Brings `z` back onto the constraints with monotonically decreasing Newton steps. Returns
    /// `None` when the constraints cannot be met that way.
    fn restore(
        problem: &mut dyn Problem,
        mut z: DVector<f64>,
        bounds: &Bounds,
        options: &SolverOptions,
        iteration: usize,
    ) -> Result<Option<(DVector<f64>, DVector<f64>)>, SolverError> {
        let mut constraints = problem.residuals(&z).context(EvaluationSnafu)?;
        for k in 0..=RESTORATION_STEPS {
            let c_norm = constraints.norm();
            if c_norm < options.tolerance {
                return Ok(Some((z, constraints)));
            }
            if k == RESTORATION_STEPS {
                break;
            }
            let jac = residual_jacobian(problem, &z, &constraints, options.perturbation)?;
            let step = Self::bounded_newton_step(&jac, &(-&constraints), &z, bounds, iteration)?;
            let mut next = &z + step;
            project(&mut next, bounds);
            let next_constraints = problem.residuals(&next).context(EvaluationSnafu)?;
            if !(next_constraints.norm() < c_norm) {
                break;
            }
            z = next;
            constraints = next_constraints;
        }
        Ok(None)
    }

    /// Backtracks along `step` from the feasible point `x` until a restored trial point passes
    /// the Armijo test. Returns the accepted point, its constraints and its objective.
    #[allow(clippy::too_many_arguments)]
    fn line_search(
        problem: &mut dyn Problem,
        x: &DVector<f64>,
        obj: f64,
        grad: &DVector<f64>,
        step: &DVector<f64>,
        bounds: &Bounds,
        options: &SolverOptions,
        iteration: usize,
    ) -> Result<Option<(DVector<f64>, DVector<f64>, f64)>, SolverError> {
        let mut alpha = (MAX_STEP / step.amax()).min(1.0);
        let halvings = if options.line_search {
            options.max_halvings
        } else {
            0
        };
        for _ in 0..=halvings {
            let mut z = x + step * alpha;
            project(&mut z, bounds);
            // Decrease predicted by the projected step
            let predicted = grad.dot(&(&z - x));
            if predicted < 0.0 {
                if let Some((z, constraints)) =
                    Self::restore(problem, z, bounds, options, iteration)?
                {
                    let trial_obj = problem.objective(&z).context(EvaluationSnafu)?;
                    if trial_obj <= obj + ARMIJO * predicted {
                        return Ok(Some((z, constraints, trial_obj)));
                    }
                }
            }
            alpha *= 0.5;
        }
        Ok(None)
    }
}

/// Powell's damped BFGS update, which keeps the approximation positive definite.
fn damped_bfgs_update(hessian: &mut DMatrix<f64>, s: &DVector<f64>, y: &DVector<f64>) {
    let bs = &*hessian * s;
    let sbs = s.dot(&bs);
    if sbs <= f64::EPSILON {
        return;
    }
    let sy = s.dot(y);
    let theta = if sy >= 0.2 * sbs {
        1.0
    } else {
        0.8 * sbs / (sbs - sy)
    };
    let r = y * theta + &bs * (1.0 - theta);
    let sr = s.dot(&r);
    if sr <= f64::EPSILON {
        return;
    }
    *hessian += &r * r.transpose() / sr - &bs * bs.transpose() / sbs;
}

impl ConstrainedOptimizer for Sqp {
    fn minimize(
        &self,
        problem: &mut dyn Problem,
        guess: DVector<f64>,
        options: &SolverOptions,
    ) -> Result<SolverReport, SolverError> {
        let n = guess.len();
        let bounds = problem.bounds();
        let has_objective = problem.has_objective();

        let mut x = guess;
        project(&mut x, &bounds);
        let mut constraints = problem.residuals(&x).context(EvaluationSnafu)?;
        ensure!(
            constraints.len() <= n,
            OverconstrainedSnafu {
                count: n,
                constraints: constraints.len()
            }
        );
        let mut obj = if has_objective {
            problem.objective(&x).context(EvaluationSnafu)?
        } else {
            0.0
        };

        let mut hessian = DMatrix::identity(n, n);
        // Whether the Hessian approximation has not been updated since its last reset
        let mut fresh = true;
        let mut scaled = false;
        // Last step, gradient of the Lagrangian before it and the multipliers used
        let mut previous: Option<(DVector<f64>, DVector<f64>, DVector<f64>)> = None;

        let converged = |x: DVector<f64>, it: usize, c_norm: f64, obj: f64| {
            info!("SQP -- CONVERGED in {it} iterations (objective = {obj:.6e})");
            SolverReport {
                solution: x,
                iterations: it,
                residual_norm: c_norm,
                objective: obj,
            }
        };

        for it in 0..=options.max_iterations {
            let c_norm = constraints.norm();
            if c_norm >= options.tolerance {
                if it == options.max_iterations {
                    break;
                }
                let jac = residual_jacobian(problem, &x, &constraints, options.perturbation)?;
                let step = Self::bounded_newton_step(&jac, &(-&constraints), &x, &bounds, it)?;
                let mut scale = 1.0;
                let mut restored = None;
                for _ in 0..=options.max_halvings {
                    let mut trial_x = &x + &step * scale;
                    project(&mut trial_x, &bounds);
                    let trial_c = problem.residuals(&trial_x).context(EvaluationSnafu)?;
                    if trial_c.norm() < c_norm {
                        restored = Some((trial_x, trial_c));
                        break;
                    }
                    scale *= 0.5;
                }
                let Some((trial_x, trial_c)) = restored else {
                    error!("SQP -- feasibility stalled at iteration #{it} (constraint norm = {c_norm:.3e})");
                    return NonConvergenceSnafu {
                        iterations: it,
                        residual_norm: c_norm,
                    }
                    .fail();
                };
                debug!(
                    "SQP -- iteration #{it} -- feasibility step -- constraint norm = {:.6e}",
                    trial_c.norm()
                );
                x = trial_x;
                constraints = trial_c;
                if has_objective {
                    obj = problem.objective(&x).context(EvaluationSnafu)?;
                }
                previous = None;
                continue;
            }

            if !has_objective {
                return Ok(converged(x, it, c_norm, obj));
            }

            let jac = residual_jacobian(problem, &x, &constraints, options.perturbation)?;
            let grad = objective_gradient(problem, &x, obj, options.perturbation)?;

            if let Some((s, grad_lagrangian, multipliers)) = previous.take() {
                let y = &grad + jac.transpose() * &multipliers - grad_lagrangian;
                let sy = s.dot(&y);
                if !scaled && sy > f64::EPSILON {
                    hessian = DMatrix::identity(n, n) * (y.norm_squared() / sy);
                    scaled = true;
                }
                damped_bfgs_update(&mut hessian, &s, &y);
            }

            let (step, multipliers) =
                Self::qp_step(&hessian, &jac, &grad, &constraints, &x, &bounds, it)?;
            let predicted = grad.dot(&step);
            debug!(
                "SQP -- iteration #{it} -- objective = {obj:.9e} -- constraint norm = {c_norm:.3e} -- gᵀp = {predicted:.3e} -- step = {:.3e}",
                step.amax()
            );

            if predicted.abs() <= options.objective_tolerance {
                return Ok(converged(x, it, c_norm, obj));
            }
            if it == options.max_iterations {
                break;
            }

            let accepted = if predicted < 0.0 {
                Self::line_search(problem, &x, obj, &grad, &step, &bounds, options, it)?
            } else {
                None
            };

            let Some((trial_x, trial_c, trial_obj)) = accepted else {
                if fresh {
                    error!("SQP -- no acceptable step from iteration #{it} (objective = {obj:.6e})");
                    return NonConvergenceSnafu {
                        iterations: it,
                        residual_norm: c_norm,
                    }
                    .fail();
                }
                warn!("SQP -- no acceptable step at iteration #{it}, resetting the Hessian");
                hessian = DMatrix::identity(n, n);
                fresh = true;
                scaled = false;
                continue;
            };

            let grad_lagrangian = &grad + jac.transpose() * &multipliers;
            previous = Some((&trial_x - &x, grad_lagrangian, multipliers));
            let decrease = obj - trial_obj;
            let settled = decrease.abs() <= options.objective_tolerance * obj.abs().max(1.0);
            x = trial_x;
            constraints = trial_c;
            obj = trial_obj;
            fresh = false;
            if settled {
                return Ok(converged(x, it + 1, constraints.norm(), obj));
            }
        }

        error!(
            "SQP -- did not converge in {} iterations (constraint norm = {:.3e})",
            options.max_iterations,
            constraints.norm()
        );
        Err(SolverError::NonConvergence {
            iterations: options.max_iterations,
            residual_norm: constraints.norm(),
        })
    }
}
