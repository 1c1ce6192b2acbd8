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

use crate::errors::InvalidConfigurationSnafu;
use crate::linalg::{DMatrix, DVector};
use crate::MissionError;
use snafu::ensure;
use std::collections::HashMap;
use std::f64::consts::PI;
use std::fmt;
use std::sync::Arc;

/// Collocation operators on a set of control points.
///
/// In the dimensionless domain, the control points span [0, 1]. Once rescaled to a segment
/// duration `dt`, they span [0, dt] and the operators act on physical time.
#[derive(Clone, Debug, PartialEq)]
pub struct Operators {
    /// Control point abscissas, strictly increasing, first and last included
    pub control_points: DVector<f64>,
    /// Differentiation matrix: `D * f` is the derivative of `f` at the control points
    pub differentiate: DMatrix<f64>,
    /// Cumulative integration matrix anchored at the first control point
    pub integrate: DMatrix<f64>,
}

impl Operators {
    /// Number of control points
    pub fn len(&self) -> usize {
        self.control_points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.control_points.is_empty()
    }

    /// Returns a copy of these operators stretched onto a domain of length `dt`.
    pub fn rescaled(&self, dt: f64) -> Self {
        Self {
            control_points: &self.control_points * dt,
            differentiate: &self.differentiate / dt,
            integrate: &self.integrate * dt,
        }
    }
}

impl fmt::Display for Operators {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} control points over [{:.6}, {:.6}]",
            self.len(),
            self.control_points[0],
            self.control_points[self.len() - 1]
        )
    }
}

/// Builds the Chebyshev-Gauss-Lobatto control points on [0, 1] with their differentiation and
/// integration matrices.
///
/// The differentiation matrix is exact for polynomials of degree lower than `n`. The integration
/// matrix is the inverse of the differentiation matrix restricted to the functions which vanish
/// on the first control point, so it is exact for polynomials of degree lower than `n - 1`.
///
/// ```
/// use aeromission::numerics::build_operators;
///
/// let ops = build_operators(8).unwrap();
/// let f = ops.control_points.map(|x| x * x);
/// let df = &ops.differentiate * &f;
/// assert!((df[7] - 2.0).abs() < 1e-10);
/// ```
pub fn build_operators(n: usize) -> Result<Operators, MissionError> {
    ensure!(
        n >= 2,
        InvalidConfigurationSnafu {
            msg: format!("at least two control points are needed, got {n}")
        }
    );

    let order = (n - 1) as f64;
    let x = DVector::from_fn(n, |i, _| 0.5 * (1.0 - (PI * i as f64 / order).cos()));

    // Barycentric weights of the Chebyshev points of the second kind
    let weights = DVector::from_fn(n, |j, _| {
        let sign = if j % 2 == 0 { 1.0 } else { -1.0 };
        if j == 0 || j == n - 1 {
            0.5 * sign
        } else {
            sign
        }
    });

    let mut d = DMatrix::zeros(n, n);
    for i in 0..n {
        let mut row_sum = 0.0;
        for j in 0..n {
            if i != j {
                let val = (weights[j] / weights[i]) / (x[i] - x[j]);
                d[(i, j)] = val;
                row_sum += val;
            }
        }
        // Negative sum trick: the derivative of a constant is exactly zero
        d[(i, i)] = -row_sum;
    }

    let block = d.view((1, 1), (n - 1, n - 1)).clone_owned();
    let block_inv = block
        .try_inverse()
        .ok_or_else(|| MissionError::config(format!("singular differentiation matrix for {n} control points")))?;

    let mut integrate = DMatrix::zeros(n, n);
    integrate
        .view_mut((1, 1), (n - 1, n - 1))
        .copy_from(&block_inv);

    Ok(Operators {
        control_points: x,
        differentiate: d,
        integrate,
    })
}

/// Memoizes the operators by number of control points, since they only depend on that count.
#[derive(Clone, Debug, Default)]
pub struct OperatorCache {
    operators: HashMap<usize, Arc<Operators>>,
}

impl OperatorCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the operators for `n` control points, building them on first use.
    pub fn get(&mut self, n: usize) -> Result<Arc<Operators>, MissionError> {
        if let Some(ops) = self.operators.get(&n) {
            return Ok(ops.clone());
        }
        let ops = Arc::new(build_operators(n)?);
        debug!("built collocation operators: {ops}");
        self.operators.insert(n, ops.clone());
        Ok(ops)
    }

    /// Number of distinct control point counts cached so far
    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }
}

/// The dimensionless operators of a segment, and their copy rescaled to the segment duration.
#[derive(Clone, Debug)]
pub struct Numerics {
    pub dimensionless: Arc<Operators>,
    pub time: Operators,
}

impl Numerics {
    pub fn new(dimensionless: Arc<Operators>) -> Self {
        let time = (*dimensionless).clone();
        Self {
            dimensionless,
            time,
        }
    }

    /// Number of control points
    pub fn len(&self) -> usize {
        self.dimensionless.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dimensionless.is_empty()
    }

    /// Rescales the time operators to a segment lasting `dt` seconds.
    pub fn rescale(&mut self, dt: f64) {
        self.time = self.dimensionless.rescaled(dt);
    }

    /// Duration spanned by the time operators
    pub fn duration(&self) -> f64 {
        self.time.control_points[self.len() - 1] - self.time.control_points[0]
    }
}
