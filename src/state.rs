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
use crate::numerics::Numerics;
use crate::packing::{Layout, PackedArrays, Residual, Unknown};

/// Working memory of a segment while it is being solved.
///
/// A state is created when the segment starts solving and is exclusively owned by that segment.
/// The conditions keep one row per control point for the whole solve.
#[derive(Clone, Debug)]
pub struct State {
    /// Dimensionless operators, and their copy rescaled to the current segment duration
    pub numerics: Numerics,
    pub unknowns: PackedArrays<Unknown>,
    pub conditions: Conditions,
    pub residuals: PackedArrays<Residual>,
    /// Final row of the previous segment, none for the first segment of a mission
    pub initials: Option<Conditions>,
    /// Unknowns of the last evaluation
    pub inputs_last: Option<DVector<f64>>,
    /// Objective of the last evaluation, already negated when maximizing
    pub objective_value: f64,
    /// Packed residuals of the last evaluation
    pub constraint_values: DVector<f64>,
}

impl State {
    pub fn new(
        numerics: Numerics,
        unknowns: &Layout<Unknown>,
        residuals: &Layout<Residual>,
        initials: Option<Conditions>,
    ) -> Self {
        let rows = numerics.len();
        Self {
            numerics,
            unknowns: unknowns.zeros(),
            conditions: Conditions::new(rows),
            residuals: residuals.zeros(),
            initials,
            inputs_last: None,
            objective_value: 0.0,
            constraint_values: DVector::zeros(residuals.len()),
        }
    }

    /// Number of control points
    pub fn rows(&self) -> usize {
        self.numerics.len()
    }

    /// Returns the residuals of the last evaluation if it was done with exactly these inputs.
    pub fn cached(&self, inputs: &DVector<f64>) -> Option<&DVector<f64>> {
        match &self.inputs_last {
            Some(last) if last == inputs => Some(&self.constraint_values),
            _ => None,
        }
    }
}
