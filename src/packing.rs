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
use std::fmt;

/// Free variables searched by the solvers, one row per control point (or fewer when a boundary
/// condition pins some rows).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Unknown {
    /// Throttle setting
    Throttle,
    /// Pitch of the body with respect to the inertial frame (rad)
    BodyAngle,
    /// Climb angle of the velocity vector (rad)
    FlightPathAngle,
    /// Air speed, normalized by the start air speed
    Velocity,
}

/// Imbalances driven to zero by the solvers.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Residual {
    /// Net specific force minus acceleration (m/s^2), one column per solved axis
    Forces,
}

impl fmt::Display for Unknown {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Throttle => write!(f, "throttle"),
            Self::BodyAngle => write!(f, "body_angle"),
            Self::FlightPathAngle => write!(f, "flight_path_angle"),
            Self::Velocity => write!(f, "velocity"),
        }
    }
}

impl fmt::Display for Residual {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Forces => write!(f, "forces"),
        }
    }
}

/// Ordered shapes of named arrays. The order is the packing order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Layout<K> {
    entries: Vec<(K, usize, usize)>,
}

impl<K: Copy + Eq + fmt::Display> Layout<K> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Appends an array of `rows` by `cols` named `name`.
    pub fn with(mut self, name: K, rows: usize, cols: usize) -> Self {
        self.entries.push((name, rows, cols));
        self
    }

    /// Total number of packed values
    pub fn len(&self) -> usize {
        self.entries.iter().map(|(_, r, c)| r * c).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Names in packing order
    pub fn names(&self) -> impl Iterator<Item = K> + '_ {
        self.entries.iter().map(|(name, _, _)| *name)
    }

    pub fn shape(&self, name: K) -> Option<(usize, usize)> {
        self.entries
            .iter()
            .find(|(n, _, _)| *n == name)
            .map(|(_, r, c)| (*r, *c))
    }

    /// Arrays of this layout filled with `value`.
    pub fn filled(&self, value: f64) -> PackedArrays<K> {
        PackedArrays {
            layout: self.clone(),
            values: self
                .entries
                .iter()
                .map(|(_, r, c)| DMatrix::from_element(*r, *c, value))
                .collect(),
        }
    }

    pub fn zeros(&self) -> PackedArrays<K> {
        self.filled(0.0)
    }

    /// Splits a flat vector into the named arrays of this layout, column-major. Exact inverse of
    /// [`PackedArrays::pack`].
    pub fn unpack(&self, flat: &DVector<f64>) -> Result<PackedArrays<K>, MissionError> {
        ensure!(
            flat.len() == self.len(),
            InvalidConfigurationSnafu {
                msg: format!(
                    "cannot unpack {} values into a layout of {} values",
                    flat.len(),
                    self.len()
                )
            }
        );

        let data = flat.as_slice();
        let mut offset = 0;
        let mut values = Vec::with_capacity(self.entries.len());
        for (_, rows, cols) in &self.entries {
            let count = rows * cols;
            values.push(DMatrix::from_column_slice(
                *rows,
                *cols,
                &data[offset..offset + count],
            ));
            offset += count;
        }

        Ok(PackedArrays {
            layout: self.clone(),
            values,
        })
    }
}

impl<K: Copy + Eq + fmt::Display> Default for Layout<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Copy + Eq + fmt::Display> fmt::Display for Layout<K> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let shapes: Vec<String> = self
            .entries
            .iter()
            .map(|(name, r, c)| format!("{name} {r}×{c}"))
            .collect();
        write!(f, "[{}]", shapes.join(", "))
    }
}

/// Named arrays following a [`Layout`].
#[derive(Clone, Debug, PartialEq)]
pub struct PackedArrays<K> {
    layout: Layout<K>,
    values: Vec<DMatrix<f64>>,
}

impl<K: Copy + Eq + fmt::Display> PackedArrays<K> {
    pub fn layout(&self) -> &Layout<K> {
        &self.layout
    }

    /// Concatenates every array column-major, in layout order.
    pub fn pack(&self) -> DVector<f64> {
        DVector::from_iterator(
            self.layout.len(),
            self.values.iter().flat_map(|m| m.iter().copied()),
        )
    }

    pub fn get(&self, name: K) -> Option<&DMatrix<f64>> {
        self.index_of(name).map(|i| &self.values[i])
    }

    pub fn get_mut(&mut self, name: K) -> Option<&mut DMatrix<f64>> {
        let idx = self.index_of(name)?;
        Some(&mut self.values[idx])
    }

    /// Replaces the array `name`, which must keep its shape.
    pub fn set(&mut self, name: K, value: DMatrix<f64>) -> Result<(), MissionError> {
        let idx = self.index_of(name).ok_or_else(|| {
            MissionError::config(format!("`{name}` is not part of the layout {}", self.layout))
        })?;
        let (rows, cols) = self.values[idx].shape();
        ensure!(
            value.shape() == (rows, cols),
            InvalidConfigurationSnafu {
                msg: format!(
                    "`{name}` must be {rows}×{cols}, got {}×{}",
                    value.nrows(),
                    value.ncols()
                )
            }
        );
        self.values[idx] = value;
        Ok(())
    }

    /// Iterates over the names and arrays in layout order
    pub fn iter(&self) -> impl Iterator<Item = (K, &DMatrix<f64>)> + '_ {
        self.layout.names().zip(self.values.iter())
    }

    fn index_of(&self, name: K) -> Option<usize> {
        self.layout.names().position(|n| n == name)
    }
}
