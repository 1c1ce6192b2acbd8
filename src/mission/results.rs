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
use crate::errors::ExportSnafu;
use crate::packing::{PackedArrays, Residual, Unknown};
use crate::segments::{Segment, SegmentKind, SegmentStatus};
use crate::solvers::SolverReport;
use crate::state::State;
use crate::MissionError;
use indexmap::IndexMap;
use snafu::ResultExt;
use std::fmt;
use std::path::Path;

/// Solution of one segment.
#[derive(Clone, Debug)]
pub struct SegmentResults {
    pub name: String,
    pub kind: SegmentKind,
    pub status: SegmentStatus,
    pub iterations: usize,
    pub residual_norm: f64,
    /// Value of the objective at the solution, only set for segments with an objective
    pub objective_value: Option<f64>,
    pub conditions: Conditions,
    pub unknowns: PackedArrays<Unknown>,
    pub residuals: PackedArrays<Residual>,
}

impl SegmentResults {
    pub(crate) fn new(segment: &Segment, state: &State, report: &SolverReport) -> Self {
        Self {
            name: segment.name.clone(),
            kind: segment.kind.clone(),
            status: segment.status(),
            iterations: report.iterations,
            residual_norm: report.residual_norm,
            objective_value: segment.objective.map(|_| state.objective_value),
            conditions: state.conditions.clone(),
            unknowns: state.unknowns.clone(),
            residuals: state.residuals.clone(),
        }
    }

    /// Time spent in this segment (s)
    pub fn duration(&self) -> f64 {
        self.conditions.final_time() - self.conditions.frames.inertial.time[0]
    }

    /// Fuel burned in this segment (kg)
    pub fn fuel_burn(&self) -> f64 {
        self.conditions.weights.total_mass[0] - self.conditions.final_mass()
    }

    /// Horizontal distance flown in this segment (m)
    pub fn range(&self) -> f64 {
        self.conditions.final_range() - self.conditions.frames.inertial.position_vector[(0, 0)]
    }
}

impl fmt::Display for SegmentResults {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} ({}): {} in {} iterations, {:.1} s, {:.1} m, {:.3} kg of fuel",
            self.name,
            self.kind.family(),
            self.status,
            self.iterations,
            self.duration(),
            self.range(),
            self.fuel_burn()
        )?;
        if let Some(value) = self.objective_value {
            write!(f, ", objective = {value:.6e}")?;
        }
        Ok(())
    }
}

/// Results of a mission evaluation, keyed by segment name in flight order.
#[derive(Clone, Debug)]
pub struct MissionResults {
    pub name: String,
    pub segments: IndexMap<String, SegmentResults>,
}

impl MissionResults {
    pub fn get(&self, name: &str) -> Option<&SegmentResults> {
        self.segments.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SegmentResults> {
        self.segments.values()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Sum of the segment durations, so that clock resets do not shorten the mission.
    pub fn total_time(&self) -> f64 {
        self.iter().map(SegmentResults::duration).sum()
    }

    /// Sum of the fuel burned in each segment, so that mass resets are not counted as fuel.
    pub fn fuel_burn(&self) -> f64 {
        self.iter().map(SegmentResults::fuel_burn).sum()
    }

    /// Sum of the distance flown in each segment.
    pub fn range(&self) -> f64 {
        self.iter().map(SegmentResults::range).sum()
    }

    /// Last control point of the last segment
    pub fn final_conditions(&self) -> Option<Conditions> {
        self.segments
            .last()
            .map(|(_, results)| results.conditions.last_row())
    }

    /// Writes every control point of every segment as one CSV row.
    ///
    /// The first column is the segment name, the others follow [`Conditions::headers`].
    pub fn to_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), MissionError> {
        let path_str = path.as_ref().display().to_string();
        let mut wtr = csv::Writer::from_path(path.as_ref()).context(ExportSnafu {
            path: path_str.clone(),
        })?;

        let mut headers = vec!["segment".to_string()];
        headers.extend(Conditions::headers());
        wtr.write_record(&headers)
            .context(ExportSnafu { path: &path_str })?;

        for results in self.iter() {
            for i in 0..results.conditions.rows() {
                let mut record = vec![results.name.clone()];
                record.extend(
                    results
                        .conditions
                        .flat_row(i)
                        .iter()
                        .map(|value| format!("{value:e}")),
                );
                wtr.write_record(&record)
                    .context(ExportSnafu { path: &path_str })?;
            }
        }
        wtr.flush()
            .map_err(csv::Error::from)
            .context(ExportSnafu { path: &path_str })?;
        info!("mission `{}` results saved to {path_str}", self.name);
        Ok(())
    }
}

impl fmt::Display for MissionResults {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} segments, {:.1} s, {:.1} m, {:.3} kg of fuel",
            self.len(),
            self.total_time(),
            self.range(),
            self.fuel_burn()
        )
    }
}
