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
use crate::numerics::OperatorCache;
use crate::segments::Segment;
use crate::MissionError;
use indexmap::IndexMap;
use snafu::ensure;
use std::collections::HashSet;
use std::fmt;

mod results;
pub use results::{MissionResults, SegmentResults};

/// An ordered sequence of segments flown by one vehicle.
#[derive(Clone, Debug)]
pub struct Mission {
    pub name: String,
    /// Mass at the start of the first segment (kg)
    pub takeoff_mass: f64,
    segments: Vec<Segment>,
    cache: OperatorCache,
}

impl Mission {
    pub fn builder<S: Into<String>>(name: S, takeoff_mass: f64) -> MissionBuilder {
        MissionBuilder {
            name: name.into(),
            takeoff_mass,
            segments: Vec::new(),
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn segment(&self, name: &str) -> Option<&Segment> {
        self.segments.iter().find(|s| s.name == name)
    }

    /// Solves every segment in order, each one starting where the previous one ended.
    ///
    /// Every call starts over from the first segment. The first failure aborts the evaluation and
    /// no results are returned.
    pub fn evaluate(&mut self) -> Result<MissionResults, MissionError> {
        info!(
            "mission `{}` -- evaluating {} segments",
            self.name,
            self.segments.len()
        );
        for segment in &mut self.segments {
            segment.reset();
        }

        let mut results = IndexMap::with_capacity(self.segments.len());
        let mut initials = None;
        for segment in &mut self.segments {
            let report = segment.solve(initials.as_ref(), self.takeoff_mass, &mut self.cache)?;
            let Some(state) = segment.state() else {
                return Err(MissionError::config(format!(
                    "segment `{}` converged without a state",
                    segment.name
                )));
            };
            initials = Some(state.conditions.last_row());
            results.insert(
                segment.name.clone(),
                SegmentResults::new(segment, state, &report),
            );
        }

        let results = MissionResults {
            name: self.name.clone(),
            segments: results,
        };
        info!("mission `{}` -- {results}", self.name);
        Ok(results)
    }
}

impl fmt::Display for Mission {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "mission `{}` ({} kg at takeoff)", self.name, self.takeoff_mass)?;
        for segment in &self.segments {
            writeln!(f, "  - {segment}")?;
        }
        Ok(())
    }
}

/// Collects the segments of a mission, in flight order.
#[derive(Clone, Debug)]
pub struct MissionBuilder {
    name: String,
    takeoff_mass: f64,
    segments: Vec<Segment>,
}

impl MissionBuilder {
    /// Appends a segment after the ones already added.
    pub fn segment(mut self, segment: Segment) -> Self {
        self.segments.push(segment);
        self
    }

    /// Checks that the mission can be evaluated: a positive takeoff mass, at least one segment
    /// and unique segment names.
    pub fn build(self) -> Result<Mission, MissionError> {
        ensure!(
            self.takeoff_mass > 0.0 && self.takeoff_mass.is_finite(),
            InvalidConfigurationSnafu {
                msg: format!(
                    "mission `{}` needs a positive takeoff mass, got {}",
                    self.name, self.takeoff_mass
                )
            }
        );
        ensure!(
            !self.segments.is_empty(),
            InvalidConfigurationSnafu {
                msg: format!("mission `{}` has no segments", self.name)
            }
        );
        let mut names = HashSet::new();
        for segment in &self.segments {
            ensure!(
                names.insert(segment.name.as_str()),
                InvalidConfigurationSnafu {
                    msg: format!("segment name `{}` is used twice", segment.name)
                }
            );
        }

        Ok(Mission {
            name: self.name,
            takeoff_mass: self.takeoff_mass,
            segments: self.segments,
            cache: OperatorCache::new(),
        })
    }
}
