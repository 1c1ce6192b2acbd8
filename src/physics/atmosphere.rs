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

use super::{update_dynamic_pressure, OutOfRangeSnafu, PhysicsError, PhysicsModel};
use crate::conditions::Conditions;
use crate::segments::SegmentKind;
use serde_derive::{Deserialize, Serialize};
use snafu::ensure;
use std::fmt;

const GAS_CONSTANT: f64 = 287.053;
const HEAT_CAPACITY_RATIO: f64 = 1.4;
const STANDARD_GRAVITY: f64 = 9.80665;
const SEA_LEVEL_TEMPERATURE: f64 = 288.15;
const SEA_LEVEL_PRESSURE: f64 = 101_325.0;
const LAPSE_RATE: f64 = 0.0065;
const TROPOPAUSE: f64 = 11_000.0;
const TROPOPAUSE_TEMPERATURE: f64 = 216.65;
const TROPOPAUSE_PRESSURE: f64 = 22_632.06;

/// Same air at every altitude. Useful for closed form checks.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConstantAtmosphere {
    /// kg/m^3
    pub density: f64,
    /// K
    pub temperature: f64,
}

impl ConstantAtmosphere {
    /// Sea level air of the standard atmosphere
    pub fn sea_level() -> Self {
        Self {
            density: SEA_LEVEL_PRESSURE / (GAS_CONSTANT * SEA_LEVEL_TEMPERATURE),
            temperature: SEA_LEVEL_TEMPERATURE,
        }
    }
}

impl fmt::Display for ConstantAtmosphere {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "constant atmosphere (ρ = {:.4} kg/m^3, T = {:.2} K)",
            self.density, self.temperature
        )
    }
}

impl PhysicsModel for ConstantAtmosphere {
    fn evaluate(&self, _: &SegmentKind, conditions: &mut Conditions) -> Result<(), PhysicsError> {
        let fs = &mut conditions.freestream;
        fs.density.fill(self.density);
        fs.temperature.fill(self.temperature);
        fs.pressure
            .fill(self.density * GAS_CONSTANT * self.temperature);
        fs.speed_of_sound
            .fill((HEAT_CAPACITY_RATIO * GAS_CONSTANT * self.temperature).sqrt());
        update_dynamic_pressure(conditions);
        Ok(())
    }
}

/// International Standard Atmosphere, troposphere and lower stratosphere (up to 20 km).
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IsaAtmosphere {
    /// Offset added to the standard temperature (K)
    #[serde(default)]
    pub temperature_deviation: f64,
}

impl IsaAtmosphere {
    pub const MIN_ALTITUDE: f64 = -2_000.0;
    pub const MAX_ALTITUDE: f64 = 20_000.0;

    /// Returns the temperature (K), pressure (Pa) and density (kg/m^3) at `altitude` meters.
    pub fn properties(&self, altitude: f64) -> Result<(f64, f64, f64), PhysicsError> {
        ensure!(
            (Self::MIN_ALTITUDE..=Self::MAX_ALTITUDE).contains(&altitude),
            OutOfRangeSnafu {
                model: "ISA atmosphere",
                field: "altitude",
                value: altitude,
                min: Self::MIN_ALTITUDE,
                max: Self::MAX_ALTITUDE,
            }
        );

        let (std_temperature, pressure) = if altitude <= TROPOPAUSE {
            let temperature = SEA_LEVEL_TEMPERATURE - LAPSE_RATE * altitude;
            let exponent = STANDARD_GRAVITY / (LAPSE_RATE * GAS_CONSTANT);
            (
                temperature,
                SEA_LEVEL_PRESSURE * (temperature / SEA_LEVEL_TEMPERATURE).powf(exponent),
            )
        } else {
            let decay = -STANDARD_GRAVITY / (GAS_CONSTANT * TROPOPAUSE_TEMPERATURE);
            (
                TROPOPAUSE_TEMPERATURE,
                TROPOPAUSE_PRESSURE * (decay * (altitude - TROPOPAUSE)).exp(),
            )
        };
        let temperature = std_temperature + self.temperature_deviation;
        Ok((temperature, pressure, pressure / (GAS_CONSTANT * temperature)))
    }
}

impl fmt::Display for IsaAtmosphere {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ISA atmosphere (ΔT = {:+.1} K)", self.temperature_deviation)
    }
}

impl PhysicsModel for IsaAtmosphere {
    fn evaluate(&self, _: &SegmentKind, conditions: &mut Conditions) -> Result<(), PhysicsError> {
        for i in 0..conditions.rows() {
            let altitude = conditions.freestream.altitude[i];
            let (temperature, pressure, density) = self.properties(altitude)?;
            let fs = &mut conditions.freestream;
            fs.temperature[i] = temperature;
            fs.pressure[i] = pressure;
            fs.density[i] = density;
            fs.speed_of_sound[i] = (HEAT_CAPACITY_RATIO * GAS_CONSTANT * temperature).sqrt();
        }
        update_dynamic_pressure(conditions);
        Ok(())
    }
}
