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

extern crate aeromission;
extern crate clap;
extern crate log;
extern crate pretty_env_logger;

use aeromission::io::Configurable;
use aeromission::mission::Mission;
use aeromission::MissionError;
use clap::{crate_version, Arg, Command};
use log::info;
use std::env::{set_var, var};
use std::path::PathBuf;

const LOG_VAR: &str = "AEROMISSION_LOG";

fn main() -> Result<(), MissionError> {
    let matches = Command::new("aeromission")
        .version(crate_version!())
        .about("Solves the flight segments of a mission and reports its performance.")
        .arg(
            Arg::new("MISSION")
                .help("Mission file (YAML)")
                .required(true)
                .index(1)
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("csv")
                .short('o')
                .long("csv")
                .value_name("FILE")
                .help("Writes every control point of every segment to this CSV file")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .get_matches();

    if var(LOG_VAR).is_err() {
        set_var(LOG_VAR, "INFO");
    }

    if pretty_env_logger::try_init_custom_env(LOG_VAR).is_err() {
        println!("could not init logger");
    }

    let Some(path) = matches.get_one::<PathBuf>("MISSION") else {
        return Err(MissionError::InvalidConfiguration {
            msg: "no mission file provided".to_string(),
        });
    };
    let mut mission = Mission::from_yaml(path)?;
    info!("Loaded mission `{}` from {}", mission.name, path.display());

    let results = mission.evaluate()?;
    println!("{}: {results}", results.name);
    for segment in results.iter() {
        println!("  {segment}");
    }
    if let Some(final_state) = results.final_conditions() {
        println!(
            "final altitude {:.1} m, final mass {:.3} kg",
            final_state.final_altitude(),
            final_state.final_mass()
        );
    }

    if let Some(csv_path) = matches.get_one::<PathBuf>("csv") {
        results.to_csv(csv_path)?;
    }
    Ok(())
}
