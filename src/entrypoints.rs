use crate::logger;
use crate::routines::output::write_trajectory_file;
use crate::routines::phases::{self, PhaseCriteria};
use crate::routines::settings::Settings;
use crate::simulator::ode_solvers::simulate_with;
use crate::simulator::Trajectory;

use anyhow::{Context, Result};
use std::time::Instant;

/// Primary entrypoint for hivsim
///
/// Sets up logging, runs the simulation described by `settings` and, if `output.write`
/// is set, writes the trajectory and the resolved settings to the output folder.
/// See [Settings::read] for the configuration file format.
pub fn run(settings: Settings) -> Result<Trajectory> {
    let now = Instant::now();
    logger::setup_log(&settings)?;
    tracing::info!("Starting hivsim with the {} scenario", settings.config.scenario);

    let trajectory = simulate(&settings)?;

    let boundaries = phases::detect(&trajectory, &PhaseCriteria::default());
    match boundaries.acute_end {
        Some(t) => tracing::info!("Viral load peaks at day {:.1}", t),
        None => tracing::info!("No viral peak within the simulated horizon"),
    }
    if let Some(t) = boundaries.aids_onset {
        tracing::info!("Healthy T-cells fall below the AIDS threshold at day {:.1}", t);
    }

    if settings.output.write {
        write_trajectory_file(&trajectory, &settings.output.path, &settings.output.file)?;
        settings.write()?;
    }

    tracing::info!("Total time: {:.2?}", now.elapsed());
    Ok(trajectory)
}

/// Run the simulation described by `settings` without touching logging or the filesystem
pub fn simulate(settings: &Settings) -> Result<Trajectory> {
    let run = settings.run_config();
    let trajectory = simulate_with(&run.parameters, &run.initial, &run.span, &settings.solver)
        .with_context(|| format!("Simulation of the {} scenario failed", settings.config.scenario))?;
    Ok(trajectory)
}
