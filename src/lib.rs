//! Within-host HIV dynamics
//!
//! A four-compartment model of healthy, latently infected and actively infected
//! T-cells and free virus, integrated with an adaptive Dormand-Prince solver.
//!
//! ```no_run
//! use hivsim::prelude::*;
//!
//! let run = Scenario::Infected.run_config();
//! let trajectory = simulate(&run.parameters, &run.initial, &run.span)?;
//! println!("T(tf) = {}", trajectory.last().healthy);
//! # Ok::<(), hivsim::error::SimulationError>(())
//! ```

pub mod entrypoints;
pub mod error;
pub mod logger;
pub mod routines {
    pub mod output;
    pub mod phases;
    pub mod settings;
}
pub mod simulator;

pub mod prelude {
    pub use crate::entrypoints;
    pub use crate::error::SimulationError;
    pub use crate::routines::output::{write_trajectory, write_trajectory_file};
    pub use crate::routines::phases::{self, Phase, PhaseBoundaries, PhaseCriteria, PhaseSpan};
    pub use crate::routines::settings::{RunConfig, Scenario, Settings};
    pub use crate::simulator::model::{HivModel, ParameterSet};
    pub use crate::simulator::ode_solvers::{
        simulate, simulate_with, Method, Simulator, SolverOptions,
    };
    pub use crate::simulator::{Compartment, StateVector, TimeGrid, TimeSpan, Trajectory};
}

//Tests
mod tests;
