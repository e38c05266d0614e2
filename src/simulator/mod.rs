pub mod model;
pub mod ode_solvers;

use crate::error::{Result, SimulationError};
use serde_derive::{Deserialize, Serialize};
use std::fmt;

pub type T = f64;
/// Fixed-size state vector handed to the solver, ordered (T, T1, T2, V)
pub type V = ::ode_solvers::SVector<T, 4>;

/// Number of tracked compartments
pub const NSTATES: usize = 4;

/// One of the four tracked populations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Compartment {
    Healthy,
    Latent,
    Active,
    Virus,
}

impl Compartment {
    pub const ALL: [Compartment; NSTATES] = [
        Compartment::Healthy,
        Compartment::Latent,
        Compartment::Active,
        Compartment::Virus,
    ];

    /// Position of the compartment in the state vector
    pub fn index(&self) -> usize {
        match self {
            Compartment::Healthy => 0,
            Compartment::Latent => 1,
            Compartment::Active => 2,
            Compartment::Virus => 3,
        }
    }

    /// Short column name, used as CSV header
    pub fn name(&self) -> &'static str {
        match self {
            Compartment::Healthy => "T",
            Compartment::Latent => "T1",
            Compartment::Active => "T2",
            Compartment::Virus => "V",
        }
    }

    /// Display label for plots
    pub fn label(&self) -> &'static str {
        match self {
            Compartment::Healthy => "Healthy T-cells",
            Compartment::Latent => "Latently Infected T-cells",
            Compartment::Active => "Actively Infected T-cells",
            Compartment::Virus => "Virus",
        }
    }
}

impl fmt::Display for Compartment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Concentrations of the four compartments at one instant
///
/// Values are not clamped: a compartment that drifts below zero keeps its negative value.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StateVector {
    /// Healthy T-cells (T)
    pub healthy: f64,
    /// Latently infected T-cells (T1)
    pub latent: f64,
    /// Actively infected T-cells (T2)
    pub active: f64,
    /// Free virus (V)
    pub virus: f64,
}

impl StateVector {
    pub const fn new(healthy: f64, latent: f64, active: f64, virus: f64) -> Self {
        StateVector {
            healthy,
            latent,
            active,
            virus,
        }
    }

    pub fn get(&self, compartment: Compartment) -> f64 {
        match compartment {
            Compartment::Healthy => self.healthy,
            Compartment::Latent => self.latent,
            Compartment::Active => self.active,
            Compartment::Virus => self.virus,
        }
    }

    pub fn to_array(&self) -> [f64; NSTATES] {
        [self.healthy, self.latent, self.active, self.virus]
    }

    /// T + T1 + T2, the population competing for the carrying capacity
    pub fn total_t_cells(&self) -> f64 {
        self.healthy + self.latent + self.active
    }

    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|x| x.is_finite())
    }

    pub fn min_value(&self) -> f64 {
        self.to_array().into_iter().fold(f64::INFINITY, f64::min)
    }
}

impl From<[f64; NSTATES]> for StateVector {
    fn from(x: [f64; NSTATES]) -> Self {
        StateVector::new(x[0], x[1], x[2], x[3])
    }
}

impl From<&V> for StateVector {
    fn from(y: &V) -> Self {
        StateVector::new(y[0], y[1], y[2], y[3])
    }
}

impl From<StateVector> for V {
    fn from(x: StateVector) -> Self {
        V::new(x.healthy, x.latent, x.active, x.virus)
    }
}

/// Requested simulation horizon and output sampling density
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSpan {
    pub t0: f64,
    pub tf: f64,
    pub n: usize,
}

impl TimeSpan {
    pub fn new(t0: f64, tf: f64, n: usize) -> Self {
        TimeSpan { t0, tf, n }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.t0.is_finite() || !self.tf.is_finite() {
            return Err(SimulationError::config(format!(
                "time span must be finite, got [{}, {}]",
                self.t0, self.tf
            )));
        }
        if self.t0 < 0.0 {
            return Err(SimulationError::config(format!(
                "t0 must be non-negative, got {}",
                self.t0
            )));
        }
        if self.tf <= self.t0 {
            return Err(SimulationError::config(format!(
                "tf ({}) must be greater than t0 ({})",
                self.tf, self.t0
            )));
        }
        if self.n < 2 {
            return Err(SimulationError::config(format!(
                "at least 2 sample points are required, got {}",
                self.n
            )));
        }
        Ok(())
    }

    /// Spacing between consecutive samples
    pub fn step(&self) -> f64 {
        (self.tf - self.t0) / (self.n - 1) as f64
    }
}

impl Default for TimeSpan {
    fn default() -> Self {
        TimeSpan::new(0.0, 3650.0, 10_000)
    }
}

/// Evenly spaced, strictly increasing sample times over `[t0, tf]`
#[derive(Debug, Clone, PartialEq)]
pub struct TimeGrid {
    points: Vec<f64>,
}

impl TimeGrid {
    pub fn new(span: &TimeSpan) -> Result<Self> {
        span.validate()?;
        let step = span.step();
        let mut points: Vec<f64> = (0..span.n)
            .map(|i| span.t0 + i as f64 * step)
            .collect();
        // Pin the right endpoint so rounding in the last product cannot move it
        points[span.n - 1] = span.tf;

        if points.windows(2).any(|w| w[1] <= w[0]) {
            return Err(SimulationError::config(format!(
                "{} samples over [{}, {}] are too dense to be strictly increasing",
                span.n, span.t0, span.tf
            )));
        }
        Ok(TimeGrid { points })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> f64 {
        self.points[0]
    }

    pub fn last(&self) -> f64 {
        self.points[self.points.len() - 1]
    }

    pub fn step(&self) -> f64 {
        (self.last() - self.first()) / (self.len() - 1) as f64
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.points
    }

    pub fn iter(&self) -> impl Iterator<Item = &f64> {
        self.points.iter()
    }
}

/// The time series produced by one simulation run
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    times: TimeGrid,
    states: Vec<StateVector>,
}

impl Trajectory {
    pub fn from_parts(times: TimeGrid, states: Vec<StateVector>) -> Result<Self> {
        if times.len() != states.len() {
            return Err(SimulationError::config(format!(
                "trajectory has {} times but {} states",
                times.len(),
                states.len()
            )));
        }
        Ok(Trajectory { times, states })
    }

    pub fn times(&self) -> &[f64] {
        self.times.as_slice()
    }

    pub fn grid(&self) -> &TimeGrid {
        &self.times
    }

    pub fn states(&self) -> &[StateVector] {
        &self.states
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn initial(&self) -> &StateVector {
        &self.states[0]
    }

    pub fn last(&self) -> &StateVector {
        &self.states[self.states.len() - 1]
    }

    /// Values of a single compartment, one per sample time
    pub fn series(&self, compartment: Compartment) -> Vec<f64> {
        self.states.iter().map(|s| s.get(compartment)).collect()
    }

    pub fn total_t_cells(&self) -> Vec<f64> {
        self.states.iter().map(|s| s.total_t_cells()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, &StateVector)> {
        self.times.iter().copied().zip(self.states.iter())
    }

    /// Smallest value reached by any compartment over the run
    pub fn min_value(&self) -> f64 {
        self.states
            .iter()
            .map(|s| s.min_value())
            .fold(f64::INFINITY, f64::min)
    }
}
