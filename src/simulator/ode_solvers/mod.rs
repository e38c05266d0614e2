use std::cell::Cell;

use ode_solvers::dop_shared::{OutputType, Stats};
use ode_solvers::{Dop853, Dopri5};
use serde_derive::{Deserialize, Serialize};

use crate::error::{Result, SimulationError};
use crate::simulator::model::{HivModel, ParameterSet};
use crate::simulator::{StateVector, TimeGrid, TimeSpan, Trajectory, T, V};

// Defaults of the reference RK45 integrator
const RTOL: f64 = 1e-3;
const ATOL: f64 = 1e-6;
const MAX_STEPS: u32 = 100_000;

// Step size controller, as recommended by Hairer & Wanner
const SAFETY_FACTOR: f64 = 0.9;
const FAC_MIN: f64 = 0.2;
const FAC_MAX: f64 = 10.0;
const BETA_DOPRI5: f64 = 0.04;
const BETA_DOP853: f64 = 0.0;

/// Embedded Runge-Kutta pair used for the integration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// Dormand-Prince 5(4), the RK45 family
    #[default]
    Dopri5,
    /// Dormand-Prince 8(5,3)
    Dop853,
}

/// Tolerances and limits handed to the solver
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverOptions {
    pub method: Method,
    pub rtol: f64,
    pub atol: f64,
    /// Ceiling on the number of internal steps
    pub max_steps: u32,
    /// Test for stiffness every `n` accepted steps and fail when it is detected.
    /// `None` never tests.
    pub stiffness_check: Option<u32>,
}

impl Default for SolverOptions {
    fn default() -> Self {
        SolverOptions {
            method: Method::Dopri5,
            rtol: RTOL,
            atol: ATOL,
            max_steps: MAX_STEPS,
            stiffness_check: None,
        }
    }
}

impl SolverOptions {
    pub fn validate(&self) -> Result<()> {
        if !(self.rtol.is_finite() && self.rtol > 0.0) {
            return Err(SimulationError::config(format!(
                "rtol must be positive, got {}",
                self.rtol
            )));
        }
        if !(self.atol.is_finite() && self.atol > 0.0) {
            return Err(SimulationError::config(format!(
                "atol must be positive, got {}",
                self.atol
            )));
        }
        if self.max_steps == 0 {
            return Err(SimulationError::config("max_steps must be at least 1"));
        }
        if self.stiffness_check == Some(0) {
            return Err(SimulationError::config(
                "stiffness_check interval must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Adapter exposing [HivModel] to the solver
///
/// The first time up to `tf` at which the model returned a non-finite derivative is
/// recorded, the solver itself does not check for it. Evaluations past `tf` only
/// serve the last dense output sample and are not recorded.
struct Rhs<'a> {
    model: &'a HivModel,
    tf: T,
    non_finite: &'a Cell<Option<T>>,
}

impl ode_solvers::System<T, V> for Rhs<'_> {
    fn system(&self, t: T, y: &V, dy: &mut V) {
        let dx = self.model.derivative(t, &StateVector::from(y));
        if !dx.is_finite() && t <= self.tf && self.non_finite.get().is_none() {
            self.non_finite.set(Some(t));
        }
        *dy = dx.into();
    }
}

/// Dense output of one integration, before validation
struct RawSolution {
    outcome: std::result::Result<Stats, String>,
    x_out: Vec<T>,
    y_out: Vec<V>,
}

macro_rules! integrate_with {
    ($solver:ident, $rhs:expr, $t0:expr, $t_end:expr, $dx:expr, $y0:expr, $opts:expr, $beta:expr) => {{
        let n_stiff = $opts.stiffness_check.unwrap_or(u32::MAX);
        let mut stepper = $solver::from_param(
            $rhs,
            $t0,
            $t_end,
            $dx,
            $y0,
            $opts.rtol,
            $opts.atol,
            SAFETY_FACTOR,
            $beta,
            FAC_MIN,
            FAC_MAX,
            $t_end - $t0,
            0.0,
            $opts.max_steps,
            n_stiff,
            OutputType::Dense,
        );
        let outcome = stepper.integrate().map_err(|e| e.to_string());
        RawSolution {
            outcome,
            x_out: stepper.x_out().to_vec(),
            y_out: stepper.y_out().to_vec(),
        }
    }};
}

/// A [HivModel] bound to a set of [SolverOptions]
///
/// Each call to [Simulator::run] is an independent, blocking integration.
#[derive(Debug, Clone, Copy)]
pub struct Simulator {
    model: HivModel,
    options: SolverOptions,
}

impl Simulator {
    pub fn new(params: ParameterSet, options: SolverOptions) -> Result<Self> {
        options.validate()?;
        let model = HivModel::new(params)?;
        Ok(Simulator { model, options })
    }

    pub fn model(&self) -> &HivModel {
        &self.model
    }

    pub fn options(&self) -> &SolverOptions {
        &self.options
    }

    /// Integrate from `initial` over `span`, sampling the solution at every grid point
    pub fn run(&self, initial: &StateVector, span: &TimeSpan) -> Result<Trajectory> {
        if !initial.is_finite() {
            return Err(SimulationError::config(format!(
                "initial state must be finite, got {:?}",
                initial
            )));
        }
        let grid = TimeGrid::new(span)?;
        let n = grid.len();
        let dx = grid.step();

        tracing::info!(
            "Simulating {} samples over [{}, {}] with {:?} (rtol = {:e}, atol = {:e})",
            n,
            grid.first(),
            grid.last(),
            self.options.method,
            self.options.rtol,
            self.options.atol
        );

        // Integrating half a sample past tf keeps the last dense output point
        // from being dropped when the accumulated output time rounds above tf.
        let t_end = grid.last() + 0.5 * dx;
        let non_finite = Cell::new(None);
        let rhs = Rhs {
            model: &self.model,
            tf: grid.last(),
            non_finite: &non_finite,
        };
        let y0: V = (*initial).into();

        let raw = match self.options.method {
            Method::Dopri5 => integrate_with!(
                Dopri5,
                rhs,
                grid.first(),
                t_end,
                dx,
                y0,
                self.options,
                BETA_DOPRI5
            ),
            Method::Dop853 => integrate_with!(
                Dop853,
                rhs,
                grid.first(),
                t_end,
                dx,
                y0,
                self.options,
                BETA_DOP853
            ),
        };

        if let Some(t) = non_finite.get() {
            return Err(SimulationError::numerical(
                Some(t),
                "model derivative is not finite",
            ));
        }
        let stats = raw
            .outcome
            .map_err(|reason| SimulationError::numerical(raw.x_out.last().copied(), reason))?;
        tracing::debug!(
            "Solver finished: {} evaluations, {} accepted and {} rejected steps",
            stats.num_eval,
            stats.accepted_steps,
            stats.rejected_steps
        );

        if raw.y_out.len() != n {
            return Err(SimulationError::numerical(
                raw.x_out.last().copied(),
                format!(
                    "dense output produced {} samples, expected {}",
                    raw.y_out.len(),
                    n
                ),
            ));
        }

        // Dense output times accumulate `dx` and differ from the grid by rounding only
        let mut states: Vec<StateVector> = raw.y_out.iter().map(StateVector::from).collect();
        if let Some(i) = states.iter().position(|s| !s.is_finite()) {
            return Err(SimulationError::numerical(
                Some(grid.as_slice()[i]),
                "solution is not finite",
            ));
        }
        // The solution at t0 is the initial condition by definition
        states[0] = *initial;

        let trajectory = Trajectory::from_parts(grid, states)?;
        let min = trajectory.min_value();
        if min < 0.0 {
            tracing::warn!(
                "A compartment drifted below zero (minimum {:e}); values are not clamped",
                min
            );
        }
        Ok(trajectory)
    }
}

/// Simulate one run with the default solver options
pub fn simulate(
    params: &ParameterSet,
    initial: &StateVector,
    span: &TimeSpan,
) -> Result<Trajectory> {
    simulate_with(params, initial, span, &SolverOptions::default())
}

/// Simulate one run with explicit solver options
pub fn simulate_with(
    params: &ParameterSet,
    initial: &StateVector,
    span: &TimeSpan,
    options: &SolverOptions,
) -> Result<Trajectory> {
    Simulator::new(*params, *options)?.run(initial, span)
}
