use crate::routines::phases::{Phase, PhaseSpan};
use crate::simulator::model::ParameterSet;
use crate::simulator::ode_solvers::SolverOptions;
use crate::simulator::{StateVector, TimeSpan};
use anyhow::{Context, Result};
use config::Config as eConfig;
use serde_derive::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Illustrative clinical scenarios
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scenario {
    /// Base case, no virus introduced
    #[default]
    Healthy,
    /// Untreated infection of an immunocompetent subject
    Infected,
    /// Lower T-cell count, higher viral load and faster T-cell death, AIDS after about five years
    Immunocompromised,
}

impl Scenario {
    pub const ALL: [Scenario; 3] = [
        Scenario::Healthy,
        Scenario::Infected,
        Scenario::Immunocompromised,
    ];

    pub fn parameters(&self) -> ParameterSet {
        match self {
            Scenario::Healthy | Scenario::Infected => ParameterSet::default(),
            Scenario::Immunocompromised => ParameterSet {
                mu_t: 0.03,
                mu_v: 2.5,
                k1: 5e-5,
                k2: 0.005,
                ..ParameterSet::default()
            },
        }
    }

    pub fn initial(&self) -> StateVector {
        match self {
            Scenario::Healthy => StateVector::new(600.0, 0.0, 0.0, 0.0),
            Scenario::Infected => StateVector::new(600.0, 0.0, 0.0, 1e-3),
            Scenario::Immunocompromised => StateVector::new(400.0, 0.0, 0.0, 10.0),
        }
    }

    pub fn span(&self) -> TimeSpan {
        TimeSpan::new(0.0, 3650.0, 10_000)
    }

    pub fn title(&self) -> &'static str {
        match self {
            Scenario::Healthy => "HIV Infection Model for a Test Subject",
            Scenario::Infected => "HIV Infection Model with Stages",
            Scenario::Immunocompromised => "Subject 2: Immunocompromised Person",
        }
    }

    /// Hand-drawn phase shading used when presenting this scenario
    ///
    /// These are fixed display annotations, see [crate::routines::phases::detect]
    /// for boundaries derived from a simulated trajectory.
    pub fn annotations(&self) -> Vec<PhaseSpan> {
        let tf = self.span().tf;
        match self {
            Scenario::Healthy => vec![],
            Scenario::Infected => vec![
                PhaseSpan::new(Phase::Acute, 0.0, 300.0),
                PhaseSpan::new(Phase::Chronic, 300.0, 2500.0),
                PhaseSpan::new(Phase::Aids, 2500.0, tf),
            ],
            Scenario::Immunocompromised => vec![
                PhaseSpan::new(Phase::Acute, 0.0, 300.0),
                PhaseSpan::new(Phase::Chronic, 300.0, 1450.0),
                PhaseSpan::new(Phase::Aids, 1450.0, tf),
            ],
        }
    }

    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            parameters: self.parameters(),
            initial: self.initial(),
            span: self.span(),
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Scenario::Healthy => "healthy",
            Scenario::Infected => "infected",
            Scenario::Immunocompromised => "immunocompromised",
        };
        write!(f, "{}", name)
    }
}

/// Everything the integration driver needs for one run
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RunConfig {
    pub parameters: ParameterSet,
    pub initial: StateVector,
    pub span: TimeSpan,
}

/// Settings for a single simulation run
///
/// Settings are read from a TOML file, see [Settings::read]. Every section is optional:
/// values not given for `[parameters]`, `[initial]` and `[time]` are taken from the selected scenario.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub config: Config,
    pub parameters: ParameterOverrides,
    pub initial: InitialOverrides,
    pub time: TimeOverrides,
    pub solver: SolverOptions,
    pub output: Output,
    pub log: Log,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scenario: Scenario,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterOverrides {
    pub s: Option<f64>,
    pub r: Option<f64>,
    pub mu_t: Option<f64>,
    pub k1: Option<f64>,
    pub k2: Option<f64>,
    pub mu_b: Option<f64>,
    pub mu_v: Option<f64>,
    pub burst_size: Option<f64>,
    pub b: Option<f64>,
    pub t_max: Option<f64>,
}

impl ParameterOverrides {
    pub fn apply(&self, base: ParameterSet) -> ParameterSet {
        ParameterSet {
            s: self.s.unwrap_or(base.s),
            r: self.r.unwrap_or(base.r),
            mu_t: self.mu_t.unwrap_or(base.mu_t),
            k1: self.k1.unwrap_or(base.k1),
            k2: self.k2.unwrap_or(base.k2),
            mu_b: self.mu_b.unwrap_or(base.mu_b),
            mu_v: self.mu_v.unwrap_or(base.mu_v),
            burst_size: self.burst_size.unwrap_or(base.burst_size),
            b: self.b.unwrap_or(base.b),
            t_max: self.t_max.unwrap_or(base.t_max),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitialOverrides {
    pub healthy: Option<f64>,
    pub latent: Option<f64>,
    pub active: Option<f64>,
    pub virus: Option<f64>,
}

impl InitialOverrides {
    pub fn apply(&self, base: StateVector) -> StateVector {
        StateVector {
            healthy: self.healthy.unwrap_or(base.healthy),
            latent: self.latent.unwrap_or(base.latent),
            active: self.active.unwrap_or(base.active),
            virus: self.virus.unwrap_or(base.virus),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeOverrides {
    pub t0: Option<f64>,
    pub tf: Option<f64>,
    pub n: Option<usize>,
}

impl TimeOverrides {
    pub fn apply(&self, base: TimeSpan) -> TimeSpan {
        TimeSpan {
            t0: self.t0.unwrap_or(base.t0),
            tf: self.tf.unwrap_or(base.tf),
            n: self.n.unwrap_or(base.n),
        }
    }
}

/// Where the trajectory is written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Output {
    pub write: bool,
    pub path: String,
    pub file: String,
}

impl Default for Output {
    fn default() -> Self {
        Output {
            write: false,
            path: "outputs/".to_string(),
            file: "trajectory.csv".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Log {
    pub level: String,
    /// Log file, relative to the output path
    pub file: Option<String>,
}

impl Default for Log {
    fn default() -> Self {
        Log {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl Settings {
    /// Settings for one of the predefined scenarios
    pub fn from_scenario(scenario: Scenario) -> Self {
        Settings {
            config: Config { scenario },
            ..Default::default()
        }
    }

    /// Read settings from a TOML file
    ///
    /// Environment variables prefixed with `HIVSIM_` override the file, using `__` to
    /// separate nested keys, e.g. `HIVSIM_PARAMETERS__K1=5e-5`.
    pub fn read(path: &str) -> Result<Settings> {
        let parsed = eConfig::builder()
            .add_source(config::File::with_name(path).format(config::FileFormat::Toml))
            .add_source(
                config::Environment::with_prefix("HIVSIM")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .with_context(|| format!("Failed to read settings from {}", path))?;

        let settings: Settings = parsed
            .try_deserialize()
            .with_context(|| format!("Failed to parse settings in {}", path))?;
        Ok(settings)
    }

    /// Resolve the scenario preset and the overrides into a [RunConfig]
    pub fn run_config(&self) -> RunConfig {
        let scenario = self.config.scenario;
        RunConfig {
            parameters: self.parameters.apply(scenario.parameters()),
            initial: self.initial.apply(scenario.initial()),
            span: self.time.apply(scenario.span()),
        }
    }

    /// Write the settings and the resolved run configuration as JSON next to the outputs
    pub fn write(&self) -> Result<PathBuf> {
        let path = Path::new(&self.output.path).join("settings.json");
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directories for {:?}", parent))?;
        }
        let resolved = Resolved {
            settings: self,
            run: self.run_config(),
        };
        let serialized = serde_json::to_string_pretty(&resolved)?;
        std::fs::write(&path, serialized)
            .with_context(|| format!("Failed to write {:?}", path))?;
        Ok(path)
    }
}

#[derive(Serialize)]
struct Resolved<'a> {
    settings: &'a Settings,
    run: RunConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenarios_differ_where_expected() {
        let healthy = Scenario::Healthy.run_config();
        let infected = Scenario::Infected.run_config();
        assert_eq!(healthy.parameters, infected.parameters);
        assert_eq!(healthy.initial.virus, 0.0);
        assert_eq!(infected.initial.virus, 1e-3);

        let weak = Scenario::Immunocompromised.run_config();
        assert_eq!(weak.initial, StateVector::new(400.0, 0.0, 0.0, 10.0));
        assert_eq!(weak.parameters.k1, 5e-5);
        assert_eq!(weak.parameters.k2, 0.005);
        assert_eq!(weak.parameters.mu_t, 0.03);
        assert_eq!(weak.parameters.mu_v, 2.5);
        assert_eq!(weak.parameters.t_max, 1500.0);
    }

    #[test]
    fn all_scenarios_are_valid() {
        for scenario in Scenario::ALL {
            let run = scenario.run_config();
            assert!(run.parameters.validate().is_ok(), "{}", scenario);
            assert!(run.span.validate().is_ok(), "{}", scenario);
        }
    }

    #[test]
    fn annotations_cover_the_horizon() {
        for scenario in [Scenario::Infected, Scenario::Immunocompromised] {
            let spans = scenario.annotations();
            assert_eq!(spans.first().map(|s| s.start), Some(0.0));
            assert_eq!(spans.last().map(|s| s.end), Some(3650.0));
            assert!(spans.windows(2).all(|w| w[0].end == w[1].start));
        }
        assert!(Scenario::Healthy.annotations().is_empty());
    }

    #[test]
    fn overrides_replace_only_given_values() {
        let mut settings = Settings::from_scenario(Scenario::Immunocompromised);
        settings.parameters.k1 = Some(1e-4);
        settings.initial.virus = Some(0.0);
        settings.time.n = Some(100);

        let run = settings.run_config();
        assert_eq!(run.parameters.k1, 1e-4);
        assert_eq!(run.parameters.k2, 0.005);
        assert_eq!(run.initial, StateVector::new(400.0, 0.0, 0.0, 0.0));
        assert_eq!(run.span, TimeSpan::new(0.0, 3650.0, 100));
    }

    #[test]
    fn defaults() {
        let settings = Settings::default();
        assert_eq!(settings.config.scenario, Scenario::Healthy);
        assert_eq!(settings.log.level, "info");
        assert!(!settings.output.write);
        assert_eq!(settings.solver, SolverOptions::default());
    }
}
