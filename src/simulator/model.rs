use crate::error::{Result, SimulationError};
use crate::simulator::StateVector;
use serde_derive::{Deserialize, Serialize};

/// Biological rate constants of the four-compartment model
///
/// Units follow the usual within-host convention: concentrations in mm⁻³ and time in days.
/// [ParameterSet::default] returns the baseline (immunocompetent) values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    /// Supply rate of T-cells from the thymus (day⁻¹ mm⁻³)
    pub s: f64,
    /// Logistic growth rate of T-cells (day⁻¹)
    pub r: f64,
    /// Death rate of uninfected T-cells (day⁻¹)
    pub mu_t: f64,
    /// Infection rate (mm³ day⁻¹)
    pub k1: f64,
    /// Rate of transition from latent to active infection (day⁻¹)
    pub k2: f64,
    /// Death rate of actively infected T-cells (day⁻¹)
    pub mu_b: f64,
    /// Viral clearance rate (day⁻¹)
    pub mu_v: f64,
    /// Burst size, virions produced per infected cell
    pub burst_size: f64,
    /// Saturation scale of the burst term (mm⁻³)
    pub b: f64,
    /// Carrying capacity of the T-cell population (mm⁻³)
    pub t_max: f64,
}

impl Default for ParameterSet {
    fn default() -> Self {
        ParameterSet {
            s: 10.0,
            r: 0.03,
            mu_t: 0.02,
            k1: 2.4e-5,
            k2: 0.003,
            mu_b: 0.24,
            mu_v: 2.4,
            burst_size: 100.0,
            b: 316.0,
            t_max: 1500.0,
        }
    }
}

impl ParameterSet {
    fn named(&self) -> [(&'static str, f64); 10] {
        [
            ("s", self.s),
            ("r", self.r),
            ("mu_t", self.mu_t),
            ("k1", self.k1),
            ("k2", self.k2),
            ("mu_b", self.mu_b),
            ("mu_v", self.mu_v),
            ("burst_size", self.burst_size),
            ("b", self.b),
            ("t_max", self.t_max),
        ]
    }

    /// Check that every constant is finite and non-negative, `t_max` is positive and `b` is non-zero
    pub fn validate(&self) -> Result<()> {
        for (name, value) in self.named() {
            if !value.is_finite() {
                return Err(SimulationError::config(format!(
                    "parameter {} must be finite, got {}",
                    name, value
                )));
            }
            if value < 0.0 {
                return Err(SimulationError::config(format!(
                    "parameter {} must be non-negative, got {}",
                    name, value
                )));
            }
        }
        if self.t_max <= 0.0 {
            return Err(SimulationError::config(format!(
                "carrying capacity t_max must be positive, got {}",
                self.t_max
            )));
        }
        // b² + t is the burst denominator, which vanishes at t = 0 when b = 0
        if self.b == 0.0 {
            return Err(SimulationError::config(
                "saturation scale b must be non-zero",
            ));
        }
        Ok(())
    }
}

/// Right-hand side of the within-host HIV system, bound to one [ParameterSet]
///
/// ```text
/// burst(t) = N·μb·t² / (b² + t)
/// dT/dt    = s + r·T·(1 − (T + T1 + T2)/Tmax) − μT·T − k1·V·T
/// dT1/dt   = k1·V·T − μT·T1 − k2·T1
/// dT2/dt   = k2·T1 − μb·T2
/// dV/dt    = burst(t)·T2 − k1·V·T − μv·V
/// ```
///
/// The model holds no mutable state, so the solver may evaluate it any number
/// of times per step and the same value can be shared between threads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HivModel {
    params: ParameterSet,
}

impl HivModel {
    pub fn new(params: ParameterSet) -> Result<Self> {
        params.validate()?;
        Ok(HivModel { params })
    }

    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    /// Per-cell viral production rate of actively infected cells at time `t`
    #[inline]
    pub fn burst(&self, t: f64) -> f64 {
        let p = &self.params;
        p.burst_size * p.mu_b * t * t / (p.b * p.b + t)
    }

    /// Time derivative of `x` at time `t`
    #[inline]
    pub fn derivative(&self, t: f64, x: &StateVector) -> StateVector {
        let p = &self.params;
        let StateVector {
            healthy,
            latent,
            active,
            virus,
        } = *x;

        let infection = p.k1 * virus * healthy;
        let crowding = 1.0 - (healthy + latent + active) / p.t_max;

        StateVector {
            healthy: p.s + p.r * healthy * crowding - p.mu_t * healthy - infection,
            latent: infection - p.mu_t * latent - p.k2 * latent,
            active: p.k2 * latent - p.mu_b * active,
            virus: self.burst(t) * active - infection - p.mu_v * virus,
        }
    }
}
