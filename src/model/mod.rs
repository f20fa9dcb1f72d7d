//! # Single-diode circuit model
//!
//! A photovoltaic cell or module represented as an ideal light-generated
//! current source in parallel with a diode and a shunt resistor, feeding
//! the terminals through a series resistor.
//!
//! ```text
//!        node v      R_series      (+)
//!    ┌─────┬─────┬──/\/\/\──────────┐
//!    │     │     │                  │
//!   I_L    D   R_shunt            R_load
//!    ↑     ▼     │                  │
//!    └─────┴─────┴──────────────────┘
//!                                  (−)
//! ```
//!
//! The model is immutable once built. Share it across sweeps with `Arc`.

pub mod light;
pub mod load;

pub use light::{LightProfile, OutOfRangePolicy};
pub use load::{LoadSpec, VariableResistor};

use serde::Serialize;

use crate::error::{ensure_non_negative, ensure_positive, Result};
use crate::solver::DiodeEquation;

/// Boltzmann constant (J/K)
pub const BOLTZMANN: f64 = 1.380649e-23;

/// Elementary charge (C)
pub const ELEMENTARY_CHARGE: f64 = 1.602176634e-19;

/// Thermal voltage k·T/q at temperature `temperature_k`
pub fn thermal_voltage(temperature_k: f64) -> f64 {
    BOLTZMANN * temperature_k / ELEMENTARY_CHARGE
}

/// Single-diode model parameters plus the light current profile
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CircuitModel {
    saturation_current: f64,
    ideality_factor: f64,
    shunt_resistance: f64,
    series_resistance: f64,
    temperature: f64,
    thermal_voltage: f64,
    light: LightProfile,
}

impl CircuitModel {
    /// Operating temperature used when none is given (K)
    pub const DEFAULT_TEMPERATURE: f64 = 300.0;

    pub fn builder() -> ModelBuilder {
        ModelBuilder::default()
    }

    pub fn saturation_current(&self) -> f64 {
        self.saturation_current
    }

    pub fn ideality_factor(&self) -> f64 {
        self.ideality_factor
    }

    pub fn shunt_resistance(&self) -> f64 {
        self.shunt_resistance
    }

    pub fn series_resistance(&self) -> f64 {
        self.series_resistance
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// k·T/q at the model temperature, computed once at construction
    pub fn thermal_voltage(&self) -> f64 {
        self.thermal_voltage
    }

    pub fn light_profile(&self) -> &LightProfile {
        &self.light
    }

    /// Light-generated current at time `t` (A)
    pub fn light_current(&self, t: f64) -> Result<f64> {
        self.light.current_at(t)
    }

    /// Diode law evaluated with this model's parameters
    pub fn diode(&self) -> DiodeEquation {
        DiodeEquation::new(
            self.saturation_current,
            self.ideality_factor,
            self.thermal_voltage,
        )
    }

    /// Copy of this model with a different series resistance
    pub fn with_series_resistance(&self, series_resistance: f64) -> Result<Self> {
        ensure_non_negative("series_resistance", series_resistance)?;
        Ok(Self {
            series_resistance,
            ..self.clone()
        })
    }
}

/// Build a model from raw sample arrays
///
/// Fails without constructing anything if a parameter is out of range or
/// the sample arrays differ in length.
pub fn build_model(
    saturation_current: f64,
    ideality_factor: f64,
    shunt_resistance: f64,
    series_resistance: f64,
    light_current_samples: Vec<f64>,
    time_samples: Vec<f64>,
    temperature: f64,
) -> Result<CircuitModel> {
    CircuitModel::builder()
        .saturation_current(saturation_current)
        .ideality_factor(ideality_factor)
        .shunt_resistance(shunt_resistance)
        .series_resistance(series_resistance)
        .temperature(temperature)
        .light_samples(time_samples, light_current_samples)
        .build()
}

/// Fluent constructor for [`CircuitModel`]
#[derive(Debug, Clone)]
pub struct ModelBuilder {
    saturation_current: f64,
    ideality_factor: f64,
    shunt_resistance: f64,
    series_resistance: f64,
    temperature: f64,
    times: Vec<f64>,
    currents: Vec<f64>,
    policy: OutOfRangePolicy,
}

impl Default for ModelBuilder {
    fn default() -> Self {
        Self {
            saturation_current: 1e-6,
            ideality_factor: 1.0,
            shunt_resistance: 1e5,
            series_resistance: 1e-2,
            temperature: CircuitModel::DEFAULT_TEMPERATURE,
            times: vec![0.0],
            currents: vec![0.0],
            policy: OutOfRangePolicy::Clamp,
        }
    }
}

impl ModelBuilder {
    pub fn saturation_current(mut self, amps: f64) -> Self {
        self.saturation_current = amps;
        self
    }

    pub fn ideality_factor(mut self, n: f64) -> Self {
        self.ideality_factor = n;
        self
    }

    pub fn shunt_resistance(mut self, ohms: f64) -> Self {
        self.shunt_resistance = ohms;
        self
    }

    pub fn series_resistance(mut self, ohms: f64) -> Self {
        self.series_resistance = ohms;
        self
    }

    pub fn temperature(mut self, kelvin: f64) -> Self {
        self.temperature = kelvin;
        self
    }

    /// Constant light current for all times
    pub fn constant_light(mut self, amps: f64) -> Self {
        self.times = vec![0.0];
        self.currents = vec![amps];
        self.policy = OutOfRangePolicy::Clamp;
        self
    }

    /// Sampled light current; defaults to failing outside the sampled span
    pub fn light_samples(mut self, times: Vec<f64>, currents: Vec<f64>) -> Self {
        self.times = times;
        self.currents = currents;
        self.policy = OutOfRangePolicy::Error;
        self
    }

    pub fn out_of_range(mut self, policy: OutOfRangePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn build(self) -> Result<CircuitModel> {
        ensure_positive("saturation_current", self.saturation_current)?;
        ensure_positive("ideality_factor", self.ideality_factor)?;
        ensure_positive("shunt_resistance", self.shunt_resistance)?;
        ensure_non_negative("series_resistance", self.series_resistance)?;
        ensure_positive("temperature", self.temperature)?;
        let light = LightProfile::new(self.times, self.currents, self.policy)?;

        Ok(CircuitModel {
            saturation_current: self.saturation_current,
            ideality_factor: self.ideality_factor,
            shunt_resistance: self.shunt_resistance,
            series_resistance: self.series_resistance,
            temperature: self.temperature,
            thermal_voltage: thermal_voltage(self.temperature),
            light,
        })
    }
}
