use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;
use validator::Validate;

use crate::model::{CircuitModel, LoadSpec, OutOfRangePolicy, VariableResistor};
use crate::solver::ConvergenceCriteria;
use crate::sweep::{FailurePolicy, SweepConfig};
use crate::telemetry::LogFormat;

/// Config file used when `PV_CONFIG` is not set
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Config {
    #[validate(nested)]
    pub model: ModelConfig,
    #[validate(nested)]
    pub load: LoadConfig,
    #[validate(nested)]
    pub sweep: SweepSection,
    #[serde(default)]
    #[validate(nested)]
    pub solver: SolverConfig,
    #[serde(default)]
    pub study: StudyConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ModelConfig {
    #[validate(range(exclusive_min = 0.0))]
    pub saturation_current: f64,
    #[validate(range(exclusive_min = 0.0))]
    pub ideality_factor: f64,
    #[validate(range(exclusive_min = 0.0))]
    pub shunt_resistance: f64,
    #[validate(range(min = 0.0))]
    pub series_resistance: f64,
    #[serde(default = "default_temperature")]
    #[validate(range(exclusive_min = 0.0))]
    pub temperature: f64,
    #[validate(length(min = 1))]
    pub light_times: Vec<f64>,
    #[validate(length(min = 1))]
    pub light_currents: Vec<f64>,
    #[serde(default)]
    pub out_of_range: OutOfRangePolicy,
}

/// Variable resistor load; setting `resistance` pins it to a constant
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoadConfig {
    #[validate(range(exclusive_min = 0.0))]
    pub resistance: Option<f64>,
    #[serde(default = "default_r_const")]
    #[validate(range(min = 0.0))]
    pub r_const: f64,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub r_ref: f64,
    #[serde(default)]
    pub alpha: f64,
    #[serde(default = "default_reference_temperature")]
    #[validate(range(exclusive_min = 0.0))]
    pub t_ref: f64,
    #[serde(default = "default_reference_temperature")]
    #[validate(range(exclusive_min = 0.0))]
    pub temperature: f64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SweepSection {
    #[validate(range(exclusive_min = 0.0))]
    pub duration: f64,
    #[validate(range(min = 2))]
    pub num_samples: usize,
    #[serde(default = "default_true")]
    pub warm_start: bool,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    #[validate(range(min = 1))]
    pub time_budget_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct SolverConfig {
    #[validate(range(exclusive_min = 0.0))]
    pub abs_tol: f64,
    #[validate(range(exclusive_min = 0.0))]
    pub rel_tol: f64,
    #[validate(range(min = 1))]
    pub max_iterations: usize,
    pub max_step_halvings: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        let c = ConvergenceCriteria::default();
        Self {
            abs_tol: c.abs_tol,
            rel_tol: c.rel_tol,
            max_iterations: c.max_iterations,
            max_step_halvings: c.max_step_halvings,
        }
    }
}

/// Optional series-resistance study run after the main sweep
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudyConfig {
    #[serde(default)]
    pub series_resistances: Vec<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    /// CSV destination; stdout when unset
    pub csv_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
}

fn default_temperature() -> f64 {
    CircuitModel::DEFAULT_TEMPERATURE
}

fn default_r_const() -> f64 {
    crate::model::load::DEFAULT_R_CONST
}

fn default_reference_temperature() -> f64 {
    crate::model::load::DEFAULT_REFERENCE_TEMPERATURE
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load `PV_CONFIG` (or `config/default.toml`) overlaid with `PV__*` env vars
    pub fn load() -> Result<Self> {
        let path = std::env::var("PV_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let figment = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("PV__").split("__"));
        let cfg: Config = figment
            .extract()
            .with_context(|| format!("reading configuration from {path}"))?;
        cfg.validate().context("validating configuration")?;
        Ok(cfg)
    }

    pub fn build_model(&self) -> Result<CircuitModel> {
        let m = &self.model;
        let model = CircuitModel::builder()
            .saturation_current(m.saturation_current)
            .ideality_factor(m.ideality_factor)
            .shunt_resistance(m.shunt_resistance)
            .series_resistance(m.series_resistance)
            .temperature(m.temperature)
            .light_samples(m.light_times.clone(), m.light_currents.clone())
            .out_of_range(m.out_of_range)
            .build()?;
        Ok(model)
    }

    pub fn load_spec(&self) -> Result<LoadSpec> {
        let l = &self.load;
        let spec = match l.resistance {
            Some(r) => LoadSpec::constant(r)?,
            None => VariableResistor::new(l.r_const, l.r_ref)?
                .with_temperature_coefficient(l.alpha, l.t_ref, l.temperature)?
                .into(),
        };
        Ok(spec)
    }

    pub fn criteria(&self) -> ConvergenceCriteria {
        ConvergenceCriteria {
            abs_tol: self.solver.abs_tol,
            rel_tol: self.solver.rel_tol,
            max_iterations: self.solver.max_iterations,
            max_step_halvings: self.solver.max_step_halvings,
        }
    }

    pub fn sweep_config(&self) -> SweepConfig {
        SweepConfig {
            warm_start: self.sweep.warm_start,
            failure_policy: self.sweep.failure_policy,
            time_budget: self.sweep.time_budget_ms.map(Duration::from_millis),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    const SAMPLE: &str = r#"
        [model]
        saturation_current = 1e-6
        ideality_factor = 1.0
        shunt_resistance = 1e5
        series_resistance = 1e-2
        light_times = [0.0, 10.0]
        light_currents = [3.0, 3.0]

        [load]
        r_ref = 100.0

        [sweep]
        duration = 10.0
        num_samples = 50
        failure_policy = "continue"
    "#;

    #[test]
    fn test_load_with_env_override() {
        Jail::expect_with(|jail| {
            jail.create_file("pv.toml", SAMPLE)?;
            jail.set_env("PV_CONFIG", "pv.toml");
            jail.set_env("PV__SWEEP__NUM_SAMPLES", "20");

            let cfg = Config::load().map_err(|e| e.to_string())?;
            assert_eq!(cfg.sweep.num_samples, 20);
            assert_eq!(cfg.sweep.failure_policy, FailurePolicy::Continue);
            assert_eq!(cfg.model.temperature, 300.0);
            assert_eq!(cfg.load.r_const, 1e-3);
            assert_eq!(cfg.criteria(), ConvergenceCriteria::default());
            assert!(cfg.sweep_config().warm_start);
            assert_eq!(cfg.logging.format, LogFormat::Json);

            let model = cfg.build_model().map_err(|e| e.to_string())?;
            assert_eq!(model.light_current(5.0).map_err(|e| e.to_string())?, 3.0);
            let load = cfg.load_spec().map_err(|e| e.to_string())?;
            assert!((load.resistance(1.0).map_err(|e| e.to_string())? - 100.001).abs() < 1e-9);
            Ok(())
        });
    }

    #[test]
    fn test_rejects_invalid_values() {
        Jail::expect_with(|jail| {
            jail.create_file("pv.toml", SAMPLE)?;
            jail.set_env("PV_CONFIG", "pv.toml");
            jail.set_env("PV__MODEL__SHUNT_RESISTANCE", "-1");
            assert!(Config::load().is_err());
            Ok(())
        });
    }

    #[test]
    fn test_constant_load_override() {
        Jail::expect_with(|jail| {
            jail.create_file("pv.toml", SAMPLE)?;
            jail.set_env("PV_CONFIG", "pv.toml");
            jail.set_env("PV__LOAD__RESISTANCE", "4.7");
            jail.set_env("PV__LOGGING__FORMAT", "pretty");
            let cfg = Config::load().map_err(|e| e.to_string())?;
            let load = cfg.load_spec().map_err(|e| e.to_string())?;
            assert_eq!(load, LoadSpec::Constant { resistance: 4.7 });
            assert_eq!(cfg.logging.format, LogFormat::Pretty);
            Ok(())
        });
    }
}
