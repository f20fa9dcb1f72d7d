//! # Sweep engine
//!
//! Walks a schedule of [`SweepSample`]s in order, solving each operating
//! point with the previous solution as the starting guess, and collects
//! the results into an [`IvCurve`].
//!
//! ## Usage
//!
//! ```rust
//! use pv_iv_solver::model::CircuitModel;
//! use pv_iv_solver::sweep::solve_iv_curve;
//!
//! let model = CircuitModel::builder().constant_light(3.0).build()?;
//!
//! // Wiper ramps 0 -> 1 over 10 s, load = 1 mΩ + pos × 100 Ω
//! let curve = solve_iv_curve(&model, 10.0, 200, 100.0, 1e-3)?;
//! assert_eq!(curve.len(), 200);
//! # Ok::<(), pv_iv_solver::PvError>(())
//! ```

pub mod curve;
pub mod schedule;
pub mod study;

pub use curve::{CurveSummary, FailedSample, IvCurve, MaxPowerPoint, SweepEntry};
pub use schedule::{log_spaced_loads, ramp_schedule, resistance_schedule, SweepSample};
pub use study::{ParameterStudy, StudyCase, StudyOutcome};

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::{PvError, Result};
use crate::model::{CircuitModel, LoadSpec, VariableResistor};
use crate::solver::{ConvergenceCriteria, OperatingPointSolver};

/// What a sweep does when one sample cannot be solved
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum FailurePolicy {
    /// Stop at the first failing sample and return its error
    #[default]
    Abort,
    /// Record a failure marker for the sample and carry on
    Continue,
}

/// Sweep behaviour
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepConfig {
    /// Start each solve from the previous solution instead of v = 0
    pub warm_start: bool,
    pub failure_policy: FailurePolicy,
    /// Wall-clock budget for the whole sweep
    pub time_budget: Option<Duration>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            warm_start: true,
            failure_policy: FailurePolicy::Abort,
            time_budget: None,
        }
    }
}

/// Drives the operating point solver across a schedule
#[derive(Debug, Clone)]
pub struct SweepEngine {
    model: CircuitModel,
    solver: OperatingPointSolver,
    config: SweepConfig,
    cancel: Option<CancellationToken>,
}

impl SweepEngine {
    pub fn new(model: &CircuitModel, criteria: ConvergenceCriteria, config: SweepConfig) -> Self {
        Self {
            model: model.clone(),
            solver: OperatingPointSolver::new(model, criteria),
            config,
            cancel: None,
        }
    }

    /// Stop before the next sample once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn model(&self) -> &CircuitModel {
        &self.model
    }

    pub fn solver(&self) -> &OperatingPointSolver {
        &self.solver
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Solve every sample in order
    ///
    /// The whole schedule is validated before the first solve.
    pub fn run(&self, samples: &[SweepSample]) -> Result<IvCurve> {
        validate_schedule(samples)?;

        let started = Instant::now();
        let mut curve = IvCurve::with_capacity(samples.len());
        let mut previous: Option<f64> = None;

        info!(
            samples = samples.len(),
            warm_start = self.config.warm_start,
            policy = %self.config.failure_policy,
            "starting sweep"
        );

        for (index, sample) in samples.iter().enumerate() {
            if self.cancel.as_ref().is_some_and(|t| t.is_cancelled()) {
                warn!(index, "sweep cancelled");
                return Err(PvError::Cancelled { index });
            }
            if let Some(budget) = self.config.time_budget {
                if started.elapsed() >= budget {
                    warn!(index, ?budget, "sweep time budget exhausted");
                    return Err(PvError::Timeout { index, budget });
                }
            }

            let guess = if self.config.warm_start { previous } else { None };
            match self.solver.solve_at(sample, guess) {
                Ok(point) => {
                    previous = Some(point.node_voltage);
                    curve.push(SweepEntry::Solved(point));
                }
                Err(err)
                    if err.is_recoverable()
                        && self.config.failure_policy == FailurePolicy::Continue =>
                {
                    warn!(index, time = sample.time, error = %err, "sample failed, continuing");
                    curve.push(SweepEntry::Failed(FailedSample {
                        index,
                        time: sample.time,
                        load_resistance: sample.load_resistance,
                        light_current: sample.light_current,
                        reason: err.to_string(),
                    }));
                }
                Err(err) => {
                    warn!(index, time = sample.time, error = %err, "sweep aborted");
                    return Err(err);
                }
            }
        }

        info!(
            samples = curve.len(),
            failures = curve.failure_count(),
            elapsed_ms = started.elapsed().as_secs_f64() * 1e3,
            "sweep finished"
        );
        Ok(curve)
    }

    /// Ramp the wiper of `load` from 0 to 1 over `duration` seconds
    pub fn run_ramp(&self, load: &LoadSpec, duration: f64, num_samples: usize) -> Result<IvCurve> {
        let samples = ramp_schedule(&self.model, load, duration, num_samples)?;
        self.run(&samples)
    }
}

fn validate_schedule(samples: &[SweepSample]) -> Result<()> {
    for (index, sample) in samples.iter().enumerate() {
        sample.validate().map_err(|err| match err {
            PvError::InvalidParameter { name, reason } => PvError::InvalidParameter {
                name,
                reason: format!("sample {index}: {reason}"),
            },
            other => other,
        })?;
    }
    Ok(())
}

/// Ramp-driven load sweep with default solver settings
///
/// The load is `r_const + pos × r_ref` with the wiper moving linearly from
/// 0 to 1 over `sweep_duration` seconds; the light current follows the
/// model profile. Aborts on the first sample that does not converge.
pub fn solve_iv_curve(
    model: &CircuitModel,
    sweep_duration: f64,
    num_samples: usize,
    r_ref: f64,
    r_const: f64,
) -> Result<IvCurve> {
    let load = LoadSpec::from(VariableResistor::new(r_const, r_ref)?);
    SweepEngine::new(model, ConvergenceCriteria::default(), SweepConfig::default()).run_ramp(
        &load,
        sweep_duration,
        num_samples,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> CircuitModel {
        CircuitModel::builder()
            .saturation_current(1e-6)
            .ideality_factor(1.0)
            .shunt_resistance(1e5)
            .series_resistance(1e-2)
            .constant_light(3.0)
            .build()
            .unwrap()
    }

    #[test]
    fn test_ramp_sweep_shape() {
        let curve = solve_iv_curve(&model(), 1.0, 50, 20.0, 1e-3).unwrap();
        assert_eq!(curve.len(), 50);
        let v = curve.voltages();
        let i = curve.currents();
        assert!(v.windows(2).all(|w| w[1] >= w[0]));
        assert!(i.windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn test_abort_policy_returns_first_error() {
        let criteria = ConvergenceCriteria {
            max_iterations: 1,
            ..Default::default()
        };
        let engine = SweepEngine::new(&model(), criteria, SweepConfig::default());
        let samples = log_spaced_loads(3.0, 1.0, 1e4, 5).unwrap();
        assert!(matches!(
            engine.run(&samples),
            Err(PvError::Convergence { .. })
        ));
    }

    #[test]
    fn test_continue_policy_records_failures() {
        let criteria = ConvergenceCriteria {
            max_iterations: 1,
            ..Default::default()
        };
        let config = SweepConfig {
            warm_start: false,
            failure_policy: FailurePolicy::Continue,
            time_budget: None,
        };
        let engine = SweepEngine::new(&model(), criteria, config);
        let samples = log_spaced_loads(3.0, 1.0, 1e4, 5).unwrap();
        let curve = engine.run(&samples).unwrap();
        assert_eq!(curve.len(), 5);
        assert_eq!(curve.failure_count(), 5);
        let indices: Vec<usize> = curve.failures().map(|f| f.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_zero_time_budget_times_out() {
        let config = SweepConfig {
            time_budget: Some(Duration::ZERO),
            ..Default::default()
        };
        let engine = SweepEngine::new(&model(), ConvergenceCriteria::default(), config);
        let samples = log_spaced_loads(3.0, 0.01, 1e4, 10).unwrap();
        let result = engine.run(&samples);
        assert!(matches!(result, Err(PvError::Timeout { index: 0, .. })));
    }

    #[test]
    fn test_invalid_sample_rejected_before_solving() {
        let config = SweepConfig {
            failure_policy: FailurePolicy::Continue,
            ..Default::default()
        };
        let engine = SweepEngine::new(&model(), ConvergenceCriteria::default(), config);
        let samples = vec![
            SweepSample::new(0.0, 3.0, 1.0).unwrap(),
            SweepSample::new(1.0, 3.0, 2.0).unwrap(),
            SweepSample {
                time: 2.0,
                light_current: 3.0,
                load_resistance: 0.0,
            },
            SweepSample::new(3.0, 3.0, 4.0).unwrap(),
        ];
        let err = engine.run(&samples).unwrap_err();
        match err {
            PvError::InvalidParameter { name, reason } => {
                assert_eq!(name, "load_resistance");
                assert!(reason.starts_with("sample 2:"), "{reason}");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_cancelled_sweep_stops_before_first_sample() {
        let token = CancellationToken::new();
        token.cancel();
        let engine = SweepEngine::new(
            &model(),
            ConvergenceCriteria::default(),
            SweepConfig {
                failure_policy: FailurePolicy::Continue,
                ..Default::default()
            },
        )
        .with_cancellation(token);
        let samples = log_spaced_loads(3.0, 0.01, 1e4, 10).unwrap();
        assert_eq!(engine.run(&samples), Err(PvError::Cancelled { index: 0 }));
    }

    #[test]
    fn test_uncancelled_token_runs_to_completion() {
        let engine = SweepEngine::new(&model(), ConvergenceCriteria::default(), SweepConfig::default())
            .with_cancellation(CancellationToken::new());
        let samples = log_spaced_loads(3.0, 0.01, 1e4, 10).unwrap();
        assert_eq!(engine.run(&samples).unwrap().len(), 10);
    }

    #[test]
    fn test_run_ramp_uses_engine_model_light() {
        let dim = CircuitModel::builder()
            .light_samples(vec![0.0, 10.0], vec![1.0, 1.0])
            .build()
            .unwrap();
        let engine = SweepEngine::new(&dim, ConvergenceCriteria::default(), SweepConfig::default());
        let load = LoadSpec::constant(1e-3).unwrap();
        let curve = engine.run_ramp(&load, 10.0, 5).unwrap();
        assert!(curve.solved().all(|op| op.light_current == 1.0));
        assert!(curve.currents().iter().all(|&i| (i - 1.0).abs() < 1e-3));
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("continue".parse::<FailurePolicy>().unwrap(), FailurePolicy::Continue);
        assert_eq!(FailurePolicy::default(), FailurePolicy::Abort);
    }
}
