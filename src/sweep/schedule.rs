//! Builders for the sample sequences a sweep walks through.

use serde::{Deserialize, Serialize};

use crate::error::{ensure_non_negative, ensure_positive, PvError, Result};
use crate::model::{CircuitModel, LoadSpec};
use crate::utils::{linspace, logspace};

/// One point of a sweep: when, how much light, which load
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepSample {
    pub time: f64,
    pub light_current: f64,
    pub load_resistance: f64,
}

impl SweepSample {
    pub fn new(time: f64, light_current: f64, load_resistance: f64) -> Result<Self> {
        let sample = Self {
            time,
            light_current,
            load_resistance,
        };
        sample.validate()?;
        Ok(sample)
    }

    /// Check a sample built by hand or deserialised
    pub fn validate(&self) -> Result<()> {
        if !self.time.is_finite() {
            return Err(PvError::invalid(
                "time",
                format!("must be finite, got {}", self.time),
            ));
        }
        ensure_non_negative("light_current", self.light_current)?;
        ensure_positive("load_resistance", self.load_resistance)?;
        Ok(())
    }
}

/// Ramp the wiper linearly from 0 to 1 over `duration` seconds
///
/// The light current is taken from the model at every sample time. A
/// constant load ignores the wiper and stays fixed.
pub fn ramp_schedule(
    model: &CircuitModel,
    load: &LoadSpec,
    duration: f64,
    num_samples: usize,
) -> Result<Vec<SweepSample>> {
    ensure_positive("sweep_duration", duration)?;
    linspace(0.0, duration, num_samples)?
        .into_iter()
        .map(|t| {
            let position = (t / duration).clamp(0.0, 1.0);
            SweepSample::new(t, model.light_current(t)?, load.resistance(position)?)
        })
        .collect()
}

/// Explicit load resistance per sample time, light current from the model
pub fn resistance_schedule(
    model: &CircuitModel,
    times: &[f64],
    resistances: &[f64],
) -> Result<Vec<SweepSample>> {
    if times.len() != resistances.len() {
        return Err(PvError::invalid(
            "load_resistances",
            format!(
                "length {} does not match times length {}",
                resistances.len(),
                times.len()
            ),
        ));
    }
    times
        .iter()
        .zip(resistances)
        .map(|(&t, &r)| SweepSample::new(t, model.light_current(t)?, r))
        .collect()
}

/// Log-spaced loads from `r_min` to `r_max` at a fixed light current
///
/// Sample times are the sweep indices.
pub fn log_spaced_loads(
    light_current: f64,
    r_min: f64,
    r_max: f64,
    num_samples: usize,
) -> Result<Vec<SweepSample>> {
    logspace(r_min, r_max, num_samples)?
        .into_iter()
        .enumerate()
        .map(|(i, r)| SweepSample::new(i as f64, light_current, r))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::VariableResistor;

    fn model() -> CircuitModel {
        CircuitModel::builder()
            .light_samples(vec![0.0, 10.0], vec![1.0, 3.0])
            .build()
            .unwrap()
    }

    #[test]
    fn test_ramp_schedule_follows_wiper_and_light() {
        let load = LoadSpec::from(VariableResistor::new(1e-3, 100.0).unwrap());
        let samples = ramp_schedule(&model(), &load, 10.0, 11).unwrap();
        assert_eq!(samples.len(), 11);
        assert_eq!(samples[0].load_resistance, 1e-3);
        assert!((samples[5].load_resistance - 50.001).abs() < 1e-9);
        assert!((samples[10].load_resistance - 100.001).abs() < 1e-9);
        assert!((samples[5].light_current - 2.0).abs() < 1e-12);
        assert_eq!(samples[10].time, 10.0);
    }

    #[test]
    fn test_ramp_schedule_outside_light_span_fails() {
        let load = LoadSpec::constant(1.0).unwrap();
        let err = ramp_schedule(&model(), &load, 20.0, 5).unwrap_err();
        assert!(matches!(err, PvError::OutOfRange { .. }));
    }

    #[test]
    fn test_resistance_schedule_length_mismatch() {
        assert!(resistance_schedule(&model(), &[0.0, 1.0], &[1.0]).is_err());
        let s = resistance_schedule(&model(), &[0.0, 5.0], &[1.0, 2.0]).unwrap();
        assert_eq!(s[1].light_current, 2.0);
    }

    #[test]
    fn test_sample_validation() {
        assert!(SweepSample::new(0.0, 3.0, 1.0).is_ok());
        assert!(SweepSample::new(f64::NAN, 3.0, 1.0).is_err());
        assert!(SweepSample::new(0.0, -0.1, 1.0).is_err());
        let by_hand = SweepSample {
            time: 2.0,
            light_current: 3.0,
            load_resistance: 0.0,
        };
        assert!(matches!(
            by_hand.validate(),
            Err(PvError::InvalidParameter {
                name: "load_resistance",
                ..
            })
        ));
    }

    #[test]
    fn test_log_spaced_loads() {
        let s = log_spaced_loads(3.0, 0.01, 1e4, 100).unwrap();
        assert_eq!(s.len(), 100);
        assert_eq!(s[0].load_resistance, 0.01);
        assert_eq!(s[99].load_resistance, 1e4);
        assert!(s.windows(2).all(|w| w[1].load_resistance > w[0].load_resistance));
        assert_eq!(s[42].time, 42.0);
    }
}
