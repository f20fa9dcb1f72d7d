//! # Light-generated current profile
//!
//! Sampled `(time, current)` pairs with piecewise-linear interpolation in
//! between. Queries outside the sampled span either fail or clamp to the
//! nearest endpoint, depending on [`OutOfRangePolicy`].

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::{ensure_non_negative, PvError, Result};

/// What to do when the light current is requested outside the sampled span
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum OutOfRangePolicy {
    /// Fail with [`PvError::OutOfRange`]
    #[default]
    Error,
    /// Hold the first/last sample value
    Clamp,
}

/// Light-generated current as a function of time
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LightProfile {
    times: Vec<f64>,
    currents: Vec<f64>,
    policy: OutOfRangePolicy,
}

impl LightProfile {
    /// Build a profile from parallel sample arrays
    ///
    /// Times must be finite and strictly increasing, currents finite and >= 0.
    pub fn new(times: Vec<f64>, currents: Vec<f64>, policy: OutOfRangePolicy) -> Result<Self> {
        if times.len() != currents.len() {
            return Err(PvError::invalid(
                "light_current_samples",
                format!(
                    "length {} does not match time_samples length {}",
                    currents.len(),
                    times.len()
                ),
            ));
        }
        if times.is_empty() {
            return Err(PvError::invalid(
                "time_samples",
                "at least one sample is required",
            ));
        }
        if let Some(t) = times.iter().find(|t| !t.is_finite()) {
            return Err(PvError::invalid(
                "time_samples",
                format!("must be finite, got {t}"),
            ));
        }
        if let Some((a, b)) = times.iter().tuple_windows().find(|(a, b)| b <= a) {
            return Err(PvError::invalid(
                "time_samples",
                format!("must be strictly increasing, found {a} followed by {b}"),
            ));
        }
        for &i in &currents {
            ensure_non_negative("light_current_samples", i)?;
        }

        Ok(Self {
            times,
            currents,
            policy,
        })
    }

    /// Constant light current valid for every time
    pub fn constant(current: f64) -> Result<Self> {
        Self::new(vec![0.0], vec![current], OutOfRangePolicy::Clamp)
    }

    pub fn with_policy(mut self, policy: OutOfRangePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> OutOfRangePolicy {
        self.policy
    }

    /// First and last sample time
    pub fn span(&self) -> (f64, f64) {
        // new() guarantees at least one sample
        (self.times[0], self.times[self.times.len() - 1])
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn samples(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.times.iter().copied().zip(self.currents.iter().copied())
    }

    /// Interpolated light current at time `t`
    pub fn current_at(&self, t: f64) -> Result<f64> {
        let (start, end) = self.span();
        let last = self.currents.len() - 1;

        if t.is_nan() {
            return Err(PvError::OutOfRange { time: t, start, end });
        }
        if t < start || t > end {
            return match self.policy {
                OutOfRangePolicy::Clamp if t < start => Ok(self.currents[0]),
                OutOfRangePolicy::Clamp => Ok(self.currents[last]),
                OutOfRangePolicy::Error => Err(PvError::OutOfRange { time: t, start, end }),
            };
        }

        // Index of the first sample strictly after t
        let upper = self.times.partition_point(|&s| s <= t);
        if upper == 0 {
            return Ok(self.currents[0]);
        }
        if upper > last {
            return Ok(self.currents[last]);
        }

        let (t0, t1) = (self.times[upper - 1], self.times[upper]);
        let (i0, i1) = (self.currents[upper - 1], self.currents[upper]);
        let frac = (t - t0) / (t1 - t0);
        Ok(i0 + frac * (i1 - i0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> LightProfile {
        LightProfile::new(vec![0.0, 1.0, 3.0], vec![0.0, 2.0, 4.0], OutOfRangePolicy::Error)
            .unwrap()
    }

    #[test]
    fn test_interpolation_between_samples() {
        let p = ramp();
        assert_eq!(p.current_at(0.0).unwrap(), 0.0);
        assert!((p.current_at(0.5).unwrap() - 1.0).abs() < 1e-12);
        assert!((p.current_at(2.0).unwrap() - 3.0).abs() < 1e-12);
        assert_eq!(p.current_at(3.0).unwrap(), 4.0);
        assert_eq!(p.current_at(1.0).unwrap(), 2.0);
    }

    #[test]
    fn test_out_of_range_error() {
        let p = ramp();
        assert_eq!(
            p.current_at(3.5),
            Err(PvError::OutOfRange {
                time: 3.5,
                start: 0.0,
                end: 3.0
            })
        );
        assert!(p.current_at(-0.1).is_err());
        assert!(p.current_at(f64::NAN).is_err());
    }

    #[test]
    fn test_out_of_range_clamp() {
        let p = ramp().with_policy(OutOfRangePolicy::Clamp);
        assert_eq!(p.current_at(-10.0).unwrap(), 0.0);
        assert_eq!(p.current_at(10.0).unwrap(), 4.0);
        assert_eq!(p.current_at(f64::INFINITY).unwrap(), 4.0);
        assert!(p.current_at(f64::NAN).is_err());
    }

    #[test]
    fn test_constant_profile() {
        let p = LightProfile::constant(3.0).unwrap();
        assert_eq!(p.current_at(0.0).unwrap(), 3.0);
        assert_eq!(p.current_at(1e6).unwrap(), 3.0);
    }

    #[test]
    fn test_rejects_bad_samples() {
        assert!(LightProfile::new(vec![0.0, 1.0], vec![1.0], OutOfRangePolicy::Error).is_err());
        assert!(LightProfile::new(vec![], vec![], OutOfRangePolicy::Error).is_err());
        assert!(
            LightProfile::new(vec![0.0, 0.0], vec![1.0, 1.0], OutOfRangePolicy::Error).is_err()
        );
        assert!(
            LightProfile::new(vec![0.0, 1.0], vec![1.0, -1.0], OutOfRangePolicy::Error).is_err()
        );
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("clamp".parse::<OutOfRangePolicy>().unwrap(), OutOfRangePolicy::Clamp);
        assert_eq!("Error".parse::<OutOfRangePolicy>().unwrap(), OutOfRangePolicy::Error);
        assert_eq!(OutOfRangePolicy::Clamp.to_string(), "clamp");
    }
}
