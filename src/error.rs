use std::time::Duration;

use thiserror::Error;

/// Errors raised while building a circuit model or solving it
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PvError {
    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Time {time}s outside sampled light profile span [{start}s, {end}s]")]
    OutOfRange { time: f64, start: f64, end: f64 },

    #[error(
        "Newton iteration did not converge after {iterations} iterations \
         (residual {residual:e} A at node voltage {voltage} V)"
    )]
    Convergence {
        iterations: usize,
        residual: f64,
        voltage: f64,
    },

    #[error("Sweep exceeded its time budget of {budget:?} at sample {index}")]
    Timeout { index: usize, budget: Duration },

    #[error("Sweep cancelled before sample {index}")]
    Cancelled { index: usize },

    #[error("Sweep worker failed: {0}")]
    Worker(String),
}

impl PvError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        PvError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    /// Whether a sweep may record this error for one sample and keep going
    pub fn is_recoverable(&self) -> bool {
        matches!(self, PvError::Convergence { .. } | PvError::OutOfRange { .. })
    }
}

pub type Result<T> = std::result::Result<T, PvError>;

/// Require a finite, strictly positive value
pub(crate) fn ensure_positive(name: &'static str, value: f64) -> Result<f64> {
    if !value.is_finite() {
        return Err(PvError::invalid(name, format!("must be finite, got {value}")));
    }
    if value <= 0.0 {
        return Err(PvError::invalid(name, format!("must be > 0, got {value}")));
    }
    Ok(value)
}

/// Require a finite, non-negative value
pub(crate) fn ensure_non_negative(name: &'static str, value: f64) -> Result<f64> {
    if !value.is_finite() {
        return Err(PvError::invalid(name, format!("must be finite, got {value}")));
    }
    if value < 0.0 {
        return Err(PvError::invalid(name, format!("must be >= 0, got {value}")));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_guard() {
        assert_eq!(ensure_positive("r", 2.0), Ok(2.0));
        assert!(matches!(
            ensure_positive("r", 0.0),
            Err(PvError::InvalidParameter { name: "r", .. })
        ));
        assert!(ensure_positive("r", f64::NAN).is_err());
        assert!(ensure_positive("r", f64::INFINITY).is_err());
    }

    #[test]
    fn test_non_negative_guard() {
        assert_eq!(ensure_non_negative("rs", 0.0), Ok(0.0));
        assert!(ensure_non_negative("rs", -1e-9).is_err());
    }

    #[test]
    fn test_recoverable_errors() {
        let conv = PvError::Convergence {
            iterations: 50,
            residual: 1.0,
            voltage: 0.3,
        };
        assert!(conv.is_recoverable());
        assert!(!PvError::invalid("x", "bad").is_recoverable());
        assert!(!PvError::Cancelled { index: 0 }.is_recoverable());
        assert!(!PvError::Timeout {
            index: 3,
            budget: Duration::from_millis(5)
        }
        .is_recoverable());
    }
}
