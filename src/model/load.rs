//! # External load
//!
//! The load across the module terminals is either a fixed resistor or a
//! wiper-driven variable resistor:
//!
//! R(pos, T) = (R_const + pos × R_ref) × (1 + α × (T − T_ref))
//!
//! With α = 0 the resistor is temperature independent. The resolved
//! resistance must stay finite and strictly positive, otherwise the
//! series branch of the circuit would be singular.

use serde::{Deserialize, Serialize};

use crate::error::{ensure_non_negative, ensure_positive, PvError, Result};

/// Reference temperature for the resistance coefficient (K)
pub const DEFAULT_REFERENCE_TEMPERATURE: f64 = 300.15;

/// Default fixed part of a variable resistor (Ω)
pub const DEFAULT_R_CONST: f64 = 1e-3;

/// Wiper-driven variable resistor with optional linear temperature dependence
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VariableResistor {
    /// Fixed resistance at wiper position 0 (Ω)
    pub r_const: f64,
    /// Resistance added at wiper position 1 (Ω)
    pub r_ref: f64,
    /// Linear temperature coefficient (1/K)
    pub alpha: f64,
    /// Temperature at which `alpha` is referenced (K)
    pub t_ref: f64,
    /// Resistor temperature, held fixed (K)
    pub temperature: f64,
}

impl VariableResistor {
    /// Temperature independent variable resistor
    pub fn new(r_const: f64, r_ref: f64) -> Result<Self> {
        let resistor = Self {
            r_const,
            r_ref,
            alpha: 0.0,
            t_ref: DEFAULT_REFERENCE_TEMPERATURE,
            temperature: DEFAULT_REFERENCE_TEMPERATURE,
        };
        resistor.validate()?;
        Ok(resistor)
    }

    /// Enable the linear temperature dependence
    pub fn with_temperature_coefficient(
        mut self,
        alpha: f64,
        t_ref: f64,
        temperature: f64,
    ) -> Result<Self> {
        self.alpha = alpha;
        self.t_ref = t_ref;
        self.temperature = temperature;
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        ensure_non_negative("r_const", self.r_const)?;
        ensure_non_negative("r_ref", self.r_ref)?;
        ensure_positive("t_ref", self.t_ref)?;
        ensure_positive("load_temperature", self.temperature)?;
        if !self.alpha.is_finite() {
            return Err(PvError::invalid("alpha", "must be finite"));
        }
        // Both wiper end stops must resolve to a usable resistance
        self.resistance(0.0)?;
        self.resistance(1.0)?;
        Ok(())
    }

    /// Multiplier applied by the temperature coefficient
    pub fn temperature_factor(&self) -> f64 {
        1.0 + self.alpha * (self.temperature - self.t_ref)
    }

    /// Resistance at wiper position `position` in [0, 1]
    pub fn resistance(&self, position: f64) -> Result<f64> {
        if !(0.0..=1.0).contains(&position) {
            return Err(PvError::invalid(
                "wiper_position",
                format!("must be within [0, 1], got {position}"),
            ));
        }
        let r = (self.r_const + position * self.r_ref) * self.temperature_factor();
        ensure_positive("load_resistance", r)
    }
}

/// Load connected across the module terminals
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LoadSpec {
    Constant { resistance: f64 },
    Variable(VariableResistor),
}

impl LoadSpec {
    pub fn constant(resistance: f64) -> Result<Self> {
        ensure_positive("load_resistance", resistance)?;
        Ok(LoadSpec::Constant { resistance })
    }

    /// Resolve the load resistance for a wiper position
    ///
    /// The position is ignored for a constant load.
    pub fn resistance(&self, position: f64) -> Result<f64> {
        match self {
            LoadSpec::Constant { resistance } => ensure_positive("load_resistance", *resistance),
            LoadSpec::Variable(resistor) => resistor.resistance(position),
        }
    }
}

impl From<VariableResistor> for LoadSpec {
    fn from(resistor: VariableResistor) -> Self {
        LoadSpec::Variable(resistor)
    }
}
