//! Shockley diode law and its derivative.

/// Largest exponent evaluated exactly; beyond it exp() is continued linearly
pub const MAX_EXPONENT: f64 = 80.0;

/// Shockley diode equation for fixed model parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiodeEquation {
    saturation_current: f64,
    /// n · Vt (V)
    nvt: f64,
}

impl DiodeEquation {
    pub fn new(saturation_current: f64, ideality_factor: f64, thermal_voltage: f64) -> Self {
        Self {
            saturation_current,
            nvt: ideality_factor * thermal_voltage,
        }
    }

    pub fn saturation_current(&self) -> f64 {
        self.saturation_current
    }

    /// Emission-scaled thermal voltage n·Vt (V)
    pub fn nvt(&self) -> f64 {
        self.nvt
    }

    /// Whether `v` drives the exponent past [`MAX_EXPONENT`]
    pub fn is_saturated(&self, v: f64) -> bool {
        v / self.nvt > MAX_EXPONENT
    }

    /// Diode current I_s·(exp(v/(n·Vt)) − 1) (A)
    pub fn current(&self, v: f64) -> f64 {
        let x = v / self.nvt;
        if x > MAX_EXPONENT {
            self.saturation_current * (MAX_EXPONENT.exp() * (1.0 + x - MAX_EXPONENT) - 1.0)
        } else {
            // exp_m1 keeps precision for |v| ≪ n·Vt
            self.saturation_current * x.exp_m1()
        }
    }

    /// dI/dv = I_s·exp(v/(n·Vt))/(n·Vt) (S)
    pub fn derivative(&self, v: f64) -> f64 {
        let x = (v / self.nvt).min(MAX_EXPONENT);
        self.saturation_current * x.exp() / self.nvt
    }

    /// Current and derivative in one pass
    pub fn evaluate(&self, v: f64) -> (f64, f64) {
        (self.current(v), self.derivative(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::thermal_voltage;

    fn diode() -> DiodeEquation {
        DiodeEquation::new(1e-6, 1.0, thermal_voltage(300.0))
    }

    #[test]
    fn test_zero_bias() {
        let d = diode();
        assert_eq!(d.current(0.0), 0.0);
        assert!((d.derivative(0.0) - 1e-6 / d.nvt()).abs() < 1e-15);
    }

    #[test]
    fn test_forward_bias() {
        let d = diode();
        let (i, g) = d.evaluate(0.4);
        let expected = 1e-6 * ((0.4 / d.nvt()).exp() - 1.0);
        assert!((i - expected).abs() / expected < 1e-12);
        assert!(g > 0.0);
    }

    #[test]
    fn test_reverse_bias_approaches_minus_is() {
        let d = diode();
        let i = d.current(-1.0);
        assert!(i < 0.0);
        assert!((i + 1e-6).abs() < 1e-12);
    }

    #[test]
    fn test_derivative_matches_finite_difference() {
        let d = diode();
        for v in [-0.2, 0.0, 0.1, 0.3, 0.45] {
            let h = 1e-7;
            let fd = (d.current(v + h) - d.current(v - h)) / (2.0 * h);
            let g = d.derivative(v);
            assert!((fd - g).abs() / g < 1e-5, "v={v}: fd={fd} g={g}");
        }
    }

    #[test]
    fn test_exponent_cap_stays_finite_and_monotonic() {
        let d = diode();
        let v_cap = MAX_EXPONENT * d.nvt();
        assert!(!d.is_saturated(v_cap * 0.99));
        assert!(d.is_saturated(v_cap * 1.01));

        let below = d.current(v_cap);
        let above = d.current(v_cap * 10.0);
        let far = d.current(1e6);
        assert!(above.is_finite() && far.is_finite());
        assert!(below < above && above < far);
        // Continuous at the cap
        assert!((d.current(v_cap + 1e-12) - below).abs() / below < 1e-6);
    }
}
