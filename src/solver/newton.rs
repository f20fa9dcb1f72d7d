//! Damped Newton–Raphson solve of the single-diode operating point.
//!
//! Kirchhoff's current law at the internal node (shared by the current
//! source, diode, shunt and the series branch) gives one nonlinear
//! equation in the node voltage v:
//!
//! f(v) = I_L − I_D(v) − v / R_shunt − v / (R_series + R_load) = 0
//!
//! f is strictly decreasing in v, so the root is unique, and for I_L >= 0
//! it lies in [0, n·Vt·ln(1 + I_L/I_s)]: at the upper end the diode alone
//! carries the whole light current. Iterates are kept inside that bracket.
//! A plain Newton step from v = 0 overshoots badly when the load is large
//! (the linear terms are tiny compared to the diode slope near the root),
//! so a step that does not reduce |f| is halved until it does.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::diode::DiodeEquation;
use crate::error::{ensure_non_negative, ensure_positive, PvError, Result};
use crate::model::CircuitModel;
use crate::sweep::SweepSample;

/// Convergence criteria for the operating point iteration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvergenceCriteria {
    /// Absolute KCL residual tolerance (A)
    pub abs_tol: f64,
    /// Relative node voltage step tolerance
    pub rel_tol: f64,
    /// Newton iterations before giving up
    pub max_iterations: usize,
    /// Step halvings allowed within one iteration
    pub max_step_halvings: usize,
}

impl Default for ConvergenceCriteria {
    fn default() -> Self {
        Self {
            abs_tol: 1e-10,
            rel_tol: 1e-9,
            max_iterations: 50,
            max_step_halvings: 60,
        }
    }
}

/// Solved state of the circuit for one light current and load
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OperatingPoint {
    /// Sample time (s)
    pub time: f64,
    /// Terminal voltage across the load (V)
    pub voltage: f64,
    /// Terminal current through the load (A)
    pub current: f64,
    /// Voltage across the diode/shunt branch (V)
    pub node_voltage: f64,
    pub load_resistance: f64,
    pub light_current: f64,
    /// KCL residual at the returned node voltage (A)
    pub residual: f64,
    pub iterations: usize,
    /// Damping halvings summed over all iterations
    pub step_halvings: usize,
}

impl OperatingPoint {
    /// Power delivered to the load (W)
    pub fn power(&self) -> f64 {
        self.voltage * self.current
    }
}

/// Newton solver bound to one circuit model
#[derive(Debug, Clone)]
pub struct OperatingPointSolver {
    diode: DiodeEquation,
    shunt_conductance: f64,
    series_resistance: f64,
    criteria: ConvergenceCriteria,
}

impl OperatingPointSolver {
    pub fn new(model: &CircuitModel, criteria: ConvergenceCriteria) -> Self {
        Self {
            diode: model.diode(),
            shunt_conductance: 1.0 / model.shunt_resistance(),
            series_resistance: model.series_resistance(),
            criteria,
        }
    }

    pub fn criteria(&self) -> &ConvergenceCriteria {
        &self.criteria
    }

    /// KCL residual f(v) at the internal node (A)
    pub fn residual(&self, v: f64, light_current: f64, load_resistance: f64) -> f64 {
        let branch_conductance = 1.0 / (self.series_resistance + load_resistance);
        light_current - self.diode.current(v) - v * self.shunt_conductance - v * branch_conductance
    }

    /// Node voltage at which the diode alone carries the light current
    ///
    /// Upper end of the root bracket; f(v) <= 0 from here on.
    pub fn node_voltage_bound(&self, light_current: f64) -> f64 {
        self.diode.nvt() * (light_current / self.diode.saturation_current()).ln_1p()
    }

    /// df/dv, always negative
    fn jacobian(&self, v: f64, branch_conductance: f64) -> f64 {
        -self.diode.derivative(v) - self.shunt_conductance - branch_conductance
    }

    /// Solve for the operating point at `time`
    ///
    /// `initial_guess` is the starting node voltage; `None` starts from the
    /// short-circuit guess v = 0.
    pub fn solve(
        &self,
        time: f64,
        light_current: f64,
        load_resistance: f64,
        initial_guess: Option<f64>,
    ) -> Result<OperatingPoint> {
        ensure_positive("load_resistance", load_resistance)?;
        ensure_non_negative("light_current", light_current)?;

        let branch_conductance = 1.0 / (self.series_resistance + load_resistance);
        let v_max = self.node_voltage_bound(light_current);
        let bracket = |v: f64| v.clamp(0.0, v_max);

        let mut v = bracket(initial_guess.filter(|g| g.is_finite()).unwrap_or(0.0));
        let mut f = self.residual(v, light_current, load_resistance);
        let mut total_halvings = 0;

        for iteration in 0..self.criteria.max_iterations {
            if f.abs() < self.criteria.abs_tol {
                return Ok(self.operating_point(
                    time,
                    light_current,
                    load_resistance,
                    (v, f),
                    iteration,
                    total_halvings,
                ));
            }

            let newton_target = v - f / self.jacobian(v, branch_conductance);
            let mut step = bracket(newton_target) - v;
            let mut v_next = v + step;
            let mut f_next = self.residual(v_next, light_current, load_resistance);
            let mut halvings = 0;
            while !(f_next.abs() < f.abs()) && halvings < self.criteria.max_step_halvings {
                step *= 0.5;
                v_next = v + step;
                f_next = self.residual(v_next, light_current, load_resistance);
                halvings += 1;
            }
            total_halvings += halvings;
            if halvings > 0 {
                trace!(iteration, halvings, v, v_next, "damped newton step");
            }
            if self.diode.is_saturated(v_next) {
                trace!(iteration, v_next, "diode exponent saturated");
            }

            v = v_next;
            f = f_next;

            let undamped = halvings == 0;
            if f.abs() < self.criteria.abs_tol
                || (undamped && step.abs() < self.criteria.rel_tol * v.abs())
            {
                let point = self.operating_point(
                    time,
                    light_current,
                    load_resistance,
                    (v, f),
                    iteration + 1,
                    total_halvings,
                );
                debug!(
                    time,
                    load_resistance,
                    node_voltage = v,
                    iterations = iteration + 1,
                    step_halvings = total_halvings,
                    "operating point converged"
                );
                return Ok(point);
            }
        }

        Err(PvError::Convergence {
            iterations: self.criteria.max_iterations,
            residual: f,
            voltage: v,
        })
    }

    /// Solve one sweep sample
    pub fn solve_at(
        &self,
        sample: &SweepSample,
        initial_guess: Option<f64>,
    ) -> Result<OperatingPoint> {
        self.solve(
            sample.time,
            sample.light_current,
            sample.load_resistance,
            initial_guess,
        )
    }

    fn operating_point(
        &self,
        time: f64,
        light_current: f64,
        load_resistance: f64,
        (node_voltage, residual): (f64, f64),
        iterations: usize,
        step_halvings: usize,
    ) -> OperatingPoint {
        let current = node_voltage / (self.series_resistance + load_resistance);
        OperatingPoint {
            time,
            voltage: current * load_resistance,
            current,
            node_voltage,
            load_resistance,
            light_current,
            residual,
            iterations,
            step_halvings,
        }
    }
}
