//! # Single-diode photovoltaic IV-curve solver
//!
//! Equivalent-circuit model of a PV cell or module (light current source,
//! diode, shunt and series resistance) driving a resistive load. Each
//! operating point is found with a damped Newton iteration on Kirchhoff's
//! current law; sweeps over load and light current produce the IV curve.
//!
//! - [`model`]: circuit parameters, light profile, load description
//! - [`solver`]: diode law and operating point iteration
//! - [`sweep`]: warm-started sweeps, IV curves and parameter studies

pub mod config;
pub mod error;
pub mod model;
pub mod solver;
pub mod sweep;
pub mod telemetry;
pub mod utils;

pub use error::{PvError, Result};
pub use model::{build_model, CircuitModel, LightProfile, LoadSpec, OutOfRangePolicy, VariableResistor};
pub use solver::{ConvergenceCriteria, DiodeEquation, OperatingPoint, OperatingPointSolver};
pub use sweep::{
    solve_iv_curve, FailurePolicy, IvCurve, ParameterStudy, SweepConfig, SweepEngine, SweepEntry,
    SweepSample,
};
