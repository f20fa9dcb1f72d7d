//! Nonlinear circuit solve: diode law plus the operating point iteration.

pub mod diode;
pub mod newton;

pub use diode::{DiodeEquation, MAX_EXPONENT};
pub use newton::{ConvergenceCriteria, OperatingPoint, OperatingPointSolver};
