pub mod grid;

pub use grid::{linspace, logspace};
