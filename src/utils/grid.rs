//! Sample grids for sweeps.

use crate::error::{ensure_positive, PvError, Result};

/// `n` evenly spaced points from `start` to `end` inclusive
pub fn linspace(start: f64, end: f64, n: usize) -> Result<Vec<f64>> {
    if n < 2 {
        return Err(PvError::invalid(
            "num_samples",
            format!("at least 2 points required, got {n}"),
        ));
    }
    if !start.is_finite() || !end.is_finite() {
        return Err(PvError::invalid("grid_bounds", "must be finite"));
    }
    let step = (end - start) / (n - 1) as f64;
    Ok((0..n)
        .map(|i| if i == n - 1 { end } else { start + step * i as f64 })
        .collect())
}

/// `n` logarithmically spaced points from `start` to `end` inclusive
pub fn logspace(start: f64, end: f64, n: usize) -> Result<Vec<f64>> {
    ensure_positive("grid_start", start)?;
    ensure_positive("grid_end", end)?;
    Ok(linspace(start.ln(), end.ln(), n)?
        .into_iter()
        .enumerate()
        .map(|(i, x)| match i {
            0 => start,
            _ if i == n - 1 => end,
            _ => x.exp(),
        })
        .collect())
}
