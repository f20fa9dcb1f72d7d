//! # Parameter studies
//!
//! Independent sweeps over variants of one base model, e.g. the same
//! load schedule for a range of series resistances. Sweeps share nothing
//! mutable: every case owns its model and solver, the base model is only
//! read through an `Arc`. Cases run on tokio's blocking pool and are
//! reported in the order they were defined.

use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{IvCurve, SweepConfig, SweepEngine, SweepSample};
use crate::error::{PvError, Result};
use crate::model::CircuitModel;
use crate::solver::ConvergenceCriteria;

/// One variant of the base model
#[derive(Debug, Clone)]
pub struct StudyCase {
    pub label: String,
    /// Value of the varied parameter
    pub value: f64,
    pub model: Arc<CircuitModel>,
}

/// Result of one case; a failing case does not affect the others
#[derive(Debug, Clone, Serialize)]
pub struct StudyOutcome {
    pub label: String,
    pub value: f64,
    #[serde(serialize_with = "serialize_outcome")]
    pub curve: Result<IvCurve>,
}

fn serialize_outcome<S: serde::Serializer>(
    curve: &Result<IvCurve>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match curve {
        Ok(curve) => curve.summary().serialize(serializer),
        Err(err) => serializer.serialize_str(&err.to_string()),
    }
}

/// Set of independent sweeps sharing one schedule
#[derive(Debug, Clone, Default)]
pub struct ParameterStudy {
    cases: Vec<StudyCase>,
}

impl ParameterStudy {
    pub fn new() -> Self {
        Self::default()
    }

    /// One case per series resistance value
    ///
    /// Fails before anything runs if any value is invalid.
    pub fn series_resistance(base: &CircuitModel, values: &[f64]) -> Result<Self> {
        let cases = values
            .iter()
            .map(|&r| {
                Ok(StudyCase {
                    label: format!("series_resistance={r}"),
                    value: r,
                    model: Arc::new(base.with_series_resistance(r)?),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { cases })
    }

    pub fn push(&mut self, case: StudyCase) {
        self.cases.push(case);
    }

    pub fn cases(&self) -> &[StudyCase] {
        &self.cases
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Run every case concurrently on the blocking thread pool
    ///
    /// Cancelling `cancel` makes every running sweep stop before its next
    /// sample; those cases report [`PvError::Cancelled`].
    pub async fn run(
        &self,
        samples: Arc<[SweepSample]>,
        criteria: ConvergenceCriteria,
        config: SweepConfig,
        cancel: CancellationToken,
    ) -> Vec<StudyOutcome> {
        info!(cases = self.cases.len(), samples = samples.len(), "starting parameter study");

        let handles = self.cases.iter().map(|case| {
            let model = Arc::clone(&case.model);
            let samples = Arc::clone(&samples);
            let cancel = cancel.clone();
            tokio::task::spawn_blocking(move || {
                SweepEngine::new(&model, criteria, config)
                    .with_cancellation(cancel)
                    .run(&samples)
            })
        });
        let results = join_all(handles).await;

        self.cases
            .iter()
            .zip(results)
            .map(|(case, joined)| {
                let curve = joined.unwrap_or_else(|join_err| {
                    Err(PvError::Worker(format!("{}: {join_err}", case.label)))
                });
                if let Err(err) = &curve {
                    warn!(case = %case.label, error = %err, "study case failed");
                }
                StudyOutcome {
                    label: case.label.clone(),
                    value: case.value,
                    curve,
                }
            })
            .collect()
    }
}
