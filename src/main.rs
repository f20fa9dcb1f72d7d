use std::sync::Arc;

use anyhow::{Context, Result};
use pv_iv_solver::{config, sweep, telemetry};
use config::Config;
use sweep::{ramp_schedule, ParameterStudy, SweepEngine, SweepSample};
use telemetry::init_tracing;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cfg = Config::load()?;
    init_tracing(cfg.logging.format);

    let model = Arc::new(cfg.build_model().context("building circuit model")?);
    let load = cfg.load_spec().context("building load")?;

    info!(
        saturation_current = model.saturation_current(),
        ideality_factor = model.ideality_factor(),
        shunt_resistance = model.shunt_resistance(),
        series_resistance = model.series_resistance(),
        temperature = model.temperature(),
        "starting IV sweep"
    );

    let samples: Arc<[SweepSample]> =
        ramp_schedule(&model, &load, cfg.sweep.duration, cfg.sweep.num_samples)
            .context("building sweep schedule")?
            .into();

    let engine = SweepEngine::new(&model, cfg.criteria(), cfg.sweep_config());
    let curve = engine.run(&samples).context("running IV sweep")?;

    match &cfg.output.csv_path {
        Some(path) => {
            curve
                .write_csv(path)
                .with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), rows = curve.len(), "wrote IV curve");
        }
        None => print!("{}", curve.to_csv()),
    }

    let summary = serde_json::to_string(&curve.summary())?;
    info!(%summary, "IV curve summary");

    if !cfg.study.series_resistances.is_empty() {
        let study = ParameterStudy::series_resistance(&model, &cfg.study.series_resistances)
            .context("building series resistance study")?;
        let cancel = CancellationToken::new();
        let run = study.run(
            Arc::clone(&samples),
            cfg.criteria(),
            cfg.sweep_config(),
            cancel.clone(),
        );
        tokio::pin!(run);
        let outcomes = tokio::select! {
            outcomes = &mut run => outcomes,
            signal = telemetry::shutdown_signal() => {
                warn!(%signal, "study interrupted, cancelling sweeps");
                cancel.cancel();
                run.await
            }
        };
        for outcome in &outcomes {
            let summary = serde_json::to_string(outcome)?;
            info!(case = %outcome.label, %summary, "study case finished");
        }
    }

    Ok(())
}
