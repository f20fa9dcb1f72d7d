//! Logging setup and shutdown handling for the `pv-iv` binary.

use serde::Deserialize;
use strum::{Display, EnumString};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when `RUST_LOG` is unset; per-solve Newton logs stay quiet
pub const DEFAULT_FILTER: &str = "info,pv_iv_solver::solver=warn";

/// Log line format on stderr
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

/// Signal that ended the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Shutdown {
    Interrupt,
    Terminate,
}

pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber; stdout is left free for CSV output
pub fn init_tracing(format: LogFormat) {
    let json = (format == LogFormat::Json)
        .then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr));
    let pretty = (format == LogFormat::Pretty)
        .then(|| tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(env_filter())
        .with(json)
        .with(pretty)
        .init();
}

pub async fn shutdown_signal() -> Shutdown {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let received = tokio::select! {
        _ = ctrl_c => Shutdown::Interrupt,
        _ = terminate => Shutdown::Terminate,
    };
    info!(signal = %received, "shutdown signal received");
    received
}
