//! Inicialização do `tracing`.
//!
//! Logs vão para stderr; stdout fica reservado para a saída dos comandos
//! (JSON do work item, inventário). `RUST_LOG` tem precedência sobre
//! `--verbose`.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn default_directive(verbose: bool) -> &'static str {
    if verbose { "da_deploy=debug" } else { "da_deploy=info" }
}

/// Installs the global subscriber. A second call is a no-op.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init();
}
