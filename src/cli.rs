//! Interface de linha de comando baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (setup, execute, list,
//! cleanup) e flags globais (--config, --verbose).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Provisiona e executa o fluxo de conversão RFA → RVT no Design Automation.
#[derive(Debug, Parser)]
#[command(name = "da-deploy", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Caminho do arquivo de configuração TOML (padrão: ./da-deploy.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Recria o app bundle e a activity (apaga os existentes antes).
    Setup,

    /// Submete um work item e acompanha até o fim.
    Execute {
        /// URL de leitura do ZIP com as famílias RFA.
        input_url: String,

        /// URL de escrita para o RVT resultante.
        output_url: String,
    },

    /// Lista app bundles e activities visíveis.
    List,

    /// Apaga aliases, activity e app bundle.
    Cleanup,
}
