use thiserror::Error;

/// Why a single token strategy did not produce a token.
#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("token endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to parse token response: {0}")]
    Malformed(String),

    #[error("no access_token in response: {0}")]
    MissingToken(String),
}

/// One strategy's failure, kept for the final report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyFailure {
    pub strategy: String,
    pub reason: String,
}

/// Authentication could not produce a token. Fatal for every command.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("all authentication strategies failed: {}", summarize(.failures))]
    Exhausted { failures: Vec<StrategyFailure> },

    #[error("no authentication strategies configured")]
    NoStrategies,
}

fn summarize(failures: &[StrategyFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{}: {}", f.strategy, f.reason))
        .collect::<Vec<_>>()
        .join("; ")
}
