use thiserror::Error;

use crate::auth::AuthError;
use crate::bundle::BundleError;
use crate::da::ApiError;

/// Failures that end a command with a non-zero exit code.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// A named step of a multi-step command failed.
    #[error("{step} failed: {source}")]
    Step {
        step: &'static str,
        #[source]
        source: ApiError,
    },

    #[error("Bundle error: {0}")]
    Bundle(#[from] BundleError),

    #[error("Cleanup incomplete: {}", .failed.join("; "))]
    CleanupIncomplete { failed: Vec<String> },

    #[error("Work item {work_item_id} {outcome}")]
    WorkItem {
        work_item_id: String,
        outcome: String,
    },

    #[error("HTTP client error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl DeployError {
    /// Adapter for `map_err` that tags an API failure with its step name.
    pub fn step(step: &'static str) -> impl FnOnce(ApiError) -> DeployError {
        move |source| DeployError::Step { step, source }
    }
}
