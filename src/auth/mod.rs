//! Client-credentials authentication.
//!
//! An [`Authenticator`] holds an ordered list of [`TokenStrategy`]s and returns
//! the token of the first one that succeeds. Later strategies are never
//! called once a token is obtained. The token is not refreshed: it is used for
//! the rest of the process regardless of its lifetime.

pub mod error;
pub mod strategies;

use std::fmt;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::SecretString;
use tracing::{error, info, warn};

pub use error::{AuthError, StrategyError, StrategyFailure};
pub use strategies::{LegacyAuthenticate, TokenBasicAuth, TokenFormBody};

use crate::config::AppConfig;

/// Application credentials, supplied once at start-up.
#[derive(Debug)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: SecretString,
}

impl Credentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: SecretString::from(client_secret.into()),
        }
    }
}

/// Bearer token returned by the token endpoint. `Debug` never prints it.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken([REDACTED])")
    }
}

/// One way of exchanging credentials for a token.
#[async_trait]
pub trait TokenStrategy: Send + Sync {
    /// Short identifier used in logs and failure reports.
    fn name(&self) -> &'static str;

    async fn exchange(&self, credentials: &Credentials) -> Result<AccessToken, StrategyError>;
}

/// Tries each strategy in order, short-circuiting on the first token.
pub struct Authenticator {
    strategies: Vec<Box<dyn TokenStrategy>>,
}

impl Authenticator {
    pub fn new(strategies: Vec<Box<dyn TokenStrategy>>) -> Self {
        Self { strategies }
    }

    /// The default chain: v1 authenticate over a dedicated HTTP/1.1 client,
    /// then the v2 token endpoint with form credentials, then with Basic auth.
    pub fn from_config(config: &AppConfig, client: &Client) -> Result<Self, reqwest::Error> {
        let direct = crate::transport::build_http1_client(&config.http)?;
        let strategies: Vec<Box<dyn TokenStrategy>> = vec![
            Box::new(LegacyAuthenticate::new(direct, &config.base_url, &config.scope)),
            Box::new(TokenFormBody::new(client.clone(), &config.base_url, &config.scope)),
            Box::new(TokenBasicAuth::new(client.clone(), &config.base_url, &config.scope)),
        ];
        Ok(Self::new(strategies))
    }

    pub async fn authenticate(&self, credentials: &Credentials) -> Result<AccessToken, AuthError> {
        if self.strategies.is_empty() {
            return Err(AuthError::NoStrategies);
        }

        let mut failures = Vec::new();
        for (index, strategy) in self.strategies.iter().enumerate() {
            info!(
                strategy = strategy.name(),
                attempt = index + 1,
                of = self.strategies.len(),
                "requesting access token"
            );
            match strategy.exchange(credentials).await {
                Ok(token) => {
                    info!(strategy = strategy.name(), "authenticated");
                    return Ok(token);
                }
                Err(err) => {
                    warn!(strategy = strategy.name(), error = %err, "token exchange failed");
                    failures.push(StrategyFailure {
                        strategy: strategy.name().to_string(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        error!("all authentication strategies failed");
        Err(AuthError::Exhausted { failures })
    }
}
