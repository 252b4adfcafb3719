//! The three token exchanges tried by the default [`Authenticator`](super::Authenticator).
//!
//! All of them perform an OAuth client-credentials grant with a fixed scope;
//! they differ in endpoint, in where the credentials travel and in the HTTP
//! client used to reach the service.

use async_trait::async_trait;
use reqwest::{Client, Response};
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::debug;

use super::{AccessToken, Credentials, StrategyError, TokenStrategy};

const LEGACY_TOKEN_PATH: &str = "/authentication/v1/authenticate";
const TOKEN_PATH: &str = "/authentication/v2/token";
const GRANT_TYPE: &str = "client_credentials";

/// Longest body excerpt kept in an error message.
const MAX_BODY_EXCERPT: usize = 512;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

fn excerpt(body: &str) -> String {
    match body.char_indices().nth(MAX_BODY_EXCERPT) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}

/// Shared response handling: 2xx plus a non-empty `access_token`, or an error.
async fn read_token(response: Response) -> Result<AccessToken, StrategyError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(StrategyError::Status {
            status: status.as_u16(),
            body: excerpt(&body),
        });
    }

    let parsed: TokenResponse =
        serde_json::from_str(&body).map_err(|_| StrategyError::Malformed(excerpt(&body)))?;

    match parsed.access_token.filter(|t| !t.is_empty()) {
        Some(token) => {
            debug!(
                token_type = parsed.token_type.as_deref().unwrap_or("unknown"),
                expires_in = parsed.expires_in,
                "token issued"
            );
            Ok(AccessToken::new(token))
        }
        None => Err(StrategyError::MissingToken(excerpt(&body))),
    }
}

fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}{path}", base_url.trim_end_matches('/'))
}

/// `POST /authentication/v1/authenticate` with every field in the form body,
/// sent over its own HTTP/1.1-only client.
pub struct LegacyAuthenticate {
    client: Client,
    url: String,
    scope: String,
}

impl LegacyAuthenticate {
    pub fn new(client: Client, base_url: &str, scope: &str) -> Self {
        Self {
            client,
            url: endpoint(base_url, LEGACY_TOKEN_PATH),
            scope: scope.to_string(),
        }
    }
}

#[async_trait]
impl TokenStrategy for LegacyAuthenticate {
    fn name(&self) -> &'static str {
        "legacy-authenticate"
    }

    async fn exchange(&self, credentials: &Credentials) -> Result<AccessToken, StrategyError> {
        let form = [
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.expose_secret()),
            ("grant_type", GRANT_TYPE),
            ("scope", self.scope.as_str()),
        ];
        let response = self.client.post(&self.url).form(&form).send().await?;
        read_token(response).await
    }
}

/// `POST /authentication/v2/token` with the credentials in the form body.
pub struct TokenFormBody {
    client: Client,
    url: String,
    scope: String,
}

impl TokenFormBody {
    pub fn new(client: Client, base_url: &str, scope: &str) -> Self {
        Self {
            client,
            url: endpoint(base_url, TOKEN_PATH),
            scope: scope.to_string(),
        }
    }
}

#[async_trait]
impl TokenStrategy for TokenFormBody {
    fn name(&self) -> &'static str {
        "token-form-body"
    }

    async fn exchange(&self, credentials: &Credentials) -> Result<AccessToken, StrategyError> {
        let form = [
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.expose_secret()),
            ("grant_type", GRANT_TYPE),
            ("scope", self.scope.as_str()),
        ];
        let response = self.client.post(&self.url).form(&form).send().await?;
        read_token(response).await
    }
}

/// `POST /authentication/v2/token` with HTTP Basic credentials, the way the
/// vendor SDK performs the exchange.
pub struct TokenBasicAuth {
    client: Client,
    url: String,
    scope: String,
}

impl TokenBasicAuth {
    pub fn new(client: Client, base_url: &str, scope: &str) -> Self {
        Self {
            client,
            url: endpoint(base_url, TOKEN_PATH),
            scope: scope.to_string(),
        }
    }
}

#[async_trait]
impl TokenStrategy for TokenBasicAuth {
    fn name(&self) -> &'static str {
        "token-basic-auth"
    }

    async fn exchange(&self, credentials: &Credentials) -> Result<AccessToken, StrategyError> {
        let form = [("grant_type", GRANT_TYPE), ("scope", self.scope.as_str())];
        let response = self
            .client
            .post(&self.url)
            .basic_auth(
                &credentials.client_id,
                Some(credentials.client_secret.expose_secret()),
            )
            .form(&form)
            .send()
            .await?;
        read_token(response).await
    }
}
