//! Construction of the `reqwest` clients shared by every command.
//!
//! Certificate validation stays on; only timeouts and an optional proxy come
//! from configuration.

use std::time::Duration;

use reqwest::{Client, ClientBuilder, Proxy};

use crate::config::HttpConfig;

const USER_AGENT: &str = concat!("da-deploy/", env!("CARGO_PKG_VERSION"));

fn builder(config: &HttpConfig) -> Result<ClientBuilder, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .timeout(Duration::from_secs(config.timeout_secs));

    if let Some(proxy) = config.proxy.as_deref().filter(|p| !p.is_empty()) {
        builder = builder.proxy(Proxy::all(proxy)?);
    }

    Ok(builder)
}

/// Pooled client used for the API and for the token strategies that share it.
pub fn build_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    builder(config)?.build()
}

/// Client restricted to HTTP/1.1, for the direct token exchange.
pub fn build_http1_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    builder(config)?.http1_only().build()
}
