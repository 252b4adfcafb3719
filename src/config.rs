//! Configuração do da-deploy carregada a partir de `da-deploy.toml`.
//!
//! A struct [`AppConfig`] contém todos os parâmetros configuráveis.
//! Valores não presentes no arquivo usam defaults sensíveis.
//! As variáveis de ambiente `APS_CLIENT_ID`, `APS_CLIENT_SECRET` e `DA_PROXY`
//! têm precedência sobre o arquivo.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};

use crate::auth::Credentials;
use crate::error::DeployError;
use crate::state_machine::PollConfig;

/// Arquivo lido quando `--config` não é informado.
pub const DEFAULT_CONFIG_FILE: &str = "da-deploy.toml";

const CLIENT_ID_ENV: &str = "APS_CLIENT_ID";
const CLIENT_SECRET_ENV: &str = "APS_CLIENT_SECRET";
const PROXY_ENV: &str = "DA_PROXY";

/// Configuração de nível superior carregada de `da-deploy.toml`.
#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Client id da aplicação. Sem default: arquivo ou ambiente.
    #[serde(default)]
    pub client_id: Option<String>,

    /// Client secret da aplicação. Nunca aparece em `Debug`.
    #[serde(default, deserialize_with = "deserialize_secret")]
    pub client_secret: Option<SecretString>,

    /// Host da API (autenticação e Design Automation).
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Região do Design Automation (`/da/{region}/v3`).
    #[serde(default = "default_region")]
    pub region: String,

    /// Apelido do dono, usado para qualificar a referência ao bundle.
    #[serde(default = "default_nickname")]
    pub nickname: String,

    /// Engine em que o bundle e a activity rodam.
    #[serde(default = "default_engine")]
    pub engine: String,

    /// Escopo solicitado na troca de credenciais.
    #[serde(default = "default_scope")]
    pub scope: String,

    #[serde(default)]
    pub app_bundle: AppBundleConfig,

    #[serde(default)]
    pub activity: ActivityConfig,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub polling: PollingConfig,
}

/// Seção `[app_bundle]`: nomes e arquivos do pacote enviado.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppBundleConfig {
    pub name: String,
    pub alias: String,
    pub description: String,
    /// Binário empacotado no bundle.
    pub binary_path: PathBuf,
    /// Manifesto (`PackageContents.xml`) empacotado junto ao binário.
    pub manifest_path: PathBuf,
}

impl Default for AppBundleConfig {
    fn default() -> Self {
        Self {
            name: "RFAConversionApp".to_string(),
            alias: "prod".to_string(),
            description: "RFA to RVT conversion tool".to_string(),
            binary_path: PathBuf::from("./RFAConversion/bin/Release/net48/RFAConversion.dll"),
            manifest_path: PathBuf::from("./PackageContents.xml"),
        }
    }
}

/// Seção `[activity]`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ActivityConfig {
    pub name: String,
    pub alias: String,
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            name: "RFAConversionActivity".to_string(),
            alias: "prod".to_string(),
        }
    }
}

/// Seção `[http]`: timeouts e proxy opcional.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub proxy: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            connect_timeout_secs: 10,
            proxy: None,
        }
    }
}

/// Seção `[polling]`: cadência fixa e limite de consultas de status.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub interval_secs: u64,
    pub max_attempts: u32,
}

impl Default for PollingConfig {
    fn default() -> Self {
        let defaults = PollConfig::default();
        Self {
            interval_secs: defaults.interval.as_secs(),
            max_attempts: defaults.max_attempts,
        }
    }
}

fn default_base_url() -> String {
    "https://developer.api.autodesk.com".to_string()
}

fn default_region() -> String {
    "us-east".to_string()
}

fn default_nickname() -> String {
    "3DImgClass".to_string()
}

fn default_engine() -> String {
    "Autodesk.Revit+2025".to_string()
}

fn default_scope() -> String {
    "code:all".to_string()
}

fn deserialize_secret<'de, D>(deserializer: D) -> std::result::Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.is_empty()).map(SecretString::from))
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            base_url: default_base_url(),
            region: default_region(),
            nickname: default_nickname(),
            engine: default_engine(),
            scope: default_scope(),
            app_bundle: AppBundleConfig::default(),
            activity: ActivityConfig::default(),
            http: HttpConfig::default(),
            polling: PollingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Carrega a configuração do caminho informado ou de `da-deploy.toml`.
    ///
    /// Um caminho explícito inexistente é erro; o arquivo padrão ausente
    /// significa usar os valores padrão.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::from_file(default)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config = toml::from_str::<AppConfig>(&contents)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        Ok(config)
    }

    /// Variáveis de ambiente não vazias sobrescrevem o arquivo.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(id) = non_empty(CLIENT_ID_ENV) {
            self.client_id = Some(id);
        }
        if let Some(secret) = non_empty(CLIENT_SECRET_ENV) {
            self.client_secret = Some(SecretString::from(secret));
        }
        if let Some(proxy) = non_empty(PROXY_ENV) {
            self.http.proxy = Some(proxy);
        }
    }

    /// Credenciais para a autenticação; erro de configuração se faltarem.
    pub fn credentials(&self) -> std::result::Result<Credentials, DeployError> {
        let client_id = self
            .client_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                DeployError::Config(format!(
                    "missing client_id (set it in {DEFAULT_CONFIG_FILE} or {CLIENT_ID_ENV})"
                ))
            })?;
        let secret = self.client_secret.as_ref().ok_or_else(|| {
            DeployError::Config(format!(
                "missing client_secret (set it in {DEFAULT_CONFIG_FILE} or {CLIENT_SECRET_ENV})"
            ))
        })?;

        Ok(Credentials::new(client_id, secret.expose_secret()))
    }

    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            interval: Duration::from_secs(self.polling.interval_secs),
            max_attempts: self.polling.max_attempts,
        }
    }
}
