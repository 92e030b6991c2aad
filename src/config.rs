//! Gateway configuration
//!
//! Everything is read from the environment once at startup (a `.env` file is
//! honoured via dotenvy). Loading goes through a key lookup so tests never
//! touch the process environment.

use std::time::Duration;

use reqwest::Url;
use secrecy::Secret;
use thiserror::Error;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_RESULTS: u32 = 100;
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:5000,https://localhost:5000";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key}={value:?} is invalid: {reason}")]
    Invalid { key: &'static str, value: String, reason: String },

    #[error(
        "SAP_BASE_URL {0:?} is not https; set SAP_ALLOW_INSECURE_HTTP=true to permit plaintext"
    )]
    InsecureUrl(String),
}

/// How the gateway authenticates against SAP Gateway.
#[derive(Debug, Clone)]
pub enum SapAuth {
    None,
    Basic { user: String, password: Secret<String> },
}

/// OData client settings.
#[derive(Debug, Clone)]
pub struct SapConfig {
    pub base_url: Url,
    pub auth: SapAuth,
    /// Deadline for a whole search, retry included.
    pub timeout: Duration,
    /// `$top` sent with every search.
    pub max_results: u32,
    pub allow_insecure_http: bool,
}

impl SapConfig {
    /// Settings for a given base URL with defaults everywhere else.
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            auth: SapAuth::None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_results: DEFAULT_MAX_RESULTS,
            allow_insecure_http: false,
        }
    }

    /// Reject plaintext endpoints unless explicitly allowed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.base_url.scheme() {
            "https" => Ok(()),
            "http" if self.allow_insecure_http => Ok(()),
            _ => Err(ConfigError::InsecureUrl(self.base_url.to_string())),
        }
    }
}

/// RFC connection parameters. Only used by the mock connector for now.
#[derive(Debug, Clone)]
pub struct RfcConfig {
    pub ashost: String,
    pub sysnr: String,
    pub client: String,
    pub user: String,
    pub passwd: Secret<String>,
    pub lang: String,
}

impl RfcConfig {
    /// True when every logon parameter is present.
    pub fn is_complete(&self) -> bool {
        use secrecy::ExposeSecret;

        [&self.ashost, &self.sysnr, &self.client, &self.user]
            .iter()
            .all(|v| !v.is_empty())
            && !self.passwd.expose_secret().is_empty()
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
}

impl ServerConfig {
    /// Bind the listener. `host` may be an IP literal or a resolvable name.
    pub async fn bind(&self) -> std::io::Result<tokio::net::TcpListener> {
        tokio::net::TcpListener::bind((self.host.as_str(), self.port)).await
    }
}

/// Complete gateway configuration.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub sap: SapConfig,
    pub rfc: RfcConfig,
    pub server: ServerConfig,
}

impl PortalConfig {
    /// Load from the process environment, after reading `.env` if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let raw_url = get("SAP_BASE_URL").ok_or(ConfigError::Missing("SAP_BASE_URL"))?;
        let base_url = Url::parse(&raw_url).map_err(|e| ConfigError::Invalid {
            key: "SAP_BASE_URL",
            value: raw_url.clone(),
            reason: e.to_string(),
        })?;

        // SAP_USER is shared with the RFC logon, so it alone does not imply basic auth
        let user = get("SAP_USER");
        let password = get("SAP_PASSWORD");
        let auth_mode = get("SAP_AUTH_MODE").map(|m| m.to_ascii_lowercase()).unwrap_or_else(|| {
            if user.is_some() && password.is_some() { "basic" } else { "none" }.to_string()
        });
        let auth = match auth_mode.as_str() {
            "none" => SapAuth::None,
            "basic" => SapAuth::Basic {
                user: user.ok_or(ConfigError::Missing("SAP_USER"))?,
                password: Secret::new(password.ok_or(ConfigError::Missing("SAP_PASSWORD"))?),
            },
            _ => {
                return Err(ConfigError::Invalid {
                    key: "SAP_AUTH_MODE",
                    value: auth_mode,
                    reason: "expected `basic` or `none`".into(),
                })
            }
        };

        let timeout_secs = parse_positive(&get, "SAP_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        let max_results = parse_positive(&get, "SAP_MAX_RESULTS", DEFAULT_MAX_RESULTS)?;
        let allow_insecure_http = parse_flag(&get, "SAP_ALLOW_INSECURE_HTTP")?;

        let sap = SapConfig {
            base_url,
            auth,
            timeout: Duration::from_secs(timeout_secs),
            max_results,
            allow_insecure_http,
        };
        sap.validate()?;

        let rfc = RfcConfig {
            ashost: get("SAP_ASHOST").unwrap_or_default(),
            sysnr: get("SAP_SYSNR").unwrap_or_default(),
            client: get("SAP_CLIENT").unwrap_or_default(),
            user: get("SAP_USER").unwrap_or_default(),
            passwd: Secret::new(get("SAP_PASSWD").unwrap_or_default()),
            lang: get("SAP_LANG").unwrap_or_else(|| "EN".to_string()),
        };

        let server = ServerConfig {
            host: get("PORTAL_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_positive(&get, "PORTAL_PORT", DEFAULT_PORT)?,
            allowed_origins: get("ALLOWED_ORIGINS")
                .unwrap_or_else(|| DEFAULT_ALLOWED_ORIGINS.to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        };

        Ok(Self { sap, rfc, server })
    }
}

fn parse_positive<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialEq + Default,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    let Some(raw) = get(key) else {
        return Ok(default);
    };
    let value: T = raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        value: raw.clone(),
        reason: e.to_string(),
    })?;
    if value == T::default() {
        return Err(ConfigError::Invalid { key, value: raw, reason: "must be positive".into() });
    }
    Ok(value)
}

fn parse_flag<G>(get: &G, key: &'static str) -> Result<bool, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key).map(|v| v.to_ascii_lowercase()).as_deref() {
        None | Some("false" | "0" | "no") => Ok(false),
        Some("true" | "1" | "yes") => Ok(true),
        Some(other) => Err(ConfigError::Invalid {
            key,
            value: other.to_string(),
            reason: "expected a boolean".into(),
        }),
    }
}
