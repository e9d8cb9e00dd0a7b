//! Configuration loading.
//!
//! Settings come from an optional TOML file, then `CONFLUENCE_*`
//! environment variables override individual keys. Secrets are usually
//! supplied only through the environment (or a `.env` file loaded by the
//! binary). Everything is validated once, up front; the rest of the crate
//! receives an already-valid [`Config`].
//!
//! ```toml
//! [confluence]
//! hosting = "cloud"
//! base_url = "https://example.atlassian.net/wiki"
//! timeout_ms = 15000
//! search_max_limit = 50
//! default_cql = "space = OPS"
//! body_max_chars = 20000
//!
//! [auth]
//! email = "me@example.com"
//! # api_token / personal_access_token from the environment
//!
//! [server]
//! bind = "127.0.0.1:7341"
//!
//! [log]
//! file = "log/confluence-mcp.log"
//! level = "debug"
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::auth::Credential;
use crate::links::ensure_no_trailing_slash;

const MIN_EMAIL_LEN: usize = 3;
const MIN_TOKEN_LEN: usize = 5;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub confluence: ConfluenceConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ConfluenceConfig {
    /// `"cloud"` or `"onprem"`.
    #[serde(default)]
    pub hosting: String,
    #[serde(default)]
    pub base_url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Upper bound for the search tool's `limit`.
    #[serde(default = "default_search_max_limit")]
    pub search_max_limit: u32,
    /// Condition AND-ed into every search. Empty means none.
    #[serde(default)]
    pub default_cql: String,
    /// Default and upper bound for the get-content tool's `bodyMaxChars`.
    #[serde(default = "default_body_max_chars")]
    pub body_max_chars: usize,
}

impl Default for ConfluenceConfig {
    fn default() -> Self {
        Self {
            hosting: String::new(),
            base_url: String::new(),
            timeout_ms: default_timeout_ms(),
            search_max_limit: default_search_max_limit(),
            default_cql: String::new(),
            body_max_chars: default_body_max_chars(),
        }
    }
}

fn default_timeout_ms() -> u64 {
    15_000
}
fn default_search_max_limit() -> u32 {
    50
}
fn default_body_max_chars() -> usize {
    20_000
}

#[derive(Deserialize, Clone, Default)]
pub struct AuthConfig {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub api_token: Option<String>,
    /// Wins over email + api token when set.
    #[serde(default)]
    pub personal_access_token: Option<String>,
    /// Send no `Authorization` header at all, e.g. behind a proxy that
    /// injects credentials.
    #[serde(default)]
    pub no_auth: bool,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "***");
        f.debug_struct("AuthConfig")
            .field("email", &self.email)
            .field("api_token", &redact(&self.api_token))
            .field("personal_access_token", &redact(&self.personal_access_token))
            .field("no_auth", &self.no_auth)
            .finish()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

/// Optional log file, written alongside stderr.
#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    /// Appended to; parent directories are created. Unset means stderr only.
    #[serde(default)]
    pub file: Option<String>,
    /// Level for the file sink. `RUST_LOG` only governs stderr.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file: None,
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "debug".to_string()
}

impl LogConfig {
    /// The file sink's level filter. Validated at load time.
    pub fn level_filter(&self) -> Result<LevelFilter> {
        self.level
            .trim()
            .parse::<LevelFilter>()
            .with_context(|| format!("log.level is not a valid level: '{}'", self.level))
    }
}

impl Config {
    /// Config for a site that needs no credentials. Defaults everywhere else.
    pub fn minimal(hosting: &str, base_url: &str) -> Self {
        Self {
            confluence: ConfluenceConfig {
                hosting: hosting.to_string(),
                base_url: ensure_no_trailing_slash(base_url).to_string(),
                ..ConfluenceConfig::default()
            },
            auth: AuthConfig {
                no_auth: true,
                ..AuthConfig::default()
            },
            server: ServerConfig::default(),
            log: LogConfig::default(),
        }
    }

    /// Builds the config from `CONFLUENCE_*` variables alone.
    pub fn from_env_only() -> Result<Self> {
        Self::from_env(|key| std::env::var(key).ok())
    }

    /// Like [`from_env_only`](Self::from_env_only) with an explicit lookup.
    pub fn from_env(env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Config::default();
        config.apply_env(env)?;
        config.validate()?;
        Ok(config)
    }

    /// The credential outgoing requests are signed with.
    pub fn credential(&self) -> Credential {
        if self.auth.no_auth {
            return Credential::Anonymous;
        }
        if let Some(token) = non_blank(&self.auth.personal_access_token) {
            return Credential::bearer(token);
        }
        match (non_blank(&self.auth.email), non_blank(&self.auth.api_token)) {
            (Some(email), Some(token)) => Credential::basic(email, token),
            _ => Credential::Anonymous,
        }
    }

    fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) -> Result<()> {
        let get = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("CONFLUENCE_HOSTING") {
            self.confluence.hosting = v;
        }
        if let Some(v) = get("CONFLUENCE_BASE_URL") {
            self.confluence.base_url = v;
        }
        if let Some(v) = get("CONFLUENCE_DEFAULT_CQL") {
            self.confluence.default_cql = v;
        }
        if let Some(v) = get("CONFLUENCE_TIMEOUT_MS") {
            self.confluence.timeout_ms = parse_env("CONFLUENCE_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = get("CONFLUENCE_SEARCH_MAX_LIMIT") {
            self.confluence.search_max_limit = parse_env("CONFLUENCE_SEARCH_MAX_LIMIT", &v)?;
        }
        if let Some(v) = get("CONFLUENCE_BODY_MAX_CHARS") {
            self.confluence.body_max_chars = parse_env("CONFLUENCE_BODY_MAX_CHARS", &v)?;
        }
        if let Some(v) = get("CONFLUENCE_EMAIL") {
            self.auth.email = Some(v);
        }
        if let Some(v) = get("CONFLUENCE_API_TOKEN") {
            self.auth.api_token = Some(v);
        }
        if let Some(v) = get("CONFLUENCE_PERSONAL_ACCESS_TOKEN") {
            self.auth.personal_access_token = Some(v);
        }
        if let Some(v) = get("CONFLUENCE_LOG_FILE") {
            self.log.file = Some(v);
        }
        if let Some(v) = get("CONFLUENCE_LOG_LEVEL") {
            self.log.level = v;
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        // Confluence
        self.confluence.hosting = self.confluence.hosting.trim().to_ascii_lowercase();
        match self.confluence.hosting.as_str() {
            "cloud" | "onprem" => {}
            "" => bail!("confluence.hosting must be set (or CONFLUENCE_HOSTING)"),
            other => bail!(
                "Unknown confluence.hosting: '{}'. Must be cloud or onprem.",
                other
            ),
        }

        let base_url = ensure_no_trailing_slash(self.confluence.base_url.trim()).to_string();
        if base_url.is_empty() {
            bail!("confluence.base_url must be set (or CONFLUENCE_BASE_URL)");
        }
        let parsed = Url::parse(&base_url)
            .with_context(|| format!("confluence.base_url is not a valid URL: {}", base_url))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!("confluence.base_url must be an http(s) URL, got '{}'", base_url);
        }
        self.confluence.base_url = base_url;

        if self.confluence.timeout_ms == 0 {
            bail!("confluence.timeout_ms must be > 0");
        }
        if self.confluence.search_max_limit < 1 {
            bail!("confluence.search_max_limit must be >= 1");
        }
        if self.confluence.body_max_chars < 1 {
            bail!("confluence.body_max_chars must be >= 1");
        }

        // Log
        self.log.level_filter()?;
        if self.log.file.as_deref().is_some_and(|f| f.trim().is_empty()) {
            self.log.file = None;
        }

        // Auth
        if self.auth.no_auth {
            return Ok(());
        }
        if let Some(token) = non_blank(&self.auth.personal_access_token) {
            if token.chars().count() < MIN_TOKEN_LEN {
                bail!(
                    "auth.personal_access_token must be at least {} characters",
                    MIN_TOKEN_LEN
                );
            }
            return Ok(());
        }
        match (non_blank(&self.auth.email), non_blank(&self.auth.api_token)) {
            (Some(email), Some(token)) => {
                if email.chars().count() < MIN_EMAIL_LEN {
                    bail!("auth.email must be at least {} characters", MIN_EMAIL_LEN);
                }
                if token.chars().count() < MIN_TOKEN_LEN {
                    bail!("auth.api_token must be at least {} characters", MIN_TOKEN_LEN);
                }
            }
            _ => bail!(
                "auth.email and auth.api_token are required when auth.personal_access_token is not set"
            ),
        }

        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

/// Like [`load_config`] with an explicit environment lookup.
pub fn load_config_with_env(
    path: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    config.apply_env(env)?;
    config.validate()?;

    Ok(config)
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    match value.trim().parse::<T>() {
        Ok(v) => Ok(v),
        Err(_) => bail!("{} must be a non-negative integer, got '{}'", key, value),
    }
}
