
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

pub const DEFAULT_CONFIG_FILE: &str = "catalog-rag.toml";
pub const DEFAULT_POSTGRES_PORT: u16 = 5432;

const DEFAULT_METADATA_FILE: &str = "./data/metadata/datahub/metadata.json";
const DEFAULT_PROMPT_FILE: &str = "librarian-prompt.md";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Connection credentials, always read from `POSTGRES_*` variables
    #[serde(skip)]
    pub postgres: PostgresConfig,
    #[serde(default)]
    pub database: PoolConfig,
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostgresConfig {
    pub database: String,
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            database: String::new(),
            user: String::new(),
            password: String::new(),
            host: "localhost".to_string(),
            port: DEFAULT_POSTGRES_PORT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PoolConfig {
    pub min_connections: u32,
    pub max_connections: u32,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_connections: 5,
            max_connections: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OpenAiConfig {
    pub base_url: String,
    pub embedding_model: String,
    pub chat_model: String,
    pub timeout_secs: u64,
    pub retry_attempts: u32,
    /// Read from `OPENAI_API_KEY`; never written to the config file
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1/".to_string(),
            embedding_model: "text-embedding-ada-002".to_string(),
            chat_model: "gpt-3.5-turbo".to_string(),
            timeout_secs: 60,
            retry_attempts: 3,
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub metadata_file: PathBuf,
    pub prompt_file: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            metadata_file: PathBuf::from(DEFAULT_METADATA_FILE),
            prompt_file: PathBuf::from(DEFAULT_PROMPT_FILE),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVariable(&'static str),
    #[error("Invalid port: {0} (must be between 1 and 65535)")]
    InvalidPort(String),
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid pool size: min {0}, max {1} (max must be between 1 and 100 and not below min)")]
    InvalidPoolSize(u32, u32),
    #[error("Invalid model name for {0} (cannot be empty)")]
    InvalidModel(&'static str),
    #[error("Invalid request timeout: {0} (must be between 1 and 600 seconds)")]
    InvalidTimeout(u64),
    #[error("Invalid retry attempts: {0} (must be between 1 and 10)")]
    InvalidRetryAttempts(u32),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl Config {
    /// Load settings from the process environment and a TOML file.
    ///
    /// An explicit `config_file` must exist. Without one, [`DEFAULT_CONFIG_FILE`]
    /// in the working directory is read when present.
    #[inline]
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let default_file = Path::new(DEFAULT_CONFIG_FILE);
        let config_file = config_file.or_else(|| default_file.exists().then_some(default_file));

        Self::load_with_env(config_file, |key| std::env::var(key).ok())
    }

    /// Same as [`Config::load`] with an explicit environment lookup.
    /// `None` skips the file and starts from defaults.
    #[inline]
    pub fn load_with_env<F>(config_file: Option<&Path>, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match config_file {
            Some(config_file) => {
                let content = fs::read_to_string(config_file)
                    .map_err(ConfigError::Io)
                    .with_context(|| {
                        format!("Failed to read config file: {}", config_file.display())
                    })?;
                toml::from_str::<Config>(&content).with_context(|| {
                    format!("Failed to parse config file: {}", config_file.display())
                })?
            }
            None => Config::default(),
        };

        config.postgres =
            PostgresConfig::from_env(&env).context("Failed to read database settings")?;

        config.openai.api_key = env("OPENAI_API_KEY").filter(|key| !key.trim().is_empty());
        if let Some(base_url) = env("OPENAI_BASE_URL") {
            config.openai.base_url = base_url;
        }

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.database.validate()?;
        self.openai.validate()?;
        Ok(())
    }

    /// Connection URL composed from the `POSTGRES_*` settings
    #[inline]
    pub fn database_url(&self) -> Result<String, ConfigError> {
        self.postgres.url().map(String::from)
    }
}

impl PostgresConfig {
    #[inline]
    pub fn from_env<F>(env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &'static str| env(key).ok_or(ConfigError::MissingVariable(key));

        let port = match env("POSTGRES_PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .ok()
                .filter(|port| *port != 0)
                .ok_or(ConfigError::InvalidPort(raw))?,
            None => DEFAULT_POSTGRES_PORT,
        };

        Ok(Self {
            database: require("POSTGRES_DB")?,
            user: require("POSTGRES_USER")?,
            password: require("POSTGRES_PASSWORD")?,
            host: require("POSTGRES_HOST")?,
            port,
        })
    }

    #[inline]
    pub fn url(&self) -> Result<Url, ConfigError> {
        let base = format!("postgres://{}:{}/{}", self.host, self.port, self.database);
        let mut url = Url::parse(&base).map_err(|_| ConfigError::InvalidUrl(base.clone()))?;

        url.set_username(&self.user)
            .map_err(|()| ConfigError::InvalidUrl(base.clone()))?;
        url.set_password(Some(&self.password))
            .map_err(|()| ConfigError::InvalidUrl(base))?;

        Ok(url)
    }

    /// Connection URL with the password masked, for display
    #[inline]
    pub fn redacted_url(&self) -> Result<String, ConfigError> {
        let mut url = self.url()?;
        if !self.password.is_empty() {
            url.set_password(Some("***"))
                .map_err(|()| ConfigError::InvalidUrl(url.to_string()))?;
        }
        Ok(url.into())
    }
}

impl PoolConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.max_connections) || self.min_connections > self.max_connections
        {
            return Err(ConfigError::InvalidPoolSize(
                self.min_connections,
                self.max_connections,
            ));
        }
        Ok(())
    }
}

impl OpenAiConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.api_url()?;

        if self.embedding_model.trim().is_empty() {
            return Err(ConfigError::InvalidModel("embedding_model"));
        }

        if self.chat_model.trim().is_empty() {
            return Err(ConfigError::InvalidModel("chat_model"));
        }

        if !(1..=600).contains(&self.timeout_secs) {
            return Err(ConfigError::InvalidTimeout(self.timeout_secs));
        }

        if !(1..=10).contains(&self.retry_attempts) {
            return Err(ConfigError::InvalidRetryAttempts(self.retry_attempts));
        }

        Ok(())
    }

    /// API root with a trailing slash so that endpoint paths join beneath it
    #[inline]
    pub fn api_url(&self) -> Result<Url, ConfigError> {
        let mut raw = self.base_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }

        let url = Url::parse(&raw).map_err(|_| ConfigError::InvalidUrl(raw.clone()))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidUrl(raw));
        }

        Ok(url)
    }
}
