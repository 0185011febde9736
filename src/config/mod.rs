// Configuration management module
// Tunables come from an optional TOML file, credentials from the environment

pub mod settings;

pub use settings::{
    Config, ConfigError, DEFAULT_CONFIG_FILE, OpenAiConfig, PathsConfig, PoolConfig,
    PostgresConfig,
};
