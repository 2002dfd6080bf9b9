//! Configuration parsing and validation
//!
//! Two layers: command-line flags (each also readable from the environment)
//! locate the files the service needs, and the TOML configuration file holds
//! the `[oidc]` and `[database]` sections. Values in the file can be
//! overridden with `REGISTER__<SECTION>__<KEY>` environment variables.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use ::config::{ConfigBuilder, ConfigError, Environment, File, FileFormat};
use clap::Parser;
use serde::Deserialize;
use thiserror::Error;

use crate::oidc::OidcConfiguration;

const ENV_PREFIX: &str = "REGISTER";
const ENV_SEPARATOR: &str = "__";

const DEFAULT_DATABASE_PORT: u16 = 5432;
const DEFAULT_DATABASE_NAME: &str = "postgres";
const DEFAULT_MAX_CONNECTIONS: u32 = 50;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "register-backend",
    version,
    about = "Register backend with OIDC-authenticated access",
    long_about = "HTTP backend for cash registers: lists registers and items, books transactions and reports article statistics. Every request is authenticated against an OpenID Connect userinfo endpoint."
)]
pub struct Config {
    /// Path of the TOML configuration file
    #[arg(
        long = "config",
        env = "CONFIGURATION_LOCATION",
        default_value = "./configuration.toml"
    )]
    pub config_path: PathBuf,

    /// Path of the error catalog
    #[arg(
        long = "errors",
        env = "ERROR_CATALOG_LOCATION",
        default_value = "./errors.json"
    )]
    pub errors_path: PathBuf,

    /// Path of the named SQL queries
    #[arg(
        long = "queries",
        env = "QUERIES_LOCATION",
        default_value = "./sql/queries.sql"
    )]
    pub queries_path: PathBuf,

    /// Path of the schema statements run at startup
    #[arg(
        long = "init-sql",
        env = "INIT_SQL_LOCATION",
        default_value = "./sql/init.sql"
    )]
    pub init_sql_path: PathBuf,

    /// Address the HTTP server binds to
    #[arg(long, env = "LISTEN_ADDRESS", default_value = "0.0.0.0:8000")]
    pub listen: SocketAddr,

    /// Don't show the startup banner
    #[arg(long)]
    pub no_banner: bool,

    /// Show only error messages
    #[arg(long, conflicts_with = "debug")]
    pub silent: bool,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Config {
    /// Parse configuration from CLI arguments and environment variables
    pub fn parse_args() -> Self {
        Config::parse()
    }

    /// Get log level based on flags
    pub fn log_level(&self) -> tracing::Level {
        if self.silent {
            tracing::Level::ERROR
        } else if self.debug {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

/// Contents of the configuration file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Configuration {
    #[serde(default)]
    pub oidc: OidcConfiguration,

    #[serde(default)]
    pub database: DatabaseConfiguration,
}

impl Configuration {
    /// Read the file at `path`, then apply environment overrides
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let builder = ::config::Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml).required(true))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator(ENV_SEPARATOR)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            );
        Self::build(builder)
    }

    /// Parse TOML text without environment overrides
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Self::build(
            ::config::Config::builder().add_source(File::from_str(contents, FileFormat::Toml)),
        )
    }

    fn build(builder: ConfigBuilder<::config::builder::DefaultState>) -> Result<Self, ConfigError> {
        builder.build()?.try_deserialize()
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DatabaseConfigError {
    #[error("no database host set in the configuration")]
    NoDatabaseHost,

    #[error("the database host is empty")]
    EmptyDatabaseHost,

    #[error("no database user set in the configuration")]
    NoDatabaseUser,

    #[error("the database user is empty")]
    EmptyDatabaseUser,
}

/// The `[database]` section as written in the file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseConfiguration {
    #[serde(default)]
    pub host: Option<String>,

    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub user: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default, rename = "maxConnections", alias = "maxconnections")]
    pub max_connections: Option<u32>,
}

/// Validated connection settings
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    pub max_connections: u32,
}

impl std::fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("name", &self.name)
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

impl DatabaseConfiguration {
    /// Check the required keys and fill in defaults for the optional ones
    pub fn validate(&self) -> Result<DatabaseSettings, DatabaseConfigError> {
        let host = match self.host.as_deref().map(str::trim) {
            None => return Err(DatabaseConfigError::NoDatabaseHost),
            Some("") => return Err(DatabaseConfigError::EmptyDatabaseHost),
            Some(host) => host.to_string(),
        };
        let user = match self.user.as_deref().map(str::trim) {
            None => return Err(DatabaseConfigError::NoDatabaseUser),
            Some("") => return Err(DatabaseConfigError::EmptyDatabaseUser),
            Some(user) => user.to_string(),
        };

        Ok(DatabaseSettings {
            host,
            port: self.port.unwrap_or(DEFAULT_DATABASE_PORT),
            user,
            password: self
                .password
                .clone()
                .filter(|password| !password.trim().is_empty())
                .unwrap_or_default(),
            name: self
                .name
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .unwrap_or(DEFAULT_DATABASE_NAME)
                .to_string(),
            max_connections: self
                .max_connections
                .filter(|max| *max > 0)
                .unwrap_or(DEFAULT_MAX_CONNECTIONS),
        })
    }
}
