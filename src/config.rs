//! Runtime configuration read from the environment.
//!
//! `.env` is loaded by `main` before anything here runs, so values from the
//! file and from the process environment look the same.

use thiserror::Error;
use url::Url;

use crate::repository::util::redact_database_url;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0} (or set DATABASE_URL)")]
    Missing(&'static str),

    #[error("DB_PORT must be a port number, got {0:?}")]
    InvalidPort(String),

    #[error("cannot build a database URL from DB_HOST {host:?}: {source}")]
    InvalidHost {
        host: String,
        #[source]
        source: url::ParseError,
    },

    #[error("DB_USER or DB_PASSWORD cannot be encoded into a database URL")]
    InvalidCredentials,
}

/// Where records are persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseSettings {
    pub url: String,
}

impl DatabaseSettings {
    /// Read database settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve settings through `lookup`; empty values count as unset.
    ///
    /// `DATABASE_URL` wins outright. Otherwise every `DB_*` parameter must be
    /// present and they are assembled into a PostgreSQL URL.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("DATABASE_URL") {
            tracing::debug!("Using DATABASE_URL from environment");
            return Ok(Self { url });
        }

        let param = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));
        let user = param("DB_USER")?;
        let password = param("DB_PASSWORD")?;
        let name = param("DB_NAME")?;
        let host = param("DB_HOST")?;
        let port = param("DB_PORT")?;

        let port: u16 = port
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidPort(port.clone()))?;

        let mut url =
            Url::parse(&format!("postgres://{}", host.trim())).map_err(|e| {
                ConfigError::InvalidHost {
                    host: host.clone(),
                    source: e,
                }
            })?;
        url.set_port(Some(port))
            .map_err(|_| ConfigError::InvalidPort(port.to_string()))?;
        url.set_username(&user)
            .map_err(|_| ConfigError::InvalidCredentials)?;
        url.set_password(Some(&password))
            .map_err(|_| ConfigError::InvalidCredentials)?;
        url.set_path(&name);

        Ok(Self {
            url: url.to_string(),
        })
    }

    /// URL safe for logs.
    pub fn display_url(&self) -> String {
        redact_database_url(&self.url)
    }
}
