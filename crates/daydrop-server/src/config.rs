use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Process configuration, read from `DAYDROP_*` environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let port = match get("DAYDROP_PORT") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("DAYDROP_PORT must be a port number, got '{}'", raw))?,
            None => 3000,
        };

        Ok(Self {
            db_path: PathBuf::from(get("DAYDROP_DB_PATH").unwrap_or_else(|| "daydrop.db".into())),
            host: get("DAYDROP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            jwt_secret: get("DAYDROP_JWT_SECRET").unwrap_or_else(|| "dev-secret-change-me".into()),
        })
    }

    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}
