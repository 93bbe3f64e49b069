use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub max_connections: u32,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let database_url = var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let port = match var("APP_PORT") {
            Some(v) => v.parse::<u16>().with_context(|| format!("APP_PORT is not a port: {v}"))?,
            None => 8080,
        };
        Ok(Self {
            database_url,
            host: var("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            max_connections: var("DB_MAX_CONNECTIONS")
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(10),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
