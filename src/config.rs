use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    // Locales
    pub default_locale: String,
    pub supported_locales: String,

    // Database
    pub database_url: Option<String>,

    // Server
    pub port: u16,
    pub api_key: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let default_locale = std::env::var("DEFAULT_LOCALE")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "en".to_string());

        Ok(Self {
            // Locales - the supported list falls back to the default locale alone
            supported_locales: std::env::var("SUPPORTED_LOCALES")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default_locale.clone()),
            default_locale,

            // Database - only required when running against PostgreSQL
            database_url: std::env::var("DATABASE_URL").ok().filter(|v| !v.is_empty()),

            // Server
            port: match std::env::var("PORT") {
                Ok(v) => v.parse().context(format!("PORT is not a valid port: {}", v))?,
                Err(_) => 8080,
            },
            api_key: std::env::var("API_KEY").ok().filter(|v| !v.is_empty()),
        })
    }

    /// The database URL, or an error naming the missing variable.
    pub fn require_database_url(&self) -> Result<&str> {
        self.database_url
            .as_deref()
            .context("DATABASE_URL not set (use --memory to run without PostgreSQL)")
    }
}
