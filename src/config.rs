use std::env;
use std::str::FromStr;

use log::info;
use thiserror::Error;

const DEFAULT_FDC_BASE_URL: &str = "https://api.nal.usda.gov/fdc/v1";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

/// Server settings, read from the environment after `.env` is loaded.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub redis_url: Option<String>,
    pub jwt_secret: String,
    pub fdc_api_key: String,
    pub fdc_base_url: String,
    pub search_cache_seconds: usize,
    pub run_migrations: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let required = |key: &'static str| var(key).ok_or(ConfigError::Missing(key));

        Ok(Self {
            host: var("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parse_or(&var, "PORT", 8080)?,
            database_url: required("DATABASE_URL")?,
            redis_url: var("REDIS_URL"),
            jwt_secret: required("JWT_SECRET")?,
            fdc_api_key: var("FDC_API_KEY").unwrap_or_else(|| {
                info!("FDC_API_KEY not set, using DEMO_KEY");
                "DEMO_KEY".to_string()
            }),
            fdc_base_url: var("FDC_BASE_URL").unwrap_or_else(|| DEFAULT_FDC_BASE_URL.to_string()),
            search_cache_seconds: parse_or(&var, "SEARCH_CACHE_SECONDS", 300)?,
            run_migrations: parse_or(&var, "RUN_MIGRATIONS", true)?,
        })
    }
}

fn parse_or<T, F>(var: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            message: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_fill_optional_settings() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "mysql://root@localhost/symptoms"),
            ("JWT_SECRET", "secret"),
        ]))
        .unwrap();

        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.redis_url, None);
        assert_eq!(config.fdc_api_key, "DEMO_KEY");
        assert_eq!(config.fdc_base_url, DEFAULT_FDC_BASE_URL);
        assert_eq!(config.search_cache_seconds, 300);
        assert!(config.run_migrations);
    }

    #[test]
    fn secrets_are_required() {
        let err = Config::from_lookup(lookup(&[("DATABASE_URL", "mysql://localhost/db")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("JWT_SECRET")));

        let err = Config::from_lookup(lookup(&[("JWT_SECRET", "secret"), ("DATABASE_URL", " ")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("DATABASE_URL")));
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let err = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "mysql://localhost/db"),
            ("JWT_SECRET", "secret"),
            ("PORT", "eighty"),
        ]))
        .unwrap_err();
        assert_eq!(err.to_string(), "invalid PORT: invalid digit found in string");
    }
}
