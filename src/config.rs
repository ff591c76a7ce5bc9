//! Environment configuration.
//!
//! `SECRET_KEY` is required: the process refuses to start without an
//! explicit session signing secret rather than falling back to a baked-in
//! default.

use anyhow::{bail, Result};
use std::path::PathBuf;

const DEFAULT_DATA_PATH: &str = "data/final_data.csv";
const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone)]
pub struct Config {
    /// Session signing secret. Required, never defaulted.
    pub secret_key: String,
    /// Path to the spreadsheet export (.csv or .parquet).
    pub data_path: PathBuf,
    /// Listen port.
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup (testable without touching
    /// process environment).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let secret_key = match lookup("SECRET_KEY") {
            Some(value) if !value.trim().is_empty() => value,
            _ => bail!("SECRET_KEY must be set to a non-empty value; refusing to start"),
        };

        let data_path = lookup("DATA_PATH")
            .unwrap_or_else(|| DEFAULT_DATA_PATH.to_string())
            .into();

        let port = lookup("PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        Ok(Config {
            secret_key,
            data_path,
            port,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_secret_key_fails_fast() {
        assert!(Config::from_lookup(|_| None).is_err());
    }

    #[test]
    fn test_empty_secret_key_fails_fast() {
        let result = Config::from_lookup(|name| match name {
            "SECRET_KEY" => Some("   ".to_string()),
            _ => None,
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_lookup(|name| match name {
            "SECRET_KEY" => Some("s3cret".to_string()),
            _ => None,
        })
        .expect("valid");
        assert_eq!(config.secret_key, "s3cret");
        assert_eq!(config.data_path, PathBuf::from(DEFAULT_DATA_PATH));
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn test_overrides_applied() {
        let config = Config::from_lookup(|name| match name {
            "SECRET_KEY" => Some("s3cret".to_string()),
            "DATA_PATH" => Some("/srv/scores.parquet".to_string()),
            "PORT" => Some("9090".to_string()),
            _ => None,
        })
        .expect("valid");
        assert_eq!(config.data_path, PathBuf::from("/srv/scores.parquet"));
        assert_eq!(config.port, 9090);
    }

    #[test]
    fn test_unparseable_port_falls_back_to_default() {
        let config = Config::from_lookup(|name| match name {
            "SECRET_KEY" => Some("s3cret".to_string()),
            "PORT" => Some("not-a-port".to_string()),
            _ => None,
        })
        .expect("valid");
        assert_eq!(config.port, DEFAULT_PORT);
    }
}
