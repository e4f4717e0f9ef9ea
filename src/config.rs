//! Service configuration -- TOML file with environment overrides.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::store::DEFAULT_RETENTION;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Bind address for the HTTP server.
    pub bind: String,
    /// Shared secret for ingest-token HMAC.
    pub ingest_secret: String,
    /// Token for the stats endpoint.
    pub admin_token: String,
    /// Maximum number of incidents retained in memory.
    pub retention: usize,
    /// Optional webhook URL for admin alerts and evidence packages.
    pub admin_webhook: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
            ingest_secret: "tripline-dev-secret".to_string(),
            admin_token: "tripline-dev-admin".to_string(),
            retention: DEFAULT_RETENTION,
            admin_webhook: None,
        }
    }
}

impl Config {
    /// Load configuration: optional TOML file, then `TRIPLINE_*`
    /// environment variables on top.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => {
                let raw = std::fs::read_to_string(p)
                    .with_context(|| format!("reading config file {}", p.display()))?;
                toml::from_str(&raw)
                    .with_context(|| format!("parsing config file {}", p.display()))?
            }
            None => Config::default(),
        };

        if let Ok(v) = std::env::var("TRIPLINE_BIND") {
            config.bind = v;
        }
        if let Ok(v) = std::env::var("TRIPLINE_INGEST_SECRET") {
            config.ingest_secret = v;
        }
        if let Ok(v) = std::env::var("TRIPLINE_ADMIN_TOKEN") {
            config.admin_token = v;
        }
        if let Ok(v) = std::env::var("TRIPLINE_ADMIN_WEBHOOK") {
            config.admin_webhook = Some(v);
        }

        if config.ingest_secret == Config::default().ingest_secret {
            tracing::warn!("using built-in dev ingest secret; set TRIPLINE_INGEST_SECRET");
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert_eq!(config.bind, "0.0.0.0:8080");
        assert_eq!(config.retention, DEFAULT_RETENTION);
        assert!(config.admin_webhook.is_none());
    }

    #[test]
    fn loads_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "bind = \"127.0.0.1:9999\"\nretention = 500\nadmin_token = \"t0\""
        )
        .unwrap();
        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.bind, "127.0.0.1:9999");
        assert_eq!(config.retention, 500);
        assert_eq!(config.admin_token, "t0");
        // unspecified fields keep their defaults
        assert_eq!(config.ingest_secret, Config::default().ingest_secret);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "bindd = \"oops\"").unwrap();
        assert!(Config::load(Some(file.path())).is_err());
    }
}
