//! Configuration Manager

use super::Config;
use crate::Result;
use anyhow::{bail, Context};
use regex::Regex;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

const METRIC_NAMESPACE_PATTERN: &str = "^[a-zA-Z_][a-zA-Z0-9_]*$";
const MAX_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(300);

/// Manages configuration loading and validation
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration from environment variables and the config file.
    ///
    /// Environment values replace the defaults and the file replaces both, key
    /// by key, so a file that leaves a setting out keeps the environment value.
    pub fn load(path: &Path) -> Result<Config> {
        Self::load_with_env(path, |key| std::env::var(key).ok())
    }

    fn load_with_env<F>(path: &Path, env: F) -> Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();
        Self::apply_env(&mut config, env)?;

        if path.exists() {
            tracing::info!("Loading configuration from: {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;

            let file: toml::Value = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

            let mut layered = toml::Value::try_from(&config)
                .context("Failed to serialize environment configuration")?;
            merge_toml(&mut layered, file);

            let merged: Config = layered
                .try_into()
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            config = merged;
        } else {
            tracing::warn!(
                "Configuration file not found at {}, using environment and defaults",
                path.display()
            );
        }

        config
            .validate()
            .context("Configuration validation failed")?;

        tracing::info!("Configuration loaded and validated successfully");
        Ok(config)
    }

    fn apply_env<F>(config: &mut Config, env: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind_addr) = env("TOPEXPORTER_BIND_ADDR") {
            config.server.bind_addr = bind_addr
                .parse::<SocketAddr>()
                .with_context(|| format!("Invalid TOPEXPORTER_BIND_ADDR: {}", bind_addr))?;
        }

        if let Some(timeout) = env("TOPEXPORTER_SHUTDOWN_TIMEOUT") {
            config.server.shutdown_timeout = humantime::parse_duration(&timeout)
                .with_context(|| format!("Invalid TOPEXPORTER_SHUTDOWN_TIMEOUT: {}", timeout))?;
        }

        if let Some(namespace) = env("TOPEXPORTER_NAMESPACE") {
            config.exporter.namespace = namespace;
        }

        if let Some(path) = env("TOPEXPORTER_SNAPSHOT_PATH") {
            config.source.snapshot_path = Some(PathBuf::from(path));
        }

        if let Some(log_level) = env("TOPEXPORTER_LOG_LEVEL") {
            config.logging.level = log_level;
        }

        Ok(())
    }
}

/// Overlay `overlay` onto `base`, descending into tables
fn merge_toml(base: &mut toml::Value, overlay: toml::Value) {
    match overlay {
        toml::Value::Table(overlay) => match base {
            toml::Value::Table(base) => {
                for (key, value) in overlay {
                    match base.get_mut(&key) {
                        Some(existing) => merge_toml(existing, value),
                        None => {
                            base.insert(key, value);
                        }
                    }
                }
            }
            base => *base = toml::Value::Table(overlay),
        },
        value => *base = value,
    }
}

/// Values given on the command line, applied over file and environment settings
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub bind: Option<String>,
    pub port: Option<u16>,
    pub namespace: Option<String>,
    pub snapshot_path: Option<PathBuf>,
    pub log_level: Option<String>,
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.validate_exporter_config()
            .with_context(|| "Exporter configuration validation failed")?;

        self.validate_server_config()
            .with_context(|| "Server configuration validation failed")?;

        self.validate_logging_config()
            .with_context(|| "Logging configuration validation failed")?;

        Ok(())
    }

    fn validate_exporter_config(&self) -> Result<()> {
        let pattern = Regex::new(METRIC_NAMESPACE_PATTERN)?;
        if !pattern.is_match(&self.exporter.namespace) {
            bail!(
                "exporter.namespace '{}' must match {}",
                self.exporter.namespace,
                METRIC_NAMESPACE_PATTERN
            );
        }

        Ok(())
    }

    fn validate_server_config(&self) -> Result<()> {
        if self.server.shutdown_timeout.is_zero() {
            bail!("shutdown_timeout must be greater than 0");
        }

        if self.server.shutdown_timeout > MAX_SHUTDOWN_TIMEOUT {
            bail!("shutdown_timeout cannot exceed 5 minutes");
        }

        Ok(())
    }

    fn validate_logging_config(&self) -> Result<()> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            bail!("logging.level must be one of: {}", valid_log_levels.join(", "));
        }

        Ok(())
    }

    /// Merge with CLI arguments
    pub fn merge_with_cli_args(&mut self, overrides: &CliOverrides) {
        if let Some(bind_str) = overrides.bind.as_deref() {
            if let Ok(addr) = bind_str.parse::<SocketAddr>() {
                self.server.bind_addr = addr;
                tracing::info!("CLI override: bind address set to {}", addr);
            } else {
                tracing::warn!("Invalid bind address provided: {}", bind_str);
            }
        }

        if let Some(port) = overrides.port {
            self.server.bind_addr.set_port(port);
            tracing::info!("CLI override: port set to {}", port);
        }

        if let Some(namespace) = &overrides.namespace {
            self.exporter.namespace = namespace.clone();
            tracing::info!("CLI override: metric namespace set to {}", namespace);
        }

        if let Some(path) = &overrides.snapshot_path {
            self.source.snapshot_path = Some(path.clone());
            tracing::info!("CLI override: snapshot path set to {}", path.display());
        }

        if let Some(level) = &overrides.log_level {
            self.logging.level = level.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.exporter.namespace, "mongodb");
        assert_eq!(config.server.bind_addr.port(), 9216);
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_load_partial_file() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[exporter]
namespace = "mongo"

[server]
bind_addr = "0.0.0.0:9300"
shutdown_timeout = "3s"

[source]
snapshot_path = "/var/lib/topexporter/top.json"
"#,
        )?;

        let config = ConfigManager::load_with_env(&path, no_env)?;
        assert_eq!(config.exporter.namespace, "mongo");
        assert_eq!(config.server.bind_addr.port(), 9300);
        assert_eq!(config.server.shutdown_timeout, Duration::from_secs(3));
        assert_eq!(
            config.source.snapshot_path.as_deref(),
            Some(Path::new("/var/lib/topexporter/top.json"))
        );
        assert_eq!(config.logging.level, "info");
        Ok(())
    }

    #[test]
    fn test_missing_file_uses_defaults() -> anyhow::Result<()> {
        let config = ConfigManager::load_with_env(Path::new("/nonexistent/config.toml"), no_env)?;
        assert_eq!(config.exporter.namespace, "mongodb");
        assert_eq!(config.source.snapshot_path, None);
        Ok(())
    }

    #[test]
    fn test_invalid_file_rejected() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("config.toml");

        std::fs::write(&path, "invalid toml content [[[")?;
        assert!(ConfigManager::load_with_env(&path, no_env).is_err());

        std::fs::write(&path, "[server]\nbind_addr = \"nowhere\"\n")?;
        assert!(ConfigManager::load_with_env(&path, no_env).is_err());
        Ok(())
    }

    #[test]
    fn test_invalid_namespace_rejected() {
        let mut config = Config::default();
        for namespace in ["", "9lives", "mongo-db", "mongo db"] {
            config.exporter.namespace = namespace.to_string();
            assert!(config.validate().is_err(), "namespace {:?} accepted", namespace);
        }

        config.exporter.namespace = "_mongo_1".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_server_and_logging_rejected() {
        let mut config = Config::default();
        config.server.shutdown_timeout = Duration::ZERO;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.server.shutdown_timeout = Duration::from_secs(301);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_environment_without_file() -> anyhow::Result<()> {
        let env = |key: &str| match key {
            "TOPEXPORTER_BIND_ADDR" => Some("127.0.0.1:9999".to_string()),
            "TOPEXPORTER_NAMESPACE" => Some("envmongo".to_string()),
            "TOPEXPORTER_SHUTDOWN_TIMEOUT" => Some("2s".to_string()),
            _ => None,
        };

        let config = ConfigManager::load_with_env(Path::new("/nonexistent/config.toml"), env)?;
        assert_eq!(config.server.bind_addr.port(), 9999);
        assert_eq!(config.exporter.namespace, "envmongo");
        assert_eq!(config.server.shutdown_timeout, Duration::from_secs(2));
        Ok(())
    }

    #[test]
    fn test_file_layers_over_environment() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[exporter]
namespace = "filemongo"

[server]
shutdown_timeout = "4s"
"#,
        )?;

        let env = |key: &str| match key {
            "TOPEXPORTER_NAMESPACE" => Some("envmongo".to_string()),
            "TOPEXPORTER_BIND_ADDR" => Some("127.0.0.1:9999".to_string()),
            "TOPEXPORTER_SNAPSHOT_PATH" => Some("/tmp/top.json".to_string()),
            "TOPEXPORTER_LOG_LEVEL" => Some("warn".to_string()),
            _ => None,
        };

        let config = ConfigManager::load_with_env(&path, env)?;
        // Set in the file
        assert_eq!(config.exporter.namespace, "filemongo");
        assert_eq!(config.server.shutdown_timeout, Duration::from_secs(4));
        // Left out of the file
        assert_eq!(config.server.bind_addr.port(), 9999);
        assert_eq!(config.source.snapshot_path, Some(PathBuf::from("/tmp/top.json")));
        assert_eq!(config.logging.level, "warn");
        Ok(())
    }

    #[test]
    fn test_invalid_environment_rejected() {
        let env = |key: &str| (key == "TOPEXPORTER_SHUTDOWN_TIMEOUT").then(|| "soon".to_string());
        let result = ConfigManager::load_with_env(Path::new("/nonexistent/config.toml"), env);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = Config::default();
        config.merge_with_cli_args(&CliOverrides {
            bind: Some("0.0.0.0:9100".to_string()),
            port: Some(9200),
            namespace: Some("cli".to_string()),
            snapshot_path: Some(PathBuf::from("top.json")),
            log_level: Some("debug".to_string()),
        });

        assert_eq!(config.server.bind_addr, "0.0.0.0:9200".parse::<SocketAddr>().unwrap());
        assert_eq!(config.exporter.namespace, "cli");
        assert_eq!(config.source.snapshot_path, Some(PathBuf::from("top.json")));
        assert_eq!(config.logging.level, "debug");

        config.merge_with_cli_args(&CliOverrides {
            bind: Some("not an address".to_string()),
            ..Default::default()
        });
        assert_eq!(config.server.bind_addr.port(), 9200);
    }
}
