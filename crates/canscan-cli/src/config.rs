//! Configuration file handling for canscan

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use canscan_core::{TransportKind, DEFAULT_INTERFACE};
use serde::{Deserialize, Serialize};

/// Backend used when neither flags nor the config file name one
pub const DEFAULT_SERVER: &str = "http://localhost:8000";

/// Configuration for the CLI tool
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Default backend URL
    pub server: Option<String>,
    /// Default bus interface
    pub interface: Option<String>,
    /// Default live scan transport (`stream` or `socket`)
    pub transport: Option<String>,
    /// Simulate scans by default
    pub simulate: Option<bool>,
    /// Disable colored output
    pub no_color: Option<bool>,
}

impl Config {
    /// Load configuration from the default config file
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Get the default config file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("canscan");

        Ok(config_dir.join("config.toml"))
    }

    /// Merge CLI arguments over config file values
    pub fn merge_with_args(&self, args: ArgOverrides<'_>) -> Result<MergedConfig> {
        let transport = match args.transport {
            Some(kind) => kind,
            None => match &self.transport {
                Some(name) => name
                    .parse()
                    .map_err(|e: String| anyhow::anyhow!(e))
                    .context("Invalid transport in config file")?,
                None => TransportKind::default(),
            },
        };

        Ok(MergedConfig {
            server: args
                .server
                .map(String::from)
                .or_else(|| self.server.clone())
                .unwrap_or_else(|| DEFAULT_SERVER.to_string()),
            interface: args
                .interface
                .map(String::from)
                .or_else(|| self.interface.clone())
                .unwrap_or_else(|| DEFAULT_INTERFACE.to_string()),
            transport,
            simulate: args.simulate || self.simulate.unwrap_or(false),
            no_color: args.no_color || self.no_color.unwrap_or(false),
        })
    }
}

/// Values given on the command line, if any
#[derive(Debug, Clone, Copy, Default)]
pub struct ArgOverrides<'a> {
    pub server: Option<&'a str>,
    pub interface: Option<&'a str>,
    pub transport: Option<TransportKind>,
    pub simulate: bool,
    pub no_color: bool,
}

/// Fully resolved configuration after merging CLI args
#[derive(Debug, Clone)]
pub struct MergedConfig {
    pub server: String,
    pub interface: String,
    pub transport: TransportKind,
    pub simulate: bool,
    pub no_color: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file_or_flags() {
        let merged = Config::default()
            .merge_with_args(ArgOverrides::default())
            .unwrap();
        assert_eq!(merged.server, DEFAULT_SERVER);
        assert_eq!(merged.interface, "vcan0");
        assert_eq!(merged.transport, TransportKind::Stream);
        assert!(!merged.simulate);
    }

    #[test]
    fn test_file_values_apply() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "server = \"http://scanner:9000\"\ninterface = \"can1\"\ntransport = \"ws\"\nsimulate = true\n",
        )
        .unwrap();

        let merged = Config::load_from(&path)
            .unwrap()
            .merge_with_args(ArgOverrides::default())
            .unwrap();
        assert_eq!(merged.server, "http://scanner:9000");
        assert_eq!(merged.interface, "can1");
        assert_eq!(merged.transport, TransportKind::Socket);
        assert!(merged.simulate);
    }

    #[test]
    fn test_flags_override_file() {
        let config = Config {
            server: Some("http://scanner:9000".into()),
            interface: Some("can1".into()),
            transport: Some("socket".into()),
            ..Default::default()
        };

        let merged = config
            .merge_with_args(ArgOverrides {
                server: Some("http://localhost:8000"),
                interface: Some("vcan3"),
                transport: Some(TransportKind::Stream),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(merged.server, "http://localhost:8000");
        assert_eq!(merged.interface, "vcan3");
        assert_eq!(merged.transport, TransportKind::Stream);
    }

    #[test]
    fn test_bad_transport_in_file() {
        let config = Config {
            transport: Some("carrier-pigeon".into()),
            ..Default::default()
        };
        assert!(config.merge_with_args(ArgOverrides::default()).is_err());
    }
}
