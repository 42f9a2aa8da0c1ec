// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration loading from YAML, TOML or JSON files.

use std::fs;
use std::path::Path;

use crate::error::{ConfigError, ConfigResult};
use crate::schema::GatewayConfig;

// =============================================================================
// ConfigFormat
// =============================================================================

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML format (`.yaml`, `.yml`).
    Yaml,
    /// TOML format (`.toml`).
    Toml,
    /// JSON format (`.json`).
    Json,
}

impl ConfigFormat {
    /// Determines the format from a file path's extension.
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match ext.as_deref() {
            Some("yaml") | Some("yml") => Ok(Self::Yaml),
            Some("toml") => Ok(Self::Toml),
            Some("json") => Ok(Self::Json),
            Some(other) => Err(ConfigError::UnsupportedFormat(other.to_string())),
            None => Err(ConfigError::UnsupportedFormat("(no extension)".to_string())),
        }
    }
}

// =============================================================================
// Loading
// =============================================================================

/// Loads and validates a configuration file.
pub fn load(path: impl AsRef<Path>) -> ConfigResult<GatewayConfig> {
    let path = path.as_ref();
    let format = ConfigFormat::from_path(path)?;

    let content = fs::read_to_string(path).map_err(|e| ConfigError::read(path, e))?;

    let config = load_from_str(&content, format)?;
    config.validate()?;

    tracing::debug!(path = %path.display(), buses = config.buses.len(), "loaded gateway config");

    Ok(config)
}

/// Parses configuration content in the given format, without validation.
pub fn load_from_str(content: &str, format: ConfigFormat) -> ConfigResult<GatewayConfig> {
    match format {
        ConfigFormat::Yaml => {
            serde_yaml::from_str(content).map_err(|e| ConfigError::parse(e.to_string()))
        }
        ConfigFormat::Toml => {
            toml::from_str(content).map_err(|e| ConfigError::parse(e.to_string()))
        }
        ConfigFormat::Json => {
            serde_json::from_str(content).map_err(|e| ConfigError::parse(e.to_string()))
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{BusRoleConfig, IoTypeConfig};
    use std::io::Write;

    const YAML: &str = r#"
gateway:
  tick_interval: 2s
buses:
  - id: bus-1
    role: client
    port: /dev/ttyUSB0
    baud: 19200
    ios:
      - id: boiler-temp
        unit_id: 3
        address: 16
        io_type: holdingRegister
        data_format: uint16
        scale: 0.1
"#;

    #[test]
    fn test_yaml_round_trip() {
        let config = load_from_str(YAML, ConfigFormat::Yaml).unwrap();
        config.validate().unwrap();

        assert_eq!(config.gateway.tick_interval.as_secs(), 2);
        assert_eq!(config.buses.len(), 1);

        let bus = &config.buses[0];
        assert_eq!(bus.role, BusRoleConfig::Client);
        assert_eq!(bus.baud, 19200);
        assert_eq!(bus.ios[0].io_type, IoTypeConfig::HoldingRegister);
        assert_eq!(bus.ios[0].scale, 0.1);
    }

    #[test]
    fn test_toml_parses() {
        let toml = r#"
[gateway]
tick_interval = "1s"

[[buses]]
id = "bus-1"
role = "server"
port = "/dev/ttyUSB1"
unit_id = 7

[[buses.ios]]
id = "state"
address = 32
io_type = "holdingRegister"
data_format = "int16"
"#;
        let config = load_from_str(toml, ConfigFormat::Toml).unwrap();
        config.validate().unwrap();
        assert_eq!(config.buses[0].unit_id, Some(7));
        assert_eq!(config.buses[0].baud, 9600);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let yaml = "gateway:\n  tick_interval: 1s\n  workers: 4\n";
        assert!(matches!(
            load_from_str(yaml, ConfigFormat::Yaml),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            ConfigFormat::from_path(Path::new("gw.yaml")).unwrap(),
            ConfigFormat::Yaml
        );
        assert_eq!(
            ConfigFormat::from_path(Path::new("gw.yml")).unwrap(),
            ConfigFormat::Yaml
        );
        assert_eq!(
            ConfigFormat::from_path(Path::new("gw.toml")).unwrap(),
            ConfigFormat::Toml
        );
        assert_eq!(
            ConfigFormat::from_path(Path::new("gw.json")).unwrap(),
            ConfigFormat::Json
        );
        assert!(ConfigFormat::from_path(Path::new("gw.ini")).is_err());
        assert!(ConfigFormat::from_path(Path::new("gw")).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".yaml")
            .tempfile()
            .unwrap();
        file.write_all(YAML.as_bytes()).unwrap();

        let config = load(file.path()).unwrap();
        assert_eq!(config.buses.len(), 1);
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = load("/nonexistent/gw.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_invalid_config_rejected_on_load() {
        let mut file = tempfile::Builder::new()
            .suffix(".yaml")
            .tempfile()
            .unwrap();
        // Server bus without a unit id.
        file.write_all(b"buses:\n  - id: b\n    role: server\n    port: /dev/x\n")
            .unwrap();

        assert!(matches!(
            load(file.path()).unwrap_err(),
            ConfigError::Validation { .. }
        ));
    }
}
