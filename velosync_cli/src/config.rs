//! Layered configuration for the VeloSync CLI
//!
//! Priority: environment variables (`VELOSYNC_` prefix, `__` separator) >
//! TOML config file > defaults. Platform credentials are required and
//! checked once at startup; a missing credential aborts the process before
//! any network call.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use velosync_core::DeviceIdentity;

#[derive(Deserialize, Serialize, Debug, Default, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub zwift: Credentials,

    #[serde(default)]
    pub garmin: Credentials,

    #[serde(default)]
    pub paths: PathsConfig,

    /// Identity written into uploaded activities; defaults to an Edge 530
    #[serde(default)]
    pub device: DeviceIdentity,
}

#[derive(Deserialize, Serialize, Debug, Default, Clone)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct PathsConfig {
    /// Directory for downloaded and transformed temporary files
    pub scratch_dir: PathBuf,
    /// Persisted Garmin session token, reused across runs
    pub token_file: PathBuf,
    /// Location of the FitCSVTool converter JAR
    pub fitcsvtool_jar: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .map(|d| d.join("velosync"))
            .unwrap_or_else(|| PathBuf::from(".velosync"));

        Self {
            scratch_dir: std::env::temp_dir(),
            token_file: data_dir.join("garmin_token.json"),
            fitcsvtool_jar: PathBuf::from("/usr/local/share/velosync/FitCSVTool.jar"),
        }
    }
}

impl AppConfig {
    /// Fail when a required platform credential is missing
    pub fn validate(&self) -> Result<()> {
        for (platform, credentials) in [("zwift", &self.zwift), ("garmin", &self.garmin)] {
            if credentials.username.as_deref().unwrap_or("").is_empty()
                || credentials.password.as_deref().unwrap_or("").is_empty()
            {
                bail!(
                    "Missing required {platform} credentials; set \
                     VELOSYNC_{}__USERNAME and VELOSYNC_{}__PASSWORD or add them \
                     to the config file",
                    platform.to_uppercase(),
                    platform.to_uppercase()
                );
            }
        }
        Ok(())
    }
}

/// Loads configuration from the XDG config path with env overrides
pub struct ConfigManager {
    config_path: PathBuf,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    /// Create a ConfigManager with the default config file path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a ConfigManager with a specific path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    fn default_config_path() -> PathBuf {
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg_config).join("velosync/config.toml");
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("velosync/config.toml")
    }

    /// Load configuration with layered priority: ENV > File > Defaults
    pub fn load(&self) -> Result<AppConfig> {
        let mut figment = Figment::new().merge(Serialized::defaults(AppConfig::default()));

        if self.config_path.exists() {
            figment = figment.merge(Toml::file(&self.config_path));
        }

        figment = figment.merge(Env::prefixed("VELOSYNC_").split("__"));

        figment.extract().context("Failed to load configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fail_credential_validation() {
        let config = AppConfig::default();
        let error = config.validate().unwrap_err();
        assert!(error.to_string().contains("zwift"));
    }

    #[test]
    fn test_complete_credentials_pass_validation() {
        let mut config = AppConfig::default();
        config.zwift.username = Some("rider".into());
        config.zwift.password = Some("secret".into());
        config.garmin.username = Some("rider".into());
        config.garmin.password = Some("secret".into());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_file_layers_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
                [zwift]
                username = "from-file"
                password = "pw"

                [device]
                manufacturer = 1
                product = 3843
                software_version = 26.0
            "#,
        )
        .unwrap();

        let config = ConfigManager::with_path(path).load().expect("config must load");

        assert_eq!(config.zwift.username.as_deref(), Some("from-file"));
        assert_eq!(config.device.product, 3843);
        // Untouched sections keep their defaults.
        assert!(config.garmin.username.is_none());
        assert_eq!(config.paths.scratch_dir, std::env::temp_dir());
    }
}
