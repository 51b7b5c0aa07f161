//! Configuration management for qrcheckin.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::sheet::SheetLayout;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "qrcheckin";

/// Default local sheet database file name.
const LOCAL_SHEET_FILE_NAME: &str = "attendees.db";

/// Spreadsheet used when none is configured.
pub const DEFAULT_SPREADSHEET_ID: &str = "1fuCMvS_fob8at2RrgESGTYnjIyJL5HCm1Rs-0ZZ_SIw";

/// Entry stamp format, e.g. `09:05 AM, 19 Oct`.
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%I:%M %p, %d %b";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `QRCHECKIN_`)
/// 2. TOML config file at `~/.config/qrcheckin/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Operator account.
    pub operator: OperatorConfig,
    /// Spreadsheet configuration.
    pub sheet: SheetConfig,
    /// Scanner configuration.
    pub scanner: ScannerConfig,
    /// Display configuration.
    pub display: DisplayConfig,
}

/// The single operator account allowed through the login screen.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatorConfig {
    /// Login name.
    pub username: String,
    /// Login password.
    pub password: String,
}

impl std::fmt::Debug for OperatorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperatorConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Where attendee records live.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SheetBackend {
    /// Google Sheets via a service account.
    #[default]
    Google,
    /// Local `SQLite` table with the same layout.
    Local,
}

impl std::fmt::Display for SheetBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Google => write!(f, "google"),
            Self::Local => write!(f, "local"),
        }
    }
}

/// Spreadsheet-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetConfig {
    /// Which backend to use.
    pub backend: SheetBackend,
    /// Google spreadsheet key.
    pub spreadsheet_id: String,
    /// Worksheet (tab) name.
    pub worksheet: String,
    /// Service-account key file.
    pub credentials_path: PathBuf,
    /// HTTP request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Header of the identifier column.
    pub id_header: String,
    /// Header of the name column.
    pub name_header: String,
    /// Header of the registration column.
    pub registration_header: String,
    /// 1-based column holding the entry timestamp.
    pub entry_column: u32,
    /// Path to the local sheet database.
    /// Defaults to `~/.local/share/qrcheckin/attendees.db`
    pub local_path: Option<PathBuf>,
}

/// Scanner-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Camera device index.
    pub device_index: u32,
    /// Preferred frame width.
    pub frame_width: u32,
    /// Preferred frame height.
    pub frame_height: u32,
    /// Preferred frame rate.
    pub fps: u32,
    /// Directory to save annotated frames of successful scans.
    pub snapshot_dir: Option<PathBuf>,
}

/// Display-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// `chrono` format string for entry stamps.
    pub timestamp_format: String,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password: "admin123".to_string(),
        }
    }
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            backend: SheetBackend::Google,
            spreadsheet_id: DEFAULT_SPREADSHEET_ID.to_string(),
            worksheet: "Main".to_string(),
            credentials_path: PathBuf::from("credentials.json"),
            request_timeout_secs: 30,
            id_header: "ID".to_string(),
            name_header: "Name".to_string(),
            registration_header: "Registration".to_string(),
            entry_column: 9,
            local_path: None, // Will be resolved to default at runtime
        }
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            device_index: 0,
            frame_width: 640,
            frame_height: 480,
            fps: 30,
            snapshot_dir: None,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. TOML config file (if exists)
    /// 3. Environment variables (prefixed with `QRCHECKIN_`)
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("QRCHECKIN_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.operator.username.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "operator.username must not be empty".to_string(),
            });
        }

        if self.sheet.entry_column == 0 {
            return Err(Error::ConfigValidation {
                message: "sheet.entry_column must be at least 1".to_string(),
            });
        }

        if self.sheet.request_timeout_secs == 0 {
            return Err(Error::ConfigValidation {
                message: "sheet.request_timeout_secs must be greater than 0".to_string(),
            });
        }

        if self.sheet.id_header.is_empty() {
            return Err(Error::ConfigValidation {
                message: "sheet.id_header must not be empty".to_string(),
            });
        }

        if self.sheet.backend == SheetBackend::Google {
            let id_pattern = regex::Regex::new(r"^[A-Za-z0-9_-]{10,}$")
                .map_err(|e| Error::internal(e.to_string()))?;
            if !id_pattern.is_match(&self.sheet.spreadsheet_id) {
                return Err(Error::ConfigValidation {
                    message: format!(
                        "invalid spreadsheet id: {:?}",
                        self.sheet.spreadsheet_id
                    ),
                });
            }
            if self.sheet.worksheet.is_empty() {
                return Err(Error::ConfigValidation {
                    message: "sheet.worksheet must not be empty".to_string(),
                });
            }
        }

        if self.display.timestamp_format.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "display.timestamp_format must not be empty".to_string(),
            });
        }

        Ok(())
    }

    /// Get the local sheet database path, resolving defaults if not set.
    #[must_use]
    pub fn local_sheet_path(&self) -> PathBuf {
        self.sheet
            .local_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(LOCAL_SHEET_FILE_NAME))
    }

    /// Get the HTTP request timeout as a Duration.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.sheet.request_timeout_secs)
    }

    /// Column layout of the attendee sheet.
    #[must_use]
    pub fn sheet_layout(&self) -> SheetLayout {
        SheetLayout {
            id_header: self.sheet.id_header.clone(),
            name_header: self.sheet.name_header.clone(),
            registration_header: self.sheet.registration_header.clone(),
            entry_column: self.sheet.entry_column,
        }
    }

    /// Camera settings for the configured device.
    #[must_use]
    pub fn capture_settings(&self) -> qrcheckin_camera::CaptureSettings {
        qrcheckin_camera::CaptureSettings {
            index: self.scanner.device_index,
            width: self.scanner.frame_width,
            height: self.scanner.frame_height,
            fps: self.scanner.fps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.operator.username, "admin");
        assert_eq!(config.operator.password, "admin123");
        assert_eq!(config.sheet.backend, SheetBackend::Google);
        assert_eq!(config.sheet.worksheet, "Main");
        assert_eq!(config.sheet.entry_column, 9);
        assert_eq!(config.display.timestamp_format, "%I:%M %p, %d %b");
    }

    #[test]
    fn test_default_scanner_config() {
        let scanner = ScannerConfig::default();

        assert_eq!(scanner.device_index, 0);
        assert_eq!(scanner.frame_width, 640);
        assert_eq!(scanner.frame_height, 480);
        assert!(scanner.snapshot_dir.is_none());
    }

    #[test]
    fn test_validate_valid_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_username() {
        let mut config = Config::default();
        config.operator.username = "  ".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("operator.username"));
    }

    #[test]
    fn test_validate_zero_entry_column() {
        let mut config = Config::default();
        config.sheet.entry_column = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("entry_column"));
    }

    #[test]
    fn test_validate_zero_timeout() {
        let mut config = Config::default();
        config.sheet.request_timeout_secs = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("request_timeout_secs"));
    }

    #[test]
    fn test_validate_bad_spreadsheet_id() {
        let mut config = Config::default();
        config.sheet.spreadsheet_id = "not a key!".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("spreadsheet id"));
    }

    #[test]
    fn test_validate_spreadsheet_id_ignored_for_local_backend() {
        let mut config = Config::default();
        config.sheet.backend = SheetBackend::Local;
        config.sheet.spreadsheet_id = String::new();

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_timestamp_format() {
        let mut config = Config::default();
        config.display.timestamp_format = String::new();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("timestamp_format"));
    }

    #[test]
    fn test_local_sheet_path_default() {
        let config = Config::default();
        let path = config.local_sheet_path();

        assert!(path.to_string_lossy().contains("attendees.db"));
    }

    #[test]
    fn test_local_sheet_path_custom() {
        let mut config = Config::default();
        config.sheet.local_path = Some(PathBuf::from("/srv/event/attendees.db"));

        assert_eq!(
            config.local_sheet_path(),
            PathBuf::from("/srv/event/attendees.db")
        );
    }

    #[test]
    fn test_request_timeout() {
        let config = Config::default();
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_sheet_layout_follows_config() {
        let mut config = Config::default();
        config.sheet.entry_column = 12;
        config.sheet.id_header = "Ticket".to_string();

        let layout = config.sheet_layout();
        assert_eq!(layout.entry_column, 12);
        assert_eq!(layout.id_header, "Ticket");
        assert_eq!(layout.name_header, "Name");
    }

    #[test]
    fn test_capture_settings_follow_config() {
        let mut config = Config::default();
        config.scanner.device_index = 2;

        let settings = config.capture_settings();
        assert_eq!(settings.index, 2);
        assert_eq!(settings.width, 640);
    }

    #[test]
    fn test_operator_debug_redacts_password() {
        let config = OperatorConfig::default();
        let debug_str = format!("{config:?}");
        assert!(debug_str.contains("admin"));
        assert!(!debug_str.contains("admin123"));
    }

    #[test]
    fn test_sheet_backend_display() {
        assert_eq!(SheetBackend::Google.to_string(), "google");
        assert_eq!(SheetBackend::Local.to_string(), "local");
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("qrcheckin"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        figment::Jail::expect_with(|_jail| {
            let config = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml")))
                .expect("defaults load");
            assert_eq!(config, Config::default());
            Ok(())
        });
    }

    #[test]
    fn test_load_from_toml_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "qrcheckin.toml",
                r#"
                [operator]
                username = "door"
                password = "s3cret"

                [sheet]
                backend = "local"
                entry_column = 10
                "#,
            )?;

            let config = Config::load_from(Some(PathBuf::from("qrcheckin.toml")))
                .expect("toml config loads");
            assert_eq!(config.operator.username, "door");
            assert_eq!(config.sheet.backend, SheetBackend::Local);
            assert_eq!(config.sheet.entry_column, 10);
            assert_eq!(config.sheet.worksheet, "Main");
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("qrcheckin.toml", "[sheet]\nworksheet = \"Day1\"\n")?;
            jail.set_env("QRCHECKIN_SHEET__WORKSHEET", "Day2");
            jail.set_env("QRCHECKIN_SCANNER__DEVICE_INDEX", "1");

            let config = Config::load_from(Some(PathBuf::from("qrcheckin.toml")))
                .expect("config loads");
            assert_eq!(config.sheet.worksheet, "Day2");
            assert_eq!(config.scanner.device_index, 1);
            Ok(())
        });
    }

    #[test]
    fn test_invalid_file_fails_validation() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("qrcheckin.toml", "[sheet]\nentry_column = 0\n")?;

            let result = Config::load_from(Some(PathBuf::from("qrcheckin.toml")));
            assert!(matches!(result, Err(Error::ConfigValidation { .. })));
            Ok(())
        });
    }

    #[test]
    fn test_config_serialize() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("spreadsheet_id"));
        assert!(json.contains("\"backend\":\"google\""));
    }
}
