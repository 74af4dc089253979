//! Configuration system
//!
//! Files are TOML or RON, picked by extension. Every section has defaults, so a
//! partial file (or no file at all) still yields a usable configuration.

use std::path::Path;

pub use serde::{Deserialize, Serialize};

use crate::foundation::logging::level_filter;
use crate::geometry::Extent2d;

/// Serialized configuration formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Toml,
    Ron,
}

impl Format {
    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(Self::Toml),
            Some("ron") => Ok(Self::Ron),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let format = Format::from_path(path)?;
        let contents = std::fs::read_to_string(path)?;

        match format {
            Format::Toml => toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
            Format::Ron => ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = match Format::from_path(path)? {
            Format::Toml => {
                toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
            }
            Format::Ron => ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?,
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LumosConfig {
    /// Window settings
    pub window: WindowConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config for LumosConfig {}

/// Window settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Window title
    pub title: String,
    /// Width in pixels
    pub width: i16,
    /// Height in pixels
    pub height: i16,
    /// Display to connect to, `None` for the environment default
    pub display: Option<String>,
}

impl WindowConfig {
    /// Requested window extent
    pub const fn extent(&self) -> Extent2d {
        Extent2d::new(self.width, self.height)
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Lumos".to_string(),
            width: 1280,
            height: 720,
            display: None,
        }
    }
}

impl Config for WindowConfig {}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    pub level: String,
}

impl LoggingConfig {
    /// Parsed level, `Info` when unrecognized
    pub fn filter(&self) -> log::LevelFilter {
        level_filter(&self.level)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("lumos-{}-{name}", std::process::id()))
    }

    #[test]
    fn test_defaults() {
        let config = LumosConfig::default();
        assert_eq!(config.window.title, "Lumos");
        assert_eq!(config.window.extent(), Extent2d::new(1280, 720));
        assert_eq!(config.window.display, None);
        assert_eq!(config.logging.filter(), log::LevelFilter::Info);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: LumosConfig = toml::from_str(
            r#"
            [window]
            title = "Spinning cube"
            width = 640
            "#,
        )
        .unwrap();

        assert_eq!(config.window.title, "Spinning cube");
        assert_eq!(config.window.width, 640);
        assert_eq!(config.window.height, 720);
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_ron_parsing() {
        let config: LumosConfig = ron::from_str(
            r#"(window: (width: 320, height: 240, display: Some(":1")), logging: (level: "debug"))"#,
        )
        .unwrap();

        assert_eq!(config.window.extent(), Extent2d::new(320, 240));
        assert_eq!(config.window.display.as_deref(), Some(":1"));
        assert_eq!(config.logging.filter(), log::LevelFilter::Debug);
    }

    #[test]
    fn test_toml_file_round_trip() {
        let path = temp_path("config.toml");
        let mut config = LumosConfig::default();
        config.window.title = "saved".to_string();
        config.logging.level = "warn".to_string();

        config.save_to_file(&path).unwrap();
        let loaded = LumosConfig::load_from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_ron_file_round_trip() {
        let path = temp_path("window.ron");
        let config = WindowConfig {
            width: 100,
            height: 50,
            ..WindowConfig::default()
        };

        config.save_to_file(&path).unwrap();
        let loaded = WindowConfig::load_from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_unsupported_format() {
        let err = LumosConfig::default().save_to_file("settings.json").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat(_)));

        let err = LumosConfig::load_from_file("settings").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = LumosConfig::load_from_file(temp_path("missing.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let path = temp_path("broken.toml");
        std::fs::write(&path, "[window\nwidth = ").unwrap();
        let err = LumosConfig::load_from_file(&path).unwrap_err();
        std::fs::remove_file(&path).ok();

        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
