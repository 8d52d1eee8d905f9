//! latinepi Configuration Management
//!
//! Handles configuration from environment variables, config files,
//! and command-line arguments with sensible defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Hybrid extraction settings
    pub extraction: ExtractionConfig,

    /// Result flattening and file output
    pub output: OutputConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_override()
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Apply environment variables on top of the current values (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        // Extraction
        if let Ok(value) = std::env::var("LATINEPI_MIN_CONFIDENCE") {
            self.extraction.min_confidence = parse_threshold("LATINEPI_MIN_CONFIDENCE", &value)?;
        }
        if let Ok(value) = std::env::var("LATINEPI_USE_MORPHOLOGY") {
            self.extraction.use_morphology = parse_bool("LATINEPI_USE_MORPHOLOGY", &value)?;
        }
        if let Ok(value) = std::env::var("LATINEPI_USE_DEPENDENCIES") {
            self.extraction.use_dependencies = parse_bool("LATINEPI_USE_DEPENDENCIES", &value)?;
        }
        if let Ok(value) = std::env::var("LATINEPI_TAGGER") {
            self.extraction.tagger = value.parse()?;
        }

        // Output
        if let Ok(value) = std::env::var("LATINEPI_CONFIDENCE_THRESHOLD") {
            self.output.confidence_threshold =
                parse_threshold("LATINEPI_CONFIDENCE_THRESHOLD", &value)?;
        }

        // Logging
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.logging.level = level;
        }

        Ok(self)
    }

    /// Reject out-of-range thresholds
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_unit_interval("extraction.min_confidence", self.extraction.min_confidence)?;
        check_unit_interval("output.confidence_threshold", self.output.confidence_threshold)?;
        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::MissingRequired("logging.level".to_string()));
        }
        Ok(())
    }
}

/// Hybrid extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Run the morphology phase when the cheap phases leave gaps
    pub use_morphology: bool,

    /// Run the dependency phase for multi-person inscriptions
    pub use_dependencies: bool,

    /// Entities below this confidence are dropped by the orchestrator
    pub min_confidence: f32,

    /// Tagging backend for the optional phases
    pub tagger: TaggerKind,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            use_morphology: true,
            use_dependencies: false,
            min_confidence: 0.5,
            tagger: TaggerKind::Rule,
        }
    }
}

/// Available tagging backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaggerKind {
    /// Built-in lexicon and ending based tagger
    Rule,
    /// No backend; phases 2 and 3 are disabled
    None,
}

impl TaggerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rule => "rule",
            Self::None => "none",
        }
    }
}

impl std::str::FromStr for TaggerKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rule" => Ok(Self::Rule),
            "none" | "off" => Ok(Self::None),
            _ => Err(ConfigError::InvalidValue {
                key: "LATINEPI_TAGGER".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Entities below this confidence are left out of flattened output
    pub confidence_threshold: f32,

    /// Add `<slot>_ambiguous` columns for entities below the threshold
    pub flag_ambiguous: bool,

    /// Output file format
    pub format: OutputFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.5,
            flag_ambiguous: false,
            format: OutputFormat::Json,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            _ => Err(ConfigError::InvalidValue {
                key: "output.format".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

fn parse_threshold(key: &str, value: &str) -> Result<f32, ConfigError> {
    let parsed: f32 = value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })?;
    check_unit_interval(key, parsed)?;
    Ok(parsed)
}

fn check_unit_interval(key: &str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.extraction.use_morphology);
        assert!(!config.extraction.use_dependencies);
        assert_eq!(config.extraction.tagger, TaggerKind::Rule);
        assert_eq!(config.output.format, OutputFormat::Json);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_tagger_kind_parse() {
        assert_eq!("RULE".parse::<TaggerKind>().unwrap(), TaggerKind::Rule);
        assert_eq!("none".parse::<TaggerKind>().unwrap(), TaggerKind::None);
        assert!("cltk".parse::<TaggerKind>().is_err());
    }

    #[test]
    fn test_parse_helpers() {
        assert!(parse_bool("K", "yes").unwrap());
        assert!(!parse_bool("K", "0").unwrap());
        assert!(parse_bool("K", "maybe").is_err());
        assert_eq!(parse_threshold("K", "0.7").unwrap(), 0.7);
        assert!(parse_threshold("K", "1.5").is_err());
        assert!(parse_threshold("K", "high").is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let mut config = AppConfig::default();
        config.output.confidence_threshold = 1.2;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_from_file_partial() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[extraction]\nuse_dependencies = true\ntagger = \"none\"\n\n[output]\nformat = \"csv\""
        )
        .unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert!(config.extraction.use_dependencies);
        assert!(config.extraction.use_morphology);
        assert_eq!(config.extraction.tagger, TaggerKind::None);
        assert_eq!(config.output.format, OutputFormat::Csv);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_from_file_errors() {
        let err = AppConfig::from_file("/nonexistent/latinepi.toml").unwrap_err();
        assert!(matches!(err, ConfigError::FileReadError { .. }));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[extraction\nbroken").unwrap();
        let err = AppConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }
}
