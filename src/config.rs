//! Construction-time configuration for decorators and loggers
//!
//! All defaults are explicit values carried by these structs; nothing is read
//! from process-wide state. Configurations can be built in code or loaded
//! from TOML:
//!
//! ```toml
//! activated = true
//! name_format = "{module}.{qualname}"
//! logger_utils = ["timer", "memory"]
//! log_format = "cumulative"
//! ```

use crate::error::{DecoError, Result};
use crate::name_format::{NameFormat, DEFAULT_NAME_FORMAT};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Configuration shared by every decorator
///
/// # Example
/// ```
/// use decotrace::DecoratorConfig;
///
/// let config = DecoratorConfig::default();
/// assert!(config.activated);
/// assert_eq!(config.name_format, "{name}");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoratorConfig {
    /// When false, decorated calls pass straight through
    pub activated: bool,

    /// Identity template, see [`crate::name_format`]
    pub name_format: String,
}

impl Default for DecoratorConfig {
    fn default() -> Self {
        Self {
            activated: true,
            name_format: DEFAULT_NAME_FORMAT.to_string(),
        }
    }
}

impl DecoratorConfig {
    /// Deactivated configuration with the default template
    pub fn deactivated() -> Self {
        Self {
            activated: false,
            ..Self::default()
        }
    }

    pub fn with_name_format(mut self, name_format: impl Into<String>) -> Self {
        self.name_format = name_format.into();
        self
    }

    /// Strict validation of the name format
    pub fn validate(&self) -> Result<()> {
        NameFormat::parse_strict(&self.name_format).map(|_| ())
    }

    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: Self = toml::from_str(input).map_err(|e| DecoError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

/// Rendering layout of an aggregating logger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One line per record in arrival order
    #[default]
    Datetime,
    /// Records grouped under their identity
    Function,
    /// One summed line per identity
    Cumulative,
}

impl LogFormat {
    pub const ALL: [LogFormat; 3] = [LogFormat::Datetime, LogFormat::Function, LogFormat::Cumulative];

    pub fn as_str(self) -> &'static str {
        match self {
            LogFormat::Datetime => "datetime",
            LogFormat::Function => "function",
            LogFormat::Cumulative => "cumulative",
        }
    }
}

impl FromStr for LogFormat {
    type Err = DecoError;

    fn from_str(s: &str) -> Result<Self> {
        LogFormat::ALL
            .into_iter()
            .find(|format| format.as_str() == s)
            .ok_or_else(|| {
                DecoError::unknown_format(s, "log_format must be one of datetime, function, cumulative")
            })
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Built-in measurement utilities a logger can connect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UtilityKind {
    Timer,
    Memory,
}

impl UtilityKind {
    /// Every utility the built-in collection knows
    pub const BUILTIN: [UtilityKind; 2] = [UtilityKind::Timer, UtilityKind::Memory];

    pub fn as_str(self) -> &'static str {
        match self {
            UtilityKind::Timer => "timer",
            UtilityKind::Memory => "memory",
        }
    }
}

impl FromStr for UtilityKind {
    type Err = DecoError;

    fn from_str(s: &str) -> Result<Self> {
        UtilityKind::BUILTIN
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| DecoError::unknown_format(s, "logger utility must be timer or memory"))
    }
}

/// Configuration of an aggregating logger
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    #[serde(flatten)]
    pub decorator: DecoratorConfig,

    /// Utilities connected at construction
    pub logger_utils: Vec<UtilityKind>,

    /// Layout used by `generate_logs`
    pub log_format: LogFormat,
}

impl LoggerConfig {
    pub fn with_utils(mut self, utils: impl IntoIterator<Item = UtilityKind>) -> Self {
        self.logger_utils.extend(utils);
        self
    }

    pub fn with_log_format(mut self, log_format: LogFormat) -> Self {
        self.log_format = log_format;
        self
    }

    pub fn with_name_format(mut self, name_format: impl Into<String>) -> Self {
        self.decorator.name_format = name_format.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.decorator.validate()
    }

    /// Load from TOML, then validate strictly
    ///
    /// Unrecognized `log_format` or `logger_utils` names are reported as
    /// `UnknownFormat`; any other malformed input is `InvalidConfig`.
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let table: toml::Table = input.parse().map_err(invalid_config)?;
        check_names::<LogFormat>(table.get("log_format"))?;
        if let Some(toml::Value::Array(utils)) = table.get("logger_utils") {
            for util in utils {
                check_names::<UtilityKind>(Some(util))?;
            }
        }

        let config: Self = toml::Value::Table(table)
            .try_into()
            .map_err(invalid_config)?;
        config.validate()?;
        Ok(config)
    }
}

fn invalid_config(err: impl fmt::Display) -> DecoError {
    DecoError::InvalidConfig(err.to_string())
}

/// Parse a string value through `FromStr` so unknown names keep their error kind
fn check_names<T: FromStr<Err = DecoError>>(value: Option<&toml::Value>) -> Result<()> {
    match value {
        Some(toml::Value::String(name)) => name.parse::<T>().map(|_| ()),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_decorator_config() {
        let config = DecoratorConfig::default();
        assert!(config.activated);
        assert_eq!(config.name_format, "{name}");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_logger_config() {
        let config = LoggerConfig::default();
        assert!(config.logger_utils.is_empty());
        assert_eq!(config.log_format, LogFormat::Datetime);
    }

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("function".parse::<LogFormat>().unwrap(), LogFormat::Function);
        assert_eq!("cumulative".parse::<LogFormat>().unwrap(), LogFormat::Cumulative);
        let err = "per-call".parse::<LogFormat>().unwrap_err();
        assert!(matches!(err, DecoError::UnknownFormat { .. }));
    }

    #[test]
    fn test_utility_kind_from_str() {
        assert_eq!("timer".parse::<UtilityKind>().unwrap(), UtilityKind::Timer);
        assert!("counter".parse::<UtilityKind>().is_err());
    }

    #[test]
    fn test_logger_config_from_toml() {
        let config = LoggerConfig::from_toml_str(
            r#"
            name_format = "{module}.{qualname}"
            logger_utils = ["timer", "memory"]
            log_format = "cumulative"
            "#,
        )
        .unwrap();

        assert!(config.decorator.activated);
        assert_eq!(config.decorator.name_format, "{module}.{qualname}");
        assert_eq!(config.logger_utils, vec![UtilityKind::Timer, UtilityKind::Memory]);
        assert_eq!(config.log_format, LogFormat::Cumulative);
    }

    #[test]
    fn test_toml_empty_uses_defaults() {
        let config = LoggerConfig::from_toml_str("").unwrap();
        assert_eq!(config, LoggerConfig::default());
    }

    #[test]
    fn test_toml_rejects_unknown_log_format() {
        let err = LoggerConfig::from_toml_str(r#"log_format = "weekly""#).unwrap_err();
        assert!(matches!(err, DecoError::UnknownFormat { ref value, .. } if value == "weekly"));
    }

    #[test]
    fn test_toml_rejects_unknown_logger_util() {
        let err = LoggerConfig::from_toml_str(r#"logger_utils = ["timer", "disk"]"#).unwrap_err();
        assert!(matches!(err, DecoError::UnknownFormat { ref value, .. } if value == "disk"));
    }

    #[test]
    fn test_toml_malformed_is_invalid_config() {
        let err = LoggerConfig::from_toml_str("log_format = ").unwrap_err();
        assert!(matches!(err, DecoError::InvalidConfig(_)));

        // Wrong value type is still a shape error
        let err = LoggerConfig::from_toml_str("log_format = 3").unwrap_err();
        assert!(matches!(err, DecoError::InvalidConfig(_)));
    }

    #[test]
    fn test_toml_rejects_bad_name_format() {
        let err = DecoratorConfig::from_toml_str(r#"name_format = "{name}-{pid}""#).unwrap_err();
        assert!(matches!(err, DecoError::UnknownFormat { .. }));
    }

    #[test]
    fn test_deactivated_config() {
        let config = DecoratorConfig::deactivated().with_name_format("{qualname}");
        assert!(!config.activated);
        assert_eq!(config.name_format, "{qualname}");
    }
}
