//! Error taxonomy for decoration, propagation, measurement and rendering
//!
//! Every error is raised synchronously at the site that detects it. Failures
//! produced by a wrapped callable never pass through this type: they are part
//! of the callable's own return value and are handed back untouched.

use thiserror::Error;

/// Errors raised by decorators and their collaborators
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecoError {
    /// Metadata does not describe something a decorator can wrap
    #[error("Invalid decoration target `{target}`: {reason}")]
    InvalidTarget { target: String, reason: String },

    /// Propagation or a call named a member that is not a method
    #[error("Class `{class}` has no method named `{method}`")]
    NoSuchMethod { class: String, method: String },

    /// A clock or memory probe failed to produce a sample
    #[error("Measurement provider `{provider}` unavailable: {reason}")]
    MeasurementUnavailable {
        provider: &'static str,
        reason: String,
    },

    /// Unrecognized name format, log format or utility name
    #[error("Unknown format `{value}`: {reason}")]
    UnknownFormat { value: String, reason: String },

    /// Autoconnect refused because a custom utility is connected
    #[error("Custom utility `{0}` is connected; autoconnect only knows the built-in utilities")]
    CustomUtilityConnected(String),

    /// A hook returned without calling `Call::proceed`
    #[error("Hook for `{identity}` returned without invoking the wrapped callable")]
    TargetNotInvoked { identity: String },

    /// Configuration input could not be parsed
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl DecoError {
    pub(crate) fn unavailable(provider: &'static str, reason: impl Into<String>) -> Self {
        DecoError::MeasurementUnavailable {
            provider,
            reason: reason.into(),
        }
    }

    pub(crate) fn unknown_format(value: impl Into<String>, reason: impl Into<String>) -> Self {
        DecoError::UnknownFormat {
            value: value.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for decorator operations
pub type Result<T> = std::result::Result<T, DecoError>;
