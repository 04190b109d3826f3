use std::fmt::Display;

use crate::domain::DomainParseError;

/// Error raised while binding options to a filter or while preparing it against a concrete
/// [`PointLayout`](crate::layout::PointLayout). A filter that returns this error has not touched any point.
///
/// Filter operations return `anyhow::Result`; use `downcast_ref::<ConfigurationError>()` to tell a
/// configuration problem apart from a failure while processing points.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    /// An option has a value outside of its valid range
    InvalidOption { option: String, reason: String },
    /// A required option was not given
    MissingOption { option: String },
    /// A dimension name in an option could not be resolved against the layout
    UnknownDimension { option: String, name: String },
    /// A domain range text could not be parsed
    InvalidDomain {
        option: String,
        source: DomainParseError,
    },
    /// No filter is registered under the given name
    UnknownFilter { name: String },
}

impl ConfigurationError {
    pub fn invalid_option<S: Into<String>>(option: &str, reason: S) -> Self {
        Self::InvalidOption {
            option: option.to_owned(),
            reason: reason.into(),
        }
    }

    pub fn unknown_dimension(option: &str, name: &str) -> Self {
        Self::UnknownDimension {
            option: option.to_owned(),
            name: name.to_owned(),
        }
    }
}

impl Display for ConfigurationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigurationError::InvalidOption { option, reason } => {
                write!(f, "Invalid '{}' option: {}", option, reason)
            }
            ConfigurationError::MissingOption { option } => {
                write!(f, "Missing required option '{}'", option)
            }
            ConfigurationError::UnknownDimension { option, name } => {
                write!(f, "Invalid dimension name in '{}' option: '{}'", option, name)
            }
            ConfigurationError::InvalidDomain { option, source } => {
                write!(f, "Invalid '{}' option: {}", option, source)
            }
            ConfigurationError::UnknownFilter { name } => {
                write!(f, "No filter named '{}' is registered", name)
            }
        }
    }
}

impl std::error::Error for ConfigurationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigurationError::InvalidDomain { source, .. } => Some(source),
            _ => None,
        }
    }
}
