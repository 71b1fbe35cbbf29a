//! Connector resolution error types.
//!
//! Provides the error hierarchy for table resolution:
//! - `ConnectorError`: Raised while turning a table definition into a spec
//! - `SerdeError`: Raised by record decoders/encoders at the format boundary
//!
//! Every `ConnectorError` displays a stable, user-facing message. The
//! messages are part of the connector's contract and are matched verbatim
//! by callers and tests, so each variant carries the rendered message next
//! to the option names it refers to.

use thiserror::Error;

/// Errors that can occur while resolving a table definition.
///
/// Resolution is atomic: a factory either returns a complete spec or one of
/// these errors. None of them is retryable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectorError {
    /// Two mutually exclusive options are both set.
    #[error("{message}")]
    ConfigurationConflict {
        /// The conflicting option keys.
        options: Vec<String>,
        /// Human-readable message.
        message: String,
    },

    /// A (conditionally) required option is absent.
    #[error("{message}")]
    MissingRequiredOption {
        /// The missing option key(s).
        options: Vec<String>,
        /// Human-readable message.
        message: String,
    },

    /// An option value cannot be parsed or fails its validator.
    #[error("{message}")]
    InvalidValue {
        /// The offending option key.
        option: String,
        /// Human-readable message.
        message: String,
    },

    /// Options that are valid on their own but cannot be combined.
    #[error("{message}")]
    UnsupportedCombination {
        /// Human-readable message.
        message: String,
    },

    /// A named class (e.g. a custom partitioner) could not be instantiated.
    #[error("{message}")]
    InstantiationFailure {
        /// The class name that failed.
        class_name: String,
        /// Human-readable message.
        message: String,
    },

    /// A sink was configured with more than one topic or a topic pattern.
    #[error("{message}")]
    CardinalityViolation {
        /// `topic` or `topic-pattern`.
        option: String,
        /// Human-readable message.
        message: String,
    },

    /// The schema does not match what the options refer to.
    #[error("{message}")]
    SchemaMismatch {
        /// Human-readable message.
        message: String,
    },

    /// No format factory is registered for an identifier.
    #[error("Could not find any format factory for identifier '{identifier}' (requested via option '{option}'). Available factory identifiers are: [{available}]")]
    UnknownFormat {
        /// The requested format identifier.
        identifier: String,
        /// The option that named the format.
        option: String,
        /// Comma-separated registered identifiers.
        available: String,
    },

    /// The option map contains keys no component consumed.
    #[error("Unsupported options found for '{connector}'.\n\nUnsupported options:\n\n{}", .unsupported.join("\n"))]
    UnsupportedOptions {
        /// Connector identifier.
        connector: String,
        /// The unconsumed keys, sorted.
        unsupported: Vec<String>,
    },
}

impl ConnectorError {
    pub(crate) fn conflict(options: &[&str], message: impl Into<String>) -> Self {
        Self::ConfigurationConflict {
            options: options.iter().map(|o| (*o).to_string()).collect(),
            message: message.into(),
        }
    }

    pub(crate) fn missing(options: &[&str], message: impl Into<String>) -> Self {
        Self::MissingRequiredOption {
            options: options.iter().map(|o| (*o).to_string()).collect(),
            message: message.into(),
        }
    }

    pub(crate) fn invalid(option: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            option: option.into(),
            message: message.into(),
        }
    }

    pub(crate) fn unsupported(message: impl Into<String>) -> Self {
        Self::UnsupportedCombination {
            message: message.into(),
        }
    }

    /// Returns the option keys this error refers to, if any.
    #[must_use]
    pub fn option_keys(&self) -> Vec<&str> {
        match self {
            Self::ConfigurationConflict { options, .. }
            | Self::MissingRequiredOption { options, .. } => {
                options.iter().map(String::as_str).collect()
            }
            Self::InvalidValue { option, .. }
            | Self::CardinalityViolation { option, .. }
            | Self::UnknownFormat { option, .. } => vec![option.as_str()],
            Self::UnsupportedOptions { unsupported, .. } => {
                unsupported.iter().map(String::as_str).collect()
            }
            Self::UnsupportedCombination { .. }
            | Self::InstantiationFailure { .. }
            | Self::SchemaMismatch { .. } => Vec::new(),
        }
    }
}

/// Errors raised by record decoders and encoders.
#[derive(Debug, Error)]
pub enum SerdeError {
    /// The input data is malformed.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// A field value could not be converted to the target Arrow type.
    #[error("type conversion error: field '{field}', expected {expected}: {message}")]
    TypeConversion {
        /// The field name.
        field: String,
        /// The expected Arrow data type.
        expected: String,
        /// Details about the conversion failure.
        message: String,
    },

    /// An Arrow error while building or reading a batch.
    #[error("arrow error: {0}")]
    Arrow(#[from] arrow_schema::ArrowError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_is_displayed_verbatim() {
        let err = ConnectorError::conflict(
            &["topic", "topic-pattern"],
            "Option 'topic' and 'topic-pattern' shouldn't be set together.",
        );
        assert_eq!(
            err.to_string(),
            "Option 'topic' and 'topic-pattern' shouldn't be set together."
        );
        assert_eq!(err.option_keys(), vec!["topic", "topic-pattern"]);
    }

    #[test]
    fn test_unsupported_options_display() {
        let err = ConnectorError::UnsupportedOptions {
            connector: "kafka".into(),
            unsupported: vec!["a.b".into(), "c".into()],
        };
        let msg = err.to_string();
        assert!(msg.starts_with("Unsupported options found for 'kafka'."));
        assert!(msg.ends_with("a.b\nc"));
    }

    #[test]
    fn test_unknown_format_display() {
        let err = ConnectorError::UnknownFormat {
            identifier: "protobuf".into(),
            option: "value.format".into(),
            available: "csv, json".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("'protobuf'"));
        assert!(msg.contains("'value.format'"));
        assert!(msg.contains("[csv, json]"));
    }

    #[test]
    fn test_serde_error_from_arrow() {
        let arrow = arrow_schema::ArrowError::SchemaError("bad".into());
        let err: SerdeError = arrow.into();
        assert!(matches!(err, SerdeError::Arrow(_)));
        assert!(err.to_string().contains("bad"));
    }
}
