//! Topic selection.
//!
//! A table reads either a literal list of topics or every topic whose name
//! matches a pattern. A sink always writes to exactly one literal topic.

use std::fmt;

use regex::Regex;

use crate::config::{OptionValue, TableOptions};
use crate::error::ConnectorError;
use crate::kafka::options::{TOPIC, TOPIC_PATTERN};

/// A compiled topic-name pattern.
///
/// The pattern must match the whole topic name. Two patterns are equal when
/// their source text is equal.
#[derive(Debug, Clone)]
pub struct TopicPattern {
    source: String,
    regex: Regex,
}

impl TopicPattern {
    /// Compiles a pattern.
    ///
    /// # Errors
    ///
    /// Returns the regex compiler's message if the pattern is invalid.
    pub fn new(source: &str) -> Result<Self, String> {
        let regex = Regex::new(&format!("^(?:{source})$"))
            .map_err(|e| format!("invalid topic pattern '{source}': {e}"))?;
        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    /// Returns the pattern as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Returns `true` if `topic` matches the whole pattern.
    #[must_use]
    pub fn matches(&self, topic: &str) -> bool {
        self.regex.is_match(topic)
    }
}

impl PartialEq for TopicPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for TopicPattern {}

impl fmt::Display for TopicPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl OptionValue for TopicPattern {
    fn parse_value(raw: &str) -> Result<Self, String> {
        Self::new(raw)
    }
}

/// The topics a table reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicSelection {
    /// A literal, non-empty list of topic names.
    Topics(Vec<String>),
    /// Every topic whose name matches the pattern.
    Pattern(TopicPattern),
}

impl TopicSelection {
    /// Resolves the selection from `topic` / `topic-pattern`.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::ConfigurationConflict` if both are set,
    /// `ConnectorError::MissingRequiredOption` if neither is, and
    /// `ConnectorError::InvalidValue` for an invalid pattern.
    pub fn from_options(options: &TableOptions) -> Result<Self, ConnectorError> {
        let topics = options.get_optional(&TOPIC)?;
        let pattern = options.get_optional(&TOPIC_PATTERN)?;
        match (topics, pattern) {
            (Some(_), Some(_)) => Err(ConnectorError::conflict(
                &[TOPIC.key(), TOPIC_PATTERN.key()],
                format!(
                    "Option '{}' and '{}' shouldn't be set together.",
                    TOPIC.key(),
                    TOPIC_PATTERN.key()
                ),
            )),
            (Some(topics), None) if !topics.is_empty() => Ok(Self::Topics(topics)),
            (None, Some(pattern)) => Ok(Self::Pattern(pattern)),
            _ => Err(ConnectorError::missing(
                &[TOPIC.key(), TOPIC_PATTERN.key()],
                format!(
                    "Either '{}' or '{}' must be set.",
                    TOPIC.key(),
                    TOPIC_PATTERN.key()
                ),
            )),
        }
    }

    /// Returns the topic if the selection is exactly one literal topic.
    #[must_use]
    pub fn single_topic(&self) -> Option<&str> {
        match self {
            Self::Topics(topics) if topics.len() == 1 => Some(&topics[0]),
            _ => None,
        }
    }

    /// Returns the single literal topic a sink writes to.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::CardinalityViolation` for a topic list or a
    /// pattern.
    pub fn sink_topic(&self) -> Result<&str, ConnectorError> {
        if let Some(topic) = self.single_topic() {
            return Ok(topic);
        }
        let (option, got) = match self {
            Self::Topics(topics) => (TOPIC.key(), format!("[{}]", topics.join(", "))),
            Self::Pattern(pattern) => (TOPIC_PATTERN.key(), pattern.to_string()),
        };
        Err(ConnectorError::CardinalityViolation {
            option: option.to_string(),
            message: format!(
                "Flink Kafka sink currently only supports single topic, but got '{option}': {got}."
            ),
        })
    }

    /// Returns `true` if a record from `topic` belongs to this selection.
    #[must_use]
    pub fn includes(&self, topic: &str) -> bool {
        match self {
            Self::Topics(topics) => topics.iter().any(|t| t == topic),
            Self::Pattern(pattern) => pattern.matches(topic),
        }
    }
}

impl fmt::Display for TopicSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Topics(topics) => write!(f, "[{}]", topics.join(", ")),
            Self::Pattern(pattern) => write!(f, "pattern '{pattern}'"),
        }
    }
}
