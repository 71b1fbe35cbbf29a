//! Kafka sink delivery settings.
//!
//! Resolves the delivery guarantee (with its transactional-id prefix) and
//! the buffer-flush mode of a sink from the table options.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::config::{OptionValue, TableOptions};
use crate::error::ConnectorError;
use crate::kafka::options::{
    SINK_BUFFER_FLUSH_INTERVAL, SINK_BUFFER_FLUSH_MAX_ROWS, SINK_DELIVERY_GUARANTEE,
    SINK_SEMANTIC, TRANSACTIONAL_ID_PREFIX,
};

/// Delivery guarantee level for the Kafka sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryGuarantee {
    /// At-least-once: records are flushed on checkpoint, no transactions.
    #[default]
    AtLeastOnce,
    /// Exactly-once: transactional producer committing on checkpoint.
    ExactlyOnce,
    /// No guarantee: records may be lost on failure.
    None,
}

impl DeliveryGuarantee {
    /// Resolves the guarantee: `sink.delivery-guarantee`, else the legacy
    /// `sink.semantic`, else at-least-once.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::InvalidValue` for an unknown value.
    pub fn from_options(options: &TableOptions) -> Result<Self, ConnectorError> {
        if let Some(guarantee) = options.get_optional(&SINK_DELIVERY_GUARANTEE)? {
            return Ok(guarantee);
        }
        Ok(options.get_or_default(&SINK_SEMANTIC)?.unwrap_or_default())
    }
}

impl FromStr for DeliveryGuarantee {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "at-least-once" | "atleastonce" => Ok(Self::AtLeastOnce),
            "exactly-once" | "exactlyonce" => Ok(Self::ExactlyOnce),
            "none" => Ok(Self::None),
            other => Err(format!(
                "unknown delivery guarantee: '{other}' (expected 'at-least-once', 'exactly-once' or 'none')"
            )),
        }
    }
}

impl fmt::Display for DeliveryGuarantee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AtLeastOnce => write!(f, "at-least-once"),
            Self::ExactlyOnce => write!(f, "exactly-once"),
            Self::None => write!(f, "none"),
        }
    }
}

impl OptionValue for DeliveryGuarantee {
    fn parse_value(raw: &str) -> Result<Self, String> {
        raw.parse()
    }
}

/// Reads `sink.transactional-id-prefix`, which exactly-once requires.
///
/// # Errors
///
/// Returns `ConnectorError::MissingRequiredOption` if the guarantee is
/// exactly-once and the prefix is absent or blank.
pub fn transactional_id_prefix(
    options: &TableOptions,
    guarantee: DeliveryGuarantee,
) -> Result<Option<String>, ConnectorError> {
    let prefix = options
        .get_optional(&TRANSACTIONAL_ID_PREFIX)?
        .filter(|p| !p.trim().is_empty());
    if guarantee == DeliveryGuarantee::ExactlyOnce && prefix.is_none() {
        return Err(ConnectorError::missing(
            &[TRANSACTIONAL_ID_PREFIX.key()],
            format!(
                "{} must be specified when using DeliveryGuarantee.EXACTLY_ONCE.",
                TRANSACTIONAL_ID_PREFIX.key()
            ),
        ));
    }
    Ok(prefix)
}

/// Sink buffering: rows are flushed after `batch_size` rows or `interval`,
/// whichever comes first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkBufferFlushMode {
    /// Maximum buffered rows.
    pub batch_size: usize,
    /// Maximum time rows stay buffered.
    pub interval: Duration,
}

impl SinkBufferFlushMode {
    /// Buffering disabled.
    pub const DISABLED: Self = Self {
        batch_size: 0,
        interval: Duration::ZERO,
    };

    /// Returns `true` if buffering is enabled.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.batch_size > 0 && !self.interval.is_zero()
    }

    /// Resolves the buffer-flush mode.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::ConfigurationConflict` unless both options
    /// are greater than zero or both are zero.
    pub fn from_options(options: &TableOptions) -> Result<Self, ConnectorError> {
        let batch_size = options
            .get_or_default(&SINK_BUFFER_FLUSH_MAX_ROWS)?
            .unwrap_or_default();
        let interval = options
            .get_or_default(&SINK_BUFFER_FLUSH_INTERVAL)?
            .unwrap_or_default();
        let mode = Self {
            batch_size,
            interval,
        };
        if mode.is_enabled() || mode == Self::DISABLED {
            return Ok(mode);
        }
        Err(ConnectorError::conflict(
            &[SINK_BUFFER_FLUSH_MAX_ROWS.key(), SINK_BUFFER_FLUSH_INTERVAL.key()],
            format!(
                "'{}' and '{}' must be set to be greater than zero together to enable sink buffer flushing.",
                SINK_BUFFER_FLUSH_MAX_ROWS.key(),
                SINK_BUFFER_FLUSH_INTERVAL.key()
            ),
        ))
    }
}

impl Default for SinkBufferFlushMode {
    fn default() -> Self {
        Self::DISABLED
    }
}
