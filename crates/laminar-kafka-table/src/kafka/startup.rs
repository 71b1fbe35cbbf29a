//! Consumer startup position.
//!
//! [`StartupOffsets`] is where a source starts reading when it has no
//! restored state. It is resolved from `scan.startup.mode` and the offset or
//! timestamp option that mode requires.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use tracing::{debug, warn};

use crate::config::{OptionValue, TableOptions};
use crate::error::ConnectorError;
use crate::kafka::options::{
    SCAN_STARTUP_MODE, SCAN_STARTUP_SPECIFIC_OFFSETS, SCAN_STARTUP_TIMESTAMP_MILLIS,
};
use crate::kafka::topic::TopicSelection;

/// Value of `scan.startup.mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartupMode {
    /// Start from the earliest available offset.
    EarliestOffset,
    /// Start from the latest offset.
    LatestOffset,
    /// Start from the committed offsets of the consumer group.
    #[default]
    GroupOffsets,
    /// Start from user-supplied offsets per partition.
    SpecificOffsets,
    /// Start from the first record at or after a timestamp.
    Timestamp,
}

impl FromStr for StartupMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "earliest-offset" => Ok(Self::EarliestOffset),
            "latest-offset" => Ok(Self::LatestOffset),
            "group-offsets" => Ok(Self::GroupOffsets),
            "specific-offsets" => Ok(Self::SpecificOffsets),
            "timestamp" => Ok(Self::Timestamp),
            other => Err(format!(
                "unknown startup mode: '{other}' (expected 'earliest-offset', 'latest-offset', \
                 'group-offsets', 'specific-offsets' or 'timestamp')"
            )),
        }
    }
}

impl fmt::Display for StartupMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EarliestOffset => write!(f, "earliest-offset"),
            Self::LatestOffset => write!(f, "latest-offset"),
            Self::GroupOffsets => write!(f, "group-offsets"),
            Self::SpecificOffsets => write!(f, "specific-offsets"),
            Self::Timestamp => write!(f, "timestamp"),
        }
    }
}

impl OptionValue for StartupMode {
    fn parse_value(raw: &str) -> Result<Self, String> {
        raw.parse()
    }
}

/// A partition of a topic.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TopicPartition {
    /// Topic name.
    pub topic: String,
    /// Partition number.
    pub partition: i32,
}

impl TopicPartition {
    /// Creates a topic partition.
    #[must_use]
    pub fn new(topic: impl Into<String>, partition: i32) -> Self {
        Self {
            topic: topic.into(),
            partition,
        }
    }
}

impl fmt::Display for TopicPartition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.topic, self.partition)
    }
}

/// Resolved startup position of a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupOffsets {
    /// Earliest available offset.
    Earliest,
    /// Latest offset.
    Latest,
    /// Committed consumer group offsets.
    GroupOffsets,
    /// Explicit offsets per partition of the single source topic.
    SpecificOffsets(BTreeMap<TopicPartition, i64>),
    /// Epoch milliseconds.
    Timestamp(i64),
}

impl StartupOffsets {
    /// Resolves the startup position.
    ///
    /// Offset and timestamp options are ignored unless the mode needs them.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::MissingRequiredOption` if the mode's option
    /// is absent, `ConnectorError::UnsupportedCombination` for specific
    /// offsets on anything but a single topic, and
    /// `ConnectorError::InvalidValue` for malformed offsets.
    pub fn from_options(
        options: &TableOptions,
        topics: &TopicSelection,
    ) -> Result<Self, ConnectorError> {
        let mode = options
            .get_or_default(&SCAN_STARTUP_MODE)?
            .unwrap_or_default();

        if mode != StartupMode::SpecificOffsets && options.contains(SCAN_STARTUP_SPECIFIC_OFFSETS.key())
        {
            warn!(
                mode = %mode,
                option = SCAN_STARTUP_SPECIFIC_OFFSETS.key(),
                "ignoring startup option not used by this startup mode"
            );
        }
        if mode != StartupMode::Timestamp && options.contains(SCAN_STARTUP_TIMESTAMP_MILLIS.key()) {
            warn!(
                mode = %mode,
                option = SCAN_STARTUP_TIMESTAMP_MILLIS.key(),
                "ignoring startup option not used by this startup mode"
            );
        }

        let offsets = match mode {
            StartupMode::EarliestOffset => Self::Earliest,
            StartupMode::LatestOffset => Self::Latest,
            StartupMode::GroupOffsets => Self::GroupOffsets,
            StartupMode::Timestamp => {
                let millis = options
                    .get_optional(&SCAN_STARTUP_TIMESTAMP_MILLIS)?
                    .ok_or_else(|| missing_for_mode(SCAN_STARTUP_TIMESTAMP_MILLIS.key(), mode))?;
                Self::Timestamp(millis)
            }
            StartupMode::SpecificOffsets => {
                let raw = options
                    .get(SCAN_STARTUP_SPECIFIC_OFFSETS.key())
                    .ok_or_else(|| missing_for_mode(SCAN_STARTUP_SPECIFIC_OFFSETS.key(), mode))?;
                let topic = topics.single_topic().ok_or_else(|| {
                    ConnectorError::unsupported(
                        "Currently Kafka source only supports specific offset for single topic.",
                    )
                })?;
                let offsets = parse_specific_offsets(raw)?
                    .into_iter()
                    .map(|(partition, offset)| (TopicPartition::new(topic, partition), offset))
                    .collect();
                Self::SpecificOffsets(offsets)
            }
        };

        debug!(mode = %mode, "resolved startup offsets");
        Ok(offsets)
    }

    /// Returns the mode this position was resolved from.
    #[must_use]
    pub fn mode(&self) -> StartupMode {
        match self {
            Self::Earliest => StartupMode::EarliestOffset,
            Self::Latest => StartupMode::LatestOffset,
            Self::GroupOffsets => StartupMode::GroupOffsets,
            Self::SpecificOffsets(_) => StartupMode::SpecificOffsets,
            Self::Timestamp(_) => StartupMode::Timestamp,
        }
    }
}

fn missing_for_mode(key: &str, mode: StartupMode) -> ConnectorError {
    ConnectorError::missing(
        &[key],
        format!("'{key}' is required in '{mode}' startup mode but missing."),
    )
}

/// Parses `partition:0,offset:42;partition:1,offset:300` into a partition to
/// offset map.
///
/// # Errors
///
/// Returns `ConnectorError::InvalidValue` if any entry is malformed.
pub fn parse_specific_offsets(raw: &str) -> Result<BTreeMap<i32, i64>, ConnectorError> {
    let key = SCAN_STARTUP_SPECIFIC_OFFSETS.key();
    let malformed = || {
        ConnectorError::invalid(
            key,
            format!(
                "Invalid properties '{key}' should follow the format \
                 'partition:0,offset:42;partition:1,offset:300', but is '{raw}'."
            ),
        )
    };

    let mut offsets = BTreeMap::new();
    for pair in raw.split(';').filter(|p| !p.trim().is_empty()) {
        let (partition, offset) = pair.split_once(',').ok_or_else(malformed)?;
        let partition: i32 = partition
            .trim()
            .strip_prefix("partition:")
            .and_then(|p| p.trim().parse().ok())
            .ok_or_else(malformed)?;
        let offset: i64 = offset
            .trim()
            .strip_prefix("offset:")
            .and_then(|o| o.trim().parse().ok())
            .ok_or_else(malformed)?;
        offsets.insert(partition, offset);
    }
    if offsets.is_empty() {
        return Err(malformed());
    }
    Ok(offsets)
}
