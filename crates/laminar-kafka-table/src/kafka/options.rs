//! Kafka table option catalogue.
//!
//! Every option the Kafka connector recognises is declared once here as a
//! typed [`ConfigOption`]. Resolvers read options only through these
//! constants.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::config::{ConfigKeySpec, ConfigOption, OptionValue};
use crate::kafka::sink_config::DeliveryGuarantee;
use crate::kafka::startup::StartupMode;
use crate::kafka::topic::TopicPattern;

/// Prefix of broker client properties passed through to the resolved table.
pub const PROPERTIES_PREFIX: &str = "properties.";

/// Prefix of value format options when declared via `value.format`.
pub const VALUE_PREFIX: &str = "value.";

/// Prefix of key format options.
pub const KEY_PREFIX: &str = "key.";

// ── Common options ──

/// Connector identifier, must be `kafka`.
pub const CONNECTOR: ConfigOption<String> =
    ConfigOption::new("connector", "Connector identifier, must be 'kafka'");

/// Topic names, separated by semicolon.
pub const TOPIC: ConfigOption<Vec<String>> = ConfigOption::new(
    "topic",
    "Topic names from which the table is read, or the single topic written to",
);

/// Topic name regular expression.
pub const TOPIC_PATTERN: ConfigOption<TopicPattern> = ConfigOption::new(
    "topic-pattern",
    "Regular expression of topic names to read from; exclusive with 'topic'",
);

/// Broker addresses.
pub const PROPS_BOOTSTRAP_SERVERS: ConfigOption<String> = ConfigOption::new(
    "properties.bootstrap.servers",
    "Comma-separated list of Kafka brokers",
);

/// Consumer group id.
pub const PROPS_GROUP_ID: ConfigOption<String> = ConfigOption::new(
    "properties.group.id",
    "Consumer group id; enables committing offsets on checkpoint",
);

// ── Format options ──

/// Connector-wide value format (options under `<identifier>.`).
pub const FORMAT: ConfigOption<String> = ConfigOption::new(
    "format",
    "Format of the record value; exclusive with 'value.format'",
);

/// Value format (options under `value.<identifier>.`).
pub const VALUE_FORMAT: ConfigOption<String> =
    ConfigOption::new("value.format", "Format of the record value");

/// Key format (options under `key.<identifier>.`).
pub const KEY_FORMAT: ConfigOption<String> =
    ConfigOption::new("key.format", "Format of the record key");

/// Physical columns encoded in the record key, in key order.
pub const KEY_FIELDS: ConfigOption<Vec<String>> = ConfigOption::new(
    "key.fields",
    "Semicolon-separated physical columns stored in the record key",
);

/// Prefix every key field carries in the table schema.
pub const KEY_FIELDS_PREFIX: ConfigOption<String> = ConfigOption::new(
    "key.fields-prefix",
    "Prefix of key field names, stripped before the key format sees them",
);

/// Which physical columns the value format sees.
pub const VALUE_FIELDS_INCLUDE: ConfigOption<ValueFieldsStrategy> = ConfigOption::new(
    "value.fields-include",
    "Whether the value includes all physical columns or all except key columns",
)
.with_default("ALL");

// ── Scan options ──

/// Startup mode of the consumer.
pub const SCAN_STARTUP_MODE: ConfigOption<StartupMode> =
    ConfigOption::new("scan.startup.mode", "Startup mode for the Kafka consumer")
        .with_default("group-offsets");

/// Per-partition offsets for `specific-offsets` mode.
pub const SCAN_STARTUP_SPECIFIC_OFFSETS: ConfigOption<String> = ConfigOption::new(
    "scan.startup.specific-offsets",
    "Offsets per partition, e.g. 'partition:0,offset:42;partition:1,offset:300'",
);

/// Start timestamp for `timestamp` mode.
pub const SCAN_STARTUP_TIMESTAMP_MILLIS: ConfigOption<i64> = ConfigOption::new(
    "scan.startup.timestamp-millis",
    "Epoch milliseconds to start from in 'timestamp' mode",
);

/// Interval of dynamic partition discovery.
pub const SCAN_TOPIC_PARTITION_DISCOVERY: ConfigOption<Duration> = ConfigOption::new(
    "scan.topic-partition-discovery.interval",
    "Interval for the consumer to discover new partitions",
);

// ── Sink options ──

/// Output partitioning strategy.
pub const SINK_PARTITIONER: ConfigOption<String> = ConfigOption::new(
    "sink.partitioner",
    "'default', 'fixed', 'round-robin' or the name of a registered partitioner",
)
.with_default("default")
.with_validator(non_empty_partitioner);

/// Delivery guarantee of the sink.
pub const SINK_DELIVERY_GUARANTEE: ConfigOption<DeliveryGuarantee> = ConfigOption::new(
    "sink.delivery-guarantee",
    "'at-least-once', 'exactly-once' or 'none'",
);

/// Legacy spelling of the delivery guarantee.
pub const SINK_SEMANTIC: ConfigOption<DeliveryGuarantee> = ConfigOption::new(
    "sink.semantic",
    "Deprecated, use 'sink.delivery-guarantee'",
)
.with_default("at-least-once");

/// Prefix of transactional ids.
pub const TRANSACTIONAL_ID_PREFIX: ConfigOption<String> = ConfigOption::new(
    "sink.transactional-id-prefix",
    "Prefix of producer transactional ids, required for exactly-once",
);

/// Parallelism of the sink operator.
pub const SINK_PARALLELISM: ConfigOption<u32> =
    ConfigOption::new("sink.parallelism", "Parallelism of the sink operator")
        .with_validator(positive_parallelism);

/// Maximum buffered rows before a flush.
pub const SINK_BUFFER_FLUSH_MAX_ROWS: ConfigOption<usize> = ConfigOption::new(
    "sink.buffer-flush.max-rows",
    "Maximum number of buffered rows before flushing, 0 disables buffering",
)
.with_default("0");

/// Flush interval of buffered rows.
pub const SINK_BUFFER_FLUSH_INTERVAL: ConfigOption<Duration> = ConfigOption::new(
    "sink.buffer-flush.interval",
    "Flush interval of buffered rows, 0 disables buffering",
)
.with_default("0 ms");

#[allow(clippy::ptr_arg)]
fn non_empty_partitioner(value: &String) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!(
            "Option '{}' should be a non-empty string.",
            SINK_PARTITIONER.key()
        ))
    } else {
        Ok(())
    }
}

fn positive_parallelism(value: &u32) -> Result<(), String> {
    if *value == 0 {
        Err(format!(
            "Invalid value for option '{}': parallelism must be greater than 0",
            SINK_PARALLELISM.key()
        ))
    } else {
        Ok(())
    }
}

/// Keys of every connector option, used for unsupported-option detection.
#[must_use]
pub fn connector_option_keys() -> BTreeSet<String> {
    option_specs().into_iter().map(|spec| spec.key).collect()
}

/// Documentation of every connector option.
#[must_use]
pub fn option_specs() -> Vec<ConfigKeySpec> {
    vec![
        CONNECTOR.spec(true),
        TOPIC.spec(false),
        TOPIC_PATTERN.spec(false),
        PROPS_BOOTSTRAP_SERVERS.spec(true),
        PROPS_GROUP_ID.spec(false),
        FORMAT.spec(false),
        VALUE_FORMAT.spec(false),
        KEY_FORMAT.spec(false),
        KEY_FIELDS.spec(false),
        KEY_FIELDS_PREFIX.spec(false),
        VALUE_FIELDS_INCLUDE.spec(false),
        SCAN_STARTUP_MODE.spec(false),
        SCAN_STARTUP_SPECIFIC_OFFSETS.spec(false),
        SCAN_STARTUP_TIMESTAMP_MILLIS.spec(false),
        SCAN_TOPIC_PARTITION_DISCOVERY.spec(false),
        SINK_PARTITIONER.spec(false),
        SINK_DELIVERY_GUARANTEE.spec(false),
        SINK_SEMANTIC.spec(false),
        TRANSACTIONAL_ID_PREFIX.spec(false),
        SINK_PARALLELISM.spec(false),
        SINK_BUFFER_FLUSH_MAX_ROWS.spec(false),
        SINK_BUFFER_FLUSH_INTERVAL.spec(false),
    ]
}

/// Which physical columns the value format sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueFieldsStrategy {
    /// Every physical column, including key columns.
    #[default]
    All,
    /// Every physical column except key columns.
    ExceptKey,
}

impl FromStr for ValueFieldsStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "all" => Ok(Self::All),
            "except_key" => Ok(Self::ExceptKey),
            other => Err(format!(
                "unknown value fields strategy: '{other}' (expected 'ALL' or 'EXCEPT_KEY')"
            )),
        }
    }
}

impl fmt::Display for ValueFieldsStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "ALL"),
            Self::ExceptKey => write!(f, "EXCEPT_KEY"),
        }
    }
}

impl OptionValue for ValueFieldsStrategy {
    fn parse_value(raw: &str) -> Result<Self, String> {
        raw.parse()
    }
}
