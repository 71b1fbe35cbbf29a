//! Kafka table factory.
//!
//! Turns a [`ResolvedTable`] into a [`SourceSpec`] or [`SinkSpec`]. Each
//! resolution is a single pass over the options: validate the connector
//! options, discover the formats, resolve the path-specific settings, then
//! compute projections and metadata. The first violated rule fails the
//! whole resolution.

use std::collections::BTreeSet;

use tracing::info;

use crate::config::{ConfigKeySpec, TableOptions};
use crate::error::ConnectorError;
use crate::format::{FormatHandle, MetadataAccess};
use crate::kafka::metadata::MetadataKeys;
use crate::kafka::options::{
    connector_option_keys, option_specs, CONNECTOR, FORMAT, KEY_FORMAT, KEY_PREFIX,
    PROPERTIES_PREFIX, PROPS_BOOTSTRAP_SERVERS, SCAN_TOPIC_PARTITION_DISCOVERY, SINK_PARALLELISM,
    VALUE_FORMAT, VALUE_PREFIX,
};
use crate::kafka::partitioner::{PartitionerRegistry, SinkPartitioner};
use crate::kafka::projection::{key_prefix, ProjectionIndices};
use crate::kafka::sink::SinkSpec;
use crate::kafka::sink_config::{transactional_id_prefix, DeliveryGuarantee, SinkBufferFlushMode};
use crate::kafka::source::SourceSpec;
use crate::kafka::startup::StartupOffsets;
use crate::kafka::subject::autocomplete_subjects;
use crate::kafka::topic::TopicSelection;
use crate::kafka::IDENTIFIER;
use crate::registry::FormatRegistry;
use crate::schema::ResolvedTable;

/// Consumer property carrying the partition discovery interval.
const PARTITION_DISCOVERY_INTERVAL_MS: &str = "partition.discovery.interval.ms";

/// Which side of the pipeline is being resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Path {
    Scan,
    Sink,
}

impl Path {
    fn label(self) -> &'static str {
        match self {
            Self::Scan => "scan",
            Self::Sink => "sink",
        }
    }
}

/// The formats of one table.
struct DiscoveredFormats {
    key: Option<FormatHandle>,
    value: FormatHandle,
}

/// Factory for Kafka table sources and sinks.
///
/// Formats and custom partitioners are looked up in the registries the
/// factory was built with.
#[derive(Debug, Clone, Default)]
pub struct KafkaTableFactory {
    formats: FormatRegistry,
    partitioners: PartitionerRegistry,
}

impl KafkaTableFactory {
    /// Creates a factory over the given format registry.
    #[must_use]
    pub fn new(formats: FormatRegistry) -> Self {
        Self {
            formats,
            partitioners: PartitionerRegistry::new(),
        }
    }

    /// Sets the registry of named partitioners.
    #[must_use]
    pub fn with_partitioners(mut self, partitioners: PartitionerRegistry) -> Self {
        self.partitioners = partitioners;
        self
    }

    /// Returns the connector identifier.
    #[must_use]
    pub fn identifier(&self) -> &'static str {
        IDENTIFIER
    }

    /// Returns the format registry.
    #[must_use]
    pub fn formats(&self) -> &FormatRegistry {
        &self.formats
    }

    /// Returns the partitioner registry.
    #[must_use]
    pub fn partitioners(&self) -> &PartitionerRegistry {
        &self.partitioners
    }

    /// Returns the documentation of every connector option.
    #[must_use]
    pub fn option_specs(&self) -> Vec<ConfigKeySpec> {
        option_specs()
    }

    /// Resolves a table into a source spec.
    ///
    /// # Errors
    ///
    /// Returns the `ConnectorError` of the first violated rule.
    pub fn create_source(&self, table: &ResolvedTable) -> Result<SourceSpec, ConnectorError> {
        let options = &table.options;
        validate_connector(options)?;
        let topics = TopicSelection::from_options(options)?;

        let mut consumed = connector_option_keys();
        let mut formats = self.discover_formats(options, Path::Scan, &mut consumed)?;
        validate_unconsumed(options, &consumed)?;

        let startup_offsets = StartupOffsets::from_options(options, &topics)?;
        validate_primary_key(table, &formats.value)?;

        let projection = ProjectionIndices::from_options(options, &table.schema)?;
        let key_prefix = key_prefix(options)?;
        let metadata = MetadataKeys::readable(
            &table.identifier,
            &table.schema,
            formats.value.readable_metadata(),
        )?;

        let physical = table.schema.physical_row_type();
        formats
            .value
            .apply_metadata(metadata.format.clone(), MetadataAccess::Read);
        formats.value.project(&projection.value_row_type(&physical));
        if let Some(key) = formats.key.as_mut() {
            key.project(&projection.key_row_type(&physical, key_prefix.as_deref()));
        }

        let mut properties = options.properties_with_prefix(PROPERTIES_PREFIX);
        if let Some(interval) = options.get_optional(&SCAN_TOPIC_PARTITION_DISCOVERY)? {
            properties.insert(
                PARTITION_DISCOVERY_INTERVAL_MS.to_string(),
                interval.as_millis().to_string(),
            );
        }

        let spec = SourceSpec {
            produced_data_type: table.schema.row_type_with(metadata.columns()),
            physical_data_type: physical,
            key_format: formats.key,
            value_format: formats.value,
            projection,
            key_prefix,
            topics,
            properties,
            startup_offsets,
            metadata_keys: metadata.connector,
            watermark: table.schema.watermark().cloned(),
        };

        info!(
            table = %table.identifier,
            topics = %spec.topics,
            startup_mode = %spec.startup_offsets.mode(),
            value_format = spec.value_format.identifier(),
            "resolved Kafka table source"
        );
        Ok(spec)
    }

    /// Resolves a table into a sink spec.
    ///
    /// # Errors
    ///
    /// Returns the `ConnectorError` of the first violated rule.
    pub fn create_sink(&self, table: &ResolvedTable) -> Result<SinkSpec, ConnectorError> {
        validate_connector(&table.options)?;
        let topics = TopicSelection::from_options(&table.options)?;
        let topic = topics.sink_topic()?.to_string();
        let options = &autocomplete_subjects(&table.options, &topic);

        let mut consumed = connector_option_keys();
        let mut formats = self.discover_formats(options, Path::Sink, &mut consumed)?;
        validate_unconsumed(options, &consumed)?;

        let delivery_guarantee = DeliveryGuarantee::from_options(options)?;
        let transactional_id_prefix = transactional_id_prefix(options, delivery_guarantee)?;
        let partitioner = SinkPartitioner::from_options(options, &self.partitioners)?;
        let parallelism = options.get_optional(&SINK_PARALLELISM)?;
        let buffer_flush = SinkBufferFlushMode::from_options(options)?;
        validate_primary_key(table, &formats.value)?;

        let projection = ProjectionIndices::from_options(options, &table.schema)?;
        let key_prefix = key_prefix(options)?;
        let metadata = MetadataKeys::writable(
            &table.identifier,
            &table.schema,
            formats.value.writable_metadata(),
        )?;

        let physical = table.schema.physical_row_type();
        formats
            .value
            .apply_metadata(metadata.format.clone(), MetadataAccess::Write);
        formats.value.project(&projection.value_row_type(&physical));
        if let Some(key) = formats.key.as_mut() {
            key.project(&projection.key_row_type(&physical, key_prefix.as_deref()));
        }

        let spec = SinkSpec {
            consumed_data_type: table.schema.row_type_with(metadata.columns()),
            physical_data_type: physical,
            key_format: formats.key,
            value_format: formats.value,
            projection,
            key_prefix,
            topic,
            properties: options.properties_with_prefix(PROPERTIES_PREFIX),
            partitioner,
            delivery_guarantee,
            transactional_id_prefix,
            parallelism,
            buffer_flush,
            metadata_keys: metadata.connector,
        };

        info!(
            table = %table.identifier,
            topic = %spec.topic,
            delivery_guarantee = %spec.delivery_guarantee,
            partitioner = %spec.partitioner.spec(),
            value_format = spec.value_format.identifier(),
            "resolved Kafka table sink"
        );
        Ok(spec)
    }

    fn discover_formats(
        &self,
        options: &TableOptions,
        path: Path,
        consumed: &mut BTreeSet<String>,
    ) -> Result<DiscoveredFormats, ConnectorError> {
        if options.contains(FORMAT.key()) && options.contains(VALUE_FORMAT.key()) {
            return Err(ConnectorError::conflict(
                &[FORMAT.key(), VALUE_FORMAT.key()],
                format!(
                    "Option '{}' and '{}' shouldn't be set together.",
                    FORMAT.key(),
                    VALUE_FORMAT.key()
                ),
            ));
        }

        let value = match FormatHandle::discover(
            &self.formats,
            options,
            FORMAT.key(),
            "",
            consumed,
        )? {
            Some(handle) => handle,
            None => FormatHandle::discover(
                &self.formats,
                options,
                VALUE_FORMAT.key(),
                VALUE_PREFIX,
                consumed,
            )?
            .ok_or_else(|| {
                ConnectorError::missing(
                    &[FORMAT.key(), VALUE_FORMAT.key()],
                    format!(
                        "Could not find required {} format '{}'.",
                        path.label(),
                        VALUE_FORMAT.key()
                    ),
                )
            })?,
        };
        let key = FormatHandle::discover(&self.formats, options, KEY_FORMAT.key(), KEY_PREFIX, consumed)?;

        Ok(DiscoveredFormats { key, value })
    }
}

fn validate_connector(options: &TableOptions) -> Result<(), ConnectorError> {
    let connector = options.require(CONNECTOR.key())?;
    if connector != IDENTIFIER {
        return Err(ConnectorError::invalid(
            CONNECTOR.key(),
            format!(
                "Option '{}' must be '{IDENTIFIER}' but is '{connector}'.",
                CONNECTOR.key()
            ),
        ));
    }
    options.require(PROPS_BOOTSTRAP_SERVERS.key())?;
    Ok(())
}

fn validate_unconsumed(
    options: &TableOptions,
    consumed: &BTreeSet<String>,
) -> Result<(), ConnectorError> {
    let unsupported = options.unconsumed_keys(consumed, &[PROPERTIES_PREFIX]);
    if unsupported.is_empty() {
        return Ok(());
    }
    Err(ConnectorError::UnsupportedOptions {
        connector: IDENTIFIER.to_string(),
        unsupported,
    })
}

fn validate_primary_key(
    table: &ResolvedTable,
    value_format: &FormatHandle,
) -> Result<(), ConnectorError> {
    if table.schema.primary_key().is_some()
        && value_format.changelog_mode().contains_only_inserts()
    {
        return Err(ConnectorError::unsupported(format!(
            "The Kafka table '{}' with '{}' format doesn't support defining PRIMARY KEY \
             constraint on the table, because it can't guarantee the semantic of primary key.",
            table.identifier.as_summary_string(),
            value_format.identifier()
        )));
    }
    Ok(())
}
