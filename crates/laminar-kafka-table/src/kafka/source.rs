//! Resolved Kafka table source.

use std::collections::BTreeMap;

use arrow_schema::DataType;

use crate::error::ConnectorError;
use crate::format::{FormatHandle, RecordDecoder};
use crate::kafka::metadata::list_readable_metadata;
use crate::kafka::options::{PROPERTIES_PREFIX, PROPS_GROUP_ID};
use crate::kafka::projection::ProjectionIndices;
use crate::kafka::startup::StartupOffsets;
use crate::kafka::topic::TopicSelection;
use crate::schema::WatermarkSpec;

/// Everything a Kafka reader needs to consume a table.
///
/// Produced by [`KafkaTableFactory::create_source`](super::KafkaTableFactory::create_source)
/// and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpec {
    pub(crate) physical_data_type: DataType,
    pub(crate) produced_data_type: DataType,
    pub(crate) key_format: Option<FormatHandle>,
    pub(crate) value_format: FormatHandle,
    pub(crate) projection: ProjectionIndices,
    pub(crate) key_prefix: Option<String>,
    pub(crate) topics: TopicSelection,
    pub(crate) properties: BTreeMap<String, String>,
    pub(crate) startup_offsets: StartupOffsets,
    pub(crate) metadata_keys: Vec<String>,
    pub(crate) watermark: Option<WatermarkSpec>,
}

/// Decoders built from a [`SourceSpec`].
pub struct SourceDecoders {
    /// Decoder of record keys, if the table has a key format.
    pub key: Option<Box<dyn RecordDecoder>>,
    /// Decoder of record values.
    pub value: Box<dyn RecordDecoder>,
}

impl std::fmt::Debug for SourceDecoders {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceDecoders")
            .field("has_key", &self.key.is_some())
            .finish_non_exhaustive()
    }
}

impl SourceSpec {
    /// Returns the physical row type of the table.
    #[must_use]
    pub fn physical_data_type(&self) -> &DataType {
        &self.physical_data_type
    }

    /// Returns the row type emitted downstream: physical columns followed by
    /// metadata columns.
    #[must_use]
    pub fn produced_data_type(&self) -> &DataType {
        &self.produced_data_type
    }

    /// Returns the key format, if any.
    #[must_use]
    pub fn key_format(&self) -> Option<&FormatHandle> {
        self.key_format.as_ref()
    }

    /// Returns the value format.
    #[must_use]
    pub fn value_format(&self) -> &FormatHandle {
        &self.value_format
    }

    /// Returns the key and value projections.
    #[must_use]
    pub fn projection(&self) -> &ProjectionIndices {
        &self.projection
    }

    /// Returns the key field prefix, if any.
    #[must_use]
    pub fn key_prefix(&self) -> Option<&str> {
        self.key_prefix.as_deref()
    }

    /// Returns the topics to read.
    #[must_use]
    pub fn topics(&self) -> &TopicSelection {
        &self.topics
    }

    /// Returns the consumer properties.
    #[must_use]
    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    /// Returns the startup position.
    #[must_use]
    pub fn startup_offsets(&self) -> &StartupOffsets {
        &self.startup_offsets
    }

    /// Returns the connector metadata keys, in schema order.
    #[must_use]
    pub fn metadata_keys(&self) -> &[String] {
        &self.metadata_keys
    }

    /// Returns the watermark, if declared.
    #[must_use]
    pub fn watermark(&self) -> Option<&WatermarkSpec> {
        self.watermark.as_ref()
    }

    /// Returns `true` if consumed offsets are committed to the consumer
    /// group on checkpoint, which requires a group id.
    #[must_use]
    pub fn commit_offsets_on_checkpoint(&self) -> bool {
        let group_id = PROPS_GROUP_ID
            .key()
            .strip_prefix(PROPERTIES_PREFIX)
            .unwrap_or(PROPS_GROUP_ID.key());
        self.properties.contains_key(group_id)
    }

    /// Lists every metadata key this table could read, with its type.
    #[must_use]
    pub fn list_readable_metadata(&self) -> Vec<(String, DataType)> {
        list_readable_metadata(self.value_format.readable_metadata())
    }

    /// Creates the key and value decoders.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError` if a format provider rejects its options.
    pub fn create_decoders(&self) -> Result<SourceDecoders, ConnectorError> {
        let key = self
            .key_format
            .as_ref()
            .map(FormatHandle::create_decoder)
            .transpose()?;
        let value = self.value_format.create_decoder()?;
        Ok(SourceDecoders { key, value })
    }
}
