//! Resolved Kafka table sink.

use std::collections::BTreeMap;

use arrow_schema::DataType;

use crate::error::ConnectorError;
use crate::format::{FormatHandle, RecordEncoder};
use crate::kafka::metadata::list_writable_metadata;
use crate::kafka::partitioner::SinkPartitioner;
use crate::kafka::projection::ProjectionIndices;
use crate::kafka::sink_config::{DeliveryGuarantee, SinkBufferFlushMode};

/// Everything a Kafka writer needs to produce a table.
///
/// Produced by [`KafkaTableFactory::create_sink`](super::KafkaTableFactory::create_sink)
/// and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkSpec {
    pub(crate) physical_data_type: DataType,
    pub(crate) consumed_data_type: DataType,
    pub(crate) key_format: Option<FormatHandle>,
    pub(crate) value_format: FormatHandle,
    pub(crate) projection: ProjectionIndices,
    pub(crate) key_prefix: Option<String>,
    pub(crate) topic: String,
    pub(crate) properties: BTreeMap<String, String>,
    pub(crate) partitioner: SinkPartitioner,
    pub(crate) delivery_guarantee: DeliveryGuarantee,
    pub(crate) transactional_id_prefix: Option<String>,
    pub(crate) parallelism: Option<u32>,
    pub(crate) buffer_flush: SinkBufferFlushMode,
    pub(crate) metadata_keys: Vec<String>,
}

/// Encoders built from a [`SinkSpec`].
pub struct SinkEncoders {
    /// Encoder of record keys, if the table has a key format.
    pub key: Option<Box<dyn RecordEncoder>>,
    /// Encoder of record values.
    pub value: Box<dyn RecordEncoder>,
}

impl std::fmt::Debug for SinkEncoders {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkEncoders")
            .field("has_key", &self.key.is_some())
            .finish_non_exhaustive()
    }
}

impl SinkSpec {
    /// Returns the physical row type of the table.
    #[must_use]
    pub fn physical_data_type(&self) -> &DataType {
        &self.physical_data_type
    }

    /// Returns the row type accepted from upstream: physical columns
    /// followed by persisted metadata columns.
    #[must_use]
    pub fn consumed_data_type(&self) -> &DataType {
        &self.consumed_data_type
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

    /// Returns the topic written to.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Returns the producer properties.
    #[must_use]
    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    /// Returns the partitioner.
    #[must_use]
    pub fn partitioner(&self) -> &SinkPartitioner {
        &self.partitioner
    }

    /// Returns the delivery guarantee.
    #[must_use]
    pub fn delivery_guarantee(&self) -> DeliveryGuarantee {
        self.delivery_guarantee
    }

    /// Returns the transactional id prefix, if any.
    #[must_use]
    pub fn transactional_id_prefix(&self) -> Option<&str> {
        self.transactional_id_prefix.as_deref()
    }

    /// Returns the sink parallelism, if set.
    #[must_use]
    pub fn parallelism(&self) -> Option<u32> {
        self.parallelism
    }

    /// Returns the buffer-flush mode.
    #[must_use]
    pub fn buffer_flush(&self) -> SinkBufferFlushMode {
        self.buffer_flush
    }

    /// Returns the connector metadata keys, in schema order.
    #[must_use]
    pub fn metadata_keys(&self) -> &[String] {
        &self.metadata_keys
    }

    /// Lists every metadata key this table could write, with its type.
    #[must_use]
    pub fn list_writable_metadata(&self) -> Vec<(String, DataType)> {
        list_writable_metadata(self.value_format.writable_metadata())
    }

    /// Creates the key and value encoders.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError` if a format provider rejects its options.
    pub fn create_encoders(&self) -> Result<SinkEncoders, ConnectorError> {
        let key = self
            .key_format
            .as_ref()
            .map(FormatHandle::create_encoder)
            .transpose()?;
        let value = self.value_format.create_encoder()?;
        Ok(SinkEncoders { key, value })
    }
}
