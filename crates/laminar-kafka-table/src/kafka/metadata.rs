//! Metadata columns.
//!
//! A metadata column maps to either a property of the Kafka record itself
//! (connector metadata, e.g. `offset`) or to metadata exposed by the value
//! format (`value.<key>`). Sources read both kinds; sinks write `headers`,
//! `timestamp` and the value format's writable keys.

use std::sync::Arc;

use arrow_schema::{DataType, Field, Fields, TimeUnit};

use crate::error::ConnectorError;
use crate::format::MetadataDeclarations;
use crate::kafka::options::VALUE_PREFIX;
use crate::schema::{Column, ObjectIdentifier, TableSchema};

/// Record metadata a source can read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadableMetadata {
    /// Source topic name.
    Topic,
    /// Source partition.
    Partition,
    /// Record headers.
    Headers,
    /// Leader epoch, if available.
    LeaderEpoch,
    /// Record offset.
    Offset,
    /// Record timestamp.
    Timestamp,
    /// `NoTimestampType`, `CreateTime` or `LogAppendTime`.
    TimestampType,
}

impl ReadableMetadata {
    /// All readable keys in declaration order.
    pub const ALL: [Self; 7] = [
        Self::Topic,
        Self::Partition,
        Self::Headers,
        Self::LeaderEpoch,
        Self::Offset,
        Self::Timestamp,
        Self::TimestampType,
    ];

    /// Returns the metadata key.
    #[must_use]
    pub fn key(&self) -> &'static str {
        match self {
            Self::Topic => "topic",
            Self::Partition => "partition",
            Self::Headers => "headers",
            Self::LeaderEpoch => "leader-epoch",
            Self::Offset => "offset",
            Self::Timestamp => "timestamp",
            Self::TimestampType => "timestamp-type",
        }
    }

    /// Returns the type a column of this key is read as.
    #[must_use]
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Topic | Self::TimestampType => DataType::Utf8,
            Self::Partition | Self::LeaderEpoch => DataType::Int32,
            Self::Headers => headers_type(),
            Self::Offset => DataType::Int64,
            Self::Timestamp => timestamp_type(),
        }
    }

    /// Looks up a key.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.key() == key)
    }
}

/// Record metadata a sink can write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritableMetadata {
    /// Record headers.
    Headers,
    /// Record timestamp.
    Timestamp,
}

impl WritableMetadata {
    /// All writable keys in declaration order.
    pub const ALL: [Self; 2] = [Self::Headers, Self::Timestamp];

    /// Returns the metadata key.
    #[must_use]
    pub fn key(&self) -> &'static str {
        match self {
            Self::Headers => "headers",
            Self::Timestamp => "timestamp",
        }
    }

    /// Returns the type a column of this key is written as.
    #[must_use]
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Headers => headers_type(),
            Self::Timestamp => timestamp_type(),
        }
    }

    /// Looks up a key.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.key() == key)
    }
}

/// `MAP<STRING, BYTES>`
fn headers_type() -> DataType {
    let entries = Fields::from(vec![
        Field::new("key", DataType::Utf8, false),
        Field::new("value", DataType::Binary, true),
    ]);
    DataType::Map(
        Arc::new(Field::new("entries", DataType::Struct(entries), false)),
        false,
    )
}

fn timestamp_type() -> DataType {
    DataType::Timestamp(TimeUnit::Millisecond, Some("UTC".into()))
}

/// Lists the keys a source can read: value format keys (prefixed with
/// `value.`) followed by connector keys.
#[must_use]
pub fn list_readable_metadata(format: &MetadataDeclarations) -> Vec<(String, DataType)> {
    format
        .iter()
        .map(|(key, data_type)| (format!("{VALUE_PREFIX}{key}"), data_type.clone()))
        .chain(
            ReadableMetadata::ALL
                .iter()
                .map(|m| (m.key().to_string(), m.data_type())),
        )
        .collect()
}

/// Lists the keys a sink can write: value format keys (prefixed with
/// `value.`) followed by connector keys.
#[must_use]
pub fn list_writable_metadata(format: &MetadataDeclarations) -> Vec<(String, DataType)> {
    format
        .iter()
        .map(|(key, data_type)| (format!("{VALUE_PREFIX}{key}"), data_type.clone()))
        .chain(
            WritableMetadata::ALL
                .iter()
                .map(|m| (m.key().to_string(), m.data_type())),
        )
        .collect()
}

/// Metadata keys of a table, split by who provides them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataKeys {
    /// Keys handled by the connector, in schema order.
    pub connector: Vec<String>,
    /// Keys handled by the value format, without the `value.` prefix, in
    /// schema order.
    pub format: Vec<String>,
    /// The metadata columns the keys came from, in schema order.
    pub(crate) columns: Vec<Column>,
}

impl MetadataKeys {
    /// Splits the metadata columns of a source table.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::SchemaMismatch` for a key that neither the
    /// connector nor the value format can read.
    pub fn readable(
        identifier: &ObjectIdentifier,
        schema: &TableSchema,
        format: &MetadataDeclarations,
    ) -> Result<Self, ConnectorError> {
        Self::split(
            identifier,
            schema.metadata_columns(),
            format,
            |key| ReadableMetadata::from_key(key).is_some(),
            || list_readable_metadata(format),
            "reading",
        )
    }

    /// Splits the persisted metadata columns of a sink table. Virtual
    /// columns are skipped.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::SchemaMismatch` for a key that neither the
    /// connector nor the value format can write.
    pub fn writable(
        identifier: &ObjectIdentifier,
        schema: &TableSchema,
        format: &MetadataDeclarations,
    ) -> Result<Self, ConnectorError> {
        Self::split(
            identifier,
            schema.metadata_columns().filter(|c| c.is_persisted()),
            format,
            |key| WritableMetadata::from_key(key).is_some(),
            || list_writable_metadata(format),
            "writing",
        )
    }

    /// Returns the metadata columns, in schema order.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    fn split<'a>(
        identifier: &ObjectIdentifier,
        columns: impl Iterator<Item = &'a Column>,
        format: &MetadataDeclarations,
        is_connector_key: impl Fn(&str) -> bool,
        supported: impl Fn() -> Vec<(String, DataType)>,
        access: &str,
    ) -> Result<Self, ConnectorError> {
        let mut keys = Self::default();
        for column in columns {
            let Some(key) = column.metadata_key() else {
                continue;
            };
            match key.strip_prefix(VALUE_PREFIX) {
                Some(format_key) if format.contains_key(format_key) => {
                    push_distinct(&mut keys.format, format_key);
                }
                _ if is_connector_key(key) => push_distinct(&mut keys.connector, key),
                _ => {
                    let supported: Vec<String> =
                        supported().into_iter().map(|(k, _)| k).collect();
                    return Err(ConnectorError::SchemaMismatch {
                        message: format!(
                            "Invalid metadata key '{key}' in column '{}' of table '{}'. \
                             The Kafka table supports the following metadata keys for {access}:\n{}",
                            column.name(),
                            identifier.as_summary_string(),
                            supported.join("\n")
                        ),
                    });
                }
            }
            keys.columns.push(column.clone());
        }
        Ok(keys)
    }
}

/// Columns may share a key; each key is requested once, in first-seen order.
fn push_distinct(keys: &mut Vec<String>, key: &str) {
    if !keys.iter().any(|k| k == key) {
        keys.push(key.to_string());
    }
}
