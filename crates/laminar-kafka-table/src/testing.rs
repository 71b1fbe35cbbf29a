//! Testing utilities for Kafka table resolution.
//!
//! Provides a configurable [`TestFormatFactory`], a delimiter-separated text
//! codec behind it, and schema and option fixtures shared by unit and
//! integration tests.

use std::str::FromStr;
use std::sync::Arc;

use arrow_array::cast::AsArray;
use arrow_array::types::{Int32Type, Int64Type};
use arrow_array::{
    new_null_array, Array, ArrayRef, BooleanArray, Int32Array, Int64Array, RecordBatch,
    RecordBatchOptions, StringArray,
};
use arrow_schema::{DataType, Field, Schema, SchemaRef, TimeUnit};

use crate::config::{ConfigKeySpec, OptionValue, TableOptions};
use crate::error::{ConnectorError, SerdeError};
use crate::format::{
    ChangelogMode, FormatFactory, FormatOptions, MetadataDeclarations, RecordDecoder,
    RecordEncoder,
};
use crate::registry::FormatRegistry;
use crate::schema::{row_fields, Column, ObjectIdentifier, ResolvedTable, TableSchema};

/// Identifier of the default test format.
pub const TEST_FORMAT: &str = "test-format";

const DELIMITER: &str = "delimiter";
const FAIL_ON_MISSING: &str = "fail-on-missing";
const CHANGELOG_MODE: &str = "changelog-mode";
const READABLE_METADATA: &str = "readable-metadata";
const WRITABLE_METADATA: &str = "writable-metadata";
const URL: &str = "url";
const SUBJECT: &str = "subject";

/// A format provider for tests.
///
/// Understands the `delimiter`, `fail-on-missing`, `changelog-mode`,
/// `readable-metadata`, `writable-metadata`, `url` and `subject` options.
/// Metadata options declare `name:TYPE` pairs separated by commas, e.g.
/// `metadata_1:INT, metadata_2:STRING`.
#[derive(Debug, Clone)]
pub struct TestFormatFactory {
    identifier: String,
    required: Vec<&'static str>,
}

impl TestFormatFactory {
    /// Creates the `test-format` provider, which requires `delimiter`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            identifier: TEST_FORMAT.to_string(),
            required: vec![DELIMITER],
        }
    }

    /// Creates a provider under another identifier with no required
    /// options.
    #[must_use]
    pub fn named(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            required: Vec::new(),
        }
    }
}

impl Default for TestFormatFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatFactory for TestFormatFactory {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn required_options(&self) -> Vec<ConfigKeySpec> {
        self.required
            .iter()
            .map(|key| ConfigKeySpec::required(*key, "Field delimiter"))
            .collect()
    }

    fn optional_options(&self) -> Vec<ConfigKeySpec> {
        [
            (DELIMITER, "Field delimiter"),
            (FAIL_ON_MISSING, "Fail on records with missing fields"),
            (CHANGELOG_MODE, "Supported change kinds, e.g. 'I;UA;UB;D'"),
            (READABLE_METADATA, "Metadata exposed when decoding"),
            (WRITABLE_METADATA, "Metadata persisted when encoding"),
            (URL, "Schema registry URL"),
            (SUBJECT, "Schema registry subject"),
        ]
        .into_iter()
        .filter(|(key, _)| !self.required.contains(key))
        .map(|(key, description)| ConfigKeySpec::optional(key, description))
        .collect()
    }

    fn changelog_mode(&self, options: &FormatOptions) -> Result<ChangelogMode, ConnectorError> {
        match options.get(CHANGELOG_MODE) {
            Some(raw) => ChangelogMode::from_str(raw)
                .map_err(|reason| ConnectorError::invalid(CHANGELOG_MODE, reason)),
            None => Ok(ChangelogMode::insert_only()),
        }
    }

    fn readable_metadata(
        &self,
        options: &FormatOptions,
    ) -> Result<MetadataDeclarations, ConnectorError> {
        parse_metadata(options, READABLE_METADATA)
    }

    fn writable_metadata(
        &self,
        options: &FormatOptions,
    ) -> Result<MetadataDeclarations, ConnectorError> {
        parse_metadata(options, WRITABLE_METADATA)
    }

    fn create_decoder(
        &self,
        options: &FormatOptions,
        produced_type: &DataType,
        metadata_keys: &[String],
    ) -> Result<Box<dyn RecordDecoder>, ConnectorError> {
        let fail_on_missing = options
            .get(FAIL_ON_MISSING)
            .map(|raw| bool::parse_value(raw.as_str()))
            .transpose()
            .map_err(|reason| ConnectorError::invalid(FAIL_ON_MISSING, reason))?
            .unwrap_or(false);
        Ok(Box::new(DelimitedDecoder {
            schema: row_schema(produced_type),
            delimiter: delimiter(options),
            metadata_fields: metadata_keys.len(),
            fail_on_missing,
        }))
    }

    fn create_encoder(
        &self,
        options: &FormatOptions,
        consumed_type: &DataType,
    ) -> Result<Box<dyn RecordEncoder>, ConnectorError> {
        Ok(Box::new(DelimitedEncoder {
            schema: row_schema(consumed_type),
            delimiter: delimiter(options),
        }))
    }
}

fn delimiter(options: &FormatOptions) -> String {
    options
        .get(DELIMITER)
        .cloned()
        .unwrap_or_else(|| ",".to_string())
}

fn row_schema(row_type: &DataType) -> SchemaRef {
    Arc::new(Schema::new(row_fields(row_type)))
}

fn parse_metadata(
    options: &FormatOptions,
    key: &str,
) -> Result<MetadataDeclarations, ConnectorError> {
    let Some(raw) = options.get(key) else {
        return Ok(MetadataDeclarations::new());
    };
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (name, type_name) = entry.split_once(':').ok_or_else(|| {
                ConnectorError::invalid(key, format!("expected 'name:TYPE' but got '{entry}'"))
            })?;
            let data_type = sql_type(type_name.trim())
                .ok_or_else(|| ConnectorError::invalid(key, format!("unknown type '{type_name}'")))?;
            Ok((name.trim().to_string(), data_type))
        })
        .collect()
}

fn sql_type(name: &str) -> Option<DataType> {
    match name.to_uppercase().as_str() {
        "STRING" => Some(DataType::Utf8),
        "INT" => Some(DataType::Int32),
        "BIGINT" => Some(DataType::Int64),
        "BOOLEAN" => Some(DataType::Boolean),
        "DOUBLE" => Some(DataType::Float64),
        "BYTES" => Some(DataType::Binary),
        "TIMESTAMP" => Some(DataType::Timestamp(TimeUnit::Millisecond, None)),
        _ => None,
    }
}

/// Decodes delimiter-separated UTF-8 records.
///
/// Supports `Utf8`, `Int32`, `Int64` and `Boolean` fields. Trailing metadata
/// fields are not part of the payload and decode as null.
#[derive(Debug)]
pub struct DelimitedDecoder {
    schema: SchemaRef,
    delimiter: String,
    metadata_fields: usize,
    fail_on_missing: bool,
}

impl RecordDecoder for DelimitedDecoder {
    fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    fn decode(&mut self, records: &[&[u8]]) -> Result<RecordBatch, SerdeError> {
        let payload_fields = self.schema.fields().len().saturating_sub(self.metadata_fields);
        let mut rows: Vec<Vec<&str>> = Vec::with_capacity(records.len());
        for record in records {
            let text = std::str::from_utf8(record)
                .map_err(|e| SerdeError::MalformedInput(format!("invalid UTF-8: {e}")))?;
            let values: Vec<&str> = text.split(self.delimiter.as_str()).collect();
            if values.len() < payload_fields && self.fail_on_missing {
                return Err(SerdeError::MalformedInput(format!(
                    "expected {payload_fields} fields but got {}",
                    values.len()
                )));
            }
            rows.push(values);
        }

        let columns = self
            .schema
            .fields()
            .iter()
            .enumerate()
            .map(|(i, field)| {
                if i >= payload_fields {
                    return Ok(new_null_array(field.data_type(), rows.len()));
                }
                let values: Vec<Option<&str>> =
                    rows.iter().map(|row| row.get(i).copied()).collect();
                build_column(field, &values)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let options = RecordBatchOptions::new().with_row_count(Some(rows.len()));
        Ok(RecordBatch::try_new_with_options(
            self.schema.clone(),
            columns,
            &options,
        )?)
    }
}

fn build_column(field: &Field, values: &[Option<&str>]) -> Result<ArrayRef, SerdeError> {
    let array: ArrayRef = match field.data_type() {
        DataType::Utf8 => Arc::new(StringArray::from(values.to_vec())),
        DataType::Int32 => Arc::new(Int32Array::from(parse_values::<i32>(field, values)?)),
        DataType::Int64 => Arc::new(Int64Array::from(parse_values::<i64>(field, values)?)),
        DataType::Boolean => Arc::new(BooleanArray::from(parse_values::<bool>(field, values)?)),
        other => return Err(unsupported_type(field, other)),
    };
    Ok(array)
}

fn parse_values<T: FromStr>(
    field: &Field,
    values: &[Option<&str>],
) -> Result<Vec<Option<T>>, SerdeError> {
    values
        .iter()
        .map(|value| {
            value
                .filter(|s| !s.is_empty())
                .map(|s| {
                    s.parse::<T>().map_err(|_| SerdeError::TypeConversion {
                        field: field.name().clone(),
                        expected: field.data_type().to_string(),
                        message: format!("cannot parse '{s}'"),
                    })
                })
                .transpose()
        })
        .collect()
}

fn unsupported_type(field: &Field, data_type: &DataType) -> SerdeError {
    SerdeError::TypeConversion {
        field: field.name().clone(),
        expected: data_type.to_string(),
        message: "type not supported by the test format".to_string(),
    }
}

/// Encodes rows as delimiter-separated UTF-8 records. Nulls encode as empty
/// fields.
#[derive(Debug)]
pub struct DelimitedEncoder {
    schema: SchemaRef,
    delimiter: String,
}

impl RecordEncoder for DelimitedEncoder {
    fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    fn encode(&mut self, batch: &RecordBatch) -> Result<Vec<Vec<u8>>, SerdeError> {
        let mut rows = vec![Vec::<String>::with_capacity(batch.num_columns()); batch.num_rows()];
        for (field, column) in batch.schema().fields().iter().zip(batch.columns()) {
            for (row, out) in rows.iter_mut().enumerate() {
                let value = if column.is_null(row) {
                    String::new()
                } else {
                    match field.data_type() {
                        DataType::Utf8 => column.as_string::<i32>().value(row).to_string(),
                        DataType::Int32 => column.as_primitive::<Int32Type>().value(row).to_string(),
                        DataType::Int64 => column.as_primitive::<Int64Type>().value(row).to_string(),
                        DataType::Boolean => column.as_boolean().value(row).to_string(),
                        other => return Err(unsupported_type(field, other)),
                    }
                };
                out.push(value);
            }
        }
        Ok(rows
            .into_iter()
            .map(|row| row.join(&self.delimiter).into_bytes())
            .collect())
    }
}

// ── Fixtures ──

/// Returns a registry with `test-format`, `avro-confluent`,
/// `debezium-avro-confluent`, `csv` and `json` registered.
#[must_use]
pub fn test_registry() -> FormatRegistry {
    let registry = FormatRegistry::new();
    registry.register(Arc::new(TestFormatFactory::new()));
    for id in ["avro-confluent", "debezium-avro-confluent", "csv", "json"] {
        registry.register(Arc::new(TestFormatFactory::named(id)));
    }
    registry
}

/// Returns `default.default.t1`.
#[must_use]
pub fn test_identifier() -> ObjectIdentifier {
    ObjectIdentifier::new("default", "default", "t1")
}

/// Returns a schema with physical `name`, `count` and `time` columns and a
/// computed column.
#[must_use]
pub fn test_schema() -> TableSchema {
    TableSchema::new(vec![
        Column::physical("name", DataType::Utf8),
        Column::physical("count", DataType::Decimal128(38, 18)),
        Column::physical("time", DataType::Timestamp(TimeUnit::Millisecond, None)),
        Column::computed(
            "computed-column",
            DataType::Timestamp(TimeUnit::Millisecond, None),
            "time + INTERVAL '5' SECOND",
        ),
    ])
    .with_watermark("time", "time")
}

/// Returns a schema with physical `name` and `count` columns, a connector
/// metadata column `time` and a value format metadata column `metadata`.
#[must_use]
pub fn test_schema_with_metadata() -> TableSchema {
    TableSchema::new(vec![
        Column::physical("name", DataType::Utf8),
        Column::physical("count", DataType::Decimal128(38, 18)),
        Column::metadata(
            "time",
            DataType::Timestamp(TimeUnit::Millisecond, Some("UTC".into())),
            Some("timestamp"),
            false,
        ),
        Column::metadata("metadata", DataType::Utf8, Some("value.metadata_2"), false),
    ])
}

/// Returns valid source options for `myTopic` using `test-format`.
#[must_use]
pub fn source_options() -> TableOptions {
    [
        ("connector", "kafka"),
        ("topic", "myTopic"),
        ("properties.group.id", "dummy"),
        ("properties.bootstrap.servers", "dummy"),
        ("scan.startup.mode", "specific-offsets"),
        (
            "scan.startup.specific-offsets",
            "partition:0,offset:100;partition:1,offset:123",
        ),
        ("scan.topic-partition-discovery.interval", "1000 ms"),
        ("format", TEST_FORMAT),
        ("test-format.delimiter", ","),
        ("test-format.fail-on-missing", "true"),
    ]
    .into_iter()
    .collect()
}

/// Returns valid sink options for `myTopic` using `test-format`.
#[must_use]
pub fn sink_options() -> TableOptions {
    [
        ("connector", "kafka"),
        ("topic", "myTopic"),
        ("properties.group.id", "dummy"),
        ("properties.bootstrap.servers", "dummy"),
        ("sink.partitioner", "fixed"),
        ("sink.delivery-guarantee", "exactly-once"),
        ("sink.transactional-id-prefix", "kafka-sink"),
        ("format", TEST_FORMAT),
        ("test-format.delimiter", ","),
    ]
    .into_iter()
    .collect()
}

/// Returns valid options with separate key and value formats: `name` is
/// the key, the value excludes it.
#[must_use]
pub fn key_value_options() -> TableOptions {
    [
        ("connector", "kafka"),
        ("topic", "myTopic"),
        ("properties.group.id", "dummy"),
        ("properties.bootstrap.servers", "dummy"),
        ("scan.topic-partition-discovery.interval", "1000 ms"),
        ("key.format", TEST_FORMAT),
        ("key.test-format.delimiter", "#"),
        ("key.fields", "name"),
        ("value.format", TEST_FORMAT),
        ("value.test-format.delimiter", "|"),
        ("value.fields-include", "EXCEPT_KEY"),
        ("sink.partitioner", "fixed"),
        ("sink.delivery-guarantee", "exactly-once"),
        ("sink.transactional-id-prefix", "kafka-sink"),
    ]
    .into_iter()
    .collect()
}

/// Returns `options` with `changes` applied; an empty value removes the key.
#[must_use]
pub fn with_options(mut options: TableOptions, changes: &[(&str, &str)]) -> TableOptions {
    for (key, value) in changes {
        if value.is_empty() {
            options.remove(key);
        } else {
            options.set(*key, *value);
        }
    }
    options
}

/// Wraps a schema and options as table `default.default.t1`.
#[must_use]
pub fn test_table(schema: TableSchema, options: TableOptions) -> ResolvedTable {
    ResolvedTable::new(test_identifier(), schema, options)
}
