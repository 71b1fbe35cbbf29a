//! Kafka table connector.
//!
//! Resolves a table declared with `'connector' = 'kafka'` into a
//! [`SourceSpec`] or [`SinkSpec`]. Resolution never talks to a broker; the
//! specs describe what a reader or writer must do.
//!
//! # Features
//!
//! - Topic lists and topic patterns (source), single topic (sink)
//! - Five startup modes, including per-partition offsets and timestamps
//! - Separate key and value formats with `key.fields` projections
//! - Record and format metadata columns
//! - At-least-once, exactly-once and no-guarantee delivery (sink)
//! - Built-in and registered partitioners (sink)
//! - Default schema-registry subjects for Confluent Avro formats (sink)
//!
//! # Usage
//!
//! ```rust,ignore
//! use laminar_kafka_table::kafka::KafkaTableFactory;
//!
//! let factory = KafkaTableFactory::new(formats);
//! let source = factory.create_source(&table)?;
//! let decoders = source.create_decoders()?;
//! ```

// Option catalogue
pub mod options;

// Shared resolvers
pub mod metadata;
pub mod projection;
pub mod topic;

// Source resolvers
pub mod source;
pub mod startup;

// Sink resolvers
pub mod partitioner;
pub mod sink;
pub mod sink_config;
pub mod subject;

pub mod factory;

/// Connector identifier.
pub const IDENTIFIER: &str = "kafka";

pub use factory::KafkaTableFactory;
pub use metadata::{MetadataKeys, ReadableMetadata, WritableMetadata};
pub use options::ValueFieldsStrategy;
pub use partitioner::{
    FixedPartitioner, KafkaPartitioner, KeyHashPartitioner, PartitionerFactory,
    PartitionerRegistry, PartitionerSpec, RoundRobinPartitioner, SinkPartitioner,
};
pub use projection::ProjectionIndices;
pub use sink::{SinkEncoders, SinkSpec};
pub use sink_config::{DeliveryGuarantee, SinkBufferFlushMode};
pub use source::{SourceDecoders, SourceSpec};
pub use startup::{StartupMode, StartupOffsets, TopicPartition};
pub use subject::SchemaRegistryFormat;
pub use topic::{TopicPattern, TopicSelection};
