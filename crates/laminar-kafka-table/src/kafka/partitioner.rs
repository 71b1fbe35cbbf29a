//! Kafka partitioning strategies.
//!
//! [`KafkaPartitioner`] determines which Kafka partition each record is
//! sent to. Three built-in strategies are provided:
//!
//! - [`KeyHashPartitioner`]: Murmur2 hash (Kafka-compatible default)
//! - [`FixedPartitioner`]: Each sink subtask writes to one partition
//! - [`RoundRobinPartitioner`]: Cycle through partitions
//!
//! Other strategies are registered by name in a [`PartitionerRegistry`] and
//! selected with `sink.partitioner`.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::config::TableOptions;
use crate::error::ConnectorError;
use crate::kafka::options::{KEY_FIELDS, SINK_PARTITIONER};

/// Trait for determining the target Kafka partition for a record.
///
/// Implementations may be stateful (e.g., round-robin counter). Each sink
/// subtask owns its own instance.
pub trait KafkaPartitioner: Send + Sync {
    /// Called once before the first record with the subtask index and the
    /// sink parallelism.
    fn open(&mut self, _subtask: usize, _parallelism: usize) {}

    /// Returns the target partition for the given key.
    ///
    /// Returns `None` if the partitioner defers to the producer's default
    /// partitioning.
    fn partition(&mut self, key: Option<&[u8]>, num_partitions: i32) -> Option<i32>;

    /// Resets the partitioner state (e.g., on epoch boundary).
    fn reset(&mut self) {}
}

/// Key-hash partitioner using Murmur2 (Kafka-compatible).
///
/// Produces the same partition assignment as Kafka's `DefaultPartitioner`
/// for the same key bytes. Records without a key are left to the producer.
#[derive(Debug, Default)]
pub struct KeyHashPartitioner;

impl KeyHashPartitioner {
    /// Creates a new key-hash partitioner.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl KafkaPartitioner for KeyHashPartitioner {
    fn partition(&mut self, key: Option<&[u8]>, num_partitions: i32) -> Option<i32> {
        if num_partitions <= 0 {
            return None;
        }
        key.map(|k| {
            let hash = murmur2(k) & 0x7fff_ffff;
            #[allow(
                clippy::cast_possible_truncation,
                clippy::cast_possible_wrap,
                clippy::cast_sign_loss
            )]
            let partition = (hash % num_partitions as u32) as i32;
            partition
        })
    }
}

/// Pins every sink subtask to a single partition: `subtask % partitions`.
///
/// With fewer subtasks than partitions some partitions receive no data.
#[derive(Debug, Default)]
pub struct FixedPartitioner {
    subtask: usize,
}

impl FixedPartitioner {
    /// Creates a fixed partitioner for subtask 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KafkaPartitioner for FixedPartitioner {
    fn open(&mut self, subtask: usize, _parallelism: usize) {
        self.subtask = subtask;
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_possible_wrap,
        clippy::cast_sign_loss
    )]
    fn partition(&mut self, _key: Option<&[u8]>, num_partitions: i32) -> Option<i32> {
        if num_partitions <= 0 {
            return None;
        }
        Some((self.subtask % num_partitions as usize) as i32)
    }
}

/// Round-robin partitioner distributing records evenly across partitions.
#[derive(Debug, Default)]
pub struct RoundRobinPartitioner {
    counter: u64,
}

impl RoundRobinPartitioner {
    /// Creates a new round-robin partitioner.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KafkaPartitioner for RoundRobinPartitioner {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn partition(&mut self, _key: Option<&[u8]>, num_partitions: i32) -> Option<i32> {
        if num_partitions <= 0 {
            return None;
        }
        let partition = (self.counter % num_partitions as u64) as i32;
        self.counter += 1;
        Some(partition)
    }

    fn reset(&mut self) {
        self.counter = 0;
    }
}

/// Value of `sink.partitioner`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartitionerSpec {
    /// Kafka's default: key hash, producer choice for null keys.
    Default,
    /// One partition per sink subtask.
    Fixed,
    /// Round-robin across partitions.
    RoundRobin,
    /// A partitioner registered under this name.
    Custom(String),
}

impl FromStr for PartitionerSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err("partitioner name must not be empty".into());
        }
        Ok(match trimmed {
            "default" => Self::Default,
            "fixed" => Self::Fixed,
            "round-robin" => Self::RoundRobin,
            other => Self::Custom(other.to_string()),
        })
    }
}

impl fmt::Display for PartitionerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => write!(f, "default"),
            Self::Fixed => write!(f, "fixed"),
            Self::RoundRobin => write!(f, "round-robin"),
            Self::Custom(name) => f.write_str(name),
        }
    }
}

/// Factory function type for creating partitioners.
pub type PartitionerFactory = Arc<dyn Fn() -> Box<dyn KafkaPartitioner> + Send + Sync>;

/// Registry of named partitioner implementations.
///
/// Cloning is cheap; clones share the same catalog.
#[derive(Clone, Default)]
pub struct PartitionerRegistry {
    factories: Arc<RwLock<HashMap<String, PartitionerFactory>>>,
}

impl PartitionerRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a partitioner factory under `name`.
    pub fn register(&self, name: impl Into<String>, factory: PartitionerFactory) {
        self.factories.write().insert(name.into(), factory);
    }

    /// Returns the factory registered under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<PartitionerFactory> {
        self.factories.read().get(name).cloned()
    }

    /// Lists all registered names, sorted.
    #[must_use]
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl fmt::Debug for PartitionerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartitionerRegistry")
            .field("partitioners", &self.list())
            .finish()
    }
}

fn boxed<P: KafkaPartitioner + Default + 'static>() -> Box<dyn KafkaPartitioner> {
    Box::new(P::default())
}

/// The resolved partitioner of a sink.
///
/// Holds the spec and a factory that creates one partitioner per sink
/// subtask. Two values are equal when their specs are equal.
#[derive(Clone)]
pub struct SinkPartitioner {
    spec: PartitionerSpec,
    factory: PartitionerFactory,
}

impl SinkPartitioner {
    /// Resolves `sink.partitioner`.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::InvalidValue` for an empty value,
    /// `ConnectorError::UnsupportedCombination` for `round-robin` together
    /// with `key.fields`, and `ConnectorError::InstantiationFailure` for a
    /// name that is not registered.
    pub fn from_options(
        options: &TableOptions,
        registry: &PartitionerRegistry,
    ) -> Result<Self, ConnectorError> {
        let raw = options
            .get_or_default(&SINK_PARTITIONER)?
            .unwrap_or_default();
        let spec: PartitionerSpec = raw
            .parse()
            .map_err(|reason: String| ConnectorError::invalid(SINK_PARTITIONER.key(), reason))?;

        let factory: PartitionerFactory = match &spec {
            PartitionerSpec::Default => Arc::new(boxed::<KeyHashPartitioner>),
            PartitionerSpec::Fixed => Arc::new(boxed::<FixedPartitioner>),
            PartitionerSpec::RoundRobin => {
                if options.contains(KEY_FIELDS.key()) {
                    return Err(ConnectorError::unsupported(format!(
                        "Currently 'round-robin' partitioner only works when option '{}' is not specified.",
                        KEY_FIELDS.key()
                    )));
                }
                Arc::new(boxed::<RoundRobinPartitioner>)
            }
            PartitionerSpec::Custom(name) => {
                registry
                    .get(name)
                    .ok_or_else(|| ConnectorError::InstantiationFailure {
                        class_name: name.clone(),
                        message: format!("Could not find and instantiate partitioner class '{name}'"),
                    })?
            }
        };

        debug!(partitioner = %spec, "resolved sink partitioner");
        Ok(Self { spec, factory })
    }

    /// Returns the partitioner spec.
    #[must_use]
    pub fn spec(&self) -> &PartitionerSpec {
        &self.spec
    }

    /// Creates a partitioner for one sink subtask.
    #[must_use]
    pub fn create(&self) -> Box<dyn KafkaPartitioner> {
        (self.factory)()
    }
}

impl PartialEq for SinkPartitioner {
    fn eq(&self, other: &Self) -> bool {
        self.spec == other.spec
    }
}

impl Eq for SinkPartitioner {}

impl fmt::Debug for SinkPartitioner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkPartitioner")
            .field("spec", &self.spec)
            .finish_non_exhaustive()
    }
}

/// Murmur2 hash function compatible with Kafka's `DefaultPartitioner`.
///
/// This is the 32-bit version used by Kafka for key-based partitioning.
fn murmur2(data: &[u8]) -> u32 {
    let seed: u32 = 0x9747_b28c;
    let m: u32 = 0x5bd1_e995;
    let r: u32 = 24;

    let len = data.len();
    #[allow(clippy::cast_possible_truncation)] // seed XOR 32-bit length
    let mut h: u32 = seed ^ (len as u32);

    let mut chunks = data.chunks_exact(4);
    for chunk in &mut chunks {
        let mut k = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        k = k.wrapping_mul(m);
        k ^= k >> r;
        k = k.wrapping_mul(m);
        h = h.wrapping_mul(m);
        h ^= k;
    }

    let tail = chunks.remainder();
    if tail.len() >= 3 {
        h ^= u32::from(tail[2]) << 16;
    }
    if tail.len() >= 2 {
        h ^= u32::from(tail[1]) << 8;
    }
    if !tail.is_empty() {
        h ^= u32::from(tail[0]);
        h = h.wrapping_mul(m);
    }

    h ^= h >> 13;
    h = h.wrapping_mul(m);
    h ^= h >> 15;

    h
}
