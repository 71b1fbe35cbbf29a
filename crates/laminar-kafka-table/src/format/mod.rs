//! Serialization format capability.
//!
//! The connector never decodes or encodes bytes itself. It delegates to a
//! [`FormatFactory`] selected by identifier:
//!
//! - [`FormatFactory`]: Declares a format's options, changelog mode and
//!   metadata, and builds codecs for a projected row type
//! - [`RecordDecoder`]: Converts raw record bytes to Arrow `RecordBatch`
//! - [`RecordEncoder`]: Converts Arrow `RecordBatch` to raw record bytes
//! - [`ChangelogMode`]: The set of row kinds a format can carry
//! - [`FormatHandle`]: A format resolved for one side (key or value) of a
//!   table

mod handle;

pub use handle::FormatHandle;
pub(crate) use handle::MetadataAccess;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use arrow_array::RecordBatch;
use arrow_schema::{DataType, SchemaRef};

use crate::config::ConfigKeySpec;
use crate::error::{ConnectorError, SerdeError};

/// Format-scoped options: the table options under the format's prefix,
/// with the `<prefix><identifier>.` part stripped.
pub type FormatOptions = BTreeMap<String, String>;

/// Declared metadata of a format: key to data type.
pub type MetadataDeclarations = BTreeMap<String, DataType>;

/// The kind of change a row represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChangeKind {
    /// `+I`: an inserted row.
    Insert,
    /// `-U`: the previous content of an updated row.
    UpdateBefore,
    /// `+U`: the new content of an updated row.
    UpdateAfter,
    /// `-D`: a deleted row.
    Delete,
}

impl ChangeKind {
    /// Returns the short form used in option values (`I`, `UB`, `UA`, `D`).
    #[must_use]
    pub fn short_string(&self) -> &'static str {
        match self {
            Self::Insert => "I",
            Self::UpdateBefore => "UB",
            Self::UpdateAfter => "UA",
            Self::Delete => "D",
        }
    }
}

impl FromStr for ChangeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "I" | "+I" => Ok(Self::Insert),
            "UB" | "-U" => Ok(Self::UpdateBefore),
            "UA" | "+U" => Ok(Self::UpdateAfter),
            "D" | "-D" => Ok(Self::Delete),
            other => Err(format!("unknown change kind: '{other}'")),
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_string())
    }
}

/// The set of change kinds a format produces or accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangelogMode {
    kinds: BTreeSet<ChangeKind>,
}

impl ChangelogMode {
    /// A mode containing only inserts.
    #[must_use]
    pub fn insert_only() -> Self {
        Self::from_kinds([ChangeKind::Insert])
    }

    /// A mode containing every change kind.
    #[must_use]
    pub fn all() -> Self {
        Self::from_kinds([
            ChangeKind::Insert,
            ChangeKind::UpdateBefore,
            ChangeKind::UpdateAfter,
            ChangeKind::Delete,
        ])
    }

    /// Builds a mode from the given kinds.
    #[must_use]
    pub fn from_kinds(kinds: impl IntoIterator<Item = ChangeKind>) -> Self {
        Self {
            kinds: kinds.into_iter().collect(),
        }
    }

    /// Returns `true` if the mode contains `kind`.
    #[must_use]
    pub fn contains(&self, kind: ChangeKind) -> bool {
        self.kinds.contains(&kind)
    }

    /// Returns `true` if inserts are the only change kind.
    #[must_use]
    pub fn contains_only_inserts(&self) -> bool {
        self.kinds.len() == 1 && self.contains(ChangeKind::Insert)
    }

    /// Returns the kinds in canonical order.
    pub fn kinds(&self) -> impl Iterator<Item = ChangeKind> + '_ {
        self.kinds.iter().copied()
    }
}

impl Default for ChangelogMode {
    fn default() -> Self {
        Self::insert_only()
    }
}

/// Parses `I;UA;UB;D` style lists.
impl FromStr for ChangelogMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kinds = s
            .split([';', ','])
            .filter(|k| !k.trim().is_empty())
            .map(str::parse::<ChangeKind>)
            .collect::<Result<BTreeSet<ChangeKind>, _>>()?;
        if kinds.is_empty() {
            return Err("changelog mode must contain at least one change kind".into());
        }
        Ok(Self { kinds })
    }
}

impl fmt::Display for ChangelogMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kinds: Vec<&str> = self.kinds().map(|k| k.short_string()).collect();
        write!(f, "[{}]", kinds.join(", "))
    }
}

/// A serialization format provider.
///
/// Providers are registered in a [`FormatRegistry`](crate::registry::FormatRegistry)
/// and looked up by [`identifier`](Self::identifier). All option arguments
/// are format-scoped (see [`FormatOptions`]).
pub trait FormatFactory: Send + Sync {
    /// Returns the unique format identifier, e.g. `json` or `avro-confluent`.
    fn identifier(&self) -> &str;

    /// Returns the options that must be present.
    fn required_options(&self) -> Vec<ConfigKeySpec>;

    /// Returns the options that may be present.
    fn optional_options(&self) -> Vec<ConfigKeySpec>;

    /// Returns the change kinds this format can carry.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::InvalidValue` if an option is malformed.
    fn changelog_mode(&self, options: &FormatOptions) -> Result<ChangelogMode, ConnectorError>;

    /// Returns the metadata this format can expose when decoding.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::InvalidValue` if an option is malformed.
    fn readable_metadata(
        &self,
        _options: &FormatOptions,
    ) -> Result<MetadataDeclarations, ConnectorError> {
        Ok(MetadataDeclarations::new())
    }

    /// Returns the metadata this format can persist when encoding.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::InvalidValue` if an option is malformed.
    fn writable_metadata(
        &self,
        _options: &FormatOptions,
    ) -> Result<MetadataDeclarations, ConnectorError> {
        Ok(MetadataDeclarations::new())
    }

    /// Creates a decoder producing rows of `produced_type`.
    ///
    /// `produced_type` already contains one trailing field per entry of
    /// `metadata_keys`.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError` if the decoder cannot be configured.
    fn create_decoder(
        &self,
        options: &FormatOptions,
        produced_type: &DataType,
        metadata_keys: &[String],
    ) -> Result<Box<dyn RecordDecoder>, ConnectorError>;

    /// Creates an encoder consuming rows of `consumed_type`.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError` if the encoder cannot be configured.
    fn create_encoder(
        &self,
        options: &FormatOptions,
        consumed_type: &DataType,
    ) -> Result<Box<dyn RecordEncoder>, ConnectorError>;
}

/// Trait for decoding raw record bytes into Arrow `RecordBatch`.
pub trait RecordDecoder: Send {
    /// Returns the schema of produced batches.
    fn schema(&self) -> SchemaRef;

    /// Decodes a batch of records.
    ///
    /// # Errors
    ///
    /// Returns `SerdeError` if any record cannot be parsed.
    fn decode(&mut self, records: &[&[u8]]) -> Result<RecordBatch, SerdeError>;
}

/// Trait for encoding Arrow `RecordBatch` into raw record bytes.
pub trait RecordEncoder: Send {
    /// Returns the schema of consumed batches.
    fn schema(&self) -> SchemaRef;

    /// Encodes every row of `batch` into one record each.
    ///
    /// # Errors
    ///
    /// Returns `SerdeError` if a row cannot be encoded.
    fn encode(&mut self, batch: &RecordBatch) -> Result<Vec<Vec<u8>>, SerdeError>;
}
