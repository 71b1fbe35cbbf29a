use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use arrow_schema::{DataType, Field, Fields};
use tracing::debug;

use super::{
    ChangelogMode, FormatFactory, FormatOptions, MetadataDeclarations, RecordDecoder,
    RecordEncoder,
};
use crate::config::TableOptions;
use crate::error::ConnectorError;
use crate::registry::FormatRegistry;
use crate::schema::row_fields;

/// Which metadata declaration a side of the table consults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MetadataAccess {
    Read,
    Write,
}

/// A serialization format resolved for one side of a table.
///
/// Carries the format-scoped options, the capabilities the provider declared
/// for them, the metadata keys applied to it and the row type the codec will
/// see. Two handles are equal when everything but the provider reference is
/// equal.
#[derive(Clone)]
pub struct FormatHandle {
    identifier: String,
    option_prefix: String,
    options: FormatOptions,
    changelog_mode: ChangelogMode,
    readable_metadata: MetadataDeclarations,
    writable_metadata: MetadataDeclarations,
    metadata_keys: Vec<String>,
    metadata_access: Option<MetadataAccess>,
    projected_data_type: DataType,
    provider: Arc<dyn FormatFactory>,
}

impl FormatHandle {
    /// Discovers the format named by `format_key`, if that key is set.
    ///
    /// Format options are read from `<prefix><identifier>.<option>` keys.
    /// Every recognised key is recorded in `consumed`; unrecognised keys under
    /// the format's prefix are left for the unsupported-options check.
    pub(crate) fn discover(
        registry: &FormatRegistry,
        options: &TableOptions,
        format_key: &str,
        prefix: &str,
        consumed: &mut BTreeSet<String>,
    ) -> Result<Option<Self>, ConnectorError> {
        let Some(identifier) = options.get(format_key) else {
            return Ok(None);
        };
        consumed.insert(format_key.to_string());

        let provider = registry.lookup(identifier, format_key)?;
        let option_prefix = format!("{prefix}{identifier}.");
        let scoped = options.properties_with_prefix(&option_prefix);

        let required = provider.required_options();
        let missing: Vec<String> = required
            .iter()
            .filter(|spec| !scoped.contains_key(&spec.key))
            .map(|spec| format!("{option_prefix}{}", spec.key))
            .collect();
        if !missing.is_empty() {
            let keys: Vec<&str> = missing.iter().map(String::as_str).collect();
            return Err(ConnectorError::missing(
                &keys,
                format!(
                    "One or more required options are missing.\n\nMissing required options are:\n\n{}",
                    missing.join("\n")
                ),
            ));
        }

        let known: BTreeSet<String> = required
            .into_iter()
            .chain(provider.optional_options())
            .map(|spec| spec.key)
            .collect();
        consumed.extend(
            scoped
                .keys()
                .filter(|k| known.contains(*k))
                .map(|k| format!("{option_prefix}{k}")),
        );

        let changelog_mode = provider.changelog_mode(&scoped)?;
        let readable_metadata = provider.readable_metadata(&scoped)?;
        let writable_metadata = provider.writable_metadata(&scoped)?;

        debug!(
            format = identifier,
            option = format_key,
            changelog_mode = %changelog_mode,
            "discovered format"
        );

        Ok(Some(Self {
            identifier: identifier.to_string(),
            option_prefix: prefix.to_string(),
            options: scoped,
            changelog_mode,
            readable_metadata,
            writable_metadata,
            metadata_keys: Vec::new(),
            metadata_access: None,
            projected_data_type: DataType::Struct(Fields::empty()),
            provider,
        }))
    }

    /// Applies format metadata keys. Must run before [`Self::project`].
    pub(crate) fn apply_metadata(&mut self, keys: Vec<String>, access: MetadataAccess) {
        self.metadata_keys = keys;
        self.metadata_access = Some(access);
    }

    /// Computes the row type the codec sees: the physical projection
    /// followed by one field per applied metadata key.
    pub(crate) fn project(&mut self, physical: &DataType) {
        let declared = match self.metadata_access {
            Some(MetadataAccess::Write) => &self.writable_metadata,
            Some(MetadataAccess::Read) | None => &self.readable_metadata,
        };
        let metadata_fields = self.metadata_keys.iter().filter_map(|key| {
            declared
                .get(key)
                .map(|data_type| Arc::new(Field::new(key, data_type.clone(), true)))
        });
        self.projected_data_type =
            DataType::Struct(row_fields(physical).iter().cloned().chain(metadata_fields).collect());
    }

    /// Returns the format identifier.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Returns the prefix of the format key: `""`, `key.` or `value.`.
    #[must_use]
    pub fn option_prefix(&self) -> &str {
        &self.option_prefix
    }

    /// Returns the format-scoped options.
    #[must_use]
    pub fn options(&self) -> &FormatOptions {
        &self.options
    }

    /// Returns the declared changelog mode.
    #[must_use]
    pub fn changelog_mode(&self) -> &ChangelogMode {
        &self.changelog_mode
    }

    /// Returns the metadata the format can expose when decoding.
    #[must_use]
    pub fn readable_metadata(&self) -> &MetadataDeclarations {
        &self.readable_metadata
    }

    /// Returns the metadata the format can persist when encoding.
    #[must_use]
    pub fn writable_metadata(&self) -> &MetadataDeclarations {
        &self.writable_metadata
    }

    /// Returns the applied metadata keys, without the `value.` prefix.
    #[must_use]
    pub fn metadata_keys(&self) -> &[String] {
        &self.metadata_keys
    }

    /// Returns the row type the codec produces or consumes.
    #[must_use]
    pub fn projected_data_type(&self) -> &DataType {
        &self.projected_data_type
    }

    /// Creates a decoder for the projected row type.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError` if the provider rejects the configuration.
    pub fn create_decoder(&self) -> Result<Box<dyn RecordDecoder>, ConnectorError> {
        self.provider
            .create_decoder(&self.options, &self.projected_data_type, &self.metadata_keys)
    }

    /// Creates an encoder for the projected row type.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError` if the provider rejects the configuration.
    pub fn create_encoder(&self) -> Result<Box<dyn RecordEncoder>, ConnectorError> {
        self.provider
            .create_encoder(&self.options, &self.projected_data_type)
    }
}

impl PartialEq for FormatHandle {
    fn eq(&self, other: &Self) -> bool {
        self.identifier == other.identifier
            && self.option_prefix == other.option_prefix
            && self.options == other.options
            && self.changelog_mode == other.changelog_mode
            && self.readable_metadata == other.readable_metadata
            && self.writable_metadata == other.writable_metadata
            && self.metadata_keys == other.metadata_keys
            && self.projected_data_type == other.projected_data_type
    }
}

impl Eq for FormatHandle {}

impl fmt::Debug for FormatHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormatHandle")
            .field("identifier", &self.identifier)
            .field("option_prefix", &self.option_prefix)
            .field("options", &self.options)
            .field("changelog_mode", &self.changelog_mode)
            .field("metadata_keys", &self.metadata_keys)
            .field("projected_data_type", &self.projected_data_type)
            .finish_non_exhaustive()
    }
}
