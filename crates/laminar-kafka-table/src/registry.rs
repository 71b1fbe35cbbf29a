//! Format registry.
//!
//! The [`FormatRegistry`] maintains the catalog of available serialization
//! format providers. Resolution looks providers up by the identifier found in
//! the `format`, `key.format` or `value.format` option.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::ConnectorError;
use crate::format::FormatFactory;

/// Registry of available format providers.
///
/// Cloning is cheap; clones share the same catalog.
///
/// # Example
///
/// ```rust,ignore
/// use laminar_kafka_table::registry::FormatRegistry;
///
/// let registry = FormatRegistry::new();
/// registry.register(Arc::new(JsonFormatFactory::new()));
///
/// let json = registry.lookup("json", "value.format")?;
/// ```
#[derive(Clone)]
pub struct FormatRegistry {
    formats: Arc<RwLock<HashMap<String, Arc<dyn FormatFactory>>>>,
}

impl FormatRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            formats: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Registers a format provider under its identifier.
    ///
    /// A provider with the same identifier is replaced.
    pub fn register(&self, factory: Arc<dyn FormatFactory>) {
        self.formats
            .write()
            .insert(factory.identifier().to_string(), factory);
    }

    /// Returns the provider registered under `identifier`.
    #[must_use]
    pub fn get(&self, identifier: &str) -> Option<Arc<dyn FormatFactory>> {
        self.formats.read().get(identifier).cloned()
    }

    /// Looks up a provider requested through `option`.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::UnknownFormat` listing the registered
    /// identifiers if none matches.
    pub fn lookup(
        &self,
        identifier: &str,
        option: &str,
    ) -> Result<Arc<dyn FormatFactory>, ConnectorError> {
        self.get(identifier)
            .ok_or_else(|| ConnectorError::UnknownFormat {
                identifier: identifier.to_string(),
                option: option.to_string(),
                available: self.list().join(", "),
            })
    }

    /// Lists all registered identifiers, sorted.
    #[must_use]
    pub fn list(&self) -> Vec<String> {
        let mut identifiers: Vec<String> = self.formats.read().keys().cloned().collect();
        identifiers.sort();
        identifiers
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormatRegistry")
            .field("formats", &self.list())
            .finish()
    }
}
