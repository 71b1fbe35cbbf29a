//! Table option types.
//!
//! Provides the typed option model every resolver consults:
//! - [`TableOptions`]: The flat, case-sensitive `WITH (...)` option map
//! - [`ConfigOption`]: A typed option key with parser, validator and default
//! - [`OptionValue`]: Parsing of option strings into typed values
//! - [`ConfigKeySpec`]: Documentation view of a recognised key

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::marker::PhantomData;
use std::time::Duration;

use crate::error::ConnectorError;

/// The option map of a table definition.
///
/// Options arrive as a flat string key-value map, typically parsed from a
/// SQL `WITH (...)` clause by the catalog layer. Keys are case-sensitive and
/// unique. A `BTreeMap` keeps iteration (and therefore error messages and
/// derived property maps) deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableOptions {
    properties: BTreeMap<String, String>,
}

impl TableOptions {
    /// Creates an empty option map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an option.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    /// Removes an option, returning its previous value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.properties.remove(key)
    }

    /// Gets a raw option value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Returns `true` if the key is present.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    /// Gets a required raw option value.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::MissingRequiredOption` if the key is not set.
    pub fn require(&self, key: &str) -> Result<&str, ConnectorError> {
        self.get(key).ok_or_else(|| {
            ConnectorError::missing(
                &[key],
                format!("One or more required options are missing.\n\nMissing required options are:\n\n{key}"),
            )
        })
    }

    /// Reads a typed option without falling back to its default.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::InvalidValue` if the value cannot be parsed
    /// or is rejected by the option's validator.
    pub fn get_optional<T: OptionValue>(
        &self,
        option: &ConfigOption<T>,
    ) -> Result<Option<T>, ConnectorError> {
        match self.get(option.key) {
            Some(raw) => option.parse(raw).map(Some),
            None => Ok(None),
        }
    }

    /// Reads a typed option, falling back to its declared default.
    ///
    /// Returns `Ok(None)` only for options without a default.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::InvalidValue` if the value cannot be parsed.
    pub fn get_or_default<T: OptionValue>(
        &self,
        option: &ConfigOption<T>,
    ) -> Result<Option<T>, ConnectorError> {
        match (self.get(option.key), option.default) {
            (Some(raw), _) | (None, Some(raw)) => option.parse(raw).map(Some),
            (None, None) => Ok(None),
        }
    }

    /// Returns all options.
    #[must_use]
    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    /// Returns options with a given prefix, with the prefix stripped.
    #[must_use]
    pub fn properties_with_prefix(&self, prefix: &str) -> BTreeMap<String, String> {
        self.properties
            .iter()
            .filter_map(|(k, v)| {
                k.strip_prefix(prefix)
                    .map(|stripped| (stripped.to_string(), v.clone()))
            })
            .collect()
    }

    /// Returns the keys not covered by `consumed` or any pass-through prefix.
    ///
    /// The result is sorted.
    #[must_use]
    pub fn unconsumed_keys(
        &self,
        consumed: &BTreeSet<String>,
        passthrough_prefixes: &[&str],
    ) -> Vec<String> {
        self.properties
            .keys()
            .filter(|k| !consumed.contains(*k))
            .filter(|k| !passthrough_prefixes.iter().any(|p| k.starts_with(p)))
            .cloned()
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TableOptions {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            properties: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Parsing of raw option strings into typed values.
pub trait OptionValue: Sized {
    /// Parses a raw option value. The error is a short reason, without the
    /// option key.
    ///
    /// # Errors
    ///
    /// Returns a reason string if the value is not valid for this type.
    fn parse_value(raw: &str) -> Result<Self, String>;
}

impl OptionValue for String {
    fn parse_value(raw: &str) -> Result<Self, String> {
        Ok(raw.to_string())
    }
}

impl OptionValue for bool {
    fn parse_value(raw: &str) -> Result<Self, String> {
        match raw.trim().to_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(format!("'{other}' is not a boolean")),
        }
    }
}

macro_rules! impl_option_value_for_int {
    ($($t:ty),*) => {
        $(
            impl OptionValue for $t {
                fn parse_value(raw: &str) -> Result<Self, String> {
                    raw.trim().parse::<$t>().map_err(|e| format!("'{raw}': {e}"))
                }
            }
        )*
    };
}

impl_option_value_for_int!(i32, i64, u32, u64, usize);

/// A list option: entries separated by `;` (or `,`), trimmed, empties dropped.
impl OptionValue for Vec<String> {
    fn parse_value(raw: &str) -> Result<Self, String> {
        Ok(raw
            .split([';', ','])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect())
    }
}

/// A duration option such as `1000 ms`, `5 s`, `1 min`. A bare number is
/// read as milliseconds.
impl OptionValue for Duration {
    fn parse_value(raw: &str) -> Result<Self, String> {
        let trimmed = raw.trim();
        let split = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        let (number, unit) = trimmed.split_at(split);
        let amount: u64 = number
            .parse()
            .map_err(|_| format!("'{raw}' is not a valid duration"))?;
        let seconds_per_unit = match unit.trim().to_lowercase().as_str() {
            "" | "ms" | "milli" | "millis" | "millisecond" | "milliseconds" => {
                return Ok(Duration::from_millis(amount));
            }
            "s" | "sec" | "secs" | "second" | "seconds" => 1,
            "min" | "mins" | "minute" | "minutes" => 60,
            "h" | "hour" | "hours" => 3_600,
            "d" | "day" | "days" => 86_400,
            other => return Err(format!("unknown duration unit '{other}' in '{raw}'")),
        };
        let seconds = amount
            .checked_mul(seconds_per_unit)
            .ok_or_else(|| format!("'{raw}' is out of range"))?;
        Ok(Duration::from_secs(seconds))
    }
}

/// Validator attached to a [`ConfigOption`].
pub type OptionValidator<T> = fn(&T) -> Result<(), String>;

/// A typed option key.
///
/// Bundles the key literal with its parser (via [`OptionValue`]), an
/// optional validator and an optional default. Resolvers read options only
/// through these constants, so each key literal exists exactly once.
pub struct ConfigOption<T> {
    key: &'static str,
    description: &'static str,
    default: Option<&'static str>,
    validator: Option<OptionValidator<T>>,
    _value: PhantomData<fn() -> T>,
}

impl<T> ConfigOption<T> {
    /// Declares an option without a default.
    #[must_use]
    pub const fn new(key: &'static str, description: &'static str) -> Self {
        Self {
            key,
            description,
            default: None,
            validator: None,
            _value: PhantomData,
        }
    }

    /// Sets the default, written in the option's string form.
    #[must_use]
    pub const fn with_default(mut self, default: &'static str) -> Self {
        self.default = Some(default);
        self
    }

    /// Attaches a validator run after parsing.
    #[must_use]
    pub const fn with_validator(mut self, validator: OptionValidator<T>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Returns the option key.
    #[must_use]
    pub const fn key(&self) -> &'static str {
        self.key
    }

    /// Returns a documentation view of this option.
    #[must_use]
    pub fn spec(&self, required: bool) -> ConfigKeySpec {
        ConfigKeySpec {
            key: self.key.to_string(),
            description: self.description.to_string(),
            required,
            default: self.default.map(String::from),
        }
    }
}

impl<T: OptionValue> ConfigOption<T> {
    /// Parses and validates a raw value for this option.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::InvalidValue` naming the key.
    pub fn parse(&self, raw: &str) -> Result<T, ConnectorError> {
        let value = T::parse_value(raw).map_err(|reason| {
            ConnectorError::invalid(
                self.key,
                format!("Invalid value for option '{}': {reason}", self.key),
            )
        })?;
        if let Some(validate) = self.validator {
            validate(&value).map_err(|message| ConnectorError::invalid(self.key, message))?;
        }
        Ok(value)
    }
}

impl<T> fmt::Debug for ConfigOption<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigOption")
            .field("key", &self.key)
            .field("default", &self.default)
            .finish_non_exhaustive()
    }
}

/// Specification for a configuration key.
///
/// Used by the factory to document its expected configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigKeySpec {
    /// The configuration key name.
    pub key: String,

    /// Human-readable description.
    pub description: String,

    /// Whether this key is required.
    pub required: bool,

    /// Default value if not provided.
    pub default: Option<String>,
}

impl ConfigKeySpec {
    /// Creates a required configuration key spec.
    #[must_use]
    pub fn required(key: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            description: description.into(),
            required: true,
            default: None,
        }
    }

    /// Creates an optional configuration key spec without a default.
    #[must_use]
    pub fn optional(key: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            description: description.into(),
            required: false,
            default: None,
        }
    }
}
