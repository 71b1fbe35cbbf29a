//! Default schema-registry subjects.
//!
//! Confluent Avro formats look their schema up under a subject. When a sink
//! writes a single topic and the table does not name a subject, the subject
//! follows the topic-name strategy: `<topic>-value` and `<topic>-key`.

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::config::{ConfigOption, TableOptions};
use crate::kafka::options::{FORMAT, KEY_FORMAT, KEY_PREFIX, VALUE_FORMAT, VALUE_PREFIX};

/// Format option holding the subject name.
const SUBJECT: &str = "subject";

/// Formats backed by a schema registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaRegistryFormat {
    /// `avro-confluent`
    AvroConfluent,
    /// `debezium-avro-confluent`
    DebeziumAvroConfluent,
}

impl SchemaRegistryFormat {
    /// Returns the format identifier.
    #[must_use]
    pub fn identifier(&self) -> &'static str {
        match self {
            Self::AvroConfluent => "avro-confluent",
            Self::DebeziumAvroConfluent => "debezium-avro-confluent",
        }
    }
}

impl FromStr for SchemaRegistryFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "avro-confluent" => Ok(Self::AvroConfluent),
            "debezium-avro-confluent" => Ok(Self::DebeziumAvroConfluent),
            other => Err(format!("'{other}' is not a schema registry format")),
        }
    }
}

impl fmt::Display for SchemaRegistryFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

/// Returns a copy of `options` with default subjects filled in for every
/// schema-registry format that does not declare one.
///
/// The connector-wide `format` takes precedence over `value.format`.
#[must_use]
pub fn autocomplete_subjects(options: &TableOptions, topic: &str) -> TableOptions {
    let mut completed = options.clone();

    let value_side = [(&FORMAT, ""), (&VALUE_FORMAT, VALUE_PREFIX)]
        .into_iter()
        .find(|(option, _)| options.contains(option.key()));
    if let Some((option, prefix)) = value_side {
        fill_subject(&mut completed, option, prefix, &format!("{topic}-value"));
    }
    fill_subject(&mut completed, &KEY_FORMAT, KEY_PREFIX, &format!("{topic}-key"));

    completed
}

fn fill_subject(
    options: &mut TableOptions,
    format_option: &ConfigOption<String>,
    prefix: &str,
    subject: &str,
) {
    let Some(format) = options
        .get(format_option.key())
        .and_then(|id| id.parse::<SchemaRegistryFormat>().ok())
    else {
        return;
    };
    let key = format!("{prefix}{format}.{SUBJECT}");
    if options.contains(&key) {
        return;
    }
    debug!(option = %key, subject, "using default subject");
    options.set(key, subject);
}
