//! Key and value projections of the physical row.
//!
//! A Kafka record carries the table's physical columns split across its key
//! and its value. [`ProjectionIndices`] records which physical positions each
//! format sees, in the order the format sees them.

use arrow_schema::{DataType, Field, Fields};
use tracing::debug;

use crate::config::TableOptions;
use crate::error::ConnectorError;
use crate::kafka::options::{
    ValueFieldsStrategy, KEY_FIELDS, KEY_FIELDS_PREFIX, KEY_FORMAT, VALUE_FIELDS_INCLUDE,
};
use crate::schema::{project_row_type, row_fields, TableSchema};

/// Positions of the physical row fed to the key and value formats.
///
/// Under `EXCEPT_KEY` the two lists are disjoint. Under `ALL` the value list
/// is every physical position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectionIndices {
    /// Physical positions encoded in the key, in `key.fields` order.
    pub key: Vec<usize>,
    /// Physical positions encoded in the value, in schema order.
    pub value: Vec<usize>,
}

impl ProjectionIndices {
    /// Creates projections from explicit positions.
    #[must_use]
    pub fn new(key: Vec<usize>, value: Vec<usize>) -> Self {
        Self { key, value }
    }

    /// Resolves the key and value projections.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError` if `key.fields` and `key.format` are not
    /// declared together, a key field is repeated, is not a physical column
    /// or lacks the key prefix, or a key prefix is combined with `ALL`.
    pub fn from_options(
        options: &TableOptions,
        schema: &TableSchema,
    ) -> Result<Self, ConnectorError> {
        let physical = schema.physical_column_names();
        let prefix = options.get_optional(&KEY_FIELDS_PREFIX)?.unwrap_or_default();
        let key = key_projection(options, &physical, &prefix)?;

        let strategy = options
            .get_or_default(&VALUE_FIELDS_INCLUDE)?
            .unwrap_or_default();
        let value = match strategy {
            ValueFieldsStrategy::All => {
                if !prefix.is_empty() {
                    return Err(ConnectorError::conflict(
                        &[KEY_FIELDS_PREFIX.key(), VALUE_FIELDS_INCLUDE.key()],
                        format!(
                            "A key prefix is not allowed when option '{}' is set to '{}'. \
                             Set it to '{}' instead to avoid field overlaps.",
                            VALUE_FIELDS_INCLUDE.key(),
                            ValueFieldsStrategy::All,
                            ValueFieldsStrategy::ExceptKey
                        ),
                    ));
                }
                (0..physical.len()).collect()
            }
            ValueFieldsStrategy::ExceptKey => (0..physical.len())
                .filter(|pos| !key.contains(pos))
                .collect(),
        };

        debug!(key = ?key, value = ?value, strategy = %strategy, "resolved projections");
        Ok(Self { key, value })
    }

    /// Returns the row type the key format sees, with `prefix` stripped from
    /// field names.
    #[must_use]
    pub fn key_row_type(&self, physical: &DataType, prefix: Option<&str>) -> DataType {
        let projected = row_fields(&project_row_type(physical, &self.key));
        let Some(prefix) = prefix.filter(|p| !p.is_empty()) else {
            return DataType::Struct(projected);
        };
        let stripped: Fields = projected
            .iter()
            .map(|field| {
                let name = field.name().strip_prefix(prefix).unwrap_or(field.name());
                Field::new(name, field.data_type().clone(), field.is_nullable())
            })
            .collect();
        DataType::Struct(stripped)
    }

    /// Returns the row type the value format sees, before metadata fields.
    #[must_use]
    pub fn value_row_type(&self, physical: &DataType) -> DataType {
        project_row_type(physical, &self.value)
    }
}

/// Reads `key.fields-prefix`; an empty prefix is no prefix.
///
/// # Errors
///
/// Returns `ConnectorError::InvalidValue` if the option cannot be read.
pub fn key_prefix(options: &TableOptions) -> Result<Option<String>, ConnectorError> {
    Ok(options
        .get_optional(&KEY_FIELDS_PREFIX)?
        .filter(|p| !p.is_empty()))
}

fn key_projection(
    options: &TableOptions,
    physical: &[&str],
    prefix: &str,
) -> Result<Vec<usize>, ConnectorError> {
    let has_format = options.contains(KEY_FORMAT.key());
    let fields = options.get_optional(&KEY_FIELDS)?;
    let fields = match (has_format, fields) {
        (false, None) => return Ok(Vec::new()),
        (false, Some(_)) => {
            return Err(ConnectorError::conflict(
                &[KEY_FIELDS.key(), KEY_FORMAT.key()],
                format!(
                    "The option '{}' can only be declared if a key format is defined using '{}'.",
                    KEY_FIELDS.key(),
                    KEY_FORMAT.key()
                ),
            ))
        }
        (true, Some(fields)) if !fields.is_empty() => fields,
        (true, _) => {
            return Err(ConnectorError::missing(
                &[KEY_FIELDS.key(), KEY_FORMAT.key()],
                format!(
                    "A key format '{}' requires the declaration of one or more of key fields using '{}'.",
                    KEY_FORMAT.key(),
                    KEY_FIELDS.key()
                ),
            ))
        }
    };

    if let Some(repeated) = fields
        .iter()
        .enumerate()
        .find_map(|(i, f)| fields[..i].contains(f).then_some(f))
    {
        return Err(ConnectorError::invalid(
            KEY_FIELDS.key(),
            format!(
                "The field '{repeated}' is declared more than once in '{}'.",
                KEY_FIELDS.key()
            ),
        ));
    }

    fields
        .iter()
        .map(|field| {
            let pos = physical
                .iter()
                .position(|name| *name == field.as_str())
                .ok_or_else(|| ConnectorError::SchemaMismatch {
                    message: format!(
                        "Could not find the field '{field}' in the table schema for usage in the \
                         key format. A key field must be a regular, physical column. The following \
                         columns can be selected in the '{}' option:\n[{}]",
                        KEY_FIELDS.key(),
                        physical.join(", ")
                    ),
                })?;
            if !field.starts_with(prefix) {
                return Err(ConnectorError::invalid(
                    KEY_FIELDS.key(),
                    format!(
                        "All fields in '{}' must be prefixed with '{prefix}' when option '{}' \
                         is set but field '{field}' is not prefixed.",
                        KEY_FIELDS.key(),
                        KEY_FIELDS_PREFIX.key()
                    ),
                ));
            }
            Ok(pos)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Column;

    fn schema() -> TableSchema {
        TableSchema::new(vec![
            Column::physical("k_id", DataType::Int64),
            Column::physical("name", DataType::Utf8),
            Column::metadata("ts", DataType::Int64, Some("timestamp"), false),
            Column::physical("k_region", DataType::Utf8),
            Column::computed("c", DataType::Int64, "k_id + 1"),
        ])
    }

    fn options(pairs: &[(&str, &str)]) -> TableOptions {
        pairs.iter().copied().collect()
    }

    fn names(row_type: &DataType) -> Vec<String> {
        row_fields(row_type)
            .iter()
            .map(|f| f.name().clone())
            .collect()
    }

    #[test]
    fn test_no_key_format() {
        let projection = ProjectionIndices::from_options(&options(&[]), &schema()).unwrap();
        assert_eq!(projection, ProjectionIndices::new(vec![], vec![0, 1, 2]));
    }

    #[test]
    fn test_key_fields_all() {
        let projection = ProjectionIndices::from_options(
            &options(&[("key.format", "csv"), ("key.fields", "k_region;k_id")]),
            &schema(),
        )
        .unwrap();
        assert_eq!(projection, ProjectionIndices::new(vec![2, 0], vec![0, 1, 2]));
    }

    #[test]
    fn test_key_fields_except_key() {
        let projection = ProjectionIndices::from_options(
            &options(&[
                ("key.format", "csv"),
                ("key.fields", "k_id"),
                ("value.fields-include", "EXCEPT_KEY"),
            ]),
            &schema(),
        )
        .unwrap();
        assert_eq!(projection, ProjectionIndices::new(vec![0], vec![1, 2]));
    }

    #[test]
    fn test_unknown_key_field() {
        let err = ProjectionIndices::from_options(
            &options(&[("key.format", "csv"), ("key.fields", "c")]),
            &schema(),
        )
        .unwrap_err();
        assert!(matches!(err, ConnectorError::SchemaMismatch { .. }));
        assert_eq!(
            err.to_string(),
            "Could not find the field 'c' in the table schema for usage in the key format. \
             A key field must be a regular, physical column. The following columns can be \
             selected in the 'key.fields' option:\n[k_id, name, k_region]"
        );
    }

    #[test]
    fn test_key_fields_without_key_format() {
        let err = ProjectionIndices::from_options(&options(&[("key.fields", "k_id")]), &schema())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "The option 'key.fields' can only be declared if a key format is defined using 'key.format'."
        );
        assert_eq!(err.option_keys(), vec!["key.fields", "key.format"]);
    }

    #[test]
    fn test_key_format_without_key_fields() {
        for opts in [
            options(&[("key.format", "csv")]),
            options(&[("key.format", "csv"), ("key.fields", ";")]),
        ] {
            let err = ProjectionIndices::from_options(&opts, &schema()).unwrap_err();
            assert!(matches!(err, ConnectorError::MissingRequiredOption { .. }));
            assert_eq!(
                err.to_string(),
                "A key format 'key.format' requires the declaration of one or more of key fields using 'key.fields'."
            );
        }
    }

    #[test]
    fn test_key_prefix_with_except_key() {
        let opts = options(&[
            ("key.format", "csv"),
            ("key.fields", "k_id;k_region"),
            ("key.fields-prefix", "k_"),
            ("value.fields-include", "EXCEPT_KEY"),
        ]);
        let projection = ProjectionIndices::from_options(&opts, &schema()).unwrap();
        assert_eq!(projection, ProjectionIndices::new(vec![0, 2], vec![1]));

        let prefix = key_prefix(&opts).unwrap();
        assert_eq!(prefix.as_deref(), Some("k_"));
        let physical = schema().physical_row_type();
        assert_eq!(
            names(&projection.key_row_type(&physical, prefix.as_deref())),
            vec!["id", "region"]
        );
        assert_eq!(names(&projection.value_row_type(&physical)), vec!["name"]);
    }

    #[test]
    fn test_key_field_missing_prefix() {
        let err = ProjectionIndices::from_options(
            &options(&[
                ("key.format", "csv"),
                ("key.fields", "k_id;name"),
                ("key.fields-prefix", "k_"),
                ("value.fields-include", "EXCEPT_KEY"),
            ]),
            &schema(),
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "All fields in 'key.fields' must be prefixed with 'k_' when option 'key.fields-prefix' \
             is set but field 'name' is not prefixed."
        );
    }

    #[test]
    fn test_duplicate_key_field_rejected() {
        let err = ProjectionIndices::from_options(
            &options(&[("key.format", "csv"), ("key.fields", "name;k_id;name")]),
            &schema(),
        )
        .unwrap_err();
        assert!(matches!(err, ConnectorError::InvalidValue { .. }));
        assert_eq!(err.option_keys(), vec!["key.fields"]);
        assert_eq!(
            err.to_string(),
            "The field 'name' is declared more than once in 'key.fields'."
        );
    }

    #[test]
    fn test_key_prefix_with_all_rejected() {
        let err = ProjectionIndices::from_options(
            &options(&[
                ("key.format", "csv"),
                ("key.fields", "k_id"),
                ("key.fields-prefix", "k_"),
            ]),
            &schema(),
        )
        .unwrap_err();
        assert!(matches!(err, ConnectorError::ConfigurationConflict { .. }));
        assert_eq!(
            err.to_string(),
            "A key prefix is not allowed when option 'value.fields-include' is set to 'ALL'. \
             Set it to 'EXCEPT_KEY' instead to avoid field overlaps."
        );
    }

    #[test]
    fn test_empty_prefix_is_no_prefix() {
        let opts = options(&[("key.fields-prefix", "")]);
        assert_eq!(key_prefix(&opts).unwrap(), None);
        assert!(ProjectionIndices::from_options(&opts, &schema()).is_ok());
    }
}
