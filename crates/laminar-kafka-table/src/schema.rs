//! Resolved table schema model.
//!
//! The catalog layer hands the factory a fully resolved schema: ordered
//! columns (physical, computed or metadata), an optional primary key and an
//! optional watermark. Column types are Arrow [`DataType`]s.

use std::fmt;

use arrow_schema::{DataType, Field, Fields};

use crate::config::TableOptions;

/// A column of a resolved table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Column {
    /// A regular column stored in the record key or value.
    Physical {
        /// Column name.
        name: String,
        /// Column type.
        data_type: DataType,
        /// Whether the column is nullable.
        nullable: bool,
    },
    /// A column computed from an expression over other columns.
    Computed {
        /// Column name.
        name: String,
        /// Result type of the expression.
        data_type: DataType,
        /// The expression text.
        expression: String,
    },
    /// A column mapped to record metadata (offset, timestamp, headers, ...).
    Metadata {
        /// Column name.
        name: String,
        /// Column type.
        data_type: DataType,
        /// Metadata key, defaults to the column name when absent.
        key: Option<String>,
        /// Virtual columns are read-only and never written by a sink.
        is_virtual: bool,
    },
}

impl Column {
    /// Creates a nullable physical column.
    #[must_use]
    pub fn physical(name: impl Into<String>, data_type: DataType) -> Self {
        Self::Physical {
            name: name.into(),
            data_type,
            nullable: true,
        }
    }

    /// Creates a computed column.
    #[must_use]
    pub fn computed(
        name: impl Into<String>,
        data_type: DataType,
        expression: impl Into<String>,
    ) -> Self {
        Self::Computed {
            name: name.into(),
            data_type,
            expression: expression.into(),
        }
    }

    /// Creates a metadata column.
    #[must_use]
    pub fn metadata(
        name: impl Into<String>,
        data_type: DataType,
        key: Option<&str>,
        is_virtual: bool,
    ) -> Self {
        Self::Metadata {
            name: name.into(),
            data_type,
            key: key.map(String::from),
            is_virtual,
        }
    }

    /// Returns the column name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Physical { name, .. }
            | Self::Computed { name, .. }
            | Self::Metadata { name, .. } => name,
        }
    }

    /// Returns the column type.
    #[must_use]
    pub fn data_type(&self) -> &DataType {
        match self {
            Self::Physical { data_type, .. }
            | Self::Computed { data_type, .. }
            | Self::Metadata { data_type, .. } => data_type,
        }
    }

    /// Returns `true` for physical columns.
    #[must_use]
    pub fn is_physical(&self) -> bool {
        matches!(self, Self::Physical { .. })
    }

    /// Returns the metadata key of a metadata column.
    ///
    /// Falls back to the column name when no explicit key was declared.
    #[must_use]
    pub fn metadata_key(&self) -> Option<&str> {
        match self {
            Self::Metadata { name, key, .. } => Some(key.as_deref().unwrap_or(name)),
            _ => None,
        }
    }

    /// Returns `true` if the column is stored by a sink: physical columns and
    /// non-virtual metadata columns.
    #[must_use]
    pub fn is_persisted(&self) -> bool {
        match self {
            Self::Physical { .. } => true,
            Self::Computed { .. } => false,
            Self::Metadata { is_virtual, .. } => !is_virtual,
        }
    }

    fn to_field(&self) -> Field {
        let nullable = match self {
            Self::Physical { nullable, .. } => *nullable,
            Self::Computed { .. } | Self::Metadata { .. } => true,
        };
        Field::new(self.name(), self.data_type().clone(), nullable)
    }
}

/// A named primary key or unique constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueConstraint {
    /// Constraint name.
    pub name: String,
    /// Ordered column names.
    pub columns: Vec<String>,
}

/// A watermark declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatermarkSpec {
    /// The rowtime column.
    pub column: String,
    /// The watermark expression text.
    pub expression: String,
}

/// An ordered column list with optional primary key and watermark.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableSchema {
    columns: Vec<Column>,
    primary_key: Option<UniqueConstraint>,
    watermark: Option<WatermarkSpec>,
}

impl TableSchema {
    /// Creates a schema from ordered columns.
    #[must_use]
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            primary_key: None,
            watermark: None,
        }
    }

    /// Declares a primary key.
    #[must_use]
    pub fn with_primary_key(mut self, name: impl Into<String>, columns: &[&str]) -> Self {
        self.primary_key = Some(UniqueConstraint {
            name: name.into(),
            columns: columns.iter().map(|c| (*c).to_string()).collect(),
        });
        self
    }

    /// Declares a watermark.
    #[must_use]
    pub fn with_watermark(
        mut self,
        column: impl Into<String>,
        expression: impl Into<String>,
    ) -> Self {
        self.watermark = Some(WatermarkSpec {
            column: column.into(),
            expression: expression.into(),
        });
        self
    }

    /// Returns all columns in declared order.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Returns the primary key, if declared.
    #[must_use]
    pub fn primary_key(&self) -> Option<&UniqueConstraint> {
        self.primary_key.as_ref()
    }

    /// Returns the watermark, if declared.
    #[must_use]
    pub fn watermark(&self) -> Option<&WatermarkSpec> {
        self.watermark.as_ref()
    }

    /// Returns the physical columns in declared order.
    pub fn physical_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.is_physical())
    }

    /// Returns the metadata columns in declared order.
    pub fn metadata_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns
            .iter()
            .filter(|c| matches!(c, Column::Metadata { .. }))
    }

    /// Returns the physical column names in declared order.
    #[must_use]
    pub fn physical_column_names(&self) -> Vec<&str> {
        self.physical_columns().map(Column::name).collect()
    }

    /// Returns the physical row type: a struct of the physical columns.
    #[must_use]
    pub fn physical_row_type(&self) -> DataType {
        DataType::Struct(self.physical_columns().map(Column::to_field).collect())
    }

    /// Returns the row type of physical columns followed by the given
    /// metadata columns.
    #[must_use]
    pub(crate) fn row_type_with<'a>(
        &'a self,
        metadata: impl IntoIterator<Item = &'a Column>,
    ) -> DataType {
        let fields: Fields = self
            .physical_columns()
            .chain(metadata)
            .map(Column::to_field)
            .collect();
        DataType::Struct(fields)
    }
}

/// A fully qualified `catalog.database.object` table name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectIdentifier {
    /// Catalog name.
    pub catalog: String,
    /// Database name.
    pub database: String,
    /// Object name.
    pub object: String,
}

impl ObjectIdentifier {
    /// Creates an identifier.
    #[must_use]
    pub fn new(
        catalog: impl Into<String>,
        database: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            catalog: catalog.into(),
            database: database.into(),
            object: object.into(),
        }
    }

    /// Returns the dotted form used in messages, e.g. `default.default.t1`.
    #[must_use]
    pub fn as_summary_string(&self) -> String {
        format!("{}.{}.{}", self.catalog, self.database, self.object)
    }
}

impl fmt::Display for ObjectIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_summary_string())
    }
}

/// The input of the table factory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTable {
    /// The table name.
    pub identifier: ObjectIdentifier,
    /// The resolved schema.
    pub schema: TableSchema,
    /// The raw `WITH (...)` options.
    pub options: TableOptions,
}

impl ResolvedTable {
    /// Creates a resolved table.
    #[must_use]
    pub fn new(identifier: ObjectIdentifier, schema: TableSchema, options: TableOptions) -> Self {
        Self {
            identifier,
            schema,
            options,
        }
    }
}

/// Returns the struct fields of a row type, or an empty list for non-struct
/// types.
#[must_use]
pub fn row_fields(row_type: &DataType) -> Fields {
    match row_type {
        DataType::Struct(fields) => fields.clone(),
        _ => Fields::empty(),
    }
}

/// Projects a row type to the fields at `indices`, in that order.
///
/// Out-of-range indices are skipped.
#[must_use]
pub fn project_row_type(row_type: &DataType, indices: &[usize]) -> DataType {
    let fields = row_fields(row_type);
    DataType::Struct(
        indices
            .iter()
            .filter_map(|&i| fields.get(i).cloned())
            .collect(),
    )
}
