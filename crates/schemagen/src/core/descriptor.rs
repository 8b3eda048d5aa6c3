//! Entity descriptors: the declarative, annotation-shaped input consumed by
//! the projector.
//!
//! A descriptor is a plain value describing one persistent class: its table
//! and schema overrides, and one [`FieldDescriptor`] per persistent field.
//! Callers populate descriptors from their own metadata source; a serde
//! loader is provided for descriptor packs kept on disk.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{GeneratorError, Result};

/// One persistent class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityDescriptor {
    /// Simple class name (e.g. `UserAccount`).
    pub name: String,

    /// Dotted namespace path; the last segment is the default partition.
    #[serde(default)]
    pub package: String,

    /// Table-level overrides.
    #[serde(default)]
    pub table: TableSpec,

    /// Persistent fields, in declaration order (inherited fields first).
    pub fields: Vec<FieldDescriptor>,
}

impl EntityDescriptor {
    /// Create a descriptor with no table overrides and no fields.
    pub fn new(name: impl Into<String>, package: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            package: package.into(),
            table: TableSpec::default(),
            fields: Vec::new(),
        }
    }

    /// Append a field.
    pub fn with_field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Override the physical table name.
    pub fn with_table_name(mut self, name: impl Into<String>) -> Self {
        self.table.name = Some(name.into());
        self
    }

    /// Override the schema partition.
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.table.schema = Some(schema.into());
        self
    }

    /// The field marked as primary key, if any.
    pub fn id_field(&self) -> Option<&FieldDescriptor> {
        self.fields
            .iter()
            .find(|f| matches!(f.kind, FieldKind::Id { .. }))
    }

    /// Last segment of the package path, lowercased. Empty when the package
    /// is empty.
    pub fn package_tail(&self) -> String {
        self.package
            .rsplit('.')
            .next()
            .unwrap_or("")
            .to_lowercase()
    }
}

/// Table-level annotation data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableSpec {
    /// Explicit physical table name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Explicit schema partition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// Declared indexes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indexes: Vec<IndexSpec>,
}

/// A declared index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSpec {
    /// Index name; synthesized from the column list when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Indexed physical column names, in order.
    pub columns: Vec<String>,

    /// Whether the index is unique.
    #[serde(default)]
    pub unique: bool,
}

/// One persistent field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Field name as declared (typically camelCase).
    pub name: String,

    /// Logical type name (e.g. `String`, `Long`, `LocalDateTime`, `UUID`).
    pub type_name: String,

    /// Whether the type is an enum (mapped to `VARCHAR(50)`).
    #[serde(default)]
    pub enum_type: bool,

    /// What kind of mapping the field's annotations request.
    #[serde(default)]
    pub kind: FieldKind,
}

impl FieldDescriptor {
    /// A plain column field without annotation metadata.
    pub fn plain(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            enum_type: false,
            kind: FieldKind::Plain { column: None },
        }
    }

    /// A plain column field with column annotation metadata.
    pub fn plain_with(
        name: impl Into<String>,
        type_name: impl Into<String>,
        column: ColumnSpec,
    ) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            enum_type: false,
            kind: FieldKind::Plain {
                column: Some(column),
            },
        }
    }

    /// A primary-key field.
    pub fn id(
        name: impl Into<String>,
        type_name: impl Into<String>,
        strategy: Option<IdStrategy>,
    ) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            enum_type: false,
            kind: FieldKind::Id {
                strategy,
                column: None,
            },
        }
    }

    /// A to-one relation field.
    pub fn to_one(
        name: impl Into<String>,
        target: impl Into<String>,
        join: Option<JoinSpec>,
    ) -> Self {
        let target = target.into();
        Self {
            name: name.into(),
            type_name: target.clone(),
            enum_type: false,
            kind: FieldKind::ToOne { target, join },
        }
    }

    /// Mark the field as an enum type.
    pub fn as_enum(mut self) -> Self {
        self.enum_type = true;
        self
    }
}

/// Field mapping kind, mirroring the annotation vocabulary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldKind {
    /// Primary key (`@Id`), with an optional generation strategy and
    /// column override.
    Id {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        strategy: Option<IdStrategy>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        column: Option<ColumnSpec>,
    },
    /// To-one relation (`@ManyToOne` / `@OneToOne`). `target` is the simple
    /// name of the referenced entity.
    ToOne {
        target: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        join: Option<JoinSpec>,
    },
    /// Collection relation (`@OneToMany` / `@ManyToMany`); never projected.
    ToMany,
    /// Embedded value object; flattened into prefixed columns.
    Embedded { inner: EmbeddedSpec },
    /// Ordinary column.
    Plain {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        column: Option<ColumnSpec>,
    },
}

impl Default for FieldKind {
    fn default() -> Self {
        FieldKind::Plain { column: None }
    }
}

/// Primary-key generation strategy (`@GeneratedValue`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdStrategy {
    /// Database-generated UUID.
    Uuid,
    /// Auto-incrementing integer identity.
    Identity,
}

/// Join-column annotation data for to-one relations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JoinSpec {
    /// Explicit join column name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,

    /// Explicit nullability; defaults to nullable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,

    /// Explicit foreign-key constraint name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<String>,
}

/// Column annotation data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Explicit physical column name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// String length.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,

    /// Numeric precision.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,

    /// Numeric scale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,

    /// Explicit nullability; `Some(false)` renders NOT NULL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,

    /// Whether the column is UNIQUE.
    #[serde(default)]
    pub unique: bool,

    /// Verbatim SQL type override; wins over all type mapping.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_definition: Option<String>,

    /// Explicit raw DEFAULT fragment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

/// Embedded value-object metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddedSpec {
    /// Simple name of the embedded type.
    pub type_name: String,

    /// Declared (non-static) fields of the embedded type.
    pub fields: Vec<EmbeddedField>,

    /// `@AttributeOverride` entries: inner field name -> explicit column name.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overrides: Vec<AttributeOverride>,
}

/// One field of an embedded type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddedField {
    /// Field name as declared.
    pub name: String,

    /// Logical type name.
    pub type_name: String,

    /// Whether the type is an enum.
    #[serde(default)]
    pub enum_type: bool,

    /// Column annotation metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<ColumnSpec>,
}

/// One `@AttributeOverride` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeOverride {
    /// Inner field name being overridden.
    pub field: String,

    /// Explicit physical column name.
    pub column: String,
}

/// Load a descriptor pack from a YAML or JSON file (detected by extension).
///
/// Read failures are fatal discovery errors; the generator writes nothing.
pub fn load_descriptors<P: AsRef<Path>>(path: P) -> Result<Vec<EntityDescriptor>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
        GeneratorError::Discovery(format!("cannot read '{}': {}", path.display(), e))
    })?;

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase());

    let entities: Vec<EntityDescriptor> = match extension.as_deref() {
        Some("json") => serde_json::from_str(&content).map_err(|e| {
            GeneratorError::Discovery(format!("invalid JSON in '{}': {}", path.display(), e))
        })?,
        _ => serde_yaml::from_str(&content).map_err(|e| {
            GeneratorError::Discovery(format!("invalid YAML in '{}': {}", path.display(), e))
        })?,
    };

    Ok(entities)
}
