//! Schema model types: columns, indexes, foreign keys, and tables.
//!
//! These types are the common currency of the generator: the projector
//! produces them from entity descriptors, the extractor reconstructs them
//! from previously emitted SQL, and the differ and emitter consume them.
//! Instances are immutable once built.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// ON DELETE referential action of a foreign key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FkAction {
    Cascade,
    SetNull,
    Restrict,
    NoAction,
}

impl FkAction {
    /// SQL rendering of the action.
    pub fn as_sql(&self) -> &'static str {
        match self {
            FkAction::Cascade => "CASCADE",
            FkAction::SetNull => "SET NULL",
            FkAction::Restrict => "RESTRICT",
            FkAction::NoAction => "NO ACTION",
        }
    }
}

impl fmt::Display for FkAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for FkAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "CASCADE" => Ok(FkAction::Cascade),
            "SET NULL" => Ok(FkAction::SetNull),
            "RESTRICT" => Ok(FkAction::Restrict),
            "NO ACTION" => Ok(FkAction::NoAction),
            other => Err(format!("unknown ON DELETE action '{}'", other)),
        }
    }
}

/// A single physical column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    /// Physical column name (snake_case).
    pub name: String,

    /// Resolved dialect-specific SQL type literal (e.g. `VARCHAR(255)`).
    pub sql_type: String,

    /// Whether the column allows NULL.
    pub nullable: bool,

    /// Whether the column carries a UNIQUE constraint.
    pub unique: bool,

    /// Whether the column is the primary key.
    pub primary_key: bool,

    /// MariaDB identity marker, rendered as `AUTO_INCREMENT`.
    pub auto_increment: bool,

    /// Raw SQL fragment emitted after `DEFAULT`, if any.
    pub default_value: Option<String>,
}

impl ColumnSchema {
    /// Create a plain nullable column with no constraints.
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            nullable: true,
            unique: false,
            primary_key: false,
            auto_increment: false,
            default_value: None,
        }
    }

    /// Create a primary-key column (NOT NULL implied).
    pub fn primary_key(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            nullable: false,
            unique: false,
            primary_key: true,
            auto_increment: false,
            default_value: None,
        }
    }
}

/// A single- or multi-column index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSchema {
    /// Index name.
    pub name: String,

    /// Indexed column names, in index order. Never empty.
    pub columns: Vec<String>,

    /// Whether the index is unique.
    pub unique: bool,
}

/// A single-column foreign key constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeySchema {
    /// Constrained column name.
    pub column: String,

    /// Referenced table name.
    pub referenced_table: String,

    /// Referenced column name (the target's primary key).
    pub referenced_column: String,

    /// ON DELETE action.
    pub on_delete: FkAction,

    /// Explicit constraint-name override from the descriptor. When absent,
    /// renderers use the canonical `fk_<table>_<column>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint_name: Option<String>,
}

impl ForeignKeySchema {
    /// Constraint name to render for this FK on the given table.
    pub fn name_for(&self, table: &str) -> String {
        self.constraint_name
            .clone()
            .unwrap_or_else(|| format!("fk_{}_{}", table, self.column))
    }
}

/// A complete table: columns in insertion order, plus indexes and FKs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Physical table name.
    pub name: String,

    /// Column definitions, in first-seen field order.
    pub columns: Vec<ColumnSchema>,

    /// Indexes.
    pub indexes: Vec<IndexSchema>,

    /// Foreign key constraints.
    pub foreign_keys: Vec<ForeignKeySchema>,
}

impl TableSchema {
    /// Create an empty table.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Whether a column with the given name exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// The primary key column, if exactly one column is marked.
    pub fn primary_key_column(&self) -> Option<&ColumnSchema> {
        let mut pks = self.columns.iter().filter(|c| c.primary_key);
        let first = pks.next()?;
        if pks.next().is_some() {
            return None;
        }
        Some(first)
    }

    /// Check the table-local invariants: every FK column and every index
    /// column must name an existing column, and a primary-key column must be
    /// NOT NULL.
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::GeneratorError;

        for fk in &self.foreign_keys {
            if !self.has_column(&fk.column) {
                return Err(GeneratorError::invalid_schema(
                    &self.name,
                    format!("foreign key references missing column '{}'", fk.column),
                ));
            }
        }

        for idx in &self.indexes {
            if idx.columns.is_empty() {
                return Err(GeneratorError::invalid_schema(
                    &self.name,
                    format!("index '{}' has no columns", idx.name),
                ));
            }
            for col in &idx.columns {
                if !self.has_column(col) {
                    return Err(GeneratorError::invalid_schema(
                        &self.name,
                        format!("index '{}' references missing column '{}'", idx.name, col),
                    ));
                }
            }
        }

        for col in &self.columns {
            if col.primary_key && col.nullable {
                return Err(GeneratorError::invalid_schema(
                    &self.name,
                    format!("primary key column '{}' is nullable", col.name),
                ));
            }
        }

        Ok(())
    }
}
