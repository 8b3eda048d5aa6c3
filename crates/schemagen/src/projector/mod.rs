//! Entity projection: descriptor -> [`TableSchema`].
//!
//! The projector applies the dialect type mapping, synthesizes relation
//! columns and foreign keys, flattens embedded value objects, and derives
//! the index set. Cyclic to-one references are benign: resolving a relation
//! column only needs the referenced entity's PK type, which is a pure
//! function of its descriptor.

use std::collections::HashMap;

use tracing::warn;

use crate::config::{SqlDialect, UuidStrategy};
use crate::core::descriptor::{
    ColumnSpec, EmbeddedSpec, EntityDescriptor, FieldDescriptor, FieldKind, IdStrategy,
};
use crate::core::ident::{to_snake_case, validate_identifier};
use crate::core::schema::{ColumnSchema, FkAction, ForeignKeySchema, IndexSchema, TableSchema};
use crate::dialect::{map_type, ColumnMeta};
use crate::error::Result;

/// Column names that receive a heuristic single-column index when present
/// and not otherwise covered.
const HEURISTIC_INDEX_COLUMNS: [&str; 4] = ["email", "username", "subject", "code"];

/// Result of projecting one entity.
#[derive(Debug, Clone)]
pub struct ProjectedEntity {
    /// The normalized table.
    pub table: TableSchema,

    /// Whether the primary key relies on a database UUID generator.
    pub needs_uuid_generator: bool,
}

/// Projects entity descriptors into table schemas.
pub struct EntityProjector<'a> {
    dialect: SqlDialect,
    uuid: UuidStrategy,
    registry: HashMap<&'a str, &'a EntityDescriptor>,
}

/// Physical table name for an entity: explicit `table.name` if non-blank,
/// else snake_case of the simple class name.
pub fn table_name(entity: &EntityDescriptor) -> String {
    match entity.table.name.as_deref() {
        Some(name) if !name.trim().is_empty() => name.trim().to_string(),
        _ => to_snake_case(&entity.name),
    }
}

impl<'a> EntityProjector<'a> {
    /// Create a projector over the full entity set. The set is used to
    /// resolve referenced primary-key types for to-one relations.
    pub fn new(dialect: SqlDialect, uuid: UuidStrategy, entities: &'a [EntityDescriptor]) -> Self {
        let registry = entities.iter().map(|e| (e.name.as_str(), e)).collect();
        Self {
            dialect,
            uuid,
            registry,
        }
    }

    /// Project one entity into a [`TableSchema`] plus collateral.
    pub fn project(&self, entity: &EntityDescriptor) -> Result<ProjectedEntity> {
        let table = table_name(entity);
        validate_identifier(&table)?;

        let mut columns: Vec<ColumnSchema> = Vec::new();
        let mut foreign_keys: Vec<ForeignKeySchema> = Vec::new();
        let mut relation_columns: Vec<String> = Vec::new();
        let mut needs_uuid_generator = false;

        for field in &entity.fields {
            match &field.kind {
                FieldKind::Id { strategy, column } => {
                    let col = self.project_id(field, *strategy, column.as_ref());
                    needs_uuid_generator |= *strategy == Some(IdStrategy::Uuid);
                    columns.push(col);
                }
                FieldKind::ToOne { target, join } => {
                    let join = join.clone().unwrap_or_default();
                    let col_name = join
                        .column
                        .clone()
                        .unwrap_or_else(|| format!("{}_id", to_snake_case(&field.name)));
                    let nullable = join.nullable.unwrap_or(true);

                    let mut col = ColumnSchema::new(&col_name, self.referenced_id_type(target));
                    col.nullable = nullable;
                    columns.push(col);

                    foreign_keys.push(ForeignKeySchema {
                        column: col_name.clone(),
                        referenced_table: self.referenced_table_name(target),
                        referenced_column: "id".to_string(),
                        on_delete: if nullable {
                            FkAction::SetNull
                        } else {
                            FkAction::Cascade
                        },
                        constraint_name: join.foreign_key.clone(),
                    });
                    relation_columns.push(col_name);
                }
                FieldKind::ToMany => {
                    // Collection relations never materialize on this side.
                }
                FieldKind::Embedded { inner } => {
                    self.project_embedded(field, inner, &mut columns);
                }
                FieldKind::Plain { column } => {
                    columns.push(self.project_plain(field, column.as_ref()));
                }
            }
        }

        for col in &columns {
            validate_identifier(&col.name)?;
        }

        let indexes = self.derive_indexes(entity, &table, &columns, &relation_columns);

        Ok(ProjectedEntity {
            table: TableSchema {
                name: table,
                columns,
                indexes,
                foreign_keys,
            },
            needs_uuid_generator,
        })
    }

    fn project_id(
        &self,
        field: &FieldDescriptor,
        strategy: Option<IdStrategy>,
        column: Option<&ColumnSpec>,
    ) -> ColumnSchema {
        let name = column
            .and_then(|c| c.name.clone())
            .unwrap_or_else(|| to_snake_case(&field.name));

        match strategy {
            Some(IdStrategy::Uuid) => {
                let sql_type = match self.dialect {
                    SqlDialect::Postgres => "UUID",
                    SqlDialect::MariaDb => "CHAR(36)",
                };
                let mut col = ColumnSchema::primary_key(name, sql_type);
                col.default_value = Some(self.uuid_default().to_string());
                col
            }
            Some(IdStrategy::Identity) => match self.dialect {
                SqlDialect::Postgres => ColumnSchema::primary_key(name, "BIGSERIAL"),
                SqlDialect::MariaDb => {
                    let mut col = ColumnSchema::primary_key(name, "BIGINT");
                    col.auto_increment = true;
                    col
                }
            },
            None => {
                let sql_type = map_type(self.dialect, &field.type_name, &column_meta(field, column));
                ColumnSchema::primary_key(name, sql_type)
            }
        }
    }

    /// Default expression for generated UUID keys. UUID_V7 on MariaDB falls
    /// back to the V4 behavior.
    fn uuid_default(&self) -> &'static str {
        match (self.dialect, self.uuid) {
            (SqlDialect::Postgres, UuidStrategy::V7) => "public.uuid_generate_v7()",
            (SqlDialect::Postgres, UuidStrategy::V4) => "public.uuid_generate_v4()",
            (SqlDialect::MariaDb, _) => "(UUID())",
        }
    }

    fn project_plain(&self, field: &FieldDescriptor, column: Option<&ColumnSpec>) -> ColumnSchema {
        let name = column
            .and_then(|c| c.name.clone())
            .unwrap_or_else(|| to_snake_case(&field.name));

        let sql_type = map_type(self.dialect, &field.type_name, &column_meta(field, column));

        let mut col = ColumnSchema::new(name, sql_type);
        col.nullable = column.and_then(|c| c.nullable) != Some(false);
        col.unique = column.map(|c| c.unique).unwrap_or(false);
        col.default_value = column.and_then(|c| c.default.clone());

        if col.default_value.is_none() && (col.name == "created_at" || col.name == "updated_at") {
            col.default_value = Some("CURRENT_TIMESTAMP".to_string());
        }

        col
    }

    fn project_embedded(
        &self,
        outer: &FieldDescriptor,
        inner: &EmbeddedSpec,
        columns: &mut Vec<ColumnSchema>,
    ) {
        let outer_prefix = to_snake_case(&outer.name);

        for inner_field in &inner.fields {
            let overridden = inner
                .overrides
                .iter()
                .find(|o| o.field == inner_field.name)
                .map(|o| o.column.clone());

            let name = overridden.unwrap_or_else(|| {
                format!("{}_{}", outer_prefix, to_snake_case(&inner_field.name))
            });

            let meta = ColumnMeta {
                length: inner_field.column.as_ref().and_then(|c| c.length),
                precision: inner_field.column.as_ref().and_then(|c| c.precision),
                scale: inner_field.column.as_ref().and_then(|c| c.scale),
                column_definition: inner_field
                    .column
                    .as_ref()
                    .and_then(|c| c.column_definition.clone()),
                enum_type: inner_field.enum_type,
            };
            let sql_type = map_type(self.dialect, &inner_field.type_name, &meta);

            let mut col = ColumnSchema::new(name, sql_type);
            col.nullable = inner_field.column.as_ref().and_then(|c| c.nullable) != Some(false);
            col.unique = inner_field.column.as_ref().map(|c| c.unique).unwrap_or(false);
            col.default_value = inner_field.column.as_ref().and_then(|c| c.default.clone());
            columns.push(col);
        }
    }

    /// PK type of the referenced entity, as seen from a referencing column.
    /// Serial types degrade to their base integer type.
    fn referenced_id_type(&self, target: &str) -> String {
        let Some(entity) = self.registry.get(target) else {
            warn!("to-one relation targets unknown entity '{}', assuming BIGINT key", target);
            return "BIGINT".to_string();
        };

        let Some(id) = entity.id_field() else {
            warn!("entity '{}' has no primary key field, assuming BIGINT key", target);
            return "BIGINT".to_string();
        };

        let FieldKind::Id { strategy, column } = &id.kind else {
            unreachable!("id_field returned a non-id field");
        };

        match strategy {
            Some(IdStrategy::Uuid) => match self.dialect {
                SqlDialect::Postgres => "UUID".to_string(),
                SqlDialect::MariaDb => "CHAR(36)".to_string(),
            },
            Some(IdStrategy::Identity) => "BIGINT".to_string(),
            None => map_type(self.dialect, &id.type_name, &column_meta(id, column.as_ref())),
        }
    }

    fn referenced_table_name(&self, target: &str) -> String {
        match self.registry.get(target) {
            Some(entity) => table_name(entity),
            None => to_snake_case(target),
        }
    }

    fn derive_indexes(
        &self,
        entity: &EntityDescriptor,
        table: &str,
        columns: &[ColumnSchema],
        relation_columns: &[String],
    ) -> Vec<IndexSchema> {
        let mut indexes: Vec<IndexSchema> = Vec::new();

        for spec in &entity.table.indexes {
            let name = match &spec.name {
                Some(name) if !name.trim().is_empty() => name.trim().to_string(),
                _ => format!("idx_{}_{}", table, spec.columns.join("_")),
            };
            indexes.push(IndexSchema {
                name,
                columns: spec.columns.clone(),
                unique: spec.unique,
            });
        }

        let covered = |indexes: &[IndexSchema], col: &str| {
            indexes.iter().any(|i| i.columns.iter().any(|c| c == col))
        };

        for col in relation_columns {
            if !covered(&indexes, col) {
                indexes.push(IndexSchema {
                    name: format!("idx_{}_{}", table, col),
                    columns: vec![col.clone()],
                    unique: false,
                });
            }
        }

        for col in columns {
            if relation_columns.contains(&col.name) {
                continue;
            }
            if HEURISTIC_INDEX_COLUMNS.contains(&col.name.as_str()) && !covered(&indexes, &col.name)
            {
                indexes.push(IndexSchema {
                    name: format!("idx_{}_{}", table, col.name),
                    columns: vec![col.name.clone()],
                    unique: false,
                });
            }
        }

        // De-duplicate by (name, columns), keeping first occurrence.
        let mut seen: Vec<(String, Vec<String>)> = Vec::new();
        indexes.retain(|idx| {
            let key = (idx.name.clone(), idx.columns.clone());
            if seen.contains(&key) {
                false
            } else {
                seen.push(key);
                true
            }
        });

        indexes
    }
}

fn column_meta(field: &FieldDescriptor, column: Option<&ColumnSpec>) -> ColumnMeta {
    ColumnMeta {
        length: column.and_then(|c| c.length),
        precision: column.and_then(|c| c.precision),
        scale: column.and_then(|c| c.scale),
        column_definition: column.and_then(|c| c.column_definition.clone()),
        enum_type: field.enum_type,
    }
}
