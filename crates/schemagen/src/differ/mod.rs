//! Schema diffing: two [`TableSchema`] values -> an idempotent ALTER body.
//!
//! Both sides are normalized before comparison (whitespace, type case,
//! ordering) so cosmetic differences between projected and extracted schemas
//! never produce spurious statements. An empty result means the caller must
//! not write a file.

use std::collections::BTreeMap;

use crate::core::schema::{ColumnSchema, ForeignKeySchema, IndexSchema, TableSchema};

/// Produces ALTER-script bodies from schema pairs.
pub struct MigrationDiffer;

impl MigrationDiffer {
    /// Diff `old` (previously materialized) against `new` (currently
    /// projected) and render the ALTER body for `table`.
    ///
    /// Returns an empty string when the schemas are equivalent.
    pub fn diff(table: &str, old: &TableSchema, new: &TableSchema) -> String {
        let old = normalize(old);
        let new = normalize(new);

        let mut sections: Vec<(&str, Vec<String>)> = Vec::new();
        sections.push(("-- Column changes", diff_columns(table, &old, &new)));
        sections.push(("-- Index changes", diff_indexes(table, &old, &new)));
        sections.push(("-- Foreign key changes", diff_foreign_keys(table, &old, &new)));

        let mut body = String::new();
        for (header, stmts) in sections {
            if stmts.is_empty() {
                continue;
            }
            if !body.is_empty() {
                body.push('\n');
            }
            body.push_str(header);
            body.push('\n');
            for stmt in stmts {
                body.push_str(&stmt);
                body.push('\n');
            }
        }

        body
    }
}

/// Normalize a schema for comparison: trimmed names, uppercased types with
/// collapsed internal whitespace, case-folded `NOW()`, and sorted columns,
/// indexes, and foreign keys.
fn normalize(table: &TableSchema) -> TableSchema {
    let mut table = table.clone();

    for col in &mut table.columns {
        col.name = col.name.trim().to_string();
        col.sql_type = col
            .sql_type
            .trim()
            .to_uppercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        if let Some(default) = col.default_value.take() {
            let default = default.trim().to_string();
            col.default_value = Some(if default.eq_ignore_ascii_case("now()") {
                "NOW()".to_string()
            } else {
                default
            });
        }
    }

    table.columns.sort_by(|a, b| a.name.cmp(&b.name));
    table
        .indexes
        .sort_by_key(|i| (i.columns.len(), i.columns.join(","), i.name.clone()));
    table.foreign_keys.sort_by(|a, b| a.column.cmp(&b.column));

    table
}

fn diff_columns(table: &str, old: &TableSchema, new: &TableSchema) -> Vec<String> {
    let mut stmts = Vec::new();

    // Added
    for col in &new.columns {
        if !old.has_column(&col.name) {
            stmts.push(render_add_column(table, col));
        }
    }

    // Modified
    for col in &new.columns {
        let Some(prev) = old.column(&col.name) else {
            continue;
        };

        if prev.sql_type != col.sql_type {
            stmts.push(format!(
                "ALTER TABLE {} ALTER COLUMN {} TYPE {};",
                table, col.name, col.sql_type
            ));
        }
        if prev.nullable != col.nullable {
            let clause = if col.nullable {
                "DROP NOT NULL"
            } else {
                "SET NOT NULL"
            };
            stmts.push(format!(
                "ALTER TABLE {} ALTER COLUMN {} {};",
                table, col.name, clause
            ));
        }
        if prev.unique != col.unique {
            if col.unique {
                stmts.push(format!(
                    "ALTER TABLE {} ADD CONSTRAINT uq_{}_{} UNIQUE ({});",
                    table, table, col.name, col.name
                ));
            } else {
                stmts.push(format!(
                    "ALTER TABLE {} DROP CONSTRAINT uq_{}_{};",
                    table, table, col.name
                ));
            }
        }
    }

    // Removed: never auto-drop, data loss.
    for col in &old.columns {
        if col.primary_key || new.has_column(&col.name) {
            continue;
        }
        stmts.push(format!(
            "-- WARNING: Column '{}' was removed from entity",
            col.name
        ));
        stmts.push(format!(
            "-- Consider: ALTER TABLE {} DROP COLUMN {};",
            table, col.name
        ));
    }

    stmts
}

fn render_add_column(table: &str, col: &ColumnSchema) -> String {
    let mut stmt = format!("ALTER TABLE {} ADD COLUMN {} {}", table, col.name, col.sql_type);
    if !col.nullable {
        stmt.push_str(" NOT NULL");
    }
    if col.unique {
        stmt.push_str(" UNIQUE");
    }
    if let Some(ref default) = col.default_value {
        stmt.push_str(&format!(" DEFAULT {}", default));
    }
    stmt.push(';');
    stmt
}

/// Indexes are keyed by their sorted column list; name or uniqueness changes
/// on the same column set are not diffed.
fn diff_indexes(table: &str, old: &TableSchema, new: &TableSchema) -> Vec<String> {
    let key = |columns: &[String]| {
        let mut sorted: Vec<&String> = columns.iter().collect();
        sorted.sort();
        sorted
            .into_iter()
            .cloned()
            .collect::<Vec<String>>()
            .join(",")
    };

    let old_keys: BTreeMap<String, &IndexSchema> =
        old.indexes.iter().map(|i| (key(&i.columns), i)).collect();
    let new_keys: BTreeMap<String, &IndexSchema> =
        new.indexes.iter().map(|i| (key(&i.columns), i)).collect();

    let mut stmts = Vec::new();

    for (k, idx) in &new_keys {
        if !old_keys.contains_key(k) {
            let unique = if idx.unique { "UNIQUE " } else { "" };
            stmts.push(format!(
                "CREATE {}INDEX {} ON {} ({});",
                unique,
                idx.name,
                table,
                idx.columns.join(", ")
            ));
        }
    }

    for (k, idx) in &old_keys {
        if !new_keys.contains_key(k) {
            stmts.push(format!("DROP INDEX IF EXISTS {};", idx.name));
        }
    }

    stmts
}

/// Foreign keys are keyed by the constrained column; a changed reference or
/// action drops and re-adds the constraint under its canonical name.
fn diff_foreign_keys(table: &str, old: &TableSchema, new: &TableSchema) -> Vec<String> {
    let old_keys: BTreeMap<&str, &ForeignKeySchema> = old
        .foreign_keys
        .iter()
        .map(|fk| (fk.column.as_str(), fk))
        .collect();
    let new_keys: BTreeMap<&str, &ForeignKeySchema> = new
        .foreign_keys
        .iter()
        .map(|fk| (fk.column.as_str(), fk))
        .collect();

    let render_add = |fk: &ForeignKeySchema| {
        format!(
            "ALTER TABLE {} ADD CONSTRAINT fk_{}_{} FOREIGN KEY ({}) REFERENCES {}({}) ON DELETE {};",
            table, table, fk.column, fk.column, fk.referenced_table, fk.referenced_column,
            fk.on_delete.as_sql()
        )
    };
    let render_drop = |column: &str| {
        format!("ALTER TABLE {} DROP CONSTRAINT fk_{}_{};", table, table, column)
    };

    let mut stmts = Vec::new();

    for (col, fk) in &new_keys {
        match old_keys.get(col) {
            None => stmts.push(render_add(fk)),
            Some(prev) => {
                let changed = prev.referenced_table != fk.referenced_table
                    || prev.referenced_column != fk.referenced_column
                    || prev.on_delete != fk.on_delete;
                if changed {
                    stmts.push(render_drop(col));
                    stmts.push(render_add(fk));
                }
            }
        }
    }

    for col in old_keys.keys() {
        if !new_keys.contains_key(col) {
            stmts.push(render_drop(col));
        }
    }

    stmts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{FkAction, ForeignKeySchema, IndexSchema};

    fn base_table() -> TableSchema {
        TableSchema {
            name: "sample".to_string(),
            columns: vec![
                ColumnSchema::primary_key("id", "BIGSERIAL"),
                {
                    let mut c = ColumnSchema::new("email", "VARCHAR(255)");
                    c.nullable = false;
                    c.unique = true;
                    c
                },
            ],
            indexes: vec![],
            foreign_keys: vec![],
        }
    }

    #[test]
    fn test_identical_schemas_produce_empty_diff() {
        let table = base_table();
        assert_eq!(MigrationDiffer::diff("sample", &table, &table), "");
    }

    #[test]
    fn test_whitespace_and_case_do_not_diff() {
        let old = base_table();
        let mut new = base_table();
        new.columns[1].sql_type = "varchar(255)".to_string();
        new.columns.swap(0, 1);
        assert_eq!(MigrationDiffer::diff("sample", &old, &new), "");
    }

    #[test]
    fn test_now_canonicalization() {
        let mut old = base_table();
        old.columns[1].default_value = Some("now()".to_string());
        let mut new = base_table();
        new.columns[1].default_value = Some("NOW()".to_string());
        assert_eq!(MigrationDiffer::diff("sample", &old, &new), "");
    }

    #[test]
    fn test_added_column() {
        let old = base_table();
        let mut new = base_table();
        let mut name = ColumnSchema::new("name", "VARCHAR(255)");
        name.nullable = false;
        new.columns.push(name);

        let body = MigrationDiffer::diff("sample", &old, &new);
        assert!(body.starts_with("-- Column changes\n"));
        assert!(body.contains("ALTER TABLE sample ADD COLUMN name VARCHAR(255) NOT NULL;\n"));
    }

    #[test]
    fn test_added_column_with_default_and_unique() {
        let old = base_table();
        let mut new = base_table();
        let mut col = ColumnSchema::new("code", "VARCHAR(50)");
        col.unique = true;
        col.default_value = Some("'NONE'".to_string());
        new.columns.push(col);

        let body = MigrationDiffer::diff("sample", &old, &new);
        assert!(body.contains("ADD COLUMN code VARCHAR(50) UNIQUE DEFAULT 'NONE';"));
    }

    #[test]
    fn test_modified_column_type_then_nullability_then_uniqueness() {
        let old = base_table();
        let mut new = base_table();
        new.columns[1].sql_type = "VARCHAR(500)".to_string();
        new.columns[1].nullable = true;
        new.columns[1].unique = false;

        let body = MigrationDiffer::diff("sample", &old, &new);
        let type_pos = body.find("ALTER COLUMN email TYPE VARCHAR(500);").unwrap();
        let null_pos = body.find("ALTER COLUMN email DROP NOT NULL;").unwrap();
        let uq_pos = body.find("DROP CONSTRAINT uq_sample_email;").unwrap();
        assert!(type_pos < null_pos && null_pos < uq_pos);
    }

    #[test]
    fn test_modified_column_gains_constraints() {
        let mut old = base_table();
        old.columns[1].nullable = true;
        old.columns[1].unique = false;
        let new = base_table();

        let body = MigrationDiffer::diff("sample", &old, &new);
        assert!(body.contains("ALTER TABLE sample ALTER COLUMN email SET NOT NULL;"));
        assert!(body.contains("ALTER TABLE sample ADD CONSTRAINT uq_sample_email UNIQUE (email);"));
    }

    #[test]
    fn test_removed_column_warns_only() {
        let mut old = base_table();
        old.columns.push(ColumnSchema::new("legacy", "VARCHAR(255)"));
        let new = base_table();

        let body = MigrationDiffer::diff("sample", &old, &new);
        assert!(body.contains("-- WARNING: Column 'legacy' was removed from entity\n"));
        assert!(body.contains("-- Consider: ALTER TABLE sample DROP COLUMN legacy;\n"));
        // The drop only ever appears commented out.
        assert!(body
            .lines()
            .all(|l| !l.starts_with("ALTER TABLE sample DROP COLUMN")));
    }

    #[test]
    fn test_removed_pk_column_not_warned() {
        let mut old = base_table();
        let new = {
            let mut t = base_table();
            t.columns.remove(0);
            t
        };
        old.columns[0].primary_key = true;

        let body = MigrationDiffer::diff("sample", &old, &new);
        assert!(!body.contains("WARNING: Column 'id'"));
    }

    #[test]
    fn test_index_added_and_removed() {
        let mut old = base_table();
        old.indexes.push(IndexSchema {
            name: "idx_sample_old".to_string(),
            columns: vec!["email".to_string()],
            unique: false,
        });
        let mut new = base_table();
        new.indexes.push(IndexSchema {
            name: "idx_sample_id_email".to_string(),
            columns: vec!["id".to_string(), "email".to_string()],
            unique: true,
        });

        let body = MigrationDiffer::diff("sample", &old, &new);
        assert!(body.contains("-- Index changes\n"));
        assert!(body.contains("CREATE UNIQUE INDEX idx_sample_id_email ON sample (id, email);"));
        assert!(body.contains("DROP INDEX IF EXISTS idx_sample_old;"));
    }

    #[test]
    fn test_index_same_columns_different_name_is_unchanged() {
        let mut old = base_table();
        old.indexes.push(IndexSchema {
            name: "idx_old_name".to_string(),
            columns: vec!["email".to_string()],
            unique: false,
        });
        let mut new = base_table();
        new.indexes.push(IndexSchema {
            name: "idx_new_name".to_string(),
            columns: vec!["email".to_string()],
            unique: false,
        });
        assert_eq!(MigrationDiffer::diff("sample", &old, &new), "");
    }

    #[test]
    fn test_fk_added() {
        let old = base_table();
        let mut new = base_table();
        new.columns.push(ColumnSchema::new("owner_id", "BIGINT"));
        new.foreign_keys.push(ForeignKeySchema {
            column: "owner_id".to_string(),
            referenced_table: "users".to_string(),
            referenced_column: "id".to_string(),
            on_delete: FkAction::SetNull,
            constraint_name: None,
        });

        let body = MigrationDiffer::diff("sample", &old, &new);
        assert!(body.contains("-- Foreign key changes\n"));
        assert!(body.contains(
            "ALTER TABLE sample ADD CONSTRAINT fk_sample_owner_id FOREIGN KEY (owner_id) REFERENCES users(id) ON DELETE SET NULL;"
        ));
    }

    #[test]
    fn test_fk_modified_drops_then_adds() {
        let mut old = base_table();
        old.foreign_keys.push(ForeignKeySchema {
            column: "owner_id".to_string(),
            referenced_table: "users".to_string(),
            referenced_column: "id".to_string(),
            on_delete: FkAction::Cascade,
            constraint_name: None,
        });
        let mut new = base_table();
        new.foreign_keys.push(ForeignKeySchema {
            column: "owner_id".to_string(),
            referenced_table: "users".to_string(),
            referenced_column: "id".to_string(),
            on_delete: FkAction::SetNull,
            constraint_name: None,
        });

        let body = MigrationDiffer::diff("sample", &old, &new);
        let drop_pos = body.find("DROP CONSTRAINT fk_sample_owner_id;").unwrap();
        let add_pos = body.find("ADD CONSTRAINT fk_sample_owner_id FOREIGN KEY").unwrap();
        assert!(drop_pos < add_pos);
    }

    #[test]
    fn test_fk_removed() {
        let mut old = base_table();
        old.foreign_keys.push(ForeignKeySchema {
            column: "owner_id".to_string(),
            referenced_table: "users".to_string(),
            referenced_column: "id".to_string(),
            on_delete: FkAction::Cascade,
            constraint_name: None,
        });
        let new = base_table();

        let body = MigrationDiffer::diff("sample", &old, &new);
        assert!(body.contains("ALTER TABLE sample DROP CONSTRAINT fk_sample_owner_id;"));
    }

    #[test]
    fn test_default_only_change_is_silent() {
        let mut old = base_table();
        old.columns[1].default_value = Some("'a'".to_string());
        let mut new = base_table();
        new.columns[1].default_value = Some("'b'".to_string());
        assert_eq!(MigrationDiffer::diff("sample", &old, &new), "");
    }

    #[test]
    fn test_sections_in_order() {
        let mut old = base_table();
        old.indexes.push(IndexSchema {
            name: "idx_gone".to_string(),
            columns: vec!["email".to_string()],
            unique: false,
        });
        let mut new = base_table();
        new.columns.push(ColumnSchema::new("extra", "BOOLEAN"));
        new.foreign_keys.push(ForeignKeySchema {
            column: "email".to_string(),
            referenced_table: "contacts".to_string(),
            referenced_column: "id".to_string(),
            on_delete: FkAction::NoAction,
            constraint_name: None,
        });

        let body = MigrationDiffer::diff("sample", &old, &new);
        let col_pos = body.find("-- Column changes").unwrap();
        let idx_pos = body.find("-- Index changes").unwrap();
        let fk_pos = body.find("-- Foreign key changes").unwrap();
        assert!(col_pos < idx_pos && idx_pos < fk_pos);
    }
}
