//! SQL rendering over [`TableSchema`] values.
//!
//! Stateless renderers for CREATE TABLE bodies (with aligned column cells),
//! foreign-key and index statement lists, and the UUID extension setup.

use crate::config::{SqlDialect, UuidStrategy};
use crate::core::schema::{ColumnSchema, TableSchema};

/// Renders table schemas as SQL fragments for one dialect.
#[derive(Debug, Clone, Copy)]
pub struct SqlEmitter {
    dialect: SqlDialect,
}

impl SqlEmitter {
    /// Create an emitter for the given dialect.
    pub fn new(dialect: SqlDialect) -> Self {
        Self { dialect }
    }

    /// Render the CREATE TABLE body for one table.
    ///
    /// Column name and type cells are padded to the width of the longest
    /// name and type so constraint tails line up.
    pub fn create_table(&self, table: &TableSchema, entity_name: &str) -> String {
        let name_width = table.columns.iter().map(|c| c.name.len()).max().unwrap_or(0);
        let type_width = table
            .columns
            .iter()
            .map(|c| c.sql_type.len())
            .max()
            .unwrap_or(0);

        let mut sql = String::new();
        sql.push_str(&format!("-- create_{}_table\n", table.name));
        sql.push_str(&format!("-- Entity: {}\n", entity_name));
        sql.push_str(&format!("-- Database: {}\n", self.dialect.as_sql_comment()));
        sql.push_str(&format!("CREATE TABLE {} (\n", table.name));

        let last = table.columns.len().saturating_sub(1);
        for (i, col) in table.columns.iter().enumerate() {
            let line = format!(
                "    {:<name_width$} {:<type_width$} {}",
                col.name,
                col.sql_type,
                column_constraints(col)
            );
            sql.push_str(line.trim_end());
            if i != last {
                sql.push(',');
            }
            sql.push('\n');
        }

        sql.push_str(");\n");
        sql
    }

    /// Render ALTER TABLE ADD CONSTRAINT statements for every foreign key of
    /// the given tables, one statement per line.
    pub fn foreign_keys(&self, tables: &[&TableSchema]) -> String {
        let mut sql = String::new();
        for table in tables {
            for fk in &table.foreign_keys {
                sql.push_str(&format!(
                    "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {}({}) ON DELETE {};\n",
                    table.name,
                    fk.name_for(&table.name),
                    fk.column,
                    fk.referenced_table,
                    fk.referenced_column,
                    fk.on_delete.as_sql()
                ));
            }
        }
        sql
    }

    /// Render CREATE INDEX statements for every index of the given tables,
    /// one statement per line.
    pub fn indexes(&self, tables: &[&TableSchema]) -> String {
        let mut sql = String::new();
        for table in tables {
            for idx in &table.indexes {
                let unique = if idx.unique { "UNIQUE " } else { "" };
                sql.push_str(&format!(
                    "CREATE {}INDEX {} ON {} ({});\n",
                    unique,
                    idx.name,
                    table.name,
                    idx.columns.join(", ")
                ));
            }
        }
        sql
    }

    /// Render the UUID extension/function setup, or `None` when the dialect
    /// needs no setup file (MariaDB generates UUIDs natively).
    pub fn uuid_setup(&self, uuid: UuidStrategy) -> Option<String> {
        match (self.dialect, uuid) {
            (SqlDialect::MariaDb, _) => None,
            (SqlDialect::Postgres, UuidStrategy::V4) => {
                Some("CREATE EXTENSION IF NOT EXISTS \"uuid-ossp\" SCHEMA public;\n".to_string())
            }
            (SqlDialect::Postgres, UuidStrategy::V7) => Some(UUID_V7_SETUP.to_string()),
        }
    }
}

/// pgcrypto supplies gen_random_bytes; the function assembles a version-7
/// UUID from a millisecond timestamp prefix and 10 random bytes, stamping
/// the version nibble 0x7 and variant bits 10.
const UUID_V7_SETUP: &str = r#"CREATE EXTENSION IF NOT EXISTS pgcrypto SCHEMA public;

CREATE OR REPLACE FUNCTION public.uuid_generate_v7()
RETURNS uuid
LANGUAGE plpgsql
PARALLEL SAFE
AS $$
DECLARE
    ts_millis  BIGINT;
    uuid_bytes BYTEA;
BEGIN
    ts_millis  := FLOOR(EXTRACT(EPOCH FROM clock_timestamp()) * 1000)::BIGINT;
    uuid_bytes := substring(int8send(ts_millis) FROM 3) || public.gen_random_bytes(10);
    uuid_bytes := set_byte(uuid_bytes, 6, (get_byte(uuid_bytes, 6) & 15) | 112);
    uuid_bytes := set_byte(uuid_bytes, 8, (get_byte(uuid_bytes, 8) & 63) | 128);
    RETURN encode(uuid_bytes, 'hex')::uuid;
END;
$$;
"#;

fn column_constraints(col: &ColumnSchema) -> String {
    let mut parts: Vec<String> = Vec::new();

    if col.primary_key {
        parts.push("PRIMARY KEY".to_string());
    }
    if !col.nullable && !col.primary_key {
        parts.push("NOT NULL".to_string());
    }
    if col.unique {
        parts.push("UNIQUE".to_string());
    }
    if col.auto_increment {
        parts.push("AUTO_INCREMENT".to_string());
    }
    if let Some(ref default) = col.default_value {
        parts.push(format!("DEFAULT {}", default));
    }

    parts.join(" ")
}
