//! Logical type to SQL type mapping.
//!
//! Maps the logical field types found in entity descriptors to concrete SQL
//! type literals for the configured dialect. Every logical type resolves:
//! unknown names fall back to `VARCHAR`.

use crate::config::SqlDialect;

/// Column metadata that influences type resolution.
#[derive(Debug, Clone, Default)]
pub struct ColumnMeta {
    /// String length (defaults to 255).
    pub length: Option<u32>,

    /// Decimal precision (defaults to 19).
    pub precision: Option<u32>,

    /// Decimal scale (defaults to 2).
    pub scale: Option<u32>,

    /// Verbatim SQL type override; wins over all mapping.
    pub column_definition: Option<String>,

    /// Enum marker; enums are stored as `VARCHAR(50)`.
    pub enum_type: bool,
}

impl ColumnMeta {
    /// Metadata carrying only a length.
    pub fn with_length(length: u32) -> Self {
        Self {
            length: Some(length),
            ..Self::default()
        }
    }
}

/// Resolve a logical type name to a SQL type literal.
pub fn map_type(dialect: SqlDialect, logical: &str, meta: &ColumnMeta) -> String {
    if let Some(ref definition) = meta.column_definition {
        if !definition.trim().is_empty() {
            return definition.trim().to_string();
        }
    }

    if meta.enum_type {
        return "VARCHAR(50)".to_string();
    }

    let length = meta.length.unwrap_or(255);
    let pg = dialect == SqlDialect::Postgres;

    match logical {
        "String" | "Character" | "char" => format!("VARCHAR({})", length),

        "byte" | "Byte" => if pg { "SMALLINT" } else { "TINYINT" }.to_string(),
        "short" | "Short" => "SMALLINT".to_string(),
        "int" | "Integer" => if pg { "INTEGER" } else { "INT" }.to_string(),
        "long" | "Long" => "BIGINT".to_string(),

        "float" | "Float" => if pg { "REAL" } else { "FLOAT" }.to_string(),
        "double" | "Double" => if pg { "DOUBLE PRECISION" } else { "DOUBLE" }.to_string(),

        "BigDecimal" => format!(
            "DECIMAL({},{})",
            meta.precision.unwrap_or(19),
            meta.scale.unwrap_or(2)
        ),

        "boolean" | "Boolean" => "BOOLEAN".to_string(),

        "LocalDateTime" | "Instant" => if pg { "TIMESTAMP" } else { "DATETIME" }.to_string(),
        "LocalDate" => "DATE".to_string(),
        "LocalTime" => "TIME".to_string(),
        "ZonedDateTime" | "OffsetDateTime" => {
            if pg { "TIMESTAMP WITH TIME ZONE" } else { "DATETIME" }.to_string()
        }
        "Duration" => "BIGINT".to_string(),
        "Period" => "VARCHAR(50)".to_string(),

        "UUID" | "Uuid" => if pg { "UUID" } else { "CHAR(36)" }.to_string(),

        "JsonNode" | "ObjectNode" | "ArrayNode" => if pg { "JSONB" } else { "JSON" }.to_string(),

        "URL" | "URI" => "VARCHAR(2048)".to_string(),

        "byte[]" | "Byte[]" => if pg { "BYTEA" } else { "BLOB" }.to_string(),

        _ => format!("VARCHAR({})", length),
    }
}
