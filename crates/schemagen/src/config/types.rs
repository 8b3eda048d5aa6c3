//! Configuration type definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Target SQL dialect.
///
/// Chooses type mapping and UUID-generation idioms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlDialect {
    /// PostgreSQL 12+.
    Postgres,
    /// MariaDB 10.5+ (MySQL-compatible syntax).
    MariaDb,
}

impl SqlDialect {
    /// Dialect tag as it appears in emitted header comments.
    pub fn as_sql_comment(&self) -> &'static str {
        match self {
            SqlDialect::Postgres => "POSTGRES",
            SqlDialect::MariaDb => "MARIADB",
        }
    }
}

impl fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlDialect::Postgres => write!(f, "postgres"),
            SqlDialect::MariaDb => write!(f, "mariadb"),
        }
    }
}

impl FromStr for SqlDialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(SqlDialect::Postgres),
            "mariadb" | "mysql" => Ok(SqlDialect::MariaDb),
            other => Err(format!("unknown dialect '{}'", other)),
        }
    }
}

/// UUID generation policy for UUID primary keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UuidStrategy {
    /// Random UUIDs (`uuid-ossp` on PostgreSQL, `UUID()` on MariaDB).
    V4,
    /// Time-ordered UUIDs. PostgreSQL installs a `uuid_generate_v7()`
    /// helper; MariaDB silently falls back to the V4 behavior.
    V7,
}

impl fmt::Display for UuidStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UuidStrategy::V4 => write!(f, "v4"),
            UuidStrategy::V7 => write!(f, "v7"),
        }
    }
}

/// Generation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    /// Emit CREATE TABLE, FK and index files for every entity.
    CreateOnly,
    /// Diff every entity against its previously emitted schema and emit
    /// ALTER files only.
    AlterOnly,
    /// Partition entities into new and existing tables; CREATE the former,
    /// ALTER the latter.
    Smart,
}

impl fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationMode::CreateOnly => write!(f, "create_only"),
            GenerationMode::AlterOnly => write!(f, "alter_only"),
            GenerationMode::Smart => write!(f, "smart"),
        }
    }
}

/// Root configuration for one generator instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Target SQL dialect.
    #[serde(default = "default_dialect")]
    pub dialect: SqlDialect,

    /// UUID generation policy for UUID primary keys.
    #[serde(default = "default_uuid")]
    pub uuid: UuidStrategy,

    /// Generation mode.
    #[serde(default = "default_mode")]
    pub mode: GenerationMode,

    /// Root output directory for partition subdirectories.
    pub out_dir: PathBuf,
}

impl GeneratorConfig {
    /// Create a configuration with default dialect/uuid/mode.
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            dialect: default_dialect(),
            uuid: default_uuid(),
            mode: default_mode(),
            out_dir: out_dir.into(),
        }
    }

    /// Set the dialect.
    pub fn with_dialect(mut self, dialect: SqlDialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Set the UUID strategy.
    pub fn with_uuid(mut self, uuid: UuidStrategy) -> Self {
        self.uuid = uuid;
        self
    }

    /// Set the generation mode.
    pub fn with_mode(mut self, mode: GenerationMode) -> Self {
        self.mode = mode;
        self
    }
}

fn default_dialect() -> SqlDialect {
    SqlDialect::Postgres
}

fn default_uuid() -> UuidStrategy {
    UuidStrategy::V7
}

fn default_mode() -> GenerationMode {
    GenerationMode::Smart
}
