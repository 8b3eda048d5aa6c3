//! # schemagen
//!
//! Entity-driven SQL migration generator for PostgreSQL and MariaDB.
//!
//! Given a set of declaratively annotated entity descriptors and an output
//! directory, the generator emits an ordered, content-addressed sequence of
//! SQL files: initial CREATE TABLE scripts, extension/function setup, index
//! and foreign-key declarations, and - on subsequent runs - incremental
//! ALTER scripts that carry the previously materialized schema forward to
//! the current entity set. Previously emitted files are never rewritten; a
//! hash header makes repeated runs byte-stable.
//!
//! ## Example
//!
//! ```rust,no_run
//! use schemagen::{
//!     EntityDescriptor, FieldDescriptor, GenerationMode, GeneratorConfig, IdStrategy,
//!     Orchestrator, SqlDialect,
//! };
//!
//! fn main() -> schemagen::Result<()> {
//!     let entities = vec![EntityDescriptor::new("Sample", "com.example.core")
//!         .with_field(FieldDescriptor::id("id", "UUID", Some(IdStrategy::Uuid)))
//!         .with_field(FieldDescriptor::plain("email", "String"))];
//!
//!     let config = GeneratorConfig::new("db/migrations")
//!         .with_dialect(SqlDialect::Postgres)
//!         .with_mode(GenerationMode::Smart);
//!
//!     let report = Orchestrator::new(config).generate(&entities)?;
//!     println!("{} files written", report.files_written);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod dialect;
pub mod differ;
pub mod emitter;
pub mod error;
pub mod extractor;
pub mod orchestrator;
pub mod projector;
pub mod writer;

// Re-exports for convenient access
pub use crate::core::descriptor::{
    load_descriptors, AttributeOverride, ColumnSpec, EmbeddedField, EmbeddedSpec,
    EntityDescriptor, FieldDescriptor, FieldKind, IdStrategy, IndexSpec, JoinSpec, TableSpec,
};
pub use crate::core::schema::{ColumnSchema, FkAction, ForeignKeySchema, IndexSchema, TableSchema};
pub use config::{GenerationMode, GeneratorConfig, SqlDialect, UuidStrategy};
pub use differ::MigrationDiffer;
pub use emitter::SqlEmitter;
pub use error::{GeneratorError, Result};
pub use extractor::SqlExtractor;
pub use orchestrator::{GenerationReport, Orchestrator};
pub use projector::{EntityProjector, ProjectedEntity};
pub use writer::{DefaultSchemaProvider, MigrationWriter, SchemaProvider, WriteOutcome};
