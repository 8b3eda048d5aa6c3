//! Core model types shared across the generator.
//!
//! - [`schema`]: the normalized table/column/index/FK model produced by the
//!   projector and the extractor and consumed by the differ and emitter
//! - [`descriptor`]: the declarative entity input
//! - [`ident`]: snake-case derivation and identifier validation

pub mod descriptor;
pub mod ident;
pub mod schema;

pub use descriptor::{
    AttributeOverride, ColumnSpec, EmbeddedField, EmbeddedSpec, EntityDescriptor, FieldDescriptor,
    FieldKind, IdStrategy, IndexSpec, JoinSpec, TableSpec,
};
pub use schema::{ColumnSchema, FkAction, ForeignKeySchema, IndexSchema, TableSchema};
