//! Dialect-specific type mapping.
//!
//! The dialect tag itself lives in [`crate::config::SqlDialect`]; this module
//! holds the logical-type resolution policy applied by the projector.

mod typemap;

pub use typemap::{map_type, ColumnMeta};
