//! Idempotent migration file emission and the naming policy seam.
//!
//! Every emitted file starts with a `-- HASH: <16 hex>` header over the rest
//! of its content. Before writing, the writer scans the target directory for
//! files of the same (sort number, base name); a matching hash means the
//! content is already on disk and nothing is written. Files are append-only:
//! an existing path is never overwritten.

use std::collections::BTreeSet;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use regex::Regex;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::core::descriptor::EntityDescriptor;
use crate::error::{GeneratorError, Result};

/// Naming and partitioning policy, injectable by the caller.
pub trait SchemaProvider: Send + Sync {
    /// Partition folder for an entity. Empty means the default partition.
    fn folder_for(&self, entity: &EntityDescriptor) -> String;

    /// Folder for the UUID/extension setup file. Empty means the output root.
    fn setup_folder(&self) -> String;

    /// File name for a migration emitted at `timestamp` with the given sort
    /// number and base name.
    fn file_name(&self, timestamp: &str, sort_number: u16, base_name: &str) -> String;

    /// Regex source matching every file name this provider would have
    /// produced for the given sort number and base name, at any timestamp.
    fn file_pattern(&self, sort_number: u16, base_name: &str) -> String;
}

/// Default policy: `V<yyyyMMddHHmmss><sort:04>__<base>.sql`, partitioned by
/// the entity's explicit schema (lowercased) or the last package segment,
/// setup files at the output root.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSchemaProvider;

impl SchemaProvider for DefaultSchemaProvider {
    fn folder_for(&self, entity: &EntityDescriptor) -> String {
        match entity.table.schema.as_deref() {
            Some(schema) if !schema.trim().is_empty() => schema.trim().to_lowercase(),
            _ => entity.package_tail(),
        }
    }

    fn setup_folder(&self) -> String {
        String::new()
    }

    fn file_name(&self, timestamp: &str, sort_number: u16, base_name: &str) -> String {
        format!("V{}{:04}__{}.sql", timestamp, sort_number, base_name)
    }

    fn file_pattern(&self, sort_number: u16, base_name: &str) -> String {
        format!(r"^V\d{{14}}{:04}__{}\.sql$", sort_number, regex::escape(base_name))
    }
}

/// Outcome of one write attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// A new versioned file was created.
    Written(PathBuf),
    /// An existing file already carries this content hash.
    Skipped,
}

/// Writes migration files under one frozen execution timestamp.
pub struct MigrationWriter {
    timestamp: String,
    written: BTreeSet<PathBuf>,
}

impl MigrationWriter {
    /// Create a writer for one generation run. All files written through it
    /// share `timestamp` so lexicographic order equals emission order.
    pub fn new(timestamp: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            written: BTreeSet::new(),
        }
    }

    /// The frozen execution timestamp.
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// Paths created by this writer, in sorted order.
    pub fn written_files(&self) -> impl Iterator<Item = &PathBuf> {
        self.written.iter()
    }

    /// Write `body` as a migration file in `target_dir`, unless a file for
    /// the same (sort number, base name) already carries the same content
    /// hash.
    pub fn write_migration(
        &mut self,
        provider: &dyn SchemaProvider,
        target_dir: &Path,
        sort_number: u16,
        base_name: &str,
        body: &str,
    ) -> Result<WriteOutcome> {
        let hash = content_hash(body);

        if self.already_written(provider, target_dir, sort_number, base_name, &hash)? {
            debug!(
                "skipping {}/{:04}__{}: content hash {} already on disk",
                target_dir.display(),
                sort_number,
                base_name,
                hash
            );
            return Ok(WriteOutcome::Skipped);
        }

        fs::create_dir_all(target_dir)?;

        let file_name = provider.file_name(&self.timestamp, sort_number, base_name);
        let path = target_dir.join(&file_name);
        if path.exists() || self.written.contains(&path) {
            return Err(GeneratorError::FileConflict { path });
        }

        fs::write(&path, format!("-- HASH: {}\n{}", hash, body))?;
        info!("wrote {}", path.display());
        self.written.insert(path.clone());
        Ok(WriteOutcome::Written(path))
    }

    fn already_written(
        &self,
        provider: &dyn SchemaProvider,
        target_dir: &Path,
        sort_number: u16,
        base_name: &str,
        hash: &str,
    ) -> Result<bool> {
        let pattern = Regex::new(&provider.file_pattern(sort_number, base_name))
            .map_err(|e| GeneratorError::Config(format!("invalid file pattern: {}", e)))?;

        let entries = match fs::read_dir(target_dir) {
            Ok(entries) => entries,
            Err(_) => return Ok(false),
        };

        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if !pattern.is_match(name) {
                continue;
            }
            if let Some(existing) = read_hash_header(&entry.path()) {
                if existing == hash {
                    return Ok(true);
                }
            }
        }

        Ok(false)
    }
}

/// First 16 hex chars of the SHA-256 of the body.
pub fn content_hash(body: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..16].to_string()
}

/// The hash recorded on the first line of an emitted file, if present.
fn read_hash_header(path: &Path) -> Option<String> {
    let file = fs::File::open(path).ok()?;
    let mut first_line = String::new();
    BufReader::new(file).read_line(&mut first_line).ok()?;
    first_line
        .trim_end()
        .strip_prefix("-- HASH: ")
        .map(|rest| rest.to_string())
}
