//! Generation orchestrator - drives the projection/diff/write pipeline.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::{GenerationMode, GeneratorConfig, SqlDialect};
use crate::core::descriptor::{load_descriptors, EntityDescriptor};
use crate::core::schema::TableSchema;
use crate::differ::MigrationDiffer;
use crate::emitter::SqlEmitter;
use crate::error::{GeneratorError, Result};
use crate::extractor::SqlExtractor;
use crate::projector::EntityProjector;
use crate::writer::{DefaultSchemaProvider, MigrationWriter, SchemaProvider, WriteOutcome};

/// Sort number of the UUID setup file.
const SORT_UUID_SETUP: u16 = 1;
/// First create-table sort number; entities take consecutive numbers in
/// sorted-table order.
const SORT_CREATE_BASE: u16 = 1000;
/// Sort number of the per-partition foreign-key file.
const SORT_FOREIGN_KEYS: u16 = 5000;
/// Sort number of the per-partition index file.
const SORT_INDEXES: u16 = 9000;

/// Generation orchestrator.
///
/// Library-shaped: construct with a [`GeneratorConfig`], optionally inject a
/// [`SchemaProvider`], then call [`generate`](Self::generate) with the entity
/// set.
pub struct Orchestrator {
    config: GeneratorConfig,
    provider: Box<dyn SchemaProvider>,
}

/// Result of one generation run.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    /// Unique run identifier.
    pub run_id: String,

    /// Mode the run executed in.
    pub mode: GenerationMode,

    /// Dialect the run emitted for.
    pub dialect: SqlDialect,

    /// Frozen timestamp shared by every file written in this run.
    pub execution_timestamp: String,

    /// When the run started.
    pub started_at: DateTime<Utc>,

    /// When the run completed.
    pub completed_at: DateTime<Utc>,

    /// Total entities processed.
    pub tables_total: usize,

    /// Files created by this run.
    pub files_written: usize,

    /// Write attempts skipped because the content was already on disk.
    pub files_skipped: usize,

    /// Tables skipped in ALTER mode because no prior CREATE exists on disk.
    pub tables_skipped: Vec<String>,

    /// Paths of the files created by this run.
    pub written_paths: Vec<PathBuf>,
}

impl GenerationReport {
    /// Convert to a pretty JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// One entity after projection and partition assignment.
struct PlannedEntity<'a> {
    entity: &'a EntityDescriptor,
    table: TableSchema,
    needs_uuid_generator: bool,
    folder: String,
    sort_number: u16,
}

impl Orchestrator {
    /// Create an orchestrator with the default naming/partitioning policy.
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            config,
            provider: Box::new(DefaultSchemaProvider),
        }
    }

    /// Replace the naming/partitioning policy.
    pub fn with_schema_provider(mut self, provider: Box<dyn SchemaProvider>) -> Self {
        self.provider = provider;
        self
    }

    /// Load a descriptor pack from disk and generate from it.
    pub fn generate_from_file<P: AsRef<Path>>(&self, path: P) -> Result<GenerationReport> {
        let entities = load_descriptors(path)?;
        self.generate(&entities)
    }

    /// Run the generation pipeline over the given entity set.
    pub fn generate(&self, entities: &[EntityDescriptor]) -> Result<GenerationReport> {
        self.config.validate()?;

        let started_at = Utc::now();
        let execution_timestamp = started_at.format("%Y%m%d%H%M%S").to_string();
        let run_id = uuid::Uuid::new_v4().to_string();

        info!(
            "starting generation run {} ({} entities, dialect {}, mode {})",
            run_id,
            entities.len(),
            self.config.dialect,
            self.config.mode
        );

        let planned = self.plan(entities)?;
        let mut writer = MigrationWriter::new(execution_timestamp.clone());
        let mut tables_skipped = Vec::new();
        let mut outcomes = Vec::new();

        match self.config.mode {
            GenerationMode::CreateOnly => {
                let all: Vec<&PlannedEntity> = planned.iter().collect();
                self.run_create_path(&mut writer, &all, &mut outcomes)?;
            }
            GenerationMode::AlterOnly => {
                let all: Vec<&PlannedEntity> = planned.iter().collect();
                self.run_alter_path(&mut writer, &all, &mut outcomes, &mut tables_skipped)?;
            }
            GenerationMode::Smart => {
                let mut fresh = Vec::new();
                let mut existing = Vec::new();
                let mut known_cache: HashMap<PathBuf, std::collections::BTreeSet<String>> =
                    HashMap::new();

                for p in &planned {
                    let dir = self.partition_dir(&p.folder);
                    let known = known_cache
                        .entry(dir.clone())
                        .or_insert_with(|| SqlExtractor::existing_tables(&dir));
                    if known.contains(&p.table.name.to_lowercase()) {
                        existing.push(p);
                    } else {
                        fresh.push(p);
                    }
                }

                self.run_create_path(&mut writer, &fresh, &mut outcomes)?;
                self.run_alter_path(&mut writer, &existing, &mut outcomes, &mut tables_skipped)?;
            }
        }

        let files_written = outcomes
            .iter()
            .filter(|o| matches!(o, WriteOutcome::Written(_)))
            .count();
        let files_skipped = outcomes.len() - files_written;
        let written_paths: Vec<PathBuf> = writer.written_files().cloned().collect();
        let completed_at = Utc::now();

        info!(
            "generation run {} finished: {} written, {} unchanged, {} tables skipped",
            run_id,
            files_written,
            files_skipped,
            tables_skipped.len()
        );

        Ok(GenerationReport {
            run_id,
            mode: self.config.mode,
            dialect: self.config.dialect,
            execution_timestamp,
            started_at,
            completed_at,
            tables_total: planned.len(),
            files_written,
            files_skipped,
            tables_skipped,
            written_paths,
        })
    }

    /// Project every entity, enforce global table-name uniqueness, and assign
    /// partition folders plus sort numbers in sorted-table order.
    fn plan<'a>(&self, entities: &'a [EntityDescriptor]) -> Result<Vec<PlannedEntity<'a>>> {
        let mut by_table: HashMap<String, &EntityDescriptor> = HashMap::new();
        for entity in entities {
            let table = crate::projector::table_name(entity);
            if let Some(first) = by_table.insert(table.to_lowercase(), entity) {
                return Err(GeneratorError::DuplicateTableName {
                    table: table.to_lowercase(),
                    first: first.name.clone(),
                    second: entity.name.clone(),
                });
            }
        }

        let mut ordered: Vec<&EntityDescriptor> = entities.iter().collect();
        ordered.sort_by_key(|e| crate::projector::table_name(e).to_lowercase());

        let projector =
            EntityProjector::new(self.config.dialect, self.config.uuid, entities);

        let mut planned = Vec::with_capacity(ordered.len());
        for (i, entity) in ordered.into_iter().enumerate() {
            let projected = projector.project(entity)?;
            projected.table.validate()?;

            let folder = self.provider.folder_for(entity);
            planned.push(PlannedEntity {
                entity,
                table: projected.table,
                needs_uuid_generator: projected.needs_uuid_generator,
                folder,
                sort_number: SORT_CREATE_BASE + i as u16,
            });
        }

        Ok(planned)
    }

    fn run_create_path(
        &self,
        writer: &mut MigrationWriter,
        planned: &[&PlannedEntity],
        outcomes: &mut Vec<WriteOutcome>,
    ) -> Result<()> {
        if planned.is_empty() {
            return Ok(());
        }

        let emitter = SqlEmitter::new(self.config.dialect);

        if planned.iter().any(|p| p.needs_uuid_generator) {
            if let Some(body) = emitter.uuid_setup(self.config.uuid) {
                let dir = self.setup_dir();
                outcomes.push(writer.write_migration(
                    self.provider.as_ref(),
                    &dir,
                    SORT_UUID_SETUP,
                    "setup_uuid_extension",
                    &body,
                )?);
            }
        }

        for p in planned {
            let body = emitter.create_table(&p.table, &p.entity.name);
            let dir = self.partition_dir(&p.folder);
            outcomes.push(writer.write_migration(
                self.provider.as_ref(),
                &dir,
                p.sort_number,
                &format!("create_{}_table", p.table.name),
                &body,
            )?);
        }

        let mut by_partition: BTreeMap<&str, Vec<&PlannedEntity>> = BTreeMap::new();
        for p in planned {
            by_partition.entry(p.folder.as_str()).or_default().push(p);
        }

        for (folder, group) in by_partition {
            let dir = self.partition_dir(folder);
            let tables: Vec<&TableSchema> = group.iter().map(|p| &p.table).collect();

            let fk_body = emitter.foreign_keys(&tables);
            if !fk_body.is_empty() {
                outcomes.push(writer.write_migration(
                    self.provider.as_ref(),
                    &dir,
                    SORT_FOREIGN_KEYS,
                    "add_foreign_keys",
                    &fk_body,
                )?);
            }

            let idx_body = emitter.indexes(&tables);
            if !idx_body.is_empty() {
                outcomes.push(writer.write_migration(
                    self.provider.as_ref(),
                    &dir,
                    SORT_INDEXES,
                    "add_indexes",
                    &idx_body,
                )?);
            }
        }

        Ok(())
    }

    fn run_alter_path(
        &self,
        writer: &mut MigrationWriter,
        planned: &[&PlannedEntity],
        outcomes: &mut Vec<WriteOutcome>,
        tables_skipped: &mut Vec<String>,
    ) -> Result<()> {
        for p in planned {
            let dir = self.partition_dir(&p.folder);
            let Some(previous) = SqlExtractor::load_table_schema(&dir, &p.table.name) else {
                warn!(
                    "no prior schema for table '{}' in {}, skipping",
                    p.table.name,
                    dir.display()
                );
                tables_skipped.push(p.table.name.clone());
                continue;
            };

            let body = MigrationDiffer::diff(&p.table.name, &previous, &p.table);
            if body.is_empty() {
                continue;
            }

            outcomes.push(writer.write_migration(
                self.provider.as_ref(),
                &dir,
                p.sort_number,
                &format!("alter_{}_table", p.table.name),
                &body,
            )?);
        }

        Ok(())
    }

    fn partition_dir(&self, folder: &str) -> PathBuf {
        if folder.is_empty() {
            self.config.out_dir.join("default")
        } else {
            self.config.out_dir.join(folder)
        }
    }

    fn setup_dir(&self) -> PathBuf {
        let folder = self.provider.setup_folder();
        if folder.is_empty() {
            self.config.out_dir.clone()
        } else {
            self.config.out_dir.join(folder)
        }
    }
}
