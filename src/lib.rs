//! `pdf_field_forge` — extract, rename, and validate PDF interactive-form
//! fields without disturbing layout or accessibility structure.
//!
//! The pipeline runs in six stages, each its own module: [`loader`] opens the
//! document, [`extractor`] flattens its field tree, [`context`] attaches
//! nearby-text labels, [`hierarchy`] maintains an independent parent/child
//! view used to validate proposed renames, [`planner`] and [`executor`] turn
//! an external rename mapping into a scored plan and then apply it, and
//! [`backup`]/[`integrity`] snapshot the source and grade the result.
//! [`reports`] writes the JSON/CSV artifacts every run produces.

pub mod backup;
pub mod context;
pub mod error;
pub mod executor;
pub mod extractor;
pub mod flags;
pub mod hierarchy;
pub mod integrity;
pub mod loader;
pub mod model;
pub mod naming;
mod pdfdict;
pub mod planner;
pub mod reports;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::{info, warn};

use context::LayoutConfig;
use error::Result;
use executor::ExecutorConfig;
use loader::LoadedDocument;
use model::{FieldContext, FormField, ModificationPlan, ModificationResult};

/// Tunable policy for a full end-to-end run (ambient configuration layer).
/// File-based loading of this struct is a CLI concern, out of scope here —
/// callers construct it directly, defaulting to the values spec.md fixes.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub credential: Option<Vec<u8>>,
    pub dry_run: bool,
    pub backup_enabled: bool,
    pub backup_dir: PathBuf,
    pub output_path: Option<PathBuf>,
    pub write_reports: bool,
    pub layout: LayoutConfig,
    pub large_form_threshold: usize,
    pub backup_retention_days: i64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            credential: None,
            dry_run: false,
            backup_enabled: true,
            backup_dir: PathBuf::from("./backups"),
            output_path: None,
            write_reports: true,
            layout: LayoutConfig::default(),
            large_form_threshold: 1000,
            backup_retention_days: 30,
        }
    }
}

/// Result of [`analyze`]: every field plus its derived context, ready to be
/// handed to an external naming engine that will produce the rename mapping
/// [`modify`] expects.
pub struct AnalysisResult {
    pub fields: Vec<FormField>,
    pub context: Vec<FieldContext>,
}

/// Stages A, B, C: open the document, extract its fields, and derive context
/// for each. Does not touch the filesystem beyond reading `path`.
pub fn analyze(path: impl AsRef<Path>, config: &PipelineConfig) -> Result<AnalysisResult> {
    let path = path.as_ref();
    let doc = LoadedDocument::open(path, config.credential.as_deref())?;
    let fields = extractor::extract_fields_with_threshold(&doc, config.large_form_threshold)?;
    let context = context::extract_context_with_config(&doc, &fields, &config.layout)?;
    info!("analyzed {}: {} fields", path.display(), fields.len());
    Ok(AnalysisResult { fields, context })
}

/// Write `<stem>_database_ready.csv` for the fields produced by [`analyze`].
/// Kept separate from `analyze` itself since not every caller wants a CSV on
/// disk for a read-only inspection.
pub fn export_database_csv(source_path: impl AsRef<Path>, fields: &[FormField]) -> Result<PathBuf> {
    reports::write_database_ready(source_path.as_ref(), fields)
}

/// Stage D (validate only): score a proposed rename mapping against the
/// fields' independent hierarchy view without building a full plan.
pub fn validate_hierarchy(
    fields: &[FormField],
    mapping: &HashMap<String, String>,
) -> Vec<hierarchy::HierarchyConflict> {
    hierarchy::HierarchyTree::build(fields).propose(mapping)
}

/// Stage E.1: build a [`ModificationPlan`] from `fields` and a rename mapping.
pub fn plan(fields: &[FormField], mapping: &HashMap<String, String>) -> ModificationPlan {
    planner::plan(fields, mapping)
}

/// Stages E.2 and F: apply an already-built plan's modifications to the
/// document at `source_path`, backing it up first and validating the result
/// afterward. Writes JSON/CSV reports alongside the source when
/// `config.write_reports` is set.
pub fn modify(
    source_path: impl AsRef<Path>,
    plan: ModificationPlan,
    config: &PipelineConfig,
) -> Result<ModificationResult> {
    let source_path = source_path.as_ref();
    let executor_config = ExecutorConfig {
        dry_run: config.dry_run,
        backup_enabled: config.backup_enabled,
        backup_dir: config.backup_dir.clone(),
        output_path: config.output_path.clone(),
        credential: config.credential.clone(),
    };

    let result = executor::apply(source_path, plan.modifications, &executor_config)?;

    if config.backup_enabled && !config.dry_run {
        let service = backup::BackupService::new(&config.backup_dir);
        match service.cleanup(config.backup_retention_days, true) {
            Ok(summary) if !summary.errors.is_empty() => {
                warn!("backup cleanup finished with errors: {:?}", summary.errors)
            }
            Err(err) => warn!("backup cleanup failed: {err}"),
            _ => {}
        }
    }

    if config.write_reports {
        reports::write_modification_report(source_path, &result)?;
        if let Some(validation_report) = &result.validation_report {
            reports::write_validation_report(source_path, validation_report)?;
        }
        reports::write_modification_summary(source_path, &result.modifications)?;
    }

    Ok(result)
}

/// Run the full pipeline end to end: analyze the document, build a plan from
/// `mapping` (the rename mapping an external naming engine produces per
/// spec §6.1), and apply it. Equivalent to calling [`analyze`], [`plan`], and
/// [`modify`] in sequence — kept as one entry point for callers that already
/// have a complete mapping and don't need the intermediate [`AnalysisResult`].
pub fn run_pipeline(
    source_path: impl AsRef<Path>,
    mapping: &HashMap<String, String>,
    config: &PipelineConfig,
) -> Result<ModificationResult> {
    let source_path = source_path.as_ref();
    let analysis = analyze(source_path, config)?;
    let modification_plan = plan(&analysis.fields, mapping);
    modify(source_path, modification_plan, config)
}
