//! Component E.2 — Modification Executor.
//!
//! Applies a [`ModificationPlan`]'s renames into a freshly reopened copy of
//! the source document (held by a [`WriterSession`] guard) and writes
//! `<stem>.modified.pdf`. Grounded directly on
//! `acroform-rs-old/acroform/src/api.rs`'s `AcroFormDocument::fill`: resolve
//! → clone → `Updater::update` → `save`, generalized from "overwrite `/V`"
//! to "overwrite `/T` as a text-string object" per spec §9's encoding note,
//! and from "match by field name, once" to "match by name, consuming one
//! planned modification per physical widget so duplicate source names don't
//! double-apply". A single field failing to write is non-critical (spec §7's
//! `modification-field-failure`) and only demotes that one
//! [`FieldModification`]; only the writer failing to serialize the whole
//! document at all is `modification-critical` and rolls back.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use log::{info, warn};
use pdf::object::{PlainRef, Resolve};
use pdf::primitive::{Dictionary, PdfString, Primitive};
use snafu::ResultExt;

use crate::backup::BackupService;
use crate::error::{self, Result};
use crate::loader::LoadedDocument;
use crate::model::{BackupRecord, FieldModification, IntegrityReport, ModificationResult};
use crate::pdfdict::{dict_references, dict_string, resolve_dict};

/// Tunable policy for one executor invocation (spec §4.E.2 / §5).
pub struct ExecutorConfig {
    pub dry_run: bool,
    pub backup_enabled: bool,
    pub backup_dir: PathBuf,
    pub output_path: Option<PathBuf>,
    pub credential: Option<Vec<u8>>,
}

/// Scoped acquisition of the reopened writer document and its pre-
/// modification backup (spec §9's "scoped acquisition of the writer and the
/// backup-index file with guaranteed release on all exit paths"). Grounded on
/// `AcroFormDocument` owning its `CachedFile` for the lifetime of one call,
/// extended with a rollback-on-drop guarantee: unless [`WriterSession::commit`]
/// runs first, dropping the session restores `backup_record`'s snapshot over
/// `source_path`, so every early return in [`apply`] — not just one
/// hand-written branch — rolls back correctly.
struct WriterSession {
    doc: LoadedDocument,
    backup_record: Option<BackupRecord>,
    backup_dir: PathBuf,
    source_path: PathBuf,
    committed: bool,
}

impl WriterSession {
    fn new(doc: LoadedDocument, backup_record: Option<BackupRecord>, backup_dir: PathBuf, source_path: PathBuf) -> Self {
        WriterSession {
            doc,
            backup_record,
            backup_dir,
            source_path,
            committed: false,
        }
    }

    /// Disarm the rollback: the run reached a state worth keeping, whether
    /// that's a full success or one with only non-critical field failures.
    fn commit(&mut self) {
        self.committed = true;
    }
}

impl Drop for WriterSession {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        let Some(record) = &self.backup_record else {
            return;
        };
        let service = BackupService::new(&self.backup_dir);
        if let Err(err) = service.restore(&record.backup_id, Some(&self.source_path)) {
            warn!("writer session rollback failed: {err}");
        }
    }
}

/// Apply `modifications` (as produced by [`crate::planner::plan`]) to the
/// document at `source_path`, per spec §4.E.2's eight-step algorithm.
pub fn apply(
    source_path: &Path,
    mut modifications: Vec<FieldModification>,
    config: &ExecutorConfig,
) -> Result<ModificationResult> {
    let start = Instant::now();
    let mut errors = Vec::new();
    let mut backup_record: Option<BackupRecord> = None;

    // Step 1: snapshot before opening the writer.
    if !config.dry_run && config.backup_enabled {
        let service = BackupService::new(&config.backup_dir);
        match service.create(source_path, "pre-modification snapshot") {
            Ok(record) => backup_record = Some(record),
            Err(err) => {
                errors.push(err.to_string());
                return Ok(ModificationResult {
                    success: false,
                    applied_count: 0,
                    failed_count: 0,
                    skipped_count: modifications.len() as u32,
                    modifications,
                    validation_report: None,
                    backup_record: None,
                    processing_time_seconds: start.elapsed().as_secs_f64(),
                    errors,
                    output_path: None,
                });
            }
        }
    }

    // Step 2: reopen the source inside a scoped writer session (spec §9) —
    // the one used for extraction/context is never mutated, and this fresh
    // copy rolls itself back on drop until explicitly committed below.
    let bytes = std::fs::read(source_path).context(error::InputUnreadableSnafu)?;
    let doc = LoadedDocument::load(bytes, config.credential.as_deref())?;
    let mut session = WriterSession::new(doc, backup_record.clone(), config.backup_dir.clone(), source_path.to_path_buf());

    // Step 3: lookup tables.
    let mut queue: HashMap<String, Vec<usize>> = HashMap::new();
    for (index, modification) in modifications.iter().enumerate() {
        queue.entry(modification.old_name.clone()).or_default().push(index);
    }

    let top_level_refs: Vec<PlainRef> = match session.doc.file.get_root().forms.as_ref() {
        Some(forms) => forms
            .fields
            .iter()
            .map(|field_rc| field_rc.get_ref().get_inner())
            .collect(),
        None => Vec::new(),
    };

    // Step 4/5: walk and collect owned, clone-on-write replacement
    // dictionaries. The resolver's borrow of `session.doc.file` ends with
    // this block, so the mutation pass below can borrow it mutably.
    let mut updates: Vec<(PlainRef, Dictionary, usize)> = Vec::new();
    let now = Utc::now();
    {
        let resolver = session.doc.file.resolver();
        let mut visited = HashSet::new();
        for field_ref in &top_level_refs {
            walk_and_rename(
                &resolver,
                *field_ref,
                &mut queue,
                &mut modifications,
                now,
                &mut updates,
                &mut visited,
            );
        }
    }

    // A failed per-field overwrite is `modification-field-failure` (spec
    // §7), not critical: demote that one modification to `Failed` and move
    // on so the remaining successes still make it into the output.
    if !config.dry_run {
        for (plain_ref, new_dict, index) in updates {
            if let Err(err) = session.doc.file.update(plain_ref, Primitive::Dictionary(new_dict)) {
                let message = format!("failed to write field {plain_ref:?}: {err}");
                warn!("{message}");
                modifications[index].mark_failed(message.clone(), now);
                errors.push(message);
            }
        }
    }

    let applied_count = modifications
        .iter()
        .filter(|m| m.status == crate::model::ModificationStatus::Success)
        .count() as u32;
    let failed_count = modifications
        .iter()
        .filter(|m| m.status == crate::model::ModificationStatus::Failed)
        .count() as u32;
    let skipped_count = modifications.len() as u32 - applied_count - failed_count;

    // Step 6: write output when something actually changed.
    let mut output_path = None;
    if !config.dry_run && applied_count > 0 {
        let path = config
            .output_path
            .clone()
            .unwrap_or_else(|| default_output_path(source_path));
        match session.doc.file.save() {
            Ok(written) => {
                if let Err(err) = std::fs::write(&path, written) {
                    errors.push(format!("failed to write output file: {err}"));
                } else {
                    output_path = Some(path);
                }
            }
            Err(err) => {
                // Step 8: the writer failing to serialize the document at all
                // is the one case spec treats as `modification-critical`.
                // Returning here without calling `session.commit()` is what
                // arms `WriterSession::drop`'s rollback to the snapshot.
                errors.push(format!("failed to serialize modified document: {err}"));
                return Ok(ModificationResult {
                    success: false,
                    applied_count,
                    failed_count,
                    skipped_count,
                    modifications,
                    validation_report: None,
                    backup_record,
                    processing_time_seconds: start.elapsed().as_secs_f64(),
                    errors,
                    output_path: None,
                });
            }
        }
    }

    // Step 7: validate the result, best-effort.
    let validation_report: Option<IntegrityReport> = if let Some(path) = &output_path {
        match crate::integrity::validate(path, Some(source_path), None) {
            Ok(report) => Some(report),
            Err(err) => {
                warn!("post-modification validation failed to run: {err}");
                None
            }
        }
    } else {
        None
    };

    info!(
        "executor finished: applied={applied_count} failed={failed_count} skipped={skipped_count} dry_run={}",
        config.dry_run
    );

    session.commit();

    Ok(ModificationResult {
        success: errors.is_empty(),
        applied_count,
        failed_count,
        skipped_count,
        modifications,
        validation_report,
        backup_record,
        processing_time_seconds: start.elapsed().as_secs_f64(),
        errors,
        output_path,
    })
}

fn walk_and_rename(
    resolver: &impl Resolve,
    self_ref: PlainRef,
    queue: &mut HashMap<String, Vec<usize>>,
    modifications: &mut [FieldModification],
    now: chrono::DateTime<Utc>,
    updates: &mut Vec<(PlainRef, Dictionary, usize)>,
    visited: &mut HashSet<PlainRef>,
) {
    if !visited.insert(self_ref) {
        return;
    }

    let Ok(dict) = resolve_dict(resolver, self_ref) else {
        return;
    };

    if let Some(current_name) = dict_string(&dict, "T", resolver) {
        if let Some(indices) = queue.get_mut(&current_name) {
            if let Some(index) = indices.pop() {
                let new_name = modifications[index].new_name.clone();
                let mut new_dict = dict.clone();
                new_dict.insert(
                    "T",
                    Primitive::String(PdfString::new(new_name.clone().into_bytes())),
                );
                updates.push((self_ref, new_dict, index));
                modifications[index].mark_success(now);
            }
        }
    }

    for kid_ref in dict_references(&dict, "Kids", resolver) {
        walk_and_rename(resolver, kid_ref, queue, modifications, now, updates, visited);
    }
}

fn default_output_path(source_path: &Path) -> PathBuf {
    let stem = source_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "document".to_string());
    let parent = source_path.parent().unwrap_or_else(|| Path::new("."));
    parent.join(format!("{stem}.modified.pdf"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_output_path_appends_modified_suffix() {
        let path = default_output_path(Path::new("/tmp/forms/intake.pdf"));
        assert_eq!(path, PathBuf::from("/tmp/forms/intake.modified.pdf"));
    }
}
