//! Component F.1 — Backup/Recovery.
//!
//! Creates, lists, restores, and ages out PDF snapshots taken immediately
//! before mutation. Grounded on
//! `original_source/.../backup_recovery.py`'s `BackupRecoverySystem`: same
//! `backup_id` format, same `backup_metadata.json` index, same
//! first-eight-bytes integrity check — reimplemented with `chrono` for
//! timestamp formatting and `serde_json` for the index file.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Local, Utc};
use log::info;
use snafu::ResultExt;

use crate::error::{self, Result};
use crate::model::{BackupRecord, RestoreResult};

const INDEX_FILE: &str = "backup_metadata.json";
const PDF_HEADER: &[u8] = b"%PDF-";

pub struct CleanupSummary {
    pub removed: u32,
    pub bytes_reclaimed: u64,
    pub errors: Vec<String>,
}

/// Owns one backup working directory and its JSON index.
pub struct BackupService {
    work_dir: PathBuf,
}

impl BackupService {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        BackupService {
            work_dir: work_dir.into(),
        }
    }

    fn index_path(&self) -> PathBuf {
        self.work_dir.join(INDEX_FILE)
    }

    fn load_index(&self) -> Result<HashMap<String, BackupRecord>> {
        let path = self.index_path();
        if !path.exists() {
            return Ok(HashMap::new());
        }
        let contents = fs::read_to_string(&path)?;
        serde_json::from_str(&contents).context(error::BackupIndexSnafu)
    }

    fn save_index(&self, index: &HashMap<String, BackupRecord>) -> Result<()> {
        fs::create_dir_all(&self.work_dir)?;
        let contents = serde_json::to_string_pretty(index).context(error::BackupIndexSnafu)?;
        fs::write(self.index_path(), contents)?;
        Ok(())
    }

    /// `create(path, notes)` — spec §4.F.1.
    pub fn create(&self, path: &Path, notes: &str) -> Result<BackupRecord> {
        self.create_with_count(path, notes, None)
    }

    /// `create_incremental(path, count, notes)` — spec §4.F.1.
    pub fn create_incremental(&self, path: &Path, count: u32, notes: &str) -> Result<BackupRecord> {
        self.create_with_count(path, notes, Some(count))
    }

    fn create_with_count(&self, path: &Path, notes: &str, count: Option<u32>) -> Result<BackupRecord> {
        if !path.exists() {
            return error::BackupSourceMissingSnafu {
                path: path.to_path_buf(),
            }
            .fail();
        }

        fs::create_dir_all(&self.work_dir)?;

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "document".to_string());
        let now = Local::now();
        let backup_id = format!("{stem}_{}", now.format("%Y%m%d_%H%M%S"));
        let backup_path = self.work_dir.join(format!("{backup_id}_backup.pdf"));

        fs::copy(path, &backup_path).context(error::BackupCopyFailedSnafu)?;
        let size = fs::metadata(&backup_path)?.len();

        let record = BackupRecord {
            backup_id: backup_id.clone(),
            original_path: path.to_path_buf(),
            backup_path,
            created_at: now.with_timezone(&Utc),
            size,
            notes: notes.to_string(),
            important_flag: false,
            modification_count: count,
        };

        let mut index = self.load_index()?;
        index.insert(backup_id.clone(), record.clone());
        self.save_index(&index)?;

        info!("created backup {backup_id} for {}", path.display());
        Ok(record)
    }

    /// `restore(backup_id, target?)` — spec §4.F.1.
    pub fn restore(&self, backup_id: &str, target: Option<&Path>) -> Result<RestoreResult> {
        let index = self.load_index()?;
        let Some(record) = index.get(backup_id) else {
            return error::BackupMissingSnafu {
                backup_id: backup_id.to_string(),
            }
            .fail();
        };

        if !validate_integrity(&record.backup_path) {
            return error::BackupCorruptSnafu {
                backup_id: backup_id.to_string(),
            }
            .fail();
        }

        let target_path = target
            .map(Path::to_path_buf)
            .unwrap_or_else(|| record.original_path.clone());

        if let Some(parent) = target_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut errors = Vec::new();
        let success = match fs::copy(&record.backup_path, &target_path) {
            Ok(_) => true,
            Err(err) => {
                errors.push(err.to_string());
                false
            }
        };

        Ok(RestoreResult {
            success,
            restored_path: target_path,
            errors,
        })
    }

    /// `list(filter?)` — sorted newest-first.
    pub fn list(&self, name_filter: Option<&str>) -> Result<Vec<BackupRecord>> {
        let index = self.load_index()?;
        let mut records: Vec<BackupRecord> = index
            .into_values()
            .filter(|r| {
                name_filter
                    .map(|f| r.backup_id.contains(f))
                    .unwrap_or(true)
            })
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    /// `cleanup(days_to_keep, keep_important)` — spec §4.F.1.
    pub fn cleanup(&self, days_to_keep: i64, keep_important: bool) -> Result<CleanupSummary> {
        let mut index = self.load_index()?;
        let cutoff = Utc::now() - chrono::Duration::days(days_to_keep);

        let stale: Vec<String> = index
            .iter()
            .filter(|(_, record)| {
                record.created_at < cutoff && !(keep_important && record.important_flag)
            })
            .map(|(id, _)| id.clone())
            .collect();

        let mut removed = 0;
        let mut bytes_reclaimed = 0;
        let mut errors = Vec::new();

        for backup_id in stale {
            if let Some(record) = index.remove(&backup_id) {
                match fs::remove_file(&record.backup_path) {
                    Ok(()) => {
                        removed += 1;
                        bytes_reclaimed += record.size;
                    }
                    Err(err) => errors.push(format!("failed to remove {backup_id}: {err}")),
                }
            }
        }

        self.save_index(&index)?;
        Ok(CleanupSummary {
            removed,
            bytes_reclaimed,
            errors,
        })
    }

    /// `mark_important(id, flag)` — spec §4.F.1.
    pub fn mark_important(&self, backup_id: &str, important: bool) -> Result<()> {
        let mut index = self.load_index()?;
        let Some(record) = index.get_mut(backup_id) else {
            return error::BackupMissingSnafu {
                backup_id: backup_id.to_string(),
            }
            .fail();
        };
        record.important_flag = important;
        self.save_index(&index)
    }
}

/// "Integrity check on a backup" — spec §4.F.1: exists, nonempty, starts with `%PDF-`.
fn validate_integrity(path: &Path) -> bool {
    let Ok(metadata) = fs::metadata(path) else {
        return false;
    };
    if metadata.len() == 0 {
        return false;
    }
    let Ok(bytes) = fs::read(path) else {
        return false;
    };
    bytes.len() >= PDF_HEADER.len() && &bytes[..PDF_HEADER.len()] == PDF_HEADER
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_pdf(path: &Path) {
        fs::write(path, b"%PDF-1.7\n%...").unwrap();
    }

    #[test]
    fn create_and_restore_round_trip() {
        let source_dir = tempdir().unwrap();
        let backup_dir = tempdir().unwrap();
        let source_path = source_dir.path().join("form.pdf");
        write_pdf(&source_path);

        let service = BackupService::new(backup_dir.path());
        let record = service.create(&source_path, "test").unwrap();
        assert!(record.backup_path.exists());

        fs::write(&source_path, b"corrupted").unwrap();
        let result = service.restore(&record.backup_id, Some(&source_path)).unwrap();
        assert!(result.success);
        assert_eq!(fs::read(&source_path).unwrap(), fs::read(&record.backup_path).unwrap());
    }

    #[test]
    fn restore_missing_backup_fails() {
        let backup_dir = tempdir().unwrap();
        let service = BackupService::new(backup_dir.path());
        let err = service.restore("nonexistent", None).unwrap_err();
        assert!(matches!(err, crate::error::CoreError::BackupMissing { .. }));
    }

    #[test]
    fn list_is_sorted_newest_first() {
        let source_dir = tempdir().unwrap();
        let backup_dir = tempdir().unwrap();
        let source_path = source_dir.path().join("form.pdf");
        write_pdf(&source_path);

        let service = BackupService::new(backup_dir.path());
        service.create(&source_path, "first").unwrap();
        service.create(&source_path, "second").unwrap();

        let records = service.list(None).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].created_at >= records[1].created_at);
    }

    #[test]
    fn integrity_check_rejects_non_pdf_bytes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("not_a_pdf.pdf");
        fs::write(&path, b"garbage").unwrap();
        assert!(!validate_integrity(&path));
    }
}
