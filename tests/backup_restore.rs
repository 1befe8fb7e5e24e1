use std::fs;

use pdf_field_forge::backup::BackupService;
use pdf_field_forge::error::CoreError;

fn write_pdf(path: &std::path::Path) {
    fs::write(path, b"%PDF-1.7\n%fixture").unwrap();
}

#[test]
fn backup_then_restore_recovers_original_bytes() {
    let source_dir = tempfile::tempdir().unwrap();
    let backup_dir = tempfile::tempdir().unwrap();
    let source_path = source_dir.path().join("intake.pdf");
    write_pdf(&source_path);
    let original_bytes = fs::read(&source_path).unwrap();

    let service = BackupService::new(backup_dir.path());
    let record = service.create(&source_path, "before rename pass").unwrap();

    fs::write(&source_path, b"%PDF-1.7\ncorrupted by a failed write").unwrap();
    assert_ne!(fs::read(&source_path).unwrap(), original_bytes);

    let result = service.restore(&record.backup_id, Some(&source_path)).unwrap();
    assert!(result.success);
    assert_eq!(fs::read(&source_path).unwrap(), original_bytes);
}

#[test]
fn restoring_an_unknown_backup_id_fails_cleanly() {
    let backup_dir = tempfile::tempdir().unwrap();
    let service = BackupService::new(backup_dir.path());
    let err = service.restore("does-not-exist", None).unwrap_err();
    assert!(matches!(err, CoreError::BackupMissing { .. }));
}

#[test]
fn backing_up_a_missing_source_fails_cleanly() {
    let backup_dir = tempfile::tempdir().unwrap();
    let service = BackupService::new(backup_dir.path());
    let err = service
        .create(std::path::Path::new("/nonexistent/form.pdf"), "snapshot")
        .unwrap_err();
    assert!(matches!(err, CoreError::BackupSourceMissing { .. }));
}

#[test]
fn cleanup_keeps_important_backups_past_the_cutoff() {
    let source_dir = tempfile::tempdir().unwrap();
    let backup_dir = tempfile::tempdir().unwrap();
    let source_path = source_dir.path().join("intake.pdf");
    write_pdf(&source_path);

    let service = BackupService::new(backup_dir.path());
    let record = service.create(&source_path, "keep me").unwrap();
    service.mark_important(&record.backup_id, true).unwrap();

    // A zero-day cutoff would normally sweep every backup; `keep_important`
    // should spare this one regardless of age.
    let summary = service.cleanup(0, true).unwrap();
    assert_eq!(summary.removed, 0);
    assert!(service
        .list(None)
        .unwrap()
        .iter()
        .any(|r| r.backup_id == record.backup_id));
}
