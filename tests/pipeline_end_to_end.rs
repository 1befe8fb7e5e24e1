//! Drives the real pipeline against an actual PDF object graph instead of
//! exercising each stage's internals in isolation: a minimal single-field
//! AcroForm document is built byte-for-byte (every cross-reference offset
//! computed from the buffer as it's written, never hand-counted), then
//! loaded, extracted, planned, and applied through the public API exactly as
//! an external caller would.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use pdf_field_forge::PipelineConfig;

/// Appends one `N 0 obj ... endobj` block, recording its start offset.
fn push_obj(buf: &mut Vec<u8>, offsets: &mut Vec<usize>, body: &str) {
    let n = offsets.len() + 1;
    offsets.push(buf.len());
    buf.extend_from_slice(format!("{n} 0 obj\n{body}\nendobj\n").as_bytes());
}

/// A minimal, valid single-page AcroForm PDF with one merged widget/field
/// dictionary: Catalog -> Pages -> Page -> Widget, plus the AcroForm's
/// `/Fields` array pointing at the same widget. Every xref entry's offset is
/// the real byte position the object ended up at, not a precomputed
/// constant, so a change to any object body above can't desync the table.
fn minimal_form_pdf(field_name: &str, field_value: &str) -> Vec<u8> {
    let mut buf: Vec<u8> = Vec::new();
    buf.extend_from_slice(b"%PDF-1.7\n");
    let mut offsets: Vec<usize> = Vec::new();

    push_obj(&mut buf, &mut offsets, "<< /Type /Catalog /Pages 2 0 R /AcroForm 5 0 R >>");
    push_obj(&mut buf, &mut offsets, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>");
    push_obj(
        &mut buf,
        &mut offsets,
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Annots [4 0 R] /Resources << >> >>",
    );
    push_obj(
        &mut buf,
        &mut offsets,
        &format!(
            "<< /Type /Annot /Subtype /Widget /FT /Tx /T ({field_name}) /V ({field_value}) \
             /Rect [100 700 300 720] /P 3 0 R /F 4 >>"
        ),
    );
    push_obj(&mut buf, &mut offsets, "<< /Fields [4 0 R] >>");

    let xref_offset = buf.len();
    let count = offsets.len() + 1; // +1 for the free object 0 entry
    buf.extend_from_slice(format!("xref\n0 {count}\n").as_bytes());
    buf.extend_from_slice(b"0000000000 65535 f\r\n");
    for offset in &offsets {
        buf.extend_from_slice(format!("{offset:010} 00000 n\r\n").as_bytes());
    }
    buf.extend_from_slice(
        format!("trailer\n<< /Size {count} /Root 1 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n").as_bytes(),
    );

    buf
}

fn write_fixture(dir: &Path, name: &str, field_name: &str, field_value: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, minimal_form_pdf(field_name, field_value)).unwrap();
    path
}

fn config_in(dir: &Path) -> PipelineConfig {
    PipelineConfig {
        backup_dir: dir.join("backups"),
        write_reports: false,
        ..PipelineConfig::default()
    }
}

#[test]
fn analyze_extracts_the_one_field_from_a_real_pdf() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(dir.path(), "intake.pdf", "first_name", "Jane");

    let analysis = pdf_field_forge::analyze(&path, &config_in(dir.path())).unwrap();

    assert_eq!(analysis.fields.len(), 1);
    assert_eq!(analysis.fields[0].name, "first_name");
    assert_eq!(analysis.fields[0].value, "Jane");
    assert_eq!(analysis.context.len(), 1);
}

#[test]
fn modify_renames_the_field_and_writes_output() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(dir.path(), "intake.pdf", "first_name", "Jane");
    let config = config_in(dir.path());

    let analysis = pdf_field_forge::analyze(&path, &config).unwrap();
    let field_id = analysis.fields[0].id.clone();

    let mut mapping = HashMap::new();
    mapping.insert(field_id, "applicant_first_name".to_string());
    let modification_plan = pdf_field_forge::plan(&analysis.fields, &mapping);
    assert_eq!(modification_plan.modifications.len(), 1);

    let result = pdf_field_forge::modify(&path, modification_plan, &config).unwrap();

    assert!(result.success);
    assert_eq!(result.applied_count, 1);
    assert_eq!(result.failed_count, 0);
    let output_path = result.output_path.expect("a rename was applied, so output must exist");
    assert!(output_path.exists());

    let reopened = pdf_field_forge::analyze(&output_path, &config).unwrap();
    assert_eq!(reopened.fields[0].name, "applicant_first_name");

    // The source file itself is untouched — only `<stem>.modified.pdf` changed.
    let source_reopened = pdf_field_forge::analyze(&path, &config).unwrap();
    assert_eq!(source_reopened.fields[0].name, "first_name");
}

#[test]
fn modify_with_no_matching_mapping_applies_nothing_and_still_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(dir.path(), "intake.pdf", "first_name", "Jane");
    let config = config_in(dir.path());

    let analysis = pdf_field_forge::analyze(&path, &config).unwrap();
    let mapping = HashMap::new();
    let modification_plan = pdf_field_forge::plan(&analysis.fields, &mapping);
    assert!(modification_plan.modifications.is_empty());

    let result = pdf_field_forge::modify(&path, modification_plan, &config).unwrap();

    assert!(result.success);
    assert_eq!(result.applied_count, 0);
    assert!(result.output_path.is_none());
}

#[test]
fn run_pipeline_drives_analyze_plan_and_modify_in_one_call() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(dir.path(), "intake.pdf", "first_name", "Jane");
    let config = config_in(dir.path());

    let analysis = pdf_field_forge::analyze(&path, &config).unwrap();
    let field_id = analysis.fields[0].id.clone();
    let mut mapping = HashMap::new();
    mapping.insert(field_id, "applicant_first_name".to_string());

    let result = pdf_field_forge::run_pipeline(&path, &mapping, &config).unwrap();

    assert_eq!(result.applied_count, 1);
    let output_path = result.output_path.unwrap();
    let reopened = pdf_field_forge::analyze(&output_path, &config).unwrap();
    assert_eq!(reopened.fields[0].name, "applicant_first_name");
}
