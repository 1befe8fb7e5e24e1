//! JSON and CSV report writers (spec §6.1, §6.2).
//!
//! JSON reports are a direct `serde_json` dump of the pipeline's result
//! types; the two CSV exports project [`FormField`]/[`FieldModification`]
//! onto the fixed column sets an external database importer expects.
//! Grounded on `original_source/.../report_generator.py`'s column lists,
//! reimplemented with the `csv` crate the way the pack's CLI-adjacent repos
//! write tabular output.

use std::path::{Path, PathBuf};

use snafu::ResultExt;

use crate::error::{self, Result};
use crate::flags::FieldKind;
use crate::model::{FieldModification, FormField, IntegrityReport, ModificationResult};

fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "document".to_string())
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    parent.join(format!("{}{suffix}", stem(path)))
}

/// Write `<stem>_modification_report.json`.
pub fn write_modification_report(source_path: &Path, result: &ModificationResult) -> Result<PathBuf> {
    let path = sibling(source_path, "_modification_report.json");
    let contents = serde_json::to_string_pretty(result).context(error::ReportWriteSnafu)?;
    std::fs::write(&path, contents)?;
    Ok(path)
}

/// Write `<stem>_validation_report.json`.
pub fn write_validation_report(source_path: &Path, report: &IntegrityReport) -> Result<PathBuf> {
    let path = sibling(source_path, "_validation_report.json");
    let contents = serde_json::to_string_pretty(report).context(error::ReportWriteSnafu)?;
    std::fs::write(&path, contents)?;
    Ok(path)
}

/// Write `<stem>_modification_summary.csv` — spec §6.2.
pub fn write_modification_summary(source_path: &Path, modifications: &[FieldModification]) -> Result<PathBuf> {
    let path = sibling(source_path, "_modification_summary.csv");
    let mut writer = csv::Writer::from_path(&path).context(error::CsvWriteSnafu)?;

    writer
        .write_record([
            "field_id",
            "original_name",
            "new_name",
            "field_type",
            "page",
            "modification_status",
            "preservation_action",
            "confidence",
            "reasoning",
        ])
        .context(error::CsvWriteSnafu)?;

    for modification in modifications {
        writer
            .write_record([
                modification.field_id.clone(),
                modification.old_name.clone(),
                modification.new_name.clone(),
                modification.kind.database_type().to_string(),
                modification.page.to_string(),
                format!("{:?}", modification.status),
                modification
                    .preservation_action
                    .map(|a| format!("{a:?}"))
                    .unwrap_or_default(),
                String::new(),
                modification.reason.clone().unwrap_or_default(),
            ])
            .context(error::CsvWriteSnafu)?;
    }

    writer.flush()?;
    Ok(path)
}

/// Write `<stem>_database_ready.csv` — spec §6.2. The `Parent ID` column is
/// the 1-based row position of the parent field in `fields`, not its
/// [`FormField::id`] string, so a downstream importer without access to the
/// original ids can still reconstruct the hierarchy from row order.
pub fn write_database_ready(source_path: &Path, fields: &[FormField]) -> Result<PathBuf> {
    let path = sibling(source_path, "_database_ready.csv");
    let mut writer = csv::Writer::from_path(&path).context(error::CsvWriteSnafu)?;

    writer
        .write_record([
            "ID",
            "Created at",
            "Updated at",
            "Label",
            "Description",
            "Form ID",
            "Order",
            "Api name",
            "UUID",
            "Type",
            "Parent ID",
            "Delete Parent ID",
            "Acrofieldlabel",
            "Section ID",
            "Excluded",
            "Partial label",
            "Custom",
            "Show group label",
            "Height",
            "Page",
            "Width",
            "X",
            "Y",
            "Unified field ID",
            "Delete",
            "Hidden",
            "Toggle description",
        ])
        .context(error::CsvWriteSnafu)?;

    let row_position: std::collections::HashMap<&str, usize> = fields
        .iter()
        .enumerate()
        .map(|(i, f)| (f.id.as_str(), i + 1))
        .collect();

    for (order, field) in fields.iter().enumerate() {
        let parent_row = field
            .parent_id
            .as_deref()
            .and_then(|id| row_position.get(id))
            .map(|row| row.to_string())
            .unwrap_or_default();
        let width = field.rect[2] - field.rect[0];
        let height = field.rect[3] - field.rect[1];

        writer
            .write_record([
                (order + 1).to_string(),
                String::new(),
                String::new(),
                field.name.clone(),
                field.tooltip.clone().unwrap_or_default(),
                String::new(),
                order.to_string(),
                field.name.clone(),
                field.id.clone(),
                kind_database_type(field.kind).to_string(),
                parent_row,
                String::new(),
                field.name.clone(),
                String::new(),
                "false".to_string(),
                "false".to_string(),
                "false".to_string(),
                "false".to_string(),
                height.to_string(),
                field.page.to_string(),
                width.to_string(),
                field.rect[0].to_string(),
                field.rect[1].to_string(),
                field.id.clone(),
                "false".to_string(),
                field.flags_view().readonly.to_string(),
                String::new(),
            ])
            .context(error::CsvWriteSnafu)?;
    }

    writer.flush()?;
    Ok(path)
}

fn kind_database_type(kind: FieldKind) -> &'static str {
    kind.database_type()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::FieldFlags;
    use tempfile::tempdir;

    fn field(id: &str, parent_id: Option<&str>) -> FormField {
        FormField {
            id: id.to_string(),
            name: id.to_string(),
            kind: FieldKind::Text,
            page: 1,
            rect: [0.0, 0.0, 100.0, 20.0],
            value: String::new(),
            flags: FieldFlags::empty(),
            options: Vec::new(),
            tooltip: None,
            mapping_name: None,
            max_length: None,
            default_appearance: None,
            parent_id: parent_id.map(str::to_string),
            children_ids: Vec::new(),
            is_group_container: false,
        }
    }

    #[test]
    fn database_ready_resolves_parent_to_row_position() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("intake.pdf");
        std::fs::write(&source, b"%PDF-1.7").unwrap();

        let fields = vec![field("parent", None), field("child", Some("parent"))];
        let path = write_database_ready(&source, &fields).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        lines.next();
        lines.next();
        let child_row = lines.next().unwrap();
        assert!(child_row.contains(",1,"));
    }

    #[test]
    fn modification_summary_has_expected_header() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("intake.pdf");
        std::fs::write(&source, b"%PDF-1.7").unwrap();

        let path = write_modification_summary(&source, &[]).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("field_id,original_name,new_name"));
    }
}
