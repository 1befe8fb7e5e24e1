//! Core entities shared across every pipeline stage (spec §3).

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::flags::{FieldFlags, FieldFlagsView, FieldKind};

/// One interactive field or widget, as extracted by component B.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormField {
    pub id: String,
    pub name: String,
    pub kind: FieldKind,
    /// 1-based page index; 1 when undetermined.
    pub page: u32,
    /// `[x1, y1, x2, y2]` in page coordinates.
    pub rect: [f64; 4],
    pub value: String,
    #[serde(skip)]
    pub flags: FieldFlags,
    pub options: Vec<String>,
    pub tooltip: Option<String>,
    pub mapping_name: Option<String>,
    pub max_length: Option<u32>,
    pub default_appearance: Option<String>,
    pub parent_id: Option<String>,
    pub children_ids: Vec<String>,
    pub is_group_container: bool,
}

impl FormField {
    pub fn flags_view(&self) -> FieldFlagsView {
        self.flags.into()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VisualGroup {
    Header,
    Upper,
    Middle,
    Lower,
    Footer,
}

/// Per-field derived metadata produced by component C.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldContext {
    pub field_id: String,
    pub label: Option<String>,
    pub section_header: Option<String>,
    pub nearby_text: Vec<String>,
    pub text_above: Option<String>,
    pub text_below: Option<String>,
    pub text_left: Option<String>,
    pub text_right: Option<String>,
    pub visual_group: VisualGroup,
    pub confidence: f64,
}

/// A view of a [`FormField`] inside the independent hierarchy graph (component D).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HierarchyNode {
    pub field_id: String,
    pub parent: Option<String>,
    pub children: Vec<String>,
    pub depth: u32,
    pub qualified_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModificationStatus {
    Planned,
    InProgress,
    Success,
    Failed,
    Skipped,
    RolledBack,
}

/// How/why a rename was chosen, passed through from the external naming
/// engine for reporting only — the core never interprets this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PreservationAction {
    Preserve,
    Improve,
    Restructure,
}

/// One planned rename (spec §3.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldModification {
    pub field_id: String,
    pub old_name: String,
    pub new_name: String,
    pub kind: FieldKind,
    pub page: u32,
    pub rect: [f64; 4],
    pub parent_id: Option<String>,
    pub children_ids: Vec<String>,
    pub status: ModificationStatus,
    pub reason: Option<String>,
    pub preservation_action: Option<PreservationAction>,
    pub error: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl FieldModification {
    pub fn planned(field: &FormField, new_name: String, reason: Option<String>) -> Self {
        FieldModification {
            field_id: field.id.clone(),
            old_name: field.name.clone(),
            new_name,
            kind: field.kind,
            page: field.page,
            rect: field.rect,
            parent_id: field.parent_id.clone(),
            children_ids: field.children_ids.clone(),
            status: ModificationStatus::Planned,
            reason,
            preservation_action: None,
            error: None,
            timestamp: None,
        }
    }

    pub fn mark_success(&mut self, now: DateTime<Utc>) {
        self.status = ModificationStatus::Success;
        self.timestamp = Some(now);
        self.error = None;
    }

    pub fn mark_failed(&mut self, message: String, now: DateTime<Utc>) {
        self.status = ModificationStatus::Failed;
        self.timestamp = Some(now);
        self.error = Some(message);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictSeverity {
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictKind {
    DuplicateTarget,
    ShapeViolation,
    HierarchyConflict,
    UnknownFieldId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanConflict {
    pub kind: ConflictKind,
    pub field_id: Option<String>,
    pub message: String,
    pub severity: ConflictSeverity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HierarchyUpdate {
    pub field_id: String,
    pub old_qualified_name: String,
    pub new_qualified_name: String,
}

/// Output of the planner (component E.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModificationPlan {
    pub modifications: Vec<FieldModification>,
    pub conflicts: Vec<PlanConflict>,
    pub hierarchy_updates: Vec<HierarchyUpdate>,
    pub safety_score: f64,
    pub created_at: DateTime<Utc>,
}

impl ModificationPlan {
    pub fn has_critical_conflicts(&self) -> bool {
        self.conflicts
            .iter()
            .any(|c| c.severity == ConflictSeverity::Critical)
    }
}

/// A snapshot of a PDF taken before mutation (component F.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupRecord {
    pub backup_id: String,
    pub original_path: PathBuf,
    pub backup_path: PathBuf,
    pub created_at: DateTime<Utc>,
    pub size: u64,
    pub notes: String,
    pub important_flag: bool,
    pub modification_count: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestoreResult {
    pub success: bool,
    pub restored_path: PathBuf,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IntegrityStatus {
    Critical,
    Poor,
    Acceptable,
    Good,
    Excellent,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StructureReport {
    pub valid: bool,
    pub pdf_version: Option<String>,
    pub page_count: Option<u32>,
    pub object_count: Option<u64>,
    pub has_interactive_form: bool,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FunctionalityReport {
    pub functional: bool,
    pub field_count_match: bool,
    pub missing_field_ids: Vec<String>,
    pub broken_field_ids: Vec<String>,
    pub preserved_properties: u32,
    pub total_properties_checked: u32,
    pub has_calculation_order: bool,
    pub has_default_resources: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessibilityReport {
    pub fields_without_name: u32,
    pub has_tab_order: bool,
    pub has_calculation_order: bool,
    pub fields_with_tooltip: u32,
    pub has_structure_tree: bool,
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VisualReport {
    pub layout_preserved: bool,
    pub coordinates_unchanged: bool,
    pub page_count_match: bool,
    pub visual_differences: Vec<String>,
    pub coordinate_variations: Vec<String>,
}

/// Result of the integrity validator (component F.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub overall_status: IntegrityStatus,
    pub safety_score: f64,
    pub structure: StructureReport,
    pub functionality: Option<FunctionalityReport>,
    pub accessibility: AccessibilityReport,
    pub visual: Option<VisualReport>,
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Result of one call to the executor (component E.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModificationResult {
    pub success: bool,
    pub applied_count: u32,
    pub failed_count: u32,
    pub skipped_count: u32,
    pub modifications: Vec<FieldModification>,
    pub validation_report: Option<IntegrityReport>,
    pub backup_record: Option<BackupRecord>,
    pub processing_time_seconds: f64,
    pub errors: Vec<String>,
    pub output_path: Option<PathBuf>,
}
