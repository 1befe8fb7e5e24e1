//! Component E.1 — Modification Planner.
//!
//! Turns a `FieldId → NewName` mapping from an external naming engine into a
//! [`ModificationPlan`]: one [`FieldModification`] per mapping entry, a
//! conflict list, hierarchy-update descriptions, and a safety score (spec
//! §4.E.1). Grounded on `acroform-rs-old/acroform/src/api.rs`'s
//! `AcroFormDocument::fill`, generalized from "apply a value map" to "apply
//! and score a rename map".

use std::collections::HashMap;

use chrono::Utc;
use log::warn;

use crate::flags::FieldKind;
use crate::hierarchy::HierarchyTree;
use crate::model::{
    ConflictKind, ConflictSeverity, FieldModification, FormField, HierarchyUpdate, ModificationPlan,
    PlanConflict,
};
use crate::naming;

/// Build a [`ModificationPlan`] from a proposed rename mapping.
pub fn plan(fields: &[FormField], mapping: &HashMap<String, String>) -> ModificationPlan {
    let fields_by_id: HashMap<&str, &FormField> = fields.iter().map(|f| (f.id.as_str(), f)).collect();

    let mut modifications = Vec::new();
    let mut conflicts = Vec::new();
    let mut hierarchy_updates = Vec::new();

    for (field_id, new_name) in mapping {
        let Some(field) = fields_by_id.get(field_id.as_str()) else {
            warn!("planner: unknown field id {field_id} in mapping, skipped");
            continue;
        };
        modifications.push(FieldModification::planned(field, new_name.clone(), None));
        if field.parent_id.is_some() || !field.children_ids.is_empty() {
            hierarchy_updates.push(HierarchyUpdate {
                field_id: field.id.clone(),
                old_qualified_name: field.name.clone(),
                new_qualified_name: new_name.clone(),
            });
        }
    }

    conflicts.extend(detect_duplicate_targets(mapping));
    conflicts.extend(detect_shape_violations(mapping));

    let tree = HierarchyTree::build(fields);
    let hierarchy_conflicts = tree.propose(mapping);
    conflicts.extend(hierarchy_conflicts.into_iter().map(|c| PlanConflict {
        kind: ConflictKind::HierarchyConflict,
        field_id: c.field_id,
        message: c.message,
        severity: match c.severity {
            crate::hierarchy::Severity::Warning => ConflictSeverity::Warning,
            crate::hierarchy::Severity::Critical => ConflictSeverity::Critical,
        },
    }));

    let safety_score = compute_safety_score(&modifications, &conflicts, &fields_by_id);

    ModificationPlan {
        modifications,
        conflicts,
        hierarchy_updates,
        safety_score,
        created_at: Utc::now(),
    }
}

fn detect_duplicate_targets(mapping: &HashMap<String, String>) -> Vec<PlanConflict> {
    let mut seen: HashMap<&str, &str> = HashMap::new();
    let mut conflicts = Vec::new();
    for (field_id, new_name) in mapping {
        if let Some(existing) = seen.insert(new_name.as_str(), field_id.as_str()) {
            conflicts.push(PlanConflict {
                kind: ConflictKind::DuplicateTarget,
                field_id: Some(field_id.clone()),
                message: format!("target name '{new_name}' duplicated between {existing} and {field_id}"),
                severity: ConflictSeverity::Critical,
            });
        }
    }
    conflicts
}

fn detect_shape_violations(mapping: &HashMap<String, String>) -> Vec<PlanConflict> {
    mapping
        .iter()
        .filter(|(_, new_name)| !naming::is_valid_name_shape(new_name))
        .map(|(field_id, new_name)| PlanConflict {
            kind: ConflictKind::ShapeViolation,
            field_id: Some(field_id.clone()),
            message: format!("'{new_name}' does not match the block[_element][__modifier] shape"),
            severity: ConflictSeverity::Critical,
        })
        .collect()
}

fn compute_safety_score(
    modifications: &[FieldModification],
    conflicts: &[PlanConflict],
    fields_by_id: &HashMap<&str, &FormField>,
) -> f64 {
    let mut score = 1.0;
    score -= 0.1 * conflicts.len() as f64;
    score -= 0.05
        * modifications
            .iter()
            .filter(|m| matches!(m.kind, FieldKind::Signature | FieldKind::Pushbutton))
            .count() as f64;
    score -= 0.02
        * modifications
            .iter()
            .filter(|m| {
                fields_by_id
                    .get(m.field_id.as_str())
                    .map(|f| f.parent_id.is_some() || !f.children_ids.is_empty())
                    .unwrap_or(false)
            })
            .count() as f64;
    score.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::FieldFlags;

    fn text_field(id: &str, name: &str) -> FormField {
        FormField {
            id: id.to_string(),
            name: name.to_string(),
            kind: FieldKind::Text,
            page: 1,
            rect: [0.0; 4],
            value: String::new(),
            flags: FieldFlags::empty(),
            options: Vec::new(),
            tooltip: None,
            mapping_name: None,
            max_length: None,
            default_appearance: None,
            parent_id: None,
            children_ids: Vec::new(),
            is_group_container: false,
        }
    }

    #[test]
    fn safety_score_is_clamped() {
        let fields = vec![text_field("a", "A")];
        let mut mapping = HashMap::new();
        mapping.insert("a".to_string(), "Invalid Name".to_string());
        let result = plan(&fields, &mapping);
        assert!((0.0..=1.0).contains(&result.safety_score));
        assert!(result.has_critical_conflicts());
    }

    #[test]
    fn duplicate_targets_are_flagged() {
        let fields = vec![text_field("a", "A"), text_field("b", "B")];
        let mut mapping = HashMap::new();
        mapping.insert("a".to_string(), "owner-name".to_string());
        mapping.insert("b".to_string(), "owner-name".to_string());
        let result = plan(&fields, &mapping);
        assert!(result
            .conflicts
            .iter()
            .any(|c| c.kind == ConflictKind::DuplicateTarget));
    }

    #[test]
    fn unknown_field_id_is_skipped_not_fatal() {
        let fields = vec![text_field("a", "A")];
        let mut mapping = HashMap::new();
        mapping.insert("ghost".to_string(), "owner-name".to_string());
        let result = plan(&fields, &mapping);
        assert!(result.modifications.is_empty());
    }

    #[test]
    fn valid_mapping_has_no_conflicts() {
        let fields = vec![text_field("a", "A")];
        let mut mapping = HashMap::new();
        mapping.insert("a".to_string(), "owner-name".to_string());
        let result = plan(&fields, &mapping);
        assert!(result.conflicts.is_empty());
        assert!(result.safety_score >= 0.95);
    }
}
