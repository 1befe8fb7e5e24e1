use std::collections::HashMap;

use pdf_field_forge::flags::{FieldFlags, FieldKind};
use pdf_field_forge::model::FormField;
use pdf_field_forge::planner;

fn field(id: &str, name: &str, kind: FieldKind) -> FormField {
    FormField {
        id: id.to_string(),
        name: name.to_string(),
        kind,
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
fn clean_rename_plan_has_high_safety_score_and_no_conflicts() {
    let fields = vec![field("a", "MbrName", FieldKind::Text)];
    let mut mapping = HashMap::new();
    mapping.insert("a".to_string(), "member-name".to_string());

    let plan = planner::plan(&fields, &mapping);
    assert!(plan.conflicts.is_empty());
    assert!(!plan.has_critical_conflicts());
    assert!(plan.safety_score > 0.9);
    assert_eq!(plan.modifications.len(), 1);
}

#[test]
fn renaming_a_signature_field_lowers_the_safety_score() {
    let text_fields = vec![field("a", "Name", FieldKind::Text)];
    let mut text_mapping = HashMap::new();
    text_mapping.insert("a".to_string(), "legal-name".to_string());
    let text_plan = planner::plan(&text_fields, &text_mapping);

    let signature_fields = vec![field("s", "Sig", FieldKind::Signature)];
    let mut signature_mapping = HashMap::new();
    signature_mapping.insert("s".to_string(), "signature".to_string());
    let signature_plan = planner::plan(&signature_fields, &signature_mapping);

    assert!(signature_plan.safety_score < text_plan.safety_score);
}

#[test]
fn invalid_shape_and_duplicate_targets_are_both_critical() {
    let fields = vec![
        field("a", "Name", FieldKind::Text),
        field("b", "Email", FieldKind::Text),
    ];
    let mut mapping = HashMap::new();
    mapping.insert("a".to_string(), "Not A Valid Name".to_string());
    mapping.insert("b".to_string(), "Not A Valid Name".to_string());

    let plan = planner::plan(&fields, &mapping);
    assert!(plan.has_critical_conflicts());
    assert!(plan.conflicts.len() >= 2);
}
