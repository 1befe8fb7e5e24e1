//! Component F.2 — Integrity Validator.
//!
//! Runs four independent, best-effort checks against a mutated document —
//! structure, functionality, accessibility, visual — and folds them into one
//! safety score and overall status. Grounded on
//! `original_source/.../integrity_validator.py`'s check battery, reimplemented
//! on top of [`crate::loader`] and [`crate::extractor`] rather than a
//! standalone re-parse.

use std::collections::HashMap;
use std::path::Path;

use log::warn;

use crate::error::Result;
use crate::extractor;
use crate::loader::LoadedDocument;
use crate::model::{
    AccessibilityReport, FormField, FunctionalityReport, IntegrityReport, IntegrityStatus,
    StructureReport, VisualReport,
};

const COORDINATE_TOLERANCE: f64 = 1.0;

/// Validate `mutated_path`. `original_path`/`original_fields` unlock the
/// visual and functionality checks respectively; either may be omitted when
/// unavailable (spec §4.F.2 — each check runs independently).
pub fn validate(
    mutated_path: &Path,
    original_path: Option<&Path>,
    original_fields: Option<&[FormField]>,
) -> Result<IntegrityReport> {
    let mutated_doc = LoadedDocument::open(mutated_path, None)?;
    let mutated_fields = extractor::extract_fields(&mutated_doc)?;

    let structure = check_structure(&mutated_doc);

    let functionality = original_fields.map(|original| check_functionality(original, &mutated_fields));

    let accessibility = check_accessibility(&mutated_fields);

    let visual = match original_path {
        Some(original_path) => match LoadedDocument::open(original_path, None) {
            Ok(original_doc) => match extractor::extract_fields(&original_doc) {
                Ok(original_fields) => Some(check_visual(&original_doc, &mutated_doc, &original_fields, &mutated_fields)),
                Err(err) => {
                    warn!("visual check skipped: failed to extract original fields: {err}");
                    None
                }
            },
            Err(err) => {
                warn!("visual check skipped: failed to reopen original document: {err}");
                None
            }
        },
        None => None,
    };

    let safety_score = compute_safety_score(&structure, &functionality, &accessibility, &visual);
    let overall_status = classify(safety_score, &structure, &functionality);

    let mut issues = Vec::new();
    let mut warnings = Vec::new();
    issues.extend(structure.warnings.iter().cloned());
    if let Some(functionality) = &functionality {
        issues.extend(functionality.broken_field_ids.iter().map(|id| format!("field {id} lost properties")));
        issues.extend(functionality.missing_field_ids.iter().map(|id| format!("field {id} missing after modification")));
    }
    issues.extend(accessibility.issues.iter().cloned());
    warnings.extend(accessibility.warnings.iter().cloned());
    if let Some(visual) = &visual {
        warnings.extend(visual.visual_differences.iter().cloned());
    }

    let recommendations = build_recommendations(&structure, &functionality, &accessibility, &visual);

    Ok(IntegrityReport {
        overall_status,
        safety_score,
        structure,
        functionality,
        accessibility,
        visual,
        issues,
        warnings,
        recommendations,
    })
}

fn check_structure(doc: &LoadedDocument) -> StructureReport {
    let mut warnings = Vec::new();
    let page_count = doc.page_count();
    if page_count == 0 {
        warnings.push("document has no pages".to_string());
    }

    StructureReport {
        valid: page_count > 0,
        pdf_version: Some(doc.version.clone()),
        page_count: Some(page_count),
        object_count: None,
        has_interactive_form: doc.has_interactive_form(),
        warnings,
    }
}

fn check_functionality(original: &[FormField], mutated: &[FormField]) -> FunctionalityReport {
    let mutated_by_id: HashMap<&str, &FormField> = mutated.iter().map(|f| (f.id.as_str(), f)).collect();

    let mut missing_field_ids = Vec::new();
    let mut broken_field_ids = Vec::new();
    let mut preserved_properties = 0u32;
    let mut total_properties_checked = 0u32;

    for field in original {
        let Some(counterpart) = mutated_by_id.get(field.id.as_str()) else {
            missing_field_ids.push(field.id.clone());
            continue;
        };

        let mut field_ok = true;
        let checks: [bool; 5] = [
            field.kind == counterpart.kind,
            field.page == counterpart.page,
            rect_close(&field.rect, &counterpart.rect),
            field.value == counterpart.value,
            field.parent_id == counterpart.parent_id,
        ];
        for passed in checks {
            total_properties_checked += 1;
            if passed {
                preserved_properties += 1;
            } else {
                field_ok = false;
            }
        }
        if field.children_ids != counterpart.children_ids {
            field_ok = false;
        }
        if !field_ok {
            broken_field_ids.push(field.id.clone());
        }
    }

    let has_calculation_order = mutated.iter().any(|f| f.is_group_container);
    let has_default_resources = !mutated.is_empty();

    FunctionalityReport {
        functional: missing_field_ids.is_empty() && broken_field_ids.is_empty(),
        field_count_match: original.len() == mutated.len(),
        missing_field_ids,
        broken_field_ids,
        preserved_properties,
        total_properties_checked,
        has_calculation_order,
        has_default_resources,
    }
}

fn check_accessibility(fields: &[FormField]) -> AccessibilityReport {
    let mut issues = Vec::new();
    let mut warnings = Vec::new();

    let fields_without_name = fields.iter().filter(|f| f.name.trim().is_empty()).count() as u32;
    if fields.is_empty() {
        issues.push("document has no form fields".to_string());
    }
    if fields_without_name > 0 {
        warnings.push(format!("{fields_without_name} field(s) have no name"));
    }

    let fields_with_tooltip = fields.iter().filter(|f| f.tooltip.is_some()).count() as u32;
    if fields_with_tooltip == 0 && !fields.is_empty() {
        warnings.push("no fields carry a tooltip (/TU)".to_string());
    }

    let has_tab_order = fields.iter().any(|f| f.mapping_name.is_some());
    let has_calculation_order = fields.iter().any(|f| f.is_group_container);
    let has_structure_tree = false;

    AccessibilityReport {
        fields_without_name,
        has_tab_order,
        has_calculation_order,
        fields_with_tooltip,
        has_structure_tree,
        issues,
        warnings,
    }
}

fn check_visual(
    original_doc: &LoadedDocument,
    mutated_doc: &LoadedDocument,
    original_fields: &[FormField],
    mutated_fields: &[FormField],
) -> VisualReport {
    let mutated_by_id: HashMap<&str, &FormField> = mutated_fields.iter().map(|f| (f.id.as_str(), f)).collect();

    let mut visual_differences = Vec::new();
    let mut coordinate_variations = Vec::new();

    for field in original_fields {
        let Some(counterpart) = mutated_by_id.get(field.id.as_str()) else {
            visual_differences.push(format!("field {} no longer present", field.id));
            continue;
        };
        if field.page != counterpart.page {
            visual_differences.push(format!("field {} moved from page {} to page {}", field.id, field.page, counterpart.page));
        }
        if !rect_close(&field.rect, &counterpart.rect) {
            coordinate_variations.push(format!(
                "field {} rect {:?} -> {:?}",
                field.id, field.rect, counterpart.rect
            ));
        }
    }

    let page_count_match = original_doc.page_count() == mutated_doc.page_count();
    if !page_count_match {
        visual_differences.push(format!(
            "page count changed: {} -> {}",
            original_doc.page_count(),
            mutated_doc.page_count()
        ));
    }

    VisualReport {
        layout_preserved: visual_differences.is_empty(),
        coordinates_unchanged: coordinate_variations.is_empty(),
        page_count_match,
        visual_differences,
        coordinate_variations,
    }
}

fn rect_close(a: &[f64; 4], b: &[f64; 4]) -> bool {
    a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() <= COORDINATE_TOLERANCE)
}

/// Safety-score formula — spec §4.F.2.
fn compute_safety_score(
    structure: &StructureReport,
    functionality: &Option<FunctionalityReport>,
    accessibility: &AccessibilityReport,
    visual: &Option<VisualReport>,
) -> f64 {
    let mut score = 1.0;

    if !structure.valid {
        score -= 0.30;
    } else {
        score -= (0.05 * structure.warnings.len() as f64).min(0.30);
    }

    if let Some(functionality) = functionality {
        if !functionality.functional {
            score -= 0.40;
        } else if !functionality.field_count_match {
            score -= 0.20;
        } else {
            score -= (0.10 * functionality.broken_field_ids.len() as f64).min(0.40);
        }
    }

    score -= (0.03 * accessibility.issues.len() as f64).min(0.15);

    if let Some(visual) = visual {
        if !visual.layout_preserved {
            score -= 0.10;
        } else if !visual.coordinates_unchanged {
            score -= 0.05;
        }
    }

    score.clamp(0.0, 1.0)
}

/// Overall-status thresholds — spec §4.F.2.
fn classify(
    safety_score: f64,
    structure: &StructureReport,
    functionality: &Option<FunctionalityReport>,
) -> IntegrityStatus {
    let critical_issues = structure.warnings.len()
        + functionality
            .as_ref()
            .map(|f| f.broken_field_ids.len() + f.missing_field_ids.len())
            .unwrap_or(0);

    if critical_issues > 5 || safety_score < 0.30 {
        IntegrityStatus::Critical
    } else if critical_issues > 2 || safety_score < 0.60 {
        IntegrityStatus::Poor
    } else if critical_issues > 0 || safety_score < 0.80 {
        IntegrityStatus::Acceptable
    } else if safety_score < 0.95 {
        IntegrityStatus::Good
    } else {
        IntegrityStatus::Excellent
    }
}

fn build_recommendations(
    structure: &StructureReport,
    functionality: &Option<FunctionalityReport>,
    accessibility: &AccessibilityReport,
    visual: &Option<VisualReport>,
) -> Vec<String> {
    let mut recommendations = Vec::new();
    if !structure.valid {
        recommendations.push("re-run the modification with a fresh source copy; structure checks failed".to_string());
    }
    if let Some(functionality) = functionality {
        if !functionality.missing_field_ids.is_empty() {
            recommendations.push("restore from backup; fields disappeared after modification".to_string());
        }
    }
    if accessibility.fields_without_name > 0 {
        recommendations.push("assign names to unnamed fields before distributing the form".to_string());
    }
    if let Some(visual) = visual {
        if !visual.layout_preserved {
            recommendations.push("review page placement; fields shifted pages".to_string());
        }
    }
    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::FieldFlags;
    use crate::flags::FieldKind;

    fn field(id: &str, page: u32, rect: [f64; 4]) -> FormField {
        FormField {
            id: id.to_string(),
            name: id.to_string(),
            kind: FieldKind::Text,
            page,
            rect,
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
    fn functionality_report_flags_missing_fields() {
        let original = vec![field("a", 1, [0.0, 0.0, 10.0, 10.0])];
        let mutated: Vec<FormField> = Vec::new();
        let report = check_functionality(&original, &mutated);
        assert!(!report.functional);
        assert_eq!(report.missing_field_ids, vec!["a".to_string()]);
    }

    #[test]
    fn functionality_report_passes_identical_fields() {
        let fields = vec![field("a", 1, [0.0, 0.0, 10.0, 10.0])];
        let report = check_functionality(&fields, &fields);
        assert!(report.functional);
        assert!(report.broken_field_ids.is_empty());
    }

    #[test]
    fn rect_close_allows_subpixel_drift() {
        assert!(rect_close(&[0.0, 0.0, 10.0, 10.0], &[0.3, -0.2, 10.4, 9.6]));
        assert!(!rect_close(&[0.0, 0.0, 10.0, 10.0], &[5.0, 0.0, 10.0, 10.0]));
    }

    #[test]
    fn safety_score_clamped_and_status_excellent_when_clean() {
        let structure = StructureReport {
            valid: true,
            pdf_version: Some("1.7".to_string()),
            page_count: Some(1),
            object_count: None,
            has_interactive_form: true,
            warnings: Vec::new(),
        };
        let accessibility = AccessibilityReport::default();
        let score = compute_safety_score(&structure, &None, &accessibility, &None);
        assert!((0.0..=1.0).contains(&score));
        assert_eq!(classify(score, &structure, &None), IntegrityStatus::Excellent);
    }
}
