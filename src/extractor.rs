//! Component B — Field Extractor.
//!
//! Walks the interactive-form dictionary's `/Fields` array, descending
//! through `/Kids` to materialize a flat, ordered list of [`FormField`]
//! records, resolving radio-group parent/child naming and page placement
//! along the way. Generalizes the traversal traits in the teacher crate
//! (`FieldDictionaryExt::traverse_field_refs`,
//! `InteractiveFormDictionaryExt::all_fields`) from "flatten for filling" to
//! "build a typed tree with stable ids" per spec §4.B.
//!
//! Everything below this boundary talks to the `pdf` crate's object graph
//! directly; every stage above it (context, hierarchy, planner, executor)
//! operates purely on [`FormField`]/[`crate::model`] types.

use std::collections::{HashMap, HashSet};

use log::{debug, info, warn};
use pdf::object::{PlainRef, Resolve};
use pdf::primitive::{Dictionary, Primitive};

use crate::error::Result;
use crate::flags::{FieldFlags, FieldKind};
use crate::loader::LoadedDocument;
use crate::model::FormField;
use crate::pdfdict::{dict_integer, dict_references, dict_rect, dict_string, resolve_dict, resolve_entry};

const LARGE_FORM_THRESHOLD: usize = 1000;
const FF_RADIO: i32 = 1 << 15;
const FF_PUSHBUTTON: i32 = 1 << 16;
const FF_COMBO: i32 = 1 << 17;

/// Extract every form field from the document's interactive-form dictionary,
/// using the default large-form logging threshold.
///
/// Returns an empty list (not an error) when the catalog, the AcroForm
/// dictionary, or the fields array is missing.
pub fn extract_fields(doc: &LoadedDocument) -> Result<Vec<FormField>> {
    extract_fields_with_threshold(doc, LARGE_FORM_THRESHOLD)
}

/// As [`extract_fields`], but with a caller-supplied large-form threshold.
pub fn extract_fields_with_threshold(doc: &LoadedDocument, large_form_threshold: usize) -> Result<Vec<FormField>> {
    let resolver = doc.resolver();
    let forms = match doc.file.get_root().forms.as_ref() {
        Some(forms) => forms,
        None => return Ok(Vec::new()),
    };

    if forms.fields.len() > large_form_threshold {
        info!(
            "large form detected ({} top-level fields); processing without chunking",
            forms.fields.len()
        );
    }

    let pages = PageIndex::build(doc, &resolver);
    let mut visited = HashSet::new();
    let mut out = Vec::new();

    for (index, field_rc) in forms.fields.iter().enumerate() {
        let self_ref = field_rc.get_ref().get_inner();
        let dict = match resolve_dict(&resolver, self_ref) {
            Ok(d) => d,
            Err(err) => {
                warn!("failed to resolve top-level field {index}: {err}");
                continue;
            }
        };
        let path = FieldPath::root(index);
        let nodes = parse_hierarchy(&resolver, &dict, &path, self_ref, None, &mut visited, &pages)?;
        out.extend(nodes);
    }

    info!("extracted {} form fields", out.len());
    Ok(out)
}

/// Identifies a field's position in the declared `/Fields`/`/Kids` tree and
/// derives the `field_<n>` / `field_<parent>_<child>` id scheme (spec §4.B).
#[derive(Clone)]
struct FieldPath {
    top: usize,
    rest: Vec<usize>,
}

impl FieldPath {
    fn root(top: usize) -> Self {
        FieldPath { top, rest: Vec::new() }
    }

    fn child(&self, index: usize) -> Self {
        let mut rest = self.rest.clone();
        rest.push(index);
        FieldPath { top: self.top, rest }
    }

    /// The bare numeric/composite index (`"3"`, `"3_1"`) the original tool
    /// uses for its `Field_<index>` fallback name — distinct from [`Self::id`],
    /// which is the zero-padded, `field_`-prefixed stable identifier.
    fn raw_index(&self) -> String {
        if self.rest.is_empty() {
            self.top.to_string()
        } else {
            let mut index = self.top.to_string();
            for segment in &self.rest {
                index.push('_');
                index.push_str(&segment.to_string());
            }
            index
        }
    }

    fn id(&self) -> String {
        if self.rest.is_empty() {
            format!("field_{:06}", self.top)
        } else {
            let mut id = format!("field_{}", self.top);
            for segment in &self.rest {
                id.push('_');
                id.push_str(&segment.to_string());
            }
            id
        }
    }
}

fn parse_hierarchy(
    resolver: &impl Resolve,
    dict: &Dictionary,
    path: &FieldPath,
    self_ref: PlainRef,
    parent_id: Option<String>,
    visited: &mut HashSet<PlainRef>,
    pages: &PageIndex,
) -> Result<Vec<FormField>> {
    if !visited.insert(self_ref) {
        warn!("circular reference detected in field hierarchy at {}", path.id());
        return Ok(Vec::new());
    }

    let kid_refs = dict_references(dict, "Kids", resolver);
    if kid_refs.is_empty() {
        let field = parse_field(resolver, dict, self_ref, path, parent_id, Vec::new(), pages)?;
        return Ok(vec![field]);
    }

    let own_id = path.id();
    let parent_name = field_name(dict, resolver, &path.raw_index());

    let mut descendants = Vec::new();
    let mut direct_child_ids = Vec::new();

    for (child_index, kid_ref) in kid_refs.iter().enumerate() {
        let kid_dict = match resolve_dict(resolver, *kid_ref) {
            Ok(d) => d,
            Err(err) => {
                warn!("error parsing child {child_index} of {own_id}: {err}");
                continue;
            }
        };
        let child_path = path.child(child_index);
        let grandchild_refs = dict_references(&kid_dict, "Kids", resolver);

        if grandchild_refs.is_empty() {
            if !visited.insert(*kid_ref) {
                warn!("circular reference detected in field hierarchy at {}", child_path.id());
                continue;
            }
            let mut child = parse_field(
                resolver,
                &kid_dict,
                *kid_ref,
                &child_path,
                Some(own_id.clone()),
                Vec::new(),
                pages,
            )?;
            if matches!(child.kind, FieldKind::Radio | FieldKind::Checkbox) {
                let export = export_value(&kid_dict, resolver)
                    .unwrap_or_else(|| format!("option_{child_index}"));
                child.name = format!("{parent_name}__{export}");
            }
            direct_child_ids.push(child.id.clone());
            descendants.push(child);
        } else {
            let nested = parse_hierarchy(
                resolver,
                &kid_dict,
                &child_path,
                *kid_ref,
                Some(own_id.clone()),
                visited,
                pages,
            )?;
            if let Some(first) = nested.first() {
                direct_child_ids.push(first.id.clone());
            }
            descendants.extend(nested);
        }
    }

    if descendants.is_empty() {
        // Every declared child failed to resolve: still emit this field standalone.
        let field = parse_field(resolver, dict, self_ref, path, parent_id, Vec::new(), pages)?;
        return Ok(vec![field]);
    }

    let mut parent_field = parse_field(
        resolver,
        dict,
        self_ref,
        path,
        parent_id,
        direct_child_ids,
        pages,
    )?;
    parent_field.is_group_container = true;

    let mut out = Vec::with_capacity(1 + descendants.len());
    out.push(parent_field);
    out.extend(descendants);
    Ok(out)
}

fn parse_field(
    resolver: &impl Resolve,
    dict: &Dictionary,
    self_ref: PlainRef,
    path: &FieldPath,
    parent_id: Option<String>,
    children_ids: Vec<String>,
    pages: &PageIndex,
) -> Result<FormField> {
    let id = path.id();
    let name = field_name(dict, resolver, &path.raw_index());
    let kind = determine_kind(dict, resolver);
    let ff = dict_integer(dict, "Ff", resolver).unwrap_or(0);
    let flags = FieldFlags::from_raw(ff as u32);
    let value = dict_string(dict, "V", resolver)
        .or_else(|| dict_string(dict, "DV", resolver))
        .unwrap_or_default();
    let rect = dict_rect(dict, "Rect", resolver).unwrap_or_else(|| {
        warn!("field {id}: invalid or missing rect, defaulting to [0,0,0,0]");
        [0.0; 4]
    });
    let page = pages.resolve(dict, self_ref, resolver);
    let options = extract_options(dict, resolver);
    let tooltip = dict_string(dict, "TU", resolver);
    let mapping_name = dict_string(dict, "TM", resolver);
    let max_length = dict_integer(dict, "MaxLen", resolver).map(|v| v.max(0) as u32);
    let default_appearance = dict_string(dict, "DA", resolver);

    debug!("extracted field {id}: {name:?} ({kind:?})");

    Ok(FormField {
        id,
        name,
        kind,
        page,
        rect,
        value,
        flags,
        options,
        tooltip,
        mapping_name,
        max_length,
        default_appearance,
        parent_id,
        children_ids,
        is_group_container: false,
    })
}

fn field_name(dict: &Dictionary, resolver: &impl Resolve, fallback_id: &str) -> String {
    dict_string(dict, "T", resolver)
        .filter(|s| !s.is_empty())
        .or_else(|| dict_string(dict, "TU", resolver).filter(|s| !s.is_empty()))
        .unwrap_or_else(|| format!("Field_{fallback_id}"))
}

fn determine_kind(dict: &Dictionary, resolver: &impl Resolve) -> FieldKind {
    let ft = dict_string(dict, "FT", resolver);
    let ff = dict_integer(dict, "Ff", resolver).unwrap_or(0);
    match ft.as_deref() {
        Some("Tx") => FieldKind::Text,
        Some("Btn") => {
            if ff & FF_RADIO != 0 {
                FieldKind::Radio
            } else if ff & FF_PUSHBUTTON != 0 {
                FieldKind::Pushbutton
            } else {
                FieldKind::Checkbox
            }
        }
        Some("Ch") => {
            if ff & FF_COMBO != 0 {
                FieldKind::Dropdown
            } else {
                FieldKind::Listbox
            }
        }
        Some("Sig") => FieldKind::Signature,
        None => {
            if has_off_state(dict, resolver) || dict.get("Subtype").is_some() {
                FieldKind::Radio
            } else {
                FieldKind::Unknown
            }
        }
        _ => FieldKind::Unknown,
    }
}

fn has_off_state(dict: &Dictionary, resolver: &impl Resolve) -> bool {
    let Some(ap) = resolve_entry(dict, "AP", resolver) else {
        return false;
    };
    let Primitive::Dictionary(ap_dict) = ap else {
        return false;
    };
    let Some(normal) = resolve_entry(&ap_dict, "N", resolver) else {
        return false;
    };
    match normal {
        Primitive::Dictionary(states) => states
            .iter()
            .any(|(key, _)| is_off_state(&key.to_string())),
        _ => false,
    }
}

/// Appearance-state/appearance-dictionary fallback chain for a radio or
/// checkbox child's export value (spec §4.B step 2). Does *not* include the
/// final `option_<index>` fallback — that depends on the child's position,
/// which the caller supplies.
fn export_value(dict: &Dictionary, resolver: &impl Resolve) -> Option<String> {
    if let Some(state) = dict_string(dict, "AS", resolver) {
        if !is_off_state(&state) {
            return Some(state);
        }
    }

    if let Some(Primitive::Dictionary(ap_dict)) = resolve_entry(dict, "AP", resolver) {
        if let Some(Primitive::Dictionary(states)) = resolve_entry(&ap_dict, "N", resolver) {
            for (key, _) in states.iter() {
                let key = key.to_string();
                if !is_off_state(&key) {
                    return Some(key);
                }
            }
        }
    }

    dict_string(dict, "V", resolver).filter(|v| !v.is_empty())
}

fn is_off_state(state: &str) -> bool {
    state == "Off" || state == "No"
}

fn extract_options(dict: &Dictionary, resolver: &impl Resolve) -> Vec<String> {
    let Some(resolved) = resolve_entry(dict, "Opt", resolver) else {
        return Vec::new();
    };
    let Ok(items) = resolved.into_array() else {
        return Vec::new();
    };

    items
        .into_iter()
        .filter_map(|item| match item.resolve(resolver).ok()? {
            Primitive::String(s) => Some(s.to_string_lossy().to_string()),
            Primitive::Array(pair) if pair.len() == 2 => match pair.into_iter().nth(1)? {
                Primitive::String(s) => Some(s.to_string_lossy().to_string()),
                _ => None,
            },
            _ => None,
        })
        .collect()
}

/// Maps page object refs and widget-annotation refs to 1-based page numbers,
/// built once per extraction to avoid an O(fields × pages) rescan per field.
struct PageIndex {
    by_page_ref: HashMap<PlainRef, u32>,
    by_annot_ref: HashMap<PlainRef, u32>,
}

impl PageIndex {
    fn build(doc: &LoadedDocument, resolver: &impl Resolve) -> Self {
        let mut by_page_ref = HashMap::new();
        let mut by_annot_ref = HashMap::new();

        for (index, page_result) in doc.file.pages().enumerate() {
            let Ok(page) = page_result else { continue };
            let page_number = (index + 1) as u32;
            let page_ref = page.get_ref().get_inner();
            by_page_ref.insert(page_ref, page_number);

            if let Ok(page_dict) = resolve_dict(resolver, page_ref) {
                for annot_ref in dict_references(&page_dict, "Annots", resolver) {
                    by_annot_ref.entry(annot_ref).or_insert(page_number);
                }
            }
        }

        PageIndex {
            by_page_ref,
            by_annot_ref,
        }
    }

    fn resolve(&self, dict: &Dictionary, self_ref: PlainRef, _resolver: &impl Resolve) -> u32 {
        if let Some(Primitive::Reference(page_ref)) = dict.get("P") {
            if let Some(&page) = self.by_page_ref.get(page_ref) {
                return page;
            }
        }
        if let Some(&page) = self.by_annot_ref.get(&self_ref) {
            return page;
        }
        warn!("could not place field {self_ref:?} on a page, defaulting to page 1");
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_path_formats_top_level_with_padding() {
        assert_eq!(FieldPath::root(3).id(), "field_000003");
    }

    #[test]
    fn field_path_formats_nested_without_padding() {
        let path = FieldPath::root(3).child(1);
        assert_eq!(path.id(), "field_3_1");
    }

    #[test]
    fn off_state_detection() {
        assert!(is_off_state("Off"));
        assert!(is_off_state("No"));
        assert!(!is_off_state("Male"));
    }
}
