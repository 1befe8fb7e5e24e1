//! Shared low-level dictionary access used by the Extractor and Executor.
//!
//! Field and widget dictionaries are walked generically via `pdf::primitive`
//! rather than the crate's typed `FieldDictionary`/`Merged` wrappers, so both
//! read (extraction) and write (rename) paths share one notion of "resolve
//! this indirect reference, read/replace these keys" (spec §9's
//! clone-on-write requirement falls out naturally: every write here starts
//! from an owned clone of the resolved dictionary, never the source's own
//! in-memory object).

use pdf::object::{PlainRef, Resolve};
use pdf::primitive::{Dictionary, Primitive};

use crate::error::Result;

pub(crate) fn resolve_dict(resolver: &impl Resolve, r: PlainRef) -> Result<Dictionary> {
    match resolver.resolve(r)? {
        Primitive::Dictionary(d) => Ok(d),
        other => Err(pdf::error::PdfError::UnexpectedPrimitive {
            expected: "Dictionary",
            found: other.get_debug_name(),
        }
        .into()),
    }
}

pub(crate) fn resolve_entry(dict: &Dictionary, key: &str, resolver: &impl Resolve) -> Option<Primitive> {
    dict.get(key)?.clone().resolve(resolver).ok()
}

pub(crate) fn dict_string(dict: &Dictionary, key: &str, resolver: &impl Resolve) -> Option<String> {
    match resolve_entry(dict, key, resolver)? {
        Primitive::String(s) => Some(s.to_string_lossy().to_string()),
        Primitive::Name(n) => Some(n.to_string()),
        _ => None,
    }
}

pub(crate) fn dict_integer(dict: &Dictionary, key: &str, resolver: &impl Resolve) -> Option<i32> {
    match resolve_entry(dict, key, resolver)? {
        Primitive::Integer(i) => Some(i),
        _ => None,
    }
}

pub(crate) fn dict_rect(dict: &Dictionary, key: &str, resolver: &impl Resolve) -> Option<[f64; 4]> {
    let resolved = resolve_entry(dict, key, resolver)?;
    let arr = resolved.into_array().ok()?;
    if arr.len() != 4 {
        return None;
    }
    let mut out = [0.0f64; 4];
    for (i, v) in arr.into_iter().enumerate() {
        out[i] = v.as_number().ok()? as f64;
    }
    Some(out)
}

pub(crate) fn dict_references(dict: &Dictionary, key: &str, resolver: &impl Resolve) -> Vec<PlainRef> {
    match dict.get(key) {
        Some(Primitive::Array(items)) => items
            .iter()
            .filter_map(|p| match p {
                Primitive::Reference(r) => Some(*r),
                _ => None,
            })
            .collect(),
        Some(Primitive::Reference(r)) => match resolver.resolve(*r) {
            Ok(Primitive::Array(items)) => items
                .iter()
                .filter_map(|p| match p {
                    Primitive::Reference(r) => Some(*r),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}
