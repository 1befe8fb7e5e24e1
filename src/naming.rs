//! Name-shape validation (spec §4.E.1 / §6.3).
//!
//! The wire contract is a `block[_element][__modifier]` BEM-like shape where
//! each segment is lowercase, hyphen-separated, with no leading/trailing or
//! consecutive hyphens. Two regexes appear in the original source — one
//! forbidding consecutive hyphens, one permitting them. This crate takes the
//! stricter form per spec §9's explicit resolution.

use once_cell::sync::Lazy;
use regex::Regex;

/// `[a-z][a-z0-9]*(-[a-z0-9]+)*` — one BEM segment, no consecutive/leading/trailing hyphens.
const SEGMENT: &str = r"[a-z][a-z0-9]*(?:-[a-z0-9]+)*";

static NAME_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^{seg}(?:_{seg})?(?:__{seg})?$",
        seg = SEGMENT
    ))
    .expect("static name-shape regex is valid")
});

/// Validates a proposed new field name against the `block_element__modifier` shape.
pub fn is_valid_name_shape(name: &str) -> bool {
    !name.is_empty() && NAME_SHAPE.is_match(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_block_only() {
        assert!(is_valid_name_shape("owner-information"));
    }

    #[test]
    fn accepts_block_element_modifier() {
        assert!(is_valid_name_shape("owner-information_gender__male"));
    }

    #[test]
    fn accepts_block_element() {
        assert!(is_valid_name_shape("owner-information_name"));
    }

    #[test]
    fn rejects_uppercase() {
        assert!(!is_valid_name_shape("Owner_Name"));
    }

    #[test]
    fn rejects_consecutive_hyphens() {
        assert!(!is_valid_name_shape("owner--info"));
    }

    #[test]
    fn rejects_leading_digit() {
        assert!(!is_valid_name_shape("123_field"));
    }

    #[test]
    fn rejects_leading_or_trailing_hyphen() {
        assert!(!is_valid_name_shape("-owner"));
        assert!(!is_valid_name_shape("owner-"));
    }

    #[test]
    fn rejects_empty() {
        assert!(!is_valid_name_shape(""));
    }

    #[test]
    fn rejects_extra_segments() {
        assert!(!is_valid_name_shape("a_b__c_d"));
    }
}
