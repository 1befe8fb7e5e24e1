use proptest::prelude::*;

use pdf_field_forge::naming::is_valid_name_shape;

proptest! {
    #[test]
    fn any_string_containing_whitespace_or_uppercase_is_rejected(s in "[A-Za-z ]{1,20}") {
        if s.chars().any(|c| c.is_uppercase() || c == ' ') {
            prop_assert!(!is_valid_name_shape(&s));
        }
    }

    #[test]
    fn a_single_lowercase_segment_is_always_accepted(s in "[a-z][a-z0-9]{0,9}") {
        prop_assert!(is_valid_name_shape(&s));
    }

    #[test]
    fn consecutive_hyphens_are_never_accepted(prefix in "[a-z][a-z0-9]{0,5}", suffix in "[a-z0-9]{1,5}") {
        let name = format!("{prefix}--{suffix}");
        prop_assert!(!is_valid_name_shape(&name));
    }
}
