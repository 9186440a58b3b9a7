//! Property tests for the matcher tree.
//!
//! - every tree accepts the example it generates
//! - type matchers accept any value of the example's kind, whatever its value
//! - regex matchers accept every string of their language
//! - matching arbitrary pairs never panics

use accord::{Matcher, MismatchKind};
use proptest::prelude::*;
use serde_json::{json, Value};

fn scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        "[a-zA-Z0-9 ]{0,12}".prop_map(Value::from),
    ]
}

fn json_strategy() -> impl Strategy<Value = Value> {
    scalar_strategy().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                .prop_map(|entries| json!(entries)),
        ]
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_literal_tree_accepts_its_own_example(value in json_strategy()) {
        let matcher = Matcher::from(value.clone());

        prop_assert_eq!(matcher.generate(), value.clone());
        prop_assert!(matcher.matches(&value).is_match());
    }

    #[test]
    fn prop_type_matcher_ignores_values(example in any::<i64>(), actual in any::<i64>()) {
        prop_assert!(Matcher::like(example).matches(&json!(actual)).is_match());
    }

    #[test]
    fn prop_type_matcher_rejects_other_kinds(example in any::<i64>(), actual in "[a-z0-9]{0,8}") {
        let result = Matcher::like(example).matches(&json!(actual));

        prop_assert!(!result.is_match());
        prop_assert_eq!(result.mismatches()[0].kind, MismatchKind::Type);
    }

    #[test]
    fn prop_type_shape_accepts_array_of_same_kind(items in prop::collection::vec(any::<i64>(), 0..8)) {
        let matcher = Matcher::like(json!({ "counts": [1] }));

        let actual = json!({ "counts": items, "extra": true });
        prop_assert!(matcher.matches(&actual).is_match());
    }

    #[test]
    fn prop_regex_matcher_accepts_its_language(date in "[0-9]{4}-[0-9]{2}-[0-9]{2}") {
        let matcher = Matcher::term(r"\d{4}-\d{2}-\d{2}", "2013-08-16").unwrap();

        prop_assert!(matcher.matches(&json!(date)).is_match());
        let padded = format!("{}T", date);
        prop_assert!(!matcher.matches(&json!(padded)).is_match());
    }

    #[test]
    fn prop_matching_never_panics(expected in json_strategy(), actual in json_strategy()) {
        let literal = Matcher::from(expected.clone()).matches(&actual);
        let _ = Matcher::like(expected.clone()).matches(&actual);

        if expected == actual {
            prop_assert!(literal.is_match());
        } else if !literal.is_match() {
            prop_assert!(!literal.mismatches().is_empty());
        }
    }
}
