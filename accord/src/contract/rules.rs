//! Pact v2 `matchingRules`: matchers are flattened into a JSON path keyed map next to the
//! example values and rebuilt from it when a document is read back.

use crate::matcher::{child_path, index_path, Matcher};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "match", rename_all = "lowercase")]
pub(crate) enum MatchingRule {
    Type,
    Regex { regex: String },
}

pub(crate) type MatchingRules = BTreeMap<String, MatchingRule>;

pub(crate) fn encode(matcher: &Matcher, path: &str, rules: &mut MatchingRules) -> Value {
    match matcher {
        Matcher::Literal(value) => value.clone(),
        Matcher::Object(entries) => Value::Object(
            entries
                .iter()
                .map(|(key, matcher)| (key.clone(), encode(matcher, &child_path(path, key), rules)))
                .collect::<Map<_, _>>(),
        ),
        Matcher::Array(items) => Value::Array(
            items
                .iter()
                .enumerate()
                .map(|(index, matcher)| encode(matcher, &index_path(path, index), rules))
                .collect(),
        ),
        Matcher::TypeShape(example) => {
            rules.insert(path.into(), MatchingRule::Type);
            example.clone()
        }
        Matcher::Regex { pattern, example } => {
            rules.insert(
                path.into(),
                MatchingRule::Regex {
                    regex: pattern.clone(),
                },
            );
            Value::String(example.clone())
        }
    }
}

pub(crate) fn decode(value: &Value, path: &str, rules: &MatchingRules) -> Matcher {
    match (rules.get(path), value) {
        (Some(MatchingRule::Type), _) => Matcher::TypeShape(value.clone()),
        (Some(MatchingRule::Regex { regex }), Value::String(example)) => Matcher::Regex {
            pattern: regex.clone(),
            example: example.clone(),
        },
        (Some(MatchingRule::Regex { regex }), other) => Matcher::Regex {
            pattern: regex.clone(),
            example: other.to_string(),
        },
        (None, Value::Object(entries)) => Matcher::Object(
            entries
                .iter()
                .map(|(key, value)| (key.clone(), decode(value, &child_path(path, key), rules)))
                .collect(),
        ),
        (None, Value::Array(items)) => Matcher::Array(
            items
                .iter()
                .enumerate()
                .map(|(index, value)| decode(value, &index_path(path, index), rules))
                .collect(),
        ),
        (None, other) => Matcher::Literal(other.clone()),
    }
}
