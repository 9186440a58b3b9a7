use crate::error::Error;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::{
    collections::{BTreeMap, HashMap},
    fmt::{self, Display},
    sync::RwLock,
};

lazy_static! {
    static ref PLAIN_KEY_REGEX: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_\-]*$").unwrap();
    // compiled full-match regexes, keyed by the pattern as written in the matcher
    static ref FULL_MATCH_REGEXES: RwLock<HashMap<String, Regex>> = RwLock::new(HashMap::new());
}

/// Describes how permissively an actual JSON value may deviate from an expected example.
#[derive(Debug, Clone, PartialEq)]
pub enum Matcher {
    /// The actual value must be deeply equal.
    Literal(Value),
    /// Every listed key must be present and match, other keys are ignored.
    Object(BTreeMap<String, Matcher>),
    /// Pairwise match, lengths must agree.
    Array(Vec<Matcher>),
    /// Any value of the same JSON kind as the example.
    TypeShape(Value),
    /// Any string fully matching `pattern`. `example` is what the mock serves.
    Regex { pattern: String, example: String },
}

impl Matcher {
    pub fn like<V: Into<Value>>(example: V) -> Self {
        Matcher::TypeShape(example.into())
    }

    pub fn term<P: Into<String>, E: Into<String>>(pattern: P, example: E) -> Result<Self, Error> {
        let pattern = pattern.into();
        let example = example.into();

        let regex = full_match_regex(&pattern)?;
        if !regex.is_match(&example) {
            return Err(Error::InvalidMatcher {
                reason: format!("the example \"{}\" doesn't match", example),
                pattern,
            });
        }

        Ok(Matcher::Regex { pattern, example })
    }

    pub fn object<K: Into<String>, I: IntoIterator<Item = (K, Matcher)>>(entries: I) -> Self {
        Matcher::Object(
            entries
                .into_iter()
                .map(|(key, matcher)| (key.into(), matcher))
                .collect(),
        )
    }

    /// The example value this matcher stands for.
    pub fn generate(&self) -> Value {
        match self {
            Matcher::Literal(value) | Matcher::TypeShape(value) => value.clone(),
            Matcher::Object(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(key, matcher)| (key.clone(), matcher.generate()))
                    .collect::<Map<_, _>>(),
            ),
            Matcher::Array(items) => Value::Array(items.iter().map(Matcher::generate).collect()),
            Matcher::Regex { example, .. } => Value::String(example.clone()),
        }
    }

    /// The example rendered the way it appears in a query string or header.
    pub fn generate_string(&self) -> String {
        match self.generate() {
            Value::String(value) => value,
            other => other.to_string(),
        }
    }

    pub fn matches(&self, actual: &Value) -> MatchResult {
        match_value(self, actual, "$")
    }
}

impl From<Value> for Matcher {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(entries) => Matcher::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, Matcher::from(value)))
                    .collect(),
            ),
            Value::Array(items) => Matcher::Array(items.into_iter().map(Matcher::from).collect()),
            other => Matcher::Literal(other),
        }
    }
}

impl From<&str> for Matcher {
    fn from(value: &str) -> Self {
        Matcher::Literal(Value::String(value.into()))
    }
}

impl From<String> for Matcher {
    fn from(value: String) -> Self {
        Matcher::Literal(Value::String(value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MismatchKind {
    Value,
    Type,
    Regex,
    MissingKey,
    UnexpectedKey,
    Length,
    Method,
    Path,
    Status,
    Header,
}

/// One divergence between an expectation and what was actually observed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mismatch {
    pub kind: MismatchKind,
    pub path: String,
    pub expected: String,
    pub actual: String,
}

impl Mismatch {
    pub fn new<P: Into<String>, E: Into<String>, A: Into<String>>(
        kind: MismatchKind,
        path: P,
        expected: E,
        actual: A,
    ) -> Self {
        Self {
            kind,
            path: path.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

impl Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: expected {} but got {}",
            self.path, self.expected, self.actual
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchResult {
    mismatches: Vec<Mismatch>,
}

impl MatchResult {
    pub fn is_match(&self) -> bool {
        self.mismatches.is_empty()
    }

    pub fn mismatches(&self) -> &[Mismatch] {
        &self.mismatches
    }

    pub fn into_mismatches(self) -> Vec<Mismatch> {
        self.mismatches
    }
}

/// Matches `actual` against `expected`, reporting every mismatch below `root`.
pub fn match_value(expected: &Matcher, actual: &Value, root: &str) -> MatchResult {
    let mut mismatches = Vec::new();
    collect_mismatches(expected, actual, root, &mut mismatches);

    MatchResult { mismatches }
}

/// Every expected query parameter must be present and match, and no other parameter may be
/// sent.
pub fn match_query(
    expected: &BTreeMap<String, Matcher>,
    actual: &BTreeMap<String, String>,
) -> Vec<Mismatch> {
    let mut mismatches = Vec::new();

    for (name, matcher) in expected {
        let path = child_path("$.query", name);
        match actual.get(name) {
            Some(value) => {
                collect_mismatches(matcher, &Value::String(value.clone()), &path, &mut mismatches)
            }
            None => mismatches.push(Mismatch::new(
                MismatchKind::MissingKey,
                path,
                matcher.generate_string(),
                "<missing>",
            )),
        }
    }
    for (name, value) in actual {
        if !expected.contains_key(name) {
            mismatches.push(Mismatch::new(
                MismatchKind::UnexpectedKey,
                child_path("$.query", name),
                "<absent>",
                value.clone(),
            ));
        }
    }

    mismatches
}

/// Expected headers must be a subset of the actual ones. Names are case-insensitive, values are
/// compared ignoring whitespace.
pub fn match_headers(
    expected: &BTreeMap<String, String>,
    actual: &HashMap<String, String>,
    root: &str,
) -> Vec<Mismatch> {
    expected
        .iter()
        .filter_map(|(name, expected_value)| {
            let path = format!("{}.{}", root, name);
            match crate::util::find_header(actual, name) {
                Some(actual_value)
                    if normalize_header_value(actual_value)
                        == normalize_header_value(expected_value) =>
                {
                    None
                }
                Some(actual_value) => Some(Mismatch::new(
                    MismatchKind::Header,
                    path,
                    expected_value.clone(),
                    actual_value.clone(),
                )),
                None => Some(Mismatch::new(
                    MismatchKind::Header,
                    path,
                    expected_value.clone(),
                    "<missing>",
                )),
            }
        })
        .collect()
}

/// Matches a raw body. Bodies that don't parse as JSON are matched as a JSON string.
pub fn match_body(expected: Option<&Matcher>, actual: &str) -> Vec<Mismatch> {
    let matcher = match expected {
        Some(matcher) => matcher,
        None => return Vec::new(),
    };

    if actual.trim().is_empty() {
        return vec![Mismatch::new(
            MismatchKind::MissingKey,
            "$.body",
            matcher.generate().to_string(),
            "<empty body>",
        )];
    }

    let actual = serde_json::from_str::<Value>(actual)
        .unwrap_or_else(|_| Value::String(actual.to_string()));

    match_value(matcher, &actual, "$.body").into_mismatches()
}

pub(crate) fn child_path(parent: &str, key: &str) -> String {
    if PLAIN_KEY_REGEX.is_match(key) {
        format!("{}.{}", parent, key)
    } else {
        format!("{}['{}']", parent, key)
    }
}

pub(crate) fn index_path(parent: &str, index: usize) -> String {
    format!("{}[{}]", parent, index)
}

fn collect_mismatches(expected: &Matcher, actual: &Value, path: &str, out: &mut Vec<Mismatch>) {
    match expected {
        Matcher::Literal(value) => {
            if value != actual {
                out.push(Mismatch::new(
                    MismatchKind::Value,
                    path,
                    value.to_string(),
                    actual.to_string(),
                ));
            }
        }
        Matcher::Object(entries) => match actual {
            Value::Object(actual_entries) => {
                for (key, matcher) in entries {
                    let child = child_path(path, key);
                    match actual_entries.get(key) {
                        Some(value) => collect_mismatches(matcher, value, &child, out),
                        None => out.push(Mismatch::new(
                            MismatchKind::MissingKey,
                            child,
                            matcher.generate().to_string(),
                            "<missing>",
                        )),
                    }
                }
            }
            other => out.push(type_mismatch(path, "an object", other)),
        },
        Matcher::Array(items) => match actual {
            Value::Array(actual_items) => {
                if items.len() != actual_items.len() {
                    out.push(Mismatch::new(
                        MismatchKind::Length,
                        path,
                        format!("{} elements", items.len()),
                        format!("{} elements", actual_items.len()),
                    ));
                }
                for (index, (matcher, value)) in items.iter().zip(actual_items).enumerate() {
                    collect_mismatches(matcher, value, &index_path(path, index), out);
                }
            }
            other => out.push(type_mismatch(path, "an array", other)),
        },
        Matcher::TypeShape(example) => collect_shape_mismatches(example, actual, path, out),
        Matcher::Regex { pattern, .. } => match (actual, full_match_regex(pattern)) {
            (Value::String(value), Ok(regex)) => {
                if !regex.is_match(value) {
                    out.push(Mismatch::new(
                        MismatchKind::Regex,
                        path,
                        format!("a string matching /{}/", pattern),
                        format!("\"{}\"", value),
                    ));
                }
            }
            (_, Err(e)) => out.push(Mismatch::new(
                MismatchKind::Regex,
                path,
                format!("a valid pattern /{}/", pattern),
                e.to_string(),
            )),
            (other, _) => out.push(Mismatch::new(
                MismatchKind::Type,
                path,
                format!("a string matching /{}/", pattern),
                describe(other),
            )),
        },
    }
}

fn collect_shape_mismatches(example: &Value, actual: &Value, path: &str, out: &mut Vec<Mismatch>) {
    if kind_of(example) != kind_of(actual) {
        out.push(type_mismatch(path, kind_of(example), actual));
        return;
    }

    match (example, actual) {
        (Value::Object(example_entries), Value::Object(actual_entries)) => {
            for (key, example_value) in example_entries {
                let child = child_path(path, key);
                match actual_entries.get(key) {
                    Some(value) => collect_shape_mismatches(example_value, value, &child, out),
                    None => out.push(Mismatch::new(
                        MismatchKind::MissingKey,
                        child,
                        kind_of(example_value),
                        "<missing>",
                    )),
                }
            }
        }
        (Value::Array(example_items), Value::Array(actual_items)) => {
            if let Some(first) = example_items.first() {
                for (index, value) in actual_items.iter().enumerate() {
                    collect_shape_mismatches(first, value, &index_path(path, index), out);
                }
            }
        }
        _ => {}
    }
}

fn full_match_regex(pattern: &str) -> Result<Regex, Error> {
    if let Some(regex) = FULL_MATCH_REGEXES.read()?.get(pattern) {
        return Ok(regex.clone());
    }

    let regex =
        Regex::new(&format!("^(?:{})$", pattern)).map_err(|e| Error::InvalidMatcher {
            pattern: pattern.into(),
            reason: e.to_string(),
        })?;
    FULL_MATCH_REGEXES
        .write()?
        .insert(pattern.to_string(), regex.clone());

    Ok(regex)
}

fn normalize_header_value(value: &str) -> String {
    value.split_whitespace().collect()
}

fn type_mismatch(path: &str, expected: &str, actual: &Value) -> Mismatch {
    Mismatch::new(MismatchKind::Type, path, expected, describe(actual))
}

fn describe(value: &Value) -> String {
    format!("{} {}", kind_of(value), value)
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const DATE_PATTERN: &str = r"\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(\+|\-)\d{2}:\d{2}";

    #[test]
    fn test_type_shape_accepts_same_kind() {
        assert!(Matcher::like(1000).matches(&json!(100)).is_match());
        assert!(Matcher::like(1000).matches(&json!(12.5)).is_match());
    }

    #[test]
    fn test_type_shape_rejects_other_kind() {
        let result = Matcher::like(1000).matches(&json!("100"));

        assert_eq!(result.mismatches().len(), 1);
        assert_eq!(result.mismatches()[0].kind, MismatchKind::Type);
        assert_eq!(result.mismatches()[0].path, "$");
    }

    #[test]
    fn test_type_shape_recurses_into_objects_and_arrays() {
        let matcher = Matcher::like(json!({"name": "x", "tags": ["a"]}));

        assert!(matcher
            .matches(&json!({"name": "y", "tags": ["b", "c"], "extra": 1}))
            .is_match());

        let result = matcher.matches(&json!({"tags": ["b", 2]}));
        let paths: Vec<_> = result.mismatches().iter().map(|m| m.path.as_str()).collect();
        assert_eq!(paths, vec!["$.name", "$.tags[1]"]);
    }

    #[test]
    fn test_regex_requires_full_match() {
        let matcher = Matcher::term(DATE_PATTERN, "2013-08-16T15:31:20+10:00").unwrap();

        assert!(matcher
            .matches(&json!("2013-08-16T15:31:20+10:00"))
            .is_match());
        assert!(!matcher.matches(&json!("not-a-date")).is_match());
        assert!(!matcher
            .matches(&json!("x2013-08-16T15:31:20+10:00"))
            .is_match());
        assert_eq!(
            matcher.matches(&json!(20130816)).mismatches()[0].kind,
            MismatchKind::Type
        );
    }

    #[test]
    fn test_term_rejects_example_outside_pattern() {
        assert!(matches!(
            Matcher::term(DATE_PATTERN, "yesterday"),
            Err(Error::InvalidMatcher { .. })
        ));
        assert!(Matcher::term("(", "(").is_err());
    }

    #[test]
    fn test_objects_are_permissive_and_report_every_mismatch() {
        let matcher = Matcher::object(vec![
            ("test", Matcher::from("NO")),
            ("count", Matcher::like(1000)),
            ("missing", Matcher::from(json!(true))),
        ]);

        let result = matcher.matches(&json!({"test": "YES", "count": "many", "other": 1}));
        let kinds: Vec<_> = result.mismatches().iter().map(|m| m.kind).collect();

        assert_eq!(
            kinds,
            vec![
                MismatchKind::Type,
                MismatchKind::MissingKey,
                MismatchKind::Value
            ]
        );
    }

    #[test]
    fn test_array_length_mismatch() {
        let matcher = Matcher::from(json!([1, 2]));

        let result = matcher.matches(&json!([1]));

        assert_eq!(result.mismatches()[0].kind, MismatchKind::Length);
        assert!(matcher.matches(&json!([1, 2])).is_match());
    }

    #[test]
    fn test_generate_uses_examples() {
        let matcher = Matcher::object(vec![
            ("validDate", Matcher::term(DATE_PATTERN, "2013-08-16T15:31:20+10:00").unwrap()),
            ("count", Matcher::like(1000)),
        ]);

        assert_eq!(
            matcher.generate(),
            json!({"validDate": "2013-08-16T15:31:20+10:00", "count": 1000})
        );
    }

    #[test]
    fn test_headers_are_a_case_insensitive_subset() {
        let mut expected = BTreeMap::new();
        expected.insert(
            "Content-Type".to_string(),
            "application/json; charset=utf-8".to_string(),
        );
        let mut actual = HashMap::new();
        actual.insert(
            "content-type".to_string(),
            "application/json;charset=utf-8".to_string(),
        );
        actual.insert("x-extra".to_string(), "1".to_string());

        assert!(match_headers(&expected, &actual, "$.headers").is_empty());

        actual.insert("content-type".to_string(), "text/plain".to_string());
        assert_eq!(match_headers(&expected, &actual, "$.headers").len(), 1);
    }

    #[test]
    fn test_query_values_go_through_matchers() {
        let mut expected = BTreeMap::new();
        expected.insert(
            "validDate".to_string(),
            Matcher::term(DATE_PATTERN, "2013-08-16T15:31:20+10:00").unwrap(),
        );
        let mut actual = BTreeMap::new();

        assert_eq!(
            match_query(&expected, &actual)[0].kind,
            MismatchKind::MissingKey
        );

        actual.insert("validDate".to_string(), "2020-01-01T00:00:00+00:00".to_string());
        assert!(match_query(&expected, &actual).is_empty());

        actual.insert("page".to_string(), "2".to_string());
        let mismatches = match_query(&expected, &actual);
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].kind, MismatchKind::UnexpectedKey);
        assert_eq!(mismatches[0].path, "$.query.page");
    }

    #[test]
    fn test_regexes_are_compiled_once_per_pattern() {
        let pattern = r"[A-Z]{3}-\d{4}";
        let matcher = Matcher::term(pattern, "ABC-1234").unwrap();

        assert!(matcher.matches(&json!("XYZ-0001")).is_match());
        assert!(!matcher.matches(&json!("xyz-0001")).is_match());

        let cached = FULL_MATCH_REGEXES.read().unwrap().get(pattern).cloned().unwrap();
        assert_eq!(cached.as_str(), r"^(?:[A-Z]{3}-\d{4})$");
        assert!(full_match_regex("(unclosed").is_err());
        assert!(!FULL_MATCH_REGEXES.read().unwrap().contains_key("(unclosed"));
    }

    #[test]
    fn test_undeclared_query_rejects_any_parameter() {
        let mut actual = BTreeMap::new();
        assert!(match_query(&BTreeMap::new(), &actual).is_empty());

        actual.insert("validDate".to_string(), "2019".to_string());
        assert_eq!(
            match_query(&BTreeMap::new(), &actual)[0].kind,
            MismatchKind::UnexpectedKey
        );
    }

    #[test]
    fn test_body_matching() {
        assert!(match_body(None, "anything").is_empty());
        assert_eq!(
            match_body(Some(&Matcher::from(json!({"a": 1}))), "")[0].path,
            "$.body"
        );
        assert!(match_body(Some(&Matcher::from("plain")), "plain").is_empty());
    }

    #[test]
    fn test_unusual_keys_are_bracketed() {
        assert_eq!(child_path("$.body", "count"), "$.body.count");
        assert_eq!(child_path("$.body", "a key"), "$.body['a key']");
    }
}
