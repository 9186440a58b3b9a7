use super::BodyFilter;
use regex::Regex;

#[derive(Debug)]
enum Needle {
    Text(String),
    Pattern(Regex),
}

/// Replaces every occurrence of a text or of a pattern in the replayed body.
#[derive(Debug)]
pub struct BodyReplaceFilter {
    needle: Needle,
    substitution: String,
}

impl BodyReplaceFilter {
    pub fn text<S1: Into<String>, S2: Into<String>>(text: S1, substitution: S2) -> Self {
        Self {
            needle: Needle::Text(text.into()),
            substitution: substitution.into(),
        }
    }

    /// `substitution` may refer to capture groups, e.g. `$1`.
    pub fn pattern<S: Into<String>>(pattern: Regex, substitution: S) -> Self {
        Self {
            needle: Needle::Pattern(pattern),
            substitution: substitution.into(),
        }
    }
}

impl BodyFilter for BodyReplaceFilter {
    fn apply(&self, body: &mut String) {
        let replaced = match &self.needle {
            Needle::Text(text) if text.is_empty() => return,
            Needle::Text(text) => body.replace(text.as_str(), &self.substitution),
            Needle::Pattern(pattern) => pattern
                .replace_all(body, self.substitution.as_str())
                .into_owned(),
        };
        *body = replaced;
    }
}
