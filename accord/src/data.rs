use crate::util;
use serde::Serialize;
use std::{
    collections::{BTreeMap, HashMap},
    fmt::{self, Display},
};

/// An HTTP request as it travels over the wire, either received by the mock server or replayed
/// against a provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RequestData {
    pub method: String,
    pub path: String,
    pub query: BTreeMap<String, String>,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl RequestData {
    pub fn new<M: Into<String>, P: Into<String>>(method: M, path: P) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            ..Self::default()
        }
    }

    /// Path and query string, ready to be appended to a base url.
    pub fn uri(&self) -> String {
        if self.query.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, util::encode_query(&self.query))
        }
    }

    pub fn header<S: AsRef<str>>(&self, name: S) -> Option<&String> {
        util::find_header(&self.headers, name.as_ref())
    }
}

impl Display for RequestData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.uri())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseData {
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl ResponseData {
    pub fn new(status_code: u16) -> Self {
        Self {
            status_code,
            ..Self::default()
        }
    }

    pub fn with_header<S1: Into<String>, S2: Into<String>>(mut self, name: S1, value: S2) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_json_body(mut self, body: &serde_json::Value) -> Self {
        if util::find_header(&self.headers, "content-type").is_none() {
            self.headers
                .insert("Content-Type".into(), util::JSON_CONTENT_TYPE.into());
        }
        self.body = body.to_string();
        self
    }

    pub fn header<S: AsRef<str>>(&self, name: S) -> Option<&String> {
        util::find_header(&self.headers, name.as_ref())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}
