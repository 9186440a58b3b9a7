mod rules;

use crate::{
    error::Error,
    matcher::{self, Matcher, Mismatch, MismatchKind},
    util, RequestData, ResponseData,
};
use rules::MatchingRules;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    path::{Path, PathBuf},
};

/// One expected request/response pair, optionally tied to a provider state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "WireInteraction", from = "WireInteraction")]
pub struct Interaction {
    pub description: String,
    pub provider_state: Option<String>,
    pub request: InteractionRequest,
    pub response: InteractionResponse,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InteractionRequest {
    pub method: String,
    pub path: String,
    pub query: BTreeMap<String, Matcher>,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Matcher>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InteractionResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Matcher>,
}

impl InteractionRequest {
    /// Mismatches between this expectation and a received request. Method and path must be
    /// equal, query, headers and body go through the matchers.
    pub fn match_request(&self, actual: &RequestData) -> Vec<Mismatch> {
        let mut mismatches = Vec::new();

        if !self.method.eq_ignore_ascii_case(&actual.method) {
            mismatches.push(Mismatch::new(
                MismatchKind::Method,
                "$.method",
                self.method.clone(),
                actual.method.clone(),
            ));
        }
        if self.path != actual.path {
            mismatches.push(Mismatch::new(
                MismatchKind::Path,
                "$.path",
                self.path.clone(),
                actual.path.clone(),
            ));
        }
        mismatches.extend(matcher::match_query(&self.query, &actual.query));
        mismatches.extend(matcher::match_headers(
            &self.headers,
            &actual.headers,
            "$.headers",
        ));
        mismatches.extend(matcher::match_body(self.body.as_ref(), &actual.body));

        mismatches
    }

    /// The concrete request this expectation describes, built from the matcher examples.
    pub fn to_request_data(&self) -> RequestData {
        let mut request_data = RequestData::new(self.method.clone(), self.path.clone());

        request_data.query = self
            .query
            .iter()
            .map(|(name, matcher)| (name.clone(), matcher.generate_string()))
            .collect();
        request_data.headers = self
            .headers
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        if let Some(body) = &self.body {
            request_data.body = body.generate().to_string();
            if request_data.header("content-type").is_none() {
                request_data
                    .headers
                    .insert("Content-Type".into(), util::JSON_CONTENT_TYPE.into());
            }
        }

        request_data
    }
}

impl InteractionResponse {
    /// Status must be equal, headers are a subset, the body goes through the matchers.
    pub fn match_response(&self, actual: &ResponseData) -> Vec<Mismatch> {
        let mut mismatches = Vec::new();

        if self.status != actual.status_code {
            mismatches.push(Mismatch::new(
                MismatchKind::Status,
                "$.status",
                self.status.to_string(),
                actual.status_code.to_string(),
            ));
        }
        mismatches.extend(matcher::match_headers(
            &self.headers,
            &actual.headers,
            "$.headers",
        ));
        mismatches.extend(matcher::match_body(self.body.as_ref(), &actual.body));

        mismatches
    }

    /// The canned response served by the mock server.
    pub fn to_response_data(&self) -> ResponseData {
        let mut response_data = ResponseData::new(self.status);
        response_data.headers = self
            .headers
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        match &self.body {
            Some(body) => response_data.with_json_body(&body.generate()),
            None => response_data,
        }
    }
}

/// Builder for an [`Interaction`].
///
/// ```
/// use accord::{InteractionBuilder, Matcher};
///
/// let interaction = InteractionBuilder::new("a request for JSON data")
///     .given("date count > 0")
///     .with_request("GET", "/provider")
///     .with_query("validDate", Matcher::like("2013-08-16T15:31:20+10:00"))
///     .will_respond_with(200)
///     .with_response_body(Matcher::object(vec![("count", Matcher::like(1000))]))
///     .build();
///
/// assert_eq!(interaction.provider_state.as_deref(), Some("date count > 0"));
/// ```
#[derive(Debug, Clone)]
pub struct InteractionBuilder {
    interaction: Interaction,
}

impl InteractionBuilder {
    pub fn new<S: Into<String>>(description: S) -> Self {
        Self {
            interaction: Interaction {
                description: description.into(),
                provider_state: None,
                request: InteractionRequest {
                    method: "GET".into(),
                    path: "/".into(),
                    query: BTreeMap::new(),
                    headers: BTreeMap::new(),
                    body: None,
                },
                response: InteractionResponse {
                    status: 200,
                    headers: BTreeMap::new(),
                    body: None,
                },
            },
        }
    }

    pub fn given<S: Into<String>>(mut self, provider_state: S) -> Self {
        self.interaction.provider_state = Some(provider_state.into());
        self
    }

    pub fn with_request<M: AsRef<str>, P: Into<String>>(mut self, method: M, path: P) -> Self {
        self.interaction.request.method = method.as_ref().to_uppercase();
        self.interaction.request.path = path.into();
        self
    }

    pub fn with_query<S: Into<String>, M: Into<Matcher>>(mut self, name: S, matcher: M) -> Self {
        self.interaction
            .request
            .query
            .insert(name.into(), matcher.into());
        self
    }

    pub fn with_request_header<S1: Into<String>, S2: Into<String>>(
        mut self,
        name: S1,
        value: S2,
    ) -> Self {
        self.interaction
            .request
            .headers
            .insert(name.into(), value.into());
        self
    }

    pub fn with_request_body<M: Into<Matcher>>(mut self, body: M) -> Self {
        self.interaction.request.body = Some(body.into());
        self
    }

    pub fn will_respond_with(mut self, status: u16) -> Self {
        self.interaction.response.status = status;
        self
    }

    pub fn with_response_header<S1: Into<String>, S2: Into<String>>(
        mut self,
        name: S1,
        value: S2,
    ) -> Self {
        self.interaction
            .response
            .headers
            .insert(name.into(), value.into());
        self
    }

    pub fn with_response_body<M: Into<Matcher>>(mut self, body: M) -> Self {
        self.interaction.response.body = Some(body.into());
        self
    }

    pub fn build(self) -> Interaction {
        self.interaction
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pacticipant {
    pub name: String,
}

impl Pacticipant {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpecVersion {
    #[serde(rename = "2.0.0")]
    V2,
    #[serde(rename = "3.0.0")]
    V3,
}

impl Default for SpecVersion {
    fn default() -> Self {
        SpecVersion::V2
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PactSpecification {
    pub version: SpecVersion,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(rename = "pactSpecification")]
    pub pact_specification: PactSpecification,
}

/// The contract between one consumer and one provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractDocument {
    pub consumer: Pacticipant,
    pub provider: Pacticipant,
    pub interactions: Vec<Interaction>,
    pub metadata: Metadata,
}

impl ContractDocument {
    pub fn new<C: Into<String>, P: Into<String>>(
        consumer: C,
        provider: P,
        interactions: Vec<Interaction>,
        version: SpecVersion,
    ) -> Self {
        Self {
            consumer: Pacticipant::new(consumer),
            provider: Pacticipant::new(provider),
            interactions,
            metadata: Metadata {
                pact_specification: PactSpecification { version },
            },
        }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let file_contents = fs::read_to_string(path)?;
        Self::from_json(&file_contents)
    }

    pub fn from_json(contents: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(contents)?)
    }

    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// `our_little_consumer-our_provider.json` for "Our Little Consumer" and "Our Provider".
    pub fn file_name(&self) -> String {
        format!(
            "{}-{}.json",
            snake_case(&self.consumer.name),
            snake_case(&self.provider.name)
        )
    }

    /// Writes the document into `directory`, replacing any previous version of it.
    pub fn write_to_dir<P: AsRef<Path>>(&self, directory: P) -> Result<PathBuf, Error> {
        fs::create_dir_all(directory.as_ref())?;
        let path = directory.as_ref().join(self.file_name());
        fs::write(&path, self.to_json()?)?;

        Ok(path)
    }

    pub fn provider_states(&self) -> BTreeSet<String> {
        self.interactions
            .iter()
            .filter_map(|interaction| interaction.provider_state.clone())
            .collect()
    }
}

fn snake_case(name: &str) -> String {
    name.split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireInteraction {
    description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    provider_state: Option<String>,
    request: WireRequest,
    response: WireResponse,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireRequest {
    method: String,
    path: String,
    #[serde(
        default,
        skip_serializing_if = "BTreeMap::is_empty",
        deserialize_with = "deserialize_query"
    )]
    query: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    body: Option<Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    matching_rules: MatchingRules,
}

/// Pact v2 writes the query as an encoded string, later versions as a map of value lists.
#[derive(Deserialize)]
#[serde(untagged)]
enum WireQuery {
    Encoded(String),
    Single(BTreeMap<String, String>),
    Multiple(BTreeMap<String, Vec<String>>),
}

fn deserialize_query<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match WireQuery::deserialize(deserializer)? {
        WireQuery::Encoded(query) => util::parse_query(Some(query.trim_start_matches('?'))),
        WireQuery::Single(query) => query,
        WireQuery::Multiple(query) => query
            .into_iter()
            .filter_map(|(name, values)| Some((name, values.into_iter().next()?)))
            .collect(),
    })
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireResponse {
    status: u16,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    body: Option<Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    matching_rules: MatchingRules,
}

impl From<Interaction> for WireInteraction {
    fn from(interaction: Interaction) -> Self {
        let mut request_rules = MatchingRules::new();
        let query = interaction
            .request
            .query
            .iter()
            .map(|(name, matcher)| {
                let path = matcher::child_path("$.query", name);
                let value = match rules::encode(matcher, &path, &mut request_rules) {
                    Value::String(value) => value,
                    other => other.to_string(),
                };
                (name.clone(), value)
            })
            .collect();
        let request_body = interaction
            .request
            .body
            .as_ref()
            .map(|body| rules::encode(body, "$.body", &mut request_rules));

        let mut response_rules = MatchingRules::new();
        let response_body = interaction
            .response
            .body
            .as_ref()
            .map(|body| rules::encode(body, "$.body", &mut response_rules));

        WireInteraction {
            description: interaction.description,
            provider_state: interaction.provider_state,
            request: WireRequest {
                method: interaction.request.method,
                path: interaction.request.path,
                query,
                headers: interaction.request.headers,
                body: request_body,
                matching_rules: request_rules,
            },
            response: WireResponse {
                status: interaction.response.status,
                headers: interaction.response.headers,
                body: response_body,
                matching_rules: response_rules,
            },
        }
    }
}

impl From<WireInteraction> for Interaction {
    fn from(wire: WireInteraction) -> Self {
        let request_rules = &wire.request.matching_rules;
        let query = wire
            .request
            .query
            .iter()
            .map(|(name, value)| {
                let path = matcher::child_path("$.query", name);
                (
                    name.clone(),
                    rules::decode(&Value::String(value.clone()), &path, request_rules),
                )
            })
            .collect();
        let request_body = wire
            .request
            .body
            .as_ref()
            .map(|body| rules::decode(body, "$.body", request_rules));
        let response_body = wire
            .response
            .body
            .as_ref()
            .map(|body| rules::decode(body, "$.body", &wire.response.matching_rules));

        Interaction {
            description: wire.description,
            provider_state: wire.provider_state,
            request: InteractionRequest {
                method: wire.request.method.to_uppercase(),
                path: wire.request.path,
                query,
                headers: wire.request.headers,
                body: request_body,
            },
            response: InteractionResponse {
                status: wire.response.status,
                headers: wire.response.headers,
                body: response_body,
            },
        }
    }
}
