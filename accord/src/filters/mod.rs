//! Rewrites applied to every request the verifier replays against a provider, e.g. to inject
//! credentials the contract can't carry.

mod add_header_filter;
mod body_replace_filter;
mod remove_headers_filter;

use crate::RequestData;
use add_header_filter::AddHeaderFilter;
use body_replace_filter::BodyReplaceFilter;
use regex::Regex;
use remove_headers_filter::{RemoveHeadersFilter, RemoveHeadersRegexFilter};
use std::{collections::HashMap, fmt::Debug};

pub trait BodyFilter: Debug {
    fn apply(&self, body: &mut String);
}

pub trait HeadersFilter: Debug {
    fn apply(&self, headers: &mut HashMap<String, String>);
}

#[derive(Debug)]
enum FilterType {
    Body(Box<dyn BodyFilter + Send + Sync>),
    Headers(Box<dyn HeadersFilter + Send + Sync>),
}

#[derive(Debug)]
pub struct RequestFilter {
    filter_type: FilterType,
}

impl RequestFilter {
    fn from_filter_type(filter_type: FilterType) -> Self {
        Self { filter_type }
    }

    pub fn apply(&self, request_data: &mut RequestData) {
        match &self.filter_type {
            FilterType::Headers(hf) => {
                hf.apply(&mut request_data.headers);
            }
            FilterType::Body(bf) => {
                bf.apply(&mut request_data.body);
            }
        }
    }
}

pub struct FiltersBuilder {
    filters: Vec<FilterType>,
}

impl FiltersBuilder {
    pub(crate) fn new() -> Self {
        Self {
            filters: Vec::new(),
        }
    }

    pub fn remove_headers<S: Into<String>, I: IntoIterator<Item = S>>(
        &mut self,
        headers: I,
    ) -> &mut Self {
        self.add_headers_filter(RemoveHeadersFilter::new(headers))
    }

    pub fn remove_headers_regex<I: IntoIterator<Item = Regex>>(
        &mut self,
        patterns: I,
    ) -> &mut Self {
        self.add_headers_filter(RemoveHeadersRegexFilter::new(patterns))
    }

    /// Sets a header, replacing any value the contract declares for it.
    pub fn add_header<S1: Into<String>, S2: Into<String>>(
        &mut self,
        header_name: S1,
        header_value: S2,
    ) -> &mut Self {
        self.add_headers_filter(AddHeaderFilter::new(header_name, header_value))
    }

    pub fn body_replace<S1: Into<String>, S2: Into<String>>(
        &mut self,
        text: S1,
        replacement: S2,
    ) -> &mut Self {
        self.add_body_filter(BodyReplaceFilter::text(text, replacement))
    }

    pub fn body_replace_regex<S: Into<String>>(
        &mut self,
        pattern: Regex,
        replacement: S,
    ) -> &mut Self {
        self.add_body_filter(BodyReplaceFilter::pattern(pattern, replacement))
    }

    pub fn add_headers_filter<HF: HeadersFilter + Send + Sync + 'static>(
        &mut self,
        filter: HF,
    ) -> &mut Self {
        self.filters.push(FilterType::Headers(Box::new(filter)));
        self
    }

    pub fn add_body_filter<BF: BodyFilter + Send + Sync + 'static>(
        &mut self,
        filter: BF,
    ) -> &mut Self {
        self.filters.push(FilterType::Body(Box::new(filter)));
        self
    }

    pub fn into_request_filters(self) -> Vec<RequestFilter> {
        self.filters
            .into_iter()
            .map(RequestFilter::from_filter_type)
            .collect()
    }
}

impl Default for FiltersBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filters_apply_in_order() {
        let mut builder = FiltersBuilder::new();
        builder
            .remove_headers(vec!["X-Trace"])
            .remove_headers_regex(vec![Regex::new("^x-debug-").unwrap()])
            .add_header("Authorization", "Bearer token")
            .body_replace("old", "new")
            .body_replace_regex(Regex::new("[0-9]+").unwrap(), "N");
        let filters = builder.into_request_filters();

        let mut request = RequestData::new("POST", "/provider");
        request.headers.insert("x-trace".into(), "1".into());
        request.headers.insert("x-debug-id".into(), "2".into());
        request.headers.insert("authorization".into(), "stale".into());
        request.body = "old 42 and 7".into();
        let mut untouched = RequestData::new("GET", "/provider");

        for filter in &filters {
            filter.apply(&mut request);
        }

        let mut expected = HashMap::new();
        expected.insert("Authorization".to_string(), "Bearer token".to_string());
        assert_eq!(request.headers, expected);
        assert_eq!(request.body, "new N and N");

        let mut empty_text = FiltersBuilder::new();
        empty_text.body_replace("", "never");
        for filter in empty_text.into_request_filters() {
            filter.apply(&mut untouched);
        }
        assert!(untouched.body.is_empty());
    }
}
