use crate::error::Error;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hyper::{
    header::{HeaderName, HeaderValue},
    HeaderMap,
};
use std::collections::{BTreeMap, HashMap};
use url::{form_urlencoded, Position, Url};

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

pub fn extract_headers(header_map: &HeaderMap) -> HashMap<String, String> {
    // it currently ignores header values with opaque characters
    header_map
        .iter()
        .map(|(k, v)| (String::from(k.as_str()), v.to_str()))
        .filter_map(|(key, value)| value.ok().map(|v| (key, String::from(v))))
        .collect::<HashMap<_, _>>()
}

pub fn put_headers<'a, I: IntoIterator<Item = (&'a String, &'a String)>>(
    header_map: &mut HeaderMap<HeaderValue>,
    headers: I,
) -> Result<(), Error> {
    for (key, value) in headers {
        let header_name = HeaderName::from_lowercase(key.to_lowercase().as_bytes())?;
        let header_value = HeaderValue::from_str(value)?;
        header_map.append(header_name, header_value);
    }

    Ok(())
}

pub fn find_header<'a>(headers: &'a HashMap<String, String>, name: &str) -> Option<&'a String> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value)
}

/// Repeated keys keep the last value.
pub fn parse_query(query: Option<&str>) -> BTreeMap<String, String> {
    query
        .map(|query| {
            form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect::<BTreeMap<_, _>>()
        })
        .unwrap_or_default()
}

pub fn encode_query(query: &BTreeMap<String, String>) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(query.iter())
        .finish()
}

/// Splits an absolute url into the `scheme://host:port` part and the path, percent encoded.
pub fn split_url(url: &Url) -> (String, String) {
    (
        url[..Position::BeforePath].to_string(),
        url.path().to_string(),
    )
}

pub fn basic_auth<U: AsRef<str>, P: AsRef<str>>(username: U, password: P) -> String {
    format!(
        "Basic {}",
        STANDARD.encode(format!("{}:{}", username.as_ref(), password.as_ref()))
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_is_encoded_and_parsed_back() {
        let mut query = BTreeMap::new();
        query.insert("validDate".to_string(), "2013-08-16T15:31:20+10:00".to_string());

        let encoded = encode_query(&query);

        assert_eq!(encoded, "validDate=2013-08-16T15%3A31%3A20%2B10%3A00");
        assert_eq!(parse_query(Some(&encoded)), query);
        assert!(parse_query(None).is_empty());
    }

    #[test]
    fn test_split_url() {
        let url = Url::parse("http://localhost:9292/pacts/provider/Our%20Provider").unwrap();

        assert_eq!(
            split_url(&url),
            (
                "http://localhost:9292".to_string(),
                "/pacts/provider/Our%20Provider".to_string()
            )
        );
    }

    #[test]
    fn test_basic_auth() {
        assert_eq!(basic_auth("user", "pass"), "Basic dXNlcjpwYXNz");
    }
}
