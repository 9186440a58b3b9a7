use crate::data::{ErrorPayload, ProviderData, ProviderPayload};
use crate::error::Error;
use chrono::{SecondsFormat, Utc};
use reqwest::{self, StatusCode};
type ReqwestClient = reqwest::blocking::Client;

const DEFAULT_DOMAIN_NAME: &str = "http://localhost:8080";

/// Builder used to build a ProviderClient instance
#[derive(Debug, Clone, Default)]
pub struct ProviderClientBuilder {
    domain_name: Option<String>,
    http_client: Option<ReqwestClient>,
}

impl ProviderClientBuilder {
    /// Create a new ProviderClientBuilder instance.
    pub fn new() -> Self {
        Self {
            domain_name: None,
            http_client: None,
        }
    }

    /// Use the given domain_name when building a ProviderClient instance.
    ///
    /// # Arguments
    /// `domain_name` - scheme, host and port of the provider, e.g. `http://localhost:8080`.
    ///
    /// # Returns
    /// This builder.
    pub fn with_domain_name<T: Into<String>>(mut self, domain_name: T) -> Self {
        self.domain_name = Some(domain_name.into());
        self
    }

    /// Use the given blocking reqwest client when building a ProviderClient instance.
    ///
    /// # Arguments
    /// `client` - a pre-configured blocking reqwest client.
    ///
    /// # Returns
    /// This builder.
    pub fn with_http_client(mut self, client: ReqwestClient) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Consume the builder and create a ProviderClient instance using all of the previously
    /// configured values or their defaults.
    ///
    /// # Returns
    /// A ProviderClient instance.
    pub fn build(mut self) -> ProviderClient {
        ProviderClient {
            http: self.http_client.take().unwrap_or_default(),
            domain_name: self
                .domain_name
                .take()
                .unwrap_or_else(|| String::from(DEFAULT_DOMAIN_NAME)),
        }
    }
}

/// Client of the date count provider.
#[derive(Default, Debug, Clone)]
pub struct ProviderClient {
    http: ReqwestClient,
    domain_name: String,
}

impl ProviderClient {
    /// Create a ProviderClient for the default domain with the default reqwest client.
    pub fn new() -> Self {
        ProviderClient {
            http: ReqwestClient::new(),
            domain_name: String::from(DEFAULT_DOMAIN_NAME),
        }
    }

    /// Gets the provider's count for a date.
    ///
    /// # Arguments
    /// `valid_date` - an ISO-8601 timestamp with an explicit offset, e.g.
    ///     `2013-08-16T15:31:20+10:00`.
    ///
    /// # Returns
    /// The count and the date the provider vouches for. `Error::NoData` when the provider has
    /// nothing to report, `Error::Rejected` when it refuses the request.
    pub fn fetch_provider_data<T: AsRef<str>>(
        &self,
        valid_date: T,
    ) -> Result<ProviderData, Error> {
        let request = self
            .http
            .get(self.provider_url())
            .query(&[("validDate", valid_date.as_ref())]);

        Self::read_response(request.send()?)
    }

    /// Same as [`fetch_provider_data`](ProviderClient::fetch_provider_data) for the current
    /// time.
    pub fn fetch_current_provider_data(&self) -> Result<ProviderData, Error> {
        self.fetch_provider_data(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, false))
    }

    /// Calls the provider without a date, which it is expected to refuse.
    pub fn fetch_undated_provider_data(&self) -> Result<ProviderData, Error> {
        Self::read_response(self.http.get(self.provider_url()).send()?)
    }

    fn provider_url(&self) -> String {
        format!("{}/provider", self.domain_name.trim_end_matches('/'))
    }

    fn read_response(response: reqwest::blocking::Response) -> Result<ProviderData, Error> {
        match response.status() {
            StatusCode::NOT_FOUND => Err(Error::NoData),
            StatusCode::BAD_REQUEST => {
                let payload: ErrorPayload = serde_json::from_str(&response.text()?)?;
                Err(Error::Rejected(payload.error))
            }
            _ => {
                let text = response.error_for_status()?.text()?;
                let payload: ProviderPayload = serde_json::from_str(&text)?;
                Ok(payload.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use accord::{ListenerHandle, RequestData, RequestHandler, ResponseData};
    use serde_json::json;
    use std::sync::Arc;

    const DATE: &str = "2013-08-16T15:31:20+10:00";

    fn stub(status: u16, body: serde_json::Value) -> ListenerHandle {
        let handler: Arc<dyn RequestHandler> = Arc::new(move |request: RequestData| {
            match request.path.as_str() {
                "/provider" => ResponseData::new(status).with_json_body(&body),
                _ => ResponseData::new(418),
            }
        });

        ListenerHandle::spawn("127.0.0.1:0", handler).unwrap()
    }

    #[test]
    fn test_count_and_date_are_read_from_the_payload() {
        let listener = stub(200, json!({"test": "NO", "validDate": DATE, "count": 100}));
        let client = ProviderClientBuilder::new()
            .with_domain_name(listener.base_url())
            .build();

        let data = client.fetch_current_provider_data().unwrap();

        assert_eq!(
            data,
            ProviderData {
                count: 100,
                date: DATE.into()
            }
        );
    }

    #[test]
    fn test_rejection_carries_the_providers_reason() {
        let listener = stub(400, json!({"error": "validDate is required"}));
        let client = ProviderClientBuilder::new()
            .with_domain_name(listener.base_url())
            .build();

        match client.fetch_undated_provider_data() {
            Err(Error::Rejected(reason)) => assert_eq!(reason, "validDate is required"),
            other => panic!("The call should be rejected, got {:?}", other),
        }
    }

    #[test]
    fn test_server_errors_are_reported() {
        let listener = stub(503, json!({}));
        let client = ProviderClientBuilder::new()
            .with_domain_name(listener.base_url())
            .build();

        assert!(matches!(
            client.fetch_provider_data(DATE),
            Err(Error::ReqwestError(_))
        ));
    }
}
