use crate::{
    contract::ContractDocument,
    error::Error,
    http_client::{HttpClient, HyperHttpClient},
    util, RequestData, ResponseData,
};
use serde::Serialize;
use std::sync::Arc;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerCredentials {
    pub username: String,
    pub password: String,
}

/// Client for a remote store of contracts and verification results.
#[derive(Debug, Clone)]
pub struct Broker {
    base_url: String,
    credentials: Option<BrokerCredentials>,
    http_client: Arc<dyn HttpClient + Send + Sync>,
}

impl Broker {
    pub fn new<S: Into<String>>(base_url: S) -> Self {
        Self {
            base_url: base_url.into(),
            credentials: None,
            http_client: Arc::new(HyperHttpClient::new()),
        }
    }

    pub fn with_credentials<U: Into<String>, P: Into<String>>(
        mut self,
        username: U,
        password: P,
    ) -> Self {
        self.credentials = Some(BrokerCredentials {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    pub fn with_http_client(mut self, http_client: Arc<dyn HttpClient + Send + Sync>) -> Self {
        self.http_client = http_client;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetches a contract from an absolute url or from a path relative to the broker.
    pub async fn fetch_contract(&self, url: &str) -> Result<ContractDocument, Error> {
        let url = match Url::parse(url) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(&self.base_url)?.join(url)?,
            Err(e) => return Err(e.into()),
        };

        let response = self.send("GET", url, None).await?;

        ContractDocument::from_json(&response.body)
    }

    /// Publishes `document` as `consumer_version` of its consumer, then tags that version.
    pub async fn publish_contract(
        &self,
        document: &ContractDocument,
        consumer_version: &str,
        tags: &[String],
    ) -> Result<(), Error> {
        let url = self.url(&[
            "pacts",
            "provider",
            &document.provider.name,
            "consumer",
            &document.consumer.name,
            "version",
            consumer_version,
        ])?;
        self.send("PUT", url, Some(document.to_json()?)).await?;
        tracing::info!(
            consumer = %document.consumer.name,
            provider = %document.provider.name,
            version = consumer_version,
            "contract published"
        );

        for tag in tags {
            self.tag_version(&document.consumer.name, consumer_version, tag)
                .await?;
        }

        Ok(())
    }

    pub async fn tag_version(
        &self,
        pacticipant: &str,
        version: &str,
        tag: &str,
    ) -> Result<(), Error> {
        let url = self.url(&["pacticipants", pacticipant, "versions", version, "tags", tag])?;
        self.send("PUT", url, Some("{}".into())).await?;
        tracing::debug!(pacticipant, version, tag, "version tagged");

        Ok(())
    }

    pub async fn publish_verification_result<T: Serialize + Sync>(
        &self,
        consumer: &str,
        provider: &str,
        result: &T,
    ) -> Result<(), Error> {
        let url = self.url(&[
            "pacts",
            "provider",
            provider,
            "consumer",
            consumer,
            "verification-results",
        ])?;
        self.send("POST", url, Some(serde_json::to_string(result)?))
            .await?;

        Ok(())
    }

    fn url(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url = Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|_| Error::InvalidBrokerUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(segments);

        Ok(url)
    }

    async fn send(
        &self,
        method: &str,
        url: Url,
        body: Option<String>,
    ) -> Result<ResponseData, Error> {
        let (base_url, path) = util::split_url(&url);
        let mut request = RequestData::new(method, path);
        request.query = util::parse_query(url.query());
        request
            .headers
            .insert("Accept".into(), "application/hal+json, application/json".into());

        if let Some(credentials) = &self.credentials {
            request.headers.insert(
                "Authorization".into(),
                util::basic_auth(&credentials.username, &credentials.password),
            );
        }
        if let Some(body) = body {
            request
                .headers
                .insert("Content-Type".into(), "application/json".into());
            request.body = body;
        }

        let response = self.http_client.make_request(&base_url, &request).await?;
        if !response.is_success() {
            return Err(Error::UnexpectedStatus {
                url: url.to_string(),
                status_code: response.status_code,
            });
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_are_percent_encoded_below_the_base() {
        let broker = Broker::new("https://broker.example.com/base/");

        let url = broker
            .url(&["pacticipants", "Our Little Consumer", "versions", "1.0.0"])
            .unwrap();

        assert_eq!(
            url.as_str(),
            "https://broker.example.com/base/pacticipants/Our%20Little%20Consumer/versions/1.0.0"
        );
    }
}
