use crate::{error::Error, util, RequestData, ResponseData};
use async_trait::async_trait;
use hyper::{body, header, Body, Request, Response};
use hyper_tls::HttpsConnector;
use std::fmt::Debug;

const USER_AGENT: &str = concat!("accord/", env!("CARGO_PKG_VERSION"));

/// Transport used by the verifier and the broker client. `base_url` is `scheme://host[:port]`
/// with an optional path prefix, the request carries the rest of the path and the query.
#[async_trait]
pub trait HttpClient: Debug {
    async fn make_request(
        &self,
        base_url: &str,
        request_data: &RequestData,
    ) -> Result<ResponseData, Error>;
}

#[derive(Debug, Clone)]
pub struct HyperHttpClient {
    user_agent: String,
}

impl HyperHttpClient {
    pub fn new() -> Self {
        Self {
            user_agent: USER_AGENT.into(),
        }
    }

    /// Sent unless the request declares its own `User-Agent`.
    pub fn with_user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    fn build_request(
        &self,
        url: &str,
        request_data: &RequestData,
    ) -> Result<Request<Body>, Error> {
        let mut request_builder = Request::builder()
            .uri(url)
            .method(request_data.method.as_str());

        if let Some(headers_mut) = request_builder.headers_mut() {
            util::put_headers(
                headers_mut,
                request_data
                    .headers
                    .iter()
                    .filter(|(header_name, _)| !header_name.eq_ignore_ascii_case("host")),
            )?;
            if !headers_mut.contains_key(header::USER_AGENT) {
                headers_mut.insert(header::USER_AGENT, self.user_agent.parse()?);
            }
        }

        Ok(request_builder.body(request_data.body.clone().into())?)
    }

    async fn read_response(response: Response<Body>) -> Result<ResponseData, Error> {
        let status_code = response.status().as_u16();
        let headers = util::extract_headers(response.headers());
        let body = body::to_bytes(response.into_body()).await?;

        Ok(ResponseData {
            status_code,
            headers,
            body: String::from_utf8_lossy(&body).into(),
        })
    }
}

#[async_trait]
impl HttpClient for HyperHttpClient {
    async fn make_request(
        &self,
        base_url: &str,
        request_data: &RequestData,
    ) -> Result<ResponseData, Error> {
        let url = format!("{}{}", base_url.trim_end_matches('/'), request_data.uri());
        let request = self.build_request(&url, request_data)?;

        // one client per request: a pooled connection must not outlive the runtime driving it
        let client = hyper::Client::builder().build::<_, Body>(HttpsConnector::new());
        let response = Self::read_response(client.request(request).await?).await?;

        tracing::debug!(
            method = %request_data.method,
            %url,
            status_code = response.status_code,
            "received response"
        );

        Ok(response)
    }
}

impl Default for HyperHttpClient {
    fn default() -> Self {
        Self::new()
    }
}
