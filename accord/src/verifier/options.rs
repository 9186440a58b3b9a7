use crate::{
    broker::Broker,
    filters::{FiltersBuilder, RequestFilter},
};
use std::{path::PathBuf, time::Duration};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_RUN_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractSource {
    Path(PathBuf),
    /// Absolute, or relative to the configured broker.
    Url(String),
}

#[derive(Debug)]
pub struct VerifierOptions {
    provider: String,
    provider_base_url: String,
    contract_sources: Vec<ContractSource>,
    state_setup_url: Option<String>,
    state_discovery_url: Option<String>,
    broker: Option<Broker>,
    publish_results: bool,
    provider_version: Option<String>,
    provider_tags: Vec<String>,
    request_timeout: Duration,
    run_timeout: Duration,
    request_filters: Vec<RequestFilter>,
}

impl VerifierOptions {
    pub fn new<P: Into<String>, U: Into<String>>(provider: P, provider_base_url: U) -> Self {
        Self {
            provider: provider.into(),
            provider_base_url: provider_base_url.into(),
            contract_sources: Vec::new(),
            state_setup_url: None,
            state_discovery_url: None,
            broker: None,
            publish_results: false,
            provider_version: None,
            provider_tags: Vec::new(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            run_timeout: DEFAULT_RUN_TIMEOUT,
            request_filters: Vec::new(),
        }
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn provider_base_url(&self) -> &str {
        &self.provider_base_url
    }

    pub fn add_contract_path<P: Into<PathBuf>>(&mut self, path: P) {
        self.contract_sources.push(ContractSource::Path(path.into()));
    }

    pub fn add_contract_url<S: Into<String>>(&mut self, url: S) {
        self.contract_sources.push(ContractSource::Url(url.into()));
    }

    pub fn contract_sources(&self) -> &[ContractSource] {
        &self.contract_sources
    }

    pub fn set_state_setup_url<S: Into<String>>(&mut self, url: S) {
        self.state_setup_url = Some(url.into());
    }

    pub fn state_setup_url(&self) -> Option<&str> {
        self.state_setup_url.as_deref()
    }

    pub fn set_state_discovery_url<S: Into<String>>(&mut self, url: S) {
        self.state_discovery_url = Some(url.into());
    }

    pub fn state_discovery_url(&self) -> Option<&str> {
        self.state_discovery_url.as_deref()
    }

    /// Broker used to fetch relative contract urls and, when enabled, to publish results.
    pub fn set_broker(&mut self, broker: Broker) {
        self.broker = Some(broker);
    }

    pub fn broker(&self) -> Option<&Broker> {
        self.broker.as_ref()
    }

    pub fn set_publish_results(&mut self, value: bool) {
        self.publish_results = value;
    }

    pub fn publish_results(&self) -> bool {
        self.publish_results
    }

    pub fn set_provider_version<S: Into<String>>(&mut self, version: S) {
        self.provider_version = Some(version.into());
    }

    pub fn provider_version(&self) -> Option<&str> {
        self.provider_version.as_deref()
    }

    pub fn add_provider_tag<S: Into<String>>(&mut self, tag: S) {
        self.provider_tags.push(tag.into());
    }

    pub fn provider_tags(&self) -> &[String] {
        &self.provider_tags
    }

    /// Applies to every state setup, replayed request and broker call on its own.
    pub fn set_request_timeout(&mut self, timeout: Duration) {
        self.request_timeout = timeout;
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Bounds state setup and replay: interactions still pending when the run exceeds this fail
    /// as timed out. Loading contracts, state discovery and publishing are bounded per call by the
    /// request timeout only, so the results of a timed out run are still published.
    pub fn set_run_timeout(&mut self, timeout: Duration) {
        self.run_timeout = timeout;
    }

    pub fn run_timeout(&self) -> Duration {
        self.run_timeout
    }

    pub fn add_request_filters<F: FnOnce(&mut FiltersBuilder) -> &mut FiltersBuilder>(
        &mut self,
        func: F,
    ) {
        let mut filters = FiltersBuilder::new();
        let _ = func(&mut filters);
        self.request_filters
            .extend(filters.into_request_filters());
    }

    pub fn request_filters(&self) -> &[RequestFilter] {
        &self.request_filters
    }
}
