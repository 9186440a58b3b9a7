//! Replays contract documents against a running provider.
//!
//! Interactions are verified strictly in document order. Each one may first prime the provider
//! through its state setup endpoint, then its request is replayed and the response judged by the
//! matchers. Every interaction gets a result, a failing one never stops the run.

mod options;
mod result;

pub use options::{ContractSource, VerifierOptions};
pub use result::{
    InteractionFailure, InteractionResult, Outcome, TestResult, VerificationPayload,
    VerificationResult,
};

use crate::{
    broker::Broker,
    contract::{ContractDocument, Interaction},
    error::Error,
    http_client::{HttpClient, HyperHttpClient},
    util, RequestData, ResponseData,
};
use serde_json::json;
use std::{
    collections::{BTreeMap, BTreeSet},
    future::Future,
    sync::Arc,
    time::{Duration, Instant},
};
use url::Url;

#[derive(Debug, Clone)]
pub struct Verifier {
    http_client: Arc<dyn HttpClient + Send + Sync>,
}

impl Verifier {
    pub fn new() -> Self {
        Self {
            http_client: Arc::new(HyperHttpClient::new()),
        }
    }

    /// Client used for state setup, state discovery and the replayed requests.
    pub fn with_http_client(mut self, http_client: Arc<dyn HttpClient + Send + Sync>) -> Self {
        self.http_client = http_client;
        self
    }

    /// Blocking variant of [`verify_provider_async`](Verifier::verify_provider_async). It drives
    /// its own runtime, so it must not be called from within one.
    pub fn verify_provider(&self, options: &VerifierOptions) -> Result<VerificationResult, Error> {
        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(self.verify_provider_async(options))
    }

    /// Verifies every interaction of every configured document.
    ///
    /// Configuration problems (no documents, an unreadable document, a provider state that can't
    /// be set up, missing publishing settings) abort the run with an error. Everything else ends
    /// up in the returned result. The run timeout starts once the documents are loaded and the
    /// states checked, and stops before publishing.
    pub async fn verify_provider_async(
        &self,
        options: &VerifierOptions,
    ) -> Result<VerificationResult, Error> {
        check_publish_settings(options)?;
        let documents = self.load_documents(options).await?;
        check_state_setup(options, &documents)?;
        if let Some(discovery_url) = options.state_discovery_url() {
            self.check_supported_states(options, discovery_url, &documents)
                .await?;
        }

        let deadline = Instant::now() + options.run_timeout();
        let mut result = VerificationResult::default();

        for document in &documents {
            tracing::info!(
                consumer = %document.consumer.name,
                provider = %document.provider.name,
                interactions = document.interactions.len(),
                "verifying contract"
            );

            for interaction in &document.interactions {
                let remaining = deadline.saturating_duration_since(Instant::now());
                let failure = if remaining.is_zero() {
                    Some(InteractionFailure::TimedOut)
                } else {
                    tokio::time::timeout(
                        remaining,
                        self.verify_interaction(options, &document.consumer.name, interaction),
                    )
                    .await
                    .unwrap_or(Some(InteractionFailure::TimedOut))
                };

                match &failure {
                    None => tracing::info!(interaction = %interaction.description, "passed"),
                    Some(failure) => tracing::info!(
                        interaction = %interaction.description,
                        "failed: {}",
                        failure
                    ),
                }

                result.interaction_results.push(InteractionResult {
                    consumer: document.consumer.name.clone(),
                    provider: document.provider.name.clone(),
                    description: interaction.description.clone(),
                    provider_state: interaction.provider_state.clone(),
                    failure,
                });
            }
        }

        if options.publish_results() {
            self.publish(options, &documents, &mut result).await;
        }

        Ok(result)
    }

    async fn load_documents(
        &self,
        options: &VerifierOptions,
    ) -> Result<Vec<ContractDocument>, Error> {
        if options.contract_sources().is_empty() {
            return Err(Error::NoContractSources);
        }

        let mut documents = Vec::new();
        for source in options.contract_sources() {
            let document = match source {
                ContractSource::Path(path) => ContractDocument::load(path)?,
                ContractSource::Url(url) => {
                    let broker = match options.broker() {
                        Some(broker) => broker.clone(),
                        None => {
                            Broker::new(url.as_str()).with_http_client(self.http_client.clone())
                        }
                    };
                    with_timeout(options.request_timeout(), broker.fetch_contract(url)).await?
                }
            };

            if document.provider.name != options.provider() {
                tracing::warn!(
                    expected = options.provider(),
                    found = %document.provider.name,
                    "contract was written for another provider"
                );
            }
            documents.push(document);
        }

        Ok(documents)
    }

    async fn check_supported_states(
        &self,
        options: &VerifierOptions,
        discovery_url: &str,
        documents: &[ContractDocument],
    ) -> Result<(), Error> {
        let url = Url::parse(discovery_url)?;
        let (base_url, path) = util::split_url(&url);
        let mut request = RequestData::new("GET", path);
        request.query = util::parse_query(url.query());

        let response = self
            .send(options.request_timeout(), &base_url, &request)
            .await?;
        if !response.is_success() {
            return Err(Error::UnexpectedStatus {
                url: discovery_url.into(),
                status_code: response.status_code,
            });
        }
        let listed: BTreeMap<String, BTreeSet<String>> = serde_json::from_str(&response.body)?;

        for document in documents {
            let supported = listed.get(&document.consumer.name);
            let unsupported: Vec<String> = document
                .provider_states()
                .into_iter()
                .filter(|state| !supported.map_or(false, |states| states.contains(state)))
                .collect();

            if !unsupported.is_empty() {
                return Err(Error::UnsupportedProviderStates {
                    consumer: document.consumer.name.clone(),
                    states: unsupported,
                });
            }
        }

        Ok(())
    }

    async fn verify_interaction(
        &self,
        options: &VerifierOptions,
        consumer: &str,
        interaction: &Interaction,
    ) -> Option<InteractionFailure> {
        if let (Some(state), Some(setup_url)) =
            (&interaction.provider_state, options.state_setup_url())
        {
            if let Err(e) = self.set_up_state(options, setup_url, consumer, state).await {
                return Some(InteractionFailure::StateSetup(e.to_string()));
            }
        }

        let mut request = interaction.request.to_request_data();
        for filter in options.request_filters() {
            filter.apply(&mut request);
        }
        tracing::debug!(request = %request, interaction = %interaction.description, "replaying");

        match self
            .send(options.request_timeout(), options.provider_base_url(), &request)
            .await
        {
            Ok(response) => {
                let mismatches = interaction.response.match_response(&response);
                if mismatches.is_empty() {
                    None
                } else {
                    Some(InteractionFailure::Mismatches(mismatches))
                }
            }
            Err(e) => Some(InteractionFailure::Request(e.to_string())),
        }
    }

    async fn set_up_state(
        &self,
        options: &VerifierOptions,
        setup_url: &str,
        consumer: &str,
        state: &str,
    ) -> Result<(), Error> {
        let url = Url::parse(setup_url)?;
        let (base_url, path) = util::split_url(&url);
        let mut request = RequestData::new("POST", path);
        request.query = util::parse_query(url.query());
        request
            .headers
            .insert("Content-Type".into(), util::JSON_CONTENT_TYPE.into());
        request.body = json!({ "state": state, "consumer": consumer }).to_string();

        let response = self
            .send(options.request_timeout(), &base_url, &request)
            .await?;
        if !response.is_success() {
            return Err(Error::StateSetupRejected {
                state: state.into(),
                status_code: response.status_code,
            });
        }
        tracing::debug!(state, "provider state set up");

        Ok(())
    }

    async fn publish(
        &self,
        options: &VerifierOptions,
        documents: &[ContractDocument],
        result: &mut VerificationResult,
    ) {
        let (broker, version) = match (options.broker(), options.provider_version()) {
            (Some(broker), Some(version)) => (broker, version),
            _ => return,
        };
        let timeout = options.request_timeout();
        let mut errors = Vec::new();

        for tag in options.provider_tags() {
            let tagged =
                with_timeout(timeout, broker.tag_version(options.provider(), version, tag)).await;
            if let Err(e) = tagged {
                errors.push(format!(
                    "tagging {} {} as {}: {}",
                    options.provider(),
                    version,
                    tag,
                    e
                ));
            }
        }

        for document in documents {
            let payload = result.publish_payload(&document.consumer.name, version);
            let published = with_timeout(
                timeout,
                broker.publish_verification_result(
                    &document.consumer.name,
                    &document.provider.name,
                    &payload,
                ),
            )
            .await;

            match published {
                Ok(()) => tracing::info!(
                    consumer = %document.consumer.name,
                    version,
                    success = payload.success,
                    "verification results published"
                ),
                Err(e) => errors.push(format!("results for {}: {}", document.consumer.name, e)),
            }
        }

        for error in &errors {
            tracing::warn!("Publishing failed: {}", error);
        }
        result.publish_errors.extend(errors);
    }

    async fn send(
        &self,
        timeout: Duration,
        base_url: &str,
        request: &RequestData,
    ) -> Result<ResponseData, Error> {
        with_timeout(timeout, self.http_client.make_request(base_url, request)).await
    }
}

impl Default for Verifier {
    fn default() -> Self {
        Self::new()
    }
}

fn check_publish_settings(options: &VerifierOptions) -> Result<(), Error> {
    if !options.publish_results() {
        return Ok(());
    }
    if options.broker().is_none() {
        return Err(Error::MissingBroker);
    }
    if options.provider_version().is_none() {
        return Err(Error::MissingProviderVersion);
    }

    Ok(())
}

fn check_state_setup(
    options: &VerifierOptions,
    documents: &[ContractDocument],
) -> Result<(), Error> {
    if options.state_setup_url().is_some() {
        return Ok(());
    }

    let stateful = documents
        .iter()
        .flat_map(|document| document.interactions.iter())
        .find_map(|interaction| {
            interaction
                .provider_state
                .as_ref()
                .map(|state| (interaction, state))
        });

    match stateful {
        Some((interaction, state)) => Err(Error::MissingStateSetupUrl {
            description: interaction.description.clone(),
            state: state.clone(),
        }),
        None => Ok(()),
    }
}

async fn with_timeout<T, F>(timeout: Duration, future: F) -> Result<T, Error>
where
    F: Future<Output = Result<T, Error>>,
{
    tokio::time::timeout(timeout, future)
        .await
        .map_err(|_| Error::Timeout(timeout))?
}
