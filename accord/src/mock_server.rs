use crate::{
    contract::{ContractDocument, Interaction},
    error::Error,
    ledger::InteractionLedger,
    runner::{ListenerHandle, RequestHandler},
    MockServerConfig, RequestData, ResponseData,
};
use serde_json::json;
use std::{
    fmt::{self, Display},
    mem,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex, RwLock,
    },
};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum MockServerState {
    Idle,
    Listening,
    Recording,
    Verified,
    Failed,
    Finalized,
}

#[derive(Debug)]
struct RegisteredInteraction {
    interaction: Interaction,
    invocations: AtomicUsize,
}

#[derive(Debug, Default)]
struct Registry {
    interactions: RwLock<Vec<RegisteredInteraction>>,
    unexpected_requests: Mutex<Vec<RequestData>>,
}

impl Registry {
    fn respond(&self, request: RequestData) -> Result<ResponseData, Error> {
        let interactions = self.interactions.read()?;
        let mut diffs = Vec::new();
        let mut candidates = Vec::new();

        for registered in interactions.iter() {
            let mismatches = registered.interaction.request.match_request(&request);
            if mismatches.is_empty() {
                candidates.push(registered);
            } else {
                diffs.push(json!({
                    "description": registered.interaction.description,
                    "mismatches": mismatches,
                }));
            }
        }

        // claiming an unused interaction must be a single atomic step under the shared read lock
        let chosen = candidates
            .iter()
            .find(|registered| {
                registered
                    .invocations
                    .compare_exchange(0, 1, Ordering::SeqCst, Ordering::SeqCst)
                    .is_ok()
            })
            .or_else(|| {
                let first = candidates.first()?;
                first.invocations.fetch_add(1, Ordering::SeqCst);
                Some(first)
            });

        if let Some(registered) = chosen {
            tracing::debug!(
                request = %request,
                interaction = %registered.interaction.description,
                "matched interaction"
            );
            return Ok(registered.interaction.response.to_response_data());
        }

        tracing::warn!(request = %request, "No interaction found");
        let body = json!({
            "message": format!("No interaction found for {}", request),
            "interactionDiffs": diffs,
        });
        self.unexpected_requests.lock()?.push(request);

        Ok(ResponseData::new(500).with_json_body(&body))
    }
}

impl RequestHandler for Registry {
    fn handle(&self, request: RequestData) -> ResponseData {
        self.respond(request).unwrap_or_else(|e| {
            ResponseData::new(500).with_json_body(&json!({ "message": e.to_string() }))
        })
    }
}

/// Everything `verify` found wrong with the traffic a mock server received.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MockVerificationReport {
    pub unexpected_requests: Vec<RequestData>,
    pub unused_interactions: Vec<String>,
}

impl MockVerificationReport {
    pub fn is_ok(&self) -> bool {
        self.unexpected_requests.is_empty() && self.unused_interactions.is_empty()
    }
}

impl Display for MockVerificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for request in &self.unexpected_requests {
            writeln!(f, "  unexpected request: {}", request)?;
        }
        for description in &self.unused_interactions {
            writeln!(f, "  interaction never invoked: {}", description)?;
        }

        Ok(())
    }
}

/// An in-process HTTP endpoint standing in for the provider during a consumer test run.
///
/// The listening socket lives as long as the server: it's released by
/// [`finalize`](MockServer::finalize) or when the server is dropped, whichever comes first.
#[derive(Debug)]
pub struct MockServer {
    configuration: MockServerConfig,
    state: MockServerState,
    registry: Arc<Registry>,
    listener: Option<ListenerHandle>,
    ledger: InteractionLedger,
}

impl MockServer {
    pub fn new(configuration: MockServerConfig) -> Self {
        let ledger = InteractionLedger::new(configuration.spec_version());

        Self {
            configuration,
            state: MockServerState::Idle,
            registry: Arc::new(Registry::default()),
            listener: None,
            ledger,
        }
    }

    /// Creates a server and starts listening right away.
    pub fn start(configuration: MockServerConfig) -> Result<Self, Error> {
        let mut server = Self::new(configuration);
        server.setup()?;

        Ok(server)
    }

    pub fn setup(&mut self) -> Result<(), Error> {
        self.expect_state("set up", &[MockServerState::Idle])?;

        let listener = ListenerHandle::spawn(
            (self.configuration.host(), self.configuration.port()),
            self.registry.clone(),
        )?;
        tracing::info!(
            consumer = self.configuration.consumer(),
            provider = self.configuration.provider(),
            url = %listener.base_url(),
            "mock server listening"
        );

        self.listener = Some(listener);
        self.state = MockServerState::Listening;

        Ok(())
    }

    pub fn state(&self) -> MockServerState {
        self.state
    }

    /// Base url of the listening socket, e.g. `http://127.0.0.1:43121`.
    pub fn url(&self) -> String {
        match &self.listener {
            Some(listener) => listener.base_url(),
            None => format!(
                "http://{}:{}",
                self.configuration.host(),
                self.configuration.port()
            ),
        }
    }

    pub fn ledger(&self) -> &InteractionLedger {
        &self.ledger
    }

    pub fn add_interaction(&mut self, interaction: Interaction) -> Result<(), Error> {
        self.expect_state(
            "add an interaction",
            &[MockServerState::Listening, MockServerState::Recording],
        )?;

        tracing::debug!(interaction = %interaction.description, "registering interaction");
        self.registry
            .interactions
            .write()?
            .push(RegisteredInteraction {
                interaction,
                invocations: AtomicUsize::new(0),
            });
        self.state = MockServerState::Recording;

        Ok(())
    }

    /// Checks that every registered interaction was invoked and no unexpected request arrived.
    /// Verified interactions are moved into the ledger.
    pub fn verify(&mut self) -> Result<(), Error> {
        self.expect_state(
            "verify",
            &[MockServerState::Listening, MockServerState::Recording],
        )?;

        let registered = mem::take(&mut *self.registry.interactions.write()?);
        let report = MockVerificationReport {
            unexpected_requests: mem::take(&mut *self.registry.unexpected_requests.lock()?),
            unused_interactions: registered
                .iter()
                .filter(|registered| registered.invocations.load(Ordering::SeqCst) == 0)
                .map(|registered| registered.interaction.description.clone())
                .collect(),
        };

        if !report.is_ok() {
            tracing::warn!("Mock server verification failed:\n{}", report);
            self.state = MockServerState::Failed;
            return Err(Error::MockVerificationFailed(report));
        }

        for registered in registered {
            self.ledger.add_interaction(registered.interaction);
        }
        self.state = MockServerState::Verified;

        Ok(())
    }

    /// Releases the socket and turns the ledger into a contract document, written to the pact
    /// directory when one is configured.
    pub fn finalize(&mut self) -> Result<ContractDocument, Error> {
        self.expect_state(
            "finalize",
            &[
                MockServerState::Listening,
                MockServerState::Recording,
                MockServerState::Verified,
                MockServerState::Failed,
            ],
        )?;

        if let Some(mut listener) = self.listener.take() {
            listener.shutdown();
        }
        self.state = MockServerState::Finalized;

        let document = self
            .ledger
            .to_document(self.configuration.consumer(), self.configuration.provider())?;

        if let Some(pact_dir) = self.configuration.pact_dir() {
            let path = document.write_to_dir(pact_dir)?;
            tracing::info!(path = %path.display(), "contract written");
        }

        Ok(document)
    }

    /// Verifies outstanding interactions, then finalizes.
    pub fn verify_and_finalize(&mut self) -> Result<ContractDocument, Error> {
        if matches!(
            self.state,
            MockServerState::Listening | MockServerState::Recording
        ) {
            if let Err(e) = self.verify() {
                if let Some(mut listener) = self.listener.take() {
                    listener.shutdown();
                }
                self.state = MockServerState::Finalized;
                return Err(e);
            }
        }

        self.finalize()
    }

    fn expect_state(
        &self,
        operation: &'static str,
        allowed: &[MockServerState],
    ) -> Result<(), Error> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(Error::InvalidState {
                operation,
                state: self.state,
            })
        }
    }
}
