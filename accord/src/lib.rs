mod broker;
mod contract;
mod data;
mod error;
mod filters;
mod http_client;
mod ledger;
mod matcher;
mod mock_configuration;
mod mock_server;
mod runner;
mod state_coordinator;
mod util;
mod verifier;

pub use accord_codegen::contract_test;
pub use broker::{Broker, BrokerCredentials};
pub use contract::{
    ContractDocument, Interaction, InteractionBuilder, InteractionRequest, InteractionResponse,
    Metadata, PactSpecification, Pacticipant, SpecVersion,
};
pub use data::{RequestData, ResponseData};
pub use error::Error;
pub use filters::{BodyFilter, FiltersBuilder, HeadersFilter, RequestFilter};
pub use http_client::{HttpClient, HyperHttpClient};
pub use ledger::InteractionLedger;
pub use matcher::{
    match_body, match_headers, match_query, match_value, MatchResult, Matcher, Mismatch,
    MismatchKind,
};
pub use mock_configuration::MockServerConfig;
pub use mock_server::{MockServer, MockServerState, MockVerificationReport};
pub use runner::{serve, ListenerHandle, RequestHandler};
pub use state_coordinator::{StateCoordinator, SETUP_PATH, STATES_PATH};
pub use util::JSON_CONTENT_TYPE;
pub use verifier::{
    ContractSource, InteractionFailure, InteractionResult, Outcome, TestResult,
    VerificationPayload, VerificationResult, Verifier, VerifierOptions,
};
