use crate::mock_server::{MockServerState, MockVerificationReport};
use hyper::http;
use std::{io, sync};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IoError: {0}")]
    IoError(#[from] io::Error),
    #[error("Json error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Hyper error: {0}")]
    HyperError(#[from] hyper::Error),
    #[error("Http Error: {0}")]
    HttpError(#[from] http::Error),
    #[error("Invalid url: {0}")]
    UrlError(#[from] url::ParseError),
    #[error("The lock was poisoned")]
    PoisonedLock,
    #[error("Invalid header name")]
    InvalidHeaderName,
    #[error("Invalid header value")]
    InvalidHeaderValue,
    #[error("Invalid body")]
    InvalidBody,
    #[error("Invalid matcher /{pattern}/: {reason}")]
    InvalidMatcher { pattern: String, reason: String },
    #[error("No interactions were recorded, refusing to write an empty contract")]
    EmptyLedger,
    #[error("Cannot {operation} while the mock server is {state:?}")]
    InvalidState {
        operation: &'static str,
        state: MockServerState,
    },
    #[error("Mock server verification failed:\n{0}")]
    MockVerificationFailed(MockVerificationReport),
    #[error("Interaction \"{description}\" declares provider state \"{state}\" but no state setup url is configured")]
    MissingStateSetupUrl { description: String, state: String },
    #[error("Provider doesn't list states {states:?} for consumer \"{consumer}\"")]
    UnsupportedProviderStates {
        consumer: String,
        states: Vec<String>,
    },
    #[error("State setup for \"{state}\" was rejected with status {status_code}")]
    StateSetupRejected { state: String, status_code: u16 },
    #[error("A provider version is required to publish verification results")]
    MissingProviderVersion,
    #[error("Publishing verification results requires a broker")]
    MissingBroker,
    #[error("No contract sources were configured")]
    NoContractSources,
    #[error("{0} can't be used as a broker url")]
    InvalidBrokerUrl(String),
    #[error("{url} answered with status {status_code}")]
    UnexpectedStatus { url: String, status_code: u16 },
    #[error("No response within {0:?}")]
    Timeout(std::time::Duration),
}

impl<T> From<sync::PoisonError<T>> for Error {
    fn from(_: sync::PoisonError<T>) -> Self {
        Error::PoisonedLock
    }
}

impl From<hyper::header::InvalidHeaderName> for Error {
    fn from(_: hyper::header::InvalidHeaderName) -> Self {
        Error::InvalidHeaderName
    }
}

impl From<hyper::header::InvalidHeaderValue> for Error {
    fn from(_: hyper::header::InvalidHeaderValue) -> Self {
        Error::InvalidHeaderValue
    }
}
