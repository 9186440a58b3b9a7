use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("The provider rejected the request: {0}")]
    Rejected(String),
    #[error("The provider has no data")]
    NoData,
    #[error("{0}")]
    ReqwestError(#[from] reqwest::Error),
    #[error("{0}")]
    DeserializationError(#[from] serde_json::Error),
    #[error("{0}")]
    IoError(#[from] std::io::Error),
    #[error("{0}")]
    AccordError(#[from] accord::Error),
}
