use serde::{Deserialize, Serialize};

/// Body of a successful `GET /provider`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderPayload {
    pub test: String,
    pub valid_date: String,
    pub count: u64,
}

/// Body of a rejected `GET /provider`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub error: String,
}

/// What the consumer keeps from the provider's answer.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderData {
    pub count: u64,
    pub date: String,
}

impl From<ProviderPayload> for ProviderData {
    fn from(payload: ProviderPayload) -> Self {
        Self {
            count: payload.count,
            date: payload.valid_date,
        }
    }
}
