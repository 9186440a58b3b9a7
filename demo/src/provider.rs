//! The date count provider: `GET /provider?validDate=<ISO-8601>` plus the state setup routes.

use crate::data::{ErrorPayload, ProviderPayload};
use accord::{RequestData, RequestHandler, ResponseData, StateCoordinator, JSON_CONTENT_TYPE};
use chrono::{DateTime, SecondsFormat, Utc};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

pub const CONSUMER_NAME: &str = "Our Little Consumer";
pub const PROVIDER_NAME: &str = "Our Provider";
pub const STATE_HAS_DATA: &str = "date count > 0";
pub const STATE_NO_DATA: &str = "date count == 0";
pub const DEFAULT_COUNT: u64 = 1000;

/// The provider's only data: how many records exist for a date.
#[derive(Debug)]
pub struct DateCountStore {
    count: AtomicU64,
}

impl DateCountStore {
    pub fn new(count: u64) -> Self {
        Self {
            count: AtomicU64::new(count),
        }
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::SeqCst)
    }

    pub fn set_count(&self, count: u64) {
        self.count.store(count, Ordering::SeqCst);
    }
}

impl Default for DateCountStore {
    fn default() -> Self {
        Self::new(DEFAULT_COUNT)
    }
}

#[derive(Debug)]
pub struct ProviderService {
    coordinator: StateCoordinator<DateCountStore>,
}

impl ProviderService {
    pub fn new(store: Arc<DateCountStore>) -> Self {
        let coordinator = StateCoordinator::new(store, STATE_HAS_DATA, |store: &DateCountStore| {
            store.set_count(DEFAULT_COUNT)
        })
        .with_state(CONSUMER_NAME, STATE_HAS_DATA, |store: &DateCountStore| {
            store.set_count(DEFAULT_COUNT)
        })
        .with_state(CONSUMER_NAME, STATE_NO_DATA, |store: &DateCountStore| {
            store.set_count(0)
        });

        Self { coordinator }
    }

    pub fn store(&self) -> &Arc<DateCountStore> {
        self.coordinator.store()
    }

    pub fn coordinator(&self) -> &StateCoordinator<DateCountStore> {
        &self.coordinator
    }

    fn get_provider(&self, request: &RequestData) -> ResponseData {
        let valid_date = match request.query.get("validDate") {
            Some(valid_date) => valid_date,
            None => return rejected("validDate is required"),
        };
        if DateTime::parse_from_rfc3339(valid_date).is_err() {
            return rejected("validDate is not a valid date");
        }

        let count = self.store().count();
        if count == 0 {
            return ResponseData::new(404);
        }

        let payload = ProviderPayload {
            test: "NO".into(),
            valid_date: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, false),
            count,
        };
        json_response(200, &payload)
    }
}

impl RequestHandler for ProviderService {
    fn handle(&self, request: RequestData) -> ResponseData {
        let response = match self.coordinator.handle_request(&request) {
            Some(response) => response,
            None => match (request.method.as_str(), request.path.as_str()) {
                ("GET", "/provider") => self.get_provider(&request),
                _ => ResponseData::new(404),
            },
        };

        tracing::debug!(request = %request, status_code = response.status_code, "answered");
        response.with_header("Content-Type", JSON_CONTENT_TYPE)
    }
}

fn rejected(reason: &str) -> ResponseData {
    json_response(
        400,
        &ErrorPayload {
            error: reason.into(),
        },
    )
}

fn json_response<T: serde::Serialize>(status_code: u16, payload: &T) -> ResponseData {
    match serde_json::to_value(payload) {
        Ok(body) => ResponseData::new(status_code).with_json_body(&body),
        Err(e) => {
            tracing::error!("Couldn't serialize the response: {}", e);
            ResponseData::new(500)
        }
    }
}
