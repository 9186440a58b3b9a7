use crate::{RequestData, ResponseData};
use serde::Deserialize;
use serde_json::json;
use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    fmt::{self, Debug},
    sync::Arc,
};

pub const SETUP_PATH: &str = "/setup";
pub const STATES_PATH: &str = "/states";

type StateHandler<S> = Box<dyn Fn(&S) + Send + Sync>;

#[derive(Debug, Deserialize)]
struct SetupRequest {
    #[serde(default)]
    state: Option<String>,
}

/// Provider-side registry of named states, each one a mutation of the injected store.
///
/// Unknown labels apply the default state instead of failing: contracts may name states the
/// provider doesn't know about yet.
pub struct StateCoordinator<S> {
    store: Arc<S>,
    handlers: HashMap<String, StateHandler<S>>,
    consumers: BTreeMap<String, BTreeSet<String>>,
    default_state: String,
}

impl<S: Send + Sync + 'static> StateCoordinator<S> {
    pub fn new<L, F>(store: Arc<S>, default_state: L, default_handler: F) -> Self
    where
        L: Into<String>,
        F: Fn(&S) + Send + Sync + 'static,
    {
        let default_state = default_state.into();
        let mut handlers: HashMap<String, StateHandler<S>> = HashMap::new();
        handlers.insert(default_state.clone(), Box::new(default_handler));

        Self {
            store,
            handlers,
            consumers: BTreeMap::new(),
            default_state,
        }
    }

    /// Registers `label` for `consumer`. Registering the default label replaces its handler.
    pub fn with_state<C, L, F>(mut self, consumer: C, label: L, handler: F) -> Self
    where
        C: Into<String>,
        L: Into<String>,
        F: Fn(&S) + Send + Sync + 'static,
    {
        let label = label.into();
        self.consumers
            .entry(consumer.into())
            .or_default()
            .insert(label.clone());
        self.handlers.insert(label, Box::new(handler));
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn default_state(&self) -> &str {
        &self.default_state
    }

    /// Applies `label` and returns the label that was actually applied.
    pub fn apply_state<'a>(&'a self, label: &'a str) -> &'a str {
        let (applied, handler) = match self.handlers.get(label) {
            Some(handler) => (label, handler),
            None => {
                tracing::warn!(
                    state = label,
                    default = %self.default_state,
                    "Unknown provider state, applying the default"
                );
                match self.handlers.get(&self.default_state) {
                    Some(handler) => (self.default_state.as_str(), handler),
                    None => return self.default_state.as_str(),
                }
            }
        };

        handler(self.store.as_ref());
        tracing::info!(state = applied, "provider state applied");

        applied
    }

    pub fn list_states(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.consumers
    }

    /// Answers `POST /setup` and `GET /states`. Any other request is left to the caller.
    pub fn handle_request(&self, request: &RequestData) -> Option<ResponseData> {
        match (request.method.as_str(), request.path.as_str()) {
            ("POST", SETUP_PATH) => Some(self.handle_setup(request)),
            ("GET", STATES_PATH) => {
                Some(ResponseData::new(200).with_json_body(&json!(self.consumers)))
            }
            _ => None,
        }
    }

    fn handle_setup(&self, request: &RequestData) -> ResponseData {
        let setup = if request.body.trim().is_empty() {
            SetupRequest { state: None }
        } else {
            match serde_json::from_str::<SetupRequest>(&request.body) {
                Ok(setup) => setup,
                Err(e) => {
                    return ResponseData::new(400).with_json_body(&json!({
                        "error": format!("invalid state setup body: {}", e)
                    }))
                }
            }
        };

        let label = setup.state.unwrap_or_else(|| self.default_state.clone());
        self.apply_state(&label);

        ResponseData::new(200)
    }
}

impl<S> Debug for StateCoordinator<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateCoordinator")
            .field("consumers", &self.consumers)
            .field("default_state", &self.default_state)
            .finish()
    }
}
