mod client;
mod data;
mod error;
mod logging;
pub mod provider;

pub use client::{ProviderClient, ProviderClientBuilder};
pub use data::{ErrorPayload, ProviderData, ProviderPayload};
pub use error::Error;
pub use logging::init_logging;
pub use provider::{DateCountStore, ProviderService};
