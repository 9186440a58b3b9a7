use crate::contract::SpecVersion;
use std::path::{Path, PathBuf};

const DEFAULT_HOST: &str = "127.0.0.1";

#[derive(Debug, Clone)]
pub struct MockServerConfig {
    consumer: String,
    provider: String,
    host: String,
    port: u16,
    pact_dir: Option<PathBuf>,
    spec_version: SpecVersion,
}

impl MockServerConfig {
    pub fn new<C: Into<String>, P: Into<String>>(consumer: C, provider: P) -> Self {
        Self {
            consumer: consumer.into(),
            provider: provider.into(),
            host: DEFAULT_HOST.into(),
            port: 0,
            pact_dir: None,
            spec_version: SpecVersion::default(),
        }
    }

    pub fn consumer(&self) -> &str {
        &self.consumer
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn set_host<S: Into<String>>(&mut self, host: S) {
        self.host = host.into();
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Port 0 lets the OS pick a free port.
    pub fn set_port(&mut self, port: u16) {
        self.port = port;
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Directory the contract document is written to on finalize. Without one the document is
    /// only returned.
    pub fn set_pact_dir<P: Into<PathBuf>>(&mut self, pact_dir: P) {
        self.pact_dir = Some(pact_dir.into());
    }

    pub fn pact_dir(&self) -> Option<&Path> {
        self.pact_dir.as_deref()
    }

    pub fn set_spec_version(&mut self, spec_version: SpecVersion) {
        self.spec_version = spec_version;
    }

    pub fn spec_version(&self) -> SpecVersion {
        self.spec_version
    }
}
