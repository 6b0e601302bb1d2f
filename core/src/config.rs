//! Serializable dispatcher configuration.
//!
//! A `DispatcherConfig` is applied through the same validating setters as
//! `Dispatcher::configure`, so a bad document fails with the same errors.

use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::dispatcher::Dispatcher;
use crate::error::DispatchError;
use crate::http::DEFAULT_CONNECT_TIMEOUT;
use crate::params::Params;
use crate::transport::Transport;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    pub base_url: Option<String>,
    pub method: String,
    pub response_format: String,
    pub default_params: Params,
    pub default_headers: IndexMap<String, String>,
    pub connect_timeout_secs: u64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            method: "GET".to_string(),
            response_format: "none".to_string(),
            default_params: Params::new(),
            default_headers: IndexMap::new(),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT.as_secs(),
        }
    }
}

impl DispatcherConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, DispatchError> {
        Ok(serde_json::from_str(raw)?)
    }
}

impl<T: Transport> Dispatcher<T> {
    /// Build a dispatcher from `config`. A missing `base_url` leaves the
    /// dispatcher unconfigured, so `call` will report `MissingUrl`.
    pub fn from_config(config: DispatcherConfig, transport: T) -> Result<Self, DispatchError> {
        let mut dispatcher = Dispatcher::new(transport);
        if let Some(base_url) = &config.base_url {
            dispatcher.set_base_url(base_url)?;
        }
        dispatcher
            .set_method(&config.method)?
            .set_response_format(&config.response_format)
            .set_connect_timeout(Duration::from_secs(config.connect_timeout_secs));
        for (name, value) in config.default_params.iter() {
            dispatcher.set_default_parameter(name, value);
        }
        for (name, value) in config.default_headers {
            dispatcher.set_default_header(name, value);
        }
        Ok(dispatcher)
    }
}
