//! Client-facing seams: where diagnostics go and where settings come from.
//!
//! The server plugs in the `tower-lsp` [`Client`]; tests plug in recorders.

use std::sync::atomic::{AtomicBool, Ordering};

use ailang_core::ConfigError;
use serde_json::Value;
use tower_lsp::lsp_types::{ConfigurationItem, Diagnostic, Url};
use tower_lsp::Client;

use crate::analysis::SETTINGS_SECTION;

/// Receives one diagnostics batch per publish
#[tower_lsp::async_trait]
pub trait DiagnosticSink: Send + Sync + 'static {
    async fn publish(&self, uri: Url, diagnostics: Vec<Diagnostic>, version: Option<i32>);
}

/// Source of per-document setting overrides
#[tower_lsp::async_trait]
pub trait SettingsSource: Send + Sync + 'static {
    /// Settings scoped to `uri`, `Value::Null` when there are none
    async fn resource_settings(&self, uri: &Url) -> Result<Value, ConfigError>;
}

#[tower_lsp::async_trait]
impl DiagnosticSink for Client {
    async fn publish(&self, uri: Url, diagnostics: Vec<Diagnostic>, version: Option<i32>) {
        self.publish_diagnostics(uri, diagnostics, version).await;
    }
}

/// Pulls `workspace/configuration` for the `ailang` section.
pub struct ClientSettings {
    client: Client,
    supported: AtomicBool,
}

impl ClientSettings {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            supported: AtomicBool::new(false),
        }
    }

    /// Record whether the client advertised `workspace.configuration`
    pub fn set_supported(&self, supported: bool) {
        self.supported.store(supported, Ordering::Relaxed);
    }
}

#[tower_lsp::async_trait]
impl SettingsSource for ClientSettings {
    async fn resource_settings(&self, uri: &Url) -> Result<Value, ConfigError> {
        if !self.supported.load(Ordering::Relaxed) {
            return Ok(Value::Null);
        }

        let items = vec![ConfigurationItem {
            scope_uri: Some(uri.clone()),
            section: Some(SETTINGS_SECTION.to_string()),
        }];
        let mut values = self
            .client
            .configuration(items)
            .await
            .map_err(|e| ConfigError::Retrieval(e.to_string()))?;

        match values.pop() {
            None | Some(Value::Null) => Ok(Value::Null),
            Some(v @ Value::Object(_)) => Ok(v),
            Some(_) => Err(ConfigError::NotAnObject {
                section: SETTINGS_SECTION.to_string(),
            }),
        }
    }
}
