//! Per-document configuration cache.
//!
//! Resolution is `defaults -> workspace -> resource`. Each document's
//! resolved record is cached until a configuration change or close. When
//! fetching resource settings fails, the last resource settings that were
//! fetched successfully for that document are used instead, or none.

use std::collections::HashMap;

use ailang_core::{default_settings, resolve, ConfigError, ResolvedConfig};
use serde_json::Value;
use tower_lsp::lsp_types::Url;
use tracing::{debug, warn};

/// Client settings section holding our options
pub const SETTINGS_SECTION: &str = "ailang";

#[derive(Debug)]
pub struct ConfigStore {
    global: Value,
    workspace: Value,
    resolved: HashMap<Url, ResolvedConfig>,
    last_good: HashMap<Url, Value>,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new(default_settings())
    }
}

impl ConfigStore {
    pub fn new(global: Value) -> Self {
        Self {
            global,
            workspace: Value::Null,
            resolved: HashMap::new(),
            last_good: HashMap::new(),
        }
    }

    pub fn cached(&self, uri: &Url) -> Option<ResolvedConfig> {
        self.resolved.get(uri).cloned()
    }

    /// Resolve and cache the configuration for `uri` from freshly fetched
    /// resource settings.
    pub fn store(&mut self, uri: &Url, fetched: Result<Value, ConfigError>) -> ResolvedConfig {
        let resource = match fetched {
            Ok(value) => {
                self.last_good.insert(uri.clone(), value.clone());
                value
            }
            Err(e) => {
                warn!(uri = %uri, error = %e, "settings unavailable, using last known good");
                self.last_good.get(uri).cloned().unwrap_or(Value::Null)
            }
        };
        let config = resolve(&self.global, &self.workspace, &resource);
        self.resolved.insert(uri.clone(), config.clone());
        config
    }

    /// Replace workspace settings from a change notification and drop every
    /// cached resolution.
    ///
    /// Accepts both `{"ailang": {...}}` and the bare section.
    pub fn set_workspace(&mut self, settings: Value) {
        self.workspace = match settings {
            Value::Object(mut map) if map.contains_key(SETTINGS_SECTION) => {
                map.remove(SETTINGS_SECTION).unwrap_or(Value::Null)
            }
            other => other,
        };
        debug!(cached = self.resolved.len(), "configuration cache invalidated");
        self.resolved.clear();
    }

    /// Forget everything cached for one document.
    pub fn invalidate(&mut self, uri: &Url) {
        self.resolved.remove(uri);
        self.last_good.remove(uri);
    }
}
