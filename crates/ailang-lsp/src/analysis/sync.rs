//! Document synchronization and debounced revalidation.
//!
//! Each open document has at most one scheduled validation. A change
//! aborts the scheduled task and schedules a new one, so bursts of edits
//! collapse into a single pass over the latest text. Every scheduled task
//! also carries a generation number that must still match when it wakes;
//! a task that lost the race with a newer change does nothing.
//!
//! Configuration changes revalidate every open document sequentially, in
//! URI order. Each change bumps a configuration epoch; a pass that started
//! under an older epoch neither caches its settings nor publishes, so an
//! in-flight pass cannot overwrite the sweep's batch.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ailang_core::{Validation, Validator};
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tower_lsp::lsp_types::Url;
use tracing::{debug, info};

use super::config_store::ConfigStore;
use super::document::Document;
use crate::client::{DiagnosticSink, SettingsSource};
use crate::handlers::diagnostics;

/// Quiet period after the last change before revalidating
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Tracks open documents and drives validation and publishing
#[derive(Clone)]
pub struct DocumentManager {
    inner: Arc<Inner>,
}

struct Inner {
    sink: Arc<dyn DiagnosticSink>,
    settings: Arc<dyn SettingsSource>,
    validator: Validator,
    debounce: Duration,
    state: Mutex<State>,
    runs: AtomicUsize,
}

#[derive(Default)]
struct State {
    documents: BTreeMap<Url, Document>,
    pending: HashMap<Url, Pending>,
    results: HashMap<Url, Validation>,
    configs: ConfigStore,
    generation: u64,
    config_epoch: u64,
}

struct Pending {
    generation: u64,
    task: JoinHandle<()>,
}

impl DocumentManager {
    pub fn new(
        sink: Arc<dyn DiagnosticSink>,
        settings: Arc<dyn SettingsSource>,
        debounce: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                sink,
                settings,
                validator: Validator::default(),
                debounce,
                state: Mutex::new(State::default()),
                runs: AtomicUsize::new(0),
            }),
        }
    }

    pub fn debounce(&self) -> Duration {
        self.inner.debounce
    }

    /// Start tracking a document and validate it right away.
    pub async fn open(&self, uri: Url, text: String, version: i32, language_id: String) {
        debug!(uri = %uri, version, "document opened");
        let mut state = self.inner.state.lock().await;
        let document = Document::new(uri.clone(), text, version, language_id);
        state.documents.insert(uri.clone(), document);
        self.inner.schedule(&mut state, uri, Duration::ZERO);
    }

    /// Replace a document's text and reschedule its validation.
    ///
    /// Changes for documents that are not open are ignored.
    pub async fn change(&self, uri: Url, text: String, version: i32) {
        let mut state = self.inner.state.lock().await;
        let Some(document) = state.documents.get_mut(&uri) else {
            debug!(uri = %uri, version, "change for a document that is not open");
            return;
        };
        if !document.apply_change(text, version) {
            debug!(uri = %uri, version, current = document.version, "stale change ignored");
            return;
        }
        debug!(uri = %uri, version, "document changed");
        let delay = self.inner.debounce;
        self.inner.schedule(&mut state, uri, delay);
    }

    /// Stop tracking a document: cancel its pending validation, drop its
    /// cached configuration and result, and clear its diagnostics.
    pub async fn close(&self, uri: &Url) {
        let was_open = {
            let mut state = self.inner.state.lock().await;
            if let Some(pending) = state.pending.remove(uri) {
                pending.task.abort();
                debug!(uri = %uri, "pending validation cancelled");
            }
            state.results.remove(uri);
            state.configs.invalidate(uri);
            state.documents.remove(uri).is_some()
        };

        if was_open {
            debug!(uri = %uri, "document closed");
            self.inner.sink.publish(uri.clone(), Vec::new(), None).await;
        }
    }

    /// Apply new workspace settings and revalidate every open document,
    /// one at a time.
    pub async fn configuration_changed(&self, settings: Value) {
        let uris: Vec<Url> = {
            let mut state = self.inner.state.lock().await;
            state.configs.set_workspace(settings);
            state.config_epoch += 1;
            for (_, pending) in state.pending.drain() {
                pending.task.abort();
            }
            state.documents.keys().cloned().collect()
        };

        info!(documents = uris.len(), "configuration changed, revalidating");
        for uri in uris {
            self.inner.validate_and_publish(&uri).await;
        }
    }

    pub async fn document(&self, uri: &Url) -> Option<Document> {
        self.inner.state.lock().await.documents.get(uri).cloned()
    }

    /// Result of the last completed validation, if the document is open
    pub async fn last_result(&self, uri: &Url) -> Option<Validation> {
        self.inner.state.lock().await.results.get(uri).cloned()
    }

    pub async fn is_pending(&self, uri: &Url) -> bool {
        self.inner.state.lock().await.pending.contains_key(uri)
    }

    pub async fn open_documents(&self) -> Vec<Url> {
        self.inner.state.lock().await.documents.keys().cloned().collect()
    }

    /// Number of validation passes run since startup
    pub fn validation_runs(&self) -> usize {
        self.inner.runs.load(Ordering::SeqCst)
    }
}

impl Inner {
    /// Replace any scheduled validation for `uri` with one after `delay`.
    /// Called with the state lock held, so the task cannot observe the
    /// state before its `Pending` entry exists.
    fn schedule(self: &Arc<Self>, state: &mut State, uri: Url, delay: Duration) {
        if let Some(previous) = state.pending.remove(&uri) {
            previous.task.abort();
            debug!(uri = %uri, "superseded pending validation");
        }

        state.generation += 1;
        let generation = state.generation;
        let inner = Arc::clone(self);
        let task_uri = uri.clone();
        let task = tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            inner.run_scheduled(task_uri, generation).await;
        });
        state.pending.insert(uri, Pending { generation, task });
    }

    async fn run_scheduled(&self, uri: Url, generation: u64) {
        {
            let mut state = self.state.lock().await;
            if state.pending.get(&uri).map(|p| p.generation) != Some(generation) {
                debug!(uri = %uri, generation, "superseded timer fired, skipping");
                return;
            }
            state.pending.remove(&uri);
        }
        self.validate_and_publish(&uri).await;
    }

    async fn validate_and_publish(&self, uri: &Url) {
        let (document, cached, epoch) = {
            let state = self.state.lock().await;
            let Some(document) = state.documents.get(uri) else {
                return;
            };
            (document.clone(), state.configs.cached(uri), state.config_epoch)
        };

        let config = match cached {
            Some(config) => config,
            None => {
                let fetched = self.settings.resource_settings(uri).await;
                let mut state = self.state.lock().await;
                if !state.documents.contains_key(uri) {
                    debug!(uri = %uri, "document closed while fetching settings");
                    return;
                }
                if state.config_epoch != epoch {
                    debug!(uri = %uri, "configuration changed while fetching settings");
                    return;
                }
                state.configs.store(uri, fetched)
            }
        };

        if !config.validation.enable {
            let mut state = self.state.lock().await;
            if state.config_epoch != epoch {
                return;
            }
            debug!(uri = %uri, "validation disabled");
            if state.results.remove(uri).is_some() {
                self.sink.publish(uri.clone(), Vec::new(), Some(document.version)).await;
            }
            return;
        }

        self.runs.fetch_add(1, Ordering::SeqCst);
        let validation = self.validator.validate(&document.text, &config);

        // held through the publish so a sweep cannot start in between
        let mut state = self.state.lock().await;
        let current = state
            .documents
            .get(uri)
            .is_some_and(|d| d.version == document.version && d.text == document.text);
        if !current {
            debug!(
                uri = %uri,
                version = document.version,
                "document moved on, dropping result"
            );
            return;
        }
        if state.config_epoch != epoch {
            debug!(uri = %uri, "configuration changed during validation, dropping result");
            return;
        }
        state.results.insert(uri.clone(), validation.clone());

        diagnostics::publish(
            self.sink.as_ref(),
            uri,
            document.version,
            &document.text,
            &validation,
            &config,
        )
        .await;
    }
}
