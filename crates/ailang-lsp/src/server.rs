//! LSP Server implementation for AILang model documents.

use std::sync::Arc;
use std::time::Duration;

use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};

use crate::analysis::DocumentManager;
use crate::client::ClientSettings;

/// AILang Language Server state.
pub struct AilangLanguageServer {
    /// LSP client for log messages
    client: Client,
    /// Settings pulled from the client per document
    settings: Arc<ClientSettings>,
    /// Open documents, scheduling and publishing
    documents: DocumentManager,
}

impl AilangLanguageServer {
    /// Create a new language server instance.
    pub fn new(client: Client, debounce: Duration) -> Self {
        let settings = Arc::new(ClientSettings::new(client.clone()));
        let documents = DocumentManager::new(
            Arc::new(client.clone()),
            settings.clone(),
            debounce,
        );
        Self {
            client,
            settings,
            documents,
        }
    }

    pub fn documents(&self) -> &DocumentManager {
        &self.documents
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for AilangLanguageServer {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        tracing::info!("Initializing AILang Language Server");

        let pull_configuration = params
            .capabilities
            .workspace
            .as_ref()
            .and_then(|w| w.configuration)
            .unwrap_or(false);
        self.settings.set_supported(pull_configuration);
        tracing::debug!(pull_configuration, "client capabilities read");

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                // Full text on every change
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::FULL,
                )),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "ailang-lsp".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        tracing::info!("AILang Language Server initialized");
        self.client
            .log_message(MessageType::INFO, "AILang Language Server ready")
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        tracing::info!("Shutting down AILang Language Server");
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let doc = params.text_document;
        self.documents
            .open(doc.uri, doc.text, doc.version, doc.language_id)
            .await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        // full sync: the last change carries the whole document
        let Some(change) = params.content_changes.into_iter().last() else {
            return;
        };
        self.documents
            .change(
                params.text_document.uri,
                change.text,
                params.text_document.version,
            )
            .await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        self.documents.close(&params.text_document.uri).await;
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        tracing::debug!("Configuration changed");
        self.documents.configuration_changed(params.settings).await;
    }
}
