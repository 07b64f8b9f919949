//! AILang Language Server - Main entry point
//!
//! Provides live validation of AILang model documents:
//! - Syntax errors with precise positions
//! - Semantic checks on model, layer and training sections
//! - Debounced revalidation while typing

use std::time::Duration;

use anyhow::Context;
use tower_lsp::{LspService, Server};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ailang_lsp::{AilangLanguageServer, DEFAULT_DEBOUNCE};

const DEBOUNCE_ENV: &str = "AILANG_LSP_DEBOUNCE_MS";

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Setup logging to stderr (LSP uses stdout for protocol)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ailang_lsp=debug,ailang_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let debounce = debounce_from_env()?;
    tracing::info!(debounce_ms = debounce.as_millis() as u64, "Starting AILang Language Server");

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) =
        LspService::new(move |client| AilangLanguageServer::new(client, debounce));

    Server::new(stdin, stdout, socket).serve(service).await;
    Ok(())
}

fn debounce_from_env() -> anyhow::Result<Duration> {
    match std::env::var(DEBOUNCE_ENV) {
        Ok(value) => {
            let ms: u64 = value.trim().parse().with_context(|| {
                format!("{} must be a number of milliseconds, got '{}'", DEBOUNCE_ENV, value)
            })?;
            Ok(Duration::from_millis(ms))
        }
        Err(_) => Ok(DEFAULT_DEBOUNCE),
    }
}
