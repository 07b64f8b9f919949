//! ailang-lsp: language server for AILang model documents
//!
//! Wires the `ailang-core` validation engine to an LSP client:
//! - Document synchronization with debounced, cancellable revalidation
//! - Per-document configuration store with last-known-good fallback
//! - Diagnostic publishing (severity filtering, truncation, range clamping)

pub mod analysis;
pub mod client;
pub mod handlers;
pub mod server;

pub use analysis::{ConfigStore, Document, DocumentManager, DEFAULT_DEBOUNCE};
pub use client::{ClientSettings, DiagnosticSink, SettingsSource};
pub use server::AilangLanguageServer;
