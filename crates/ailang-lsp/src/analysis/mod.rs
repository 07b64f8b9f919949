//! Document tracking for the language server.
//!
//! Owns open documents, their cached configuration and last validation
//! result, and schedules revalidation.

mod config_store;
pub mod document;
mod sync;

pub use config_store::{ConfigStore, SETTINGS_SECTION};
pub use document::Document;
pub use sync::{DocumentManager, DEFAULT_DEBOUNCE};
