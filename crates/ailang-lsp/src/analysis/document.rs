//! Open document state.

use tower_lsp::lsp_types::Url;

/// A document the client has opened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub uri: Url,
    /// Full current text
    pub text: String,
    /// Client version, increases with every change
    pub version: i32,
    pub language_id: String,
}

impl Document {
    pub fn new(uri: Url, text: String, version: i32, language_id: String) -> Self {
        Self {
            uri,
            text,
            version,
            language_id,
        }
    }

    /// Replace the text. Returns false, leaving the document untouched, for
    /// a version older than the current one.
    pub fn apply_change(&mut self, text: String, version: i32) -> bool {
        if version < self.version {
            return false;
        }
        self.text = text;
        self.version = version;
        true
    }
}
