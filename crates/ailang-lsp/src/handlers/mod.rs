//! LSP notification handlers.

pub mod diagnostics;
