//! Command handlers: documents and the line REPL.

pub mod document;
pub mod repl;
