/// Re-exports from the diagnostics crate.
pub mod diag;
/// JSON and listing output for token streams.
pub mod dump;
/// Tokenizer settings.
pub mod options;
/// Command registry (signature trie).
pub mod registry;
/// Re-exports of command table types used by the registry and tokenizer.
pub mod tables;
/// Token types produced by the tokenizer.
pub mod token;
/// Scans a byte buffer into text and command tokens.
pub mod tokenizer;
