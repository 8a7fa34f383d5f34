//! ESC/POS toolchain core library.
//!
//! Tokenizes a raw receipt-printer byte stream into literal text runs and
//! recognized commands with their payloads.  Commands are looked up in a
//! [`Registry`] (a byte-keyed signature trie) built from
//! [`CommandDefinition`]s; each definition's [`LengthPolicy`] sizes its
//! payload, evaluating a [`length_expr`] formula when the size depends on the
//! data.  The main entry points are [`Registry::from_table`] and
//! [`tokenize`].

#![warn(missing_docs)]

/// Registration and tokenizing errors.
pub mod error;
/// Tokenizer grammar: registry, tokens, options, scan loop, and output helpers.
pub mod grammar;
/// Payload length formulas (`d(i)` expressions).
pub mod length_expr;

// ── Convenience re-exports ──────────────────────────────────────────────────
// Flat imports for the most common entry points. The full module paths
// remain available for less common types.

// Tokenizer
pub use grammar::tokenizer::{tokenize, tokenize_with_options};

// Tokens
pub use grammar::token::{ParseResult, Token};

// Registry
pub use grammar::registry::{RegistrationMode, Registry, SignatureMatch};

// Options
pub use grammar::options::{ExpressionFailurePolicy, ParseOptions, UnknownControlPolicy};

// Errors
pub use error::{ParseError, RegistryError};
pub use length_expr::ExprError;

// Diagnostics (re-exported from the diagnostics crate)
pub use grammar::diag::{Diagnostic, Severity, Span, codes};

// Tables
pub use grammar::tables::{CommandDefinition, CommandTable, LengthPolicy};

// Serialization helpers
pub use grammar::dump::{format_listing, to_pretty_json};
