//! Typed error types for registration and tokenizing.

use std::collections::TryReserveError;

use crate::length_expr::ExprError;

/// A command definition could not be added to a [`Registry`](crate::Registry).
///
/// Registration errors are fatal to that one call only; the registry is left
/// exactly as it was before the call.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// The signature has no bytes.
    #[error("command {id:?} has an empty signature")]
    EmptySignature {
        /// Id of the rejected definition.
        id: String,
    },

    /// The first signature byte is outside `0x00..=0x1F`, so the tokenizer
    /// could never reach it.
    #[error(
        "command {id:?} signature starts with 0x{byte:02X}, which is not a control byte (0x00-0x1F)"
    )]
    NonControlLeadByte {
        /// Id of the rejected definition.
        id: String,
        /// The offending lead byte.
        byte: u8,
    },

    /// A `Fixed(total)` length shorter than the signature itself.
    #[error(
        "command {id:?} declares fixed length {total}, shorter than its {signature_len}-byte signature"
    )]
    FixedLengthTooShort {
        /// Id of the rejected definition.
        id: String,
        /// Declared total length.
        total: usize,
        /// Signature length.
        signature_len: usize,
    },

    /// The signature is a strict prefix of an existing one, or an existing
    /// one is a strict prefix of it. One of the two could never match.
    #[error("signature {signature} of {id:?} overlaps {existing:?}: one is a prefix of the other")]
    AmbiguousSignature {
        /// Id of the rejected definition.
        id: String,
        /// Rejected signature as hex.
        signature: String,
        /// Id of the registered definition it collides with.
        existing: String,
    },

    /// The exact signature is already registered.
    #[error("signature {signature} of {id:?} is already registered by {existing:?}")]
    DuplicateSignature {
        /// Id of the rejected definition.
        id: String,
        /// Rejected signature as hex.
        signature: String,
        /// Id of the registered definition.
        existing: String,
    },
}

/// Tokenizing was aborted.
///
/// Only conditions whose policy escalates to abort, and allocation failure,
/// end a parse; everything else is reported as a diagnostic on the result.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    /// A control byte that starts no registered signature, under
    /// [`UnknownControlPolicy::Abort`](crate::UnknownControlPolicy::Abort).
    #[error("unknown control byte 0x{byte:02X} at offset {address}")]
    UnknownControlSequence {
        /// Offset of the byte.
        address: usize,
        /// The byte value.
        byte: u8,
    },

    /// A length expression failed, under
    /// [`ExpressionFailurePolicy::Abort`](crate::ExpressionFailurePolicy::Abort).
    #[error("length expression of {command:?} at offset {address} failed: {source}")]
    Expression {
        /// Offset of the command.
        address: usize,
        /// Id of the command whose formula failed.
        command: String,
        /// The evaluator error.
        #[source]
        source: ExprError,
    },

    /// A token buffer could not be grown.
    #[error("out of memory buffering {requested} byte(s) at offset {address}")]
    OutOfMemory {
        /// Offset of the token being built.
        address: usize,
        /// Number of elements that could not be reserved.
        requested: usize,
        /// The allocator error.
        #[source]
        source: TryReserveError,
    },
}
