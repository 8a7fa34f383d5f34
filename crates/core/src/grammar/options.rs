use serde::{Deserialize, Serialize};

/// What to do with a control byte that starts no registered signature.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownControlPolicy {
    /// Consume the byte without producing a token.
    #[default]
    Drop,
    /// Produce a [`Token::Unknown`](super::token::Token::Unknown).
    Emit,
    /// Stop with [`ParseError::UnknownControlSequence`](crate::ParseError::UnknownControlSequence).
    Abort,
}

/// What to do when a length expression fails to compile or evaluate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpressionFailurePolicy {
    /// Treat the payload length as 0.
    #[default]
    Zero,
    /// Stop with [`ParseError::Expression`](crate::ParseError::Expression).
    Abort,
}

/// Tokenizer settings.
///
/// The defaults reproduce the historical behavior: unknown control bytes are
/// dropped and failed expressions yield empty payloads. Both cases are still
/// reported as diagnostics.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParseOptions {
    /// Handling of unmatched control bytes.
    pub unknown_control: UnknownControlPolicy,
    /// Handling of failed length expressions.
    pub expression_failure: ExpressionFailurePolicy,
}

impl ParseOptions {
    /// Set the unknown-control policy (builder pattern).
    pub fn with_unknown_control(mut self, policy: UnknownControlPolicy) -> Self {
        self.unknown_control = policy;
        self
    }

    /// Set the expression-failure policy (builder pattern).
    pub fn with_expression_failure(mut self, policy: ExpressionFailurePolicy) -> Self {
        self.expression_failure = policy;
        self
    }
}
