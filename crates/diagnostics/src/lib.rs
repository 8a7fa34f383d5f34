//! Diagnostics for the ESC/POS toolchain.
//!
//! Provides [`Diagnostic`], [`Severity`], and [`Span`] types used to report
//! recoverable conditions found while tokenizing a printer byte stream.
//! Diagnostic codes are defined in the [`codes`] module.

#![warn(missing_docs)]

/// Diagnostic ID constants.
pub mod codes;

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// How much a diagnostic matters.
///
/// Diagnostics only describe conditions the tokenizer recovered from; a
/// condition that stops tokenizing is an error value, not a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum Severity {
    /// The token stream may not match what a printer would do.
    Warn,
    /// Expected lossy handling, reported for completeness.
    Info,
}

/// Byte span in the input buffer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Span {
    /// Byte offset of the first byte (0-based).
    pub start: usize,
    /// Byte offset one past the last byte.
    pub end: usize,
}

impl Span {
    /// Create a span covering `[start, end)`.
    ///
    /// Panics if `end < start`.
    pub fn new(start: usize, end: usize) -> Self {
        assert!(end >= start, "Span end ({end}) < start ({start})");
        Self { start, end }
    }

    /// Create a zero-width span at the given position.
    pub fn empty(pos: usize) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }

    /// Number of bytes covered by the span.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the span covers no bytes.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// A recoverable condition found at a byte range of the input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Stable code from [`codes`], e.g. `"ESC1101"`.
    pub id: Cow<'static, str>,
    /// Severity level.
    pub severity: Severity,
    /// One-line description.
    pub message: String,
    /// Input bytes the condition concerns.
    pub span: Span,
    /// Named details (`command`, `byte`, `formula`, …) in key order.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context: BTreeMap<String, String>,
}

impl Diagnostic {
    /// A warning with no context.
    pub fn warn(id: &'static str, message: impl Into<String>, span: Span) -> Self {
        Self::with_severity(id, Severity::Warn, message.into(), span)
    }

    /// An informational note with no context.
    pub fn info(id: &'static str, message: impl Into<String>, span: Span) -> Self {
        Self::with_severity(id, Severity::Info, message.into(), span)
    }

    fn with_severity(id: &'static str, severity: Severity, message: String, span: Span) -> Self {
        Self {
            id: Cow::Borrowed(id),
            severity,
            message,
            span,
            context: BTreeMap::new(),
        }
    }

    /// Add one context entry, replacing any earlier value for `key`.
    pub fn with(mut self, key: &str, value: impl fmt::Display) -> Self {
        self.context.insert(key.to_string(), value.to_string());
        self
    }

    /// The explanation text for this diagnostic's code.
    pub fn explain(&self) -> Option<&'static str> {
        explain(&self.id)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Warn => "warn",
            Severity::Info => "info",
        })
    }
}

/// `warn[ESC1102] 0x0001..0x0003: select_font expects …`
impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}] 0x{:04X}..0x{:04X}: {}",
            self.severity, self.id, self.span.start, self.span.end, self.message
        )
    }
}

/// Returns the human-readable explanation for a diagnostic code, if known.
pub fn explain(id: &str) -> Option<&'static str> {
    match id {
        codes::UNKNOWN_CONTROL_DROPPED => Some(
            "A byte in the range 0x00-0x1F did not begin any registered command signature. \
             The byte was consumed without producing a token, so the token stream has a \
             one-byte gap at this address.",
        ),
        codes::UNKNOWN_CONTROL_EMITTED => Some(
            "A byte in the range 0x00-0x1F did not begin any registered command signature. \
             It was kept in the token stream as an `unknown` token.",
        ),
        codes::LENGTH_EXPRESSION_FAILED => Some(
            "The command's payload length is computed from a formula over the bytes that \
             follow its signature, and that formula failed to compile or evaluate (for \
             example d(i) indexed past the end of the input). The payload length was taken \
             as 0.",
        ),
        codes::PAYLOAD_TRUNCATED => Some(
            "The command's length policy asked for more payload bytes than remain in the \
             input. The payload was cut off at the end of the input.",
        ),
        codes::MISSING_NUL_TERMINATOR => Some(
            "A NUL-terminated command reached the end of the input before a 0x00 byte. \
             The payload extends to the end of the input; this is not an error.",
        ),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Span ────────────────────────────────────────────────────────────

    #[test]
    fn span_new_valid() {
        let s = Span::new(5, 10);
        assert_eq!(s.start, 5);
        assert_eq!(s.end, 10);
        assert_eq!(s.len(), 5);
    }

    #[test]
    fn span_empty() {
        let s = Span::empty(7);
        assert_eq!(s.start, 7);
        assert_eq!(s.end, 7);
        assert!(s.is_empty());
    }

    #[test]
    #[should_panic(expected = "Span end (3) < start (5)")]
    fn span_new_inverted_panics() {
        Span::new(5, 3);
    }

    // ── Display ─────────────────────────────────────────────────────────

    #[test]
    fn severity_display() {
        assert_eq!(Severity::Warn.to_string(), "warn");
        assert_eq!(Severity::Info.to_string(), "info");
    }

    #[test]
    fn diagnostic_display_includes_byte_range() {
        let d = Diagnostic::warn(
            codes::LENGTH_EXPRESSION_FAILED,
            "length expression failed",
            Span::new(0x19, 0x1B),
        );
        assert_eq!(
            d.to_string(),
            "warn[ESC1101] 0x0019..0x001B: length expression failed"
        );
    }

    // ── Context ─────────────────────────────────────────────────────────

    #[test]
    fn context_entries_accumulate_in_key_order() {
        let d = Diagnostic::warn(codes::PAYLOAD_TRUNCATED, "cut", Span::new(0, 5))
            .with("expected", 7)
            .with("available", 3)
            .with("command", "select_font");
        let keys: Vec<&str> = d.context.keys().map(String::as_str).collect();
        assert_eq!(keys, ["available", "command", "expected"]);
        assert_eq!(d.context["expected"], "7");
    }

    #[test]
    fn later_context_value_replaces_earlier() {
        let d = Diagnostic::info(codes::UNKNOWN_CONTROL_DROPPED, "x", Span::new(0, 1))
            .with("byte", "0x07")
            .with("byte", "0x1C");
        assert_eq!(d.context.len(), 1);
        assert_eq!(d.context["byte"], "0x1C");
    }

    // ── explain ─────────────────────────────────────────────────────────

    #[test]
    fn all_codes_have_explanations() {
        for code in codes::ALL {
            assert!(
                explain(code).is_some(),
                "diagnostic code {code} has no explain() entry"
            );
        }
    }

    #[test]
    fn unknown_code_has_no_explanation() {
        assert!(explain("ESC9999").is_none());
        assert!(explain("").is_none());
    }

    // ── Serde ───────────────────────────────────────────────────────────

    #[test]
    fn diagnostic_serde_roundtrip_with_context() {
        let d = Diagnostic::info(codes::UNKNOWN_CONTROL_DROPPED, "dropped", Span::new(3, 4))
            .with("byte", "0x07");
        let json = serde_json::to_string(&d).unwrap();
        assert!(json.contains("\"byte\":\"0x07\""), "{json}");
        assert!(json.contains("\"span\":{\"start\":3,\"end\":4}"), "{json}");
        let d2: Diagnostic = serde_json::from_str(&json).unwrap();
        assert_eq!(d, d2);
    }

    #[test]
    fn diagnostic_serde_omits_empty_context() {
        let d = Diagnostic::warn(codes::PAYLOAD_TRUNCATED, "test", Span::empty(2));
        let json = serde_json::to_string(&d).unwrap();
        assert!(!json.contains("context"), "empty context should be omitted: {json}");
        let back: Diagnostic = serde_json::from_str(&json).unwrap();
        assert!(back.context.is_empty());
    }
}
