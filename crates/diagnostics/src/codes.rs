//! Diagnostic ID constants.
//!
//! Use these instead of string literals to get compile-time typo detection
//! and IDE autocomplete.

/// A control byte did not start any registered command and was dropped.
pub const UNKNOWN_CONTROL_DROPPED: &str = "ESC1001";

/// A control byte did not start any registered command and was kept as an
/// `unknown` token.
pub const UNKNOWN_CONTROL_EMITTED: &str = "ESC1002";

/// A command's length expression failed to compile or evaluate.
pub const LENGTH_EXPRESSION_FAILED: &str = "ESC1101";

/// A command's declared payload runs past the end of the input.
pub const PAYLOAD_TRUNCATED: &str = "ESC1102";

/// A NUL-terminated payload reached the end of the input without a terminator.
pub const MISSING_NUL_TERMINATOR: &str = "ESC1103";

/// Every known diagnostic code, in ascending order.
pub const ALL: &[&str] = &[
    UNKNOWN_CONTROL_DROPPED,
    UNKNOWN_CONTROL_EMITTED,
    LENGTH_EXPRESSION_FAILED,
    PAYLOAD_TRUNCATED,
    MISSING_NUL_TERMINATOR,
];
