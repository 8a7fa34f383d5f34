use super::token::{ParseResult, Token};

/// Serialize a parse result to a pretty-printed JSON object with
/// `tokenCount`, `tokens`, and `diagnostics` keys.
pub fn to_pretty_json(result: &ParseResult<'_>) -> String {
    let value = serde_json::json!({
        "tokenCount": result.token_count(),
        "tokens": result.tokens,
        "diagnostics": result.diagnostics,
    });
    serde_json::to_string_pretty(&value).expect("ParseResult serialization cannot fail")
}

/// Render tokens one per line, e.g.
///
/// ```text
/// 0x0000: <line_feed>
/// 0x000D: <text "Hello World">
/// 0x0019: <print_barcode_simple 0x04 0x49>
/// ```
pub fn format_listing(tokens: &[Token<'_>]) -> String {
    let mut out = String::new();
    for token in tokens {
        out.push_str(&token.to_string());
        out.push('\n');
    }
    out
}
