//! Shared test helpers for `escpos_toolchain_core` integration tests.

#![allow(unreachable_pub)]

use std::sync::LazyLock;

use escpos_toolchain_core::{
    CommandDefinition, LengthPolicy, ParseResult, RegistrationMode, Registry, Span, Token,
};

/// The demo receipt: four feeds, font B, centered, bold, a text line, a
/// NUL-terminated barcode, two feeds, and a full cut.
pub const DEMO_DATA: [u8; 42] = [
    0x0A, 0x0A, 0x0A, 0x0A, // line feeds
    0x1B, 0x4D, 0x01, // select font B
    0x1B, 0x61, 0x01, // center
    0x1B, 0x45, 0x01, // bold on
    b'H', b'e', b'l', b'l', b'o', b' ', b'W', b'o', b'r', b'l', b'd', //
    0x0A, //
    0x1D, 0x6B, 0x04, 0x49, 0x50, 0x51, 0x52, 0x53, 0x54, 0x55, 0x56, 0x00, // barcode
    0x0A, 0x0A, //
    0x1D, 0x56, 0x00, // cut
];

/// The command set the demo receipt is declared against.
pub fn demo_definitions() -> Vec<CommandDefinition> {
    use LengthPolicy::{Fixed, NulTerminated};
    vec![
        CommandDefinition::new("line_feed", [0x0A], Fixed(1), "Line feed"),
        CommandDefinition::new("cr_line_feed", [0x0D], Fixed(1), "Line feed (CR)"),
        CommandDefinition::new("form_feed", [0x0C], Fixed(1), "Form feed"),
        CommandDefinition::new("init_printer", [0x1B, 0x40], Fixed(2), "Initialize"),
        CommandDefinition::new("select_font", [0x1B, 0x4D], Fixed(3), "Select font"),
        CommandDefinition::new("pos_alignment", [0x1B, 0x61], Fixed(3), "Alignment"),
        CommandDefinition::new("set_bold", [0x1B, 0x45], Fixed(3), "Emphasis"),
        CommandDefinition::new("cut_paper", [0x1D, 0x56], Fixed(3), "Cut"),
        CommandDefinition::new("print_barcode_simple", [0x1D, 0x6B], NulTerminated, "Barcode"),
    ]
}

/// Strict registry over [`demo_definitions`], built once per test binary.
pub static DEMO_REGISTRY: LazyLock<Registry> = LazyLock::new(|| registry_of(demo_definitions()));

/// Build a strict registry, panicking on any rejected definition.
pub fn registry_of(defs: Vec<CommandDefinition>) -> Registry {
    let mut reg = Registry::with_mode(RegistrationMode::Strict);
    for d in defs {
        let id = d.id.clone();
        reg.register(d)
            .unwrap_or_else(|e| panic!("failed to register {id}: {e}"));
    }
    reg
}

/// Command ids in token order; text tokens appear as `"<text>"`.
#[allow(dead_code)]
pub fn kinds(result: &ParseResult<'_>) -> Vec<String> {
    result
        .tokens
        .iter()
        .map(|t| match t.definition() {
            Some(d) => d.id.clone(),
            None => match t {
                Token::Text { .. } => "<text>".to_string(),
                _ => "<unknown>".to_string(),
            },
        })
        .collect()
}

/// Assert that token spans are ordered, non-overlapping, and in bounds, and
/// that every uncovered byte is a control byte (the only thing the tokenizer
/// may drop).
#[allow(dead_code)]
pub fn assert_partition(result: &ParseResult<'_>, input: &[u8]) {
    let mut cursor = 0usize;
    for token in &result.tokens {
        let Span { start, end } = token.span();
        assert!(start <= end, "inverted span {start}..{end}");
        assert!(end <= input.len(), "span {start}..{end} past input end {}", input.len());
        assert!(start >= cursor, "token at {start} overlaps previous ending at {cursor}");
        for (offset, &b) in input[cursor..start].iter().enumerate() {
            assert!(
                b <= 0x1F,
                "non-control byte 0x{b:02X} at {} fell between tokens",
                cursor + offset
            );
        }
        cursor = end;
    }
    for (offset, &b) in input[cursor..].iter().enumerate() {
        assert!(
            b <= 0x1F,
            "non-control byte 0x{b:02X} at {} left after last token",
            cursor + offset
        );
    }
}
