use tracing::{debug, trace};

use super::diag::{Diagnostic, Span, codes};
use super::options::{ExpressionFailurePolicy, ParseOptions, UnknownControlPolicy};
use super::registry::{CONTROL_MAX, Registry, SignatureMatch};
use super::tables::LengthPolicy;
use super::token::{ParseResult, Token};
use crate::error::ParseError;
use crate::length_expr::evaluate_length;

/// Tokenize `input` with the default (historical) [`ParseOptions`].
pub fn tokenize<'r>(registry: &'r Registry, input: &[u8]) -> Result<ParseResult<'r>, ParseError> {
    tokenize_with_options(registry, input, &ParseOptions::default())
}

/// Tokenize `input` in a single pass.
///
/// Bytes `0x20..=0xFF` accumulate into text tokens. A byte `0x00..=0x1F`
/// closes any open text token and is looked up in `registry`; on a match the
/// command's payload is sized by its [`LengthPolicy`] and copied into a
/// command token anchored at the control byte. Unmatched control bytes are
/// handled per [`ParseOptions::unknown_control`].
///
/// Token spans partition the input in order; the only gaps are dropped
/// control bytes. A consumed NUL terminator belongs to its command's span.
pub fn tokenize_with_options<'r>(
    registry: &'r Registry,
    input: &[u8],
    options: &ParseOptions,
) -> Result<ParseResult<'r>, ParseError> {
    let mut tokens: Vec<Token<'r>> = Vec::new();
    let mut diagnostics = Vec::new();
    let mut open_text: Option<(usize, Vec<u8>)> = None;
    let mut i = 0usize;

    while i < input.len() {
        let c = input[i];

        // ── Literal print data ──────────────────────────────────────
        if c > CONTROL_MAX {
            let (_, bytes) = open_text.get_or_insert_with(|| (i, Vec::new()));
            bytes.try_reserve(1).map_err(|source| ParseError::OutOfMemory {
                address: i,
                requested: 1,
                source,
            })?;
            bytes.push(c);
            i += 1;
            continue;
        }

        // ── Control byte: command candidate ─────────────────────────
        if let Some((address, bytes)) = open_text.take() {
            push_token(&mut tokens, Token::Text { address, bytes })?;
        }

        let Some(m) = registry.longest_match(input, i) else {
            handle_unknown(&mut tokens, &mut diagnostics, options, i, c)?;
            i += 1;
            continue;
        };

        let token = command_token(m, input, i, options, &mut diagnostics)?;
        i = token.span().end;
        trace!(address = token.address(), end = i, token = %token, "command");
        push_token(&mut tokens, token)?;
    }

    if let Some((address, bytes)) = open_text {
        push_token(&mut tokens, Token::Text { address, bytes })?;
    }

    debug!(
        bytes = input.len(),
        tokens = tokens.len(),
        diagnostics = diagnostics.len(),
        "tokenized input"
    );
    Ok(ParseResult {
        tokens,
        diagnostics,
    })
}

fn push_token<'r>(tokens: &mut Vec<Token<'r>>, token: Token<'r>) -> Result<(), ParseError> {
    tokens
        .try_reserve(1)
        .map_err(|source| ParseError::OutOfMemory {
            address: token.address(),
            requested: 1,
            source,
        })?;
    tokens.push(token);
    Ok(())
}

fn handle_unknown(
    tokens: &mut Vec<Token<'_>>,
    diagnostics: &mut Vec<Diagnostic>,
    options: &ParseOptions,
    address: usize,
    byte: u8,
) -> Result<(), ParseError> {
    let span = Span::new(address, address + 1);
    let shown = format!("0x{byte:02X}");
    match options.unknown_control {
        UnknownControlPolicy::Drop => {
            diagnostics.push(
                Diagnostic::info(
                    codes::UNKNOWN_CONTROL_DROPPED,
                    format!("unknown control byte {shown} dropped"),
                    span,
                )
                .with("byte", &shown),
            );
        }
        UnknownControlPolicy::Emit => {
            diagnostics.push(
                Diagnostic::info(
                    codes::UNKNOWN_CONTROL_EMITTED,
                    format!("unknown control byte {shown}"),
                    span,
                )
                .with("byte", &shown),
            );
            push_token(tokens, Token::Unknown { address, byte })?;
        }
        UnknownControlPolicy::Abort => {
            return Err(ParseError::UnknownControlSequence { address, byte });
        }
    }
    Ok(())
}

/// Build the command token for a signature match at `address`.
fn command_token<'r>(
    m: SignatureMatch<'r>,
    input: &[u8],
    address: usize,
    options: &ParseOptions,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<Token<'r>, ParseError> {
    let def = m.definition;
    let payload_start = address + m.signature_len;
    let rest = &input[payload_start..];

    let (wanted, terminated) = match &def.length_policy {
        LengthPolicy::Fixed(total) => (total.saturating_sub(m.signature_len), false),
        LengthPolicy::NulTerminated => match rest.iter().position(|&b| b == 0x00) {
            Some(n) => (n, true),
            None => {
                diagnostics.push(
                    Diagnostic::info(
                        codes::MISSING_NUL_TERMINATOR,
                        format!("{} payload runs to end of input without a NUL terminator", def.id),
                        Span::new(address, input.len()),
                    )
                    .with("command", &def.id),
                );
                (rest.len(), false)
            }
        },
        LengthPolicy::Expression(formula) => match evaluate_length(formula, rest) {
            Ok(n) => (n, false),
            Err(source) => match options.expression_failure {
                ExpressionFailurePolicy::Zero => {
                    diagnostics.push(
                        Diagnostic::warn(
                            codes::LENGTH_EXPRESSION_FAILED,
                            format!("length expression of {} failed: {source}", def.id),
                            Span::new(address, payload_start),
                        )
                        .with("command", &def.id)
                        .with("formula", formula),
                    );
                    (0, false)
                }
                ExpressionFailurePolicy::Abort => {
                    return Err(ParseError::Expression {
                        address,
                        command: def.id.clone(),
                        source,
                    });
                }
            },
        },
        LengthPolicy::Implicit => (0, false),
    };

    let len = if wanted > rest.len() {
        diagnostics.push(
            Diagnostic::warn(
                codes::PAYLOAD_TRUNCATED,
                format!(
                    "{} expects {wanted} payload byte(s) but only {} remain",
                    def.id,
                    rest.len()
                ),
                Span::new(address, input.len()),
            )
            .with("command", &def.id)
            .with("expected", wanted)
            .with("available", rest.len()),
        );
        rest.len()
    } else {
        wanted
    };

    let mut payload = Vec::new();
    payload
        .try_reserve_exact(len)
        .map_err(|source| ParseError::OutOfMemory {
            address,
            requested: len,
            source,
        })?;
    payload.extend_from_slice(&rest[..len]);

    Ok(Token::Command {
        address,
        end: payload_start + len + usize::from(terminated),
        definition: def,
        payload,
    })
}
