use std::fmt;

use serde::{Serialize, Serializer};

use super::diag::{Diagnostic, Span};
use super::tables::{CommandDefinition, hex::format_hex_bytes};

fn serialize_hex<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_hex_bytes(bytes))
}

fn serialize_text<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&String::from_utf8_lossy(bytes))
}

fn serialize_byte<S: Serializer>(byte: &u8, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_hex_bytes(&[*byte]))
}

fn serialize_definition_id<S: Serializer>(
    definition: &&CommandDefinition,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&definition.id)
}

/// One unit of tokenizer output.
///
/// Command tokens borrow their definition from the [`Registry`](super::registry::Registry)
/// that produced them; payload and text bytes are owned by the token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
#[non_exhaustive]
pub enum Token<'r> {
    /// A run of literal print data (bytes `0x20..=0xFF`).
    Text {
        /// Offset of the first byte.
        address: usize,
        /// The literal bytes.
        #[serde(rename = "text", serialize_with = "serialize_text")]
        bytes: Vec<u8>,
    },
    /// A recognized command.
    Command {
        /// Offset of the command's first signature byte.
        address: usize,
        /// Offset one past the last consumed byte, including a consumed NUL
        /// terminator.
        end: usize,
        /// The matched definition.
        #[serde(rename = "command", serialize_with = "serialize_definition_id")]
        definition: &'r CommandDefinition,
        /// Bytes following the signature, sized by the length policy.
        #[serde(serialize_with = "serialize_hex")]
        payload: Vec<u8>,
    },
    /// A control byte that starts no registered signature. Only produced
    /// under [`UnknownControlPolicy::Emit`](super::options::UnknownControlPolicy::Emit).
    Unknown {
        /// Offset of the byte.
        address: usize,
        /// The byte value.
        #[serde(serialize_with = "serialize_byte")]
        byte: u8,
    },
}

impl Token<'_> {
    /// Offset in the input where the token begins.
    pub fn address(&self) -> usize {
        match self {
            Token::Text { address, .. }
            | Token::Command { address, .. }
            | Token::Unknown { address, .. } => *address,
        }
    }

    /// Input bytes covered by the token.
    pub fn span(&self) -> Span {
        match self {
            Token::Text { address, bytes } => Span::new(*address, address + bytes.len()),
            Token::Command { address, end, .. } => Span::new(*address, *end),
            Token::Unknown { address, .. } => Span::new(*address, address + 1),
        }
    }

    /// The matched definition, for command tokens.
    pub fn definition(&self) -> Option<&CommandDefinition> {
        match self {
            Token::Command { definition, .. } => Some(definition),
            _ => None,
        }
    }

    /// Payload (command) or literal bytes (text).
    pub fn data(&self) -> &[u8] {
        match self {
            Token::Text { bytes, .. } => bytes,
            Token::Command { payload, .. } => payload,
            Token::Unknown { byte, .. } => std::slice::from_ref(byte),
        }
    }
}

/// One listing line: `0x000D: <text "Hello World">`, `0x0019: <cut_paper 0x00>`.
impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04X}: ", self.address())?;
        match self {
            Token::Text { bytes, .. } => write!(f, "<text \"{}\">", bytes.escape_ascii()),
            Token::Command {
                definition,
                payload,
                ..
            } => {
                write!(f, "<{}", definition.id)?;
                for b in payload {
                    write!(f, " 0x{b:02X}")?;
                }
                write!(f, ">")
            }
            Token::Unknown { byte, .. } => write!(f, "<unknown 0x{byte:02X}>"),
        }
    }
}

/// Output of a tokenizer run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseResult<'r> {
    /// Tokens in address order.
    pub tokens: Vec<Token<'r>>,
    /// Recoverable conditions found while scanning.
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseResult<'_> {
    /// Number of tokens produced.
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }
}
