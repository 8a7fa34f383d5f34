//! ESC/POS command tables.
//!
//! Defines the data structures for command metadata: a [`CommandDefinition`]
//! names a command, spells its byte signature, and says how long its payload
//! is via a [`LengthPolicy`].  Definitions are grouped into a [`CommandTable`],
//! which can be deserialized from JSON or taken from the built-in ESC/POS set
//! in [`builtin`], and are consumed by the tokenizer's command registry.

#![warn(missing_docs)]

/// The built-in ESC/POS command set.
pub mod builtin;
/// Hex byte-string helpers shared by tables and token serialization.
pub mod hex;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ─── Custom serde for signatures ────────────────────────────────────────────
// Signatures are raw bytes, but tables are edited by hand, so they are written
// as hex strings ("1B 40") in JSON and converted to `Vec<u8>` on load.

fn deserialize_signature<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    hex::parse_hex_bytes(&text).map_err(serde::de::Error::custom)
}

fn serialize_signature<S>(signature: &[u8], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&hex::format_hex_bytes(signature))
}

/// Current format version for command table JSON files.
pub const TABLE_FORMAT_VERSION: &str = "1.0.0";

/// How the payload length of a command is determined.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum LengthPolicy {
    /// Total command length (signature included) is fixed.
    Fixed(usize),
    /// Payload runs until a 0x00 byte (consumed, not part of the payload)
    /// or the end of the input.
    NulTerminated,
    /// Payload length is computed by a formula over the bytes that follow
    /// the signature, e.g. `"2 + d(0) + d(1)*256"`.
    Expression(String),
    /// No payload.
    #[default]
    Implicit,
}

impl std::fmt::Display for LengthPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LengthPolicy::Fixed(total) => write!(f, "fixed({total})"),
            LengthPolicy::NulTerminated => write!(f, "nul-terminated"),
            LengthPolicy::Expression(formula) => write!(f, "expression({formula})"),
            LengthPolicy::Implicit => write!(f, "implicit"),
        }
    }
}

/// Static metadata for one command.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CommandDefinition {
    /// Human-readable identifier (e.g., `"line_feed"`). Not required to be unique.
    pub id: String,
    /// Byte signature. The first byte must be a control byte (`0x00..=0x1F`).
    #[serde(
        deserialize_with = "deserialize_signature",
        serialize_with = "serialize_signature"
    )]
    pub signature: Vec<u8>,
    /// Payload length rule.
    #[serde(default, rename = "length")]
    pub length_policy: LengthPolicy,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
}

impl CommandDefinition {
    /// Create a definition from its parts.
    pub fn new(
        id: impl Into<String>,
        signature: impl Into<Vec<u8>>,
        length_policy: LengthPolicy,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            signature: signature.into(),
            length_policy,
            description: description.into(),
        }
    }

    /// The signature rendered as space-separated uppercase hex (`"1B 40"`).
    pub fn signature_hex(&self) -> String {
        hex::format_hex_bytes(&self.signature)
    }
}

/// Errors raised while loading a command table.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum TableError {
    /// The table JSON could not be parsed.
    #[error("invalid command table: {0}")]
    Json(#[from] serde_json::Error),

    /// The table declares a format version this build does not understand.
    #[error("unsupported command table format version {found} (expected {expected})")]
    UnsupportedFormatVersion {
        /// Version found in the file.
        found: String,
        /// Version this build reads.
        expected: &'static str,
    },
}

/// An ordered set of command definitions.
///
/// Order matters: definitions are registered in sequence, and in legacy
/// registration mode a later signature that collides with an earlier one is
/// silently shadowed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CommandTable {
    /// Table format version for compatibility checks.
    #[serde(default = "default_format_version")]
    pub format_version: String,
    /// Definitions in registration order.
    pub commands: Vec<CommandDefinition>,
}

fn default_format_version() -> String {
    TABLE_FORMAT_VERSION.to_string()
}

impl CommandTable {
    /// Create a table at the current format version.
    pub fn new(commands: Vec<CommandDefinition>) -> Self {
        Self {
            format_version: default_format_version(),
            commands,
        }
    }

    /// The built-in ESC/POS command set.
    pub fn builtin() -> Self {
        Self::new(builtin::escpos_commands())
    }

    /// Parse a table from JSON text.
    ///
    /// Only the major component of `formatVersion` must match.
    pub fn from_json(json: &str) -> Result<Self, TableError> {
        let table: CommandTable = serde_json::from_str(json)?;
        if major(&table.format_version) != major(TABLE_FORMAT_VERSION) {
            return Err(TableError::UnsupportedFormatVersion {
                found: table.format_version,
                expected: TABLE_FORMAT_VERSION,
            });
        }
        Ok(table)
    }

    /// Append the definitions of `other` after this table's.
    pub fn extend(&mut self, other: CommandTable) {
        self.commands.extend(other.commands);
    }
}

fn major(version: &str) -> &str {
    version.split('.').next().unwrap_or(version)
}
