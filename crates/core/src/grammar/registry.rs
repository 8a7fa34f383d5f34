use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::tables::{CommandDefinition, CommandTable, LengthPolicy, hex::format_hex_bytes};
use crate::error::RegistryError;

/// Highest byte value that can begin a command signature.
pub const CONTROL_MAX: u8 = 0x1F;

/// How [`Registry::register`] treats signatures that collide with earlier ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationMode {
    /// Reject prefix collisions, duplicates, and malformed definitions.
    #[default]
    Strict,
    /// Accept everything. A definition whose terminal trie node already
    /// exists is discarded, which silently shadows it.
    Legacy,
}

type NodeId = usize;

const ROOT: NodeId = 0;

/// One byte position along some signature(s).
#[derive(Debug, Clone, Default)]
struct Node {
    /// Edge label from the parent; `None` only for the root.
    byte: Option<u8>,
    children: BTreeMap<u8, NodeId>,
    /// Index into `Registry::definitions`.
    definition: Option<usize>,
}

/// The result of a successful [`Registry::longest_match`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureMatch<'r> {
    /// The definition on the node where the walk came to rest.
    pub definition: &'r CommandDefinition,
    /// Number of input bytes the signature consumed.
    pub signature_len: usize,
}

/// Command registry: a byte-keyed trie from signatures to definitions.
///
/// Nodes live in a flat arena indexed by id, so dropping a registry never
/// recurses regardless of signature depth. The registry owns every definition
/// it accepted; tokens borrow them, which keeps a registry alive for as long
/// as any token referring to it.
#[derive(Debug, Clone)]
pub struct Registry {
    nodes: Vec<Node>,
    definitions: Vec<CommandDefinition>,
    mode: RegistrationMode,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// An empty registry in [`RegistrationMode::Strict`].
    pub fn new() -> Self {
        Self::with_mode(RegistrationMode::Strict)
    }

    /// An empty registry using the given registration mode.
    pub fn with_mode(mode: RegistrationMode) -> Self {
        Self {
            nodes: vec![Node::default()],
            definitions: Vec::new(),
            mode,
        }
    }

    /// Build a registry from a table, registering its commands in order.
    ///
    /// Stops at the first rejected definition.
    pub fn from_table(table: &CommandTable, mode: RegistrationMode) -> Result<Self, RegistryError> {
        let mut registry = Self::with_mode(mode);
        for def in &table.commands {
            registry.register(def.clone())?;
        }
        Ok(registry)
    }

    /// The registration mode.
    pub fn mode(&self) -> RegistrationMode {
        self.mode
    }

    /// Number of definitions reachable through the trie.
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Whether no definition has been registered.
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Registered definitions in registration order.
    pub fn definitions(&self) -> impl Iterator<Item = &CommandDefinition> {
        self.definitions.iter()
    }

    /// First registered definition with the given id.
    pub fn find_by_id(&self, id: &str) -> Option<&CommandDefinition> {
        self.definitions.iter().find(|d| d.id == id)
    }

    /// Add a definition.
    ///
    /// Ids are not checked for uniqueness. In strict mode the definition is
    /// validated first (see [`RegistryError`]). In legacy mode the call always
    /// succeeds, but the definition is only attached when its terminal node is
    /// created by this call.
    pub fn register(&mut self, definition: CommandDefinition) -> Result<(), RegistryError> {
        match self.mode {
            RegistrationMode::Strict => {
                self.validate(&definition)?;
                let (terminal, _) = self.insert_path(&definition.signature);
                self.attach(terminal, definition);
            }
            RegistrationMode::Legacy => {
                let (terminal, created) = self.insert_path(&definition.signature);
                if created {
                    self.attach(terminal, definition);
                } else {
                    warn!(
                        id = %definition.id,
                        signature = %format_hex_bytes(&definition.signature),
                        "signature node already exists; definition discarded"
                    );
                }
            }
        }
        Ok(())
    }

    /// Greedy longest-chain walk starting at `input[start]`.
    ///
    /// The walk descends while the current node has children and the next
    /// input byte keys one of them; it never backtracks. The match is the
    /// definition on the node where it stops, if any.
    pub fn longest_match(&self, input: &[u8], start: usize) -> Option<SignatureMatch<'_>> {
        let mut node = self.child(ROOT, *input.get(start)?)?;
        let mut len = 1usize;
        while !self.nodes[node].children.is_empty() {
            let Some(next) = input
                .get(start + len)
                .and_then(|&b| self.child(node, b))
            else {
                break;
            };
            node = next;
            len += 1;
        }
        let idx = self.nodes[node].definition?;
        Some(SignatureMatch {
            definition: &self.definitions[idx],
            signature_len: len,
        })
    }

    fn child(&self, node: NodeId, byte: u8) -> Option<NodeId> {
        self.nodes[node].children.get(&byte).copied()
    }

    /// Walk/extend the trie along `signature`. Returns the terminal node and
    /// whether this call created it. An empty signature resolves to the root,
    /// which is never reported as created.
    fn insert_path(&mut self, signature: &[u8]) -> (NodeId, bool) {
        let mut node = ROOT;
        let mut created = false;
        for &byte in signature {
            match self.child(node, byte) {
                Some(next) => {
                    node = next;
                    created = false;
                }
                None => {
                    let id = self.nodes.len();
                    self.nodes.push(Node {
                        byte: Some(byte),
                        ..Node::default()
                    });
                    self.nodes[node].children.insert(byte, id);
                    node = id;
                    created = true;
                }
            }
        }
        (node, created)
    }

    fn attach(&mut self, node: NodeId, definition: CommandDefinition) {
        debug_assert!(self.nodes[node].byte.is_some(), "definitions never sit on the root");
        debug!(
            id = %definition.id,
            signature = %format_hex_bytes(&definition.signature),
            length = %definition.length_policy,
            "registered command"
        );
        self.nodes[node].definition = Some(self.definitions.len());
        self.definitions.push(definition);
    }

    fn validate(&self, def: &CommandDefinition) -> Result<(), RegistryError> {
        let Some(&lead) = def.signature.first() else {
            return Err(RegistryError::EmptySignature { id: def.id.clone() });
        };
        if lead > CONTROL_MAX {
            return Err(RegistryError::NonControlLeadByte {
                id: def.id.clone(),
                byte: lead,
            });
        }
        if let LengthPolicy::Fixed(total) = def.length_policy
            && total < def.signature.len()
        {
            return Err(RegistryError::FixedLengthTooShort {
                id: def.id.clone(),
                total,
                signature_len: def.signature.len(),
            });
        }

        let mut node = ROOT;
        for (i, &byte) in def.signature.iter().enumerate() {
            let Some(next) = self.child(node, byte) else {
                return Ok(());
            };
            node = next;
            if let Some(idx) = self.nodes[node].definition
                && i + 1 < def.signature.len()
            {
                return Err(self.ambiguous(def, idx));
            }
        }

        // Every byte already exists in the trie.
        if let Some(idx) = self.nodes[node].definition {
            return Err(RegistryError::DuplicateSignature {
                id: def.id.clone(),
                signature: format_hex_bytes(&def.signature),
                existing: self.definitions[idx].id.clone(),
            });
        }
        match self.first_definition_below(node) {
            Some(idx) => Err(self.ambiguous(def, idx)),
            None => Ok(()),
        }
    }

    fn ambiguous(&self, def: &CommandDefinition, existing: usize) -> RegistryError {
        RegistryError::AmbiguousSignature {
            id: def.id.clone(),
            signature: format_hex_bytes(&def.signature),
            existing: self.definitions[existing].id.clone(),
        }
    }

    /// Iterative depth-first search for any definition under `node`.
    fn first_definition_below(&self, node: NodeId) -> Option<usize> {
        let mut stack = vec![node];
        while let Some(n) = stack.pop() {
            if let Some(idx) = self.nodes[n].definition {
                return Some(idx);
            }
            stack.extend(self.nodes[n].children.values().rev());
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(id: &str, sig: &[u8], policy: LengthPolicy) -> CommandDefinition {
        CommandDefinition::new(id, sig, policy, "")
    }

    #[test]
    fn matches_registered_signature() {
        let mut reg = Registry::new();
        reg.register(def("init", &[0x1B, 0x40], LengthPolicy::Fixed(2)))
            .unwrap();
        let m = reg.longest_match(&[0x1B, 0x40], 0).unwrap();
        assert_eq!(m.definition.id, "init");
        assert_eq!(m.signature_len, 2);
    }

    #[test]
    fn no_match_for_unregistered_lead_byte() {
        let mut reg = Registry::new();
        reg.register(def("lf", &[0x0A], LengthPolicy::Fixed(1)))
            .unwrap();
        assert!(reg.longest_match(&[0x07], 0).is_none());
        assert!(reg.longest_match(&[0x0A], 1).is_none());
    }

    #[test]
    fn partial_signature_does_not_match() {
        let mut reg = Registry::new();
        reg.register(def("init", &[0x1B, 0x40], LengthPolicy::Fixed(2)))
            .unwrap();
        // Walk rests on the intermediate 1B node, which carries no definition.
        assert!(reg.longest_match(&[0x1B, 0x41], 0).is_none());
        assert!(reg.longest_match(&[0x1B], 0).is_none());
    }

    #[test]
    fn strict_rejects_new_signature_extending_existing() {
        let mut reg = Registry::new();
        reg.register(def("esc", &[0x1B], LengthPolicy::Fixed(1)))
            .unwrap();
        let err = reg
            .register(def("init", &[0x1B, 0x40], LengthPolicy::Fixed(2)))
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::AmbiguousSignature {
                id: "init".into(),
                signature: "1B 40".into(),
                existing: "esc".into(),
            }
        );
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn strict_rejects_new_signature_that_prefixes_existing() {
        let mut reg = Registry::new();
        reg.register(def("qr", &[0x1D, 0x28, 0x6B], LengthPolicy::Implicit))
            .unwrap();
        let err = reg
            .register(def("gs_paren", &[0x1D, 0x28], LengthPolicy::Implicit))
            .unwrap_err();
        assert!(
            matches!(err, RegistryError::AmbiguousSignature { ref existing, .. } if existing == "qr"),
            "{err:?}"
        );
    }

    #[test]
    fn strict_rejects_duplicate() {
        let mut reg = Registry::new();
        reg.register(def("lf", &[0x0A], LengthPolicy::Fixed(1)))
            .unwrap();
        let err = reg
            .register(def("lf2", &[0x0A], LengthPolicy::Fixed(1)))
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateSignature { .. }));
    }

    #[test]
    fn strict_rejects_malformed_definitions() {
        let mut reg = Registry::new();
        assert!(matches!(
            reg.register(def("empty", &[], LengthPolicy::Implicit)),
            Err(RegistryError::EmptySignature { .. })
        ));
        assert!(matches!(
            reg.register(def("ff", &[0xFF], LengthPolicy::Fixed(1))),
            Err(RegistryError::NonControlLeadByte { byte: 0xFF, .. })
        ));
        assert!(matches!(
            reg.register(def("short", &[0x1B, 0x61], LengthPolicy::Fixed(1))),
            Err(RegistryError::FixedLengthTooShort {
                total: 1,
                signature_len: 2,
                ..
            })
        ));
        assert!(reg.is_empty());
    }

    #[test]
    fn strict_allows_siblings_under_shared_intermediate() {
        let mut reg = Registry::new();
        reg.register(def("a", &[0x1D, 0x28, 0x4C], LengthPolicy::Implicit))
            .unwrap();
        reg.register(def("b", &[0x1D, 0x28, 0x6B], LengthPolicy::Implicit))
            .unwrap();
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn legacy_discards_definition_when_terminal_exists() {
        let mut reg = Registry::with_mode(RegistrationMode::Legacy);
        reg.register(def("init", &[0x1B, 0x40], LengthPolicy::Fixed(2)))
            .unwrap();
        // 1B already exists as an intermediate node: silently shadowed.
        reg.register(def("esc", &[0x1B], LengthPolicy::Fixed(1)))
            .unwrap();
        // Exact duplicate: also discarded, first one wins.
        reg.register(def("init2", &[0x1B, 0x40], LengthPolicy::Fixed(2)))
            .unwrap();
        assert_eq!(reg.len(), 1);
        assert!(reg.find_by_id("esc").is_none());
        assert!(reg.longest_match(&[0x1B, 0x41], 0).is_none());
        assert_eq!(
            reg.longest_match(&[0x1B, 0x40], 0).unwrap().definition.id,
            "init"
        );
    }

    #[test]
    fn legacy_prefix_registered_first_only_matches_off_path() {
        let mut reg = Registry::with_mode(RegistrationMode::Legacy);
        reg.register(def("esc", &[0x1B], LengthPolicy::Fixed(1)))
            .unwrap();
        reg.register(def("init", &[0x1B, 0x40], LengthPolicy::Fixed(2)))
            .unwrap();
        // Greedy walk continues past the 1B definition when the input does.
        let m = reg.longest_match(&[0x1B, 0x40], 0).unwrap();
        assert_eq!(m.definition.id, "init");
        // When the continuation does not match, the walk rests on 1B.
        let m = reg.longest_match(&[0x1B, 0x41], 0).unwrap();
        assert_eq!(m.definition.id, "esc");
        assert_eq!(m.signature_len, 1);
    }

    #[test]
    fn walk_stops_at_end_of_input() {
        let mut reg = Registry::new();
        reg.register(def("raster", &[0x1D, 0x76, 0x30], LengthPolicy::Implicit))
            .unwrap();
        assert!(reg.longest_match(&[0x1D, 0x76], 0).is_none());
    }

    #[test]
    fn builtin_table_registers_strictly() {
        let reg = Registry::from_table(&CommandTable::builtin(), RegistrationMode::Strict).unwrap();
        assert_eq!(reg.len(), CommandTable::builtin().commands.len());
        assert!(reg.find_by_id("print_barcode_simple").is_some());
    }

    #[test]
    fn registry_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Registry>();
    }
}
