//! Fuzz smoke tests for the tokenizer.
//!
//! Random and adversarial byte streams are tokenized against the demo and
//! built-in command sets under every policy combination. The tokenizer must
//! never panic, and every successful result must partition its input.
//!
//! A simple deterministic PRNG provides reproducible randomness.

mod common;

use common::{DEMO_DATA, DEMO_REGISTRY, assert_partition};
use escpos_toolchain_core::{
    CommandTable, ExpressionFailurePolicy, ParseError, ParseOptions, RegistrationMode, Registry,
    UnknownControlPolicy, tokenize_with_options,
};

// ─── Simple deterministic PRNG (LCG) ────────────────────────────────────────

struct SimpleRng(u64);

impl SimpleRng {
    fn new(seed: u64) -> Self {
        Self(seed)
    }

    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0
    }

    fn gen_range(&mut self, max: usize) -> usize {
        (self.next() >> 33) as usize % max
    }

    fn gen_bytes(&mut self, len: usize) -> Vec<u8> {
        (0..len).map(|_| (self.next() >> 56) as u8).collect()
    }

    /// Bytes biased toward control codes and signature continuation bytes.
    fn gen_escpos_like(&mut self, len: usize) -> Vec<u8> {
        const HOT: &[u8] = &[
            0x00, 0x0A, 0x1B, 0x1D, 0x28, 0x2A, 0x30, 0x40, 0x4C, 0x6B, 0x76, 0xFF,
        ];
        (0..len)
            .map(|_| {
                if self.gen_range(3) == 0 {
                    (self.next() >> 56) as u8
                } else {
                    HOT[self.gen_range(HOT.len())]
                }
            })
            .collect()
    }
}

fn all_options() -> Vec<ParseOptions> {
    let mut out = Vec::new();
    for unknown in [
        UnknownControlPolicy::Drop,
        UnknownControlPolicy::Emit,
        UnknownControlPolicy::Abort,
    ] {
        for expr in [ExpressionFailurePolicy::Zero, ExpressionFailurePolicy::Abort] {
            out.push(
                ParseOptions::default()
                    .with_unknown_control(unknown)
                    .with_expression_failure(expr),
            );
        }
    }
    out
}

fn builtin_registry() -> Registry {
    Registry::from_table(&CommandTable::builtin(), RegistrationMode::Strict)
        .expect("built-in table registers")
}

/// Tokenize under every option set and check invariants on each outcome.
fn check(registry: &Registry, input: &[u8]) {
    for opts in all_options() {
        match tokenize_with_options(registry, input, &opts) {
            Ok(res) => {
                assert_partition(&res, input);
                if opts.unknown_control == UnknownControlPolicy::Emit {
                    let covered: usize = res.tokens.iter().map(|t| t.span().len()).sum();
                    assert_eq!(covered, input.len(), "emit mode must cover every byte");
                }
            }
            Err(ParseError::UnknownControlSequence { address, byte }) => {
                assert_eq!(opts.unknown_control, UnknownControlPolicy::Abort);
                assert_eq!(input[address], byte);
                assert!(byte <= 0x1F);
            }
            Err(ParseError::Expression { .. }) => {
                assert_eq!(opts.expression_failure, ExpressionFailurePolicy::Abort);
            }
            Err(other) => panic!("unexpected error {other} for input {input:02X?}"),
        }
    }
}

#[test]
fn random_bytes_never_panic() {
    let reg = builtin_registry();
    let mut rng = SimpleRng::new(0xE5C0_0005);
    for _ in 0..500 {
        let len = rng.gen_range(96);
        let input = rng.gen_bytes(len);
        check(&reg, &input);
        check(&DEMO_REGISTRY, &input);
    }
}

#[test]
fn escpos_like_bytes_never_panic() {
    let reg = builtin_registry();
    let mut rng = SimpleRng::new(42);
    for _ in 0..500 {
        let len = rng.gen_range(128);
        let input = rng.gen_escpos_like(len);
        check(&reg, &input);
        check(&DEMO_REGISTRY, &input);
    }
}

#[test]
fn every_truncation_of_demo_receipt() {
    for end in 0..=DEMO_DATA.len() {
        check(&DEMO_REGISTRY, &DEMO_DATA[..end]);
    }
}

#[test]
fn every_suffix_of_demo_receipt() {
    for start in 0..=DEMO_DATA.len() {
        check(&DEMO_REGISTRY, &DEMO_DATA[start..]);
    }
}

#[test]
fn huge_declared_lengths_are_clamped() {
    let reg = builtin_registry();
    // GS v 0 with 0xFFFF x 0xFFFF declared and almost no data.
    let input = [0x1D, 0x76, 0x30, 0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0x01];
    check(&reg, &input);
}

#[test]
fn only_control_bytes() {
    let input: Vec<u8> = (0x00..=0x1F).cycle().take(256).collect();
    check(&builtin_registry(), &input);
    check(&DEMO_REGISTRY, &input);
}
