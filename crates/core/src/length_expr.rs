//! Payload length expressions.
//!
//! Some ESC/POS commands carry their payload size inside the payload itself,
//! e.g. `GS ( k pL pH …` whose remaining length is `pL + pH * 256`.  A command
//! definition describes that rule as a small arithmetic formula in which
//! `d(i)` reads the byte at offset `i` after the command's signature:
//!
//! ```
//! use escpos_toolchain_core::length_expr::evaluate_length;
//!
//! let after_signature = [0x03, 0x00, 0x31, 0x50, 0x30];
//! assert_eq!(evaluate_length("2 + d(0) + d(1)*256", &after_signature), Ok(5));
//! ```
//!
//! The grammar is a subset of the usual calculator language: numbers (decimal
//! or `0x` hex), `+ - * / % ^`, unary signs, parentheses, the constants `pi`
//! and `e`, and the functions `d`, `abs`, `ceil`, `floor`, `sqrt`, `exp`, `ln`,
//! `log10`, `fac`, `pow`, `ncr` and `npr`.  All binary operators are
//! left-associative; unary signs bind tighter than `^`.  Decimal literals may
//! carry an exponent (`1e3`, `2.5E-1`).
//!
//! Formulas come from user-editable tables, so both nesting depth and the
//! number of operations are capped; exceeding either is
//! [`ExprError::TooDeep`] rather than unbounded recursion.

use std::fmt;
use std::str::FromStr;

/// A length expression failed to compile or evaluate.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum ExprError {
    /// A character that cannot start or continue a token.
    #[error("unexpected character {found:?} at offset {offset}")]
    UnexpectedChar {
        /// Byte offset in the formula.
        offset: usize,
        /// The offending character.
        found: char,
    },
    /// The formula ended where an operand or `)` was expected.
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    /// A name that is neither a known function nor a constant.
    #[error("unknown identifier {name:?} at offset {offset}")]
    UnknownIdentifier {
        /// The identifier as written.
        name: String,
        /// Byte offset in the formula.
        offset: usize,
    },
    /// A function was called with the wrong number of arguments.
    #[error("{name}() expects {expected} argument(s), got {found}")]
    WrongArity {
        /// Function name.
        name: &'static str,
        /// Declared arity.
        expected: usize,
        /// Arguments supplied.
        found: usize,
    },
    /// A numeric literal that does not parse.
    #[error("invalid number {text:?} at offset {offset}")]
    InvalidNumber {
        /// The literal as written.
        text: String,
        /// Byte offset in the formula.
        offset: usize,
    },
    /// Input left over after a complete expression.
    #[error("unexpected input at offset {offset}")]
    TrailingInput {
        /// Byte offset in the formula.
        offset: usize,
    },
    /// `d(i)` read past the bytes available after the signature.
    #[error("d({index}) is out of range: {available} byte(s) follow the signature")]
    DataIndexOutOfRange {
        /// The evaluated index argument.
        index: f64,
        /// Bytes available to the accessor.
        available: usize,
    },
    /// The formula nests or chains more operations than the evaluator allows.
    #[error("expression is too deeply nested or too long (limit {limit})")]
    TooDeep {
        /// The exceeded limit.
        limit: usize,
    },
    /// The result is negative, NaN, infinite, or too large for a length.
    #[error("expression evaluated to {value}, which is not a valid length")]
    InvalidLength {
        /// The evaluated value.
        value: f64,
    },
}

/// Deepest `(`, call or unary-sign nesting accepted.
const MAX_DEPTH: usize = 256;
/// Most operator and call nodes in one formula. Also bounds evaluation depth.
const MAX_NODES: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Func {
    Data,
    Abs,
    Ceil,
    Floor,
    Sqrt,
    Exp,
    Ln,
    Log10,
    Fac,
    Pow,
    Ncr,
    Npr,
}

impl Func {
    fn lookup(name: &str) -> Option<Self> {
        Some(match name {
            "d" => Func::Data,
            "abs" => Func::Abs,
            "ceil" => Func::Ceil,
            "floor" => Func::Floor,
            "sqrt" => Func::Sqrt,
            "exp" => Func::Exp,
            "ln" => Func::Ln,
            "log10" => Func::Log10,
            "fac" => Func::Fac,
            "pow" => Func::Pow,
            "ncr" => Func::Ncr,
            "npr" => Func::Npr,
            _ => return None,
        })
    }

    fn name(self) -> &'static str {
        match self {
            Func::Data => "d",
            Func::Abs => "abs",
            Func::Ceil => "ceil",
            Func::Floor => "floor",
            Func::Sqrt => "sqrt",
            Func::Exp => "exp",
            Func::Ln => "ln",
            Func::Log10 => "log10",
            Func::Fac => "fac",
            Func::Pow => "pow",
            Func::Ncr => "ncr",
            Func::Npr => "npr",
        }
    }

    fn arity(self) -> usize {
        match self {
            Func::Pow | Func::Ncr | Func::Npr => 2,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Num(f64),
    Neg(Box<Node>),
    Bin(BinOp, Box<Node>, Box<Node>),
    Call(Func, Vec<Node>),
}

/// A compiled length expression.
///
/// Compilation is independent of any payload; the `d(i)` accessor is bound to
/// a byte slice only for the duration of one [`LengthExpr::eval`] call, so a
/// compiled expression can be shared freely between threads.
#[derive(Debug, Clone, PartialEq)]
pub struct LengthExpr {
    source: String,
    root: Node,
}

impl LengthExpr {
    /// Compile a formula.
    pub fn compile(formula: &str) -> Result<Self, ExprError> {
        let mut parser = Parser {
            src: formula,
            pos: 0,
            depth: 0,
            nodes: 0,
        };
        let root = parser.expr()?;
        parser.skip_ws();
        if parser.pos < formula.len() {
            return Err(ExprError::TrailingInput { offset: parser.pos });
        }
        Ok(Self {
            source: formula.to_string(),
            root,
        })
    }

    /// The formula text this expression was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate with `d(i)` reading from `data`.
    pub fn eval(&self, data: &[u8]) -> Result<f64, ExprError> {
        eval_node(&self.root, data)
    }
}

impl FromStr for LengthExpr {
    type Err = ExprError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::compile(s)
    }
}

impl fmt::Display for LengthExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Compile `formula`, evaluate it against `data`, and convert the result to a
/// byte count (fractions truncate toward zero).
///
/// The formula is compiled on every call.
pub fn evaluate_length(formula: &str, data: &[u8]) -> Result<usize, ExprError> {
    let value = LengthExpr::compile(formula)?.eval(data)?;
    to_length(value)
}

fn to_length(value: f64) -> Result<usize, ExprError> {
    // `usize::MAX as f64` rounds up, so `>=` also rejects values that would saturate.
    if !value.is_finite() || value < 0.0 || value >= usize::MAX as f64 {
        return Err(ExprError::InvalidLength { value });
    }
    Ok(value as usize)
}

// ── Evaluation ──────────────────────────────────────────────────────────

fn eval_node(node: &Node, data: &[u8]) -> Result<f64, ExprError> {
    Ok(match node {
        Node::Num(v) => *v,
        Node::Neg(inner) => -eval_node(inner, data)?,
        Node::Bin(op, lhs, rhs) => {
            let a = eval_node(lhs, data)?;
            let b = eval_node(rhs, data)?;
            match op {
                BinOp::Add => a + b,
                BinOp::Sub => a - b,
                BinOp::Mul => a * b,
                BinOp::Div => a / b,
                BinOp::Rem => a % b,
                BinOp::Pow => a.powf(b),
            }
        }
        Node::Call(func, args) => {
            let a = eval_node(&args[0], data)?;
            match func {
                Func::Data => read_data(a, data)?,
                Func::Abs => a.abs(),
                Func::Ceil => a.ceil(),
                Func::Floor => a.floor(),
                Func::Sqrt => a.sqrt(),
                Func::Exp => a.exp(),
                Func::Ln => a.ln(),
                Func::Log10 => a.log10(),
                Func::Fac => factorial(a),
                Func::Pow => a.powf(eval_node(&args[1], data)?),
                Func::Ncr => combinations(a, eval_node(&args[1], data)?),
                Func::Npr => {
                    let r = eval_node(&args[1], data)?;
                    combinations(a, r) * factorial(r)
                }
            }
        }
    })
}

fn read_data(index: f64, data: &[u8]) -> Result<f64, ExprError> {
    let byte = if index.is_finite() && index >= 0.0 {
        data.get(index as usize)
    } else {
        None
    };
    byte.map(|b| f64::from(*b))
        .ok_or(ExprError::DataIndexOutOfRange {
            index,
            available: data.len(),
        })
}

fn factorial(a: f64) -> f64 {
    if a.is_nan() || a < 0.0 {
        return f64::NAN;
    }
    let n = a.floor();
    if n > 170.0 {
        return f64::INFINITY;
    }
    (1..=n as u32).fold(1.0, |acc, k| acc * f64::from(k))
}

fn combinations(n: f64, r: f64) -> f64 {
    if n.is_nan() || r.is_nan() || n < 0.0 || r < 0.0 || n < r {
        return f64::NAN;
    }
    let (n, r) = (n.floor(), r.floor());
    let r = if r > n - r { n - r } else { r };
    let mut result: f64 = 1.0;
    let mut i = 1.0;
    // Each step multiplies by at least 2, so this overflows quickly for huge r.
    while i <= r && result.is_finite() {
        result = result * (n - r + i) / i;
        i += 1.0;
    }
    result
}

// ── Parsing ─────────────────────────────────────────────────────────────

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
    nodes: usize,
}

impl Parser<'_> {
    fn descend(&mut self) -> Result<(), ExprError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ExprError::TooDeep { limit: MAX_DEPTH });
        }
        Ok(())
    }

    fn ascend(&mut self) {
        self.depth -= 1;
    }

    /// Account for one operator or call node.
    fn node(&mut self) -> Result<(), ExprError> {
        self.nodes += 1;
        if self.nodes > MAX_NODES {
            return Err(ExprError::TooDeep { limit: MAX_NODES });
        }
        Ok(())
    }

    fn skip_ws(&mut self) {
        let rest = &self.src[self.pos..];
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn peek(&mut self) -> Option<char> {
        self.skip_ws();
        self.src[self.pos..].chars().next()
    }

    fn eat(&mut self, ch: char) -> bool {
        if self.peek() == Some(ch) {
            self.pos += ch.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, ch: char) -> Result<(), ExprError> {
        if self.eat(ch) {
            return Ok(());
        }
        match self.peek() {
            Some(found) => Err(ExprError::UnexpectedChar {
                offset: self.pos,
                found,
            }),
            None => Err(ExprError::UnexpectedEnd),
        }
    }

    // expr := term (('+' | '-') term)*
    fn expr(&mut self) -> Result<Node, ExprError> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek() {
                Some('+') => BinOp::Add,
                Some('-') => BinOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            self.node()?;
            let rhs = self.term()?;
            lhs = Node::Bin(op, Box::new(lhs), Box::new(rhs));
        }
    }

    // term := factor (('*' | '/' | '%') factor)*
    fn term(&mut self) -> Result<Node, ExprError> {
        let mut lhs = self.factor()?;
        loop {
            let op = match self.peek() {
                Some('*') => BinOp::Mul,
                Some('/') => BinOp::Div,
                Some('%') => BinOp::Rem,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            self.node()?;
            let rhs = self.factor()?;
            lhs = Node::Bin(op, Box::new(lhs), Box::new(rhs));
        }
    }

    // factor := unary ('^' unary)*
    fn factor(&mut self) -> Result<Node, ExprError> {
        let mut lhs = self.unary()?;
        while self.eat('^') {
            self.node()?;
            let rhs = self.unary()?;
            lhs = Node::Bin(BinOp::Pow, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    // unary := ('+' | '-')* base
    fn unary(&mut self) -> Result<Node, ExprError> {
        if self.eat('-') {
            self.node()?;
            self.descend()?;
            let inner = self.unary()?;
            self.ascend();
            return Ok(Node::Neg(Box::new(inner)));
        }
        if self.eat('+') {
            self.descend()?;
            let inner = self.unary()?;
            self.ascend();
            return Ok(inner);
        }
        self.base()
    }

    // base := number | ident ('(' args ')')? | '(' expr ')'
    fn base(&mut self) -> Result<Node, ExprError> {
        match self.peek() {
            None => Err(ExprError::UnexpectedEnd),
            Some('(') => {
                self.pos += 1;
                self.descend()?;
                let inner = self.expr()?;
                self.ascend();
                self.expect(')')?;
                Ok(inner)
            }
            Some(c) if c.is_ascii_digit() || c == '.' => self.number(),
            Some(c) if c.is_ascii_alphabetic() || c == '_' => self.call_or_constant(),
            Some(found) => Err(ExprError::UnexpectedChar {
                offset: self.pos,
                found,
            }),
        }
    }

    fn number(&mut self) -> Result<Node, ExprError> {
        let start = self.pos;
        let bytes = self.src.as_bytes();
        let is_hex = bytes[start..].starts_with(b"0x") || bytes[start..].starts_with(b"0X");
        let value = if is_hex {
            self.pos += 2;
            while self.pos < bytes.len() && bytes[self.pos].is_ascii_hexdigit() {
                self.pos += 1;
            }
            u64::from_str_radix(&self.src[start + 2..self.pos], 16).map(|v| v as f64).ok()
        } else {
            while self.pos < bytes.len() && (bytes[self.pos].is_ascii_digit() || bytes[self.pos] == b'.')
            {
                self.pos += 1;
            }
            self.exponent();
            self.src[start..self.pos].parse::<f64>().ok()
        };
        value.map(Node::Num).ok_or_else(|| ExprError::InvalidNumber {
            text: self.src[start..self.pos].to_string(),
            offset: start,
        })
    }

    /// Consume an `e[+-]digits` suffix. A bare `e` is left alone so that
    /// `2e` still reads as a trailing identifier.
    fn exponent(&mut self) {
        let bytes = self.src.as_bytes();
        let mut i = self.pos;
        if !matches!(bytes.get(i), Some(b'e' | b'E')) {
            return;
        }
        i += 1;
        if matches!(bytes.get(i), Some(b'+' | b'-')) {
            i += 1;
        }
        if !bytes.get(i).is_some_and(u8::is_ascii_digit) {
            return;
        }
        while bytes.get(i).is_some_and(u8::is_ascii_digit) {
            i += 1;
        }
        self.pos = i;
    }

    fn call_or_constant(&mut self) -> Result<Node, ExprError> {
        let start = self.pos;
        let bytes = self.src.as_bytes();
        while self.pos < bytes.len() && (bytes[self.pos].is_ascii_alphanumeric() || bytes[self.pos] == b'_')
        {
            self.pos += 1;
        }
        let name = &self.src[start..self.pos];
        match name {
            "pi" => return Ok(Node::Num(std::f64::consts::PI)),
            "e" => return Ok(Node::Num(std::f64::consts::E)),
            _ => {}
        }
        let Some(func) = Func::lookup(name) else {
            return Err(ExprError::UnknownIdentifier {
                name: name.to_string(),
                offset: start,
            });
        };
        self.expect('(')?;
        self.node()?;
        self.descend()?;
        let mut args = Vec::new();
        if !self.eat(')') {
            loop {
                args.push(self.expr()?);
                if self.eat(',') {
                    continue;
                }
                self.expect(')')?;
                break;
            }
        }
        self.ascend();
        if args.len() != func.arity() {
            return Err(ExprError::WrongArity {
                name: func.name(),
                expected: func.arity(),
                found: args.len(),
            });
        }
        Ok(Node::Call(func, args))
    }
}
