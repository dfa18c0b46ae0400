//! Runtime value representation

use std::fmt;

use crate::object::StaticBlock;

/// Address of a block in the managed heap.
///
/// Addresses are never reused: a block that survives a collection is copied
/// to a fresh address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Addr(u64);

impl Addr {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw address value
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// A single runtime word: an immediate integer or a pointer to a block.
#[derive(Clone, Copy)]
pub enum Value {
    /// Immediate integer
    Int(i64),
    /// Block in the managed heap
    Block(Addr),
    /// Block in static memory
    Static(&'static StaticBlock),
}

impl Value {
    /// The unit value
    pub const UNIT: Value = Value::Int(0);

    /// True for immediates
    pub fn is_int(self) -> bool {
        matches!(self, Value::Int(_))
    }

    /// True for pointers to a block, heap or static
    pub fn is_block(self) -> bool {
        !self.is_int()
    }

    /// Integer payload
    pub fn as_int(self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(n),
            _ => None,
        }
    }

    /// Heap address, if the value points into the managed heap
    pub fn addr(self) -> Option<Addr> {
        match self {
            Value::Block(addr) => Some(addr),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Block(a), Value::Block(b)) => a == b,
            (Value::Static(a), Value::Static(b)) => std::ptr::eq(*a, *b),
            _ => false,
        }
    }
}

impl Eq for Value {}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "Int({n})"),
            Value::Block(addr) => write!(f, "Block({addr})"),
            Value::Static(block) => write!(f, "Static({:p})", *block),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}
