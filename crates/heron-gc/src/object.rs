//! GC object layout

use crate::value::Value;

/// Size of one heap word in bytes
pub const WORD_SIZE: usize = 8;

/// Which part of the memory system owns a block
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Generation {
    /// Freshly allocated, not yet survived a collection
    Young = 0,
    /// Survived at least one collection
    Old = 1,
    /// Lives outside the heap; never relocated or reclaimed
    Static = 2,
}

/// Block header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Size of the body in words
    wosize: usize,
    /// Block tag byte (see [`tags`])
    tag: u8,
    generation: Generation,
}

impl Header {
    /// Create a header for a freshly allocated heap block
    pub const fn new(wosize: usize, tag: u8) -> Self {
        Self {
            wosize,
            tag,
            generation: Generation::Young,
        }
    }

    /// Create a header for a block stored outside the heap.
    ///
    /// The header starts in the state a block reaches after promotion and
    /// the collector never looks at it again.
    pub const fn new_static(wosize: usize, tag: u8) -> Self {
        Self {
            wosize,
            tag,
            generation: Generation::Static,
        }
    }

    /// Body size in words
    pub fn wosize(&self) -> usize {
        self.wosize
    }

    /// Get block tag
    pub fn tag(&self) -> u8 {
        self.tag
    }

    /// Get generation
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// True when the collector may move this block
    pub fn is_movable(&self) -> bool {
        self.generation != Generation::Static
    }

    pub(crate) fn promote(&mut self) {
        if self.generation == Generation::Young {
            self.generation = Generation::Old;
        }
    }
}

/// Number of words needed to hold `len` bytes plus the padding byte
pub const fn bytes_wosize(len: usize) -> usize {
    len / WORD_SIZE + 1
}

/// Payload of a heap block
#[derive(Debug, Clone)]
pub enum Body {
    /// Scannable fields
    Fields(Vec<Value>),
    /// Opaque bytes, never scanned
    Bytes(Box<[u8]>),
}

/// A block living in the managed heap
#[derive(Debug, Clone)]
pub struct Block {
    pub(crate) header: Header,
    pub(crate) body: Body,
}

impl Block {
    /// Total footprint in words, header included
    pub fn total_words(&self) -> usize {
        self.header.wosize + 1
    }
}

/// Payload of an out-of-heap block
#[derive(Debug)]
pub enum StaticBody {
    /// Immutable fields
    Fields(&'static [Value]),
    /// Immutable bytes
    Bytes(&'static [u8]),
}

/// A block stored outside the heap, in static memory.
///
/// Static blocks are referenced through [`Value::Static`]. They are built at
/// compile time, so reading or raising one never touches the allocator.
#[derive(Debug)]
pub struct StaticBlock {
    header: Header,
    body: StaticBody,
}

impl StaticBlock {
    /// A record of immutable fields
    pub const fn record(tag: u8, fields: &'static [Value]) -> Self {
        Self {
            header: Header::new_static(fields.len(), tag),
            body: StaticBody::Fields(fields),
        }
    }

    /// A string block
    pub const fn string(text: &'static str) -> Self {
        Self {
            header: Header::new_static(bytes_wosize(text.len()), tags::STRING),
            body: StaticBody::Bytes(text.as_bytes()),
        }
    }

    /// Get the header
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Fields, if this is a record
    pub fn fields(&self) -> Option<&'static [Value]> {
        match self.body {
            StaticBody::Fields(fields) => Some(fields),
            StaticBody::Bytes(_) => None,
        }
    }

    /// Bytes, if this is a string
    pub fn bytes(&self) -> Option<&'static [u8]> {
        match self.body {
            StaticBody::Bytes(bytes) => Some(bytes),
            StaticBody::Fields(_) => None,
        }
    }
}

/// Block tag bytes
pub mod tags {
    /// Plain record / tuple / exception bucket
    pub const RECORD: u8 = 0;
    /// Exception constructor
    pub const OBJECT: u8 = 248;
    /// Byte string
    pub const STRING: u8 = 252;
}
