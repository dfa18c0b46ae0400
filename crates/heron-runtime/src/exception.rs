//! Exception objects
//!
//! An exception object (a "bucket") is a record whose first field is the
//! constructor and whose remaining fields are the arguments. Buckets are
//! immutable once built and are handed to exactly one handler.

use heron_gc::{Heap, StaticBlock, Value, tags};

use crate::tag::{ExnTag, OUT_OF_MEMORY};

static OUT_OF_MEMORY_BUCKET_FIELDS: [Value; 1] = [Value::Static(&OUT_OF_MEMORY)];

/// The bucket raised on allocation failure. Built at compile time outside the
/// heap, so raising it never allocates.
static OUT_OF_MEMORY_BUCKET: StaticBlock =
    StaticBlock::record(tags::RECORD, &OUT_OF_MEMORY_BUCKET_FIELDS);

/// A raised exception
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionObject(Value);

impl ExceptionObject {
    /// Wrap a bucket built elsewhere
    pub fn from_value(bucket: Value) -> Self {
        Self(bucket)
    }

    /// The out-of-memory singleton
    pub fn out_of_memory() -> Self {
        Self(Value::Static(&OUT_OF_MEMORY_BUCKET))
    }

    /// True for the out-of-memory singleton
    pub fn is_out_of_memory(self) -> bool {
        self == Self::out_of_memory()
    }

    /// The bucket as a value
    pub fn value(self) -> Value {
        self.0
    }

    /// Constructor block (field 0)
    pub fn constructor(self, heap: &Heap) -> Option<Value> {
        heap.field(self.0, 0)
    }

    /// Constructor identity
    pub fn tag(self, heap: &Heap) -> Option<ExnTag> {
        ExnTag::of_constructor(heap, self.constructor(heap)?)
    }

    /// Arguments, in order
    pub fn args(self, heap: &Heap) -> Option<&[Value]> {
        heap.fields(self.0)?.get(1..)
    }

    /// Number of arguments
    pub fn arity(self, heap: &Heap) -> usize {
        self.args(heap).map_or(0, <[Value]>::len)
    }
}
