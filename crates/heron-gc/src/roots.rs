//! Scoped root registration
//!
//! Values held only in native locals are invisible to the collector. Before
//! any step that can allocate, such values are pushed onto the heap's root
//! stack through a [`RootScope`]; the collector rewrites the slots when it
//! moves the blocks, and the scope pops them again when it is dropped.
//!
//! A scope mutably borrows the heap, and a nested scope can only be opened
//! through [`RootScope::heap`], so registrations always unwind in LIFO order,
//! including when a raise unwinds through the scope.

use smallvec::SmallVec;

use crate::error::AllocError;
use crate::heap::Heap;
use crate::value::Value;

/// Guard for a contiguous run of root stack slots
pub struct RootScope<'h> {
    heap: &'h mut Heap,
    base: usize,
    len: usize,
}

impl Heap {
    /// Register `values` as roots until the returned scope is dropped
    pub fn protect(&mut self, values: &[Value]) -> RootScope<'_> {
        let base = self.root_stack.len();
        self.root_stack.extend_from_slice(values);
        RootScope {
            heap: self,
            base,
            len: values.len(),
        }
    }

    /// Allocate a `wosize`-field record while `roots` are protected.
    ///
    /// `init` receives the roots as they are after the allocation (relocated
    /// if a collection ran) and the new record's fields to fill in. The roots
    /// are released on every exit path.
    pub fn allocate_protected<F>(
        &mut self,
        roots: &[Value],
        wosize: usize,
        tag: u8,
        init: F,
    ) -> Result<Value, AllocError>
    where
        F: FnOnce(&[Value], &mut [Value]),
    {
        let mut scope = self.protect(roots);
        let block = scope.heap().allocate(wosize, tag)?;

        let current: SmallVec<[Value; 8]> = SmallVec::from_slice(scope.values());
        if let Some(fields) = scope.heap().fields_mut(block) {
            init(&current, fields);
        }
        Ok(block)
    }
}

impl<'h> RootScope<'h> {
    /// Current value of the `index`-th protected root
    pub fn get(&self, index: usize) -> Option<Value> {
        if index < self.len {
            Some(self.heap.root(self.base + index))
        } else {
            None
        }
    }

    /// Current values of all protected roots
    pub fn values(&self) -> &[Value] {
        &self.heap.root_stack[self.base..self.base + self.len]
    }

    /// Replace a protected root
    pub fn set(&mut self, index: usize, value: Value) {
        assert!(index < self.len, "root index {index} out of range");
        self.heap.root_stack[self.base + index] = value;
    }

    /// Protect one more value, returning its index
    pub fn push(&mut self, value: Value) -> usize {
        debug_assert_eq!(self.heap.root_stack.len(), self.base + self.len);
        self.heap.root_stack.push(value);
        self.len += 1;
        self.len - 1
    }

    /// Number of protected roots
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if nothing is protected
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The heap, for allocating or opening a nested scope
    pub fn heap(&mut self) -> &mut Heap {
        self.heap
    }

    /// Shared access to the heap
    pub fn heap_ref(&self) -> &Heap {
        self.heap
    }
}

impl Drop for RootScope<'_> {
    fn drop(&mut self) {
        self.heap.root_stack.truncate(self.base);
    }
}
