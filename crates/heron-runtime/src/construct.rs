//! Building exception objects
//!
//! Every constructor here either returns a complete bucket or raises
//! `Out_of_memory`; there is no error return. The constructor and the
//! arguments are registered as roots before the bucket is allocated, so a
//! collection triggered by that allocation relocates them instead of leaving
//! the bucket pointing at freed blocks.

use heron_gc::{Value, tags};
use smallvec::SmallVec;

use crate::exception::ExceptionObject;
use crate::runtime::Runtime;
use crate::tag::{ExnTag, Predefined};

impl Runtime {
    /// Build a bucket with no arguments
    pub fn build_zero_arg(&mut self, tag: impl Into<ExnTag>) -> ExceptionObject {
        let tag = tag.into();
        if tag == ExnTag::Predefined(Predefined::OutOfMemory) {
            return ExceptionObject::out_of_memory();
        }
        let constructor = self.constructor_or_raise(tag);
        match self
            .heap
            .allocate_protected(&[constructor], 1, tags::RECORD, |roots, fields| {
                fields[0] = roots[0];
            }) {
            Ok(bucket) => ExceptionObject::from_value(bucket),
            Err(err) => self.allocation_failed(err),
        }
    }

    /// Build a bucket carrying `args`, in order
    pub fn build_n_arg(&mut self, tag: impl Into<ExnTag>, args: &[Value]) -> ExceptionObject {
        let tag = tag.into();
        if args.is_empty() {
            return self.build_zero_arg(tag);
        }
        let constructor = self.constructor_or_raise(tag);

        let mut roots: SmallVec<[Value; 4]> = SmallVec::with_capacity(args.len() + 1);
        roots.push(constructor);
        roots.extend_from_slice(args);

        match self
            .heap
            .allocate_protected(&roots, roots.len(), tags::RECORD, |roots, fields| {
                fields.copy_from_slice(roots);
            }) {
            Ok(bucket) => ExceptionObject::from_value(bucket),
            Err(err) => self.allocation_failed(err),
        }
    }

    /// Build a bucket whose single argument is a copy of `text`
    pub fn build_with_string(&mut self, tag: impl Into<ExnTag>, text: &str) -> ExceptionObject {
        let tag = tag.into();
        let message = self.intern_text(text.as_bytes());
        self.build_n_arg(tag, &[message])
    }
}
